//! Domain layer: money, ledger records, game rules and the ports the engine
//! depends on. Nothing in here performs I/O.

pub mod account;
pub mod game;
pub mod odds;
pub mod ports;
pub mod session;
pub mod transaction;
