//! Application layer containing the wagering orchestration.
//!
//! `WageringEngine` is the entry point. It owns the stores behind the domain
//! ports and serializes each user's requests through a per-user lock, then hands
//! off to the single-shot resolver or one of the session games. Every terminal
//! outcome goes through the `SettlementRecorder`.

pub mod crash;
pub mod engine;
pub mod locks;
pub mod mines;
pub mod settlement;
pub mod single_shot;
pub mod tower;
