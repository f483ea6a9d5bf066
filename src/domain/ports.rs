use super::account::{Balance, BalanceRecord, UserId};
use super::game::SessionGame;
use super::session::Session;
use super::transaction::{BetEntry, BetRecord, LedgerBatch, Transaction, TransactionEntry};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Balance rows plus the append-only transaction and bet history.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Returns the user's balance, creating a zero row on first access.
    async fn get_balance(&self, user_id: UserId) -> Result<BalanceRecord>;
    /// Unconditional overwrite. Rejects negative amounts.
    async fn set_balance(&self, user_id: UserId, amount: Balance) -> Result<()>;
    async fn record_transaction(
        &self,
        user_id: UserId,
        entry: TransactionEntry,
    ) -> Result<Transaction>;
    async fn record_bet(&self, user_id: UserId, entry: BetEntry) -> Result<BetRecord>;
    /// Applies every write in `batch` or none of them.
    async fn commit(&self, batch: LedgerBatch) -> Result<()>;
    async fn transactions(&self, user_id: UserId) -> Result<Vec<Transaction>>;
    async fn bets(&self, user_id: UserId) -> Result<Vec<BetRecord>>;
    async fn balances(&self) -> Result<Vec<BalanceRecord>>;
}

/// Holds at most one session per (user, game).
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, user_id: UserId, game: SessionGame) -> Result<Option<Session>>;
    /// Fails with `SessionAlreadyActive` if the slot is taken.
    async fn insert(&self, user_id: UserId, session: Session) -> Result<()>;
    /// Overwrites an existing session. Fails with `NoActiveSession` if the slot is empty.
    async fn replace(&self, user_id: UserId, session: Session) -> Result<()>;
    /// Removes and returns the session in one step.
    async fn take(&self, user_id: UserId, game: SessionGame) -> Result<Option<Session>>;
}

/// Uniform draws in `[0, 1)`.
pub trait RandomSource: Send + Sync {
    fn next_unit(&self) -> f64;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub type LedgerStoreBox = Box<dyn LedgerStore>;
pub type SessionStoreBox = Box<dyn SessionStore>;
pub type RandomSourceBox = Box<dyn RandomSource>;
pub type ClockBox = Box<dyn Clock>;
