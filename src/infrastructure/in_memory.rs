use crate::domain::account::{Balance, BalanceRecord, DEFAULT_CURRENCY, UserId};
use crate::domain::game::SessionGame;
use crate::domain::ports::{LedgerStore, SessionStore};
use crate::domain::session::Session;
use crate::domain::transaction::{BetEntry, BetRecord, LedgerBatch, Transaction, TransactionEntry};
use crate::error::{Result, WagerError};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct LedgerState {
    balances: HashMap<UserId, BalanceRecord>,
    transactions: Vec<Transaction>,
    bets: Vec<BetRecord>,
}

impl LedgerState {
    fn balance_mut(&mut self, user_id: UserId, currency: &str) -> &mut BalanceRecord {
        self.balances
            .entry(user_id)
            .or_insert_with(|| BalanceRecord::new(user_id, currency))
    }
}

/// A thread-safe in-memory ledger.
///
/// Balances, transactions and bets live behind a single `RwLock`, so a
/// `LedgerBatch` is applied under one write guard and is never observed half done.
#[derive(Clone)]
pub struct InMemoryLedgerStore {
    state: Arc<RwLock<LedgerState>>,
    currency: String,
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::with_currency(DEFAULT_CURRENCY)
    }
}

impl InMemoryLedgerStore {
    /// Creates a new, empty ledger denominated in the default currency.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_currency(currency: impl Into<String>) -> Self {
        Self {
            state: Arc::new(RwLock::new(LedgerState::default())),
            currency: currency.into(),
        }
    }
}

fn ensure_non_negative(amount: Balance) -> Result<()> {
    if amount.is_negative() {
        return Err(WagerError::internal(format!(
            "refusing to store negative balance {}",
            amount
        )));
    }
    Ok(())
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn get_balance(&self, user_id: UserId) -> Result<BalanceRecord> {
        {
            let state = self.state.read().await;
            if let Some(record) = state.balances.get(&user_id) {
                return Ok(record.clone());
            }
        }
        let mut state = self.state.write().await;
        Ok(state.balance_mut(user_id, &self.currency).clone())
    }

    async fn set_balance(&self, user_id: UserId, amount: Balance) -> Result<()> {
        ensure_non_negative(amount)?;
        let mut state = self.state.write().await;
        state.balance_mut(user_id, &self.currency).amount = amount;
        Ok(())
    }

    async fn record_transaction(
        &self,
        user_id: UserId,
        entry: TransactionEntry,
    ) -> Result<Transaction> {
        let tx = entry.into_record(user_id, Utc::now());
        let mut state = self.state.write().await;
        state.transactions.push(tx.clone());
        Ok(tx)
    }

    async fn record_bet(&self, user_id: UserId, entry: BetEntry) -> Result<BetRecord> {
        let bet = entry.into_record(user_id, Utc::now());
        let mut state = self.state.write().await;
        state.bets.push(bet.clone());
        Ok(bet)
    }

    async fn commit(&self, batch: LedgerBatch) -> Result<()> {
        if let Some(amount) = batch.balance {
            ensure_non_negative(amount)?;
        }
        let now = Utc::now();
        let mut state = self.state.write().await;
        if let Some(amount) = batch.balance {
            state.balance_mut(batch.user_id, &self.currency).amount = amount;
        }
        for entry in batch.transactions {
            state
                .transactions
                .push(entry.into_record(batch.user_id, now));
        }
        if let Some(bet) = batch.bet {
            state.bets.push(bet.into_record(batch.user_id, now));
        }
        Ok(())
    }

    async fn transactions(&self, user_id: UserId) -> Result<Vec<Transaction>> {
        let state = self.state.read().await;
        Ok(state
            .transactions
            .iter()
            .filter(|tx| tx.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn bets(&self, user_id: UserId) -> Result<Vec<BetRecord>> {
        let state = self.state.read().await;
        Ok(state
            .bets
            .iter()
            .filter(|bet| bet.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn balances(&self) -> Result<Vec<BalanceRecord>> {
        let state = self.state.read().await;
        let mut balances: Vec<BalanceRecord> = state.balances.values().cloned().collect();
        balances.sort_by_key(|record| record.user_id);
        Ok(balances)
    }
}

/// A thread-safe in-memory session store keyed by (user, game).
///
/// Sessions are volatile: they vanish with the process.
#[derive(Default, Clone)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<(UserId, SessionGame), Session>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, user_id: UserId, game: SessionGame) -> Result<Option<Session>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&(user_id, game)).cloned())
    }

    async fn insert(&self, user_id: UserId, session: Session) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        match sessions.entry((user_id, session.game())) {
            Entry::Occupied(_) => Err(WagerError::SessionAlreadyActive),
            Entry::Vacant(slot) => {
                slot.insert(session);
                Ok(())
            }
        }
    }

    async fn replace(&self, user_id: UserId, session: Session) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        match sessions.entry((user_id, session.game())) {
            Entry::Occupied(mut slot) => {
                slot.insert(session);
                Ok(())
            }
            Entry::Vacant(_) => Err(WagerError::NoActiveSession),
        }
    }

    async fn take(&self, user_id: UserId, game: SessionGame) -> Result<Option<Session>> {
        let mut sessions = self.sessions.write().await;
        Ok(sessions.remove(&(user_id, game)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::Amount;
    use crate::domain::game::GameType;
    use crate::domain::session::TowerSession;
    use crate::domain::transaction::{Outcome, TransactionType};
    use rust_decimal_macros::dec;

    fn tower(bet: rust_decimal::Decimal) -> Session {
        Session::Tower(TowerSession::new(Amount::new(bet).unwrap(), Utc::now()))
    }

    #[tokio::test]
    async fn test_balance_created_lazily_at_zero() {
        let store = InMemoryLedgerStore::new();
        let record = store.get_balance(1).await.unwrap();
        assert_eq!(record.amount, Balance::ZERO);
        assert_eq!(record.currency, DEFAULT_CURRENCY);
        assert_eq!(store.balances().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_set_balance_overwrites() {
        let store = InMemoryLedgerStore::with_currency("ETH");
        store.set_balance(1, Balance::new(dec!(5))).await.unwrap();
        store.set_balance(1, Balance::new(dec!(7.5))).await.unwrap();

        let record = store.get_balance(1).await.unwrap();
        assert_eq!(record.amount, Balance::new(dec!(7.5)));
        assert_eq!(record.currency, "ETH");
    }

    #[tokio::test]
    async fn test_negative_balance_rejected() {
        let store = InMemoryLedgerStore::new();
        let result = store.set_balance(1, Balance::new(dec!(-0.01))).await;
        assert!(matches!(result, Err(WagerError::InternalError(_))));

        let batch = LedgerBatch::new(1)
            .with_balance(Balance::new(dec!(-1)))
            .with_transaction(TransactionEntry::new(TransactionType::Bet, dec!(1), "x"));
        assert!(store.commit(batch).await.is_err());
        assert!(store.transactions(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_history_is_per_user_and_ordered() {
        let store = InMemoryLedgerStore::new();
        store
            .record_transaction(1, TransactionEntry::new(TransactionType::Deposit, dec!(5), "a"))
            .await
            .unwrap();
        store
            .record_transaction(2, TransactionEntry::new(TransactionType::Deposit, dec!(6), "b"))
            .await
            .unwrap();
        store
            .record_transaction(1, TransactionEntry::new(TransactionType::Bet, dec!(1), "c"))
            .await
            .unwrap();

        let history = store.transactions(1).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].description, "a");
        assert_eq!(history[1].r#type, TransactionType::Bet);
    }

    #[tokio::test]
    async fn test_commit_applies_everything() {
        let store = InMemoryLedgerStore::new();
        let batch = LedgerBatch::new(3)
            .with_balance(Balance::new(dec!(12.5)))
            .with_transaction(TransactionEntry::new(TransactionType::Win, dec!(12.5), "w"))
            .with_bet(BetEntry {
                game_type: GameType::Mines,
                bet_amount: dec!(10),
                bet_choice: "5 mines".to_string(),
                result: "1 tile revealed".to_string(),
                outcome: Outcome::Win,
                payout: dec!(12.5),
            });
        store.commit(batch).await.unwrap();

        assert_eq!(
            store.get_balance(3).await.unwrap().amount,
            Balance::new(dec!(12.5))
        );
        assert_eq!(store.transactions(3).await.unwrap().len(), 1);
        let bets = store.bets(3).await.unwrap();
        assert_eq!(bets.len(), 1);
        assert_eq!(bets[0].outcome, Outcome::Win);
    }

    #[tokio::test]
    async fn test_session_slot_is_exclusive() {
        let store = InMemorySessionStore::new();
        store.insert(1, tower(dec!(10))).await.unwrap();

        let second = store.insert(1, tower(dec!(20))).await;
        assert!(matches!(second, Err(WagerError::SessionAlreadyActive)));

        // Another user or another game has its own slot.
        store.insert(2, tower(dec!(20))).await.unwrap();
        assert!(store.get(1, SessionGame::Mines).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_session_take_removes_once() {
        let store = InMemorySessionStore::new();
        store.insert(1, tower(dec!(10))).await.unwrap();

        assert!(store.take(1, SessionGame::Tower).await.unwrap().is_some());
        assert!(store.take(1, SessionGame::Tower).await.unwrap().is_none());
        assert!(matches!(
            store.replace(1, tower(dec!(10))).await,
            Err(WagerError::NoActiveSession)
        ));
    }
}
