use super::account::{Balance, UserId};
use super::game::GameType;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Deposit,
    Bet,
    Win,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
}

/// Append-only ledger entry. `amount` is never negative; the direction is
/// implied by `type`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: UserId,
    pub r#type: TransactionType,
    pub amount: Decimal,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// One resolved wager. Written exactly once per wager, at settlement.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct BetRecord {
    pub id: Uuid,
    pub user_id: UserId,
    pub game_type: GameType,
    pub bet_amount: Decimal,
    pub bet_choice: String,
    pub result: String,
    pub outcome: Outcome,
    pub payout: Decimal,
    pub created_at: DateTime<Utc>,
}

/// A transaction that has not been assigned an id or timestamp yet.
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionEntry {
    pub r#type: TransactionType,
    pub amount: Decimal,
    pub description: String,
}

impl TransactionEntry {
    pub fn new(r#type: TransactionType, amount: Decimal, description: impl Into<String>) -> Self {
        Self {
            r#type,
            amount,
            description: description.into(),
        }
    }

    pub fn into_record(self, user_id: UserId, created_at: DateTime<Utc>) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            user_id,
            r#type: self.r#type,
            amount: self.amount,
            description: self.description,
            created_at,
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct BetEntry {
    pub game_type: GameType,
    pub bet_amount: Decimal,
    pub bet_choice: String,
    pub result: String,
    pub outcome: Outcome,
    pub payout: Decimal,
}

impl BetEntry {
    pub fn into_record(self, user_id: UserId, created_at: DateTime<Utc>) -> BetRecord {
        BetRecord {
            id: Uuid::new_v4(),
            user_id,
            game_type: self.game_type,
            bet_amount: self.bet_amount,
            bet_choice: self.bet_choice,
            result: self.result,
            outcome: self.outcome,
            payout: self.payout,
            created_at,
        }
    }
}

/// A set of ledger writes for one user that a store must apply all-or-nothing.
#[derive(Debug, PartialEq, Clone)]
pub struct LedgerBatch {
    pub user_id: UserId,
    pub balance: Option<Balance>,
    pub transactions: Vec<TransactionEntry>,
    pub bet: Option<BetEntry>,
}

impl LedgerBatch {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            balance: None,
            transactions: Vec::new(),
            bet: None,
        }
    }

    pub fn with_balance(mut self, balance: Balance) -> Self {
        self.balance = Some(balance);
        self
    }

    pub fn with_transaction(mut self, entry: TransactionEntry) -> Self {
        self.transactions.push(entry);
        self
    }

    pub fn with_bet(mut self, bet: BetEntry) -> Self {
        self.bet = Some(bet);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_transaction_type_serialization() {
        let json = serde_json::to_string(&TransactionType::Win).unwrap();
        assert_eq!(json, "\"win\"");
    }

    #[test]
    fn test_batch_builder_collects_entries() {
        let batch = LedgerBatch::new(7)
            .with_balance(Balance::new(dec!(90)))
            .with_transaction(TransactionEntry::new(
                TransactionType::Bet,
                dec!(10),
                "Tower bet",
            ));

        assert_eq!(batch.user_id, 7);
        assert_eq!(batch.balance, Some(Balance::new(dec!(90))));
        assert_eq!(batch.transactions.len(), 1);
        assert!(batch.bet.is_none());
    }
}
