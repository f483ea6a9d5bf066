use crate::domain::account::{Amount, Balance, UserId, payout_for};
use crate::domain::game::GameType;
use crate::domain::ports::LedgerStore;
use crate::domain::session::Settlement;
use crate::domain::transaction::{
    BetEntry, LedgerBatch, Outcome, TransactionEntry, TransactionType,
};
use crate::error::{Result, WagerError};
use rust_decimal::Decimal;
use tracing::debug;

/// Whether the stake of a wager has already left the balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stake {
    /// Single-shot wagers: the stake is taken in the same write as the payout.
    Unpaid,
    /// Session wagers: the stake was taken when the session opened.
    Escrowed,
}

/// A wager whose outcome is known but not yet written to the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedWager {
    pub user_id: UserId,
    pub game_type: GameType,
    pub bet_amount: Amount,
    pub bet_choice: String,
    pub result: String,
    pub outcome: Outcome,
    /// Total return factor applied on a win. Ignored on a loss.
    pub multiplier: Decimal,
}

impl ResolvedWager {
    /// Fails if the payout does not fit a `Decimal`.
    pub fn payout(&self) -> Result<Decimal> {
        match self.outcome {
            Outcome::Win => payout_for(self.bet_amount, self.multiplier).ok_or_else(|| {
                WagerError::ValidationError(format!(
                    "Payout for {} at {}x is not representable",
                    self.bet_amount, self.multiplier
                ))
            }),
            Outcome::Loss => Ok(Decimal::ZERO),
        }
    }
}

/// Writes the final ledger effects of a wager.
///
/// Every method produces exactly one `LedgerBatch`, so a wager's balance change,
/// transactions and bet record land together or not at all.
pub struct SettlementRecorder<'a> {
    ledger: &'a dyn LedgerStore,
}

impl<'a> SettlementRecorder<'a> {
    pub fn new(ledger: &'a dyn LedgerStore) -> Self {
        Self { ledger }
    }

    /// Takes a session stake out of the balance and logs the `bet` transaction.
    pub async fn escrow(
        &self,
        user_id: UserId,
        game_type: GameType,
        amount: Amount,
    ) -> Result<Balance> {
        let current = self.ledger.get_balance(user_id).await?;
        let remaining = current.amount.debit(amount)?;
        let batch = LedgerBatch::new(user_id)
            .with_balance(remaining)
            .with_transaction(TransactionEntry::new(
                TransactionType::Bet,
                amount.value(),
                format!("{} bet", game_type.label()),
            ));
        self.ledger.commit(batch).await?;
        debug!(
            user_id,
            game = %game_type,
            stake = %amount,
            balance = %remaining,
            "stake escrowed"
        );
        Ok(remaining)
    }

    /// Records the bet and credits any payout.
    ///
    /// For `Stake::Unpaid` the balance moves by `payout - bet` in a single write.
    pub async fn settle(&self, wager: ResolvedWager, stake: Stake) -> Result<Settlement> {
        let payout = wager.payout()?;
        let current = self.ledger.get_balance(wager.user_id).await?;
        let mut balance = current.amount;
        let mut batch = LedgerBatch::new(wager.user_id);

        if stake == Stake::Unpaid {
            balance = balance.debit(wager.bet_amount)?;
            batch = batch.with_transaction(TransactionEntry::new(
                TransactionType::Bet,
                wager.bet_amount.value(),
                format!("{} bet", wager.game_type.label()),
            ));
        }
        if payout > Decimal::ZERO {
            balance = balance.credit(payout)?;
            batch = batch.with_transaction(TransactionEntry::new(
                TransactionType::Win,
                payout,
                format!("{} win", wager.game_type.label()),
            ));
        }
        if balance != current.amount {
            batch = batch.with_balance(balance);
        }

        let multiplier = match wager.outcome {
            Outcome::Win => wager.multiplier,
            Outcome::Loss => Decimal::ZERO,
        };
        batch = batch.with_bet(BetEntry {
            game_type: wager.game_type,
            bet_amount: wager.bet_amount.value(),
            bet_choice: wager.bet_choice.clone(),
            result: wager.result.clone(),
            outcome: wager.outcome,
            payout,
        });
        self.ledger.commit(batch).await?;
        debug!(
            user_id = wager.user_id,
            game = %wager.game_type,
            payout = %payout,
            balance = %balance,
            "wager settled"
        );

        Ok(Settlement {
            game_type: wager.game_type,
            bet_amount: wager.bet_amount.value(),
            bet_choice: wager.bet_choice,
            result: wager.result,
            outcome: wager.outcome,
            multiplier,
            payout,
            balance: balance.value(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::in_memory::InMemoryLedgerStore;
    use rust_decimal_macros::dec;

    fn wager(outcome: Outcome, multiplier: Decimal) -> ResolvedWager {
        ResolvedWager {
            user_id: 1,
            game_type: GameType::CoinFlip,
            bet_amount: Amount::new(dec!(20)).unwrap(),
            bet_choice: "heads".to_string(),
            result: "tails".to_string(),
            outcome,
            multiplier,
        }
    }

    #[tokio::test]
    async fn test_unpaid_loss_debits_stake_once() {
        let ledger = InMemoryLedgerStore::new();
        ledger.set_balance(1, Balance::new(dec!(50))).await.unwrap();
        let recorder = SettlementRecorder::new(&ledger);

        let settlement = recorder
            .settle(wager(Outcome::Loss, dec!(2)), Stake::Unpaid)
            .await
            .unwrap();

        assert_eq!(settlement.payout, dec!(0));
        assert_eq!(settlement.balance, dec!(30));
        let txs = ledger.transactions(1).await.unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].r#type, TransactionType::Bet);
        assert_eq!(ledger.bets(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unpaid_win_applies_net_delta() {
        let ledger = InMemoryLedgerStore::new();
        ledger.set_balance(1, Balance::new(dec!(50))).await.unwrap();
        let recorder = SettlementRecorder::new(&ledger);

        let settlement = recorder
            .settle(wager(Outcome::Win, dec!(2)), Stake::Unpaid)
            .await
            .unwrap();

        assert_eq!(settlement.payout, dec!(40));
        assert_eq!(settlement.balance, dec!(70));
        let types: Vec<_> = ledger
            .transactions(1)
            .await
            .unwrap()
            .into_iter()
            .map(|tx| tx.r#type)
            .collect();
        assert_eq!(types, vec![TransactionType::Bet, TransactionType::Win]);
    }

    #[tokio::test]
    async fn test_unpaid_without_funds_writes_nothing() {
        let ledger = InMemoryLedgerStore::new();
        ledger.set_balance(1, Balance::new(dec!(5))).await.unwrap();
        let recorder = SettlementRecorder::new(&ledger);

        let result = recorder
            .settle(wager(Outcome::Win, dec!(2)), Stake::Unpaid)
            .await;

        assert!(matches!(result, Err(WagerError::InsufficientFunds { .. })));
        assert!(ledger.transactions(1).await.unwrap().is_empty());
        assert!(ledger.bets(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_escrowed_loss_leaves_balance() {
        let ledger = InMemoryLedgerStore::new();
        ledger.set_balance(1, Balance::new(dec!(100))).await.unwrap();
        let recorder = SettlementRecorder::new(&ledger);

        let remaining = recorder
            .escrow(1, GameType::Tower, Amount::new(dec!(10)).unwrap())
            .await
            .unwrap();
        assert_eq!(remaining, Balance::new(dec!(90)));

        let mut lost = wager(Outcome::Loss, dec!(1.5));
        lost.game_type = GameType::Tower;
        let settlement = recorder.settle(lost, Stake::Escrowed).await.unwrap();
        assert_eq!(settlement.balance, dec!(90));
        assert_eq!(settlement.multiplier, dec!(0));
        assert_eq!(ledger.transactions(1).await.unwrap().len(), 1);
    }

    #[test]
    fn test_payout_truncated_to_ledger_scale() {
        let mut won = wager(Outcome::Win, dec!(1.04166666666));
        won.bet_amount = Amount::new(dec!(3)).unwrap();
        assert_eq!(won.payout().unwrap(), dec!(3.12499999));
    }

    #[tokio::test]
    async fn test_unrepresentable_payout_writes_nothing() {
        let ledger = InMemoryLedgerStore::new();
        ledger.set_balance(1, Balance::new(dec!(50))).await.unwrap();
        let recorder = SettlementRecorder::new(&ledger);

        let result = recorder
            .settle(wager(Outcome::Win, Decimal::MAX), Stake::Unpaid)
            .await;

        assert!(matches!(result, Err(WagerError::ValidationError(_))));
        assert_eq!(
            ledger.get_balance(1).await.unwrap().amount,
            Balance::new(dec!(50))
        );
        assert!(ledger.transactions(1).await.unwrap().is_empty());
        assert!(ledger.bets(1).await.unwrap().is_empty());
    }
}
