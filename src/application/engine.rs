use super::crash::CrashGame;
use super::locks::UserLocks;
use super::mines::MinesGame;
use super::settlement::SettlementRecorder;
use super::single_shot::SingleShotResolver;
use super::tower::TowerGame;
use crate::config::EngineConfig;
use crate::domain::account::{Amount, BalanceRecord, UserId};
use crate::domain::game::{SessionGame, SessionMove, SessionParams, SingleShotBet};
use crate::domain::ports::{ClockBox, LedgerStoreBox, RandomSourceBox, SessionStoreBox};
use crate::domain::session::{Session, SessionStatus, SessionStep, SessionView, Settlement};
use crate::domain::transaction::{
    BetRecord, LedgerBatch, Transaction, TransactionEntry, TransactionType,
};
use crate::error::{Result, WagerError};
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::in_memory::{InMemoryLedgerStore, InMemorySessionStore};
use crate::infrastructure::random::ThreadRandom;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::info;

/// Collaborators shared by every game engine.
pub struct GameContext {
    pub(crate) ledger: LedgerStoreBox,
    pub(crate) sessions: SessionStoreBox,
    pub(crate) random: RandomSourceBox,
    pub(crate) clock: ClockBox,
    pub(crate) config: EngineConfig,
}

impl GameContext {
    pub(crate) fn draw(&self) -> f64 {
        self.random.next_unit()
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub(crate) fn recorder(&self) -> SettlementRecorder<'_> {
        SettlementRecorder::new(self.ledger.as_ref())
    }

    pub(crate) async fn ensure_funds(&self, user_id: UserId, amount: Amount) -> Result<()> {
        let balance = self.ledger.get_balance(user_id).await?;
        if !balance.amount.covers(amount) {
            return Err(WagerError::InsufficientFunds {
                available: balance.amount.value(),
                required: amount.value(),
            });
        }
        Ok(())
    }

    pub(crate) async fn ensure_no_session(&self, user_id: UserId, game: SessionGame) -> Result<()> {
        if self.sessions.get(user_id, game).await?.is_some() {
            return Err(WagerError::SessionAlreadyActive);
        }
        Ok(())
    }

    /// Stores the session record first and only then takes the stake. If the
    /// debit fails the record is removed again, so a stake never leaves the
    /// balance without a session to settle it.
    pub(crate) async fn open_session(&self, user_id: UserId, session: Session) -> Result<()> {
        let game = session.game();
        let stake = session.bet_amount();
        self.sessions.insert(user_id, session).await?;
        if let Err(err) = self.recorder().escrow(user_id, game.into(), stake).await {
            self.sessions.take(user_id, game).await?;
            return Err(err);
        }
        info!(user_id, game = %game, stake = %stake, "session started");
        Ok(())
    }
}

/// The wagering engine: balances, single-shot bets and multi-step sessions.
///
/// Every operation that reads and then writes a user's balance or sessions runs
/// under that user's lock, which linearizes session transitions and rules out
/// lost balance updates. Share one engine between tasks behind an `Arc`.
pub struct WageringEngine {
    ctx: GameContext,
    locks: UserLocks,
}

impl WageringEngine {
    /// Creates an engine over the given stores, drawing from the thread RNG and
    /// reading the system clock.
    pub fn new(ledger: LedgerStoreBox, sessions: SessionStoreBox, config: EngineConfig) -> Self {
        Self {
            ctx: GameContext {
                ledger,
                sessions,
                random: Box::new(ThreadRandom),
                clock: Box::new(SystemClock),
                config,
            },
            locks: UserLocks::new(),
        }
    }

    /// An engine with volatile in-memory stores.
    pub fn in_memory(config: EngineConfig) -> Self {
        let ledger = InMemoryLedgerStore::with_currency(config.currency.clone());
        Self::new(
            Box::new(ledger),
            Box::new(InMemorySessionStore::new()),
            config,
        )
    }

    pub fn with_random(mut self, random: RandomSourceBox) -> Self {
        self.ctx.random = random;
        self
    }

    pub fn with_clock(mut self, clock: ClockBox) -> Self {
        self.ctx.clock = clock;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.ctx.config
    }

    pub async fn get_balance(&self, user_id: UserId) -> Result<BalanceRecord> {
        self.ctx.ledger.get_balance(user_id).await
    }

    /// Credits a confirmed deposit.
    ///
    /// The external confirmation delay elapses before the user's lock is taken.
    pub async fn deposit(&self, user_id: UserId, amount: Amount) -> Result<BalanceRecord> {
        self.ctx.config.check_deposit(amount)?;
        let delay = self.ctx.config.deposit_confirmation_delay_ms;
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let _guard = self.locks.acquire(user_id).await;
        let mut record = self.ctx.ledger.get_balance(user_id).await?;
        record.amount = record.amount.credit(amount.value())?;
        let batch = LedgerBatch::new(user_id)
            .with_balance(record.amount)
            .with_transaction(TransactionEntry::new(
                TransactionType::Deposit,
                amount.value(),
                "Deposit",
            ));
        self.ctx.ledger.commit(batch).await?;
        info!(user_id, amount = %amount, balance = %record.amount, "deposit credited");
        Ok(record)
    }

    pub async fn place_single_shot_bet(
        &self,
        user_id: UserId,
        bet_amount: Amount,
        bet: SingleShotBet,
    ) -> Result<Settlement> {
        self.ctx.config.check_stake(bet_amount)?;
        let _guard = self.locks.acquire(user_id).await;
        SingleShotResolver::new(&self.ctx)
            .resolve(user_id, bet_amount, bet)
            .await
    }

    pub async fn start_session(
        &self,
        user_id: UserId,
        bet_amount: Amount,
        params: SessionParams,
    ) -> Result<SessionView> {
        self.ctx.config.check_stake(bet_amount)?;
        let _guard = self.locks.acquire(user_id).await;
        match params {
            SessionParams::Tower => TowerGame::new(&self.ctx).start(user_id, bet_amount).await,
            SessionParams::Crash => CrashGame::new(&self.ctx).start(user_id, bet_amount).await,
            SessionParams::Mines { mine_count } => {
                MinesGame::new(&self.ctx)
                    .start(user_id, bet_amount, mine_count)
                    .await
            }
        }
    }

    pub async fn advance_session(&self, user_id: UserId, step: SessionMove) -> Result<SessionStep> {
        let _guard = self.locks.acquire(user_id).await;
        match step {
            SessionMove::Tower { difficulty } => {
                TowerGame::new(&self.ctx).play(user_id, difficulty).await
            }
            SessionMove::Mines { tile } => MinesGame::new(&self.ctx).reveal(user_id, tile).await,
        }
    }

    pub async fn cashout_session(&self, user_id: UserId, game: SessionGame) -> Result<Settlement> {
        let _guard = self.locks.acquire(user_id).await;
        match game {
            SessionGame::Tower => TowerGame::new(&self.ctx).cashout(user_id).await,
            SessionGame::Crash => CrashGame::new(&self.ctx).cashout(user_id).await,
            SessionGame::Mines => MinesGame::new(&self.ctx).cashout(user_id).await,
        }
    }

    /// Reports the session state. For Crash this may settle the round as lost
    /// if the crash point has been reached.
    pub async fn session_status(
        &self,
        user_id: UserId,
        game: SessionGame,
    ) -> Result<SessionStatus> {
        let _guard = self.locks.acquire(user_id).await;
        match game {
            SessionGame::Tower => TowerGame::new(&self.ctx).status(user_id).await,
            SessionGame::Crash => CrashGame::new(&self.ctx).status(user_id).await,
            SessionGame::Mines => MinesGame::new(&self.ctx).status(user_id).await,
        }
    }

    pub async fn transactions(&self, user_id: UserId) -> Result<Vec<Transaction>> {
        self.ctx.ledger.transactions(user_id).await
    }

    pub async fn bets(&self, user_id: UserId) -> Result<Vec<BetRecord>> {
        self.ctx.ledger.bets(user_id).await
    }

    pub async fn balances(&self) -> Result<Vec<BalanceRecord>> {
        self.ctx.ledger.balances().await
    }
}
