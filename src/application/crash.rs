use super::engine::GameContext;
use super::settlement::{ResolvedWager, Stake};
use crate::domain::account::{Amount, UserId};
use crate::domain::game::{GameType, SessionGame};
use crate::domain::odds;
use crate::domain::session::{CrashSession, Session, SessionStatus, SessionView, Settlement};
use crate::domain::transaction::Outcome;
use crate::error::{Result, WagerError};
use tracing::info;

/// Crash: the multiplier climbs with wall-clock time until a hidden crash point.
///
/// There is no background timer. A round ends when the player cashes out or when
/// a status poll finds the crash point already passed; both paths settle through
/// the same take-then-record sequence.
pub struct CrashGame<'a> {
    ctx: &'a GameContext,
}

impl<'a> CrashGame<'a> {
    pub fn new(ctx: &'a GameContext) -> Self {
        Self { ctx }
    }

    async fn take(&self, user_id: UserId) -> Result<CrashSession> {
        match self.ctx.sessions.take(user_id, SessionGame::Crash).await? {
            Some(Session::Crash(crash)) => Ok(crash),
            _ => Err(WagerError::NoActiveSession),
        }
    }

    pub async fn start(&self, user_id: UserId, bet_amount: Amount) -> Result<SessionView> {
        self.ctx
            .ensure_no_session(user_id, SessionGame::Crash)
            .await?;
        self.ctx.ensure_funds(user_id, bet_amount).await?;

        let config = &self.ctx.config;
        let crash = CrashSession {
            bet_amount,
            crash_point: odds::crash_point(
                self.ctx.draw(),
                config.crash_min_point,
                config.crash_max_point,
            ),
            started_at: self.ctx.now(),
        };
        let view = crash.view(crash.started_at, config.crash_growth_per_second);
        self.ctx
            .open_session(user_id, Session::Crash(crash))
            .await?;
        Ok(view)
    }

    async fn settle_crashed(&self, user_id: UserId, crash: CrashSession) -> Result<Settlement> {
        let wager = ResolvedWager {
            user_id,
            game_type: GameType::Crash,
            bet_amount: crash.bet_amount,
            bet_choice: "ride".to_string(),
            result: format!("crashed at {}x", crash.crash_point),
            outcome: Outcome::Loss,
            multiplier: crash.crash_point,
        };
        let settlement = self.ctx.recorder().settle(wager, Stake::Escrowed).await?;
        info!(user_id, crash_point = %crash.crash_point, "crash round lost");
        Ok(settlement)
    }

    pub async fn cashout(&self, user_id: UserId) -> Result<Settlement> {
        let snapshot = self.take(user_id).await?;
        let growth = self.ctx.config.crash_growth_per_second;
        let now = self.ctx.now();
        if snapshot.has_crashed(now, growth) {
            return self.settle_crashed(user_id, snapshot).await;
        }

        let multiplier = snapshot.multiplier_at(now, growth);
        let wager = ResolvedWager {
            user_id,
            game_type: GameType::Crash,
            bet_amount: snapshot.bet_amount,
            bet_choice: format!("cash out at {}x", multiplier),
            result: format!(
                "cashed out at {}x, crash point {}x",
                multiplier, snapshot.crash_point
            ),
            outcome: Outcome::Win,
            multiplier,
        };
        let settlement = self.ctx.recorder().settle(wager, Stake::Escrowed).await?;
        info!(user_id, multiplier = %multiplier, payout = %settlement.payout, "crash cashed out");
        Ok(settlement)
    }

    /// Polling is a transition trigger: a round past its crash point is settled
    /// as lost here.
    pub async fn status(&self, user_id: UserId) -> Result<SessionStatus> {
        let Some(session) = self.ctx.sessions.get(user_id, SessionGame::Crash).await? else {
            return Ok(SessionStatus::Inactive);
        };
        let Session::Crash(crash) = session else {
            return Err(WagerError::internal("crash slot holds another game"));
        };

        let growth = self.ctx.config.crash_growth_per_second;
        let now = self.ctx.now();
        if !crash.has_crashed(now, growth) {
            return Ok(SessionStatus::Active(crash.view(now, growth)));
        }

        let snapshot = self.take(user_id).await?;
        let settlement = self.settle_crashed(user_id, snapshot).await?;
        Ok(SessionStatus::Crashed(settlement))
    }
}
