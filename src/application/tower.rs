use super::engine::GameContext;
use super::settlement::{ResolvedWager, Stake};
use crate::domain::account::{Amount, UserId};
use crate::domain::game::{Difficulty, GameType, SessionGame};
use crate::domain::odds;
use crate::domain::session::{
    Session, SessionStatus, SessionStep, SessionView, Settlement, TowerSession,
};
use crate::domain::transaction::Outcome;
use crate::error::{Result, WagerError};
use tracing::info;

fn describe_path(path: &[Difficulty]) -> String {
    if path.is_empty() {
        return "no levels".to_string();
    }
    path.iter()
        .map(Difficulty::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Tower: climb one level per play, cash out at any height.
pub struct TowerGame<'a> {
    ctx: &'a GameContext,
}

impl<'a> TowerGame<'a> {
    pub fn new(ctx: &'a GameContext) -> Self {
        Self { ctx }
    }

    fn max_levels(&self) -> u8 {
        self.ctx.config.tower_max_levels
    }

    async fn active(&self, user_id: UserId) -> Result<TowerSession> {
        match self.ctx.sessions.get(user_id, SessionGame::Tower).await? {
            Some(Session::Tower(tower)) => Ok(tower),
            _ => Err(WagerError::NoActiveSession),
        }
    }

    async fn take(&self, user_id: UserId) -> Result<TowerSession> {
        match self.ctx.sessions.take(user_id, SessionGame::Tower).await? {
            Some(Session::Tower(tower)) => Ok(tower),
            _ => Err(WagerError::NoActiveSession),
        }
    }

    pub async fn start(&self, user_id: UserId, bet_amount: Amount) -> Result<SessionView> {
        self.ctx
            .ensure_no_session(user_id, SessionGame::Tower)
            .await?;
        self.ctx.ensure_funds(user_id, bet_amount).await?;

        let tower = TowerSession::new(bet_amount, self.ctx.now());
        let view = tower.view(self.max_levels());
        self.ctx
            .open_session(user_id, Session::Tower(tower))
            .await?;
        Ok(view)
    }

    pub async fn play(&self, user_id: UserId, difficulty: Difficulty) -> Result<SessionStep> {
        let mut tower = self.active(user_id).await?;
        if tower.level >= self.max_levels() {
            return Err(WagerError::InvalidMove(format!(
                "tower already at the top level {}",
                tower.level
            )));
        }

        if odds::tower_step(self.ctx.draw(), difficulty) {
            // The session stays active and can still be cashed out.
            tower.climb(difficulty).ok_or_else(|| {
                WagerError::InvalidMove("tower multiplier cannot grow any further".to_string())
            })?;
            let view = tower.view(self.max_levels());
            self.ctx
                .sessions
                .replace(user_id, Session::Tower(tower))
                .await?;
            return Ok(SessionStep::Active(view));
        }

        let mut snapshot = self.take(user_id).await?;
        let failed_level = snapshot.level + 1;
        snapshot.path.push(difficulty);
        let wager = ResolvedWager {
            user_id,
            game_type: GameType::Tower,
            bet_amount: snapshot.bet_amount,
            bet_choice: describe_path(&snapshot.path),
            result: format!("fell at level {}", failed_level),
            outcome: Outcome::Loss,
            multiplier: snapshot.multiplier,
        };
        let settlement = self.ctx.recorder().settle(wager, Stake::Escrowed).await?;
        info!(user_id, level = failed_level, "tower lost");
        Ok(SessionStep::Settled(settlement))
    }

    pub async fn cashout(&self, user_id: UserId) -> Result<Settlement> {
        let snapshot = self.take(user_id).await?;
        let wager = ResolvedWager {
            user_id,
            game_type: GameType::Tower,
            bet_amount: snapshot.bet_amount,
            bet_choice: describe_path(&snapshot.path),
            result: format!(
                "cashed out at level {} ({}x)",
                snapshot.level, snapshot.multiplier
            ),
            outcome: Outcome::Win,
            multiplier: snapshot.multiplier,
        };
        let settlement = self.ctx.recorder().settle(wager, Stake::Escrowed).await?;
        info!(user_id, level = snapshot.level, payout = %settlement.payout, "tower cashed out");
        Ok(settlement)
    }

    pub async fn status(&self, user_id: UserId) -> Result<SessionStatus> {
        match self.active(user_id).await {
            Ok(tower) => Ok(SessionStatus::Active(tower.view(self.max_levels()))),
            Err(WagerError::NoActiveSession) => Ok(SessionStatus::Inactive),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_path() {
        assert_eq!(describe_path(&[]), "no levels");
        assert_eq!(
            describe_path(&[Difficulty::Easy, Difficulty::Hard]),
            "easy,hard"
        );
    }
}
