use super::engine::GameContext;
use super::settlement::{ResolvedWager, Stake};
use crate::domain::account::{Amount, UserId};
use crate::domain::game::{GameType, SessionGame};
use crate::domain::odds;
use crate::domain::session::{
    MinesSession, Session, SessionStatus, SessionStep, SessionView, Settlement,
};
use crate::domain::transaction::Outcome;
use crate::error::{Result, WagerError};
use rust_decimal::Decimal;
use tracing::info;

fn list(tiles: &[u8]) -> String {
    tiles
        .iter()
        .map(u8::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn describe_choice(mines: &MinesSession) -> String {
    format!(
        "{} mines, revealed [{}]",
        mines.mine_count(),
        list(&mines.revealed)
    )
}

/// Mines: reveal tiles on a hidden board, cash out before hitting a mine.
pub struct MinesGame<'a> {
    ctx: &'a GameContext,
}

impl<'a> MinesGame<'a> {
    pub fn new(ctx: &'a GameContext) -> Self {
        Self { ctx }
    }

    async fn active(&self, user_id: UserId) -> Result<MinesSession> {
        match self.ctx.sessions.get(user_id, SessionGame::Mines).await? {
            Some(Session::Mines(mines)) => Ok(mines),
            _ => Err(WagerError::NoActiveSession),
        }
    }

    async fn take(&self, user_id: UserId) -> Result<MinesSession> {
        match self.ctx.sessions.take(user_id, SessionGame::Mines).await? {
            Some(Session::Mines(mines)) => Ok(mines),
            _ => Err(WagerError::NoActiveSession),
        }
    }

    pub async fn start(
        &self,
        user_id: UserId,
        bet_amount: Amount,
        mine_count: u8,
    ) -> Result<SessionView> {
        let grid_size = self.ctx.config.mines_grid_size;
        if mine_count == 0 || mine_count >= grid_size {
            return Err(WagerError::ValidationError(format!(
                "Mine count must be between 1 and {}",
                grid_size - 1
            )));
        }
        self.ctx
            .ensure_no_session(user_id, SessionGame::Mines)
            .await?;
        self.ctx.ensure_funds(user_id, bet_amount).await?;

        let mines = MinesSession {
            bet_amount,
            grid_size,
            mines: odds::place_mines(grid_size, mine_count, || self.ctx.draw()),
            revealed: Vec::new(),
            multiplier: Decimal::ONE,
            started_at: self.ctx.now(),
        };
        let view = mines.view();
        self.ctx
            .open_session(user_id, Session::Mines(mines))
            .await?;
        Ok(view)
    }

    pub async fn reveal(&self, user_id: UserId, tile: u8) -> Result<SessionStep> {
        let mut mines = self.active(user_id).await?;
        if tile >= mines.grid_size {
            return Err(WagerError::InvalidMove(format!(
                "tile {} is outside the {}-tile grid",
                tile, mines.grid_size
            )));
        }
        if mines.is_revealed(tile) {
            return Err(WagerError::InvalidMove(format!(
                "tile {} is already revealed",
                tile
            )));
        }

        if !mines.is_mine(tile) {
            mines
                .reveal_safe(tile)
                .ok_or_else(|| WagerError::internal("mines multiplier overflow"))?;
            let view = mines.view();
            self.ctx
                .sessions
                .replace(user_id, Session::Mines(mines))
                .await?;
            return Ok(SessionStep::Active(view));
        }

        let snapshot = self.take(user_id).await?;
        let wager = ResolvedWager {
            user_id,
            game_type: GameType::Mines,
            bet_amount: snapshot.bet_amount,
            bet_choice: describe_choice(&snapshot),
            result: format!(
                "hit mine at tile {}, mines at [{}]",
                tile,
                list(&snapshot.mines)
            ),
            outcome: Outcome::Loss,
            multiplier: snapshot.multiplier,
        };
        let settlement = self.ctx.recorder().settle(wager, Stake::Escrowed).await?;
        info!(user_id, tile, "mines lost");
        Ok(SessionStep::Settled(settlement))
    }

    pub async fn cashout(&self, user_id: UserId) -> Result<Settlement> {
        let current = self.active(user_id).await?;
        if current.revealed.is_empty() {
            return Err(WagerError::NothingToCashOut);
        }

        let snapshot = self.take(user_id).await?;
        let wager = ResolvedWager {
            user_id,
            game_type: GameType::Mines,
            bet_amount: snapshot.bet_amount,
            bet_choice: describe_choice(&snapshot),
            result: format!(
                "cashed out after {} tiles ({}x), mines at [{}]",
                snapshot.revealed.len(),
                snapshot.multiplier,
                list(&snapshot.mines)
            ),
            outcome: Outcome::Win,
            multiplier: snapshot.multiplier,
        };
        let settlement = self.ctx.recorder().settle(wager, Stake::Escrowed).await?;
        info!(
            user_id,
            revealed = snapshot.revealed.len(),
            payout = %settlement.payout,
            "mines cashed out"
        );
        Ok(settlement)
    }

    pub async fn status(&self, user_id: UserId) -> Result<SessionStatus> {
        match self.active(user_id).await {
            Ok(mines) => Ok(SessionStatus::Active(mines.view())),
            Err(WagerError::NoActiveSession) => Ok(SessionStatus::Inactive),
            Err(err) => Err(err),
        }
    }
}
