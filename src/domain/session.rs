use super::account::{Amount, payout_for};
use super::game::{Difficulty, GameType, SessionGame};
use super::odds;
use super::transaction::Outcome;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Tower climb in progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TowerSession {
    pub bet_amount: Amount,
    pub level: u8,
    pub multiplier: Decimal,
    /// Difficulty chosen for each cleared level, bottom first.
    pub path: Vec<Difficulty>,
    pub started_at: DateTime<Utc>,
}

impl TowerSession {
    pub fn new(bet_amount: Amount, started_at: DateTime<Utc>) -> Self {
        Self {
            bet_amount,
            level: 0,
            multiplier: Decimal::ONE,
            path: Vec::new(),
            started_at,
        }
    }

    /// Moves one level up. Returns `None`, leaving the session untouched, if the
    /// multiplier would overflow.
    pub fn climb(&mut self, difficulty: Difficulty) -> Option<Decimal> {
        let multiplier = self.multiplier.checked_mul(difficulty.multiplier())?;
        let level = self.level.checked_add(1)?;
        self.level = level;
        self.multiplier = multiplier;
        self.path.push(difficulty);
        Some(multiplier)
    }

    pub fn view(&self, max_levels: u8) -> SessionView {
        SessionView::Tower {
            bet_amount: self.bet_amount.value(),
            level: self.level,
            multiplier: self.multiplier,
            potential_payout: payout_for(self.bet_amount, self.multiplier)
                .unwrap_or(Decimal::MAX),
            max_level_reached: self.level >= max_levels,
        }
    }
}

/// Crash round in progress. The crash point is fixed at start and never shown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrashSession {
    pub bet_amount: Amount,
    pub crash_point: Decimal,
    pub started_at: DateTime<Utc>,
}

impl CrashSession {
    pub fn elapsed_ms(&self, now: DateTime<Utc>) -> i64 {
        (now - self.started_at).num_milliseconds().max(0)
    }

    /// Multiplier on the clock at `now`, not yet capped at the crash point.
    pub fn multiplier_at(&self, now: DateTime<Utc>, growth_per_second: Decimal) -> Decimal {
        odds::crash_multiplier(self.elapsed_ms(now), growth_per_second)
    }

    pub fn has_crashed(&self, now: DateTime<Utc>, growth_per_second: Decimal) -> bool {
        self.multiplier_at(now, growth_per_second) >= self.crash_point
    }

    pub fn view(&self, now: DateTime<Utc>, growth_per_second: Decimal) -> SessionView {
        let multiplier = self
            .multiplier_at(now, growth_per_second)
            .min(self.crash_point);
        SessionView::Crash {
            bet_amount: self.bet_amount.value(),
            multiplier,
            elapsed_ms: self.elapsed_ms(now),
        }
    }
}

/// Mines board in progress. Mine positions stay server side until the session ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinesSession {
    pub bet_amount: Amount,
    pub grid_size: u8,
    pub mines: Vec<u8>,
    pub revealed: Vec<u8>,
    pub multiplier: Decimal,
    pub started_at: DateTime<Utc>,
}

impl MinesSession {
    pub fn mine_count(&self) -> u8 {
        self.mines.len() as u8
    }

    pub fn is_mine(&self, tile: u8) -> bool {
        self.mines.contains(&tile)
    }

    pub fn is_revealed(&self, tile: u8) -> bool {
        self.revealed.contains(&tile)
    }

    /// Marks a safe tile and recomputes the multiplier from the revealed count.
    /// Returns `None` if the multiplier no longer fits a `Decimal`.
    pub fn reveal_safe(&mut self, tile: u8) -> Option<Decimal> {
        let multiplier =
            odds::mines_multiplier(self.grid_size, self.mine_count(), self.revealed.len() + 1)?;
        self.revealed.push(tile);
        self.multiplier = multiplier;
        Some(multiplier)
    }

    pub fn view(&self) -> SessionView {
        SessionView::Mines {
            bet_amount: self.bet_amount.value(),
            mine_count: self.mine_count(),
            revealed: self.revealed.clone(),
            multiplier: self.multiplier,
            potential_payout: payout_for(self.bet_amount, self.multiplier)
                .unwrap_or(Decimal::MAX),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "game", rename_all = "lowercase")]
pub enum Session {
    Tower(TowerSession),
    Crash(CrashSession),
    Mines(MinesSession),
}

impl Session {
    pub fn game(&self) -> SessionGame {
        match self {
            Session::Tower(_) => SessionGame::Tower,
            Session::Crash(_) => SessionGame::Crash,
            Session::Mines(_) => SessionGame::Mines,
        }
    }

    pub fn bet_amount(&self) -> Amount {
        match self {
            Session::Tower(s) => s.bet_amount,
            Session::Crash(s) => s.bet_amount,
            Session::Mines(s) => s.bet_amount,
        }
    }
}

/// What a player may see of an active session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "game", rename_all = "lowercase")]
pub enum SessionView {
    Tower {
        bet_amount: Decimal,
        level: u8,
        multiplier: Decimal,
        potential_payout: Decimal,
        max_level_reached: bool,
    },
    Crash {
        bet_amount: Decimal,
        multiplier: Decimal,
        elapsed_ms: i64,
    },
    Mines {
        bet_amount: Decimal,
        mine_count: u8,
        revealed: Vec<u8>,
        multiplier: Decimal,
        potential_payout: Decimal,
    },
}

impl SessionView {
    pub fn multiplier(&self) -> Decimal {
        match self {
            SessionView::Tower { multiplier, .. }
            | SessionView::Crash { multiplier, .. }
            | SessionView::Mines { multiplier, .. } => *multiplier,
        }
    }
}

/// The final result of a wager, returned once it is settled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub game_type: GameType,
    pub bet_amount: Decimal,
    pub bet_choice: String,
    pub result: String,
    pub outcome: Outcome,
    pub multiplier: Decimal,
    pub payout: Decimal,
    pub balance: Decimal,
}

impl Settlement {
    pub fn is_win(&self) -> bool {
        self.outcome == Outcome::Win
    }
}

/// Result of advancing a session by one move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum SessionStep {
    Active(SessionView),
    Settled(Settlement),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum SessionStatus {
    Inactive,
    Active(SessionView),
    /// A crash round whose crash point was reached before the poll. The loss
    /// has already been settled by the time this is returned.
    Crashed(Settlement),
}

impl SessionStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, SessionStatus::Active(_))
    }

    pub fn crashed(&self) -> bool {
        matches!(self, SessionStatus::Crashed(_))
    }
}
