use crate::error::{Result, WagerError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    CoinFlip,
    Roulette,
    Dice,
    Tower,
    Crash,
    Mines,
}

impl GameType {
    /// Human readable name used in ledger descriptions.
    pub fn label(&self) -> &'static str {
        match self {
            GameType::CoinFlip => "Coin Flip",
            GameType::Roulette => "Roulette",
            GameType::Dice => "Dice",
            GameType::Tower => "Tower",
            GameType::Crash => "Crash",
            GameType::Mines => "Mines",
        }
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GameType::CoinFlip => "coinflip",
            GameType::Roulette => "roulette",
            GameType::Dice => "dice",
            GameType::Tower => "tower",
            GameType::Crash => "crash",
            GameType::Mines => "mines",
        };
        f.write_str(name)
    }
}

impl FromStr for GameType {
    type Err = WagerError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "coinflip" => Ok(GameType::CoinFlip),
            "roulette" => Ok(GameType::Roulette),
            "dice" => Ok(GameType::Dice),
            "tower" => Ok(GameType::Tower),
            "crash" => Ok(GameType::Crash),
            "mines" => Ok(GameType::Mines),
            _ => Err(WagerError::ValidationError(format!(
                "Unknown game type '{}'",
                s.trim()
            ))),
        }
    }
}

/// The game types that run as multi-step sessions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SessionGame {
    Tower,
    Crash,
    Mines,
}

impl From<SessionGame> for GameType {
    fn from(game: SessionGame) -> Self {
        match game {
            SessionGame::Tower => GameType::Tower,
            SessionGame::Crash => GameType::Crash,
            SessionGame::Mines => GameType::Mines,
        }
    }
}

impl TryFrom<GameType> for SessionGame {
    type Error = WagerError;

    fn try_from(game: GameType) -> Result<Self> {
        match game {
            GameType::Tower => Ok(SessionGame::Tower),
            GameType::Crash => Ok(SessionGame::Crash),
            GameType::Mines => Ok(SessionGame::Mines),
            other => Err(WagerError::ValidationError(format!(
                "{} is not a session game",
                other
            ))),
        }
    }
}

impl fmt::Display for SessionGame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        GameType::from(*self).fmt(f)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CoinSide {
    Heads,
    Tails,
}

impl fmt::Display for CoinSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoinSide::Heads => write!(f, "heads"),
            CoinSide::Tails => write!(f, "tails"),
        }
    }
}

impl FromStr for CoinSide {
    type Err = WagerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "heads" => Ok(CoinSide::Heads),
            "tails" => Ok(CoinSide::Tails),
            other => Err(WagerError::ValidationError(format!(
                "Coin flip choice must be heads or tails, got '{}'",
                other
            ))),
        }
    }
}

/// Red pockets on a single-zero wheel.
pub const RED_NUMBERS: [u8; 18] = [
    1, 3, 5, 7, 9, 12, 14, 16, 18, 19, 21, 23, 25, 27, 30, 32, 34, 36,
];

/// Highest pocket on the wheel.
pub const ROULETTE_MAX: u8 = 36;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RouletteChoice {
    Number(u8),
    Red,
    Black,
    Even,
    Odd,
}

impl RouletteChoice {
    pub fn number(value: u8) -> Result<Self> {
        if value > ROULETTE_MAX {
            return Err(WagerError::ValidationError(format!(
                "Roulette number must be between 0 and {}",
                ROULETTE_MAX
            )));
        }
        Ok(RouletteChoice::Number(value))
    }

    /// Zero is neither red, black, even nor odd.
    pub fn wins(&self, pocket: u8) -> bool {
        match self {
            RouletteChoice::Number(n) => *n == pocket,
            RouletteChoice::Red => RED_NUMBERS.contains(&pocket),
            RouletteChoice::Black => pocket != 0 && !RED_NUMBERS.contains(&pocket),
            RouletteChoice::Even => pocket != 0 && pocket % 2 == 0,
            RouletteChoice::Odd => pocket % 2 == 1,
        }
    }

    /// Total return on a win, stake included.
    pub fn payout_multiplier(&self) -> Decimal {
        match self {
            RouletteChoice::Number(_) => dec!(36),
            _ => dec!(2),
        }
    }
}

impl fmt::Display for RouletteChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouletteChoice::Number(n) => write!(f, "{}", n),
            RouletteChoice::Red => write!(f, "red"),
            RouletteChoice::Black => write!(f, "black"),
            RouletteChoice::Even => write!(f, "even"),
            RouletteChoice::Odd => write!(f, "odd"),
        }
    }
}

impl FromStr for RouletteChoice {
    type Err = WagerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "red" => Ok(RouletteChoice::Red),
            "black" => Ok(RouletteChoice::Black),
            "even" => Ok(RouletteChoice::Even),
            "odd" => Ok(RouletteChoice::Odd),
            other => {
                let value = other.parse::<u8>().map_err(|_| {
                    WagerError::ValidationError(format!("Invalid roulette choice '{}'", other))
                })?;
                RouletteChoice::number(value)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DiceDirection {
    Over,
    Under,
}

impl fmt::Display for DiceDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiceDirection::Over => write!(f, "over"),
            DiceDirection::Under => write!(f, "under"),
        }
    }
}

/// Retained share of every dice wager is `1 - DICE_RETURN`.
pub const DICE_RETURN: Decimal = dec!(0.98);

/// A validated over/under bet. Rolls are integers in `[0, 100)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiceBet {
    direction: DiceDirection,
    target: u8,
}

impl DiceBet {
    pub fn new(direction: DiceDirection, target: u8) -> Result<Self> {
        let valid = match direction {
            DiceDirection::Over => (1..=98).contains(&target),
            DiceDirection::Under => (2..=99).contains(&target),
        };
        if !valid {
            return Err(WagerError::ValidationError(format!(
                "Dice target {} is not allowed for '{}'",
                target, direction
            )));
        }
        Ok(Self { direction, target })
    }

    pub fn direction(&self) -> DiceDirection {
        self.direction
    }

    pub fn target(&self) -> u8 {
        self.target
    }

    pub fn wins(&self, roll: u8) -> bool {
        match self.direction {
            DiceDirection::Over => roll > self.target,
            DiceDirection::Under => roll < self.target,
        }
    }

    pub fn win_chance(&self) -> Decimal {
        let winning_rolls = match self.direction {
            DiceDirection::Over => 99 - u32::from(self.target),
            DiceDirection::Under => u32::from(self.target),
        };
        Decimal::from(winning_rolls) / dec!(100)
    }

    pub fn multiplier(&self) -> Decimal {
        DICE_RETURN / self.win_chance()
    }
}

impl fmt::Display for DiceBet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.direction, self.target)
    }
}

impl FromStr for DiceBet {
    type Err = WagerError;

    /// Accepts `over:50` or `under 25`.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || {
            WagerError::ValidationError(format!(
                "Dice choice must look like 'over:<target>' or 'under:<target>', got '{}'",
                s.trim()
            ))
        };
        let (direction, target) = s
            .trim()
            .split_once([':', ' '])
            .ok_or_else(invalid)?;
        let direction = match direction.trim().to_lowercase().as_str() {
            "over" => DiceDirection::Over,
            "under" => DiceDirection::Under,
            _ => return Err(invalid()),
        };
        let target = target.trim().parse::<u8>().map_err(|_| invalid())?;
        DiceBet::new(direction, target)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn win_probability(&self) -> f64 {
        match self {
            Difficulty::Easy => 0.66,
            Difficulty::Medium => 0.50,
            Difficulty::Hard => 0.33,
        }
    }

    /// Factor applied to the running multiplier on every cleared level.
    pub fn multiplier(&self) -> Decimal {
        match self {
            Difficulty::Easy => dec!(1.5),
            Difficulty::Medium => dec!(2.0),
            Difficulty::Hard => dec!(3.0),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = WagerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(WagerError::ValidationError(format!(
                "Difficulty must be easy, medium or hard, got '{}'",
                other
            ))),
        }
    }
}

/// A one-request wager with its game-specific selection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "game", rename_all = "lowercase")]
pub enum SingleShotBet {
    CoinFlip { choice: CoinSide },
    Roulette { choice: RouletteChoice },
    Dice { bet: DiceBet },
}

impl SingleShotBet {
    pub fn parse(game: GameType, choice: &str) -> Result<Self> {
        match game {
            GameType::CoinFlip => Ok(SingleShotBet::CoinFlip {
                choice: choice.parse()?,
            }),
            GameType::Roulette => Ok(SingleShotBet::Roulette {
                choice: choice.parse()?,
            }),
            GameType::Dice => Ok(SingleShotBet::Dice {
                bet: choice.parse()?,
            }),
            other => Err(WagerError::ValidationError(format!(
                "{} is played as a session, not a single bet",
                other
            ))),
        }
    }

    pub fn game_type(&self) -> GameType {
        match self {
            SingleShotBet::CoinFlip { .. } => GameType::CoinFlip,
            SingleShotBet::Roulette { .. } => GameType::Roulette,
            SingleShotBet::Dice { .. } => GameType::Dice,
        }
    }
}

impl fmt::Display for SingleShotBet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SingleShotBet::CoinFlip { choice } => choice.fmt(f),
            SingleShotBet::Roulette { choice } => choice.fmt(f),
            SingleShotBet::Dice { bet } => bet.fmt(f),
        }
    }
}

/// Parameters for opening a session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "game", rename_all = "lowercase")]
pub enum SessionParams {
    Tower,
    Crash,
    Mines { mine_count: u8 },
}

impl SessionParams {
    pub fn parse(game: GameType, arg: Option<&str>) -> Result<Self> {
        match SessionGame::try_from(game)? {
            SessionGame::Tower => Ok(SessionParams::Tower),
            SessionGame::Crash => Ok(SessionParams::Crash),
            SessionGame::Mines => {
                let raw = arg.map(str::trim).unwrap_or_default();
                let mine_count = raw.parse::<u8>().map_err(|_| {
                    WagerError::ValidationError(format!("Invalid mine count '{}'", raw))
                })?;
                Ok(SessionParams::Mines { mine_count })
            }
        }
    }

    pub fn game(&self) -> SessionGame {
        match self {
            SessionParams::Tower => SessionGame::Tower,
            SessionParams::Crash => SessionGame::Crash,
            SessionParams::Mines { .. } => SessionGame::Mines,
        }
    }
}

/// One step inside an active session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "game", rename_all = "lowercase")]
pub enum SessionMove {
    Tower { difficulty: Difficulty },
    Mines { tile: u8 },
}

impl SessionMove {
    pub fn parse(game: GameType, arg: Option<&str>) -> Result<Self> {
        let raw = arg.map(str::trim).unwrap_or_default();
        match SessionGame::try_from(game)? {
            SessionGame::Tower => Ok(SessionMove::Tower {
                difficulty: raw.parse()?,
            }),
            SessionGame::Mines => {
                let tile = raw.parse::<u8>().map_err(|_| {
                    WagerError::ValidationError(format!("Invalid tile index '{}'", raw))
                })?;
                Ok(SessionMove::Mines { tile })
            }
            SessionGame::Crash => Err(WagerError::InvalidMove(
                "crash sessions only support cashout and status".to_string(),
            )),
        }
    }

    pub fn game(&self) -> SessionGame {
        match self {
            SessionMove::Tower { .. } => SessionGame::Tower,
            SessionMove::Mines { .. } => SessionGame::Mines,
        }
    }
}
