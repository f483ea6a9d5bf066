use crate::application::engine::WageringEngine;
use crate::domain::account::{Amount, BalanceRecord, UserId};
use crate::domain::game::{GameType, SessionGame, SessionMove, SessionParams, SingleShotBet};
use crate::domain::session::{SessionStatus, SessionStep, SessionView, Settlement};
use crate::error::{Result, WagerError};
use serde::{Deserialize, Serialize};
use std::io::Read;

/// One raw row of a command script: `op, user, game, amount, arg`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CommandRecord {
    pub op: String,
    pub user: UserId,
    pub game: Option<String>,
    pub amount: Option<Amount>,
    pub arg: Option<String>,
}

/// A validated request for the wagering engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Deposit {
        user: UserId,
        amount: Amount,
    },
    Bet {
        user: UserId,
        amount: Amount,
        bet: SingleShotBet,
    },
    Start {
        user: UserId,
        amount: Amount,
        params: SessionParams,
    },
    Advance {
        user: UserId,
        step: SessionMove,
    },
    Cashout {
        user: UserId,
        game: SessionGame,
    },
    Status {
        user: UserId,
        game: SessionGame,
    },
}

/// What the engine answered for a command.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CommandOutput {
    Balance(BalanceRecord),
    Settled(Settlement),
    Started(SessionView),
    Step(SessionStep),
    Status(SessionStatus),
}

fn require_amount(record: &CommandRecord) -> Result<Amount> {
    record.amount.ok_or_else(|| {
        WagerError::ValidationError(format!("'{}' requires an amount", record.op))
    })
}

fn require_game(record: &CommandRecord) -> Result<GameType> {
    record
        .game
        .as_deref()
        .ok_or_else(|| WagerError::ValidationError(format!("'{}' requires a game", record.op)))?
        .parse()
}

impl TryFrom<CommandRecord> for Command {
    type Error = WagerError;

    fn try_from(record: CommandRecord) -> Result<Self> {
        let user = record.user;
        let arg = record.arg.as_deref();
        match record.op.to_ascii_lowercase().as_str() {
            "deposit" => Ok(Command::Deposit {
                user,
                amount: require_amount(&record)?,
            }),
            "bet" => {
                let game = require_game(&record)?;
                let choice = arg.ok_or_else(|| {
                    WagerError::ValidationError("'bet' requires a choice".to_string())
                })?;
                Ok(Command::Bet {
                    user,
                    amount: require_amount(&record)?,
                    bet: SingleShotBet::parse(game, choice)?,
                })
            }
            "start" => Ok(Command::Start {
                user,
                amount: require_amount(&record)?,
                params: SessionParams::parse(require_game(&record)?, arg)?,
            }),
            op @ ("play" | "reveal") => {
                let step = SessionMove::parse(require_game(&record)?, arg)?;
                let expected = if op == "play" {
                    SessionGame::Tower
                } else {
                    SessionGame::Mines
                };
                if step.game() != expected {
                    return Err(WagerError::InvalidMove(format!(
                        "'{}' is not a {} move",
                        op,
                        step.game()
                    )));
                }
                Ok(Command::Advance { user, step })
            }
            "cashout" => Ok(Command::Cashout {
                user,
                game: SessionGame::try_from(require_game(&record)?)?,
            }),
            "status" => Ok(Command::Status {
                user,
                game: SessionGame::try_from(require_game(&record)?)?,
            }),
            other => Err(WagerError::ValidationError(format!(
                "Unknown operation '{}'",
                other
            ))),
        }
    }
}

impl Command {
    pub fn user(&self) -> UserId {
        match self {
            Command::Deposit { user, .. }
            | Command::Bet { user, .. }
            | Command::Start { user, .. }
            | Command::Advance { user, .. }
            | Command::Cashout { user, .. }
            | Command::Status { user, .. } => *user,
        }
    }

    pub async fn execute(self, engine: &WageringEngine) -> Result<CommandOutput> {
        match self {
            Command::Deposit { user, amount } => {
                engine.deposit(user, amount).await.map(CommandOutput::Balance)
            }
            Command::Bet { user, amount, bet } => engine
                .place_single_shot_bet(user, amount, bet)
                .await
                .map(CommandOutput::Settled),
            Command::Start {
                user,
                amount,
                params,
            } => engine
                .start_session(user, amount, params)
                .await
                .map(CommandOutput::Started),
            Command::Advance { user, step } => engine
                .advance_session(user, step)
                .await
                .map(CommandOutput::Step),
            Command::Cashout { user, game } => engine
                .cashout_session(user, game)
                .await
                .map(CommandOutput::Settled),
            Command::Status { user, game } => engine
                .session_status(user, game)
                .await
                .map(CommandOutput::Status),
        }
    }
}

/// Reads wagering commands from a CSV source.
///
/// Whitespace is trimmed and short rows are accepted, so optional trailing
/// columns can be left out.
pub struct CommandReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CommandReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily reads and validates commands, one `Result` per row.
    pub fn commands(self) -> impl Iterator<Item = Result<Command>> {
        self.reader.into_deserialize::<CommandRecord>().map(|result| {
            result
                .map_err(WagerError::from)
                .and_then(Command::try_from)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::game::{CoinSide, DiceBet, DiceDirection, Difficulty, RouletteChoice};
    use rust_decimal_macros::dec;

    fn read(data: &str) -> Vec<Result<Command>> {
        CommandReader::new(data.as_bytes()).commands().collect()
    }

    #[test]
    fn test_reader_valid_stream() {
        let data = "op, user, game, amount, arg\n\
                    deposit, 1, , 100.5,\n\
                    bet, 1, coinflip, 10, heads\n\
                    bet, 1, roulette, 1, 17\n\
                    bet, 2, dice, 2, over:50\n\
                    start, 1, mines, 5, 3\n\
                    play, 3, tower, , hard\n\
                    cashout, 1, mines\n\
                    status, 4, crash";
        let results = read(data);

        assert_eq!(results.len(), 8);
        assert_eq!(
            results[0].as_ref().unwrap(),
            &Command::Deposit {
                user: 1,
                amount: Amount::new(dec!(100.5)).unwrap()
            }
        );
        assert_eq!(
            results[1].as_ref().unwrap(),
            &Command::Bet {
                user: 1,
                amount: Amount::new(dec!(10)).unwrap(),
                bet: SingleShotBet::CoinFlip {
                    choice: CoinSide::Heads
                },
            }
        );
        assert!(matches!(
            results[2].as_ref().unwrap(),
            Command::Bet {
                bet: SingleShotBet::Roulette {
                    choice: RouletteChoice::Number(17)
                },
                ..
            }
        ));
        assert!(matches!(
            results[3].as_ref().unwrap(),
            Command::Bet { bet: SingleShotBet::Dice { bet }, .. }
                if *bet == DiceBet::new(DiceDirection::Over, 50).unwrap()
        ));
        assert!(matches!(
            results[4].as_ref().unwrap(),
            Command::Start {
                params: SessionParams::Mines { mine_count: 3 },
                ..
            }
        ));
        assert_eq!(
            results[5].as_ref().unwrap(),
            &Command::Advance {
                user: 3,
                step: SessionMove::Tower {
                    difficulty: Difficulty::Hard
                }
            }
        );
        assert_eq!(
            results[6].as_ref().unwrap(),
            &Command::Cashout {
                user: 1,
                game: SessionGame::Mines
            }
        );
        assert_eq!(results[7].as_ref().unwrap().user(), 4);
    }

    #[test]
    fn test_reader_rejects_bad_rows() {
        let data = "op, user, game, amount, arg\n\
                    withdraw, 1, , 1,\n\
                    deposit, 1, , -1,\n\
                    bet, 1, tower, 1, easy\n\
                    play, 1, mines, , 3\n\
                    reveal, 1, crash, , 3\n\
                    start, 1, dice, 1,\n\
                    deposit, x, , 1,";
        let results = read(data);

        assert_eq!(results.len(), 7);
        assert!(results.iter().all(|r| r.is_err()));
        assert!(matches!(results[3], Err(WagerError::InvalidMove(_))));
        assert!(matches!(results[6], Err(WagerError::CsvError(_))));
    }
}
