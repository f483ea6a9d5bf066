use super::engine::GameContext;
use super::settlement::{ResolvedWager, Stake};
use crate::domain::account::{Amount, UserId};
use crate::domain::game::SingleShotBet;
use crate::domain::odds;
use crate::domain::session::Settlement;
use crate::domain::transaction::Outcome;
use crate::error::Result;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::info;

/// Realized outcome of one single-shot draw.
#[derive(Debug, Clone, PartialEq)]
pub struct Draw {
    pub result: String,
    pub outcome: Outcome,
    pub multiplier: Decimal,
}

/// Maps a uniform draw onto the outcome of `bet`.
pub fn resolve_draw(bet: &SingleShotBet, draw: f64) -> Draw {
    let (result, won, multiplier) = match bet {
        SingleShotBet::CoinFlip { choice } => {
            let side = odds::coin_flip(draw);
            (side.to_string(), side == *choice, dec!(2))
        }
        SingleShotBet::Roulette { choice } => {
            let pocket = odds::roulette_pocket(draw);
            (
                pocket.to_string(),
                choice.wins(pocket),
                choice.payout_multiplier(),
            )
        }
        SingleShotBet::Dice { bet } => {
            let roll = odds::dice_roll(draw);
            (roll.to_string(), bet.wins(roll), bet.multiplier())
        }
    };
    Draw {
        result,
        outcome: if won { Outcome::Win } else { Outcome::Loss },
        multiplier,
    }
}

/// Coin Flip, Roulette and Dice: validate, draw, settle in one ledger write.
pub struct SingleShotResolver<'a> {
    ctx: &'a GameContext,
}

impl<'a> SingleShotResolver<'a> {
    pub fn new(ctx: &'a GameContext) -> Self {
        Self { ctx }
    }

    pub async fn resolve(
        &self,
        user_id: UserId,
        bet_amount: Amount,
        bet: SingleShotBet,
    ) -> Result<Settlement> {
        self.ctx.ensure_funds(user_id, bet_amount).await?;

        let draw = resolve_draw(&bet, self.ctx.draw());
        let wager = ResolvedWager {
            user_id,
            game_type: bet.game_type(),
            bet_amount,
            bet_choice: bet.to_string(),
            result: draw.result,
            outcome: draw.outcome,
            multiplier: draw.multiplier,
        };
        let settlement = self.ctx.recorder().settle(wager, Stake::Unpaid).await?;
        info!(
            user_id,
            game = %settlement.game_type,
            outcome = ?settlement.outcome,
            payout = %settlement.payout,
            "single-shot bet resolved"
        );
        Ok(settlement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::game::{CoinSide, DiceBet, DiceDirection, RouletteChoice};

    #[test]
    fn test_coin_flip_draws() {
        let bet = SingleShotBet::CoinFlip {
            choice: CoinSide::Heads,
        };
        let win = resolve_draw(&bet, 0.2);
        assert_eq!(win.outcome, Outcome::Win);
        assert_eq!(win.result, "heads");
        assert_eq!(win.multiplier, dec!(2));

        let loss = resolve_draw(&bet, 0.8);
        assert_eq!(loss.outcome, Outcome::Loss);
        assert_eq!(loss.result, "tails");
    }

    #[test]
    fn test_roulette_draws() {
        let straight = SingleShotBet::Roulette {
            choice: RouletteChoice::Number(0),
        };
        let hit = resolve_draw(&straight, 0.0);
        assert_eq!(hit.outcome, Outcome::Win);
        assert_eq!(hit.result, "0");
        assert_eq!(hit.multiplier, dec!(36));

        let even = SingleShotBet::Roulette {
            choice: RouletteChoice::Even,
        };
        assert_eq!(resolve_draw(&even, 0.0).outcome, Outcome::Loss);
    }

    #[test]
    fn test_dice_draws() {
        let bet = SingleShotBet::Dice {
            bet: DiceBet::new(DiceDirection::Under, 50).unwrap(),
        };
        let win = resolve_draw(&bet, 0.49);
        assert_eq!(win.result, "49");
        assert_eq!(win.outcome, Outcome::Win);
        assert_eq!(win.multiplier, dec!(1.96));

        assert_eq!(resolve_draw(&bet, 0.5).outcome, Outcome::Loss);
    }
}
