//! Mappings from uniform draws in `[0, 1)` to game outcomes.
//!
//! Everything here is pure. The engine pulls draws from a `RandomSource` and
//! hands them to these functions, which keeps every game reproducible under a
//! scripted source.

use super::game::{CoinSide, Difficulty, ROULETTE_MAX};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal_macros::dec;

/// Maps a draw onto `0..n`.
pub fn index_from_draw(draw: f64, n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    let draw = draw.clamp(0.0, 1.0);
    ((draw * n as f64) as usize).min(n - 1)
}

pub fn coin_flip(draw: f64) -> CoinSide {
    if draw < 0.5 {
        CoinSide::Heads
    } else {
        CoinSide::Tails
    }
}

pub fn roulette_pocket(draw: f64) -> u8 {
    index_from_draw(draw, usize::from(ROULETTE_MAX) + 1) as u8
}

pub fn dice_roll(draw: f64) -> u8 {
    index_from_draw(draw, 100) as u8
}

/// Whether a tower level is cleared at the given difficulty.
pub fn tower_step(draw: f64, difficulty: Difficulty) -> bool {
    draw < difficulty.win_probability()
}

/// Crash point for a session: `U^-0.04`, truncated to cents and clamped to
/// `[min, max]`.
pub fn crash_point(draw: f64, min: Decimal, max: Decimal) -> Decimal {
    let u = if draw > 0.0 { draw } else { f64::MIN_POSITIVE };
    let raw = u.powf(-0.04);
    let point = Decimal::from_f64(raw)
        .map(|p| p.round_dp_with_strategy(2, RoundingStrategy::ToZero))
        .unwrap_or(max);
    point.clamp(min, max)
}

/// Multiplier shown `elapsed_ms` after a crash session started.
pub fn crash_multiplier(elapsed_ms: i64, growth_per_second: Decimal) -> Decimal {
    let elapsed = Decimal::from(elapsed_ms.max(0)) / dec!(1000);
    Decimal::ONE.saturating_add(elapsed.saturating_mul(growth_per_second))
}

/// `(grid / (grid - mines))^revealed`, computed from scratch each time.
///
/// Returns `None` when the parameters describe an impossible board or the
/// result does not fit a `Decimal`.
pub fn mines_multiplier(grid_size: u8, mine_count: u8, revealed: usize) -> Option<Decimal> {
    if mine_count == 0 || mine_count >= grid_size {
        return None;
    }
    let ratio = Decimal::from(grid_size) / Decimal::from(grid_size - mine_count);
    (0..revealed).try_fold(Decimal::ONE, |acc, _| acc.checked_mul(ratio))
}

/// Picks `mine_count` distinct tiles out of `grid_size` with a partial
/// Fisher-Yates shuffle. The result is sorted.
pub fn place_mines(grid_size: u8, mine_count: u8, mut draw: impl FnMut() -> f64) -> Vec<u8> {
    let mut tiles: Vec<u8> = (0..grid_size).collect();
    let picks = usize::from(mine_count).min(tiles.len());
    for i in 0..picks {
        let j = i + index_from_draw(draw(), tiles.len() - i);
        tiles.swap(i, j);
    }
    let mut mines = tiles[..picks].to_vec();
    mines.sort_unstable();
    mines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_from_draw_bounds() {
        assert_eq!(index_from_draw(0.0, 37), 0);
        assert_eq!(index_from_draw(0.999_999, 37), 36);
        assert_eq!(index_from_draw(1.0, 37), 36);
        assert_eq!(roulette_pocket(0.5), 18);
        assert_eq!(dice_roll(0.421), 42);
    }

    #[test]
    fn test_coin_flip_threshold() {
        assert_eq!(coin_flip(0.0), CoinSide::Heads);
        assert_eq!(coin_flip(0.4999), CoinSide::Heads);
        assert_eq!(coin_flip(0.5), CoinSide::Tails);
    }

    #[test]
    fn test_tower_step_probabilities() {
        assert!(tower_step(0.65, Difficulty::Easy));
        assert!(!tower_step(0.66, Difficulty::Easy));
        assert!(tower_step(0.32, Difficulty::Hard));
        assert!(!tower_step(0.5, Difficulty::Medium));
    }

    #[test]
    fn test_crash_point_clamps() {
        let min = dec!(1.01);
        let max = dec!(1000);
        assert_eq!(crash_point(0.99, min, max), min);
        assert_eq!(crash_point(0.0, min, max), max);
        // 0.5^-0.04 = 1.0281..
        assert_eq!(crash_point(0.5, min, max), dec!(1.02));
        let mid = crash_point(1e-20, min, max);
        assert!(mid > min && mid < max);
    }

    #[test]
    fn test_crash_multiplier_growth() {
        let growth = dec!(0.1);
        assert_eq!(crash_multiplier(0, growth), dec!(1));
        assert_eq!(crash_multiplier(100, growth), dec!(1.01));
        assert_eq!(crash_multiplier(10_000, growth), dec!(2));
        assert_eq!(crash_multiplier(-50, growth), dec!(1));
        assert_eq!(crash_multiplier(i64::MAX, Decimal::MAX), Decimal::MAX);
    }

    #[test]
    fn test_mines_multiplier_is_recomputed_power() {
        assert_eq!(mines_multiplier(25, 5, 0), Some(dec!(1)));
        assert_eq!(mines_multiplier(25, 5, 1), Some(dec!(1.25)));
        assert_eq!(mines_multiplier(25, 5, 3), Some(dec!(1.953125)));
        assert_eq!(mines_multiplier(25, 24, 1), Some(dec!(25)));
        assert_eq!(mines_multiplier(25, 0, 1), None);
        assert_eq!(mines_multiplier(25, 25, 1), None);
    }

    #[test]
    fn test_place_mines_distinct() {
        let draws = [0.9, 0.1, 0.5, 0.99, 0.0, 0.3];
        let mut it = draws.iter().copied().cycle();
        let mines = place_mines(25, 6, || it.next().unwrap_or(0.0));
        assert_eq!(mines.len(), 6);
        let mut deduped = mines.clone();
        deduped.dedup();
        assert_eq!(deduped, mines);
        assert!(mines.iter().all(|m| *m < 25));
    }

    #[test]
    fn test_place_mines_zero_draws_take_first_tiles() {
        let mines = place_mines(25, 5, || 0.0);
        assert_eq!(mines, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_place_mines_fills_board() {
        let mines = place_mines(25, 24, || 0.7);
        assert_eq!(mines.len(), 24);
    }
}
