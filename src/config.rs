use crate::domain::account::{AMOUNT_SCALE, Amount, DEFAULT_CURRENCY};
use crate::error::{Result, WagerError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::path::Path;

/// Upper bounds for tunables whose products feed payouts and grids.
pub const MAX_TOWER_LEVELS: u8 = 20;
pub const MAX_MINES_GRID_SIZE: u8 = 100;
const MAX_STAKE_LIMIT: Decimal = dec!(1000000000000);
const MAX_CRASH_POINT: Decimal = dec!(1000000);
const MAX_CRASH_GROWTH: Decimal = dec!(1000);

/// Tunables for the wagering engine. Every field has a default, so a TOML file
/// only needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Currency reported on balance rows.
    pub currency: String,
    /// Largest stake accepted for any single wager.
    pub max_bet: Decimal,
    /// Largest single deposit accepted.
    pub max_deposit: Decimal,
    pub tower_max_levels: u8,
    /// Crash multiplier growth per elapsed second.
    pub crash_growth_per_second: Decimal,
    pub crash_min_point: Decimal,
    pub crash_max_point: Decimal,
    pub mines_grid_size: u8,
    /// Simulated wait for an external deposit confirmation. No lock is held
    /// while it elapses.
    pub deposit_confirmation_delay_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            currency: DEFAULT_CURRENCY.to_string(),
            max_bet: dec!(10000),
            max_deposit: dec!(1000000),
            tower_max_levels: 8,
            crash_growth_per_second: dec!(0.1),
            crash_min_point: dec!(1.01),
            crash_max_point: dec!(1000),
            mines_grid_size: 25,
            deposit_confirmation_delay_ms: 0,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(raw).map_err(|e| WagerError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            WagerError::ConfigError(format!(
                "cannot read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.currency.trim().is_empty() {
            return Err(WagerError::ConfigError("currency must not be empty".into()));
        }
        check_limit("max_bet", self.max_bet, MAX_STAKE_LIMIT)?;
        check_limit("max_deposit", self.max_deposit, Decimal::MAX)?;
        if !(1..=MAX_TOWER_LEVELS).contains(&self.tower_max_levels) {
            return Err(WagerError::ConfigError(format!(
                "tower_max_levels must be between 1 and {}",
                MAX_TOWER_LEVELS
            )));
        }
        if self.crash_growth_per_second <= Decimal::ZERO
            || self.crash_growth_per_second > MAX_CRASH_GROWTH
        {
            return Err(WagerError::ConfigError(format!(
                "crash_growth_per_second must be positive and at most {}",
                MAX_CRASH_GROWTH
            )));
        }
        if self.crash_min_point <= Decimal::ONE
            || self.crash_min_point > self.crash_max_point
            || self.crash_max_point > MAX_CRASH_POINT
        {
            return Err(WagerError::ConfigError(format!(
                "crash points must satisfy 1 < crash_min_point <= crash_max_point <= {}",
                MAX_CRASH_POINT
            )));
        }
        if !(2..=MAX_MINES_GRID_SIZE).contains(&self.mines_grid_size) {
            return Err(WagerError::ConfigError(format!(
                "mines_grid_size must be between 2 and {}",
                MAX_MINES_GRID_SIZE
            )));
        }
        Ok(())
    }

    /// Rejects stakes above `max_bet`.
    pub fn check_stake(&self, amount: Amount) -> Result<()> {
        if amount.value() > self.max_bet {
            return Err(WagerError::ValidationError(format!(
                "Bet amount {} exceeds the maximum of {}",
                amount, self.max_bet
            )));
        }
        Ok(())
    }

    /// Rejects deposits above `max_deposit`.
    pub fn check_deposit(&self, amount: Amount) -> Result<()> {
        if amount.value() > self.max_deposit {
            return Err(WagerError::ValidationError(format!(
                "Deposit amount {} exceeds the maximum of {}",
                amount, self.max_deposit
            )));
        }
        Ok(())
    }
}

fn check_limit(name: &str, value: Decimal, ceiling: Decimal) -> Result<()> {
    if value <= Decimal::ZERO || value > ceiling || value.normalize().scale() > AMOUNT_SCALE {
        return Err(WagerError::ConfigError(format!(
            "{} must be positive, at most {}, with at most 8 fractional digits",
            name, ceiling
        )));
    }
    Ok(())
}
