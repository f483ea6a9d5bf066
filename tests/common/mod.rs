#![allow(dead_code)]

use rust_decimal::Decimal;
use std::sync::Arc;
use wagerd::application::engine::WageringEngine;
use wagerd::config::EngineConfig;
use wagerd::domain::account::{Amount, UserId};
use wagerd::infrastructure::clock::ManualClock;
use wagerd::infrastructure::random::ScriptedRandom;

/// An in-memory engine whose draws and clock are driven by the test.
pub struct Harness {
    pub engine: Arc<WageringEngine>,
    pub random: ScriptedRandom,
    pub clock: ManualClock,
}

pub fn harness(draws: &[f64]) -> Harness {
    harness_with(EngineConfig::default(), draws)
}

pub fn harness_with(config: EngineConfig, draws: &[f64]) -> Harness {
    let random = ScriptedRandom::new(draws.iter().copied());
    let clock = ManualClock::default();
    let engine = WageringEngine::in_memory(config)
        .with_random(Box::new(random.clone()))
        .with_clock(Box::new(clock.clone()));
    Harness {
        engine: Arc::new(engine),
        random,
        clock,
    }
}

pub fn amount(value: Decimal) -> Amount {
    Amount::new(value).unwrap()
}

impl Harness {
    pub async fn fund(&self, user_id: UserId, value: Decimal) {
        self.engine.deposit(user_id, amount(value)).await.unwrap();
    }

    pub async fn balance(&self, user_id: UserId) -> Decimal {
        self.engine.get_balance(user_id).await.unwrap().amount.value()
    }
}
