use crate::domain::ports::RandomSource;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

/// Draws from the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_unit(&self) -> f64 {
        rand::thread_rng().r#gen::<f64>()
    }
}

/// Reproducible draws from a fixed seed.
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_unit(&self) -> f64 {
        self.rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .r#gen::<f64>()
    }
}

/// Replays a queue of draws. Once the queue is empty the last value is repeated
/// (or `0.0` if nothing was ever queued).
///
/// Clones share the queue, so a test can keep a handle and push more draws after
/// handing the source to an engine.
#[derive(Debug, Default, Clone)]
pub struct ScriptedRandom {
    inner: Arc<Mutex<ScriptState>>,
}

#[derive(Debug, Default)]
struct ScriptState {
    queue: VecDeque<f64>,
    last: f64,
}

impl ScriptedRandom {
    pub fn new(draws: impl IntoIterator<Item = f64>) -> Self {
        let source = Self::default();
        source.push(draws);
        source
    }

    pub fn push(&self, draws: impl IntoIterator<Item = f64>) {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        state.queue.extend(draws);
    }

    pub fn remaining(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .queue
            .len()
    }
}

impl RandomSource for ScriptedRandom {
    fn next_unit(&self) -> f64 {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(draw) = state.queue.pop_front() {
            state.last = draw;
        }
        state.last
    }
}
