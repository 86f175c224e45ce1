use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::modules::animal::Sex;

/// Lowest and highest speed a freshly sampled animal can have.
pub const SPEED_RANGE: (u32, u32) = (1, 100);

/// Seeded source for every random decision the engine makes.
///
/// All draws go through this type so a world built from the same seed and
/// config replays the exact same sequence of shuffles and rolls.
#[derive(Debug, Clone)]
pub struct SimRng {
    inner: StdRng,
}

impl SimRng {
    pub fn new(seed: Option<u64>) -> Self {
        let inner = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { inner }
    }

    pub fn sex(&mut self) -> Sex {
        if self.inner.gen_bool(0.5) {
            Sex::Male
        } else {
            Sex::Female
        }
    }

    pub fn speed(&mut self) -> u32 {
        self.inner.gen_range(SPEED_RANGE.0..=SPEED_RANGE.1)
    }

    /// Uniform draw in `1..=100`.
    pub fn percent(&mut self) -> u32 {
        self.inner.gen_range(1..=100)
    }

    /// Uniform integer perturbation in `-bound..=bound`.
    pub fn variance(&mut self, bound: u32) -> i64 {
        let bound = bound as i64;
        self.inner.gen_range(-bound..=bound)
    }

    /// Uniform draw in `0..=max`.
    pub fn up_to(&mut self, max: u32) -> u32 {
        self.inner.gen_range(0..=max)
    }

    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.inner);
    }
}
