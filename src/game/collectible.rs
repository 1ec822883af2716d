//! Collectible spawning

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::state::Collectible;
use super::{MAX_X, MAX_Y, MIN_X, MIN_Y};

/// Lowest reward a collectible can carry
pub const MIN_VALUE: u32 = 1;
/// Highest reward a collectible can carry
pub const MAX_VALUE: u32 = 5;

/// Sole owner of the collectible id counter
#[derive(Debug)]
pub struct CollectibleGenerator {
    next_id: u64,
    rng: ChaCha8Rng,
}

impl CollectibleGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            next_id: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Create a collectible at a random in-bounds spot with a fresh id
    pub fn create(&mut self) -> Collectible {
        let id = self.next_id;
        self.next_id += 1;

        Collectible {
            id,
            x: self.rng.gen_range(MIN_X..MAX_X),
            y: self.rng.gen_range(MIN_Y..MAX_Y),
            value: self.rng.gen_range(MIN_VALUE..=MAX_VALUE),
        }
    }

    /// Number of ids handed out so far
    pub fn issued(&self) -> u64 {
        self.next_id
    }
}
