use rand::{rngs::SmallRng, Rng, RngCore, SeedableRng};

use super::EvictionPolicyModule;

const DEFAULT_SEED: u64 = 0x5EED_CAFE_F00D_0001;

/// Replaces a uniformly random slot.
///
/// Any generator can be plugged in, so tests can replay a fixed sequence.
pub struct RandomEvictionPolicyModule<R: RngCore = SmallRng> {
    rng: R,
}

impl<R: RngCore> RandomEvictionPolicyModule<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RandomEvictionPolicyModule<SmallRng> {
    pub fn seeded(seed: u64) -> Self {
        Self::new(SmallRng::seed_from_u64(seed))
    }
}

impl Default for RandomEvictionPolicyModule<SmallRng> {
    fn default() -> Self {
        Self::seeded(DEFAULT_SEED)
    }
}

impl<R: RngCore> EvictionPolicyModule for RandomEvictionPolicyModule<R> {
    fn choose_victim(&mut self, stamps: &[u64]) -> usize {
        debug_assert!(!stamps.is_empty());
        self.rng.gen_range(0..stamps.len())
    }
}
