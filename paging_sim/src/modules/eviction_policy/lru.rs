use super::EvictionPolicyModule;

/// Replaces the slot that was used least recently
#[derive(Default)]
pub struct LruEvictionPolicyModule;

impl EvictionPolicyModule for LruEvictionPolicyModule {
    fn choose_victim(&mut self, stamps: &[u64]) -> usize {
        debug_assert!(!stamps.is_empty());

        // min_by_key returns the first minimum, ties go to the lower index
        stamps
            .iter()
            .enumerate()
            .min_by_key(|(_, stamp)| **stamp)
            .map(|(index, _)| index)
            .unwrap_or(0)
    }
}
