/// Counters of the translation cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TlbStatistics {
    /// Number of lookups
    pub accesses: u64,
    pub l1_hits: u64,
    pub l2_hits: u64,
    /// Lookups that missed both tiers and fell through to the page table
    pub misses: u64,
}

impl TlbStatistics {
    fn rate(count: u64, total: u64) -> f64 {
        if total == 0 {
            0.0
        } else {
            count as f64 / total as f64
        }
    }

    pub fn hits(&self) -> u64 {
        self.l1_hits + self.l2_hits
    }

    pub fn hit_rate(&self) -> f64 {
        Self::rate(self.hits(), self.accesses)
    }

    pub fn l1_hit_rate(&self) -> f64 {
        Self::rate(self.l1_hits, self.accesses)
    }

    pub fn l2_hit_rate(&self) -> f64 {
        Self::rate(self.l2_hits, self.accesses)
    }
}

#[cfg(test)]
mod test {
    use super::TlbStatistics;

    #[test]
    fn test_rates() {
        assert_eq!(TlbStatistics::default().hit_rate(), 0.0);

        let stats = TlbStatistics {
            accesses: 8,
            l1_hits: 4,
            l2_hits: 2,
            misses: 2,
        };
        assert_eq!(stats.hits(), 6);
        assert_eq!(stats.hit_rate(), 0.75);
        assert_eq!(stats.l1_hit_rate(), 0.5);
        assert_eq!(stats.l2_hit_rate(), 0.25);
    }
}
