use crate::{
    address::{Pid, Vpn},
    modules::eviction_policy::EvictionPolicyModule,
};

use super::TlbEntry;

/// Part of the L2 tier that holds the entries of a single process
pub(super) struct L2Partition {
    owner: Option<Pid>,
    entries: Vec<TlbEntry>,
    last_used: u64,
}

impl L2Partition {
    pub(super) fn new() -> Self {
        Self {
            owner: None,
            entries: Vec::new(),
            last_used: 0,
        }
    }

    pub(super) fn owner(&self) -> Option<Pid> {
        self.owner
    }

    pub(super) fn last_used(&self) -> u64 {
        self.last_used
    }

    pub(super) fn entries(&self) -> &[TlbEntry] {
        &self.entries
    }

    /// Returns a copy of the entry covering `vpn` and marks it as used
    pub(super) fn find(&mut self, vpn: Vpn, now: u64) -> Option<TlbEntry> {
        let owner = self.owner?;
        let entry = self
            .entries
            .iter_mut()
            .find(|entry| entry.covers(owner, vpn))?;

        entry.last_used = now;
        self.last_used = now;
        Some(*entry)
    }

    pub(super) fn insert<P: EvictionPolicyModule>(
        &mut self,
        entry: TlbEntry,
        capacity: usize,
        now: u64,
        policy: &mut P,
    ) {
        debug_assert_eq!(self.owner, Some(entry.pid));
        self.last_used = now;

        if let Some(existing) = self.entries.iter_mut().find(|e| e.vpn == entry.vpn) {
            *existing = entry;
            return;
        }

        if self.entries.len() < capacity {
            self.entries.push(entry);
            return;
        }

        let stamps: Vec<u64> = self.entries.iter().map(|e| e.last_used).collect();
        let victim = policy.choose_victim(&stamps);
        self.entries[victim] = entry;
    }

    pub(super) fn remove(&mut self, vpn: Vpn) {
        if let Some(owner) = self.owner {
            self.entries.retain(|entry| !entry.covers(owner, vpn));
        }
    }

    /// Clears all entries and binds the partition to `pid`
    pub(super) fn rebind(&mut self, pid: Pid) {
        self.entries.clear();
        self.owner = Some(pid);
    }

    /// Clears all entries and unbinds the partition
    pub(super) fn release(&mut self) {
        self.entries.clear();
        self.owner = None;
        self.last_used = 0;
    }
}
