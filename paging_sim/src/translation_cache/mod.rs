/*
 *  Copyright (C) 2025  Markus Elias Gerber
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  You should have received a copy of the GNU General Public License
 *  along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

mod partition;
mod statistics;


pub use statistics::TlbStatistics;

use log::trace;

use crate::{
    address::{frames_per_page, vpn_of, Pfn, Pid, VirtualAddress, Vpn},
    memory_config::TlbConfig,
    modules::eviction_policy::EvictionPolicyModule,
};
use partition::L2Partition;

/// Cached translation of one mapping
#[derive(Debug, Clone, Copy)]
pub struct TlbEntry {
    pub pid: Pid,

    /// first vpn of the mapping
    pub vpn: Vpn,

    /// first frame of the mapping
    pub frame: Pfn,

    pub page_size: u64,

    /// logical time of the last hit or insert
    pub(crate) last_used: u64,
}

impl TlbEntry {
    pub fn new(pid: Pid, vpn: Vpn, frame: Pfn, page_size: u64) -> Self {
        Self {
            pid,
            vpn,
            frame,
            page_size,
            last_used: 0,
        }
    }

    /// Checks if this entry translates `vpn` of process `pid`.
    /// Uses the page size of this entry, so every entry covers its whole page.
    #[inline]
    pub fn covers(&self, pid: Pid, vpn: Vpn) -> bool {
        self.pid == pid && vpn.wrapping_sub(self.vpn) < frames_per_page(self.page_size)
    }

    /// Frame backing `vpn`, which has to be covered by this entry
    #[inline]
    pub fn frame_for(&self, vpn: Vpn) -> Pfn {
        self.frame + (vpn - self.vpn)
    }
}

/// Two level translation cache in front of the page tables.
///
/// L1 is small, fully associative and shared by all processes. L2 is split
/// into partitions, each one bound to a single process. Both tiers replace
/// entries according to the eviction policy `P` once they are full.
///
/// The cache is never authoritative: whoever frees or swaps out a mapping has
/// to call [`TranslationCache::invalidate`].
pub struct TranslationCache<P: EvictionPolicyModule> {
    l1: Vec<TlbEntry>,
    l1_capacity: usize,

    l2: Vec<L2Partition>,
    l2_capacity_per_partition: usize,

    policy: P,

    /// logical clock, advanced by every lookup and insert
    clock: u64,

    statistics: TlbStatistics,
}

impl<P: EvictionPolicyModule> TranslationCache<P> {
    pub fn new(config: TlbConfig, policy: P) -> Self {
        Self {
            l1: Vec::with_capacity(config.l1_capacity),
            l1_capacity: config.l1_capacity,
            l2: (0..config.l2_partitions).map(|_| L2Partition::new()).collect(),
            l2_capacity_per_partition: config.l2_capacity_per_partition(),
            policy,
            clock: 0,
            statistics: TlbStatistics::default(),
        }
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn partition_of(&self, pid: Pid) -> Option<usize> {
        self.l2.iter().position(|partition| partition.owner() == Some(pid))
    }

    /// Looks up the frame backing `address` of process `pid`.
    ///
    /// L1 is searched first, then the L2 partition of `pid`. A hit in L2 is
    /// promoted to L1. Returns `None` on a miss, the caller then has to walk
    /// the page table and insert the result.
    pub fn lookup(&mut self, pid: Pid, address: VirtualAddress) -> Option<Pfn> {
        let now = self.tick();
        let vpn = vpn_of(address);
        self.statistics.accesses += 1;

        if let Some(entry) = self.l1.iter_mut().find(|entry| entry.covers(pid, vpn)) {
            entry.last_used = now;
            self.statistics.l1_hits += 1;
            trace!("L1 hit for {:#x} of process {}", address, pid);
            return Some(entry.frame_for(vpn));
        }

        if let Some(index) = self.partition_of(pid) {
            if let Some(entry) = self.l2[index].find(vpn, now) {
                self.statistics.l2_hits += 1;
                trace!("L2 hit for {:#x} of process {}", address, pid);
                self.insert_l1(entry);
                return Some(entry.frame_for(vpn));
            }
        }

        self.statistics.misses += 1;
        trace!("TLB miss for {:#x} of process {}", address, pid);
        None
    }

    /// Inserts `entry` into both tiers
    pub fn insert(&mut self, entry: TlbEntry) {
        self.insert_l1(entry);
        self.insert_l2(entry);
    }

    pub fn insert_l1(&mut self, mut entry: TlbEntry) {
        entry.last_used = self.tick();

        if let Some(existing) = self
            .l1
            .iter_mut()
            .find(|existing| existing.pid == entry.pid && existing.vpn == entry.vpn)
        {
            *existing = entry;
            return;
        }

        if self.l1.len() < self.l1_capacity {
            self.l1.push(entry);
            return;
        }

        let stamps: Vec<u64> = self.l1.iter().map(|e| e.last_used).collect();
        let victim = self.policy.choose_victim(&stamps);
        trace!(
            "L1 full, replacing vpn {:#x} of process {}",
            self.l1[victim].vpn,
            self.l1[victim].pid
        );
        self.l1[victim] = entry;
    }

    pub fn insert_l2(&mut self, mut entry: TlbEntry) {
        let now = self.tick();
        entry.last_used = now;

        let index = match self.partition_of(entry.pid) {
            Some(index) => index,
            None => self.bind_partition(entry.pid),
        };

        self.l2[index].insert(
            entry,
            self.l2_capacity_per_partition,
            now,
            &mut self.policy,
        );
    }

    /// Binds a partition to `pid`, evicting another process if all partitions are in use
    fn bind_partition(&mut self, pid: Pid) -> usize {
        let index = match self.l2.iter().position(|partition| partition.owner().is_none()) {
            Some(index) => index,
            None => {
                let stamps: Vec<u64> = self.l2.iter().map(|p| p.last_used()).collect();
                let victim = self.policy.choose_victim(&stamps);
                trace!(
                    "L2 full, evicting partition of process {:?}",
                    self.l2[victim].owner()
                );
                victim
            }
        };

        self.l2[index].rebind(pid);
        index
    }

    /// Removes every cached translation of `vpn` of process `pid`
    pub fn invalidate(&mut self, pid: Pid, vpn: Vpn) {
        self.l1.retain(|entry| !entry.covers(pid, vpn));
        if let Some(index) = self.partition_of(pid) {
            self.l2[index].remove(vpn);
        }
    }

    pub fn flush_l1(&mut self) {
        self.l1.clear();
    }

    pub fn flush_l2(&mut self) {
        for partition in self.l2.iter_mut() {
            partition.release();
        }
    }

    /// Drops all entries of `pid` from both tiers and releases its L2 partition
    pub fn flush_process(&mut self, pid: Pid) {
        self.l1.retain(|entry| entry.pid != pid);
        if let Some(index) = self.partition_of(pid) {
            self.l2[index].release();
        }
    }

    pub fn statistics(&self) -> TlbStatistics {
        self.statistics
    }

    pub fn l1_entries(&self) -> &[TlbEntry] {
        &self.l1
    }

    /// Entries of the L2 partition bound to `pid`
    pub fn l2_entries(&self, pid: Pid) -> &[TlbEntry] {
        match self.partition_of(pid) {
            Some(index) => self.l2[index].entries(),
            None => &[],
        }
    }

    /// Number of processes that currently own an L2 partition
    pub fn l2_processes(&self) -> usize {
        self.l2.iter().filter(|p| p.owner().is_some()).count()
    }

    /// Processes that currently own an L2 partition
    pub fn l2_owners(&self) -> impl Iterator<Item = Pid> + '_ {
        self.l2.iter().filter_map(|p| p.owner())
    }

    pub fn l1_capacity(&self) -> usize {
        self.l1_capacity
    }

    pub fn l2_capacity_per_partition(&self) -> usize {
        self.l2_capacity_per_partition
    }
}
