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

mod access;
mod allocate;
mod statistics;
mod swap;

pub use statistics::MemoryStatistics;

use log::{info, trace};

use crate::{
    address::{frames_per_page, Pid, Vpn, BASE_FRAME_SHIFT, BASE_FRAME_SIZE},
    error::MemoryError,
    memory_config::MemoryConfig,
    modules::{
        eviction_policy::{EvictionPolicyModule, RandomEvictionPolicyModule},
        frame_allocator::{FirstFitFrameAllocatorModule, FrameAllocatorModule},
        swap_storage::{SlotTableSwapStorageModule, SwapStorageModule},
    },
    process::Process,
    translation_cache::TranslationCache,
    util::ceil_div,
};

pub type DefaultMemoryManager = MemoryManager<
    FirstFitFrameAllocatorModule,
    SlotTableSwapStorageModule,
    RandomEvictionPolicyModule,
>;

/// Physical memory manager of the simulated system.
///
/// Owns the frame allocator `A`, the swap disk `S`, the translation cache
/// (replacing entries with policy `P`) and every running process. All
/// operations take the process they act on explicitly.
pub struct MemoryManager<A: FrameAllocatorModule, S: SwapStorageModule, P: EvictionPolicyModule> {
    config: MemoryConfig,

    frames: A,

    swap: S,

    tlb: TranslationCache<P>,

    /// running processes in registration order
    processes: Vec<Process>,

    /// process selected by the last switch
    active: Option<Pid>,

    counters: MemoryStatistics,
}

impl<A: FrameAllocatorModule, S: SwapStorageModule, P: EvictionPolicyModule> MemoryManager<A, S, P> {
    pub fn new(config: MemoryConfig, policy: P) -> Result<Self, MemoryError> {
        config.validate()?;

        info!(
            "Creating memory manager with {} frames, {} swap slots, watermarks low={:#x} high={:#x}",
            config.frame_count(),
            config.swap_slots,
            config.low_watermark,
            config.high_watermark
        );

        Ok(Self {
            frames: A::new(config.frame_count()),
            swap: S::new(config.swap_slots),
            tlb: TranslationCache::new(config.tlb, policy),
            processes: Vec::new(),
            active: None,
            counters: MemoryStatistics::default(),
            config,
        })
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Bytes of physical memory that are currently not backing any page
    pub fn free_bytes(&self) -> u64 {
        self.frames.free_frames() as u64 * BASE_FRAME_SIZE
    }

    pub fn frames(&self) -> &A {
        &self.frames
    }

    pub fn swap(&self) -> &S {
        &self.swap
    }

    pub fn translation_cache(&self) -> &TranslationCache<P> {
        &self.tlb
    }

    pub fn process(&self, pid: Pid) -> Option<&Process> {
        self.processes.iter().find(|process| process.pid() == pid)
    }

    /// Running processes in registration order
    pub fn processes(&self) -> impl Iterator<Item = &Process> {
        self.processes.iter()
    }

    pub fn active_process(&self) -> Option<Pid> {
        self.active
    }

    fn process_index(&self, pid: Pid) -> Result<usize, MemoryError> {
        self.processes
            .iter()
            .position(|process| process.pid() == pid)
            .ok_or(MemoryError::ProcessNotFound { pid })
    }

    pub fn statistics(&self) -> MemoryStatistics {
        MemoryStatistics {
            tlb: self.tlb.statistics(),
            ..self.counters
        }
    }

    /// Creates process `pid` with its code and stack segments mapped
    pub fn create_process(&mut self, pid: Pid) -> Result<Pid, MemoryError> {
        if self.process(pid).is_some() {
            return Err(MemoryError::ProcessExists { pid });
        }

        let mut process = Process::new(pid, self.config.code_size, self.config.stack_size);
        let code_pages = ceil_div(self.config.code_size, BASE_FRAME_SIZE);
        let stack_pages = ceil_div(self.config.stack_size, BASE_FRAME_SIZE);

        self.make_room((code_pages + stack_pages) * BASE_FRAME_SIZE)?;

        let code_runs = self.reserve_frames(code_pages)?;
        let stack_runs = match self.reserve_frames(stack_pages) {
            Ok(runs) => runs,
            Err(err) => {
                self.release_runs(&code_runs);
                return Err(err);
            }
        };

        let stack_vpn = (process.stack_range().start >> BASE_FRAME_SHIFT) as Vpn;
        let installed = Self::install_runs(process.page_table_mut(), 0, &code_runs).and_then(|_| {
            Self::install_runs(process.page_table_mut(), stack_vpn, &stack_runs)
        });
        if let Err(err) = installed {
            self.release_runs(&code_runs);
            self.release_runs(&stack_runs);
            return Err(err);
        }

        info!(
            "Created process {} ({} code pages, {} stack pages)",
            pid, code_pages, stack_pages
        );
        self.processes.push(process);
        Ok(pid)
    }

    /// Releases every page of process `pid`, resident or swapped, and removes it
    pub fn destroy_process(&mut self, pid: Pid) -> Result<(), MemoryError> {
        let index = self.process_index(pid)?;

        let heads: Vec<Vpn> = self.processes[index]
            .page_table()
            .mappings(..)
            .map(|mapping| mapping.vpn)
            .collect();
        for vpn in heads {
            self.release_mapping(index, vpn)?;
        }

        self.tlb.flush_process(pid);
        self.processes.remove(index);
        if self.active == Some(pid) {
            self.active = None;
        }

        info!("Destroyed process {}", pid);
        Ok(())
    }

    /// Makes `pid` the active process.
    ///
    /// A process that does not exist yet is created on the fly.
    pub fn switch_to_process(&mut self, pid: Pid) -> Result<Pid, MemoryError> {
        if self.process(pid).is_none() {
            info!("Switching to unknown process {}, creating it", pid);
            self.create_process(pid)?;
        }

        trace!("Switched to process {}", pid);
        self.active = Some(pid);
        Ok(pid)
    }

    /// Checks that page tables, frames, swap slots and cached translations agree
    pub fn is_consistent(&self) -> bool {
        let mut claimed = vec![false; self.frames.frame_count()];
        let mut claimed_count = 0usize;
        let mut swapped_count = 0usize;

        for process in self.processes.iter() {
            let pid = process.pid();
            for mapping in process.page_table().mappings(..) {
                if mapping.present {
                    if self.swap.contains(pid, mapping.vpn) {
                        return false;
                    }
                    for frame in mapping.frame..mapping.frame + mapping.frame_count() {
                        let frame_index = frame as usize;
                        if frame_index >= claimed.len()
                            || claimed[frame_index]
                            || !self.frames.is_allocated(frame)
                        {
                            return false;
                        }
                        claimed[frame_index] = true;
                        claimed_count += 1;
                    }
                } else {
                    match self.swap.get(pid, mapping.vpn) {
                        Some((_, slot)) if slot.page_size == mapping.page_size => {
                            swapped_count += 1
                        }
                        _ => return false,
                    }
                }
            }

            let cached = self
                .tlb
                .l1_entries()
                .iter()
                .filter(|entry| entry.pid == pid)
                .chain(self.tlb.l2_entries(pid).iter());
            for entry in cached {
                match process.page_table().translate(entry.vpn) {
                    Ok(translation)
                        if translation.vpn == entry.vpn
                            && translation.frame == entry.frame
                            && frames_per_page(translation.page_size)
                                == frames_per_page(entry.page_size) => {}
                    _ => return false,
                }
            }
        }

        // no cached translation of a process that is gone
        if self
            .tlb
            .l1_entries()
            .iter()
            .any(|entry| self.process(entry.pid).is_none())
            || self.tlb.l2_owners().any(|pid| self.process(pid).is_none())
        {
            return false;
        }

        claimed_count == self.frames.frame_count() - self.frames.free_frames()
            && swapped_count == self.swap.used_slots()
    }
}
