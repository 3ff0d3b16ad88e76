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

use log::debug;

use super::MemoryManager;
use crate::{
    address::{
        frames_per_page, vpn_of, Pfn, Pid, VirtualAddress, Vpn, ADDRESS_SPACE_SIZE, BASE_FRAME_SIZE,
        MAX_PAGE_SIZE,
    },
    error::MemoryError,
    modules::{
        eviction_policy::EvictionPolicyModule, frame_allocator::FrameAllocatorModule,
        swap_storage::SwapStorageModule,
    },
    page_table::PageTable,
    process::Segment,
    util::{prev_power_of_two, round_up_to_nearest},
};

/// Physically contiguous frames `(start, count)`, `count` is a power of two
pub(super) type FrameRun = (Pfn, u32);

impl<A: FrameAllocatorModule, S: SwapStorageModule, P: EvictionPolicyModule> MemoryManager<A, S, P> {
    /// Maps `size` bytes (rounded up to whole frames) on top of the heap of
    /// process `pid` and returns the base address of the new region.
    ///
    /// If the allocation would push free memory below the low watermark,
    /// pages are swapped out first until the high watermark is restored.
    pub fn allocate_memory(&mut self, pid: Pid, size: u64) -> Result<VirtualAddress, MemoryError> {
        let index = self.process_index(pid)?;
        if size > ADDRESS_SPACE_SIZE {
            return Err(MemoryError::AddressSpaceExhausted {
                pid,
                requested: size,
            });
        }
        let size = round_up_to_nearest(size, BASE_FRAME_SIZE);
        if size == 0 {
            return Ok(self.processes[index].heap_top() as VirtualAddress);
        }

        let base = self.processes[index].grow_heap(size)?;

        let runs = match self
            .make_room(size)
            .and_then(|_| self.reserve_frames(size / BASE_FRAME_SIZE))
        {
            Ok(runs) => runs,
            Err(err) => {
                self.processes[index].shrink_heap(base);
                return Err(err);
            }
        };

        let base_vpn = vpn_of(base as VirtualAddress);
        if let Err(err) = Self::install_runs(self.processes[index].page_table_mut(), base_vpn, &runs) {
            self.release_runs(&runs);
            self.processes[index].shrink_heap(base);
            return Err(err);
        }

        debug!(
            "Allocated {:#x} bytes at {:#x} for process {} in {} page(s)",
            size,
            base,
            pid,
            runs.len()
        );
        Ok(base as VirtualAddress)
    }

    /// Releases the heap of process `pid` from `base` up to its top.
    ///
    /// Resident pages give back their frames, swapped pages their swap slot.
    /// Returns the number of bytes that were released.
    pub fn free_memory(&mut self, pid: Pid, base: VirtualAddress) -> Result<u64, MemoryError> {
        let index = self.process_index(pid)?;
        let process = &self.processes[index];

        if !process.contains(Segment::Heap, base) {
            return Err(MemoryError::AccessViolation {
                pid,
                address: base,
                segment: Segment::Heap,
            });
        }

        let base_vpn = vpn_of(base);
        match process.page_table().lookup(base_vpn) {
            Some(mapping) if mapping.vpn == base_vpn && base as u64 % BASE_FRAME_SIZE == 0 => {}
            _ => return Err(MemoryError::InvalidMapping { vpn: base_vpn }),
        }

        let top_vpn = process.code_and_heap_vpns().end;
        let heads: Vec<Vpn> = process
            .page_table()
            .mappings(base_vpn..top_vpn)
            .map(|mapping| mapping.vpn)
            .collect();

        let mut freed = 0;
        for vpn in heads {
            freed += self.release_mapping(index, vpn)?;
        }
        self.processes[index].shrink_heap(base as u64);

        debug!("Freed {:#x} bytes at {:#x} of process {}", freed, base, pid);
        Ok(freed)
    }

    /// Reserves `pages` frames as a list of power of two sized runs.
    ///
    /// Starts with the largest run that fits and halves the run size whenever
    /// no free run of that size is left. Nothing stays reserved on failure.
    pub(super) fn reserve_frames(&mut self, pages: u64) -> Result<Vec<FrameRun>, MemoryError> {
        let requested = pages * BASE_FRAME_SIZE;
        if (self.frames.free_frames() as u64) < pages {
            return Err(MemoryError::OutOfMemory { requested });
        }

        let mut runs = Vec::new();
        let mut remaining = pages;
        let mut limit = frames_per_page(MAX_PAGE_SIZE) as u64;

        while remaining > 0 {
            let chunk = prev_power_of_two(remaining).min(limit);
            match self.frames.allocate(chunk as u32) {
                Some(frame) => {
                    runs.push((frame, chunk as u32));
                    remaining -= chunk;
                }
                None if chunk > 1 => limit = chunk / 2,
                None => {
                    self.release_runs(&runs);
                    return Err(MemoryError::OutOfMemory { requested });
                }
            }
        }

        Ok(runs)
    }

    pub(super) fn release_runs(&mut self, runs: &[FrameRun]) {
        for (frame, count) in runs.iter() {
            self.frames.deallocate(*frame, *count);
        }
    }

    /// Maps `runs` back to back starting at `vpn`, one page per run
    pub(super) fn install_runs(
        page_table: &mut PageTable,
        vpn: Vpn,
        runs: &[FrameRun],
    ) -> Result<(), MemoryError> {
        let mut next = vpn;
        for (frame, count) in runs.iter() {
            let page_size = *count as u64 * BASE_FRAME_SIZE;
            if let Err(err) = page_table.set_mapping(page_size, next, *frame) {
                // undo what was installed so far, the caller owns the frames
                let mut undo = vpn;
                while undo < next {
                    let freed = page_table.free(undo)?;
                    undo += frames_per_page(freed.page_size);
                }
                return Err(err);
            }
            next += count;
        }

        Ok(())
    }

    /// Unmaps the mapping headed by `vpn` and releases whatever backs it
    pub(super) fn release_mapping(&mut self, index: usize, vpn: Vpn) -> Result<u64, MemoryError> {
        let pid = self.processes[index].pid();
        let freed = self.processes[index].page_table_mut().free(vpn)?;

        match freed.frame {
            Some(frame) => self.frames.deallocate(frame, frames_per_page(freed.page_size)),
            None => {
                self.swap.remove(pid, freed.vpn);
            }
        }
        self.tlb.invalidate(pid, freed.vpn);

        Ok(freed.page_size)
    }
}
