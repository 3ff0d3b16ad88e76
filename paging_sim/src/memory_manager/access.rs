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

use log::trace;

use super::MemoryManager;
use crate::{
    address::{vpn_of, Pfn, Pid, VirtualAddress},
    error::MemoryError,
    modules::{
        eviction_policy::EvictionPolicyModule, frame_allocator::FrameAllocatorModule,
        swap_storage::SwapStorageModule,
    },
    process::Segment,
    translation_cache::TlbEntry,
};

impl<A: FrameAllocatorModule, S: SwapStorageModule, P: EvictionPolicyModule> MemoryManager<A, S, P> {
    #[inline]
    pub fn access_code(&mut self, pid: Pid, address: VirtualAddress) -> Result<Pfn, MemoryError> {
        self.access(pid, Segment::Code, address)
    }

    #[inline]
    pub fn access_stack(&mut self, pid: Pid, address: VirtualAddress) -> Result<Pfn, MemoryError> {
        self.access(pid, Segment::Stack, address)
    }

    #[inline]
    pub fn access_heap(&mut self, pid: Pid, address: VirtualAddress) -> Result<Pfn, MemoryError> {
        self.access(pid, Segment::Heap, address)
    }

    /// Translates `address` of process `pid` to the frame that backs it.
    ///
    /// The translation cache is asked first. On a miss the page table is
    /// walked, swapping the page in on a page fault, and the result is cached.
    pub fn access(
        &mut self,
        pid: Pid,
        segment: Segment,
        address: VirtualAddress,
    ) -> Result<Pfn, MemoryError> {
        let index = self.process_index(pid)?;
        if !self.processes[index].contains(segment, address) {
            return Err(MemoryError::AccessViolation {
                pid,
                address,
                segment,
            });
        }

        if let Some(frame) = self.tlb.lookup(pid, address) {
            return Ok(frame);
        }

        match segment {
            Segment::Code => self.counters.code_misses += 1,
            Segment::Stack => self.counters.stack_misses += 1,
            Segment::Heap => self.counters.heap_misses += 1,
        }

        let vpn = vpn_of(address);
        let translation = match self.processes[index].page_table().translate(vpn) {
            Ok(translation) => {
                self.counters.page_table_hits += 1;
                translation
            }
            Err(MemoryError::PageFault { vpn: head }) => {
                self.counters.page_faults += 1;
                trace!("Page fault at {:#x} of process {}", address, pid);
                self.swap_in_page(pid, head)?;
                self.processes[index].page_table().translate(vpn)?
            }
            Err(err) => return Err(err),
        };

        let head_frame = translation.frame - (vpn - translation.vpn);
        self.tlb.insert(TlbEntry::new(
            pid,
            translation.vpn,
            head_frame,
            translation.page_size,
        ));

        Ok(translation.frame)
    }
}
