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

use log::{debug, info, warn};

use super::MemoryManager;
use crate::{
    address::{frames_per_page, Pfn, Pid, Vpn},
    error::MemoryError,
    modules::{
        eviction_policy::EvictionPolicyModule,
        frame_allocator::FrameAllocatorModule,
        swap_storage::{SwapSlot, SwapStorageModule},
    },
    page_table::Mapping,
};

impl<A: FrameAllocatorModule, S: SwapStorageModule, P: EvictionPolicyModule> MemoryManager<A, S, P> {
    /// Swaps out pages if taking `bytes` from free memory would drop below
    /// the low watermark. Eviction then aims for the high watermark.
    pub(super) fn make_room(&mut self, bytes: u64) -> Result<(), MemoryError> {
        let projected = self.free_bytes() as i64 - bytes as i64;
        if projected >= self.config.low_watermark as i64 {
            return Ok(());
        }

        let target = (self.config.high_watermark as i64 - projected) as u64;
        debug!(
            "Taking {:#x} bytes would leave {:#x} bytes free, evicting {:#x} bytes",
            bytes, projected, target
        );

        match self.swap_out_to_meet_watermark(target) {
            Ok(freed) if freed < target => {
                warn!(
                    "Could only evict {:#x} of {:#x} bytes, memory stays below the high watermark",
                    freed, target
                );
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(MemoryError::DiskFull) => {
                warn!("Swap disk is full, nothing was evicted");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Swaps out resident pages until at least `target` bytes were freed.
    ///
    /// Processes are visited in registration order, each from the start of
    /// its code segment up to its heap top. The stack is never evicted.
    /// Returns the number of bytes freed, which may fall short of `target`
    /// if there is nothing left to evict. Fails with
    /// [`MemoryError::DiskFull`] only if not a single page could be stored.
    pub fn swap_out_to_meet_watermark(&mut self, target: u64) -> Result<u64, MemoryError> {
        let mut freed = 0;

        for index in 0..self.processes.len() {
            if freed >= target {
                break;
            }

            let process = &self.processes[index];
            let resident: Vec<Mapping> = process
                .page_table()
                .mappings(process.code_and_heap_vpns())
                .filter(|mapping| mapping.present)
                .collect();

            for mapping in resident {
                if freed >= target {
                    break;
                }

                match self.swap_out_mapping(index, mapping) {
                    Ok(bytes) => freed += bytes,
                    Err(MemoryError::DiskFull) if freed > 0 => {
                        warn!("Swap disk ran full after evicting {:#x} bytes", freed);
                        return Ok(freed);
                    }
                    Err(err) => return Err(err),
                }
            }
        }

        info!("Evicted {:#x} bytes (target {:#x})", freed, target);
        Ok(freed)
    }

    /// Moves one resident mapping to the swap disk and returns its size
    fn swap_out_mapping(&mut self, index: usize, mapping: Mapping) -> Result<u64, MemoryError> {
        let pid = self.processes[index].pid();

        // the slot is taken first so a full disk leaves everything untouched
        self.swap.store(SwapSlot {
            pid,
            vpn: mapping.vpn,
            page_size: mapping.page_size,
            tag: mapping.frame,
        })?;

        let translation = match self.processes[index]
            .page_table_mut()
            .mark_swapped(mapping.vpn)
        {
            Ok(translation) => translation,
            Err(err) => {
                self.swap.remove(pid, mapping.vpn);
                return Err(err);
            }
        };

        self.frames
            .deallocate(translation.frame, frames_per_page(translation.page_size));
        self.tlb.invalidate(pid, mapping.vpn);
        self.counters.swap_outs += 1;

        debug!(
            "Swapped out vpn {:#x} ({:#x} bytes) of process {}",
            mapping.vpn, mapping.page_size, pid
        );
        Ok(mapping.page_size)
    }

    /// Brings the swapped page covering `vpn` of process `pid` back into
    /// memory and returns the first frame of its new location.
    ///
    /// Without a free run big enough for the whole page, the page is
    /// restored as several smaller mappings.
    pub fn swap_in_page(&mut self, pid: Pid, vpn: Vpn) -> Result<Pfn, MemoryError> {
        let index = self.process_index(pid)?;

        let head = match self.processes[index].page_table().lookup(vpn) {
            Some(mapping) if !mapping.present => mapping.vpn,
            _ => return Err(MemoryError::NotOnDisk { pid, vpn }),
        };
        let slot = match self.swap.get(pid, head) {
            Some((_, slot)) => *slot,
            None => return Err(MemoryError::NotOnDisk { pid, vpn }),
        };

        self.make_room(slot.page_size)?;

        // falls back to several smaller runs if memory is fragmented
        let runs = self.reserve_frames(frames_per_page(slot.page_size) as u64)?;
        let Some(&(frame, _)) = runs.first() else {
            return Err(MemoryError::OutOfMemory {
                requested: slot.page_size,
            });
        };

        let page_table = self.processes[index].page_table_mut();
        let restored = match runs.as_slice() {
            [_] => page_table.restore(head, frame),
            _ => page_table.restore_split(head, &runs),
        };
        if let Err(err) = restored {
            self.release_runs(&runs);
            return Err(err);
        }
        self.swap.remove(pid, head);
        self.counters.swap_ins += 1;

        debug!(
            "Swapped in vpn {:#x} of process {} to frame {:#x} ({} run(s))",
            head,
            pid,
            frame,
            runs.len()
        );
        Ok(frame)
    }
}
