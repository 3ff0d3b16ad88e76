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

mod entry;


pub use entry::{PageDirectoryEntry, PageTableEntry};

use core::ops::RangeBounds;
use std::collections::BTreeMap;

use log::trace;

use crate::{
    address::{check_page_size, frames_per_page, Pfn, Vpn, BASE_FRAME_SIZE, MAX_FRAME_COUNT},
    error::MemoryError,
};

/// Result of a successful translation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Translation {
    /// first vpn of the mapping that covers the translated vpn
    pub vpn: Vpn,

    /// frame backing the translated vpn
    pub frame: Pfn,

    pub page_size: u64,
}

/// A mapping as it is stored in the page table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    pub vpn: Vpn,

    pub page_size: u64,

    /// first frame of the mapping, only meaningful if `present` is set
    pub frame: Pfn,

    pub present: bool,
}

impl Mapping {
    pub fn frame_count(&self) -> u32 {
        frames_per_page(self.page_size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreedMapping {
    pub vpn: Vpn,

    pub page_size: u64,

    /// first frame that was released, `None` if the mapping was swapped out
    pub frame: Option<Pfn>,
}

#[derive(Debug, Clone, Copy)]
struct DirectorySlot {
    entry: PageDirectoryEntry,
    page_size: u64,
}

/// Two level page table of one process.
///
/// The directory is keyed by the first vpn of a mapping. Every mapping owns a
/// run of `page_size / BASE_FRAME_SIZE` second level entries starting at the
/// table id stored inside its directory entry. The table id of a mapping is
/// its first vpn, so table runs of different mappings never collide.
///
/// The page table only knows about its own entries. Frames, swap slots and
/// cached translations are managed by the caller.
#[derive(Debug, Default)]
pub struct PageTable {
    directory: BTreeMap<Vpn, DirectorySlot>,
    entries: BTreeMap<u32, PageTableEntry>,
}

impl PageTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of mappings, resident or swapped
    pub fn len(&self) -> usize {
        self.directory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directory.is_empty()
    }

    /// Finds the mapping that covers `vpn`
    fn covering(&self, vpn: Vpn) -> Option<(Vpn, DirectorySlot)> {
        let (&head, &slot) = self.directory.range(..=vpn).next_back()?;
        if (vpn as u64) < head as u64 + frames_per_page(slot.page_size) as u64 {
            Some((head, slot))
        } else {
            None
        }
    }

    /// Maps `page_size` bytes starting at `vpn` to the frames starting at `frame`.
    ///
    /// Fails with [`MemoryError::DoubleMapping`] if any page of the new range is
    /// already mapped and with [`MemoryError::PageFault`] if that mapping is
    /// currently swapped out.
    pub fn set_mapping(&mut self, page_size: u64, vpn: Vpn, frame: Pfn) -> Result<(), MemoryError> {
        check_page_size(page_size)?;
        let count = frames_per_page(page_size);

        if vpn as u64 + count as u64 > MAX_FRAME_COUNT || frame as u64 + count as u64 > MAX_FRAME_COUNT
        {
            return Err(MemoryError::InvalidMapping { vpn });
        }

        let conflict = self.covering(vpn).or_else(|| {
            self.directory
                .range(vpn..vpn + count)
                .next()
                .map(|(&head, &slot)| (head, slot))
        });
        if let Some((head, slot)) = conflict {
            return if slot.entry.is_present() {
                Err(MemoryError::DoubleMapping { vpn: head })
            } else {
                Err(MemoryError::PageFault { vpn: head })
            };
        }

        trace!(
            "Mapping vpn {:#x} ({:#x} bytes) to frame {:#x}",
            vpn,
            page_size,
            frame
        );

        let table = vpn;
        self.directory.insert(
            vpn,
            DirectorySlot {
                entry: PageDirectoryEntry::resident(table),
                page_size,
            },
        );
        for i in 0..count {
            let prev = self.entries.insert(table + i, PageTableEntry::resident(frame + i));
            debug_assert!(prev.is_none(), "table slot {:#x} was in use", table + i);
        }

        Ok(())
    }

    /// Translates `vpn` to the frame that backs it.
    ///
    /// Fails with [`MemoryError::InvalidMapping`] if `vpn` is not mapped and with
    /// [`MemoryError::PageFault`] if it is swapped out.
    pub fn translate(&self, vpn: Vpn) -> Result<Translation, MemoryError> {
        let (head, slot) = self
            .covering(vpn)
            .ok_or(MemoryError::InvalidMapping { vpn })?;

        if !slot.entry.is_valid() {
            return Err(MemoryError::InvalidMapping { vpn });
        }
        if !slot.entry.is_present() {
            return Err(MemoryError::PageFault { vpn: head });
        }

        let pte = self
            .entries
            .get(&(slot.entry.table() + (vpn - head)))
            .copied()
            .ok_or(MemoryError::InvalidMapping { vpn })?;

        if !pte.is_valid() {
            return Err(MemoryError::InvalidMapping { vpn });
        }
        if !pte.is_present() {
            return Err(MemoryError::PageFault { vpn: head });
        }

        Ok(Translation {
            vpn: head,
            frame: pte.frame(),
            page_size: slot.page_size,
        })
    }

    /// Returns the mapping covering `vpn`, no matter if it is resident or swapped
    pub fn lookup(&self, vpn: Vpn) -> Option<Mapping> {
        let (head, slot) = self.covering(vpn)?;
        Some(self.to_mapping(head, slot))
    }

    fn to_mapping(&self, head: Vpn, slot: DirectorySlot) -> Mapping {
        let frame = self
            .entries
            .get(&slot.entry.table())
            .map(|pte| pte.frame())
            .unwrap_or_default();

        Mapping {
            vpn: head,
            page_size: slot.page_size,
            frame,
            present: slot.entry.is_present(),
        }
    }

    /// Iterates over all mappings whose first vpn lies in `range`, in vpn order
    pub fn mappings<R: RangeBounds<Vpn>>(&self, range: R) -> impl Iterator<Item = Mapping> + '_ {
        self.directory
            .range(range)
            .map(|(&head, &slot)| self.to_mapping(head, slot))
    }

    /// Removes the mapping covering `vpn` with all of its second level entries
    pub fn free(&mut self, vpn: Vpn) -> Result<FreedMapping, MemoryError> {
        let (head, slot) = self
            .covering(vpn)
            .ok_or(MemoryError::InvalidMapping { vpn })?;
        let mapping = self.to_mapping(head, slot);

        self.directory.remove(&head);
        let table = slot.entry.table();
        for i in 0..mapping.frame_count() {
            self.entries.remove(&(table + i));
        }

        trace!("Freed mapping at vpn {:#x}", head);

        Ok(FreedMapping {
            vpn: head,
            page_size: slot.page_size,
            frame: if mapping.present {
                Some(mapping.frame)
            } else {
                None
            },
        })
    }

    /// Clears the present bits of the mapping covering `vpn`, the valid bits stay set.
    ///
    /// Returns the translation of the first page, so the caller can release its frames.
    pub fn mark_swapped(&mut self, vpn: Vpn) -> Result<Translation, MemoryError> {
        let translation = self.translate(vpn)?;
        let head = translation.vpn;
        self.set_present(head, None);

        let frame = translation.frame - (vpn - head);
        Ok(Translation {
            vpn: head,
            frame,
            page_size: translation.page_size,
        })
    }

    /// Makes a swapped mapping resident again, backed by the frames starting at `frame`
    pub fn restore(&mut self, vpn: Vpn, frame: Pfn) -> Result<(), MemoryError> {
        let (head, slot) = self
            .covering(vpn)
            .ok_or(MemoryError::InvalidMapping { vpn })?;
        if slot.entry.is_present() {
            return Err(MemoryError::DoubleMapping { vpn: head });
        }

        trace!("Restoring vpn {:#x} at frame {:#x}", head, frame);
        self.set_present(head, Some(frame));
        Ok(())
    }

    /// Makes a swapped mapping resident again, backed by several runs of
    /// frames `(start, count)`.
    ///
    /// The mapping is replaced by one mapping per run at successive vpns.
    /// The run counts have to be powers of two that add up to the size of
    /// the swapped mapping. Nothing is changed if the call fails.
    pub fn restore_split(&mut self, vpn: Vpn, runs: &[(Pfn, u32)]) -> Result<(), MemoryError> {
        let (head, slot) = self
            .covering(vpn)
            .ok_or(MemoryError::InvalidMapping { vpn })?;
        if slot.entry.is_present() {
            return Err(MemoryError::DoubleMapping { vpn: head });
        }

        let total: u64 = runs.iter().map(|(_, count)| *count as u64).sum();
        if total != frames_per_page(slot.page_size) as u64 {
            return Err(MemoryError::InvalidMapping { vpn: head });
        }
        for (frame, count) in runs.iter() {
            check_page_size(*count as u64 * BASE_FRAME_SIZE)?;
            if *frame as u64 + *count as u64 > MAX_FRAME_COUNT {
                return Err(MemoryError::InvalidMapping { vpn: head });
            }
        }

        trace!("Restoring vpn {:#x} split into {} runs", head, runs.len());

        // the old mapping owned every vpn of the range, so the new ones cannot collide
        self.free(head)?;
        let mut next = head;
        for (frame, count) in runs.iter() {
            self.set_mapping(*count as u64 * BASE_FRAME_SIZE, next, *frame)?;
            next += count;
        }

        Ok(())
    }

    /// Updates the present bits of the mapping starting at `head`.
    /// `Some(frame)` marks it present with new frames, `None` marks it not present.
    fn set_present(&mut self, head: Vpn, frame: Option<Pfn>) {
        let Some(slot) = self.directory.get_mut(&head) else {
            return;
        };
        slot.entry = slot.entry.with_present(frame.is_some());

        let table = slot.entry.table();
        for i in 0..frames_per_page(slot.page_size) {
            if let Some(pte) = self.entries.get_mut(&(table + i)) {
                *pte = match frame {
                    Some(frame) => PageTableEntry::resident(frame + i),
                    None => pte.with_present(false),
                };
            }
        }
    }
}
