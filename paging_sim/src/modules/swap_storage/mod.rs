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

mod slot_table;

pub use slot_table::SlotTableSwapStorageModule;

use crate::{
    address::{Pfn, Pid, Vpn},
    error::MemoryError,
};

/// Record of one page that was displaced to the swap disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapSlot {
    pub pid: Pid,

    /// head vpn of the displaced mapping
    pub vpn: Vpn,

    pub page_size: u64,

    /// content tag of the page, the frame it occupied when it was evicted
    pub tag: Pfn,
}

/// Backing store for evicted pages.
///
/// Every `(pid, vpn)` pair occupies at most one slot at a time.
pub trait SwapStorageModule {
    /// Creates a new empty storage with `slot_count` slots
    fn new(slot_count: usize) -> Self;

    fn slot_count(&self) -> usize;

    fn used_slots(&self) -> usize;

    /// Stores `slot` in a free slot and returns the slot index.
    ///
    /// Fails with [`MemoryError::DiskFull`] if no slot is left.
    fn store(&mut self, slot: SwapSlot) -> Result<usize, MemoryError>;

    /// Returns the slot index and the record of `(pid, vpn)` if it is on disk
    fn get(&self, pid: Pid, vpn: Vpn) -> Option<(usize, &SwapSlot)>;

    /// Releases the slot of `(pid, vpn)`
    fn remove(&mut self, pid: Pid, vpn: Vpn) -> Option<SwapSlot>;

    fn contains(&self, pid: Pid, vpn: Vpn) -> bool {
        self.get(pid, vpn).is_some()
    }

    fn free_slots(&self) -> usize {
        self.slot_count() - self.used_slots()
    }
}
