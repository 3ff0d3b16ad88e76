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

use crate::translation_cache::TlbStatistics;

/// Counters collected by the memory manager
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemoryStatistics {
    pub tlb: TlbStatistics,

    /// TLB misses that were resolved by a resident page table entry
    pub page_table_hits: u64,

    /// TLB misses that hit a swapped out page
    pub page_faults: u64,

    pub swap_outs: u64,
    pub swap_ins: u64,

    /// TLB misses per segment, whatever resolved them
    pub code_misses: u64,
    pub stack_misses: u64,
    pub heap_misses: u64,
}
