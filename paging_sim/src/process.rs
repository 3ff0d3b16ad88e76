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

use core::{fmt, ops::Range};

use crate::{
    address::{Pid, VirtualAddress, Vpn, ADDRESS_SPACE_SIZE, BASE_FRAME_SHIFT},
    error::MemoryError,
    page_table::PageTable,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Segment {
    Code,
    Stack,
    Heap,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Code => write!(f, "code"),
            Segment::Stack => write!(f, "stack"),
            Segment::Heap => write!(f, "heap"),
        }
    }
}

/// Address space of one process.
///
/// ```text
/// 0                code_size          heap_top        stack_base        2^32
/// +----------------+------------------+------ ... ----+-----------------+
/// |      code      |  heap (grows ->) |               |      stack      |
/// +----------------+------------------+------ ... ----+-----------------+
/// ```
#[derive(Debug)]
pub struct Process {
    pid: Pid,

    /// bytes currently allocated by this process (code, stack and heap)
    allocated: u64,

    code_size: u64,
    stack_base: u64,
    heap_base: u64,
    heap_top: u64,

    page_table: PageTable,
}

impl Process {
    /// Creates the bookkeeping of a new process, no memory is mapped yet
    pub fn new(pid: Pid, code_size: u64, stack_size: u64) -> Self {
        debug_assert!(code_size + stack_size < ADDRESS_SPACE_SIZE);

        Self {
            pid,
            allocated: code_size + stack_size,
            code_size,
            stack_base: ADDRESS_SPACE_SIZE - stack_size,
            heap_base: code_size,
            heap_top: code_size,
            page_table: PageTable::new(),
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn allocated(&self) -> u64 {
        self.allocated
    }

    pub fn code_range(&self) -> Range<u64> {
        0..self.code_size
    }

    pub fn stack_range(&self) -> Range<u64> {
        self.stack_base..ADDRESS_SPACE_SIZE
    }

    pub fn heap_range(&self) -> Range<u64> {
        self.heap_base..self.heap_top
    }

    pub fn heap_top(&self) -> u64 {
        self.heap_top
    }

    pub fn contains(&self, segment: Segment, address: VirtualAddress) -> bool {
        let address = address as u64;
        match segment {
            Segment::Code => self.code_range().contains(&address),
            Segment::Stack => self.stack_range().contains(&address),
            Segment::Heap => self.heap_range().contains(&address),
        }
    }

    pub fn segment_of(&self, address: VirtualAddress) -> Option<Segment> {
        [Segment::Code, Segment::Heap, Segment::Stack]
            .into_iter()
            .find(|segment| self.contains(*segment, address))
    }

    /// Pages from the start of the code segment up to the heap top
    pub fn code_and_heap_vpns(&self) -> Range<Vpn> {
        0..(self.heap_top >> BASE_FRAME_SHIFT) as Vpn
    }

    /// Moves the heap top up by `size` bytes and returns the previous top
    pub fn grow_heap(&mut self, size: u64) -> Result<u64, MemoryError> {
        if self.heap_top + size > self.stack_base {
            return Err(MemoryError::AddressSpaceExhausted {
                pid: self.pid,
                requested: size,
            });
        }

        let base = self.heap_top;
        self.heap_top += size;
        self.allocated += size;
        Ok(base)
    }

    /// Moves the heap top down to `top`
    pub fn shrink_heap(&mut self, top: u64) {
        debug_assert!(self.heap_base <= top && top <= self.heap_top);

        self.allocated -= self.heap_top - top;
        self.heap_top = top;
    }

    pub fn page_table(&self) -> &PageTable {
        &self.page_table
    }

    pub fn page_table_mut(&mut self) -> &mut PageTable {
        &mut self.page_table
    }
}
