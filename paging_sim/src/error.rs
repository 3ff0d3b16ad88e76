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

//! Error type shared by all components of the simulator.
//!
//! None of these errors is fatal for the simulator itself. A rejected
//! operation leaves all state unchanged (or rolled back), so a driver can log
//! the error and continue with the next operation.

use core::fmt;

use crate::{
    address::{Pid, VirtualAddress, Vpn},
    process::Segment,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    /// A valid mapping already covers `vpn` (segmentation fault).
    DoubleMapping { vpn: Vpn },
    /// The mapping covering `vpn` is valid but swapped out.
    /// It has to be swapped in before it can be translated or replaced.
    PageFault { vpn: Vpn },
    /// Nothing is mapped at `vpn`.
    InvalidMapping { vpn: Vpn },
    /// Page sizes have to be a power of two between 4 KiB and 1 GiB.
    InvalidPageSize { page_size: u64 },
    /// Not enough free frames, even after eviction.
    OutOfMemory { requested: u64 },
    /// Every swap slot is in use.
    DiskFull,
    /// Swap in was requested for a page that has no swap slot.
    NotOnDisk { pid: Pid, vpn: Vpn },
    ProcessNotFound { pid: Pid },
    ProcessExists { pid: Pid },
    /// `address` does not belong to `segment` of process `pid`.
    AccessViolation {
        pid: Pid,
        address: VirtualAddress,
        segment: Segment,
    },
    /// The heap would grow into the stack.
    AddressSpaceExhausted { pid: Pid, requested: u64 },
    InvalidConfig(&'static str),
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryError::DoubleMapping { vpn } => {
                write!(f, "segmentation fault: vpn {:#x} is already mapped", vpn)
            }
            MemoryError::PageFault { vpn } => {
                write!(f, "page fault: vpn {:#x} is not present", vpn)
            }
            MemoryError::InvalidMapping { vpn } => {
                write!(f, "invalid mapping: vpn {:#x} is not mapped", vpn)
            }
            MemoryError::InvalidPageSize { page_size } => {
                write!(f, "invalid page size {:#x}", page_size)
            }
            MemoryError::OutOfMemory { requested } => {
                write!(f, "out of memory: could not allocate {:#x} bytes", requested)
            }
            MemoryError::DiskFull => write!(f, "swap disk is full"),
            MemoryError::NotOnDisk { pid, vpn } => {
                write!(f, "vpn {:#x} of process {} is not on disk", vpn, pid)
            }
            MemoryError::ProcessNotFound { pid } => write!(f, "process {} not found", pid),
            MemoryError::ProcessExists { pid } => write!(f, "process {} already exists", pid),
            MemoryError::AccessViolation {
                pid,
                address,
                segment,
            } => write!(
                f,
                "address {:#x} is outside of the {} segment of process {}",
                address, segment, pid
            ),
            MemoryError::AddressSpaceExhausted { pid, requested } => write!(
                f,
                "heap of process {} cannot grow by {:#x} bytes",
                pid, requested
            ),
            MemoryError::InvalidConfig(reason) => write!(f, "invalid config: {}", reason),
        }
    }
}

impl std::error::Error for MemoryError {}
