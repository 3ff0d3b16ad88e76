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

use crate::{
    address::{ADDRESS_SPACE_SIZE, BASE_FRAME_SIZE},
    error::MemoryError,
};

const MIB: u64 = 1024 * 1024;

/// Sizes of the two translation cache tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TlbConfig {
    /// Number of entries of the fully associative first tier
    pub l1_capacity: usize,

    /// Total number of entries of the second tier, shared by all partitions
    pub l2_capacity: usize,

    /// How many processes can have entries in the second tier at once
    pub l2_partitions: usize,
}

impl TlbConfig {
    pub fn l2_capacity_per_partition(&self) -> usize {
        self.l2_capacity / self.l2_partitions
    }
}

impl Default for TlbConfig {
    fn default() -> Self {
        Self {
            l1_capacity: 64,
            l2_capacity: 1024,
            l2_partitions: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MemoryConfig {
    /// Size of physical memory in bytes
    pub memory_size: u64,

    /// Number of slots of the swap disk, one evicted page each
    pub swap_slots: usize,

    /// Eviction frees memory until at least this many bytes are free
    pub high_watermark: u64,

    /// Eviction starts as soon as an allocation would leave less than this many bytes free
    pub low_watermark: u64,

    /// Size of the code segment every process starts with
    pub code_size: u64,

    /// Size of the stack segment every process starts with
    pub stack_size: u64,

    pub tlb: TlbConfig,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            memory_size: ADDRESS_SPACE_SIZE,
            swap_slots: 1 << 16,
            high_watermark: 200 * MIB,
            low_watermark: 100 * MIB,
            code_size: 4 * MIB,
            stack_size: 4 * MIB,
            tlb: TlbConfig::default(),
        }
    }
}

impl MemoryConfig {
    pub fn frame_count(&self) -> usize {
        (self.memory_size / BASE_FRAME_SIZE) as usize
    }

    pub fn validate(&self) -> Result<(), MemoryError> {
        macro_rules! ensure {
            ($cond: expr, $reason: literal) => {
                if !$cond {
                    return Err(MemoryError::InvalidConfig($reason));
                }
            };
        }

        ensure!(self.memory_size > 0, "memory size must not be zero");
        ensure!(
            self.memory_size % BASE_FRAME_SIZE == 0,
            "memory size must be a multiple of the frame size"
        );
        ensure!(
            self.memory_size <= ADDRESS_SPACE_SIZE,
            "memory size exceeds the physical address space"
        );
        ensure!(
            self.low_watermark < self.high_watermark,
            "low watermark must be below the high watermark"
        );
        ensure!(
            self.high_watermark <= self.memory_size,
            "high watermark exceeds the memory size"
        );
        ensure!(self.swap_slots > 0, "swap disk needs at least one slot");
        ensure!(
            self.code_size % BASE_FRAME_SIZE == 0 && self.stack_size % BASE_FRAME_SIZE == 0,
            "segment sizes must be multiples of the frame size"
        );
        ensure!(
            self.code_size
                .checked_add(self.stack_size)
                .is_some_and(|total| total < ADDRESS_SPACE_SIZE),
            "code and stack segments overlap"
        );
        ensure!(self.tlb.l1_capacity > 0, "l1 capacity must not be zero");
        ensure!(self.tlb.l2_partitions > 0, "l2 needs at least one partition");
        ensure!(
            self.tlb.l2_capacity >= self.tlb.l2_partitions
                && self.tlb.l2_capacity % self.tlb.l2_partitions == 0,
            "l2 capacity must be a positive multiple of the partition count"
        );

        Ok(())
    }
}
