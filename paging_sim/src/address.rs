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

//! Address arithmetic shared by all components.

use static_assertions::const_assert;

use crate::error::MemoryError;

/// Virtual page number (always in base frame granularity)
pub type Vpn = u32;

/// Physical frame number (always in base frame granularity)
pub type Pfn = u32;

/// Virtual address inside the 32 bit address space of a process
pub type VirtualAddress = u32;

pub type Pid = u32;

/// Size of a physical frame and the smallest page size
pub const BASE_FRAME_SIZE: u64 = 4096;
pub const BASE_FRAME_SHIFT: u32 = 12;

/// Largest supported page size (1 GiB)
pub const MAX_PAGE_SIZE: u64 = 1 << 30;

/// Virtual and physical address spaces are both 32 bit wide
pub const ADDRESS_SPACE_SIZE: u64 = 1 << 32;

/// Number of significant bits of a frame number
pub const PFN_BITS: u32 = 32 - BASE_FRAME_SHIFT;

pub const MAX_FRAME_COUNT: u64 = ADDRESS_SPACE_SIZE / BASE_FRAME_SIZE;

const_assert!(BASE_FRAME_SIZE == 1 << BASE_FRAME_SHIFT);
const_assert!(MAX_PAGE_SIZE % BASE_FRAME_SIZE == 0);
const_assert!(MAX_FRAME_COUNT == 1 << PFN_BITS);

#[inline]
pub const fn vpn_of(address: VirtualAddress) -> Vpn {
    address >> BASE_FRAME_SHIFT
}

#[inline]
pub const fn address_of(vpn: Vpn) -> u64 {
    (vpn as u64) << BASE_FRAME_SHIFT
}

/// Number of base frames a page of `page_size` bytes spans
#[inline]
pub const fn frames_per_page(page_size: u64) -> u32 {
    (page_size / BASE_FRAME_SIZE) as u32
}

/// Page sizes have to be a power of two between [`BASE_FRAME_SIZE`] and [`MAX_PAGE_SIZE`]
pub fn check_page_size(page_size: u64) -> Result<(), MemoryError> {
    if page_size.is_power_of_two() && (BASE_FRAME_SIZE..=MAX_PAGE_SIZE).contains(&page_size) {
        Ok(())
    } else {
        Err(MemoryError::InvalidPageSize { page_size })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_vpn_of() {
        assert_eq!(vpn_of(0), 0);
        assert_eq!(vpn_of(4095), 0);
        assert_eq!(vpn_of(4096), 1);
        assert_eq!(vpn_of(0xBDC0_005A), 0xBDC00);
        assert_eq!(vpn_of(u32::MAX), (1 << PFN_BITS) - 1);
        assert_eq!(address_of(0xBDC00), 0xBDC0_0000);
    }

    #[test]
    fn test_check_page_size() {
        for shift in 12..=30 {
            assert!(check_page_size(1 << shift).is_ok());
        }

        for page_size in [0, 2048, 4095, 4097, 3 * 4096, 1 << 31] {
            assert_eq!(
                check_page_size(page_size),
                Err(MemoryError::InvalidPageSize { page_size })
            );
        }
    }
}
