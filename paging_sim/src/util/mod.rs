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

pub(crate) mod bit_array;

/// efficient way to calculate: ceil(x / y)
#[inline]
pub(crate) const fn ceil_div(x: u64, y: u64) -> u64 {
    (x + y - 1) / y
}

#[inline]
pub(crate) const fn round_up_to_nearest(num: u64, multiple: u64) -> u64 {
    ceil_div(num, multiple) * multiple
}

/// Largest power of two that is smaller or equal to `num`.
///
/// `num` has to be greater than zero.
#[inline]
pub(crate) const fn prev_power_of_two(num: u64) -> u64 {
    debug_assert!(num > 0);
    1u64 << (63 - num.leading_zeros())
}

#[cfg(test)]
mod test {
    use crate::util::{ceil_div, prev_power_of_two, round_up_to_nearest};

    #[test]
    fn test_ceil_div() {
        // just test a bunch of different values
        for y in 1..100 {
            for x in 0..y * 3 {
                let expected_value = if x % y == 0 { x / y } else { (x / y) + 1 };

                assert_eq!(ceil_div(x, y), expected_value);
            }
        }
    }

    #[test]
    fn test_round_up() {
        assert_eq!(round_up_to_nearest(0, 4096), 0);
        assert_eq!(round_up_to_nearest(1, 4096), 4096);
        assert_eq!(round_up_to_nearest(4096, 4096), 4096);
        assert_eq!(round_up_to_nearest(4097, 4096), 8192);
    }

    #[test]
    fn test_prev_power_of_two() {
        assert_eq!(prev_power_of_two(1), 1);
        assert_eq!(prev_power_of_two(3), 2);
        assert_eq!(prev_power_of_two(4), 4);
        assert_eq!(prev_power_of_two(1023), 512);
        assert_eq!(prev_power_of_two(1 << 40), 1 << 40);
    }
}
