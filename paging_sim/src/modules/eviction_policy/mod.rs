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

mod lru;
mod random;

pub use lru::LruEvictionPolicyModule;
pub use random::RandomEvictionPolicyModule;

/// Decides which cache slot gets replaced once a cache tier is full.
pub trait EvictionPolicyModule {
    /// Returns the index of the slot to replace.
    ///
    /// `stamps[i]` is the logical time slot `i` was used last,
    /// `stamps` is never empty.
    fn choose_victim(&mut self, stamps: &[u64]) -> usize;
}
