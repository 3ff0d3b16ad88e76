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

mod best_fit;
mod first_fit;

pub use best_fit::BestFitFrameAllocatorModule;
pub use first_fit::FirstFitFrameAllocatorModule;

use crate::{address::Pfn, util::bit_array::BitArray};

/// Manages which physical frames are in use.
///
/// Every implementation keeps one bit per base frame, the modules only
/// differ in how they choose a run of free frames.
pub trait FrameAllocatorModule {
    /// Creates a new allocator with `frame_count` free frames
    fn new(frame_count: usize) -> Self;

    /// Total number of frames managed by this module
    fn frame_count(&self) -> usize;

    /// Number of frames that are currently not allocated
    fn free_frames(&self) -> usize;

    fn is_allocated(&self, frame: Pfn) -> bool;

    /// Reserves `count` physically contiguous frames and returns the first one.
    ///
    /// Returns `None` if there is no free run that is big enough.
    fn allocate(&mut self, count: u32) -> Option<Pfn>;

    /// Releases the frames `[start, start + count)`
    fn deallocate(&mut self, start: Pfn, count: u32);
}

/// Bitmap shared by the allocator modules, true means allocated
#[derive(Debug, Clone)]
pub(crate) struct FrameBitmap {
    bits: BitArray,
    free: usize,
}

impl FrameBitmap {
    pub(crate) fn new(frame_count: usize) -> Self {
        Self {
            bits: BitArray::new(frame_count),
            free: frame_count,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.bits.len()
    }

    pub(crate) fn free(&self) -> usize {
        self.free
    }

    pub(crate) fn is_set(&self, frame: Pfn) -> bool {
        (frame as usize) < self.bits.len() && self.bits.is_set(frame as usize)
    }

    pub(crate) fn mark(&mut self, start: Pfn, count: u32) {
        debug_assert!(
            (start..start + count).all(|frame| !self.bits.is_set(frame as usize)),
            "frames {:#x}+{} are already allocated",
            start,
            count
        );
        self.bits.set_range(true, start as usize, count as usize);
        self.free -= count as usize;
    }

    pub(crate) fn clear(&mut self, start: Pfn, count: u32) {
        debug_assert!(
            (start..start + count).all(|frame| self.bits.is_set(frame as usize)),
            "frames {:#x}+{} are not allocated",
            start,
            count
        );
        self.bits.set_range(false, start as usize, count as usize);
        self.free += count as usize;
        debug_assert_eq!(self.free, self.bits.len() - self.bits.count_set());
    }

    /// Iterates over all maximal runs of free frames as `(start, length)`
    pub(crate) fn free_runs(&self) -> FreeRuns<'_> {
        FreeRuns {
            bitmap: self,
            curr: 0,
        }
    }
}

pub(crate) struct FreeRuns<'a> {
    bitmap: &'a FrameBitmap,
    curr: usize,
}

impl Iterator for FreeRuns<'_> {
    type Item = (Pfn, u32);

    fn next(&mut self) -> Option<Self::Item> {
        let len = self.bitmap.bits.len();
        while self.curr < len && self.bitmap.bits.is_set(self.curr) {
            self.curr += 1;
        }
        if self.curr >= len {
            return None;
        }

        let start = self.curr;
        while self.curr < len && !self.bitmap.bits.is_set(self.curr) {
            self.curr += 1;
        }

        Some((start as Pfn, (self.curr - start) as u32))
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::{FrameAllocatorModule, FrameBitmap};
    use crate::address::Pfn;

    #[derive(Debug, Clone, Copy)]
    struct AllocatedRun {
        start: Pfn,
        count: u32,
    }

    fn check_no_overlap(runs: &[AllocatedRun]) {
        for (i, run) in runs.iter().enumerate() {
            for (j, cmp) in runs.iter().enumerate() {
                if i == j {
                    continue;
                }

                assert!(
                    (cmp.start + cmp.count <= run.start) || (run.start + run.count <= cmp.start),
                    "allocated runs should not overlap"
                )
            }
        }
    }

    pub(crate) fn test_frame_allocator_generic<F: FrameAllocatorModule>() {
        const FRAMES: usize = 64;
        let mut allocator = F::new(FRAMES);
        let mut runs: Vec<AllocatedRun> = Vec::new();

        macro_rules! check_integrity {
            () => {
                check_no_overlap(&runs);
                let used: u32 = runs.iter().map(|r| r.count).sum();
                assert_eq!(allocator.free_frames(), FRAMES - used as usize);
                for run in runs.iter() {
                    for frame in run.start..run.start + run.count {
                        assert!(allocator.is_allocated(frame));
                    }
                }
            };
        }

        for count in [1, 2, 4, 8, 16, 1] {
            let start = allocator.allocate(count).expect("should have space left");
            runs.push(AllocatedRun { start, count });
            check_integrity!();
        }

        // free some runs in the middle to create holes
        for index in [3, 1] {
            let run = runs.remove(index);
            allocator.deallocate(run.start, run.count);
            check_integrity!();
        }

        for count in [2, 8, 3] {
            let start = allocator.allocate(count).expect("should fit in a hole");
            runs.push(AllocatedRun { start, count });
            check_integrity!();
        }

        let free = allocator.free_frames() as u32;
        assert!(allocator.allocate(FRAMES as u32).is_none());
        assert_eq!(allocator.free_frames() as u32, free, "failed allocation must not reserve frames");

        for run in runs.drain(..) {
            allocator.deallocate(run.start, run.count);
        }
        assert_eq!(allocator.free_frames(), FRAMES);
        assert_eq!(allocator.allocate(FRAMES as u32), Some(0));
        assert_eq!(allocator.allocate(1), None);
    }

    #[test]
    fn test_free_runs() {
        let mut bitmap = FrameBitmap::new(16);
        bitmap.mark(0, 2);
        bitmap.mark(5, 3);
        bitmap.mark(15, 1);

        let runs: Vec<_> = bitmap.free_runs().collect();
        assert_eq!(runs, vec![(2, 3), (8, 7)]);
        assert_eq!(bitmap.free(), 10);

        bitmap.clear(5, 3);
        let runs: Vec<_> = bitmap.free_runs().collect();
        assert_eq!(runs, vec![(2, 13)]);
    }
}
