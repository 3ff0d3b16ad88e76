use super::{FrameAllocatorModule, FrameBitmap};
use crate::address::Pfn;

/// Takes the smallest free run that is big enough, which keeps big runs
/// intact for huge pages
pub struct BestFitFrameAllocatorModule {
    bitmap: FrameBitmap,
}

impl FrameAllocatorModule for BestFitFrameAllocatorModule {
    fn new(frame_count: usize) -> Self {
        Self {
            bitmap: FrameBitmap::new(frame_count),
        }
    }

    fn frame_count(&self) -> usize {
        self.bitmap.len()
    }

    fn free_frames(&self) -> usize {
        self.bitmap.free()
    }

    fn is_allocated(&self, frame: Pfn) -> bool {
        self.bitmap.is_set(frame)
    }

    fn allocate(&mut self, count: u32) -> Option<Pfn> {
        if count == 0 || count as usize > self.bitmap.free() {
            return None;
        }

        let mut best: Option<(Pfn, u32)> = None;
        for (start, len) in self.bitmap.free_runs() {
            if len < count {
                continue;
            }
            if len == count {
                // cannot get any better
                best = Some((start, len));
                break;
            }
            if best.map_or(true, |(_, best_len)| len < best_len) {
                best = Some((start, len));
            }
        }

        let (start, _) = best?;
        self.bitmap.mark(start, count);
        Some(start)
    }

    fn deallocate(&mut self, start: Pfn, count: u32) {
        self.bitmap.clear(start, count);
    }
}
