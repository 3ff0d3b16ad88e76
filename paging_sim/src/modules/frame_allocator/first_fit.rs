use super::{FrameAllocatorModule, FrameBitmap};
use crate::address::Pfn;

/// Takes the first free run that is big enough
pub struct FirstFitFrameAllocatorModule {
    bitmap: FrameBitmap,
}

impl FrameAllocatorModule for FirstFitFrameAllocatorModule {
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

        let (start, _) = self
            .bitmap
            .free_runs()
            .find(|(_, len)| *len >= count)?;

        self.bitmap.mark(start, count);
        Some(start)
    }

    fn deallocate(&mut self, start: Pfn, count: u32) {
        self.bitmap.clear(start, count);
    }
}
