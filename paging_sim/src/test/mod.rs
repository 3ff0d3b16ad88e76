use crate::{
    modules::{
        eviction_policy::RandomEvictionPolicyModule, frame_allocator::FirstFitFrameAllocatorModule,
        swap_storage::SlotTableSwapStorageModule,
    },
    MemoryConfig, MemoryManager, TlbConfig, BASE_FRAME_SIZE,
};

mod allocate;
mod process;

pub(crate) const SEED: u64 = 5446535461589659585;

pub(crate) const PAGE: u64 = BASE_FRAME_SIZE;

pub(crate) type TestManager = MemoryManager<
    FirstFitFrameAllocatorModule,
    SlotTableSwapStorageModule,
    RandomEvictionPolicyModule,
>;

/// Small machine: `frames` frames, no code or stack segments
pub(crate) fn get_test_config(frames: u64, high_pages: u64, low_pages: u64) -> MemoryConfig {
    MemoryConfig {
        memory_size: frames * PAGE,
        swap_slots: 16,
        high_watermark: high_pages * PAGE,
        low_watermark: low_pages * PAGE,
        code_size: 0,
        stack_size: 0,
        tlb: TlbConfig {
            l1_capacity: 4,
            l2_capacity: 16,
            l2_partitions: 2,
        },
    }
}

pub(crate) fn get_test_manager(config: MemoryConfig) -> TestManager {
    let _ = env_logger::builder().is_test(true).try_init();

    MemoryManager::new(config, RandomEvictionPolicyModule::seeded(SEED)).unwrap()
}
