use crate::{
    modules::swap_storage::SwapStorageModule, MemoryConfig, MemoryError, Segment, TlbConfig,
};

use super::{get_test_config, get_test_manager, PAGE};

fn get_process_config() -> MemoryConfig {
    MemoryConfig {
        memory_size: 256 * PAGE,
        swap_slots: 32,
        high_watermark: 32 * PAGE,
        low_watermark: 16 * PAGE,
        code_size: 2 * PAGE,
        stack_size: 2 * PAGE,
        tlb: TlbConfig {
            l1_capacity: 4,
            l2_capacity: 8,
            l2_partitions: 2,
        },
    }
}

#[test]
fn test_switch_creates_process() {
    let mut manager = get_test_manager(get_process_config());
    assert_eq!(manager.active_process(), None);

    assert_eq!(manager.switch_to_process(7).unwrap(), 7);
    assert_eq!(manager.active_process(), Some(7));
    assert_eq!(manager.free_bytes(), 252 * PAGE);

    let process = manager.process(7).unwrap();
    assert_eq!(process.allocated(), 4 * PAGE);
    assert_eq!(process.segment_of(0), Some(Segment::Code));
    assert_eq!(process.segment_of(u32::MAX), Some(Segment::Stack));
    assert_eq!(process.segment_of(0x10_0000), None);

    // code and stack are mapped right away
    assert_eq!(manager.access_code(7, 0x1234).unwrap(), 1);
    assert_eq!(manager.access_stack(7, u32::MAX).unwrap(), 3);

    // switching back does not create anything
    manager.switch_to_process(8).unwrap();
    manager.switch_to_process(7).unwrap();
    assert_eq!(manager.processes().count(), 2);
    assert_eq!(manager.free_bytes(), 248 * PAGE);

    assert_eq!(
        manager.create_process(7),
        Err(MemoryError::ProcessExists { pid: 7 })
    );
    assert!(manager.is_consistent());
}

#[test]
fn test_access_outside_of_segment() {
    let mut manager = get_test_manager(get_process_config());
    manager.create_process(1).unwrap();
    let heap = manager.allocate_memory(1, PAGE).unwrap();

    // frames 0..4 hold code and stack
    assert_eq!(manager.access_heap(1, heap + 8).unwrap(), 4);
    assert_eq!(
        manager.access_code(1, heap),
        Err(MemoryError::AccessViolation {
            pid: 1,
            address: heap,
            segment: Segment::Code
        })
    );
    assert!(matches!(
        manager.access_stack(1, 0),
        Err(MemoryError::AccessViolation { .. })
    ));
    assert!(matches!(
        manager.access_heap(1, heap + PAGE as u32),
        Err(MemoryError::AccessViolation { .. })
    ));
    assert_eq!(
        manager.access_heap(2, heap),
        Err(MemoryError::ProcessNotFound { pid: 2 })
    );
}

#[test]
fn test_processes_are_isolated() {
    let mut manager = get_test_manager(get_process_config());
    manager.create_process(1).unwrap();
    manager.create_process(2).unwrap();

    let first = manager.allocate_memory(1, PAGE).unwrap();
    let second = manager.allocate_memory(2, PAGE).unwrap();
    assert_eq!(first, second, "both heaps start after the code segment");

    let frame_1 = manager.access_heap(1, first).unwrap();
    let frame_2 = manager.access_heap(2, second).unwrap();
    assert_ne!(frame_1, frame_2);

    // cached translations are kept apart by pid
    assert_eq!(manager.access_heap(1, first).unwrap(), frame_1);
    assert_eq!(manager.access_heap(2, second).unwrap(), frame_2);
    assert!(manager.is_consistent());
}

#[test]
fn test_destroy_process() {
    let mut manager = get_test_manager(get_process_config());
    let free = manager.free_bytes();

    manager.switch_to_process(1).unwrap();
    manager.create_process(2).unwrap();
    let heap = manager.allocate_memory(1, 16 * PAGE).unwrap();
    manager.allocate_memory(2, 4 * PAGE).unwrap();
    manager.access_heap(1, heap).unwrap();
    manager.access_code(1, 0).unwrap();

    manager.destroy_process(1).unwrap();
    assert_eq!(manager.active_process(), None);
    assert!(manager.process(1).is_none());
    assert_eq!(manager.free_bytes(), free - 8 * PAGE);

    let cache = manager.translation_cache();
    assert!(!cache.l1_entries().iter().any(|entry| entry.pid == 1));
    assert!(cache.l2_entries(1).is_empty());

    assert_eq!(
        manager.access_heap(1, heap),
        Err(MemoryError::ProcessNotFound { pid: 1 })
    );
    assert_eq!(
        manager.destroy_process(1),
        Err(MemoryError::ProcessNotFound { pid: 1 })
    );
    assert!(manager.is_consistent());

    // the pid can be reused
    manager.create_process(1).unwrap();
    assert_eq!(manager.process(1).unwrap().heap_top(), 2 * PAGE);
}

#[test]
fn test_destroy_releases_swap_slots() {
    let mut manager = get_test_manager(get_test_config(8, 5, 2));
    manager.create_process(1).unwrap();
    manager.allocate_memory(1, 6 * PAGE).unwrap();
    manager.allocate_memory(1, PAGE).unwrap();
    assert_eq!(manager.swap().used_slots(), 1);

    manager.destroy_process(1).unwrap();
    assert_eq!(manager.swap().used_slots(), 0);
    assert_eq!(manager.free_bytes(), 8 * PAGE);
    assert!(manager.is_consistent());
}

#[test]
fn test_misses_per_segment() {
    let mut manager = get_test_manager(get_process_config());
    manager.create_process(1).unwrap();
    let heap = manager.allocate_memory(1, PAGE).unwrap();

    for _ in 0..2 {
        manager.access_code(1, 0x10).unwrap();
        manager.access_stack(1, u32::MAX).unwrap();
        manager.access_heap(1, heap).unwrap();
    }
    assert!(manager.access_code(1, heap).is_err());

    // only the first round misses the translation cache
    let statistics = manager.statistics();
    assert_eq!(statistics.code_misses, 1);
    assert_eq!(statistics.stack_misses, 1);
    assert_eq!(statistics.heap_misses, 1);
    assert_eq!(statistics.page_table_hits, 3);
    assert_eq!(statistics.page_faults, 0);
}
