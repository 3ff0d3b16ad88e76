use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::{vpn_of, MemoryConfig, MemoryError, Segment, TlbConfig};

use super::{get_test_config, get_test_manager, PAGE, SEED};

fn get_roomy_config() -> MemoryConfig {
    MemoryConfig {
        memory_size: 1024 * PAGE,
        swap_slots: 64,
        high_watermark: 64 * PAGE,
        low_watermark: 32 * PAGE,
        code_size: 4 * PAGE,
        stack_size: 4 * PAGE,
        tlb: TlbConfig {
            l1_capacity: 8,
            l2_capacity: 32,
            l2_partitions: 4,
        },
    }
}

#[test]
fn test_allocations_do_not_overlap() {
    let mut manager = get_test_manager(get_roomy_config());
    let mut rand = SmallRng::seed_from_u64(SEED);

    for pid in [1, 2] {
        manager.create_process(pid).unwrap();
    }

    let mut tops = [4 * PAGE, 4 * PAGE];
    for i in 0..20 {
        let pid = (i % 2) as u32 + 1;
        let size = rand.gen_range(1..=20 * PAGE);

        let base = manager.allocate_memory(pid, size).unwrap();
        let top = &mut tops[pid as usize - 1];
        assert_eq!(base as u64, *top, "regions of one process are contiguous");
        *top += size.div_ceil(PAGE) * PAGE;
        assert_eq!(manager.process(pid).unwrap().heap_top(), *top);

        assert!(manager.is_consistent(), "frames claimed twice after allocation {}", i);
    }

    // every allocated page is reachable
    for pid in [1, 2] {
        let heap = manager.process(pid).unwrap().heap_range();
        for address in heap.step_by(PAGE as usize) {
            manager.access_heap(pid, address as u32).unwrap();
        }
    }
    assert!(manager.is_consistent());
}

#[test]
fn test_allocation_is_rounded_to_frames() {
    let mut manager = get_test_manager(get_roomy_config());
    manager.create_process(1).unwrap();
    let free = manager.free_bytes();

    assert_eq!(manager.allocate_memory(1, 1).unwrap(), 0x4000);
    assert_eq!(manager.allocate_memory(1, PAGE + 1).unwrap(), 0x5000);
    assert_eq!(manager.process(1).unwrap().heap_top(), 0x7000);
    assert_eq!(manager.free_bytes(), free - 3 * PAGE);

    // nothing to map
    assert_eq!(manager.allocate_memory(1, 0).unwrap(), 0x7000);
    assert_eq!(manager.free_bytes(), free - 3 * PAGE);
}

#[test]
fn test_allocation_uses_large_pages() {
    let mut manager = get_test_manager(get_roomy_config());
    manager.create_process(1).unwrap();

    let base = manager.allocate_memory(1, 1024 * 1024).unwrap();
    let mapping = manager
        .process(1)
        .unwrap()
        .page_table()
        .lookup(vpn_of(base) + 100)
        .unwrap();
    assert_eq!(mapping.vpn, vpn_of(base));
    assert_eq!(mapping.page_size, 1024 * 1024);

    // 3 pages split into a 2 page and a 1 page mapping
    let base = manager.allocate_memory(1, 3 * PAGE).unwrap();
    let sizes: Vec<u64> = manager
        .process(1)
        .unwrap()
        .page_table()
        .mappings(vpn_of(base)..vpn_of(base) + 3)
        .map(|mapping| mapping.page_size)
        .collect();
    assert_eq!(sizes, vec![2 * PAGE, PAGE]);
}

#[test]
fn test_fragmented_memory_is_used() {
    let mut manager = get_test_manager(get_test_config(16, 2, 1));
    manager.create_process(1).unwrap();
    manager.create_process(2).unwrap();

    // interleave single pages to fragment physical memory
    for _ in 0..4 {
        manager.allocate_memory(1, PAGE).unwrap();
        manager.allocate_memory(2, PAGE).unwrap();
    }
    manager.destroy_process(2).unwrap();
    assert_eq!(manager.free_bytes(), 12 * PAGE);

    // frames 1, 3 and 5 are single holes, only 7..16 is a longer run
    let base = manager.allocate_memory(1, 10 * PAGE).unwrap();
    assert_eq!(manager.free_bytes(), 2 * PAGE);
    let runs: Vec<_> = manager
        .process(1)
        .unwrap()
        .page_table()
        .mappings(vpn_of(base)..)
        .map(|mapping| (mapping.frame, mapping.page_size))
        .collect();
    assert_eq!(runs, vec![(7, 8 * PAGE), (1, PAGE), (3, PAGE)]);
    assert_eq!(manager.statistics().swap_outs, 0);
    assert!(manager.is_consistent());
}

#[test]
fn test_free_memory() {
    let mut manager = get_test_manager(get_roomy_config());
    manager.create_process(1).unwrap();
    let free = manager.free_bytes();

    let first = manager.allocate_memory(1, 2 * PAGE).unwrap();
    let second = manager.allocate_memory(1, PAGE).unwrap();
    manager.access_heap(1, second).unwrap();

    // not the start of a region
    assert_eq!(
        manager.free_memory(1, first + PAGE as u32),
        Err(MemoryError::InvalidMapping {
            vpn: vpn_of(first) + 1
        })
    );
    // outside of the heap
    assert!(matches!(
        manager.free_memory(1, 0),
        Err(MemoryError::AccessViolation {
            segment: Segment::Heap,
            ..
        })
    ));

    // releases everything from first up to the heap top
    assert_eq!(manager.free_memory(1, first).unwrap(), 3 * PAGE);
    assert_eq!(manager.free_bytes(), free);
    assert_eq!(manager.process(1).unwrap().heap_top(), first as u64);
    assert!(!manager
        .translation_cache()
        .l1_entries()
        .iter()
        .any(|entry| entry.vpn == vpn_of(second)));

    assert_eq!(
        manager.access_heap(1, second),
        Err(MemoryError::AccessViolation {
            pid: 1,
            address: second,
            segment: Segment::Heap
        })
    );
    assert!(manager.is_consistent());

    // the heap can grow again from the same address
    assert_eq!(manager.allocate_memory(1, PAGE).unwrap(), first);
}

#[test]
fn test_out_of_memory() {
    let mut manager = get_test_manager(get_test_config(16, 2, 1));
    manager.create_process(1).unwrap();
    manager.allocate_memory(1, 4 * PAGE).unwrap();

    // even after evicting every page there are only 16 frames
    assert_eq!(
        manager.allocate_memory(1, 32 * PAGE),
        Err(MemoryError::OutOfMemory {
            requested: 32 * PAGE
        })
    );
    assert_eq!(manager.process(1).unwrap().heap_top(), 4 * PAGE);
    assert!(manager.is_consistent());

    assert_eq!(
        manager.allocate_memory(1, (1 << 32) + PAGE),
        Err(MemoryError::AddressSpaceExhausted {
            pid: 1,
            requested: (1 << 32) + PAGE
        })
    );
    // must not overflow while rounding up
    assert_eq!(
        manager.allocate_memory(1, u64::MAX),
        Err(MemoryError::AddressSpaceExhausted {
            pid: 1,
            requested: u64::MAX
        })
    );
    assert_eq!(manager.process(1).unwrap().heap_top(), 4 * PAGE);
    assert!(manager.is_consistent());

    assert_eq!(
        manager.allocate_memory(3, PAGE),
        Err(MemoryError::ProcessNotFound { pid: 3 })
    );
}
