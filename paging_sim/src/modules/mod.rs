pub mod eviction_policy;
pub mod frame_allocator;
pub mod swap_storage;
