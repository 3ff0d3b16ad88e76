mod address;
mod error;
mod memory_config;
mod memory_manager;
mod page_table;
mod process;
mod translation_cache;
mod util;

#[cfg(test)]
mod test;

pub use address::{
    address_of, frames_per_page, vpn_of, Pfn, Pid, VirtualAddress, Vpn, ADDRESS_SPACE_SIZE,
    BASE_FRAME_SIZE, MAX_PAGE_SIZE,
};
pub use error::MemoryError;
pub use memory_config::{MemoryConfig, TlbConfig};
pub use memory_manager::{DefaultMemoryManager, MemoryManager, MemoryStatistics};
pub use page_table::{
    FreedMapping, Mapping, PageDirectoryEntry, PageTable, PageTableEntry, Translation,
};
pub use process::{Process, Segment};
pub use translation_cache::{TlbEntry, TlbStatistics, TranslationCache};
pub mod modules;
