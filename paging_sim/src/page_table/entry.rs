//! Bit-packed page directory and page table entries.
//!
//! Layout of both entry kinds (32 bit):
//!
//! ```text
//!  31        22   21        20      19                 0
//! +------------+---------+-------+--------------------+
//! |   unused   | present | valid |  table id / pfn    |
//! +------------+---------+-------+--------------------+
//! ```

use core::fmt;

use crate::address::PFN_BITS;

const INDEX_MASK: u32 = (1 << PFN_BITS) - 1;
const VALID_BIT: u32 = 1 << PFN_BITS;
const PRESENT_BIT: u32 = 1 << (PFN_BITS + 1);

macro_rules! packed_entry {
    ($(#[$meta: meta])* $name: ident, $index: ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq)]
        pub struct $name(u32);

        impl $name {
            pub const fn new($index: u32, valid: bool, present: bool) -> Self {
                debug_assert!($index <= INDEX_MASK);
                let mut raw = $index & INDEX_MASK;
                if valid {
                    raw |= VALID_BIT;
                }
                if present {
                    raw |= PRESENT_BIT;
                }
                Self(raw)
            }

            /// Entry that is valid and present
            pub const fn resident($index: u32) -> Self {
                Self::new($index, true, true)
            }

            pub const fn $index(self) -> u32 {
                self.0 & INDEX_MASK
            }

            pub const fn is_valid(self) -> bool {
                self.0 & VALID_BIT != 0
            }

            pub const fn is_present(self) -> bool {
                self.0 & PRESENT_BIT != 0
            }

            pub const fn with_present(self, present: bool) -> Self {
                if present {
                    Self(self.0 | PRESENT_BIT)
                } else {
                    Self(self.0 & !PRESENT_BIT)
                }
            }

            pub const fn raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name))
                    .field(stringify!($index), &self.$index())
                    .field("valid", &self.is_valid())
                    .field("present", &self.is_present())
                    .finish()
            }
        }
    };
}

packed_entry!(
    /// First level entry, points to the second level table of a mapping
    PageDirectoryEntry,
    table
);

packed_entry!(
    /// Second level entry, points to a physical frame
    PageTableEntry,
    frame
);

#[cfg(test)]
mod test {
    use super::{PageDirectoryEntry, PageTableEntry};

    #[test]
    fn test_entry_packing() {
        let pde = PageDirectoryEntry::resident(0xBDC00);
        assert_eq!(pde.raw(), (0b11 << 20) | 0xBDC00);
        assert_eq!(pde.table(), 0xBDC00);
        assert!(pde.is_valid() && pde.is_present());

        let swapped = pde.with_present(false);
        assert!(swapped.is_valid());
        assert!(!swapped.is_present());
        assert_eq!(swapped.table(), 0xBDC00);
        assert_eq!(swapped.with_present(true), pde);

        let pte = PageTableEntry::new(0xFFFFF, true, false);
        assert_eq!(pte.frame(), 0xFFFFF);
        assert!(pte.is_valid());
        assert!(!pte.is_present());
    }
}
