use std::collections::BTreeMap;

use log::trace;

use super::{SwapSlot, SwapStorageModule};
use crate::{
    address::{Pid, Vpn},
    error::MemoryError,
};

/// Fixed size table of swap slots with an index from `(pid, vpn)` to the slot
pub struct SlotTableSwapStorageModule {
    slots: Vec<Option<SwapSlot>>,

    index: BTreeMap<(Pid, Vpn), usize>,

    /// stack of unused slot indices, lowest index on top
    free_list: Vec<usize>,
}

impl SwapStorageModule for SlotTableSwapStorageModule {
    fn new(slot_count: usize) -> Self {
        Self {
            slots: vec![None; slot_count],
            index: BTreeMap::new(),
            free_list: (0..slot_count).rev().collect(),
        }
    }

    fn slot_count(&self) -> usize {
        self.slots.len()
    }

    fn used_slots(&self) -> usize {
        self.index.len()
    }

    fn store(&mut self, slot: SwapSlot) -> Result<usize, MemoryError> {
        debug_assert!(
            !self.index.contains_key(&(slot.pid, slot.vpn)),
            "vpn {:#x} of process {} is already on disk",
            slot.vpn,
            slot.pid
        );

        let slot_index = self.free_list.pop().ok_or(MemoryError::DiskFull)?;
        trace!(
            "Storing vpn {:#x} of process {} in swap slot {}",
            slot.vpn,
            slot.pid,
            slot_index
        );

        self.index.insert((slot.pid, slot.vpn), slot_index);
        self.slots[slot_index] = Some(slot);
        Ok(slot_index)
    }

    fn get(&self, pid: Pid, vpn: Vpn) -> Option<(usize, &SwapSlot)> {
        let slot_index = *self.index.get(&(pid, vpn))?;
        let slot = self.slots[slot_index].as_ref()?;
        Some((slot_index, slot))
    }

    fn remove(&mut self, pid: Pid, vpn: Vpn) -> Option<SwapSlot> {
        let slot_index = self.index.remove(&(pid, vpn))?;
        let slot = self.slots[slot_index].take();
        self.free_list.push(slot_index);
        slot
    }
}

#[cfg(test)]
mod test {
    use super::super::test::test_swap_storage_generic;
    use super::SlotTableSwapStorageModule;

    #[test]
    fn test_slot_table_generic() {
        test_swap_storage_generic::<SlotTableSwapStorageModule>();
    }
}
