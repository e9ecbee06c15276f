//! a directory's anchor block viewed as fixed 8-byte child-id slots

use super::{is_zero_slot, DIR_SLOT_SIZE};
use crate::error::{Result, VolumeError};

/// Decoded view of a directory anchor block.
///
/// The block packs `max_items_per_directory` little-endian node ids starting
/// at offset 0. Id 0 never names a child (entry 0 is reserved), so a zero
/// slot is a free slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryBlock {
    slots: Vec<u64>,
}

impl DirectoryBlock {
    /// decode the first `capacity` slots of an anchor block
    pub fn parse(block: &[u8], capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        for cell in block.chunks_exact(DIR_SLOT_SIZE).take(capacity) {
            if is_zero_slot(cell) {
                slots.push(0);
            } else {
                slots.push(u64::from_le_bytes(cell.try_into().unwrap()));
            }
        }
        slots.resize(capacity, 0);
        DirectoryBlock { slots }
    }

    /// node ids of the children, in slot order
    pub fn entries(&self) -> impl Iterator<Item = u64> + '_ {
        self.slots.iter().copied().filter(|&id| id != 0)
    }

    pub fn len(&self) -> usize {
        self.entries().count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().next().is_none()
    }

    pub fn has_free_slot(&self) -> bool {
        self.slots.iter().any(|&id| id == 0)
    }

    /// Writes `id` into the first free slot.
    pub fn insert(&mut self, id: u64) -> Result<()> {
        match self.slots.iter_mut().find(|slot| **slot == 0) {
            Some(slot) => {
                *slot = id;
                Ok(())
            }
            None => Err(VolumeError::DirectoryFull),
        }
    }

    /// Clears the slot holding `id`; reports whether it was present.
    pub fn remove(&mut self, id: u64) -> bool {
        match self.slots.iter_mut().find(|slot| **slot == id) {
            Some(slot) => {
                *slot = 0;
                true
            }
            None => false,
        }
    }

    /// re-encode the slots into the head of an anchor block buffer
    pub fn write_into(&self, block: &mut [u8]) {
        for (cell, id) in block
            .chunks_exact_mut(DIR_SLOT_SIZE)
            .zip(self.slots.iter())
        {
            cell.copy_from_slice(&id.to_le_bytes());
        }
    }
}
