//! Load-and-reserve bookkeeping
//!
//! The record itself is private to one hardware thread and needs no
//! synchronisation. Only the final commit touches shared state, through
//! the manager's atomic compare-and-swap.

use ce_core::error::MemoryError;

use crate::manager::MemoryManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reserved {
    Word { addr: u32, value: u32 },
    Doubleword { addr: u32, value: u64 },
}

/// Reservation held by one PPU thread
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reservation {
    slot: Option<Reserved>,
}

impl Reservation {
    pub const fn new() -> Self {
        Self { slot: None }
    }

    /// Record a word reservation (`lwarx`)
    pub fn reserve_word(&mut self, addr: u32, value: u32) {
        self.slot = Some(Reserved::Word { addr, value });
    }

    /// Record a doubleword reservation (`ldarx`)
    pub fn reserve_doubleword(&mut self, addr: u32, value: u64) {
        self.slot = Some(Reserved::Doubleword { addr, value });
    }

    /// Drop any reservation
    pub fn clear(&mut self) {
        self.slot = None;
    }

    pub fn is_active(&self) -> bool {
        self.slot.is_some()
    }

    /// Reserved address, if any
    pub fn address(&self) -> Option<u32> {
        match self.slot {
            Some(Reserved::Word { addr, .. } | Reserved::Doubleword { addr, .. }) => Some(addr),
            None => None,
        }
    }

    /// Commit a conditional word store (`stwcx.`)
    ///
    /// Succeeds only if a word reservation exists for `addr` and memory still
    /// holds the reserved value. The reservation is consumed either way.
    pub fn store_word_conditional(
        &mut self,
        memory: &MemoryManager,
        addr: u32,
        value: u32,
    ) -> Result<bool, MemoryError> {
        match self.slot.take() {
            Some(Reserved::Word { addr: reserved, value: expected }) if reserved == addr => {
                memory.compare_and_swap_be32(addr, expected, value)
            }
            _ => Ok(false),
        }
    }

    /// Commit a conditional doubleword store (`stdcx.`)
    pub fn store_doubleword_conditional(
        &mut self,
        memory: &MemoryManager,
        addr: u32,
        value: u64,
    ) -> Result<bool, MemoryError> {
        match self.slot.take() {
            Some(Reserved::Doubleword { addr: reserved, value: expected }) if reserved == addr => {
                memory.compare_and_swap_be64(addr, expected, value)
            }
            _ => Ok(false),
        }
    }
}
