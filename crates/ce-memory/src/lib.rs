//! Guest memory for cellemu
//!
//! A 32-bit big-endian address space made of fixed host-backed regions,
//! plus the per-thread reservation record used by the load-and-reserve /
//! store-conditional instruction pair.

pub mod constants;
pub mod manager;
pub mod pages;
pub mod reservation;

pub use ce_core::error::MemoryError;
pub use manager::{MemoryManager, MemoryValue};
pub use pages::PageFlags;
pub use reservation::Reservation;
