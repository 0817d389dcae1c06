//! High-level LV2 kernel for cellemu
//!
//! Receives `sc` instructions from the PPU interpreter. Kernel calls are
//! served from a small syscall table, module calls from a registry of
//! host functions keyed by function id.

pub mod module;
pub mod syscall;

pub use module::{HostFunction, ModuleRegistry};
pub use syscall::{Lv2Kernel, CELL_EFAULT, CELL_ENOSYS, CELL_OK};
