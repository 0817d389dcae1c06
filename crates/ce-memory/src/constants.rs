//! Guest memory map constants

/// Main memory base address
pub const MAIN_MEM_BASE: u32 = 0x0000_0000;
/// Main memory size (256 MB)
pub const MAIN_MEM_SIZE: u32 = 0x1000_0000;

/// User memory base address
pub const USER_MEM_BASE: u32 = 0x2000_0000;
/// User memory size (256 MB)
pub const USER_MEM_SIZE: u32 = 0x1000_0000;

/// Stack area base
pub const STACK_BASE: u32 = 0xD000_0000;
/// Stack area size
pub const STACK_SIZE: u32 = 0x1000_0000;

/// Standard page size (4 KB)
pub const PAGE_SIZE: u32 = 0x1000;

/// Data cache line size, the block cleared by `dcbz`
pub const CACHE_LINE_SIZE: u32 = 128;

/// Total address space size (4 GB, 32-bit)
pub const ADDRESS_SPACE_SIZE: u64 = 0x1_0000_0000;
