//! Guest address space
//!
//! Every region is a contiguous block of host memory. Values are stored in
//! guest (big-endian) byte order; the typed accessors convert on the way in
//! and out. The 32- and 64-bit compare-and-swap primitives operate directly
//! on the backing storage with host atomics, so two guest threads racing a
//! store-conditional on the same word see exactly one winner.

use std::ptr::NonNull;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use ce_core::config::MemoryConfig;
use ce_core::error::MemoryError;
use ce_core::mem_trace;
use parking_lot::Mutex;

use crate::constants::*;
use crate::pages::PageFlags;

/// A value that can be stored in guest memory in big-endian order
pub trait MemoryValue: Copy {
    type Bytes: AsRef<[u8]> + AsMut<[u8]> + Default;

    fn from_be(bytes: Self::Bytes) -> Self;
    fn to_be(self) -> Self::Bytes;
}

macro_rules! impl_memory_value {
    ($($ty:ty),*) => {
        $(
            impl MemoryValue for $ty {
                type Bytes = [u8; std::mem::size_of::<$ty>()];

                #[inline]
                fn from_be(bytes: Self::Bytes) -> Self {
                    <$ty>::from_be_bytes(bytes)
                }

                #[inline]
                fn to_be(self) -> Self::Bytes {
                    self.to_be_bytes()
                }
            }
        )*
    };
}

impl_memory_value!(u8, u16, u32, u64, u128);

/// Anonymous host memory backing one region
struct Backing {
    ptr: NonNull<u8>,
    len: usize,
}

// SAFETY: the backing is a plain byte buffer owned by the region; concurrent
// guest accesses are the guest's responsibility, and the reservation CAS goes
// through host atomics.
unsafe impl Send for Backing {}
unsafe impl Sync for Backing {}

impl Backing {
    #[cfg(unix)]
    fn new(len: usize) -> Option<Self> {
        // SAFETY: anonymous private mapping, no file descriptor involved.
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return None;
        }
        NonNull::new(ptr.cast::<u8>()).map(|ptr| Self { ptr, len })
    }

    #[cfg(not(unix))]
    fn new(len: usize) -> Option<Self> {
        let layout = std::alloc::Layout::from_size_align(len, PAGE_SIZE as usize).ok()?;
        // SAFETY: layout has a non-zero size, checked by the caller.
        let ptr = unsafe { std::alloc::alloc_zeroed(layout) };
        NonNull::new(ptr).map(|ptr| Self { ptr, len })
    }
}

impl Drop for Backing {
    #[cfg(unix)]
    fn drop(&mut self) {
        // SAFETY: ptr/len came from a successful mmap.
        unsafe {
            libc::munmap(self.ptr.as_ptr().cast(), self.len);
        }
    }

    #[cfg(not(unix))]
    fn drop(&mut self) {
        if let Ok(layout) = std::alloc::Layout::from_size_align(self.len, PAGE_SIZE as usize) {
            // SAFETY: allocated in Backing::new with the same layout.
            unsafe { std::alloc::dealloc(self.ptr.as_ptr(), layout) }
        }
    }
}

/// A mapped region of the guest address space
struct Region {
    base: u32,
    size: u32,
    flags: PageFlags,
    backing: Backing,
}

impl Region {
    #[inline]
    fn contains(&self, addr: u32, len: usize) -> bool {
        addr >= self.base && (addr - self.base) as u64 + len as u64 <= self.size as u64
    }
}

/// Memory manager for the guest address space
pub struct MemoryManager {
    regions: Vec<Region>,
    /// Next free address of the user-region bump allocator
    user_next: Mutex<u32>,
}

impl MemoryManager {
    /// Create the default layout (main, user and stack regions)
    pub fn new() -> Result<Arc<Self>, MemoryError> {
        Self::from_config(&MemoryConfig::default())
    }

    /// Create the standard layout with the region sizes from `config`
    pub fn from_config(config: &MemoryConfig) -> Result<Arc<Self>, MemoryError> {
        Self::with_regions(&[
            (MAIN_MEM_BASE, config.main_size, PageFlags::RWX),
            (USER_MEM_BASE, config.user_size, PageFlags::RW),
            (STACK_BASE, config.stack_size, PageFlags::RW),
        ])
    }

    /// Create an address space from explicit `(base, size, flags)` regions
    pub fn with_regions(layout: &[(u32, u32, PageFlags)]) -> Result<Arc<Self>, MemoryError> {
        let mut regions: Vec<Region> = Vec::with_capacity(layout.len());

        for &(base, size, flags) in layout {
            if size == 0 || base % PAGE_SIZE != 0 || base as u64 + size as u64 > ADDRESS_SPACE_SIZE {
                return Err(MemoryError::MapFailed { base, size });
            }
            let overlaps = regions.iter().any(|r| {
                (base as u64) < r.base as u64 + r.size as u64 && (r.base as u64) < base as u64 + size as u64
            });
            if overlaps {
                return Err(MemoryError::MapFailed { base, size });
            }

            let backing = Backing::new(size as usize).ok_or(MemoryError::MapFailed { base, size })?;
            tracing::debug!(target: "memory", "Mapped 0x{:08x}..0x{:08x} ({:?})", base, base as u64 + size as u64, flags);
            regions.push(Region { base, size, flags, backing });
        }

        Ok(Arc::new(Self {
            regions,
            user_next: Mutex::new(USER_MEM_BASE),
        }))
    }

    /// Whether `len` bytes at `addr` are mapped
    pub fn is_mapped(&self, addr: u32, len: usize) -> bool {
        self.regions.iter().any(|r| r.contains(addr, len))
    }

    /// Resolve a guest range to a host pointer
    #[inline]
    fn host_ptr(&self, addr: u32, len: usize, write: bool) -> Result<*mut u8, MemoryError> {
        let region = self
            .regions
            .iter()
            .find(|r| r.contains(addr, len))
            .ok_or(MemoryError::Unmapped(addr))?;

        if !region.flags.permits(write) {
            return Err(if write {
                MemoryError::ReadOnly(addr)
            } else {
                MemoryError::Unmapped(addr)
            });
        }

        // SAFETY: contains() guarantees the offset range lies inside the backing.
        Ok(unsafe { region.backing.ptr.as_ptr().add((addr - region.base) as usize) })
    }

    /// Copy guest bytes starting at `addr` into `buf`
    pub fn read_bytes(&self, addr: u32, buf: &mut [u8]) -> Result<(), MemoryError> {
        if buf.is_empty() {
            return Ok(());
        }
        let src = self.host_ptr(addr, buf.len(), false)?;
        // SAFETY: src is valid for buf.len() bytes and cannot alias a Rust slice.
        unsafe { std::ptr::copy_nonoverlapping(src, buf.as_mut_ptr(), buf.len()) };
        Ok(())
    }

    /// Copy `data` into guest memory starting at `addr`
    pub fn write_bytes(&self, addr: u32, data: &[u8]) -> Result<(), MemoryError> {
        if data.is_empty() {
            return Ok(());
        }
        let dst = self.host_ptr(addr, data.len(), true)?;
        // SAFETY: dst is valid for data.len() bytes.
        unsafe { std::ptr::copy_nonoverlapping(data.as_ptr(), dst, data.len()) };
        Ok(())
    }

    /// Read a big-endian value
    #[inline]
    pub fn read<T: MemoryValue>(&self, addr: u32) -> Result<T, MemoryError> {
        let mut bytes = T::Bytes::default();
        self.read_bytes(addr, bytes.as_mut())?;
        Ok(T::from_be(bytes))
    }

    /// Write a value in big-endian order
    #[inline]
    pub fn write<T: MemoryValue>(&self, addr: u32, value: T) -> Result<(), MemoryError> {
        self.write_bytes(addr, value.to_be().as_ref())
    }

    #[inline]
    pub fn read_u8(&self, addr: u32) -> Result<u8, MemoryError> {
        self.read(addr)
    }

    #[inline]
    pub fn read_be16(&self, addr: u32) -> Result<u16, MemoryError> {
        self.read(addr)
    }

    #[inline]
    pub fn read_be32(&self, addr: u32) -> Result<u32, MemoryError> {
        self.read(addr)
    }

    #[inline]
    pub fn read_be64(&self, addr: u32) -> Result<u64, MemoryError> {
        self.read(addr)
    }

    #[inline]
    pub fn read_be128(&self, addr: u32) -> Result<u128, MemoryError> {
        self.read(addr)
    }

    #[inline]
    pub fn write_u8(&self, addr: u32, value: u8) -> Result<(), MemoryError> {
        self.write(addr, value)
    }

    #[inline]
    pub fn write_be16(&self, addr: u32, value: u16) -> Result<(), MemoryError> {
        self.write(addr, value)
    }

    #[inline]
    pub fn write_be32(&self, addr: u32, value: u32) -> Result<(), MemoryError> {
        self.write(addr, value)
    }

    #[inline]
    pub fn write_be64(&self, addr: u32, value: u64) -> Result<(), MemoryError> {
        self.write(addr, value)
    }

    #[inline]
    pub fn write_be128(&self, addr: u32, value: u128) -> Result<(), MemoryError> {
        self.write(addr, value)
    }

    /// Read `count` bytes at `addr` into the start of `buf`
    pub fn read_left(&self, buf: &mut [u8], addr: u32, count: usize) -> Result<(), MemoryError> {
        let count = count.min(buf.len());
        self.read_bytes(addr, &mut buf[..count])
    }

    /// Read `count` bytes at `addr` into the end of `buf`
    pub fn read_right(&self, buf: &mut [u8], addr: u32, count: usize) -> Result<(), MemoryError> {
        let count = count.min(buf.len());
        let start = buf.len() - count;
        self.read_bytes(addr, &mut buf[start..])
    }

    /// Write the first `count` bytes of `buf` to `addr`
    pub fn write_left(&self, buf: &[u8], addr: u32, count: usize) -> Result<(), MemoryError> {
        let count = count.min(buf.len());
        self.write_bytes(addr, &buf[..count])
    }

    /// Write the last `count` bytes of `buf` to `addr`
    pub fn write_right(&self, buf: &[u8], addr: u32, count: usize) -> Result<(), MemoryError> {
        let count = count.min(buf.len());
        self.write_bytes(addr, &buf[buf.len() - count..])
    }

    /// Fill `len` bytes at `addr` with `byte`
    pub fn fill(&self, addr: u32, len: usize, byte: u8) -> Result<(), MemoryError> {
        if len == 0 {
            return Ok(());
        }
        let dst = self.host_ptr(addr, len, true)?;
        // SAFETY: dst is valid for len bytes.
        unsafe { std::ptr::write_bytes(dst, byte, len) };
        Ok(())
    }

    /// Atomically replace the big-endian word at `addr` if it still equals `expected`
    pub fn compare_and_swap_be32(&self, addr: u32, expected: u32, new: u32) -> Result<bool, MemoryError> {
        if addr % 4 != 0 {
            return Err(MemoryError::Misaligned { addr, align: 4 });
        }
        let ptr = self.host_ptr(addr, 4, true)?;
        // SAFETY: ptr is 4-byte aligned (page-aligned region base plus aligned
        // offset) and valid for the lifetime of self.
        let atom = unsafe { AtomicU32::from_ptr(ptr.cast::<u32>()) };
        Ok(atom
            .compare_exchange(expected.to_be(), new.to_be(), Ordering::SeqCst, Ordering::SeqCst)
            .is_ok())
    }

    /// Atomically replace the big-endian doubleword at `addr` if it still equals `expected`
    pub fn compare_and_swap_be64(&self, addr: u32, expected: u64, new: u64) -> Result<bool, MemoryError> {
        if addr % 8 != 0 {
            return Err(MemoryError::Misaligned { addr, align: 8 });
        }
        let ptr = self.host_ptr(addr, 8, true)?;
        // SAFETY: as above, with 8-byte alignment.
        let atom = unsafe { AtomicU64::from_ptr(ptr.cast::<u64>()) };
        Ok(atom
            .compare_exchange(expected.to_be(), new.to_be(), Ordering::SeqCst, Ordering::SeqCst)
            .is_ok())
    }

    /// Allocate a block from the user region
    pub fn allocate(&self, size: u32, align: u32) -> Result<u32, MemoryError> {
        let region = self
            .regions
            .iter()
            .find(|r| r.base == USER_MEM_BASE)
            .ok_or(MemoryError::OutOfMemory { size })?;

        let align = align.max(1).next_power_of_two() as u64;
        let mut next = self.user_next.lock();
        let addr = (*next as u64 + align - 1) & !(align - 1);
        let end = addr + size as u64;
        if size == 0 || end > region.base as u64 + region.size as u64 {
            return Err(MemoryError::OutOfMemory { size });
        }

        *next = end as u32;
        mem_trace!("allocate(0x{:x}) -> 0x{:08x}", size, addr);
        Ok(addr as u32)
    }
}
