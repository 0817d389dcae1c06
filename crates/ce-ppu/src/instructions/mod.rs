//! PPU instruction implementations
//!
//! Every handler has the [`crate::interpreter::Handler`] signature and is
//! reached only through the decode tables.

pub mod branch;
pub mod float;
pub mod integer;
pub mod load_store;
pub mod system;
pub mod vector;

use ce_core::error::PpuError;

use crate::decoder::Instruction;
use crate::thread::PpuThread;

pub type ExecResult = Result<(), PpuError>;

/// `(rA|0)`: r0 reads as zero in address computations
#[inline]
pub(crate) fn ra_or_zero(thread: &PpuThread, op: Instruction) -> u64 {
    if op.ra() == 0 {
        0
    } else {
        thread.gpr(op.ra())
    }
}

/// D-form effective address
#[inline]
pub(crate) fn ea_d(thread: &PpuThread, op: Instruction) -> u64 {
    ra_or_zero(thread, op).wrapping_add(op.simm() as u64)
}

/// DS-form effective address
#[inline]
pub(crate) fn ea_ds(thread: &PpuThread, op: Instruction) -> u64 {
    ra_or_zero(thread, op).wrapping_add(op.ds() as u64)
}

/// X-form effective address
#[inline]
pub(crate) fn ea_x(thread: &PpuThread, op: Instruction) -> u64 {
    ra_or_zero(thread, op).wrapping_add(thread.gpr(op.rb()))
}

/// Update forms use rA itself, even r0
#[inline]
pub(crate) fn ea_d_update(thread: &PpuThread, op: Instruction) -> u64 {
    thread.gpr(op.ra()).wrapping_add(op.simm() as u64)
}

#[inline]
pub(crate) fn ea_ds_update(thread: &PpuThread, op: Instruction) -> u64 {
    thread.gpr(op.ra()).wrapping_add(op.ds() as u64)
}

#[inline]
pub(crate) fn ea_x_update(thread: &PpuThread, op: Instruction) -> u64 {
    thread.gpr(op.ra()).wrapping_add(thread.gpr(op.rb()))
}
