//! Special-purpose register moves, storage control and FPSCR instructions

use std::sync::atomic::{fence, Ordering};

use super::ExecResult;
use crate::decoder::Instruction;
use crate::interpreter::PpuInterpreter;
use crate::thread::{Fpscr, PpuThread};

// User-mode SPR numbers
const SPR_XER: u32 = 1;
const SPR_LR: u32 = 8;
const SPR_CTR: u32 = 9;
const SPR_VRSAVE: u32 = 256;
const SPR_TBL: u32 = 268;
const SPR_TBU: u32 = 269;

/// CR mask covering the fields selected by an 8-bit field mask
fn field_mask(crm: u32) -> u32 {
    (0..8)
        .filter(|i| crm & (0x80 >> i) != 0)
        .fold(0, |mask, i| mask | (0xF << (28 - 4 * i)))
}

/// Sample the time base into the thread and return the requested half
fn read_timebase(ppu: &PpuInterpreter, thread: &mut PpuThread, spr: u32) -> u64 {
    thread.regs.tb = ppu.timebase();
    if spr == SPR_TBU {
        thread.regs.tb >> 32
    } else {
        thread.regs.tb
    }
}

pub fn mfspr(ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let value = match op.spr() {
        SPR_XER => thread.regs.xer,
        SPR_LR => thread.regs.lr,
        SPR_CTR => thread.regs.ctr,
        SPR_VRSAVE => thread.regs.vrsave as u64,
        spr @ (SPR_TBL | SPR_TBU) => read_timebase(ppu, thread, spr),
        spr => return ppu.unimplemented(thread, op, &format!("mfspr {}", spr)),
    };
    thread.set_gpr(op.rd(), value);
    Ok(())
}

pub fn mtspr(ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let value = thread.gpr(op.rs());
    match op.spr() {
        SPR_XER => thread.regs.xer = value,
        SPR_LR => thread.regs.lr = value,
        SPR_CTR => thread.regs.ctr = value,
        SPR_VRSAVE => thread.regs.vrsave = value as u32,
        spr => return ppu.unimplemented(thread, op, &format!("mtspr {}", spr)),
    }
    Ok(())
}

pub fn mftb(ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    match op.spr() {
        spr @ (SPR_TBL | SPR_TBU) => {
            let value = read_timebase(ppu, thread, spr);
            thread.set_gpr(op.rd(), value);
            Ok(())
        }
        spr => ppu.unimplemented(thread, op, &format!("mftb {}", spr)),
    }
}

/// `mfcr`, or `mfocrf` when bit 20 is set: only the selected field, the rest read as zero
pub fn mfcr(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let cr = thread.regs.cr;
    let value = if op.one_field() { cr & field_mask(op.crm()) } else { cr };
    thread.set_gpr(op.rd(), value as u64);
    Ok(())
}

/// `mtcrf` and `mtocrf`
pub fn mtcrf(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let mask = field_mask(op.crm());
    let value = thread.gpr(op.rs()) as u32;
    thread.regs.cr = (thread.regs.cr & !mask) | (value & mask);
    Ok(())
}

pub fn sync(_ppu: &PpuInterpreter, _thread: &mut PpuThread, _op: Instruction) -> ExecResult {
    fence(Ordering::SeqCst);
    Ok(())
}

pub fn eieio(_ppu: &PpuInterpreter, _thread: &mut PpuThread, _op: Instruction) -> ExecResult {
    fence(Ordering::SeqCst);
    Ok(())
}

/// Instructions are never cached, so there is nothing to discard
pub fn isync(_ppu: &PpuInterpreter, _thread: &mut PpuThread, _op: Instruction) -> ExecResult {
    Ok(())
}

macro_rules! cache_hints {
    ($($name:ident),* $(,)?) => {
        $(
            pub fn $name(_ppu: &PpuInterpreter, _thread: &mut PpuThread, _op: Instruction) -> ExecResult {
                Ok(())
            }
        )*
    };
}

cache_hints!(dcbst, dcbf, dcbt, dcbtst, icbi, dst, dstst, dss);

pub fn eciwx(ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    ppu.unimplemented(thread, op, "eciwx")
}

pub fn ecowx(ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    ppu.unimplemented(thread, op, "ecowx")
}

// FPSCR

#[inline]
fn record_cr1(thread: &mut PpuThread, op: Instruction) {
    if op.rc() {
        thread.update_cr1();
    }
}

/// FPSCR bit `bt` (0 is the most significant) as a flag
#[inline]
fn fpscr_bit(bt: u32) -> Fpscr {
    Fpscr::from_bits_retain(1 << (31 - (bt & 31)))
}

pub fn mffs(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    thread.set_fpr_bits(op.rd(), thread.regs.fpscr as u64);
    record_cr1(thread, op);
    Ok(())
}

/// Copy the FPSCR fields selected by FM from the low word of frB
pub fn mtfsf(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let mask = field_mask(op.fm());
    let value = thread.fpr_bits(op.rb()) as u32;
    thread.set_fpscr((thread.regs.fpscr & !mask) | (value & mask));
    record_cr1(thread, op);
    Ok(())
}

pub fn mtfsfi(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let shift = 28 - 4 * op.crfd() as u32;
    let fpscr = (thread.regs.fpscr & !(0xF << shift)) | (op.fp_imm() << shift);
    thread.set_fpscr(fpscr);
    record_cr1(thread, op);
    Ok(())
}

/// Set one FPSCR bit; exception bits also raise FX. FEX and VX are summaries.
pub fn mtfsb1(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let bit = fpscr_bit(op.crbd());
    if Fpscr::STICKY.difference(Fpscr::FX).contains(bit) {
        thread.set_fp_exception(bit);
    } else if !bit.intersects(Fpscr::FEX | Fpscr::VX) {
        thread.regs.fpscr |= bit.bits();
        thread.refresh_fp_summary();
    }
    record_cr1(thread, op);
    Ok(())
}

pub fn mtfsb0(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let bit = fpscr_bit(op.crbd());
    if !bit.intersects(Fpscr::FEX | Fpscr::VX) {
        thread.regs.fpscr &= !bit.bits();
        thread.refresh_fp_summary();
    }
    record_cr1(thread, op);
    Ok(())
}

/// Copy an FPSCR field to a CR field, clearing the exception bits copied
pub fn mcrfs(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let shift = 28 - 4 * op.crfs() as u32;
    let field = (thread.regs.fpscr >> shift) & 0xF;
    thread.set_cr_field(op.crfd(), field);
    let cleared = Fpscr::STICKY.bits() & (0xF << shift);
    thread.set_fpscr(thread.regs.fpscr & !cleared);
    Ok(())
}
