//! Integer instructions
//!
//! Arithmetic, logical, compare, trap and rotate/shift instructions. Record
//! forms update CR0 after the destination is written; overflow-enabled XO
//! forms update XER.OV (and the sticky SO) before that, so CR0.SO sees it.

use std::cmp::Ordering;

use ce_core::error::PpuError;

use super::{ra_or_zero, ExecResult};
use crate::decoder::Instruction;
use crate::interpreter::PpuInterpreter;
use crate::rotate::{mask32, mask64, rotl32, rotl64};
use crate::thread::{PpuThread, CR_EQ, CR_GT, CR_LT};

/// Carry out of a 64-bit addition
#[inline]
pub fn carry2(a: u64, b: u64) -> bool {
    a.wrapping_add(b) < a
}

/// Carry out of a three-operand addition
#[inline]
pub fn carry3(a: u64, b: u64, c: u64) -> bool {
    carry2(a, b) || carry2(a.wrapping_add(b), c)
}

/// Signed overflow of `a + b + c` where `c` is a 0/1 carry-in
#[inline]
fn add_overflows(a: u64, b: u64, c: u64) -> bool {
    let sum = a as i64 as i128 + b as i64 as i128 + c as i128;
    sum > i64::MAX as i128 || sum < i64::MIN as i128
}

/// CR field value for an ordered comparison
#[inline]
pub fn compare<T: Ord>(a: T, b: T) -> u32 {
    match a.cmp(&b) {
        Ordering::Less => CR_LT,
        Ordering::Greater => CR_GT,
        Ordering::Equal => CR_EQ,
    }
}

/// Shared body of the add/subtract-from family
#[inline]
fn add_extended(thread: &mut PpuThread, op: Instruction, a: u64, b: u64, carry_in: u64, set_carry: bool) {
    let result = a.wrapping_add(b).wrapping_add(carry_in);
    if set_carry {
        thread.set_xer_ca(carry3(a, b, carry_in));
    }
    if op.oe() {
        thread.set_xer_ov(add_overflows(a, b, carry_in));
    }
    thread.set_gpr(op.rd(), result);
    if op.rc() {
        thread.update_cr0(result);
    }
}

#[inline]
fn carry_bit(thread: &PpuThread) -> u64 {
    thread.get_xer_ca() as u64
}

/// Write an XO-form result that carries its own overflow verdict
#[inline]
fn write_xo(thread: &mut PpuThread, op: Instruction, result: u64, overflow: bool) {
    if op.oe() {
        thread.set_xer_ov(overflow);
    }
    thread.set_gpr(op.rd(), result);
    if op.rc() {
        thread.update_cr0(result);
    }
}

/// Write an X-form result to rA with optional CR0 update
#[inline]
fn write_ra(thread: &mut PpuThread, op: Instruction, result: u64) {
    thread.set_gpr(op.ra(), result);
    if op.rc() {
        thread.update_cr0(result);
    }
}

// D-form arithmetic

pub fn addi(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let value = ra_or_zero(thread, op).wrapping_add(op.simm() as u64);
    thread.set_gpr(op.rd(), value);
    Ok(())
}

pub fn addis(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let value = ra_or_zero(thread, op).wrapping_add((op.simm() << 16) as u64);
    thread.set_gpr(op.rd(), value);
    Ok(())
}

pub fn addic(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let a = thread.gpr(op.ra());
    let imm = op.simm() as u64;
    thread.set_xer_ca(carry2(a, imm));
    thread.set_gpr(op.rd(), a.wrapping_add(imm));
    Ok(())
}

/// `addic.`: always records
pub fn addic_(ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    addic(ppu, thread, op)?;
    thread.update_cr0(thread.gpr(op.rd()));
    Ok(())
}

pub fn subfic(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let a = !thread.gpr(op.ra());
    let imm = op.simm() as u64;
    thread.set_xer_ca(carry3(a, imm, 1));
    thread.set_gpr(op.rd(), a.wrapping_add(imm).wrapping_add(1));
    Ok(())
}

pub fn mulli(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let value = (thread.gpr(op.ra()) as i64).wrapping_mul(op.simm());
    thread.set_gpr(op.rd(), value as u64);
    Ok(())
}

// XO-form add/subtract

pub fn add(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let (a, b) = (thread.gpr(op.ra()), thread.gpr(op.rb()));
    add_extended(thread, op, a, b, 0, false);
    Ok(())
}

pub fn addc(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let (a, b) = (thread.gpr(op.ra()), thread.gpr(op.rb()));
    add_extended(thread, op, a, b, 0, true);
    Ok(())
}

pub fn adde(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let (a, b, c) = (thread.gpr(op.ra()), thread.gpr(op.rb()), carry_bit(thread));
    add_extended(thread, op, a, b, c, true);
    Ok(())
}

pub fn addme(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let (a, c) = (thread.gpr(op.ra()), carry_bit(thread));
    add_extended(thread, op, a, u64::MAX, c, true);
    Ok(())
}

pub fn addze(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let (a, c) = (thread.gpr(op.ra()), carry_bit(thread));
    add_extended(thread, op, a, 0, c, true);
    Ok(())
}

pub fn subf(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let (a, b) = (!thread.gpr(op.ra()), thread.gpr(op.rb()));
    add_extended(thread, op, a, b, 1, false);
    Ok(())
}

pub fn subfc(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let (a, b) = (!thread.gpr(op.ra()), thread.gpr(op.rb()));
    add_extended(thread, op, a, b, 1, true);
    Ok(())
}

pub fn subfe(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let (a, b, c) = (!thread.gpr(op.ra()), thread.gpr(op.rb()), carry_bit(thread));
    add_extended(thread, op, a, b, c, true);
    Ok(())
}

pub fn subfme(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let (a, c) = (!thread.gpr(op.ra()), carry_bit(thread));
    add_extended(thread, op, a, u64::MAX, c, true);
    Ok(())
}

pub fn subfze(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let (a, c) = (!thread.gpr(op.ra()), carry_bit(thread));
    add_extended(thread, op, a, 0, c, true);
    Ok(())
}

pub fn neg(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let a = !thread.gpr(op.ra());
    add_extended(thread, op, a, 0, 1, false);
    Ok(())
}

// Multiply / divide

pub fn mullw(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let a = thread.gpr(op.ra()) as i32 as i64;
    let b = thread.gpr(op.rb()) as i32 as i64;
    let product = a * b;
    write_xo(thread, op, product as u64, product != product as i32 as i64);
    Ok(())
}

pub fn mulld(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let a = thread.gpr(op.ra()) as i64;
    let b = thread.gpr(op.rb()) as i64;
    let (product, overflow) = a.overflowing_mul(b);
    write_xo(thread, op, product as u64, overflow);
    Ok(())
}

pub fn mulhw(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let a = thread.gpr(op.ra()) as i32 as i64;
    let b = thread.gpr(op.rb()) as i32 as i64;
    let result = ((a * b) >> 32) as u64;
    thread.set_gpr(op.rd(), result);
    if op.rc() {
        thread.update_cr0(result);
    }
    Ok(())
}

pub fn mulhwu(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let a = thread.gpr(op.ra()) as u32 as u64;
    let b = thread.gpr(op.rb()) as u32 as u64;
    let result = (a * b) >> 32;
    thread.set_gpr(op.rd(), result);
    if op.rc() {
        thread.update_cr0(result);
    }
    Ok(())
}

pub fn mulhd(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let a = thread.gpr(op.ra()) as i64 as i128;
    let b = thread.gpr(op.rb()) as i64 as i128;
    let result = ((a * b) >> 64) as u64;
    thread.set_gpr(op.rd(), result);
    if op.rc() {
        thread.update_cr0(result);
    }
    Ok(())
}

pub fn mulhdu(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let a = thread.gpr(op.ra()) as u128;
    let b = thread.gpr(op.rb()) as u128;
    let result = ((a * b) >> 64) as u64;
    thread.set_gpr(op.rd(), result);
    if op.rc() {
        thread.update_cr0(result);
    }
    Ok(())
}

// Division by zero and MIN / -1 produce 0 and report overflow when OE is set.

pub fn divw(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let a = thread.gpr(op.ra()) as i32;
    let b = thread.gpr(op.rb()) as i32;
    match a.checked_div(b) {
        Some(q) => write_xo(thread, op, q as u32 as u64, false),
        None => write_xo(thread, op, 0, true),
    }
    Ok(())
}

pub fn divwu(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let a = thread.gpr(op.ra()) as u32;
    let b = thread.gpr(op.rb()) as u32;
    match a.checked_div(b) {
        Some(q) => write_xo(thread, op, q as u64, false),
        None => write_xo(thread, op, 0, true),
    }
    Ok(())
}

pub fn divd(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let a = thread.gpr(op.ra()) as i64;
    let b = thread.gpr(op.rb()) as i64;
    match a.checked_div(b) {
        Some(q) => write_xo(thread, op, q as u64, false),
        None => write_xo(thread, op, 0, true),
    }
    Ok(())
}

pub fn divdu(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let a = thread.gpr(op.ra());
    let b = thread.gpr(op.rb());
    match a.checked_div(b) {
        Some(q) => write_xo(thread, op, q, false),
        None => write_xo(thread, op, 0, true),
    }
    Ok(())
}

// Logical

macro_rules! logical_x {
    ($($name:ident => |$s:ident, $b:ident| $e:expr;)*) => {
        $(
            pub fn $name(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
                let $s = thread.gpr(op.rs());
                let $b = thread.gpr(op.rb());
                write_ra(thread, op, $e);
                Ok(())
            }
        )*
    };
}

logical_x! {
    and => |s, b| s & b;
    or => |s, b| s | b;
    xor => |s, b| s ^ b;
    nand => |s, b| !(s & b);
    nor => |s, b| !(s | b);
    eqv => |s, b| !(s ^ b);
    andc => |s, b| s & !b;
    orc => |s, b| s | !b;
}

pub fn ori(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    thread.set_gpr(op.ra(), thread.gpr(op.rs()) | op.uimm());
    Ok(())
}

pub fn oris(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    thread.set_gpr(op.ra(), thread.gpr(op.rs()) | (op.uimm() << 16));
    Ok(())
}

pub fn xori(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    thread.set_gpr(op.ra(), thread.gpr(op.rs()) ^ op.uimm());
    Ok(())
}

pub fn xoris(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    thread.set_gpr(op.ra(), thread.gpr(op.rs()) ^ (op.uimm() << 16));
    Ok(())
}

pub fn andi_(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let result = thread.gpr(op.rs()) & op.uimm();
    thread.set_gpr(op.ra(), result);
    thread.update_cr0(result);
    Ok(())
}

pub fn andis_(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let result = thread.gpr(op.rs()) & (op.uimm() << 16);
    thread.set_gpr(op.ra(), result);
    thread.update_cr0(result);
    Ok(())
}

pub fn cntlzw(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let result = (thread.gpr(op.rs()) as u32).leading_zeros() as u64;
    write_ra(thread, op, result);
    Ok(())
}

pub fn cntlzd(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let result = thread.gpr(op.rs()).leading_zeros() as u64;
    write_ra(thread, op, result);
    Ok(())
}

pub fn extsb(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let result = thread.gpr(op.rs()) as i8 as i64 as u64;
    write_ra(thread, op, result);
    Ok(())
}

pub fn extsh(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let result = thread.gpr(op.rs()) as i16 as i64 as u64;
    write_ra(thread, op, result);
    Ok(())
}

pub fn extsw(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let result = thread.gpr(op.rs()) as i32 as i64 as u64;
    write_ra(thread, op, result);
    Ok(())
}

// Compare

pub fn cmp(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let (a, b) = (thread.gpr(op.ra()), thread.gpr(op.rb()));
    let c = if op.l() {
        compare(a as i64, b as i64)
    } else {
        compare(a as i32, b as i32)
    };
    thread.set_cr_field(op.crfd(), c);
    Ok(())
}

pub fn cmpl(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let (a, b) = (thread.gpr(op.ra()), thread.gpr(op.rb()));
    let c = if op.l() { compare(a, b) } else { compare(a as u32, b as u32) };
    thread.set_cr_field(op.crfd(), c);
    Ok(())
}

pub fn cmpi(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let a = thread.gpr(op.ra());
    let c = if op.l() {
        compare(a as i64, op.simm())
    } else {
        compare(a as i32, op.simm() as i32)
    };
    thread.set_cr_field(op.crfd(), c);
    Ok(())
}

pub fn cmpli(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let a = thread.gpr(op.ra());
    let c = if op.l() {
        compare(a, op.uimm())
    } else {
        compare(a as u32, op.uimm() as u32)
    };
    thread.set_cr_field(op.crfd(), c);
    Ok(())
}

// Trap

/// Evaluate the TO condition bits
fn trap_condition(to: u32, a: i64, b: i64) -> bool {
    (to & 0x10 != 0 && a < b)
        || (to & 0x08 != 0 && a > b)
        || (to & 0x04 != 0 && a == b)
        || (to & 0x02 != 0 && (a as u64) < (b as u64))
        || (to & 0x01 != 0 && (a as u64) > (b as u64))
}

/// A satisfied trap condition stops execution with `PpuError::Trap`
///
/// No program interrupt is delivered. Unlike the unimplemented-instruction
/// path, which logs and continues, the thread halts with its PC on the trap
/// so the runner can report where a guest assertion fired.
#[inline]
fn trap_if(thread: &PpuThread, taken: bool) -> ExecResult {
    if taken {
        return Err(PpuError::Trap { addr: thread.pc() });
    }
    Ok(())
}

pub fn tw(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let a = thread.gpr(op.ra()) as i32 as i64;
    let b = thread.gpr(op.rb()) as i32 as i64;
    trap_if(thread, trap_condition(op.to(), a, b))
}

pub fn twi(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let a = thread.gpr(op.ra()) as i32 as i64;
    trap_if(thread, trap_condition(op.to(), a, op.simm()))
}

pub fn td(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let a = thread.gpr(op.ra()) as i64;
    let b = thread.gpr(op.rb()) as i64;
    trap_if(thread, trap_condition(op.to(), a, b))
}

pub fn tdi(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let a = thread.gpr(op.ra()) as i64;
    trap_if(thread, trap_condition(op.to(), a, op.simm()))
}

// Shifts

pub fn slw(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let n = thread.gpr(op.rb()) & 0x3F;
    let s = thread.gpr(op.rs()) as u32;
    let result = if n & 0x20 != 0 { 0 } else { (s << n) as u64 };
    write_ra(thread, op, result);
    Ok(())
}

pub fn srw(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let n = thread.gpr(op.rb()) & 0x3F;
    let s = thread.gpr(op.rs()) as u32;
    let result = if n & 0x20 != 0 { 0 } else { (s >> n) as u64 };
    write_ra(thread, op, result);
    Ok(())
}

pub fn sld(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let n = thread.gpr(op.rb()) & 0x7F;
    let s = thread.gpr(op.rs());
    let result = if n & 0x40 != 0 { 0 } else { s << n };
    write_ra(thread, op, result);
    Ok(())
}

pub fn srd(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let n = thread.gpr(op.rb()) & 0x7F;
    let s = thread.gpr(op.rs());
    let result = if n & 0x40 != 0 { 0 } else { s >> n };
    write_ra(thread, op, result);
    Ok(())
}

/// Algebraic word shift: CA is set when a negative value loses one bits
fn shift_right_algebraic_word(thread: &mut PpuThread, op: Instruction, n: u32) {
    let s = thread.gpr(op.rs()) as i32;
    let (result, carry) = if n >= 32 {
        ((s >> 31) as i64, s < 0)
    } else {
        let lost = n != 0 && (s as u32) & ((1u32 << n) - 1) != 0;
        ((s >> n) as i64, s < 0 && lost)
    };
    thread.set_xer_ca(carry);
    write_ra(thread, op, result as u64);
}

fn shift_right_algebraic_doubleword(thread: &mut PpuThread, op: Instruction, n: u32) {
    let s = thread.gpr(op.rs()) as i64;
    let (result, carry) = if n >= 64 {
        (s >> 63, s < 0)
    } else {
        let lost = n != 0 && (s as u64) & ((1u64 << n) - 1) != 0;
        (s >> n, s < 0 && lost)
    };
    thread.set_xer_ca(carry);
    write_ra(thread, op, result as u64);
}

pub fn sraw(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let n = (thread.gpr(op.rb()) & 0x3F) as u32;
    shift_right_algebraic_word(thread, op, n);
    Ok(())
}

pub fn srawi(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    shift_right_algebraic_word(thread, op, op.sh32());
    Ok(())
}

pub fn srad(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let n = (thread.gpr(op.rb()) & 0x7F) as u32;
    shift_right_algebraic_doubleword(thread, op, n);
    Ok(())
}

pub fn sradi(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    shift_right_algebraic_doubleword(thread, op, op.sh64());
    Ok(())
}

// Rotates

pub fn rlwinm(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let result = rotl32(thread.gpr(op.rs()), op.sh32()) & mask32(op.mb32(), op.me32());
    write_ra(thread, op, result);
    Ok(())
}

pub fn rlwnm(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let n = (thread.gpr(op.rb()) & 31) as u32;
    let result = rotl32(thread.gpr(op.rs()), n) & mask32(op.mb32(), op.me32());
    write_ra(thread, op, result);
    Ok(())
}

pub fn rlwimi(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let mask = mask32(op.mb32(), op.me32());
    let rotated = rotl32(thread.gpr(op.rs()), op.sh32());
    let result = (rotated & mask) | (thread.gpr(op.ra()) & !mask);
    write_ra(thread, op, result);
    Ok(())
}

pub fn rldicl(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let result = rotl64(thread.gpr(op.rs()), op.sh64()) & mask64(op.mb64(), 63);
    write_ra(thread, op, result);
    Ok(())
}

/// The end bit shares the MD mask field
pub fn rldicr(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let result = rotl64(thread.gpr(op.rs()), op.sh64()) & mask64(0, op.mb64());
    write_ra(thread, op, result);
    Ok(())
}

pub fn rldic(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let sh = op.sh64();
    let result = rotl64(thread.gpr(op.rs()), sh) & mask64(op.mb64(), 63 - sh);
    write_ra(thread, op, result);
    Ok(())
}

pub fn rldimi(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let sh = op.sh64();
    let mask = mask64(op.mb64(), 63 - sh);
    let rotated = rotl64(thread.gpr(op.rs()), sh);
    let result = (rotated & mask) | (thread.gpr(op.ra()) & !mask);
    write_ra(thread, op, result);
    Ok(())
}

pub fn rldcl(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let n = (thread.gpr(op.rb()) & 63) as u32;
    let result = rotl64(thread.gpr(op.rs()), n) & mask64(op.mb64(), 63);
    write_ra(thread, op, result);
    Ok(())
}

pub fn rldcr(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let n = (thread.gpr(op.rb()) & 63) as u32;
    let result = rotl64(thread.gpr(op.rs()), n) & mask64(0, op.mb64());
    write_ra(thread, op, result);
    Ok(())
}
