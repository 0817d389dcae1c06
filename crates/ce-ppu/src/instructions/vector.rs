//! VMX/AltiVec instructions
//!
//! Lanes are numbered in architectural order (element 0 is the most
//! significant). Saturating forms clamp through a wider intermediate and
//! raise the sticky VSCR[SAT]. Float lanes honour VSCR[NJ]: subnormal
//! inputs and results are flushed to a zero of the same sign.

use std::array;

use super::ExecResult;
use crate::decoder::Instruction;
use crate::interpreter::PpuInterpreter;
use crate::thread::PpuThread;
use crate::vmx::VmxRegister;

#[inline]
fn zip<T: Copy, U, const N: usize>(a: [T; N], b: [T; N], mut f: impl FnMut(T, T) -> U) -> [U; N] {
    array::from_fn(|i| f(a[i], b[i]))
}

#[inline]
fn zip3<T: Copy, U, const N: usize>(
    a: [T; N],
    b: [T; N],
    c: [T; N],
    mut f: impl FnMut(T, T, T) -> U,
) -> [U; N] {
    array::from_fn(|i| f(a[i], b[i], c[i]))
}

/// Clamp to `[min, max]`, noting whether clamping happened
#[inline]
fn clamp(value: i64, min: i64, max: i64, sat: &mut bool) -> i64 {
    if value < min {
        *sat = true;
        min
    } else if value > max {
        *sat = true;
        max
    } else {
        value
    }
}

#[inline]
fn finish_saturating(thread: &mut PpuThread, op: Instruction, result: VmxRegister, sat: bool) {
    thread.set_vr(op.rd(), result);
    if sat {
        thread.set_vscr_sat();
    }
}

// Integer lane arithmetic

macro_rules! vec_binary {
    ($($name:ident: $get:ident => $from:ident, |$x:ident, $y:ident| $e:expr;)*) => {
        $(
            pub fn $name(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
                let a = thread.vr(op.ra()).$get();
                let b = thread.vr(op.rb()).$get();
                thread.set_vr(op.rd(), VmxRegister::$from(zip(a, b, |$x, $y| $e)));
                Ok(())
            }
        )*
    };
}

macro_rules! vec_saturating {
    ($($name:ident: $get:ident => $from:ident as $ty:ty, $min:expr, $max:expr, |$x:ident, $y:ident| $e:expr;)*) => {
        $(
            pub fn $name(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
                let a = thread.vr(op.ra()).$get();
                let b = thread.vr(op.rb()).$get();
                let mut sat = false;
                let lanes = zip(a, b, |$x, $y| clamp($e, $min as i64, $max as i64, &mut sat) as $ty);
                finish_saturating(thread, op, VmxRegister::$from(lanes), sat);
                Ok(())
            }
        )*
    };
}

vec_binary! {
    vaddubm: u8x16 => from_u8x16, |x, y| x.wrapping_add(y);
    vadduhm: u16x8 => from_u16x8, |x, y| x.wrapping_add(y);
    vadduwm: u32x4 => from_u32x4, |x, y| x.wrapping_add(y);
    vsububm: u8x16 => from_u8x16, |x, y| x.wrapping_sub(y);
    vsubuhm: u16x8 => from_u16x8, |x, y| x.wrapping_sub(y);
    vsubuwm: u32x4 => from_u32x4, |x, y| x.wrapping_sub(y);
    vaddcuw: u32x4 => from_u32x4, |x, y| x.checked_add(y).is_none() as u32;
    vsubcuw: u32x4 => from_u32x4, |x, y| (x >= y) as u32;

    vmaxub: u8x16 => from_u8x16, |x, y| x.max(y);
    vmaxuh: u16x8 => from_u16x8, |x, y| x.max(y);
    vmaxuw: u32x4 => from_u32x4, |x, y| x.max(y);
    vmaxsb: i8x16 => from_i8x16, |x, y| x.max(y);
    vmaxsh: i16x8 => from_i16x8, |x, y| x.max(y);
    vmaxsw: i32x4 => from_i32x4, |x, y| x.max(y);
    vminub: u8x16 => from_u8x16, |x, y| x.min(y);
    vminuh: u16x8 => from_u16x8, |x, y| x.min(y);
    vminuw: u32x4 => from_u32x4, |x, y| x.min(y);
    vminsb: i8x16 => from_i8x16, |x, y| x.min(y);
    vminsh: i16x8 => from_i16x8, |x, y| x.min(y);
    vminsw: i32x4 => from_i32x4, |x, y| x.min(y);

    vavgub: u8x16 => from_u8x16, |x, y| ((x as u16 + y as u16 + 1) >> 1) as u8;
    vavguh: u16x8 => from_u16x8, |x, y| ((x as u32 + y as u32 + 1) >> 1) as u16;
    vavguw: u32x4 => from_u32x4, |x, y| ((x as u64 + y as u64 + 1) >> 1) as u32;
    vavgsb: i8x16 => from_i8x16, |x, y| ((x as i16 + y as i16 + 1) >> 1) as i8;
    vavgsh: i16x8 => from_i16x8, |x, y| ((x as i32 + y as i32 + 1) >> 1) as i16;
    vavgsw: i32x4 => from_i32x4, |x, y| ((x as i64 + y as i64 + 1) >> 1) as i32;

    // Per-lane shift counts use only the low bits of the matching lane
    vrlb: u8x16 => from_u8x16, |x, y| x.rotate_left(y as u32);
    vrlh: u16x8 => from_u16x8, |x, y| x.rotate_left(y as u32);
    vrlw: u32x4 => from_u32x4, |x, y| x.rotate_left(y);
    vslb: u8x16 => from_u8x16, |x, y| x.wrapping_shl(y as u32);
    vslh: u16x8 => from_u16x8, |x, y| x.wrapping_shl(y as u32);
    vslw: u32x4 => from_u32x4, |x, y| x.wrapping_shl(y);
    vsrb: u8x16 => from_u8x16, |x, y| x.wrapping_shr(y as u32);
    vsrh: u16x8 => from_u16x8, |x, y| x.wrapping_shr(y as u32);
    vsrw: u32x4 => from_u32x4, |x, y| x.wrapping_shr(y);
    vsrab: i8x16 => from_i8x16, |x, y| x.wrapping_shr(y as u32);
    vsrah: i16x8 => from_i16x8, |x, y| x.wrapping_shr(y as u16 as u32);
    vsraw: i32x4 => from_i32x4, |x, y| x.wrapping_shr(y as u32);
}

vec_saturating! {
    vaddubs: u8x16 => from_u8x16 as u8, u8::MIN, u8::MAX, |x, y| x as i64 + y as i64;
    vadduhs: u16x8 => from_u16x8 as u16, u16::MIN, u16::MAX, |x, y| x as i64 + y as i64;
    vadduws: u32x4 => from_u32x4 as u32, u32::MIN, u32::MAX, |x, y| x as i64 + y as i64;
    vaddsbs: i8x16 => from_i8x16 as i8, i8::MIN, i8::MAX, |x, y| x as i64 + y as i64;
    vaddshs: i16x8 => from_i16x8 as i16, i16::MIN, i16::MAX, |x, y| x as i64 + y as i64;
    vaddsws: i32x4 => from_i32x4 as i32, i32::MIN, i32::MAX, |x, y| x as i64 + y as i64;
    vsububs: u8x16 => from_u8x16 as u8, u8::MIN, u8::MAX, |x, y| x as i64 - y as i64;
    vsubuhs: u16x8 => from_u16x8 as u16, u16::MIN, u16::MAX, |x, y| x as i64 - y as i64;
    vsubuws: u32x4 => from_u32x4 as u32, u32::MIN, u32::MAX, |x, y| x as i64 - y as i64;
    vsubsbs: i8x16 => from_i8x16 as i8, i8::MIN, i8::MAX, |x, y| x as i64 - y as i64;
    vsubshs: i16x8 => from_i16x8 as i16, i16::MIN, i16::MAX, |x, y| x as i64 - y as i64;
    vsubsws: i32x4 => from_i32x4 as i32, i32::MIN, i32::MAX, |x, y| x as i64 - y as i64;
}

// Multiply even/odd: products of the even (or odd) numbered lanes, widened

macro_rules! vec_mul_widen {
    ($($name:ident: $get:ident => $from:ident as $wide:ty, $offset:literal;)*) => {
        $(
            pub fn $name(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
                let a = thread.vr(op.ra()).$get();
                let b = thread.vr(op.rb()).$get();
                let lanes = array::from_fn(|i| a[2 * i + $offset] as $wide * b[2 * i + $offset] as $wide);
                thread.set_vr(op.rd(), VmxRegister::$from(lanes));
                Ok(())
            }
        )*
    };
}

vec_mul_widen! {
    vmuleub: u8x16 => from_u16x8 as u16, 0;
    vmuloub: u8x16 => from_u16x8 as u16, 1;
    vmulesb: i8x16 => from_i16x8 as i16, 0;
    vmulosb: i8x16 => from_i16x8 as i16, 1;
    vmuleuh: u16x8 => from_u32x4 as u32, 0;
    vmulouh: u16x8 => from_u32x4 as u32, 1;
    vmulesh: i16x8 => from_i32x4 as i32, 0;
    vmulosh: i16x8 => from_i32x4 as i32, 1;
}

/// Multiply-high and add, saturating: `(a * b) >> 15 + c`
pub fn vmhaddshs(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let (a, b, c) = (thread.vr(op.ra()).i16x8(), thread.vr(op.rb()).i16x8(), thread.vr(op.rc_reg()).i16x8());
    let mut sat = false;
    let lanes = zip3(a, b, c, |x, y, z| {
        let product = (x as i64 * y as i64) >> 15;
        clamp(product + z as i64, i16::MIN as i64, i16::MAX as i64, &mut sat) as i16
    });
    finish_saturating(thread, op, VmxRegister::from_i16x8(lanes), sat);
    Ok(())
}

/// As `vmhaddshs`, rounding the product before the shift
pub fn vmhraddshs(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let (a, b, c) = (thread.vr(op.ra()).i16x8(), thread.vr(op.rb()).i16x8(), thread.vr(op.rc_reg()).i16x8());
    let mut sat = false;
    let lanes = zip3(a, b, c, |x, y, z| {
        let product = (x as i64 * y as i64 + 0x4000) >> 15;
        clamp(product + z as i64, i16::MIN as i64, i16::MAX as i64, &mut sat) as i16
    });
    finish_saturating(thread, op, VmxRegister::from_i16x8(lanes), sat);
    Ok(())
}

pub fn vmladduhm(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let (a, b, c) = (thread.vr(op.ra()).u16x8(), thread.vr(op.rb()).u16x8(), thread.vr(op.rc_reg()).u16x8());
    let lanes = zip3(a, b, c, |x, y, z| x.wrapping_mul(y).wrapping_add(z));
    thread.set_vr(op.rd(), VmxRegister::from_u16x8(lanes));
    Ok(())
}

/// Sum of `GROUP` lane products per word, accumulated onto the word lane of vC
fn multiply_sum<const GROUP: usize>(products: impl Fn(usize) -> i64, acc: [i64; 4]) -> [i64; 4] {
    array::from_fn(|i| acc[i] + (0..GROUP).map(|j| products(i * GROUP + j)).sum::<i64>())
}

pub fn vmsumubm(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let (a, b) = (thread.vr(op.ra()).u8x16(), thread.vr(op.rb()).u8x16());
    let c = thread.vr(op.rc_reg()).u32x4().map(|x| x as i64);
    let sums = multiply_sum::<4>(|k| a[k] as i64 * b[k] as i64, c);
    thread.set_vr(op.rd(), VmxRegister::from_u32x4(sums.map(|s| s as u32)));
    Ok(())
}

/// Signed bytes of vA times unsigned bytes of vB
pub fn vmsummbm(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let (a, b) = (thread.vr(op.ra()).i8x16(), thread.vr(op.rb()).u8x16());
    let c = thread.vr(op.rc_reg()).i32x4().map(|x| x as i64);
    let sums = multiply_sum::<4>(|k| a[k] as i64 * b[k] as i64, c);
    thread.set_vr(op.rd(), VmxRegister::from_i32x4(sums.map(|s| s as i32)));
    Ok(())
}

pub fn vmsumuhm(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let (a, b) = (thread.vr(op.ra()).u16x8(), thread.vr(op.rb()).u16x8());
    let c = thread.vr(op.rc_reg()).u32x4().map(|x| x as i64);
    let sums = multiply_sum::<2>(|k| a[k] as i64 * b[k] as i64, c);
    thread.set_vr(op.rd(), VmxRegister::from_u32x4(sums.map(|s| s as u32)));
    Ok(())
}

pub fn vmsumuhs(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let (a, b) = (thread.vr(op.ra()).u16x8(), thread.vr(op.rb()).u16x8());
    let c = thread.vr(op.rc_reg()).u32x4().map(|x| x as i64);
    let sums = multiply_sum::<2>(|k| a[k] as i64 * b[k] as i64, c);
    let mut sat = false;
    let lanes = sums.map(|s| clamp(s, 0, u32::MAX as i64, &mut sat) as u32);
    finish_saturating(thread, op, VmxRegister::from_u32x4(lanes), sat);
    Ok(())
}

pub fn vmsumshm(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let (a, b) = (thread.vr(op.ra()).i16x8(), thread.vr(op.rb()).i16x8());
    let c = thread.vr(op.rc_reg()).i32x4().map(|x| x as i64);
    let sums = multiply_sum::<2>(|k| a[k] as i64 * b[k] as i64, c);
    thread.set_vr(op.rd(), VmxRegister::from_i32x4(sums.map(|s| s as i32)));
    Ok(())
}

pub fn vmsumshs(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let (a, b) = (thread.vr(op.ra()).i16x8(), thread.vr(op.rb()).i16x8());
    let c = thread.vr(op.rc_reg()).i32x4().map(|x| x as i64);
    let sums = multiply_sum::<2>(|k| a[k] as i64 * b[k] as i64, c);
    let mut sat = false;
    let lanes = sums.map(|s| clamp(s, i32::MIN as i64, i32::MAX as i64, &mut sat) as i32);
    finish_saturating(thread, op, VmxRegister::from_i32x4(lanes), sat);
    Ok(())
}

// Sum across

pub fn vsum4ubs(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let a = thread.vr(op.ra()).u8x16();
    let b = thread.vr(op.rb()).u32x4().map(|x| x as i64);
    let sums = multiply_sum::<4>(|k| a[k] as i64, b);
    let mut sat = false;
    let lanes = sums.map(|s| clamp(s, 0, u32::MAX as i64, &mut sat) as u32);
    finish_saturating(thread, op, VmxRegister::from_u32x4(lanes), sat);
    Ok(())
}

pub fn vsum4sbs(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let a = thread.vr(op.ra()).i8x16();
    let b = thread.vr(op.rb()).i32x4().map(|x| x as i64);
    let sums = multiply_sum::<4>(|k| a[k] as i64, b);
    let mut sat = false;
    let lanes = sums.map(|s| clamp(s, i32::MIN as i64, i32::MAX as i64, &mut sat) as i32);
    finish_saturating(thread, op, VmxRegister::from_i32x4(lanes), sat);
    Ok(())
}

pub fn vsum4shs(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let a = thread.vr(op.ra()).i16x8();
    let b = thread.vr(op.rb()).i32x4().map(|x| x as i64);
    let sums = multiply_sum::<2>(|k| a[k] as i64, b);
    let mut sat = false;
    let lanes = sums.map(|s| clamp(s, i32::MIN as i64, i32::MAX as i64, &mut sat) as i32);
    finish_saturating(thread, op, VmxRegister::from_i32x4(lanes), sat);
    Ok(())
}

/// Pairwise sums into words 1 and 3; words 0 and 2 are cleared
pub fn vsum2sws(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let a = thread.vr(op.ra()).i32x4().map(|x| x as i64);
    let b = thread.vr(op.rb()).i32x4().map(|x| x as i64);
    let mut sat = false;
    let mut lanes = [0i32; 4];
    for pair in 0..2 {
        let sum = a[2 * pair] + a[2 * pair + 1] + b[2 * pair + 1];
        lanes[2 * pair + 1] = clamp(sum, i32::MIN as i64, i32::MAX as i64, &mut sat) as i32;
    }
    finish_saturating(thread, op, VmxRegister::from_i32x4(lanes), sat);
    Ok(())
}

/// Sum of all words of vA plus word 3 of vB, into word 3
pub fn vsumsws(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let a = thread.vr(op.ra()).i32x4();
    let b = thread.vr(op.rb()).i32x4();
    let sum = a.iter().map(|&x| x as i64).sum::<i64>() + b[3] as i64;
    let mut sat = false;
    let lanes = [0, 0, 0, clamp(sum, i32::MIN as i64, i32::MAX as i64, &mut sat) as i32];
    finish_saturating(thread, op, VmxRegister::from_i32x4(lanes), sat);
    Ok(())
}

// Logical and whole-register shifts

macro_rules! vec_logical {
    ($($name:ident => |$x:ident, $y:ident| $e:expr;)*) => {
        $(
            pub fn $name(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
                let $x = thread.vr(op.ra()).as_u128();
                let $y = thread.vr(op.rb()).as_u128();
                thread.set_vr(op.rd(), VmxRegister::from_u128($e));
                Ok(())
            }
        )*
    };
}

vec_logical! {
    vand => |a, b| a & b;
    vandc => |a, b| a & !b;
    vor => |a, b| a | b;
    vxor => |a, b| a ^ b;
    vnor => |a, b| !(a | b);
    // Bit shifts take the count from the low three bits of byte 15
    vsl => |a, b| a << (b & 7);
    vsr => |a, b| a >> (b & 7);
    // Octet shifts take the count from bits 121..124
    vslo => |a, b| a << (((b >> 3) & 0xF) * 8);
    vsro => |a, b| a >> (((b >> 3) & 0xF) * 8);
}

pub fn vsel(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let a = thread.vr(op.ra()).as_u128();
    let b = thread.vr(op.rb()).as_u128();
    let c = thread.vr(op.rc_reg()).as_u128();
    thread.set_vr(op.rd(), VmxRegister::from_u128((a & !c) | (b & c)));
    Ok(())
}

// Compares

/// Write a compare result; the record form summarises it in CR6
fn write_compare(thread: &mut PpuThread, op: Instruction, result: VmxRegister) {
    thread.set_vr(op.rd(), result);
    if op.vrc() {
        let bits = result.as_u128();
        let cr6 = if bits == u128::MAX {
            0b1000
        } else if bits == 0 {
            0b0010
        } else {
            0
        };
        thread.set_cr_field(6, cr6);
    }
}

macro_rules! vec_compare {
    ($($name:ident: $get:ident => $from:ident as $mask:ty, |$x:ident, $y:ident| $e:expr;)*) => {
        $(
            pub fn $name(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
                let a = thread.vr(op.ra()).$get();
                let b = thread.vr(op.rb()).$get();
                let lanes = zip(a, b, |$x, $y| if $e { <$mask>::MAX } else { 0 });
                write_compare(thread, op, VmxRegister::$from(lanes));
                Ok(())
            }
        )*
    };
}

vec_compare! {
    vcmpequb: u8x16 => from_u8x16 as u8, |x, y| x == y;
    vcmpequh: u16x8 => from_u16x8 as u16, |x, y| x == y;
    vcmpequw: u32x4 => from_u32x4 as u32, |x, y| x == y;
    vcmpgtub: u8x16 => from_u8x16 as u8, |x, y| x > y;
    vcmpgtuh: u16x8 => from_u16x8 as u16, |x, y| x > y;
    vcmpgtuw: u32x4 => from_u32x4 as u32, |x, y| x > y;
    vcmpgtsb: i8x16 => from_u8x16 as u8, |x, y| x > y;
    vcmpgtsh: i16x8 => from_u16x8 as u16, |x, y| x > y;
    vcmpgtsw: i32x4 => from_u32x4 as u32, |x, y| x > y;
}

// Float lanes

#[inline]
fn flush_denormal(x: f32) -> f32 {
    if x.is_subnormal() {
        if x.is_sign_negative() { -0.0 } else { 0.0 }
    } else {
        x
    }
}

/// Float lanes of a source register, flushed when NJ is set
fn float_lanes(thread: &PpuThread, index: usize) -> [f32; 4] {
    let lanes = thread.vr(index).f32x4();
    if thread.non_java_mode() {
        lanes.map(flush_denormal)
    } else {
        lanes
    }
}

fn write_float(thread: &mut PpuThread, op: Instruction, lanes: [f32; 4]) {
    let lanes = if thread.non_java_mode() { lanes.map(flush_denormal) } else { lanes };
    thread.set_vr(op.rd(), VmxRegister::from_f32x4(lanes));
}

fn float_max(a: f32, b: f32) -> f32 {
    if a.is_nan() {
        a
    } else if b.is_nan() {
        b
    } else if a > b || (a == b && b.is_sign_negative()) {
        a
    } else {
        b
    }
}

fn float_min(a: f32, b: f32) -> f32 {
    if a.is_nan() {
        a
    } else if b.is_nan() {
        b
    } else if a < b || (a == b && a.is_sign_negative()) {
        a
    } else {
        b
    }
}

macro_rules! vec_float_binary {
    ($($name:ident => |$x:ident, $y:ident| $e:expr;)*) => {
        $(
            pub fn $name(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
                let a = float_lanes(thread, op.ra());
                let b = float_lanes(thread, op.rb());
                write_float(thread, op, zip(a, b, |$x, $y| $e));
                Ok(())
            }
        )*
    };
}

macro_rules! vec_float_unary {
    ($($name:ident => |$x:ident| $e:expr;)*) => {
        $(
            pub fn $name(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
                let b = float_lanes(thread, op.rb());
                write_float(thread, op, b.map(|$x| $e));
                Ok(())
            }
        )*
    };
}

vec_float_binary! {
    vaddfp => |x, y| x + y;
    vsubfp => |x, y| x - y;
    vmaxfp => |x, y| float_max(x, y);
    vminfp => |x, y| float_min(x, y);
}

vec_float_unary! {
    vrefp => |x| 1.0 / x;
    vrsqrtefp => |x| 1.0 / x.sqrt();
    vexptefp => |x| x.exp2();
    vlogefp => |x| x.log2();
    vrfin => |x| x.round_ties_even();
    vrfiz => |x| x.trunc();
    vrfip => |x| x.ceil();
    vrfim => |x| x.floor();
}

pub fn vmaddfp(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let (a, b, c) = (float_lanes(thread, op.ra()), float_lanes(thread, op.rb()), float_lanes(thread, op.rc_reg()));
    write_float(thread, op, zip3(a, b, c, |x, y, z| x.mul_add(z, y)));
    Ok(())
}

pub fn vnmsubfp(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let (a, b, c) = (float_lanes(thread, op.ra()), float_lanes(thread, op.rb()), float_lanes(thread, op.rc_reg()));
    write_float(thread, op, zip3(a, b, c, |x, y, z| -x.mul_add(z, -y)));
    Ok(())
}

macro_rules! vec_float_compare {
    ($($name:ident => |$x:ident, $y:ident| $e:expr;)*) => {
        $(
            pub fn $name(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
                let a = float_lanes(thread, op.ra());
                let b = float_lanes(thread, op.rb());
                let lanes = zip(a, b, |$x, $y| if $e { u32::MAX } else { 0 });
                write_compare(thread, op, VmxRegister::from_u32x4(lanes));
                Ok(())
            }
        )*
    };
}

vec_float_compare! {
    vcmpeqfp => |x, y| x == y;
    vcmpgefp => |x, y| x >= y;
    vcmpgtfp => |x, y| x > y;
}

/// Bounds compare: bit 0 of a lane is set when `a > b`, bit 1 when `a < -b`
pub fn vcmpbfp(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let a = float_lanes(thread, op.ra());
    let b = float_lanes(thread, op.rb());
    let lanes = zip(a, b, |x, y| {
        let above = !(x <= y);
        let below = !(x >= -y);
        ((above as u32) << 31) | ((below as u32) << 30)
    });
    let result = VmxRegister::from_u32x4(lanes);
    thread.set_vr(op.rd(), result);
    if op.vrc() {
        thread.set_cr_field(6, if result.as_u128() == 0 { 0b0010 } else { 0 });
    }
    Ok(())
}

// Fixed-point conversions, scaled by 2^UIMM

pub fn vcfux(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let scale = 2f32.powi(-(op.vuimm() as i32));
    let lanes = thread.vr(op.rb()).u32x4().map(|x| x as f32 * scale);
    write_float(thread, op, lanes);
    Ok(())
}

pub fn vcfsx(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let scale = 2f32.powi(-(op.vuimm() as i32));
    let lanes = thread.vr(op.rb()).i32x4().map(|x| x as f32 * scale);
    write_float(thread, op, lanes);
    Ok(())
}

/// Scale, truncate and saturate; NaN lanes convert to zero
fn float_to_fixed(value: f32, uimm: u32, min: i64, max: i64, sat: &mut bool) -> i64 {
    if value.is_nan() {
        return 0;
    }
    let scaled = (value as f64 * 2f64.powi(uimm as i32)).trunc();
    if scaled < min as f64 {
        *sat = true;
        min
    } else if scaled > max as f64 {
        *sat = true;
        max
    } else {
        scaled as i64
    }
}

pub fn vctsxs(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let b = float_lanes(thread, op.rb());
    let mut sat = false;
    let lanes = b.map(|x| float_to_fixed(x, op.vuimm(), i32::MIN as i64, i32::MAX as i64, &mut sat) as i32);
    finish_saturating(thread, op, VmxRegister::from_i32x4(lanes), sat);
    Ok(())
}

pub fn vctuxs(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let b = float_lanes(thread, op.rb());
    let mut sat = false;
    let lanes = b.map(|x| float_to_fixed(x, op.vuimm(), 0, u32::MAX as i64, &mut sat) as u32);
    finish_saturating(thread, op, VmxRegister::from_u32x4(lanes), sat);
    Ok(())
}

// Permute, merge and splat

pub fn vperm(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let mut concat = [0u8; 32];
    concat[..16].copy_from_slice(&thread.vr(op.ra()).u8x16());
    concat[16..].copy_from_slice(&thread.vr(op.rb()).u8x16());
    let control = thread.vr(op.rc_reg()).u8x16();
    let bytes = control.map(|sel| concat[(sel & 0x1F) as usize]);
    thread.set_vr(op.rd(), VmxRegister::from_u8x16(bytes));
    Ok(())
}

/// Bytes `SH..SH+16` of `vA || vB`
pub fn vsldoi(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let mut concat = [0u8; 32];
    concat[..16].copy_from_slice(&thread.vr(op.ra()).u8x16());
    concat[16..].copy_from_slice(&thread.vr(op.rb()).u8x16());
    let sh = op.vsh() as usize;
    let bytes = array::from_fn(|i| concat[i + sh]);
    thread.set_vr(op.rd(), VmxRegister::from_u8x16(bytes));
    Ok(())
}

/// Interleave half of `a` with the same half of `b`, starting at lane `offset`
fn merge<T: Copy, const N: usize>(a: [T; N], b: [T; N], offset: usize) -> [T; N] {
    array::from_fn(|i| if i % 2 == 0 { a[offset + i / 2] } else { b[offset + i / 2] })
}

macro_rules! vec_merge {
    ($($name:ident: $get:ident => $from:ident, $offset:expr;)*) => {
        $(
            pub fn $name(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
                let a = thread.vr(op.ra()).$get();
                let b = thread.vr(op.rb()).$get();
                thread.set_vr(op.rd(), VmxRegister::$from(merge(a, b, $offset)));
                Ok(())
            }
        )*
    };
}

vec_merge! {
    vmrghb: u8x16 => from_u8x16, 0;
    vmrghh: u16x8 => from_u16x8, 0;
    vmrghw: u32x4 => from_u32x4, 0;
    vmrglb: u8x16 => from_u8x16, 8;
    vmrglh: u16x8 => from_u16x8, 4;
    vmrglw: u32x4 => from_u32x4, 2;
}

pub fn vspltb(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let lane = thread.vr(op.rb()).u8x16()[(op.vuimm() & 15) as usize];
    thread.set_vr(op.rd(), VmxRegister::from_u8x16([lane; 16]));
    Ok(())
}

pub fn vsplth(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let lane = thread.vr(op.rb()).u16x8()[(op.vuimm() & 7) as usize];
    thread.set_vr(op.rd(), VmxRegister::from_u16x8([lane; 8]));
    Ok(())
}

pub fn vspltw(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let lane = thread.vr(op.rb()).u32x4()[(op.vuimm() & 3) as usize];
    thread.set_vr(op.rd(), VmxRegister::from_u32x4([lane; 4]));
    Ok(())
}

pub fn vspltisb(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    thread.set_vr(op.rd(), VmxRegister::from_i8x16([op.vsimm() as i8; 16]));
    Ok(())
}

pub fn vspltish(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    thread.set_vr(op.rd(), VmxRegister::from_i16x8([op.vsimm() as i16; 8]));
    Ok(())
}

pub fn vspltisw(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    thread.set_vr(op.rd(), VmxRegister::from_i32x4([op.vsimm(); 4]));
    Ok(())
}

// Pack: lanes of vA then vB, each narrowed

#[inline]
fn concat_lanes<T: Copy, U, const N: usize, const M: usize>(a: [T; N], b: [T; N], mut f: impl FnMut(T) -> U) -> [U; M] {
    array::from_fn(|i| f(if i < N { a[i] } else { b[i - N] }))
}

macro_rules! vec_pack_modulo {
    ($($name:ident: $get:ident => $from:ident as $narrow:ty;)*) => {
        $(
            pub fn $name(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
                let a = thread.vr(op.ra()).$get();
                let b = thread.vr(op.rb()).$get();
                thread.set_vr(op.rd(), VmxRegister::$from(concat_lanes(a, b, |x| x as $narrow)));
                Ok(())
            }
        )*
    };
}

macro_rules! vec_pack_saturate {
    ($($name:ident: $get:ident => $from:ident as $narrow:ty;)*) => {
        $(
            pub fn $name(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
                let a = thread.vr(op.ra()).$get();
                let b = thread.vr(op.rb()).$get();
                let mut sat = false;
                let lanes = concat_lanes(a, b, |x| {
                    clamp(x as i64, <$narrow>::MIN as i64, <$narrow>::MAX as i64, &mut sat) as $narrow
                });
                finish_saturating(thread, op, VmxRegister::$from(lanes), sat);
                Ok(())
            }
        )*
    };
}

vec_pack_modulo! {
    vpkuhum: u16x8 => from_u8x16 as u8;
    vpkuwum: u32x4 => from_u16x8 as u16;
}

vec_pack_saturate! {
    vpkuhus: u16x8 => from_u8x16 as u8;
    vpkuwus: u32x4 => from_u16x8 as u16;
    vpkshss: i16x8 => from_i8x16 as i8;
    vpkshus: i16x8 => from_u8x16 as u8;
    vpkswss: i32x4 => from_i16x8 as i16;
    vpkswus: i32x4 => from_u16x8 as u16;
}

/// Pack 8-8-8-8 pixels into 1-5-5-5
pub fn vpkpx(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let a = thread.vr(op.ra()).u32x4();
    let b = thread.vr(op.rb()).u32x4();
    let pixels = concat_lanes(a, b, |w| {
        (((w >> 9) & 0x8000) | ((w >> 9) & 0x7C00) | ((w >> 6) & 0x03E0) | ((w >> 3) & 0x001F)) as u16
    });
    thread.set_vr(op.rd(), VmxRegister::from_u16x8(pixels));
    Ok(())
}

// Unpack: sign-extend the high or low half of vB

macro_rules! vec_unpack {
    ($($name:ident: $get:ident => $from:ident as $wide:ty, $offset:expr;)*) => {
        $(
            pub fn $name(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
                let b = thread.vr(op.rb()).$get();
                let lanes = array::from_fn(|i| b[$offset + i] as $wide);
                thread.set_vr(op.rd(), VmxRegister::$from(lanes));
                Ok(())
            }
        )*
    };
}

vec_unpack! {
    vupkhsb: i8x16 => from_i16x8 as i16, 0;
    vupklsb: i8x16 => from_i16x8 as i16, 8;
    vupkhsh: i16x8 => from_i32x4 as i32, 0;
    vupklsh: i16x8 => from_i32x4 as i32, 4;
}

/// Expand a 1-5-5-5 pixel to 8-8-8-8, replicating the top bit into the first byte
fn unpack_pixel(h: u16) -> u32 {
    let h = h as u32;
    let alpha = if h & 0x8000 != 0 { 0xFF } else { 0 };
    (alpha << 24) | (((h >> 10) & 0x1F) << 16) | (((h >> 5) & 0x1F) << 8) | (h & 0x1F)
}

pub fn vupkhpx(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let b = thread.vr(op.rb()).u16x8();
    let lanes = array::from_fn(|i| unpack_pixel(b[i]));
    thread.set_vr(op.rd(), VmxRegister::from_u32x4(lanes));
    Ok(())
}

pub fn vupklpx(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let b = thread.vr(op.rb()).u16x8();
    let lanes = array::from_fn(|i| unpack_pixel(b[4 + i]));
    thread.set_vr(op.rd(), VmxRegister::from_u32x4(lanes));
    Ok(())
}

// VSCR moves

pub fn mfvscr(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    thread.set_vr(op.rd(), VmxRegister::from_u32x4([0, 0, 0, thread.regs.vscr]));
    Ok(())
}

pub fn mtvscr(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    thread.regs.vscr = thread.vr(op.rb()).u32x4()[3];
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instructions::test_util::*;
    use crate::thread::Vscr;

    #[test]
    fn test_vaddubs_saturates_and_sat_is_sticky() {
        let mut cpu = TestCpu::new();
        let mut a = [1u8; 16];
        let mut b = [2u8; 16];
        a[0] = 250;
        b[0] = 10;
        cpu.thread.set_vr(1, VmxRegister::from_u8x16(a));
        cpu.thread.set_vr(2, VmxRegister::from_u8x16(b));

        // vaddubs v3, v1, v2
        cpu.exec(vx_form(3, 1, 2, 512)).unwrap();
        let r = cpu.thread.vr(3).u8x16();
        assert_eq!(r[0], 255);
        assert_eq!(r[1], 3);
        assert!(cpu.thread.vscr().contains(Vscr::SAT));

        // vaddubm v3, v1, v2 does not saturate and leaves SAT set
        cpu.exec(vx_form(3, 1, 2, 0)).unwrap();
        assert_eq!(cpu.thread.vr(3).u8x16()[0], 4);
        assert!(cpu.thread.vscr().contains(Vscr::SAT));
    }

    #[test]
    fn test_no_clamp_no_sat() {
        let mut cpu = TestCpu::new();
        cpu.thread.set_vr(1, VmxRegister::from_i16x8([100; 8]));
        cpu.thread.set_vr(2, VmxRegister::from_i16x8([-50; 8]));
        // vaddshs v3, v1, v2
        cpu.exec(vx_form(3, 1, 2, 832)).unwrap();
        assert_eq!(cpu.thread.vr(3).i16x8(), [50; 8]);
        assert!(!cpu.thread.vscr().contains(Vscr::SAT));

        // vsubsws v3, MIN, 1 clamps
        cpu.thread.set_vr(1, VmxRegister::from_i32x4([i32::MIN, 0, 0, 0]));
        cpu.thread.set_vr(2, VmxRegister::from_i32x4([1, 1, 1, 1]));
        cpu.exec(vx_form(3, 1, 2, 1920)).unwrap();
        assert_eq!(cpu.thread.vr(3).i32x4(), [i32::MIN, -1, -1, -1]);
        assert!(cpu.thread.vscr().contains(Vscr::SAT));
    }

    #[test]
    fn test_vperm_selects_from_both_sources() {
        let mut cpu = TestCpu::new();
        cpu.thread.set_vr(1, VmxRegister::from_u8x16(array::from_fn(|i| i as u8)));
        cpu.thread.set_vr(2, VmxRegister::from_u8x16(array::from_fn(|i| 0x10 + i as u8)));
        // Reverse across the 32-byte concatenation; high bits of the selector are ignored
        let control: [u8; 16] = array::from_fn(|i| 0xE0 | (31 - 2 * i as u8));
        cpu.thread.set_vr(3, VmxRegister::from_u8x16(control));

        // vperm v4, v1, v2, v3
        cpu.exec(va_form(4, 1, 2, 3, 43)).unwrap();
        let r = cpu.thread.vr(4).u8x16();
        assert_eq!(r[0], 0x1F);
        assert_eq!(r[7], 0x11);
        assert_eq!(r[8], 0x0F);
        assert_eq!(r[15], 0x01);
    }

    #[test]
    fn test_compare_record_sets_cr6() {
        let mut cpu = TestCpu::new();
        cpu.thread.set_vr(1, VmxRegister::from_u32x4([1, 2, 3, 4]));
        cpu.thread.set_vr(2, VmxRegister::from_u32x4([1, 2, 3, 4]));

        // vcmpequw. v3, v1, v2
        cpu.exec(vx_form(3, 1, 2, 134 | 0x400)).unwrap();
        assert_eq!(cpu.thread.vr(3).as_u128(), u128::MAX);
        assert_eq!(cpu.thread.get_cr_field(6), 0b1000);

        // vcmpgtuw. v3, v1, v2: all false
        cpu.exec(vx_form(3, 1, 2, 646 | 0x400)).unwrap();
        assert_eq!(cpu.thread.vr(3).as_u128(), 0);
        assert_eq!(cpu.thread.get_cr_field(6), 0b0010);

        // vcmpgtsw (no record) mixes and leaves CR6 alone
        cpu.thread.set_vr(2, VmxRegister::from_i32x4([0, 5, -1, 4]));
        cpu.exec(vx_form(3, 1, 2, 902)).unwrap();
        assert_eq!(cpu.thread.vr(3).u32x4(), [u32::MAX, 0, u32::MAX, 0]);
        assert_eq!(cpu.thread.get_cr_field(6), 0b0010);
    }

    #[test]
    fn test_vcmpbfp() {
        let mut cpu = TestCpu::new();
        cpu.thread.set_vr(1, VmxRegister::from_f32x4([0.5, 2.0, -3.0, f32::NAN]));
        cpu.thread.set_vr(2, VmxRegister::from_f32x4([1.0; 4]));
        cpu.exec(vx_form(3, 1, 2, 966 | 0x400)).unwrap();
        assert_eq!(cpu.thread.vr(3).u32x4(), [0, 0x8000_0000, 0x4000_0000, 0xC000_0000]);
        assert_eq!(cpu.thread.get_cr_field(6), 0);

        cpu.thread.set_vr(1, VmxRegister::from_f32x4([0.5; 4]));
        cpu.exec(vx_form(3, 1, 2, 966 | 0x400)).unwrap();
        assert_eq!(cpu.thread.get_cr_field(6), 0b0010);
    }

    #[test]
    fn test_pack_and_unpack() {
        let mut cpu = TestCpu::new();
        cpu.thread.set_vr(1, VmxRegister::from_i16x8([300, -300, 5, -5, 127, -128, 0, 1]));
        cpu.thread.set_vr(2, VmxRegister::from_i16x8([0; 8]));

        // vpkshss v3, v1, v2
        cpu.exec(vx_form(3, 1, 2, 398)).unwrap();
        let r = cpu.thread.vr(3).i8x16();
        assert_eq!(&r[..8], &[127, -128, 5, -5, 127, -128, 0, 1]);
        assert!(cpu.thread.vscr().contains(Vscr::SAT));

        // vupkhsb v4, v3 widens without touching SAT
        cpu.thread.regs.vscr = 0;
        cpu.exec(vx_form(4, 0, 3, 526)).unwrap();
        assert_eq!(cpu.thread.vr(4).i16x8(), [127, -128, 5, -5, 127, -128, 0, 1]);
        assert!(!cpu.thread.vscr().contains(Vscr::SAT));

        // vpkuhum v3, v1, v2 keeps the low bytes
        cpu.exec(vx_form(3, 1, 2, 14)).unwrap();
        assert_eq!(cpu.thread.vr(3).u8x16()[0], 300u16 as u8);
    }

    #[test]
    fn test_pixel_pack_and_unpack() {
        let mut cpu = TestCpu::new();
        // Pack keeps the top five bits of each channel
        let pixel = 0x01_F8_00_A8u32;
        cpu.thread.set_vr(1, VmxRegister::from_u32x4([pixel; 4]));
        cpu.thread.set_vr(2, VmxRegister::from_u32x4([pixel; 4]));
        // vpkpx v3, v1, v2 ; vupkhpx v4, v3
        cpu.exec_all(&[vx_form(3, 1, 2, 782), vx_form(4, 0, 3, 846)]).unwrap();
        assert_eq!(cpu.thread.vr(3).u16x8()[0], 0xFC15);
        assert_eq!(cpu.thread.vr(4).u32x4()[0], 0xFF1F_0015);
    }

    #[test]
    fn test_merge_splat_and_shift() {
        let mut cpu = TestCpu::new();
        cpu.thread.set_vr(1, VmxRegister::from_u32x4([1, 2, 3, 4]));
        cpu.thread.set_vr(2, VmxRegister::from_u32x4([5, 6, 7, 8]));

        // vmrghw / vmrglw
        cpu.exec(vx_form(3, 1, 2, 140)).unwrap();
        assert_eq!(cpu.thread.vr(3).u32x4(), [1, 5, 2, 6]);
        cpu.exec(vx_form(3, 1, 2, 396)).unwrap();
        assert_eq!(cpu.thread.vr(3).u32x4(), [3, 7, 4, 8]);

        // vspltw v3, v1, 2
        cpu.exec(vx_form(3, 2, 1, 652)).unwrap();
        assert_eq!(cpu.thread.vr(3).u32x4(), [3; 4]);

        // vspltisb v3, -1
        cpu.exec(vx_form(3, 0x1F, 0, 780)).unwrap();
        assert_eq!(cpu.thread.vr(3).as_u128(), u128::MAX);

        // vsldoi v3, v1, v2, 4
        cpu.exec(va_form(3, 1, 2, 4, 44)).unwrap();
        assert_eq!(cpu.thread.vr(3).u32x4(), [2, 3, 4, 5]);
    }

    #[test]
    fn test_whole_register_shifts() {
        let mut cpu = TestCpu::new();
        cpu.thread.set_vr(1, VmxRegister::from_u128(1));
        cpu.thread.set_vr(2, VmxRegister::from_u128(3 | (2 << 3)));

        // vsl v3, v1, v2: three bits
        cpu.exec(vx_form(3, 1, 2, 452)).unwrap();
        assert_eq!(cpu.thread.vr(3).as_u128(), 8);
        // vslo v3, v1, v2: two octets
        cpu.exec(vx_form(3, 1, 2, 1036)).unwrap();
        assert_eq!(cpu.thread.vr(3).as_u128(), 1 << 16);
    }

    #[test]
    fn test_per_lane_shifts_mask_counts() {
        let mut cpu = TestCpu::new();
        cpu.thread.set_vr(1, VmxRegister::from_u32x4([0x8000_0001; 4]));
        cpu.thread.set_vr(2, VmxRegister::from_u32x4([1, 33, 4, 0]));
        // vrlw v3, v1, v2
        cpu.exec(vx_form(3, 1, 2, 132)).unwrap();
        assert_eq!(cpu.thread.vr(3).u32x4(), [3, 3, 0x18, 0x8000_0001]);
        // vsraw v3, v1, v2
        cpu.exec(vx_form(3, 1, 2, 900)).unwrap();
        assert_eq!(cpu.thread.vr(3).u32x4()[2], 0xF800_0000);
    }

    #[test]
    fn test_multiply_forms() {
        let mut cpu = TestCpu::new();
        cpu.thread.set_vr(1, VmxRegister::from_u8x16(array::from_fn(|i| i as u8)));
        cpu.thread.set_vr(2, VmxRegister::from_u8x16([2; 16]));
        cpu.thread.set_vr(3, VmxRegister::from_u32x4([100; 4]));

        // vmuleub v4, v1, v2 / vmuloub
        cpu.exec(vx_form(4, 1, 2, 520)).unwrap();
        assert_eq!(cpu.thread.vr(4).u16x8()[1], 4);
        cpu.exec(vx_form(4, 1, 2, 8)).unwrap();
        assert_eq!(cpu.thread.vr(4).u16x8()[1], 6);

        // vmsumubm v4, v1, v2, v3: word 0 = 100 + 2*(0+1+2+3)
        cpu.exec(va_form(4, 1, 2, 3, 36)).unwrap();
        assert_eq!(cpu.thread.vr(4).u32x4()[0], 112);
        assert_eq!(cpu.thread.vr(4).u32x4()[3], 100 + 2 * (12 + 13 + 14 + 15));
    }

    #[test]
    fn test_vmhraddshs_rounds() {
        let mut cpu = TestCpu::new();
        cpu.thread.set_vr(1, VmxRegister::from_i16x8([0x4000; 8]));
        cpu.thread.set_vr(2, VmxRegister::from_i16x8([1; 8]));
        cpu.thread.set_vr(3, VmxRegister::from_i16x8([i16::MAX; 8]));

        // 0x4000 * 1 = 0x4000; +0x4000 >> 15 = 1; MAX + 1 saturates
        cpu.exec(va_form(4, 1, 2, 3, 33)).unwrap();
        assert_eq!(cpu.thread.vr(4).i16x8(), [i16::MAX; 8]);
        assert!(cpu.thread.vscr().contains(Vscr::SAT));

        // Without rounding the product contributes 0
        cpu.thread.regs.vscr = 0;
        cpu.exec(va_form(4, 1, 2, 3, 32)).unwrap();
        assert!(!cpu.thread.vscr().contains(Vscr::SAT));
    }

    #[test]
    fn test_sum_across_saturates() {
        let mut cpu = TestCpu::new();
        cpu.thread.set_vr(1, VmxRegister::from_i32x4([i32::MAX, 1, 0, 0]));
        cpu.thread.set_vr(2, VmxRegister::from_i32x4([0, 0, 0, 0]));
        // vsumsws v3, v1, v2
        cpu.exec(vx_form(3, 1, 2, 1928)).unwrap();
        assert_eq!(cpu.thread.vr(3).i32x4(), [0, 0, 0, i32::MAX]);
        assert!(cpu.thread.vscr().contains(Vscr::SAT));
    }

    #[test]
    fn test_non_java_mode_flushes_denormals() {
        let mut cpu = TestCpu::new();
        let tiny = f32::from_bits(1);
        cpu.thread.set_vr(1, VmxRegister::from_f32x4([tiny, -tiny, 1.0, 0.0]));
        cpu.thread.set_vr(2, VmxRegister::from_f32x4([-0.0; 4]));

        // Java mode keeps the denormal
        cpu.exec(vx_form(3, 1, 2, 10)).unwrap();
        assert_eq!(cpu.thread.vr(3).f32x4()[0], tiny);

        cpu.thread.regs.vscr = Vscr::NJ.bits();
        cpu.exec(vx_form(3, 1, 2, 10)).unwrap();
        let r = cpu.thread.vr(3).f32x4();
        assert_eq!(r[0].to_bits(), 0);
        assert_eq!(r[1].to_bits(), 0x8000_0000);
        assert_eq!(r[2], 1.0);
    }

    #[test]
    fn test_float_conversions() {
        let mut cpu = TestCpu::new();
        cpu.thread.set_vr(1, VmxRegister::from_f32x4([1.75, -3e10, f32::NAN, 2.5]));

        // vctsxs v3, v1, 1 (scale by 2)
        cpu.exec(vx_form(3, 1, 1, 970)).unwrap();
        assert_eq!(cpu.thread.vr(3).i32x4(), [3, i32::MIN, 0, 5]);
        assert!(cpu.thread.vscr().contains(Vscr::SAT));

        // vcfsx v4, v3, 1
        cpu.exec(vx_form(4, 1, 3, 842)).unwrap();
        assert_eq!(cpu.thread.vr(4).f32x4()[3], 2.5);

        // vctuxs clamps negatives to zero
        cpu.exec(vx_form(3, 0, 1, 906)).unwrap();
        assert_eq!(cpu.thread.vr(3).u32x4()[1], 0);
    }

    #[test]
    fn test_vscr_moves() {
        let mut cpu = TestCpu::new();
        cpu.thread.set_vr(1, VmxRegister::from_u32x4([0, 0, 0, 0x0001_0001]));
        // mtvscr v1 ; mfvscr v2
        cpu.exec_all(&[vx_form(0, 0, 1, 1604), vx_form(2, 0, 0, 1540)]).unwrap();
        assert!(cpu.thread.non_java_mode());
        assert_eq!(cpu.thread.vr(2).u32x4(), [0, 0, 0, 0x0001_0001]);
    }

    #[test]
    fn test_float_max_min_and_fma() {
        let mut cpu = TestCpu::new();
        cpu.thread.set_vr(1, VmxRegister::from_f32x4([1.0, -0.0, 3.0, 4.0]));
        cpu.thread.set_vr(2, VmxRegister::from_f32x4([2.0, 0.0, 1.0, 1.0]));
        cpu.thread.set_vr(3, VmxRegister::from_f32x4([2.0; 4]));

        // vmaxfp v4, v1, v2
        cpu.exec(vx_form(4, 1, 2, 1034)).unwrap();
        let r = cpu.thread.vr(4).f32x4();
        assert_eq!(r[0], 2.0);
        assert!(r[1].is_sign_positive());

        // vmaddfp v4, v1, v3, v2 => a * c + b
        cpu.exec(va_form(4, 1, 2, 3, 46)).unwrap();
        assert_eq!(cpu.thread.vr(4).f32x4(), [4.0, 0.0, 7.0, 9.0]);
    }
}
