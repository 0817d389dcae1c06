//! Floating-point instructions
//!
//! Host arithmetic always runs round-to-nearest. The sign of each
//! operation's exact rounding error is recovered with error-free transforms
//! on operands rescaled to [1, 2), so it survives results that underflow.
//! That sign drives FI/FR/XX/UX and steps the result one ulp when FPSCR
//! selects a directed rounding mode. Fused multiply-adds round once.
//! Exceptions are recorded in FPSCR only; enabled exceptions set FEX but
//! never interrupt execution.

use super::ExecResult;
use crate::decoder::Instruction;
use crate::interpreter::PpuInterpreter;
use crate::thread::{
    Fpscr, PpuThread, RoundingMode, FPRF_ND, FPRF_NINF, FPRF_NN, FPRF_NZ, FPRF_PD, FPRF_PINF,
    FPRF_PN, FPRF_PZ, FPRF_QNAN,
};

/// Default quiet NaN produced by invalid operations
pub const CANONICAL_QNAN: u64 = 0x7FF8_0000_0000_0000;

const QUIET_BIT: u64 = 0x0008_0000_0000_0000;

#[inline]
pub fn is_snan(x: f64) -> bool {
    x.is_nan() && x.to_bits() & QUIET_BIT == 0
}

#[inline]
fn quiet(x: f64) -> f64 {
    f64::from_bits(x.to_bits() | QUIET_BIT)
}

/// FPRF class of a double result
pub fn classify(x: f64) -> u32 {
    use std::num::FpCategory::*;
    let neg = x.is_sign_negative();
    match x.classify() {
        Nan => FPRF_QNAN,
        Infinite => if neg { FPRF_NINF } else { FPRF_PINF },
        Zero => if neg { FPRF_NZ } else { FPRF_PZ },
        Subnormal => if neg { FPRF_ND } else { FPRF_PD },
        Normal => if neg { FPRF_NN } else { FPRF_PN },
    }
}

/// FPRF class of a result rounded to single precision
fn classify_single(x: f64) -> u32 {
    if x.is_nan() {
        return FPRF_QNAN;
    }
    let narrow = x as f32;
    if narrow.is_subnormal() {
        if narrow.is_sign_negative() { FPRF_ND } else { FPRF_PD }
    } else {
        classify(x)
    }
}

/// First NaN operand in architectural order, quieted; SNaN raises VXSNAN
fn propagate_nan(thread: &mut PpuThread, operands: &[f64]) -> Option<f64> {
    if operands.iter().any(|&x| is_snan(x)) {
        thread.set_fp_exception(Fpscr::VXSNAN);
    }
    operands.iter().find(|x| x.is_nan()).map(|&x| quiet(x))
}

/// Write a NaN result: FI and FR clear, FPRF quiet NaN
fn store_nan(thread: &mut PpuThread, op: Instruction, value: f64) {
    thread.set_fpscr_flag(Fpscr::FI, false);
    thread.set_fpscr_flag(Fpscr::FR, false);
    thread.set_fpr(op.rd(), value);
    thread.set_fprf(FPRF_QNAN);
    if op.rc() {
        thread.update_cr1();
    }
}

/// Invalid operation: raise the cause and produce the default QNaN
fn store_invalid(thread: &mut PpuThread, op: Instruction, cause: Fpscr) {
    thread.set_fp_exception(cause);
    store_nan(thread, op, f64::from_bits(CANONICAL_QNAN));
}

/// Step one ulp up or down in the target precision
fn step(value: f64, up: bool, single: bool) -> f64 {
    if single {
        let v = value as f32;
        let next = if v == 0.0 {
            let tiny = f32::from_bits(1);
            if up { tiny } else { -tiny }
        } else if (v > 0.0) == up {
            f32::from_bits(v.to_bits() + 1)
        } else {
            f32::from_bits(v.to_bits() - 1)
        };
        next as f64
    } else if value == 0.0 {
        let tiny = f64::from_bits(1);
        if up { tiny } else { -tiny }
    } else if (value > 0.0) == up {
        f64::from_bits(value.to_bits() + 1)
    } else {
        f64::from_bits(value.to_bits() - 1)
    }
}

/// Largest finite magnitude or infinity, as the rounding mode dictates on overflow
fn overflow_result(mode: RoundingMode, negative: bool, single: bool) -> f64 {
    let max = if single { f32::MAX as f64 } else { f64::MAX };
    let to_infinity = match mode {
        RoundingMode::Nearest => true,
        RoundingMode::TowardZero => false,
        RoundingMode::TowardPositive => !negative,
        RoundingMode::TowardNegative => negative,
    };
    let magnitude = if to_infinity { f64::INFINITY } else { max };
    if negative { -magnitude } else { magnitude }
}

/// Commit an overflowed result with OX, XX and FI set
fn store_overflow(thread: &mut PpuThread, op: Instruction, negative: bool, single: bool) {
    let result = overflow_result(thread.rounding_mode(), negative, single);
    thread.set_fp_exception(Fpscr::OX | Fpscr::XX);
    thread.set_fpscr_flag(Fpscr::FI, true);
    thread.set_fpscr_flag(Fpscr::FR, result.is_infinite());
    write_result(thread, op, result, single);
}

/// Round a nearest-even host result to the FPSCR mode and commit it
///
/// `err` carries the sign of `exact - value` and is zero when `value` is
/// exact. Its magnitude is at most the true error and is otherwise unused.
fn store_rounded(
    thread: &mut PpuThread,
    op: Instruction,
    value: f64,
    err: f64,
    single: bool,
    finite_inputs: bool,
) {
    let mode = thread.rounding_mode();
    let (mut value, mut err) = (value, err);

    if single && value.is_finite() {
        let mut narrowed = value as f32 as f64;
        if narrowed.is_finite() {
            let gap = value - narrowed;
            // A double on a single-precision midpoint fell short of the exact
            // value, so the tie goes to the far neighbour
            if gap != 0.0 && err != 0.0 && (gap > 0.0) == (err > 0.0) {
                let far = step(narrowed, gap > 0.0, true);
                if far - narrowed == 2.0 * gap {
                    narrowed = far;
                }
            }
            err += value - narrowed;
        }
        value = narrowed;
    }

    if value.is_infinite() && finite_inputs {
        return store_overflow(thread, op, value.is_sign_negative(), single);
    }

    if err != 0.0 && value.is_finite() {
        let nudge = match mode {
            RoundingMode::Nearest => None,
            RoundingMode::TowardZero if value > 0.0 && err < 0.0 => Some(false),
            RoundingMode::TowardZero if value < 0.0 && err > 0.0 => Some(true),
            RoundingMode::TowardZero => None,
            RoundingMode::TowardPositive => (err > 0.0).then_some(true),
            RoundingMode::TowardNegative => (err < 0.0).then_some(false),
        };
        if let Some(up) = nudge {
            let stepped = step(value, up, single);
            if stepped.is_infinite() {
                return store_overflow(thread, op, value.is_sign_negative(), single);
            }
            value = stepped;
            // The exact result now lies between the old value and the step
            err = error_sign(if up { -1.0 } else { 1.0 });
        }
    }

    let min_normal = if single { f32::MIN_POSITIVE as f64 } else { f64::MIN_POSITIVE };
    if thread.fpscr().contains(Fpscr::NI) && value != 0.0 && value.abs() < min_normal {
        err = value;
        value = if value.is_sign_negative() { -0.0 } else { 0.0 };
    }

    let inexact = err != 0.0;
    thread.set_fpscr_flag(Fpscr::FI, inexact);
    thread.set_fpscr_flag(Fpscr::FR, inexact && ((value > 0.0 && err < 0.0) || (value < 0.0 && err > 0.0)));
    if inexact {
        let mut flags = Fpscr::XX;
        if value.abs() < min_normal {
            flags |= Fpscr::UX;
        }
        thread.set_fp_exception(flags);
    }
    write_result(thread, op, value, single);
}

/// Commit a result: FPR, FPRF and the CR1 record
fn write_result(thread: &mut PpuThread, op: Instruction, value: f64, single: bool) {
    thread.set_fpr(op.rd(), value);
    thread.set_fprf(if single { classify_single(value) } else { classify(value) });
    if op.rc() {
        thread.update_cr1();
    }
}

/// Exact-result bookkeeping for an operation with no rounding error available
fn store_exact(thread: &mut PpuThread, op: Instruction, value: f64, single: bool) {
    thread.set_fpscr_flag(Fpscr::FI, false);
    thread.set_fpscr_flag(Fpscr::FR, false);
    write_result(thread, op, value, single);
}

/// Exact zero sum of `x + y`: zeros of one sign keep it, anything else is
/// +0 except under round toward minus infinity
fn zero_sum(mode: RoundingMode, x: f64, y: f64) -> f64 {
    let negative = if x == 0.0 && y == 0.0 && x.is_sign_negative() == y.is_sign_negative() {
        x.is_sign_negative()
    } else {
        mode == RoundingMode::TowardNegative
    };
    if negative { -0.0 } else { 0.0 }
}

// Rounding residuals
//
// Operands are rescaled to [1, 2) before the error-free transforms, so no
// partial product or remainder underflows. The host result is rescaled by
// the same power of two; when it underflowed its gap to the rescaled
// rounding decides the direction, otherwise the transform's tail does.

#[inline]
fn pow2(exp: i32) -> f64 {
    f64::from_bits(((exp + 1023) as u64) << 52)
}

/// `x * 2^exp`, stepping so each factor stays a normal double
fn scale(mut x: f64, mut exp: i32) -> f64 {
    const STEP: i32 = 1000;
    while exp > STEP {
        x *= pow2(STEP);
        exp -= STEP;
    }
    while exp < -STEP {
        x *= pow2(-STEP);
        exp += STEP;
    }
    x * pow2(exp)
}

/// `|x| = m * 2^e` with `m` in [1, 2), for finite nonzero `x`
fn normalize(x: f64) -> (f64, i32) {
    let biased = ((x.to_bits() >> 52) & 0x7FF) as i32;
    let exp = if biased == 0 {
        let raised = x * pow2(64);
        ((raised.to_bits() >> 52) & 0x7FF) as i32 - 1023 - 64
    } else {
        biased - 1023
    };
    (scale(x.abs(), -exp), exp)
}

/// The smallest double with the sign of `direction`, or zero
#[inline]
fn error_sign(direction: f64) -> f64 {
    if direction == 0.0 {
        0.0
    } else {
        f64::from_bits(1).copysign(direction)
    }
}

#[inline]
fn two_sum(a: f64, b: f64) -> (f64, f64) {
    let s = a + b;
    let bb = s - a;
    (s, (a - (s - bb)) + (b - bb))
}

/// Error of `product = RN(a * c)` for finite nonzero operands
fn product_error(a: f64, c: f64, product: f64) -> f64 {
    let (ma, ea) = normalize(a);
    let (mc, ec) = normalize(c);
    let p = ma * mc;
    let tail = ma.mul_add(mc, -p);
    let gap = p - scale(product.abs(), -(ea + ec));
    let magnitude = if gap != 0.0 { gap } else { tail };
    error_sign(if product.is_sign_negative() { -magnitude } else { magnitude })
}

/// Error of `quotient = RN(a / b)` for finite nonzero operands
fn quotient_error(a: f64, b: f64, quotient: f64) -> f64 {
    let (ma, ea) = normalize(a);
    let (mb, eb) = normalize(b);
    let q = ma / mb;
    let remainder = -q.mul_add(mb, -ma);
    let gap = q - scale(quotient.abs(), eb - ea);
    let magnitude = if gap != 0.0 { gap } else { remainder };
    error_sign(if quotient.is_sign_negative() { -magnitude } else { magnitude })
}

/// Error of `sqrt(b)` for finite positive `b`; a square root never underflows
fn root_error(b: f64) -> f64 {
    let (mut m, exp) = normalize(b);
    if exp % 2 != 0 {
        m *= 2.0;
    }
    let s = m.sqrt();
    error_sign(-s.mul_add(s, -m))
}

/// Error of `fused = RN(a * c + b)` for finite nonzero `a`, `c` and finite `b`
fn fused_error(a: f64, c: f64, b: f64, fused: f64) -> f64 {
    if b == 0.0 {
        return product_error(a, c, fused);
    }
    let (ma, ea) = normalize(a);
    let (mc, ec) = normalize(c);
    let (_, eb) = normalize(b);
    let product_exp = ea + ec;
    let product_negative = a.is_sign_negative() != c.is_sign_negative();

    // Either term may sit wholly below the other's rounding position
    if eb - product_exp > 200 {
        return error_sign(if product_negative { -1.0 } else { 1.0 });
    }
    if product_exp - eb > 200 {
        let err = product_error(a, c, fused);
        return if err != 0.0 { err } else { error_sign(b) };
    }

    let top = product_exp.max(eb);
    let sa = if a.is_sign_negative() { -ma } else { ma };
    let sc = scale(if c.is_sign_negative() { -mc } else { mc }, product_exp - top);
    let sb = scale(b, -top);

    // a*c + b == r1 + r2 + r3 exactly, with |r2 + r3| at most half an ulp of r1
    let r1 = sa.mul_add(sc, sb);
    let u1 = sa * sc;
    let u2 = sa.mul_add(sc, -u1);
    let (alpha1, alpha2) = two_sum(sb, u2);
    let (beta1, beta2) = two_sum(u1, alpha1);
    let gamma = (beta1 - r1) + beta2;
    let (r2, r3) = two_sum(gamma, alpha2);

    let gap = r1 - scale(fused, -top);
    error_sign(if gap != 0.0 {
        gap
    } else if r2 != 0.0 {
        r2
    } else {
        r3
    })
}

// Arithmetic cores

fn add_core(thread: &mut PpuThread, op: Instruction, negate_b: bool, single: bool) {
    let (a, b) = (thread.fpr(op.ra()), thread.fpr(op.rb()));
    if let Some(nan) = propagate_nan(thread, &[a, b]) {
        return store_nan(thread, op, nan);
    }
    let b = if negate_b { -b } else { b };
    if a.is_infinite() && b.is_infinite() && a.is_sign_negative() != b.is_sign_negative() {
        return store_invalid(thread, op, Fpscr::VXISI);
    }

    let mut sum = a + b;
    let err = if sum.is_finite() {
        two_sum(a, b).1
    } else {
        0.0
    };
    if sum == 0.0 {
        sum = zero_sum(thread.rounding_mode(), a, b);
    }
    store_rounded(thread, op, sum, err, single, a.is_finite() && b.is_finite());
}

fn mul_core(thread: &mut PpuThread, op: Instruction, single: bool) {
    let (a, c) = (thread.fpr(op.ra()), thread.fpr(op.rc_reg()));
    if let Some(nan) = propagate_nan(thread, &[a, c]) {
        return store_nan(thread, op, nan);
    }
    if (a.is_infinite() && c == 0.0) || (a == 0.0 && c.is_infinite()) {
        return store_invalid(thread, op, Fpscr::VXIMZ);
    }

    let product = a * c;
    let err = if product.is_finite() && a != 0.0 && c != 0.0 {
        product_error(a, c, product)
    } else {
        0.0
    };
    store_rounded(thread, op, product, err, single, a.is_finite() && c.is_finite());
}

fn div_core(thread: &mut PpuThread, op: Instruction, single: bool) {
    let (a, b) = (thread.fpr(op.ra()), thread.fpr(op.rb()));
    if let Some(nan) = propagate_nan(thread, &[a, b]) {
        return store_nan(thread, op, nan);
    }
    if a == 0.0 && b == 0.0 {
        return store_invalid(thread, op, Fpscr::VXZDZ);
    }
    if a.is_infinite() && b.is_infinite() {
        return store_invalid(thread, op, Fpscr::VXIDI);
    }
    if b == 0.0 && a.is_finite() {
        thread.set_fp_exception(Fpscr::ZX);
        let negative = a.is_sign_negative() != b.is_sign_negative();
        return store_exact(thread, op, if negative { f64::NEG_INFINITY } else { f64::INFINITY }, single);
    }

    // Finite over infinite is an exact signed zero
    let quotient = a / b;
    let err = if a != 0.0 && a.is_finite() && b.is_finite() && quotient.is_finite() {
        quotient_error(a, b, quotient)
    } else {
        0.0
    };
    store_rounded(thread, op, quotient, err, single, a.is_finite() && b.is_finite());
}

fn sqrt_core(thread: &mut PpuThread, op: Instruction, single: bool) {
    let b = thread.fpr(op.rb());
    if let Some(nan) = propagate_nan(thread, &[b]) {
        return store_nan(thread, op, nan);
    }
    if b < 0.0 {
        return store_invalid(thread, op, Fpscr::VXSQRT);
    }

    let root = b.sqrt();
    let err = if b.is_finite() && b != 0.0 { root_error(b) } else { 0.0 };
    store_rounded(thread, op, root, err, single, b.is_finite());
}

/// Fused multiply-add family: `±(a * c ± b)` with a single rounding
fn fma_core(
    thread: &mut PpuThread,
    op: Instruction,
    subtract: bool,
    negate: bool,
    single: bool,
) {
    let a = thread.fpr(op.ra());
    let b = thread.fpr(op.rb());
    let c = thread.fpr(op.rc_reg());

    if let Some(nan) = propagate_nan(thread, &[a, b, c]) {
        return store_nan(thread, op, nan);
    }
    if (a.is_infinite() && c == 0.0) || (a == 0.0 && c.is_infinite()) {
        return store_invalid(thread, op, Fpscr::VXIMZ);
    }
    let addend = if subtract { -b } else { b };
    let product_inf = a.is_infinite() || c.is_infinite();
    if product_inf
        && addend.is_infinite()
        && (a.is_sign_negative() != c.is_sign_negative()) != addend.is_sign_negative()
    {
        return store_invalid(thread, op, Fpscr::VXISI);
    }

    let finite_inputs = a.is_finite() && b.is_finite() && c.is_finite();
    let fused = a.mul_add(c, addend);
    let mut err = if finite_inputs && fused.is_finite() && a != 0.0 && c != 0.0 {
        fused_error(a, c, addend, fused)
    } else {
        0.0
    };
    let mut value = if finite_inputs && fused == 0.0 && err == 0.0 {
        zero_sum(thread.rounding_mode(), a * c, addend)
    } else {
        fused
    };
    if negate {
        value = -value;
        err = -err;
    }
    store_rounded(thread, op, value, err, single, finite_inputs);
}

// A-form arithmetic

macro_rules! arith_ops {
    ($($name:ident => |$t:ident, $op:ident| $body:expr;)*) => {
        $(
            pub fn $name(_ppu: &PpuInterpreter, $t: &mut PpuThread, $op: Instruction) -> ExecResult {
                $body;
                Ok(())
            }
        )*
    };
}

arith_ops! {
    fadd => |t, op| add_core(t, op, false, false);
    fadds => |t, op| add_core(t, op, false, true);
    fsub => |t, op| add_core(t, op, true, false);
    fsubs => |t, op| add_core(t, op, true, true);
    fmul => |t, op| mul_core(t, op, false);
    fmuls => |t, op| mul_core(t, op, true);
    fdiv => |t, op| div_core(t, op, false);
    fdivs => |t, op| div_core(t, op, true);
    fsqrt => |t, op| sqrt_core(t, op, false);
    fsqrts => |t, op| sqrt_core(t, op, true);
    fmadd => |t, op| fma_core(t, op, false, false, false);
    fmadds => |t, op| fma_core(t, op, false, false, true);
    fmsub => |t, op| fma_core(t, op, true, false, false);
    fmsubs => |t, op| fma_core(t, op, true, false, true);
    fnmadd => |t, op| fma_core(t, op, false, true, false);
    fnmadds => |t, op| fma_core(t, op, false, true, true);
    fnmsub => |t, op| fma_core(t, op, true, true, false);
    fnmsubs => |t, op| fma_core(t, op, true, true, true);
}

/// Reciprocal estimate, single precision
pub fn fres(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let b = thread.fpr(op.rb());
    if let Some(nan) = propagate_nan(thread, &[b]) {
        store_nan(thread, op, nan);
        return Ok(());
    }
    if b == 0.0 {
        thread.set_fp_exception(Fpscr::ZX);
    }
    let estimate = (1.0 / b) as f32 as f64;
    write_result(thread, op, estimate, true);
    Ok(())
}

/// Reciprocal square root estimate
pub fn frsqrte(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let b = thread.fpr(op.rb());
    if let Some(nan) = propagate_nan(thread, &[b]) {
        store_nan(thread, op, nan);
        return Ok(());
    }
    if b < 0.0 {
        store_invalid(thread, op, Fpscr::VXSQRT);
        return Ok(());
    }
    if b == 0.0 {
        thread.set_fp_exception(Fpscr::ZX);
    }
    write_result(thread, op, 1.0 / b.sqrt(), false);
    Ok(())
}

pub fn fsel(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let a = thread.fpr(op.ra());
    let value = if a >= 0.0 { thread.fpr(op.rc_reg()) } else { thread.fpr(op.rb()) };
    thread.set_fpr(op.rd(), value);
    if op.rc() {
        thread.update_cr1();
    }
    Ok(())
}

// Moves: pure bit operations, FPSCR untouched

macro_rules! move_ops {
    ($($name:ident => |$bits:ident| $e:expr;)*) => {
        $(
            pub fn $name(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
                let $bits = thread.fpr_bits(op.rb());
                thread.set_fpr_bits(op.rd(), $e);
                if op.rc() {
                    thread.update_cr1();
                }
                Ok(())
            }
        )*
    };
}

move_ops! {
    fmr => |bits| bits;
    fneg => |bits| bits ^ (1 << 63);
    fabs => |bits| bits & !(1 << 63);
    fnabs => |bits| bits | (1 << 63);
}

/// Round to single precision
pub fn frsp(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let b = thread.fpr(op.rb());
    if b.is_nan() {
        if is_snan(b) {
            thread.set_fp_exception(Fpscr::VXSNAN);
        }
        // Keep the payload bits a single can hold
        let narrowed = f64::from_bits(quiet(b).to_bits() & 0xFFFF_FFFF_E000_0000);
        store_nan(thread, op, narrowed);
        return Ok(());
    }
    store_rounded(thread, op, b, 0.0, true, b.is_finite());
    Ok(())
}

// Conversions

/// Round to an integral value in the given mode
fn round_integral(value: f64, mode: RoundingMode) -> f64 {
    match mode {
        RoundingMode::Nearest => value.round_ties_even(),
        RoundingMode::TowardZero => value.trunc(),
        RoundingMode::TowardPositive => value.ceil(),
        RoundingMode::TowardNegative => value.floor(),
    }
}

/// Shared body of fctiw[z] / fctid[z]; the integer lands in the FPR bit pattern
fn convert_to_integer(thread: &mut PpuThread, op: Instruction, mode: RoundingMode, min: i64, max: i64) {
    let b = thread.fpr(op.rb());
    let word = max == i32::MAX as i64;
    let encode = |v: i64| if word { v as i32 as u32 as u64 } else { v as u64 };

    let rounded = round_integral(b, mode);
    let saturated = if b.is_nan() {
        let mut flags = Fpscr::VXCVI;
        if is_snan(b) {
            flags |= Fpscr::VXSNAN;
        }
        Some((flags, min))
    } else if rounded >= max as f64 + 1.0 {
        Some((Fpscr::VXCVI, max))
    } else if rounded < min as f64 {
        Some((Fpscr::VXCVI, min))
    } else {
        None
    };

    match saturated {
        Some((flags, value)) => {
            thread.set_fp_exception(flags);
            thread.set_fpscr_flag(Fpscr::FI, false);
            thread.set_fpscr_flag(Fpscr::FR, false);
            thread.set_fpr_bits(op.rd(), encode(value));
        }
        None => {
            let inexact = rounded != b;
            thread.set_fpscr_flag(Fpscr::FI, inexact);
            thread.set_fpscr_flag(Fpscr::FR, rounded.abs() > b.abs());
            if inexact {
                thread.set_fp_exception(Fpscr::XX);
            }
            thread.set_fpr_bits(op.rd(), encode(rounded as i64));
        }
    }
    if op.rc() {
        thread.update_cr1();
    }
}

pub fn fctiw(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let mode = thread.rounding_mode();
    convert_to_integer(thread, op, mode, i32::MIN as i64, i32::MAX as i64);
    Ok(())
}

pub fn fctiwz(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    convert_to_integer(thread, op, RoundingMode::TowardZero, i32::MIN as i64, i32::MAX as i64);
    Ok(())
}

pub fn fctid(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let mode = thread.rounding_mode();
    convert_to_integer(thread, op, mode, i64::MIN, i64::MAX);
    Ok(())
}

pub fn fctidz(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    convert_to_integer(thread, op, RoundingMode::TowardZero, i64::MIN, i64::MAX);
    Ok(())
}

/// Convert a signed doubleword held in an FPR to double
pub fn fcfid(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let integer = thread.fpr_bits(op.rb()) as i64;
    let value = integer as f64;
    let err = (integer as i128 - value as i128) as f64;
    store_rounded(thread, op, value, err, false, true);
    Ok(())
}

// Compare

fn compare_core(thread: &mut PpuThread, op: Instruction, ordered: bool) {
    let a = thread.fpr(op.ra());
    let b = thread.fpr(op.rb());

    let c = if a.is_nan() || b.is_nan() {
        0b0001
    } else if a < b {
        0b1000
    } else if a > b {
        0b0100
    } else {
        0b0010
    };

    if is_snan(a) || is_snan(b) {
        let mut flags = Fpscr::VXSNAN;
        if ordered && !thread.fpscr().contains(Fpscr::VE) {
            flags |= Fpscr::VXVC;
        }
        thread.set_fp_exception(flags);
    } else if ordered && (a.is_nan() || b.is_nan()) {
        thread.set_fp_exception(Fpscr::VXVC);
    }

    thread.set_fpcc(c);
    thread.set_cr_field(op.crfd(), c);
}

pub fn fcmpu(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    compare_core(thread, op, false);
    Ok(())
}

pub fn fcmpo(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    compare_core(thread, op, true);
    Ok(())
}
