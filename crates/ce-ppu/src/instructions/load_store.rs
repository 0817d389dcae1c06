//! Load and store instructions
//!
//! All guest accesses go through the shared [`MemoryManager`](ce_memory::MemoryManager)
//! and are big-endian unless the mnemonic says byte-reversed. Effective
//! addresses are computed in 64 bits and truncated to the 32-bit guest
//! address space at the access.

use super::{ea_d, ea_d_update, ea_ds, ea_ds_update, ea_x, ea_x_update, ra_or_zero, ExecResult};
use crate::decoder::Instruction;
use crate::interpreter::PpuInterpreter;
use crate::thread::PpuThread;
use crate::vmx::VmxRegister;

use ce_memory::constants::CACHE_LINE_SIZE;

macro_rules! integer_loads {
    ($($name:ident: $ea:ident, $update:literal, |$m:ident, $a:ident| $read:expr;)*) => {
        $(
            pub fn $name(ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
                let ea = $ea(thread, op);
                let ($m, $a) = (ppu.memory(), ea as u32);
                let value: u64 = $read;
                thread.set_gpr(op.rd(), value);
                if $update {
                    thread.set_gpr(op.ra(), ea);
                }
                Ok(())
            }
        )*
    };
}

macro_rules! integer_stores {
    ($($name:ident: $ea:ident, $update:literal, |$m:ident, $a:ident, $v:ident| $write:expr;)*) => {
        $(
            pub fn $name(ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
                let ea = $ea(thread, op);
                let ($m, $a, $v) = (ppu.memory(), ea as u32, thread.gpr(op.rs()));
                $write?;
                if $update {
                    thread.set_gpr(op.ra(), ea);
                }
                Ok(())
            }
        )*
    };
}

integer_loads! {
    lbz: ea_d, false, |m, a| m.read_u8(a)? as u64;
    lbzu: ea_d_update, true, |m, a| m.read_u8(a)? as u64;
    lbzx: ea_x, false, |m, a| m.read_u8(a)? as u64;
    lbzux: ea_x_update, true, |m, a| m.read_u8(a)? as u64;

    lhz: ea_d, false, |m, a| m.read_be16(a)? as u64;
    lhzu: ea_d_update, true, |m, a| m.read_be16(a)? as u64;
    lhzx: ea_x, false, |m, a| m.read_be16(a)? as u64;
    lhzux: ea_x_update, true, |m, a| m.read_be16(a)? as u64;
    lha: ea_d, false, |m, a| m.read_be16(a)? as i16 as u64;
    lhau: ea_d_update, true, |m, a| m.read_be16(a)? as i16 as u64;
    lhax: ea_x, false, |m, a| m.read_be16(a)? as i16 as u64;
    lhaux: ea_x_update, true, |m, a| m.read_be16(a)? as i16 as u64;

    lwz: ea_d, false, |m, a| m.read_be32(a)? as u64;
    lwzu: ea_d_update, true, |m, a| m.read_be32(a)? as u64;
    lwzx: ea_x, false, |m, a| m.read_be32(a)? as u64;
    lwzux: ea_x_update, true, |m, a| m.read_be32(a)? as u64;
    lwa: ea_ds, false, |m, a| m.read_be32(a)? as i32 as u64;
    lwax: ea_x, false, |m, a| m.read_be32(a)? as i32 as u64;
    lwaux: ea_x_update, true, |m, a| m.read_be32(a)? as i32 as u64;

    ld: ea_ds, false, |m, a| m.read_be64(a)?;
    ldu: ea_ds_update, true, |m, a| m.read_be64(a)?;
    ldx: ea_x, false, |m, a| m.read_be64(a)?;
    ldux: ea_x_update, true, |m, a| m.read_be64(a)?;

    lhbrx: ea_x, false, |m, a| m.read_be16(a)?.swap_bytes() as u64;
    lwbrx: ea_x, false, |m, a| m.read_be32(a)?.swap_bytes() as u64;
    ldbrx: ea_x, false, |m, a| m.read_be64(a)?.swap_bytes();
}

integer_stores! {
    stb: ea_d, false, |m, a, v| m.write_u8(a, v as u8);
    stbu: ea_d_update, true, |m, a, v| m.write_u8(a, v as u8);
    stbx: ea_x, false, |m, a, v| m.write_u8(a, v as u8);
    stbux: ea_x_update, true, |m, a, v| m.write_u8(a, v as u8);

    sth: ea_d, false, |m, a, v| m.write_be16(a, v as u16);
    sthu: ea_d_update, true, |m, a, v| m.write_be16(a, v as u16);
    sthx: ea_x, false, |m, a, v| m.write_be16(a, v as u16);
    sthux: ea_x_update, true, |m, a, v| m.write_be16(a, v as u16);

    stw: ea_d, false, |m, a, v| m.write_be32(a, v as u32);
    stwu: ea_d_update, true, |m, a, v| m.write_be32(a, v as u32);
    stwx: ea_x, false, |m, a, v| m.write_be32(a, v as u32);
    stwux: ea_x_update, true, |m, a, v| m.write_be32(a, v as u32);

    std: ea_ds, false, |m, a, v| m.write_be64(a, v);
    stdu: ea_ds_update, true, |m, a, v| m.write_be64(a, v);
    stdx: ea_x, false, |m, a, v| m.write_be64(a, v);
    stdux: ea_x_update, true, |m, a, v| m.write_be64(a, v);

    sthbrx: ea_x, false, |m, a, v| m.write_be16(a, (v as u16).swap_bytes());
    stwbrx: ea_x, false, |m, a, v| m.write_be32(a, (v as u32).swap_bytes());
    stdbrx: ea_x, false, |m, a, v| m.write_be64(a, v.swap_bytes());
}

/// Load multiple words into rD..r31
pub fn lmw(ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let mut ea = ea_d(thread, op);
    for reg in op.rd()..32 {
        let value = ppu.memory().read_be32(ea as u32)?;
        thread.set_gpr(reg, value as u64);
        ea = ea.wrapping_add(4);
    }
    Ok(())
}

/// Store the low words of rS..r31
pub fn stmw(ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let mut ea = ea_d(thread, op);
    for reg in op.rs()..32 {
        ppu.memory().write_be32(ea as u32, thread.gpr(reg) as u32)?;
        ea = ea.wrapping_add(4);
    }
    Ok(())
}

// String forms move `count` bytes through consecutive registers, four per
// register, left-justified in the low word and wrapping from r31 to r0.

fn load_string(ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction, mut ea: u64, count: u32) -> ExecResult {
    let mut reg = op.rd();
    let mut remaining = count;
    while remaining > 0 {
        let chunk = remaining.min(4);
        let mut bytes = [0u8; 4];
        ppu.memory().read_left(&mut bytes, ea as u32, chunk as usize)?;
        thread.set_gpr(reg, u32::from_be_bytes(bytes) as u64);
        ea = ea.wrapping_add(chunk as u64);
        remaining -= chunk;
        reg = (reg + 1) % 32;
    }
    Ok(())
}

fn store_string(ppu: &PpuInterpreter, thread: &PpuThread, op: Instruction, mut ea: u64, count: u32) -> ExecResult {
    let mut reg = op.rs();
    let mut remaining = count;
    while remaining > 0 {
        let chunk = remaining.min(4);
        let bytes = (thread.gpr(reg) as u32).to_be_bytes();
        ppu.memory().write_left(&bytes, ea as u32, chunk as usize)?;
        ea = ea.wrapping_add(chunk as u64);
        remaining -= chunk;
        reg = (reg + 1) % 32;
    }
    Ok(())
}

/// Immediate byte count in the rB slot; zero means 32
fn immediate_count(op: Instruction) -> u32 {
    match op.rb() {
        0 => 32,
        n => n as u32,
    }
}

pub fn lswi(ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let ea = ra_or_zero(thread, op);
    load_string(ppu, thread, op, ea, immediate_count(op))
}

pub fn lswx(ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let ea = ea_x(thread, op);
    let count = thread.xer_byte_count();
    load_string(ppu, thread, op, ea, count)
}

pub fn stswi(ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let ea = ra_or_zero(thread, op);
    store_string(ppu, thread, op, ea, immediate_count(op))
}

pub fn stswx(ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let ea = ea_x(thread, op);
    store_string(ppu, thread, op, ea, thread.xer_byte_count())
}

// Reservations

pub fn lwarx(ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let ea = ea_x(thread, op) as u32;
    let value = ppu.memory().read_be32(ea)?;
    thread.reservation.reserve_word(ea, value);
    thread.set_gpr(op.rd(), value as u64);
    Ok(())
}

pub fn ldarx(ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let ea = ea_x(thread, op) as u32;
    let value = ppu.memory().read_be64(ea)?;
    thread.reservation.reserve_doubleword(ea, value);
    thread.set_gpr(op.rd(), value);
    Ok(())
}

/// CR0 after a conditional store: EQ reports success, SO copies XER[SO]
fn record_conditional(thread: &mut PpuThread, stored: bool) {
    let so = thread.get_xer_so() as u32;
    thread.set_cr_field(0, if stored { 0b0010 } else { 0 } | so);
}

pub fn stwcx(ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let ea = ea_x(thread, op) as u32;
    let value = thread.gpr(op.rs()) as u32;
    let stored = thread.reservation.store_word_conditional(ppu.memory(), ea, value)?;
    record_conditional(thread, stored);
    Ok(())
}

pub fn stdcx(ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let ea = ea_x(thread, op) as u32;
    let value = thread.gpr(op.rs());
    let stored = thread.reservation.store_doubleword_conditional(ppu.memory(), ea, value)?;
    record_conditional(thread, stored);
    Ok(())
}

/// Zero the whole cache line containing the effective address
pub fn dcbz(ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let line = ea_x(thread, op) as u32 & !(CACHE_LINE_SIZE - 1);
    ppu.memory().fill(line, CACHE_LINE_SIZE as usize, 0)?;
    Ok(())
}

// Floating point

/// Widen single-precision bits without going through host conversion,
/// which would quiet signalling NaNs
fn single_to_double(word: u32) -> u64 {
    if (word >> 23) & 0xFF == 0xFF {
        let sign = ((word >> 31) as u64) << 63;
        sign | (0x7FF << 52) | (((word & 0x007F_FFFF) as u64) << 29)
    } else {
        (f32::from_bits(word) as f64).to_bits()
    }
}

/// Narrow by bit selection when the value is in single range or not finite
fn double_to_single(bits: u64) -> u32 {
    let exponent = (bits >> 52) & 0x7FF;
    if exponent > 896 {
        (((bits >> 32) & 0xC000_0000) | ((bits >> 29) & 0x3FFF_FFFF)) as u32
    } else {
        (f64::from_bits(bits) as f32).to_bits()
    }
}

macro_rules! float_loads {
    ($($name:ident: $ea:ident, $update:literal, |$m:ident, $a:ident| $read:expr;)*) => {
        $(
            pub fn $name(ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
                let ea = $ea(thread, op);
                let ($m, $a) = (ppu.memory(), ea as u32);
                let bits: u64 = $read;
                thread.set_fpr_bits(op.rd(), bits);
                if $update {
                    thread.set_gpr(op.ra(), ea);
                }
                Ok(())
            }
        )*
    };
}

macro_rules! float_stores {
    ($($name:ident: $ea:ident, $update:literal, |$m:ident, $a:ident, $b:ident| $write:expr;)*) => {
        $(
            pub fn $name(ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
                let ea = $ea(thread, op);
                let ($m, $a, $b) = (ppu.memory(), ea as u32, thread.fpr_bits(op.rs()));
                $write?;
                if $update {
                    thread.set_gpr(op.ra(), ea);
                }
                Ok(())
            }
        )*
    };
}

float_loads! {
    lfs: ea_d, false, |m, a| single_to_double(m.read_be32(a)?);
    lfsu: ea_d_update, true, |m, a| single_to_double(m.read_be32(a)?);
    lfsx: ea_x, false, |m, a| single_to_double(m.read_be32(a)?);
    lfsux: ea_x_update, true, |m, a| single_to_double(m.read_be32(a)?);
    lfd: ea_d, false, |m, a| m.read_be64(a)?;
    lfdu: ea_d_update, true, |m, a| m.read_be64(a)?;
    lfdx: ea_x, false, |m, a| m.read_be64(a)?;
    lfdux: ea_x_update, true, |m, a| m.read_be64(a)?;
}

float_stores! {
    stfs: ea_d, false, |m, a, b| m.write_be32(a, double_to_single(b));
    stfsu: ea_d_update, true, |m, a, b| m.write_be32(a, double_to_single(b));
    stfsx: ea_x, false, |m, a, b| m.write_be32(a, double_to_single(b));
    stfsux: ea_x_update, true, |m, a, b| m.write_be32(a, double_to_single(b));
    stfd: ea_d, false, |m, a, b| m.write_be64(a, b);
    stfdu: ea_d_update, true, |m, a, b| m.write_be64(a, b);
    stfdx: ea_x, false, |m, a, b| m.write_be64(a, b);
    stfdux: ea_x_update, true, |m, a, b| m.write_be64(a, b);
    stfiwx: ea_x, false, |m, a, b| m.write_be32(a, b as u32);
}

// Vector

/// `lvx`/`lvxl`: the quadword at the effective address rounded down to 16
pub fn lvx(ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let ea = ea_x(thread, op) as u32 & !0xF;
    let value = ppu.memory().read_be128(ea)?;
    thread.set_vr(op.rd(), VmxRegister::from_u128(value));
    Ok(())
}

pub fn stvx(ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let ea = ea_x(thread, op) as u32 & !0xF;
    ppu.memory().write_be128(ea, thread.vr(op.rs()).as_u128())?;
    Ok(())
}

/// Load one element into its natural lane; the other lanes keep their value
fn load_element(ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction, size: u32) -> ExecResult {
    let ea = ea_x(thread, op) as u32 & !(size - 1);
    let lane = (ea & 0xF) as usize;
    let mut reg = thread.vr(op.rd());
    ppu.memory().read_bytes(ea, &mut reg.data[lane..lane + size as usize])?;
    thread.set_vr(op.rd(), reg);
    Ok(())
}

fn store_element(ppu: &PpuInterpreter, thread: &PpuThread, op: Instruction, size: u32) -> ExecResult {
    let ea = ea_x(thread, op) as u32 & !(size - 1);
    let lane = (ea & 0xF) as usize;
    let reg = thread.vr(op.rs());
    ppu.memory().write_bytes(ea, &reg.data[lane..lane + size as usize])?;
    Ok(())
}

pub fn lvebx(ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    load_element(ppu, thread, op, 1)
}

pub fn lvehx(ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    load_element(ppu, thread, op, 2)
}

pub fn lvewx(ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    load_element(ppu, thread, op, 4)
}

pub fn stvebx(ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    store_element(ppu, thread, op, 1)
}

pub fn stvehx(ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    store_element(ppu, thread, op, 2)
}

pub fn stvewx(ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    store_element(ppu, thread, op, 4)
}

/// Permute control for left-aligning data loaded from a misaligned address
/// Permute controls for lvsl, indexed by the low four address bits
const LVSL_CONTROLS: [u128; 16] = [
    0x0001_0203_0405_0607_0809_0A0B_0C0D_0E0F,
    0x0102_0304_0506_0708_090A_0B0C_0D0E_0F10,
    0x0203_0405_0607_0809_0A0B_0C0D_0E0F_1011,
    0x0304_0506_0708_090A_0B0C_0D0E_0F10_1112,
    0x0405_0607_0809_0A0B_0C0D_0E0F_1011_1213,
    0x0506_0708_090A_0B0C_0D0E_0F10_1112_1314,
    0x0607_0809_0A0B_0C0D_0E0F_1011_1213_1415,
    0x0708_090A_0B0C_0D0E_0F10_1112_1314_1516,
    0x0809_0A0B_0C0D_0E0F_1011_1213_1415_1617,
    0x090A_0B0C_0D0E_0F10_1112_1314_1516_1718,
    0x0A0B_0C0D_0E0F_1011_1213_1415_1617_1819,
    0x0B0C_0D0E_0F10_1112_1314_1516_1718_191A,
    0x0C0D_0E0F_1011_1213_1415_1617_1819_1A1B,
    0x0D0E_0F10_1112_1314_1516_1718_191A_1B1C,
    0x0E0F_1011_1213_1415_1617_1819_1A1B_1C1D,
    0x0F10_1112_1314_1516_1718_191A_1B1C_1D1E,
];

/// Permute controls for lvsr, indexed by the low four address bits
const LVSR_CONTROLS: [u128; 16] = [
    0x1011_1213_1415_1617_1819_1A1B_1C1D_1E1F,
    0x0F10_1112_1314_1516_1718_191A_1B1C_1D1E,
    0x0E0F_1011_1213_1415_1617_1819_1A1B_1C1D,
    0x0D0E_0F10_1112_1314_1516_1718_191A_1B1C,
    0x0C0D_0E0F_1011_1213_1415_1617_1819_1A1B,
    0x0B0C_0D0E_0F10_1112_1314_1516_1718_191A,
    0x0A0B_0C0D_0E0F_1011_1213_1415_1617_1819,
    0x090A_0B0C_0D0E_0F10_1112_1314_1516_1718,
    0x0809_0A0B_0C0D_0E0F_1011_1213_1415_1617,
    0x0708_090A_0B0C_0D0E_0F10_1112_1314_1516,
    0x0607_0809_0A0B_0C0D_0E0F_1011_1213_1415,
    0x0506_0708_090A_0B0C_0D0E_0F10_1112_1314,
    0x0405_0607_0809_0A0B_0C0D_0E0F_1011_1213,
    0x0304_0506_0708_090A_0B0C_0D0E_0F10_1112,
    0x0203_0405_0607_0809_0A0B_0C0D_0E0F_1011,
    0x0102_0304_0506_0708_090A_0B0C_0D0E_0F10,
];

pub fn lvsl(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let sh = (ea_x(thread, op) & 0xF) as usize;
    thread.set_vr(op.rd(), VmxRegister::from_u128(LVSL_CONTROLS[sh]));
    Ok(())
}

pub fn lvsr(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let sh = (ea_x(thread, op) & 0xF) as usize;
    thread.set_vr(op.rd(), VmxRegister::from_u128(LVSR_CONTROLS[sh]));
    Ok(())
}

/// Bytes from the effective address to the end of its quadword, left-justified
pub fn lvlx(ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let ea = ea_x(thread, op) as u32;
    let eb = (ea & 0xF) as usize;
    let mut reg = VmxRegister::ZERO;
    ppu.memory().read_left(&mut reg.data, ea, 16 - eb)?;
    thread.set_vr(op.rd(), reg);
    Ok(())
}

/// Bytes from the start of the quadword up to the effective address, right-justified
pub fn lvrx(ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let ea = ea_x(thread, op) as u32;
    let eb = (ea & 0xF) as usize;
    let mut reg = VmxRegister::ZERO;
    if eb != 0 {
        ppu.memory().read_right(&mut reg.data, ea & !0xF, eb)?;
    }
    thread.set_vr(op.rd(), reg);
    Ok(())
}

pub fn stvlx(ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let ea = ea_x(thread, op) as u32;
    let eb = (ea & 0xF) as usize;
    ppu.memory().write_left(&thread.vr(op.rs()).data, ea, 16 - eb)?;
    Ok(())
}

pub fn stvrx(ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let ea = ea_x(thread, op) as u32;
    let eb = (ea & 0xF) as usize;
    if eb != 0 {
        ppu.memory().write_right(&thread.vr(op.rs()).data, ea & !0xF, eb)?;
    }
    Ok(())
}
