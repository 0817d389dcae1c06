//! PPU thread state
//!
//! One [`PpuThread`] models one hardware thread: the full architectural
//! register file, the status sub-fields the executors update, and the
//! private reservation slot.

use bitflags::bitflags;
use ce_memory::Reservation;

use crate::vmx::VmxRegister;

/// CR field bits, as seen inside one 4-bit field
pub const CR_LT: u32 = 0b1000;
pub const CR_GT: u32 = 0b0100;
pub const CR_EQ: u32 = 0b0010;
pub const CR_SO: u32 = 0b0001;

/// XER bits
pub const XER_SO: u64 = 0x8000_0000;
pub const XER_OV: u64 = 0x4000_0000;
pub const XER_CA: u64 = 0x2000_0000;
pub const XER_BC: u64 = 0x7F;

bitflags! {
    /// Floating-Point Status and Control Register
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Fpscr: u32 {
        const FX     = 0x8000_0000;
        const FEX    = 0x4000_0000;
        const VX     = 0x2000_0000;
        const OX     = 0x1000_0000;
        const UX     = 0x0800_0000;
        const ZX     = 0x0400_0000;
        const XX     = 0x0200_0000;
        const VXSNAN = 0x0100_0000;
        const VXISI  = 0x0080_0000;
        const VXIDI  = 0x0040_0000;
        const VXZDZ  = 0x0020_0000;
        const VXIMZ  = 0x0010_0000;
        const VXVC   = 0x0008_0000;
        const FR     = 0x0004_0000;
        const FI     = 0x0002_0000;
        /// Result flags: class bit plus FPCC
        const FPRF   = 0x0001_F000;
        const FPCC   = 0x0000_F000;
        const VXSOFT = 0x0000_0400;
        const VXSQRT = 0x0000_0200;
        const VXCVI  = 0x0000_0100;
        const VE     = 0x0000_0080;
        const OE     = 0x0000_0040;
        const UE     = 0x0000_0020;
        const ZE     = 0x0000_0010;
        const XE     = 0x0000_0008;
        const NI     = 0x0000_0004;
        const RN     = 0x0000_0003;

        /// Every invalid-operation cause
        const INVALID = Self::VXSNAN.bits() | Self::VXISI.bits() | Self::VXIDI.bits()
            | Self::VXZDZ.bits() | Self::VXIMZ.bits() | Self::VXVC.bits()
            | Self::VXSOFT.bits() | Self::VXSQRT.bits() | Self::VXCVI.bits();
        /// Sticky exception bits, the ones `mcrfs` clears
        const STICKY = Self::FX.bits() | Self::OX.bits() | Self::UX.bits()
            | Self::ZX.bits() | Self::XX.bits() | Self::INVALID.bits();
    }
}

bitflags! {
    /// Vector Status and Control Register
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Vscr: u32 {
        /// Non-Java mode: denormals are flushed to zero
        const NJ  = 0x0001_0000;
        /// Sticky saturation
        const SAT = 0x0000_0001;
    }
}

/// FPRF result classes (value of the 5-bit field)
pub const FPRF_QNAN: u32 = 0x11;
pub const FPRF_NINF: u32 = 0x09;
pub const FPRF_NN: u32 = 0x08;
pub const FPRF_ND: u32 = 0x18;
pub const FPRF_NZ: u32 = 0x12;
pub const FPRF_PZ: u32 = 0x02;
pub const FPRF_PD: u32 = 0x14;
pub const FPRF_PN: u32 = 0x04;
pub const FPRF_PINF: u32 = 0x05;

/// FPSCR rounding modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundingMode {
    Nearest,
    TowardZero,
    TowardPositive,
    TowardNegative,
}

impl RoundingMode {
    pub fn from_bits(rn: u32) -> Self {
        match rn & 3 {
            0 => Self::Nearest,
            1 => Self::TowardZero,
            2 => Self::TowardPositive,
            _ => Self::TowardNegative,
        }
    }
}

/// PPU register set
#[derive(Debug, Clone)]
pub struct PpuRegisters {
    /// General Purpose Registers (64-bit)
    pub gpr: [u64; 32],
    /// Floating Point Registers (64-bit)
    pub fpr: [f64; 32],
    /// Vector Registers (128-bit)
    pub vr: [VmxRegister; 32],
    /// Condition Register
    pub cr: u32,
    /// Link Register
    pub lr: u64,
    /// Count Register
    pub ctr: u64,
    /// Fixed-Point Exception Register
    pub xer: u64,
    /// FP Status and Control Register
    pub fpscr: u32,
    /// Vector Status and Control Register
    pub vscr: u32,
    /// VR save mask (software convention only)
    pub vrsave: u32,
    /// Time base, refreshed when read
    pub tb: u64,
    /// Current instruction address
    pub cia: u64,
    /// Next instruction address, staged while an instruction executes
    pub nia: u64,
}

impl Default for PpuRegisters {
    fn default() -> Self {
        Self {
            gpr: [0; 32],
            fpr: [0.0; 32],
            vr: [VmxRegister::ZERO; 32],
            cr: 0,
            lr: 0,
            ctr: 0,
            xer: 0,
            fpscr: 0,
            vscr: 0,
            vrsave: 0,
            tb: 0,
            cia: 0,
            nia: 0,
        }
    }
}

/// PPU thread state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PpuThreadState {
    /// Thread is stopped
    Stopped,
    /// Thread is running
    Running,
    /// Thread exited through the kernel
    Exited,
}

/// PPU thread
#[derive(Debug, Clone)]
pub struct PpuThread {
    /// Thread ID
    pub id: u32,
    /// Thread name
    pub name: String,
    /// Register state
    pub regs: PpuRegisters,
    /// Thread state
    pub state: PpuThreadState,
    /// Load-and-reserve slot
    pub reservation: Reservation,
    /// Exit status reported by the kernel
    pub exit_code: Option<i32>,
}

impl PpuThread {
    /// Create a new PPU thread
    pub fn new(id: u32) -> Self {
        Self {
            id,
            name: format!("PPU Thread {}", id),
            regs: PpuRegisters::default(),
            state: PpuThreadState::Stopped,
            reservation: Reservation::new(),
            exit_code: None,
        }
    }

    /// Get the current instruction address
    #[inline]
    pub fn pc(&self) -> u64 {
        self.regs.cia
    }

    /// Set the program counter
    pub fn set_pc(&mut self, addr: u64) {
        self.regs.cia = addr;
        self.regs.nia = addr.wrapping_add(4);
    }

    /// Redirect execution after the current instruction
    #[inline]
    pub fn branch_to(&mut self, addr: u64) {
        self.regs.nia = addr;
    }

    /// Read a GPR
    #[inline]
    pub fn gpr(&self, index: usize) -> u64 {
        self.regs.gpr[index]
    }

    /// Write a GPR
    #[inline]
    pub fn set_gpr(&mut self, index: usize, value: u64) {
        self.regs.gpr[index] = value;
    }

    /// Read an FPR
    #[inline]
    pub fn fpr(&self, index: usize) -> f64 {
        self.regs.fpr[index]
    }

    /// Write an FPR
    #[inline]
    pub fn set_fpr(&mut self, index: usize, value: f64) {
        self.regs.fpr[index] = value;
    }

    /// Raw bits of an FPR
    #[inline]
    pub fn fpr_bits(&self, index: usize) -> u64 {
        self.regs.fpr[index].to_bits()
    }

    #[inline]
    pub fn set_fpr_bits(&mut self, index: usize, bits: u64) {
        self.regs.fpr[index] = f64::from_bits(bits);
    }

    /// Read a VR
    #[inline]
    pub fn vr(&self, index: usize) -> VmxRegister {
        self.regs.vr[index]
    }

    /// Write a VR
    #[inline]
    pub fn set_vr(&mut self, index: usize, value: VmxRegister) {
        self.regs.vr[index] = value;
    }

    /// Start the thread
    pub fn start(&mut self) {
        self.state = PpuThreadState::Running;
    }

    /// Stop the thread
    pub fn stop(&mut self) {
        self.state = PpuThreadState::Stopped;
    }

    /// Mark the thread as exited with the given status
    pub fn exit(&mut self, code: i32) {
        self.exit_code = Some(code);
        self.state = PpuThreadState::Exited;
    }

    /// Check if thread is running
    pub fn is_running(&self) -> bool {
        self.state == PpuThreadState::Running
    }

    /// Get CR field value (0-7)
    #[inline]
    pub fn get_cr_field(&self, field: usize) -> u32 {
        (self.regs.cr >> (28 - field * 4)) & 0xF
    }

    /// Set CR field value (0-7)
    #[inline]
    pub fn set_cr_field(&mut self, field: usize, value: u32) {
        let shift = 28 - field * 4;
        self.regs.cr = (self.regs.cr & !(0xF << shift)) | ((value & 0xF) << shift);
    }

    /// Get a single CR bit (0 is the most significant)
    #[inline]
    pub fn cr_bit(&self, bit: u32) -> bool {
        (self.regs.cr >> (31 - (bit & 31))) & 1 != 0
    }

    #[inline]
    pub fn set_cr_bit(&mut self, bit: u32, value: bool) {
        let mask = 1u32 << (31 - (bit & 31));
        if value {
            self.regs.cr |= mask;
        } else {
            self.regs.cr &= !mask;
        }
    }

    /// Record form of a fixed-point result: CR0 from the signed value plus XER.SO
    #[inline]
    pub fn update_cr0(&mut self, value: u64) {
        let value = value as i64;
        let c = if value < 0 {
            CR_LT
        } else if value > 0 {
            CR_GT
        } else {
            CR_EQ
        };
        let so = if self.get_xer_so() { CR_SO } else { 0 };
        self.set_cr_field(0, c | so);
    }

    /// Record form of a floating-point result: CR1 mirrors FPSCR[FX, FEX, VX, OX]
    #[inline]
    pub fn update_cr1(&mut self) {
        self.set_cr_field(1, self.regs.fpscr >> 28);
    }

    #[inline]
    fn set_xer_bit(&mut self, bit: u64, value: bool) {
        if value {
            self.regs.xer |= bit;
        } else {
            self.regs.xer &= !bit;
        }
    }

    /// Get XER CA (Carry) bit
    #[inline]
    pub fn get_xer_ca(&self) -> bool {
        self.regs.xer & XER_CA != 0
    }

    /// Set XER CA (Carry) bit
    #[inline]
    pub fn set_xer_ca(&mut self, value: bool) {
        self.set_xer_bit(XER_CA, value);
    }

    /// Get XER OV (Overflow) bit
    #[inline]
    pub fn get_xer_ov(&self) -> bool {
        self.regs.xer & XER_OV != 0
    }

    /// Set XER OV, raising the sticky SO bit along with it
    #[inline]
    pub fn set_xer_ov(&mut self, value: bool) {
        self.set_xer_bit(XER_OV, value);
        if value {
            self.set_xer_bit(XER_SO, true);
        }
    }

    /// Get XER SO (Summary Overflow) bit
    #[inline]
    pub fn get_xer_so(&self) -> bool {
        self.regs.xer & XER_SO != 0
    }

    /// Set XER SO (Summary Overflow) bit
    #[inline]
    pub fn set_xer_so(&mut self, value: bool) {
        self.set_xer_bit(XER_SO, value);
    }

    /// String instruction byte count
    #[inline]
    pub fn xer_byte_count(&self) -> u32 {
        (self.regs.xer & XER_BC) as u32
    }

    #[inline]
    pub fn fpscr(&self) -> Fpscr {
        Fpscr::from_bits_retain(self.regs.fpscr)
    }

    /// Replace FPSCR and recompute its summary bits
    pub fn set_fpscr(&mut self, value: u32) {
        self.regs.fpscr = value;
        self.refresh_fp_summary();
    }

    /// Raise sticky exception bits; FX is set when any of them was clear
    pub fn set_fp_exception(&mut self, flags: Fpscr) {
        let current = self.fpscr();
        if !current.contains(flags) {
            self.regs.fpscr |= Fpscr::FX.bits();
        }
        self.regs.fpscr |= flags.bits();
        self.refresh_fp_summary();
    }

    /// Set or clear a non-sticky status bit such as FI or FR
    #[inline]
    pub fn set_fpscr_flag(&mut self, flag: Fpscr, value: bool) {
        if value {
            self.regs.fpscr |= flag.bits();
        } else {
            self.regs.fpscr &= !flag.bits();
        }
    }

    /// Store a result class into FPRF
    #[inline]
    pub fn set_fprf(&mut self, class: u32) {
        self.regs.fpscr = (self.regs.fpscr & !Fpscr::FPRF.bits()) | ((class & 0x1F) << 12);
    }

    /// Current FPRF class
    #[inline]
    pub fn fprf(&self) -> u32 {
        (self.regs.fpscr >> 12) & 0x1F
    }

    /// Store a comparison result into FPCC, leaving the class bit alone
    #[inline]
    pub fn set_fpcc(&mut self, cc: u32) {
        self.regs.fpscr = (self.regs.fpscr & !Fpscr::FPCC.bits()) | ((cc & 0xF) << 12);
    }

    #[inline]
    pub fn rounding_mode(&self) -> RoundingMode {
        RoundingMode::from_bits(self.regs.fpscr)
    }

    /// Recompute VX and FEX from the individual exception and enable bits
    pub fn refresh_fp_summary(&mut self) {
        let mut fpscr = self.fpscr();
        fpscr.set(Fpscr::VX, fpscr.intersects(Fpscr::INVALID));

        let enabled = (fpscr.contains(Fpscr::VX) && fpscr.contains(Fpscr::VE))
            || (fpscr.contains(Fpscr::OX) && fpscr.contains(Fpscr::OE))
            || (fpscr.contains(Fpscr::UX) && fpscr.contains(Fpscr::UE))
            || (fpscr.contains(Fpscr::ZX) && fpscr.contains(Fpscr::ZE))
            || (fpscr.contains(Fpscr::XX) && fpscr.contains(Fpscr::XE));
        fpscr.set(Fpscr::FEX, enabled);
        self.regs.fpscr = fpscr.bits();
    }

    #[inline]
    pub fn vscr(&self) -> Vscr {
        Vscr::from_bits_retain(self.regs.vscr)
    }

    /// Raise the sticky VSCR saturation bit
    #[inline]
    pub fn set_vscr_sat(&mut self) {
        self.regs.vscr |= Vscr::SAT.bits();
    }

    #[inline]
    pub fn non_java_mode(&self) -> bool {
        self.vscr().contains(Vscr::NJ)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ppu_thread_creation() {
        let thread = PpuThread::new(0);

        assert_eq!(thread.id, 0);
        assert_eq!(thread.state, PpuThreadState::Stopped);
        assert_eq!(thread.pc(), 0);
        assert!(!thread.reservation.is_active());
    }

    #[test]
    fn test_gpr_zero_is_a_real_register() {
        let mut thread = PpuThread::new(0);
        thread.set_gpr(0, 0xDEADBEEF);
        assert_eq!(thread.gpr(0), 0xDEADBEEF);
    }

    #[test]
    fn test_pc_operations() {
        let mut thread = PpuThread::new(0);

        thread.set_pc(0x10000);
        assert_eq!(thread.pc(), 0x10000);
        assert_eq!(thread.regs.nia, 0x10004);

        thread.branch_to(0x20000);
        assert_eq!(thread.pc(), 0x10000);
        assert_eq!(thread.regs.nia, 0x20000);
    }

    #[test]
    fn test_cr_fields() {
        let mut thread = PpuThread::new(0);

        thread.set_cr_field(0, 0b1010);
        assert_eq!(thread.get_cr_field(0), 0b1010);

        thread.set_cr_field(7, 0b0101);
        assert_eq!(thread.get_cr_field(7), 0b0101);
        assert_eq!(thread.regs.cr, 0xA000_0005);

        assert!(thread.cr_bit(0));
        assert!(!thread.cr_bit(1));
        assert!(thread.cr_bit(31));
        thread.set_cr_bit(1, true);
        assert_eq!(thread.get_cr_field(0), 0b1110);
    }

    #[test]
    fn test_cr0_carries_summary_overflow() {
        let mut thread = PpuThread::new(0);
        thread.update_cr0(0u64.wrapping_sub(5));
        assert_eq!(thread.get_cr_field(0), CR_LT);

        thread.set_xer_ov(true);
        assert!(thread.get_xer_so());
        thread.update_cr0(0);
        assert_eq!(thread.get_cr_field(0), CR_EQ | CR_SO);

        // OV clears but SO stays sticky
        thread.set_xer_ov(false);
        assert!(!thread.get_xer_ov());
        assert!(thread.get_xer_so());
    }

    #[test]
    fn test_fp_exception_sets_fx_once() {
        let mut thread = PpuThread::new(0);
        thread.set_fp_exception(Fpscr::VXZDZ);
        let fpscr = thread.fpscr();
        assert!(fpscr.contains(Fpscr::FX | Fpscr::VX | Fpscr::VXZDZ));
        assert!(!fpscr.contains(Fpscr::FEX));

        // Software clears FX; re-raising an already set bit leaves it clear
        thread.set_fpscr(thread.regs.fpscr & !Fpscr::FX.bits());
        thread.set_fp_exception(Fpscr::VXZDZ);
        assert!(!thread.fpscr().contains(Fpscr::FX));
    }

    #[test]
    fn test_enabled_exception_sets_fex() {
        let mut thread = PpuThread::new(0);
        thread.set_fpscr(Fpscr::ZE.bits());
        thread.set_fp_exception(Fpscr::ZX);
        assert!(thread.fpscr().contains(Fpscr::FEX));
    }

    #[test]
    fn test_fprf_and_cr1() {
        let mut thread = PpuThread::new(0);
        thread.set_fprf(FPRF_QNAN);
        assert_eq!(thread.fprf(), FPRF_QNAN);
        assert_eq!(thread.regs.fpscr, 0x0001_1000);

        thread.set_fp_exception(Fpscr::OX);
        thread.update_cr1();
        assert_eq!(thread.get_cr_field(1), 0b1001);
    }

    #[test]
    fn test_rounding_mode() {
        let mut thread = PpuThread::new(0);
        assert_eq!(thread.rounding_mode(), RoundingMode::Nearest);
        thread.set_fpscr(3);
        assert_eq!(thread.rounding_mode(), RoundingMode::TowardNegative);
    }
}
