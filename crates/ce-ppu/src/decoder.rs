//! PPU instruction decoder
//!
//! [`Instruction`] wraps the raw big-endian word and exposes one accessor per
//! encoding field. [`PpuDecoder::lookup`] maps a word to the handler through
//! a primary table and the extended-opcode tables for opcodes 4, 19, 30, 31,
//! 58, 59, 62 and 63. The tables are built once and shared by every
//! interpreter in the process.

use once_cell::sync::Lazy;

use crate::instructions::{branch, float, integer, load_store, system, vector};
use crate::interpreter::{self, Handler};

/// A 32-bit PPU instruction word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Instruction(pub u32);

impl Instruction {
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    const fn bits(self, shift: u32, width: u32) -> u32 {
        (self.0 >> shift) & ((1 << width) - 1)
    }

    /// Primary opcode (bits 0-5)
    #[inline]
    pub const fn opcd(self) -> u32 {
        self.0 >> 26
    }

    // Register fields

    #[inline]
    pub const fn rd(self) -> usize {
        self.bits(21, 5) as usize
    }

    #[inline]
    pub const fn rs(self) -> usize {
        self.rd()
    }

    #[inline]
    pub const fn ra(self) -> usize {
        self.bits(16, 5) as usize
    }

    #[inline]
    pub const fn rb(self) -> usize {
        self.bits(11, 5) as usize
    }

    /// Fourth register field of A/VA forms (FRC, VC)
    #[inline]
    pub const fn rc_reg(self) -> usize {
        self.bits(6, 5) as usize
    }

    // Immediates

    /// Sign-extended 16-bit immediate
    #[inline]
    pub const fn simm(self) -> i64 {
        self.0 as u16 as i16 as i64
    }

    /// Zero-extended 16-bit immediate
    #[inline]
    pub const fn uimm(self) -> u64 {
        (self.0 & 0xFFFF) as u64
    }

    /// DS-form displacement (low two bits are part of the opcode)
    #[inline]
    pub const fn ds(self) -> i64 {
        (self.0 & 0xFFFC) as u16 as i16 as i64
    }

    /// I-form branch displacement
    #[inline]
    pub const fn li(self) -> i64 {
        (((self.0 & 0x03FF_FFFC) << 6) as i32 >> 6) as i64
    }

    /// B-form branch displacement
    #[inline]
    pub const fn bd(self) -> i64 {
        self.ds()
    }

    // Flags

    #[inline]
    pub const fn aa(self) -> bool {
        self.bits(1, 1) != 0
    }

    #[inline]
    pub const fn lk(self) -> bool {
        self.0 & 1 != 0
    }

    /// Record bit
    #[inline]
    pub const fn rc(self) -> bool {
        self.0 & 1 != 0
    }

    /// Overflow-enable bit of XO forms
    #[inline]
    pub const fn oe(self) -> bool {
        self.bits(10, 1) != 0
    }

    /// Record bit of the vector compare forms
    #[inline]
    pub const fn vrc(self) -> bool {
        self.bits(10, 1) != 0
    }

    /// L bit of the compare instructions (64-bit compare)
    #[inline]
    pub const fn l(self) -> bool {
        self.bits(21, 1) != 0
    }

    /// Single-field selector of mfocrf/mtocrf
    #[inline]
    pub const fn one_field(self) -> bool {
        self.bits(20, 1) != 0
    }

    // Condition register / branch fields

    #[inline]
    pub const fn bo(self) -> u32 {
        self.bits(21, 5)
    }

    #[inline]
    pub const fn bi(self) -> u32 {
        self.bits(16, 5)
    }

    #[inline]
    pub const fn crbd(self) -> u32 {
        self.bits(21, 5)
    }

    #[inline]
    pub const fn crba(self) -> u32 {
        self.bits(16, 5)
    }

    #[inline]
    pub const fn crbb(self) -> u32 {
        self.bits(11, 5)
    }

    #[inline]
    pub const fn crfd(self) -> usize {
        self.bits(23, 3) as usize
    }

    #[inline]
    pub const fn crfs(self) -> usize {
        self.bits(18, 3) as usize
    }

    /// Trap condition bits
    #[inline]
    pub const fn to(self) -> u32 {
        self.bits(21, 5)
    }

    /// CR field mask of mtcrf
    #[inline]
    pub const fn crm(self) -> u32 {
        self.bits(12, 8)
    }

    /// FPSCR field mask of mtfsf
    #[inline]
    pub const fn fm(self) -> u32 {
        self.bits(17, 8)
    }

    /// Immediate of mtfsfi
    #[inline]
    pub const fn fp_imm(self) -> u32 {
        self.bits(12, 4)
    }

    /// Special purpose register number (the two 5-bit halves are swapped in the encoding)
    #[inline]
    pub const fn spr(self) -> u32 {
        let raw = self.bits(11, 10);
        ((raw & 0x1F) << 5) | (raw >> 5)
    }

    /// System call level
    #[inline]
    pub const fn lev(self) -> u32 {
        self.bits(5, 7)
    }

    // Rotate fields

    #[inline]
    pub const fn sh32(self) -> u32 {
        self.bits(11, 5)
    }

    #[inline]
    pub const fn mb32(self) -> u32 {
        self.bits(6, 5)
    }

    #[inline]
    pub const fn me32(self) -> u32 {
        self.bits(1, 5)
    }

    /// 6-bit shift of MD/XS forms
    #[inline]
    pub const fn sh64(self) -> u32 {
        self.bits(11, 5) | (self.bits(1, 1) << 5)
    }

    /// 6-bit mask begin/end of MD/MDS forms
    #[inline]
    pub const fn mb64(self) -> u32 {
        self.bits(6, 5) | (self.bits(5, 1) << 5)
    }

    // Vector fields

    #[inline]
    pub const fn vuimm(self) -> u32 {
        self.bits(16, 5)
    }

    /// Sign-extended 5-bit immediate of the vector splat forms
    #[inline]
    pub const fn vsimm(self) -> i32 {
        ((self.bits(16, 5) << 27) as i32) >> 27
    }

    /// Byte shift of vsldoi
    #[inline]
    pub const fn vsh(self) -> u32 {
        self.bits(6, 4)
    }

    // Extended opcodes

    #[inline]
    pub const fn xo_va(self) -> usize {
        self.bits(0, 6) as usize
    }

    #[inline]
    pub const fn xo_vx(self) -> usize {
        self.bits(0, 11) as usize
    }

    #[inline]
    pub const fn xo_x(self) -> usize {
        self.bits(1, 10) as usize
    }

    #[inline]
    pub const fn xo_a(self) -> usize {
        self.bits(1, 5) as usize
    }

    #[inline]
    pub const fn xo_md(self) -> usize {
        self.bits(1, 4) as usize
    }

    #[inline]
    pub const fn xo_ds(self) -> usize {
        self.bits(0, 2) as usize
    }
}

/// Decode table entry
#[derive(Clone, Copy)]
pub struct Entry {
    pub name: &'static str,
    pub handler: Handler,
}

impl Entry {
    const UNKNOWN: Entry = Entry { name: "unknown", handler: interpreter::unknown };

    const fn new(name: &'static str, handler: Handler) -> Self {
        Self { name, handler }
    }
}

impl std::fmt::Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entry").field("name", &self.name).finish()
    }
}

struct DecodeTables {
    primary: Vec<Entry>,
    table4_va: Vec<Option<Entry>>,
    table4: Vec<Entry>,
    table19: Vec<Entry>,
    table30: Vec<Entry>,
    table31: Vec<Entry>,
    table58: Vec<Entry>,
    table59: Vec<Entry>,
    table62: Vec<Entry>,
    table63_a: Vec<Option<Entry>>,
    table63: Vec<Entry>,
}

static TABLES: Lazy<DecodeTables> = Lazy::new(DecodeTables::build);

impl DecodeTables {
    fn empty() -> Self {
        Self {
            primary: vec![Entry::UNKNOWN; 64],
            table4_va: vec![None; 64],
            table4: vec![Entry::UNKNOWN; 2048],
            table19: vec![Entry::UNKNOWN; 1024],
            table30: vec![Entry::UNKNOWN; 16],
            table31: vec![Entry::UNKNOWN; 1024],
            table58: vec![Entry::UNKNOWN; 4],
            table59: vec![Entry::UNKNOWN; 32],
            table62: vec![Entry::UNKNOWN; 4],
            table63_a: vec![None; 32],
            table63: vec![Entry::UNKNOWN; 1024],
        }
    }

    fn op(&mut self, opcd: usize, name: &'static str, handler: Handler) {
        self.primary[opcd] = Entry::new(name, handler);
    }

    fn va(&mut self, xo: usize, name: &'static str, handler: Handler) {
        self.table4_va[xo] = Some(Entry::new(name, handler));
    }

    fn vx(&mut self, xo: usize, name: &'static str, handler: Handler) {
        self.table4[xo] = Entry::new(name, handler);
    }

    /// Vector compare: the record form sets bit 21 of the extended opcode
    fn vc(&mut self, xo: usize, name: &'static str, handler: Handler) {
        self.table4[xo] = Entry::new(name, handler);
        self.table4[xo | 0x400] = Entry::new(name, handler);
    }

    fn x19(&mut self, xo: usize, name: &'static str, handler: Handler) {
        self.table19[xo] = Entry::new(name, handler);
    }

    /// MD forms occupy two slots (the low bit is part of the shift)
    fn md(&mut self, xo: usize, name: &'static str, handler: Handler) {
        self.table30[xo << 1] = Entry::new(name, handler);
        self.table30[(xo << 1) | 1] = Entry::new(name, handler);
    }

    fn mds(&mut self, xo: usize, name: &'static str, handler: Handler) {
        self.table30[xo] = Entry::new(name, handler);
    }

    fn x31(&mut self, xo: usize, name: &'static str, handler: Handler) {
        self.table31[xo] = Entry::new(name, handler);
    }

    /// XO forms: OE is bit 21 of the 10-bit field
    fn xo31(&mut self, xo: usize, name: &'static str, handler: Handler) {
        self.table31[xo] = Entry::new(name, handler);
        self.table31[xo | 0x200] = Entry::new(name, handler);
    }

    fn a59(&mut self, xo: usize, name: &'static str, handler: Handler) {
        self.table59[xo] = Entry::new(name, handler);
    }

    fn a63(&mut self, xo: usize, name: &'static str, handler: Handler) {
        self.table63_a[xo] = Some(Entry::new(name, handler));
    }

    fn x63(&mut self, xo: usize, name: &'static str, handler: Handler) {
        self.table63[xo] = Entry::new(name, handler);
    }

    fn build() -> Self {
        let mut t = Self::empty();

        // Primary opcodes
        t.op(2, "tdi", integer::tdi);
        t.op(3, "twi", integer::twi);
        t.op(7, "mulli", integer::mulli);
        t.op(8, "subfic", integer::subfic);
        t.op(10, "cmpli", integer::cmpli);
        t.op(11, "cmpi", integer::cmpi);
        t.op(12, "addic", integer::addic);
        t.op(13, "addic.", integer::addic_);
        t.op(14, "addi", integer::addi);
        t.op(15, "addis", integer::addis);
        t.op(16, "bc", branch::bc);
        t.op(17, "sc", branch::sc);
        t.op(18, "b", branch::b);
        t.op(20, "rlwimi", integer::rlwimi);
        t.op(21, "rlwinm", integer::rlwinm);
        t.op(23, "rlwnm", integer::rlwnm);
        t.op(24, "ori", integer::ori);
        t.op(25, "oris", integer::oris);
        t.op(26, "xori", integer::xori);
        t.op(27, "xoris", integer::xoris);
        t.op(28, "andi.", integer::andi_);
        t.op(29, "andis.", integer::andis_);
        t.op(32, "lwz", load_store::lwz);
        t.op(33, "lwzu", load_store::lwzu);
        t.op(34, "lbz", load_store::lbz);
        t.op(35, "lbzu", load_store::lbzu);
        t.op(36, "stw", load_store::stw);
        t.op(37, "stwu", load_store::stwu);
        t.op(38, "stb", load_store::stb);
        t.op(39, "stbu", load_store::stbu);
        t.op(40, "lhz", load_store::lhz);
        t.op(41, "lhzu", load_store::lhzu);
        t.op(42, "lha", load_store::lha);
        t.op(43, "lhau", load_store::lhau);
        t.op(44, "sth", load_store::sth);
        t.op(45, "sthu", load_store::sthu);
        t.op(46, "lmw", load_store::lmw);
        t.op(47, "stmw", load_store::stmw);
        t.op(48, "lfs", load_store::lfs);
        t.op(49, "lfsu", load_store::lfsu);
        t.op(50, "lfd", load_store::lfd);
        t.op(51, "lfdu", load_store::lfdu);
        t.op(52, "stfs", load_store::stfs);
        t.op(53, "stfsu", load_store::stfsu);
        t.op(54, "stfd", load_store::stfd);
        t.op(55, "stfdu", load_store::stfdu);

        // Opcode 4: VA forms
        t.va(32, "vmhaddshs", vector::vmhaddshs);
        t.va(33, "vmhraddshs", vector::vmhraddshs);
        t.va(34, "vmladduhm", vector::vmladduhm);
        t.va(36, "vmsumubm", vector::vmsumubm);
        t.va(37, "vmsummbm", vector::vmsummbm);
        t.va(38, "vmsumuhm", vector::vmsumuhm);
        t.va(39, "vmsumuhs", vector::vmsumuhs);
        t.va(40, "vmsumshm", vector::vmsumshm);
        t.va(41, "vmsumshs", vector::vmsumshs);
        t.va(42, "vsel", vector::vsel);
        t.va(43, "vperm", vector::vperm);
        t.va(44, "vsldoi", vector::vsldoi);
        t.va(46, "vmaddfp", vector::vmaddfp);
        t.va(47, "vnmsubfp", vector::vnmsubfp);

        // Opcode 4: VX forms
        t.vx(0, "vaddubm", vector::vaddubm);
        t.vx(2, "vmaxub", vector::vmaxub);
        t.vx(4, "vrlb", vector::vrlb);
        t.vx(8, "vmuloub", vector::vmuloub);
        t.vx(10, "vaddfp", vector::vaddfp);
        t.vx(12, "vmrghb", vector::vmrghb);
        t.vx(14, "vpkuhum", vector::vpkuhum);
        t.vx(64, "vadduhm", vector::vadduhm);
        t.vx(66, "vmaxuh", vector::vmaxuh);
        t.vx(68, "vrlh", vector::vrlh);
        t.vx(72, "vmulouh", vector::vmulouh);
        t.vx(74, "vsubfp", vector::vsubfp);
        t.vx(76, "vmrghh", vector::vmrghh);
        t.vx(78, "vpkuwum", vector::vpkuwum);
        t.vx(128, "vadduwm", vector::vadduwm);
        t.vx(130, "vmaxuw", vector::vmaxuw);
        t.vx(132, "vrlw", vector::vrlw);
        t.vx(140, "vmrghw", vector::vmrghw);
        t.vx(142, "vpkuhus", vector::vpkuhus);
        t.vx(206, "vpkuwus", vector::vpkuwus);
        t.vx(258, "vmaxsb", vector::vmaxsb);
        t.vx(260, "vslb", vector::vslb);
        t.vx(264, "vmulosb", vector::vmulosb);
        t.vx(266, "vrefp", vector::vrefp);
        t.vx(268, "vmrglb", vector::vmrglb);
        t.vx(270, "vpkshus", vector::vpkshus);
        t.vx(322, "vmaxsh", vector::vmaxsh);
        t.vx(324, "vslh", vector::vslh);
        t.vx(328, "vmulosh", vector::vmulosh);
        t.vx(330, "vrsqrtefp", vector::vrsqrtefp);
        t.vx(332, "vmrglh", vector::vmrglh);
        t.vx(334, "vpkswus", vector::vpkswus);
        t.vx(384, "vaddcuw", vector::vaddcuw);
        t.vx(386, "vmaxsw", vector::vmaxsw);
        t.vx(388, "vslw", vector::vslw);
        t.vx(394, "vexptefp", vector::vexptefp);
        t.vx(396, "vmrglw", vector::vmrglw);
        t.vx(398, "vpkshss", vector::vpkshss);
        t.vx(452, "vsl", vector::vsl);
        t.vx(458, "vlogefp", vector::vlogefp);
        t.vx(462, "vpkswss", vector::vpkswss);
        t.vx(512, "vaddubs", vector::vaddubs);
        t.vx(514, "vminub", vector::vminub);
        t.vx(516, "vsrb", vector::vsrb);
        t.vx(520, "vmuleub", vector::vmuleub);
        t.vx(522, "vrfin", vector::vrfin);
        t.vx(524, "vspltb", vector::vspltb);
        t.vx(526, "vupkhsb", vector::vupkhsb);
        t.vx(576, "vadduhs", vector::vadduhs);
        t.vx(578, "vminuh", vector::vminuh);
        t.vx(580, "vsrh", vector::vsrh);
        t.vx(584, "vmuleuh", vector::vmuleuh);
        t.vx(586, "vrfiz", vector::vrfiz);
        t.vx(588, "vsplth", vector::vsplth);
        t.vx(590, "vupkhsh", vector::vupkhsh);
        t.vx(640, "vadduws", vector::vadduws);
        t.vx(642, "vminuw", vector::vminuw);
        t.vx(644, "vsrw", vector::vsrw);
        t.vx(650, "vrfip", vector::vrfip);
        t.vx(652, "vspltw", vector::vspltw);
        t.vx(654, "vupklsb", vector::vupklsb);
        t.vx(708, "vsr", vector::vsr);
        t.vx(714, "vrfim", vector::vrfim);
        t.vx(718, "vupklsh", vector::vupklsh);
        t.vx(768, "vaddsbs", vector::vaddsbs);
        t.vx(770, "vminsb", vector::vminsb);
        t.vx(772, "vsrab", vector::vsrab);
        t.vx(776, "vmulesb", vector::vmulesb);
        t.vx(778, "vcfux", vector::vcfux);
        t.vx(780, "vspltisb", vector::vspltisb);
        t.vx(782, "vpkpx", vector::vpkpx);
        t.vx(832, "vaddshs", vector::vaddshs);
        t.vx(834, "vminsh", vector::vminsh);
        t.vx(836, "vsrah", vector::vsrah);
        t.vx(840, "vmulesh", vector::vmulesh);
        t.vx(842, "vcfsx", vector::vcfsx);
        t.vx(844, "vspltish", vector::vspltish);
        t.vx(846, "vupkhpx", vector::vupkhpx);
        t.vx(896, "vaddsws", vector::vaddsws);
        t.vx(898, "vminsw", vector::vminsw);
        t.vx(900, "vsraw", vector::vsraw);
        t.vx(906, "vctuxs", vector::vctuxs);
        t.vx(908, "vspltisw", vector::vspltisw);
        t.vx(970, "vctsxs", vector::vctsxs);
        t.vx(974, "vupklpx", vector::vupklpx);
        t.vx(1024, "vsububm", vector::vsububm);
        t.vx(1026, "vavgub", vector::vavgub);
        t.vx(1028, "vand", vector::vand);
        t.vx(1034, "vmaxfp", vector::vmaxfp);
        t.vx(1036, "vslo", vector::vslo);
        t.vx(1088, "vsubuhm", vector::vsubuhm);
        t.vx(1090, "vavguh", vector::vavguh);
        t.vx(1092, "vandc", vector::vandc);
        t.vx(1098, "vminfp", vector::vminfp);
        t.vx(1100, "vsro", vector::vsro);
        t.vx(1152, "vsubuwm", vector::vsubuwm);
        t.vx(1154, "vavguw", vector::vavguw);
        t.vx(1156, "vor", vector::vor);
        t.vx(1220, "vxor", vector::vxor);
        t.vx(1282, "vavgsb", vector::vavgsb);
        t.vx(1284, "vnor", vector::vnor);
        t.vx(1346, "vavgsh", vector::vavgsh);
        t.vx(1408, "vsubcuw", vector::vsubcuw);
        t.vx(1410, "vavgsw", vector::vavgsw);
        t.vx(1536, "vsububs", vector::vsububs);
        t.vx(1540, "mfvscr", vector::mfvscr);
        t.vx(1544, "vsum4ubs", vector::vsum4ubs);
        t.vx(1600, "vsubuhs", vector::vsubuhs);
        t.vx(1604, "mtvscr", vector::mtvscr);
        t.vx(1608, "vsum4shs", vector::vsum4shs);
        t.vx(1664, "vsubuws", vector::vsubuws);
        t.vx(1672, "vsum2sws", vector::vsum2sws);
        t.vx(1792, "vsubsbs", vector::vsubsbs);
        t.vx(1800, "vsum4sbs", vector::vsum4sbs);
        t.vx(1856, "vsubshs", vector::vsubshs);
        t.vx(1920, "vsubsws", vector::vsubsws);
        t.vx(1928, "vsumsws", vector::vsumsws);

        // Opcode 4: VXR compares
        t.vc(6, "vcmpequb", vector::vcmpequb);
        t.vc(70, "vcmpequh", vector::vcmpequh);
        t.vc(134, "vcmpequw", vector::vcmpequw);
        t.vc(198, "vcmpeqfp", vector::vcmpeqfp);
        t.vc(454, "vcmpgefp", vector::vcmpgefp);
        t.vc(518, "vcmpgtub", vector::vcmpgtub);
        t.vc(582, "vcmpgtuh", vector::vcmpgtuh);
        t.vc(646, "vcmpgtuw", vector::vcmpgtuw);
        t.vc(710, "vcmpgtfp", vector::vcmpgtfp);
        t.vc(774, "vcmpgtsb", vector::vcmpgtsb);
        t.vc(838, "vcmpgtsh", vector::vcmpgtsh);
        t.vc(902, "vcmpgtsw", vector::vcmpgtsw);
        t.vc(966, "vcmpbfp", vector::vcmpbfp);

        // Opcode 19
        t.x19(0, "mcrf", branch::mcrf);
        t.x19(16, "bclr", branch::bclr);
        t.x19(33, "crnor", branch::crnor);
        t.x19(129, "crandc", branch::crandc);
        t.x19(150, "isync", system::isync);
        t.x19(193, "crxor", branch::crxor);
        t.x19(225, "crnand", branch::crnand);
        t.x19(257, "crand", branch::crand);
        t.x19(289, "creqv", branch::creqv);
        t.x19(417, "crorc", branch::crorc);
        t.x19(449, "cror", branch::cror);
        t.x19(528, "bcctr", branch::bcctr);

        // Opcode 30
        t.md(0, "rldicl", integer::rldicl);
        t.md(1, "rldicr", integer::rldicr);
        t.md(2, "rldic", integer::rldic);
        t.md(3, "rldimi", integer::rldimi);
        t.mds(8, "rldcl", integer::rldcl);
        t.mds(9, "rldcr", integer::rldcr);

        // Opcode 31: fixed point
        t.x31(0, "cmp", integer::cmp);
        t.x31(4, "tw", integer::tw);
        t.xo31(8, "subfc", integer::subfc);
        t.x31(9, "mulhdu", integer::mulhdu);
        t.xo31(10, "addc", integer::addc);
        t.x31(11, "mulhwu", integer::mulhwu);
        t.x31(24, "slw", integer::slw);
        t.x31(26, "cntlzw", integer::cntlzw);
        t.x31(27, "sld", integer::sld);
        t.x31(28, "and", integer::and);
        t.x31(32, "cmpl", integer::cmpl);
        t.xo31(40, "subf", integer::subf);
        t.x31(58, "cntlzd", integer::cntlzd);
        t.x31(60, "andc", integer::andc);
        t.x31(68, "td", integer::td);
        t.x31(73, "mulhd", integer::mulhd);
        t.x31(75, "mulhw", integer::mulhw);
        t.xo31(104, "neg", integer::neg);
        t.x31(124, "nor", integer::nor);
        t.xo31(136, "subfe", integer::subfe);
        t.xo31(138, "adde", integer::adde);
        t.xo31(200, "subfze", integer::subfze);
        t.xo31(202, "addze", integer::addze);
        t.xo31(232, "subfme", integer::subfme);
        t.xo31(233, "mulld", integer::mulld);
        t.xo31(234, "addme", integer::addme);
        t.xo31(235, "mullw", integer::mullw);
        t.xo31(266, "add", integer::add);
        t.x31(284, "eqv", integer::eqv);
        t.x31(316, "xor", integer::xor);
        t.x31(412, "orc", integer::orc);
        t.x31(444, "or", integer::or);
        t.xo31(457, "divdu", integer::divdu);
        t.xo31(459, "divwu", integer::divwu);
        t.x31(476, "nand", integer::nand);
        t.xo31(489, "divd", integer::divd);
        t.xo31(491, "divw", integer::divw);
        t.x31(536, "srw", integer::srw);
        t.x31(539, "srd", integer::srd);
        t.x31(792, "sraw", integer::sraw);
        t.x31(794, "srad", integer::srad);
        t.x31(824, "srawi", integer::srawi);
        t.x31(826, "sradi", integer::sradi);
        t.x31(827, "sradi", integer::sradi);
        t.x31(922, "extsh", integer::extsh);
        t.x31(954, "extsb", integer::extsb);
        t.x31(986, "extsw", integer::extsw);

        // Opcode 31: system
        t.x31(19, "mfcr", system::mfcr);
        t.x31(144, "mtcrf", system::mtcrf);
        t.x31(310, "eciwx", system::eciwx);
        t.x31(339, "mfspr", system::mfspr);
        t.x31(371, "mftb", system::mftb);
        t.x31(438, "ecowx", system::ecowx);
        t.x31(467, "mtspr", system::mtspr);
        t.x31(598, "sync", system::sync);
        t.x31(854, "eieio", system::eieio);
        t.x31(54, "dcbst", system::dcbst);
        t.x31(86, "dcbf", system::dcbf);
        t.x31(246, "dcbtst", system::dcbtst);
        t.x31(278, "dcbt", system::dcbt);
        t.x31(342, "dst", system::dst);
        t.x31(374, "dstst", system::dstst);
        t.x31(822, "dss", system::dss);
        t.x31(982, "icbi", system::icbi);
        t.x31(1014, "dcbz", load_store::dcbz);

        // Opcode 31: loads and stores
        t.x31(20, "lwarx", load_store::lwarx);
        t.x31(21, "ldx", load_store::ldx);
        t.x31(23, "lwzx", load_store::lwzx);
        t.x31(53, "ldux", load_store::ldux);
        t.x31(55, "lwzux", load_store::lwzux);
        t.x31(84, "ldarx", load_store::ldarx);
        t.x31(87, "lbzx", load_store::lbzx);
        t.x31(119, "lbzux", load_store::lbzux);
        t.x31(149, "stdx", load_store::stdx);
        t.x31(150, "stwcx.", load_store::stwcx);
        t.x31(151, "stwx", load_store::stwx);
        t.x31(181, "stdux", load_store::stdux);
        t.x31(183, "stwux", load_store::stwux);
        t.x31(214, "stdcx.", load_store::stdcx);
        t.x31(215, "stbx", load_store::stbx);
        t.x31(247, "stbux", load_store::stbux);
        t.x31(279, "lhzx", load_store::lhzx);
        t.x31(311, "lhzux", load_store::lhzux);
        t.x31(341, "lwax", load_store::lwax);
        t.x31(343, "lhax", load_store::lhax);
        t.x31(373, "lwaux", load_store::lwaux);
        t.x31(375, "lhaux", load_store::lhaux);
        t.x31(407, "sthx", load_store::sthx);
        t.x31(439, "sthux", load_store::sthux);
        t.x31(532, "ldbrx", load_store::ldbrx);
        t.x31(533, "lswx", load_store::lswx);
        t.x31(534, "lwbrx", load_store::lwbrx);
        t.x31(535, "lfsx", load_store::lfsx);
        t.x31(567, "lfsux", load_store::lfsux);
        t.x31(597, "lswi", load_store::lswi);
        t.x31(599, "lfdx", load_store::lfdx);
        t.x31(631, "lfdux", load_store::lfdux);
        t.x31(660, "stdbrx", load_store::stdbrx);
        t.x31(661, "stswx", load_store::stswx);
        t.x31(662, "stwbrx", load_store::stwbrx);
        t.x31(663, "stfsx", load_store::stfsx);
        t.x31(695, "stfsux", load_store::stfsux);
        t.x31(725, "stswi", load_store::stswi);
        t.x31(727, "stfdx", load_store::stfdx);
        t.x31(759, "stfdux", load_store::stfdux);
        t.x31(790, "lhbrx", load_store::lhbrx);
        t.x31(918, "sthbrx", load_store::sthbrx);
        t.x31(983, "stfiwx", load_store::stfiwx);

        // Opcode 31: vector loads and stores
        t.x31(6, "lvsl", load_store::lvsl);
        t.x31(7, "lvebx", load_store::lvebx);
        t.x31(38, "lvsr", load_store::lvsr);
        t.x31(39, "lvehx", load_store::lvehx);
        t.x31(71, "lvewx", load_store::lvewx);
        t.x31(103, "lvx", load_store::lvx);
        t.x31(135, "stvebx", load_store::stvebx);
        t.x31(167, "stvehx", load_store::stvehx);
        t.x31(199, "stvewx", load_store::stvewx);
        t.x31(231, "stvx", load_store::stvx);
        t.x31(359, "lvxl", load_store::lvx);
        t.x31(487, "stvxl", load_store::stvx);
        t.x31(519, "lvlx", load_store::lvlx);
        t.x31(551, "lvrx", load_store::lvrx);
        t.x31(647, "stvlx", load_store::stvlx);
        t.x31(679, "stvrx", load_store::stvrx);
        t.x31(775, "lvlxl", load_store::lvlx);
        t.x31(807, "lvrxl", load_store::lvrx);
        t.x31(903, "stvlxl", load_store::stvlx);
        t.x31(935, "stvrxl", load_store::stvrx);

        // Opcodes 58 / 62
        t.table58[0] = Entry::new("ld", load_store::ld);
        t.table58[1] = Entry::new("ldu", load_store::ldu);
        t.table58[2] = Entry::new("lwa", load_store::lwa);
        t.table62[0] = Entry::new("std", load_store::std);
        t.table62[1] = Entry::new("stdu", load_store::stdu);

        // Opcode 59
        t.a59(18, "fdivs", float::fdivs);
        t.a59(20, "fsubs", float::fsubs);
        t.a59(21, "fadds", float::fadds);
        t.a59(22, "fsqrts", float::fsqrts);
        t.a59(24, "fres", float::fres);
        t.a59(25, "fmuls", float::fmuls);
        t.a59(28, "fmsubs", float::fmsubs);
        t.a59(29, "fmadds", float::fmadds);
        t.a59(30, "fnmsubs", float::fnmsubs);
        t.a59(31, "fnmadds", float::fnmadds);

        // Opcode 63: A forms
        t.a63(18, "fdiv", float::fdiv);
        t.a63(20, "fsub", float::fsub);
        t.a63(21, "fadd", float::fadd);
        t.a63(22, "fsqrt", float::fsqrt);
        t.a63(23, "fsel", float::fsel);
        t.a63(25, "fmul", float::fmul);
        t.a63(26, "frsqrte", float::frsqrte);
        t.a63(28, "fmsub", float::fmsub);
        t.a63(29, "fmadd", float::fmadd);
        t.a63(30, "fnmsub", float::fnmsub);
        t.a63(31, "fnmadd", float::fnmadd);

        // Opcode 63: X forms
        t.x63(0, "fcmpu", float::fcmpu);
        t.x63(12, "frsp", float::frsp);
        t.x63(14, "fctiw", float::fctiw);
        t.x63(15, "fctiwz", float::fctiwz);
        t.x63(32, "fcmpo", float::fcmpo);
        t.x63(38, "mtfsb1", system::mtfsb1);
        t.x63(40, "fneg", float::fneg);
        t.x63(64, "mcrfs", system::mcrfs);
        t.x63(70, "mtfsb0", system::mtfsb0);
        t.x63(72, "fmr", float::fmr);
        t.x63(134, "mtfsfi", system::mtfsfi);
        t.x63(136, "fnabs", float::fnabs);
        t.x63(264, "fabs", float::fabs);
        t.x63(583, "mffs", system::mffs);
        t.x63(711, "mtfsf", system::mtfsf);
        t.x63(814, "fctid", float::fctid);
        t.x63(815, "fctidz", float::fctidz);
        t.x63(846, "fcfid", float::fcfid);

        t
    }
}

/// PPU instruction decoder
pub struct PpuDecoder;

impl PpuDecoder {
    /// Select the table entry for an instruction word
    #[inline]
    pub fn lookup(op: Instruction) -> &'static Entry {
        let t = &*TABLES;
        match op.opcd() {
            4 => match &t.table4_va[op.xo_va()] {
                Some(entry) => entry,
                None => &t.table4[op.xo_vx()],
            },
            19 => &t.table19[op.xo_x()],
            30 => &t.table30[op.xo_md()],
            31 => &t.table31[op.xo_x()],
            58 => &t.table58[op.xo_ds()],
            59 => &t.table59[op.xo_a()],
            62 => &t.table62[op.xo_ds()],
            63 => match &t.table63_a[op.xo_a()] {
                Some(entry) => entry,
                None => &t.table63[op.xo_x()],
            },
            opcd => &t.primary[opcd as usize],
        }
    }

    /// Decode a raw word
    #[inline]
    pub fn decode(word: u32) -> (Instruction, &'static Entry) {
        let op = Instruction(word);
        (op, Self::lookup(op))
    }

    /// Mnemonic of a raw word, `"unknown"` for unassigned encodings
    pub fn mnemonic(word: u32) -> &'static str {
        Self::lookup(Instruction(word)).name
    }

    /// Whether the word maps to an implemented instruction
    pub fn is_known(word: u32) -> bool {
        Self::mnemonic(word) != Entry::UNKNOWN.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_addi() {
        // addi r3, r0, 100
        let op = Instruction(0x38600064);
        assert_eq!(op.opcd(), 14);
        assert_eq!(op.rd(), 3);
        assert_eq!(op.ra(), 0);
        assert_eq!(op.simm(), 100);
        assert_eq!(PpuDecoder::mnemonic(op.raw()), "addi");
    }

    #[test]
    fn test_negative_displacement() {
        // lwz r3, -8(r1)
        let op = Instruction(0x8061FFF8);
        assert_eq!(op.rd(), 3);
        assert_eq!(op.ra(), 1);
        assert_eq!(op.simm(), -8);
        assert_eq!(PpuDecoder::mnemonic(op.raw()), "lwz");
    }

    #[test]
    fn test_branch_displacements() {
        // b +0x100
        assert_eq!(Instruction(0x48000100).li(), 0x100);
        // b -4
        assert_eq!(Instruction(0x4BFFFFFC).li(), -4);
        // bne cr0, -8
        let op = Instruction(0x4082FFF8);
        assert_eq!(op.bo(), 4);
        assert_eq!(op.bi(), 2);
        assert_eq!(op.bd(), -8);
    }

    #[test]
    fn test_spr_field_is_swapped() {
        // mflr r0 / mtctr r9 / mfxer r3
        assert_eq!(Instruction(0x7C0802A6).spr(), 8);
        assert_eq!(Instruction(0x7D2903A6).spr(), 9);
        assert_eq!(Instruction(0x7C6102A6).spr(), 1);
    }

    #[test]
    fn test_md_fields() {
        // rldicl r3, r4, 40, 56 (sh and mb both need their split high bits)
        let op = Instruction(0x7883_4622);
        assert_eq!(PpuDecoder::mnemonic(op.raw()), "rldicl");
        assert_eq!(op.sh64(), 40);
        assert_eq!(op.mb64(), 56);
    }

    #[test]
    fn test_extended_tables() {
        assert_eq!(PpuDecoder::mnemonic(0x7C642A14), "add");
        // addo. shares the handler
        assert_eq!(PpuDecoder::mnemonic(0x7C642E15), "add");
        assert_eq!(PpuDecoder::mnemonic(0x4E800020), "bclr");
        assert_eq!(PpuDecoder::mnemonic(0x4E800420), "bcctr");
        assert_eq!(PpuDecoder::mnemonic(0xE8610008), "ld");
        assert_eq!(PpuDecoder::mnemonic(0xF8610009), "stdu");
        assert_eq!(PpuDecoder::mnemonic(0xFC22182A), "fadd");
        assert_eq!(PpuDecoder::mnemonic(0xFC201890), "fmr");
        assert_eq!(PpuDecoder::mnemonic(0xEC22182A), "fadds");
        assert_eq!(PpuDecoder::mnemonic(0x7C00012D), "stwcx.");
        assert_eq!(PpuDecoder::mnemonic(0x7C64D674), "sradi");
        assert_eq!(PpuDecoder::mnemonic(0x7C64D676), "sradi");
    }

    #[test]
    fn test_vector_forms() {
        // vaddubs v1, v2, v3
        assert_eq!(PpuDecoder::mnemonic(0x1022_1A00), "vaddubs");
        // vperm v1, v2, v3, v4
        assert_eq!(PpuDecoder::mnemonic(0x1022_192B), "vperm");
        // vcmpequb. v1, v2, v3
        let op = Instruction(0x1022_1C06);
        assert_eq!(PpuDecoder::mnemonic(op.raw()), "vcmpequb");
        assert!(op.vrc());
        // vspltisb v1, -1
        let op = Instruction(0x103F_030C);
        assert_eq!(PpuDecoder::mnemonic(op.raw()), "vspltisb");
        assert_eq!(op.vsimm(), -1);
    }

    #[test]
    fn test_unknown_encodings() {
        assert!(!PpuDecoder::is_known(0x0000_0000));
        assert!(!PpuDecoder::is_known(0x7C00_0002));
        assert!(!PpuDecoder::is_known(0xFC00_0004));
        assert!(PpuDecoder::is_known(0x6000_0000));
    }
}
