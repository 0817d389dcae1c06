//! Small guest programs run end to end through the interpreter
//!
//! Programs carry their initial and expected GPR values in a tiny
//! self-describing image format.

use std::sync::Arc;

use ce_core::error::PpuError;
use ce_memory::{MemoryManager, PageFlags};
use ce_ppu::{PpuInterpreter, PpuThread};

/// Test image format
///
/// ```text
/// Offset | Size | Description
/// -------|------|------------
/// 0x0000 | 4    | Magic number: "PPUT" (0x50505554)
/// 0x0004 | 4    | Version: 1
/// 0x0008 | 4    | Entry point address
/// 0x000C | 4    | Code size
/// 0x0010 | 4    | Initial register count
/// 0x0014 | 4    | Expected register count
/// 0x0018 | ...  | Initial register values (reg_num:u8, value:u64) * count
/// ...    | ...  | Code bytes
/// ...    | ...  | Expected register values (reg_num:u8, value:u64) * count
/// ```
const TEST_ROM_MAGIC: u32 = 0x50505554;
const TEST_ROM_VERSION: u32 = 1;

const IMAGE_BASE: u32 = 0x2000_0000;
const DATA_BASE: u32 = 0x2000_8000;

#[derive(Debug, Clone)]
struct TestRom {
    entry_point: u32,
    code: Vec<u8>,
    initial_regs: Vec<(u8, u64)>,
    expected_regs: Vec<(u8, u64)>,
}

fn be32(data: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
}

fn read_regs(data: &[u8], offset: &mut usize, count: usize) -> Result<Vec<(u8, u64)>, String> {
    let mut regs = Vec::with_capacity(count);
    for _ in 0..count {
        let Some(entry) = data.get(*offset..*offset + 9) else {
            return Err("unexpected end of image (registers)".to_string());
        };
        let mut value = [0u8; 8];
        value.copy_from_slice(&entry[1..]);
        regs.push((entry[0], u64::from_be_bytes(value)));
        *offset += 9;
    }
    Ok(regs)
}

impl TestRom {
    fn new(code: &[u32], initial_regs: &[(u8, u64)], expected_regs: &[(u8, u64)]) -> Self {
        Self {
            entry_point: IMAGE_BASE,
            code: code.iter().flat_map(|w| w.to_be_bytes()).collect(),
            initial_regs: initial_regs.to_vec(),
            expected_regs: expected_regs.to_vec(),
        }
    }

    fn from_bytes(data: &[u8]) -> Result<Self, String> {
        if data.len() < 0x18 {
            return Err("test image too small".to_string());
        }
        let magic = be32(data, 0);
        if magic != TEST_ROM_MAGIC {
            return Err(format!("invalid magic: 0x{:08X}", magic));
        }
        let version = be32(data, 4);
        if version != TEST_ROM_VERSION {
            return Err(format!("unsupported version: {}", version));
        }

        let entry_point = be32(data, 8);
        let code_size = be32(data, 12) as usize;
        let initial_count = be32(data, 16) as usize;
        let expected_count = be32(data, 20) as usize;

        let mut offset = 0x18;
        let initial_regs = read_regs(data, &mut offset, initial_count)?;
        let code = data
            .get(offset..offset + code_size)
            .ok_or_else(|| "unexpected end of image (code)".to_string())?
            .to_vec();
        offset += code_size;
        let expected_regs = read_regs(data, &mut offset, expected_count)?;

        Ok(Self { entry_point, code, initial_regs, expected_regs })
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut rom = Vec::new();
        rom.extend_from_slice(&TEST_ROM_MAGIC.to_be_bytes());
        rom.extend_from_slice(&TEST_ROM_VERSION.to_be_bytes());
        rom.extend_from_slice(&self.entry_point.to_be_bytes());
        rom.extend_from_slice(&(self.code.len() as u32).to_be_bytes());
        rom.extend_from_slice(&(self.initial_regs.len() as u32).to_be_bytes());
        rom.extend_from_slice(&(self.expected_regs.len() as u32).to_be_bytes());
        for (reg, value) in &self.initial_regs {
            rom.push(*reg);
            rom.extend_from_slice(&value.to_be_bytes());
        }
        rom.extend_from_slice(&self.code);
        for (reg, value) in &self.expected_regs {
            rom.push(*reg);
            rom.extend_from_slice(&value.to_be_bytes());
        }
        rom
    }

    /// Run until the PC leaves the code block, then check the expected GPRs
    fn execute(&self) -> Result<PpuThread, String> {
        let memory = MemoryManager::with_regions(&[(IMAGE_BASE, 0x1_0000, PageFlags::RWX)])
            .map_err(|e| format!("failed to create memory: {}", e))?;
        let interpreter = PpuInterpreter::new(Arc::clone(&memory));
        let mut thread = PpuThread::new(0);

        for (reg, value) in &self.initial_regs {
            thread.set_gpr(*reg as usize, *value);
        }
        memory
            .write_bytes(self.entry_point, &self.code)
            .map_err(|e| format!("failed to write code: {}", e))?;
        thread.set_pc(self.entry_point as u64);

        let code_end = self.entry_point as u64 + self.code.len() as u64;
        for step in 0..10_000 {
            let pc = thread.pc();
            if pc < self.entry_point as u64 || pc >= code_end {
                break;
            }
            interpreter
                .step(&mut thread)
                .map_err(|e| format!("execution failed at PC=0x{:08X} (step {}): {}", pc, step, e))?;
        }

        for (reg, expected) in &self.expected_regs {
            let actual = thread.gpr(*reg as usize);
            if actual != *expected {
                return Err(format!("r{} mismatch: expected 0x{:016X}, got 0x{:016X}", reg, expected, actual));
            }
        }
        Ok(thread)
    }
}

#[test]
fn test_rom_format() {
    let rom = TestRom::new(&[0x3860_002A], &[(4, 7)], &[(3, 42)]);
    let parsed = TestRom::from_bytes(&rom.to_bytes()).unwrap();
    assert_eq!(parsed.entry_point, IMAGE_BASE);
    assert_eq!(parsed.code, vec![0x38, 0x60, 0x00, 0x2A]);
    assert_eq!(parsed.initial_regs, vec![(4, 7)]);
    assert_eq!(parsed.expected_regs, vec![(3, 42)]);

    assert!(TestRom::from_bytes(&[0u8; 8]).is_err());
    let mut truncated = rom.to_bytes();
    truncated.truncate(0x18 + 4);
    assert!(TestRom::from_bytes(&truncated).is_err());
}

#[test]
fn test_add_with_registers() {
    TestRom::new(
        &[
            0x3880_000A, // addi r4, r0, 10
            0x38A0_0014, // addi r5, r0, 20
            0x7C64_2A14, // add r3, r4, r5
        ],
        &[],
        &[(3, 30), (4, 10), (5, 20)],
    )
    .execute()
    .unwrap();
}

#[test]
fn test_counted_loop() {
    // Sum 1..=10 with bdnz
    TestRom::new(
        &[
            0x3860_0000, // li r3, 0
            0x3880_000A, // li r4, 10
            0x7C89_03A6, // mtctr r4
            0x7C63_2214, // loop: add r3, r3, r4
            0x3884_FFFF, // addi r4, r4, -1
            0x4200_FFF8, // bdnz loop
        ],
        &[],
        &[(3, 55), (4, 0)],
    )
    .execute()
    .unwrap();
}

#[test]
fn test_call_and_return() {
    let thread = TestRom::new(
        &[
            0x4800_000D, // bl func
            0x3880_0001, // li r4, 1
            0x4800_000C, // b end
            0x3860_002A, // func: li r3, 42
            0x4E80_0020, // blr
            0x6000_0000, // end: nop
        ],
        &[],
        &[(3, 42), (4, 1)],
    )
    .execute()
    .unwrap();
    assert_eq!(thread.regs.lr, IMAGE_BASE as u64 + 4);
}

#[test]
fn test_load_store_round_trip() {
    TestRom::new(
        &[
            0x3CA0_2000, // lis r5, 0x2000
            0x60A5_8000, // ori r5, r5, 0x8000
            0x3880_1234, // li r4, 0x1234
            0x9085_0000, // stw r4, 0(r5)
            0x8065_0000, // lwz r3, 0(r5)
            0xA0C5_0002, // lhz r6, 2(r5)
        ],
        &[],
        &[(3, 0x1234), (5, DATA_BASE as u64), (6, 0x1234)],
    )
    .execute()
    .unwrap();
}

#[test]
fn test_compare_and_branch() {
    // r3 = max(r4, r5)
    let code = [
        0x7C04_2800, // cmpw r4, r5
        0x4181_000C, // bgt take_r4
        0x7CA3_2B78, // mr r3, r5
        0x4800_0008, // b end
        0x7C83_2378, // take_r4: mr r3, r4
    ];
    TestRom::new(&code, &[(4, 9), (5, 3)], &[(3, 9)]).execute().unwrap();
    TestRom::new(&code, &[(4, (-9i64) as u64), (5, 3)], &[(3, 3)]).execute().unwrap();
}

#[test]
fn test_atomic_increment_program() {
    let thread = TestRom::new(
        &[
            0x7C80_1828, // loop: lwarx r4, 0, r3
            0x3884_0001, // addi r4, r4, 1
            0x7C80_192D, // stwcx. r4, 0, r3
            0x4082_FFF4, // bne- loop
            0x8065_0000, // lwz r3, 0(r5)
        ],
        &[(3, DATA_BASE as u64), (5, DATA_BASE as u64)],
        &[(3, 1)],
    )
    .execute()
    .unwrap();
    assert_eq!(thread.get_cr_field(0) & 0b0010, 0b0010);
}

#[test]
fn test_float_program() {
    let rom = TestRom::new(
        &[
            0xC825_0000, // lfd f1, 0(r5)
            0xC845_0008, // lfd f2, 8(r5)
            0xFC61_102A, // fadd f3, f1, f2
            0xFC80_181E, // fctiwz f4, f3
            0xD885_0010, // stfd f4, 16(r5)
            0x8065_0014, // lwz r3, 20(r5)
        ],
        &[(5, DATA_BASE as u64)],
        &[],
    );
    let memory = MemoryManager::with_regions(&[(IMAGE_BASE, 0x1_0000, PageFlags::RWX)]).unwrap();
    let interpreter = PpuInterpreter::new(Arc::clone(&memory));
    memory.write_bytes(IMAGE_BASE, &rom.code).unwrap();
    memory.write_be64(DATA_BASE, 2.75f64.to_bits()).unwrap();
    memory.write_be64(DATA_BASE + 8, 4.5f64.to_bits()).unwrap();

    let mut cpu = PpuThread::new(0);
    cpu.set_gpr(5, DATA_BASE as u64);
    cpu.set_pc(IMAGE_BASE as u64);
    cpu.start();
    let steps = interpreter.run(&mut cpu, rom.code.len() as u64 / 4).unwrap();
    assert_eq!(steps, 6);
    assert_eq!(cpu.fpr(3), 7.25);
    assert_eq!(cpu.gpr(3), 7);
}

#[test]
fn test_unknown_opcode_is_skipped() {
    TestRom::new(
        &[
            0x3860_0001, // li r3, 1
            0x0000_0000, // unassigned primary opcode
            0x3863_0001, // addi r3, r3, 1
        ],
        &[],
        &[(3, 2)],
    )
    .execute()
    .unwrap();
}

#[test]
fn test_trap_stops_execution() {
    let err = TestRom::new(
        &[
            0x3860_0005, // li r3, 5
            0x0C83_0005, // tweqi r3, 5
            0x3860_0006, // li r3, 6
        ],
        &[],
        &[],
    )
    .execute()
    .unwrap_err();
    assert!(err.contains("PC=0x20000004"), "{}", err);
}

#[test]
fn test_trap_error_variant() {
    let memory = MemoryManager::with_regions(&[(IMAGE_BASE, 0x1000, PageFlags::RWX)]).unwrap();
    let interpreter = PpuInterpreter::new(Arc::clone(&memory));
    memory.write_be32(IMAGE_BASE, 0x7FE0_0008).unwrap(); // trap
    let mut thread = PpuThread::new(0);
    thread.set_pc(IMAGE_BASE as u64);
    assert_eq!(interpreter.step(&mut thread), Err(PpuError::Trap { addr: IMAGE_BASE as u64 }));
    assert_eq!(thread.pc(), IMAGE_BASE as u64);
}
