//! PPU interpreter implementation

use std::sync::Arc;
use std::time::Instant;

use ce_core::config::PpuConfig;
use ce_core::error::PpuError;
use ce_core::{ppu_trace, ppu_warn};
use ce_memory::MemoryManager;

use crate::decoder::{Instruction, PpuDecoder};
use crate::syscall::SyscallDispatcher;
use crate::thread::PpuThread;

/// Instruction handler signature shared by every decode table entry
pub type Handler = fn(&PpuInterpreter, &mut PpuThread, Instruction) -> Result<(), PpuError>;

/// Receiver for the unimplemented-instruction path
pub trait DiagnosticSink: Send + Sync {
    fn log_unimplemented(&self, mnemonic: &str, pc: u64);
}

/// Default sink: a warning on the `ppu` log target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn log_unimplemented(&self, mnemonic: &str, pc: u64) {
        ppu_warn!("Unimplemented instruction {} at 0x{:08x}", mnemonic, pc);
    }
}

/// PPU interpreter for instruction execution
///
/// One interpreter can drive any number of threads, one at a time per call.
/// Everything it holds is shared and read-only, so separate host threads
/// may each own a clone of the `Arc`s and run their own [`PpuThread`].
pub struct PpuInterpreter {
    /// Memory manager
    memory: Arc<MemoryManager>,
    syscalls: Option<Arc<dyn SyscallDispatcher>>,
    diagnostics: Arc<dyn DiagnosticSink>,
    timebase_origin: Instant,
    timebase_frequency: u64,
    trap_unimplemented: bool,
}

impl PpuInterpreter {
    /// Create a new PPU interpreter
    pub fn new(memory: Arc<MemoryManager>) -> Self {
        let defaults = PpuConfig::default();
        Self {
            memory,
            syscalls: None,
            diagnostics: Arc::new(TracingDiagnostics),
            timebase_origin: Instant::now(),
            timebase_frequency: defaults.timebase_frequency,
            trap_unimplemented: defaults.trap_unimplemented,
        }
    }

    /// Attach the system-call collaborator
    pub fn with_syscalls(mut self, syscalls: Arc<dyn SyscallDispatcher>) -> Self {
        self.syscalls = Some(syscalls);
        self
    }

    /// Replace the diagnostic sink
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn with_config(mut self, config: &PpuConfig) -> Self {
        self.timebase_frequency = config.timebase_frequency;
        self.trap_unimplemented = config.trap_unimplemented;
        self
    }

    #[inline]
    pub fn memory(&self) -> &MemoryManager {
        &self.memory
    }

    #[inline]
    pub fn syscalls(&self) -> Option<&dyn SyscallDispatcher> {
        self.syscalls.as_deref()
    }

    pub fn timebase_frequency(&self) -> u64 {
        self.timebase_frequency
    }

    /// Current time base value derived from the host clock
    pub fn timebase(&self) -> u64 {
        let nanos = self.timebase_origin.elapsed().as_nanos();
        (nanos * self.timebase_frequency as u128 / 1_000_000_000) as u64
    }

    /// Execute a single instruction
    ///
    /// The next address is staged as PC+4 before the handler runs; branches
    /// overwrite it. On error the thread stays at the faulting instruction.
    pub fn step(&self, thread: &mut PpuThread) -> Result<(), PpuError> {
        let pc = thread.pc();
        let word = self.memory.read_be32(pc as u32)?;
        let (op, entry) = PpuDecoder::decode(word);
        ppu_trace!("0x{:08x}: {:08x} {}", pc, word, entry.name);

        thread.regs.nia = pc.wrapping_add(4);
        (entry.handler)(self, thread, op)?;
        thread.regs.cia = thread.regs.nia;
        Ok(())
    }

    /// Step until the thread stops running or the budget is exhausted
    ///
    /// Returns the number of instructions executed.
    pub fn run(&self, thread: &mut PpuThread, max_steps: u64) -> Result<u64, PpuError> {
        let mut steps = 0;
        while thread.is_running() && steps < max_steps {
            self.step(thread)?;
            steps += 1;
        }
        Ok(steps)
    }

    /// The unimplemented-instruction path: one diagnostic, no state change
    pub fn unimplemented(
        &self,
        thread: &PpuThread,
        op: Instruction,
        mnemonic: &str,
    ) -> Result<(), PpuError> {
        self.diagnostics.log_unimplemented(mnemonic, thread.pc());
        if self.trap_unimplemented {
            return Err(PpuError::InvalidInstruction { addr: thread.pc() as u32, opcode: op.raw() });
        }
        Ok(())
    }
}

/// Handler for encodings with no table entry
pub(crate) fn unknown(ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> Result<(), PpuError> {
    let name = format!("opcode 0x{:08x}", op.raw());
    ppu.unimplemented(thread, op, &name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instructions::test_util::{TestCpu, CODE_BASE};
    use crate::thread::PpuThreadState;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct CountingSink {
        count: AtomicUsize,
        last: Mutex<Option<(String, u64)>>,
    }

    impl DiagnosticSink for CountingSink {
        fn log_unimplemented(&self, mnemonic: &str, pc: u64) {
            self.count.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some((mnemonic.to_string(), pc));
        }
    }

    #[test]
    fn test_step_advances_pc() {
        let mut cpu = TestCpu::new();
        // addi r3, r0, 100
        cpu.exec(0x38600064).unwrap();
        assert_eq!(cpu.thread.gpr(3), 100);
        assert_eq!(cpu.thread.pc(), CODE_BASE + 4);
    }

    #[test]
    fn test_unknown_opcode_is_a_logged_no_op() {
        let sink = Arc::new(CountingSink::default());
        let mut cpu = TestCpu::new();
        cpu.ppu = PpuInterpreter::new(Arc::clone(&cpu.memory)).with_diagnostics(sink.clone());

        cpu.thread.set_gpr(5, 0x1234);
        cpu.thread.set_cr_field(2, 0b0100);
        cpu.thread.regs.xer = 0x2000_0000;
        let before = cpu.thread.regs.clone();

        cpu.exec(0x0000_0000).unwrap();
        assert_eq!(sink.count.load(Ordering::SeqCst), 1);
        let (name, pc) = sink.last.lock().unwrap().clone().unwrap();
        assert!(name.contains("0x00000000"));
        assert_eq!(pc, CODE_BASE);

        let after = &cpu.thread.regs;
        assert_eq!(after.gpr, before.gpr);
        assert_eq!(after.cr, before.cr);
        assert_eq!(after.xer, before.xer);
        assert_eq!(after.fpscr, before.fpscr);
        assert_eq!(after.vscr, before.vscr);
        assert_eq!(cpu.thread.pc(), CODE_BASE + 4);

        // Dispatch resumes normally: addi r3, r0, 1
        cpu.thread.set_pc(CODE_BASE + 4);
        cpu.memory.write_be32((CODE_BASE + 4) as u32, 0x38600001).unwrap();
        cpu.ppu.step(&mut cpu.thread).unwrap();
        assert_eq!(cpu.thread.gpr(3), 1);
        assert_eq!(sink.count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_trap_unimplemented_config() {
        let mut cpu = TestCpu::new();
        let config = PpuConfig { trap_unimplemented: true, ..PpuConfig::default() };
        cpu.ppu = PpuInterpreter::new(Arc::clone(&cpu.memory)).with_config(&config);

        let err = cpu.exec(0x0000_0000).unwrap_err();
        assert_eq!(err, PpuError::InvalidInstruction { addr: CODE_BASE as u32, opcode: 0 });
        assert_eq!(cpu.thread.pc(), CODE_BASE);
    }

    #[test]
    fn test_fetch_from_unmapped_memory() {
        let mut cpu = TestCpu::new();
        cpu.thread.set_pc(0x8000_0000);
        assert!(matches!(cpu.ppu.step(&mut cpu.thread), Err(PpuError::Memory(_))));
    }

    #[test]
    fn test_run_respects_budget_and_state() {
        let mut cpu = TestCpu::new();
        // b . (infinite loop)
        cpu.memory.write_be32(CODE_BASE as u32, 0x48000000).unwrap();
        cpu.thread.set_pc(CODE_BASE);

        // Not started: nothing runs
        assert_eq!(cpu.ppu.run(&mut cpu.thread, 10).unwrap(), 0);

        cpu.thread.start();
        assert_eq!(cpu.ppu.run(&mut cpu.thread, 10).unwrap(), 10);
        assert_eq!(cpu.thread.pc(), CODE_BASE);

        cpu.thread.exit(0);
        assert_eq!(cpu.thread.state, PpuThreadState::Exited);
        assert_eq!(cpu.ppu.run(&mut cpu.thread, 10).unwrap(), 0);
    }

    #[test]
    fn test_timebase_is_monotonic() {
        let cpu = TestCpu::new();
        let a = cpu.ppu.timebase();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = cpu.ppu.timebase();
        assert!(b > a);
    }
}
