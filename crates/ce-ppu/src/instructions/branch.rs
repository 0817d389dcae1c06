//! Branch, condition register and system call instructions

use ce_core::error::KernelError;
use ce_core::ppu_trace;

use super::ExecResult;
use crate::decoder::Instruction;
use crate::interpreter::PpuInterpreter;
use crate::syscall::SyscallClass;
use crate::thread::PpuThread;

// BO field bits, numbered from the most significant
const BO_IGNORE_CR: u32 = 0x10;
const BO_CR_VALUE: u32 = 0x08;
const BO_NO_CTR: u32 = 0x04;
const BO_CTR_ZERO: u32 = 0x02;

#[inline]
fn condition_ok(thread: &PpuThread, bo: u32, bi: u32) -> bool {
    bo & BO_IGNORE_CR != 0 || thread.cr_bit(bi) == (bo & BO_CR_VALUE != 0)
}

/// Decrement CTR unless BO says otherwise, then evaluate both tests
fn counter_and_condition_ok(thread: &mut PpuThread, bo: u32, bi: u32) -> bool {
    if bo & BO_NO_CTR != 0 {
        return condition_ok(thread, bo, bi);
    }
    thread.regs.ctr = thread.regs.ctr.wrapping_sub(1);
    let ctr_ok = (thread.regs.ctr != 0) != (bo & BO_CTR_ZERO != 0);
    ctr_ok && condition_ok(thread, bo, bi)
}

#[inline]
fn link(thread: &mut PpuThread, op: Instruction) {
    if op.lk() {
        thread.regs.lr = thread.pc().wrapping_add(4);
    }
}

/// Unconditional branch
pub fn b(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let target = if op.aa() {
        op.li() as u64
    } else {
        thread.pc().wrapping_add(op.li() as u64)
    };
    link(thread, op);
    thread.branch_to(target);
    Ok(())
}

/// Conditional branch
pub fn bc(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let taken = counter_and_condition_ok(thread, op.bo(), op.bi());
    let target = if op.aa() {
        op.bd() as u64
    } else {
        thread.pc().wrapping_add(op.bd() as u64)
    };
    link(thread, op);
    if taken {
        thread.branch_to(target);
    }
    Ok(())
}

/// Conditional branch to LR; the target is read before LK updates LR
pub fn bclr(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let taken = counter_and_condition_ok(thread, op.bo(), op.bi());
    let target = thread.regs.lr & !3;
    link(thread, op);
    if taken {
        thread.branch_to(target);
    }
    Ok(())
}

/// Conditional branch to CTR; CTR is never decremented
pub fn bcctr(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let taken = condition_ok(thread, op.bo(), op.bi());
    let target = thread.regs.ctr & !3;
    link(thread, op);
    if taken {
        thread.branch_to(target);
    }
    Ok(())
}

macro_rules! cr_logical {
    ($($name:ident => |$a:ident, $b:ident| $e:expr;)*) => {
        $(
            pub fn $name(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
                let $a = thread.cr_bit(op.crba());
                let $b = thread.cr_bit(op.crbb());
                thread.set_cr_bit(op.crbd(), $e);
                Ok(())
            }
        )*
    };
}

cr_logical! {
    crand => |a, b| a & b;
    cror => |a, b| a | b;
    crxor => |a, b| a ^ b;
    crnand => |a, b| !(a & b);
    crnor => |a, b| !(a | b);
    creqv => |a, b| a == b;
    crandc => |a, b| a & !b;
    crorc => |a, b| a | !b;
}

pub fn mcrf(_ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let value = thread.get_cr_field(op.crfs());
    thread.set_cr_field(op.crfd(), value);
    Ok(())
}

/// System call
///
/// Without a dispatcher, or when the dispatcher does not recognise the
/// call, this behaves like any other unimplemented instruction.
pub fn sc(ppu: &PpuInterpreter, thread: &mut PpuThread, op: Instruction) -> ExecResult {
    let class = SyscallClass::from_lev(op.lev());
    let Some(syscalls) = ppu.syscalls() else {
        return ppu.unimplemented(thread, op, "sc");
    };

    ppu_trace!("sc {:?} r11=0x{:x} at 0x{:08x}", class, thread.gpr(11), thread.pc());
    match syscalls.dispatch(class, thread) {
        Ok(()) => Ok(()),
        Err(KernelError::UnsupportedClass(_) | KernelError::UnknownFunction(_)) => {
            ppu.unimplemented(thread, op, "sc")
        }
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instructions::test_util::*;
    use crate::syscall::SyscallDispatcher;
    use ce_core::config::PpuConfig;
    use ce_core::error::PpuError;
    use std::sync::{Arc, Mutex};

    fn branch(li: i32, aa: bool, lk: bool) -> u32 {
        (18 << 26) | (li as u32 & 0x03FF_FFFC) | ((aa as u32) << 1) | lk as u32
    }

    fn branch_cond(bo: u32, bi: u32, bd: i16, lk: bool) -> u32 {
        (16 << 26) | (bo << 21) | (bi << 16) | (bd as u16 as u32 & 0xFFFC) | lk as u32
    }

    #[test]
    fn test_relative_and_absolute_branch() {
        let mut cpu = TestCpu::new();
        cpu.exec(branch(0x100, false, false)).unwrap();
        assert_eq!(cpu.thread.pc(), CODE_BASE + 0x100);

        cpu.exec(branch(-8, false, true)).unwrap();
        assert_eq!(cpu.thread.pc(), CODE_BASE - 8);
        assert_eq!(cpu.thread.regs.lr, CODE_BASE + 4);

        cpu.exec(branch(0x2000, true, false)).unwrap();
        assert_eq!(cpu.thread.pc(), 0x2000);
    }

    #[test]
    fn test_bdnz_counts_down() {
        let mut cpu = TestCpu::new();
        cpu.thread.regs.ctr = 2;
        // bdnz -0 (BO=16: decrement, branch if CTR != 0)
        cpu.exec(branch_cond(16, 0, -4, false)).unwrap();
        assert_eq!(cpu.thread.regs.ctr, 1);
        assert_eq!(cpu.thread.pc(), CODE_BASE - 4);

        cpu.exec(branch_cond(16, 0, -4, false)).unwrap();
        assert_eq!(cpu.thread.regs.ctr, 0);
        assert_eq!(cpu.thread.pc(), CODE_BASE + 4);

        // bdz with CTR wrapping from 0 is not taken
        cpu.exec(branch_cond(18, 0, 0x40, false)).unwrap();
        assert_eq!(cpu.thread.regs.ctr, u64::MAX);
        assert_eq!(cpu.thread.pc(), CODE_BASE + 4);
    }

    #[test]
    fn test_conditional_on_cr_bit() {
        let mut cpu = TestCpu::new();
        cpu.thread.set_cr_field(0, 0b0010);
        // beq +0x20
        cpu.exec(branch_cond(12, 2, 0x20, false)).unwrap();
        assert_eq!(cpu.thread.pc(), CODE_BASE + 0x20);
        // bne +0x20 not taken, but LK still writes LR
        cpu.exec(branch_cond(4, 2, 0x20, true)).unwrap();
        assert_eq!(cpu.thread.pc(), CODE_BASE + 4);
        assert_eq!(cpu.thread.regs.lr, CODE_BASE + 4);
    }

    #[test]
    fn test_branch_to_lr_and_ctr() {
        let mut cpu = TestCpu::new();
        cpu.thread.regs.lr = 0x1_2347;
        // blr
        cpu.exec(x_form(19, 20, 0, 0, 16, false)).unwrap();
        assert_eq!(cpu.thread.pc(), 0x1_2344);

        // blrl swaps: target is the old LR
        cpu.thread.regs.lr = 0x1_8000;
        cpu.exec(x_form(19, 20, 0, 0, 16, true)).unwrap();
        assert_eq!(cpu.thread.pc(), 0x1_8000);
        assert_eq!(cpu.thread.regs.lr, CODE_BASE + 4);

        // bctrl
        cpu.thread.regs.ctr = 0x1_4000;
        cpu.exec(x_form(19, 20, 0, 0, 528, true)).unwrap();
        assert_eq!(cpu.thread.pc(), 0x1_4000);
        assert_eq!(cpu.thread.regs.ctr, 0x1_4000);
    }

    #[test]
    fn test_cr_logical() {
        let mut cpu = TestCpu::new();
        cpu.thread.regs.cr = 0;
        cpu.thread.set_cr_bit(1, true);
        // cror 31, 1, 2 ; crand 30, 1, 2 ; crnor 29, 2, 3 ; creqv 28, 2, 3
        cpu.exec_all(&[
            x_form(19, 31, 1, 2, 449, false),
            x_form(19, 30, 1, 2, 257, false),
            x_form(19, 29, 2, 3, 33, false),
            x_form(19, 28, 2, 3, 289, false),
        ])
        .unwrap();
        assert_eq!(cpu.thread.get_cr_field(7), 0b1101);

        // crxor 1, 1, 1 clears
        cpu.exec(x_form(19, 1, 1, 1, 193, false)).unwrap();
        assert!(!cpu.thread.cr_bit(1));
    }

    #[test]
    fn test_mcrf() {
        let mut cpu = TestCpu::new();
        cpu.thread.set_cr_field(3, 0b1010);
        // mcrf cr5, cr3
        cpu.exec(x_form(19, 5 << 2, 3 << 2, 0, 0, false)).unwrap();
        assert_eq!(cpu.thread.get_cr_field(5), 0b1010);
        assert_eq!(cpu.thread.get_cr_field(3), 0b1010);
    }

    struct Recorder {
        calls: Mutex<Vec<SyscallClass>>,
    }

    impl SyscallDispatcher for Recorder {
        fn dispatch(&self, class: SyscallClass, thread: &mut PpuThread) -> Result<(), KernelError> {
            self.calls.lock().unwrap().push(class);
            match class {
                SyscallClass::Kernel => {
                    thread.set_gpr(3, thread.gpr(11) + 1);
                    Ok(())
                }
                SyscallClass::Module => Err(KernelError::UnknownFunction(thread.gpr(11) as u32)),
                SyscallClass::Hypervisor | SyscallClass::Other(_) => {
                    Err(KernelError::UnsupportedClass(1))
                }
            }
        }
    }

    fn syscall(lev: u32) -> u32 {
        (17 << 26) | (lev << 5) | 2
    }

    #[test]
    fn test_sc_dispatches_by_class() {
        let recorder = Arc::new(Recorder { calls: Mutex::new(Vec::new()) });
        let mut cpu = TestCpu::new();
        cpu.ppu = PpuInterpreter::new(Arc::clone(&cpu.memory)).with_syscalls(recorder.clone());

        cpu.thread.set_gpr(11, 41);
        cpu.exec(syscall(0)).unwrap();
        assert_eq!(cpu.thread.gpr(3), 42);
        assert_eq!(cpu.thread.pc(), CODE_BASE + 4);

        // Unknown module function takes the unimplemented path and carries on
        cpu.exec(syscall(2)).unwrap();
        assert_eq!(cpu.thread.pc(), CODE_BASE + 4);
        assert_eq!(*recorder.calls.lock().unwrap(), vec![SyscallClass::Kernel, SyscallClass::Module]);
    }

    #[test]
    fn test_sc_without_dispatcher() {
        let mut cpu = TestCpu::new();
        cpu.thread.set_gpr(3, 7);
        cpu.exec(syscall(0)).unwrap();
        assert_eq!(cpu.thread.gpr(3), 7);
        assert_eq!(cpu.thread.pc(), CODE_BASE + 4);

        let config = PpuConfig { trap_unimplemented: true, ..PpuConfig::default() };
        cpu.ppu = PpuInterpreter::new(Arc::clone(&cpu.memory)).with_config(&config);
        let err = cpu.exec(syscall(1)).unwrap_err();
        assert!(matches!(err, PpuError::InvalidInstruction { .. }));
    }
}
