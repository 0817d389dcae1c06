//! System call dispatcher

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use ce_core::config::DEFAULT_TIMEBASE_FREQUENCY;
use ce_core::error::KernelError;
use ce_core::{kernel_debug, kernel_trace};
use ce_memory::MemoryManager;
use ce_ppu::{PpuThread, SyscallClass, SyscallDispatcher};
use parking_lot::Mutex;

use crate::module::ModuleRegistry;

pub const CELL_OK: u32 = 0;
/// The feature is not yet implemented
pub const CELL_ENOSYS: u32 = 0x8001_0003;
/// Invalid guest pointer
pub const CELL_EFAULT: u32 = 0x8001_000D;

const SYS_PROCESS_GETPID: u64 = 1;
const SYS_PROCESS_EXIT: u64 = 3;
const SYS_PROCESS_EXIT_ALT: u64 = 22;
const SYS_PROCESS_GET_SDK_VERSION: u64 = 25;
const SYS_PPU_THREAD_EXIT: u64 = 41;
const SYS_PPU_THREAD_YIELD: u64 = 43;
const SYS_PPU_THREAD_GET_ID: u64 = 44;
const SYS_TIME_GET_CURRENT_TIME: u64 = 145;
const SYS_TIME_GET_TIMEBASE_FREQUENCY: u64 = 147;
const SYS_TTY_WRITE: u64 = 403;

/// SDK 3.60
const DEFAULT_SDK_VERSION: u32 = 0x0036_0001;

/// Error codes are 32-bit and land sign-extended in r3
fn cell_error(code: u32) -> u64 {
    code as i32 as i64 as u64
}

fn arguments(thread: &PpuThread) -> [u64; 8] {
    std::array::from_fn(|i| thread.gpr(3 + i))
}

/// HLE kernel serving `sc` from a PPU interpreter
pub struct Lv2Kernel {
    memory: Arc<MemoryManager>,
    modules: ModuleRegistry,
    pid: u32,
    sdk_version: u32,
    timebase_frequency: u64,
    tty: Mutex<Vec<u8>>,
}

impl Lv2Kernel {
    pub fn new(memory: Arc<MemoryManager>) -> Self {
        Self {
            memory,
            modules: ModuleRegistry::new(),
            pid: 1,
            sdk_version: DEFAULT_SDK_VERSION,
            timebase_frequency: DEFAULT_TIMEBASE_FREQUENCY,
            tty: Mutex::new(Vec::new()),
        }
    }

    pub fn with_modules(mut self, modules: ModuleRegistry) -> Self {
        self.modules = modules;
        self
    }

    pub fn with_timebase_frequency(mut self, frequency: u64) -> Self {
        self.timebase_frequency = frequency;
        self
    }

    pub fn modules(&self) -> &ModuleRegistry {
        &self.modules
    }

    /// Everything the guest has written to the TTY so far
    pub fn tty_output(&self) -> Vec<u8> {
        self.tty.lock().clone()
    }

    /// Run one kernel syscall. The returned value goes to r3.
    fn kernel_call(&self, number: u64, thread: &mut PpuThread) -> Result<u64, KernelError> {
        let args = arguments(thread);
        kernel_debug!("syscall {} (r3=0x{:x}, r4=0x{:x})", number, args[0], args[1]);
        let result = match number {
            SYS_PROCESS_GETPID => self.pid as u64,

            SYS_PROCESS_EXIT | SYS_PROCESS_EXIT_ALT | SYS_PPU_THREAD_EXIT => {
                let code = args[0] as i32;
                tracing::info!(target: "kernel", "{} exited with status {}", thread.name, code);
                thread.exit(code);
                CELL_OK as u64
            }

            SYS_PROCESS_GET_SDK_VERSION => {
                let version = args[1] as u32;
                if version == 0 {
                    return Ok(cell_error(CELL_EFAULT));
                }
                self.memory.write_be32(version, self.sdk_version)?;
                CELL_OK as u64
            }

            SYS_PPU_THREAD_YIELD => {
                std::thread::yield_now();
                CELL_OK as u64
            }

            SYS_PPU_THREAD_GET_ID => {
                let id = args[0] as u32;
                if id == 0 {
                    return Ok(cell_error(CELL_EFAULT));
                }
                self.memory.write_be64(id, thread.id as u64)?;
                CELL_OK as u64
            }

            SYS_TIME_GET_CURRENT_TIME => {
                let (sec, nsec) = (args[0] as u32, args[1] as u32);
                if sec == 0 || nsec == 0 {
                    return Ok(cell_error(CELL_EFAULT));
                }
                let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
                self.memory.write_be64(sec, now.as_secs())?;
                self.memory.write_be64(nsec, now.subsec_nanos() as u64)?;
                CELL_OK as u64
            }

            SYS_TIME_GET_TIMEBASE_FREQUENCY => self.timebase_frequency,

            SYS_TTY_WRITE => self.tty_write(&args)?,

            _ => {
                tracing::warn!(
                    target: "kernel",
                    "Unknown syscall {} at 0x{:08x} (r3=0x{:x})",
                    number,
                    thread.pc(),
                    args[0]
                );
                cell_error(CELL_ENOSYS)
            }
        };
        Ok(result)
    }

    /// sys_tty_write(ch, buf, len, pwritelen)
    fn tty_write(&self, args: &[u64; 8]) -> Result<u64, KernelError> {
        let (channel, buf, len, written) = (args[0] as u32, args[1] as u32, args[2] as u32, args[3] as u32);
        let mut data = vec![0u8; len as usize];
        self.memory.read_bytes(buf, &mut data)?;
        tracing::info!(target: "tty", "[ch{}] {}", channel, String::from_utf8_lossy(&data).trim_end());
        self.tty.lock().extend_from_slice(&data);

        if written != 0 {
            self.memory.write_be32(written, len)?;
        }
        Ok(CELL_OK as u64)
    }

    fn module_call(&self, thread: &mut PpuThread) -> Result<(), KernelError> {
        let fnid = thread.gpr(11) as u32;
        let (module, export) = self
            .modules
            .find(fnid)
            .ok_or(KernelError::UnknownFunction(fnid))?;
        kernel_trace!("{}::{} (0x{:08x})", module, export.name, fnid);

        let result = (export.func)(&arguments(thread));
        thread.set_gpr(3, result as u64);
        Ok(())
    }
}

impl SyscallDispatcher for Lv2Kernel {
    fn dispatch(&self, class: SyscallClass, thread: &mut PpuThread) -> Result<(), KernelError> {
        match class {
            SyscallClass::Kernel => {
                let result = self.kernel_call(thread.gpr(11), thread)?;
                thread.set_gpr(3, result);
                Ok(())
            }
            SyscallClass::Module => self.module_call(thread),
            SyscallClass::Hypervisor => Err(KernelError::UnsupportedClass(1)),
            SyscallClass::Other(lev) => Err(KernelError::UnsupportedClass(lev)),
        }
    }
}
