//! PPU (PowerPC Processing Unit) interpreter
//!
//! This crate implements the Cell BE PPU user-mode instruction set: 64-bit
//! PowerPC fixed point, the FPU and VMX/AltiVec. Instructions are decoded
//! through static tables into plain function pointers and executed against a
//! [`PpuThread`] and a shared guest [`ce_memory::MemoryManager`].

pub mod decoder;
pub mod instructions;
pub mod interpreter;
pub mod rotate;
pub mod syscall;
pub mod thread;
pub mod vmx;

pub use decoder::{Instruction, PpuDecoder};
pub use interpreter::{DiagnosticSink, PpuInterpreter, TracingDiagnostics};
pub use syscall::{SyscallClass, SyscallDispatcher};
pub use thread::{PpuThread, PpuThreadState};
pub use vmx::VmxRegister;
