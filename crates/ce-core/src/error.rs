//! Error types shared across the emulator crates

use thiserror::Error;

/// Guest memory access errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("unmapped address 0x{0:08x}")]
    Unmapped(u32),

    #[error("write to read-only memory at 0x{0:08x}")]
    ReadOnly(u32),

    #[error("misaligned {align}-byte atomic access at 0x{addr:08x}")]
    Misaligned { addr: u32, align: u32 },

    #[error("out of memory (requested 0x{size:x} bytes)")]
    OutOfMemory { size: u32 },

    #[error("failed to map 0x{size:x} bytes at 0x{base:08x}")]
    MapFailed { base: u32, size: u32 },
}

/// Kernel / system call errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KernelError {
    #[error("unknown syscall {0}")]
    UnknownSyscall(u64),

    #[error("unknown module function 0x{0:08x}")]
    UnknownFunction(u32),

    #[error("unsupported system call class {0}")]
    UnsupportedClass(u8),

    #[error("kernel memory access failed: {0}")]
    Memory(#[from] MemoryError),
}

/// PPU execution errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PpuError {
    #[error("invalid instruction 0x{opcode:08x} at 0x{addr:08x}")]
    InvalidInstruction { addr: u32, opcode: u32 },

    #[error("memory access failed: {0}")]
    Memory(#[from] MemoryError),

    #[error("trap taken at 0x{addr:08x}")]
    Trap { addr: u64 },

    #[error("system call failed: {0}")]
    Kernel(#[from] KernelError),
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("no configuration directory available")]
    NoConfigDir,
}

/// Umbrella error for callers that deal with several subsystems
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error(transparent)]
    Ppu(#[from] PpuError),

    #[error(transparent)]
    Kernel(#[from] KernelError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = PpuError::InvalidInstruction { addr: 0x10000, opcode: 0xdeadbeef };
        assert_eq!(err.to_string(), "invalid instruction 0xdeadbeef at 0x00010000");

        let err: PpuError = MemoryError::Unmapped(0x1234).into();
        assert_eq!(err.to_string(), "memory access failed: unmapped address 0x00001234");
    }

    #[test]
    fn test_nested_conversion() {
        let err: CoreError = PpuError::from(KernelError::UnknownSyscall(999)).into();
        assert!(matches!(err, CoreError::Ppu(PpuError::Kernel(KernelError::UnknownSyscall(999)))));
    }
}
