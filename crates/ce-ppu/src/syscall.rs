//! System-call collaborator seam
//!
//! `sc` hands control to an external dispatcher together with the call
//! class taken from the LEV field. What the dispatcher does is outside the
//! interpreter; it may mutate any register, conventionally r3.

use ce_core::error::KernelError;

use crate::thread::PpuThread;

/// System call class selected by the `sc` LEV field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyscallClass {
    /// LEV=0: kernel syscall, number in r11
    Kernel,
    /// LEV=1: hypervisor call
    Hypervisor,
    /// LEV=2: module (host function) call, function id in r11
    Module,
    Other(u8),
}

impl SyscallClass {
    pub fn from_lev(lev: u32) -> Self {
        match lev {
            0 => Self::Kernel,
            1 => Self::Hypervisor,
            2 => Self::Module,
            other => Self::Other(other as u8),
        }
    }
}

/// Receiver of `sc` instructions
pub trait SyscallDispatcher: Send + Sync {
    /// Handle one system call; control returns to the next instruction afterwards
    fn dispatch(&self, class: SyscallClass, thread: &mut PpuThread) -> Result<(), KernelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lev_classes() {
        assert_eq!(SyscallClass::from_lev(0), SyscallClass::Kernel);
        assert_eq!(SyscallClass::from_lev(1), SyscallClass::Hypervisor);
        assert_eq!(SyscallClass::from_lev(2), SyscallClass::Module);
        assert_eq!(SyscallClass::from_lev(5), SyscallClass::Other(5));
    }
}
