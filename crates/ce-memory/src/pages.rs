//! Region protection flags

use bitflags::bitflags;

bitflags! {
    /// Protection flags of a mapped region
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PageFlags: u32 {
        /// Region is readable
        const READ    = 0b0001;
        /// Region is writable
        const WRITE   = 0b0010;
        /// Region holds code
        const EXECUTE = 0b0100;

        /// Read and write access
        const RW  = Self::READ.bits() | Self::WRITE.bits();
        /// Read, write, and execute access
        const RWX = Self::READ.bits() | Self::WRITE.bits() | Self::EXECUTE.bits();
        /// Read and execute access
        const RX  = Self::READ.bits() | Self::EXECUTE.bits();
    }
}

impl Default for PageFlags {
    fn default() -> Self {
        Self::empty()
    }
}

impl PageFlags {
    /// Whether a region with these flags accepts an access of the given kind
    pub fn permits(self, write: bool) -> bool {
        if write {
            self.contains(Self::WRITE)
        } else {
            self.contains(Self::READ)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permits() {
        assert!(PageFlags::RW.permits(true));
        assert!(PageFlags::RX.permits(false));
        assert!(!PageFlags::RX.permits(true));
        assert!(!PageFlags::empty().permits(false));
    }
}
