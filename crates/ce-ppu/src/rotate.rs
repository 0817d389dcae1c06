//! Rotate/mask helpers shared by the rotate, shift and insert instructions
//!
//! Bits are numbered the PowerPC way: bit 0 is the most significant bit.

use once_cell::sync::Lazy;

/// Mask table indexed by `[begin][end]`, built once per process
pub struct RotateMasks {
    masks: Box<[[u64; 64]; 64]>,
}

impl RotateMasks {
    fn build() -> Self {
        let mut masks = Box::new([[0u64; 64]; 64]);
        for (mb, row) in masks.iter_mut().enumerate() {
            for (me, mask) in row.iter_mut().enumerate() {
                *mask = compute_mask(mb as u32, me as u32);
            }
        }
        Self { masks }
    }

    #[inline]
    pub fn get(&self, mb: u32, me: u32) -> u64 {
        self.masks[(mb & 63) as usize][(me & 63) as usize]
    }
}

/// Ones from bit `mb` through bit `me`, wrapping around when `mb > me`
const fn compute_mask(mb: u32, me: u32) -> u64 {
    let from_mb = u64::MAX >> mb;
    let to_me = u64::MAX << (63 - me);
    if mb <= me {
        from_mb & to_me
    } else {
        from_mb | to_me
    }
}

pub static ROTATE_MASKS: Lazy<RotateMasks> = Lazy::new(RotateMasks::build);

/// 64-bit mask from the shared table
#[inline]
pub fn mask64(mb: u32, me: u32) -> u64 {
    ROTATE_MASKS.get(mb, me)
}

/// Mask for the 32-bit rotate forms, which address the low word
#[inline]
pub fn mask32(mb: u32, me: u32) -> u64 {
    ROTATE_MASKS.get(32 + (mb & 31), 32 + (me & 31))
}

#[inline]
pub fn rotl64(value: u64, n: u32) -> u64 {
    value.rotate_left(n & 63)
}

/// Rotate the low word, replicated into both halves as the 32-bit forms define
#[inline]
pub fn rotl32(value: u64, n: u32) -> u64 {
    let word = value & 0xFFFF_FFFF;
    rotl64(word | (word << 32), n & 31)
}
