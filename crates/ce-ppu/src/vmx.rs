//! VMX/AltiVec vector register
//!
//! The 16 bytes are kept in architectural order: byte 0 is the most
//! significant byte and element 0 of every lane view. Lane accessors copy
//! out and convert from big-endian, so no view ever aliases the storage.

use bytemuck::{Pod, Zeroable};

/// VMX vector register (128-bit)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C, align(16))]
pub struct VmxRegister {
    pub data: [u8; 16],
}

macro_rules! lane_views {
    ($( $get:ident, $from:ident, $ty:ty, $n:literal, $w:literal; )*) => {
        $(
            #[inline]
            pub fn $get(&self) -> [$ty; $n] {
                let chunks: [[u8; $w]; $n] = bytemuck::cast(self.data);
                chunks.map(<$ty>::from_be_bytes)
            }

            #[inline]
            pub fn $from(lanes: [$ty; $n]) -> Self {
                let chunks: [[u8; $w]; $n] = lanes.map(<$ty>::to_be_bytes);
                Self { data: bytemuck::cast(chunks) }
            }
        )*
    };
}

impl VmxRegister {
    pub const ZERO: Self = Self { data: [0; 16] };

    /// Create a new zero-initialized VMX register
    pub const fn new() -> Self {
        Self::ZERO
    }

    /// Whole register as a 128-bit integer (byte 0 most significant)
    #[inline]
    pub fn as_u128(&self) -> u128 {
        u128::from_be_bytes(self.data)
    }

    #[inline]
    pub fn from_u128(value: u128) -> Self {
        Self { data: value.to_be_bytes() }
    }

    #[inline]
    pub fn u8x16(&self) -> [u8; 16] {
        self.data
    }

    #[inline]
    pub fn from_u8x16(data: [u8; 16]) -> Self {
        Self { data }
    }

    #[inline]
    pub fn i8x16(&self) -> [i8; 16] {
        self.data.map(|b| b as i8)
    }

    #[inline]
    pub fn from_i8x16(lanes: [i8; 16]) -> Self {
        Self { data: lanes.map(|b| b as u8) }
    }

    lane_views! {
        u16x8, from_u16x8, u16, 8, 2;
        i16x8, from_i16x8, i16, 8, 2;
        u32x4, from_u32x4, u32, 4, 4;
        i32x4, from_i32x4, i32, 4, 4;
        u64x2, from_u64x2, u64, 2, 8;
        f64x2, from_f64x2, f64, 2, 8;
    }

    /// Get as 4 x f32 (big-endian word order)
    #[inline]
    pub fn f32x4(&self) -> [f32; 4] {
        self.u32x4().map(f32::from_bits)
    }

    /// Set from 4 x f32 (big-endian word order)
    #[inline]
    pub fn from_f32x4(lanes: [f32; 4]) -> Self {
        Self::from_u32x4(lanes.map(f32::to_bits))
    }
}

impl From<u128> for VmxRegister {
    fn from(value: u128) -> Self {
        Self::from_u128(value)
    }
}
