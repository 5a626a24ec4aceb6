use num_traits::{One, WrappingAdd, WrappingMul, WrappingNeg, WrappingSub, Zero};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Unsigned machine word used as an element of the ring Z/2^K.
///
/// All arithmetic wraps, which is exactly the reduction modulo 2^K. Values are
/// never widened: products and sums stay in `Self` after every operation.
pub trait IntRing2k:
    std::fmt::Display
    + Serialize
    + for<'a> Deserialize<'a>
    + Default
    + WrappingAdd
    + WrappingSub
    + WrappingMul
    + WrappingNeg
    + PartialEq
    + Eq
    + Copy
    + Debug
    + Zero
    + One
    + Sized
    + Send
    + Sync
    + 'static
    + bytemuck::NoUninit
    + bytemuck::AnyBitPattern
{
    const K: usize;
    const BYTES: usize;

    /// Two's complement reading of the word, i.e. the representative in
    /// `[-2^(K-1), 2^(K-1) - 1]`.
    fn to_signed(self) -> i128;

    /// Reduces a signed integer modulo 2^K.
    fn from_signed(value: i128) -> Self;

    /// Uniform sample over the whole ring.
    fn sample_uniform<R: Rng + ?Sized>(rng: &mut R) -> Self;
}

macro_rules! impl_int_ring {
    ($($ty:ty => $signed:ty),*) => ($(
        impl IntRing2k for $ty {
            const K: usize = Self::BITS as usize;
            const BYTES: usize = Self::K / 8;

            #[inline(always)]
            fn to_signed(self) -> i128 {
                self as $signed as i128
            }

            #[inline(always)]
            fn from_signed(value: i128) -> Self {
                value as $ty
            }

            #[inline(always)]
            fn sample_uniform<R: Rng + ?Sized>(rng: &mut R) -> Self {
                rng.gen()
            }
        }
    )*)
}

impl_int_ring! {
    u8 => i8,
    u16 => i16,
    u32 => i32,
    u64 => i64,
    u128 => i128
}
