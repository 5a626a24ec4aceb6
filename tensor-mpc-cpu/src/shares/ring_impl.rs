use super::int_ring::IntRing2k;
use num_traits::{One, Zero};
use rand::{
    distributions::{Distribution, Standard},
    Rng,
};
use serde::{Deserialize, Serialize};
use std::{
    iter::Sum,
    ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, Eq, Hash)]
#[serde(bound = "")]
#[repr(transparent)]
pub struct RingElement<T: IntRing2k>(pub T);

impl<T: IntRing2k> RingElement<T> {
    pub fn convert(self) -> T {
        self.0
    }

    /// Embeds a signed integer into the ring, wrapping modulo 2^K.
    pub fn from_signed(value: i128) -> Self {
        RingElement(T::from_signed(value))
    }

    /// Representative in `[-2^(K-1), 2^(K-1) - 1]`.
    pub fn to_signed(self) -> i128 {
        self.0.to_signed()
    }

    /// Sign of the signed representative: -1, 0 or 1.
    pub fn signum(self) -> i8 {
        self.to_signed().signum() as i8
    }
}

impl<T: IntRing2k> From<T> for RingElement<T> {
    fn from(value: T) -> Self {
        RingElement(value)
    }
}

impl<T: IntRing2k> std::fmt::Display for RingElement<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// Wrapping binary operator for owned and borrowed right-hand sides, plus its
/// assigning form.
macro_rules! ring_binop {
    ($op:ident, $method:ident, $op_assign:ident, $method_assign:ident, $wrapping:ident) => {
        impl<T: IntRing2k> $op for RingElement<T> {
            type Output = Self;

            fn $method(self, rhs: Self) -> Self {
                Self(self.0.$wrapping(&rhs.0))
            }
        }

        impl<T: IntRing2k> $op<&Self> for RingElement<T> {
            type Output = Self;

            fn $method(self, rhs: &Self) -> Self {
                Self(self.0.$wrapping(&rhs.0))
            }
        }

        impl<T: IntRing2k> $op_assign for RingElement<T> {
            fn $method_assign(&mut self, rhs: Self) {
                *self = $op::$method(*self, rhs);
            }
        }

        impl<T: IntRing2k> $op_assign<&Self> for RingElement<T> {
            fn $method_assign(&mut self, rhs: &Self) {
                *self = $op::$method(*self, rhs);
            }
        }
    };
}

ring_binop!(Add, add, AddAssign, add_assign, wrapping_add);
ring_binop!(Sub, sub, SubAssign, sub_assign, wrapping_sub);
ring_binop!(Mul, mul, MulAssign, mul_assign, wrapping_mul);

/// Scaling by a raw ring value.
impl<T: IntRing2k> Mul<T> for RingElement<T> {
    type Output = Self;

    fn mul(self, rhs: T) -> Self {
        Self(self.0.wrapping_mul(&rhs))
    }
}

impl<T: IntRing2k> Neg for RingElement<T> {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(self.0.wrapping_neg())
    }
}

impl<T: IntRing2k> Zero for RingElement<T> {
    fn zero() -> Self {
        Self(T::zero())
    }

    fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl<T: IntRing2k> One for RingElement<T> {
    fn one() -> Self {
        Self(T::one())
    }
}

impl<T: IntRing2k> Sum for RingElement<T> {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, x| acc + x)
    }
}

impl<T: IntRing2k> Distribution<RingElement<T>> for Standard {
    #[inline(always)]
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> RingElement<T> {
        RingElement(T::sample_uniform(rng))
    }
}
