use super::{int_ring::IntRing2k, tensor::RingTensor};
use crate::{
    error::{Error, Result},
    execution::player::Role,
};
use itertools::izip;

/// A tensor split into two additive shares, `v = share_0 + share_1 mod 2^K`.
///
/// Both shares always have the shape of the secret. Operations never mutate
/// their operands and always return a fresh `SharedTensor`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SharedTensor<T: IntRing2k> {
    shares: [RingTensor<T>; 2],
}

impl<T: IntRing2k> SharedTensor<T> {
    /// Wraps shares that were already produced by a protocol.
    pub fn from_shares(share0: RingTensor<T>, share1: RingTensor<T>) -> Result<Self> {
        share0.check_same_shape(&share1, "from_shares")?;
        Ok(Self::new_unchecked(share0, share1))
    }

    pub(crate) fn new_unchecked(share0: RingTensor<T>, share1: RingTensor<T>) -> Self {
        SharedTensor {
            shares: [share0, share1],
        }
    }

    pub fn share(&self, role: Role) -> &RingTensor<T> {
        &self.shares[role.index()]
    }

    pub fn shares(&self) -> &[RingTensor<T>; 2] {
        &self.shares
    }

    pub fn into_shares(self) -> [RingTensor<T>; 2] {
        self.shares
    }

    pub fn shape(&self) -> &[usize] {
        self.shares[0].shape()
    }

    /// Sums both shares. In a deployment this is the reveal step and must
    /// only be applied to values that are safe to disclose.
    pub fn reconstruct(&self) -> RingTensor<T> {
        let [s0, s1] = &self.shares;
        RingTensor::from_array(
            ndarray::Zip::from(s0.view())
                .and(s1.view())
                .map_collect(|a, b| *a + b),
        )
    }

    fn share_wise<F>(&self, rhs: &Self, f: F) -> Result<Self>
    where
        F: Fn(&RingTensor<T>, &RingTensor<T>) -> Result<RingTensor<T>>,
    {
        let [l0, l1] = &self.shares;
        let [r0, r1] = &rhs.shares;
        Self::from_shares(f(l0, r0)?, f(l1, r1)?)
    }

    pub fn add(&self, rhs: &Self) -> Result<Self> {
        self.share_wise(rhs, RingTensor::add)
    }

    pub fn sub(&self, rhs: &Self) -> Result<Self> {
        self.share_wise(rhs, RingTensor::sub)
    }

    /// Share-wise elementwise product. This is NOT a sharing of the product
    /// of the secrets; use the Beaver protocol for that.
    pub fn elementwise_mul(&self, rhs: &Self) -> Result<Self> {
        self.share_wise(rhs, RingTensor::elementwise_mul)
    }

    /// Share-wise matrix product. Same caveat as [`Self::elementwise_mul`].
    pub fn matmul(&self, rhs: &Self) -> Result<Self> {
        self.share_wise(rhs, RingTensor::matmul)
    }

    /// Number of positions where both shares have the same sign under the
    /// signed interpretation. Zero counts as its own sign.
    pub fn same_sign_count(&self) -> usize {
        let [s0, s1] = &self.shares;
        izip!(s0.iter(), s1.iter())
            .filter(|(a, b)| a.signum() == b.signum())
            .count()
    }

    pub fn same_sign_fraction(&self) -> f64 {
        let len = self.shares[0].len();
        if len == 0 {
            return 0.0;
        }
        self.same_sign_count() as f64 / len as f64
    }
}

impl<T: IntRing2k> TryFrom<[RingTensor<T>; 2]> for SharedTensor<T> {
    type Error = Error;

    fn try_from(shares: [RingTensor<T>; 2]) -> Result<Self> {
        let [s0, s1] = shares;
        Self::from_shares(s0, s1)
    }
}
