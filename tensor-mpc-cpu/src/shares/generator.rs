use super::{
    int_ring::IntRing2k, ring_impl::RingElement, share::SharedTensor, tensor::RingTensor,
};
use crate::{
    error::{Error, Result},
    protocol::prf::{self, AesRng, PrfSeed},
};
use ndarray::{ArrayD, IxDyn};
use rand::{distributions::Uniform, Rng, SeedableRng};
use tensor_mpc_common::ShareMode;

/// Splits plaintext tensors into additive shares and samples triple material.
///
/// Every generator owns its RNG. Two generators never share randomness unless
/// they are built from the same seed.
#[derive(Clone, Debug)]
pub struct ShareGenerator {
    rng: AesRng,
}

impl Default for ShareGenerator {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl ShareGenerator {
    pub fn new(seed: PrfSeed) -> Self {
        Self {
            rng: AesRng::from_seed(seed),
        }
    }

    pub fn seed_from_u64(seed: u64) -> Self {
        Self::new(prf::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(prf::gen_seed())
    }

    /// Derives an independent generator, e.g. to hand to another party.
    pub fn fork(&mut self) -> Self {
        Self::new(self.rng.gen())
    }

    pub fn rng_mut(&mut self) -> &mut AesRng {
        &mut self.rng
    }

    pub fn share<T: IntRing2k>(
        &mut self,
        secret: &RingTensor<T>,
        mode: ShareMode,
    ) -> Result<SharedTensor<T>> {
        match mode {
            ShareMode::Uniform => self.share_uniform(secret),
            ShareMode::SameSign => self.share_same_sign(secret),
        }
    }

    /// `share_0` uniform over the ring, `share_1 = secret - share_0`.
    pub fn share_uniform<T: IntRing2k>(
        &mut self,
        secret: &RingTensor<T>,
    ) -> Result<SharedTensor<T>> {
        let share0 = self.random_tensor(secret.shape());
        let share1 = secret.sub(&share0)?;
        SharedTensor::from_shares(share0, share1)
    }

    /// `share_0 = floor(secret * m)` with `m` uniform in `[0, 1)` per element.
    ///
    /// Both shares keep the sign of the secret far more often than under the
    /// uniform split. This leaks the sign and exists only to measure that
    /// leakage.
    pub fn share_same_sign<T: IntRing2k>(
        &mut self,
        secret: &RingTensor<T>,
    ) -> Result<SharedTensor<T>> {
        let values = secret
            .iter()
            .map(|x| {
                let m: f64 = self.rng.gen();
                RingElement::from_signed((x.to_signed() as f64 * m).floor() as i128)
            })
            .collect();
        let share0 = RingTensor::from_shape_vec(secret.shape(), values)?;
        let share1 = secret.sub(&share0)?;
        SharedTensor::from_shares(share0, share1)
    }

    /// Uniform tensor over the whole ring.
    pub fn random_tensor<T: IntRing2k>(&mut self, shape: &[usize]) -> RingTensor<T> {
        RingTensor::from_array(ArrayD::from_shape_simple_fn(IxDyn(shape), || {
            self.rng.gen()
        }))
    }

    /// Elements uniform in `[-2^(k-1), 2^(k-1) - 1]`. For `k >= K` this is
    /// the whole ring.
    pub fn random_kbit_tensor<T: IntRing2k>(
        &mut self,
        shape: &[usize],
        k: u32,
    ) -> Result<RingTensor<T>> {
        if k == 0 {
            return Err(Error::InvalidBitLength(k));
        }
        if k as usize >= T::K {
            return Ok(self.random_tensor(shape));
        }
        let half = 1i128 << (k - 1);
        let dist = Uniform::new_inclusive(-half, half - 1);
        let len = shape.iter().product::<usize>();
        let values = (&mut self.rng)
            .sample_iter(dist)
            .take(len)
            .map(RingElement::from_signed)
            .collect();
        RingTensor::from_shape_vec(shape, values)
    }

    /// Elements uniform in `[0, 2^k - 1]`. For `k >= K` this is the whole
    /// ring.
    pub fn random_positive_kbit_tensor<T: IntRing2k>(
        &mut self,
        shape: &[usize],
        k: u32,
    ) -> Result<RingTensor<T>> {
        if k == 0 {
            return Err(Error::InvalidBitLength(k));
        }
        if k as usize >= T::K {
            return Ok(self.random_tensor(shape));
        }
        let dist = Uniform::new_inclusive(0u128, (1u128 << k) - 1);
        let len = shape.iter().product::<usize>();
        let values = (&mut self.rng)
            .sample_iter(dist)
            .take(len)
            .map(|v| RingElement::from_signed(v as i128))
            .collect();
        RingTensor::from_shape_vec(shape, values)
    }
}
