use crate::{
    error::{Error, Result},
    shares::{IntRing2k, RingElement, RingTensor},
};

/// Maps reals to ring elements as integers scaled by `2^(scale * precision_bits)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedPointEncoder {
    scale:          u32,
    precision_bits: u32,
}

impl Default for FixedPointEncoder {
    fn default() -> Self {
        Self {
            scale:          1,
            precision_bits: 16,
        }
    }
}

impl FixedPointEncoder {
    pub fn new(scale: u32, precision_bits: u32) -> Result<Self> {
        let bits = scale
            .checked_mul(precision_bits)
            .ok_or(Error::InvalidBitLength(u32::MAX))?;
        if bits >= 127 {
            return Err(Error::InvalidBitLength(bits));
        }
        Ok(Self {
            scale,
            precision_bits,
        })
    }

    /// Number of fractional bits.
    pub fn fractional_bits(&self) -> u32 {
        self.scale * self.precision_bits
    }

    pub fn factor(&self) -> i128 {
        1i128 << self.fractional_bits()
    }

    /// Scales and truncates toward zero, then reduces into the ring.
    pub fn encode_value<T: IntRing2k>(&self, value: f64) -> RingElement<T> {
        RingElement::from_signed((value * self.factor() as f64).trunc() as i128)
    }

    /// Inverse of [`Self::encode_value`] on the signed representative. The
    /// integer part is a floor division so negative values and exact
    /// multiples of the factor decode exactly.
    pub fn decode_value<T: IntRing2k>(&self, value: RingElement<T>) -> f64 {
        let factor = self.factor();
        let v = value.to_signed();
        v.div_euclid(factor) as f64 + v.rem_euclid(factor) as f64 / factor as f64
    }

    pub fn encode<T: IntRing2k>(&self, values: &[f64], shape: &[usize]) -> Result<RingTensor<T>> {
        RingTensor::from_shape_vec(
            shape,
            values.iter().map(|v| self.encode_value(*v)).collect(),
        )
    }

    pub fn decode<T: IntRing2k>(&self, tensor: &RingTensor<T>) -> Vec<f64> {
        tensor.iter().map(|v| self.decode_value(*v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_known_encodings() {
        let enc = FixedPointEncoder::default();
        let t = enc.encode::<u64>(&[3.5, -2.25, 0.0], &[3]).unwrap();
        assert_eq!(t.to_signed_vec(), vec![229376, -147456, 0]);
        assert_eq!(enc.decode(&t), vec![3.5, -2.25, 0.0]);
    }

    #[rstest]
    #[case(1.0)]
    #[case(-1.0)]
    #[case(-3.0)]
    #[case(0.1)]
    #[case(-0.1)]
    #[case(1234.56789)]
    #[case(-1234.56789)]
    fn test_decode_within_one_unit(#[case] x: f64) {
        let enc = FixedPointEncoder::default();
        let unit = 1.0 / enc.factor() as f64;
        let y = enc.decode_value(enc.encode_value::<u64>(x));
        assert!((y - x).abs() <= unit, "{x} decoded as {y}");
    }

    #[test]
    fn test_scale_multiplies_precision() {
        let enc = FixedPointEncoder::new(2, 8).unwrap();
        assert_eq!(enc.factor(), 1 << 16);
        assert_eq!(enc.encode_value::<u32>(-1.0).to_signed(), -(1 << 16));
        assert!(FixedPointEncoder::new(8, 16).is_err());
    }

    #[test]
    fn test_encode_shape_is_checked() {
        let enc = FixedPointEncoder::default();
        assert!(matches!(
            enc.encode::<u64>(&[1.0, 2.0], &[3]),
            Err(Error::ShapeMismatch(_))
        ));
    }
}
