use super::conv2d::{conv2d_output_shape, plain_conv2d};
use crate::{
    error::{Error, Result},
    shares::{IntRing2k, RingTensor},
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies an operator together with the parameters that change its
/// output. Triples remember the kind they were generated for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpKind {
    MatMul,
    Elementwise,
    Conv2d { stride: usize, padding: usize },
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpKind::MatMul => write!(f, "matmul"),
            OpKind::Elementwise => write!(f, "elementwise"),
            OpKind::Conv2d { stride, padding } => {
                write!(f, "conv2d(stride={stride}, padding={padding})")
            }
        }
    }
}

/// An operator that is linear in each argument separately, so that
/// `op(x, y) = op(a + d, b + e)` expands into four terms.
pub trait BilinearOp: Clone + fmt::Debug + Send + Sync {
    fn kind(&self) -> OpKind;

    /// Shape of `op(lhs, rhs)`. Fails with `ShapeMismatch` when the operands
    /// are incompatible, before anything is computed.
    fn output_shape(&self, lhs: &[usize], rhs: &[usize]) -> Result<Vec<usize>>;

    fn apply<T: IntRing2k>(&self, lhs: &RingTensor<T>, rhs: &RingTensor<T>)
        -> Result<RingTensor<T>>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MatMul;

impl BilinearOp for MatMul {
    fn kind(&self) -> OpKind {
        OpKind::MatMul
    }

    fn output_shape(&self, lhs: &[usize], rhs: &[usize]) -> Result<Vec<usize>> {
        match (lhs, rhs) {
            ([m, k1], [k2, n]) if k1 == k2 => Ok(vec![*m, *n]),
            _ => Err(Error::shape_mismatch("matmul", lhs, rhs)),
        }
    }

    fn apply<T: IntRing2k>(
        &self,
        lhs: &RingTensor<T>,
        rhs: &RingTensor<T>,
    ) -> Result<RingTensor<T>> {
        lhs.matmul(rhs)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Elementwise;

impl BilinearOp for Elementwise {
    fn kind(&self) -> OpKind {
        OpKind::Elementwise
    }

    fn output_shape(&self, lhs: &[usize], rhs: &[usize]) -> Result<Vec<usize>> {
        if lhs != rhs {
            return Err(Error::shape_mismatch("elementwise", lhs, rhs));
        }
        Ok(lhs.to_vec())
    }

    fn apply<T: IntRing2k>(
        &self,
        lhs: &RingTensor<T>,
        rhs: &RingTensor<T>,
    ) -> Result<RingTensor<T>> {
        lhs.elementwise_mul(rhs)
    }
}

/// 2-D convolution of an input `(N, C, H, W)` or `(C, H, W)` with weights
/// `(OC, C, kH, kW)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Conv2d {
    pub stride:  usize,
    pub padding: usize,
}

impl Default for Conv2d {
    fn default() -> Self {
        Self {
            stride:  1,
            padding: 0,
        }
    }
}

impl BilinearOp for Conv2d {
    fn kind(&self) -> OpKind {
        OpKind::Conv2d {
            stride:  self.stride,
            padding: self.padding,
        }
    }

    fn output_shape(&self, lhs: &[usize], rhs: &[usize]) -> Result<Vec<usize>> {
        conv2d_output_shape(lhs, rhs, self.padding, self.stride)
    }

    fn apply<T: IntRing2k>(
        &self,
        lhs: &RingTensor<T>,
        rhs: &RingTensor<T>,
    ) -> Result<RingTensor<T>> {
        plain_conv2d(lhs, rhs, self.padding, self.stride)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matmul_output_shape() {
        assert_eq!(MatMul.output_shape(&[2, 3], &[3, 5]).unwrap(), vec![2, 5]);
        assert!(matches!(
            MatMul.output_shape(&[2, 3], &[2, 3]),
            Err(Error::ShapeMismatch(_))
        ));
        assert!(MatMul.output_shape(&[6], &[6]).is_err());
    }

    #[test]
    fn test_elementwise_output_shape() {
        assert_eq!(Elementwise.output_shape(&[4, 1], &[4, 1]).unwrap(), vec![4, 1]);
        assert!(Elementwise.output_shape(&[4, 1], &[1, 4]).is_err());
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(MatMul.kind().to_string(), "matmul");
        let conv = Conv2d {
            stride:  2,
            padding: 1,
        };
        assert_eq!(conv.kind().to_string(), "conv2d(stride=2, padding=1)");
        assert_ne!(conv.kind(), Conv2d::default().kind());
    }
}
