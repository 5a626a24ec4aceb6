use super::{int_ring::IntRing2k, ring_impl::RingElement};
use crate::error::{Error, Result};
use itertools::izip;
use ndarray::{ArrayD, ArrayView2, ArrayViewD, Ix2, IxDyn, Zip};
use rayon::prelude::*;
use std::ops::{Add, Sub};

/// Dense n-dimensional tensor of ring elements.
///
/// The shape is fixed at construction. Every operation returns a new tensor
/// and checks shapes before touching any element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RingTensor<T: IntRing2k>(ArrayD<RingElement<T>>);

impl<T: IntRing2k> RingTensor<T> {
    pub fn from_array(array: ArrayD<RingElement<T>>) -> Self {
        RingTensor(array)
    }

    /// Builds a tensor from row-major values.
    pub fn from_shape_vec(shape: &[usize], values: Vec<RingElement<T>>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != values.len() {
            return Err(Error::ShapeMismatch(format!(
                "shape {shape:?} needs {expected} values, got {}",
                values.len()
            )));
        }
        ArrayD::from_shape_vec(IxDyn(shape), values)
            .map(RingTensor)
            .map_err(|e| Error::Other(e.to_string()))
    }

    /// Embeds signed integers into the ring, wrapping modulo 2^K.
    pub fn from_signed(shape: &[usize], values: &[i64]) -> Result<Self> {
        let values = values
            .iter()
            .map(|v| RingElement::from_signed(*v as i128))
            .collect();
        Self::from_shape_vec(shape, values)
    }

    pub fn zeros(shape: &[usize]) -> Self {
        RingTensor(ArrayD::zeros(IxDyn(shape)))
    }

    pub fn shape(&self) -> &[usize] {
        self.0.shape()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RingElement<T>> {
        self.0.iter()
    }

    pub fn view(&self) -> ArrayViewD<'_, RingElement<T>> {
        self.0.view()
    }

    /// Signed representatives in row-major order.
    pub fn to_signed_vec(&self) -> Vec<i128> {
        self.0.iter().map(|x| x.to_signed()).collect()
    }

    pub(crate) fn check_same_shape(&self, rhs: &Self, op: &str) -> Result<()> {
        if self.shape() != rhs.shape() {
            return Err(Error::shape_mismatch(op, self.shape(), rhs.shape()));
        }
        Ok(())
    }

    fn zip_with<F>(&self, rhs: &Self, op: &str, f: F) -> Result<Self>
    where
        F: Fn(RingElement<T>, RingElement<T>) -> RingElement<T>,
    {
        self.check_same_shape(rhs, op)?;
        Ok(RingTensor(
            Zip::from(&self.0)
                .and(&rhs.0)
                .map_collect(|a, b| f(*a, *b)),
        ))
    }

    pub fn add(&self, rhs: &Self) -> Result<Self> {
        self.zip_with(rhs, "add", |a, b| a + b)
    }

    pub fn sub(&self, rhs: &Self) -> Result<Self> {
        self.zip_with(rhs, "sub", |a, b| a - b)
    }

    pub fn elementwise_mul(&self, rhs: &Self) -> Result<Self> {
        self.zip_with(rhs, "elementwise_mul", |a, b| a * b)
    }

    pub fn neg(&self) -> Self {
        RingTensor(self.0.mapv(|a| -a))
    }

    fn as_matrix(&self, op: &str) -> Result<ArrayView2<'_, RingElement<T>>> {
        self.0.view().into_dimensionality::<Ix2>().map_err(|_| {
            Error::ShapeMismatch(format!(
                "{op}: expected a matrix, got shape {:?}",
                self.shape()
            ))
        })
    }

    /// Matrix product of an `m x k` and a `k x n` tensor. Rows of the result
    /// are computed in parallel.
    pub fn matmul(&self, rhs: &Self) -> Result<Self> {
        let lhs_m = self.as_matrix("matmul")?;
        let rhs_m = rhs.as_matrix("matmul")?;
        let (m, k) = lhs_m.dim();
        let (k2, n) = rhs_m.dim();
        if k != k2 {
            return Err(Error::shape_mismatch("matmul", self.shape(), rhs.shape()));
        }

        let lhs_m = &lhs_m;
        let rhs_m = &rhs_m;
        let rows: Vec<Vec<RingElement<T>>> = (0..m)
            .into_par_iter()
            .map(|i| {
                let row = lhs_m.row(i);
                (0..n)
                    .map(|j| {
                        izip!(row.iter(), rhs_m.column(j).iter())
                            .map(|(a, b)| *a * b)
                            .sum()
                    })
                    .collect()
            })
            .collect();

        Self::from_shape_vec(&[m, n], rows.into_iter().flatten().collect())
    }
}

impl<T: IntRing2k> Add for &RingTensor<T> {
    type Output = Result<RingTensor<T>>;

    fn add(self, rhs: Self) -> Self::Output {
        RingTensor::add(self, rhs)
    }
}

impl<T: IntRing2k> Sub for &RingTensor<T> {
    type Output = Result<RingTensor<T>>;

    fn sub(self, rhs: Self) -> Self::Output {
        RingTensor::sub(self, rhs)
    }
}
