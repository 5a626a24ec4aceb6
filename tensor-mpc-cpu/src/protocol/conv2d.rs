use super::{
    beaver::{BeaverTripleProtocol, OutputSharing, Triple},
    operator::Conv2d,
};
use crate::{
    error::{Error, Result},
    shares::{IntRing2k, RingElement, RingTensor, ShareGenerator, SharedTensor},
};
use ndarray::{ArrayView4, Axis, Ix4};
use num_traits::Zero;
use rayon::prelude::*;

/// Output shape of [`plain_conv2d`], validating the operands on the way.
///
/// The input is `(N, C, H, W)` or `(C, H, W)` and keeps its rank; weights are
/// `(OC, C, kH, kW)`. Each spatial output dimension is
/// `floor((H + 2 * padding - kH) / stride) + 1`.
pub fn conv2d_output_shape(
    input: &[usize],
    weights: &[usize],
    padding: usize,
    stride: usize,
) -> Result<Vec<usize>> {
    if stride == 0 {
        return Err(Error::InvalidConvolution("stride must be at least 1".into()));
    }
    let (batch, in_channels, height, width) = match *input {
        [c, h, w] => (None, c, h, w),
        [n, c, h, w] => (Some(n), c, h, w),
        _ => {
            return Err(Error::ShapeMismatch(format!(
                "conv2d: input must be 3-D or 4-D, got {input:?}"
            )))
        }
    };
    let [out_channels, k_channels, k_height, k_width] = *weights else {
        return Err(Error::ShapeMismatch(format!(
            "conv2d: weights must be 4-D, got {weights:?}"
        )));
    };
    if k_channels != in_channels {
        return Err(Error::shape_mismatch("conv2d channels", input, weights));
    }
    let padded_h = height + 2 * padding;
    let padded_w = width + 2 * padding;
    if k_height > padded_h || k_width > padded_w {
        return Err(Error::InvalidConvolution(format!(
            "kernel {k_height}x{k_width} larger than padded input {padded_h}x{padded_w}"
        )));
    }
    let out_h = (padded_h - k_height) / stride + 1;
    let out_w = (padded_w - k_width) / stride + 1;

    Ok(match batch {
        Some(n) => vec![n, out_channels, out_h, out_w],
        None => vec![out_channels, out_h, out_w],
    })
}

fn as_4d<'a, T: IntRing2k>(
    tensor: &'a RingTensor<T>,
    what: &str,
) -> Result<ArrayView4<'a, RingElement<T>>> {
    let view = tensor.view();
    let view = if view.ndim() == 3 {
        view.insert_axis(Axis(0))
    } else {
        view
    };
    view.into_dimensionality::<Ix4>().map_err(|_| {
        Error::ShapeMismatch(format!(
            "conv2d: {what} has shape {:?}",
            tensor.shape()
        ))
    })
}

/// Plaintext sliding-window convolution with zero padding, accumulated in
/// the ring. Output planes `(batch, out_channel)` are computed in parallel.
pub fn plain_conv2d<T: IntRing2k>(
    input: &RingTensor<T>,
    weights: &RingTensor<T>,
    padding: usize,
    stride: usize,
) -> Result<RingTensor<T>> {
    let out_shape = conv2d_output_shape(input.shape(), weights.shape(), padding, stride)?;
    let x = as_4d(input, "input")?;
    let w = weights
        .view()
        .into_dimensionality::<Ix4>()
        .map_err(|e| Error::Other(e.to_string()))?;

    let (batch, in_channels, height, width) = x.dim();
    let (out_channels, _, k_height, k_width) = w.dim();
    let out_h = out_shape[out_shape.len() - 2];
    let out_w = out_shape[out_shape.len() - 1];

    let x = &x;
    let w = &w;
    let planes: Vec<Vec<RingElement<T>>> = (0..batch * out_channels)
        .into_par_iter()
        .map(|plane| {
            let (b, oc) = (plane / out_channels, plane % out_channels);
            let mut out = Vec::with_capacity(out_h * out_w);
            for i in 0..out_h {
                for j in 0..out_w {
                    let mut sum = RingElement::zero();
                    for ic in 0..in_channels {
                        for ki in 0..k_height {
                            // row in unpadded coordinates
                            let Some(row) = (i * stride + ki).checked_sub(padding) else {
                                continue;
                            };
                            if row >= height {
                                continue;
                            }
                            for kj in 0..k_width {
                                let Some(col) = (j * stride + kj).checked_sub(padding) else {
                                    continue;
                                };
                                if col >= width {
                                    continue;
                                }
                                sum += x[[b, ic, row, col]] * w[[oc, ic, ki, kj]];
                            }
                        }
                    }
                    out.push(sum);
                }
            }
            out
        })
        .collect();

    RingTensor::from_shape_vec(&out_shape, planes.into_iter().flatten().collect())
}

/// Beaver protocol specialised to [`Conv2d`].
///
/// Output shares stay split by default. `OutputSharing::Reshare` reconstructs
/// the product and shares it again, which reveals the result to whoever runs
/// it.
#[derive(Debug)]
pub struct SecureConv2d {
    protocol: BeaverTripleProtocol<Conv2d>,
}

impl SecureConv2d {
    pub fn new(stride: usize, padding: usize, generator: ShareGenerator) -> Self {
        Self {
            protocol: BeaverTripleProtocol::new(Conv2d { stride, padding }, generator),
        }
    }

    pub fn with_output_sharing(mut self, output_sharing: OutputSharing) -> Self {
        self.protocol = self.protocol.with_output_sharing(output_sharing);
        self
    }

    pub fn with_bit_length(mut self, bit_length: u32) -> Self {
        self.protocol = self.protocol.with_bit_length(bit_length);
        self
    }

    pub fn op(&self) -> &Conv2d {
        self.protocol.op()
    }

    pub fn generate_triplets<T: IntRing2k>(
        &mut self,
        input_shape: &[usize],
        weight_shape: &[usize],
    ) -> Result<Triple<T>> {
        self.protocol.generate_triplets(input_shape, weight_shape)
    }

    /// Shares of `conv(input, weights)` using a fresh triple.
    pub fn forward<T: IntRing2k>(
        &mut self,
        input: &SharedTensor<T>,
        weights: &SharedTensor<T>,
    ) -> Result<SharedTensor<T>> {
        self.protocol.call(input, weights)
    }

    pub fn forward_with_triple<T: IntRing2k>(
        &mut self,
        input: &SharedTensor<T>,
        weights: &SharedTensor<T>,
        triple: Triple<T>,
    ) -> Result<SharedTensor<T>> {
        self.protocol.multiply(input, weights, triple)
    }
}
