//! Measures how often the two shares of a value carry the same sign, for
//! images shared with each strategy and pushed through a secure convolution.

use crate::{
    error::{Error, Result},
    protocol::{conv2d::plain_conv2d, SecureConv2d},
    shares::{IntRing2k, ShareGenerator, ShareMode},
};
use serde::{Deserialize, Serialize};
use tensor_mpc_common::Config;
use tracing::{info, warn};

/// Bits per pixel of the synthetic images.
const PIXEL_BITS: u32 = 8;

/// Pixel width that keeps every pixel non-negative in `Z/2^K`. The top bit of
/// the ring is the sign, so narrow rings get one bit less than
/// [`PIXEL_BITS`].
fn pixel_bits<T: IntRing2k>() -> u32 {
    PIXEL_BITS.min(T::K as u32 - 1)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LeakageReport {
    pub trials:                        usize,
    pub ring_bits:                     u32,
    pub input_share_mode:              ShareMode,
    /// Elements per convolution output.
    pub output_len:                    usize,
    /// Mean same-sign positions per trial in the shared input image.
    pub input_same_sign_mean:          f64,
    /// Mean same-sign positions per trial in the convolution output, weights
    /// shared with `same_sign`.
    pub same_sign_weights_output_mean: f64,
    /// Same as above with uniformly shared weights.
    pub uniform_weights_output_mean:   f64,
    /// Trials whose secure output did not reconstruct to the plaintext one.
    pub mismatched_trials:             usize,
}

impl LeakageReport {
    pub fn same_sign_weights_output_fraction(&self) -> f64 {
        fraction(self.same_sign_weights_output_mean, self.output_len)
    }

    pub fn uniform_weights_output_fraction(&self) -> f64 {
        fraction(self.uniform_weights_output_mean, self.output_len)
    }
}

fn fraction(mean: f64, len: usize) -> f64 {
    if len == 0 {
        0.0
    } else {
        mean / len as f64
    }
}

/// Runs `config.trials` trials in the ring `Z/2^K` of `T`.
///
/// Each trial shares a fresh non-negative image in `config.share_mode` and
/// convolves it with one fixed plaintext kernel, once shared `same_sign` and
/// once shared uniformly.
pub fn run_trials<T: IntRing2k>(
    config: &Config,
    generator: &mut ShareGenerator,
) -> Result<LeakageReport> {
    let image_shape = [config.image_channels, config.image_size, config.image_size];
    let weight_shape = [
        config.out_channels,
        config.image_channels,
        config.kernel_size,
        config.kernel_size,
    ];

    let weights = generator.random_kbit_tensor::<T>(&weight_shape, config.bit_length)?;
    let same_sign_weights = generator.share_same_sign(&weights)?;
    let uniform_weights = generator.share_uniform(&weights)?;

    let mut same_sign_conv = SecureConv2d::new(config.stride, config.padding, generator.fork())
        .with_bit_length(config.bit_length);
    let mut uniform_conv = SecureConv2d::new(config.stride, config.padding, generator.fork())
        .with_bit_length(config.bit_length);

    let bits_per_pixel = pixel_bits::<T>();
    if bits_per_pixel < PIXEL_BITS {
        warn!(
            ring_bits = T::K,
            bits_per_pixel, "Ring too narrow for {PIXEL_BITS}-bit pixels, sampling fewer bits"
        );
    }

    let log_every = (config.trials / 10).max(1);
    let (mut input_total, mut same_sign_total, mut uniform_total) = (0usize, 0usize, 0usize);
    let mut mismatched_trials = 0;
    let mut output_len = 0;

    for i in 0..config.trials {
        let image = generator.random_positive_kbit_tensor::<T>(&image_shape, bits_per_pixel)?;
        let shared_image = generator.share(&image, config.share_mode)?;

        let same_sign_result = same_sign_conv.forward(&shared_image, &same_sign_weights)?;
        let uniform_result = uniform_conv.forward(&shared_image, &uniform_weights)?;

        let expected = plain_conv2d(&image, &weights, config.padding, config.stride)?;
        if same_sign_result.reconstruct() != expected || uniform_result.reconstruct() != expected
        {
            warn!(trial = i, "Secure convolution disagrees with plaintext");
            mismatched_trials += 1;
        }

        let input_count = shared_image.same_sign_count();
        let same_sign_count = same_sign_result.same_sign_count();
        let uniform_count = uniform_result.same_sign_count();
        input_total += input_count;
        same_sign_total += same_sign_count;
        uniform_total += uniform_count;
        output_len = expected.len();

        if i % log_every == 0 {
            info!(
                trial = i,
                input = input_count,
                same_sign = same_sign_count,
                uniform = uniform_count,
                "Same-sign positions"
            );
        }
    }

    let mean = |total: usize| {
        if config.trials == 0 {
            0.0
        } else {
            total as f64 / config.trials as f64
        }
    };
    let report = LeakageReport {
        trials: config.trials,
        ring_bits: T::K as u32,
        input_share_mode: config.share_mode,
        output_len,
        input_same_sign_mean: mean(input_total),
        same_sign_weights_output_mean: mean(same_sign_total),
        uniform_weights_output_mean: mean(uniform_total),
        mismatched_trials,
    };
    info!(
        trials = report.trials,
        same_sign = report.same_sign_weights_output_mean,
        uniform = report.uniform_weights_output_mean,
        "Finished sign leakage trials"
    );
    Ok(report)
}

/// Picks the ring from `config.ring_bits` and runs the trials in it.
pub fn run(config: &Config, generator: &mut ShareGenerator) -> Result<LeakageReport> {
    match config.ring_bits {
        8 => run_trials::<u8>(config, generator),
        16 => run_trials::<u16>(config, generator),
        32 => run_trials::<u32>(config, generator),
        64 => run_trials::<u64>(config, generator),
        128 => run_trials::<u128>(config, generator),
        other => Err(Error::Common(tensor_mpc_common::error::Error::Config(
            format!("unsupported ring size 2^{other}"),
        ))),
    }
}
