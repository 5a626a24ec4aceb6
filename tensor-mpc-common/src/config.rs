use crate::error::Error;
use clap::Parser;
use eyre::Result;
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf, str::FromStr};

pub const ENV_PREFIX: &str = "TENSOR_MPC";

/// Bit widths with a native ring implementation.
pub const SUPPORTED_RING_BITS: [u32; 5] = [8, 16, 32, 64, 128];

/// Strategy used to split a plaintext tensor into two additive shares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareMode {
    /// First share uniform over the whole ring. Hides the secret.
    #[default]
    Uniform,
    /// First share is `floor(secret * m)` for a uniform real `m` in `[0, 1)`.
    /// Both shares tend to keep the sign of the secret, so this mode leaks on
    /// purpose and must never be used to protect data.
    SameSign,
}

impl ShareMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShareMode::Uniform => "uniform",
            ShareMode::SameSign => "same_sign",
        }
    }
}

impl fmt::Display for ShareMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShareMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uniform" => Ok(ShareMode::Uniform),
            "same_sign" | "same-sign" => Ok(ShareMode::SameSign),
            other => Err(Error::InvalidShareMode(other.to_string())),
        }
    }
}

#[derive(Debug, Default, Parser)]
pub struct Opt {
    #[clap(long)]
    pub trials: Option<usize>,

    #[clap(long)]
    pub ring_bits: Option<u32>,

    #[clap(long)]
    pub bit_length: Option<u32>,

    #[clap(long)]
    pub share_mode: Option<ShareMode>,

    #[clap(long)]
    pub stride: Option<usize>,

    #[clap(long)]
    pub padding: Option<usize>,

    #[clap(long)]
    pub seed: Option<u64>,

    #[clap(long)]
    pub report_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// log2 of the ring size, the ring is Z/2^ring_bits.
    #[serde(default = "default_ring_bits")]
    pub ring_bits: u32,

    /// Bit length of the random material used for Beaver triples.
    #[serde(default = "default_bit_length")]
    pub bit_length: u32,

    /// Sharing strategy for the experiment inputs.
    #[serde(default)]
    pub share_mode: ShareMode,

    #[serde(default = "default_stride")]
    pub stride: usize,

    #[serde(default)]
    pub padding: usize,

    #[serde(default = "default_trials")]
    pub trials: usize,

    #[serde(default = "default_image_channels")]
    pub image_channels: usize,

    #[serde(default = "default_image_size")]
    pub image_size: usize,

    #[serde(default = "default_out_channels")]
    pub out_channels: usize,

    #[serde(default = "default_kernel_size")]
    pub kernel_size: usize,

    /// Fixed seed for reproducible runs; OS entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,

    #[serde(default)]
    pub report_path: Option<PathBuf>,
}

fn default_ring_bits() -> u32 {
    64
}

fn default_bit_length() -> u32 {
    64
}

fn default_stride() -> usize {
    1
}

fn default_trials() -> usize {
    100
}

fn default_image_channels() -> usize {
    3
}

fn default_image_size() -> usize {
    32
}

fn default_out_channels() -> usize {
    3
}

fn default_kernel_size() -> usize {
    3
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ring_bits: default_ring_bits(),
            bit_length: default_bit_length(),
            share_mode: ShareMode::default(),
            stride: default_stride(),
            padding: 0,
            trials: default_trials(),
            image_channels: default_image_channels(),
            image_size: default_image_size(),
            out_channels: default_out_channels(),
            kernel_size: default_kernel_size(),
            seed: None,
            report_path: None,
        }
    }
}

impl Config {
    /// Reads the configuration from environment variables of the form
    /// `{prefix}__RING_BITS`.
    pub fn load_config(prefix: &str) -> Result<Config> {
        let settings = config::Config::builder();
        let settings = settings
            .add_source(
                config::Environment::with_prefix(prefix)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = settings.try_deserialize::<Config>()?;
        config.validate()?;
        Ok(config)
    }

    pub fn overwrite_defaults_with_cli_args(&mut self, opts: Opt) {
        if let Some(trials) = opts.trials {
            self.trials = trials;
        }
        if let Some(ring_bits) = opts.ring_bits {
            self.ring_bits = ring_bits;
        }
        if let Some(bit_length) = opts.bit_length {
            self.bit_length = bit_length;
        }
        if let Some(share_mode) = opts.share_mode {
            self.share_mode = share_mode;
        }
        if let Some(stride) = opts.stride {
            self.stride = stride;
        }
        if let Some(padding) = opts.padding {
            self.padding = padding;
        }
        if opts.seed.is_some() {
            self.seed = opts.seed;
        }
        if opts.report_path.is_some() {
            self.report_path = opts.report_path;
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !SUPPORTED_RING_BITS.contains(&self.ring_bits) {
            return Err(Error::Config(format!(
                "ring_bits must be one of {:?}, got {}",
                SUPPORTED_RING_BITS, self.ring_bits
            )));
        }
        if self.bit_length == 0 {
            return Err(Error::Config("bit_length must be at least 1".to_string()));
        }
        if self.stride == 0 {
            return Err(Error::Config("stride must be at least 1".to_string()));
        }
        if self.kernel_size == 0 || self.image_channels == 0 || self.out_channels == 0 {
            return Err(Error::Config(
                "kernel_size, image_channels and out_channels must be non-zero".to_string(),
            ));
        }
        if self.image_size + 2 * self.padding < self.kernel_size {
            return Err(Error::Config(format!(
                "kernel of size {} does not fit a padded image of size {}",
                self.kernel_size,
                self.image_size + 2 * self.padding
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("uniform", ShareMode::Uniform)]
    #[case("same_sign", ShareMode::SameSign)]
    #[case("same-sign", ShareMode::SameSign)]
    fn test_share_mode_from_str(#[case] input: &str, #[case] expected: ShareMode) {
        assert_eq!(input.parse::<ShareMode>().unwrap(), expected);
    }

    #[test]
    fn test_share_mode_rejects_unknown() {
        let err = "gaussian".parse::<ShareMode>().unwrap_err();
        assert!(matches!(err, Error::InvalidShareMode(ref s) if s == "gaussian"));
    }

    #[test]
    fn test_load_config_from_env() {
        std::env::set_var("TENSOR_MPC_CFG_TEST__RING_BITS", "16");
        std::env::set_var("TENSOR_MPC_CFG_TEST__SHARE_MODE", "same_sign");
        std::env::set_var("TENSOR_MPC_CFG_TEST__PADDING", "1");

        let config = Config::load_config("TENSOR_MPC_CFG_TEST").unwrap();
        assert_eq!(config.ring_bits, 16);
        assert_eq!(config.share_mode, ShareMode::SameSign);
        assert_eq!(config.padding, 1);
        assert_eq!(config.bit_length, 64);
        assert_eq!(config.stride, 1);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn test_load_config_rejects_invalid_ring() {
        std::env::set_var("TENSOR_MPC_CFG_BAD__RING_BITS", "12");
        assert!(Config::load_config("TENSOR_MPC_CFG_BAD").is_err());
    }

    #[test]
    fn test_cli_args_override_defaults() {
        let mut config = Config::default();
        config.overwrite_defaults_with_cli_args(Opt {
            trials: Some(7),
            share_mode: Some(ShareMode::SameSign),
            stride: Some(2),
            ..Default::default()
        });
        assert_eq!(config.trials, 7);
        assert_eq!(config.share_mode, ShareMode::SameSign);
        assert_eq!(config.stride, 2);
        assert_eq!(config.ring_bits, 64);
    }

    #[rstest]
    #[case(Config { stride: 0, ..Config::default() })]
    #[case(Config { bit_length: 0, ..Config::default() })]
    #[case(Config { kernel_size: 40, ..Config::default() })]
    fn test_validate_rejects(#[case] config: Config) {
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
