pub mod config;
pub mod error;
pub mod tracing;

pub use config::{Config, Opt, ShareMode};
