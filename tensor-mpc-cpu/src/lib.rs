pub mod analysis;
pub mod error;
pub mod execution;
pub mod fixed_point;
pub mod network;
pub mod protocol;
pub mod shares;

pub use error::{Error, Result};
