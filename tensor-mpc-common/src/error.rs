use thiserror::Error;

/// An Error enum capturing the errors produced by this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Unknown sharing strategy selector
    #[error("Invalid share mode {0:?}, expected \"uniform\" or \"same_sign\"")]
    InvalidShareMode(String),
    /// Config Error
    #[error("Invalid configuration: {0}")]
    Config(String),
    /// Some other error has occurred.
    #[error("Err: {0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(mes: String) -> Self {
        Self::Other(mes)
    }
}

impl From<&str> for Error {
    fn from(mes: &str) -> Self {
        Self::Other(mes.to_owned())
    }
}
