use thiserror::Error;

/// An Error enum capturing the errors produced by this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Operand shapes are incompatible with the requested operator
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),
    /// Convolution parameters do not produce a valid output
    #[error("Invalid convolution: {0}")]
    InvalidConvolution(String),
    /// Bit length for random material is out of range
    #[error("Invalid bit length {0}")]
    InvalidBitLength(u32),
    /// A triple was offered to a computation it was not generated for
    #[error("Protocol misuse: {0}")]
    ProtocolMisuse(String),
    /// Invalid party id provided
    #[error("Invalid Party id {0}")]
    Id(usize),
    /// Error from the common crate, e.g. an unknown share mode
    #[error(transparent)]
    Common(#[from] tensor_mpc_common::error::Error),
    /// Error from the eyre crate
    #[error(transparent)]
    Eyre(#[from] eyre::Report),
    /// Some other error has occurred.
    #[error("Err: {0}")]
    Other(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub(crate) fn shape_mismatch(op: &str, lhs: &[usize], rhs: &[usize]) -> Self {
        Self::ShapeMismatch(format!("{op}: {lhs:?} vs {rhs:?}"))
    }
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
