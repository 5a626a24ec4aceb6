pub mod beaver;
pub mod conv2d;
pub mod operator;
pub mod prf;
pub mod two_party;

pub use beaver::{BeaverTripleProtocol, OutputSharing, Triple, TripleShare};
pub use conv2d::{conv2d_output_shape, plain_conv2d, SecureConv2d};
pub use operator::{BilinearOp, Conv2d, Elementwise, MatMul, OpKind};
