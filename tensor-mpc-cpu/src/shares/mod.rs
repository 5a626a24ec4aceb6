pub mod generator;
pub(crate) mod int_ring;
pub(crate) mod ring_impl;
pub mod share;
pub mod tensor;

pub use generator::ShareGenerator;
pub use int_ring::IntRing2k;
pub use ring_impl::RingElement;
pub use share::SharedTensor;
pub use tensor::RingTensor;
pub use tensor_mpc_common::ShareMode;
