/// The various ops
mod ops;
/// The Tensor struct
mod tensor;

/// The Tensor trait implementations
mod traits;

pub use ops::*;
pub use tensor::Tensor;
#[cfg(feature = "cuda")]
pub(crate) use tensor::nelement;
