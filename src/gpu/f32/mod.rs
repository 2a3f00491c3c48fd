/// The various ops
mod ops;
/// The Tensor struct
mod tensor;

/// The Tensor trait implementations
mod traits;

pub use ops::*;
pub use tensor::{Device, Tensor};
