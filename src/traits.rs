use crate::SoftmaxError;

/// A tensor of f32 living on some device
pub trait Tensor {
    /// The shape of the tensor
    fn shape(&self) -> &[usize];
}

/// All common tensor operations
pub trait TensorOps<T>: TensorSoftmax<T> + TensorSum<T> {}

/// Softmax along the last dimension
pub trait TensorSoftmax<T> {
    /// Writes `softmax(x)` into `out`, `x` is left untouched.
    fn softmax(x: &T, out: &mut T) -> Result<(), SoftmaxError>;
}

/// Full reduction back to the host
pub trait TensorSum<T> {
    /// Sum of every element of `x`. This blocks until all the work queued on the
    /// device is complete, so it doubles as a synchronization point.
    fn sum(x: &T) -> Result<f32, SoftmaxError>;
}
