use crate::traits::{Tensor, TensorOps};
use crate::SoftmaxError;

/// Softmax layer, normalizes along `dim` so every slice along it sums to one.
///
/// The layer is stateless, the `training` flag only mirrors the usual
/// train/eval switch of layers and has no effect on the output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Softmax {
    dim: usize,
    training: bool,
}

impl Softmax {
    /// Softmax layer creation, starts in training mode.
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            training: true,
        }
    }

    /// Switches to evaluation mode
    pub fn eval(mut self) -> Self {
        self.training = false;
        self
    }

    /// Switches to training mode
    pub fn train(mut self) -> Self {
        self.training = true;
        self
    }

    /// Whether the layer is in training mode
    pub fn is_training(&self) -> bool {
        self.training
    }

    /// The normalized dimension
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Forward pass, writes `softmax(x)` into `out`.
    pub fn forward<T: Tensor + TensorOps<T>>(&self, x: &T, out: &mut T) -> Result<(), SoftmaxError> {
        let rank = x.shape().len();
        if rank == 0 || self.dim != rank - 1 {
            return Err(SoftmaxError::UnsupportedAxis {
                dim: self.dim,
                rank,
            });
        }
        T::softmax(x, out)
    }
}
