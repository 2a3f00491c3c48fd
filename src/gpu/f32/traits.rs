use super::ops;
use super::tensor::Tensor;
use crate::traits::{Tensor as TensorTrait, TensorOps, TensorSoftmax, TensorSum};
use crate::SoftmaxError;

impl TensorTrait for Tensor {
    fn shape(&self) -> &[usize] {
        self.shape()
    }
}

impl TensorSoftmax<Tensor> for Tensor {
    fn softmax(x: &Self, out: &mut Self) -> Result<(), SoftmaxError> {
        ops::softmax(x, out)
    }
}

impl TensorSum<Tensor> for Tensor {
    fn sum(x: &Self) -> Result<f32, SoftmaxError> {
        ops::sum(x)
    }
}

impl TensorOps<Tensor> for Tensor {}
