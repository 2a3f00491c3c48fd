use super::ops;
use super::tensor::Tensor;
use crate::traits::{Tensor as TensorTrait, TensorOps, TensorSoftmax, TensorSum};
use crate::SoftmaxError;

impl<'a> TensorTrait for Tensor<'a> {
    fn shape(&self) -> &[usize] {
        self.shape()
    }
}

impl<'a> TensorSoftmax<Tensor<'a>> for Tensor<'a> {
    fn softmax(x: &Self, out: &mut Self) -> Result<(), SoftmaxError> {
        ops::softmax(x, out)
    }
}

impl<'a> TensorSum<Tensor<'a>> for Tensor<'a> {
    fn sum(x: &Self) -> Result<f32, SoftmaxError> {
        Ok(ops::sum(x))
    }
}

impl<'a> TensorOps<Tensor<'a>> for Tensor<'a> {}
