use crate::SoftmaxError;
use rand::Rng;
use std::borrow::Cow;

/// Tensor, can own, or borrow the underlying tensor
#[derive(Clone, Debug)]
pub struct Tensor<'data> {
    shape: Vec<usize>,
    data: Cow<'data, [f32]>,
}

/// Number of elements for `shape`, refusing shapes that hold nothing and shapes
/// whose byte size does not fit in memory.
pub(crate) fn nelement(shape: &[usize]) -> Result<usize, SoftmaxError> {
    if shape.is_empty() || shape.contains(&0) {
        return Err(SoftmaxError::InvalidArgument {
            reason: format!("tensor shape {shape:?} has no elements"),
        });
    }
    shape
        .iter()
        .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
        .filter(|n| {
            n.checked_mul(std::mem::size_of::<f32>())
                .map_or(false, |bytes| bytes <= isize::MAX as usize)
        })
        .ok_or_else(|| SoftmaxError::InvalidArgument {
            reason: format!("tensor shape {shape:?} is too large"),
        })
}

impl<'data> Tensor<'data> {
    /// The shape of the tensor
    /// ```
    /// use speedy_softmax::cpu::f32::Tensor;
    ///
    /// let tensor = Tensor::zeros(vec![2, 2]).unwrap();
    /// assert_eq!(tensor.shape(), vec![2, 2]);
    /// ```
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// A slice to the underlying tensor data
    /// ```
    /// use speedy_softmax::cpu::f32::Tensor;
    ///
    /// let tensor = Tensor::zeros(vec![2, 2]).unwrap();
    /// assert_eq!(tensor.data(), vec![0.0; 4]);
    /// ```
    pub fn data(&self) -> &[f32] {
        self.data.as_ref()
    }

    /// A mutable slice to the underlying tensor data
    /// ```
    /// use speedy_softmax::cpu::f32::Tensor;
    ///
    /// let mut tensor = Tensor::zeros(vec![2, 2]).unwrap();
    /// tensor.data_mut().iter_mut().for_each(|v| *v += 1.0);
    /// assert_eq!(tensor.data(), vec![1.0; 4]);
    /// ```
    pub fn data_mut(&mut self) -> &mut [f32] {
        self.data.to_mut()
    }

    /// Creates a new nulled tensor with given shape. Fails on shapes without
    /// elements.
    /// ```
    /// use speedy_softmax::cpu::f32::Tensor;
    ///
    /// let tensor = Tensor::zeros(vec![2, 2]).unwrap();
    /// assert!(Tensor::zeros(vec![0, 2]).is_err());
    /// ```
    pub fn zeros(shape: Vec<usize>) -> Result<Self, SoftmaxError> {
        let nelement = nelement(&shape)?;
        let data = Cow::Owned(vec![0.0; nelement]);
        Ok(Self { shape, data })
    }

    /// Creates a new tensor filled with independent uniform values in `[0, 1)`.
    /// ```
    /// use rand::SeedableRng;
    /// use speedy_softmax::cpu::f32::Tensor;
    ///
    /// let mut rng = rand::rngs::StdRng::seed_from_u64(0);
    /// let tensor = Tensor::rand(vec![2, 3], &mut rng).unwrap();
    /// assert!(tensor.data().iter().all(|v| (0.0..1.0).contains(v)));
    /// ```
    pub fn rand<R: Rng + ?Sized>(shape: Vec<usize>, rng: &mut R) -> Result<Self, SoftmaxError> {
        let nelement = nelement(&shape)?;
        let data: Vec<f32> = (0..nelement).map(|_| rng.gen::<f32>()).collect();
        Ok(Self {
            shape,
            data: Cow::Owned(data),
        })
    }

    /// Creates a new borrowed tensor with given shape. Can fail if data doesn't match the shape
    /// ```
    /// use speedy_softmax::cpu::f32::Tensor;
    ///
    /// let data = [1.0, 2.0, 3.0, 4.0];
    /// let tensor = Tensor::borrowed(&data, vec![2, 2]).unwrap();
    /// ```
    pub fn borrowed(data: &'data [f32], shape: Vec<usize>) -> Result<Self, SoftmaxError> {
        let cow: Cow<'data, [f32]> = data.into();
        Self::new(cow, shape)
    }

    /// Creates a new tensor with given shape. Can fail if data doesn't match the shape
    /// or if the shape holds no elements.
    /// ```
    /// use speedy_softmax::cpu::f32::Tensor;
    ///
    /// let data = vec![1.0, 2.0, 3.0, 4.0];
    /// let tensor = Tensor::new(data, vec![2, 2]).unwrap();
    /// ```
    pub fn new<T>(data: T, shape: Vec<usize>) -> Result<Self, SoftmaxError>
    where
        T: Into<Cow<'data, [f32]>>,
    {
        let data = data.into();
        if data.len() != nelement(&shape)? {
            return Err(SoftmaxError::InvalidBuffer {
                buffer_size: data.len(),
                shape,
            });
        }
        Ok(Self { shape, data })
    }
}
