use crate::cpu::f32::Tensor as CpuTensor;
use crate::SoftmaxError;
use cudarc::driver::{CudaDevice, CudaSlice};
use rand::Rng;
use std::sync::Arc;

/// A cuda device, cheap to clone
#[derive(Clone)]
pub struct Device {
    device: Arc<CudaDevice>,
    ordinal: usize,
}

impl Device {
    /// Opens the cuda device `ordinal`. Fails with [SoftmaxError::DeviceUnavailable]
    /// when the driver cannot open it.
    pub fn new(ordinal: usize) -> Result<Self, SoftmaxError> {
        let device =
            CudaDevice::new(ordinal).map_err(|err| SoftmaxError::DeviceUnavailable {
                device: format!("cuda:{ordinal}"),
                reason: format!("{err:?}"),
            })?;
        Ok(Self { device, ordinal })
    }

    /// The underlying [CudaDevice]
    pub fn cuda(&self) -> &Arc<CudaDevice> {
        &self.device
    }

    /// The device ordinal
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Blocks until all the work queued on the device is done.
    pub fn synchronize(&self) -> Result<(), SoftmaxError> {
        self.device.synchronize()?;
        Ok(())
    }
}

/// Tensor living on a cuda device
pub struct Tensor {
    shape: Vec<usize>,
    device: Device,
    data: CudaSlice<f32>,
}

impl Tensor {
    /// The shape of the tensor
    /// ```no_run
    /// use speedy_softmax::gpu::f32::{Device, Tensor};
    ///
    /// let device = Device::new(0).unwrap();
    /// let tensor = Tensor::zeros(vec![2, 2], &device).unwrap();
    /// assert_eq!(tensor.shape(), vec![2, 2]);
    /// ```
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// The [CudaSlice] holding the data
    pub fn data(&self) -> &CudaSlice<f32> {
        &self.data
    }

    /// A mutable borrow of [CudaSlice] holding the data
    pub fn data_mut(&mut self) -> &mut CudaSlice<f32> {
        &mut self.data
    }

    /// The device of the tensor
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// The device ordinal
    pub fn device_id(&self) -> usize {
        self.device.ordinal()
    }

    pub(crate) fn cuda(&self) -> Arc<CudaDevice> {
        self.device.cuda().clone()
    }

    /// Creates a new nulled tensor with given shape
    pub fn zeros(shape: Vec<usize>, device: &Device) -> Result<Self, SoftmaxError> {
        let nelement = crate::cpu::f32::nelement(&shape)?;
        let data: CudaSlice<f32> = device.cuda().alloc_zeros(nelement)?;
        Ok(Self {
            shape,
            device: device.clone(),
            data,
        })
    }

    /// Creates a tensor from host data, copying it to the device.
    pub fn from_cpu(data: &[f32], shape: Vec<usize>, device: &Device) -> Result<Self, SoftmaxError> {
        if data.len() != crate::cpu::f32::nelement(&shape)? {
            return Err(SoftmaxError::InvalidBuffer {
                buffer_size: data.len(),
                shape,
            });
        }
        let data = device.cuda().htod_sync_copy(data)?;
        Ok(Self {
            shape,
            device: device.clone(),
            data,
        })
    }

    /// Creates a tensor filled with independent uniform values in `[0, 1)`.
    /// The values are drawn on the host and uploaded.
    pub fn rand<R: Rng + ?Sized>(
        shape: Vec<usize>,
        rng: &mut R,
        device: &Device,
    ) -> Result<Self, SoftmaxError> {
        let host = CpuTensor::rand(shape.clone(), rng)?;
        Self::from_cpu(host.data(), shape, device)
    }

    /// Returns a cpu vec containing copied data from the device.
    pub fn cpu_data(&self) -> Result<Vec<f32>, SoftmaxError> {
        let cpu_data = self.device.cuda().dtoh_sync_copy(&self.data)?;
        Ok(cpu_data)
    }
}
