use crate::gpu::f32::Tensor;
use crate::{CudaError, SoftmaxError};
use cudarc::driver::{CudaDevice, CudaFunction, DriverError, LaunchAsync, LaunchConfig};
use std::sync::Arc;

impl From<DriverError> for SoftmaxError {
    fn from(driver: DriverError) -> Self {
        Self::Cuda(CudaError::DriverError(driver))
    }
}

const SOFTMAX_PTX: &str = include_str!(concat!(env!("OUT_DIR"), "/softmax.ptx"));
const SOFTMAX_MODULE: &str = "softmax";
const SOFTMAX_KERNELS: [&str; 2] = ["softmax_f32", "sum_f32"];
// Must match SUM_BLOCK_SIZE in softmax.cu
const SUM_BLOCK_SIZE: u32 = 256;
const SUM_MAX_BLOCKS: u32 = 1024;

fn get_func(dev: &Arc<CudaDevice>, name: &'static str) -> Result<CudaFunction, SoftmaxError> {
    if !dev.has_func(SOFTMAX_MODULE, name) {
        dev.load_ptx(SOFTMAX_PTX.into(), SOFTMAX_MODULE, &SOFTMAX_KERNELS)?;
    }
    dev.get_func(SOFTMAX_MODULE, name)
        .ok_or(SoftmaxError::Cuda(CudaError::MissingKernel(name)))
}

/// Softmax on the last dimension for tensor `x`, written into `out`.
/// The kernel is queued, this does not wait for its completion.
pub fn softmax(x: &Tensor, out: &mut Tensor) -> Result<(), SoftmaxError> {
    if x.device_id() != out.device_id() {
        return Err(SoftmaxError::Cuda(CudaError::TensorOnDifferentDevice {
            got: out.device_id(),
            expected: x.device_id(),
        }));
    }
    if x.shape() != out.shape() {
        return Err(SoftmaxError::DimensionMismatch {
            expected: x.shape().to_vec(),
            got: out.shape().to_vec(),
        });
    }
    let dim = x.shape().len();
    if dim == 0 {
        return Err(SoftmaxError::InvalidRank { expected_rank: 1 });
    }
    let n = x.shape()[dim - 1];
    let rows: usize = x.shape()[..dim - 1].iter().product();

    let dev = x.cuda();
    let fwd_fn = get_func(&dev, "softmax_f32")?;
    let cfg = LaunchConfig::for_num_elems(rows as u32);
    let params = (rows, x.data(), out.data_mut(), n);
    unsafe { fwd_fn.launch(cfg, params) }?;

    Ok(())
}

/// Sum of every element of `x`, copied back to the host. Blocks until every
/// previously queued kernel is done.
pub fn sum(x: &Tensor) -> Result<f32, SoftmaxError> {
    let numel: usize = x.shape().iter().product();
    let dev = x.cuda();
    let fwd_fn = get_func(&dev, "sum_f32")?;

    let mut acc = dev.alloc_zeros::<f32>(1)?;
    let blocks = (numel as u32)
        .div_ceil(SUM_BLOCK_SIZE)
        .clamp(1, SUM_MAX_BLOCKS);
    let cfg = LaunchConfig {
        grid_dim: (blocks, 1, 1),
        block_dim: (SUM_BLOCK_SIZE, 1, 1),
        shared_mem_bytes: 0,
    };
    let params = (numel, x.data(), &mut acc);
    unsafe { fwd_fn.launch(cfg, params) }?;

    let host = dev.dtoh_sync_copy(&acc)?;
    Ok(host[0])
}
