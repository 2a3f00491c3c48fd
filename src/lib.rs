#![deny(missing_docs)]
//! # What is speedy-softmax ?
//!
//! A micro-benchmark measuring how long a row-wise softmax takes on a batch of
//! random vectors, and how much memory bandwidth that represents.
//!
//! It carries its own small tensors and fused softmax kernels so the numbers
//! measure the kernel, not a framework.
//!
//! # Running the benchmark
//!
//! ```bash
//! # Defaults: 128 x 1024 batch, 1000 repetitions on the cpu
//! cargo run --release
//!
//! # Multithreaded cpu kernel with the approximate exp
//! cargo run --release --features rayon,fast-math -- --batch-size 1024 --input-dim 512
//!
//! # Cuda
//! cargo run --release --features cuda -- --device cuda:0
//! ```
//!
//! The output looks like
//!
//! ```text
//! Softmax batch_size: 128 input_dim: 1024
//! Torch-cpu: 0.1234 ms  [7.91 GB/s]
//! ```
//!
//! The `Torch-` prefix keeps the report comparable to the PyTorch reference runs.
//!
//! # The architecture of this library:
//!
//! - [cpu] contains the host tensor and kernels.
//! - `gpu` (feature `cuda`) contains the cuda tensor and kernels.
//! - [traits] contains the glue that allows [nn] and [bench] to be written
//!   independently of the backend.
//! - [nn] contains the [nn::layers::Softmax] operator.
//! - [bench] is the timing harness itself.
//!
//! # How does the timing loop look like:
//!
//! ```ignore
//! let softmax = Softmax::new(1).eval();
//! let start = Instant::now();
//! for _ in 0..num_reps {
//!     softmax.forward(&batch, &mut out)?;
//! }
//! // Blocks until every queued kernel is done.
//! let checksum = T::sum(&out)?;
//! let elapsed = start.elapsed();
//! ```

/// The bench harness
pub mod bench;

/// The various CPU implementations
pub mod cpu;

/// Device identifiers
pub mod device;

/// The various GPU implementations
#[cfg(feature = "cuda")]
pub mod gpu;

/// The neural networks layers
pub mod nn;

/// The traits for generic implementations
pub mod traits;

/// Potential errors when using the library
#[derive(Debug, thiserror::Error)]
pub enum SoftmaxError {
    /// The requested device identifier does not map to a usable device.
    #[error("device `{device}` is unavailable: {reason}")]
    DeviceUnavailable {
        /// The identifier as requested
        device: String,
        /// Why it could not be used
        reason: String,
    },

    /// An argument is outside of what the operation accepts (zero sized shapes,
    /// zero repetitions).
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// What was wrong
        reason: String,
    },

    /// The arguments to the tensor creation are invalid, the shape doesn't match
    /// the size of the buffer.
    #[error("buffer of size {buffer_size} does not match shape {shape:?}")]
    InvalidBuffer {
        /// The size of the buffer sent
        buffer_size: usize,
        /// The shape of the tensor to create
        shape: Vec<usize>,
    },

    /// The operation could not succeed because the shapes are not valid.
    #[error("dimension mismatch: expected {expected:?}, got {got:?}")]
    DimensionMismatch {
        /// The shape that we should have seen
        expected: Vec<usize>,
        /// The shape that we received
        got: Vec<usize>,
    },

    /// The tensor given has not the expected rank (rank 2 means a tensor that has a shape of length 2)
    #[error("invalid rank, expected {expected_rank}")]
    InvalidRank {
        /// The rank that we expect
        expected_rank: usize,
    },

    /// The softmax was asked to normalize along an axis the kernels do not handle.
    /// Only the last axis is supported.
    #[error("softmax along dim {dim} is unsupported for a rank {rank} tensor, only the last dim is")]
    UnsupportedAxis {
        /// The requested axis
        dim: usize,
        /// The rank of the tensor
        rank: usize,
    },

    /// Error from the cuda backend
    #[error("cuda error: {0:?}")]
    Cuda(CudaError),
}

/// All potential errors linked specifically to cuda.
#[derive(Debug)]
pub enum CudaError {
    /// Tried an operation with tensors on different devices.
    TensorOnDifferentDevice {
        /// The device of the offending tensor
        got: usize,
        /// The device of the first tensor
        expected: usize,
    },
    /// A kernel was missing from the loaded ptx module.
    MissingKernel(&'static str),
    /// Error with cuda driver.
    #[cfg(feature = "cuda")]
    DriverError(cudarc::driver::DriverError),
}

#[cfg(test)]
mod tests {
    /// Allowed distance to 4 decimals reference values. `fast_math::exp` is an
    /// approximation and drifts by about 1e-4.
    #[cfg(not(feature = "fast-math"))]
    pub(crate) const TOLERANCE: f32 = 1e-4;
    #[cfg(feature = "fast-math")]
    pub(crate) const TOLERANCE: f32 = 5e-4;

    pub(crate) fn assert_close(got: &[f32], expected: &[f32]) {
        assert_eq!(got.len(), expected.len(), "{got:?} {expected:?}");
        for (g, e) in got.iter().zip(expected) {
            assert!((g - e).abs() < TOLERANCE, "{got:?} != {expected:?}");
        }
    }

    /// Every row is a probability distribution.
    pub(crate) fn assert_rows_normalized(data: &[f32], n: usize) {
        for row in data.chunks_exact(n) {
            assert!(row.iter().all(|&v| v >= 0.0), "{row:?}");
            let sum: f32 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5, "{sum} {row:?}");
        }
    }
}
