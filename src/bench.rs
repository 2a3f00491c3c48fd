use crate::device::Device;
use crate::nn::layers::Softmax;
use crate::traits::{Tensor, TensorOps};
use crate::SoftmaxError;
use std::fmt;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

/// Size of one element of the benchmarked tensors.
pub const ELEMENT_SIZE: usize = std::mem::size_of::<f32>();

const GIB: f64 = (1u64 << 30) as f64;

/// What to benchmark
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BenchConfig {
    /// Rows in the input batch
    pub batch_size: usize,
    /// Columns of the input batch
    pub input_dim: usize,
    /// Number of timed calls
    pub num_reps: usize,
    /// Device identifier, reported as given
    pub device: String,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            batch_size: 128,
            input_dim: 1024,
            num_reps: 1000,
            device: "cpu".to_string(),
        }
    }
}

impl BenchConfig {
    /// Shape of the input batch
    pub fn shape(&self) -> Vec<usize> {
        vec![self.batch_size, self.input_dim]
    }
}

/// Wall clock time spent on `num_reps` calls.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Measurement {
    /// Total time of the loop, synchronization included
    pub elapsed: Duration,
    /// Number of calls within `elapsed`
    pub num_reps: NonZeroUsize,
}

impl Measurement {
    /// Average time of a single call, in seconds
    pub fn per_call_secs(&self) -> f64 {
        self.elapsed.as_secs_f64() / self.num_reps.get() as f64
    }

    /// Average time of a single call, in milliseconds
    pub fn latency_ms(&self) -> f64 {
        self.per_call_secs() * 1000.0
    }

    /// Effective bandwidth in GB/s (2^30 bytes), counting one read and one
    /// write of every item of `shape`, each `element_size` bytes, per call.
    pub fn bandwidth_gbs(&self, shape: &[usize], element_size: usize) -> f64 {
        let nelement: f64 = shape.iter().map(|&d| d as f64).product();
        let bytes = nelement * element_size as f64 * 2.0;
        bytes / self.per_call_secs() / GIB
    }
}

/// The benchmark outcome, [fmt::Display] renders the two line report.
#[derive(Clone, Debug, PartialEq)]
pub struct Report {
    /// Rows in the input batch
    pub batch_size: usize,
    /// Columns of the input batch
    pub input_dim: usize,
    /// Device identifier
    pub device: String,
    /// Average latency of a call, in milliseconds
    pub latency_ms: f64,
    /// Effective bandwidth, in GB/s
    pub bandwidth_gbs: f64,
}

impl Report {
    /// Derives the report metrics of `config` from `measurement`.
    pub fn new(config: &BenchConfig, measurement: &Measurement) -> Self {
        Self {
            batch_size: config.batch_size,
            input_dim: config.input_dim,
            device: config.device.clone(),
            latency_ms: measurement.latency_ms(),
            bandwidth_gbs: measurement.bandwidth_gbs(&config.shape(), ELEMENT_SIZE),
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Softmax batch_size: {} input_dim: {}",
            self.batch_size, self.input_dim
        )?;
        write!(
            f,
            "Torch-{}: {:.4} ms  [{:.2} GB/s]",
            self.device, self.latency_ms, self.bandwidth_gbs
        )
    }
}

/// Times `num_reps` calls of `softmax` on `batch`. The clock stops after the
/// final output has been reduced back to the host, so asynchronous devices are
/// fully accounted for.
pub fn time_softmax<T: Tensor + TensorOps<T>>(
    softmax: &Softmax,
    batch: &T,
    out: &mut T,
    num_reps: usize,
) -> Result<Measurement, SoftmaxError> {
    let Some(num_reps) = NonZeroUsize::new(num_reps) else {
        return Err(SoftmaxError::InvalidArgument {
            reason: "num_reps must be positive".to_string(),
        });
    };
    let start = Instant::now();
    for _ in 0..num_reps.get() {
        softmax.forward(batch, out)?;
    }
    let checksum = T::sum(out)?;
    let elapsed = start.elapsed();
    tracing::debug!(checksum, ?elapsed, num_reps = num_reps.get(), "softmax loop done");
    Ok(Measurement { elapsed, num_reps })
}

/// Runs the whole benchmark described by `config`.
pub fn run(config: &BenchConfig) -> Result<Report, SoftmaxError> {
    let device: Device = config.device.parse()?;
    tracing::debug!(%device, shape = ?config.shape(), "allocating batch");

    let softmax = Softmax::new(1).eval();
    let mut rng = rand::thread_rng();

    let measurement = match device {
        Device::Cpu => {
            use crate::cpu::f32::Tensor;
            let batch = Tensor::rand(config.shape(), &mut rng)?;
            let mut out = Tensor::zeros(config.shape())?;
            time_softmax(&softmax, &batch, &mut out, config.num_reps)?
        }
        #[cfg(feature = "cuda")]
        Device::Cuda(ordinal) => {
            use crate::gpu::f32::{Device as CudaDevice, Tensor};
            let cuda = CudaDevice::new(ordinal)?;
            let batch = Tensor::rand(config.shape(), &mut rng, &cuda)?;
            let mut out = Tensor::zeros(config.shape(), &cuda)?;
            // Uploads are done before the clock starts
            cuda.synchronize()?;
            time_softmax(&softmax, &batch, &mut out, config.num_reps)?
        }
        #[cfg(not(feature = "cuda"))]
        Device::Cuda(_) => {
            return Err(SoftmaxError::DeviceUnavailable {
                device: config.device.clone(),
                reason: "built without cuda support".to_string(),
            })
        }
    };

    let report = Report::new(config, &measurement);
    tracing::info!(
        latency_ms = report.latency_ms,
        bandwidth_gbs = report.bandwidth_gbs,
        "measured"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::f32::Tensor as CpuTensor;
    use crate::tests::assert_rows_normalized;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn reps(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn small_config() -> BenchConfig {
        BenchConfig {
            batch_size: 4,
            input_dim: 8,
            num_reps: 10,
            device: "cpu".to_string(),
        }
    }

    #[test]
    fn default_config() {
        let config = BenchConfig::default();
        assert_eq!(config.batch_size, 128);
        assert_eq!(config.input_dim, 1024);
        assert_eq!(config.num_reps, 1000);
        assert_eq!(config.device, "cpu");
        assert_eq!(config.shape(), vec![128, 1024]);
    }

    #[test]
    fn bandwidth_formula() {
        let measurement = Measurement {
            elapsed: Duration::from_millis(500),
            num_reps: reps(1000),
        };
        let (batch_size, input_dim) = (128, 1024);
        let per_call = 0.5 / 1000.0;
        assert_eq!(measurement.per_call_secs(), per_call);
        assert_eq!(measurement.latency_ms(), per_call * 1000.0);
        assert_eq!(
            measurement.bandwidth_gbs(&[batch_size, input_dim], ELEMENT_SIZE),
            (batch_size * input_dim * ELEMENT_SIZE * 2) as f64 / per_call / 2f64.powi(30)
        );

        // 1 GiB moved in one second
        let measurement = Measurement {
            elapsed: Duration::from_secs(1),
            num_reps: reps(1),
        };
        assert_eq!(measurement.bandwidth_gbs(&[1 << 27], ELEMENT_SIZE), 1.0);
        assert_eq!(measurement.bandwidth_gbs(&[1 << 17, 1 << 10], ELEMENT_SIZE), 1.0);
    }

    #[test]
    fn report_format() {
        let config = BenchConfig::default();
        let measurement = Measurement {
            elapsed: Duration::from_secs(1),
            num_reps: reps(1000),
        };
        let report = Report::new(&config, &measurement);
        assert_eq!(
            report.to_string(),
            "Softmax batch_size: 128 input_dim: 1024\nTorch-cpu: 1.0000 ms  [0.98 GB/s]"
        );
    }

    #[test]
    fn time_softmax_cpu() {
        let mut rng = StdRng::seed_from_u64(0);
        let batch = CpuTensor::rand(vec![4, 8], &mut rng).unwrap();
        let mut out = CpuTensor::zeros(vec![4, 8]).unwrap();
        let softmax = Softmax::new(1).eval();

        let measurement = time_softmax(&softmax, &batch, &mut out, 10).unwrap();
        assert_eq!(measurement.num_reps.get(), 10);
        assert_rows_normalized(out.data(), 8);
    }

    #[test]
    fn time_softmax_zero_reps() {
        let batch = CpuTensor::zeros(vec![2, 2]).unwrap();
        let mut out = CpuTensor::zeros(vec![2, 2]).unwrap();
        assert!(matches!(
            time_softmax(&Softmax::new(1), &batch, &mut out, 0),
            Err(SoftmaxError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn run_cpu() {
        let config = small_config();
        let report = run(&config).unwrap();
        assert_eq!(report.batch_size, 4);
        assert_eq!(report.input_dim, 8);
        assert_eq!(report.device, "cpu");
        assert!(report.latency_ms > 0.0 && report.latency_ms < 10000.0);
        assert!(report.bandwidth_gbs > 0.0);

        let output = report.to_string();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "Softmax batch_size: 4 input_dim: 8");
        assert!(lines[1].starts_with("Torch-cpu: "));
        assert!(lines[1].ends_with(" GB/s]"));
    }

    #[test]
    fn run_invalid_arguments() {
        let config = BenchConfig {
            batch_size: 0,
            ..small_config()
        };
        assert!(matches!(
            run(&config),
            Err(SoftmaxError::InvalidArgument { .. })
        ));

        let config = BenchConfig {
            num_reps: 0,
            ..small_config()
        };
        assert!(matches!(
            run(&config),
            Err(SoftmaxError::InvalidArgument { .. })
        ));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn run_oversized_batch() {
        // batch_size * input_dim overflows usize
        let config = BenchConfig {
            batch_size: 1 << 32,
            input_dim: 1 << 32,
            num_reps: 3,
            ..small_config()
        };
        assert!(matches!(
            run(&config),
            Err(SoftmaxError::InvalidArgument { .. })
        ));

        let config = BenchConfig {
            batch_size: usize::MAX,
            input_dim: 2,
            ..small_config()
        };
        assert!(matches!(
            run(&config),
            Err(SoftmaxError::InvalidArgument { .. })
        ));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn report_huge_shape() {
        let config = BenchConfig {
            batch_size: 1 << 32,
            input_dim: 1 << 32,
            ..small_config()
        };
        let measurement = Measurement {
            elapsed: Duration::from_secs(1),
            num_reps: reps(1),
        };
        let report = Report::new(&config, &measurement);
        // 2^64 elements, 4 bytes each, read and written
        assert_eq!(report.bandwidth_gbs, 2f64.powi(37));
    }

    #[test]
    fn run_unknown_device() {
        let config = BenchConfig {
            device: "nonexistent-gpu".to_string(),
            ..small_config()
        };
        assert!(matches!(
            run(&config),
            Err(SoftmaxError::DeviceUnavailable { .. })
        ));
    }
}
