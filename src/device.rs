use crate::SoftmaxError;
use std::fmt;
use std::str::FromStr;

/// Where the tensors live and the kernels run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    /// The host
    Cpu,
    /// A cuda device, by ordinal
    Cuda(usize),
}

impl Device {
    /// Whether this crate was built with support for the device.
    pub fn is_available(&self) -> bool {
        match self {
            Device::Cpu => true,
            Device::Cuda(_) => cfg!(feature = "cuda"),
        }
    }
}

impl FromStr for Device {
    type Err = SoftmaxError;

    /// Accepts `cpu`, `cuda` (ordinal 0) and `cuda:N`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unavailable = |reason: &str| SoftmaxError::DeviceUnavailable {
            device: s.to_string(),
            reason: reason.to_string(),
        };
        let device = match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Device::Cpu,
            "cuda" => Device::Cuda(0),
            other => match other.strip_prefix("cuda:") {
                Some(ordinal) => Device::Cuda(
                    ordinal
                        .parse()
                        .map_err(|_| unavailable("invalid cuda ordinal"))?,
                ),
                None => return Err(unavailable("unknown device, expected `cpu` or `cuda:N`")),
            },
        };
        if !device.is_available() {
            return Err(unavailable(
                "built without cuda support, rebuild with `--features cuda`",
            ));
        }
        Ok(device)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda(ordinal) => write!(f, "cuda:{ordinal}"),
        }
    }
}
