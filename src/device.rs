use std::fmt;

use log::{info, warn};
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use crate::{ClassifierErr, Result};

/// Where the model's tensors live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    #[default]
    Cpu,
    Accelerator(usize),
}

impl Device {
    /// Resolves the requested device into the one the classifier will actually use. It's called
    /// once per classifier.
    ///
    /// # Returns
    /// The device the classifier is bound to for its whole lifetime.
    pub fn resolve(self) -> Device {
        let device = match self {
            Device::Cpu => Device::Cpu,
            Device::Accelerator(ordinal) => {
                warn!("accelerator {ordinal} is not available, falling back to the cpu");
                Device::Cpu
            }
        };

        info!("classifier placed on {device}");
        device
    }

    /// Transfers a batch to this device.
    ///
    /// # Arguments
    /// * `x` - The batch in host memory.
    ///
    /// # Returns
    /// A view of the batch on the device or an error if the device can't hold tensors.
    pub fn place<'a>(self, x: ArrayView2<'a, f32>) -> Result<ArrayView2<'a, f32>> {
        match self {
            Device::Cpu => Ok(x),
            Device::Accelerator(_) => Err(ClassifierErr::DeviceUnavailable(self)),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Accelerator(ordinal) => write!(f, "accelerator:{ordinal}"),
        }
    }
}
