//! Controller device inventory types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Response of `GET /onos/v1/devices`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceList {
    #[serde(default)]
    pub devices: Vec<DeviceStatus>,
}

/// One device as reported by the controller. Other fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub id: String,
    #[serde(default)]
    pub available: bool,
}

impl DeviceStatus {
    pub fn new(id: impl Into<String>, available: bool) -> Self {
        Self { id: id.into(), available }
    }
}

/// Result of checking one inventory snapshot against the expected devices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// Every expected device is present and available.
    Ready,
    /// The controller reports fewer devices than expected.
    Registering { reported: usize, expected: usize },
    /// Expected devices that are missing or not available.
    Unavailable { pending: Vec<String> },
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready)
    }
}

impl fmt::Display for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Readiness::Ready => write!(f, "ready"),
            Readiness::Registering { reported, expected } => {
                write!(f, "{} of {} devices registered", reported, expected)
            }
            Readiness::Unavailable { pending } => write!(f, "waiting for {}", pending.join(", ")),
        }
    }
}
