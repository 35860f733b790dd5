//! Device availability reconciliation against the controller.

pub mod availability;
pub mod types;

pub use availability::{check_devices, wait_for_devices, DeviceInventory, RestInventory};
pub use types::{DeviceList, DeviceStatus, Readiness};
