//! Waiting for the controller to report every emulated device as available.

use std::collections::BTreeSet;
use std::time::Duration;

use log::{debug, info};

use crate::config::Credentials;
use crate::error::Result;
use crate::utils::{poll_until, CancelFlag, PollPolicy};

use super::types::{DeviceList, Readiness};

/// Source of device inventory snapshots.
pub trait DeviceInventory {
    fn fetch(&self) -> Result<DeviceList>;
}

/// Device inventory read from the ONOS REST API.
pub struct RestInventory {
    client: reqwest::blocking::Client,
    url: String,
    credentials: Credentials,
}

impl RestInventory {
    pub fn new(ip: &str, rest_port: u16, credentials: Credentials) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            url: format!("http://{}:{}/onos/v1/devices", ip, rest_port),
            credentials,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl DeviceInventory for RestInventory {
    fn fetch(&self) -> Result<DeviceList> {
        let list = self
            .client
            .get(&self.url)
            .basic_auth(&self.credentials.user, Some(&self.credentials.password))
            .send()?
            .error_for_status()?
            .json()?;
        Ok(list)
    }
}

/// Check one snapshot against `expected`.
///
/// Devices the controller knows about beyond `expected` are ignored, but the
/// snapshot must list at least as many devices as are expected.
pub fn check_devices(expected: &BTreeSet<String>, reported: &DeviceList) -> Readiness {
    if reported.devices.len() < expected.len() {
        return Readiness::Registering {
            reported: reported.devices.len(),
            expected: expected.len(),
        };
    }

    let pending: Vec<String> = expected
        .iter()
        .filter(|id| !reported.devices.iter().any(|d| &d.id == *id && d.available))
        .cloned()
        .collect();

    if pending.is_empty() {
        Readiness::Ready
    } else {
        Readiness::Unavailable { pending }
    }
}

/// Poll `inventory` until every device in `expected` is available.
///
/// A failed fetch counts as a poll that was not ready.
pub fn wait_for_devices(
    inventory: &dyn DeviceInventory,
    expected: &BTreeSet<String>,
    policy: &PollPolicy,
    cancel: &CancelFlag,
) -> Result<()> {
    info!("Waiting for {} device(s) to become available", expected.len());
    poll_until("controller devices", policy, cancel, |attempt| {
        match inventory.fetch() {
            Ok(list) => {
                let readiness = check_devices(expected, &list);
                if readiness.is_ready() {
                    return Some(());
                }
                debug!("Attempt {}: {}", attempt, readiness);
            }
            Err(e) => debug!("Attempt {}: device inventory unavailable: {}", attempt, e),
        }
        None
    })?;
    info!("All devices are available");
    Ok(())
}
