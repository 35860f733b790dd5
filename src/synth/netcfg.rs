//! ONOS network configuration (`Topology.json`).

use std::collections::BTreeMap;

use serde_json::Value;

use super::types::{DeviceEntry, LinkEntry, NetworkConfig, OpticalInventory, PortEntry};

/// Build the controller document from the descriptors.
///
/// Devices are keyed by URI under the `basic` config key, ports by
/// `uri/port` under `optical`, links by `src-dst` under `basic`.
/// Annotations are merged over the fixed keys.
pub fn network_config(inventory: &OpticalInventory) -> NetworkConfig {
    let mut config = NetworkConfig::default();

    for device in &inventory.devices {
        let mut basic = BTreeMap::new();
        basic.insert("driver".to_string(), Value::String(device.hw.clone()));
        basic.insert("mfr".to_string(), Value::String(device.mfr.clone()));
        basic.insert("mac".to_string(), Value::String(device.mac.clone()));
        basic.insert("type".to_string(), Value::String(device.device_type.clone()));
        basic.extend(device.annotations.clone());
        config.devices.insert(device.uri.clone(), DeviceEntry { basic });

        for port in &device.ports {
            config
                .ports
                .insert(format!("{}/{}", device.uri, port.port), PortEntry { optical: *port });
        }
    }

    for link in &inventory.links {
        let mut basic = BTreeMap::new();
        basic.insert("type".to_string(), Value::String(link.link_type.clone()));
        basic.extend(link.annotations.clone());
        config
            .links
            .insert(format!("{}-{}", link.src, link.dst), LinkEntry { basic });
    }

    config
}

/// Controller document carrying only the given links, used when a single
/// switch's cross-connects come back after a restart.
pub fn links_only(inventory: &OpticalInventory) -> NetworkConfig {
    let links = OpticalInventory {
        devices: Vec::new(),
        links: inventory.links.clone(),
    };
    network_config(&links)
}
