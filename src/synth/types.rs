//! Document type definitions.
//!
//! Three JSON shapes are produced from a topology:
//!
//! - [`OpticalInventory`]: per-device and per-link descriptors, the common
//!   source for the two documents below
//! - [`NetworkConfig`]: the ONOS network configuration (`Topology.json`)
//! - [`TopoConfig`]: LINC-OE's topology input (`TopoConfig.json`)

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::topology::{Annotations, Port};

// ============================================================================
// Descriptors
// ============================================================================

/// Configuration descriptor of one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub uri: String,
    pub mac: String,
    pub hw: String,
    pub mfr: String,
    #[serde(rename = "type")]
    pub device_type: String,
    pub annotations: Annotations,
    pub ports: Vec<Port>,
}

/// Configuration descriptor of one optical link; `src`/`dst` are `uri/port`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkDescriptor {
    pub src: String,
    pub dst: String,
    #[serde(rename = "type")]
    pub link_type: String,
    pub annotations: Annotations,
}

/// Descriptors for every device in scope and every optical link.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpticalInventory {
    pub devices: Vec<DeviceDescriptor>,
    pub links: Vec<LinkDescriptor>,
}

impl OpticalInventory {
    /// Device URIs, the set the controller must report as available.
    pub fn device_uris(&self) -> impl Iterator<Item = &str> {
        self.devices.iter().map(|d| d.uri.as_str())
    }
}

// ============================================================================
// Controller network configuration
// ============================================================================

/// ONOS network configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default)]
    pub devices: BTreeMap<String, DeviceEntry>,
    #[serde(default)]
    pub ports: BTreeMap<String, PortEntry>,
    #[serde(default)]
    pub links: BTreeMap<String, LinkEntry>,
}

/// `devices[uri]`: driver, mfr, mac, type and the device annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceEntry {
    pub basic: BTreeMap<String, Value>,
}

/// `ports["uri/port"]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortEntry {
    pub optical: Port,
}

/// `links["src-dst"]`: type and the link annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkEntry {
    pub basic: BTreeMap<String, Value>,
}

impl NetworkConfig {
    /// (src, dst) pairs recovered from the link subjects.
    pub fn link_endpoints(&self) -> Vec<(String, String)> {
        self.links
            .keys()
            .filter_map(|subject| subject.split_once('-'))
            .map(|(src, dst)| (src.to_string(), dst.to_string()))
            .collect()
    }
}

// ============================================================================
// Emulator topology configuration
// ============================================================================

/// LINC-OE topology document consumed by `config_generator`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopoConfig {
    pub switch_config: Vec<SwitchConfig>,
    pub link_config: Vec<LinkConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchConfig {
    pub allowed: bool,
    pub latitude: Value,
    pub longitude: Value,
    pub name: String,
    pub node_dpid: String,
    pub params: SwitchParams,
    #[serde(rename = "type")]
    pub switch_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchParams {
    pub numregens: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkConfig {
    pub allowed: bool,
    pub node_dpid1: String,
    pub node_dpid2: String,
    pub params: LinkParams,
    #[serde(rename = "type")]
    pub link_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkParams {
    pub node_name1: String,
    pub node_name2: String,
    pub port1: u32,
    pub port2: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bandwidth: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_waves: Option<Value>,
}
