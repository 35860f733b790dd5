//! Topology type definitions.
//!
//! Nodes, links and the derived port view. This is plain data: no I/O and no
//! knowledge of the emulator or the controller.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};
use crate::ident::{to_compact, to_device_uri, to_emulator_dpid};

/// Free-form key/value annotations passed through to the controller.
pub type Annotations = BTreeMap<String, serde_json::Value>;

/// Annotation keys with meaning to the emulator or the controller.
pub mod keys {
    pub const NAME: &str = "name";
    pub const LATITUDE: &str = "latitude";
    pub const LONGITUDE: &str = "longitude";
    pub const REGENS: &str = "optical.regens";
    pub const WAVES: &str = "optical.waves";
    pub const OPTICAL_TYPE: &str = "optical.type";
    pub const BANDWIDTH: &str = "bandwidth";
}

/// Kind of device a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    /// Reconfigurable optical add/drop multiplexer emulated by LINC-OE.
    Roadm,
    /// Plain OpenFlow packet switch.
    Switch,
}

impl DeviceType {
    /// Device type string in the controller document.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Roadm => "ROADM",
            DeviceType::Switch => "SWITCH",
        }
    }

    /// Driver/hardware string in the controller document.
    pub fn hardware(&self) -> &'static str {
        match self {
            DeviceType::Roadm => "LINC-OE",
            DeviceType::Switch => "PK",
        }
    }
}

/// Port classification, derived from the attached link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PortType {
    Copper,
    /// Optical channel port facing a packet switch.
    Och,
    /// Optical multiplex section port on a trunk.
    Oms,
}

/// Link classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    Packet,
    #[default]
    Optical,
}

impl LinkKind {
    /// Link type string in the controller and emulator documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkKind::Packet => "PACKET",
            LinkKind::Optical => "OPTICAL",
        }
    }
}

/// Structural sub-classification of an optical link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpticalKind {
    /// ROADM to ROADM, carrying multiple wavelengths.
    Trunk,
    /// ROADM to packet switch, realised at runtime by a tap interface.
    CrossConnect,
}

/// 64-bit OpenFlow datapath id, stored as 16 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Dpid(String);

impl Dpid {
    /// Parse a datapath id written compact (`0000ffffffffff01`), delimited
    /// (`00:00:ff:ff:ff:ff:ff:01`) or as a device URI (`of:0000ffffffffff01`).
    pub fn parse(s: &str) -> Result<Self> {
        let compact = to_compact(s.strip_prefix("of:").unwrap_or(s));
        if compact.len() != 16 || !compact.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(BridgeError::InvalidTopology(format!(
                "datapath id '{}' is not 8 hex octets",
                s
            )));
        }
        Ok(Self(compact))
    }

    /// Datapath id from a switch number, zero padded.
    pub fn from_u64(value: u64) -> Self {
        Self(format!("{:016x}", value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Controller-facing device URI, `of:<dpid>`.
    pub fn uri(&self) -> String {
        to_device_uri(&self.0)
    }

    /// Emulator-facing colon form.
    pub fn emulator_form(&self) -> String {
        to_emulator_dpid(&self.uri())
    }
}

impl fmt::Display for Dpid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A switch in the topology.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    pub dpid: Dpid,
    pub device_type: DeviceType,
    pub manufacturer: String,
    /// Explicit MAC (12 hex chars, no delimiters); derived when absent.
    pub mac: Option<String>,
    /// Always contains a `name` entry.
    pub annotations: Annotations,
}

impl Node {
    pub fn new(name: impl Into<String>, dpid: Dpid, device_type: DeviceType) -> Self {
        Self::with_annotations(name, dpid, device_type, Annotations::new())
    }

    pub fn with_annotations(
        name: impl Into<String>,
        dpid: Dpid,
        device_type: DeviceType,
        mut annotations: Annotations,
    ) -> Self {
        let name = name.into();
        annotations
            .entry(keys::NAME.to_string())
            .or_insert_with(|| serde_json::Value::String(name.clone()));
        Self {
            name,
            dpid,
            device_type,
            manufacturer: "Linc".to_string(),
            mac: None,
            annotations,
        }
    }

    pub fn is_roadm(&self) -> bool {
        self.device_type == DeviceType::Roadm
    }

    /// Display name carried in the annotations.
    pub fn display_name(&self) -> String {
        match self.annotations.get(keys::NAME) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => self.name.clone(),
        }
    }
}

/// One side of a link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub node: String,
    pub port: u32,
    #[serde(default)]
    pub speed: u64,
}

impl Endpoint {
    pub fn new(node: impl Into<String>, port: u32) -> Self {
        Self { node: node.into(), port, speed: 0 }
    }

    pub fn with_speed(mut self, speed: u64) -> Self {
        self.speed = speed;
        self
    }
}

/// Index of a link in its topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(pub usize);

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "link#{}", self.0)
    }
}

/// Unordered link between two endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub a: Endpoint,
    pub b: Endpoint,
    pub kind: LinkKind,
    pub annotations: Annotations,
}

impl Link {
    pub fn new(a: Endpoint, b: Endpoint, kind: LinkKind) -> Self {
        Self { a, b, kind, annotations: Annotations::new() }
    }

    pub fn with_annotation(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.annotations.insert(key.to_string(), value.into());
        self
    }

    pub fn is_optical(&self) -> bool {
        self.kind == LinkKind::Optical
    }

    /// Endpoint on `node`, if the link touches it.
    pub fn endpoint_on(&self, node: &str) -> Option<&Endpoint> {
        if self.a.node == node {
            Some(&self.a)
        } else if self.b.node == node {
            Some(&self.b)
        } else {
            None
        }
    }

    /// The endpoint opposite `node`.
    pub fn far_end(&self, node: &str) -> Option<&Endpoint> {
        if self.a.node == node {
            Some(&self.b)
        } else if self.b.node == node {
            Some(&self.a)
        } else {
            None
        }
    }

    /// Whether the `optical.type` annotation marks this as a WDM trunk.
    pub fn is_wdm_annotated(&self) -> bool {
        matches!(self.annotations.get(keys::OPTICAL_TYPE), Some(serde_json::Value::String(t)) if t == "WDM")
    }
}

/// A node's port as seen by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub port: u32,
    pub speed: u64,
    #[serde(rename = "type")]
    pub port_type: PortType,
}
