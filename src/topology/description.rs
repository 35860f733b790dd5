//! Serializable topology description.
//!
//! The on-disk form of a topology (YAML), mirroring the arguments a
//! topology script would pass when adding switches and links:
//!
//! ```yaml
//! switches:
//!   - name: r1
//!     dpid: "0000ffffffffff01"
//!     kind: roadm
//!     annotations: { latitude: 37.6, longitude: -122.3, optical.regens: 0 }
//!   - name: s1
//!     dpid: "0000000000000001"
//!     kind: switch
//! links:
//!   - node1: r1
//!     port1: 1
//!     speed1: 10000
//!     node2: s1
//!     port2: 2
//!     annotations: { bandwidth: 100000, optical.type: cross-connect }
//! domains:
//!   east: [r1, s1]
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;

use super::graph::Topology;
use super::types::{Annotations, DeviceType, Dpid, Endpoint, Link, LinkKind, Node};

/// Whole topology file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopologyDescription {
    #[serde(default)]
    pub switches: Vec<SwitchDescription>,
    #[serde(default)]
    pub links: Vec<LinkDescription>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub domains: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchDescription {
    pub name: String,
    pub dpid: String,
    #[serde(default = "default_kind")]
    pub kind: DeviceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: Annotations,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkDescription {
    pub node1: String,
    pub port1: u32,
    pub node2: String,
    pub port2: u32,
    #[serde(default)]
    pub speed1: u64,
    #[serde(default)]
    pub speed2: u64,
    #[serde(default)]
    pub kind: LinkKind,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: Annotations,
}

fn default_kind() -> DeviceType {
    DeviceType::Switch
}

impl TopologyDescription {
    /// Validate and build the in-memory topology.
    pub fn build(&self) -> Result<Topology> {
        let mut topology = Topology::new();

        for switch in &self.switches {
            let mut node = Node::with_annotations(
                switch.name.clone(),
                Dpid::parse(&switch.dpid)?,
                switch.kind,
                switch.annotations.clone(),
            );
            node.mac = switch.mac.as_deref().map(|mac| mac.replace(':', "").to_ascii_lowercase());
            if let Some(mfr) = &switch.manufacturer {
                node.manufacturer = mfr.clone();
            }
            topology.add_node(node)?;
        }

        for link in &self.links {
            topology.add_link(Link {
                a: Endpoint::new(link.node1.clone(), link.port1).with_speed(link.speed1),
                b: Endpoint::new(link.node2.clone(), link.port2).with_speed(link.speed2),
                kind: link.kind,
                annotations: link.annotations.clone(),
            })?;
        }

        for (name, members) in &self.domains {
            topology.add_domain(name.clone(), members.iter().cloned())?;
        }

        Ok(topology)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;

    const TOPO: &str = r#"
switches:
  - name: r1
    dpid: "0000ffffffffff01"
    kind: roadm
    annotations: { latitude: 37.6, longitude: -122.3, optical.regens: 0 }
  - name: r2
    dpid: "00:00:ff:ff:ff:ff:ff:02"
    kind: roadm
  - name: s1
    dpid: "0000000000000001"
    mac: "00:00:00:00:00:01"
links:
  - node1: r1
    port1: 10
    node2: r2
    port2: 10
    annotations: { optical.waves: 80, optical.type: WDM }
  - node1: r1
    port1: 1
    speed1: 10000
    node2: s1
    port2: 2
    annotations: { bandwidth: 100000, optical.type: cross-connect }
domains:
  east: [r1, s1]
"#;

    #[test]
    fn test_build_from_yaml() {
        let desc: TopologyDescription = serde_yaml::from_str(TOPO).unwrap();
        let topo = desc.build().unwrap();

        assert_eq!(topo.nodes().count(), 3);
        assert_eq!(topo.links().count(), 2);
        let r2 = topo.node("r2").unwrap();
        assert!(r2.is_roadm());
        assert_eq!(r2.dpid.as_str(), "0000ffffffffff02");

        let s1 = topo.node("s1").unwrap();
        assert_eq!(s1.device_type, DeviceType::Switch);
        assert_eq!(s1.mac.as_deref(), Some("000000000001"));
        assert_eq!(s1.annotations.get("name"), Some(&serde_json::json!("s1")));

        assert_eq!(topo.cross_connects().len(), 1);
        assert!(topo.scope(Some("east")).unwrap().contains("s1"));
    }

    #[test]
    fn test_build_rejects_bad_dpid() {
        let desc: TopologyDescription =
            serde_yaml::from_str("switches:\n  - name: r1\n    dpid: \"zz\"\n    kind: roadm\n").unwrap();
        assert!(matches!(desc.build(), Err(BridgeError::InvalidTopology(_))));
    }

    #[test]
    fn test_default_link_kind_is_optical() {
        let link: LinkDescription =
            serde_yaml::from_str("node1: a\nport1: 1\nnode2: b\nport2: 2\n").unwrap();
        assert_eq!(link.kind, LinkKind::Optical);
    }
}
