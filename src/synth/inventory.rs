//! Device and link descriptors.
//!
//! Every device in scope gets a descriptor; optical links are all emitted
//! regardless of scope, since the emulator has to carry the whole optical
//! graph even when only part of it belongs to this controller.

use std::path::Path;

use log::debug;

use crate::topology::{DeviceType, Link, Node, Scope, Topology};

use super::types::{DeviceDescriptor, LinkDescriptor, OpticalInventory};

/// Build descriptors for `topology` restricted to `scope`.
///
/// `mac_of` supplies the MAC of a packet switch without a configured one,
/// keyed by node name.
pub fn build_inventory<F>(topology: &Topology, scope: &Scope<'_>, mac_of: F) -> OpticalInventory
where
    F: Fn(&str) -> Option<String>,
{
    let devices = topology
        .nodes()
        .filter(|node| scope.contains(&node.name))
        .map(|node| device_descriptor(topology, node, &mac_of))
        .collect();

    let links = topology
        .links()
        .filter(|(_, link)| link.is_optical())
        .filter_map(|(_, link)| link_descriptor(topology, link))
        .collect();

    OpticalInventory { devices, links }
}

/// Descriptor for a single node.
pub fn device_descriptor<F>(topology: &Topology, node: &Node, mac_of: F) -> DeviceDescriptor
where
    F: Fn(&str) -> Option<String>,
{
    let mac = match (&node.mac, node.device_type) {
        (Some(mac), _) => mac.clone(),
        (None, DeviceType::Roadm) => roadm_mac(node),
        (None, DeviceType::Switch) => mac_of(&node.name).unwrap_or_default(),
    };

    DeviceDescriptor {
        uri: node.dpid.uri(),
        mac,
        hw: node.device_type.hardware().to_string(),
        mfr: node.manufacturer.clone(),
        device_type: node.device_type.as_str().to_string(),
        annotations: node.annotations.clone(),
        ports: topology.ports(&node.name),
    }
}

/// Descriptor for a link; `None` if an endpoint is missing from the topology.
pub fn link_descriptor(topology: &Topology, link: &Link) -> Option<LinkDescriptor> {
    let src = topology.node(&link.a.node)?;
    let dst = topology.node(&link.b.node)?;
    Some(LinkDescriptor {
        src: format!("{}/{}", src.dpid.uri(), link.a.port),
        dst: format!("{}/{}", dst.dpid.uri(), link.b.port),
        link_type: link.kind.as_str().to_string(),
        annotations: link.annotations.clone(),
    })
}

/// LINC-OE ROADMs use `ffffffffffff` followed by the last dpid octet.
fn roadm_mac(node: &Node) -> String {
    let dpid = node.dpid.as_str();
    format!("ffffffffffff{}", &dpid[dpid.len() - 2..])
}

/// MAC of a local interface from sysfs, without delimiters.
pub fn sysfs_mac(interface: &str) -> Option<String> {
    let path = Path::new("/sys/class/net").join(interface).join("address");
    match std::fs::read_to_string(&path) {
        Ok(mac) => Some(mac.trim().replace(':', "")),
        Err(e) => {
            debug!("No MAC for {}: {}", interface, e);
            None
        }
    }
}
