//! LINC-OE topology document (`TopoConfig.json`).
//!
//! Only ROADMs become LINC switches. Link entries name their endpoints by the
//! display names recorded while emitting switches, so switch emission has to
//! run first.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{BridgeError, Result};
use crate::ident::to_emulator_dpid;
use crate::topology::{keys, DeviceType, LinkKind};

use super::types::{LinkConfig, LinkParams, OpticalInventory, SwitchConfig, SwitchParams, TopoConfig};

/// Name used when a dpid has no switch entry.
const UNKNOWN_NAME: &str = "none";

/// Build both sections of the emulator document.
pub fn topo_config(inventory: &OpticalInventory) -> Result<TopoConfig> {
    let mut names = HashMap::new();
    let switch_config = switch_config(inventory, &mut names);
    let link_config = link_config(inventory, &names)?;
    Ok(TopoConfig { switch_config, link_config })
}

/// Switch entries for every ROADM; fills `names` with colon dpid -> display name.
pub fn switch_config(inventory: &OpticalInventory, names: &mut HashMap<String, String>) -> Vec<SwitchConfig> {
    let roadm = DeviceType::Roadm.as_str();
    inventory
        .devices
        .iter()
        .filter(|device| device.device_type == roadm)
        .map(|device| {
            let node_dpid = to_emulator_dpid(&device.uri);
            let name = match device.annotations.get(keys::NAME) {
                Some(Value::String(name)) => name.clone(),
                Some(other) => other.to_string(),
                None => UNKNOWN_NAME.to_string(),
            };
            names.insert(node_dpid.clone(), name.clone());

            SwitchConfig {
                allowed: true,
                latitude: annotation_or(&device.annotations, keys::LATITUDE, Value::from(0.0)),
                longitude: annotation_or(&device.annotations, keys::LONGITUDE, Value::from(0.0)),
                name,
                node_dpid,
                params: SwitchParams {
                    numregens: annotation_or(&device.annotations, keys::REGENS, Value::from(0)),
                },
                switch_type: "Roadm".to_string(),
            }
        })
        .collect()
}

/// Link entries for every `OPTICAL` link.
pub fn link_config(inventory: &OpticalInventory, names: &HashMap<String, String>) -> Result<Vec<LinkConfig>> {
    let optical = LinkKind::Optical.as_str();
    let name_of = |dpid: &str| names.get(dpid).cloned().unwrap_or_else(|| UNKNOWN_NAME.to_string());

    inventory
        .links
        .iter()
        .filter(|link| link.link_type == optical)
        .map(|link| {
            let node_dpid1 = to_emulator_dpid(&link.src);
            let node_dpid2 = to_emulator_dpid(&link.dst);
            let params = LinkParams {
                node_name1: name_of(&node_dpid1),
                node_name2: name_of(&node_dpid2),
                port1: port_of(&link.src)?,
                port2: port_of(&link.dst)?,
                bandwidth: link.annotations.get(keys::BANDWIDTH).cloned(),
                num_waves: link.annotations.get(keys::WAVES).cloned(),
            };

            let wdm = matches!(link.annotations.get(keys::OPTICAL_TYPE), Some(Value::String(t)) if t == "WDM");
            Ok(LinkConfig {
                allowed: true,
                node_dpid1,
                node_dpid2,
                params,
                link_type: if wdm { "wdmLink" } else { "pktOptLink" }.to_string(),
            })
        })
        .collect()
}

fn annotation_or(annotations: &crate::topology::Annotations, key: &str, default: Value) -> Value {
    annotations.get(key).cloned().unwrap_or(default)
}

/// Port number from a `uri/port` path.
fn port_of(path: &str) -> Result<u32> {
    path.split('/')
        .nth(1)
        .and_then(|port| port.parse().ok())
        .ok_or_else(|| BridgeError::InvalidTopology(format!("link endpoint '{}' has no port number", path)))
}
