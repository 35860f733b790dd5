//! Configuration synthesis.
//!
//! A topology is turned into three artifacts, all written to the work
//! directory before anything reads them:
//!
//! - `Topology.json`: the controller's network configuration
//! - `TopoConfig.json`: the emulator's topology input
//! - `sys.config`: the emulator's startup configuration, produced by the
//!   external generator from `TopoConfig.json`

pub mod inventory;
pub mod linc_config;
pub mod netcfg;
pub mod sysconfig;
pub mod types;

use std::path::{Path, PathBuf};

use log::info;

use crate::error::Result;
use crate::topology::{Scope, Topology};
use crate::utils::write_json_atomic;

pub use inventory::{build_inventory, sysfs_mac};
pub use linc_config::topo_config;
pub use netcfg::{links_only, network_config};
pub use sysconfig::{controller_clause, generate_sys_config, patch_controllers};
pub use types::*;

pub const TOPOLOGY_FILE: &str = "Topology.json";
pub const TOPO_CONFIG_FILE: &str = "TopoConfig.json";
pub const SYS_CONFIG_FILE: &str = "sys.config";
pub const CROSS_CONNECT_FILE: &str = "crossConnect.json";

/// Paths of the generated documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    pub topology: PathBuf,
    pub topo_config: PathBuf,
    pub sys_config: PathBuf,
}

impl Artifacts {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            topology: dir.join(TOPOLOGY_FILE),
            topo_config: dir.join(TOPO_CONFIG_FILE),
            sys_config: dir.join(SYS_CONFIG_FILE),
        }
    }
}

/// The in-memory documents for one topology scope.
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub inventory: OpticalInventory,
    pub network: NetworkConfig,
    pub topo_config: TopoConfig,
}

impl Synthesis {
    pub fn from_topology<F>(topology: &Topology, scope: &Scope<'_>, mac_of: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let inventory = build_inventory(topology, scope, mac_of);
        let network = network_config(&inventory);
        let topo_config = topo_config(&inventory)?;
        info!(
            "Synthesized {} device(s) and {} optical link(s) for {}",
            inventory.devices.len(),
            inventory.links.len(),
            scope.label()
        );
        Ok(Self { inventory, network, topo_config })
    }

    /// Write `Topology.json` and `TopoConfig.json` into `dir`.
    pub fn write_documents(&self, dir: &Path) -> Result<Artifacts> {
        let artifacts = Artifacts::in_dir(dir);
        write_json_atomic(&artifacts.topology, &self.network)?;
        write_json_atomic(&artifacts.topo_config, &self.topo_config)?;
        Ok(artifacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{DeviceType, Dpid, Endpoint, Link, LinkKind, Node};

    #[test]
    fn test_write_documents() {
        let mut topo = Topology::new();
        topo.add_node(Node::new("r1", Dpid::from_u64(0xffffffffff01), DeviceType::Roadm)).unwrap();
        topo.add_node(Node::new("r2", Dpid::from_u64(0xffffffffff02), DeviceType::Roadm)).unwrap();
        topo.add_link(Link::new(Endpoint::new("r1", 10), Endpoint::new("r2", 10), LinkKind::Optical))
            .unwrap();

        let synthesis = Synthesis::from_topology(&topo, &topo.scope(None).unwrap(), |_| None).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let artifacts = synthesis.write_documents(dir.path()).unwrap();

        let network: NetworkConfig =
            serde_json::from_str(&std::fs::read_to_string(&artifacts.topology).unwrap()).unwrap();
        assert_eq!(network, synthesis.network);

        let linc: TopoConfig =
            serde_json::from_str(&std::fs::read_to_string(&artifacts.topo_config).unwrap()).unwrap();
        assert_eq!(linc.switch_config.len(), 2);
        assert_eq!(linc.link_config.len(), 1);
        assert!(!artifacts.sys_config.exists());
    }
}
