//! Cross-connect tap bindings.
//!
//! Every ROADM keeps its cross-connect links in exactly one of two sets:
//! `attached` (a tap is bound to the packet switch on the far end) or
//! `detached`. [`Binder`] moves links between the sets; the sets themselves
//! do not enforce that their union stays the full cross-connect set.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info, warn};

use crate::error::{BridgeError, Result};
use crate::topology::{LinkId, Topology};
use crate::utils::{CommandRunner, Invocation};

use super::interfaces::TapProvisioner;
use super::taps::find_virtual_interface;

/// Something that can take a tap interface into a packet switch.
pub trait InterfaceHost {
    fn attach(&self, node: &str, interface: &str) -> Result<()>;
    fn detach(&self, node: &str, interface: &str) -> Result<()>;
}

/// Packet switches implemented as Open vSwitch bridges named after the node.
pub struct OvsHost<R> {
    runner: R,
}

impl<R: CommandRunner> OvsHost<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    fn vsctl(&self, command: [&str; 2], node: &str, interface: &str) -> Result<()> {
        let invocation = Invocation::new("ovs-vsctl").args(command).args([node, interface]);
        let output = self.runner.run(&invocation)?;
        let output = output.trim();
        if output.is_empty() {
            Ok(())
        } else {
            Err(BridgeError::Binding {
                node: node.to_string(),
                interface: interface.to_string(),
                output: output.to_string(),
            })
        }
    }
}

impl<R: CommandRunner> InterfaceHost for OvsHost<R> {
    fn attach(&self, node: &str, interface: &str) -> Result<()> {
        self.vsctl(["--may-exist", "add-port"], node, interface)
    }

    fn detach(&self, node: &str, interface: &str) -> Result<()> {
        self.vsctl(["--if-exists", "del-port"], node, interface)
    }
}

/// Binding state of one ROADM's cross-connects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrossConnectBindings {
    pub attached: BTreeMap<LinkId, String>,
    pub detached: BTreeSet<LinkId>,
}

impl CrossConnectBindings {
    pub fn all_detached(links: impl IntoIterator<Item = LinkId>) -> Self {
        Self {
            attached: BTreeMap::new(),
            detached: links.into_iter().collect(),
        }
    }

    pub fn mark_attached(&mut self, link: LinkId, tap: String) {
        self.detached.remove(&link);
        self.attached.insert(link, tap);
    }

    pub fn mark_detached(&mut self, link: LinkId) -> Option<String> {
        self.detached.insert(link);
        self.attached.remove(&link)
    }
}

/// Bindings of every ROADM, keyed by node name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingTable {
    roadms: BTreeMap<String, CrossConnectBindings>,
}

impl BindingTable {
    /// Every cross-connect of every ROADM starts out detached.
    pub fn from_topology(topology: &Topology) -> Self {
        let roadms = topology
            .nodes()
            .filter(|node| node.is_roadm())
            .map(|node| {
                let links = topology.cross_connects_of(&node.name);
                (node.name.clone(), CrossConnectBindings::all_detached(links))
            })
            .collect();
        Self { roadms }
    }

    pub fn roadm(&self, name: &str) -> Option<&CrossConnectBindings> {
        self.roadms.get(name)
    }

    pub fn roadm_mut(&mut self, name: &str) -> Option<&mut CrossConnectBindings> {
        self.roadms.get_mut(name)
    }

    pub fn roadm_names(&self) -> impl Iterator<Item = &str> {
        self.roadms.keys().map(String::as_str)
    }

    /// Every bound link and its tap.
    pub fn attached(&self) -> impl Iterator<Item = (LinkId, &str)> {
        self.roadms
            .values()
            .flat_map(|b| b.attached.iter().map(|(id, tap)| (*id, tap.as_str())))
    }

    pub fn attached_count(&self) -> usize {
        self.roadms.values().map(|b| b.attached.len()).sum()
    }

    /// Whether every ROADM's sets are disjoint and cover exactly its cross-connects.
    pub fn is_consistent(&self, topology: &Topology) -> bool {
        self.roadms.iter().all(|(name, b)| {
            let expected: BTreeSet<LinkId> = topology.cross_connects_of(name).into_iter().collect();
            let attached: BTreeSet<LinkId> = b.attached.keys().copied().collect();
            let covered: BTreeSet<LinkId> = attached.union(&b.detached).copied().collect();
            attached.is_disjoint(&b.detached) && covered == expected
        })
    }
}

/// Outcome of a bind or unbind pass. Failures are warnings, never fatal.
#[derive(Debug, Default)]
pub struct BindReport {
    pub bound: Vec<(LinkId, String)>,
    pub warnings: Vec<BridgeError>,
}

impl BindReport {
    pub fn merge(&mut self, other: BindReport) {
        self.bound.extend(other.bound);
        self.warnings.extend(other.warnings);
    }
}

/// Moves cross-connects between the attached and detached sets.
pub struct Binder<'a> {
    topology: &'a Topology,
    host: &'a dyn InterfaceHost,
    taps: TapProvisioner<'a>,
}

impl<'a> Binder<'a> {
    pub fn new(topology: &'a Topology, host: &'a dyn InterfaceHost, runner: &'a dyn CommandRunner) -> Self {
        Self {
            topology,
            host,
            taps: TapProvisioner::new(runner),
        }
    }

    /// Bind every detached cross-connect of `roadm`, looking taps up in `sys_config`.
    pub fn bind_detached(&self, table: &mut BindingTable, roadm: &str, sys_config: &str) -> BindReport {
        let mut report = BindReport::default();
        let Some(bindings) = table.roadm_mut(roadm) else {
            return report;
        };
        let Some(node) = self.topology.node(roadm) else {
            return report;
        };

        let pending: Vec<LinkId> = bindings.detached.iter().copied().collect();
        for link in pending {
            let Some((roadm_end, packet_end)) = self.topology.cross_connect_ends(link) else {
                continue;
            };

            let tap = match find_virtual_interface(sys_config, node.dpid.as_str(), roadm_end.port) {
                Ok(tap) => tap,
                Err(reason) => {
                    let miss = BridgeError::DiscoveryMiss {
                        dpid: node.dpid.to_string(),
                        port: roadm_end.port,
                        reason,
                    };
                    warn!("{}", miss);
                    report.warnings.push(miss);
                    continue;
                }
            };

            let attached = self
                .taps
                .ensure(&tap)
                .and_then(|_| self.host.attach(&packet_end.node, &tap));
            match attached {
                Ok(()) => {
                    debug!("{} {} -> {} on {}", roadm, link, tap, packet_end.node);
                    bindings.mark_attached(link, tap.clone());
                    report.bound.push((link, tap));
                }
                Err(e) => {
                    warn!("Failed to attach {} to {}: {}", tap, packet_end.node, e);
                    report.warnings.push(e);
                }
            }
        }

        if !report.bound.is_empty() {
            info!("{}: bound {} cross-connect(s)", roadm, report.bound.len());
        }
        report
    }

    /// Bind the detached cross-connects of every ROADM.
    pub fn bind_all(&self, table: &mut BindingTable, sys_config: &str) -> BindReport {
        let names: Vec<String> = table.roadm_names().map(str::to_string).collect();
        let mut report = BindReport::default();
        for name in names {
            report.merge(self.bind_detached(table, &name, sys_config));
        }
        report
    }

    /// Detach every bound tap of `roadm`. Links move to `detached` even when
    /// the host refuses the detach.
    pub fn unbind(&self, table: &mut BindingTable, roadm: &str) -> Vec<BridgeError> {
        let mut warnings = Vec::new();
        let Some(bindings) = table.roadm_mut(roadm) else {
            return warnings;
        };

        let bound: Vec<LinkId> = bindings.attached.keys().copied().collect();
        for link in bound {
            let Some(tap) = bindings.mark_detached(link) else {
                continue;
            };
            let Some((_, packet_end)) = self.topology.cross_connect_ends(link) else {
                continue;
            };
            if let Err(e) = self.host.detach(&packet_end.node, &tap) {
                warn!("Failed to detach {} from {}: {}", tap, packet_end.node, e);
                warnings.push(e);
            }
        }
        warnings
    }

    pub fn unbind_all(&self, table: &mut BindingTable) -> Vec<BridgeError> {
        let names: Vec<String> = table.roadm_names().map(str::to_string).collect();
        names.iter().flat_map(|name| self.unbind(table, name)).collect()
    }

    /// Mark as attached every cross-connect whose tap can be found, without
    /// touching the host. Used to tear down a bring-up made by another process.
    pub fn recover(&self, table: &mut BindingTable, sys_config: &str) -> usize {
        let mut recovered = 0;
        let names: Vec<String> = table.roadm_names().map(str::to_string).collect();
        for name in names {
            let (Some(node), Some(bindings)) = (self.topology.node(&name), table.roadm_mut(&name)) else {
                continue;
            };
            let pending: Vec<LinkId> = bindings.detached.iter().copied().collect();
            for link in pending {
                let Some((roadm_end, _)) = self.topology.cross_connect_ends(link) else {
                    continue;
                };
                if let Ok(tap) = find_virtual_interface(sys_config, node.dpid.as_str(), roadm_end.port) {
                    bindings.mark_attached(link, tap);
                    recovered += 1;
                }
            }
        }
        recovered
    }
}
