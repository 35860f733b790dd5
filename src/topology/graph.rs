//! The topology container and its derived views.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::{BridgeError, Result};

use super::types::{Endpoint, Link, LinkId, LinkKind, Node, OpticalKind, Port, PortType};

/// Switches, links and named domains.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    nodes: Vec<Node>,
    by_name: HashMap<String, usize>,
    links: Vec<Link>,
    domains: BTreeMap<String, BTreeSet<String>>,
}

/// Restriction of synthesis and reconciliation to part of the topology.
#[derive(Debug, Clone, Copy)]
pub enum Scope<'a> {
    All,
    Domain {
        name: &'a str,
        members: &'a BTreeSet<String>,
    },
}

impl Scope<'_> {
    pub fn contains(&self, node: &str) -> bool {
        match self {
            Scope::All => true,
            Scope::Domain { members, .. } => members.contains(node),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Scope::All => "all",
            Scope::Domain { name, .. } => name,
        }
    }
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node; names and datapath ids must be unique.
    pub fn add_node(&mut self, node: Node) -> Result<()> {
        if self.by_name.contains_key(&node.name) {
            return Err(BridgeError::InvalidTopology(format!("duplicate node '{}'", node.name)));
        }
        if let Some(other) = self.nodes.iter().find(|n| n.dpid == node.dpid) {
            return Err(BridgeError::InvalidTopology(format!(
                "nodes '{}' and '{}' share datapath id {}",
                other.name, node.name, node.dpid
            )));
        }
        self.by_name.insert(node.name.clone(), self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    /// Add a link between existing nodes.
    ///
    /// Ports are unique per node. An optical link needs at least one ROADM
    /// endpoint; with two it is a trunk, with one a cross-connect.
    pub fn add_link(&mut self, link: Link) -> Result<LinkId> {
        for end in [&link.a, &link.b] {
            if !self.by_name.contains_key(&end.node) {
                return Err(BridgeError::InvalidTopology(format!(
                    "link endpoint references unknown node '{}'",
                    end.node
                )));
            }
            if self
                .links
                .iter()
                .any(|l| l.endpoint_on(&end.node).map(|e| e.port) == Some(end.port))
            {
                return Err(BridgeError::InvalidTopology(format!(
                    "port {} on '{}' is already linked",
                    end.port, end.node
                )));
            }
        }
        if link.a.node == link.b.node {
            return Err(BridgeError::InvalidTopology(format!(
                "self-link on '{}'",
                link.a.node
            )));
        }
        if link.kind == LinkKind::Optical && self.classify(&link).is_none() {
            return Err(BridgeError::InvalidTopology(format!(
                "optical link {}/{} - {}/{} has no ROADM endpoint",
                link.a.node, link.a.port, link.b.node, link.b.port
            )));
        }

        let id = LinkId(self.links.len());
        self.links.push(link);
        Ok(id)
    }

    /// Declare a named domain; every member must exist.
    pub fn add_domain(&mut self, name: impl Into<String>, members: impl IntoIterator<Item = String>) -> Result<()> {
        let name = name.into();
        let members: BTreeSet<String> = members.into_iter().collect();
        if let Some(unknown) = members.iter().find(|m| !self.by_name.contains_key(*m)) {
            return Err(BridgeError::InvalidTopology(format!(
                "domain '{}' references unknown node '{}'",
                name, unknown
            )));
        }
        self.domains.insert(name, members);
        Ok(())
    }

    /// Scope for an optional domain name.
    pub fn scope(&self, domain: Option<&str>) -> Result<Scope<'_>> {
        match domain {
            None => Ok(Scope::All),
            Some(name) => self
                .domains
                .get_key_value(name)
                .map(|(name, members)| Scope::Domain { name, members })
                .ok_or_else(|| BridgeError::InvalidTopology(format!("unknown domain '{}'", name))),
        }
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.by_name.get(name).map(|&i| &self.nodes[i])
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(id.0)
    }

    pub fn links(&self) -> impl Iterator<Item = (LinkId, &Link)> {
        self.links.iter().enumerate().map(|(i, l)| (LinkId(i), l))
    }

    pub fn domain_names(&self) -> impl Iterator<Item = &str> {
        self.domains.keys().map(String::as_str)
    }

    /// Trunk or cross-connect, by how many endpoints are ROADMs.
    pub fn optical_kind(&self, link: &Link) -> Option<OpticalKind> {
        if link.kind != LinkKind::Optical {
            return None;
        }
        self.classify(link)
    }

    fn classify(&self, link: &Link) -> Option<OpticalKind> {
        let a = self.node(&link.a.node)?.is_roadm();
        let b = self.node(&link.b.node)?.is_roadm();
        match (a, b) {
            (true, true) => Some(OpticalKind::Trunk),
            (true, false) | (false, true) => Some(OpticalKind::CrossConnect),
            (false, false) => None,
        }
    }

    /// Ports of `node`, ordered by port number.
    ///
    /// On optical links the speed is the one configured on the ROADM side:
    /// a ROADM reports its own endpoint's speed, a packet switch the far
    /// end's. Packet links yield copper ports with speed 0.
    pub fn ports(&self, node: &str) -> Vec<Port> {
        let Some(this) = self.node(node) else {
            return Vec::new();
        };
        let mut ports = BTreeMap::new();
        for link in &self.links {
            let (Some(own), Some(far)) = (link.endpoint_on(node), link.far_end(node)) else {
                continue;
            };
            let port = match self.optical_kind(link) {
                Some(kind) => Port {
                    port: own.port,
                    speed: if this.is_roadm() { own.speed } else { far.speed },
                    port_type: match kind {
                        OpticalKind::CrossConnect => PortType::Och,
                        OpticalKind::Trunk => PortType::Oms,
                    },
                },
                None => Port { port: own.port, speed: 0, port_type: PortType::Copper },
            };
            ports.insert(own.port, port);
        }
        ports.into_values().collect()
    }

    /// Every cross-connect link.
    pub fn cross_connects(&self) -> Vec<LinkId> {
        self.links()
            .filter(|(_, l)| self.optical_kind(l) == Some(OpticalKind::CrossConnect))
            .map(|(id, _)| id)
            .collect()
    }

    /// Cross-connects terminating on the ROADM `roadm`.
    pub fn cross_connects_of(&self, roadm: &str) -> Vec<LinkId> {
        self.cross_connects()
            .into_iter()
            .filter(|id| self.links[id.0].endpoint_on(roadm).is_some())
            .collect()
    }

    /// (ROADM endpoint, packet-switch endpoint) of a cross-connect.
    pub fn cross_connect_ends(&self, id: LinkId) -> Option<(&Endpoint, &Endpoint)> {
        let link = self.link(id)?;
        if self.optical_kind(link) != Some(OpticalKind::CrossConnect) {
            return None;
        }
        if self.node(&link.a.node)?.is_roadm() {
            Some((&link.a, &link.b))
        } else {
            Some((&link.b, &link.a))
        }
    }
}
