//! Network topology module.
//!
//! This module contains the in-memory model of switches, links and ports,
//! and the YAML description it is built from.

pub mod description;
pub mod graph;
pub mod types;

// Re-export key types for easier access
pub use description::{LinkDescription, SwitchDescription, TopologyDescription};
pub use graph::{Scope, Topology};
pub use types::{
    keys, Annotations, DeviceType, Dpid, Endpoint, Link, LinkId, LinkKind, Node, OpticalKind, Port,
    PortType,
};
