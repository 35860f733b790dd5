//! # Lincbridge - LINC-OE optical emulation bridge for ONOS
//!
//! This library connects an emulated packet/optical topology to the LINC-OE
//! optical switch emulator and to the ONOS network configuration API.
//!
//! ## Overview
//!
//! ROADMs in the topology are emulated by LINC-OE; packet switches are Open
//! vSwitch bridges. Lincbridge writes the configuration both sides need,
//! starts the emulator, finds the tap interfaces LINC-OE created for each
//! cross-connect, hands those taps to the packet switches and waits until the
//! controller reports every device as available.
//!
//! ## Key Features
//!
//! - **Config Synthesis**: `Topology.json` for ONOS, `TopoConfig.json` and a
//!   multi-controller `sys.config` for LINC-OE
//! - **Tap Discovery**: recovers emulator-assigned tap interfaces from `sys.config`
//! - **Reconciliation**: bounded, cancellable polling of the ONOS device inventory
//! - **Per-switch Control**: stop, start and port up/down through the LINC shell
//! - **Domains**: restrict devices to a named subgraph for multi-controller setups
//!
//! ## Architecture
//!
//! - `topology`: switches, links, ports and the YAML topology description
//! - `ident`: datapath id forms and the LINC switch id table
//! - `synth`: controller and emulator document generation
//! - `discovery`: tap lookup, tap provisioning and cross-connect binding
//! - `reconcile`: controller device availability
//! - `linc`: emulator layout, start/stop and shell commands
//! - `config` / `config_loader`: settings, environment and installation lookup
//! - `orchestrator`: the bring-up and teardown sequence
//! - `utils`: process invocation, atomic writes, polling
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use lincbridge::config_loader;
//! use lincbridge::discovery::OvsHost;
//! use lincbridge::orchestrator::Orchestrator;
//! use lincbridge::reconcile::RestInventory;
//! use lincbridge::utils::SystemRunner;
//!
//! let config = config_loader::load_config(Some(Path::new("lincbridge.yaml")))?;
//! let topology = config_loader::load_topology(Path::new("topology.yaml"))?;
//!
//! let controller = &config.controllers[0];
//! let inventory = RestInventory::new(&controller.ip, config.rest_port, config.credentials.clone())?;
//! let host = OvsHost::new(SystemRunner);
//!
//! let mut orchestrator = Orchestrator::new(&config, &topology, &SystemRunner, &host, &inventory)?;
//! let report = orchestrator.start()?;
//! println!("{} cross-connects bound", report.bound);
//! orchestrator.stop()?;
//! # Ok::<(), color_eyre::Report>(())
//! ```
//!
//! ## Topology Format
//!
//! ```yaml
//! switches:
//!   - name: r1
//!     dpid: "0000ffffffffff01"
//!     kind: roadm
//!     annotations: { latitude: 37.6, longitude: -122.3 }
//!   - name: s1
//!     dpid: "0000000000000001"
//! links:
//!   - node1: r1
//!     port1: 1
//!     speed1: 10000
//!     node2: s1
//!     port2: 2
//!     annotations: { optical.type: cross-connect }
//! ```

pub mod config;
pub mod config_loader;
pub mod discovery;
pub mod error;
pub mod ident;
pub mod linc;
pub mod orchestrator;
pub mod reconcile;
pub mod synth;
pub mod topology;
pub mod utils;

pub use error::{BridgeError, MissReason, Result};
