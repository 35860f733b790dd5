//! Bring-up orchestrator.
//!
//! This module sequences a full emulation run: configuration synthesis,
//! emulator start, tap discovery and binding, controller reconciliation and
//! the final configuration push, plus the symmetric teardown.
//!
//! Failures before the emulator is running abort the bring-up. Anything
//! after that is collected as a warning and the run ends degraded.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use log::{error, info, warn};

use crate::config::{BridgeConfig, Installation};
use crate::discovery::{list_virtual_interfaces, BindReport, Binder, BindingTable, InterfaceHost, TapProvisioner};
use crate::error::{BridgeError, Result};
use crate::ident::SwitchIdTable;
use crate::linc::{LincCommand, LincConsole, LincEmulator, LincPaths};
use crate::reconcile::{wait_for_devices, DeviceInventory};
use crate::synth::inventory::link_descriptor;
use crate::synth::{
    generate_sys_config, links_only, sysfs_mac, OpticalInventory, Synthesis, CROSS_CONNECT_FILE,
    TOPOLOGY_FILE,
};
use crate::topology::Topology;
use crate::utils::{poll_until, write_atomic, write_json_atomic, CancelFlag, CommandRunner, Invocation};

/// Where a bring-up currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Synthesizing,
    Starting,
    WaitingForInterfaces,
    Binding,
    WaitingForControllerSync,
    Running,
    Stopping,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Synthesizing => "synthesizing",
            Phase::Starting => "starting",
            Phase::WaitingForInterfaces => "waiting for interfaces",
            Phase::Binding => "binding",
            Phase::WaitingForControllerSync => "waiting for controller sync",
            Phase::Running => "running",
            Phase::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

/// Outcome of a successful bring-up.
#[derive(Debug, Default)]
pub struct BringUpReport {
    /// Number of cross-connects with a bound tap
    pub bound: usize,
    /// Everything that went wrong without stopping the bring-up
    pub warnings: Vec<BridgeError>,
    /// Whether some wait timed out or some binding failed
    pub degraded: bool,
}

impl BringUpReport {
    fn warn(&mut self, e: BridgeError) {
        warn!("{}", e);
        self.degraded = true;
        self.warnings.push(e);
    }
}

/// Drives the emulator and the controller for one topology.
pub struct Orchestrator<'a> {
    config: &'a BridgeConfig,
    install: Installation,
    topology: &'a Topology,
    domain: Option<String>,
    runner: &'a dyn CommandRunner,
    host: &'a dyn InterfaceHost,
    inventory: &'a dyn DeviceInventory,
    paths: LincPaths,
    cancel: CancelFlag,
    phase: Phase,
    bindings: BindingTable,
    switch_ids: SwitchIdTable,
    synthesis: Option<Synthesis>,
}

impl<'a> Orchestrator<'a> {
    /// Fails with `ConfigurationMissing` if an installation cannot be found.
    pub fn new(
        config: &'a BridgeConfig,
        topology: &'a Topology,
        runner: &'a dyn CommandRunner,
        host: &'a dyn InterfaceHost,
        inventory: &'a dyn DeviceInventory,
    ) -> Result<Self> {
        let install = config.installation()?;
        let paths = LincPaths::new(&install.linc_dir, &config.user);
        Ok(Self {
            config,
            install,
            topology,
            domain: None,
            runner,
            host,
            inventory,
            paths,
            cancel: CancelFlag::new(),
            phase: Phase::Idle,
            bindings: BindingTable::from_topology(topology),
            switch_ids: SwitchIdTable::default(),
            synthesis: None,
        })
    }

    /// Restrict devices to the named domain.
    pub fn with_domain(mut self, domain: Option<String>) -> Self {
        self.domain = domain;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_paths(mut self, paths: LincPaths) -> Self {
        self.paths = paths;
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn bindings(&self) -> &BindingTable {
        &self.bindings
    }

    pub fn switch_ids(&self) -> &SwitchIdTable {
        &self.switch_ids
    }

    pub fn synthesis(&self) -> Option<&Synthesis> {
        self.synthesis.as_ref()
    }

    pub fn paths(&self) -> &LincPaths {
        &self.paths
    }

    /// Run the whole bring-up. Only allowed from [`Phase::Idle`].
    pub fn start(&mut self) -> Result<BringUpReport> {
        if self.phase != Phase::Idle {
            return Err(BridgeError::NotIdle { phase: self.phase.to_string() });
        }

        let sys_config = match self.synthesize().and_then(|text| self.launch(&text).map(|_| text)) {
            Ok(text) => text,
            Err(e) => {
                error!("Bring-up failed while {}: {}", self.phase, e);
                self.phase = Phase::Idle;
                return Err(e);
            }
        };

        let mut report = BringUpReport::default();

        self.phase = Phase::WaitingForInterfaces;
        if let Err(e) = self.wait_for_interfaces() {
            if matches!(e, BridgeError::Cancelled { .. }) {
                return Err(e);
            }
            report.warn(e);
        }

        self.phase = Phase::Binding;
        info!("Adding cross-connect (tap) interfaces to packet switches");
        self.bindings = BindingTable::from_topology(self.topology);
        let binder = Binder::new(self.topology, self.host, self.runner);
        let bound = binder.bind_all(&mut self.bindings, &sys_config);
        report.bound = bound.bound.len();
        for e in bound.warnings {
            report.warn(e);
        }

        self.phase = Phase::WaitingForControllerSync;
        let expected: BTreeSet<String> = self
            .synthesis
            .as_ref()
            .map(|s| s.inventory.device_uris().map(str::to_string).collect())
            .unwrap_or_default();
        if let Err(e) = wait_for_devices(self.inventory, &expected, &self.config.device_wait, &self.cancel) {
            if matches!(e, BridgeError::Cancelled { .. }) {
                return Err(e);
            }
            report.warn(e);
        }

        info!("Pushing {} to ONOS", TOPOLOGY_FILE);
        for controller in &self.config.controllers {
            if let Err(e) = self.push(&controller.ip, TOPOLOGY_FILE) {
                report.warn(e);
            }
        }

        self.phase = Phase::Running;
        if report.degraded {
            warn!("Bring-up finished degraded with {} warning(s)", report.warnings.len());
        } else {
            info!("Bring-up finished, {} cross-connect(s) bound", report.bound);
        }
        Ok(report)
    }

    /// Write the documents, generate `sys.config` and install it into the release.
    fn synthesize(&mut self) -> Result<String> {
        self.phase = Phase::Synthesizing;
        let scope = self.topology.scope(self.domain.as_deref())?;
        let synthesis = Synthesis::from_topology(self.topology, &scope, sysfs_mac)?;

        let work_dir = self.config.work_dir();
        synthesis.write_documents(work_dir)?;
        let generated = generate_sys_config(
            self.runner,
            &self.install.config_gen_dir,
            work_dir,
            &self.config.controllers,
        )?;

        let text = std::fs::read_to_string(&generated).map_err(BridgeError::io(&generated))?;
        let installed = self.paths.sys_config();
        info!("Copying sys.config to {:?}", installed);
        write_atomic(&installed, text.as_bytes())?;

        self.switch_ids = SwitchIdTable::from_config_text(&text);
        self.synthesis = Some(synthesis);
        Ok(text)
    }

    /// Provision taps, clear stale pipes and start the emulator.
    fn launch(&mut self, sys_config: &str) -> Result<()> {
        self.phase = Phase::Starting;
        let taps = list_virtual_interfaces(sys_config);
        info!("Adding {} tap(s) and bringing them up", taps.len());
        TapProvisioner::new(self.runner).ensure_all(taps.iter().map(String::as_str))?;

        let removed = self.paths.clear_pipes();
        if removed > 0 {
            info!("Removed {} stale pipe(s)", removed);
        }

        LincEmulator::new(&self.paths, self.runner).start()
    }

    /// Wait until at least one tap per cross-connect exists. A domain may see
    /// more taps than its own cross-connects.
    fn wait_for_interfaces(&self) -> Result<usize> {
        let expected = self.topology.cross_connects().len();
        info!("Waiting for {} tap interface(s)", expected);
        let taps = TapProvisioner::new(self.runner);
        poll_until("tap interfaces", &self.config.interface_wait, &self.cancel, |_| {
            taps.count_present().ok().filter(|count| *count >= expected)
        })
    }

    /// Run `onos-topo-cfg` for `document` in the work directory.
    fn push(&self, controller: &str, document: &str) -> Result<()> {
        let script = self.install.onos_root.join("tools/test/bin/onos-topo-cfg");
        let invocation = Invocation::path(&script)
            .args([controller, document, "network/configuration/"])
            .current_dir(self.config.work_dir());
        let output = self.runner.run(&invocation)?;
        let remainder = output.trim().trim_matches(|c| c == '{' || c == '}').trim();
        if remainder.is_empty() {
            Ok(())
        } else {
            Err(BridgeError::PushRejected {
                controller: controller.to_string(),
                document: document.to_string(),
                output: output.trim().to_string(),
            })
        }
    }

    /// Tear everything down. Safe to call in any phase and more than once.
    pub fn stop(&mut self) -> Result<()> {
        self.phase = Phase::Stopping;
        let binder = Binder::new(self.topology, self.host, self.runner);
        let failures = binder.unbind_all(&mut self.bindings);
        if !failures.is_empty() {
            warn!("{} tap(s) could not be detached cleanly", failures.len());
        }

        let stopped = LincEmulator::new(&self.paths, self.runner).stop();
        self.phase = Phase::Idle;
        stopped
    }

    /// Rebuild bindings and switch ids from the installed `sys.config`, for
    /// tearing down a bring-up made by an earlier process.
    pub fn rediscover(&mut self) -> Result<usize> {
        let text = self.installed_sys_config()?;
        self.switch_ids = SwitchIdTable::from_config_text(&text);
        self.bindings = BindingTable::from_topology(self.topology);
        let binder = Binder::new(self.topology, self.host, self.runner);
        let recovered = binder.recover(&mut self.bindings, &text);
        info!("Recovered {} cross-connect binding(s)", recovered);
        Ok(recovered)
    }

    /// Stop one emulated ROADM and detach its cross-connects.
    pub fn stop_switch(&mut self, name: &str) -> Result<()> {
        let id = self.linc_id(name)?;
        LincConsole::new(&self.paths).send(LincCommand::StopSwitch(id));

        let binder = Binder::new(self.topology, self.host, self.runner);
        for e in binder.unbind(&mut self.bindings, name) {
            warn!("{}", e);
        }
        Ok(())
    }

    /// Start one emulated ROADM again, rebind its detached cross-connects and
    /// tell the first controller about them.
    pub fn start_switch(&mut self, name: &str) -> Result<BindReport> {
        let id = self.linc_id(name)?;
        LincConsole::new(&self.paths).send(LincCommand::StartSwitch(id));

        let text = self.installed_sys_config()?;
        let binder = Binder::new(self.topology, self.host, self.runner);
        let mut report = binder.bind_detached(&mut self.bindings, name, &text);

        let links = self
            .topology
            .cross_connects_of(name)
            .into_iter()
            .filter_map(|id| self.topology.link(id))
            .filter_map(|link| link_descriptor(self.topology, link))
            .collect();
        let document = links_only(&OpticalInventory { devices: Vec::new(), links });
        write_json_atomic(&self.config.work_dir().join(CROSS_CONNECT_FILE), &document)?;

        info!("Pushing {} to ONOS", CROSS_CONNECT_FILE);
        if let Some(controller) = self.config.primary_controller() {
            if let Err(e) = self.push(&controller.ip, CROSS_CONNECT_FILE) {
                warn!("{}", e);
                report.warnings.push(e);
            }
        }
        Ok(report)
    }

    /// Bring a port of an emulated ROADM administratively up or down.
    pub fn set_port_state(&mut self, name: &str, port: u32, up: bool) -> Result<()> {
        let switch = self.linc_id(name)?;
        let command = if up {
            LincCommand::PortUp { switch, port }
        } else {
            LincCommand::PortDown { switch, port }
        };
        LincConsole::new(&self.paths).send(command);
        Ok(())
    }

    fn installed_sys_config(&self) -> Result<String> {
        let path = self.paths.sys_config();
        std::fs::read_to_string(&path).map_err(BridgeError::io(&path))
    }

    /// LINC's switch id for the ROADM `name`, loading the table on first use.
    fn linc_id(&mut self, name: &str) -> Result<u32> {
        let node = self
            .topology
            .node(name)
            .filter(|node| node.is_roadm())
            .ok_or_else(|| BridgeError::InvalidTopology(format!("{} is not a ROADM", name)))?;

        if self.switch_ids.is_empty() {
            if let Some(table) = SwitchIdTable::load(&self.paths.sys_config()) {
                self.switch_ids = table;
            }
        }

        self.switch_ids.get(node.dpid.as_str()).ok_or_else(|| {
            BridgeError::InvalidTopology(format!("{} ({}) is not configured in LINC-OE", name, node.dpid))
        })
    }
}

/// Work directory documents, for callers that only synthesize.
pub fn write_documents(topology: &Topology, domain: Option<&str>, dir: &Path) -> Result<Synthesis> {
    let scope = topology.scope(domain)?;
    let synthesis = Synthesis::from_topology(topology, &scope, sysfs_mac)?;
    let artifacts = synthesis.write_documents(dir)?;
    info!("Wrote {:?} and {:?}", artifacts.topology, artifacts.topo_config);
    Ok(synthesis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_names() {
        assert_eq!(Phase::WaitingForControllerSync.to_string(), "waiting for controller sync");
        assert_eq!(Phase::Idle.to_string(), "idle");
    }

    #[test]
    fn test_report_warning_marks_degraded() {
        let mut report = BringUpReport::default();
        assert!(!report.degraded);
        report.warn(BridgeError::Cancelled { what: "devices".into() });
        assert!(report.degraded);
        assert_eq!(report.warnings.len(), 1);
    }
}
