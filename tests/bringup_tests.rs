//! End-to-end bring-up and teardown against scripted collaborators.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::time::Duration;

use lincbridge::config::{BridgeConfig, BridgeSettings, ControllerConfig};
use lincbridge::discovery::InterfaceHost;
use lincbridge::linc::LincPaths;
use lincbridge::orchestrator::{Orchestrator, Phase};
use lincbridge::reconcile::{DeviceInventory, DeviceList, DeviceStatus};
use lincbridge::synth::NetworkConfig;
use lincbridge::topology::{Topology, TopologyDescription};
use lincbridge::utils::{CancelFlag, CommandRunner, Invocation, PollPolicy};
use lincbridge::{BridgeError, Result};
use tempfile::TempDir;

const TOPOLOGY: &str = r#"
switches:
  - name: r1
    dpid: "0000ffffffffff01"
    kind: roadm
  - name: r2
    dpid: "0000ffffffffff02"
    kind: roadm
  - name: s1
    dpid: "0000000000000001"
    mac: "0a:00:00:00:00:01"
  - name: s2
    dpid: "0000000000000002"
    mac: "0a:00:00:00:00:02"
links:
  - node1: r1
    port1: 10
    node2: r2
    port2: 10
    annotations: { optical.type: WDM, optical.waves: 80 }
  - node1: r1
    port1: 1
    speed1: 10000
    node2: s1
    port2: 1
    annotations: { optical.type: cross-connect }
  - node1: s2
    port1: 1
    node2: r2
    port2: 1
    speed2: 10000
    annotations: { optical.type: cross-connect }
"#;

const GENERATED_SYS_CONFIG: &str = r#"[{linc,
  [{of_config,disabled},
   {capable_switch_ports,
    [{port,1,[{interface,"tap0"}]},
     {port,2,[{interface,"tap1"}]}]},
   {logical_switches,
    [{switch,1,
      [{backend,linc_us4_oe},
       {datapath_id,"00:00:ff:ff:ff:ff:ff:01"},
       {controllers,[{"Switch0-Controller","10.0.0.1",6633,tcp}]},
       {ports,[{port,1,{queues,[]},{port_no,1}}]}]},
     {switch,2,
      [{backend,linc_us4_oe},
       {datapath_id,"00:00:ff:ff:ff:ff:ff:02"},
       {controllers,[{"Switch0-Controller","10.0.0.1",6633,tcp}]},
       {ports,[{port,2,{queues,[]},{port_no,1}}]}]}]}]}].
"#;

/// Scripted host: config generator, `ip`, `linc` and `onos-topo-cfg`.
#[derive(Default)]
struct FakeRunner {
    generator_output: &'static str,
    start_output: &'static str,
    calls: RefCell<Vec<Invocation>>,
}

impl FakeRunner {
    fn calls_to(&self, program: &str) -> Vec<Invocation> {
        self.calls
            .borrow()
            .iter()
            .filter(|inv| inv.program_name() == program)
            .cloned()
            .collect()
    }

    fn linc(&self, action: &str) -> usize {
        self.calls_to("linc")
            .iter()
            .filter(|inv| inv.args == [action])
            .count()
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, invocation: &Invocation) -> Result<String> {
        self.calls.borrow_mut().push(invocation.clone());
        let output = match invocation.program_name() {
            "config_generator" => {
                let dir = invocation.cwd.clone().unwrap_or_else(|| PathBuf::from("."));
                std::fs::write(dir.join("sys.config"), GENERATED_SYS_CONFIG).unwrap();
                self.generator_output
            }
            "ip" if invocation.args.first().map(String::as_str) == Some("-o") => {
                "1: lo: <LOOPBACK,UP>\n7: tap0: <BROADCAST,UP>\n8: tap1: <BROADCAST,UP>\n"
            }
            "linc" if invocation.args == ["start"] => self.start_output,
            "onos-topo-cfg" => "{}",
            _ => "",
        };
        Ok(output.to_string())
    }
}

#[derive(Default)]
struct FakeHost {
    calls: RefCell<Vec<String>>,
}

impl InterfaceHost for FakeHost {
    fn attach(&self, node: &str, interface: &str) -> Result<()> {
        self.calls.borrow_mut().push(format!("attach {} {}", node, interface));
        Ok(())
    }

    fn detach(&self, node: &str, interface: &str) -> Result<()> {
        self.calls.borrow_mut().push(format!("detach {} {}", node, interface));
        Ok(())
    }
}

struct FakeInventory {
    available: bool,
}

impl DeviceInventory for FakeInventory {
    fn fetch(&self) -> Result<DeviceList> {
        let devices = [
            "of:0000ffffffffff01",
            "of:0000ffffffffff02",
            "of:0000000000000001",
            "of:0000000000000002",
        ]
        .into_iter()
        .map(|id| DeviceStatus::new(id, self.available))
        .collect();
        Ok(DeviceList { devices })
    }
}

/// Reports nothing available and raises `cancel` on the first fetch, as an
/// operator interrupting a slow controller would.
struct InterruptedInventory {
    cancel: CancelFlag,
    fetches: RefCell<u32>,
}

impl DeviceInventory for InterruptedInventory {
    fn fetch(&self) -> Result<DeviceList> {
        *self.fetches.borrow_mut() += 1;
        self.cancel.cancel();
        Ok(DeviceList::default())
    }
}

struct Testbed {
    root: TempDir,
    config: BridgeConfig,
    topology: Topology,
}

impl Testbed {
    fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        for dir in ["onos", "linc-oe/rel/linc/releases/1.0", "LINC-config-generator", "work", "pipes"] {
            std::fs::create_dir_all(root.path().join(dir)).unwrap();
        }

        let fast = PollPolicy::new(Duration::from_millis(1), Duration::from_millis(5));
        let settings = BridgeSettings {
            controllers: vec![ControllerConfig::new("10.0.0.1", 6633), ControllerConfig::new("10.0.0.2", 6633)],
            user: Some("tester".to_string()),
            onos_root: Some(root.path().join("onos")),
            linc_dir: Some(root.path().join("linc-oe")),
            config_gen_dir: Some(root.path().join("LINC-config-generator")),
            work_dir: Some(root.path().join("work")),
            interface_wait: Some(fast),
            device_wait: Some(fast),
            ..Default::default()
        };
        let config = BridgeConfig::resolve(settings, |_| None).unwrap();
        config.validate().unwrap();

        let description: TopologyDescription = serde_yaml::from_str(TOPOLOGY).unwrap();
        let topology = description.build().unwrap();

        Self { root, config, topology }
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.root.path().join(rel)
    }

    fn orchestrator<'a>(
        &'a self,
        runner: &'a FakeRunner,
        host: &'a FakeHost,
        inventory: &'a dyn DeviceInventory,
    ) -> Orchestrator<'a> {
        let paths = LincPaths::new(&self.path("linc-oe"), "tester").with_pipe_dir(self.path("pipes"));
        Orchestrator::new(&self.config, &self.topology, runner, host, inventory)
            .unwrap()
            .with_paths(paths)
    }
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

#[test]
fn test_full_bringup() {
    let bed = Testbed::new();
    let runner = FakeRunner::default();
    let host = FakeHost::default();
    let inventory = FakeInventory { available: true };
    let mut orch = bed.orchestrator(&runner, &host, &inventory);

    let report = orch.start().unwrap();

    assert_eq!(orch.phase(), Phase::Running);
    assert_eq!(report.bound, 2);
    assert!(!report.degraded, "unexpected warnings: {:?}", report.warnings);
    assert_eq!(*host.calls.borrow(), vec!["attach s1 tap0", "attach s2 tap1"]);
    assert!(orch.bindings().is_consistent(&bed.topology));

    // documents in the work directory
    let network: NetworkConfig = serde_json::from_str(&read(&bed.path("work/Topology.json"))).unwrap();
    assert_eq!(network.devices.len(), 4);
    assert_eq!(network.links.len(), 3);
    assert_eq!(network.devices["of:0000000000000001"].basic["mac"], "0a0000000001");
    let linc: serde_json::Value = serde_json::from_str(&read(&bed.path("work/TopoConfig.json"))).unwrap();
    assert_eq!(linc["switchConfig"].as_array().unwrap().len(), 2);
    assert_eq!(linc["linkConfig"][0]["type"], "wdmLink");

    // installed startup configuration carries both controllers
    let installed = read(&bed.path("linc-oe/rel/linc/releases/1.0/sys.config"));
    assert!(installed.contains(r#"{"Switch1-Controller","10.0.0.2",6633,tcp}"#));
    assert_eq!(orch.switch_ids().get("00:00:ff:ff:ff:ff:ff:02"), Some(2));

    // taps provisioned before start, config pushed to every controller
    assert_eq!(runner.linc("start"), 1);
    let pushes = runner.calls_to("onos-topo-cfg");
    assert_eq!(pushes.len(), 2);
    assert_eq!(pushes[1].args, ["10.0.0.2", "Topology.json", "network/configuration/"]);
    assert_eq!(pushes[1].cwd.as_deref(), Some(bed.path("work").as_path()));
    assert!(runner
        .calls_to("ip")
        .iter()
        .any(|inv| inv.to_string() == "ip link set dev tap1 up"));
}

#[test]
fn test_stop_twice_is_a_noop() {
    let bed = Testbed::new();
    let runner = FakeRunner::default();
    let host = FakeHost::default();
    let inventory = FakeInventory { available: true };
    let mut orch = bed.orchestrator(&runner, &host, &inventory);
    orch.start().unwrap();

    orch.stop().unwrap();
    assert_eq!(orch.phase(), Phase::Idle);
    assert_eq!(orch.bindings().attached_count(), 0);
    let host_calls = host.calls.borrow().len();

    orch.stop().unwrap();
    assert_eq!(orch.bindings().attached_count(), 0);
    assert_eq!(host.calls.borrow().len(), host_calls);
    assert!(host.calls.borrow().contains(&"detach s2 tap1".to_string()));
    assert!(orch.bindings().is_consistent(&bed.topology));
    assert_eq!(runner.linc("stop"), 2);
}

#[test]
fn test_stop_without_start() {
    let bed = Testbed::new();
    let runner = FakeRunner::default();
    let host = FakeHost::default();
    let inventory = FakeInventory { available: true };
    let mut orch = bed.orchestrator(&runner, &host, &inventory);

    orch.stop().unwrap();
    assert!(host.calls.borrow().is_empty());
    assert_eq!(orch.bindings().attached_count(), 0);
}

#[test]
fn test_generator_output_aborts() {
    let bed = Testbed::new();
    let runner = FakeRunner {
        generator_output: "escript: exception error\n",
        ..Default::default()
    };
    let host = FakeHost::default();
    let inventory = FakeInventory { available: true };
    let mut orch = bed.orchestrator(&runner, &host, &inventory);

    let err = orch.start().unwrap_err();
    assert!(matches!(err, BridgeError::SynthesisFailure { .. }));
    assert!(err.is_fatal());
    assert_eq!(orch.phase(), Phase::Idle);
    assert_eq!(runner.linc("start"), 0);
    assert!(!bed.path("linc-oe/rel/linc/releases/1.0/sys.config").exists());
}

#[test]
fn test_emulator_start_failure_stops_emulator() {
    let bed = Testbed::new();
    let runner = FakeRunner {
        start_output: "Node is already running!\n",
        ..Default::default()
    };
    let host = FakeHost::default();
    let inventory = FakeInventory { available: true };
    let mut orch = bed.orchestrator(&runner, &host, &inventory);

    let err = orch.start().unwrap_err();
    assert!(matches!(err, BridgeError::EmulatorStart { .. }));
    assert_eq!(runner.linc("stop"), 1);
    assert!(host.calls.borrow().is_empty());
}

#[test]
fn test_controller_timeout_degrades() {
    let bed = Testbed::new();
    let runner = FakeRunner::default();
    let host = FakeHost::default();
    let inventory = FakeInventory { available: false };
    let mut orch = bed.orchestrator(&runner, &host, &inventory);

    let report = orch.start().unwrap();
    assert_eq!(orch.phase(), Phase::Running);
    assert!(report.degraded);
    assert!(report
        .warnings
        .iter()
        .any(|w| matches!(w, BridgeError::ReconciliationTimeout { .. })));
    assert_eq!(runner.calls_to("onos-topo-cfg").len(), 2);
}

#[test]
fn test_switch_restart_and_port_state() {
    let bed = Testbed::new();
    let runner = FakeRunner::default();
    let host = FakeHost::default();
    let inventory = FakeInventory { available: true };
    let mut orch = bed.orchestrator(&runner, &host, &inventory);
    orch.start().unwrap();

    let write_pipe = bed.path("pipes/erlang.pipe.1.w");
    std::fs::write(&write_pipe, "").unwrap();
    orch.stop_switch("r1").unwrap();
    assert_eq!(read(&write_pipe), "linc:stop_switch(1).\r\n");
    let r1 = orch.bindings().roadm("r1").unwrap();
    assert!(r1.attached.is_empty());
    assert_eq!(r1.detached.len(), 1);
    assert_eq!(host.calls.borrow().last().unwrap(), "detach s1 tap0");

    std::fs::write(&write_pipe, "").unwrap();
    let report = orch.start_switch("r1").unwrap();
    assert_eq!(read(&write_pipe), "linc:start_switch(1).\r\n");
    assert_eq!(report.bound.len(), 1);
    assert!(orch.bindings().is_consistent(&bed.topology));

    let cross: NetworkConfig = serde_json::from_str(&read(&bed.path("work/crossConnect.json"))).unwrap();
    assert!(cross.devices.is_empty());
    assert_eq!(
        cross.link_endpoints(),
        vec![("of:0000ffffffffff01/1".to_string(), "of:0000000000000001/1".to_string())]
    );
    let pushes = runner.calls_to("onos-topo-cfg");
    assert_eq!(pushes.last().unwrap().args, ["10.0.0.1", "crossConnect.json", "network/configuration/"]);

    std::fs::write(&write_pipe, "").unwrap();
    orch.set_port_state("r2", 10, false).unwrap();
    assert_eq!(read(&write_pipe), "linc:port_down(2,10).\r\n");

    assert!(matches!(
        orch.set_port_state("s1", 1, true),
        Err(BridgeError::InvalidTopology(_))
    ));
}

#[test]
fn test_rediscover_for_teardown() {
    let bed = Testbed::new();
    let runner = FakeRunner::default();
    let host = FakeHost::default();
    let inventory = FakeInventory { available: true };
    bed.orchestrator(&runner, &host, &inventory).start().unwrap();
    host.calls.borrow_mut().clear();

    // a second process only knows the installed sys.config
    let mut orch = bed.orchestrator(&runner, &host, &inventory);
    assert_eq!(orch.rediscover().unwrap(), 2);
    orch.stop().unwrap();
    assert_eq!(*host.calls.borrow(), vec!["detach s1 tap0", "detach s2 tap1"]);
}

#[test]
fn test_second_start_is_rejected() {
    let bed = Testbed::new();
    let runner = FakeRunner::default();
    let host = FakeHost::default();
    let inventory = FakeInventory { available: true };
    let mut orch = bed.orchestrator(&runner, &host, &inventory);
    orch.start().unwrap();
    let calls = runner.calls.borrow().len();

    let err = orch.start().unwrap_err();
    assert!(matches!(err, BridgeError::NotIdle { .. }));
    assert!(err.is_fatal());
    assert_eq!(orch.phase(), Phase::Running);
    assert_eq!(runner.calls.borrow().len(), calls);
    assert_eq!(runner.linc("start"), 1);
    assert_eq!(orch.bindings().attached_count(), 2);

    // a stopped emulation can be brought up again
    orch.stop().unwrap();
    orch.start().unwrap();
    assert_eq!(runner.linc("start"), 2);
    assert_eq!(orch.phase(), Phase::Running);
}

#[test]
fn test_cancel_during_device_wait_then_stop() {
    let bed = Testbed::new();
    let runner = FakeRunner::default();
    let host = FakeHost::default();
    let cancel = CancelFlag::new();
    let inventory = InterruptedInventory {
        cancel: cancel.clone(),
        fetches: RefCell::new(0),
    };
    let mut orch = bed.orchestrator(&runner, &host, &inventory).with_cancel(cancel);

    let err = orch.start().unwrap_err();
    assert!(matches!(err, BridgeError::Cancelled { .. }));
    assert_eq!(*inventory.fetches.borrow(), 1);
    assert_eq!(orch.phase(), Phase::WaitingForControllerSync);
    assert!(runner.calls_to("onos-topo-cfg").is_empty());
    assert_eq!(orch.bindings().attached_count(), 2);

    orch.stop().unwrap();
    assert_eq!(orch.phase(), Phase::Idle);
    assert_eq!(orch.bindings().attached_count(), 0);
    assert!(orch.bindings().is_consistent(&bed.topology));
    assert_eq!(runner.linc("stop"), 1);
    assert_eq!(
        host.calls.borrow()[2..].to_vec(),
        vec!["detach s1 tap0".to_string(), "detach s2 tap1".to_string()]
    );
}

#[test]
fn test_cancel_before_interfaces_appear() {
    let bed = Testbed::new();
    let runner = FakeRunner::default();
    let host = FakeHost::default();
    let inventory = FakeInventory { available: true };
    let cancel = CancelFlag::new();
    cancel.cancel();
    let mut orch = bed.orchestrator(&runner, &host, &inventory).with_cancel(cancel);

    let err = orch.start().unwrap_err();
    assert!(matches!(err, BridgeError::Cancelled { .. }));
    assert_eq!(orch.phase(), Phase::WaitingForInterfaces);
    assert_eq!(runner.linc("start"), 1);
    assert!(host.calls.borrow().is_empty());

    orch.stop().unwrap();
    assert_eq!(orch.phase(), Phase::Idle);
    assert_eq!(runner.linc("stop"), 1);
}
