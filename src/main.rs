use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use env_logger::Env;
use log::{error, info, warn};
use std::collections::BTreeSet;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use lincbridge::config::BridgeConfig;
use lincbridge::config_loader;
use lincbridge::discovery::{find_virtual_interface, OvsHost};
use lincbridge::linc::LincPaths;
use lincbridge::orchestrator::{self, Orchestrator};
use lincbridge::reconcile::{wait_for_devices, RestInventory};
use lincbridge::synth::build_inventory;
use lincbridge::topology::Dpid;
use lincbridge::utils::{CancelFlag, SystemRunner};

/// Bring up LINC-OE optical emulation for an ONOS-controlled topology
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the settings YAML file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "lincbridge=trace" (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write Topology.json and TopoConfig.json without starting anything
    Synth {
        /// Topology description YAML file
        #[arg(short, long)]
        topology: PathBuf,
        /// Only include devices of this domain
        #[arg(short, long)]
        domain: Option<String>,
        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
    /// Start the emulator, bind cross-connects and push the configuration
    Up {
        #[arg(short, long)]
        topology: PathBuf,
        #[arg(short, long)]
        domain: Option<String>,
        /// Leave the emulation running instead of waiting for Enter
        #[arg(long)]
        detach: bool,
    },
    /// Detach every cross-connect tap and stop the emulator
    Down {
        #[arg(short, long)]
        topology: PathBuf,
    },
    /// Look up the tap interface behind a ROADM port
    FindTap {
        /// Datapath id of the ROADM
        #[arg(long)]
        dpid: String,
        /// Port number on the ROADM
        #[arg(long)]
        port: u32,
        /// sys.config to search (default: the installed LINC-OE release)
        #[arg(long)]
        sys_config: Option<PathBuf>,
    },
    /// Wait until ONOS reports every device of the topology as available
    WaitDevices {
        #[arg(short, long)]
        topology: PathBuf,
        #[arg(short, long)]
        domain: Option<String>,
    },
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    let args = Args::parse();

    // Initialize logging with default filter level of "info"
    let mut logger = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    if let Some(level) = &args.log_level {
        logger.parse_filters(level);
    }
    logger.init();

    match args.command {
        Command::Synth { topology, domain, output } => synth(&topology, domain.as_deref(), &output),
        Command::Up { topology, domain, detach } => up(args.config.as_deref(), &topology, domain, detach),
        Command::Down { topology } => down(args.config.as_deref(), &topology),
        Command::FindTap { dpid, port, sys_config } => find_tap(args.config.as_deref(), &dpid, port, sys_config),
        Command::WaitDevices { topology, domain } => wait_devices(args.config.as_deref(), &topology, domain.as_deref()),
    }
}

fn synth(topology_path: &Path, domain: Option<&str>, output: &Path) -> Result<()> {
    let topology = config_loader::load_topology(topology_path)?;
    std::fs::create_dir_all(output)
        .wrap_err_with(|| format!("Failed to create output directory '{}'", output.display()))?;
    orchestrator::write_documents(&topology, domain, output).wrap_err("Failed to synthesize configuration")?;
    info!("Configuration written to {:?}", output);
    Ok(())
}

fn rest_inventory(config: &BridgeConfig) -> Result<RestInventory> {
    let controller = config
        .primary_controller()
        .ok_or_else(|| eyre!("No controller configured"))?;
    let inventory = RestInventory::new(&controller.ip, config.rest_port, config.credentials.clone())
        .wrap_err("Failed to create REST client")?;
    info!("Polling devices at {}", inventory.url());
    Ok(inventory)
}

fn up(config_path: Option<&Path>, topology_path: &Path, domain: Option<String>, detach: bool) -> Result<()> {
    let config = config_loader::load_config(config_path)?;
    let topology = config_loader::load_topology(topology_path)?;
    let inventory = rest_inventory(&config)?;
    let runner = SystemRunner;
    let host = OvsHost::new(SystemRunner);

    let mut orchestrator = Orchestrator::new(&config, &topology, &runner, &host, &inventory)
        .wrap_err("Cannot start the emulation")?
        .with_domain(domain);

    let report = match orchestrator.start() {
        Ok(report) => report,
        Err(e) => {
            error!("Bring-up failed, cleaning up");
            if let Err(stop_err) = orchestrator.stop() {
                warn!("Cleanup failed: {}", stop_err);
            }
            return Err(e).wrap_err("Bring-up failed");
        }
    };

    info!(
        "Emulation running: {} cross-connect(s) bound, {} warning(s)",
        report.bound,
        report.warnings.len()
    );
    for warning in &report.warnings {
        warn!("  {}", warning);
    }

    if detach {
        info!("Leaving the emulation running; use `lincbridge down` to stop it");
        return Ok(());
    }

    info!("Press Enter to stop the emulation");
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .wrap_err("Failed to read from stdin")?;

    orchestrator.stop().wrap_err("Teardown failed")?;
    info!("Emulation stopped");
    Ok(())
}

fn down(config_path: Option<&Path>, topology_path: &Path) -> Result<()> {
    let config = config_loader::load_config(config_path)?;
    let topology = config_loader::load_topology(topology_path)?;
    let inventory = rest_inventory(&config)?;
    let runner = SystemRunner;
    let host = OvsHost::new(SystemRunner);

    let mut orchestrator = Orchestrator::new(&config, &topology, &runner, &host, &inventory)
        .wrap_err("Cannot locate the emulation")?;
    if let Err(e) = orchestrator.rediscover() {
        warn!("Cannot recover tap bindings, only stopping LINC-OE: {}", e);
    }
    orchestrator.stop().wrap_err("Teardown failed")?;
    info!("Emulation stopped");
    Ok(())
}

fn find_tap(config_path: Option<&Path>, dpid: &str, port: u32, sys_config: Option<PathBuf>) -> Result<()> {
    let dpid = Dpid::parse(dpid).wrap_err("Invalid datapath id")?;

    let path = match sys_config {
        Some(path) => path,
        None => {
            let settings = match config_path {
                Some(path) => config_loader::load_settings(path)?,
                None => Default::default(),
            };
            let config = BridgeConfig::from_env(settings)?;
            let linc_dir = config
                .linc_dir
                .as_deref()
                .ok_or_else(|| eyre!("LINC-OE not found; pass --sys-config or set linc_dir"))?;
            LincPaths::new(linc_dir, &config.user).sys_config()
        }
    };

    let text = std::fs::read_to_string(&path).wrap_err_with(|| format!("Failed to read {:?}", path))?;
    match find_virtual_interface(&text, dpid.as_str(), port) {
        Ok(tap) => {
            println!("{}", tap);
            Ok(())
        }
        Err(reason) => Err(eyre!("No tap interface for {} port {}: {}", dpid, port, reason)),
    }
}

fn wait_devices(config_path: Option<&Path>, topology_path: &Path, domain: Option<&str>) -> Result<()> {
    let config = config_loader::load_config(config_path)?;
    let topology = config_loader::load_topology(topology_path)?;
    let inventory = rest_inventory(&config)?;

    let scope = topology.scope(domain)?;
    let expected: BTreeSet<String> = build_inventory(&topology, &scope, |_| None)
        .device_uris()
        .map(str::to_string)
        .collect();

    wait_for_devices(&inventory, &expected, &config.device_wait, &CancelFlag::new())
        .wrap_err("Devices did not become available")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let args = Args::parse_from([
            "lincbridge",
            "--config",
            "bridge.yaml",
            "up",
            "--topology",
            "topo.yaml",
            "--domain",
            "east",
            "--detach",
        ]);

        assert_eq!(args.config, Some(PathBuf::from("bridge.yaml")));
        match args.command {
            Command::Up { topology, domain, detach } => {
                assert_eq!(topology, PathBuf::from("topo.yaml"));
                assert_eq!(domain.as_deref(), Some("east"));
                assert!(detach);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_find_tap_args() {
        let args = Args::parse_from([
            "lincbridge",
            "find-tap",
            "--dpid",
            "0000ffffffffff01",
            "--port",
            "3",
            "--log-level",
            "debug",
        ]);

        assert_eq!(args.log_level.as_deref(), Some("debug"));
        match args.command {
            Command::FindTap { dpid, port, sys_config } => {
                assert_eq!(dpid, "0000ffffffffff01");
                assert_eq!(port, 3);
                assert!(sys_config.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_synth_default_output() {
        let args = Args::parse_from(["lincbridge", "synth", "-t", "topo.yaml"]);
        match args.command {
            Command::Synth { output, domain, .. } => {
                assert_eq!(output, PathBuf::from("."));
                assert!(domain.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
