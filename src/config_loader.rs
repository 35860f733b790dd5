use crate::config::{BridgeConfig, BridgeSettings};
use crate::topology::{Topology, TopologyDescription};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::info;
use std::fs::File;
use std::path::Path;

/// Load bridge settings from a YAML file
pub fn load_settings(settings_path: &Path) -> Result<BridgeSettings> {
    info!("Loading settings from: {:?}", settings_path);

    let file = File::open(settings_path)
        .wrap_err_with(|| format!("Failed to open settings file {:?}", settings_path))?;
    let settings: BridgeSettings = serde_yaml::from_reader(file)
        .wrap_err_with(|| format!("Failed to parse settings file {:?}", settings_path))?;

    Ok(settings)
}

/// Resolve the bridge configuration from an optional settings file and the environment
pub fn load_config(settings_path: Option<&Path>) -> Result<BridgeConfig> {
    let settings = match settings_path {
        Some(path) => load_settings(path)?,
        None => BridgeSettings::default(),
    };

    let config = BridgeConfig::from_env(settings).wrap_err("Failed to resolve configuration")?;
    config.validate().wrap_err("Invalid configuration")?;

    info!(
        "Using {} controller(s), work directory {:?}",
        config.controllers.len(),
        config.work_dir
    );
    Ok(config)
}

/// Load and validate a topology description from a YAML file
pub fn load_topology(topology_path: &Path) -> Result<Topology> {
    info!("Loading topology from: {:?}", topology_path);

    let file = File::open(topology_path)
        .wrap_err_with(|| format!("Failed to open topology file {:?}", topology_path))?;
    let description: TopologyDescription = serde_yaml::from_reader(file)
        .wrap_err_with(|| format!("Failed to parse topology file {:?}", topology_path))?;

    let topology = description
        .build()
        .wrap_err_with(|| format!("Invalid topology in {:?}", topology_path))?;

    info!(
        "Loaded {} switch(es) and {} link(s), {} cross-connect(s)",
        topology.nodes().count(),
        topology.links().count(),
        topology.cross_connects().len()
    );
    Ok(topology)
}
