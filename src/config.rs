//! Bridge settings, environment resolution and installation lookup.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};
use crate::utils::{find_dir, find_user, home_dir_for, PollPolicy};

/// OpenFlow port LINC-OE connects to when none is given.
pub const DEFAULT_CONTROLLER_PORT: u16 = 6633;
/// ONOS REST API port.
pub const DEFAULT_REST_PORT: u16 = 8181;
pub const DEFAULT_WEB_USER: &str = "onos";
pub const DEFAULT_WEB_PASS: &str = "rocks";

fn default_controller_port() -> u16 {
    DEFAULT_CONTROLLER_PORT
}

/// A controller instance the emulated switches connect to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Address of the controller
    pub ip: String,
    /// (Optional) OpenFlow port (default: 6633)
    #[serde(default = "default_controller_port")]
    pub port: u16,
}

impl ControllerConfig {
    pub fn new(ip: impl Into<String>, port: u16) -> Self {
        Self { ip: ip.into(), port }
    }
}

/// HTTP basic auth credentials for the controller REST API.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            user: DEFAULT_WEB_USER.to_string(),
            password: DEFAULT_WEB_PASS.to_string(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Settings file as written by the operator. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeSettings {
    /// Controllers the emulated switches connect to
    #[serde(default)]
    pub controllers: Vec<ControllerConfig>,
    /// (Optional) Controller REST port (default: 8181)
    pub rest_port: Option<u16>,
    /// (Optional) REST credentials (default: ONOS_WEB_USER/ONOS_WEB_PASS, then onos/rocks)
    pub credentials: Option<Credentials>,
    /// (Optional) User whose home holds the installations (default: SUDO_USER, USER, whoami)
    pub user: Option<String>,
    /// (Optional) ONOS checkout (default: ONOS_ROOT, then ~/onos)
    pub onos_root: Option<PathBuf>,
    /// (Optional) LINC-OE checkout (default: ~/linc-oe)
    pub linc_dir: Option<PathBuf>,
    /// (Optional) LINC config generator checkout (default: ~/LINC-config-generator)
    pub config_gen_dir: Option<PathBuf>,
    /// (Optional) Where generated documents are written (default: current directory)
    pub work_dir: Option<PathBuf>,
    /// (Optional) Wait for emulator taps (e.g. interval "2s", timeout "60s")
    pub interface_wait: Option<PollPolicy>,
    /// (Optional) Wait for controller devices
    pub device_wait: Option<PollPolicy>,
}

/// Installation directories needed to run the emulator and push configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installation {
    pub onos_root: PathBuf,
    pub linc_dir: PathBuf,
    pub config_gen_dir: PathBuf,
}

/// Fully resolved configuration, built once and passed to every component.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub controllers: Vec<ControllerConfig>,
    pub rest_port: u16,
    pub credentials: Credentials,
    pub user: String,
    pub onos_root: Option<PathBuf>,
    pub linc_dir: Option<PathBuf>,
    pub config_gen_dir: Option<PathBuf>,
    pub work_dir: PathBuf,
    pub interface_wait: PollPolicy,
    pub device_wait: PollPolicy,
}

/// Errors found by [`BridgeConfig::validate`].
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid controller configuration: {0}")]
    InvalidController(String),
    #[error("Invalid wait policy: {0}")]
    InvalidPolicy(String),
}

impl BridgeConfig {
    /// Fill in everything the settings leave out.
    ///
    /// `env` looks up environment variables; directories that cannot be found
    /// are left unset and reported by [`BridgeConfig::installation`].
    pub fn resolve<F>(settings: BridgeSettings, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let user = match settings.user {
            Some(user) => user,
            None => find_user().map_err(|e| BridgeError::ConfigurationMissing {
                what: "user".to_string(),
                hint: e.to_string(),
            })?,
        };
        let home = home_dir_for(&user);

        let credentials = match settings.credentials {
            Some(credentials) => credentials,
            None => credentials_from_env(&env),
        };

        let onos_root = settings
            .onos_root
            .or_else(|| env("ONOS_ROOT").filter(|v| !v.is_empty()).map(PathBuf::from))
            .or_else(|| search(&home, "onos"));
        let linc_dir = settings.linc_dir.or_else(|| search(&home, "linc-oe"));
        let config_gen_dir = settings
            .config_gen_dir
            .or_else(|| search(&home, "LINC-config-generator"));

        Ok(Self {
            controllers: settings.controllers,
            rest_port: settings.rest_port.unwrap_or(DEFAULT_REST_PORT),
            credentials,
            user,
            onos_root,
            linc_dir,
            config_gen_dir,
            work_dir: settings.work_dir.unwrap_or_else(|| PathBuf::from(".")),
            interface_wait: settings.interface_wait.unwrap_or_default(),
            device_wait: settings.device_wait.unwrap_or_default(),
        })
    }

    /// [`BridgeConfig::resolve`] against the process environment.
    pub fn from_env(settings: BridgeSettings) -> Result<Self> {
        Self::resolve(settings, |key| std::env::var(key).ok())
    }

    /// The three installations, or `ConfigurationMissing` naming the first absent one.
    pub fn installation(&self) -> Result<Installation> {
        let require = |dir: &Option<PathBuf>, what: &str, hint: &str| {
            dir.clone().ok_or_else(|| BridgeError::ConfigurationMissing {
                what: what.to_string(),
                hint: hint.to_string(),
            })
        };
        Ok(Installation {
            onos_root: require(&self.onos_root, "ONOS", "set ONOS_ROOT or onos_root")?,
            linc_dir: require(
                &self.linc_dir,
                "LINC-OE",
                "install linc-oe in the user's home or set linc_dir",
            )?,
            config_gen_dir: require(
                &self.config_gen_dir,
                "LINC config generator",
                "install LINC-config-generator in the user's home or set config_gen_dir",
            )?,
        })
    }

    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.controllers.is_empty() {
            return Err(ValidationError::InvalidController(
                "at least one controller is required".to_string(),
            ));
        }

        let mut seen = BTreeSet::new();
        for controller in &self.controllers {
            if controller.ip.trim().is_empty() {
                return Err(ValidationError::InvalidController("controller ip is empty".to_string()));
            }
            if controller.port == 0 {
                return Err(ValidationError::InvalidController(format!(
                    "controller {} has port 0",
                    controller.ip
                )));
            }
            if !seen.insert((controller.ip.as_str(), controller.port)) {
                return Err(ValidationError::InvalidController(format!(
                    "controller {}:{} listed twice",
                    controller.ip, controller.port
                )));
            }
        }

        for (name, policy) in [("interface_wait", &self.interface_wait), ("device_wait", &self.device_wait)] {
            if policy.interval.is_zero() {
                return Err(ValidationError::InvalidPolicy(format!("{} interval must be non-zero", name)));
            }
            if policy.timeout < policy.interval {
                return Err(ValidationError::InvalidPolicy(format!(
                    "{} timeout is shorter than its interval",
                    name
                )));
            }
        }

        Ok(())
    }

    /// First controller; documents are pushed and devices polled there.
    pub fn primary_controller(&self) -> Option<&ControllerConfig> {
        self.controllers.first()
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }
}

fn credentials_from_env<F>(env: &F) -> Credentials
where
    F: Fn(&str) -> Option<String>,
{
    match (env("ONOS_WEB_USER"), env("ONOS_WEB_PASS")) {
        (Some(user), Some(password)) => Credentials { user, password },
        (user, password) => {
            warn!("ONOS_WEB_USER or ONOS_WEB_PASS not set, falling back to default REST credentials");
            let defaults = Credentials::default();
            Credentials {
                user: user.unwrap_or(defaults.user),
                password: password.unwrap_or(defaults.password),
            }
        }
    }
}

fn search(home: &Path, name: &str) -> Option<PathBuf> {
    match find_dir(home, name) {
        Ok(dir) => Some(dir),
        Err(e) => {
            debug!("{}", e);
            None
        }
    }
}
