//! Starting and stopping the emulator through its release script.

use log::{info, warn};

use crate::error::{BridgeError, Result};
use crate::utils::{CommandRunner, Invocation};

use super::paths::LincPaths;

/// Runs `rel/linc/bin/linc start|stop`.
pub struct LincEmulator<'a> {
    paths: &'a LincPaths,
    runner: &'a dyn CommandRunner,
}

impl<'a> LincEmulator<'a> {
    pub fn new(paths: &'a LincPaths, runner: &'a dyn CommandRunner) -> Self {
        Self { paths, runner }
    }

    /// Start the emulator. Any output from the script means it failed; the
    /// emulator is then stopped again.
    pub fn start(&self) -> Result<()> {
        info!("Starting LINC-OE");
        let output = self.run("start")?;
        let output = output.trim();
        if output.is_empty() {
            return Ok(());
        }

        if let Err(e) = self.run("stop") {
            warn!("Failed to stop LINC-OE after a failed start: {}", e);
        }
        Err(BridgeError::EmulatorStart { output: output.to_string() })
    }

    /// Stop the emulator; stopping one that is not running is harmless.
    pub fn stop(&self) -> Result<()> {
        info!("Stopping LINC-OE");
        let output = self.run("stop")?;
        let output = output.trim();
        if !output.is_empty() {
            info!("linc stop: {}", output);
        }
        Ok(())
    }

    fn run(&self, action: &str) -> Result<String> {
        self.runner
            .run(&Invocation::path(&self.paths.control_script()).arg(action))
    }
}
