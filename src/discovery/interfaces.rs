//! Kernel tap interfaces on the emulation host.

use std::collections::BTreeSet;

use log::{debug, warn};

use crate::error::Result;
use crate::utils::{CommandRunner, Invocation};

use super::taps::interface_names;

/// Creates and activates the taps LINC-OE attaches its ports to.
pub struct TapProvisioner<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> TapProvisioner<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }

    /// Names of every interface currently on the host.
    pub fn present(&self) -> Result<BTreeSet<String>> {
        let output = self.runner.run(&Invocation::new("ip").args(["-o", "link", "show"]))?;
        Ok(interface_names(&output).map(str::to_string).collect())
    }

    /// Number of tap interfaces currently on the host.
    pub fn count_present(&self) -> Result<usize> {
        Ok(self.present()?.iter().filter(|name| name.starts_with("tap")).count())
    }

    /// Make sure `name` exists and is up.
    pub fn ensure(&self, name: &str) -> Result<()> {
        let present = self.present()?;
        self.ensure_with(name, &present)
    }

    /// Make sure every interface in `names` exists and is up; returns how many were created.
    pub fn ensure_all<'n, I>(&self, names: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'n str>,
    {
        let present = self.present()?;
        let mut created = 0;
        for name in names {
            if !present.contains(name) {
                created += 1;
            }
            self.ensure_with(name, &present)?;
        }
        Ok(created)
    }

    fn ensure_with(&self, name: &str, present: &BTreeSet<String>) -> Result<()> {
        if present.contains(name) {
            debug!("{} already present", name);
        } else {
            let add = Invocation::new("ip").args(["tuntap", "add", "dev", name, "mode", "tap"]);
            self.report(&add, self.runner.run(&add)?);
        }
        let up = Invocation::new("ip").args(["link", "set", "dev", name, "up"]);
        self.report(&up, self.runner.run(&up)?);
        Ok(())
    }

    fn report(&self, invocation: &Invocation, output: String) {
        let output = output.trim();
        if !output.is_empty() {
            warn!("`{}`: {}", invocation, output);
        }
    }
}
