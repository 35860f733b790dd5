//! External program invocation.
//!
//! Every shell-out (config generator, `linc`, `ip`, `ovs-vsctl`,
//! `onos-topo-cfg`) goes through [`CommandRunner`] so the bring-up sequence
//! can be exercised against scripted fakes.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::debug;

use crate::error::{BridgeError, Result};

/// A single program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    /// Invocation of a program given by path.
    pub fn path(program: &Path) -> Self {
        Self::new(program.to_string_lossy())
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// File name of the program, e.g. `config_generator` for a full path.
    pub fn program_name(&self) -> &str {
        Path::new(&self.program)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(&self.program)
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Runs external programs to completion.
pub trait CommandRunner {
    /// Run the invocation and return its combined stdout and stderr.
    ///
    /// A non-zero exit status is not an error here: the tools this crate
    /// drives report problems by printing, so callers inspect the output.
    fn run(&self, invocation: &Invocation) -> Result<String>;
}

impl<T: CommandRunner + ?Sized> CommandRunner for &T {
    fn run(&self, invocation: &Invocation) -> Result<String> {
        (**self).run(invocation)
    }
}

/// [`CommandRunner`] backed by `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<String> {
        debug!("Running: {}", invocation);
        let mut command = Command::new(&invocation.program);
        command.args(&invocation.args);
        if let Some(dir) = &invocation.cwd {
            command.current_dir(dir);
        }

        let output = command.output().map_err(|source| BridgeError::Command {
            command: invocation.to_string(),
            source,
        })?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        if !output.status.success() {
            debug!("`{}` exited with {}", invocation, output.status);
        }
        Ok(text)
    }
}
