//! LINC-OE Erlang shell access through the `run_erl` pipes.

use std::fmt;
use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::PathBuf;

use log::{debug, warn};

use crate::error::{BridgeError, Result};

use super::paths::LincPaths;

/// Commands understood by the LINC shell. Switch ids are LINC's own
/// sequential ids, not datapath ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LincCommand {
    StartSwitch(u32),
    StopSwitch(u32),
    PortUp { switch: u32, port: u32 },
    PortDown { switch: u32, port: u32 },
}

impl LincCommand {
    /// The command as written to the pipe, terminated by `\r\n`.
    pub fn wire(&self) -> String {
        format!("{}\r\n", self)
    }
}

impl fmt::Display for LincCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LincCommand::StartSwitch(id) => write!(f, "linc:start_switch({}).", id),
            LincCommand::StopSwitch(id) => write!(f, "linc:stop_switch({}).", id),
            LincCommand::PortUp { switch, port } => write!(f, "linc:port_up({},{}).", switch, port),
            LincCommand::PortDown { switch, port } => write!(f, "linc:port_down({},{}).", switch, port),
        }
    }
}

/// Write and read ends of the emulator console.
#[derive(Debug, Clone)]
pub struct LincConsole {
    write_pipe: PathBuf,
    read_pipe: PathBuf,
}

impl LincConsole {
    pub fn new(paths: &LincPaths) -> Self {
        Self {
            write_pipe: paths.write_pipe(),
            read_pipe: paths.read_pipe(),
        }
    }

    /// Send `command`. Pipe failures are logged and yield `None`.
    ///
    /// The pipes are FIFOs; opening non-blocking makes a missing reader
    /// (emulator down) fail at once instead of hanging.
    pub fn send(&self, command: LincCommand) -> Option<()> {
        debug!("LINC <- {}", command);
        match self.try_send(command) {
            Ok(()) => Some(()),
            Err(e) => {
                warn!("Cannot send `{}` to LINC: {}", command, e);
                None
            }
        }
    }

    fn try_send(&self, command: LincCommand) -> Result<()> {
        let mut pipe = OpenOptions::new()
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(&self.write_pipe)
            .map_err(BridgeError::transient(&self.write_pipe))?;
        pipe.write_all(command.wire().as_bytes())
            .map_err(BridgeError::transient(&self.write_pipe))
    }

    /// Whatever the shell has written since the last read.
    ///
    /// The read never blocks, so it is often empty right after a command.
    pub fn read_reply(&self) -> Option<String> {
        let result = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(&self.read_pipe)
            .and_then(|mut pipe| {
                let mut buf = Vec::new();
                match pipe.read_to_end(&mut buf) {
                    Ok(_) => Ok(buf),
                    Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(buf),
                    Err(e) => Err(e),
                }
            });

        match result {
            Ok(buf) => Some(String::from_utf8_lossy(&buf).into_owned()),
            Err(e) => {
                debug!("{}", BridgeError::transient(&self.read_pipe)(e));
                None
            }
        }
    }
}
