//! Error taxonomy for synthesis, discovery and bring-up.
//!
//! Only a few kinds halt a bring-up (see [`BridgeError::is_fatal`]). The
//! others are reported as warnings and the sequence carries on, which is the
//! behaviour an emulation testbed wants when part of a topology is slow or
//! only partially present.

use std::path::PathBuf;
use std::time::Duration;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Errors produced while bridging a topology to LINC-OE and ONOS.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// A required installation (ONOS, linc-oe, config generator) is missing.
    #[error("{what} not found: {hint}")]
    ConfigurationMissing { what: String, hint: String },

    /// The external config generator printed diagnostics.
    #[error("error creating sys.config: {output}")]
    SynthesisFailure { output: String },

    /// `linc start` printed diagnostics.
    #[error("LINC-OE failed to start: {output}")]
    EmulatorStart { output: String },

    /// No tap interface could be matched for an optical port.
    #[error("no tap interface for {dpid} port {port}: {reason}")]
    DiscoveryMiss {
        dpid: String,
        port: u32,
        reason: MissReason,
    },

    /// The switch host refused to attach or detach an interface.
    #[error("cannot bind {interface} to {node}: {output}")]
    Binding {
        node: String,
        interface: String,
        output: String,
    },

    /// `onos-topo-cfg` printed something other than `{}`.
    #[error("could not push {document} to {controller}: {output}")]
    PushRejected {
        controller: String,
        document: String,
        output: String,
    },

    /// A bounded wait ran out of budget.
    #[error("{what} not ready within {waited:?}")]
    ReconciliationTimeout { what: String, waited: Duration },

    /// Emulator pipes and other best-effort file operations.
    #[error("I/O on {path} failed: {source}")]
    TransientIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `start` was called while a bring-up is in progress or running.
    #[error("cannot start: bring-up is {phase}")]
    NotIdle { phase: String },

    /// The caller raised the cancellation flag between poll iterations.
    #[error("cancelled while waiting for {what}")]
    Cancelled { what: String },

    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    #[error("failed to run `{command}`: {source}")]
    Command {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O on {path} failed: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("controller request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Which stage of the two-level tap lookup came up empty.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MissReason {
    #[error("device block not found in sys.config")]
    NoDeviceBlock,
    #[error("port not declared in the device block")]
    NoPortLine,
    #[error("port line carries no internal port index")]
    NoPortIndex,
    #[error("no tap bound to internal port {0}")]
    NoTap(u32),
}

impl BridgeError {
    /// Whether this error aborts a bring-up instead of degrading it.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BridgeError::ConfigurationMissing { .. }
                | BridgeError::SynthesisFailure { .. }
                | BridgeError::EmulatorStart { .. }
                | BridgeError::InvalidTopology(_)
                | BridgeError::Cancelled { .. }
                | BridgeError::NotIdle { .. }
                | BridgeError::Command { .. }
                | BridgeError::Io { .. }
                | BridgeError::Json(_)
        )
    }

    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> BridgeError {
        let path = path.into();
        move |source| BridgeError::Io { path, source }
    }

    pub(crate) fn transient(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> BridgeError {
        let path = path.into();
        move |source| BridgeError::TransientIo { path, source }
    }
}
