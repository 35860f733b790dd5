//! LINC-OE emulator control.
//!
//! - `paths`: release layout and control pipe locations
//! - `emulator`: `linc start` / `linc stop`
//! - `cli`: per-switch commands written to the running emulator's shell

pub mod cli;
pub mod emulator;
pub mod paths;

pub use cli::{LincCommand, LincConsole};
pub use emulator::LincEmulator;
pub use paths::LincPaths;
