//! Shared utilities: process invocation, atomic writes, polling, installation lookup.

pub mod fs;
pub mod locate;
pub mod poll;
pub mod process;

pub use fs::{write_atomic, write_json_atomic};
pub use locate::{find_dir, find_user, home_dir_for, LocateError};
pub use poll::{poll_until, CancelFlag, PollPolicy};
pub use process::{CommandRunner, Invocation, SystemRunner};
