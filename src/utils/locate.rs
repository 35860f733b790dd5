//! Installation discovery.
//!
//! LINC-OE and the LINC config generator are expected to be checked out
//! directly under the invoking user's home directory. This module finds the
//! user and those directories.

use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::warn;

/// Errors that can occur while locating installations.
#[derive(Debug, thiserror::Error)]
pub enum LocateError {
    #[error("Cannot determine the invoking user")]
    NoUser,

    #[error("No directory named {name} under {home}")]
    NotFound { name: String, home: String },

    #[error("Cannot read {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Return the logged-in user, preferring the one behind `sudo`.
pub fn find_user() -> Result<String, LocateError> {
    for var in ["SUDO_USER", "USER", "LOGNAME"] {
        if let Ok(user) = env::var(var) {
            if !user.is_empty() {
                return Ok(user);
            }
        }
    }

    Command::new("whoami")
        .output()
        .ok()
        .map(|out| String::from_utf8_lossy(&out.stdout).trim().to_string())
        .filter(|user| !user.is_empty())
        .ok_or(LocateError::NoUser)
}

/// Home directory of `user` as the LINC tooling lays it out.
pub fn home_dir_for(user: &str) -> PathBuf {
    Path::new("/home").join(user)
}

/// Find a directory named `name` (ASCII case-insensitive) directly under `home`.
///
/// When more than one entry matches, the first in sorted order wins and a
/// warning names the choice.
pub fn find_dir(home: &Path, name: &str) -> Result<PathBuf, LocateError> {
    let entries = std::fs::read_dir(home).map_err(|source| LocateError::Unreadable {
        path: home.display().to_string(),
        source,
    })?;

    let mut matches: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter(|entry| entry.file_name().to_string_lossy().eq_ignore_ascii_case(name))
        .map(|entry| entry.path())
        .collect();
    matches.sort();

    match matches.len() {
        0 => Err(LocateError::NotFound {
            name: name.to_string(),
            home: home.display().to_string(),
        }),
        1 => Ok(matches.remove(0)),
        _ => {
            warn!(
                "Found multiple instances of {}; using {}",
                name,
                matches[0].display()
            );
            Ok(matches.remove(0))
        }
    }
}
