//! Filesystem layout of a LINC-OE release.

use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::BridgeError;

/// Locations inside a LINC-OE checkout and its runtime directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LincPaths {
    root: PathBuf,
    pipe_dir: PathBuf,
}

impl LincPaths {
    /// Layout of the checkout at `linc_dir`, run by `user`.
    ///
    /// The emulator's `run_erl` keeps its control pipes under
    /// `/tmp/home/<user>/linc-oe/rel/linc`.
    pub fn new(linc_dir: &Path, user: &str) -> Self {
        Self {
            root: linc_dir.to_path_buf(),
            pipe_dir: Path::new("/tmp/home").join(user).join("linc-oe/rel/linc"),
        }
    }

    /// Same layout with the pipes somewhere else.
    pub fn with_pipe_dir(mut self, pipe_dir: impl Into<PathBuf>) -> Self {
        self.pipe_dir = pipe_dir.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn release_dir(&self) -> PathBuf {
        self.root.join("rel/linc")
    }

    /// The startup configuration the emulator boots from.
    pub fn sys_config(&self) -> PathBuf {
        self.release_dir().join("releases/1.0/sys.config")
    }

    pub fn control_script(&self) -> PathBuf {
        self.release_dir().join("bin/linc")
    }

    pub fn pipe_dir(&self) -> &Path {
        &self.pipe_dir
    }

    pub fn write_pipe(&self) -> PathBuf {
        self.pipe_dir.join("erlang.pipe.1.w")
    }

    pub fn read_pipe(&self) -> PathBuf {
        self.pipe_dir.join("erlang.pipe.1.r")
    }

    /// Remove everything in the pipe directory.
    ///
    /// LINC does not always clean its pipes up, and on restart it then
    /// numbers them `erlang.pipe.2.*`. Returns the number of entries removed;
    /// failures are logged and skipped.
    pub fn clear_pipes(&self) -> usize {
        let entries = match std::fs::read_dir(&self.pipe_dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("No pipe directory {:?}: {}", self.pipe_dir, e);
                return 0;
            }
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            let result = match entry.file_type() {
                Ok(t) if t.is_dir() => std::fs::remove_dir_all(&path),
                _ => std::fs::remove_file(&path),
            };
            match result {
                Ok(()) => removed += 1,
                Err(e) => warn!("{}", BridgeError::transient(&path)(e)),
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let paths = LincPaths::new(Path::new("/home/alice/linc-oe"), "alice");
        assert_eq!(
            paths.sys_config(),
            PathBuf::from("/home/alice/linc-oe/rel/linc/releases/1.0/sys.config")
        );
        assert_eq!(paths.control_script(), PathBuf::from("/home/alice/linc-oe/rel/linc/bin/linc"));
        assert_eq!(
            paths.write_pipe(),
            PathBuf::from("/tmp/home/alice/linc-oe/rel/linc/erlang.pipe.1.w")
        );
        assert_eq!(
            paths.read_pipe(),
            PathBuf::from("/tmp/home/alice/linc-oe/rel/linc/erlang.pipe.1.r")
        );
    }

    #[test]
    fn test_clear_pipes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("erlang.pipe.1.r"), "").unwrap();
        std::fs::write(dir.path().join("erlang.pipe.1.w"), "").unwrap();
        std::fs::create_dir(dir.path().join("log")).unwrap();

        let paths = LincPaths::new(Path::new("/opt/linc-oe"), "alice").with_pipe_dir(dir.path());
        assert_eq!(paths.clear_pipes(), 3);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_clear_missing_pipe_dir() {
        let paths = LincPaths::new(Path::new("/opt/linc-oe"), "alice")
            .with_pipe_dir("/nonexistent/lincbridge/pipes");
        assert_eq!(paths.clear_pipes(), 0);
    }
}
