//! Artifact writing.
//!
//! Generated files are read by external programs (the config generator, the
//! emulator on restart), so they are written to a temporary file in the
//! destination directory and renamed into place.

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::{BridgeError, Result};

/// Write `contents` to `path` via write-then-rename.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = NamedTempFile::new_in(dir).map_err(BridgeError::io(dir))?;
    tmp.write_all(contents).map_err(BridgeError::io(tmp.path()))?;
    tmp.as_file().sync_all().map_err(BridgeError::io(tmp.path()))?;
    tmp.persist(path)
        .map_err(|e| BridgeError::Io { path: path.to_path_buf(), source: e.error })?;
    Ok(())
}

/// Serialize `value` as 4-space indented JSON and write it atomically.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    buf.push(b'\n');
    write_atomic(path, &buf)
}
