//! Datapath id to LINC switch id mapping.
//!
//! LINC-OE addresses logical switches by sequential ids (`linc:start_switch(2).`)
//! that are only visible in the generated `sys.config`. The table is rebuilt
//! every time the emulator is (re)configured.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use log::warn;
use regex::Regex;

use super::translate::to_compact;

/// Eight hex octets separated by `:` or `-`.
static DPID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:[0-9a-f]{2}[:-]){7}[0-9a-f]{2}").expect("Invalid dpid regex")
});

/// Compact dpid -> LINC switch id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwitchIdTable {
    ids: BTreeMap<String, u32>,
}

impl SwitchIdTable {
    /// Scan config text line by line. The first dpid on a line gets the next
    /// id, starting at 1; a repeated dpid takes the later id.
    pub fn from_config_text(text: &str) -> Self {
        let mut ids = BTreeMap::new();
        let mut next_id = 1;
        for line in text.lines() {
            if let Some(m) = DPID_PATTERN.find(line) {
                ids.insert(to_compact(m.as_str()), next_id);
                next_id += 1;
            }
        }
        Self { ids }
    }

    /// Load from a `sys.config` on disk.
    ///
    /// Returns `None` when the file cannot be read, meaning the emulator has
    /// not been configured yet.
    pub fn load(path: &Path) -> Option<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => Some(Self::from_config_text(&text)),
            Err(e) => {
                warn!("Cannot read {}: {}", path.display(), e);
                None
            }
        }
    }

    /// LINC switch id for a dpid in compact or delimited form.
    pub fn get(&self, dpid: &str) -> Option<u32> {
        self.ids.get(&to_compact(dpid)).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.ids.iter().map(|(dpid, id)| (dpid.as_str(), *id))
    }
}
