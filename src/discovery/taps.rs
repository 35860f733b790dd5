//! Tap interface lookup in LINC's `sys.config`.
//!
//! The emulator's startup configuration declares taps in one place
//! (`{port,7,[{interface,"tap7"}]}`) and the ports of each logical switch in
//! another (`{port,7,{queues,[]},{port_no,3}}`). Finding the tap behind a
//! topology port takes two hops: switch block and `port_no` to the internal
//! port index, then internal index to the tap line.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::MissReason;
use crate::ident::to_compact;

static TAP_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"tap\d+").expect("Invalid tap name regex"));

static PORT_INDEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"port,(\d+)").expect("Invalid port index regex"));

/// Every tap name mentioned in `text`, in order of first appearance.
pub fn list_virtual_interfaces(text: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    TAP_NAME
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|name| seen.insert(*name))
        .map(str::to_string)
        .collect()
}

/// Find the tap interface bound to `port` of the switch with datapath id `dpid`.
///
/// `dpid` may be given in any of the usual forms; the switch block is the
/// first line whose text, with colons removed, contains the compact id.
/// The block ends at the next line mentioning `switch`.
pub fn find_virtual_interface(text: &str, dpid: &str, port: u32) -> Result<String, MissReason> {
    let dpid = to_compact(dpid);
    let port_marker = format!("port_no,{}}}", port);

    let mut tap_lines = Vec::new();
    let mut seen_block = false;
    let mut in_block = false;
    let mut port_line = None;

    for line in text.lines() {
        if line.contains("tap") {
            tap_lines.push(line);
        }
        if port_line.is_some() {
            continue;
        }
        if !seen_block && line.replace(':', "").to_lowercase().contains(&dpid) {
            seen_block = true;
            in_block = true;
            continue;
        }
        if in_block {
            if line.contains("switch") {
                in_block = false;
            }
            if line.contains(&port_marker) {
                port_line = Some(line);
            }
        }
    }

    if !seen_block {
        return Err(MissReason::NoDeviceBlock);
    }
    let port_line = port_line.ok_or(MissReason::NoPortLine)?;
    let index: u32 = PORT_INDEX
        .captures(port_line)
        .and_then(|c| c[1].parse().ok())
        .ok_or(MissReason::NoPortIndex)?;

    tap_lines
        .into_iter()
        .filter(|line| {
            PORT_INDEX
                .captures_iter(line)
                .any(|c| c[1].parse::<u32>().ok() == Some(index))
        })
        .find_map(|line| TAP_NAME.find(line).map(|m| m.as_str().to_string()))
        .ok_or(MissReason::NoTap(index))
}

/// Number of tap interfaces in `ip -o link show` output.
pub fn count_tap_interfaces(link_output: &str) -> usize {
    interface_names(link_output)
        .filter(|name| name.starts_with("tap"))
        .count()
}

/// Interface names from `ip -o link show` output (`5: tap0: <...> ...`).
pub fn interface_names(link_output: &str) -> impl Iterator<Item = &str> {
    link_output.lines().filter_map(|line| {
        let name = line.split(':').nth(1)?.trim();
        let name = name.split('@').next().unwrap_or(name);
        (!name.is_empty()).then_some(name)
    })
}
