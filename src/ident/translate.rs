//! Device identifier format conversion.
//!
//! ONOS names OpenFlow devices `of:<16 hex chars>`; LINC-OE's configuration
//! writes the same datapath id as eight colon-separated octets. Every join
//! between the controller document, the emulator document and the emulator's
//! generated state goes through these functions.

/// Length of the scheme prefix (`of:`) skipped before the hex string.
const SCHEME_LEN: usize = 3;

/// Convert a controller device URI (optionally with a `/port` suffix) to the
/// emulator's colon-delimited datapath id.
///
/// The hex string after the 3-character scheme is cut into two-character
/// pairs joined by `:`; a dangling single character is dropped.
///
/// ```
/// use lincbridge::ident::to_emulator_dpid;
///
/// assert_eq!(to_emulator_dpid("of:0000ffffffffff01"), "00:00:ff:ff:ff:ff:ff:01");
/// assert_eq!(to_emulator_dpid("of:0000ffffffffff01/3"), "00:00:ff:ff:ff:ff:ff:01");
/// ```
pub fn to_emulator_dpid(uri: &str) -> String {
    let device = uri.split('/').next().unwrap_or(uri);
    let hex: Vec<char> = device.chars().skip(SCHEME_LEN).collect();
    hex.chunks_exact(2)
        .map(|pair| pair.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(":")
}

/// Compact lowercase hex form of a datapath id written with `:` or `-`.
pub fn to_compact(dpid: &str) -> String {
    dpid.chars()
        .filter(|c| *c != ':' && *c != '-')
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Controller device URI for a datapath id in either form.
pub fn to_device_uri(dpid: &str) -> String {
    format!("of:{}", to_compact(dpid))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roadm_uri() {
        assert_eq!(to_emulator_dpid("of:0000ffffffffff01"), "00:00:ff:ff:ff:ff:ff:01");
    }

    #[test]
    fn test_port_suffix_ignored() {
        assert_eq!(
            to_emulator_dpid("of:0000ffffffffff0a/10"),
            to_emulator_dpid("of:0000ffffffffff0a")
        );
    }

    #[test]
    fn test_shape_has_eight_octets_and_no_edge_delimiters() {
        for uri in ["of:0000000000000001", "of:0000ffffffffffff", "of:1234567890abcdef/2"] {
            let dpid = to_emulator_dpid(uri);
            assert_eq!(dpid.split(':').count(), 8, "{}", dpid);
            assert!(dpid.split(':').all(|octet| octet.len() == 2));
            assert!(!dpid.starts_with(':') && !dpid.ends_with(':'));
        }
    }

    #[test]
    fn test_dangling_char_dropped() {
        assert_eq!(to_emulator_dpid("of:00001"), "00:00");
    }

    #[test]
    fn test_short_input() {
        assert_eq!(to_emulator_dpid("of:"), "");
        assert_eq!(to_emulator_dpid(""), "");
    }

    #[test]
    fn test_round_trip_through_compact() {
        let uri = "of:0000ffffffffff01";
        let colon = to_emulator_dpid(uri);
        assert_eq!(to_device_uri(&colon), uri);
        assert_eq!(to_emulator_dpid(&to_device_uri(&colon)), colon);
    }

    #[test]
    fn test_compact_accepts_dashes_and_case() {
        assert_eq!(to_compact("00-00-FF-FF-FF-FF-FF-01"), "0000ffffffffff01");
        assert_eq!(to_compact("00:00:ff:ff:ff:ff:ff:01"), "0000ffffffffff01");
    }
}
