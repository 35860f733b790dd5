//! Identifier mapping between the controller, the topology and LINC-OE.
//!
//! - `translate`: `of:` URIs, compact hex and colon-delimited datapath ids
//! - `switch_ids`: datapath id to LINC's sequential switch id, scanned from `sys.config`

pub mod switch_ids;
pub mod translate;

pub use switch_ids::SwitchIdTable;
pub use translate::{to_compact, to_device_uri, to_emulator_dpid};
