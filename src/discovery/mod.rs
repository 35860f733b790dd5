//! Interface discovery and binding.
//!
//! LINC-OE picks the tap interface behind each optical port itself, so the
//! mapping is recovered from the startup configuration after the emulator
//! has been configured, and the taps are then handed to the packet switches
//! at the far end of each cross-connect.

pub mod binding;
pub mod interfaces;
pub mod taps;

pub use binding::{BindReport, Binder, BindingTable, CrossConnectBindings, InterfaceHost, OvsHost};
pub use interfaces::TapProvisioner;
pub use taps::{count_tap_interfaces, find_virtual_interface, list_virtual_interfaces};
