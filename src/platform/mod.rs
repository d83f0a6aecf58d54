//! Platform surface of the headless page: accessibility export and device
//! emulation
//!
//! These are the pieces the verification tooling inspects from the outside;
//! the controllers never depend on them.

pub mod accessibility;
pub mod device;

pub use accessibility::{
    find_by_role, AccessibilityNode, AccessibilityProvider, AccessibilityTree, DocumentAccessibility,
};
pub use device::DeviceMetrics;
