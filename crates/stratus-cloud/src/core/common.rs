//! Common types shared by allocation components.

use serde::Serialize;

/// Result of checking whether a host can accommodate a VM.
#[derive(Debug, PartialEq, Serialize)]
pub enum AllocationVerdict {
    Success,
    NotEnoughCpu,
    NotEnoughRam,
    NotEnoughBandwidth,
    NotEnoughStorage,
}
