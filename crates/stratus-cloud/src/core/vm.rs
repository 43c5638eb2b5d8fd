//! Representation of virtual machines and their status.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::core::cloudlet_scheduler::CloudletSchedulerKind;

/// Status of a virtual machine as tracked by the broker.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum VmStatus {
    /// Creation request sent, acknowledgment not received yet.
    Pending,
    /// Allocated to a host and able to run cloudlets.
    Created,
    /// Creation request rejected (no suitable host).
    FailedToCreate,
    /// Destroyed, host capacity released.
    Destroyed,
}

impl Display for VmStatus {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            VmStatus::Pending => write!(f, "pending"),
            VmStatus::Created => write!(f, "created"),
            VmStatus::FailedToCreate => write!(f, "failed_to_create"),
            VmStatus::Destroyed => write!(f, "destroyed"),
        }
    }
}

/// Resource requirements of a virtual machine.
///
/// A VM requests `pes` processing elements rated at `mips` each, along with
/// RAM, network bandwidth and storage. The cloudlet scheduler kind selects
/// how the VM divides its granted capacity among resident cloudlets.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VmSpec {
    pub id: u32,
    /// Requested capacity of each processing element in MIPS.
    pub mips: f64,
    /// Requested number of processing elements.
    pub pes: u32,
    /// Requested RAM in MB.
    pub ram: u64,
    /// Requested network bandwidth in Mbit/s.
    pub bw: u64,
    /// Requested storage in MB.
    pub storage: u64,
    /// Cloudlet scheduler used by this VM.
    pub scheduler: CloudletSchedulerKind,
}

impl VmSpec {
    pub fn new(id: u32, mips: f64, pes: u32, ram: u64, bw: u64, storage: u64) -> Self {
        Self {
            id,
            mips,
            pes,
            ram,
            bw,
            storage,
            scheduler: CloudletSchedulerKind::TimeShared,
        }
    }

    pub fn with_scheduler(mut self, scheduler: CloudletSchedulerKind) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Total requested CPU capacity across all processing elements.
    pub fn total_mips(&self) -> f64 {
        self.mips * self.pes as f64
    }
}
