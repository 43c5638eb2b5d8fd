//! Representation of cloudlets (compute jobs) and their status.

use std::fmt::{Display, Formatter};

use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;

use crate::core::utilization_model::{UtilizationFull, UtilizationModel};

/// Status of a cloudlet.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum CloudletStatus {
    /// Created but not yet dispatched to a VM.
    Instantiated,
    /// Dispatched to a VM and waiting for free capacity.
    Queued,
    /// Receiving a share of the VM capacity.
    Executing,
    /// Execution suspended, no capacity consumed.
    Paused,
    /// All instructions executed.
    Success,
    /// Terminated without completing.
    Failed,
}

impl CloudletStatus {
    /// Whether the cloudlet reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CloudletStatus::Success | CloudletStatus::Failed)
    }
}

impl Display for CloudletStatus {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            CloudletStatus::Instantiated => write!(f, "instantiated"),
            CloudletStatus::Queued => write!(f, "queued"),
            CloudletStatus::Executing => write!(f, "executing"),
            CloudletStatus::Paused => write!(f, "paused"),
            CloudletStatus::Success => write!(f, "success"),
            CloudletStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A simulated compute job with a fixed instruction length and resource footprint.
///
/// The instruction length is expressed in millions of instructions (MI) per
/// processing element. Utilization models describe which fraction of the
/// granted CPU/RAM/bandwidth the cloudlet actually uses over time.
#[derive(Clone)]
pub struct Cloudlet {
    pub id: u32,
    /// Instruction length in MI.
    pub length: f64,
    /// Number of processing elements required for execution.
    pub pes: u32,
    /// Input file size in MB.
    pub file_size: u64,
    /// Output file size in MB.
    pub output_size: u64,
    cpu_utilization: Box<dyn UtilizationModel>,
    ram_utilization: Box<dyn UtilizationModel>,
    bw_utilization: Box<dyn UtilizationModel>,

    status: CloudletStatus,
    vm_id: Option<u32>,
    datacenter_id: Option<u32>,
    submission_time: f64,
    finish_time: f64,
    executed: f64,
}

impl Serialize for Cloudlet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Cloudlet", 7)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("length", &self.length)?;
        state.serialize_field("status", &self.status)?;
        state.serialize_field("vm_id", &self.vm_id)?;
        state.serialize_field("datacenter_id", &self.datacenter_id)?;
        state.serialize_field("finish_time", &self.finish_time)?;
        state.serialize_field("actual_cpu_time", &self.actual_cpu_time())?;
        state.end()
    }
}

impl Cloudlet {
    pub fn new(
        id: u32,
        length: f64,
        pes: u32,
        file_size: u64,
        output_size: u64,
        cpu_utilization: Box<dyn UtilizationModel>,
        ram_utilization: Box<dyn UtilizationModel>,
        bw_utilization: Box<dyn UtilizationModel>,
    ) -> Self {
        Self {
            id,
            length,
            pes,
            file_size,
            output_size,
            cpu_utilization,
            ram_utilization,
            bw_utilization,
            status: CloudletStatus::Instantiated,
            vm_id: None,
            datacenter_id: None,
            submission_time: -1.,
            finish_time: -1.,
            executed: 0.,
        }
    }

    /// Creates a cloudlet with full CPU/RAM/bandwidth utilization.
    pub fn with_full_utilization(id: u32, length: f64, pes: u32, file_size: u64, output_size: u64) -> Self {
        Self::new(
            id,
            length,
            pes,
            file_size,
            output_size,
            Box::new(UtilizationFull::new()),
            Box::new(UtilizationFull::new()),
            Box::new(UtilizationFull::new()),
        )
    }

    pub fn status(&self) -> CloudletStatus {
        self.status
    }

    /// Identifier of the VM this cloudlet is bound to, `None` until bound.
    pub fn vm_id(&self) -> Option<u32> {
        self.vm_id
    }

    /// Identifier of the datacenter executing this cloudlet, `None` until submitted.
    pub fn datacenter_id(&self) -> Option<u32> {
        self.datacenter_id
    }

    /// Time at which the cloudlet was submitted to its VM scheduler.
    pub fn submission_time(&self) -> f64 {
        self.submission_time
    }

    /// Time at which the cloudlet reached the `Success` status.
    pub fn finish_time(&self) -> f64 {
        self.finish_time
    }

    /// Wall-clock execution time, recorded as `finish_time - submission_time`.
    ///
    /// Returns 0 for cloudlets which did not finish.
    pub fn actual_cpu_time(&self) -> f64 {
        if self.status == CloudletStatus::Success {
            self.finish_time - self.submission_time
        } else {
            0.
        }
    }

    /// Instructions executed so far, in MI.
    pub fn executed(&self) -> f64 {
        self.executed
    }

    /// Instructions left to execute, in MI.
    pub fn remaining(&self) -> f64 {
        (self.length - self.executed).max(0.)
    }

    /// Current CPU utilization in _[0, 1]_.
    pub fn cpu_utilization(&self, time: f64) -> f64 {
        self.cpu_utilization.utilization(time)
    }

    /// Current RAM utilization in _[0, 1]_.
    pub fn ram_utilization(&self, time: f64) -> f64 {
        self.ram_utilization.utilization(time)
    }

    /// Current bandwidth utilization in _[0, 1]_.
    pub fn bw_utilization(&self, time: f64) -> f64 {
        self.bw_utilization.utilization(time)
    }

    pub(crate) fn set_status(&mut self, status: CloudletStatus) {
        self.status = status;
    }

    pub(crate) fn bind_to_vm(&mut self, vm_id: u32) {
        self.vm_id = Some(vm_id);
    }

    pub(crate) fn set_datacenter(&mut self, datacenter_id: u32) {
        self.datacenter_id = Some(datacenter_id);
    }

    pub(crate) fn set_submission_time(&mut self, time: f64) {
        self.submission_time = time;
    }

    pub(crate) fn add_executed(&mut self, amount: f64) {
        self.executed += amount;
    }

    pub(crate) fn mark_finished(&mut self, time: f64) {
        self.status = CloudletStatus::Success;
        self.finish_time = time;
    }
}
