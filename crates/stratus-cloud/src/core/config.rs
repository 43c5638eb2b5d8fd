//! Simulation configuration.

use serde::{Deserialize, Serialize};

use crate::core::vm_allocation_policy::VmAllocationPolicyKind;
use crate::core::vm_scheduler::VmSchedulerKind;

/// Raw configuration as read from a YAML file, with every parameter optional.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
struct RawSimulationConfig {
    /// message trip time between simulation components
    pub message_delay: Option<f64>,
    /// minimal interval between forced processing updates in a datacenter
    pub scheduling_interval: Option<f64>,
    /// VM placement algorithm used by datacenters
    pub allocation_policy: Option<VmAllocationPolicyKind>,
    /// physical hosts
    pub hosts: Option<Vec<HostConfig>>,
}

/// Represents physical host(s) configuration.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct HostConfig {
    /// number of processing elements
    pub pes: u32,
    /// capacity of each processing element in MIPS
    pub mips: f64,
    /// memory capacity in MB
    pub ram: u64,
    /// network bandwidth in Mbit/s
    pub bw: u64,
    /// storage capacity in MB
    pub storage: u64,
    /// VM scheduler used by this host (time-shared if absent)
    pub vm_scheduler: Option<VmSchedulerKind>,
    /// number of such hosts (1 if absent)
    pub count: Option<u32>,
}

/// Represents simulation configuration.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// message trip time between simulation components
    pub message_delay: f64,
    /// minimal interval between forced processing updates in a datacenter
    pub scheduling_interval: f64,
    /// VM placement algorithm used by datacenters
    pub allocation_policy: VmAllocationPolicyKind,
    /// physical hosts
    pub hosts: Vec<HostConfig>,
}

impl SimulationConfig {
    /// Creates simulation config with default parameter values.
    pub fn new() -> Self {
        Self {
            message_delay: 0.,
            scheduling_interval: 0.,
            allocation_policy: VmAllocationPolicyKind::FirstFit,
            hosts: Vec::new(),
        }
    }

    /// Creates simulation config by reading parameter values from a YAML file
    /// (uses default values for absent parameters).
    pub fn from_file(file_name: &str) -> Self {
        let raw: RawSimulationConfig = serde_yaml::from_str(
            &std::fs::read_to_string(file_name).unwrap_or_else(|_| panic!("Can't read file {}", file_name)),
        )
        .unwrap_or_else(|_| panic!("Can't parse YAML from file {}", file_name));
        let default = Self::new();

        Self {
            message_delay: raw.message_delay.unwrap_or(default.message_delay),
            scheduling_interval: raw.scheduling_interval.unwrap_or(default.scheduling_interval),
            allocation_policy: raw.allocation_policy.unwrap_or(default.allocation_policy),
            hosts: raw.hosts.unwrap_or_default(),
        }
    }

    /// Returns total hosts count.
    pub fn number_of_hosts(&self) -> u32 {
        self.hosts.iter().map(|host| host.count.unwrap_or(1)).sum()
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::new()
    }
}
