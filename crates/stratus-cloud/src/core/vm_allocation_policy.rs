//! VM placement policies selecting a host for a new VM.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::common::AllocationVerdict;
use crate::core::host::Host;
use crate::core::vm::VmSpec;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum VmAllocationPolicyKind {
    FirstFit,
    BestFit,
}

/// Selects a host for placing a new VM.
///
/// A policy only chooses the host, the actual resource allocation is
/// performed by the datacenter. Returning `None` means no host in the
/// datacenter can accommodate the VM right now.
pub trait VmAllocationPolicy {
    fn select_host(&mut self, vm: &VmSpec, hosts: &BTreeMap<u32, Host>) -> Option<u32>;
}

pub fn vm_allocation_policy_resolver(kind: VmAllocationPolicyKind) -> Box<dyn VmAllocationPolicy> {
    match kind {
        VmAllocationPolicyKind::FirstFit => Box::new(FirstFit::new()),
        VmAllocationPolicyKind::BestFit => Box::new(BestFit::new()),
    }
}

/// Picks the suitable host with the lowest id.
#[derive(Default)]
pub struct FirstFit;

impl FirstFit {
    pub fn new() -> Self {
        Self {}
    }
}

impl VmAllocationPolicy for FirstFit {
    fn select_host(&mut self, vm: &VmSpec, hosts: &BTreeMap<u32, Host>) -> Option<u32> {
        for (id, host) in hosts {
            if host.is_suitable_for_vm(vm) == AllocationVerdict::Success {
                return Some(*id);
            }
        }
        None
    }
}

/// Picks the suitable host with the least available MIPS, packing VMs
/// densely. Ties are broken by the lowest host id.
#[derive(Default)]
pub struct BestFit;

impl BestFit {
    pub fn new() -> Self {
        Self {}
    }
}

impl VmAllocationPolicy for BestFit {
    fn select_host(&mut self, vm: &VmSpec, hosts: &BTreeMap<u32, Host>) -> Option<u32> {
        let mut best: Option<(u32, f64)> = None;
        for (id, host) in hosts {
            if host.is_suitable_for_vm(vm) != AllocationVerdict::Success {
                continue;
            }
            let available = host.available_mips();
            match best {
                Some((_, best_available)) if available >= best_available => {}
                _ => best = Some((*id, available)),
            }
        }
        best.map(|(id, _)| id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vm_scheduler::VmSchedulerKind;

    fn make_hosts(specs: &[(u32, u32, f64)]) -> BTreeMap<u32, Host> {
        specs
            .iter()
            .map(|&(id, pes, mips)| (id, Host::new(id, pes, mips, 8192, 1000, 100000, VmSchedulerKind::TimeShared)))
            .collect()
    }

    #[test]
    fn first_fit_prefers_lowest_id() {
        let hosts = make_hosts(&[(0, 4, 1000.), (1, 4, 1000.)]);
        let vm = VmSpec::new(1, 500., 1, 1024, 100, 1000);
        assert_eq!(FirstFit::new().select_host(&vm, &hosts), Some(0));
    }

    #[test]
    fn first_fit_skips_unsuitable_hosts() {
        let hosts = make_hosts(&[(0, 1, 100.), (1, 4, 1000.)]);
        let vm = VmSpec::new(1, 500., 2, 1024, 100, 1000);
        assert_eq!(FirstFit::new().select_host(&vm, &hosts), Some(1));
    }

    #[test]
    fn best_fit_packs_tightest_host() {
        let mut hosts = make_hosts(&[(0, 8, 1000.), (1, 4, 1000.)]);
        // occupy part of host 1 so it has the least available MIPS
        let filler = VmSpec::new(100, 1000., 2, 1024, 100, 1000);
        hosts.get_mut(&1).unwrap().create_vm(&filler);

        let vm = VmSpec::new(1, 500., 1, 1024, 100, 1000);
        assert_eq!(BestFit::new().select_host(&vm, &hosts), Some(1));
    }

    #[test]
    fn returns_none_when_no_host_fits() {
        let hosts = make_hosts(&[(0, 2, 1000.)]);
        let vm = VmSpec::new(1, 2000., 4, 1024, 100, 1000);
        assert_eq!(FirstFit::new().select_host(&vm, &hosts), None);
        assert_eq!(BestFit::new().select_host(&vm, &hosts), None);
    }
}
