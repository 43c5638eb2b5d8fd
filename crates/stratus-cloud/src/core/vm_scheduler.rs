//! VM schedulers dividing host CPU capacity among resident VMs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::pe::{PeStatus, ProcessingElement};
use crate::core::provisioner::PeProvisioner;
use crate::core::vm::VmSpec;

/// Kind of VM scheduler used by a host.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum VmSchedulerKind {
    TimeShared,
    SpaceShared,
}

/// Divides the processing capacity of a host among resident VMs.
pub trait VmScheduler {
    /// Checks whether the scheduler can admit the VM without violating host CPU capacity.
    fn can_allocate(&self, vm: &VmSpec) -> bool;

    /// Admits the VM and reserves its share of processing capacity.
    ///
    /// Returns `false` without any state change if the capacity is insufficient.
    fn allocate_pes_for_vm(&mut self, vm: &VmSpec) -> bool;

    /// Releases the processing capacity reserved for the VM.
    fn deallocate_pes_for_vm(&mut self, vm_id: u32);

    /// Returns the MIPS currently granted to the VM, one entry per requested PE.
    ///
    /// Returns an empty vector for VMs unknown to this scheduler.
    fn allocated_mips_for_vm(&self, vm_id: u32) -> Vec<f64>;

    /// Total processing capacity of the host in MIPS.
    fn total_mips(&self) -> f64;

    /// Processing capacity not reserved by any VM, in MIPS.
    fn available_mips(&self) -> f64;
}

pub fn vm_scheduler_resolver(kind: VmSchedulerKind, pes: Vec<ProcessingElement>) -> Box<dyn VmScheduler> {
    match kind {
        VmSchedulerKind::TimeShared => Box::new(VmSchedulerTimeShared::new(pes)),
        VmSchedulerKind::SpaceShared => Box::new(VmSchedulerSpaceShared::new(pes)),
    }
}

/// Time-shared VM scheduler.
///
/// The total MIPS capacity of the host is treated as a single divisible pool.
/// A VM is admitted if its total requested MIPS fits into the unreserved pool,
/// regardless of how its PE count maps onto physical cores. Admission control
/// rejects over-subscription up front, so admitted VMs always receive their
/// full requested rate.
pub struct VmSchedulerTimeShared {
    provisioner: PeProvisioner,
    vms: BTreeMap<u32, VmShare>,
}

struct VmShare {
    mips: f64,
    pes: u32,
}

impl VmSchedulerTimeShared {
    pub fn new(pes: Vec<ProcessingElement>) -> Self {
        let total_mips = pes.iter().map(|pe| pe.mips()).sum();
        Self {
            provisioner: PeProvisioner::new(total_mips),
            vms: BTreeMap::new(),
        }
    }
}

impl VmScheduler for VmSchedulerTimeShared {
    fn can_allocate(&self, vm: &VmSpec) -> bool {
        vm.total_mips() <= self.provisioner.available_mips()
    }

    fn allocate_pes_for_vm(&mut self, vm: &VmSpec) -> bool {
        if !self.provisioner.allocate_mips(vm.id, vm.total_mips()) {
            return false;
        }
        self.vms.insert(
            vm.id,
            VmShare {
                mips: vm.mips,
                pes: vm.pes,
            },
        );
        true
    }

    fn deallocate_pes_for_vm(&mut self, vm_id: u32) {
        self.provisioner.deallocate(vm_id);
        self.vms.remove(&vm_id);
    }

    fn allocated_mips_for_vm(&self, vm_id: u32) -> Vec<f64> {
        match self.vms.get(&vm_id) {
            Some(share) => vec![share.mips; share.pes as usize],
            None => Vec::new(),
        }
    }

    fn total_mips(&self) -> f64 {
        self.provisioner.total_mips()
    }

    fn available_mips(&self) -> f64 {
        self.provisioner.available_mips()
    }
}

/// Space-shared VM scheduler.
///
/// Each VM gets dedicated whole processing elements. Admission fails if there
/// are not enough free PEs rated at the requested MIPS or above.
pub struct VmSchedulerSpaceShared {
    pes: Vec<ProcessingElement>,
    vm_pes: BTreeMap<u32, Vec<usize>>,
    vm_mips: BTreeMap<u32, f64>,
}

impl VmSchedulerSpaceShared {
    pub fn new(pes: Vec<ProcessingElement>) -> Self {
        Self {
            pes,
            vm_pes: BTreeMap::new(),
            vm_mips: BTreeMap::new(),
        }
    }

    fn suitable_free_pes(&self, vm: &VmSpec) -> Vec<usize> {
        self.pes
            .iter()
            .enumerate()
            .filter(|(_, pe)| pe.is_free() && pe.mips() >= vm.mips)
            .map(|(i, _)| i)
            .take(vm.pes as usize)
            .collect()
    }
}

impl VmScheduler for VmSchedulerSpaceShared {
    fn can_allocate(&self, vm: &VmSpec) -> bool {
        self.suitable_free_pes(vm).len() == vm.pes as usize
    }

    fn allocate_pes_for_vm(&mut self, vm: &VmSpec) -> bool {
        let selected = self.suitable_free_pes(vm);
        if selected.len() < vm.pes as usize {
            return false;
        }
        for &i in &selected {
            self.pes[i].set_status(PeStatus::Busy);
        }
        self.vm_pes.insert(vm.id, selected);
        self.vm_mips.insert(vm.id, vm.mips);
        true
    }

    fn deallocate_pes_for_vm(&mut self, vm_id: u32) {
        if let Some(selected) = self.vm_pes.remove(&vm_id) {
            for i in selected {
                self.pes[i].set_status(PeStatus::Free);
            }
        }
        self.vm_mips.remove(&vm_id);
    }

    fn allocated_mips_for_vm(&self, vm_id: u32) -> Vec<f64> {
        match (self.vm_pes.get(&vm_id), self.vm_mips.get(&vm_id)) {
            (Some(selected), Some(&mips)) => vec![mips; selected.len()],
            _ => Vec::new(),
        }
    }

    fn total_mips(&self) -> f64 {
        self.pes.iter().map(|pe| pe.mips()).sum()
    }

    fn available_mips(&self) -> f64 {
        self.pes.iter().filter(|pe| pe.is_free()).map(|pe| pe.mips()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_pes(count: u32, mips: f64) -> Vec<ProcessingElement> {
        (0..count).map(|i| ProcessingElement::new(i, mips)).collect()
    }

    #[test]
    fn time_shared_admits_by_total_mips() {
        let mut scheduler = VmSchedulerTimeShared::new(make_pes(1, 5000.));
        // 2 x 2500 MIPS fits into a single 5000 MIPS core
        let vm = VmSpec::new(1, 2500., 2, 8, 1000, 10000);
        assert!(scheduler.can_allocate(&vm));
        assert!(scheduler.allocate_pes_for_vm(&vm));
        assert_eq!(scheduler.allocated_mips_for_vm(1), vec![2500., 2500.]);
        assert_eq!(scheduler.available_mips(), 0.);

        let other = VmSpec::new(2, 100., 1, 8, 1000, 10000);
        assert!(!scheduler.can_allocate(&other));
        assert!(!scheduler.allocate_pes_for_vm(&other));

        scheduler.deallocate_pes_for_vm(1);
        assert_eq!(scheduler.available_mips(), 5000.);
        assert!(scheduler.allocated_mips_for_vm(1).is_empty());
    }

    #[test]
    fn time_shared_grants_requested_rate_at_full_load() {
        let mut scheduler = VmSchedulerTimeShared::new(make_pes(2, 2500.));
        assert!(scheduler.allocate_pes_for_vm(&VmSpec::new(1, 3000., 1, 8, 1000, 10000)));
        assert!(scheduler.allocate_pes_for_vm(&VmSpec::new(2, 2000., 1, 8, 1000, 10000)));
        // the pool is fully reserved, further admission is rejected
        assert!(!scheduler.allocate_pes_for_vm(&VmSpec::new(3, 1., 1, 8, 1000, 10000)));
        // admitted VMs keep their full rates, grants are never scaled down
        assert_eq!(scheduler.allocated_mips_for_vm(1), vec![3000.]);
        assert_eq!(scheduler.allocated_mips_for_vm(2), vec![2000.]);
    }

    #[test]
    fn space_shared_requires_whole_free_pes() {
        let mut scheduler = VmSchedulerSpaceShared::new(make_pes(2, 2500.));
        let vm1 = VmSpec::new(1, 2500., 1, 8, 1000, 10000);
        let vm2 = VmSpec::new(2, 2500., 2, 8, 1000, 10000);
        assert!(scheduler.allocate_pes_for_vm(&vm1));
        // only one free PE left, vm2 needs two
        assert!(!scheduler.can_allocate(&vm2));
        scheduler.deallocate_pes_for_vm(1);
        assert!(scheduler.allocate_pes_for_vm(&vm2));
        assert_eq!(scheduler.allocated_mips_for_vm(2), vec![2500., 2500.]);
        assert_eq!(scheduler.available_mips(), 0.);
    }

    #[test]
    fn space_shared_rejects_high_mips_request() {
        let scheduler = VmSchedulerSpaceShared::new(make_pes(4, 1000.));
        let vm = VmSpec::new(1, 2000., 1, 8, 1000, 10000);
        assert!(!scheduler.can_allocate(&vm));
    }
}
