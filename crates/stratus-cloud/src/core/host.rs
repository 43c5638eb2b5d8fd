//! Physical host model.

use std::collections::BTreeSet;

use crate::core::common::AllocationVerdict;
use crate::core::pe::ProcessingElement;
use crate::core::provisioner::CapacityProvisioner;
use crate::core::vm::VmSpec;
use crate::core::vm_scheduler::{vm_scheduler_resolver, VmScheduler, VmSchedulerKind};

/// A physical machine inside a datacenter.
///
/// The host is a passive resource container: it does not receive events
/// itself, the owning datacenter drives it. CPU capacity is managed by the
/// VM scheduler, while RAM, network bandwidth and storage are managed by
/// dedicated capacity provisioners.
pub struct Host {
    pub id: u32,
    pe_count: u32,
    pe_mips: f64,
    ram: CapacityProvisioner,
    bw: CapacityProvisioner,
    storage: CapacityProvisioner,
    vm_scheduler: Box<dyn VmScheduler>,
    vms: BTreeSet<u32>,
}

impl Host {
    pub fn new(
        id: u32,
        pe_count: u32,
        pe_mips: f64,
        ram: u64,
        bw: u64,
        storage: u64,
        scheduler: VmSchedulerKind,
    ) -> Self {
        let pes = (0..pe_count).map(|pe_id| ProcessingElement::new(pe_id, pe_mips)).collect();
        Self {
            id,
            pe_count,
            pe_mips,
            ram: CapacityProvisioner::new(ram),
            bw: CapacityProvisioner::new(bw),
            storage: CapacityProvisioner::new(storage),
            vm_scheduler: vm_scheduler_resolver(scheduler, pes),
            vms: BTreeSet::new(),
        }
    }

    pub fn pe_count(&self) -> u32 {
        self.pe_count
    }

    pub fn pe_mips(&self) -> f64 {
        self.pe_mips
    }

    pub fn total_mips(&self) -> f64 {
        self.vm_scheduler.total_mips()
    }

    pub fn available_mips(&self) -> f64 {
        self.vm_scheduler.available_mips()
    }

    pub fn available_ram(&self) -> u64 {
        self.ram.available_capacity()
    }

    pub fn available_bw(&self) -> u64 {
        self.bw.available_capacity()
    }

    pub fn available_storage(&self) -> u64 {
        self.storage.available_capacity()
    }

    pub fn vm_count(&self) -> usize {
        self.vms.len()
    }

    /// Checks whether the host can currently accommodate the VM.
    ///
    /// Resources are checked in a fixed order and the first insufficient one
    /// is reported.
    pub fn is_suitable_for_vm(&self, vm: &VmSpec) -> AllocationVerdict {
        if !self.vm_scheduler.can_allocate(vm) {
            return AllocationVerdict::NotEnoughCpu;
        }
        if self.ram.available_capacity() < vm.ram {
            return AllocationVerdict::NotEnoughRam;
        }
        if self.bw.available_capacity() < vm.bw {
            return AllocationVerdict::NotEnoughBandwidth;
        }
        if self.storage.available_capacity() < vm.storage {
            return AllocationVerdict::NotEnoughStorage;
        }
        AllocationVerdict::Success
    }

    /// Allocates all resources required by the VM.
    ///
    /// Either every resource is allocated or none is, so a failed creation
    /// leaves the host unchanged.
    pub fn create_vm(&mut self, vm: &VmSpec) -> AllocationVerdict {
        let verdict = self.is_suitable_for_vm(vm);
        if verdict != AllocationVerdict::Success {
            return verdict;
        }
        // the suitability check above guarantees these succeed
        self.vm_scheduler.allocate_pes_for_vm(vm);
        self.ram.allocate(vm.id, vm.ram);
        self.bw.allocate(vm.id, vm.bw);
        self.storage.allocate(vm.id, vm.storage);
        self.vms.insert(vm.id);
        AllocationVerdict::Success
    }

    /// Releases all resources held by the VM.
    pub fn destroy_vm(&mut self, vm_id: u32) {
        if !self.vms.remove(&vm_id) {
            return;
        }
        self.vm_scheduler.deallocate_pes_for_vm(vm_id);
        self.ram.deallocate(vm_id);
        self.bw.deallocate(vm_id);
        self.storage.deallocate(vm_id);
    }

    /// Per-PE MIPS currently granted to the VM by the VM scheduler.
    pub fn allocated_mips_for_vm(&self, vm_id: u32) -> Vec<f64> {
        self.vm_scheduler.allocated_mips_for_vm(vm_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_destroy_vm() {
        let mut host = Host::new(0, 4, 1000., 8192, 1000, 100000, VmSchedulerKind::TimeShared);
        let vm = VmSpec::new(1, 500., 2, 2048, 100, 1000);

        assert_eq!(host.is_suitable_for_vm(&vm), AllocationVerdict::Success);
        assert_eq!(host.create_vm(&vm), AllocationVerdict::Success);
        assert_eq!(host.vm_count(), 1);
        assert_eq!(host.available_ram(), 8192 - 2048);
        assert_eq!(host.allocated_mips_for_vm(1), vec![500., 500.]);

        host.destroy_vm(1);
        assert_eq!(host.vm_count(), 0);
        assert_eq!(host.available_ram(), 8192);
        assert_eq!(host.available_mips(), 4000.);
    }

    #[test]
    fn reports_first_insufficient_resource() {
        let mut host = Host::new(0, 2, 1000., 4096, 1000, 100000, VmSchedulerKind::TimeShared);
        let big_ram = VmSpec::new(1, 500., 1, 100000, 100, 1000);
        assert_eq!(host.is_suitable_for_vm(&big_ram), AllocationVerdict::NotEnoughRam);
        assert_eq!(host.create_vm(&big_ram), AllocationVerdict::NotEnoughRam);
        // failed creation leaves the host untouched
        assert_eq!(host.vm_count(), 0);
        assert_eq!(host.available_mips(), 2000.);
    }
}
