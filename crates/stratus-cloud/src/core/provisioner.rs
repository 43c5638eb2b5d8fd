//! Host resource provisioners.
//!
//! A provisioner tracks how much of a single host resource dimension is
//! granted to each resident VM. Over-allocation is rejected at request time,
//! and the bookkeeping is checked after every mutation: a violation of the
//! capacity invariant is a programming error and aborts the run.

use std::collections::BTreeMap;

/// Provisions an integral host resource (RAM, bandwidth or storage) to VMs.
#[derive(Clone, Debug)]
pub struct CapacityProvisioner {
    capacity: u64,
    allocations: BTreeMap<u32, u64>,
}

impl CapacityProvisioner {
    pub fn new(capacity: u64) -> Self {
        Self {
            capacity,
            allocations: BTreeMap::new(),
        }
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn allocated(&self) -> u64 {
        self.allocations.values().sum()
    }

    pub fn available_capacity(&self) -> u64 {
        self.capacity - self.allocated()
    }

    pub fn allocated_for_vm(&self, vm_id: u32) -> u64 {
        self.allocations.get(&vm_id).copied().unwrap_or(0)
    }

    /// Tries to allocate the requested amount for the specified VM.
    ///
    /// Returns `false` without any state change if the available capacity is insufficient.
    /// Repeated allocation for the same VM replaces the previous grant.
    pub fn allocate(&mut self, vm_id: u32, amount: u64) -> bool {
        let already = self.allocated_for_vm(vm_id);
        if self.available_capacity() + already < amount {
            return false;
        }
        self.allocations.insert(vm_id, amount);
        self.check_invariant();
        true
    }

    /// Releases the allocation of the specified VM, if any.
    pub fn deallocate(&mut self, vm_id: u32) {
        self.allocations.remove(&vm_id);
        self.check_invariant();
    }

    fn check_invariant(&self) {
        let allocated = self.allocated();
        if allocated > self.capacity {
            panic!(
                "Capacity invariant violated: allocated {} exceeds capacity {}",
                allocated, self.capacity
            );
        }
    }
}

/// Provisions host CPU capacity (MIPS) to VMs for time-shared division.
#[derive(Clone, Debug)]
pub struct PeProvisioner {
    total_mips: f64,
    allocations: BTreeMap<u32, f64>,
}

impl PeProvisioner {
    pub fn new(total_mips: f64) -> Self {
        Self {
            total_mips,
            allocations: BTreeMap::new(),
        }
    }

    pub fn total_mips(&self) -> f64 {
        self.total_mips
    }

    pub fn allocated_mips(&self) -> f64 {
        self.allocations.values().sum()
    }

    pub fn available_mips(&self) -> f64 {
        self.total_mips - self.allocated_mips()
    }

    pub fn allocated_mips_for_vm(&self, vm_id: u32) -> f64 {
        self.allocations.get(&vm_id).copied().unwrap_or(0.)
    }

    /// Tries to allocate the requested amount of MIPS for the specified VM.
    ///
    /// Returns `false` without any state change if the available capacity is insufficient.
    pub fn allocate_mips(&mut self, vm_id: u32, mips: f64) -> bool {
        let already = self.allocated_mips_for_vm(vm_id);
        if self.available_mips() + already < mips {
            return false;
        }
        self.allocations.insert(vm_id, mips);
        self.check_invariant();
        true
    }

    pub fn deallocate(&mut self, vm_id: u32) {
        self.allocations.remove(&vm_id);
        self.check_invariant();
    }

    fn check_invariant(&self) {
        let allocated = self.allocated_mips();
        // small epsilon to account for floating-point errors
        if allocated > self.total_mips * (1. + 1e-12) {
            panic!(
                "Capacity invariant violated: allocated {} MIPS exceeds capacity {}",
                allocated, self.total_mips
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_respects_capacity() {
        let mut ram = CapacityProvisioner::new(100);
        assert!(ram.allocate(1, 60));
        assert!(!ram.allocate(2, 60));
        assert_eq!(ram.available_capacity(), 40);
        assert!(ram.allocate(2, 40));
        assert_eq!(ram.available_capacity(), 0);
        ram.deallocate(1);
        assert_eq!(ram.available_capacity(), 60);
    }

    #[test]
    fn reallocation_replaces_previous_grant() {
        let mut ram = CapacityProvisioner::new(100);
        assert!(ram.allocate(1, 80));
        assert!(ram.allocate(1, 90));
        assert_eq!(ram.allocated_for_vm(1), 90);
        assert!(!ram.allocate(1, 110));
        assert_eq!(ram.allocated_for_vm(1), 90);
    }

    #[test]
    fn mips_allocation_respects_capacity() {
        let mut pe = PeProvisioner::new(5000.);
        assert!(pe.allocate_mips(1, 2500.));
        assert!(pe.allocate_mips(2, 2500.));
        assert!(!pe.allocate_mips(3, 1.));
        pe.deallocate(2);
        assert_eq!(pe.available_mips(), 2500.);
    }
}
