//! Datacenter managing hosts, resident VMs and cloudlet execution.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use stratus_core::cast;
use stratus_core::{Event, EventHandler, EventId, Id, SimulationContext};

use crate::core::cloudlet::{Cloudlet, CloudletStatus};
use crate::core::cloudlet_scheduler::{cloudlet_scheduler_resolver, CloudletScheduler};
use crate::core::common::AllocationVerdict;
use crate::core::config::SimulationConfig;
use crate::core::events::allocation::{VmCreateAck, VmCreateRequest, VmDestroyAck, VmDestroyRequest};
use crate::core::events::cloudlet::{CloudletReturn, CloudletSubmit, UpdateProcessing};
use crate::core::host::Host;
use crate::core::logger::Logger;
use crate::core::vm::VmSpec;
use crate::core::vm_allocation_policy::VmAllocationPolicy;

/// Static properties of a datacenter.
///
/// The cost rates are carried as data only, the simulation itself never
/// charges anything. Billing is computed by the user from simulation results.
#[derive(Debug, Clone)]
pub struct DatacenterCharacteristics {
    pub arch: String,
    pub os: String,
    pub vmm: String,
    pub time_zone: f64,
    /// cost of CPU time, per second
    pub cost_per_sec: f64,
    /// cost of RAM, per MB
    pub cost_per_mem: f64,
    /// cost of storage, per MB
    pub cost_per_storage: f64,
    /// cost of network bandwidth, per Mbit/s
    pub cost_per_bw: f64,
}

impl Default for DatacenterCharacteristics {
    fn default() -> Self {
        Self {
            arch: "x86".to_string(),
            os: "Linux".to_string(),
            vmm: "Xen".to_string(),
            time_zone: 0.,
            cost_per_sec: 0.,
            cost_per_mem: 0.,
            cost_per_storage: 0.,
            cost_per_bw: 0.,
        }
    }
}

/// Runtime state of a VM hosted by the datacenter.
struct VmRuntime {
    spec: VmSpec,
    host_id: u32,
    /// component which requested the VM creation, receives acks and returned cloudlets
    owner: Id,
    scheduler: Box<dyn CloudletScheduler>,
}

/// Simulation component modeling a datacenter.
///
/// Owns a set of passive hosts and drives cloudlet execution on resident VMs.
/// Processing is advanced lazily via self-scheduled `UpdateProcessing` events
/// emitted at the earliest expected cloudlet completion.
pub struct Datacenter {
    characteristics: DatacenterCharacteristics,
    hosts: BTreeMap<u32, Host>,
    vms: BTreeMap<u32, VmRuntime>,
    allocation_policy: Box<dyn VmAllocationPolicy>,
    update_event: Option<EventId>,
    logger: Rc<RefCell<Box<dyn Logger>>>,
    sim_config: Rc<SimulationConfig>,
    ctx: SimulationContext,
}

impl Datacenter {
    pub fn new(
        characteristics: DatacenterCharacteristics,
        allocation_policy: Box<dyn VmAllocationPolicy>,
        logger: Rc<RefCell<Box<dyn Logger>>>,
        sim_config: Rc<SimulationConfig>,
        ctx: SimulationContext,
    ) -> Self {
        Self {
            characteristics,
            hosts: BTreeMap::new(),
            vms: BTreeMap::new(),
            allocation_policy,
            update_event: None,
            logger,
            sim_config,
            ctx,
        }
    }

    pub fn id(&self) -> Id {
        self.ctx.id()
    }

    pub fn characteristics(&self) -> &DatacenterCharacteristics {
        &self.characteristics
    }

    pub fn add_host(&mut self, host: Host) {
        self.logger.borrow_mut().log_debug(
            &self.ctx,
            format!(
                "added host {} with {} PEs of {} MIPS",
                host.id,
                host.pe_count(),
                host.pe_mips()
            ),
        );
        self.hosts.insert(host.id, host);
    }

    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    pub fn host(&self, host_id: u32) -> Option<&Host> {
        self.hosts.get(&host_id)
    }

    pub fn vm_count(&self) -> usize {
        self.vms.len()
    }

    /// Spec of a resident VM, `None` once the VM is destroyed.
    pub fn vm_spec(&self, vm_id: u32) -> Option<&VmSpec> {
        self.vms.get(&vm_id).map(|vm| &vm.spec)
    }

    fn on_vm_create_request(&mut self, vm: VmSpec, requester: Id) {
        let vm_id = vm.id;
        match self.allocation_policy.select_host(&vm, &self.hosts) {
            Some(host_id) => {
                let host = self.hosts.get_mut(&host_id).unwrap();
                let verdict = host.create_vm(&vm);
                // the policy returns only hosts which passed the suitability check
                debug_assert_eq!(verdict, AllocationVerdict::Success);
                self.logger
                    .borrow_mut()
                    .log_info(&self.ctx, format!("created VM {} on host {}", vm_id, host_id));
                let scheduler = cloudlet_scheduler_resolver(vm.scheduler, vm.pes);
                self.vms.insert(
                    vm_id,
                    VmRuntime {
                        spec: vm,
                        host_id,
                        owner: requester,
                        scheduler,
                    },
                );
                self.ctx.emit(
                    VmCreateAck {
                        vm_id,
                        host_id: Some(host_id),
                        success: true,
                    },
                    requester,
                    self.sim_config.message_delay,
                );
            }
            None => {
                self.logger
                    .borrow_mut()
                    .log_warn(&self.ctx, format!("no suitable host for VM {}", vm_id));
                self.ctx.emit(
                    VmCreateAck {
                        vm_id,
                        host_id: None,
                        success: false,
                    },
                    requester,
                    self.sim_config.message_delay,
                );
            }
        }
    }

    fn on_vm_destroy_request(&mut self, vm_id: u32) {
        match self.vms.remove(&vm_id) {
            Some(vm) => {
                self.hosts.get_mut(&vm.host_id).unwrap().destroy_vm(vm_id);
                self.logger
                    .borrow_mut()
                    .log_info(&self.ctx, format!("destroyed VM {} on host {}", vm_id, vm.host_id));
                self.ctx
                    .emit(VmDestroyAck { vm_id }, vm.owner, self.sim_config.message_delay);
            }
            None => {
                self.logger
                    .borrow_mut()
                    .log_warn(&self.ctx, format!("cannot destroy unknown VM {}", vm_id));
            }
        }
    }

    fn on_cloudlet_submit(&mut self, mut cloudlet: Cloudlet, vm_id: u32, requester: Id) {
        let time = self.ctx.time();
        match self.vms.get_mut(&vm_id) {
            Some(vm) => {
                cloudlet.bind_to_vm(vm_id);
                cloudlet.set_datacenter(self.ctx.id());
                let mips_share = self.hosts[&vm.host_id].allocated_mips_for_vm(vm_id);
                let estimate = vm.scheduler.cloudlet_submit(cloudlet, time, &mips_share);
                self.logger.borrow_mut().log_info(
                    &self.ctx,
                    format!("cloudlet submitted to VM {}, estimated completion in {:.2}", vm_id, estimate),
                );
                self.update_processing();
            }
            None => {
                self.logger
                    .borrow_mut()
                    .log_warn(&self.ctx, format!("cloudlet submitted to unknown VM {}, rejected", vm_id));
                cloudlet.set_status(CloudletStatus::Failed);
                self.ctx
                    .emit(CloudletReturn { cloudlet }, requester, self.sim_config.message_delay);
            }
        }
    }

    /// Advances cloudlet execution on all resident VMs, returns finished
    /// cloudlets to their owners and schedules the next update at the
    /// earliest expected completion.
    fn update_processing(&mut self) {
        let time = self.ctx.time();
        if let Some(event_id) = self.update_event.take() {
            self.ctx.cancel_event(event_id);
        }

        let mut next_completion: Option<f64> = None;
        for (vm_id, vm) in self.vms.iter_mut() {
            let mips_share = self.hosts[&vm.host_id].allocated_mips_for_vm(*vm_id);
            if let Some(eta) = vm.scheduler.update_processing(time, &mips_share) {
                next_completion = Some(next_completion.map_or(eta, |cur: f64| cur.min(eta)));
            }
            for cloudlet in vm.scheduler.drain_finished() {
                self.logger.borrow_mut().log_info(
                    &self.ctx,
                    format!("cloudlet {} finished on VM {}", cloudlet.id, vm_id),
                );
                self.ctx
                    .emit(CloudletReturn { cloudlet }, vm.owner, self.sim_config.message_delay);
            }
        }

        if let Some(eta) = next_completion {
            let delay = eta.max(self.sim_config.scheduling_interval);
            self.update_event = Some(self.ctx.emit_self(UpdateProcessing {}, delay));
        }
    }
}

impl EventHandler for Datacenter {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            VmCreateRequest { vm } => {
                self.on_vm_create_request(vm, event.src);
            }
            VmDestroyRequest { vm_id } => {
                self.on_vm_destroy_request(vm_id);
            }
            CloudletSubmit { cloudlet, vm_id } => {
                self.on_cloudlet_submit(cloudlet, vm_id, event.src);
            }
            UpdateProcessing {} => {
                self.update_event = None;
                self.update_processing();
            }
        })
    }
}
