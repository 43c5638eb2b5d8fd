//! Broker mediating between users and datacenters.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use stratus_core::cast;
use stratus_core::{Event, EventHandler, Id, SimulationContext};

use crate::core::cloudlet::Cloudlet;
use crate::core::config::SimulationConfig;
use crate::core::events::allocation::{VmCreateAck, VmCreateRequest, VmDestroyAck, VmDestroyRequest};
use crate::core::events::cloudlet::{CloudletReturn, CloudletSubmit};
use crate::core::logger::Logger;
use crate::core::vm::{VmSpec, VmStatus};

/// Simulation component submitting VMs and cloudlets on behalf of a user.
///
/// VM creation requests are spread over the known datacenters round-robin.
/// Cloudlets are held back until all VM creation acks arrive, then bound to
/// the created VMs round-robin. Once every dispatched cloudlet has returned,
/// the broker requests destruction of all its VMs.
pub struct DatacenterBroker {
    datacenters: Vec<Id>,
    next_datacenter: usize,
    /// VM ids with an outstanding creation request
    pending_vms: HashSet<u32>,
    /// successfully created VM ids, in ack arrival order
    created_vms: Vec<u32>,
    /// VM ids whose creation was rejected by the datacenter
    failed_vms: Vec<u32>,
    vm_statuses: HashMap<u32, VmStatus>,
    vm_location: HashMap<u32, Id>,
    queued_cloudlets: Vec<Cloudlet>,
    /// cloudlets dropped because no VM could be created to run them
    unresolved_cloudlets: Vec<Cloudlet>,
    received_cloudlets: Vec<Cloudlet>,
    dispatched_count: usize,
    next_vm: usize,
    destroy_issued: bool,
    logger: Rc<RefCell<Box<dyn Logger>>>,
    sim_config: Rc<SimulationConfig>,
    ctx: SimulationContext,
}

impl DatacenterBroker {
    pub fn new(
        logger: Rc<RefCell<Box<dyn Logger>>>,
        sim_config: Rc<SimulationConfig>,
        ctx: SimulationContext,
    ) -> Self {
        Self {
            datacenters: Vec::new(),
            next_datacenter: 0,
            pending_vms: HashSet::new(),
            created_vms: Vec::new(),
            failed_vms: Vec::new(),
            vm_statuses: HashMap::new(),
            vm_location: HashMap::new(),
            queued_cloudlets: Vec::new(),
            unresolved_cloudlets: Vec::new(),
            received_cloudlets: Vec::new(),
            dispatched_count: 0,
            next_vm: 0,
            destroy_issued: false,
            logger,
            sim_config,
            ctx,
        }
    }

    pub fn id(&self) -> Id {
        self.ctx.id()
    }

    pub fn add_datacenter(&mut self, datacenter_id: Id) {
        self.datacenters.push(datacenter_id);
    }

    /// Requests creation of the VMs, spreading them over the known
    /// datacenters round-robin.
    pub fn submit_vm_list(&mut self, vms: Vec<VmSpec>) {
        if self.datacenters.is_empty() {
            self.logger
                .borrow_mut()
                .log_error(&self.ctx, "cannot submit VMs, no datacenters are known".to_string());
            return;
        }
        for vm in vms {
            let datacenter_id = self.datacenters[self.next_datacenter % self.datacenters.len()];
            self.next_datacenter += 1;
            self.pending_vms.insert(vm.id);
            self.vm_statuses.insert(vm.id, VmStatus::Pending);
            self.logger.borrow_mut().log_debug(
                &self.ctx,
                format!("requesting VM {} from {}", vm.id, self.ctx.lookup_name(datacenter_id)),
            );
            self.ctx
                .emit(VmCreateRequest { vm }, datacenter_id, self.sim_config.message_delay);
        }
    }

    /// Queues cloudlets for execution.
    ///
    /// Dispatch happens as soon as no VM creation ack is outstanding.
    /// Cloudlets submitted when no ack is outstanding and no VM has been
    /// created are recorded as unresolved right away.
    pub fn submit_cloudlet_list(&mut self, cloudlets: Vec<Cloudlet>) {
        self.queued_cloudlets.extend(cloudlets);
        if self.pending_vms.is_empty() {
            self.dispatch_cloudlets();
        }
    }

    pub fn created_vms(&self) -> &[u32] {
        &self.created_vms
    }

    pub fn failed_vms(&self) -> &[u32] {
        &self.failed_vms
    }

    /// Lifecycle status of a VM this broker has requested.
    pub fn vm_status(&self, vm_id: u32) -> Option<VmStatus> {
        self.vm_statuses.get(&vm_id).copied()
    }

    /// Cloudlets which completed (or failed) and were returned by datacenters.
    pub fn received_cloudlets(&self) -> &[Cloudlet] {
        &self.received_cloudlets
    }

    /// Cloudlets which could not be bound to any VM.
    pub fn unresolved_cloudlets(&self) -> &[Cloudlet] {
        &self.unresolved_cloudlets
    }

    /// Binds queued cloudlets to created VMs round-robin and sends them to
    /// the hosting datacenters. With no created VMs the queued cloudlets are
    /// moved to the unresolved list.
    fn dispatch_cloudlets(&mut self) {
        if self.queued_cloudlets.is_empty() {
            return;
        }
        if self.created_vms.is_empty() {
            self.logger.borrow_mut().log_warn(
                &self.ctx,
                format!(
                    "dropping {} cloudlets, no VMs are available to run them",
                    self.queued_cloudlets.len()
                ),
            );
            self.unresolved_cloudlets.append(&mut self.queued_cloudlets);
            return;
        }
        for cloudlet in self.queued_cloudlets.drain(..) {
            let vm_id = self.created_vms[self.next_vm % self.created_vms.len()];
            self.next_vm += 1;
            let datacenter_id = self.vm_location[&vm_id];
            self.dispatched_count += 1;
            self.ctx.emit(
                CloudletSubmit { cloudlet, vm_id },
                datacenter_id,
                self.sim_config.message_delay,
            );
        }
    }

    fn on_vm_create_ack(&mut self, vm_id: u32, host_id: Option<u32>, success: bool, datacenter_id: Id) {
        self.pending_vms.remove(&vm_id);
        if success {
            self.logger.borrow_mut().log_info(
                &self.ctx,
                format!(
                    "VM {} created on host {} in {}",
                    vm_id,
                    host_id.unwrap_or_default(),
                    self.ctx.lookup_name(datacenter_id)
                ),
            );
            self.created_vms.push(vm_id);
            self.vm_statuses.insert(vm_id, VmStatus::Created);
            self.vm_location.insert(vm_id, datacenter_id);
        } else {
            self.logger
                .borrow_mut()
                .log_warn(&self.ctx, format!("VM {} creation failed", vm_id));
            self.failed_vms.push(vm_id);
            self.vm_statuses.insert(vm_id, VmStatus::FailedToCreate);
        }
        if self.pending_vms.is_empty() {
            self.dispatch_cloudlets();
        }
    }

    fn on_cloudlet_return(&mut self, cloudlet: Cloudlet) {
        self.logger.borrow_mut().log_info(
            &self.ctx,
            format!("cloudlet {} returned with status {}", cloudlet.id, cloudlet.status()),
        );
        self.received_cloudlets.push(cloudlet);
        self.destroy_vms_when_done();
    }

    /// Once all dispatched cloudlets have returned, asks the datacenters to
    /// destroy the broker's VMs.
    fn destroy_vms_when_done(&mut self) {
        if self.destroy_issued
            || !self.pending_vms.is_empty()
            || !self.queued_cloudlets.is_empty()
            || self.received_cloudlets.len() < self.dispatched_count
        {
            return;
        }
        self.destroy_issued = true;
        for &vm_id in &self.created_vms {
            let datacenter_id = self.vm_location[&vm_id];
            self.ctx
                .emit(VmDestroyRequest { vm_id }, datacenter_id, self.sim_config.message_delay);
        }
    }
}

impl EventHandler for DatacenterBroker {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            VmCreateAck { vm_id, host_id, success } => {
                self.on_vm_create_ack(vm_id, host_id, success, event.src);
            }
            VmDestroyAck { vm_id } => {
                self.vm_statuses.insert(vm_id, VmStatus::Destroyed);
                self.logger
                    .borrow_mut()
                    .log_debug(&self.ctx, format!("VM {} destroyed", vm_id));
            }
            CloudletReturn { cloudlet } => {
                self.on_cloudlet_return(cloudlet);
            }
        })
    }
}
