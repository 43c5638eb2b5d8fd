//! Facade hiding the simulation setup boilerplate.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use sugars::{rc, refcell};

use stratus_core::context::SimulationContext;
use stratus_core::simulation::Simulation;

use crate::core::broker::DatacenterBroker;
use crate::core::cloudlet::Cloudlet;
use crate::core::config::SimulationConfig;
use crate::core::datacenter::{Datacenter, DatacenterCharacteristics};
use crate::core::host::Host;
use crate::core::logger::{Logger, StdoutLogger};
use crate::core::vm::VmSpec;
use crate::core::vm_allocation_policy::{vm_allocation_policy_resolver, VmAllocationPolicy};
use crate::core::vm_scheduler::VmSchedulerKind;

/// Facade over the simulation kernel for building and running cloud
/// simulations.
pub struct CloudSimulation {
    datacenters: BTreeMap<u32, Rc<RefCell<Datacenter>>>,
    brokers: BTreeMap<u32, Rc<RefCell<DatacenterBroker>>>,
    host_counter: u32,
    logger: Rc<RefCell<Box<dyn Logger>>>,
    sim: Simulation,
    ctx: SimulationContext,
    sim_config: Rc<SimulationConfig>,
}

impl CloudSimulation {
    pub fn new(sim: Simulation, sim_config: SimulationConfig) -> Self {
        Self::with_logger(sim, sim_config, Box::new(StdoutLogger::new()))
    }

    pub fn with_logger(mut sim: Simulation, sim_config: SimulationConfig, logger: Box<dyn Logger>) -> Self {
        let ctx = sim.create_context("simulation");
        Self {
            datacenters: BTreeMap::new(),
            brokers: BTreeMap::new(),
            host_counter: 0,
            logger: rc!(refcell!(logger)),
            sim,
            ctx,
            sim_config: rc!(sim_config),
        }
    }

    /// Creates a datacenter with default characteristics and the placement
    /// policy from the simulation config.
    pub fn add_datacenter(&mut self, name: &str) -> u32 {
        self.add_datacenter_with(
            name,
            DatacenterCharacteristics::default(),
            vm_allocation_policy_resolver(self.sim_config.allocation_policy),
        )
    }

    pub fn add_datacenter_with(
        &mut self,
        name: &str,
        characteristics: DatacenterCharacteristics,
        allocation_policy: Box<dyn VmAllocationPolicy>,
    ) -> u32 {
        let datacenter = rc!(refcell!(Datacenter::new(
            characteristics,
            allocation_policy,
            self.logger.clone(),
            self.sim_config.clone(),
            self.sim.create_context(name),
        )));
        let id = self.sim.add_handler(name, datacenter.clone());
        self.datacenters.insert(id, datacenter);
        id
    }

    /// Adds a host to the datacenter, returns the host id.
    pub fn add_host(
        &mut self,
        datacenter_id: u32,
        pes: u32,
        mips: f64,
        ram: u64,
        bw: u64,
        storage: u64,
        scheduler: VmSchedulerKind,
    ) -> u32 {
        let host_id = self.host_counter;
        self.host_counter += 1;
        let host = Host::new(host_id, pes, mips, ram, bw, storage, scheduler);
        self.datacenters[&datacenter_id].borrow_mut().add_host(host);
        host_id
    }

    /// Populates the datacenter with the hosts described in the simulation
    /// config.
    pub fn add_hosts_from_config(&mut self, datacenter_id: u32) {
        let hosts = self.sim_config.hosts.clone();
        for config in hosts {
            for _ in 0..config.count.unwrap_or(1) {
                self.add_host(
                    datacenter_id,
                    config.pes,
                    config.mips,
                    config.ram,
                    config.bw,
                    config.storage,
                    config.vm_scheduler.unwrap_or(VmSchedulerKind::TimeShared),
                );
            }
        }
    }

    /// Creates a broker knowing all currently registered datacenters.
    pub fn add_broker(&mut self, name: &str) -> u32 {
        let broker = rc!(refcell!(DatacenterBroker::new(
            self.logger.clone(),
            self.sim_config.clone(),
            self.sim.create_context(name),
        )));
        for datacenter_id in self.datacenters.keys() {
            broker.borrow_mut().add_datacenter(*datacenter_id);
        }
        let id = self.sim.add_handler(name, broker.clone());
        self.brokers.insert(id, broker);
        id
    }

    pub fn submit_vm_list(&mut self, broker_id: u32, vms: Vec<VmSpec>) {
        self.brokers[&broker_id].borrow_mut().submit_vm_list(vms);
    }

    pub fn submit_cloudlet_list(&mut self, broker_id: u32, cloudlets: Vec<Cloudlet>) {
        self.brokers[&broker_id].borrow_mut().submit_cloudlet_list(cloudlets);
    }

    /// Runs the simulation until no events remain.
    pub fn run(&mut self) {
        self.sim.step_until_no_events();
    }

    pub fn steps(&mut self, step_count: u64) -> bool {
        self.sim.steps(step_count)
    }

    pub fn step_for_duration(&mut self, time: f64) {
        self.sim.step_for_duration(time);
    }

    pub fn current_time(&self) -> f64 {
        self.sim.time()
    }

    pub fn event_count(&self) -> u64 {
        self.sim.event_count()
    }

    pub fn context(&self) -> &SimulationContext {
        &self.ctx
    }

    pub fn datacenter(&self, id: u32) -> Rc<RefCell<Datacenter>> {
        self.datacenters[&id].clone()
    }

    pub fn broker(&self, id: u32) -> Rc<RefCell<DatacenterBroker>> {
        self.brokers[&id].clone()
    }

    pub fn save_log(&self, path: &str) -> Result<(), std::io::Error> {
        self.logger.borrow().save_log(path)
    }

    pub fn sim_config(&self) -> Rc<SimulationConfig> {
        self.sim_config.clone()
    }
}
