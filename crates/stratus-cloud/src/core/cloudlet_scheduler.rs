//! Cloudlet schedulers dividing VM capacity among resident cloudlets.

use std::collections::{BTreeMap, VecDeque};
use std::mem;

use serde::{Deserialize, Serialize};

use crate::core::cloudlet::{Cloudlet, CloudletStatus};

// Relative tolerance for detecting completion despite floating-point errors.
const COMPLETION_EPS: f64 = 1e-9;

fn is_complete(cloudlet: &Cloudlet) -> bool {
    cloudlet.remaining() <= COMPLETION_EPS * cloudlet.length.max(1.)
}

/// Kind of cloudlet scheduler used by a VM.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum CloudletSchedulerKind {
    TimeShared,
    SpaceShared,
}

/// Divides the processing capacity granted to a VM among its resident cloudlets
/// and tracks their execution progress.
///
/// The scheduler is advanced lazily: progress is accumulated only when
/// `cloudlet_submit` or `update_processing` is invoked, which the owning
/// datacenter does at every point where execution rates may change.
pub trait CloudletScheduler {
    /// Accepts a cloudlet for execution.
    ///
    /// Returns the estimated delay until the cloudlet completes, assuming
    /// the current population and MIPS share stay unchanged.
    fn cloudlet_submit(&mut self, cloudlet: Cloudlet, time: f64, mips_share: &[f64]) -> f64;

    /// Advances execution up to `time` using the specified MIPS share.
    ///
    /// Returns the delay until the next expected cloudlet completion,
    /// or `None` if no cloudlet is executing.
    fn update_processing(&mut self, time: f64, mips_share: &[f64]) -> Option<f64>;

    /// Takes the cloudlets which reached the `Success` status since the last drain.
    fn drain_finished(&mut self) -> Vec<Cloudlet>;

    /// Number of cloudlets which did not reach a terminal status yet.
    fn active_count(&self) -> usize;
}

pub fn cloudlet_scheduler_resolver(kind: CloudletSchedulerKind, pe_count: u32) -> Box<dyn CloudletScheduler> {
    match kind {
        CloudletSchedulerKind::TimeShared => Box::new(CloudletSchedulerTimeShared::new(pe_count)),
        CloudletSchedulerKind::SpaceShared => Box::new(CloudletSchedulerSpaceShared::new(pe_count)),
    }
}

/// Time-shared cloudlet scheduler.
///
/// All resident cloudlets execute concurrently. The effective rate of each
/// cloudlet is `total_mips_share / max(pes_in_use, vm_pes)` weighted by its
/// CPU utilization model, so an uncontended cloudlet progresses at the per-PE
/// MIPS rating and contention slows everyone down fairly.
pub struct CloudletSchedulerTimeShared {
    pe_count: u32,
    executing: BTreeMap<u32, Cloudlet>,
    finished: Vec<Cloudlet>,
    last_update: f64,
}

impl CloudletSchedulerTimeShared {
    pub fn new(pe_count: u32) -> Self {
        Self {
            pe_count,
            executing: BTreeMap::new(),
            finished: Vec::new(),
            last_update: 0.,
        }
    }

    fn capacity(&self, mips_share: &[f64]) -> f64 {
        if mips_share.is_empty() {
            return 0.;
        }
        let total: f64 = mips_share.iter().sum();
        let pes_in_use: u32 = self.executing.values().map(|c| c.pes).sum();
        total / pes_in_use.max(self.pe_count).max(1) as f64
    }

    /// Accumulates progress since the previous update and collects completions.
    fn advance(&mut self, time: f64, mips_share: &[f64]) {
        let elapsed = time - self.last_update;
        if elapsed > 0. && !self.executing.is_empty() {
            let capacity = self.capacity(mips_share);
            for cloudlet in self.executing.values_mut() {
                let rate = capacity * cloudlet.cpu_utilization(time);
                cloudlet.add_executed(rate * elapsed);
            }
        }
        self.last_update = time;

        let completed: Vec<u32> = self
            .executing
            .values()
            .filter(|c| is_complete(c))
            .map(|c| c.id)
            .collect();
        for id in completed {
            let mut cloudlet = self.executing.remove(&id).unwrap();
            cloudlet.mark_finished(time);
            self.finished.push(cloudlet);
        }
    }

    fn next_completion_delay(&self, time: f64, mips_share: &[f64]) -> Option<f64> {
        let capacity = self.capacity(mips_share);
        self.executing
            .values()
            .map(|c| {
                let rate = capacity * c.cpu_utilization(time);
                if rate > 0. {
                    c.remaining() / rate
                } else {
                    f64::INFINITY
                }
            })
            .filter(|eta| eta.is_finite())
            .min_by(|a, b| a.total_cmp(b))
    }
}

impl CloudletScheduler for CloudletSchedulerTimeShared {
    fn cloudlet_submit(&mut self, mut cloudlet: Cloudlet, time: f64, mips_share: &[f64]) -> f64 {
        self.advance(time, mips_share);
        cloudlet.set_status(CloudletStatus::Executing);
        cloudlet.set_submission_time(time);
        let id = cloudlet.id;
        self.executing.insert(id, cloudlet);

        let capacity = self.capacity(mips_share);
        let cloudlet = &self.executing[&id];
        let rate = capacity * cloudlet.cpu_utilization(time);
        if rate > 0. {
            cloudlet.remaining() / rate
        } else {
            f64::INFINITY
        }
    }

    fn update_processing(&mut self, time: f64, mips_share: &[f64]) -> Option<f64> {
        self.advance(time, mips_share);
        self.next_completion_delay(time, mips_share)
    }

    fn drain_finished(&mut self) -> Vec<Cloudlet> {
        mem::take(&mut self.finished)
    }

    fn active_count(&self) -> usize {
        self.executing.len()
    }
}

/// Space-shared cloudlet scheduler.
///
/// Each executing cloudlet holds its required PEs exclusively and progresses
/// at the full per-PE rate. Cloudlets which do not fit wait in a FIFO queue
/// and are promoted as capacity frees up.
pub struct CloudletSchedulerSpaceShared {
    pe_count: u32,
    used_pes: u32,
    executing: BTreeMap<u32, Cloudlet>,
    waiting: VecDeque<Cloudlet>,
    finished: Vec<Cloudlet>,
    last_update: f64,
}

impl CloudletSchedulerSpaceShared {
    pub fn new(pe_count: u32) -> Self {
        Self {
            pe_count,
            used_pes: 0,
            executing: BTreeMap::new(),
            waiting: VecDeque::new(),
            finished: Vec::new(),
            last_update: 0.,
        }
    }

    fn per_pe_mips(&self, mips_share: &[f64]) -> f64 {
        if mips_share.is_empty() {
            return 0.;
        }
        mips_share.iter().sum::<f64>() / mips_share.len() as f64
    }

    fn advance(&mut self, time: f64, mips_share: &[f64]) {
        let elapsed = time - self.last_update;
        if elapsed > 0. && !self.executing.is_empty() {
            let per_pe = self.per_pe_mips(mips_share);
            for cloudlet in self.executing.values_mut() {
                let rate = per_pe * cloudlet.cpu_utilization(time);
                cloudlet.add_executed(rate * elapsed);
            }
        }
        self.last_update = time;

        let completed: Vec<u32> = self
            .executing
            .values()
            .filter(|c| is_complete(c))
            .map(|c| c.id)
            .collect();
        for id in completed {
            let mut cloudlet = self.executing.remove(&id).unwrap();
            self.used_pes -= cloudlet.pes;
            cloudlet.mark_finished(time);
            self.finished.push(cloudlet);
        }
        self.promote_waiting();
    }

    fn promote_waiting(&mut self) {
        while let Some(cloudlet) = self.waiting.front() {
            if self.used_pes + cloudlet.pes > self.pe_count {
                break;
            }
            let mut cloudlet = self.waiting.pop_front().unwrap();
            cloudlet.set_status(CloudletStatus::Executing);
            self.used_pes += cloudlet.pes;
            self.executing.insert(cloudlet.id, cloudlet);
        }
    }

    fn next_completion_delay(&self, time: f64, mips_share: &[f64]) -> Option<f64> {
        let per_pe = self.per_pe_mips(mips_share);
        self.executing
            .values()
            .map(|c| {
                let rate = per_pe * c.cpu_utilization(time);
                if rate > 0. {
                    c.remaining() / rate
                } else {
                    f64::INFINITY
                }
            })
            .filter(|eta| eta.is_finite())
            .min_by(|a, b| a.total_cmp(b))
    }
}

impl CloudletScheduler for CloudletSchedulerSpaceShared {
    fn cloudlet_submit(&mut self, mut cloudlet: Cloudlet, time: f64, mips_share: &[f64]) -> f64 {
        self.advance(time, mips_share);
        cloudlet.set_submission_time(time);

        let per_pe = self.per_pe_mips(mips_share);
        let estimate = if per_pe > 0. {
            cloudlet.remaining() / (per_pe * cloudlet.cpu_utilization(time))
        } else {
            f64::INFINITY
        };

        if self.used_pes + cloudlet.pes <= self.pe_count {
            cloudlet.set_status(CloudletStatus::Executing);
            self.used_pes += cloudlet.pes;
            self.executing.insert(cloudlet.id, cloudlet);
        } else {
            cloudlet.set_status(CloudletStatus::Queued);
            self.waiting.push_back(cloudlet);
        }
        estimate
    }

    fn update_processing(&mut self, time: f64, mips_share: &[f64]) -> Option<f64> {
        self.advance(time, mips_share);
        self.next_completion_delay(time, mips_share)
    }

    fn drain_finished(&mut self) -> Vec<Cloudlet> {
        mem::take(&mut self.finished)
    }

    fn active_count(&self) -> usize {
        self.executing.len() + self.waiting.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uncontended_cloudlet_runs_at_full_rate() {
        let mut scheduler = CloudletSchedulerTimeShared::new(2);
        let share = [2500., 2500.];
        let eta = scheduler.cloudlet_submit(Cloudlet::with_full_utilization(0, 10000., 2, 300, 300), 0., &share);
        assert_eq!(eta, 4.0);

        assert!(scheduler.update_processing(4.0, &share).is_none());
        let finished = scheduler.drain_finished();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].status(), CloudletStatus::Success);
        assert_eq!(finished[0].finish_time(), 4.0);
        assert_eq!(finished[0].actual_cpu_time(), 4.0);
    }

    #[test]
    fn time_shared_splits_capacity_fairly() {
        let mut scheduler = CloudletSchedulerTimeShared::new(1);
        let share = [2500.];
        scheduler.cloudlet_submit(Cloudlet::with_full_utilization(0, 10000., 1, 300, 300), 0., &share);
        let eta = scheduler.cloudlet_submit(Cloudlet::with_full_utilization(1, 10000., 1, 300, 300), 0., &share);
        // two cloudlets share one PE, each runs at half rate
        assert_eq!(eta, 8.0);

        assert!(scheduler.update_processing(8.0, &share).is_none());
        let finished = scheduler.drain_finished();
        assert_eq!(finished.len(), 2);
        assert_eq!(finished[0].finish_time(), finished[1].finish_time());
    }

    #[test]
    fn time_shared_speeds_up_after_completion() {
        let mut scheduler = CloudletSchedulerTimeShared::new(1);
        let share = [1000.];
        scheduler.cloudlet_submit(Cloudlet::with_full_utilization(0, 1000., 1, 0, 0), 0., &share);
        scheduler.cloudlet_submit(Cloudlet::with_full_utilization(1, 2000., 1, 0, 0), 0., &share);

        // both run at 500 MIPS; the short one completes at t=2
        let next = scheduler.update_processing(2.0, &share).unwrap();
        assert_eq!(scheduler.drain_finished().len(), 1);
        // the long one has 1000 MI left and now runs at full 1000 MIPS
        assert_eq!(next, 1.0);
        scheduler.update_processing(3.0, &share);
        let finished = scheduler.drain_finished();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].finish_time(), 3.0);
    }

    #[test]
    fn utilization_model_slows_execution() {
        use crate::core::utilization_model::{UtilizationConstant, UtilizationFull};

        let mut scheduler = CloudletSchedulerTimeShared::new(1);
        let share = [1000.];
        let cloudlet = Cloudlet::new(
            0,
            1000.,
            1,
            0,
            0,
            Box::new(UtilizationConstant::new(0.5)),
            Box::new(UtilizationFull::new()),
            Box::new(UtilizationFull::new()),
        );
        let eta = scheduler.cloudlet_submit(cloudlet, 0., &share);
        assert_eq!(eta, 2.0);
    }

    #[test]
    fn space_shared_queues_excess_cloudlets() {
        let mut scheduler = CloudletSchedulerSpaceShared::new(1);
        let share = [1000.];
        scheduler.cloudlet_submit(Cloudlet::with_full_utilization(0, 1000., 1, 0, 0), 0., &share);
        scheduler.cloudlet_submit(Cloudlet::with_full_utilization(1, 1000., 1, 0, 0), 0., &share);
        assert_eq!(scheduler.active_count(), 2);

        // first completes at t=1, second is promoted and completes at t=2
        let next = scheduler.update_processing(1.0, &share).unwrap();
        assert_eq!(scheduler.drain_finished().len(), 1);
        assert_eq!(next, 1.0);
        scheduler.update_processing(2.0, &share);
        let finished = scheduler.drain_finished();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].finish_time(), 2.0);
        assert_eq!(scheduler.active_count(), 0);
    }
}
