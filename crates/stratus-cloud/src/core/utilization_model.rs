//! Resource utilization models.

use dyn_clone::{clone_trait_object, DynClone};

/// A utilization model defines which fraction of the allocated resource a cloudlet
/// actually uses at the given simulation time. The returned value is in _[0, 1]_.
pub trait UtilizationModel: DynClone {
    fn utilization(&self, time: f64) -> f64;
}

clone_trait_object!(UtilizationModel);

/// Full utilization at all times.
#[derive(Clone)]
pub struct UtilizationFull;

impl UtilizationFull {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for UtilizationFull {
    fn default() -> Self {
        Self::new()
    }
}

impl UtilizationModel for UtilizationFull {
    fn utilization(&self, _time: f64) -> f64 {
        1.
    }
}

/// Constant utilization.
#[derive(Clone)]
pub struct UtilizationConstant {
    utilization: f64,
}

impl UtilizationConstant {
    pub fn new(utilization: f64) -> Self {
        Self { utilization }
    }
}

impl UtilizationModel for UtilizationConstant {
    fn utilization(&self, _time: f64) -> f64 {
        self.utilization
    }
}
