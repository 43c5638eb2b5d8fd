//! Simulation component identifiers.

/// Identifier of a simulation component.
///
/// Identifiers are assigned sequentially starting from 0 as components are
/// registered in the simulation.
pub type Id = u32;
