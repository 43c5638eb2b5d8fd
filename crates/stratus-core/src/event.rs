//! Simulation events.

use std::cmp::Ordering;

use downcast_rs::{impl_downcast, Downcast};
use serde::ser::Serialize;

use crate::component::Id;

/// Identifier of an event, unique within a simulation run.
pub type EventId = u64;

/// Trait for event payloads.
///
/// Any serializable type can be used as an event payload. Payloads are stored
/// as trait objects and downcast back to concrete types in event handlers via
/// the [`cast!`](crate::cast!) macro.
pub trait EventData: Downcast + erased_serde::Serialize {}

impl_downcast!(EventData);

erased_serde::serialize_trait_object!(EventData);

impl<T: Serialize + 'static> EventData for T {}

/// A timestamped message delivered from one simulation component to another.
pub struct Event {
    /// Identifier of the event, reflects the order of event creation.
    pub id: EventId,
    /// Simulation time of event delivery.
    pub time: f64,
    /// Identifier of the component producing the event.
    pub src: Id,
    /// Identifier of the component receiving the event.
    pub dst: Id,
    /// Event payload.
    pub data: Box<dyn EventData>,
}

impl Eq for Event {}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

// Inverted comparison so that BinaryHeap pops the event with the minimum
// (time, id) pair. Ordering by id within equal timestamps preserves the
// emission order and makes runs reproducible.
impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        other.time.total_cmp(&self.time).then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
