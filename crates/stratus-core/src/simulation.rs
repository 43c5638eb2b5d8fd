//! Simulation setup and execution.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::Level::Trace;
use log::{debug, log_enabled, trace};
use rand::distributions::uniform::{SampleRange, SampleUniform};
use serde_json::json;
use serde_type_name::type_name;

use crate::component::Id;
use crate::context::SimulationContext;
use crate::event::Event;
use crate::handler::EventHandler;
use crate::log::{colored_tag, log_undelivered_event};
use crate::state::SimulationState;

/// Owns the component registry and the event queue, and drives the
/// simulation by delivering events to registered handlers.
pub struct Simulation {
    sim_state: Rc<RefCell<SimulationState>>,
    name_to_id: HashMap<String, Id>,
    names: Rc<RefCell<Vec<String>>>,
    handlers: Vec<Option<Rc<RefCell<dyn EventHandler>>>>,
}

impl Simulation {
    /// Creates a simulation with the given random seed.
    ///
    /// The seed fixes the simulation-wide RNG, so two simulations built and
    /// driven identically produce identical event sequences.
    pub fn new(seed: u64) -> Self {
        Self {
            sim_state: Rc::new(RefCell::new(SimulationState::new(seed))),
            name_to_id: HashMap::new(),
            names: Rc::new(RefCell::new(Vec::new())),
            handlers: Vec::new(),
        }
    }

    fn register(&mut self, name: &str) -> Id {
        if let Some(&id) = self.name_to_id.get(name) {
            return id;
        }
        let id = self.name_to_id.len() as Id;
        self.name_to_id.insert(name.to_owned(), id);
        self.names.borrow_mut().push(name.to_owned());
        self.handlers.push(None);
        id
    }

    fn log_registry(&self, action: &str, name: &str, id: Id) {
        debug!(
            target: "simulation",
            "[{:.3} {} simulation] {}: {}",
            self.time(),
            colored_tag("DEBUG", colored::Color::Blue),
            action,
            json!({"name": name, "id": id})
        );
    }

    /// Returns the identifier of the named component.
    ///
    /// Panics if no component with this name is registered.
    pub fn lookup_id(&self, name: &str) -> Id {
        *self.name_to_id.get(name).unwrap()
    }

    /// Returns the name of the component with the given identifier.
    ///
    /// Panics if no component with this identifier is registered.
    pub fn lookup_name(&self, id: Id) -> String {
        self.names.borrow()[id as usize].clone()
    }

    /// Registers a component under the given name and returns its context.
    ///
    /// Identifiers are assigned sequentially starting from 0.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use stratus_core::Simulation;
    ///
    /// let mut sim = Simulation::new(123);
    /// let comp_ctx = sim.create_context("comp");
    /// assert_eq!(comp_ctx.id(), 0);
    /// assert_eq!(comp_ctx.name(), "comp");
    /// ```
    pub fn create_context<S>(&mut self, name: S) -> SimulationContext
    where
        S: AsRef<str>,
    {
        let ctx = SimulationContext::new(
            self.register(name.as_ref()),
            name.as_ref(),
            self.sim_state.clone(),
            self.names.clone(),
        );
        self.log_registry("Created context", ctx.name(), ctx.id());
        ctx
    }

    /// Registers an event handler for the named component and returns the
    /// component identifier.
    ///
    /// If a context was already created under this name, its identifier is
    /// reused.
    pub fn add_handler<S>(&mut self, name: S, handler: Rc<RefCell<dyn EventHandler>>) -> Id
    where
        S: AsRef<str>,
    {
        let id = self.register(name.as_ref());
        self.handlers[id as usize] = Some(handler);
        self.log_registry("Added handler", name.as_ref(), id);
        id
    }

    /// Unregisters the event handler of the named component.
    ///
    /// Events destined to the component are logged as undelivered and
    /// discarded until a handler is added again.
    pub fn remove_handler<S>(&mut self, name: S)
    where
        S: AsRef<str>,
    {
        let id = self.lookup_id(name.as_ref());
        self.handlers[id as usize] = None;
        self.log_registry("Removed handler", name.as_ref(), id);
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> f64 {
        self.sim_state.borrow().time()
    }

    /// Delivers the next pending event.
    ///
    /// Pops the event with the smallest `(time, id)` pair, advances the
    /// clock to its time and invokes the destination component's handler.
    /// The pop order guarantees the clock never moves backwards. An event
    /// destined to a component without a handler is logged and discarded.
    ///
    /// Returns `false` when the queue is empty and no progress can be made,
    /// `true` otherwise (whether or not the event found a handler).
    pub fn step(&mut self) -> bool {
        let next = self.sim_state.borrow_mut().next_event();
        match next {
            Some(event) => {
                self.dispatch(event);
                true
            }
            None => false,
        }
    }

    fn dispatch(&mut self, event: Event) {
        if log_enabled!(Trace) {
            let dst_name = self.lookup_name(event.dst);
            trace!(
                target: &dst_name,
                "[{:.3} {} {}] {}",
                event.time,
                colored_tag("EVENT", colored::Color::BrightBlack),
                dst_name,
                json!({
                    "type": type_name(&event.data).unwrap(),
                    "data": event.data,
                    "src": self.lookup_name(event.src),
                })
            );
        }
        let handler = self.handlers.get(event.dst as usize).and_then(|h| h.clone());
        match handler {
            Some(handler) => handler.borrow_mut().on(event),
            None => log_undelivered_event(event),
        }
    }

    /// Delivers up to `step_count` pending events.
    ///
    /// Returns `true` if more events may be pending afterwards.
    pub fn steps(&mut self, step_count: u64) -> bool {
        for _ in 0..step_count {
            if !self.step() {
                return false;
            }
        }
        true
    }

    /// Delivers pending events until the queue is empty.
    pub fn step_until_no_events(&mut self) {
        while self.step() {}
    }

    /// Delivers pending events until the next event lies beyond
    /// `current_time + duration` or the queue is empty.
    ///
    /// Returns `true` if more events may be pending afterwards.
    pub fn step_for_duration(&mut self, duration: f64) -> bool {
        let end_time = self.sim_state.borrow().time() + duration;
        loop {
            if let Some(event) = self.sim_state.borrow_mut().peek_event() {
                if event.time > end_time {
                    return true;
                }
            } else {
                return false;
            }
            self.step();
        }
    }

    /// Returns a random float in the range _[0, 1)_
    /// from the simulation-wide random number generator.
    pub fn rand(&mut self) -> f64 {
        self.sim_state.borrow_mut().rand()
    }

    /// Returns a random number in the given range
    /// from the simulation-wide random number generator.
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: SampleUniform,
        R: SampleRange<T>,
    {
        self.sim_state.borrow_mut().gen_range(range)
    }

    /// Returns the total number of events created so far, including
    /// cancelled ones.
    pub fn event_count(&self) -> u64 {
        self.sim_state.borrow().event_count()
    }

    /// Cancels the pending events satisfying the predicate.
    ///
    /// Already delivered events are unaffected.
    pub fn cancel_events<F>(&mut self, pred: F)
    where
        F: Fn(&Event) -> bool,
    {
        self.sim_state.borrow_mut().cancel_events(pred);
    }
}
