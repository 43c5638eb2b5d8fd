use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use stratus_core::{cast, Event, EventHandler, Simulation, SimulationContext};

#[derive(Clone, Serialize)]
struct TickEvent {
    seq: u32,
}

struct Recorder {
    ctx: SimulationContext,
    delivered: Vec<(f64, u32)>,
}

impl Recorder {
    fn new(ctx: SimulationContext) -> Self {
        Self {
            ctx,
            delivered: Vec::new(),
        }
    }
}

impl EventHandler for Recorder {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            TickEvent { seq } => {
                self.delivered.push((self.ctx.time(), seq));
            }
        })
    }
}

fn make_recorder(sim: &mut Simulation, name: &str) -> (Rc<RefCell<Recorder>>, u32) {
    let ctx = sim.create_context(name);
    let recorder = Rc::new(RefCell::new(Recorder::new(ctx)));
    let id = sim.add_handler(name, recorder.clone());
    (recorder, id)
}

// Run with RUST_LOG=trace to see the kernel logs.
fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn events_are_delivered_in_timestamp_order() {
    init_logger();
    let mut sim = Simulation::new(123);
    let (recorder, id) = make_recorder(&mut sim, "recorder");
    let ctx = sim.create_context("source");

    ctx.emit(TickEvent { seq: 3 }, id, 3.0);
    ctx.emit(TickEvent { seq: 1 }, id, 1.0);
    ctx.emit(TickEvent { seq: 2 }, id, 2.0);
    sim.step_until_no_events();

    assert_eq!(sim.time(), 3.0);
    assert_eq!(
        recorder.borrow().delivered,
        vec![(1.0, 1), (2.0, 2), (3.0, 3)]
    );
}

#[test]
fn simultaneous_events_keep_emission_order() {
    init_logger();
    let mut sim = Simulation::new(123);
    let (recorder, id) = make_recorder(&mut sim, "recorder");
    let ctx = sim.create_context("source");

    for seq in 0..10 {
        ctx.emit(TickEvent { seq }, id, 5.0);
    }
    sim.step_until_no_events();

    let delivered: Vec<u32> = recorder.borrow().delivered.iter().map(|&(_, seq)| seq).collect();
    assert_eq!(delivered, (0..10).collect::<Vec<u32>>());
}

#[test]
fn clock_is_monotonic() {
    init_logger();
    let mut sim = Simulation::new(123);
    let (recorder, id) = make_recorder(&mut sim, "recorder");
    let ctx = sim.create_context("source");

    ctx.emit(TickEvent { seq: 0 }, id, 2.5);
    ctx.emit(TickEvent { seq: 1 }, id, 0.5);
    ctx.emit(TickEvent { seq: 2 }, id, 2.5);
    ctx.emit(TickEvent { seq: 3 }, id, 1.5);
    sim.step_until_no_events();

    let times: Vec<f64> = recorder.borrow().delivered.iter().map(|&(t, _)| t).collect();
    for pair in times.windows(2) {
        assert!(pair[0] <= pair[1]);
    }
}

#[test]
fn cancelled_events_are_not_delivered() {
    init_logger();
    let mut sim = Simulation::new(123);
    let (recorder, id) = make_recorder(&mut sim, "recorder");
    let ctx = sim.create_context("source");

    let to_cancel = ctx.emit(TickEvent { seq: 1 }, id, 1.0);
    ctx.emit(TickEvent { seq: 2 }, id, 2.0);
    ctx.cancel_event(to_cancel);
    sim.step_until_no_events();

    assert_eq!(sim.time(), 2.0);
    assert_eq!(recorder.borrow().delivered, vec![(2.0, 2)]);
}

#[test]
fn step_for_duration_stops_before_later_events() {
    init_logger();
    let mut sim = Simulation::new(123);
    let (recorder, id) = make_recorder(&mut sim, "recorder");
    let ctx = sim.create_context("source");

    ctx.emit(TickEvent { seq: 1 }, id, 1.0);
    ctx.emit(TickEvent { seq: 2 }, id, 5.0);

    let more = sim.step_for_duration(2.0);
    assert!(more);
    assert_eq!(recorder.borrow().delivered.len(), 1);

    let more = sim.step_for_duration(10.0);
    assert!(!more);
    assert_eq!(recorder.borrow().delivered.len(), 2);
    assert_eq!(sim.time(), 5.0);
}

#[test]
fn empty_simulation_completes_immediately() {
    init_logger();
    let mut sim = Simulation::new(123);
    sim.step_until_no_events();
    assert_eq!(sim.time(), 0.0);
    assert_eq!(sim.event_count(), 0);
    assert!(!sim.step());
}

#[test]
fn identical_runs_produce_identical_traces() {
    init_logger();
    let run = || {
        let mut sim = Simulation::new(42);
        let (recorder, id) = make_recorder(&mut sim, "recorder");
        let ctx = sim.create_context("source");
        for seq in 0..100 {
            let delay = ctx.gen_range(0.0..10.0);
            ctx.emit(TickEvent { seq }, id, delay);
        }
        sim.step_until_no_events();
        let trace = recorder.borrow().delivered.clone();
        trace
    };
    assert_eq!(run(), run());
}
