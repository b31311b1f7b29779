use crate::aircraft::{Aircraft, AircraftId, Direction, FlightType};
use crate::config::SimConfig;
use crate::error::IpcError;
use crate::ipc::ViolationSink;
use crate::phase::ViolationOdds;
use crate::schedule::scheduler::{Scheduler, TickReport};
use crate::time::Tick;
use crate::violation::Avn;
use proptest::prelude::Strategy;
use proptest::prop_oneof;
use proptest::strategy::Just;
use std::sync::Arc;

/// Collects every routed AVN.
#[derive(Default)]
pub struct Recorder {
    pub routed: Vec<Avn>,
}

impl ViolationSink for Recorder {
    fn route(&mut self, avn: &Avn) -> Result<(), IpcError> {
        self.routed.push(avn.clone());
        Ok(())
    }
}

/// No generator streams and no injected violations.
pub fn quiet_config() -> SimConfig {
    SimConfig {
        seed: Some(7),
        streams: vec![],
        violations: ViolationOdds::never(),
        ..SimConfig::default()
    }
}

pub fn aircraft(
    id: AircraftId,
    flight_type: FlightType,
    direction: Direction,
    scheduled_at: u64,
) -> Aircraft {
    let mut ac = Aircraft::new(
        id,
        Arc::from(format!("PI-{}", id)),
        Arc::from("PIA"),
        flight_type,
        direction,
        Tick(scheduled_at),
    );
    ac.speed = if direction.is_arrival() { 450 } else { 0 };
    ac
}

pub fn add_aircraft(
    scheduler: &mut Scheduler,
    id: AircraftId,
    flight_type: FlightType,
    direction: Direction,
) -> AircraftId {
    let at = scheduler.now().0;
    scheduler.admit(aircraft(id, flight_type, direction, at));
    id
}

pub fn run(scheduler: &mut Scheduler, sink: &mut Recorder, ticks: u64) -> Vec<TickReport> {
    (0..ticks).map(|_| scheduler.tick(sink)).collect()
}

pub fn arb_flight_type() -> impl Strategy<Value = FlightType> {
    prop_oneof![
        Just(FlightType::Commercial),
        Just(FlightType::Cargo),
        Just(FlightType::Emergency),
    ]
}

pub fn arb_direction() -> impl Strategy<Value = Direction> {
    prop_oneof![
        Just(Direction::North),
        Just(Direction::South),
        Just(Direction::East),
        Just(Direction::West),
    ]
}
