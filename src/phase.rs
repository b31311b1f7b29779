//! Per-aircraft phase machine and violation injection.

use crate::aircraft::{Aircraft, ArrivalPhase, DepartureState, Direction, FlightPlan, FlightType};
use crate::time::Tick;
use crate::violation::{Avn, ViolationDetector};
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const HOLDING_MIN_SPEED: i32 = 400;
pub const HOLDING_MAX_SPEED: i32 = 600;
pub const APPROACH_MIN_SPEED: i32 = 240;
pub const APPROACH_MAX_SPEED: i32 = 290;
pub const LANDING_START_SPEED: i32 = 240;
pub const LANDING_END_SPEED: i32 = 30;
pub const TAXI_MIN_SPEED: i32 = 15;
pub const TAXI_MAX_SPEED: i32 = 30;
pub const GATE_MAX_SPEED: i32 = 5;

pub const TAKEOFF_MAX_SPEED: i32 = 290;
pub const CLIMB_MIN_SPEED: i32 = 250;
pub const CLIMB_MAX_SPEED: i32 = 463;
pub const CRUISE_MIN_SPEED: i32 = 800;
pub const CRUISE_MAX_SPEED: i32 = 900;

pub const HOLDING_DWELL: u32 = 20;
pub const APPROACH_DWELL: u32 = 15;
pub const LANDING_DWELL: u32 = 10;
pub const ARRIVAL_TAXI_DWELL: u32 = 15;
pub const DEPARTURE_TAXI_DWELL: u32 = 15;
pub const TAKEOFF_DWELL: u32 = 10;
pub const CLIMB_DWELL: u32 = 20;

/// Two-stage gate for violation injection: a coarse roll, then a fine roll,
/// both out of 100.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViolationOdds {
    pub coarse_percent: u32,
    pub fine_percent: u32,
    pub min_excess: i32,
    pub max_excess: i32,
}

impl Default for ViolationOdds {
    fn default() -> Self {
        ViolationOdds {
            coarse_percent: 5,
            fine_percent: 15,
            min_excess: 5,
            max_excess: 40,
        }
    }
}

impl ViolationOdds {
    #[cfg(test)]
    pub fn never() -> Self {
        ViolationOdds {
            coarse_percent: 0,
            fine_percent: 0,
            ..Self::default()
        }
    }

    #[cfg(test)]
    pub fn always() -> Self {
        ViolationOdds {
            coarse_percent: 100,
            fine_percent: 100,
            ..Self::default()
        }
    }
}

/// Speed ceiling during Landing after `elapsed` ticks of the phase.
pub fn landing_ceiling(elapsed: u32) -> i32 {
    let drop = (LANDING_START_SPEED - LANDING_END_SPEED) * elapsed as i32 / LANDING_DWELL as i32;
    (LANDING_START_SPEED - drop).max(LANDING_END_SPEED)
}

/// Speed reached during the takeoff roll after `elapsed` ticks of the phase.
pub fn takeoff_speed(elapsed: u32) -> i32 {
    (TAKEOFF_MAX_SPEED * elapsed as i32 / TAKEOFF_DWELL as i32).min(TAKEOFF_MAX_SPEED)
}

/// Speed of a freshly generated aircraft.
pub fn entry_speed<R: Rng + ?Sized>(direction: Direction, rng: &mut R) -> i32 {
    if direction.is_arrival() {
        rng.gen_range(HOLDING_MIN_SPEED..=HOLDING_MAX_SPEED)
    } else {
        0
    }
}

impl Aircraft {
    /// Moves the aircraft one tick forward and runs the violation check on
    /// the resulting speed. Returns the AVN when one was issued this tick.
    pub fn advance<R: Rng + ?Sized>(
        &mut self,
        now: Tick,
        rng: &mut R,
        odds: &ViolationOdds,
        detector: &mut ViolationDetector,
    ) -> Option<Avn> {
        self.phase_ticks += 1;
        let previous = self.plan;

        match self.plan {
            FlightPlan::Arrival(phase) => self.advance_arrival(phase, rng),
            FlightPlan::Departure(state) => self.advance_departure(state, rng),
        }

        if self.plan != previous {
            tracing::debug!(
                flight = %self.flight_number,
                from = %previous.phase(),
                to = %self.phase(),
                speed = self.speed,
                "phase change"
            );
        }

        if let Some(pinned) = self.pinned_speed {
            self.speed = pinned;
        } else if self.pending_violation.is_none() && self.flight_type != FlightType::Emergency {
            self.maybe_inject_violation(rng, odds);
        }

        detector.inspect(self, now)
    }

    fn enter(&mut self, plan: FlightPlan, speed: i32) {
        self.plan = plan;
        self.phase_ticks = 0;
        self.pinned_speed = None;
        self.speed = speed;
    }

    fn advance_arrival<R: Rng + ?Sized>(&mut self, phase: ArrivalPhase, rng: &mut R) {
        let elapsed = self.phase_ticks;
        match phase {
            ArrivalPhase::Holding => {
                if elapsed >= HOLDING_DWELL && self.runway.is_some() {
                    let speed = rng.gen_range(APPROACH_MIN_SPEED..=APPROACH_MAX_SPEED);
                    self.enter(FlightPlan::Arrival(ArrivalPhase::Approach), speed);
                }
            }
            ArrivalPhase::Approach => {
                if elapsed >= APPROACH_DWELL {
                    self.enter(FlightPlan::Arrival(ArrivalPhase::Landing), LANDING_START_SPEED);
                }
            }
            ArrivalPhase::Landing => {
                if !self.is_pinned() {
                    self.speed = landing_ceiling(elapsed);
                }
                if elapsed >= LANDING_DWELL {
                    let speed = rng.gen_range(TAXI_MIN_SPEED..=TAXI_MAX_SPEED);
                    self.enter(FlightPlan::Arrival(ArrivalPhase::Taxi), speed);
                }
            }
            ArrivalPhase::Taxi => {
                if elapsed >= ARRIVAL_TAXI_DWELL {
                    self.enter(FlightPlan::Arrival(ArrivalPhase::AtGate), 0);
                }
            }
            ArrivalPhase::AtGate => {
                self.pinned_speed = None;
                self.speed = 0;
            }
        }
    }

    fn advance_departure<R: Rng + ?Sized>(&mut self, state: DepartureState, rng: &mut R) {
        let elapsed = self.phase_ticks;
        match state {
            DepartureState::AtGate => {
                if self.runway.is_some() {
                    let speed = rng.gen_range(TAXI_MIN_SPEED..=TAXI_MAX_SPEED);
                    self.enter(FlightPlan::Departure(DepartureState::Taxi), speed);
                } else {
                    self.speed = 0;
                }
            }
            DepartureState::Taxi => {
                if elapsed >= DEPARTURE_TAXI_DWELL {
                    self.enter(FlightPlan::Departure(DepartureState::TakeoffRoll), 0);
                }
            }
            DepartureState::TakeoffRoll => {
                if !self.is_pinned() {
                    self.speed = takeoff_speed(elapsed);
                }
                if elapsed >= TAKEOFF_DWELL {
                    let speed = rng.gen_range(CLIMB_MIN_SPEED..=CLIMB_MAX_SPEED);
                    self.enter(FlightPlan::Departure(DepartureState::Climb), speed);
                }
            }
            DepartureState::Climb => {
                if elapsed >= CLIMB_DWELL {
                    let speed = rng.gen_range(CRUISE_MIN_SPEED..=CRUISE_MAX_SPEED);
                    self.enter(FlightPlan::Departure(DepartureState::Cruise), speed);
                }
            }
            DepartureState::Cruise => {}
        }
    }

    fn maybe_inject_violation<R: Rng + ?Sized>(&mut self, rng: &mut R, odds: &ViolationOdds) {
        if rng.gen_range(1..=100) > odds.coarse_percent {
            return;
        }
        if rng.gen_range(1..=100) > odds.fine_percent {
            return;
        }

        let excess = rng.gen_range(odds.min_excess..=odds.max_excess);
        let elapsed = self.phase_ticks;
        let target = match self.plan {
            FlightPlan::Arrival(ArrivalPhase::Holding) => Some(HOLDING_MAX_SPEED + excess),
            FlightPlan::Arrival(ArrivalPhase::Approach) => Some(APPROACH_MAX_SPEED + excess),
            FlightPlan::Arrival(ArrivalPhase::Landing) if elapsed > LANDING_DWELL / 2 => {
                Some(self.speed + excess)
            }
            FlightPlan::Arrival(ArrivalPhase::Taxi) | FlightPlan::Departure(DepartureState::Taxi) => {
                Some(TAXI_MAX_SPEED + excess / 2)
            }
            FlightPlan::Departure(DepartureState::TakeoffRoll) if elapsed > TAKEOFF_DWELL / 2 => {
                Some(TAKEOFF_MAX_SPEED + excess)
            }
            FlightPlan::Departure(DepartureState::Climb) => Some(CLIMB_MAX_SPEED + excess),
            FlightPlan::Departure(DepartureState::Cruise) => {
                if rng.gen_bool(0.5) {
                    Some(CRUISE_MAX_SPEED + excess)
                } else {
                    Some(CRUISE_MIN_SPEED - excess)
                }
            }
            _ => None,
        };

        if let Some(speed) = target {
            tracing::debug!(flight = %self.flight_number, phase = %self.phase(), speed, "speed pinned out of band");
            self.pin_speed(speed);
        }
    }
}
