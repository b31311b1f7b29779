use crate::airline::AirlineName;
use crate::runway::RunwayId;
use crate::time::Tick;
use crate::violation::AvnId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

pub type AircraftId = u32;
pub type FlightNumber = Arc<str>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlightType {
    Commercial,
    Cargo,
    Emergency,
}

impl FlightType {
    /// Higher wins on the runway queues.
    pub fn priority(self) -> u8 {
        match self {
            FlightType::Emergency => 3,
            FlightType::Cargo => 2,
            FlightType::Commercial => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FlightType::Commercial => "Commercial",
            FlightType::Cargo => "Cargo",
            FlightType::Emergency => "Emergency",
        }
    }
}

impl fmt::Display for FlightType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    /// North and South traffic lands here, East and West traffic departs.
    pub fn is_arrival(self) -> bool {
        matches!(self, Direction::North | Direction::South)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::North => "North",
            Direction::South => "South",
            Direction::East => "East",
            Direction::West => "West",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArrivalPhase {
    Holding,
    Approach,
    Landing,
    Taxi,
    AtGate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DepartureState {
    AtGate,
    Taxi,
    TakeoffRoll,
    Climb,
    Cruise,
}

/// Phase names, shared between arrivals and departures. Used to key the
/// set of phases that already produced a violation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    Holding,
    Approach,
    Landing,
    Taxi,
    AtGate,
    TakeoffRoll,
    Climb,
    Cruise,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Holding => "Holding",
            Phase::Approach => "Approach",
            Phase::Landing => "Landing",
            Phase::Taxi => "Taxi",
            Phase::AtGate => "At Gate",
            Phase::TakeoffRoll => "Takeoff Roll",
            Phase::Climb => "Climb",
            Phase::Cruise => "Cruise",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlightPlan {
    Arrival(ArrivalPhase),
    Departure(DepartureState),
}

impl FlightPlan {
    pub fn phase(self) -> Phase {
        match self {
            FlightPlan::Arrival(p) => match p {
                ArrivalPhase::Holding => Phase::Holding,
                ArrivalPhase::Approach => Phase::Approach,
                ArrivalPhase::Landing => Phase::Landing,
                ArrivalPhase::Taxi => Phase::Taxi,
                ArrivalPhase::AtGate => Phase::AtGate,
            },
            FlightPlan::Departure(s) => match s {
                DepartureState::AtGate => Phase::AtGate,
                DepartureState::Taxi => Phase::Taxi,
                DepartureState::TakeoffRoll => Phase::TakeoffRoll,
                DepartureState::Climb => Phase::Climb,
                DepartureState::Cruise => Phase::Cruise,
            },
        }
    }

    pub fn is_completed(self) -> bool {
        matches!(
            self,
            FlightPlan::Arrival(ArrivalPhase::AtGate) | FlightPlan::Departure(DepartureState::Cruise)
        )
    }

    /// True once the aircraft has left the runway-occupying part of its plan.
    pub fn releases_runway(self) -> bool {
        matches!(
            self,
            FlightPlan::Arrival(ArrivalPhase::Taxi | ArrivalPhase::AtGate)
                | FlightPlan::Departure(DepartureState::Climb | DepartureState::Cruise)
        )
    }
}

pub struct Aircraft {
    pub id: AircraftId,
    pub flight_number: FlightNumber,
    pub airline: AirlineName,
    pub flight_type: FlightType,
    pub direction: Direction,
    pub plan: FlightPlan,
    pub speed: i32,
    /// Written by the runway allocator only.
    pub runway: Option<RunwayId>,
    pub scheduled_at: Tick,
    pub pending_violation: Option<AvnId>,
    pub(crate) phase_ticks: u32,
    pub(crate) pinned_speed: Option<i32>,
    pub(crate) charged_phases: HashSet<Phase>,
}

impl Aircraft {
    pub fn new(
        id: AircraftId,
        flight_number: FlightNumber,
        airline: AirlineName,
        flight_type: FlightType,
        direction: Direction,
        scheduled_at: Tick,
    ) -> Aircraft {
        let plan = if direction.is_arrival() {
            FlightPlan::Arrival(ArrivalPhase::Holding)
        } else {
            FlightPlan::Departure(DepartureState::AtGate)
        };
        Aircraft {
            id,
            flight_number,
            airline,
            flight_type,
            direction,
            plan,
            speed: 0,
            runway: None,
            scheduled_at,
            pending_violation: None,
            phase_ticks: 0,
            pinned_speed: None,
            charged_phases: HashSet::new(),
        }
    }

    pub fn priority(&self) -> u8 {
        self.flight_type.priority()
    }

    pub fn phase(&self) -> Phase {
        self.plan.phase()
    }

    pub fn is_completed(&self) -> bool {
        self.plan.is_completed()
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned_speed.is_some()
    }

    pub fn has_been_charged(&self, phase: Phase) -> bool {
        self.charged_phases.contains(&phase)
    }

    /// Holds `speed` until the next phase change.
    pub fn pin_speed(&mut self, speed: i32) {
        self.speed = speed;
        self.pinned_speed = Some(speed);
    }

    /// One-line status used by the `flights` listing.
    pub fn describe(&self) -> String {
        let runway = self
            .runway
            .map(|r| r.to_string())
            .unwrap_or_else(|| "None".to_string());
        let mut summary = format!(
            "{} | {} | {} | {} | {} | Speed: {} km/h | Runway: {}",
            self.flight_number,
            self.airline,
            self.flight_type,
            self.direction,
            self.phase(),
            self.speed,
            runway
        );
        if self.flight_type == FlightType::Emergency {
            summary.push_str(" | EMERGENCY");
        }
        if self.pending_violation.is_some() {
            summary.push_str(" | VIOLATION");
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aircraft(direction: Direction) -> Aircraft {
        Aircraft::new(1000, Arc::from("PI-1000"), Arc::from("PIA"), FlightType::Commercial, direction, Tick(1))
    }

    #[test]
    fn test_direction_selects_plan() {
        assert_eq!(FlightPlan::Arrival(ArrivalPhase::Holding), aircraft(Direction::South).plan);
        assert_eq!(FlightPlan::Departure(DepartureState::AtGate), aircraft(Direction::West).plan);
    }

    #[test]
    fn test_priority_by_type() {
        assert!(FlightType::Emergency.priority() > FlightType::Cargo.priority());
        assert!(FlightType::Cargo.priority() > FlightType::Commercial.priority());
    }

    #[test]
    fn test_describe() {
        let mut ac = aircraft(Direction::North);
        ac.flight_type = FlightType::Emergency;
        ac.speed = 450;
        ac.runway = Some(RunwayId::C);
        assert_eq!(
            "PI-1000 | PIA | Emergency | North | Holding | Speed: 450 km/h | Runway: RWY-C | EMERGENCY",
            ac.describe()
        );
    }

    #[test]
    fn test_runway_release_phases() {
        assert!(!FlightPlan::Arrival(ArrivalPhase::Landing).releases_runway());
        assert!(FlightPlan::Arrival(ArrivalPhase::Taxi).releases_runway());
        assert!(!FlightPlan::Departure(DepartureState::TakeoffRoll).releases_runway());
        assert!(FlightPlan::Departure(DepartureState::Climb).releases_runway());
    }
}
