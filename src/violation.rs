use crate::aircraft::{Aircraft, ArrivalPhase, DepartureState, FlightNumber, FlightPlan, FlightType};
use crate::airline::AirlineName;
use crate::phase::{self, landing_ceiling};
use crate::time::Tick;
use colored::Colorize;
use std::fmt;
use tabled::Tabled;

pub type AvnId = u32;
/// Whole Pakistani rupees.
pub type Rupees = u64;

pub const COMMERCIAL_FINE: Rupees = 500_000;
pub const CARGO_FINE: Rupees = 700_000;
pub const SERVICE_FEE_PERCENT: Rupees = 15;
pub const PAYMENT_WINDOW_DAYS: u64 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaymentStatus {
    Unpaid,
    Paid,
    Overdue,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "Unpaid",
            PaymentStatus::Paid => "Paid",
            PaymentStatus::Overdue => "Overdue",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PaymentStatus::Unpaid => self.as_str().red(),
            PaymentStatus::Paid => self.as_str().green(),
            PaymentStatus::Overdue => self.as_str().yellow(),
        };
        write!(f, "{}", label)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpeedBand {
    pub min: i32,
    pub max: i32,
}

impl SpeedBand {
    pub const fn new(min: i32, max: i32) -> Self {
        SpeedBand { min, max }
    }
}

impl fmt::Display for SpeedBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{} km/h", self.min, self.max)
    }
}

/// Flat fine by flight type; everything that is not Commercial pays the cargo rate.
pub fn fine_for(flight_type: FlightType) -> Rupees {
    match flight_type {
        FlightType::Commercial => COMMERCIAL_FINE,
        FlightType::Cargo | FlightType::Emergency => CARGO_FINE,
    }
}

pub fn service_fee(fine: Rupees) -> Rupees {
    fine * SERVICE_FEE_PERCENT / 100
}

/// Airspace Violation Notice.
#[derive(Clone, Debug, PartialEq, Tabled)]
pub struct Avn {
    #[tabled(rename = "AVN")]
    pub id: AvnId,
    #[tabled(rename = "Airline")]
    pub airline: AirlineName,
    #[tabled(rename = "Flight")]
    pub flight_number: FlightNumber,
    #[tabled(rename = "Type")]
    pub flight_type: FlightType,
    #[tabled(rename = "Speed")]
    pub recorded_speed: i32,
    #[tabled(rename = "Permitted")]
    pub band: SpeedBand,
    #[tabled(rename = "Issued")]
    pub issued_at: Tick,
    #[tabled(rename = "Due")]
    pub due_at: Tick,
    #[tabled(skip)]
    pub fine: Rupees,
    #[tabled(skip)]
    pub service_fee: Rupees,
    #[tabled(rename = "Total (PKR)")]
    pub total: Rupees,
    #[tabled(rename = "Status")]
    pub status: PaymentStatus,
}

impl Avn {
    pub fn new(
        id: AvnId,
        aircraft: &Aircraft,
        band: SpeedBand,
        issued_at: Tick,
    ) -> Avn {
        let fine = fine_for(aircraft.flight_type);
        let service_fee = service_fee(fine);
        Avn {
            id,
            airline: aircraft.airline.clone(),
            flight_number: aircraft.flight_number.clone(),
            flight_type: aircraft.flight_type,
            recorded_speed: aircraft.speed,
            band,
            issued_at,
            due_at: issued_at + Tick::days(PAYMENT_WINDOW_DAYS),
            fine,
            service_fee,
            total: fine + service_fee,
            status: PaymentStatus::Unpaid,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.status == PaymentStatus::Paid
    }
}

/// Returns the permissible band when `speed` breaches it for the given phase,
/// `None` while the aircraft is within limits.
pub fn assess(plan: FlightPlan, phase_ticks: u32, speed: i32) -> Option<SpeedBand> {
    match plan {
        FlightPlan::Arrival(p) => match p {
            ArrivalPhase::Holding => (speed > phase::HOLDING_MAX_SPEED)
                .then_some(SpeedBand::new(phase::HOLDING_MIN_SPEED, phase::HOLDING_MAX_SPEED)),
            ArrivalPhase::Approach => (speed < phase::APPROACH_MIN_SPEED || speed > phase::APPROACH_MAX_SPEED)
                .then_some(SpeedBand::new(phase::APPROACH_MIN_SPEED, phase::APPROACH_MAX_SPEED)),
            ArrivalPhase::Landing => {
                let ceiling = landing_ceiling(phase_ticks);
                (speed > ceiling).then_some(SpeedBand::new(0, ceiling))
            }
            ArrivalPhase::Taxi => (speed > phase::TAXI_MAX_SPEED)
                .then_some(SpeedBand::new(phase::TAXI_MIN_SPEED, phase::TAXI_MAX_SPEED)),
            ArrivalPhase::AtGate => {
                (speed > phase::GATE_MAX_SPEED).then_some(SpeedBand::new(0, phase::GATE_MAX_SPEED))
            }
        },
        FlightPlan::Departure(s) => match s {
            DepartureState::AtGate => {
                (speed > phase::GATE_MAX_SPEED).then_some(SpeedBand::new(0, phase::GATE_MAX_SPEED))
            }
            DepartureState::Taxi => (speed > phase::TAXI_MAX_SPEED)
                .then_some(SpeedBand::new(phase::TAXI_MIN_SPEED, phase::TAXI_MAX_SPEED)),
            DepartureState::TakeoffRoll => (speed > phase::TAKEOFF_MAX_SPEED)
                .then_some(SpeedBand::new(0, phase::TAKEOFF_MAX_SPEED)),
            DepartureState::Climb => (speed > phase::CLIMB_MAX_SPEED)
                .then_some(SpeedBand::new(phase::CLIMB_MIN_SPEED, phase::CLIMB_MAX_SPEED)),
            DepartureState::Cruise => (speed < phase::CRUISE_MIN_SPEED || speed > phase::CRUISE_MAX_SPEED)
                .then_some(SpeedBand::new(phase::CRUISE_MIN_SPEED, phase::CRUISE_MAX_SPEED)),
        },
    }
}

/// Issues AVNs, at most one per phase per aircraft.
pub struct ViolationDetector {
    next_id: AvnId,
}

impl Default for ViolationDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl ViolationDetector {
    const FIRST_ID: AvnId = 1000;

    pub fn new() -> Self {
        ViolationDetector { next_id: Self::FIRST_ID }
    }

    pub fn inspect(&mut self, aircraft: &mut Aircraft, now: Tick) -> Option<Avn> {
        let phase = aircraft.phase();
        if aircraft.has_been_charged(phase) {
            return None;
        }
        let band = assess(aircraft.plan, aircraft.phase_ticks, aircraft.speed)?;

        let avn = Avn::new(self.next_id, aircraft, band, now);
        self.next_id += 1;
        aircraft.pending_violation = Some(avn.id);
        aircraft.charged_phases.insert(phase);

        tracing::warn!(
            avn = avn.id,
            flight = %aircraft.flight_number,
            airline = %aircraft.airline,
            speed = aircraft.speed,
            phase = %phase,
            band = %band,
            "violation detected"
        );
        Some(avn)
    }
}
