use crate::aircraft::Direction;
use crate::violation::AvnId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tabled::Tabled;

pub type AirlineName = Arc<str>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Tabled)]
pub struct Airline {
    #[tabled(rename = "Airline")]
    pub name: AirlineName,
    #[tabled(rename = "Fleet")]
    pub fleet_size: u32,
    #[tabled(rename = "Active")]
    pub active_flights: u32,
    /// Every flight of a cargo-only carrier is Cargo.
    #[serde(default)]
    #[tabled(rename = "Cargo only")]
    pub cargo_only: bool,
    /// Streams on which this carrier always flies Emergency.
    #[serde(default)]
    #[tabled(skip)]
    pub forces_emergency: Vec<Direction>,
    /// Back-references into the AVN registry.
    #[serde(skip)]
    #[tabled(skip)]
    pub violations: Vec<AvnId>,
}

impl Airline {
    pub fn new(name: &str, fleet_size: u32, active_flights: u32) -> Airline {
        Airline {
            name: Arc::from(name),
            fleet_size,
            active_flights,
            cargo_only: false,
            forces_emergency: vec![],
            violations: vec![],
        }
    }

    pub fn cargo(mut self) -> Self {
        self.cargo_only = true;
        self
    }

    pub fn emergency_on(mut self, directions: &[Direction]) -> Self {
        self.forces_emergency = directions.to_vec();
        self
    }

    pub fn can_fly(&self) -> bool {
        self.active_flights > 0
    }

    pub fn forces_emergency_on(&self, direction: Direction) -> bool {
        self.forces_emergency.contains(&direction)
    }

    /// Two-letter prefix used in flight numbers.
    pub fn code(&self) -> String {
        self.name.chars().take(2).collect()
    }
}

pub fn default_roster() -> Vec<Airline> {
    vec![
        Airline::new("PIA", 6, 4),
        Airline::new("AirBlue", 4, 4),
        Airline::new("FedEx", 3, 2).cargo(),
        Airline::new("Pakistan Airforce", 2, 1).emergency_on(&[Direction::North, Direction::East]),
        Airline::new("Blue Dart", 2, 2).cargo(),
        Airline::new("AghaKhan Air Ambulance", 2, 1).emergency_on(&[Direction::South]),
    ]
}
