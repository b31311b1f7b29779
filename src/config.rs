use crate::aircraft::Direction;
use crate::airline::{Airline, default_roster};
use crate::error::ConfigError;
use crate::phase::ViolationOdds;
use crate::time::Tick;
use serde::Deserialize;
use std::path::Path;

/// One per-direction generator stream.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct StreamConfig {
    pub direction: Direction,
    /// Ticks between two generated flights.
    pub interval: u64,
    pub emergency_percent: u32,
    /// The stream fires unconditionally on this tick.
    pub first_tick: Tick,
}

impl StreamConfig {
    pub fn new(direction: Direction, interval: u64, emergency_percent: u32, first_tick: u64) -> Self {
        StreamConfig {
            direction,
            interval,
            emergency_percent,
            first_tick: Tick(first_tick),
        }
    }
}

pub fn default_streams() -> Vec<StreamConfig> {
    vec![
        StreamConfig::new(Direction::North, 180, 10, 1),
        StreamConfig::new(Direction::South, 120, 5, 2),
        StreamConfig::new(Direction::East, 150, 15, 3),
        StreamConfig::new(Direction::West, 240, 20, 4),
    ]
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct IpcConfig {
    pub channel_capacity: usize,
    pub reply_timeout_millis: u64,
    pub payment_delay_millis: u64,
}

impl Default for IpcConfig {
    fn default() -> Self {
        IpcConfig {
            channel_capacity: 64,
            reply_timeout_millis: 1000,
            payment_delay_millis: 2000,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Simulated ticks per run.
    pub duration: u64,
    /// Wall-clock pacing of one tick in the interactive run.
    pub tick_millis: u64,
    pub seed: Option<u64>,
    pub streams: Vec<StreamConfig>,
    pub violations: ViolationOdds,
    pub airlines: Vec<Airline>,
    pub ipc: IpcConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            duration: 300,
            tick_millis: 1000,
            seed: None,
            streams: default_streams(),
            violations: ViolationOdds::default(),
            airlines: default_roster(),
            ipc: IpcConfig::default(),
        }
    }
}

impl SimConfig {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        let config: SimConfig = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(stream) = self.streams.iter().find(|s| s.interval == 0) {
            return Err(ConfigError::Invalid(format!(
                "{} stream has a zero interval",
                stream.direction
            )));
        }
        if let Some(stream) = self.streams.iter().find(|s| s.emergency_percent > 100) {
            return Err(ConfigError::Invalid(format!(
                "{} stream emergency percent {} exceeds 100",
                stream.direction, stream.emergency_percent
            )));
        }
        let odds = &self.violations;
        if odds.coarse_percent > 100 || odds.fine_percent > 100 {
            return Err(ConfigError::Invalid("violation percentages must not exceed 100".to_string()));
        }
        if odds.min_excess > odds.max_excess || odds.min_excess < 0 {
            return Err(ConfigError::Invalid(format!(
                "violation excess range {}..={} is empty",
                odds.min_excess, odds.max_excess
            )));
        }
        if self.airlines.is_empty() {
            return Err(ConfigError::Invalid("no airlines configured".to_string()));
        }
        if self.ipc.channel_capacity == 0 {
            return Err(ConfigError::Invalid("channel capacity must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SimConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(4, config.streams.len());
        assert_eq!(6, config.airlines.len());
    }

    #[test]
    fn test_shipped_scenario_matches_defaults() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/data/default.json");
        assert_eq!(SimConfig::default(), SimConfig::load_from_file(path).unwrap());
    }

    #[test]
    fn test_missing_scenario_file() {
        assert!(matches!(
            SimConfig::load_from_file("data/does-not-exist.json"),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn test_partial_scenario_falls_back_to_defaults() {
        let config: SimConfig = serde_json::from_str(r#"{"duration": 60, "seed": 42}"#).unwrap();
        assert_eq!(60, config.duration);
        assert_eq!(Some(42), config.seed);
        assert_eq!(default_streams(), config.streams);
        assert_eq!(64, config.ipc.channel_capacity);
    }

    #[test]
    fn test_scenario_airlines() {
        let config: SimConfig = serde_json::from_str(
            r#"{"airlines": [
                {"name": "FedEx", "fleet_size": 3, "active_flights": 2, "cargo_only": true},
                {"name": "Pakistan Airforce", "fleet_size": 2, "active_flights": 1, "forces_emergency": ["North"]}
            ]}"#,
        )
        .unwrap();
        assert!(config.airlines[0].cargo_only);
        assert!(config.airlines[1].forces_emergency_on(Direction::North));
        assert!(config.airlines[1].violations.is_empty());
    }

    #[test]
    fn test_rejects_zero_interval() {
        let mut config = SimConfig::default();
        config.streams[2].interval = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(msg)) if msg.contains("East")));
    }

    #[test]
    fn test_rejects_empty_roster_and_excess_range() {
        let mut config = SimConfig::default();
        config.airlines.clear();
        assert!(config.validate().is_err());

        let mut config = SimConfig::default();
        config.violations.min_excess = 50;
        assert!(config.validate().is_err());
    }
}
