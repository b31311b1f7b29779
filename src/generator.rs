use crate::aircraft::{Aircraft, AircraftId, Direction, FlightType};
use crate::airline::Airline;
use crate::config::StreamConfig;
use crate::phase::entry_speed;
use crate::time::Tick;
use rand::Rng;
use std::sync::Arc;

pub const FIRST_AIRCRAFT_ID: AircraftId = 1000;
const ARRIVAL_NUMBER_BASE: usize = 1000;
const DEPARTURE_NUMBER_BASE: usize = 2000;

struct Stream {
    config: StreamConfig,
    last: Option<Tick>,
}

impl Stream {
    fn is_due(&self, now: Tick) -> bool {
        if now == self.config.first_tick {
            return true;
        }
        match self.last {
            Some(last) => now.since(last) >= self.config.interval,
            None => false,
        }
    }
}

/// Synthesizes aircraft on fixed per-direction intervals.
pub struct FlightGenerator {
    streams: Vec<Stream>,
    next_id: AircraftId,
    generated: usize,
}

impl FlightGenerator {
    pub fn new(streams: &[StreamConfig]) -> FlightGenerator {
        FlightGenerator {
            streams: streams
                .iter()
                .map(|config| Stream {
                    config: config.clone(),
                    last: None,
                })
                .collect(),
            next_id: FIRST_AIRCRAFT_ID,
            generated: 0,
        }
    }

    pub fn generated(&self) -> usize {
        self.generated
    }

    /// Runs every stream that is due at `now`. A due stream with no eligible
    /// airline is skipped but still restarts its interval.
    pub fn generate<'a, R: Rng + ?Sized>(
        &mut self,
        now: Tick,
        airlines: impl Iterator<Item = &'a Airline> + Clone,
        rng: &mut R,
    ) -> Vec<Aircraft> {
        let mut created = Vec::new();
        for idx in 0..self.streams.len() {
            if !self.streams[idx].is_due(now) {
                continue;
            }
            self.streams[idx].last = Some(now);

            let config = self.streams[idx].config.clone();
            let eligible: Vec<&Airline> = airlines.clone().filter(|a| a.can_fly()).collect();
            if eligible.is_empty() {
                tracing::warn!(direction = %config.direction, "no airline with free capacity, skipping flight");
                continue;
            }

            let emergency_roll = rng.gen_range(1..=100) <= config.emergency_percent;
            let airline = eligible[rng.gen_range(0..eligible.len())];
            let aircraft = self.build(now, airline, config.direction, emergency_roll, rng);
            tracing::info!(
                flight = %aircraft.flight_number,
                airline = %aircraft.airline,
                kind = %aircraft.flight_type,
                direction = %aircraft.direction,
                "flight generated"
            );
            created.push(aircraft);
        }
        created
    }

    fn build<R: Rng + ?Sized>(
        &mut self,
        now: Tick,
        airline: &Airline,
        direction: Direction,
        emergency_roll: bool,
        rng: &mut R,
    ) -> Aircraft {
        let flight_type = if airline.cargo_only {
            FlightType::Cargo
        } else if emergency_roll || airline.forces_emergency_on(direction) {
            FlightType::Emergency
        } else {
            FlightType::Commercial
        };

        let base = if direction.is_arrival() {
            ARRIVAL_NUMBER_BASE
        } else {
            DEPARTURE_NUMBER_BASE
        };
        let number = format!("{}-{}", airline.code(), base + self.generated);

        let mut aircraft = Aircraft::new(
            self.next_id,
            Arc::from(number),
            airline.name.clone(),
            flight_type,
            direction,
            now,
        );
        aircraft.speed = entry_speed(direction, rng);

        self.next_id += 1;
        self.generated += 1;
        aircraft
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::airline::default_roster;
    use crate::phase::{HOLDING_MAX_SPEED, HOLDING_MIN_SPEED};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn stream(direction: Direction, interval: u64, emergency_percent: u32, first_tick: u64) -> StreamConfig {
        StreamConfig::new(direction, interval, emergency_percent, first_tick)
    }

    fn run(generator: &mut FlightGenerator, airlines: &[Airline], ticks: u64) -> Vec<Aircraft> {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        (1..=ticks)
            .flat_map(|t| generator.generate(Tick(t), airlines.iter(), &mut rng))
            .collect()
    }

    #[test]
    fn test_bootstrap_then_interval() {
        let mut generator = FlightGenerator::new(&[stream(Direction::North, 10, 0, 1)]);
        let created = run(&mut generator, &[Airline::new("PIA", 4, 4)], 25);
        let ticks: Vec<u64> = created.iter().map(|a| a.scheduled_at.0).collect();
        assert_eq!(vec![1, 11, 21], ticks);
    }

    #[test]
    fn test_flight_numbers_and_ids() {
        let mut generator = FlightGenerator::new(&[
            stream(Direction::South, 100, 0, 1),
            stream(Direction::West, 100, 0, 2),
        ]);
        let created = run(&mut generator, &[Airline::new("AirBlue", 4, 4)], 2);
        assert_eq!("Ai-1000", created[0].flight_number.as_ref());
        assert_eq!("Ai-2001", created[1].flight_number.as_ref());
        assert_eq!(vec![1000, 1001], created.iter().map(|a| a.id).collect::<Vec<_>>());
        assert_eq!(2, generator.generated());
    }

    #[test]
    fn test_entry_speeds() {
        let mut generator = FlightGenerator::new(&[
            stream(Direction::North, 100, 0, 1),
            stream(Direction::East, 100, 0, 1),
        ]);
        let created = run(&mut generator, &[Airline::new("PIA", 4, 4)], 1);
        assert!((HOLDING_MIN_SPEED..=HOLDING_MAX_SPEED).contains(&created[0].speed));
        assert_eq!(0, created[1].speed);
    }

    #[test]
    fn test_type_derivation() {
        let cargo = [Airline::new("FedEx", 3, 2).cargo()];
        let mut generator = FlightGenerator::new(&[stream(Direction::North, 1, 100, 1)]);
        assert!(run(&mut generator, &cargo, 5).iter().all(|a| a.flight_type == FlightType::Cargo));

        let forced = [Airline::new("Pakistan Airforce", 2, 1).emergency_on(&[Direction::East])];
        let mut generator = FlightGenerator::new(&[
            stream(Direction::East, 1, 0, 1),
            stream(Direction::West, 1, 0, 1),
        ]);
        let created = run(&mut generator, &forced, 3);
        assert!(created.iter().filter(|a| a.direction == Direction::East).all(|a| a.flight_type == FlightType::Emergency));
        assert!(created.iter().filter(|a| a.direction == Direction::West).all(|a| a.flight_type == FlightType::Commercial));

        let mut generator = FlightGenerator::new(&[stream(Direction::South, 1, 100, 1)]);
        let created = run(&mut generator, &[Airline::new("PIA", 4, 4)], 3);
        assert!(created.iter().all(|a| a.flight_type == FlightType::Emergency));
    }

    #[test]
    fn test_skips_airlines_without_capacity() {
        let airlines = [Airline::new("Grounded", 2, 0), Airline::new("PIA", 4, 4)];
        let mut generator = FlightGenerator::new(&[stream(Direction::North, 1, 0, 1)]);
        assert!(run(&mut generator, &airlines, 10).iter().all(|a| a.airline.as_ref() == "PIA"));

        let mut generator = FlightGenerator::new(&[stream(Direction::North, 1, 0, 1)]);
        assert!(run(&mut generator, &airlines[..1], 10).is_empty());
    }

    #[test]
    fn test_default_roster_is_all_eligible() {
        let mut generator = FlightGenerator::new(&crate::config::default_streams());
        let created = run(&mut generator, &default_roster(), 4);
        let directions: Vec<Direction> = created.iter().map(|a| a.direction).collect();
        assert_eq!(vec![Direction::North, Direction::South, Direction::East, Direction::West], directions);
    }
}
