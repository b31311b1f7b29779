use crate::aircraft::{Aircraft, AircraftId};
use crate::config::SimConfig;
use crate::generator::FlightGenerator;
use crate::ipc::ViolationSink;
use crate::phase::ViolationOdds;
use crate::registry::Registry;
use crate::runway::{AllocationReport, Candidate, QueueId, RunwayAllocator, queue_for};
use crate::time::Tick;
use crate::violation::{AvnId, ViolationDetector};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default)]
pub struct TickReport {
    pub now: Tick,
    pub generated: Vec<AircraftId>,
    pub allocation: AllocationReport,
    pub violations: Vec<AvnId>,
    pub retired: Vec<AircraftId>,
    pub overdue: usize,
}

/// The whole simulation state. One call to [`Scheduler::tick`] runs
/// generation, runway allocation, phase advancement with violation checks,
/// and retirement, in that order and without interruption.
pub struct Scheduler {
    now: Tick,
    seed: u64,
    odds: ViolationOdds,
    rng: ChaCha8Rng,
    generator: FlightGenerator,
    allocator: RunwayAllocator,
    detector: ViolationDetector,
    pub active: BTreeMap<AircraftId, Aircraft>,
    pub completed: Vec<Aircraft>,
    pub registry: Registry,
}

impl Scheduler {
    pub fn new(config: &SimConfig) -> Scheduler {
        let seed = config.seed.unwrap_or_else(rand::random::<u64>);
        Scheduler {
            now: Tick(0),
            seed,
            odds: config.violations.clone(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            generator: FlightGenerator::new(&config.streams),
            allocator: RunwayAllocator::new(),
            detector: ViolationDetector::new(),
            active: BTreeMap::new(),
            completed: Vec::new(),
            registry: Registry::new(config.airlines.clone()),
        }
    }

    pub fn now(&self) -> Tick {
        self.now
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn allocator(&self) -> &RunwayAllocator {
        &self.allocator
    }

    pub fn generated(&self) -> usize {
        self.generator.generated()
    }

    /// Adds an aircraft and queues it on its directional queue.
    pub fn admit(&mut self, aircraft: Aircraft) {
        self.admit_to(queue_for(aircraft.direction), aircraft);
    }

    /// Adds an aircraft to the overflow queue, which is only ever served by
    /// runway C. Generated traffic never lands here.
    #[cfg(test)]
    pub fn admit_overflow(&mut self, aircraft: Aircraft) {
        self.admit_to(crate::runway::RunwayId::C, aircraft);
    }

    fn admit_to(&mut self, queue: QueueId, aircraft: Aircraft) {
        if self.active.contains_key(&aircraft.id) {
            tracing::warn!(aircraft = aircraft.id, flight = %aircraft.flight_number, "duplicate aircraft id, not admitted");
            return;
        }
        self.allocator.enqueue_to(queue, Candidate::of(&aircraft));
        self.active.insert(aircraft.id, aircraft);
    }

    pub fn tick(&mut self, sink: &mut impl ViolationSink) -> TickReport {
        self.now += 1;
        let now = self.now;
        let mut report = TickReport {
            now,
            ..TickReport::default()
        };

        let created = self
            .generator
            .generate(now, self.registry.airlines(), &mut self.rng);
        for aircraft in created {
            report.generated.push(aircraft.id);
            self.admit(aircraft);
        }

        report.allocation = self.allocator.tick(now, &mut self.active);

        for aircraft in self.active.values_mut() {
            let Some(avn) = aircraft.advance(now, &mut self.rng, &self.odds, &mut self.detector) else {
                continue;
            };
            if let Err(err) = sink.route(&avn) {
                tracing::warn!(%err, avn = avn.id, "AVN not routed to billing");
            }
            report.violations.push(self.registry.record(avn));
            aircraft.pending_violation = None;
        }

        let finished: Vec<AircraftId> = self
            .active
            .values()
            .filter(|a| a.is_completed())
            .map(|a| a.id)
            .collect();
        for id in finished {
            if let Some(mut aircraft) = self.active.remove(&id) {
                self.allocator.vacate(&mut aircraft, now, &mut report.allocation);
                tracing::info!(flight = %aircraft.flight_number, phase = %aircraft.phase(), "flight completed");
                report.retired.push(id);
                self.completed.push(aircraft);
            }
        }

        report.overdue = self.registry.mark_overdue(now);

        #[cfg(debug_assertions)]
        self.assert_invariants();

        report
    }

    #[cfg(debug_assertions)]
    fn assert_invariants(&self) {
        debug_assert!(
            self.allocator.is_consistent(),
            "Runway availability <-> occupant invariant violated"
        );

        debug_assert!(
            self.allocator.runways().iter().all(|r| match r.occupant {
                Some(id) => self.active.get(&id).and_then(|a| a.runway) == Some(r.id),
                None => true,
            }),
            "Runway occupant <-> aircraft runway invariant violated"
        );

        debug_assert!(
            self.active.values().all(|a| match a.runway {
                Some(id) => self.allocator.runway(id).occupant == Some(a.id),
                None => true,
            }),
            "Aircraft runway <-> runway occupant invariant violated"
        );

        debug_assert!(
            self.active.values().all(|a| a.pending_violation.is_none()),
            "Violation left unrouted after tick"
        );

        debug_assert!(
            self.completed.iter().all(|a| a.is_completed() && a.runway.is_none()),
            "Retired aircraft still flying or holding a runway"
        );
    }
}
