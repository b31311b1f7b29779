//! Runway allocation. Assignment runs before release within a tick.

use crate::aircraft::{Aircraft, AircraftId, Direction, FlightType};
use crate::time::Tick;
use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BinaryHeap};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RunwayId {
    A,
    B,
    C,
}

impl RunwayId {
    pub const ALL: [RunwayId; 3] = [RunwayId::A, RunwayId::B, RunwayId::C];

    fn index(self) -> usize {
        match self {
            RunwayId::A => 0,
            RunwayId::B => 1,
            RunwayId::C => 2,
        }
    }

    /// The runway a direction uses when nothing overrides it.
    pub fn natural_for(direction: Direction) -> RunwayId {
        if direction.is_arrival() { RunwayId::A } else { RunwayId::B }
    }
}

impl fmt::Display for RunwayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunwayId::A => "RWY-A",
            RunwayId::B => "RWY-B",
            RunwayId::C => "RWY-C",
        };
        f.write_str(name)
    }
}

/// Waiting queue identifiers; each queue is named after the runway it feeds.
pub type QueueId = RunwayId;

pub fn queue_for(direction: Direction) -> QueueId {
    RunwayId::natural_for(direction)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Runway {
    pub id: RunwayId,
    pub available: bool,
    pub occupant: Option<AircraftId>,
    /// Earliest tick at which the runway may be assigned again.
    pub free_at: Tick,
}

impl Runway {
    fn new(id: RunwayId) -> Runway {
        Runway {
            id,
            available: true,
            occupant: None,
            free_at: Tick(0),
        }
    }

    pub fn is_assignable(&self, now: Tick) -> bool {
        self.available && now >= self.free_at
    }

    fn occupy(&mut self, aircraft: AircraftId) {
        self.available = false;
        self.occupant = Some(aircraft);
    }

    fn vacate(&mut self, now: Tick) {
        self.available = true;
        self.occupant = None;
        self.free_at = now;
    }
}

/// A waiting aircraft. Highest priority pops first, then the earliest
/// scheduled, then the lowest id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub aircraft: AircraftId,
    pub priority: u8,
    pub scheduled_at: Tick,
}

impl Candidate {
    pub fn of(aircraft: &Aircraft) -> Candidate {
        Candidate {
            aircraft: aircraft.id,
            priority: aircraft.priority(),
            scheduled_at: aircraft.scheduled_at,
        }
    }

    fn key(&self) -> (u8, Reverse<Tick>, Reverse<AircraftId>) {
        (self.priority, Reverse(self.scheduled_at), Reverse(self.aircraft))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AllocationReport {
    pub assigned: Vec<(AircraftId, RunwayId)>,
    pub released: Vec<(AircraftId, RunwayId)>,
}

pub struct RunwayAllocator {
    runways: [Runway; 3],
    queues: [BinaryHeap<Candidate>; 3],
}

impl Default for RunwayAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl RunwayAllocator {
    pub fn new() -> RunwayAllocator {
        RunwayAllocator {
            runways: RunwayId::ALL.map(Runway::new),
            queues: [BinaryHeap::new(), BinaryHeap::new(), BinaryHeap::new()],
        }
    }

    pub fn runway(&self, id: RunwayId) -> &Runway {
        &self.runways[id.index()]
    }

    pub fn runways(&self) -> &[Runway; 3] {
        &self.runways
    }

    pub fn queue_len(&self, queue: QueueId) -> usize {
        self.queues[queue.index()].len()
    }

    /// Queues the aircraft on its directional queue.
    #[cfg(test)]
    pub fn enqueue(&mut self, aircraft: &Aircraft) {
        self.enqueue_to(queue_for(aircraft.direction), Candidate::of(aircraft));
    }

    pub fn enqueue_to(&mut self, queue: QueueId, candidate: Candidate) {
        self.queues[queue.index()].push(candidate);
    }

    /// One allocator pass: assignment over every queue, then release.
    pub fn tick(&mut self, now: Tick, fleet: &mut BTreeMap<AircraftId, Aircraft>) -> AllocationReport {
        let mut report = AllocationReport::default();
        for queue in RunwayId::ALL {
            self.assign_queue(queue, now, fleet, &mut report);
        }
        self.release(now, fleet.values_mut(), &mut report);
        report
    }

    fn assign_queue(
        &mut self,
        queue: QueueId,
        now: Tick,
        fleet: &mut BTreeMap<AircraftId, Aircraft>,
        report: &mut AllocationReport,
    ) {
        let mut deferred = Vec::new();
        while let Some(candidate) = self.queues[queue.index()].pop() {
            let Some(aircraft) = fleet.get_mut(&candidate.aircraft) else {
                tracing::warn!(aircraft = candidate.aircraft, "dropping queued aircraft that is no longer active");
                continue;
            };
            if aircraft.runway.is_some() {
                deferred.push(candidate);
                continue;
            }

            match self.choose(queue, aircraft, now) {
                Some(runway) => {
                    self.runways[runway.index()].occupy(aircraft.id);
                    aircraft.runway = Some(runway);
                    report.assigned.push((aircraft.id, runway));
                    tracing::info!(
                        flight = %aircraft.flight_number,
                        airline = %aircraft.airline,
                        runway = %runway,
                        fallback = runway == RunwayId::C && !matches!(aircraft.flight_type, FlightType::Emergency | FlightType::Cargo),
                        "runway assigned"
                    );
                }
                None => deferred.push(candidate),
            }
        }
        self.queues[queue.index()].extend(deferred);
    }

    fn choose(&self, queue: QueueId, aircraft: &Aircraft, now: Tick) -> Option<RunwayId> {
        let free = |id: RunwayId| self.runways[id.index()].is_assignable(now).then_some(id);

        if queue == RunwayId::C {
            return free(RunwayId::C);
        }

        let mut choice = None;
        if matches!(aircraft.flight_type, FlightType::Emergency | FlightType::Cargo) {
            choice = free(RunwayId::C);
        }
        if choice.is_none() && RunwayId::natural_for(aircraft.direction) == queue {
            choice = free(queue);
        }
        if choice.is_none() && aircraft.flight_type != FlightType::Cargo {
            choice = free(RunwayId::C);
        }
        choice
    }

    fn release<'a>(
        &mut self,
        now: Tick,
        fleet: impl Iterator<Item = &'a mut Aircraft>,
        report: &mut AllocationReport,
    ) {
        for aircraft in fleet.filter(|a| a.plan.releases_runway()) {
            self.vacate(aircraft, now, report);
        }
    }

    /// Frees whatever runway `aircraft` holds.
    pub fn vacate(&mut self, aircraft: &mut Aircraft, now: Tick, report: &mut AllocationReport) {
        if let Some(runway) = aircraft.runway.take() {
            self.runways[runway.index()].vacate(now);
            report.released.push((aircraft.id, runway));
            tracing::info!(
                flight = %aircraft.flight_number,
                airline = %aircraft.airline,
                runway = %runway,
                "runway released"
            );
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.runways.iter().all(|r| r.available == r.occupant.is_none())
    }
}
