use crate::aircraft::ArrivalPhase::Taxi;
use crate::aircraft::Direction::{East, North, South, West};
use crate::aircraft::FlightPlan;
use crate::aircraft::FlightType::{Cargo, Commercial, Emergency};
use crate::runway::{RunwayId, queue_for};
use crate::schedule::scheduler::Scheduler;
use crate::schedule::tests::utils::{Recorder, add_aircraft, aircraft, quiet_config, run};

#[test]
fn test_emergency_takes_overflow_when_natural_is_busy() {
    let mut scheduler = Scheduler::new(&quiet_config());
    let mut sink = Recorder::default();

    add_aircraft(&mut scheduler, 1, Commercial, North);
    scheduler.tick(&mut sink);
    assert_eq!(Some(RunwayId::A), scheduler.active[&1].runway);

    add_aircraft(&mut scheduler, 2, Emergency, South);
    let report = scheduler.tick(&mut sink);
    assert_eq!(vec![(2, RunwayId::C)], report.allocation.assigned);
    assert_eq!(0, scheduler.allocator().queue_len(RunwayId::A));
}

#[test]
fn test_same_priority_earlier_schedule_wins() {
    let mut scheduler = Scheduler::new(&quiet_config());
    let mut sink = Recorder::default();

    add_aircraft(&mut scheduler, 1, Cargo, South);
    scheduler.tick(&mut sink);
    assert_eq!(Some(RunwayId::C), scheduler.active[&1].runway);

    scheduler.admit(aircraft(20, Commercial, South, 2));
    scheduler.admit(aircraft(30, Commercial, North, 1));
    let report = scheduler.tick(&mut sink);

    assert_eq!(vec![(30, RunwayId::A)], report.allocation.assigned);
    assert_eq!(None, scheduler.active[&20].runway);
    assert_eq!(1, scheduler.allocator().queue_len(RunwayId::A));
}

#[test]
fn test_priority_beats_schedule() {
    let mut scheduler = Scheduler::new(&quiet_config());
    let mut sink = Recorder::default();

    scheduler.admit(aircraft(1, Commercial, East, 0));
    scheduler.admit(aircraft(2, Commercial, West, 0));
    scheduler.admit(aircraft(3, Cargo, East, 0));
    scheduler.admit(aircraft(4, Cargo, West, 0));
    let report = scheduler.tick(&mut sink);

    // Cargo 3 takes C, cargo 4 then takes B; both commercials wait.
    assert_eq!(vec![(3, RunwayId::C), (4, RunwayId::B)], report.allocation.assigned);
    assert_eq!(2, scheduler.allocator().queue_len(RunwayId::B));
}

#[test]
fn test_released_runway_is_reused_next_tick() {
    let mut scheduler = Scheduler::new(&quiet_config());
    let mut sink = Recorder::default();

    add_aircraft(&mut scheduler, 1, Commercial, North);
    add_aircraft(&mut scheduler, 2, Cargo, South);
    let report = scheduler.tick(&mut sink);
    assert_eq!(vec![(2, RunwayId::C), (1, RunwayId::A)], report.allocation.assigned);

    add_aircraft(&mut scheduler, 3, Commercial, North);
    {
        let landed = scheduler.active.get_mut(&1).unwrap();
        landed.plan = FlightPlan::Arrival(Taxi);
        landed.phase_ticks = 0;
        landed.speed = 20;
    }

    let report = scheduler.tick(&mut sink);
    assert_eq!(vec![(1, RunwayId::A)], report.allocation.released);
    assert!(report.allocation.assigned.is_empty());
    assert_eq!(None, scheduler.active[&3].runway);

    let report = scheduler.tick(&mut sink);
    assert_eq!(vec![(3, RunwayId::A)], report.allocation.assigned);
}

#[test]
fn test_admit_uses_directional_queue() {
    let mut scheduler = Scheduler::new(&quiet_config());

    for (id, direction) in [(1, North), (2, South), (3, East), (4, West)] {
        add_aircraft(&mut scheduler, id, Commercial, direction);
    }

    assert_eq!(RunwayId::A, queue_for(South));
    assert_eq!(RunwayId::B, queue_for(West));
    assert_eq!(2, scheduler.allocator().queue_len(RunwayId::A));
    assert_eq!(2, scheduler.allocator().queue_len(RunwayId::B));
    assert_eq!(0, scheduler.allocator().queue_len(RunwayId::C));
}

#[test]
fn test_overflow_queue_only_uses_runway_c() {
    let mut scheduler = Scheduler::new(&quiet_config());
    let mut sink = Recorder::default();

    scheduler.admit_overflow(aircraft(1, Commercial, North, 0));
    scheduler.admit_overflow(aircraft(2, Commercial, East, 0));
    let report = scheduler.tick(&mut sink);

    assert_eq!(vec![(1, RunwayId::C)], report.allocation.assigned);
    assert_eq!(1, scheduler.allocator().queue_len(RunwayId::C));
    assert!(scheduler.allocator().runway(RunwayId::A).available);
    assert!(scheduler.allocator().runway(RunwayId::B).available);
}

#[test]
fn test_no_candidate_is_dropped() {
    let mut scheduler = Scheduler::new(&quiet_config());
    let mut sink = Recorder::default();

    for id in 1..=6 {
        add_aircraft(&mut scheduler, id, Commercial, if id % 2 == 0 { North } else { South });
    }
    for id in 7..=10 {
        add_aircraft(&mut scheduler, id, Commercial, if id % 2 == 0 { East } else { West });
    }
    run(&mut scheduler, &mut sink, 400);

    assert!(scheduler.active.is_empty());
    assert_eq!(10, scheduler.completed.len());
    assert!(RunwayId::ALL.iter().all(|r| scheduler.allocator().runway(*r).available));
    assert!(sink.routed.is_empty());
}

#[test]
fn test_retired_aircraft_leave_no_runway_behind() {
    let mut scheduler = Scheduler::new(&quiet_config());
    let mut sink = Recorder::default();

    add_aircraft(&mut scheduler, 1, Commercial, East);
    let reports = run(&mut scheduler, &mut sink, 60);

    let retired_at = reports.iter().find(|r| r.retired.contains(&1)).map(|r| r.now);
    let released_at = reports
        .iter()
        .find(|r| r.allocation.released.contains(&(1, RunwayId::B)))
        .map(|r| r.now);
    assert!(released_at.is_some());
    assert!(released_at < retired_at);
    assert!(scheduler.completed[0].runway.is_none());
}
