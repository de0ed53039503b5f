mod common;

use common::{Harness, config, order, uuid, vehicle};
use fxhash::FxHashSet;
use jiff::SignedDuration;
use uuid::Uuid;
use waypoint_optimizer::problem::optimization_profile::OptimizationProfile;
use waypoint_planner::{
    aggregator::OrderPriority,
    scheduler::{CycleOutcome, SchedulerState, SkipReason, Trigger},
};

fn queued_ids(harness: &Harness) -> Vec<Uuid> {
    harness
        .aggregator
        .drain()
        .into_iter()
        .map(|entry| entry.order_id)
        .collect()
}

#[test]
fn test_scheduled_cycle_publishes_feasible_plan() {
    let harness = Harness::new(
        &config(),
        vec![order(1, 600.0), order(2, 400.0), order(3, 300.0)],
        vec![vehicle(100, 1000.0), vehicle(200, 500.0)],
        vec![],
    );
    for id in 1..=3 {
        harness.aggregator.add(uuid(id), OrderPriority::Normal);
    }

    let outcome = harness.scheduler.run_cycle(Trigger::Scheduled);

    let CycleOutcome::Published {
        plan_ids,
        unassigned,
        ..
    } = outcome
    else {
        panic!("expected a published plan, got {outcome:?}");
    };
    assert_eq!(plan_ids.len(), 1);
    assert_eq!(unassigned, 0);
    assert!(harness.aggregator.is_empty());
    assert_eq!(harness.scheduler.state(), SchedulerState::Idle);

    let plans = harness.publisher.plans();
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].plan_id, plan_ids[0]);

    let weights = [(uuid(1), 600.0), (uuid(2), 400.0), (uuid(3), 300.0)];
    for (vehicle_id, capacity) in [(uuid(100), 1000.0), (uuid(200), 500.0)] {
        let Some(route) = plans[0].solution.route_for_vehicle(vehicle_id) else {
            continue;
        };
        let load: f64 = route
            .included_order_ids()
            .iter()
            .map(|id| weights.iter().find(|(order_id, _)| order_id == id).unwrap().1)
            .sum();
        assert!(load <= capacity, "{vehicle_id} carries {load}");
    }

    let events = plans[0].events();
    let planned: FxHashSet<Uuid> = events
        .iter()
        .flat_map(|event| event.included_order_ids.iter().copied())
        .collect();
    assert_eq!(planned.len(), 3);
}

#[test]
fn test_unavailable_orders_keep_queue() {
    let harness = Harness::new(
        &config(),
        vec![order(1, 10.0), order(2, 10.0)],
        vec![vehicle(100, 1000.0)],
        vec![],
    );
    harness.aggregator.add(uuid(1), OrderPriority::Low);
    harness.aggregator.add(uuid(2), OrderPriority::Normal);
    harness.orders.set_available(false);

    let outcome = harness.scheduler.run_cycle(Trigger::Manual);

    assert!(matches!(
        outcome,
        CycleOutcome::Skipped(SkipReason::OrdersUnavailable(_))
    ));
    assert!(harness.publisher.plans().is_empty());

    let entries = harness.aggregator.drain();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].order_id, uuid(1));
    assert_eq!(entries[0].priority, OrderPriority::Low);
}

#[test]
fn test_unavailable_fleet_keeps_queue() {
    let harness = Harness::new(
        &config(),
        vec![order(1, 10.0)],
        vec![vehicle(100, 1000.0)],
        vec![],
    );
    harness.aggregator.add(uuid(1), OrderPriority::Normal);
    harness.fleet.set_available(false);

    let outcome = harness.scheduler.run_cycle(Trigger::Manual);

    assert!(matches!(
        outcome,
        CycleOutcome::Skipped(SkipReason::FleetUnavailable(_))
    ));
    assert_eq!(queued_ids(&harness), vec![uuid(1)]);
}

#[test]
fn test_min_batch_size_only_gates_scheduled_cycles() {
    let mut config = config();
    config.auto_plan.min_batch_size = 3;
    let harness = Harness::new(
        &config,
        vec![order(1, 10.0)],
        vec![vehicle(100, 1000.0)],
        vec![],
    );
    harness.aggregator.add(uuid(1), OrderPriority::Normal);

    assert_eq!(
        harness.scheduler.run_cycle(Trigger::Scheduled),
        CycleOutcome::Skipped(SkipReason::BelowMinBatch { queued: 1, min: 3 })
    );
    assert_eq!(harness.aggregator.size(), 1);

    assert!(matches!(
        harness.scheduler.run_cycle(Trigger::Manual),
        CycleOutcome::Published { .. }
    ));
}

#[test]
fn test_disabled_auto_plan_allows_manual_cycles() {
    let mut config = config();
    config.auto_plan.enabled = false;
    let harness = Harness::new(
        &config,
        vec![order(1, 10.0)],
        vec![vehicle(100, 1000.0)],
        vec![],
    );
    harness.aggregator.add(uuid(1), OrderPriority::Normal);

    assert_eq!(
        harness.scheduler.run_cycle(Trigger::Scheduled),
        CycleOutcome::Skipped(SkipReason::Disabled)
    );
    assert!(matches!(
        harness.scheduler.run_cycle(Trigger::Manual),
        CycleOutcome::Published { .. }
    ));
}

#[test]
fn test_empty_queue_is_skipped() {
    let harness = Harness::new(&config(), vec![], vec![vehicle(100, 1000.0)], vec![]);

    assert_eq!(
        harness.scheduler.run_cycle(Trigger::Scheduled),
        CycleOutcome::Skipped(SkipReason::NothingQueued)
    );
}

#[test]
fn test_urgent_cycle_plans_urgent_orders_only() {
    let harness = Harness::new(
        &config(),
        vec![order(1, 10.0), order(2, 10.0), order(3, 10.0)],
        vec![vehicle(100, 1000.0)],
        vec![],
    );
    harness.aggregator.add(uuid(1), OrderPriority::Urgent);
    harness.aggregator.add(uuid(2), OrderPriority::Normal);
    harness.aggregator.add(uuid(3), OrderPriority::Urgent);

    let outcome = harness.scheduler.run_cycle(Trigger::Urgent);

    assert!(matches!(outcome, CycleOutcome::Published { .. }));
    let plans = harness.publisher.plans();
    let mut planned: Vec<Uuid> = plans[0].solution.assigned_order_ids().collect();
    planned.sort();
    assert_eq!(planned, vec![uuid(1), uuid(3)]);
    assert_eq!(queued_ids(&harness), vec![uuid(2)]);
}

#[test]
fn test_large_batches_are_chunked() {
    let mut config = config();
    config.auto_plan.max_batch_size = 4;
    let orders: Vec<_> = (1..=10).map(|id| order(id, 10.0)).collect();
    let vehicles = (100..112).map(|id| vehicle(id, 1000.0)).collect();
    let harness = Harness::new(&config, orders, vehicles, vec![]);
    for id in 1..=10 {
        harness.aggregator.add(uuid(id), OrderPriority::Normal);
    }

    let CycleOutcome::Published { plan_ids, .. } = harness.scheduler.run_cycle(Trigger::Manual)
    else {
        panic!("expected published plans");
    };

    assert_eq!(plan_ids.len(), 3);
    let plans = harness.publisher.plans();
    let sizes: Vec<usize> = plans
        .iter()
        .map(|plan| plan.solution.assigned_order_ids().count())
        .collect();
    assert_eq!(sizes, vec![4, 4, 2]);
}

#[test]
fn test_chunks_do_not_share_vehicles() {
    let mut config = config();
    config.auto_plan.max_batch_size = 1;
    let harness = Harness::new(
        &config,
        vec![order(1, 600.0), order(2, 600.0)],
        vec![vehicle(100, 1000.0)],
        vec![],
    );
    harness.aggregator.add(uuid(1), OrderPriority::Normal);
    harness.aggregator.add(uuid(2), OrderPriority::Normal);

    let CycleOutcome::Published { plan_ids, .. } = harness.scheduler.run_cycle(Trigger::Manual)
    else {
        panic!("expected published plans");
    };
    assert_eq!(plan_ids.len(), 1);

    let load: f64 = harness
        .publisher
        .plans()
        .iter()
        .flat_map(|plan| plan.solution.routes.iter())
        .filter(|route| route.vehicle_id == uuid(100))
        .map(|route| route.included_order_ids().len() as f64 * 600.0)
        .sum();
    assert!(load <= 1000.0);
    assert_eq!(queued_ids(&harness), vec![uuid(2)]);
}

#[test]
fn test_later_chunks_use_remaining_vehicles() {
    let mut config = config();
    config.auto_plan.max_batch_size = 1;
    let harness = Harness::new(
        &config,
        vec![order(1, 600.0), order(2, 600.0)],
        vec![vehicle(100, 1000.0), vehicle(101, 1000.0)],
        vec![],
    );
    harness.aggregator.add(uuid(1), OrderPriority::Normal);
    harness.aggregator.add(uuid(2), OrderPriority::Normal);

    let CycleOutcome::Published { plan_ids, .. } = harness.scheduler.run_cycle(Trigger::Manual)
    else {
        panic!("expected published plans");
    };
    assert_eq!(plan_ids.len(), 2);

    let vehicles: Vec<Uuid> = harness
        .publisher
        .plans()
        .iter()
        .flat_map(|plan| plan.solution.routes.iter())
        .filter(|route| !route.activities.is_empty())
        .map(|route| route.vehicle_id)
        .collect();
    let distinct: FxHashSet<Uuid> = vehicles.iter().copied().collect();
    assert_eq!(vehicles.len(), 2);
    assert_eq!(distinct.len(), 2);
    assert!(harness.aggregator.is_empty());
}

#[test]
fn test_invalid_profile_is_rejected_and_queue_restored() {
    let profile = OptimizationProfile {
        max_route_duration: Some(SignedDuration::ZERO),
        ..OptimizationProfile::default()
    };
    let harness = Harness::new(
        &config(),
        vec![order(1, 10.0)],
        vec![vehicle(100, 1000.0)],
        vec![profile],
    );
    harness.aggregator.add(uuid(1), OrderPriority::Normal);

    let outcome = harness.scheduler.run_cycle(Trigger::Manual);

    assert!(matches!(outcome, CycleOutcome::Rejected(_)));
    assert!(harness.publisher.plans().is_empty());
    assert_eq!(queued_ids(&harness), vec![uuid(1)]);
}

#[test]
fn test_missing_fleet_keeps_orders_queued() {
    let harness = Harness::new(&config(), vec![order(1, 10.0)], vec![], vec![]);
    harness.aggregator.add(uuid(1), OrderPriority::Normal);

    assert_eq!(
        harness.scheduler.run_cycle(Trigger::Manual),
        CycleOutcome::Skipped(SkipReason::NoVehicles)
    );
    assert_eq!(queued_ids(&harness), vec![uuid(1)]);
}

#[test]
fn test_overweight_order_is_reported_not_requeued() {
    let harness = Harness::new(
        &config(),
        vec![order(1, 10.0), order(2, 5_000.0)],
        vec![vehicle(100, 1000.0)],
        vec![],
    );
    harness.aggregator.add(uuid(1), OrderPriority::Normal);
    harness.aggregator.add(uuid(2), OrderPriority::Normal);

    let outcome = harness.scheduler.run_cycle(Trigger::Manual);

    assert!(matches!(
        outcome,
        CycleOutcome::Published { unassigned: 1, .. }
    ));
    let plans = harness.publisher.plans();
    assert_eq!(plans[0].solution.unassigned[0].order_id, uuid(2));
    assert!(harness.aggregator.is_empty());
}

#[test]
fn test_stale_batch_detection() {
    let mut config = config();
    config.auto_plan.max_batch_age = SignedDuration::from_mins(10);
    let harness = Harness::new(&config, vec![], vec![], vec![]);
    assert!(!harness.scheduler.is_stale(jiff::Timestamp::now()));

    harness.aggregator.add(uuid(1), OrderPriority::Normal);
    let later = jiff::Timestamp::now() + SignedDuration::from_mins(11);
    assert!(harness.scheduler.is_stale(later));
}
