mod common;

use std::{sync::Arc, time::Duration};

use common::{Harness, config, order, uuid, vehicle};
use jiff::SignedDuration;
use tokio::sync::{mpsc, watch};
use waypoint_planner::{
    aggregator::OrderPriority,
    config::BatchSchedule,
    intake::{OrderEvent, OrderIntake},
    sources::memory::CollectingPublisher,
};

async fn wait_for_plans(publisher: &CollectingPublisher, count: usize) -> bool {
    for _ in 0..250 {
        if publisher.plans().len() >= count {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_scheduled_cycles_run_until_shutdown() {
    let mut config = config();
    config.auto_plan.schedule = BatchSchedule::Every {
        every: SignedDuration::from_millis(50),
    };
    let harness = Harness::new(
        &config,
        vec![order(1, 10.0), order(2, 10.0)],
        vec![vehicle(100, 1000.0)],
        vec![],
    );
    let (shutdown, shutdown_rx) = watch::channel(false);
    let run = tokio::spawn(Arc::clone(&harness.scheduler).run(shutdown_rx));

    harness.aggregator.add(uuid(1), OrderPriority::Normal);
    assert!(wait_for_plans(&harness.publisher, 1).await);

    harness.aggregator.add(uuid(2), OrderPriority::Low);
    assert!(wait_for_plans(&harness.publisher, 2).await);

    shutdown.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .unwrap()
        .unwrap();
    assert!(harness.aggregator.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_urgent_event_wakes_scheduler() {
    let mut config = config();
    config.auto_plan.urgent_auto_reoptimize = true;
    config.auto_plan.schedule = BatchSchedule::Every {
        every: SignedDuration::from_hours(6),
    };
    let harness = Harness::new(
        &config,
        vec![order(1, 10.0), order(2, 10.0)],
        vec![vehicle(100, 1000.0)],
        vec![],
    );
    let (shutdown, shutdown_rx) = watch::channel(false);
    let run = tokio::spawn(Arc::clone(&harness.scheduler).run(shutdown_rx));

    let (events, events_rx) = mpsc::channel(8);
    let intake = tokio::spawn(
        OrderIntake::new(Arc::clone(&harness.aggregator))
            .with_scheduler(Arc::clone(&harness.scheduler))
            .run(events_rx),
    );

    events
        .send(OrderEvent {
            order_id: uuid(2),
            priority: OrderPriority::Normal,
        })
        .await
        .unwrap();
    events
        .send(OrderEvent {
            order_id: uuid(1),
            priority: OrderPriority::Urgent,
        })
        .await
        .unwrap();

    assert!(wait_for_plans(&harness.publisher, 1).await);
    let plans = harness.publisher.plans();
    assert_eq!(
        plans[0].solution.assigned_order_ids().collect::<Vec<_>>(),
        vec![uuid(1)]
    );
    assert_eq!(harness.aggregator.size(), 1);

    drop(events);
    let stats = intake.await.unwrap();
    assert_eq!(stats.accepted, 2);

    drop(shutdown);
    tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_urgent_wake_ups_do_not_delay_schedule() {
    let mut config = config();
    config.auto_plan.urgent_auto_reoptimize = true;
    config.auto_plan.schedule = BatchSchedule::Every {
        every: SignedDuration::from_millis(300),
    };
    let harness = Harness::new(
        &config,
        vec![order(1, 10.0)],
        vec![vehicle(100, 1000.0)],
        vec![],
    );
    let (shutdown, shutdown_rx) = watch::channel(false);
    let run = tokio::spawn(Arc::clone(&harness.scheduler).run(shutdown_rx));

    harness.aggregator.add(uuid(1), OrderPriority::Normal);
    let signals = {
        let scheduler = Arc::clone(&harness.scheduler);
        tokio::spawn(async move {
            for _ in 0..30 {
                scheduler.signal_urgent();
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        })
    };

    assert!(wait_for_plans(&harness.publisher, 1).await);
    assert!(harness.aggregator.is_empty());

    signals.abort();
    shutdown.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stale_checks_do_not_delay_schedule() {
    let mut config = config();
    config.auto_plan.stale_check_interval = SignedDuration::from_millis(100);
    config.auto_plan.schedule = BatchSchedule::Every {
        every: SignedDuration::from_millis(300),
    };
    let harness = Harness::new(
        &config,
        vec![order(1, 10.0)],
        vec![vehicle(100, 1000.0)],
        vec![],
    );
    let (shutdown, shutdown_rx) = watch::channel(false);
    let run = tokio::spawn(Arc::clone(&harness.scheduler).run(shutdown_rx));

    harness.aggregator.add(uuid(1), OrderPriority::Normal);

    assert!(wait_for_plans(&harness.publisher, 1).await);
    assert!(harness.aggregator.is_empty());

    shutdown.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .unwrap()
        .unwrap();
}
