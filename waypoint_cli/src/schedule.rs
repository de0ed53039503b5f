use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
    sync::Arc,
};

use anyhow::Context;
use clap::Args;
use parking_lot::Mutex;
use serde::Deserialize;
use tokio::sync::{mpsc, watch};
use tracing::{error, info};
use waypoint_optimizer::{
    json::types::{JsonOrder, JsonProfile},
    problem::{optimization_profile::OptimizationProfile, order::Order},
};
use waypoint_planner::{
    aggregator::BatchAggregator,
    config::PlannerConfig,
    events::RoutePlan,
    intake::{OrderEvent, OrderIntake},
    scheduler::{BatchScheduler, Collaborators, Trigger},
    tracking::{PositionReport, TrackedFleet, VehiclePositionCache},
    sources::{
        CarrierCompliance, FleetVehicle, PlanPublisher, VehicleProfileDefaults,
        memory::{
            InMemoryCompliance, InMemoryFleet, InMemoryOrders, InMemoryProfiles,
            InMemoryVehicleProfiles,
        },
    },
};

use crate::io::read_json;

#[derive(Args)]
pub struct ScheduleArgs {
    /// Dataset with orders, fleet, compliance records and pending order events
    #[arg(short, long)]
    dataset: PathBuf,

    /// Runs a single manual cycle instead of the scheduler loop
    #[arg(long)]
    once: bool,

    /// File receiving one route event per line, stdout when missing
    #[arg(short, long)]
    out: Option<PathBuf>,
}

/// Everything the collaborators would otherwise serve.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Dataset {
    orders: Vec<JsonOrder>,
    vehicles: Vec<FleetVehicle>,
    #[serde(default)]
    compliance: Vec<CarrierCompliance>,
    #[serde(default)]
    vehicle_profiles: Vec<VehicleProfileDefaults>,
    #[serde(default)]
    profiles: Vec<JsonProfile>,
    #[serde(default)]
    pending: Vec<OrderEvent>,
    /// Live position reports, applied over the fleet's stored positions.
    #[serde(default)]
    positions: Vec<PositionReport>,
}

/// Writes route events as JSON lines.
struct JsonLinesPublisher {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl JsonLinesPublisher {
    fn new(out: Option<&PathBuf>) -> anyhow::Result<Self> {
        let writer: Box<dyn Write + Send> = match out {
            Some(path) => Box::new(BufWriter::new(
                File::create(path).with_context(|| format!("creating {}", path.display()))?,
            )),
            None => Box::new(std::io::stdout()),
        };
        Ok(JsonLinesPublisher {
            writer: Mutex::new(writer),
        })
    }

    fn write_plan(&self, plan: &RoutePlan) -> anyhow::Result<()> {
        let mut writer = self.writer.lock();
        for event in plan.events() {
            serde_json::to_writer(&mut *writer, &event)?;
            writeln!(writer)?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl PlanPublisher for JsonLinesPublisher {
    fn publish(&self, plan: &RoutePlan) {
        if let Err(error) = self.write_plan(plan) {
            error!(plan_id = %plan.plan_id, %error, "Failed to write route events");
        }
    }
}

pub async fn run(args: ScheduleArgs, config: &PlannerConfig) -> anyhow::Result<()> {
    let dataset: Dataset = read_json(&args.dataset)?;

    let orders = dataset
        .orders
        .into_iter()
        .map(Order::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    let profiles = dataset
        .profiles
        .into_iter()
        .map(OptimizationProfile::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    let positions = Arc::new(VehiclePositionCache::from_config(&config.tracking));
    for report in dataset.positions {
        positions.record_report(report);
    }
    let purged = positions.purge_expired(jiff::Timestamp::now());
    info!(tracked = positions.len(), purged, "Loaded vehicle positions");

    let aggregator = Arc::new(BatchAggregator::new());
    let collaborators = Collaborators {
        orders: Arc::new(InMemoryOrders::new(orders)),
        fleet: Arc::new(TrackedFleet::new(
            Arc::new(InMemoryFleet::new(dataset.vehicles)),
            positions,
        )),
        compliance: Arc::new(InMemoryCompliance::new(dataset.compliance)),
        vehicle_profiles: Arc::new(InMemoryVehicleProfiles::new(dataset.vehicle_profiles)),
        profiles: Arc::new(InMemoryProfiles::new(profiles)),
        publisher: Arc::new(JsonLinesPublisher::new(args.out.as_ref())?),
    };
    let scheduler = Arc::new(BatchScheduler::new(
        config,
        Arc::clone(&aggregator),
        collaborators,
    )?);

    let (events, events_rx) = mpsc::channel(1024);
    let intake = tokio::spawn(
        OrderIntake::new(Arc::clone(&aggregator))
            .with_scheduler(Arc::clone(&scheduler))
            .run(events_rx),
    );
    for event in dataset.pending {
        events.send(event).await?;
    }

    if args.once {
        drop(events);
        intake.await?;

        let cycle = Arc::clone(&scheduler);
        let outcome = tokio::task::spawn_blocking(move || cycle.run_cycle(Trigger::Manual)).await?;
        info!(?outcome, "Cycle finished");
        return Ok(());
    }

    let (shutdown, shutdown_rx) = watch::channel(false);
    let run = tokio::spawn(Arc::clone(&scheduler).run(shutdown_rx));

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    shutdown.send(true)?;
    run.await?;

    drop(events);
    let stats = intake.await?;
    info!(
        accepted = stats.accepted,
        still_queued = aggregator.size(),
        "Scheduler stopped"
    );

    Ok(())
}
