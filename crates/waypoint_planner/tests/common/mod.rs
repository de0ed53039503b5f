#![allow(dead_code)]

use std::sync::Arc;

use jiff::SignedDuration;
use uuid::Uuid;
use waypoint_optimizer::problem::{
    location::Location,
    optimization_profile::OptimizationProfile,
    order::{Order, OrderBuilder},
};
use waypoint_planner::{
    aggregator::BatchAggregator,
    config::PlannerConfig,
    scheduler::{BatchScheduler, Collaborators},
    sources::{
        CarrierCompliance, FleetVehicle,
        memory::{
            CollectingPublisher, InMemoryCompliance, InMemoryFleet, InMemoryOrders,
            InMemoryProfiles, InMemoryVehicleProfiles,
        },
    },
};

pub fn uuid(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

pub fn order(id: u128, weight: f64) -> Order {
    let offset = id as f64 * 0.01;
    let mut builder = OrderBuilder::default();
    builder
        .set_id(uuid(id))
        .set_delivery_location(Location::from_lat_lon(52.2 + offset, 21.0 + offset))
        .set_weight(weight);
    builder.build().unwrap()
}

pub fn vehicle(id: u128, capacity_weight: f64) -> FleetVehicle {
    FleetVehicle {
        id: uuid(id),
        carrier_id: uuid(10_000 + id),
        profile_id: None,
        depot_id: None,
        driver_id: None,
        capacity_weight: Some(capacity_weight),
        capacity_volume: Some(100.0),
        max_detour_km: None,
        available: true,
        position: None,
    }
}

pub fn config() -> PlannerConfig {
    let mut config = PlannerConfig::default();
    config.solver.time_limit = SignedDuration::from_secs(5);
    config.solver.max_iterations = 200;
    config.solver.parallel = false;
    config
}

pub struct Harness {
    pub aggregator: Arc<BatchAggregator>,
    pub orders: Arc<InMemoryOrders>,
    pub fleet: Arc<InMemoryFleet>,
    pub publisher: Arc<CollectingPublisher>,
    pub scheduler: Arc<BatchScheduler>,
}

impl Harness {
    pub fn new(
        config: &PlannerConfig,
        orders: Vec<Order>,
        vehicles: Vec<FleetVehicle>,
        profiles: Vec<OptimizationProfile>,
    ) -> Harness {
        let compliance = InMemoryCompliance::new(vehicles.iter().map(|vehicle| CarrierCompliance {
            carrier_id: vehicle.carrier_id,
            status: String::from("COMPLIANT"),
            insured: true,
        }));

        let aggregator = Arc::new(BatchAggregator::new());
        let orders = Arc::new(InMemoryOrders::new(orders));
        let fleet = Arc::new(InMemoryFleet::new(vehicles));
        let publisher = Arc::new(CollectingPublisher::new());

        let collaborators = Collaborators {
            orders: orders.clone(),
            fleet: fleet.clone(),
            compliance: Arc::new(compliance),
            vehicle_profiles: Arc::new(InMemoryVehicleProfiles::default()),
            profiles: Arc::new(InMemoryProfiles::new(profiles)),
            publisher: publisher.clone(),
        };

        let scheduler = Arc::new(
            BatchScheduler::new(config, Arc::clone(&aggregator), collaborators).unwrap(),
        );

        Harness {
            aggregator,
            orders,
            fleet,
            publisher,
            scheduler,
        }
    }
}
