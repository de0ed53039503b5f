use jiff::{SignedDuration, Timestamp};
use uuid::Uuid;

use crate::{
    problem::{
        location::Location,
        optimization_profile::OptimizationProfile,
        order::{Order, OrderBuilder},
        vehicle::{Vehicle, VehicleBuilder},
        vehicle_routing_problem::VehicleRoutingProblem,
    },
    solution::RoutingSolution,
    solver::solver_params::{SolverParams, Termination, Threads},
};

pub fn uuid(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

/// A Monday, two hours before the default shift start.
pub fn planning_start() -> Timestamp {
    Timestamp::from_second(1_741_586_400).unwrap()
}

pub fn order_builder(id: u128, lat: f64, lon: f64, weight: f64) -> OrderBuilder {
    let mut builder = OrderBuilder::default();
    builder
        .set_id(uuid(id))
        .set_delivery_location(Location::from_lat_lon(lat, lon))
        .set_weight(weight);
    builder
}

pub fn order_at(id: u128, lat: f64, lon: f64, weight: f64) -> Order {
    order_builder(id, lat, lon, weight).build().unwrap()
}

pub fn vehicle_builder(id: u128, capacity_weight: f64, capacity_volume: f64) -> VehicleBuilder {
    let mut builder = VehicleBuilder::default();
    builder
        .set_vehicle_id(uuid(id))
        .set_carrier_id(uuid(10_000 + id))
        .set_capacity_weight(capacity_weight)
        .set_capacity_volume(capacity_volume);
    builder
}

pub fn vehicle(id: u128, capacity_weight: f64, capacity_volume: f64) -> Vehicle {
    vehicle_builder(id, capacity_weight, capacity_volume)
        .build()
        .unwrap()
}

pub fn solver_params() -> SolverParams {
    SolverParams {
        terminations: vec![
            Termination::Iterations(500),
            Termination::Duration(SignedDuration::from_secs(10)),
        ],
        threads: Threads::Single,
        planning_start: Some(planning_start()),
        ..SolverParams::default()
    }
}

pub fn problem(orders: Vec<Order>, vehicles: Vec<Vehicle>) -> VehicleRoutingProblem {
    VehicleRoutingProblem::new(
        orders,
        vehicles,
        &OptimizationProfile::default(),
        planning_start(),
        &solver_params(),
    )
}

pub fn assert_capacity_respected(solution: &RoutingSolution, orders: &[Order], fleet: &[Vehicle]) {
    for route in &solution.routes {
        let vehicle = fleet
            .iter()
            .find(|vehicle| vehicle.id() == route.vehicle_id)
            .unwrap();
        let (weight, volume) = route
            .included_order_ids()
            .iter()
            .map(|order_id| orders.iter().find(|order| order.id() == *order_id).unwrap())
            .fold((0.0, 0.0), |(weight, volume), order| {
                (weight + order.weight(), volume + order.volume())
            });

        assert!(
            vehicle.can_carry(weight, volume),
            "vehicle {} carries {weight} kg / {volume} m3",
            vehicle.id()
        );
    }
}
