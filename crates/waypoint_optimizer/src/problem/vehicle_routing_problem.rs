use fxhash::FxHashMap;
use jiff::{SignedDuration, Timestamp};

use crate::solver::solver_params::{ObjectiveWeights, SolverParams};

use super::{
    activity_id::ActivityId,
    location::{Location, LocationIdx},
    meters::Meters,
    optimization_profile::OptimizationProfile,
    order::{Order, OrderIdx},
    time_window::TimeWindow,
    travel_matrix::TravelMatrix,
    vehicle::{Vehicle, VehicleIdx},
};

#[derive(Debug, Clone, Copy)]
struct OrderLocations {
    pickup: Option<LocationIdx>,
    delivery: LocationIdx,
}

/// Indexed, immutable view of one planning run: orders, fleet, locations and
/// the travel matrix between them.
pub struct VehicleRoutingProblem {
    locations: Vec<Location>,
    orders: Vec<Order>,
    order_locations: Vec<OrderLocations>,
    vehicles: Vec<Vehicle>,
    vehicle_starts: Vec<LocationIdx>,
    start_time: Timestamp,
    max_route_duration: Option<SignedDuration>,
    service_duration: SignedDuration,
    weights: ObjectiveWeights,
    matrix: TravelMatrix,
}

impl VehicleRoutingProblem {
    /// Vehicles without a known position start from the profile depot.
    pub fn new(
        orders: Vec<Order>,
        vehicles: Vec<Vehicle>,
        profile: &OptimizationProfile,
        start_time: Timestamp,
        params: &SolverParams,
    ) -> Self {
        let mut registry = LocationRegistry::default();

        let order_locations = orders
            .iter()
            .map(|order| OrderLocations {
                pickup: order.pickup_location().map(|location| registry.insert(*location)),
                delivery: registry.insert(*order.delivery_location()),
            })
            .collect();

        let vehicle_starts = vehicles
            .iter()
            .map(|vehicle| registry.insert(*vehicle.start_location().unwrap_or(&profile.depot)))
            .collect();

        let locations = registry.locations;
        let matrix = TravelMatrix::from_haversine(&locations, params.average_speed);

        VehicleRoutingProblem {
            locations,
            orders,
            order_locations,
            vehicles,
            vehicle_starts,
            start_time,
            max_route_duration: profile.max_route_duration,
            service_duration: params.service_duration,
            weights: params.weights.clone(),
            matrix,
        }
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn order(&self, order_id: OrderIdx) -> &Order {
        &self.orders[order_id]
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn vehicle(&self, vehicle_id: VehicleIdx) -> &Vehicle {
        &self.vehicles[vehicle_id]
    }

    pub fn location(&self, location_id: LocationIdx) -> &Location {
        &self.locations[location_id]
    }

    pub fn vehicle_start_location_id(&self, vehicle_id: VehicleIdx) -> LocationIdx {
        self.vehicle_starts[vehicle_id.get()]
    }

    pub fn activity_location_id(&self, activity_id: ActivityId) -> LocationIdx {
        let locations = &self.order_locations[activity_id.order_id().get()];
        match activity_id {
            // Orders without a pickup location never produce pickup activities
            ActivityId::Pickup(_) => locations.pickup.unwrap_or(locations.delivery),
            ActivityId::Delivery(_) => locations.delivery,
        }
    }

    /// Activities visited to serve an order, in the order they must happen.
    pub fn order_activities(&self, order_id: OrderIdx) -> impl Iterator<Item = ActivityId> {
        let pickup = self.order_locations[order_id.get()]
            .pickup
            .map(|_| ActivityId::Pickup(order_id));

        pickup
            .into_iter()
            .chain(std::iter::once(ActivityId::Delivery(order_id)))
    }

    pub fn time_window(&self, activity_id: ActivityId) -> Option<&TimeWindow> {
        match activity_id {
            // Windows constrain the hand-over to the customer
            ActivityId::Pickup(_) => None,
            ActivityId::Delivery(order_id) => self.orders[order_id].time_window(),
        }
    }

    pub fn travel_distance(&self, from: LocationIdx, to: LocationIdx) -> Meters {
        self.matrix.travel_distance(from, to)
    }

    pub fn travel_time(&self, from: LocationIdx, to: LocationIdx) -> SignedDuration {
        self.matrix.travel_time(from, to)
    }

    pub fn start_time(&self) -> Timestamp {
        self.start_time
    }

    pub fn max_route_duration(&self) -> Option<SignedDuration> {
        self.max_route_duration
    }

    pub fn service_duration(&self) -> SignedDuration {
        self.service_duration
    }

    pub fn weights(&self) -> &ObjectiveWeights {
        &self.weights
    }
}

/// Deduplicates identical coordinates so they share a matrix row.
#[derive(Default)]
struct LocationRegistry {
    locations: Vec<Location>,
    index: FxHashMap<(u64, u64), LocationIdx>,
}

impl LocationRegistry {
    fn insert(&mut self, location: Location) -> LocationIdx {
        let key = (location.lat().to_bits(), location.lon().to_bits());
        *self.index.entry(key).or_insert_with(|| {
            self.locations.push(location);
            LocationIdx::new(self.locations.len() - 1)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::test_utils;

    use super::*;

    #[test]
    fn test_shared_coordinates_share_a_location() {
        let orders = vec![
            test_utils::order_at(1, 52.0, 21.0, 10.0),
            test_utils::order_at(2, 52.0, 21.0, 10.0),
        ];
        let vehicles = vec![test_utils::vehicle(1, 100.0, 100.0)];
        let problem = VehicleRoutingProblem::new(
            orders,
            vehicles,
            &OptimizationProfile::default(),
            test_utils::planning_start(),
            &SolverParams::default(),
        );

        assert_eq!(
            problem.activity_location_id(ActivityId::Delivery(OrderIdx::new(0))),
            problem.activity_location_id(ActivityId::Delivery(OrderIdx::new(1)))
        );
        assert_eq!(problem.matrix.num_locations(), 2);
    }

    #[test]
    fn test_order_activities_put_pickup_first() {
        let mut builder = test_utils::order_builder(1, 52.0, 21.0, 10.0);
        builder.set_pickup_location(Location::from_lat_lon(52.1, 21.1));
        let orders = vec![builder.build().unwrap(), test_utils::order_at(2, 52.2, 21.2, 1.0)];

        let problem = VehicleRoutingProblem::new(
            orders,
            vec![],
            &OptimizationProfile::default(),
            test_utils::planning_start(),
            &SolverParams::default(),
        );

        let first: Vec<_> = problem.order_activities(OrderIdx::new(0)).collect();
        assert_eq!(
            first,
            vec![
                ActivityId::Pickup(OrderIdx::new(0)),
                ActivityId::Delivery(OrderIdx::new(0))
            ]
        );

        let second: Vec<_> = problem.order_activities(OrderIdx::new(1)).collect();
        assert_eq!(second, vec![ActivityId::Delivery(OrderIdx::new(1))]);
    }

    #[test]
    fn test_vehicles_without_position_start_at_profile_depot() {
        let profile = OptimizationProfile::default();
        let problem = VehicleRoutingProblem::new(
            vec![],
            vec![test_utils::vehicle(1, 1.0, 1.0)],
            &profile,
            test_utils::planning_start(),
            &SolverParams::default(),
        );

        let start = problem.location(problem.vehicle_start_location_id(VehicleIdx::new(0)));
        assert_eq!(start, &profile.depot);
    }
}
