use jiff::{SignedDuration, Timestamp, civil};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::PlanningError,
    problem::{
        location::Location,
        optimization_profile::{OptimizationProfile, VehicleSelectionMode, parse_time_zone},
        order::{Order, OrderBuilder},
        route_stop::RouteStop,
        time_window::TimeWindow,
        vehicle::{Vehicle, VehicleBuilder},
    },
    solution::{
        Activity, ActivityType, Route, RoutingSolution, SolutionDiagnostics, TerminationReason,
        UnassignedOrder, UnassignedReason,
    },
    solver::score::Score,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "Location")]
pub struct JsonLocation {
    pub lat: f64,
    pub lon: f64,
}

impl JsonLocation {
    fn to_location(self, field: &str) -> Result<Location, PlanningError> {
        Location::try_from_lat_lon(field, self.lat, self.lon)
    }
}

impl From<&Location> for JsonLocation {
    fn from(value: &Location) -> Self {
        JsonLocation {
            lat: value.lat(),
            lon: value.lon(),
        }
    }
}

/// A full planning request, as read by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "PlanningRequest")]
pub struct JsonPlanningRequest {
    pub orders: Vec<JsonOrder>,
    pub vehicles: Vec<JsonVehicle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<JsonProfile>,
}

impl JsonPlanningRequest {
    pub fn into_domain(
        self,
    ) -> Result<(Vec<Order>, Vec<Vehicle>, OptimizationProfile), PlanningError> {
        let orders = self
            .orders
            .into_iter()
            .map(Order::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let vehicles = self
            .vehicles
            .into_iter()
            .map(Vehicle::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let profile = self
            .profile
            .map(OptimizationProfile::try_from)
            .transpose()?
            .unwrap_or_default();

        Ok((orders, vehicles, profile))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename_all = "camelCase", rename = "Order")]
pub struct JsonOrder {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup: Option<JsonLocation>,
    pub delivery: JsonLocation,
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub volume: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_window: Option<TimeWindow>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_services: Vec<String>,
}

impl TryFrom<JsonOrder> for Order {
    type Error = PlanningError;

    fn try_from(value: JsonOrder) -> Result<Self, Self::Error> {
        let mut builder = OrderBuilder::default();
        builder
            .set_id(value.id)
            .set_delivery_location(value.delivery.to_location("order.delivery")?)
            .set_weight(value.weight)
            .set_volume(value.volume)
            .set_required_services(value.required_services);

        if let Some(pickup) = value.pickup {
            builder.set_pickup_location(pickup.to_location("order.pickup")?);
        }

        if let Some(time_window) = value.time_window {
            builder.set_time_window(time_window);
        }

        builder.build()
    }
}

impl From<&Order> for JsonOrder {
    fn from(value: &Order) -> Self {
        JsonOrder {
            id: value.id(),
            pickup: value.pickup_location().map(JsonLocation::from),
            delivery: value.delivery_location().into(),
            weight: value.weight(),
            volume: value.volume(),
            time_window: value.time_window().copied(),
            required_services: value.required_services().to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename_all = "camelCase", rename = "Vehicle")]
pub struct JsonVehicle {
    pub id: Uuid,
    pub carrier_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depot_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<String>,
    #[serde(default)]
    pub capacity_weight: f64,
    #[serde(default)]
    pub capacity_volume: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_detour_km: Option<f64>,
    #[serde(default = "default_available")]
    pub available: bool,
    /// Last known position. Vehicles without one start at the depot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<JsonLocation>,
}

fn default_available() -> bool {
    true
}

impl TryFrom<JsonVehicle> for Vehicle {
    type Error = PlanningError;

    fn try_from(value: JsonVehicle) -> Result<Self, Self::Error> {
        let mut builder = VehicleBuilder::default();
        builder
            .set_vehicle_id(value.id)
            .set_carrier_id(value.carrier_id)
            .set_capacity_weight(value.capacity_weight)
            .set_capacity_volume(value.capacity_volume)
            .set_available(value.available);

        if let Some(profile_id) = value.profile_id {
            builder.set_profile_id(profile_id);
        }
        if let Some(depot_id) = value.depot_id {
            builder.set_depot_id(depot_id);
        }
        if let Some(driver_id) = value.driver_id {
            builder.set_driver_id(driver_id);
        }
        if let Some(max_detour_km) = value.max_detour_km {
            builder.set_max_detour_km(max_detour_km);
        }
        if let Some(position) = value.position {
            builder.set_start_location(position.to_location("vehicle.position")?);
        }

        builder.build()
    }
}

impl From<&Vehicle> for JsonVehicle {
    fn from(value: &Vehicle) -> Self {
        JsonVehicle {
            id: value.id(),
            carrier_id: value.carrier_id(),
            profile_id: value.profile_id(),
            depot_id: value.depot_id().map(str::to_owned),
            driver_id: value.driver_id().map(str::to_owned),
            capacity_weight: value.capacity_weight(),
            capacity_volume: value.capacity_volume(),
            max_detour_km: value.max_detour_km(),
            available: value.is_available(),
            position: value.start_location().map(JsonLocation::from),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename_all = "camelCase", rename = "OptimizationProfile")]
pub struct JsonProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_route_duration: Option<SignedDuration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shift_start: Option<civil::Time>,
    #[serde(default)]
    pub vehicle_selection_mode: VehicleSelectionMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depot_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depot: Option<JsonLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination: Option<SignedDuration>,
    /// IANA name or `+HH:MM` offset, `UTC` when missing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl TryFrom<JsonProfile> for OptimizationProfile {
    type Error = PlanningError;

    fn try_from(value: JsonProfile) -> Result<Self, Self::Error> {
        let defaults = OptimizationProfile::default();

        let time_zone = match value.time_zone.as_deref() {
            None => defaults.time_zone,
            Some(name) => parse_time_zone(name)?,
        };

        let depot = match value.depot {
            Some(depot) => depot.to_location("profile.depot")?,
            None => defaults.depot,
        };

        let profile = OptimizationProfile {
            id: value.id,
            name: if value.name.is_empty() {
                value.code.clone()
            } else {
                value.name
            },
            code: value.code,
            max_route_duration: value.max_route_duration,
            shift_start: value.shift_start.unwrap_or(defaults.shift_start),
            vehicle_selection_mode: value.vehicle_selection_mode,
            depot_id: value.depot_id,
            depot,
            termination: value.termination,
            time_zone,
        };

        profile.validate()?;
        Ok(profile)
    }
}

impl From<&OptimizationProfile> for JsonProfile {
    fn from(value: &OptimizationProfile) -> Self {
        JsonProfile {
            id: value.id,
            code: value.code.clone(),
            name: value.name.clone(),
            max_route_duration: value.max_route_duration,
            shift_start: Some(value.shift_start),
            vehicle_selection_mode: value.vehicle_selection_mode,
            depot_id: value.depot_id.clone(),
            depot: Some((&value.depot).into()),
            termination: value.termination,
            time_zone: value.time_zone_name(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename_all = "camelCase", rename = "ResequenceRequest")]
pub struct JsonResequenceRequest {
    pub stops: Vec<RouteStop>,
    pub start: JsonLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", rename = "Activity")]
pub struct JsonActivity {
    pub order_id: Uuid,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub lat: f64,
    pub lon: f64,
    pub arrival_time: Timestamp,
    pub end_time: Timestamp,
    pub sequence: u32,
}

impl From<&Activity> for JsonActivity {
    fn from(value: &Activity) -> Self {
        JsonActivity {
            order_id: value.order_id,
            activity_type: value.activity_type,
            lat: value.lat,
            lon: value.lon,
            arrival_time: value.arrival_time,
            end_time: value.end_time,
            sequence: value.sequence,
        }
    }
}

impl From<JsonActivity> for Activity {
    fn from(value: JsonActivity) -> Self {
        Activity {
            order_id: value.order_id,
            activity_type: value.activity_type,
            lat: value.lat,
            lon: value.lon,
            arrival_time: value.arrival_time,
            end_time: value.end_time,
            sequence: value.sequence,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", rename = "Route")]
pub struct JsonRoute {
    pub vehicle_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<String>,
    pub start_time: Timestamp,
    pub activities: Vec<JsonActivity>,
    pub total_distance_meters: f64,
    pub total_time_millis: i64,
}

impl From<&Route> for JsonRoute {
    fn from(value: &Route) -> Self {
        JsonRoute {
            vehicle_id: value.vehicle_id,
            driver_id: value.driver_id.clone(),
            start_time: value.start_time,
            activities: value.activities.iter().map(JsonActivity::from).collect(),
            total_distance_meters: value.total_distance_meters,
            total_time_millis: value.total_time_millis,
        }
    }
}

impl From<JsonRoute> for Route {
    fn from(value: JsonRoute) -> Self {
        Route {
            vehicle_id: value.vehicle_id,
            driver_id: value.driver_id,
            start_time: value.start_time,
            activities: value.activities.into_iter().map(Activity::from).collect(),
            total_distance_meters: value.total_distance_meters,
            total_time_millis: value.total_time_millis,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", rename = "UnassignedOrder")]
pub struct JsonUnassignedOrder {
    pub order_id: Uuid,
    pub reason: UnassignedReason,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", rename = "Diagnostics")]
pub struct JsonDiagnostics {
    pub no_fleet: bool,
    pub termination: TerminationReason,
    pub iterations: usize,
    pub score: Score,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", rename = "Solution")]
pub struct JsonSolution {
    pub routes: Vec<JsonRoute>,
    pub unassigned: Vec<JsonUnassignedOrder>,
    pub diagnostics: JsonDiagnostics,
}

impl From<&RoutingSolution> for JsonSolution {
    fn from(value: &RoutingSolution) -> Self {
        JsonSolution {
            routes: value.routes.iter().map(JsonRoute::from).collect(),
            unassigned: value
                .unassigned
                .iter()
                .map(|unassigned| JsonUnassignedOrder {
                    order_id: unassigned.order_id,
                    reason: unassigned.reason,
                })
                .collect(),
            diagnostics: JsonDiagnostics {
                no_fleet: value.diagnostics.no_fleet,
                termination: value.diagnostics.termination,
                iterations: value.diagnostics.iterations,
                score: value.diagnostics.score,
            },
        }
    }
}

/// The per-constraint breakdown is not part of the wire shape and comes back
/// empty.
impl From<JsonSolution> for RoutingSolution {
    fn from(value: JsonSolution) -> Self {
        RoutingSolution {
            routes: value.routes.into_iter().map(Route::from).collect(),
            unassigned: value
                .unassigned
                .into_iter()
                .map(|unassigned| UnassignedOrder {
                    order_id: unassigned.order_id,
                    reason: unassigned.reason,
                })
                .collect(),
            diagnostics: SolutionDiagnostics {
                no_fleet: value.diagnostics.no_fleet,
                termination: value.diagnostics.termination,
                iterations: value.diagnostics.iterations,
                score: value.diagnostics.score,
                ..SolutionDiagnostics::default()
            },
        }
    }
}
