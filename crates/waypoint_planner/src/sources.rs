//! Contracts of the collaborators the planner reads from and publishes to.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use waypoint_optimizer::{
    json::types::JsonLocation,
    problem::{optimization_profile::OptimizationProfile, order::Order},
};

use crate::{error::SourceError, events::RoutePlan};

pub mod memory;

pub trait OrderDataSource: Send + Sync {
    /// Loads the routing view of `ids`. Orders unknown upstream are left out
    /// of the result.
    fn fetch_orders(&self, ids: &[Uuid]) -> Result<Vec<Order>, SourceError>;
}

pub trait FleetDataSource: Send + Sync {
    fn candidate_vehicle_ids(&self) -> Result<Vec<Uuid>, SourceError>;

    fn fetch_vehicles(&self, ids: &[Uuid]) -> Result<Vec<FleetVehicle>, SourceError>;
}

pub trait ComplianceRegistry: Send + Sync {
    fn status(&self, carrier_id: Uuid) -> Option<CarrierCompliance>;
}

pub trait VehicleProfileRegistry: Send + Sync {
    fn get(&self, profile_id: Uuid) -> Option<VehicleProfileDefaults>;
}

pub trait OptimizationProfileSource: Send + Sync {
    fn profile(&self, code: &str) -> Result<OptimizationProfile, SourceError>;
}

/// Receives finished plans. Delivery guarantees are the publisher's own.
pub trait PlanPublisher: Send + Sync {
    fn publish(&self, plan: &RoutePlan);
}

/// A vehicle as stored by the fleet service, before compliance filtering and
/// capacity enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetVehicle {
    pub id: Uuid,
    pub carrier_id: Uuid,
    #[serde(default)]
    pub profile_id: Option<Uuid>,
    #[serde(default)]
    pub depot_id: Option<String>,
    #[serde(default)]
    pub driver_id: Option<String>,
    #[serde(default)]
    pub capacity_weight: Option<f64>,
    #[serde(default)]
    pub capacity_volume: Option<f64>,
    #[serde(default)]
    pub max_detour_km: Option<f64>,
    #[serde(default = "default_available")]
    pub available: bool,
    #[serde(default)]
    pub position: Option<JsonLocation>,
}

fn default_available() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarrierCompliance {
    pub carrier_id: Uuid,
    pub status: String,
    #[serde(default)]
    pub insured: bool,
}

impl CarrierCompliance {
    pub fn is_compliant(&self) -> bool {
        self.status.eq_ignore_ascii_case("COMPLIANT")
    }
}

/// Capacity defaults of a vehicle profile, used for vehicles that leave
/// theirs unset.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleProfileDefaults {
    pub profile_id: Uuid,
    #[serde(default)]
    pub capacity_weight: Option<f64>,
    #[serde(default)]
    pub capacity_volume: Option<f64>,
    #[serde(default)]
    pub max_detour_km: Option<f64>,
}
