use tracing::{debug, info};
use uuid::Uuid;
use waypoint_optimizer::{
    error::PlanningError,
    problem::{
        location::Location,
        optimization_profile::{OptimizationProfile, VehicleSelectionMode},
        vehicle::{Vehicle, VehicleBuilder},
    },
};

use crate::sources::{ComplianceRegistry, FleetVehicle, VehicleProfileRegistry};

#[derive(Debug, Clone, PartialEq)]
pub enum ExclusionReason {
    NoComplianceRecord,
    NotCompliant(String),
    NotInsured,
    Unavailable,
    OtherDepot,
    InvalidVehicle(PlanningError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Exclusion {
    pub vehicle_id: Uuid,
    pub reason: ExclusionReason,
}

#[derive(Debug, Clone, Default)]
pub struct FilteredFleet {
    pub vehicles: Vec<Vehicle>,
    pub excluded: Vec<Exclusion>,
}

/// Narrows fleet candidates to compliant vehicles the profile may use, with
/// capacities filled in from their vehicle profile.
#[derive(Debug, Clone)]
pub struct FleetFilter {
    require_insurance: bool,
    selection_mode: VehicleSelectionMode,
    depot_id: Option<String>,
}

impl FleetFilter {
    pub fn new(require_insurance: bool) -> Self {
        FleetFilter {
            require_insurance,
            selection_mode: VehicleSelectionMode::default(),
            depot_id: None,
        }
    }

    pub fn for_profile(require_insurance: bool, profile: &OptimizationProfile) -> Self {
        FleetFilter {
            require_insurance,
            selection_mode: profile.vehicle_selection_mode,
            depot_id: profile.depot_id.clone(),
        }
    }

    pub fn filter(
        &self,
        candidates: &[FleetVehicle],
        compliance: &dyn ComplianceRegistry,
        profiles: &dyn VehicleProfileRegistry,
    ) -> FilteredFleet {
        let mut fleet = FilteredFleet::default();

        for candidate in candidates {
            match self.admit(candidate, compliance, profiles) {
                Ok(vehicle) => fleet.vehicles.push(vehicle),
                Err(reason) => {
                    debug!(vehicle_id = %candidate.id, ?reason, "Excluded vehicle");
                    fleet.excluded.push(Exclusion {
                        vehicle_id: candidate.id,
                        reason,
                    });
                }
            }
        }

        info!(
            candidates = candidates.len(),
            kept = fleet.vehicles.len(),
            excluded = fleet.excluded.len(),
            "Filtered fleet"
        );

        fleet
    }

    fn admit(
        &self,
        candidate: &FleetVehicle,
        compliance: &dyn ComplianceRegistry,
        profiles: &dyn VehicleProfileRegistry,
    ) -> Result<Vehicle, ExclusionReason> {
        let record = compliance
            .status(candidate.carrier_id)
            .ok_or(ExclusionReason::NoComplianceRecord)?;
        if !record.is_compliant() {
            return Err(ExclusionReason::NotCompliant(record.status));
        }
        if self.require_insurance && !record.insured {
            return Err(ExclusionReason::NotInsured);
        }

        match self.selection_mode {
            VehicleSelectionMode::All => {}
            VehicleSelectionMode::Available => {
                if !candidate.available {
                    return Err(ExclusionReason::Unavailable);
                }
            }
            VehicleSelectionMode::DepotSpecific => {
                if !candidate.available {
                    return Err(ExclusionReason::Unavailable);
                }
                if candidate.depot_id.is_none() || candidate.depot_id != self.depot_id {
                    return Err(ExclusionReason::OtherDepot);
                }
            }
        }

        build_vehicle(candidate, profiles).map_err(ExclusionReason::InvalidVehicle)
    }
}

fn build_vehicle(
    candidate: &FleetVehicle,
    profiles: &dyn VehicleProfileRegistry,
) -> Result<Vehicle, PlanningError> {
    let defaults = candidate
        .profile_id
        .and_then(|id| profiles.get(id))
        .unwrap_or_default();

    let mut builder = VehicleBuilder::default();
    builder
        .set_vehicle_id(candidate.id)
        .set_carrier_id(candidate.carrier_id)
        .set_available(candidate.available)
        .set_capacity_weight(
            candidate
                .capacity_weight
                .or(defaults.capacity_weight)
                .unwrap_or(0.0),
        )
        .set_capacity_volume(
            candidate
                .capacity_volume
                .or(defaults.capacity_volume)
                .unwrap_or(0.0),
        );

    if let Some(max_detour_km) = candidate.max_detour_km.or(defaults.max_detour_km) {
        builder.set_max_detour_km(max_detour_km);
    }
    if let Some(profile_id) = candidate.profile_id {
        builder.set_profile_id(profile_id);
    }
    if let Some(depot_id) = &candidate.depot_id {
        builder.set_depot_id(depot_id.clone());
    }
    if let Some(driver_id) = &candidate.driver_id {
        builder.set_driver_id(driver_id.clone());
    }
    if let Some(position) = candidate.position {
        builder.set_start_location(Location::try_from_lat_lon(
            "vehicle.position",
            position.lat,
            position.lon,
        )?);
    }

    builder.build()
}
