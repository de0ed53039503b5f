use serde::Serialize;
use uuid::Uuid;

use crate::{
    define_index_newtype,
    error::{PlanningError, ensure_non_negative},
    problem::{location::Location, meters::Meters},
};

define_index_newtype!(VehicleIdx, Vehicle);

/// A vehicle of the filtered fleet, with capacities already enriched from
/// its vehicle profile.
#[derive(Serialize, Debug, Clone)]
pub struct Vehicle {
    id: Uuid,
    carrier_id: Uuid,
    profile_id: Option<Uuid>,
    depot_id: Option<String>,
    driver_id: Option<String>,
    capacity_weight: f64,
    capacity_volume: f64,
    max_detour_km: Option<f64>,
    available: bool,
    #[serde(skip)]
    start_location: Option<Location>,
}

impl Vehicle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn carrier_id(&self) -> Uuid {
        self.carrier_id
    }

    pub fn profile_id(&self) -> Option<Uuid> {
        self.profile_id
    }

    pub fn depot_id(&self) -> Option<&str> {
        self.depot_id.as_deref()
    }

    pub fn driver_id(&self) -> Option<&str> {
        self.driver_id.as_deref()
    }

    pub fn capacity_weight(&self) -> f64 {
        self.capacity_weight
    }

    pub fn capacity_volume(&self) -> f64 {
        self.capacity_volume
    }

    pub fn max_detour_km(&self) -> Option<f64> {
        self.max_detour_km
    }

    /// Distance budget of a route driven by this vehicle, if limited.
    pub fn detour_limit(&self) -> Option<Meters> {
        self.max_detour_km
            .filter(|&km| km > 0.0)
            .map(Meters::from_km)
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn start_location(&self) -> Option<&Location> {
        self.start_location.as_ref()
    }

    pub fn can_carry(&self, weight: f64, volume: f64) -> bool {
        weight <= self.capacity_weight && volume <= self.capacity_volume
    }
}

impl PartialEq for Vehicle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Vehicle {}

#[derive(Default)]
pub struct VehicleBuilder {
    id: Option<Uuid>,
    carrier_id: Option<Uuid>,
    profile_id: Option<Uuid>,
    depot_id: Option<String>,
    driver_id: Option<String>,
    capacity_weight: Option<f64>,
    capacity_volume: Option<f64>,
    max_detour_km: Option<f64>,
    available: Option<bool>,
    start_location: Option<Location>,
}

impl VehicleBuilder {
    pub fn set_vehicle_id(&mut self, id: Uuid) -> &mut VehicleBuilder {
        self.id = Some(id);
        self
    }

    pub fn set_carrier_id(&mut self, carrier_id: Uuid) -> &mut VehicleBuilder {
        self.carrier_id = Some(carrier_id);
        self
    }

    pub fn set_profile_id(&mut self, profile_id: Uuid) -> &mut VehicleBuilder {
        self.profile_id = Some(profile_id);
        self
    }

    pub fn set_depot_id(&mut self, depot_id: String) -> &mut VehicleBuilder {
        self.depot_id = Some(depot_id);
        self
    }

    pub fn set_driver_id(&mut self, driver_id: String) -> &mut VehicleBuilder {
        self.driver_id = Some(driver_id);
        self
    }

    pub fn set_capacity_weight(&mut self, capacity_weight: f64) -> &mut VehicleBuilder {
        self.capacity_weight = Some(capacity_weight);
        self
    }

    pub fn set_capacity_volume(&mut self, capacity_volume: f64) -> &mut VehicleBuilder {
        self.capacity_volume = Some(capacity_volume);
        self
    }

    pub fn set_max_detour_km(&mut self, max_detour_km: f64) -> &mut VehicleBuilder {
        self.max_detour_km = Some(max_detour_km);
        self
    }

    pub fn set_available(&mut self, available: bool) -> &mut VehicleBuilder {
        self.available = Some(available);
        self
    }

    pub fn set_start_location(&mut self, location: Location) -> &mut VehicleBuilder {
        self.start_location = Some(location);
        self
    }

    pub fn build(self) -> Result<Vehicle, PlanningError> {
        let id = self
            .id
            .ok_or_else(|| PlanningError::invalid("vehicle.id", "missing"))?;
        let carrier_id = self.carrier_id.ok_or_else(|| {
            PlanningError::invalid("vehicle.carrier_id", format!("missing for {id}"))
        })?;

        let capacity_weight = self.capacity_weight.unwrap_or(0.0);
        let capacity_volume = self.capacity_volume.unwrap_or(0.0);
        ensure_non_negative("vehicle.capacity_weight", capacity_weight)?;
        ensure_non_negative("vehicle.capacity_volume", capacity_volume)?;
        if let Some(max_detour_km) = self.max_detour_km {
            ensure_non_negative("vehicle.max_detour_km", max_detour_km)?;
        }

        Ok(Vehicle {
            id,
            carrier_id,
            profile_id: self.profile_id,
            depot_id: self.depot_id,
            driver_id: self.driver_id,
            capacity_weight,
            capacity_volume,
            max_detour_km: self.max_detour_km,
            available: self.available.unwrap_or(true),
            start_location: self.start_location,
        })
    }
}
