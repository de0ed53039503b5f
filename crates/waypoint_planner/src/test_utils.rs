use uuid::Uuid;

use crate::sources::{CarrierCompliance, FleetVehicle};

pub fn uuid(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

pub fn fleet_vehicle(id: u128, capacity_weight: Option<f64>) -> FleetVehicle {
    FleetVehicle {
        id: uuid(id),
        carrier_id: uuid(10_000 + id),
        profile_id: None,
        depot_id: None,
        driver_id: None,
        capacity_weight,
        capacity_volume: Some(100.0),
        max_detour_km: None,
        available: true,
        position: None,
    }
}

pub fn compliant(vehicle: &FleetVehicle) -> CarrierCompliance {
    CarrierCompliance {
        carrier_id: vehicle.carrier_id,
        status: String::from("COMPLIANT"),
        insured: true,
    }
}
