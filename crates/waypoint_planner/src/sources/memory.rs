//! In-memory collaborators, used by the CLI and by tests.

use std::sync::atomic::{AtomicBool, Ordering};

use fxhash::FxHashMap;
use parking_lot::{Mutex, RwLock};
use uuid::Uuid;
use waypoint_optimizer::problem::{optimization_profile::OptimizationProfile, order::Order};

use crate::{error::SourceError, events::RoutePlan};

use super::{
    CarrierCompliance, ComplianceRegistry, FleetDataSource, FleetVehicle,
    OptimizationProfileSource, OrderDataSource, PlanPublisher, VehicleProfileDefaults,
    VehicleProfileRegistry,
};

pub struct InMemoryOrders {
    orders: RwLock<FxHashMap<Uuid, Order>>,
    available: AtomicBool,
}

impl InMemoryOrders {
    pub fn new(orders: impl IntoIterator<Item = Order>) -> Self {
        InMemoryOrders {
            orders: RwLock::new(orders.into_iter().map(|order| (order.id(), order)).collect()),
            available: AtomicBool::new(true),
        }
    }

    pub fn insert(&self, order: Order) {
        self.orders.write().insert(order.id(), order);
    }

    /// Simulates an outage of the order service.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }
}

impl OrderDataSource for InMemoryOrders {
    fn fetch_orders(&self, ids: &[Uuid]) -> Result<Vec<Order>, SourceError> {
        if !self.available.load(Ordering::Acquire) {
            return Err(SourceError::Unavailable(String::from("order service")));
        }

        let orders = self.orders.read();
        Ok(ids.iter().filter_map(|id| orders.get(id).cloned()).collect())
    }
}

pub struct InMemoryFleet {
    vehicles: Vec<FleetVehicle>,
    available: AtomicBool,
}

impl InMemoryFleet {
    pub fn new(vehicles: Vec<FleetVehicle>) -> Self {
        InMemoryFleet {
            vehicles,
            available: AtomicBool::new(true),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }

    fn ensure_available(&self) -> Result<(), SourceError> {
        if self.available.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(SourceError::Unavailable(String::from("fleet service")))
        }
    }
}

impl FleetDataSource for InMemoryFleet {
    fn candidate_vehicle_ids(&self) -> Result<Vec<Uuid>, SourceError> {
        self.ensure_available()?;
        Ok(self.vehicles.iter().map(|vehicle| vehicle.id).collect())
    }

    fn fetch_vehicles(&self, ids: &[Uuid]) -> Result<Vec<FleetVehicle>, SourceError> {
        self.ensure_available()?;
        Ok(self
            .vehicles
            .iter()
            .filter(|vehicle| ids.contains(&vehicle.id))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryCompliance {
    records: FxHashMap<Uuid, CarrierCompliance>,
}

impl InMemoryCompliance {
    pub fn new(records: impl IntoIterator<Item = CarrierCompliance>) -> Self {
        InMemoryCompliance {
            records: records
                .into_iter()
                .map(|record| (record.carrier_id, record))
                .collect(),
        }
    }
}

impl ComplianceRegistry for InMemoryCompliance {
    fn status(&self, carrier_id: Uuid) -> Option<CarrierCompliance> {
        self.records.get(&carrier_id).cloned()
    }
}

#[derive(Default)]
pub struct InMemoryVehicleProfiles {
    profiles: FxHashMap<Uuid, VehicleProfileDefaults>,
}

impl InMemoryVehicleProfiles {
    pub fn new(profiles: impl IntoIterator<Item = VehicleProfileDefaults>) -> Self {
        InMemoryVehicleProfiles {
            profiles: profiles
                .into_iter()
                .map(|profile| (profile.profile_id, profile))
                .collect(),
        }
    }
}

impl VehicleProfileRegistry for InMemoryVehicleProfiles {
    fn get(&self, profile_id: Uuid) -> Option<VehicleProfileDefaults> {
        self.profiles.get(&profile_id).cloned()
    }
}

#[derive(Default)]
pub struct InMemoryProfiles {
    profiles: FxHashMap<String, OptimizationProfile>,
}

impl InMemoryProfiles {
    pub fn new(profiles: impl IntoIterator<Item = OptimizationProfile>) -> Self {
        InMemoryProfiles {
            profiles: profiles
                .into_iter()
                .map(|profile| (profile.code.clone(), profile))
                .collect(),
        }
    }
}

impl OptimizationProfileSource for InMemoryProfiles {
    fn profile(&self, code: &str) -> Result<OptimizationProfile, SourceError> {
        self.profiles
            .get(code)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(format!("profile {code}")))
    }
}

/// Keeps every published plan.
#[derive(Default)]
pub struct CollectingPublisher {
    plans: Mutex<Vec<RoutePlan>>,
}

impl CollectingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plans(&self) -> Vec<RoutePlan> {
        self.plans.lock().clone()
    }
}

impl PlanPublisher for CollectingPublisher {
    fn publish(&self, plan: &RoutePlan) {
        self.plans.lock().push(plan.clone());
    }
}
