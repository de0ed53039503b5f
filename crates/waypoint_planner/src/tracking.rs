use std::sync::Arc;

use fxhash::FxHashMap;
use jiff::{SignedDuration, Timestamp};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;
use waypoint_optimizer::{
    json::types::JsonLocation, problem::route_stop::RouteStop,
    solver::resequence::resequence_routes,
};

use crate::{
    config::TrackingConfig,
    error::SourceError,
    sources::{FleetDataSource, FleetVehicle},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehiclePosition {
    pub lat: f64,
    pub lon: f64,
    pub recorded_at: Timestamp,
}

/// A position as reported by a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionReport {
    pub vehicle_id: Uuid,
    pub lat: f64,
    pub lon: f64,
    pub recorded_at: Timestamp,
}

/// Last known position per vehicle.
///
/// Holds at most `capacity` vehicles: recording a new vehicle into a full
/// cache evicts the one with the oldest position. Positions older than `ttl`
/// read as unknown.
pub struct VehiclePositionCache {
    capacity: usize,
    ttl: SignedDuration,
    positions: RwLock<FxHashMap<Uuid, VehiclePosition>>,
}

impl VehiclePositionCache {
    pub fn new(capacity: usize, ttl: SignedDuration) -> Self {
        VehiclePositionCache {
            capacity: capacity.max(1),
            ttl,
            positions: RwLock::new(FxHashMap::default()),
        }
    }

    pub fn from_config(config: &TrackingConfig) -> Self {
        Self::new(config.capacity, config.ttl)
    }

    /// Stores a position report. Reports older than the stored one are
    /// ignored.
    pub fn record(&self, vehicle_id: Uuid, position: VehiclePosition) {
        let mut positions = self.positions.write();

        if let Some(current) = positions.get(&vehicle_id) {
            if current.recorded_at > position.recorded_at {
                debug!(%vehicle_id, "Ignored out of order position report");
                return;
            }
        } else if positions.len() >= self.capacity {
            let oldest = positions
                .iter()
                .min_by_key(|(_, position)| position.recorded_at)
                .map(|(id, _)| *id);
            if let Some(oldest) = oldest {
                positions.remove(&oldest);
                debug!(vehicle_id = %oldest, "Evicted vehicle position");
            }
        }

        positions.insert(vehicle_id, position);
    }

    pub fn record_report(&self, report: PositionReport) {
        self.record(
            report.vehicle_id,
            VehiclePosition {
                lat: report.lat,
                lon: report.lon,
                recorded_at: report.recorded_at,
            },
        );
    }

    pub fn last_known(&self, vehicle_id: Uuid, now: Timestamp) -> Option<VehiclePosition> {
        self.positions
            .read()
            .get(&vehicle_id)
            .filter(|position| !self.is_expired(position, now))
            .copied()
    }

    /// Drops expired positions and returns how many were dropped.
    pub fn purge_expired(&self, now: Timestamp) -> usize {
        let mut positions = self.positions.write();
        let before = positions.len();
        positions.retain(|_, position| !self.is_expired(position, now));
        before - positions.len()
    }

    pub fn len(&self) -> usize {
        self.positions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resequences a vehicle's remaining stops from its last known position.
    /// Returns `None` when the position is unknown or expired.
    pub fn resequence_from_last_known(
        &self,
        vehicle_id: Uuid,
        stops: &[RouteStop],
        now: Timestamp,
    ) -> Option<Vec<RouteStop>> {
        let position = self.last_known(vehicle_id, now)?;
        Some(resequence_routes(stops, position.lat, position.lon))
    }

    fn is_expired(&self, position: &VehiclePosition, now: Timestamp) -> bool {
        position.recorded_at + self.ttl < now
    }
}

/// Fleet source whose vehicles start from their last known position when the
/// cache holds a live one.
pub struct TrackedFleet {
    fleet: Arc<dyn FleetDataSource>,
    positions: Arc<VehiclePositionCache>,
}

impl TrackedFleet {
    pub fn new(fleet: Arc<dyn FleetDataSource>, positions: Arc<VehiclePositionCache>) -> Self {
        TrackedFleet { fleet, positions }
    }
}

impl FleetDataSource for TrackedFleet {
    fn candidate_vehicle_ids(&self) -> Result<Vec<Uuid>, SourceError> {
        self.fleet.candidate_vehicle_ids()
    }

    fn fetch_vehicles(&self, ids: &[Uuid]) -> Result<Vec<FleetVehicle>, SourceError> {
        let now = Timestamp::now();
        let mut vehicles = self.fleet.fetch_vehicles(ids)?;
        for vehicle in &mut vehicles {
            if let Some(position) = self.positions.last_known(vehicle.id, now) {
                vehicle.position = Some(JsonLocation {
                    lat: position.lat,
                    lon: position.lon,
                });
            }
        }
        Ok(vehicles)
    }
}

#[cfg(test)]
mod tests {
    use waypoint_optimizer::solution::ActivityType;

    use crate::{
        sources::memory::InMemoryFleet,
        test_utils::{fleet_vehicle, uuid},
    };

    use super::*;

    fn at(minutes: i64) -> Timestamp {
        Timestamp::UNIX_EPOCH + SignedDuration::from_mins(minutes)
    }

    fn position(lat: f64, lon: f64, minutes: i64) -> VehiclePosition {
        VehiclePosition {
            lat,
            lon,
            recorded_at: at(minutes),
        }
    }

    #[test]
    fn test_expired_positions_are_unknown() {
        let cache = VehiclePositionCache::new(10, SignedDuration::from_mins(30));
        cache.record(uuid(1), position(52.0, 21.0, 0));

        assert!(cache.last_known(uuid(1), at(30)).is_some());
        assert!(cache.last_known(uuid(1), at(31)).is_none());
        assert_eq!(cache.purge_expired(at(31)), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_full_cache_evicts_oldest() {
        let cache = VehiclePositionCache::new(2, SignedDuration::from_hours(1));
        cache.record(uuid(1), position(52.0, 21.0, 5));
        cache.record(uuid(2), position(52.0, 21.0, 1));
        cache.record(uuid(3), position(52.0, 21.0, 10));

        assert_eq!(cache.len(), 2);
        assert!(cache.last_known(uuid(2), at(10)).is_none());
        assert!(cache.last_known(uuid(1), at(10)).is_some());

        cache.record(uuid(1), position(53.0, 21.0, 12));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_stale_report_is_ignored() {
        let cache = VehiclePositionCache::new(10, SignedDuration::from_hours(1));
        cache.record(uuid(1), position(52.0, 21.0, 10));
        cache.record(uuid(1), position(53.0, 22.0, 5));

        assert_eq!(
            cache.last_known(uuid(1), at(10)),
            Some(position(52.0, 21.0, 10))
        );
    }

    #[test]
    fn test_resequence_from_last_known() {
        let cache = VehiclePositionCache::new(10, SignedDuration::from_hours(1));
        let stop = |id: &str, lat: f64| RouteStop {
            stop_id: id.to_string(),
            order_id: uuid(lat as u128),
            activity_type: ActivityType::Delivery,
            lat,
            lon: 21.0,
            planned_arrival: None,
            sequence: None,
        };
        let stops = vec![stop("far", 54.0), stop("near", 52.1)];

        assert!(cache
            .resequence_from_last_known(uuid(1), &stops, at(0))
            .is_none());

        cache.record(uuid(1), position(52.0, 21.0, 0));
        let ordered = cache
            .resequence_from_last_known(uuid(1), &stops, at(1))
            .unwrap();
        let ids: Vec<&str> = ordered.iter().map(|stop| stop.stop_id.as_str()).collect();
        assert_eq!(ids, vec!["near", "far"]);
    }

    #[test]
    fn test_tracked_fleet_starts_from_live_position() {
        let positions = Arc::new(VehiclePositionCache::new(10, SignedDuration::from_hours(1)));
        positions.record_report(PositionReport {
            vehicle_id: uuid(1),
            lat: 52.4,
            lon: 21.2,
            recorded_at: Timestamp::now(),
        });
        positions.record_report(PositionReport {
            vehicle_id: uuid(2),
            lat: 50.0,
            lon: 19.9,
            recorded_at: Timestamp::now() - SignedDuration::from_hours(2),
        });

        let mut parked = fleet_vehicle(2, Some(500.0));
        parked.position = Some(JsonLocation { lat: 52.0, lon: 21.0 });
        let fleet = TrackedFleet::new(
            Arc::new(InMemoryFleet::new(vec![fleet_vehicle(1, Some(500.0)), parked])),
            positions,
        );

        let ids = fleet.candidate_vehicle_ids().unwrap();
        let vehicles = fleet.fetch_vehicles(&ids).unwrap();

        assert_eq!(vehicles[0].position, Some(JsonLocation { lat: 52.4, lon: 21.2 }));
        assert_eq!(vehicles[1].position, Some(JsonLocation { lat: 52.0, lon: 21.0 }));
    }
}
