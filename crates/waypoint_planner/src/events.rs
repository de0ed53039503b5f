use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use waypoint_optimizer::solution::{ActivityType, Route, RoutingSolution};

/// A finished plan, handed to the publisher once per optimized batch.
#[derive(Debug, Clone)]
pub struct RoutePlan {
    pub plan_id: Uuid,
    pub created_at: Timestamp,
    pub solution: RoutingSolution,
}

impl RoutePlan {
    pub fn new(plan_id: Uuid, solution: RoutingSolution) -> Self {
        RoutePlan {
            plan_id,
            created_at: Timestamp::now(),
            solution,
        }
    }

    /// One event per planned route.
    pub fn events(&self) -> Vec<RoutePlannedEvent> {
        self.solution
            .routes
            .iter()
            .map(|route| RoutePlannedEvent::from_route(self.plan_id, self.created_at, route))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePlannedEvent {
    pub plan_id: Uuid,
    pub created_at: Timestamp,
    pub vehicle_id: Uuid,
    pub included_order_ids: Vec<Uuid>,
    pub waypoints: Vec<Waypoint>,
    pub total_distance_meters: f64,
    pub total_time_millis: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Waypoint {
    pub order_id: Uuid,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub lat: f64,
    pub lon: f64,
    pub sequence: u32,
    /// Milliseconds from the route start to the arrival.
    pub estimated_arrival_offset_millis: i64,
}

impl RoutePlannedEvent {
    pub fn from_route(plan_id: Uuid, created_at: Timestamp, route: &Route) -> Self {
        RoutePlannedEvent {
            plan_id,
            created_at,
            vehicle_id: route.vehicle_id,
            included_order_ids: route.included_order_ids(),
            waypoints: route
                .activities
                .iter()
                .map(|activity| Waypoint {
                    order_id: activity.order_id,
                    activity_type: activity.activity_type,
                    lat: activity.lat,
                    lon: activity.lon,
                    sequence: activity.sequence,
                    estimated_arrival_offset_millis: route
                        .start_time
                        .duration_until(activity.arrival_time)
                        .as_millis() as i64,
                })
                .collect(),
            total_distance_meters: route.total_distance_meters,
            total_time_millis: route.total_time_millis,
        }
    }
}

#[cfg(test)]
mod tests {
    use jiff::SignedDuration;
    use serde_json::json;
    use waypoint_optimizer::solution::Activity;

    use crate::test_utils::uuid;

    use super::*;

    #[test]
    fn test_event_shape() {
        let start: Timestamp = "2025-03-10T08:00:00Z".parse().unwrap();
        let arrival = start + SignedDuration::from_mins(12);
        let route = Route {
            vehicle_id: uuid(1),
            driver_id: None,
            start_time: start,
            activities: vec![
                Activity {
                    order_id: uuid(7),
                    activity_type: ActivityType::Pickup,
                    lat: 52.0,
                    lon: 21.0,
                    arrival_time: arrival,
                    end_time: arrival + SignedDuration::from_mins(5),
                    sequence: 1,
                },
                Activity {
                    order_id: uuid(7),
                    activity_type: ActivityType::Delivery,
                    lat: 52.1,
                    lon: 21.1,
                    arrival_time: arrival + SignedDuration::from_mins(20),
                    end_time: arrival + SignedDuration::from_mins(25),
                    sequence: 2,
                },
            ],
            total_distance_meters: 15_000.0,
            total_time_millis: 37 * 60_000,
        };

        let event = RoutePlannedEvent::from_route(uuid(99), start, &route);
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["includedOrderIds"], json!([uuid(7)]));
        assert_eq!(value["waypoints"][0]["type"], json!("PICKUP"));
        assert_eq!(
            value["waypoints"][0]["estimatedArrivalOffsetMillis"],
            json!(12 * 60_000)
        );
        assert_eq!(
            value["waypoints"][1]["estimatedArrivalOffsetMillis"],
            json!(32 * 60_000)
        );
        assert_eq!(value["totalDistanceMeters"], json!(15_000.0));
        assert_eq!(value["createdAt"], json!("2025-03-10T08:00:00Z"));
    }

    #[test]
    fn test_one_event_per_route() {
        let plan = RoutePlan::new(uuid(1), RoutingSolution::empty());
        assert!(plan.events().is_empty());
    }
}
