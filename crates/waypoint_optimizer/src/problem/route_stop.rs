use jiff::Timestamp;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{problem::location::Location, solution::ActivityType};

/// A remaining stop of a vehicle already on the road.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RouteStop {
    pub stop_id: String,
    pub order_id: Uuid,
    #[serde(rename = "type", default = "RouteStop::default_type")]
    pub activity_type: ActivityType,
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planned_arrival: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u32>,
}

impl RouteStop {
    fn default_type() -> ActivityType {
        ActivityType::Delivery
    }

    pub fn location(&self) -> Location {
        Location::from_lat_lon(self.lat, self.lon)
    }
}
