use geo::{Distance, Haversine};

use crate::{define_index_newtype, error::PlanningError, problem::meters::Meters};

define_index_newtype!(LocationIdx, Location);

/// Depot used when neither the profile nor the vehicle names a start point.
pub const DEFAULT_DEPOT: Location = Location::from_lat_lon(52.2297, 21.0122);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    point: geo::Point,
}

impl Location {
    pub const fn from_lat_lon(lat: f64, lon: f64) -> Self {
        Self {
            point: geo::Point(geo::Coord { x: lon, y: lat }),
        }
    }

    /// Builds a location from external coordinates, rejecting values that
    /// cannot be placed on the globe.
    pub fn try_from_lat_lon(field: &str, lat: f64, lon: f64) -> Result<Self, PlanningError> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(PlanningError::invalid(
                field,
                format!("latitude {lat} is out of range"),
            ));
        }

        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(PlanningError::invalid(
                field,
                format!("longitude {lon} is out of range"),
            ));
        }

        Ok(Self::from_lat_lon(lat, lon))
    }

    pub fn lon(&self) -> f64 {
        self.point.x()
    }

    pub fn lat(&self) -> f64 {
        self.point.y()
    }

    pub fn haversine_distance(&self, to: &Location) -> Meters {
        Meters::new(Haversine.distance(self.point, to.point))
    }
}

impl From<&Location> for geo::Point<f64> {
    fn from(location: &Location) -> Self {
        location.point
    }
}
