use jiff::{
    SignedDuration, Timestamp, civil,
    tz::{Offset, TimeZone},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::PlanningError, problem::location::DEFAULT_DEPOT};

use super::location::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleSelectionMode {
    /// Every compliant vehicle, whatever its availability flag says.
    All,
    #[default]
    Available,
    /// Available vehicles attached to the profile's depot.
    DepotSpecific,
}

/// Named bundle of optimization parameters.
#[derive(Debug, Clone)]
pub struct OptimizationProfile {
    pub id: Option<Uuid>,
    pub code: String,
    pub name: String,
    pub max_route_duration: Option<SignedDuration>,
    pub shift_start: civil::Time,
    pub vehicle_selection_mode: VehicleSelectionMode,
    pub depot_id: Option<String>,
    pub depot: Location,
    pub termination: Option<SignedDuration>,
    pub time_zone: TimeZone,
}

impl Default for OptimizationProfile {
    fn default() -> Self {
        Self {
            id: None,
            code: String::from("DEFAULT"),
            name: String::from("Default"),
            max_route_duration: None,
            shift_start: civil::time(8, 0, 0, 0),
            vehicle_selection_mode: VehicleSelectionMode::default(),
            depot_id: None,
            depot: DEFAULT_DEPOT,
            termination: None,
            time_zone: TimeZone::UTC,
        }
    }
}

impl OptimizationProfile {
    pub fn validate(&self) -> Result<(), PlanningError> {
        if let Some(duration) = self.max_route_duration {
            if !duration.is_positive() {
                return Err(PlanningError::invalid(
                    "profile.max_route_duration",
                    format!("{duration} must be positive"),
                ));
            }
        }

        if let Some(termination) = self.termination {
            if !termination.is_positive() {
                return Err(PlanningError::invalid(
                    "profile.termination",
                    format!("{termination} must be positive"),
                ));
            }
        }

        if self.vehicle_selection_mode == VehicleSelectionMode::DepotSpecific
            && self.depot_id.is_none()
        {
            return Err(PlanningError::invalid(
                "profile.depot_id",
                "required when vehicle selection is depot specific",
            ));
        }

        Location::try_from_lat_lon("profile.depot", self.depot.lat(), self.depot.lon())?;

        if self.time_zone_name().is_none() {
            return Err(PlanningError::invalid(
                "profile.time_zone",
                "must be an IANA zone or a fixed offset",
            ));
        }

        Ok(())
    }

    /// Name the time zone is written out as: its IANA name, or `+HH:MM` for
    /// a fixed offset. `None` for zones that have neither.
    pub fn time_zone_name(&self) -> Option<String> {
        if let Some(name) = self.time_zone.iana_name() {
            return Some(name.to_owned());
        }

        let seconds = self.time_zone.to_fixed_offset().ok()?.seconds();
        if seconds == 0 {
            return Some(String::from("UTC"));
        }
        let sign = if seconds < 0 { '-' } else { '+' };
        let seconds = seconds.unsigned_abs();
        let (hours, minutes, rest) = (seconds / 3600, seconds % 3600 / 60, seconds % 60);
        if rest == 0 {
            Some(format!("{sign}{hours:02}:{minutes:02}"))
        } else {
            Some(format!("{sign}{hours:02}:{minutes:02}:{rest:02}"))
        }
    }

    /// Start of the shift routes are planned for, seen from `now`.
    ///
    /// Returns `now` while today's shift is running, otherwise the next shift
    /// start.
    pub fn route_start(&self, now: Timestamp) -> Timestamp {
        let zoned = now.to_zoned(self.time_zone.clone());
        let today = zoned.date();

        let Ok(shift_start) = today
            .to_datetime(self.shift_start)
            .to_zoned(self.time_zone.clone())
        else {
            return now;
        };
        let shift_start = shift_start.timestamp();

        if now < shift_start {
            return shift_start;
        }

        let shift_running = match self.max_route_duration {
            Some(duration) => shift_start
                .checked_add(duration)
                .map(|shift_end| now < shift_end)
                .unwrap_or(true),
            None => true,
        };

        if shift_running {
            return now;
        }

        today
            .tomorrow()
            .and_then(|tomorrow| {
                tomorrow
                    .to_datetime(self.shift_start)
                    .to_zoned(self.time_zone.clone())
            })
            .map(|zoned| zoned.timestamp())
            .unwrap_or(now)
    }
}

/// Resolves an IANA name or a `+HH:MM[:SS]` offset.
pub fn parse_time_zone(name: &str) -> Result<TimeZone, PlanningError> {
    if name.eq_ignore_ascii_case("UTC") {
        return Ok(TimeZone::UTC);
    }

    let (sign, rest) = if let Some(rest) = name.strip_prefix('+') {
        (1, rest)
    } else if let Some(rest) = name.strip_prefix('-') {
        (-1, rest)
    } else {
        return TimeZone::get(name)
            .map_err(|error| PlanningError::invalid("profile.time_zone", error.to_string()));
    };

    let parts = rest
        .split(':')
        .map(|part| part.parse::<u16>().map(i32::from))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|error| PlanningError::invalid("profile.time_zone", error.to_string()))?;
    let seconds = match parts.as_slice() {
        [hours] => hours * 3600,
        [hours, minutes] if *minutes < 60 => hours * 3600 + minutes * 60,
        [hours, minutes, rest] if *minutes < 60 && *rest < 60 => {
            hours * 3600 + minutes * 60 + rest
        }
        _ => {
            return Err(PlanningError::invalid(
                "profile.time_zone",
                format!("{name} is not an offset"),
            ));
        }
    };

    let offset = Offset::from_seconds(sign * seconds)
        .map_err(|error| PlanningError::invalid("profile.time_zone", error.to_string()))?;
    Ok(TimeZone::fixed(offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> OptimizationProfile {
        OptimizationProfile {
            max_route_duration: Some(SignedDuration::from_hours(8)),
            ..OptimizationProfile::default()
        }
    }

    #[test]
    fn test_route_start_before_shift() {
        let now: Timestamp = "2025-06-10T06:30:00Z".parse().unwrap();
        let expected: Timestamp = "2025-06-10T08:00:00Z".parse().unwrap();
        assert_eq!(profile().route_start(now), expected);
    }

    #[test]
    fn test_route_start_during_shift() {
        let now: Timestamp = "2025-06-10T11:00:00Z".parse().unwrap();
        assert_eq!(profile().route_start(now), now);
    }

    #[test]
    fn test_route_start_after_shift_plans_next_day() {
        let now: Timestamp = "2025-06-10T22:00:00Z".parse().unwrap();
        let expected: Timestamp = "2025-06-11T08:00:00Z".parse().unwrap();
        assert_eq!(profile().route_start(now), expected);
    }

    #[test]
    fn test_validate_rejects_non_positive_duration() {
        let profile = OptimizationProfile {
            max_route_duration: Some(SignedDuration::ZERO),
            ..OptimizationProfile::default()
        };
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_fixed_offset_names_resolve_back() {
        for name in ["+02:00", "-05:30", "+00:00:30", "UTC"] {
            let profile = OptimizationProfile {
                time_zone: parse_time_zone(name).unwrap(),
                ..OptimizationProfile::default()
            };
            let written = profile.time_zone_name().unwrap();
            assert_eq!(parse_time_zone(&written).unwrap(), profile.time_zone);
        }
        assert_eq!(
            parse_time_zone("+02").unwrap(),
            TimeZone::fixed(Offset::from_seconds(7200).unwrap())
        );
    }

    #[test]
    fn test_malformed_offsets_are_rejected() {
        for name in ["+2:75", "+xx", "-01:00:00:00", "+99:00"] {
            assert!(parse_time_zone(name).is_err(), "{name}");
        }
    }

    #[test]
    fn test_depot_specific_requires_depot() {
        let profile = OptimizationProfile {
            vehicle_selection_mode: VehicleSelectionMode::DepotSpecific,
            ..OptimizationProfile::default()
        };
        assert!(profile.validate().is_err());
    }
}
