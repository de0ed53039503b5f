//! Planner configuration, read from TOML.
//!
//! ```toml
//! [auto_plan]
//! min_batch_size = 5
//! schedule = { daily_at = ["22:00:00", "02:00:00"] }
//!
//! [solver]
//! time_limit = "30s"
//! ```

use std::{path::Path, time::Duration};

use jiff::{SignedDuration, Timestamp, civil, tz::TimeZone};
use serde::{Deserialize, Serialize};
use waypoint_optimizer::{
    problem::{kmh::Kmh, optimization_profile::OptimizationProfile},
    solver::solver_params::{ObjectiveWeights, SolverParams, Termination, Threads},
};

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub auto_plan: AutoPlanConfig,
    pub solver: SolverConfig,
    pub fleet: FleetConfig,
    pub tracking: TrackingConfig,
}

impl PlannerConfig {
    /// Reads `path`, or returns the defaults when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_toml_str(&contents),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(error) => Err(error.into()),
        }
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: PlannerConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.auto_plan.validate()?;
        self.solver
            .solver_params()
            .validate()
            .map_err(|error| ConfigError::Invalid(error.to_string()))?;
        self.tracking.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoPlanConfig {
    pub enabled: bool,
    /// Smallest batch a scheduled cycle optimizes. Other triggers ignore it.
    pub min_batch_size: usize,
    /// Larger batches are split and planned chunk by chunk.
    pub max_batch_size: usize,
    pub urgent_auto_reoptimize: bool,
    /// Age of the oldest queued order that forces an emergency cycle.
    pub max_batch_age: SignedDuration,
    pub stale_check_interval: SignedDuration,
    pub time_zone: String,
    pub schedule: BatchSchedule,
    /// Code of the optimization profile batches are planned with.
    pub default_profile: String,
}

impl Default for AutoPlanConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_batch_size: 1,
            max_batch_size: 1000,
            urgent_auto_reoptimize: false,
            max_batch_age: SignedDuration::from_hours(4),
            stale_check_interval: SignedDuration::from_hours(1),
            time_zone: String::from("UTC"),
            schedule: BatchSchedule::default(),
            default_profile: String::from("DEFAULT"),
        }
    }
}

impl AutoPlanConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_batch_size == 0 {
            return Err(ConfigError::Invalid(
                "auto_plan.max_batch_size must be at least 1".to_string(),
            ));
        }
        if self.min_batch_size > self.max_batch_size {
            return Err(ConfigError::Invalid(format!(
                "auto_plan.min_batch_size {} exceeds max_batch_size {}",
                self.min_batch_size, self.max_batch_size
            )));
        }
        if !self.max_batch_age.is_positive() || !self.stale_check_interval.is_positive() {
            return Err(ConfigError::Invalid(
                "auto_plan durations must be positive".to_string(),
            ));
        }

        self.schedule.validate()?;
        self.resolve_time_zone()?;
        Ok(())
    }

    pub fn resolve_time_zone(&self) -> Result<TimeZone, ConfigError> {
        if self.time_zone.eq_ignore_ascii_case("UTC") {
            return Ok(TimeZone::UTC);
        }

        TimeZone::get(&self.time_zone).map_err(|error| {
            ConfigError::Invalid(format!("auto_plan.time_zone {}: {error}", self.time_zone))
        })
    }

    /// Profile used when the profile source cannot provide the configured one.
    pub fn fallback_profile(&self) -> OptimizationProfile {
        let defaults = OptimizationProfile::default();
        OptimizationProfile {
            name: self.default_profile.clone(),
            code: self.default_profile.clone(),
            time_zone: self.resolve_time_zone().unwrap_or(defaults.time_zone.clone()),
            ..defaults
        }
    }
}

/// When scheduled cycles run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchSchedule {
    Every { every: SignedDuration },
    DailyAt { daily_at: Vec<civil::Time> },
}

impl Default for BatchSchedule {
    fn default() -> Self {
        BatchSchedule::Every {
            every: SignedDuration::from_mins(15),
        }
    }
}

impl BatchSchedule {
    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            BatchSchedule::Every { every } if !every.is_positive() => Err(ConfigError::Invalid(
                format!("auto_plan.schedule.every {every} must be positive"),
            )),
            BatchSchedule::DailyAt { daily_at } if daily_at.is_empty() => Err(
                ConfigError::Invalid("auto_plan.schedule.daily_at is empty".to_string()),
            ),
            _ => Ok(()),
        }
    }

    /// Time left from `now` until the next scheduled cycle.
    pub fn duration_until_next(&self, now: Timestamp, time_zone: &TimeZone) -> Duration {
        let wait = match self {
            BatchSchedule::Every { every } => *every,
            BatchSchedule::DailyAt { daily_at } => {
                let today = now.to_zoned(time_zone.clone()).date();
                let days = [Some(today), today.tomorrow().ok()];

                days.into_iter()
                    .flatten()
                    .flat_map(|day| daily_at.iter().map(move |time| day.to_datetime(*time)))
                    .filter_map(|datetime| datetime.to_zoned(time_zone.clone()).ok())
                    .map(|zoned| zoned.timestamp())
                    .filter(|&timestamp| timestamp > now)
                    .min()
                    .map(|next| now.duration_until(next))
                    .unwrap_or(SignedDuration::from_hours(24))
            }
        };

        Duration::try_from(wait).unwrap_or(Duration::ZERO)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub time_limit: SignedDuration,
    pub max_iterations: usize,
    pub average_speed_kmh: f64,
    pub service_duration: SignedDuration,
    pub distance_per_km: f64,
    pub lateness_per_minute: f64,
    pub unassigned_order: f64,
    /// Evaluates route pairs on all cores.
    pub parallel: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        let params = SolverParams::default();
        let weights = ObjectiveWeights::default();
        Self {
            time_limit: params.time_limit().unwrap_or(SignedDuration::from_secs(5)),
            max_iterations: params.max_iterations().unwrap_or(10_000),
            average_speed_kmh: params.average_speed.value(),
            service_duration: params.service_duration,
            distance_per_km: weights.distance_per_km,
            lateness_per_minute: weights.lateness_per_minute,
            unassigned_order: weights.unassigned_order,
            parallel: true,
        }
    }
}

impl SolverConfig {
    pub fn solver_params(&self) -> SolverParams {
        SolverParams {
            terminations: vec![
                Termination::Iterations(self.max_iterations),
                Termination::Duration(self.time_limit),
            ],
            threads: if self.parallel {
                Threads::Auto
            } else {
                Threads::Single
            },
            weights: ObjectiveWeights {
                distance_per_km: self.distance_per_km,
                lateness_per_minute: self.lateness_per_minute,
                unassigned_order: self.unassigned_order,
            },
            average_speed: Kmh::new(self.average_speed_kmh),
            service_duration: self.service_duration,
            planning_start: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    pub require_insurance: bool,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            require_insurance: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub capacity: usize,
    pub ttl: SignedDuration,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            ttl: SignedDuration::from_mins(30),
        }
    }
}

impl TrackingConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 || !self.ttl.is_positive() {
            return Err(ConfigError::Invalid(
                "tracking.capacity and tracking.ttl must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
