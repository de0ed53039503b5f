use jiff::{SignedDuration, Timestamp};

use crate::{error::PlanningError, problem::kmh::Kmh};

#[derive(Clone, Debug)]
pub struct SolverParams {
    pub terminations: Vec<Termination>,
    pub threads: Threads,
    pub weights: ObjectiveWeights,

    pub average_speed: Kmh,
    /// Time spent at every stop. Must be positive so arrivals on a route are
    /// strictly increasing.
    pub service_duration: SignedDuration,

    /// Moment routes are planned from. `None` means the time of the call.
    pub planning_start: Option<Timestamp>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Termination {
    Duration(SignedDuration),
    Iterations(usize),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Threads {
    Single,
    Auto,
    Multi(usize),
}

impl Threads {
    pub fn number_of_threads(&self) -> usize {
        match self {
            Threads::Single => 1,
            Threads::Multi(num) => (*num).max(1),
            Threads::Auto => std::thread::available_parallelism().map_or(1, |n| n.get()),
        }
    }
}

/// Soft objective weights. Hard constraints are not weighted: they live on
/// their own score level.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectiveWeights {
    pub distance_per_km: f64,
    pub lateness_per_minute: f64,
    pub unassigned_order: f64,
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        Self {
            distance_per_km: 1.0,
            lateness_per_minute: 10.0,
            unassigned_order: 100_000.0,
        }
    }
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            terminations: vec![
                Termination::Iterations(10_000),
                Termination::Duration(SignedDuration::from_secs(5)),
            ],
            threads: Threads::Auto,
            weights: ObjectiveWeights::default(),
            average_speed: Kmh::default(),
            service_duration: SignedDuration::from_mins(5),
            planning_start: None,
        }
    }
}

impl SolverParams {
    pub fn validate(&self) -> Result<(), PlanningError> {
        if !self.service_duration.is_positive() {
            return Err(PlanningError::invalid(
                "solver.service_duration",
                "must be positive",
            ));
        }

        if !(self.average_speed.value().is_finite() && self.average_speed.value() > 0.0) {
            return Err(PlanningError::invalid(
                "solver.average_speed",
                format!("{} km/h must be positive", self.average_speed.value()),
            ));
        }

        let weights = [
            ("solver.weights.distance_per_km", self.weights.distance_per_km),
            (
                "solver.weights.lateness_per_minute",
                self.weights.lateness_per_minute,
            ),
            ("solver.weights.unassigned_order", self.weights.unassigned_order),
        ];
        for (field, weight) in weights {
            crate::error::ensure_non_negative(field, weight)?;
        }

        for termination in &self.terminations {
            if let Termination::Duration(duration) = termination {
                if duration.is_negative() {
                    return Err(PlanningError::invalid(
                        "solver.time_limit",
                        format!("{duration} is negative"),
                    ));
                }
            }
        }

        Ok(())
    }

    pub fn time_limit(&self) -> Option<SignedDuration> {
        self.terminations
            .iter()
            .filter_map(|termination| match termination {
                Termination::Duration(duration) => Some(*duration),
                _ => None,
            })
            .min()
    }

    pub fn max_iterations(&self) -> Option<usize> {
        self.terminations
            .iter()
            .filter_map(|termination| match termination {
                Termination::Iterations(iterations) => Some(*iterations),
                _ => None,
            })
            .min()
    }

    /// Replaces every duration termination with `time_limit`.
    pub fn with_time_limit(&self, time_limit: SignedDuration) -> SolverParams {
        let mut params = self.clone();
        params
            .terminations
            .retain(|termination| !matches!(termination, Termination::Duration(_)));
        params.terminations.push(Termination::Duration(time_limit));
        params
    }
}
