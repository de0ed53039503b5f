use std::{
    cmp::Ordering,
    iter,
    ops::{Add, AddAssign, Sub},
};

use fxhash::FxHashMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Differences below this are treated as noise when comparing scores.
pub const SCORE_EPSILON: f64 = 1e-6;

/// Lexicographic `(hard, soft)` cost. Lower is better and any hard cost
/// outweighs every soft cost.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Score {
    pub hard_score: f64,
    pub soft_score: f64,
}

impl Score {
    pub const ZERO: Score = Score {
        hard_score: 0.0,
        soft_score: 0.0,
    };

    pub fn new(hard_score: f64, soft_score: f64) -> Self {
        Score {
            hard_score,
            soft_score,
        }
    }

    pub fn hard(hard_score: f64) -> Self {
        Score {
            hard_score,
            soft_score: 0.0,
        }
    }

    pub fn soft(soft_score: f64) -> Self {
        Score {
            hard_score: 0.0,
            soft_score,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.hard_score > SCORE_EPSILON
    }

    /// Whether a change of `self` makes a solution strictly better.
    pub fn is_improvement(&self) -> bool {
        if self.hard_score < -SCORE_EPSILON {
            return true;
        }

        self.hard_score <= SCORE_EPSILON && self.soft_score < -SCORE_EPSILON
    }
}

impl Default for Score {
    fn default() -> Self {
        Score::ZERO
    }
}

impl Eq for Score {}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        self.hard_score
            .total_cmp(&other.hard_score)
            .then_with(|| self.soft_score.total_cmp(&other.soft_score))
    }
}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl iter::Sum for Score {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Score::ZERO, |acc, score| acc + score)
    }
}

impl Add<Score> for Score {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Score {
            hard_score: self.hard_score + other.hard_score,
            soft_score: self.soft_score + other.soft_score,
        }
    }
}

impl AddAssign<Score> for Score {
    fn add_assign(&mut self, other: Score) {
        self.hard_score += other.hard_score;
        self.soft_score += other.soft_score;
    }
}

impl Sub<Score> for Score {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        Score {
            hard_score: self.hard_score - other.hard_score,
            soft_score: self.soft_score - other.soft_score,
        }
    }
}

/// Per-constraint breakdown of a solution score.
#[derive(Default, Clone, Debug, Serialize, JsonSchema)]
pub struct ScoreAnalysis {
    pub scores: FxHashMap<&'static str, Score>,
}

impl ScoreAnalysis {
    pub fn add(&mut self, constraint: &'static str, score: Score) {
        *self.scores.entry(constraint).or_insert(Score::ZERO) += score;
    }

    pub fn total_score(&self) -> Score {
        self.scores.values().copied().sum()
    }
}
