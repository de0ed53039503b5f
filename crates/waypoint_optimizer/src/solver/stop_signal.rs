use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use jiff::SignedDuration;

use crate::solution::TerminationReason;

/// Shared cancellation flag. Cloning hands out another handle to the same
/// flag.
#[derive(Clone, Debug, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Time and iteration budget of one search, plus its cancellation flag.
pub(crate) struct SearchBudget<'a> {
    deadline: Option<Instant>,
    max_iterations: Option<usize>,
    signal: &'a StopSignal,
}

impl<'a> SearchBudget<'a> {
    pub fn new(
        time_limit: Option<SignedDuration>,
        max_iterations: Option<usize>,
        signal: &'a StopSignal,
    ) -> Self {
        let deadline = time_limit.map(|limit| {
            let limit = Duration::try_from(limit).unwrap_or(Duration::ZERO);
            Instant::now() + limit
        });

        SearchBudget {
            deadline,
            max_iterations,
            signal,
        }
    }

    /// Why the search must stop before running iteration `iteration`, if it
    /// must.
    pub fn exhausted(&self, iteration: usize) -> Option<TerminationReason> {
        if let Some(reason) = self.interrupted() {
            return Some(reason);
        }

        if self
            .max_iterations
            .is_some_and(|max_iterations| iteration >= max_iterations)
        {
            return Some(TerminationReason::IterationLimit);
        }

        None
    }

    /// Cancellation or timeout, ignoring the iteration limit.
    pub fn interrupted(&self) -> Option<TerminationReason> {
        if self.signal.is_stopped() {
            return Some(TerminationReason::Cancelled);
        }

        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Some(TerminationReason::TimeLimit);
        }

        None
    }
}
