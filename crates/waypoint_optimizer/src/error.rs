use thiserror::Error;

/// Errors raised before a planning run starts. Infeasibility, empty inputs,
/// timeouts and cancellation are never errors: they are reported through the
/// solution diagnostics instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlanningError {
    #[error("invalid {field}: {reason}")]
    InvalidInput { field: String, reason: String },
}

impl PlanningError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        PlanningError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

pub(crate) fn ensure_non_negative(field: &str, value: f64) -> Result<(), PlanningError> {
    if !value.is_finite() {
        return Err(PlanningError::invalid(field, format!("{value} is not finite")));
    }

    if value < 0.0 {
        return Err(PlanningError::invalid(field, format!("{value} is negative")));
    }

    Ok(())
}
