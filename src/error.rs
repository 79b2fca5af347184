//! Error types for the engine.

use thiserror::Error;

use crate::registry::SimulationId;

/// Errors surfaced to callers of the engine.
///
/// Numeric work inside a step never fails; everything here is a usage error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    /// A construction parameter is outside its valid range.
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// The requested simulation was never created or has been removed.
    #[error("No simulation instance with id {0}")]
    NoInstance(SimulationId),
}

pub type Result<T> = std::result::Result<T, SimError>;

impl SimError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        SimError::InvalidParameter { name, reason: reason.into() }
    }
}
