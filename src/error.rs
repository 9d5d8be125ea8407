//! Error types for the population model.

use thiserror::Error;

/// Construction-time validation errors.
///
/// A running simulation never fails: every error here is raised when a
/// particle or a patient is built from invalid parameters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    /// A probability argument lies outside `[0, 1]` (or is NaN).
    #[error("invalid probability: {name} must be in the range [0, 1], but is {value}")]
    InvalidProbability { name: &'static str, value: f64 },

    /// The maximum population of a patient is not positive.
    #[error("invalid capacity: maximum population must be positive, but is {value}")]
    InvalidCapacity { value: usize },
}
