//! Simulation data types.

use serde::{Deserialize, Serialize};

/// Record of a trial at a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Number of completed steps.
    pub step: usize,

    /// Total virus population after the step.
    pub total_pop: usize,

    /// Number of particles resistant to every tracked drug.
    pub resistant_pop: usize,
}
