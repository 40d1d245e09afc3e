//! Error type shared by the normalizer, the adjuster and the service layer.

use thiserror::Error;
use uuid::Uuid;

use crate::generator::LlmError;

/// Every failure a generate or update request can end with.
///
/// Each variant is terminal for the current request; nothing is retried.
#[derive(Debug, Error)]
pub enum SkillMapError {
    #[error("malformed plan entry {id:?}: {reason}")]
    MalformedPlan { id: String, reason: String },

    #[error("invalid tree structure: {0}")]
    InvalidTreeStructure(String),

    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("invalid progress value {value} for {target} (expected 0 to 100)")]
    InvalidProgressValue { target: String, value: f64 },

    #[error("invalid impact factor {value} on context change {change_type:?} (expected -1.0 to 1.0)")]
    InvalidImpactFactor { change_type: String, value: f64 },

    #[error("plan {0} not found")]
    PlanNotFound(Uuid),

    #[error("plan {id} was modified concurrently (read at version {expected_version})")]
    ConcurrentUpdate { id: Uuid, expected_version: i64 },

    #[error("plan generation failed: {0}")]
    Generator(#[from] LlmError),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl SkillMapError {
    pub(crate) fn malformed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedPlan {
            id: id.into(),
            reason: reason.into(),
        }
    }
}
