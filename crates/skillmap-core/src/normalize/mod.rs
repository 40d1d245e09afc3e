//! Plan normalization: loosely-structured generator output to validated
//! plans ready for storage.
//!
//! Pure functions over values. The caller supplies `now` so results are
//! reproducible.

mod fields;
mod program;
mod tree;

use chrono::{DateTime, Duration, Utc};
use skillmap_db::models::SkillNode;

use crate::error::SkillMapError;

pub use program::normalize_skill_program;
pub use tree::normalize_skill_map;

/// Number of daily tasks in a skill program.
pub const PROGRAM_DAYS: u32 = 30;

const MILLIS_PER_WEEK: f64 = 7.0 * 24.0 * 60.0 * 60.0 * 1000.0;

/// Sum of `estimated_hours` over leaf nodes. Interior nodes contribute zero.
pub fn leaf_hours<'a>(nodes: impl IntoIterator<Item = &'a SkillNode>) -> f64 {
    nodes
        .into_iter()
        .filter(|n| n.is_leaf())
        .map(|n| n.estimated_hours)
        .sum()
}

/// `now` plus `total_hours / weekly_hours` weeks, at millisecond precision.
pub fn completion_after_hours(
    now: DateTime<Utc>,
    total_hours: f64,
    weekly_hours: f64,
) -> Result<DateTime<Utc>, SkillMapError> {
    let out_of_range = || {
        SkillMapError::InvalidSchedule(format!(
            "{total_hours} hours at {weekly_hours} hours/week is out of range"
        ))
    };
    let millis = (total_hours / weekly_hours * MILLIS_PER_WEEK).round();
    if !millis.is_finite() || millis < 0.0 || millis > i64::MAX as f64 {
        return Err(out_of_range());
    }
    let offset = Duration::try_milliseconds(millis as i64).ok_or_else(out_of_range)?;
    now.checked_add_signed(offset).ok_or_else(out_of_range)
}
