//! Progress and schedule adjustment for stored plans.
//!
//! Pure functions: each takes a plan by reference and returns an adjusted
//! copy. The whole batch is validated before anything is changed, so on
//! error the caller's plan is exactly what it was.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use skillmap_db::models::{SkillMap, SkillProgram};
use tracing::{debug, warn};

use crate::error::SkillMapError;

/// Days the schedule moves per unit of impact factor.
const DAYS_PER_IMPACT: f64 = 30.0;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// A progress report against one skill-map node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeProgress {
    pub node_id: String,
    pub completion_percentage: f64,
    /// Hours spent; recorded by callers, not used for scheduling.
    #[serde(default)]
    pub time_spent: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessment_results: Option<serde_json::Value>,
}

/// A progress report against one day of a skill program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayProgress {
    pub day: u32,
    pub completion_percentage: f64,
    #[serde(default)]
    pub time_spent: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Something in the learner's life that moves the schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextChange {
    /// Free-form tag such as "travel" or "schedule_change".
    pub change_type: String,
    #[serde(default)]
    pub description: String,
    /// -1.0 (pulls completion 30 days earlier) to 1.0 (pushes it 30 days later).
    pub impact_factor: f64,
    #[serde(default)]
    pub affected_period: BTreeMap<String, DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// An adjusted plan plus the schedule shift that was applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressOutcome<T> {
    pub plan: T,
    /// `None` when no context changes were supplied.
    pub adjustment_days: Option<i64>,
}

impl<T> ProgressOutcome<T> {
    /// One-line description of the schedule shift, if there was one.
    pub fn summary(&self) -> Option<String> {
        let days = self.adjustment_days?;
        let unit = if days.abs() == 1 { "day" } else { "days" };
        match days {
            0 => None,
            d if d < 0 => Some(format!("expected completion moved {} {unit} earlier", -d)),
            d => Some(format!("expected completion moved {d} {unit} later")),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn check_percentage(target: impl FnOnce() -> String, value: f64) -> Result<(), SkillMapError> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(SkillMapError::InvalidProgressValue {
            target: target(),
            value,
        })
    }
}

/// Signed day shift for a batch of context changes.
///
/// Sum of impact factors times 30, truncated toward zero.
pub fn schedule_shift_days(changes: &[ContextChange]) -> Result<Option<i64>, SkillMapError> {
    if changes.is_empty() {
        return Ok(None);
    }
    for change in changes {
        let f = change.impact_factor;
        if !f.is_finite() || !(-1.0..=1.0).contains(&f) {
            return Err(SkillMapError::InvalidImpactFactor {
                change_type: change.change_type.clone(),
                value: f,
            });
        }
    }
    let total: f64 = changes.iter().map(|c| c.impact_factor).sum();
    Ok(Some((total * DAYS_PER_IMPACT).trunc() as i64))
}

fn shifted(date: DateTime<Utc>, days: Option<i64>) -> Result<DateTime<Utc>, SkillMapError> {
    match days {
        None | Some(0) => Ok(date),
        Some(d) => Duration::try_days(d)
            .and_then(|shift| date.checked_add_signed(shift))
            .ok_or_else(|| {
                SkillMapError::InvalidSchedule(format!("shifting {date} by {d} days is out of range"))
            }),
    }
}

// ---------------------------------------------------------------------------
// Adjusters
// ---------------------------------------------------------------------------

/// Apply node progress reports and context changes to a skill map.
///
/// Reports whose `node_id` is not in the map are ignored. Total hours are
/// never recomputed.
pub fn adjust_skill_map(
    map: &SkillMap,
    reports: &[NodeProgress],
    changes: &[ContextChange],
) -> Result<ProgressOutcome<SkillMap>, SkillMapError> {
    for report in reports {
        if map.nodes.contains_key(&report.node_id) {
            check_percentage(|| format!("node {:?}", report.node_id), report.completion_percentage)?;
        }
    }
    let adjustment_days = schedule_shift_days(changes)?;
    let expected_completion_date = shifted(map.expected_completion_date, adjustment_days)?;

    let mut adjusted = map.clone();
    for report in reports {
        match adjusted.nodes.get_mut(&report.node_id) {
            Some(node) => {
                node.record_progress(report.completion_percentage);
                debug!(node = %report.node_id, progress = node.progress, status = %node.status, "recorded progress");
            }
            None => warn!(skill_map = %map.id, node = %report.node_id, "ignoring progress for unknown node"),
        }
    }
    adjusted.expected_completion_date = expected_completion_date;

    Ok(ProgressOutcome {
        plan: adjusted,
        adjustment_days,
    })
}

/// Apply day progress reports and context changes to a skill program.
///
/// Reports for days the program does not contain are ignored.
pub fn adjust_skill_program(
    program: &SkillProgram,
    reports: &[DayProgress],
    changes: &[ContextChange],
) -> Result<ProgressOutcome<SkillProgram>, SkillMapError> {
    let has_day = |day: u32| program.tasks.iter().any(|t| t.day == day);
    for report in reports {
        if has_day(report.day) {
            check_percentage(|| format!("day {}", report.day), report.completion_percentage)?;
        }
    }
    let adjustment_days = schedule_shift_days(changes)?;
    let expected_completion_date = shifted(program.expected_completion_date, adjustment_days)?;

    let mut adjusted = program.clone();
    for report in reports {
        match adjusted.tasks.iter_mut().find(|t| t.day == report.day) {
            Some(task) => {
                task.record_progress(report.completion_percentage);
                debug!(day = report.day, progress = task.progress, status = %task.status, "recorded progress");
            }
            None => warn!(program = %program.id, day = report.day, "ignoring progress for unknown day"),
        }
    }
    adjusted.expected_completion_date = expected_completion_date;

    Ok(ProgressOutcome {
        plan: adjusted,
        adjustment_days,
    })
}
