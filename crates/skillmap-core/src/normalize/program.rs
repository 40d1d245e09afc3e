//! Thirty-day program normalization.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value};
use skillmap_db::models::{DailyTask, NewSkillProgram, NodeStatus};
use tracing::debug;

use super::PROGRAM_DAYS;
use super::fields::Entry;
use crate::error::SkillMapError;
use crate::generator::GenerationRequest;

fn read_task(id: &str, value: &Value) -> Result<(i64, DailyTask), SkillMapError> {
    let entry = Entry::new(id, value)?;
    let day = entry
        .integer("day")?
        .ok_or_else(|| SkillMapError::malformed(id, "missing required field `day`"))?;
    let task = DailyTask {
        day: 0,
        name: entry.required_str("name")?,
        description: entry.required_str("description")?,
        difficulty: entry.required_str("difficulty")?,
        estimated_hours: entry.required_hours("estimated_hours")?,
        resources: entry.resources()?,
        progress: 0.0,
        status: NodeStatus::NotStarted,
    };
    Ok((day, task))
}

/// Turn raw generator output into a validated, unsaved 30-day program.
///
/// Tasks come back sorted by day. The entry keys are only used in error
/// messages; the `day` field is authoritative.
pub fn normalize_skill_program(
    days: &Map<String, Value>,
    description: Option<&str>,
    request: &GenerationRequest,
    now: DateTime<Utc>,
) -> Result<NewSkillProgram, SkillMapError> {
    let mut by_day: BTreeMap<u32, DailyTask> = BTreeMap::new();
    for (id, value) in days {
        let (day, mut task) = read_task(id, value)?;
        let day = u32::try_from(day)
            .ok()
            .filter(|d| (1..=PROGRAM_DAYS).contains(d))
            .ok_or_else(|| {
                SkillMapError::InvalidSchedule(format!(
                    "entry {id:?} has day {day}, expected 1 to {PROGRAM_DAYS}"
                ))
            })?;
        task.day = day;
        if by_day.insert(day, task).is_some() {
            return Err(SkillMapError::InvalidSchedule(format!(
                "day {day} appears more than once"
            )));
        }
    }

    let missing: Vec<String> = (1..=PROGRAM_DAYS)
        .filter(|d| !by_day.contains_key(d))
        .map(|d| d.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(SkillMapError::InvalidSchedule(format!(
            "missing days: {}",
            missing.join(", ")
        )));
    }

    let tasks: Vec<DailyTask> = by_day.into_values().collect();
    let total: f64 = tasks.iter().map(|t| t.estimated_hours).sum();
    let expected_completion_date = now
        .checked_add_signed(Duration::days(i64::from(PROGRAM_DAYS)))
        .ok_or_else(|| {
            SkillMapError::InvalidSchedule("completion date out of range".to_string())
        })?;
    debug!(tasks = tasks.len(), total, "normalized skill program");

    let description = description
        .map(str::to_string)
        .unwrap_or_else(|| format!("A {PROGRAM_DAYS}-day program for {}", request.skill_name));

    Ok(NewSkillProgram {
        user_id: request.user_id().map(str::to_string),
        skill_name: request.skill_name.clone(),
        description,
        tasks,
        total_estimated_hours: total,
        expected_completion_date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn full_program() -> Map<String, Value> {
        (1..=PROGRAM_DAYS)
            .rev()
            .map(|day| {
                (
                    format!("day-{day}"),
                    json!({
                        "day": day,
                        "name": format!("Task {day}"),
                        "description": "practice",
                        "difficulty": if day <= 10 { "beginner" } else { "intermediate" },
                        "estimated_hours": 0.5,
                    }),
                )
            })
            .collect()
    }

    fn normalize(days: &Map<String, Value>) -> Result<NewSkillProgram, SkillMapError> {
        normalize_skill_program(days, Some("Thirty days of piano"), &GenerationRequest::new("Piano"), now())
    }

    fn assert_invalid_schedule(result: Result<NewSkillProgram, SkillMapError>) {
        match result {
            Err(SkillMapError::InvalidSchedule(_)) => {}
            other => panic!("expected InvalidSchedule, got {other:?}"),
        }
    }

    #[test]
    fn tasks_sorted_and_totalled() {
        let program = normalize(&full_program()).unwrap();
        let days: Vec<u32> = program.tasks.iter().map(|t| t.day).collect();
        assert_eq!(days, (1..=30).collect::<Vec<_>>());
        assert_eq!(program.total_estimated_hours, 15.0);
        assert_eq!(program.description, "Thirty days of piano");
        assert_eq!(program.skill_name, "Piano");
    }

    #[test]
    fn completion_is_thirty_days_regardless_of_hours() {
        let mut days = full_program();
        days["day-1"]["estimated_hours"] = json!(400);
        let program = normalize(&days).unwrap();
        assert_eq!(program.expected_completion_date, now() + Duration::days(30));
    }

    #[test]
    fn every_task_starts_not_started() {
        let mut days = full_program();
        days["day-2"]["progress"] = json!(100);
        let program = normalize(&days).unwrap();
        assert!(program.tasks.iter().all(|t| t.progress == 0.0));
        assert!(program.tasks.iter().all(|t| t.status == NodeStatus::NotStarted));
    }

    #[test]
    fn missing_day_is_rejected() {
        let mut days = full_program();
        days.remove("day-17");
        assert_invalid_schedule(normalize(&days));
    }

    #[test]
    fn duplicate_day_is_rejected() {
        let mut days = full_program();
        days["day-17"]["day"] = json!(16);
        assert_invalid_schedule(normalize(&days));
    }

    #[test]
    fn out_of_range_day_is_rejected() {
        let mut days = full_program();
        days["day-30"]["day"] = json!(31);
        assert_invalid_schedule(normalize(&days));

        let mut days = full_program();
        days["day-1"]["day"] = json!(0);
        assert_invalid_schedule(normalize(&days));
    }

    #[test]
    fn non_integer_day_is_malformed() {
        let mut days = full_program();
        days["day-5"]["day"] = json!("five");
        match normalize(&days) {
            Err(SkillMapError::MalformedPlan { id, .. }) => assert_eq!(id, "day-5"),
            other => panic!("expected MalformedPlan, got {other:?}"),
        }
    }

    #[test]
    fn missing_difficulty_is_malformed() {
        let mut days = full_program();
        days["day-9"].as_object_mut().unwrap().remove("difficulty");
        assert!(matches!(
            normalize(&days),
            Err(SkillMapError::MalformedPlan { .. })
        ));
    }

    #[test]
    fn default_description() {
        let program =
            normalize_skill_program(&full_program(), None, &GenerationRequest::new("Piano"), now())
                .unwrap();
        assert_eq!(program.description, "A 30-day program for Piano");
    }
}
