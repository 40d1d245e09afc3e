//! Database query functions for the `skill_programs` table.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use crate::models::{DailyTask, NewSkillProgram, SkillProgram};

/// Insert a normalized 30-day program. Returns the stored row.
pub async fn insert_skill_program(pool: &PgPool, new: &NewSkillProgram) -> Result<SkillProgram> {
    let program = sqlx::query_as::<_, SkillProgram>(
        "INSERT INTO skill_programs \
             (user_id, skill_name, description, tasks, total_estimated_hours, expected_completion_date) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING *",
    )
    .bind(&new.user_id)
    .bind(&new.skill_name)
    .bind(&new.description)
    .bind(Json(&new.tasks))
    .bind(new.total_estimated_hours)
    .bind(new.expected_completion_date)
    .fetch_one(pool)
    .await
    .context("failed to insert skill program")?;

    Ok(program)
}

/// Fetch a skill program by its ID.
pub async fn get_skill_program(pool: &PgPool, id: Uuid) -> Result<Option<SkillProgram>> {
    let program = sqlx::query_as::<_, SkillProgram>("SELECT * FROM skill_programs WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch skill program")?;

    Ok(program)
}

/// List skill programs, newest first, optionally for a single user.
pub async fn list_skill_programs(
    pool: &PgPool,
    user_id: Option<&str>,
) -> Result<Vec<SkillProgram>> {
    let programs = sqlx::query_as::<_, SkillProgram>(
        "SELECT * FROM skill_programs \
         WHERE $1::text IS NULL OR user_id = $1 \
         ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("failed to list skill programs")?;

    Ok(programs)
}

/// Version-guarded progress write. See
/// [`super::skill_maps::update_skill_map_progress`] for the `None` contract.
pub async fn update_skill_program_progress(
    pool: &PgPool,
    id: Uuid,
    expected_version: i64,
    tasks: &[DailyTask],
    expected_completion_date: DateTime<Utc>,
) -> Result<Option<SkillProgram>> {
    let program = sqlx::query_as::<_, SkillProgram>(
        "UPDATE skill_programs \
         SET tasks = $3, expected_completion_date = $4, \
             updated_at = now(), version = version + 1 \
         WHERE id = $1 AND version = $2 \
         RETURNING *",
    )
    .bind(id)
    .bind(expected_version)
    .bind(Json(tasks))
    .bind(expected_completion_date)
    .fetch_optional(pool)
    .await
    .context("failed to update skill program progress")?;

    Ok(program)
}

/// Delete a skill program. Returns `true` if a row was removed.
pub async fn delete_skill_program(pool: &PgPool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM skill_programs WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("failed to delete skill program")?;

    Ok(result.rows_affected() > 0)
}
