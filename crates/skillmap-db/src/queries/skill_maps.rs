//! Database query functions for the `skill_maps` table.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use crate::models::{NewSkillMap, SkillMap, SkillNode};

/// Insert a normalized skill map. Returns the stored row with its
/// server-generated id, version and timestamps.
pub async fn insert_skill_map(pool: &PgPool, new: &NewSkillMap) -> Result<SkillMap> {
    let map = sqlx::query_as::<_, SkillMap>(
        "INSERT INTO skill_maps (user_id, root_skill, nodes, total_estimated_hours, expected_completion_date) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING *",
    )
    .bind(&new.user_id)
    .bind(&new.root_skill)
    .bind(Json(&new.nodes))
    .bind(new.total_estimated_hours)
    .bind(new.expected_completion_date)
    .fetch_one(pool)
    .await
    .context("failed to insert skill map")?;

    Ok(map)
}

/// Fetch a skill map by its ID.
pub async fn get_skill_map(pool: &PgPool, id: Uuid) -> Result<Option<SkillMap>> {
    let map = sqlx::query_as::<_, SkillMap>("SELECT * FROM skill_maps WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch skill map")?;

    Ok(map)
}

/// List skill maps, newest first. When `user_id` is given only that user's
/// maps are returned.
pub async fn list_skill_maps(pool: &PgPool, user_id: Option<&str>) -> Result<Vec<SkillMap>> {
    let maps = sqlx::query_as::<_, SkillMap>(
        "SELECT * FROM skill_maps \
         WHERE $1::text IS NULL OR user_id = $1 \
         ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("failed to list skill maps")?;

    Ok(maps)
}

/// Write new node progress and expected completion date, guarded by the
/// version the caller read.
///
/// Returns the updated row, or `None` when no row matched -- either the map
/// does not exist or someone else wrote it since `expected_version` was read.
pub async fn update_skill_map_progress(
    pool: &PgPool,
    id: Uuid,
    expected_version: i64,
    nodes: &BTreeMap<String, SkillNode>,
    expected_completion_date: DateTime<Utc>,
) -> Result<Option<SkillMap>> {
    let map = sqlx::query_as::<_, SkillMap>(
        "UPDATE skill_maps \
         SET nodes = $3, expected_completion_date = $4, \
             updated_at = now(), version = version + 1 \
         WHERE id = $1 AND version = $2 \
         RETURNING *",
    )
    .bind(id)
    .bind(expected_version)
    .bind(Json(nodes))
    .bind(expected_completion_date)
    .fetch_optional(pool)
    .await
    .context("failed to update skill map progress")?;

    Ok(map)
}

/// Delete a skill map. Returns `true` if a row was removed.
pub async fn delete_skill_map(pool: &PgPool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM skill_maps WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("failed to delete skill map")?;

    Ok(result.rows_affected() > 0)
}
