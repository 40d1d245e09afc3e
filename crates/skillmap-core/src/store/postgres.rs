//! [`PlanStore`] backed by PostgreSQL through the `skillmap-db` queries.

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use skillmap_db::models::{
    DailyTask, NewSkillMap, NewSkillProgram, SkillMap, SkillNode, SkillProgram,
};
use skillmap_db::queries::{skill_maps, skill_programs};
use sqlx::PgPool;
use uuid::Uuid;

use super::PlanStore;

#[derive(Debug, Clone)]
pub struct PgPlanStore {
    pool: PgPool,
}

impl PgPlanStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl PlanStore for PgPlanStore {
    async fn insert_skill_map(&self, new: &NewSkillMap) -> Result<SkillMap> {
        skill_maps::insert_skill_map(&self.pool, new).await
    }

    async fn get_skill_map(&self, id: Uuid) -> Result<Option<SkillMap>> {
        skill_maps::get_skill_map(&self.pool, id).await
    }

    async fn list_skill_maps(&self, user_id: Option<&str>) -> Result<Vec<SkillMap>> {
        skill_maps::list_skill_maps(&self.pool, user_id).await
    }

    async fn write_skill_map_progress(
        &self,
        id: Uuid,
        expected_version: i64,
        nodes: &BTreeMap<String, SkillNode>,
        expected_completion_date: DateTime<Utc>,
    ) -> Result<Option<SkillMap>> {
        skill_maps::update_skill_map_progress(
            &self.pool,
            id,
            expected_version,
            nodes,
            expected_completion_date,
        )
        .await
    }

    async fn delete_skill_map(&self, id: Uuid) -> Result<bool> {
        skill_maps::delete_skill_map(&self.pool, id).await
    }

    async fn insert_skill_program(&self, new: &NewSkillProgram) -> Result<SkillProgram> {
        skill_programs::insert_skill_program(&self.pool, new).await
    }

    async fn get_skill_program(&self, id: Uuid) -> Result<Option<SkillProgram>> {
        skill_programs::get_skill_program(&self.pool, id).await
    }

    async fn list_skill_programs(&self, user_id: Option<&str>) -> Result<Vec<SkillProgram>> {
        skill_programs::list_skill_programs(&self.pool, user_id).await
    }

    async fn write_skill_program_progress(
        &self,
        id: Uuid,
        expected_version: i64,
        tasks: &[DailyTask],
        expected_completion_date: DateTime<Utc>,
    ) -> Result<Option<SkillProgram>> {
        skill_programs::update_skill_program_progress(
            &self.pool,
            id,
            expected_version,
            tasks,
            expected_completion_date,
        )
        .await
    }

    async fn delete_skill_program(&self, id: Uuid) -> Result<bool> {
        skill_programs::delete_skill_program(&self.pool, id).await
    }
}
