//! Plan persistence.
//!
//! [`PlanStore`] is the seam between the service and storage. The trait is
//! object-safe so the service can hold an `Arc<dyn PlanStore>`.

mod memory;
mod postgres;

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use skillmap_db::models::{
    DailyTask, NewSkillMap, NewSkillProgram, SkillMap, SkillNode, SkillProgram,
};
use uuid::Uuid;

pub use memory::MemoryPlanStore;
pub use postgres::PgPlanStore;

/// Storage for skill maps and skill programs.
///
/// Progress writes are compare-and-swap on the plan's `version`: they
/// return `None` when no plan with that id *and* version exists, and the
/// caller re-reads to tell a missing plan from a concurrent update.
#[async_trait]
pub trait PlanStore: Send + Sync {
    /// Persist a new skill map and return it with its assigned id.
    async fn insert_skill_map(&self, new: &NewSkillMap) -> Result<SkillMap>;

    async fn get_skill_map(&self, id: Uuid) -> Result<Option<SkillMap>>;

    /// Newest first, optionally restricted to one user.
    async fn list_skill_maps(&self, user_id: Option<&str>) -> Result<Vec<SkillMap>>;

    /// Replace the node map and expected completion of a skill map if it is
    /// still at `expected_version`. Bumps the version.
    async fn write_skill_map_progress(
        &self,
        id: Uuid,
        expected_version: i64,
        nodes: &BTreeMap<String, SkillNode>,
        expected_completion_date: DateTime<Utc>,
    ) -> Result<Option<SkillMap>>;

    async fn delete_skill_map(&self, id: Uuid) -> Result<bool>;

    async fn insert_skill_program(&self, new: &NewSkillProgram) -> Result<SkillProgram>;

    async fn get_skill_program(&self, id: Uuid) -> Result<Option<SkillProgram>>;

    async fn list_skill_programs(&self, user_id: Option<&str>) -> Result<Vec<SkillProgram>>;

    async fn write_skill_program_progress(
        &self,
        id: Uuid,
        expected_version: i64,
        tasks: &[DailyTask],
        expected_completion_date: DateTime<Utc>,
    ) -> Result<Option<SkillProgram>>;

    async fn delete_skill_program(&self, id: Uuid) -> Result<bool>;
}

// Compile-time assertion: PlanStore must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn PlanStore) {}
};
