//! The service layer: generate, store and adjust plans.
//!
//! Each method is one logical request. The generator call and the store
//! write are awaited in sequence; nothing runs in the background.

use std::sync::Arc;

use chrono::Utc;
use skillmap_db::models::{SkillMap, SkillProgram};
use tracing::{info, warn};
use uuid::Uuid;

use crate::adjust::{
    ContextChange, DayProgress, NodeProgress, ProgressOutcome, adjust_skill_map,
    adjust_skill_program,
};
use crate::error::SkillMapError;
use crate::generator::{GenerationRequest, SkillGenerator};
use crate::normalize::{normalize_skill_map, normalize_skill_program};
use crate::store::PlanStore;

type Result<T> = std::result::Result<T, SkillMapError>;

/// Entry point for every plan operation.
///
/// Cheap to clone; the store and generator are shared.
#[derive(Clone)]
pub struct SkillMapService {
    store: Arc<dyn PlanStore>,
    generator: Arc<dyn SkillGenerator>,
}

impl SkillMapService {
    pub fn new(store: Arc<dyn PlanStore>, generator: Arc<dyn SkillGenerator>) -> Self {
        Self { store, generator }
    }

    pub fn generator_name(&self) -> &str {
        self.generator.name()
    }

    // -----------------------------------------------------------------------
    // Generation
    // -----------------------------------------------------------------------

    /// Generate, normalize and store a hierarchical skill map.
    pub async fn generate_skill_map(&self, request: &GenerationRequest) -> Result<SkillMap> {
        let raw = self.generator.generate_hierarchy(request).await?;
        let new = normalize_skill_map(&raw.skills, request, Utc::now())?;
        let map = self.store.insert_skill_map(&new).await?;
        info!(
            skill_map = %map.id,
            skill = %map.root_skill,
            nodes = map.nodes.len(),
            hours = map.total_estimated_hours,
            "skill map created"
        );
        Ok(map)
    }

    /// Generate, normalize and store a 30-day skill program.
    pub async fn generate_skill_program(&self, request: &GenerationRequest) -> Result<SkillProgram> {
        let raw = self.generator.generate_program(request).await?;
        let new =
            normalize_skill_program(&raw.days, raw.description.as_deref(), request, Utc::now())?;
        let program = self.store.insert_skill_program(&new).await?;
        info!(
            program = %program.id,
            skill = %program.skill_name,
            hours = program.total_estimated_hours,
            "skill program created"
        );
        Ok(program)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub async fn get_skill_map(&self, id: Uuid) -> Result<SkillMap> {
        self.store
            .get_skill_map(id)
            .await?
            .ok_or(SkillMapError::PlanNotFound(id))
    }

    pub async fn get_skill_program(&self, id: Uuid) -> Result<SkillProgram> {
        self.store
            .get_skill_program(id)
            .await?
            .ok_or(SkillMapError::PlanNotFound(id))
    }

    pub async fn list_skill_maps(&self, user_id: Option<&str>) -> Result<Vec<SkillMap>> {
        Ok(self.store.list_skill_maps(user_id).await?)
    }

    pub async fn list_skill_programs(&self, user_id: Option<&str>) -> Result<Vec<SkillProgram>> {
        Ok(self.store.list_skill_programs(user_id).await?)
    }

    // -----------------------------------------------------------------------
    // Progress
    // -----------------------------------------------------------------------

    /// Apply progress reports and context changes to a stored skill map.
    ///
    /// Fails with [`SkillMapError::ConcurrentUpdate`] if the map changed
    /// between the read and the write.
    pub async fn update_progress(
        &self,
        id: Uuid,
        reports: &[NodeProgress],
        changes: &[ContextChange],
    ) -> Result<ProgressOutcome<SkillMap>> {
        let current = self.get_skill_map(id).await?;
        let outcome = adjust_skill_map(&current, reports, changes)?;

        let written = self
            .store
            .write_skill_map_progress(
                id,
                current.version,
                &outcome.plan.nodes,
                outcome.plan.expected_completion_date,
            )
            .await?;
        let Some(plan) = written else {
            let still_exists = self.store.get_skill_map(id).await?.is_some();
            return Err(lost_race(id, current.version, still_exists));
        };

        info!(
            skill_map = %id,
            reports = reports.len(),
            shift_days = ?outcome.adjustment_days,
            version = plan.version,
            "skill map progress updated"
        );
        Ok(ProgressOutcome {
            plan,
            adjustment_days: outcome.adjustment_days,
        })
    }

    /// Apply day reports and context changes to a stored skill program.
    pub async fn update_program_progress(
        &self,
        id: Uuid,
        reports: &[DayProgress],
        changes: &[ContextChange],
    ) -> Result<ProgressOutcome<SkillProgram>> {
        let current = self.get_skill_program(id).await?;
        let outcome = adjust_skill_program(&current, reports, changes)?;

        let written = self
            .store
            .write_skill_program_progress(
                id,
                current.version,
                &outcome.plan.tasks,
                outcome.plan.expected_completion_date,
            )
            .await?;
        let Some(plan) = written else {
            let still_exists = self.store.get_skill_program(id).await?.is_some();
            return Err(lost_race(id, current.version, still_exists));
        };

        info!(
            program = %id,
            reports = reports.len(),
            shift_days = ?outcome.adjustment_days,
            version = plan.version,
            "skill program progress updated"
        );
        Ok(ProgressOutcome {
            plan,
            adjustment_days: outcome.adjustment_days,
        })
    }

    // -----------------------------------------------------------------------
    // Deletion
    // -----------------------------------------------------------------------

    pub async fn delete_skill_map(&self, id: Uuid) -> Result<()> {
        if self.store.delete_skill_map(id).await? {
            info!(skill_map = %id, "skill map deleted");
            Ok(())
        } else {
            Err(SkillMapError::PlanNotFound(id))
        }
    }

    pub async fn delete_skill_program(&self, id: Uuid) -> Result<()> {
        if self.store.delete_skill_program(id).await? {
            info!(program = %id, "skill program deleted");
            Ok(())
        } else {
            Err(SkillMapError::PlanNotFound(id))
        }
    }
}

/// Map a failed compare-and-swap to the right error.
fn lost_race(id: Uuid, expected_version: i64, still_exists: bool) -> SkillMapError {
    if still_exists {
        warn!(plan = %id, expected_version, "concurrent update detected");
        SkillMapError::ConcurrentUpdate {
            id,
            expected_version,
        }
    } else {
        SkillMapError::PlanNotFound(id)
    }
}
