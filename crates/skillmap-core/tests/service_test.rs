//! Service-level tests against the in-memory store and a fixed generator.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use skillmap_core::adjust::{ContextChange, DayProgress, NodeProgress};
use skillmap_core::generator::{
    GenerationRequest, LlmError, RawProgram, RawSkillTree, SkillGenerator,
    fallback::fallback_program,
};
use skillmap_core::store::{MemoryPlanStore, PlanStore};
use skillmap_core::{SkillMapError, SkillMapService};
use skillmap_db::models::{
    DailyTask, NewSkillMap, NewSkillProgram, NodeStatus, SkillMap, SkillNode, SkillProgram,
};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Returns whatever tree it was built with.
struct FixedGenerator {
    tree: Value,
}

impl FixedGenerator {
    fn go() -> Self {
        Self {
            tree: json!({
                "root": {"name": "Go", "description": "The Go language", "estimated_hours": 0,
                         "children": ["a"], "depth": 0},
                "a": {"name": "Basics", "description": "Syntax and tooling", "estimated_hours": 10,
                      "parent_id": "root", "depth": 1,
                      "resources": [{"type": "book", "name": "The Go Programming Language"}]}
            }),
        }
    }
}

#[async_trait]
impl SkillGenerator for FixedGenerator {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn generate_hierarchy(
        &self,
        _request: &GenerationRequest,
    ) -> Result<RawSkillTree, LlmError> {
        Ok(serde_json::from_value(json!({ "skills": self.tree }))?)
    }

    async fn generate_program(&self, request: &GenerationRequest) -> Result<RawProgram, LlmError> {
        Ok(fallback_program(&request.skill_name))
    }
}

/// A generator whose model is unreachable.
struct FailingGenerator;

#[async_trait]
impl SkillGenerator for FailingGenerator {
    fn name(&self) -> &str {
        "failing"
    }

    async fn generate_hierarchy(&self, _: &GenerationRequest) -> Result<RawSkillTree, LlmError> {
        Err(LlmError::ApiError {
            status: 503,
            message: "overloaded".to_string(),
        })
    }

    async fn generate_program(&self, _: &GenerationRequest) -> Result<RawProgram, LlmError> {
        Err(LlmError::InvalidResponse("empty".to_string()))
    }
}

/// Lets another writer win the race before every progress write.
struct RacingStore {
    inner: MemoryPlanStore,
}

#[async_trait]
impl PlanStore for RacingStore {
    async fn insert_skill_map(&self, new: &NewSkillMap) -> Result<SkillMap> {
        self.inner.insert_skill_map(new).await
    }

    async fn get_skill_map(&self, id: Uuid) -> Result<Option<SkillMap>> {
        self.inner.get_skill_map(id).await
    }

    async fn list_skill_maps(&self, user_id: Option<&str>) -> Result<Vec<SkillMap>> {
        self.inner.list_skill_maps(user_id).await
    }

    async fn write_skill_map_progress(
        &self,
        id: Uuid,
        expected_version: i64,
        nodes: &BTreeMap<String, SkillNode>,
        expected_completion_date: DateTime<Utc>,
    ) -> Result<Option<SkillMap>> {
        self.inner
            .write_skill_map_progress(id, expected_version, nodes, expected_completion_date)
            .await?;
        self.inner
            .write_skill_map_progress(id, expected_version, nodes, expected_completion_date)
            .await
    }

    async fn delete_skill_map(&self, id: Uuid) -> Result<bool> {
        self.inner.delete_skill_map(id).await
    }

    async fn insert_skill_program(&self, new: &NewSkillProgram) -> Result<SkillProgram> {
        self.inner.insert_skill_program(new).await
    }

    async fn get_skill_program(&self, id: Uuid) -> Result<Option<SkillProgram>> {
        self.inner.get_skill_program(id).await
    }

    async fn list_skill_programs(&self, user_id: Option<&str>) -> Result<Vec<SkillProgram>> {
        self.inner.list_skill_programs(user_id).await
    }

    async fn write_skill_program_progress(
        &self,
        id: Uuid,
        expected_version: i64,
        tasks: &[DailyTask],
        expected_completion_date: DateTime<Utc>,
    ) -> Result<Option<SkillProgram>> {
        self.inner
            .write_skill_program_progress(id, expected_version, tasks, expected_completion_date)
            .await?;
        self.inner
            .write_skill_program_progress(id, expected_version, tasks, expected_completion_date)
            .await
    }

    async fn delete_skill_program(&self, id: Uuid) -> Result<bool> {
        self.inner.delete_skill_program(id).await
    }
}

fn service() -> SkillMapService {
    SkillMapService::new(
        Arc::new(MemoryPlanStore::new()),
        Arc::new(FixedGenerator::go()),
    )
}

fn report(node_id: &str, pct: f64) -> NodeProgress {
    NodeProgress {
        node_id: node_id.to_string(),
        completion_percentage: pct,
        time_spent: 2.0,
        notes: None,
        assessment_results: None,
    }
}

fn change(factor: f64) -> ContextChange {
    ContextChange {
        change_type: "schedule_change".to_string(),
        description: "new job".to_string(),
        impact_factor: factor,
        affected_period: BTreeMap::new(),
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn generate_stores_normalized_map() {
    let svc = service();
    let map = svc
        .generate_skill_map(&GenerationRequest::new("Go"))
        .await
        .unwrap();

    assert_eq!(map.root_skill, "Go");
    assert_eq!(map.total_estimated_hours, 10.0);
    assert_eq!(map.version, 1);
    assert_eq!(map.nodes["a"].depth, 1);
    assert_eq!(map.nodes["a"].resources[0].kind, "book");

    let stored = svc.get_skill_map(map.id).await.unwrap();
    assert_eq!(stored, map);
}

#[tokio::test]
async fn generate_program_has_thirty_sorted_days() {
    let svc = service();
    let program = svc
        .generate_skill_program(&GenerationRequest::new("Piano"))
        .await
        .unwrap();
    assert_eq!(program.tasks.len(), 30);
    assert!(program.tasks.windows(2).all(|w| w[0].day < w[1].day));
    assert_eq!(program.total_estimated_hours, 30.0);
    assert_eq!(svc.list_skill_programs(None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn generator_failure_is_reported() {
    let svc = SkillMapService::new(Arc::new(MemoryPlanStore::new()), Arc::new(FailingGenerator));
    let err = svc
        .generate_skill_map(&GenerationRequest::new("Go"))
        .await
        .unwrap_err();
    assert!(matches!(err, SkillMapError::Generator(LlmError::ApiError { status: 503, .. })));
    assert!(svc.list_skill_maps(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn malformed_generator_output_is_not_stored() {
    let svc = SkillMapService::new(
        Arc::new(MemoryPlanStore::new()),
        Arc::new(FixedGenerator {
            tree: json!({"root": {"name": "Go", "estimated_hours": 0}}),
        }),
    );
    let err = svc
        .generate_skill_map(&GenerationRequest::new("Go"))
        .await
        .unwrap_err();
    assert!(matches!(err, SkillMapError::MalformedPlan { ref id, .. } if id == "root"));
    assert!(svc.list_skill_maps(None).await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

#[tokio::test]
async fn progress_update_persists_and_bumps_version() {
    let svc = service();
    let map = svc
        .generate_skill_map(&GenerationRequest::new("Go"))
        .await
        .unwrap();

    let outcome = svc
        .update_progress(map.id, &[report("a", 50.0)], &[change(0.2), change(-0.5)])
        .await
        .unwrap();

    assert_eq!(outcome.plan.version, 2);
    assert_eq!(outcome.plan.nodes["a"].status, NodeStatus::InProgress);
    assert_eq!(outcome.plan.nodes["root"].status, NodeStatus::NotStarted);
    assert_eq!(outcome.adjustment_days, Some(-9));
    assert_eq!(
        outcome.plan.expected_completion_date,
        map.expected_completion_date - chrono::Duration::days(9)
    );

    let stored = svc.get_skill_map(map.id).await.unwrap();
    assert_eq!(stored.nodes["a"].progress, 50.0);
    assert_eq!(stored.version, 2);
}

#[tokio::test]
async fn invalid_progress_leaves_stored_map_untouched() {
    let svc = service();
    let map = svc
        .generate_skill_map(&GenerationRequest::new("Go"))
        .await
        .unwrap();

    let err = svc
        .update_progress(map.id, &[report("a", 150.0)], &[])
        .await
        .unwrap_err();
    assert!(matches!(err, SkillMapError::InvalidProgressValue { .. }));
    assert_eq!(svc.get_skill_map(map.id).await.unwrap(), map);
}

#[tokio::test]
async fn unknown_plan_is_not_found() {
    let svc = service();
    let id = Uuid::new_v4();
    let err = svc.update_progress(id, &[], &[]).await.unwrap_err();
    assert!(matches!(err, SkillMapError::PlanNotFound(missing) if missing == id));
    assert!(matches!(
        svc.get_skill_program(id).await,
        Err(SkillMapError::PlanNotFound(_))
    ));
}

#[tokio::test]
async fn program_progress_by_day() {
    let svc = service();
    let program = svc
        .generate_skill_program(&GenerationRequest::new("Piano"))
        .await
        .unwrap();

    let reports = [DayProgress {
        day: 3,
        completion_percentage: 100.0,
        time_spent: 1.0,
        notes: None,
    }];
    let outcome = svc
        .update_program_progress(program.id, &reports, &[])
        .await
        .unwrap();
    assert_eq!(outcome.plan.tasks[2].status, NodeStatus::Completed);
    assert_eq!(outcome.adjustment_days, None);
    assert_eq!(outcome.plan.version, 2);
}

#[tokio::test]
async fn lost_race_is_a_concurrent_update() {
    let svc = SkillMapService::new(
        Arc::new(RacingStore {
            inner: MemoryPlanStore::new(),
        }),
        Arc::new(FixedGenerator::go()),
    );
    let map = svc
        .generate_skill_map(&GenerationRequest::new("Go"))
        .await
        .unwrap();
    let err = svc
        .update_progress(map.id, &[report("a", 10.0)], &[])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SkillMapError::ConcurrentUpdate { expected_version: 1, .. }
    ));

    let program = svc
        .generate_skill_program(&GenerationRequest::new("Piano"))
        .await
        .unwrap();
    let err = svc
        .update_program_progress(program.id, &[], &[change(0.1)])
        .await
        .unwrap_err();
    assert!(matches!(err, SkillMapError::ConcurrentUpdate { .. }));
}

#[tokio::test]
async fn delete_then_get_is_not_found() {
    let svc = service();
    let map = svc
        .generate_skill_map(&GenerationRequest::new("Go"))
        .await
        .unwrap();
    svc.delete_skill_map(map.id).await.unwrap();
    assert!(matches!(
        svc.get_skill_map(map.id).await,
        Err(SkillMapError::PlanNotFound(_))
    ));
    assert!(matches!(
        svc.delete_skill_map(map.id).await,
        Err(SkillMapError::PlanNotFound(_))
    ));
}
