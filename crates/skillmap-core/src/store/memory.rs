//! In-process [`PlanStore`] for tests and `serve --in-memory`.
//!
//! Nothing survives a restart.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use skillmap_db::models::{
    DailyTask, NewSkillMap, NewSkillProgram, SkillMap, SkillNode, SkillProgram,
};
use uuid::Uuid;

use super::PlanStore;

#[derive(Debug, Default)]
struct Tables {
    skill_maps: HashMap<Uuid, SkillMap>,
    skill_programs: HashMap<Uuid, SkillProgram>,
}

#[derive(Debug, Default)]
pub struct MemoryPlanStore {
    tables: Mutex<Tables>,
}

impl MemoryPlanStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| anyhow!("in-memory plan store lock poisoned"))
    }
}

fn newest_first<T>(mut rows: Vec<T>, created_at: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    rows.sort_by_key(|row| std::cmp::Reverse(created_at(row)));
    rows
}

#[async_trait]
impl PlanStore for MemoryPlanStore {
    async fn insert_skill_map(&self, new: &NewSkillMap) -> Result<SkillMap> {
        let now = Utc::now();
        let map = SkillMap {
            id: Uuid::new_v4(),
            user_id: new.user_id.clone(),
            root_skill: new.root_skill.clone(),
            nodes: new.nodes.clone(),
            total_estimated_hours: new.total_estimated_hours,
            expected_completion_date: new.expected_completion_date,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        self.lock()?.skill_maps.insert(map.id, map.clone());
        Ok(map)
    }

    async fn get_skill_map(&self, id: Uuid) -> Result<Option<SkillMap>> {
        Ok(self.lock()?.skill_maps.get(&id).cloned())
    }

    async fn list_skill_maps(&self, user_id: Option<&str>) -> Result<Vec<SkillMap>> {
        let rows = self
            .lock()?
            .skill_maps
            .values()
            .filter(|m| user_id.is_none() || m.user_id.as_deref() == user_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, |m: &SkillMap| m.created_at))
    }

    async fn write_skill_map_progress(
        &self,
        id: Uuid,
        expected_version: i64,
        nodes: &BTreeMap<String, SkillNode>,
        expected_completion_date: DateTime<Utc>,
    ) -> Result<Option<SkillMap>> {
        let mut tables = self.lock()?;
        match tables.skill_maps.get_mut(&id) {
            Some(map) if map.version == expected_version => {
                map.nodes = nodes.clone();
                map.expected_completion_date = expected_completion_date;
                map.updated_at = Utc::now();
                map.version += 1;
                Ok(Some(map.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_skill_map(&self, id: Uuid) -> Result<bool> {
        Ok(self.lock()?.skill_maps.remove(&id).is_some())
    }

    async fn insert_skill_program(&self, new: &NewSkillProgram) -> Result<SkillProgram> {
        let now = Utc::now();
        let program = SkillProgram {
            id: Uuid::new_v4(),
            user_id: new.user_id.clone(),
            skill_name: new.skill_name.clone(),
            description: new.description.clone(),
            tasks: new.tasks.clone(),
            total_estimated_hours: new.total_estimated_hours,
            expected_completion_date: new.expected_completion_date,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        self.lock()?
            .skill_programs
            .insert(program.id, program.clone());
        Ok(program)
    }

    async fn get_skill_program(&self, id: Uuid) -> Result<Option<SkillProgram>> {
        Ok(self.lock()?.skill_programs.get(&id).cloned())
    }

    async fn list_skill_programs(&self, user_id: Option<&str>) -> Result<Vec<SkillProgram>> {
        let rows = self
            .lock()?
            .skill_programs
            .values()
            .filter(|p| user_id.is_none() || p.user_id.as_deref() == user_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, |p: &SkillProgram| p.created_at))
    }

    async fn write_skill_program_progress(
        &self,
        id: Uuid,
        expected_version: i64,
        tasks: &[DailyTask],
        expected_completion_date: DateTime<Utc>,
    ) -> Result<Option<SkillProgram>> {
        let mut tables = self.lock()?;
        match tables.skill_programs.get_mut(&id) {
            Some(program) if program.version == expected_version => {
                program.tasks = tasks.to_vec();
                program.expected_completion_date = expected_completion_date;
                program.updated_at = Utc::now();
                program.version += 1;
                Ok(Some(program.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_skill_program(&self, id: Uuid) -> Result<bool> {
        Ok(self.lock()?.skill_programs.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_map(user: Option<&str>) -> NewSkillMap {
        NewSkillMap {
            user_id: user.map(str::to_string),
            root_skill: "Go".to_string(),
            nodes: BTreeMap::new(),
            total_estimated_hours: 0.0,
            expected_completion_date: Utc::now() + Duration::days(7),
        }
    }

    #[tokio::test]
    async fn insert_then_get() {
        let store = MemoryPlanStore::new();
        let map = store.insert_skill_map(&new_map(Some("u1"))).await.unwrap();
        assert_eq!(map.version, 1);
        let fetched = store.get_skill_map(map.id).await.unwrap().unwrap();
        assert_eq!(fetched, map);
        assert!(store.get_skill_map(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn progress_write_is_compare_and_swap() {
        let store = MemoryPlanStore::new();
        let map = store.insert_skill_map(&new_map(None)).await.unwrap();
        let later = map.expected_completion_date + Duration::days(3);

        let written = store
            .write_skill_map_progress(map.id, 1, &map.nodes, later)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(written.version, 2);
        assert_eq!(written.expected_completion_date, later);

        let stale = store
            .write_skill_map_progress(map.id, 1, &map.nodes, later)
            .await
            .unwrap();
        assert!(stale.is_none());
    }

    #[tokio::test]
    async fn list_filters_by_user() {
        let store = MemoryPlanStore::new();
        store.insert_skill_map(&new_map(Some("a"))).await.unwrap();
        store.insert_skill_map(&new_map(Some("b"))).await.unwrap();
        store.insert_skill_map(&new_map(None)).await.unwrap();
        assert_eq!(store.list_skill_maps(None).await.unwrap().len(), 3);
        assert_eq!(store.list_skill_maps(Some("a")).await.unwrap().len(), 1);
        assert!(store.list_skill_maps(Some("zz")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_program() {
        let store = MemoryPlanStore::new();
        let program = store
            .insert_skill_program(&NewSkillProgram {
                user_id: None,
                skill_name: "Piano".to_string(),
                description: String::new(),
                tasks: vec![],
                total_estimated_hours: 0.0,
                expected_completion_date: Utc::now(),
            })
            .await
            .unwrap();
        assert!(store.delete_skill_program(program.id).await.unwrap());
        assert!(!store.delete_skill_program(program.id).await.unwrap());
    }
}
