use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Progress status of a skill node or daily task.
///
/// Never set directly: always derived from the completion percentage via
/// [`NodeStatus::from_progress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

impl NodeStatus {
    /// Derive the status from a completion percentage.
    ///
    /// `0` is not started, anything strictly between `0` and `100` is in
    /// progress, `100` and above is completed.
    pub fn from_progress(progress: f64) -> Self {
        if progress >= 100.0 {
            Self::Completed
        } else if progress > 0.0 {
            Self::InProgress
        } else {
            Self::NotStarted
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Document values (stored as JSONB)
// ---------------------------------------------------------------------------

/// A learning resource attached to a node or task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillResource {
    /// Free-form kind tag: "book", "course", "video", ...
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One node of a skill map tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillNode {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Only meaningful on leaves; interior hours are not counted.
    pub estimated_hours: f64,
    pub parent_id: Option<String>,
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default)]
    pub resources: Vec<SkillResource>,
    /// Distance from the root (root = 0).
    pub depth: u32,
    pub progress: f64,
    pub status: NodeStatus,
}

impl SkillNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Set the completion percentage and re-derive the status.
    pub fn record_progress(&mut self, progress: f64) {
        self.progress = progress;
        self.status = NodeStatus::from_progress(progress);
    }
}

/// One day of a 30-day skill program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTask {
    /// Day number, 1..=30.
    pub day: u32,
    pub name: String,
    pub description: String,
    /// Difficulty label as produced by the generator ("beginner", ...).
    pub difficulty: String,
    pub estimated_hours: f64,
    #[serde(default)]
    pub resources: Vec<SkillResource>,
    pub progress: f64,
    pub status: NodeStatus,
}

impl DailyTask {
    /// Set the completion percentage and re-derive the status.
    pub fn record_progress(&mut self, progress: f64) {
        self.progress = progress;
        self.status = NodeStatus::from_progress(progress);
    }
}

// ---------------------------------------------------------------------------
// Row structs
// ---------------------------------------------------------------------------

/// A persisted skill map -- a tree of learning nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct SkillMap {
    pub id: Uuid,
    pub user_id: Option<String>,
    pub root_skill: String,
    #[sqlx(json)]
    pub nodes: BTreeMap<String, SkillNode>,
    pub total_estimated_hours: f64,
    pub expected_completion_date: DateTime<Utc>,
    /// Bumped on every progress write; used for compare-and-swap.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A persisted 30-day skill program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct SkillProgram {
    pub id: Uuid,
    pub user_id: Option<String>,
    pub skill_name: String,
    pub description: String,
    /// Always 30 entries in ascending day order.
    #[sqlx(json)]
    pub tasks: Vec<DailyTask>,
    pub total_estimated_hours: f64,
    pub expected_completion_date: DateTime<Utc>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A normalized skill map that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewSkillMap {
    pub user_id: Option<String>,
    pub root_skill: String,
    pub nodes: BTreeMap<String, SkillNode>,
    pub total_estimated_hours: f64,
    pub expected_completion_date: DateTime<Utc>,
}

/// A normalized skill program that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewSkillProgram {
    pub user_id: Option<String>,
    pub skill_name: String,
    pub description: String,
    pub tasks: Vec<DailyTask>,
    pub total_estimated_hours: f64,
    pub expected_completion_date: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_status_display_matches_serde() {
        for v in [
            NodeStatus::NotStarted,
            NodeStatus::InProgress,
            NodeStatus::Completed,
        ] {
            let json = serde_json::to_value(v).unwrap();
            assert_eq!(json, serde_json::Value::String(v.to_string()));
        }
    }

    #[test]
    fn status_boundaries() {
        assert_eq!(NodeStatus::from_progress(0.0), NodeStatus::NotStarted);
        assert_eq!(NodeStatus::from_progress(0.01), NodeStatus::InProgress);
        assert_eq!(NodeStatus::from_progress(50.0), NodeStatus::InProgress);
        assert_eq!(NodeStatus::from_progress(99.99), NodeStatus::InProgress);
        assert_eq!(NodeStatus::from_progress(100.0), NodeStatus::Completed);
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&NodeStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }

    #[test]
    fn resource_uses_type_key() {
        let res: SkillResource =
            serde_json::from_str(r#"{"type": "book", "name": "The Go Programming Language"}"#)
                .unwrap();
        assert_eq!(res.kind, "book");
        assert!(res.url.is_none());

        let back = serde_json::to_value(&res).unwrap();
        assert_eq!(back["type"], "book");
        assert!(back.get("url").is_none());
    }

    #[test]
    fn record_progress_derives_status() {
        let mut task = DailyTask {
            day: 3,
            name: "Loops".to_string(),
            description: "for and while".to_string(),
            difficulty: "beginner".to_string(),
            estimated_hours: 1.5,
            resources: vec![],
            progress: 0.0,
            status: NodeStatus::NotStarted,
        };
        task.record_progress(100.0);
        assert_eq!(task.status, NodeStatus::Completed);
        task.record_progress(0.0);
        assert_eq!(task.status, NodeStatus::NotStarted);
    }
}
