//! Caller-supplied context for plan generation.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Weekly study hours assumed when the caller gives no usable profile.
pub const DEFAULT_WEEKLY_HOURS: f64 = 10.0;

/// Time frame (in days) mentioned to the model when the caller gives none.
pub const DEFAULT_TIME_FRAME_DAYS: u32 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningStyle {
    Visual,
    Auditory,
    Reading,
    Kinesthetic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeAvailability {
    pub hours_per_week: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_session_length: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_days: Option<Vec<String>>,
}

/// Who the plan is for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerProfile {
    pub user_id: String,
    pub current_skill_level: SkillLevel,
    pub learning_style_preferences: Vec<LearningStyle>,
    pub time_availability: TimeAvailability,
    #[serde(default)]
    pub background_knowledge: Vec<String>,
    #[serde(default)]
    pub goals: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningPreferences {
    #[serde(default = "default_resource_types")]
    pub resource_types: Vec<String>,
    #[serde(default = "default_difficulty_progression")]
    pub difficulty_progression: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus_areas: Option<Vec<String>>,
}

impl Default for LearningPreferences {
    fn default() -> Self {
        Self {
            resource_types: default_resource_types(),
            difficulty_progression: default_difficulty_progression(),
            focus_areas: None,
        }
    }
}

fn default_resource_types() -> Vec<String> {
    vec![
        "courses".to_string(),
        "articles".to_string(),
        "videos".to_string(),
    ]
}

fn default_difficulty_progression() -> String {
    "gradual".to_string()
}

/// A request to generate a skill map or a skill program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub skill_name: String,
    #[serde(default)]
    pub user_profile: Option<LearnerProfile>,
    #[serde(default)]
    pub learning_preferences: Option<LearningPreferences>,
    /// Desired time frame in days.
    #[serde(default)]
    pub time_frame: Option<u32>,
}

impl GenerationRequest {
    pub fn new(skill_name: impl Into<String>) -> Self {
        Self {
            skill_name: skill_name.into(),
            user_profile: None,
            learning_preferences: None,
            time_frame: None,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_profile.as_ref().map(|p| p.user_id.as_str())
    }

    /// Weekly hours the learner can spend.
    ///
    /// Falls back to [`DEFAULT_WEEKLY_HOURS`] when there is no profile or the
    /// profile value is not a positive number.
    pub fn weekly_hours(&self) -> f64 {
        match &self.user_profile {
            None => DEFAULT_WEEKLY_HOURS,
            Some(profile) => {
                let hours = profile.time_availability.hours_per_week;
                if hours.is_finite() && hours > 0.0 {
                    hours
                } else {
                    warn!(
                        user_id = %profile.user_id,
                        hours,
                        "ignoring non-positive hours_per_week, using default"
                    );
                    DEFAULT_WEEKLY_HOURS
                }
            }
        }
    }

    pub fn time_frame_days(&self) -> u32 {
        self.time_frame.unwrap_or(DEFAULT_TIME_FRAME_DAYS)
    }
}
