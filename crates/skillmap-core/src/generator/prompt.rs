//! Prompt construction for skill decomposition.
//!
//! Pure string assembly; no I/O.

use super::request::GenerationRequest;

/// Which kind of plan the model is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanKind {
    Hierarchy,
    Program,
}

const HIERARCHY_GUIDELINES: &str = r#"## Guidelines for Skill Decomposition

1. Start with the main skill as the root node.
2. Break it down into 3-5 major categories or sub-skills.
3. Break each sub-skill down further into specific learnable components.
4. Progress logically from fundamentals to advanced topics.
5. Put time estimates on leaf nodes (concrete skills); summary nodes use 0.
6. Include specific learning resources for each node.
7. Take the learner's background, learning style and time constraints into account.
8. Keep parent_id and children consistent: every child lists its parent, every parent lists its children.
"#;

const HIERARCHY_SCHEMA: &str = r#"## Output Format

Answer with a single JSON object and nothing else:

```json
{
  "skills": {
    "root": {
      "name": "Main Skill Name",
      "description": "Description of the main skill",
      "estimated_hours": 0,
      "parent_id": null,
      "children": ["id1", "id2"],
      "depth": 0,
      "resources": [{"type": "book", "name": "Resource Name", "url": "https://..."}]
    },
    "id1": {
      "name": "Sub-skill 1",
      "description": "Description of sub-skill 1",
      "estimated_hours": 12,
      "parent_id": "root",
      "children": [],
      "depth": 1,
      "resources": []
    }
  }
}
```
"#;

const PROGRAM_GUIDELINES: &str = r#"## Guidelines for the 30-Day Program

1. Produce exactly 30 daily tasks, numbered 1 through 30 with no gaps.
2. Each day should fit in a single study session.
3. Ramp difficulty from beginner through intermediate to advanced.
4. Mix theory, practice and review days; end with a capstone.
5. Include concrete resources for each day.
"#;

const PROGRAM_SCHEMA: &str = r#"## Output Format

Answer with a single JSON object and nothing else:

```json
{
  "description": "One paragraph describing the program",
  "days": {
    "day-1": {
      "day": 1,
      "name": "Task name",
      "description": "What to do today",
      "difficulty": "beginner",
      "estimated_hours": 1.5,
      "resources": [{"type": "video", "name": "Resource Name"}]
    }
  }
}
```
"#;

/// Build the system prompt for the requested plan kind.
pub fn build_system_prompt(kind: PlanKind) -> String {
    let mut prompt = String::with_capacity(2048);
    prompt.push_str(
        "You are a world-class educational expert specializing in skill decomposition \
         and learning path creation.\n\n",
    );
    match kind {
        PlanKind::Hierarchy => {
            prompt.push_str(
                "Your task is to break a skill down into a logical, hierarchical learning path.\n\n",
            );
            prompt.push_str(HIERARCHY_GUIDELINES);
            prompt.push('\n');
            prompt.push_str(HIERARCHY_SCHEMA);
        }
        PlanKind::Program => {
            prompt.push_str(
                "Your task is to turn a skill into a 30-day program of daily learning tasks.\n\n",
            );
            prompt.push_str(PROGRAM_GUIDELINES);
            prompt.push('\n');
            prompt.push_str(PROGRAM_SCHEMA);
        }
    }
    prompt
}

/// Build the user prompt carrying the request context.
pub fn build_user_prompt(request: &GenerationRequest, kind: PlanKind) -> String {
    let mut prompt = String::with_capacity(1024);
    prompt.push_str("## Input Information\n\n");
    prompt.push_str(&format!("- Skill to learn: {}\n", request.skill_name));

    match &request.user_profile {
        Some(profile) => prompt.push_str(&format!(
            "- User profile: {}\n",
            serde_json::to_string(profile).unwrap_or_default()
        )),
        None => prompt.push_str("- User profile: None\n"),
    }
    match &request.learning_preferences {
        Some(prefs) => prompt.push_str(&format!(
            "- Learning preferences: {}\n",
            serde_json::to_string(prefs).unwrap_or_default()
        )),
        None => prompt.push_str("- Learning preferences: None\n"),
    }

    match kind {
        PlanKind::Hierarchy => {
            prompt.push_str(&format!(
                "- Time frame: {} days\n\n",
                request.time_frame_days()
            ));
            prompt.push_str(&format!(
                "Generate a skill map for {} based on the provided information.\n",
                request.skill_name
            ));
        }
        PlanKind::Program => {
            prompt.push_str("- Time frame: 30 days\n\n");
            prompt.push_str(&format!(
                "Generate a 30-day learning program for {} based on the provided information.\n",
                request.skill_name
            ));
        }
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::request::{
        LearnerProfile, LearningStyle, SkillLevel, TimeAvailability,
    };

    #[test]
    fn hierarchy_prompt_has_schema_and_guidelines() {
        let prompt = build_system_prompt(PlanKind::Hierarchy);
        assert!(prompt.contains("Skill Decomposition"));
        assert!(prompt.contains("\"skills\""));
        assert!(prompt.contains("\"parent_id\": null"));
        assert!(!prompt.contains("30-Day Program"));
    }

    #[test]
    fn program_prompt_asks_for_thirty_days() {
        let prompt = build_system_prompt(PlanKind::Program);
        assert!(prompt.contains("exactly 30 daily tasks"));
        assert!(prompt.contains("\"difficulty\""));
        assert!(!prompt.contains("\"skills\""));
    }

    #[test]
    fn user_prompt_defaults() {
        let prompt = build_user_prompt(&GenerationRequest::new("Go"), PlanKind::Hierarchy);
        assert!(prompt.contains("Skill to learn: Go"));
        assert!(prompt.contains("User profile: None"));
        assert!(prompt.contains("Time frame: 90 days"));
    }

    #[test]
    fn user_prompt_embeds_profile_json() {
        let request = GenerationRequest {
            user_profile: Some(LearnerProfile {
                user_id: "u-1".to_string(),
                current_skill_level: SkillLevel::Advanced,
                learning_style_preferences: vec![LearningStyle::Auditory],
                time_availability: TimeAvailability {
                    hours_per_week: 3.0,
                    preferred_session_length: Some(1.0),
                    preferred_days: None,
                },
                background_knowledge: vec!["python".to_string()],
                goals: vec![],
            }),
            time_frame: Some(14),
            ..GenerationRequest::new("Rust")
        };
        let prompt = build_user_prompt(&request, PlanKind::Hierarchy);
        assert!(prompt.contains("\"current_skill_level\":\"advanced\""));
        assert!(prompt.contains("\"python\""));
        assert!(prompt.contains("Time frame: 14 days"));
    }

    #[test]
    fn program_user_prompt_is_fixed_to_thirty_days() {
        let request = GenerationRequest {
            time_frame: Some(200),
            ..GenerationRequest::new("Piano")
        };
        let prompt = build_user_prompt(&request, PlanKind::Program);
        assert!(prompt.contains("Time frame: 30 days"));
        assert!(prompt.contains("30-day learning program for Piano"));
    }
}
