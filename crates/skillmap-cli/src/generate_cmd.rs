//! `skillmap generate` command: create a plan from the command line.

use anyhow::Result;

use skillmap_core::SkillMapService;
use skillmap_core::generator::{
    GenerationRequest, LearnerProfile, SkillLevel, TimeAvailability,
};

use crate::show_cmd;

pub struct GenerateOptions {
    pub program: bool,
    pub hours_per_week: Option<f64>,
    pub time_frame: Option<u32>,
    pub user_id: Option<String>,
    pub json: bool,
}

/// Build the generation request the CLI flags describe.
///
/// A learner profile is only attached when the caller gave a user id or
/// weekly hours.
pub fn build_request(skill: &str, options: &GenerateOptions) -> GenerationRequest {
    let user_profile = if options.user_id.is_some() || options.hours_per_week.is_some() {
        Some(LearnerProfile {
            user_id: options
                .user_id
                .clone()
                .unwrap_or_else(|| "local".to_string()),
            current_skill_level: SkillLevel::Beginner,
            learning_style_preferences: Vec::new(),
            time_availability: TimeAvailability {
                hours_per_week: options
                    .hours_per_week
                    .unwrap_or(skillmap_core::generator::request::DEFAULT_WEEKLY_HOURS),
                preferred_session_length: None,
                preferred_days: None,
            },
            background_knowledge: Vec::new(),
            goals: Vec::new(),
        })
    } else {
        None
    };

    GenerationRequest {
        user_profile,
        time_frame: options.time_frame,
        ..GenerationRequest::new(skill)
    }
}

pub async fn run_generate(
    service: &SkillMapService,
    skill: &str,
    options: &GenerateOptions,
) -> Result<()> {
    let request = build_request(skill, options);
    if !options.json {
        println!("Generating with {}...", service.generator_name());
    }

    if options.program {
        let program = service.generate_skill_program(&request).await?;
        if options.json {
            println!("{}", serde_json::to_string_pretty(&program)?);
        } else {
            show_cmd::print_skill_program(&program);
        }
    } else {
        let map = service.generate_skill_map(&request).await?;
        if options.json {
            println!("{}", serde_json::to_string_pretty(&map)?);
        } else {
            show_cmd::print_skill_map(&map);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> GenerateOptions {
        GenerateOptions {
            program: false,
            hours_per_week: None,
            time_frame: None,
            user_id: None,
            json: false,
        }
    }

    #[test]
    fn bare_request_has_no_profile() {
        let request = build_request("Rust", &options());
        assert_eq!(request.skill_name, "Rust");
        assert!(request.user_profile.is_none());
        assert_eq!(request.weekly_hours(), 10.0);
    }

    #[test]
    fn hours_flag_creates_profile() {
        let request = build_request(
            "Rust",
            &GenerateOptions {
                hours_per_week: Some(4.0),
                time_frame: Some(30),
                ..options()
            },
        );
        assert_eq!(request.weekly_hours(), 4.0);
        assert_eq!(request.user_id(), Some("local"));
        assert_eq!(request.time_frame_days(), 30);
    }

    #[test]
    fn user_id_flag_keeps_default_hours() {
        let request = build_request(
            "Rust",
            &GenerateOptions {
                user_id: Some("alice".to_string()),
                ..options()
            },
        );
        assert_eq!(request.user_id(), Some("alice"));
        assert_eq!(request.weekly_hours(), 10.0);
    }
}
