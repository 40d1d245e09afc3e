//! Minimal plans used when the model fails to produce usable output.

use serde_json::{Map, Value, json};

use super::{RawProgram, RawSkillTree};

/// Hours assigned to the single leaf of the fallback tree.
const FALLBACK_LEAF_HOURS: f64 = 40.0;

/// A two-node tree: the skill itself and one `fundamentals` leaf.
pub fn fallback_hierarchy(skill_name: &str) -> RawSkillTree {
    let mut skills = Map::new();
    skills.insert(
        "root".to_string(),
        json!({
            "name": skill_name,
            "description": format!("Learning path for {skill_name}"),
            "estimated_hours": 0,
            "parent_id": null,
            "children": ["fundamentals"],
            "depth": 0,
            "resources": [],
        }),
    );
    skills.insert(
        "fundamentals".to_string(),
        json!({
            "name": format!("{skill_name} Fundamentals"),
            "description": format!("Basic concepts of {skill_name}"),
            "estimated_hours": FALLBACK_LEAF_HOURS,
            "parent_id": "root",
            "children": [],
            "depth": 1,
            "resources": [{"type": "general", "name": "Introduction resources"}],
        }),
    );
    RawSkillTree { skills }
}

fn difficulty_for_day(day: u32) -> &'static str {
    match day {
        1..=10 => "beginner",
        11..=20 => "intermediate",
        _ => "advanced",
    }
}

/// Thirty generic practice days with rising difficulty.
pub fn fallback_program(skill_name: &str) -> RawProgram {
    let days: Map<String, Value> = (1..=30u32)
        .map(|day| {
            let difficulty = difficulty_for_day(day);
            let (name, description) = if day == 30 {
                (
                    format!("{skill_name} capstone"),
                    format!("Combine everything from the past month into one {skill_name} project"),
                )
            } else {
                (
                    format!("{skill_name} practice, day {day}"),
                    format!("Study and practice {difficulty} {skill_name} material"),
                )
            };
            (
                format!("day-{day}"),
                json!({
                    "day": day,
                    "name": name,
                    "description": description,
                    "difficulty": difficulty,
                    "estimated_hours": 1,
                    "resources": [],
                }),
            )
        })
        .collect();

    RawProgram {
        description: Some(format!("A 30-day introduction to {skill_name}")),
        days,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hierarchy_has_root_and_leaf() {
        let tree = fallback_hierarchy("Chess");
        assert_eq!(tree.skills.len(), 2);
        assert_eq!(tree.skills["root"]["name"], "Chess");
        assert_eq!(tree.skills["fundamentals"]["parent_id"], "root");
    }

    #[test]
    fn program_covers_thirty_days() {
        let program = fallback_program("Chess");
        assert_eq!(program.days.len(), 30);
        assert_eq!(program.days["day-1"]["difficulty"], "beginner");
        assert_eq!(program.days["day-15"]["difficulty"], "intermediate");
        assert_eq!(program.days["day-30"]["difficulty"], "advanced");
        assert_eq!(program.days["day-30"]["name"], "Chess capstone");
    }
}
