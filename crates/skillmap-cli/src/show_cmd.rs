//! `skillmap show` command: print a stored plan, or list plans.

use anyhow::{Context, Result};
use uuid::Uuid;

use skillmap_core::SkillMapService;
use skillmap_db::models::{NodeStatus, SkillMap, SkillProgram};

/// Run the show command.
///
/// With an id, prints that plan. Without one, lists every stored plan of
/// the selected kind.
pub async fn run_show(
    service: &SkillMapService,
    id: Option<&str>,
    program: bool,
    json: bool,
) -> Result<()> {
    match (id, program) {
        (Some(id), false) => {
            let map = service.get_skill_map(parse_id(id)?).await?;
            print_or_json(&map, json, print_skill_map)
        }
        (Some(id), true) => {
            let prog = service.get_skill_program(parse_id(id)?).await?;
            print_or_json(&prog, json, print_skill_program)
        }
        (None, false) => {
            let maps = service.list_skill_maps(None).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&maps)?);
            } else if maps.is_empty() {
                println!("No skill maps found.");
            } else {
                for map in &maps {
                    println!(
                        "{}  {:<30} {:>6.1}h  due {}",
                        map.id,
                        map.root_skill,
                        map.total_estimated_hours,
                        map.expected_completion_date.format("%Y-%m-%d"),
                    );
                }
            }
            Ok(())
        }
        (None, true) => {
            let programs = service.list_skill_programs(None).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&programs)?);
            } else if programs.is_empty() {
                println!("No skill programs found.");
            } else {
                for prog in &programs {
                    let done = prog
                        .tasks
                        .iter()
                        .filter(|t| t.status == NodeStatus::Completed)
                        .count();
                    println!(
                        "{}  {:<30} {done:>2}/{} days  due {}",
                        prog.id,
                        prog.skill_name,
                        prog.tasks.len(),
                        prog.expected_completion_date.format("%Y-%m-%d"),
                    );
                }
            }
            Ok(())
        }
    }
}

pub fn parse_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id).with_context(|| format!("invalid plan ID: {id}"))
}

fn print_or_json<T: serde::Serialize>(value: &T, json: bool, print: fn(&T)) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print(value);
    }
    Ok(())
}

fn status_icon(status: NodeStatus) -> &'static str {
    match status {
        NodeStatus::NotStarted => " ",
        NodeStatus::InProgress => "*",
        NodeStatus::Completed => "+",
    }
}

/// Print a skill map as an indented tree, children in their listed order.
pub fn print_skill_map(map: &SkillMap) {
    println!("Skill map: {} ({})", map.root_skill, map.id);
    println!("Total: {:.1}h", map.total_estimated_hours);
    println!(
        "Expected completion: {}",
        map.expected_completion_date.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!();

    let mut stack: Vec<&str> = map
        .nodes
        .values()
        .filter(|n| n.parent_id.is_none())
        .map(|n| n.id.as_str())
        .collect();
    while let Some(id) = stack.pop() {
        let Some(node) = map.nodes.get(id) else {
            continue;
        };
        let indent = "  ".repeat(node.depth as usize);
        let hours = if node.is_leaf() {
            format!(" ({:.1}h)", node.estimated_hours)
        } else {
            String::new()
        };
        println!(
            "{indent}[{}] {}{hours} {:.0}%",
            status_icon(node.status),
            node.name,
            node.progress
        );
        stack.extend(node.children.iter().rev().map(String::as_str));
    }
}

/// Print a skill program one line per day.
pub fn print_skill_program(program: &SkillProgram) {
    println!("Skill program: {} ({})", program.skill_name, program.id);
    println!("{}", program.description);
    println!(
        "Total: {:.1}h, expected completion {}",
        program.total_estimated_hours,
        program.expected_completion_date.format("%Y-%m-%d")
    );
    println!();
    for task in &program.tasks {
        println!(
            "  [{}] day {:>2} {:<12} {} ({:.1}h) {:.0}%",
            status_icon(task.status),
            task.day,
            task.difficulty,
            task.name,
            task.estimated_hours,
            task.progress
        );
    }
}
