//! `skillmap progress` command: record progress against a stored plan.

use std::collections::BTreeMap;
use std::str::FromStr;

use anyhow::{Context, Result, bail};

use skillmap_core::SkillMapService;
use skillmap_core::adjust::{ContextChange, DayProgress, NodeProgress, ProgressOutcome};

use crate::show_cmd;

pub struct ProgressOptions {
    /// `node_id=percentage` pairs (skill maps).
    pub nodes: Vec<String>,
    /// `day=percentage` pairs (skill programs).
    pub days: Vec<String>,
    /// Impact factors of context changes, -1.0 to 1.0.
    pub impacts: Vec<f64>,
    /// Tag recorded on each context change.
    pub reason: String,
}

/// Split `target=value` into its parts.
pub fn parse_assignment<T: FromStr>(raw: &str) -> Result<(T, f64)>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let Some((target, value)) = raw.split_once('=') else {
        bail!("expected TARGET=PERCENT, got {raw:?}");
    };
    let target = target
        .trim()
        .parse::<T>()
        .with_context(|| format!("invalid target in {raw:?}"))?;
    let value = value
        .trim()
        .parse::<f64>()
        .with_context(|| format!("invalid percentage in {raw:?}"))?;
    Ok((target, value))
}

fn context_changes(options: &ProgressOptions) -> Vec<ContextChange> {
    options
        .impacts
        .iter()
        .map(|&impact_factor| ContextChange {
            change_type: options.reason.clone(),
            description: String::new(),
            impact_factor,
            affected_period: BTreeMap::new(),
        })
        .collect()
}

fn print_summary<T>(outcome: &ProgressOutcome<T>) {
    if let Some(summary) = outcome.summary() {
        println!();
        println!("{summary}");
    }
}

pub async fn run_progress(
    service: &SkillMapService,
    id: &str,
    program: bool,
    options: &ProgressOptions,
) -> Result<()> {
    let id = show_cmd::parse_id(id)?;
    let changes = context_changes(options);

    if program {
        if !options.nodes.is_empty() {
            bail!("--node applies to skill maps; use --day for programs");
        }
        let reports = options
            .days
            .iter()
            .map(|raw| {
                let (day, completion_percentage) = parse_assignment::<u32>(raw)?;
                Ok(DayProgress {
                    day,
                    completion_percentage,
                    time_spent: 0.0,
                    notes: None,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let outcome = service
            .update_program_progress(id, &reports, &changes)
            .await?;
        show_cmd::print_skill_program(&outcome.plan);
        print_summary(&outcome);
    } else {
        if !options.days.is_empty() {
            bail!("--day applies to skill programs; pass --program");
        }
        let reports = options
            .nodes
            .iter()
            .map(|raw| {
                let (node_id, completion_percentage) = parse_assignment::<String>(raw)?;
                Ok(NodeProgress {
                    node_id,
                    completion_percentage,
                    time_spent: 0.0,
                    notes: None,
                    assessment_results: None,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let outcome = service.update_progress(id, &reports, &changes).await?;
        show_cmd::print_skill_map(&outcome.plan);
        print_summary(&outcome);
    }
    Ok(())
}
