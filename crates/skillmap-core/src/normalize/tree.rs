//! Skill-map normalization: raw node bags to a validated tree.

use std::collections::{BTreeMap, HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use skillmap_db::models::{NewSkillMap, NodeStatus, SkillNode, SkillResource};
use tracing::{debug, warn};

use super::fields::Entry;
use super::{completion_after_hours, leaf_hours};
use crate::error::SkillMapError;
use crate::generator::GenerationRequest;

/// A node as read from the generator, before the tree is checked.
struct RawNode {
    name: String,
    description: String,
    estimated_hours: f64,
    parent_id: Option<String>,
    children: Vec<String>,
    resources: Vec<SkillResource>,
    declared_depth: i64,
}

fn read_node(id: &str, value: &Value) -> Result<RawNode, SkillMapError> {
    let entry = Entry::new(id, value)?;
    Ok(RawNode {
        name: entry.required_str("name")?,
        description: entry.required_str("description")?,
        estimated_hours: entry.required_hours("estimated_hours")?,
        parent_id: entry.optional_str("parent_id")?,
        children: entry.string_list("children")?,
        resources: entry.resources()?,
        declared_depth: entry.integer("depth")?.unwrap_or(0),
    })
}

/// Check that `children` lists and `parent_id` pointers describe one tree
/// and return its root id.
fn check_structure(nodes: &BTreeMap<&str, RawNode>) -> Result<String, SkillMapError> {
    let invalid = |msg: String| Err(SkillMapError::InvalidTreeStructure(msg));

    let roots: Vec<&str> = nodes
        .iter()
        .filter(|(_, node)| node.parent_id.is_none())
        .map(|(id, _)| *id)
        .collect();
    let root = match roots.as_slice() {
        [] => return invalid("no root node (every node has a parent_id)".to_string()),
        [root] => *root,
        many => return invalid(format!("multiple root nodes: {}", many.join(", "))),
    };

    let mut claimed_by: HashMap<&str, &str> = HashMap::new();
    for (&id, node) in nodes {
        for child in &node.children {
            let child = child.as_str();
            if !nodes.contains_key(child) {
                return invalid(format!("node {id:?} lists unknown child {child:?}"));
            }
            if child == root {
                return invalid(format!("root {root:?} is listed as a child of {id:?}"));
            }
            if let Some(first) = claimed_by.insert(child, id) {
                return invalid(format!(
                    "node {child:?} is claimed by both {first:?} and {id:?}"
                ));
            }
        }
    }

    for (&id, node) in nodes {
        let Some(parent) = node.parent_id.as_deref() else {
            continue;
        };
        if !nodes.contains_key(parent) {
            return invalid(format!("node {id:?} has unknown parent_id {parent:?}"));
        }
        match claimed_by.get(id).copied() {
            Some(claimant) if claimant == parent => {}
            Some(claimant) => {
                return invalid(format!(
                    "node {id:?} has parent_id {parent:?} but is listed under {claimant:?}"
                ));
            }
            None => {
                return invalid(format!(
                    "node {id:?} is missing from the children of its parent {parent:?}"
                ));
            }
        }
    }

    Ok(root.to_string())
}

/// Breadth-first walk from the root assigning depths.
///
/// Fails when some node cannot be reached, which after [`check_structure`]
/// only happens for cycles detached from the root.
fn compute_depths<'a>(
    nodes: &BTreeMap<&'a str, RawNode>,
    root: &'a str,
) -> Result<HashMap<&'a str, u32>, SkillMapError> {
    let mut depths: HashMap<&str, u32> = HashMap::with_capacity(nodes.len());
    let mut queue = VecDeque::from([(root, 0u32)]);
    while let Some((id, depth)) = queue.pop_front() {
        if depths.insert(id, depth).is_some() {
            continue;
        }
        if let Some((_, node)) = nodes.get_key_value(id) {
            for child in &node.children {
                if let Some((child_id, _)) = nodes.get_key_value(child.as_str()) {
                    queue.push_back((*child_id, depth + 1));
                }
            }
        }
    }

    if depths.len() != nodes.len() {
        let mut unreachable: Vec<&str> = nodes
            .keys()
            .filter(|id| !depths.contains_key(*id))
            .copied()
            .collect();
        unreachable.sort_unstable();
        return Err(SkillMapError::InvalidTreeStructure(format!(
            "nodes not reachable from the root (cycle): {}",
            unreachable.join(", ")
        )));
    }
    Ok(depths)
}

/// Turn raw generator output into a validated, unsaved skill map.
///
/// All nodes start at 0% / not started. Depths are recomputed from the
/// parent chain; a declared depth that disagrees is logged and replaced.
pub fn normalize_skill_map(
    skills: &Map<String, Value>,
    request: &GenerationRequest,
    now: DateTime<Utc>,
) -> Result<NewSkillMap, SkillMapError> {
    if skills.is_empty() {
        return Err(SkillMapError::InvalidTreeStructure(
            "skill map has no nodes".to_string(),
        ));
    }

    let raw: BTreeMap<&str, RawNode> = skills
        .iter()
        .map(|(id, value)| Ok((id.as_str(), read_node(id, value)?)))
        .collect::<Result<_, SkillMapError>>()?;

    let root = check_structure(&raw)?;
    let depths = compute_depths(&raw, &root)?;

    let nodes: BTreeMap<String, SkillNode> = raw
        .into_iter()
        .map(|(id, node)| {
            let depth = depths.get(id).copied().unwrap_or_default();
            if node.declared_depth != i64::from(depth) {
                warn!(
                    node = id,
                    declared = node.declared_depth,
                    computed = depth,
                    "correcting node depth"
                );
            }
            let normalized = SkillNode {
                id: id.to_string(),
                name: node.name,
                description: node.description,
                estimated_hours: node.estimated_hours,
                parent_id: node.parent_id,
                children: node.children,
                resources: node.resources,
                depth,
                progress: 0.0,
                status: NodeStatus::NotStarted,
            };
            (id.to_string(), normalized)
        })
        .collect();

    let total = leaf_hours(nodes.values());
    let expected_completion_date = completion_after_hours(now, total, request.weekly_hours())?;
    debug!(nodes = nodes.len(), %root, total, "normalized skill map");

    Ok(NewSkillMap {
        user_id: request.user_id().map(str::to_string),
        root_skill: request.skill_name.clone(),
        nodes,
        total_estimated_hours: total,
        expected_completion_date,
    })
}
