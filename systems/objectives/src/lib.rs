#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure objective evaluator that scores level objectives against a placement.
//!
//! Every call recomputes every objective from scratch. Identical placements
//! always produce identical statuses.

mod rules;

use cluster_conductor_core::{
    NodeSnapshot, ObjectiveRule, ObjectiveSpec, ObjectiveStatus, PodSnapshot,
};

/// Scores every objective against the provided nodes and pods.
#[must_use]
pub fn evaluate(
    objectives: &[ObjectiveSpec],
    nodes: &[NodeSnapshot],
    pods: &[PodSnapshot],
) -> Vec<ObjectiveStatus> {
    objectives
        .iter()
        .map(|objective| ObjectiveStatus {
            description: objective.description.clone(),
            completed: holds(&objective.rule, nodes, pods),
        })
        .collect()
}

/// Reports whether a single rule holds for the provided nodes and pods.
#[must_use]
pub fn holds(rule: &ObjectiveRule, nodes: &[NodeSnapshot], pods: &[PodSnapshot]) -> bool {
    rules::holds(rule, nodes, pods)
}

/// Reports whether every objective is completed.
#[must_use]
pub fn all_complete(statuses: &[ObjectiveStatus]) -> bool {
    statuses.iter().all(|status| status.completed)
}

/// Number of completed objectives.
#[must_use]
pub fn completed_count(statuses: &[ObjectiveStatus]) -> usize {
    statuses.iter().filter(|status| status.completed).count()
}
