use std::collections::BTreeSet;

use cluster_conductor_core::{Count, NodeId, NodeSnapshot, ObjectiveRule, PodSelector, PodSnapshot};

pub(crate) fn holds(rule: &ObjectiveRule, nodes: &[NodeSnapshot], pods: &[PodSnapshot]) -> bool {
    match rule {
        ObjectiveRule::CountOnNodes {
            pods: selector,
            nodes: targets,
            count,
        } => count_on_nodes(pods, selector, targets, *count),
        ObjectiveRule::OccupantsPerNode { count } => nodes
            .iter()
            .all(|node| count.satisfied_by(node.occupants.len())),
        ObjectiveRule::DistinctTagsPerNode => distinct_tags_per_node(nodes, pods),
        ObjectiveRule::Pinned { pins } => pins.iter().all(|pin| {
            named(pods, &pin.pod).is_some_and(|pod| pod.is_on(&pin.node))
        }),
        ObjectiveRule::SeparatedPairs { pairs } => pairs
            .iter()
            .all(|(left, right)| separated(pods, left, right)),
        ObjectiveRule::RestrictedTo {
            pods: selector,
            nodes: allowed,
            allow_unscheduled,
        } => selected(pods, selector).all(|pod| match &pod.node {
            Some(node) => allowed.contains(node),
            None => *allow_unscheduled,
        }),
        ObjectiveRule::ExcludedFrom {
            pods: selector,
            nodes: excluded,
            require_scheduled,
        } => selected(pods, selector).all(|pod| match &pod.node {
            Some(node) => !excluded.contains(node),
            None => !*require_scheduled,
        }),
        ObjectiveRule::SpreadAcrossNodes {
            groups,
            replicas,
            within,
        } => groups
            .iter()
            .all(|group| spread(pods, group, *replicas, within)),
        ObjectiveRule::Quorum {
            groups,
            nodes: designated,
            minimum,
        } => groups.iter().all(|group| {
            selected(pods, group)
                .filter(|pod| pod.node.as_ref().is_some_and(|node| designated.contains(node)))
                .count()
                >= *minimum
        }),
        ObjectiveRule::AllScheduled {
            pods: selector,
            within_capacity,
        } => {
            selected(pods, selector).all(PodSnapshot::is_scheduled)
                && (!within_capacity || nodes.iter().all(|node| !node.over_capacity()))
        }
        ObjectiveRule::MinimumScheduled {
            pods: selector,
            minimum,
        } => selected(pods, selector).filter(|pod| pod.is_scheduled()).count() >= *minimum,
        ObjectiveRule::Balanced { excluded } => balanced(nodes, excluded),
        ObjectiveRule::WithinCapacity { excluded } => nodes
            .iter()
            .filter(|node| !excluded.contains(&node.id))
            .all(|node| !node.over_capacity()),
    }
}

fn selected<'a>(
    pods: &'a [PodSnapshot],
    selector: &'a PodSelector,
) -> impl Iterator<Item = &'a PodSnapshot> + 'a {
    pods.iter().filter(move |pod| selector.matches(&pod.name))
}

fn named<'a>(pods: &'a [PodSnapshot], name: &str) -> Option<&'a PodSnapshot> {
    pods.iter().find(|pod| pod.name == name)
}

fn count_on_nodes(
    pods: &[PodSnapshot],
    selector: &PodSelector,
    targets: &[NodeId],
    count: Count,
) -> bool {
    targets.iter().all(|target| {
        let observed = selected(pods, selector)
            .filter(|pod| pod.is_on(target))
            .count();
        count.satisfied_by(observed)
    })
}

fn distinct_tags_per_node(nodes: &[NodeSnapshot], pods: &[PodSnapshot]) -> bool {
    nodes.iter().all(|node| {
        let mut seen = BTreeSet::new();
        pods.iter()
            .filter(|pod| pod.is_on(&node.id) && !pod.tag.is_empty())
            .all(|pod| seen.insert(pod.tag.as_str()))
    })
}

fn separated(pods: &[PodSnapshot], left: &str, right: &str) -> bool {
    let (Some(left), Some(right)) = (named(pods, left), named(pods, right)) else {
        return false;
    };
    match (&left.node, &right.node) {
        (Some(a), Some(b)) => a != b,
        _ => false,
    }
}

fn spread(pods: &[PodSnapshot], group: &PodSelector, replicas: usize, within: &[NodeId]) -> bool {
    let placed: Vec<&NodeId> = selected(pods, group)
        .filter_map(|pod| pod.node.as_ref())
        .collect();
    let distinct: BTreeSet<&NodeId> = placed.iter().copied().collect();

    placed.len() == replicas
        && distinct.len() == replicas
        && (within.is_empty() || placed.iter().all(|node| within.contains(node)))
}

fn balanced(nodes: &[NodeSnapshot], excluded: &[NodeId]) -> bool {
    let active: Vec<usize> = nodes
        .iter()
        .filter(|node| !excluded.contains(&node.id))
        .map(|node| node.occupants.len())
        .collect();
    if active.is_empty() {
        return true;
    }

    let total: usize = active.iter().sum();
    let mean = total as f64 / active.len() as f64;
    active
        .iter()
        .all(|&count| (count as f64 - mean).abs() <= 1.0)
}
