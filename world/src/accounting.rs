//! Occupancy and resource accounting kept in lockstep with pod placement.

use cluster_conductor_core::{NodeId, PodStatus};

use super::{Node, Pod, World};

/// Rebuilds every node's occupant list from the pods' node references.
pub(crate) fn rebuild(world: &mut World) {
    for node in &mut world.nodes {
        node.occupants.clear();
    }
    for pod in &world.pods {
        let Some(target) = &pod.node else {
            continue;
        };
        if let Some(node) = world.nodes.iter_mut().find(|node| &node.id == target) {
            node.occupants.push(pod.id.clone());
        }
    }
    for node in &mut world.nodes {
        recount(node, &world.pods);
    }
}

/// Moves a pod onto a node and returns the node it left, if any.
pub(crate) fn relocate(world: &mut World, pod_index: usize, node_index: usize) -> Option<NodeId> {
    let pod_id = world.pods[pod_index].id.clone();
    let previous = world.pods[pod_index].node.take();

    if let Some(source) = &previous {
        if let Some(node) = world.nodes.iter_mut().find(|node| &node.id == source) {
            node.occupants.retain(|occupant| occupant != &pod_id);
            recount(node, &world.pods);
        }
    }

    let target = &mut world.nodes[node_index];
    target.occupants.push(pod_id);
    world.pods[pod_index].node = Some(target.id.clone());
    world.pods[pod_index].status = PodStatus::Running;
    recount(target, &world.pods);

    previous
}

/// Unschedules every pod and zeroes every node's counters.
pub(crate) fn clear(world: &mut World) {
    for pod in &mut world.pods {
        pod.node = None;
        pod.status = PodStatus::Pending;
    }
    for node in &mut world.nodes {
        node.occupants.clear();
        node.budget.vcpu_used = 0.0;
        node.budget.memory_used = 0.0;
    }
}

fn recount(node: &mut Node, pods: &[Pod]) {
    let mut vcpu = 0.0;
    let mut memory = 0.0;
    for occupant in &node.occupants {
        if let Some(pod) = pods.iter().find(|pod| &pod.id == occupant) {
            vcpu += pod.request.vcpu;
            memory += pod.request.memory;
        }
    }
    node.budget.vcpu_used = vcpu;
    node.budget.memory_used = memory;
}
