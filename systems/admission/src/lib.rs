#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure admission system deciding whether a pod may move onto a node.
//!
//! Checks run in a fixed order and stop at the first failure: no-op move,
//! slot capacity, then resource fit, storage fit and physical-host
//! anti-affinity when the level enables those families. The system never
//! mutates state; callers turn an admitted move into a world command.

use cluster_conductor_core::{
    HostId, MoveRejection, NodeId, NodeSnapshot, PodSnapshot, ValidationFlags,
};

/// Verdict for a move that passed every enabled check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// The pod may be scheduled onto the node.
    Admit,
    /// The pod already runs on the node; nothing needs to change.
    AlreadyPlaced,
}

/// Decides whether `pod` may be scheduled onto `node`.
///
/// `nodes` and `pods` describe the whole placement so that anti-affinity can
/// look across every node sharing the target's physical host.
pub fn admit(
    pod: &PodSnapshot,
    node: &NodeSnapshot,
    nodes: &[NodeSnapshot],
    pods: &[PodSnapshot],
    flags: ValidationFlags,
) -> Result<Admission, MoveRejection> {
    if pod.is_on(&node.id) {
        return Ok(Admission::AlreadyPlaced);
    }

    check_capacity(node)?;
    if flags.resources {
        check_resources(pod, node)?;
    }
    if flags.storage {
        check_storage(pod, node)?;
    }
    if flags.anti_affinity {
        check_anti_affinity(pod, node, nodes, pods)?;
    }

    Ok(Admission::Admit)
}

/// Lists every node the pod could currently be scheduled onto, in node order.
#[must_use]
pub fn placeable_nodes(
    pod: &PodSnapshot,
    nodes: &[NodeSnapshot],
    pods: &[PodSnapshot],
    flags: ValidationFlags,
) -> Vec<NodeId> {
    nodes
        .iter()
        .filter(|node| admit(pod, node, nodes, pods, flags).is_ok())
        .map(|node| node.id.clone())
        .collect()
}

fn check_capacity(node: &NodeSnapshot) -> Result<(), MoveRejection> {
    if node.is_full() {
        return Err(MoveRejection::CapacityExceeded {
            node: node.name.clone(),
            capacity: node.capacity,
        });
    }
    Ok(())
}

fn check_resources(pod: &PodSnapshot, node: &NodeSnapshot) -> Result<(), MoveRejection> {
    let available_vcpu = node.budget.available_vcpu();
    if pod.request.vcpu > available_vcpu {
        return Err(MoveRejection::InsufficientVcpu {
            node: node.name.clone(),
            requested: pod.request.vcpu,
            available: available_vcpu,
            shortfall: pod.request.vcpu - available_vcpu,
        });
    }

    let available_memory = node.budget.available_memory();
    if pod.request.memory > available_memory {
        return Err(MoveRejection::InsufficientMemory {
            node: node.name.clone(),
            requested: pod.request.memory,
            available: available_memory,
            shortfall: pod.request.memory - available_memory,
        });
    }

    Ok(())
}

fn check_storage(pod: &PodSnapshot, node: &NodeSnapshot) -> Result<(), MoveRejection> {
    let Some(required) = pod.storage.and_then(|storage| storage.binding_type()) else {
        return Ok(());
    };
    if node.infrastructure.storage_types.contains(&required) {
        return Ok(());
    }
    Err(MoveRejection::UnsupportedStorageType {
        node: node.name.clone(),
        required,
        available: node.infrastructure.storage_types.iter().copied().collect(),
    })
}

fn check_anti_affinity(
    pod: &PodSnapshot,
    node: &NodeSnapshot,
    nodes: &[NodeSnapshot],
    pods: &[PodSnapshot],
) -> Result<(), MoveRejection> {
    let Some(key) = pod.scheduling.anti_affinity_key.as_deref() else {
        return Ok(());
    };
    let Some(host) = node.physical_host() else {
        return Ok(());
    };

    let conflict = pods.iter().find(|other| {
        other.id != pod.id
            && other.scheduling.anti_affinity_key.as_deref() == Some(key)
            && other
                .node
                .as_ref()
                .is_some_and(|placed| placed == &node.id || runs_on(nodes, placed, host))
    });

    match conflict {
        Some(other) => Err(MoveRejection::AntiAffinityViolation {
            key: key.to_owned(),
            conflicting_pod: other.name.clone(),
            host: host.clone(),
        }),
        None => Ok(()),
    }
}

fn runs_on(nodes: &[NodeSnapshot], node: &NodeId, host: &HostId) -> bool {
    nodes
        .iter()
        .any(|candidate| &candidate.id == node && candidate.physical_host() == Some(host))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use cluster_conductor_core::{
        Infrastructure, NodeType, PodId, PodStatus, ResourceBudget, ResourceRequest,
        SchedulingHints,
    };

    use super::*;

    #[test]
    fn no_op_move_skips_capacity_check() {
        let node = NodeSnapshot {
            id: NodeId::new("node-1"),
            name: "node-1".to_owned(),
            capacity: 1,
            occupants: vec![PodId::new("pod-1")],
            budget: ResourceBudget::unused(1.0, 1.0),
            infrastructure: Infrastructure {
                node_type: NodeType::Worker,
                hypervisor: None,
                physical_host: None,
                storage_types: BTreeSet::new(),
                zone: None,
            },
        };
        let pod = PodSnapshot {
            id: PodId::new("pod-1"),
            name: "pod-1".to_owned(),
            tag: String::new(),
            status: PodStatus::Running,
            node: Some(NodeId::new("node-1")),
            request: ResourceRequest {
                vcpu: 4.0,
                memory: 4.0,
            },
            storage: None,
            scheduling: SchedulingHints::default(),
        };
        let flags = ValidationFlags {
            resources: true,
            storage: true,
            anti_affinity: true,
        };

        let verdict = admit(
            &pod,
            &node,
            std::slice::from_ref(&node),
            std::slice::from_ref(&pod),
            flags,
        );

        assert_eq!(verdict, Ok(Admission::AlreadyPlaced));
    }
}
