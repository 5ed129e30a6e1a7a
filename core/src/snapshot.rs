//! Read-only views of live placement state handed to pure systems.

use serde::{Deserialize, Serialize};

use crate::{
    ControlPlaneKind, HostId, Infrastructure, NodeId, PodId, PodStatus, ResourceBudget,
    ResourceRequest, SchedulingHints, StorageRequirement,
};

/// Snapshot of a node as stored by the world.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    /// Identifier of the node.
    pub id: NodeId,
    /// Display name.
    pub name: String,
    /// Number of pod slots.
    pub capacity: usize,
    /// Pods hosted on the node, in arrival order.
    pub occupants: Vec<PodId>,
    /// Resource totals and derived utilisation.
    pub budget: ResourceBudget,
    /// Infrastructure descriptor.
    pub infrastructure: Infrastructure,
}

impl NodeSnapshot {
    /// Reports whether every pod slot is taken.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.occupants.len() >= self.capacity
    }

    /// Reports whether the node hosts more pods than it has slots.
    #[must_use]
    pub fn over_capacity(&self) -> bool {
        self.occupants.len() > self.capacity
    }

    /// Physical host running the node, if it is virtualised.
    #[must_use]
    pub fn physical_host(&self) -> Option<&HostId> {
        self.infrastructure.physical_host.as_ref()
    }

    /// Reports whether the pod is one of the node's occupants.
    #[must_use]
    pub fn hosts(&self, pod: &PodId) -> bool {
        self.occupants.contains(pod)
    }
}

/// Snapshot of a pod as stored by the world.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PodSnapshot {
    /// Identifier of the pod.
    pub id: PodId,
    /// Display name.
    pub name: String,
    /// Type tag; empty when untagged.
    pub tag: String,
    /// Lifecycle status.
    pub status: PodStatus,
    /// Node the pod occupies, if scheduled.
    pub node: Option<NodeId>,
    /// Requested resources.
    pub request: ResourceRequest,
    /// Storage requirement, if any.
    pub storage: Option<StorageRequirement>,
    /// Scheduling hints.
    pub scheduling: SchedulingHints,
}

impl PodSnapshot {
    /// Reports whether the pod occupies a node.
    #[must_use]
    pub fn is_scheduled(&self) -> bool {
        self.node.is_some()
    }

    /// Reports whether the pod occupies the provided node.
    #[must_use]
    pub fn is_on(&self, node: &NodeId) -> bool {
        self.node.as_ref() == Some(node)
    }
}

/// Snapshot of a physical host and the nodes it runs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhysicalHostSnapshot {
    /// Identifier of the host.
    pub id: HostId,
    /// Display name.
    pub name: String,
    /// Nodes whose infrastructure names this host, in node order.
    pub nodes: Vec<NodeId>,
    /// Physical CPUs.
    pub pcpu: f64,
    /// Physical memory in GB.
    pub memory: f64,
    /// Availability zone, if any.
    pub zone: Option<String>,
}

/// Snapshot of a control-plane component.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlPlaneSnapshot {
    /// Identifier of the component.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Component kind.
    pub kind: ControlPlaneKind,
    /// Health flag.
    pub healthy: bool,
}
