#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative placement state for Cluster Conductor.
//!
//! The world holds the live copy of a level's nodes and pods. It trusts the
//! commands it receives: legality is decided upstream by the admission
//! system, and the world only keeps occupancy and resource accounting
//! consistent.

mod accounting;

use cluster_conductor_core::{
    Command, ControlPlaneKind, ControlPlaneSpec, Event, HostId, Infrastructure, Level, NodeId,
    NodeSpec, PhysicalHostSpec, PodId, PodSpec, PodStatus, ResourceBudget, ResourceRequest,
    SchedulingHints, StorageRequirement, ValidationFlags,
};
use tracing::{debug, warn};

/// Represents the live placement state of the loaded level.
#[derive(Debug)]
pub struct World {
    nodes: Vec<Node>,
    pods: Vec<Pod>,
    physical_hosts: Vec<PhysicalHost>,
    control_plane: Vec<ControlPlaneComponent>,
    validation: ValidationFlags,
}

impl World {
    /// Copies a level template into a fresh placement state.
    ///
    /// Node occupant lists are rebuilt from the pods' starting nodes and the
    /// resource counters are recomputed, so templates only need to say where
    /// each pod starts.
    #[must_use]
    pub fn from_level(level: &Level) -> Self {
        let nodes: Vec<Node> = level.nodes.iter().map(Node::from_spec).collect();
        let pods: Vec<Pod> = level.pods.iter().map(Pod::from_spec).collect();
        let physical_hosts = level
            .physical_hosts
            .iter()
            .map(|spec| PhysicalHost::from_spec(spec, &nodes))
            .collect();
        let control_plane = level
            .control_plane
            .iter()
            .map(ControlPlaneComponent::from_spec)
            .collect();

        let mut world = Self {
            nodes,
            pods,
            physical_hosts,
            control_plane,
            validation: level.validation,
        };
        accounting::rebuild(&mut world);
        world
    }

    fn node_index(&self, node: &NodeId) -> Option<usize> {
        self.nodes.iter().position(|candidate| &candidate.id == node)
    }

    fn pod_index(&self, pod: &PodId) -> Option<usize> {
        self.pods.iter().position(|candidate| &candidate.id == pod)
    }
}

#[derive(Clone, Debug)]
struct Node {
    id: NodeId,
    name: String,
    capacity: usize,
    occupants: Vec<PodId>,
    budget: ResourceBudget,
    infrastructure: Infrastructure,
}

impl Node {
    fn from_spec(spec: &NodeSpec) -> Self {
        Self {
            id: spec.id.clone(),
            name: spec.name.clone(),
            capacity: spec.capacity,
            occupants: Vec::new(),
            budget: ResourceBudget::unused(spec.vcpu, spec.memory),
            infrastructure: spec.infrastructure.clone(),
        }
    }
}

#[derive(Clone, Debug)]
struct Pod {
    id: PodId,
    name: String,
    tag: String,
    status: PodStatus,
    node: Option<NodeId>,
    request: ResourceRequest,
    storage: Option<StorageRequirement>,
    scheduling: SchedulingHints,
}

impl Pod {
    fn from_spec(spec: &PodSpec) -> Self {
        Self {
            id: spec.id.clone(),
            name: spec.name.clone(),
            tag: spec.tag.clone(),
            status: spec.initial_status(),
            node: spec.node.clone(),
            request: spec.request,
            storage: spec.storage,
            scheduling: spec.scheduling.clone(),
        }
    }
}

#[derive(Clone, Debug)]
struct PhysicalHost {
    id: HostId,
    name: String,
    nodes: Vec<NodeId>,
    pcpu: f64,
    memory: f64,
    zone: Option<String>,
}

impl PhysicalHost {
    fn from_spec(spec: &PhysicalHostSpec, nodes: &[Node]) -> Self {
        Self {
            id: spec.id.clone(),
            name: spec.name.clone(),
            nodes: nodes
                .iter()
                .filter(|node| node.infrastructure.physical_host.as_ref() == Some(&spec.id))
                .map(|node| node.id.clone())
                .collect(),
            pcpu: spec.pcpu,
            memory: spec.memory,
            zone: spec.zone.clone(),
        }
    }
}

#[derive(Clone, Debug)]
struct ControlPlaneComponent {
    id: String,
    name: String,
    kind: ControlPlaneKind,
    healthy: bool,
}

impl ControlPlaneComponent {
    fn from_spec(spec: &ControlPlaneSpec) -> Self {
        Self {
            id: spec.id.clone(),
            name: spec.name.clone(),
            kind: spec.kind,
            healthy: spec.healthy,
        }
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::SchedulePod { pod, node } => {
            let (Some(pod_index), Some(node_index)) = (world.pod_index(&pod), world.node_index(&node))
            else {
                warn!(%pod, %node, "schedule command references an unknown entity");
                return;
            };

            if world.pods[pod_index].node.as_ref() == Some(&node) {
                return;
            }

            let from = accounting::relocate(world, pod_index, node_index);
            debug!(%pod, from = ?from, to = %node, "pod scheduled");
            out_events.push(Event::PodScheduled { pod, from, to: node });
        }
        Command::ClearPlacement => {
            accounting::clear(world);
            debug!(pods = world.pods.len(), "placement cleared");
            out_events.push(Event::PlacementCleared);
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use super::World;
    use cluster_conductor_core::{
        ControlPlaneSnapshot, NodeId, NodeSnapshot, PhysicalHostSnapshot, PodId, PodSnapshot,
        ValidationFlags,
    };

    /// Captures every node in template order.
    #[must_use]
    pub fn nodes(world: &World) -> Vec<NodeSnapshot> {
        world
            .nodes
            .iter()
            .map(|node| NodeSnapshot {
                id: node.id.clone(),
                name: node.name.clone(),
                capacity: node.capacity,
                occupants: node.occupants.clone(),
                budget: node.budget,
                infrastructure: node.infrastructure.clone(),
            })
            .collect()
    }

    /// Captures every pod in template order.
    #[must_use]
    pub fn pods(world: &World) -> Vec<PodSnapshot> {
        world
            .pods
            .iter()
            .map(|pod| PodSnapshot {
                id: pod.id.clone(),
                name: pod.name.clone(),
                tag: pod.tag.clone(),
                status: pod.status,
                node: pod.node.clone(),
                request: pod.request,
                storage: pod.storage,
                scheduling: pod.scheduling.clone(),
            })
            .collect()
    }

    /// Captures a single node, if it exists.
    #[must_use]
    pub fn node(world: &World, node: &NodeId) -> Option<NodeSnapshot> {
        let index = world.node_index(node)?;
        nodes(world).into_iter().nth(index)
    }

    /// Captures a single pod, if it exists.
    #[must_use]
    pub fn pod(world: &World, pod: &PodId) -> Option<PodSnapshot> {
        let index = world.pod_index(pod)?;
        pods(world).into_iter().nth(index)
    }

    /// Captures the physical hosts with their derived node lists.
    #[must_use]
    pub fn physical_hosts(world: &World) -> Vec<PhysicalHostSnapshot> {
        world
            .physical_hosts
            .iter()
            .map(|host| PhysicalHostSnapshot {
                id: host.id.clone(),
                name: host.name.clone(),
                nodes: host.nodes.clone(),
                pcpu: host.pcpu,
                memory: host.memory,
                zone: host.zone.clone(),
            })
            .collect()
    }

    /// Captures the control-plane components.
    #[must_use]
    pub fn control_plane(world: &World) -> Vec<ControlPlaneSnapshot> {
        world
            .control_plane
            .iter()
            .map(|component| ControlPlaneSnapshot {
                id: component.id.clone(),
                name: component.name.clone(),
                kind: component.kind,
                healthy: component.healthy,
            })
            .collect()
    }

    /// Constraint families enforced for the loaded level.
    #[must_use]
    pub fn validation(world: &World) -> ValidationFlags {
        world.validation
    }

    /// Lists every scheduled pod with its node, in template order.
    #[must_use]
    pub fn placement(world: &World) -> Vec<(PodId, NodeId)> {
        world
            .pods
            .iter()
            .filter_map(|pod| pod.node.clone().map(|node| (pod.id.clone(), node)))
            .collect()
    }
}
