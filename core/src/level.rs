//! Level templates and the catalog that validates them.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    ControlPlaneKind, HostId, Infrastructure, NodeId, ObjectiveSpec, PodId, PodStatus,
    ResourceRequest, SchedulingHints, StorageRequirement, ValidationFlags,
};

/// Immutable template describing a single puzzle level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Level {
    /// Display name of the level.
    pub name: String,
    /// Briefing text shown before play starts.
    #[serde(default)]
    pub description: String,
    /// Optional hint shown on request.
    #[serde(default)]
    pub hint: Option<String>,
    /// Nodes available for scheduling.
    pub nodes: Vec<NodeSpec>,
    /// Pods to be scheduled, possibly already placed.
    pub pods: Vec<PodSpec>,
    /// Objectives that must all hold to complete the level.
    pub objectives: Vec<ObjectiveSpec>,
    /// Physical machines backing virtualised nodes.
    #[serde(default)]
    pub physical_hosts: Vec<PhysicalHostSpec>,
    /// Control-plane components displayed with the level.
    #[serde(default)]
    pub control_plane: Vec<ControlPlaneSpec>,
    /// Constraint families enforced while the level is played.
    #[serde(default)]
    pub validation: ValidationFlags,
    /// Canonical pod-to-node mapping applied by a solution reveal.
    #[serde(default)]
    pub solution: BTreeMap<PodId, NodeId>,
}

/// Template of a node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Unique identifier within the level.
    pub id: NodeId,
    /// Display name.
    pub name: String,
    /// Number of pod slots.
    pub capacity: usize,
    /// Virtual CPUs offered.
    pub vcpu: f64,
    /// Memory offered in GB.
    pub memory: f64,
    /// Infrastructure descriptor.
    pub infrastructure: Infrastructure,
}

/// Template of a pod.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PodSpec {
    /// Unique identifier within the level.
    pub id: PodId,
    /// Display name; objective selectors match against it.
    pub name: String,
    /// Type tag (rendered as the pod colour). Empty marks the pod untagged,
    /// which tag-distinctness objectives ignore.
    #[serde(default)]
    pub tag: String,
    /// Node the pod starts on, if any.
    #[serde(default)]
    pub node: Option<NodeId>,
    /// Explicit starting status; derived from `node` when absent.
    #[serde(default)]
    pub status: Option<PodStatus>,
    /// Resources the pod requests.
    pub request: ResourceRequest,
    /// Persistent storage the pod needs.
    #[serde(default)]
    pub storage: Option<StorageRequirement>,
    /// Scheduling hints.
    #[serde(default)]
    pub scheduling: SchedulingHints,
}

impl PodSpec {
    /// Status the pod holds when the level loads.
    #[must_use]
    pub fn initial_status(&self) -> PodStatus {
        match (self.status, &self.node) {
            (Some(status), _) => status,
            (None, Some(_)) => PodStatus::Running,
            (None, None) => PodStatus::Pending,
        }
    }
}

/// Template of a physical machine running virtualised nodes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhysicalHostSpec {
    /// Unique identifier within the level.
    pub id: HostId,
    /// Display name.
    pub name: String,
    /// Physical CPUs; informational only.
    #[serde(default)]
    pub pcpu: f64,
    /// Physical memory in GB; informational only.
    #[serde(default)]
    pub memory: f64,
    /// Availability zone, if any.
    #[serde(default)]
    pub zone: Option<String>,
}

/// Template of a control-plane component.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlPlaneSpec {
    /// Unique identifier within the level.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Component kind.
    pub kind: ControlPlaneKind,
    /// Health flag.
    #[serde(default = "healthy_by_default")]
    pub healthy: bool,
}

const fn healthy_by_default() -> bool {
    true
}

/// Reasons a set of level templates cannot form a catalog.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// The catalog holds no levels.
    #[error("catalog contains no levels")]
    Empty,
    /// A level declares no objectives and could never be completed deliberately.
    #[error("level {level} declares no objectives")]
    NoObjectives {
        /// Zero-based index of the offending level.
        level: usize,
    },
    /// Two nodes share an identifier.
    #[error("level {level} declares node {node} more than once")]
    DuplicateNode {
        /// Zero-based index of the offending level.
        level: usize,
        /// Duplicated identifier.
        node: NodeId,
    },
    /// Two pods share an identifier.
    #[error("level {level} declares pod {pod} more than once")]
    DuplicatePod {
        /// Zero-based index of the offending level.
        level: usize,
        /// Duplicated identifier.
        pod: PodId,
    },
    /// Two physical hosts share an identifier.
    #[error("level {level} declares physical host {host} more than once")]
    DuplicateHost {
        /// Zero-based index of the offending level.
        level: usize,
        /// Duplicated identifier.
        host: HostId,
    },
    /// A pod, solution entry, or objective references a node that does not exist.
    #[error("level {level} references unknown node {node} from {referenced_by}")]
    UnknownNode {
        /// Zero-based index of the offending level.
        level: usize,
        /// Missing node identifier.
        node: NodeId,
        /// What holds the dangling reference.
        referenced_by: String,
    },
    /// A solution entry references a pod that does not exist.
    #[error("level {level} solution references unknown pod {pod}")]
    UnknownSolutionPod {
        /// Zero-based index of the offending level.
        level: usize,
        /// Missing pod identifier.
        pod: PodId,
    },
    /// The initial placement puts more pods on a node than it has slots.
    #[error("level {level} starts node {node} with {occupants} pods but capacity {capacity}")]
    OverCapacity {
        /// Zero-based index of the offending level.
        level: usize,
        /// Overfilled node.
        node: NodeId,
        /// Pods initially placed on the node.
        occupants: usize,
        /// Pod slots offered by the node.
        capacity: usize,
    },
    /// The canonical solution puts more pods on a node than it has slots.
    #[error("level {level} solution assigns {assigned} pods to node {node} but capacity {capacity}")]
    SolutionOverCapacity {
        /// Zero-based index of the offending level.
        level: usize,
        /// Overfilled node.
        node: NodeId,
        /// Pods the solution assigns to the node.
        assigned: usize,
        /// Pod slots offered by the node.
        capacity: usize,
    },
}

/// Ordered, validated collection of level templates.
#[derive(Clone, Debug, PartialEq)]
pub struct Catalog {
    levels: Vec<Level>,
}

impl Catalog {
    /// Validates the provided levels and wraps them into a catalog.
    pub fn new(levels: Vec<Level>) -> Result<Self, CatalogError> {
        if levels.is_empty() {
            return Err(CatalogError::Empty);
        }
        for (index, level) in levels.iter().enumerate() {
            validate_level(index, level)?;
        }
        Ok(Self { levels })
    }

    /// Number of levels in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Reports whether the catalog is empty. Validated catalogs never are.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Level stored at the provided zero-based index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Level> {
        self.levels.get(index)
    }

    /// Iterator over the levels in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &Level> {
        self.levels.iter()
    }
}

fn validate_level(index: usize, level: &Level) -> Result<(), CatalogError> {
    if level.objectives.is_empty() {
        return Err(CatalogError::NoObjectives { level: index });
    }

    let mut node_ids: BTreeSet<&NodeId> = BTreeSet::new();
    for node in &level.nodes {
        if !node_ids.insert(&node.id) {
            return Err(CatalogError::DuplicateNode {
                level: index,
                node: node.id.clone(),
            });
        }
    }

    let mut host_ids: BTreeSet<&HostId> = BTreeSet::new();
    for host in &level.physical_hosts {
        if !host_ids.insert(&host.id) {
            return Err(CatalogError::DuplicateHost {
                level: index,
                host: host.id.clone(),
            });
        }
    }

    let mut pod_ids: BTreeSet<&PodId> = BTreeSet::new();
    let mut occupancy: BTreeMap<&NodeId, usize> = BTreeMap::new();
    for pod in &level.pods {
        if !pod_ids.insert(&pod.id) {
            return Err(CatalogError::DuplicatePod {
                level: index,
                pod: pod.id.clone(),
            });
        }
        if let Some(node) = &pod.node {
            if !node_ids.contains(node) {
                return Err(CatalogError::UnknownNode {
                    level: index,
                    node: node.clone(),
                    referenced_by: format!("pod {}", pod.id),
                });
            }
            *occupancy.entry(node).or_insert(0) += 1;
        }
    }

    for node in &level.nodes {
        let occupants = occupancy.get(&node.id).copied().unwrap_or(0);
        if occupants > node.capacity {
            return Err(CatalogError::OverCapacity {
                level: index,
                node: node.id.clone(),
                occupants,
                capacity: node.capacity,
            });
        }
    }

    let mut assigned: BTreeMap<&NodeId, usize> = BTreeMap::new();
    for (pod, node) in &level.solution {
        if !pod_ids.contains(pod) {
            return Err(CatalogError::UnknownSolutionPod {
                level: index,
                pod: pod.clone(),
            });
        }
        if !node_ids.contains(node) {
            return Err(CatalogError::UnknownNode {
                level: index,
                node: node.clone(),
                referenced_by: format!("solution entry for {pod}"),
            });
        }
        *assigned.entry(node).or_insert(0) += 1;
    }

    for node in &level.nodes {
        let count = assigned.get(&node.id).copied().unwrap_or(0);
        if count > node.capacity {
            return Err(CatalogError::SolutionOverCapacity {
                level: index,
                node: node.id.clone(),
                assigned: count,
                capacity: node.capacity,
            });
        }
    }

    for objective in &level.objectives {
        for node in objective.rule.referenced_nodes() {
            if !node_ids.contains(node) {
                return Err(CatalogError::UnknownNode {
                    level: index,
                    node: node.clone(),
                    referenced_by: format!("objective \"{}\"", objective.description),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use super::{Catalog, CatalogError, Level, NodeSpec, PodSpec};
    use crate::{
        Count, Infrastructure, NodeId, NodeType, ObjectiveRule, ObjectiveSpec, PodId,
        PodSelector, PodStatus, ResourceRequest, SchedulingHints, ValidationFlags,
    };

    fn node(id: &str, capacity: usize) -> NodeSpec {
        NodeSpec {
            id: NodeId::new(id),
            name: format!("{id}-name"),
            capacity,
            vcpu: 4.0,
            memory: 8.0,
            infrastructure: Infrastructure {
                node_type: NodeType::Worker,
                hypervisor: None,
                physical_host: None,
                storage_types: BTreeSet::new(),
                zone: None,
            },
        }
    }

    fn pod(id: &str, node: Option<&str>) -> PodSpec {
        PodSpec {
            id: PodId::new(id),
            name: id.to_owned(),
            tag: String::new(),
            node: node.map(NodeId::new),
            status: None,
            request: ResourceRequest {
                vcpu: 1.0,
                memory: 1.0,
            },
            storage: None,
            scheduling: SchedulingHints::default(),
        }
    }

    fn level(nodes: Vec<NodeSpec>, pods: Vec<PodSpec>) -> Level {
        Level {
            name: "test".to_owned(),
            description: String::new(),
            hint: None,
            nodes,
            pods,
            objectives: vec![ObjectiveSpec {
                description: "one pod on node-1".to_owned(),
                rule: ObjectiveRule::CountOnNodes {
                    pods: PodSelector::All,
                    nodes: vec![NodeId::new("node-1")],
                    count: Count::AtLeast(1),
                },
            }],
            physical_hosts: Vec::new(),
            control_plane: Vec::new(),
            validation: ValidationFlags::default(),
            solution: BTreeMap::new(),
        }
    }

    #[test]
    fn empty_catalog_is_rejected() {
        assert_eq!(Catalog::new(Vec::new()), Err(CatalogError::Empty));
    }

    #[test]
    fn initial_overfill_is_rejected() {
        let template = level(
            vec![node("node-1", 1)],
            vec![pod("pod-1", Some("node-1")), pod("pod-2", Some("node-1"))],
        );

        assert_eq!(
            Catalog::new(vec![template]),
            Err(CatalogError::OverCapacity {
                level: 0,
                node: NodeId::new("node-1"),
                occupants: 2,
                capacity: 1,
            })
        );
    }

    #[test]
    fn solution_overfill_is_rejected() {
        let mut template = level(
            vec![node("node-1", 1), node("node-2", 2)],
            vec![pod("pod-1", None), pod("pod-2", Some("node-2"))],
        );
        let _ = template
            .solution
            .insert(PodId::new("pod-1"), NodeId::new("node-1"));
        let _ = template
            .solution
            .insert(PodId::new("pod-2"), NodeId::new("node-1"));

        assert_eq!(
            Catalog::new(vec![template]),
            Err(CatalogError::SolutionOverCapacity {
                level: 0,
                node: NodeId::new("node-1"),
                assigned: 2,
                capacity: 1,
            })
        );
    }

    #[test]
    fn dangling_solution_nodes_are_rejected() {
        let mut template = level(vec![node("node-1", 2)], vec![pod("pod-1", None)]);
        let _ = template
            .solution
            .insert(PodId::new("pod-1"), NodeId::new("node-9"));

        let error = Catalog::new(vec![template]).expect_err("dangling reference");

        assert!(matches!(error, CatalogError::UnknownNode { ref node, .. } if node.as_str() == "node-9"));
    }

    #[test]
    fn objective_node_references_are_checked() {
        let template = level(vec![node("node-2", 2)], vec![pod("pod-1", None)]);

        let error = Catalog::new(vec![template]).expect_err("objective names node-1");

        assert!(matches!(error, CatalogError::UnknownNode { ref node, .. } if node.as_str() == "node-1"));
    }

    #[test]
    fn initial_status_follows_placement() {
        let placed = pod("pod-1", Some("node-1"));
        let mut failed = pod("pod-2", Some("node-1"));
        failed.status = Some(PodStatus::Failed);

        assert_eq!(placed.initial_status(), PodStatus::Running);
        assert_eq!(pod("pod-3", None).initial_status(), PodStatus::Pending);
        assert_eq!(failed.initial_status(), PodStatus::Failed);
    }

    #[test]
    fn valid_levels_form_a_catalog() {
        let template = level(
            vec![node("node-1", 2), node("node-2", 2)],
            vec![pod("pod-1", Some("node-2")), pod("pod-2", None)],
        );

        let catalog = Catalog::new(vec![template]).expect("valid catalog");

        assert_eq!(catalog.len(), 1);
        assert!(!catalog.is_empty());
        assert_eq!(catalog.get(0).map(|level| level.name.as_str()), Some("test"));
        assert!(catalog.get(1).is_none());
    }
}
