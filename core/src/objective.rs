//! Declarative objective rules attached to levels.
//!
//! A level never ships code. It picks one of the closed set of
//! [`ObjectiveRule`] kinds and fills in the selectors and thresholds; the
//! objectives system interprets the rule against the live placement.

use serde::{Deserialize, Serialize};

use crate::NodeId;

/// Selects pods by their display name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PodSelector {
    /// Every pod in the level.
    All,
    /// The pod whose name equals the value.
    Name(String),
    /// Pods whose name starts with the value.
    Prefix(String),
    /// Pods whose name starts with any of the values.
    AnyPrefix(Vec<String>),
    /// Pods whose name starts with none of the values.
    NoPrefix(Vec<String>),
}

impl PodSelector {
    /// Reports whether a pod with the provided name is selected.
    #[must_use]
    pub fn matches(&self, pod_name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Name(name) => pod_name == name,
            Self::Prefix(prefix) => pod_name.starts_with(prefix.as_str()),
            Self::AnyPrefix(prefixes) => prefixes
                .iter()
                .any(|prefix| pod_name.starts_with(prefix.as_str())),
            Self::NoPrefix(prefixes) => !prefixes
                .iter()
                .any(|prefix| pod_name.starts_with(prefix.as_str())),
        }
    }
}

/// Cardinality constraint applied to a count of pods.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Count {
    /// The count must be greater than or equal to the value.
    AtLeast(usize),
    /// The count must equal the value.
    Exactly(usize),
    /// The count must be less than or equal to the value.
    AtMost(usize),
}

impl Count {
    /// Reports whether the observed count satisfies the constraint.
    #[must_use]
    pub const fn satisfied_by(self, observed: usize) -> bool {
        match self {
            Self::AtLeast(bound) => observed >= bound,
            Self::Exactly(bound) => observed == bound,
            Self::AtMost(bound) => observed <= bound,
        }
    }
}

/// Requirement that a named pod sits on a named node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pin {
    /// Display name of the pod.
    pub pod: String,
    /// Node the pod must occupy.
    pub node: NodeId,
}

/// Closed set of predicate kinds a level can use as an objective.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObjectiveRule {
    /// Every listed node hosts a number of selected pods satisfying `count`.
    CountOnNodes {
        /// Pods that are counted.
        pods: PodSelector,
        /// Nodes that are inspected individually.
        nodes: Vec<NodeId>,
        /// Constraint applied to each node's count.
        count: Count,
    },
    /// Every node's occupant count satisfies `count`.
    OccupantsPerNode {
        /// Constraint applied to each node's occupant count.
        count: Count,
    },
    /// No node hosts two pods with the same non-empty tag.
    DistinctTagsPerNode,
    /// Each named pod exists and occupies its named node.
    Pinned {
        /// Required pod-to-node matches.
        pins: Vec<Pin>,
    },
    /// Both pods of every pair are scheduled and on different nodes.
    SeparatedPairs {
        /// Pairs of pod display names.
        pairs: Vec<(String, String)>,
    },
    /// Every selected pod sits on one of the allowed nodes.
    RestrictedTo {
        /// Pods that are restricted.
        pods: PodSelector,
        /// Nodes the pods may occupy.
        nodes: Vec<NodeId>,
        /// Unscheduled pods do not break the restriction.
        #[serde(default)]
        allow_unscheduled: bool,
    },
    /// No selected pod sits on an excluded node.
    ExcludedFrom {
        /// Pods that are excluded.
        pods: PodSelector,
        /// Nodes the pods must avoid.
        nodes: Vec<NodeId>,
        /// Every selected pod must also be scheduled.
        #[serde(default)]
        require_scheduled: bool,
    },
    /// Each group has exactly `replicas` pods scheduled on `replicas` distinct nodes.
    SpreadAcrossNodes {
        /// Replica groups, each checked independently.
        groups: Vec<PodSelector>,
        /// Required number of scheduled replicas and distinct nodes per group.
        replicas: usize,
        /// Nodes the replicas must stay within; empty allows any node.
        #[serde(default)]
        within: Vec<NodeId>,
    },
    /// Each group has at least `minimum` pods on the designated nodes.
    Quorum {
        /// Replica groups, each checked independently.
        groups: Vec<PodSelector>,
        /// Designated subset of nodes (for example a primary region).
        nodes: Vec<NodeId>,
        /// Replicas required inside the subset.
        minimum: usize,
    },
    /// Every selected pod is scheduled.
    AllScheduled {
        /// Pods that must be scheduled.
        pods: PodSelector,
        /// No node may exceed its capacity either.
        #[serde(default)]
        within_capacity: bool,
    },
    /// At least `minimum` selected pods are scheduled.
    MinimumScheduled {
        /// Pods that are counted.
        pods: PodSelector,
        /// Scheduled pods required.
        minimum: usize,
    },
    /// Every non-excluded node's occupant count lies within one pod of the mean.
    Balanced {
        /// Nodes left out of the balance, such as a failed node.
        #[serde(default)]
        excluded: Vec<NodeId>,
    },
    /// No non-excluded node exceeds its capacity.
    WithinCapacity {
        /// Nodes left out of the check.
        #[serde(default)]
        excluded: Vec<NodeId>,
    },
}

impl ObjectiveRule {
    /// Every node identifier the rule refers to.
    #[must_use]
    pub fn referenced_nodes(&self) -> Vec<&NodeId> {
        match self {
            Self::CountOnNodes { nodes, .. }
            | Self::RestrictedTo { nodes, .. }
            | Self::ExcludedFrom { nodes, .. }
            | Self::Quorum { nodes, .. } => nodes.iter().collect(),
            Self::SpreadAcrossNodes { within, .. } => within.iter().collect(),
            Self::Balanced { excluded } | Self::WithinCapacity { excluded } => {
                excluded.iter().collect()
            }
            Self::Pinned { pins } => pins.iter().map(|pin| &pin.node).collect(),
            Self::OccupantsPerNode { .. }
            | Self::DistinctTagsPerNode
            | Self::SeparatedPairs { .. }
            | Self::AllScheduled { .. }
            | Self::MinimumScheduled { .. } => Vec::new(),
        }
    }
}

/// Objective description paired with the rule that decides it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectiveSpec {
    /// Text shown to the player.
    pub description: String,
    /// Predicate deciding completion.
    pub rule: ObjectiveRule,
}

/// Completion state of a single objective.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectiveStatus {
    /// Text shown to the player.
    pub description: String,
    /// Whether the objective currently holds.
    pub completed: bool,
}

impl ObjectiveStatus {
    /// Unevaluated status for a freshly loaded level.
    #[must_use]
    pub fn pristine(spec: &ObjectiveSpec) -> Self {
        Self {
            description: spec.description.clone(),
            completed: false,
        }
    }
}
