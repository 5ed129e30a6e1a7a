#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Cluster Conductor engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative placement world, and pure systems. Level catalogs describe
//! immutable templates, the world executes [`Command`] values via its `apply`
//! entry point, and every observable change is broadcast as an [`Event`].
//! Systems query immutable state and answer with verdicts or new commands;
//! they never mutate the world directly.

mod level;
mod objective;
mod snapshot;

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use level::{
    Catalog, CatalogError, ControlPlaneSpec, Level, NodeSpec, PhysicalHostSpec, PodSpec,
};
pub use objective::{Count, ObjectiveRule, ObjectiveSpec, ObjectiveStatus, Pin, PodSelector};
pub use snapshot::{ControlPlaneSnapshot, NodeSnapshot, PhysicalHostSnapshot, PodSnapshot};

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Cluster Conductor.";

/// Number of solution reveals granted per run.
pub const DEFAULT_REVEAL_QUOTA: u8 = 2;

/// Score awarded per 1-based level ordinal when a level is completed.
pub const AWARD_PER_ORDINAL: u64 = 100;

/// Unique identifier assigned to a pod.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PodId(String);

impl PodId {
    /// Creates a new pod identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrows the textual representation of the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PodId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Unique identifier assigned to a node.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Creates a new node identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrows the textual representation of the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Unique identifier assigned to a physical host backing virtualised nodes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostId(String);

impl HostId {
    /// Creates a new physical host identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrows the textual representation of the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HostId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Describes the active phase of a game run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    /// Title screen; no level is loaded.
    Menu,
    /// A level is loaded and its briefing is shown.
    Briefing,
    /// The player is scheduling pods.
    Playing,
    /// Every objective of the current level is satisfied.
    LevelComplete,
    /// The final level was completed and advanced past.
    GameComplete,
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Menu => "menu",
            Self::Briefing => "briefing",
            Self::Playing => "playing",
            Self::LevelComplete => "level complete",
            Self::GameComplete => "game complete",
        };
        f.write_str(label)
    }
}

/// Storage backends a node can expose and a pod can require.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    /// Block devices.
    Block,
    /// Network file system shares.
    Nfs,
    /// Object storage buckets.
    Object,
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Block => "block",
            Self::Nfs => "nfs",
            Self::Object => "object",
        };
        f.write_str(label)
    }
}

/// Lifecycle status of a pod.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PodStatus {
    /// The pod is waiting to be scheduled.
    Pending,
    /// The pod runs on its node.
    Running,
    /// The pod is shutting down.
    Terminating,
    /// The pod crashed or was evicted.
    Failed,
}

/// Role a node plays within the cluster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeType {
    /// General purpose worker.
    Worker,
    /// Node reserved for control-plane workloads.
    ControlPlane,
    /// Node backed by local persistent storage.
    Storage,
    /// Node tuned for compute-heavy workloads.
    Compute,
}

/// Virtualisation layer a node runs on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hypervisor {
    /// Linux KVM.
    Kvm,
    /// VMware ESXi.
    Vmware,
    /// No virtualisation; the node is the physical machine.
    Baremetal,
}

/// Kinds of control-plane components displayed alongside a level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ControlPlaneKind {
    /// Distributed key-value store.
    Etcd,
    /// Kubernetes API server.
    Apiserver,
    /// Pod scheduler.
    Scheduler,
    /// Controller manager.
    ControllerManager,
}

/// Resources a pod asks for when scheduled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceRequest {
    /// Virtual CPUs requested.
    pub vcpu: f64,
    /// Memory requested in GB.
    pub memory: f64,
}

/// Resource budget and derived utilisation of a node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceBudget {
    /// Virtual CPUs the node offers.
    pub vcpu: f64,
    /// Virtual CPUs requested by the node's occupants.
    pub vcpu_used: f64,
    /// Memory the node offers in GB.
    pub memory: f64,
    /// Memory requested by the node's occupants in GB.
    pub memory_used: f64,
}

impl ResourceBudget {
    /// Creates an unused budget with the provided totals.
    #[must_use]
    pub const fn unused(vcpu: f64, memory: f64) -> Self {
        Self {
            vcpu,
            vcpu_used: 0.0,
            memory,
            memory_used: 0.0,
        }
    }

    /// Virtual CPUs still unclaimed on the node.
    #[must_use]
    pub fn available_vcpu(&self) -> f64 {
        self.vcpu - self.vcpu_used
    }

    /// Memory still unclaimed on the node, in GB.
    #[must_use]
    pub fn available_memory(&self) -> f64 {
        self.memory - self.memory_used
    }
}

/// Persistent storage a pod may demand from its node.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StorageRequirement {
    /// Whether the pod cannot run without the storage.
    pub required: bool,
    /// Backend the pod needs; absent means any backend is acceptable.
    #[serde(rename = "type", default)]
    pub kind: Option<StorageType>,
    /// Requested volume size in GB.
    #[serde(default)]
    pub size: f64,
}

impl StorageRequirement {
    /// Backend that a node must offer, if the requirement is binding.
    #[must_use]
    pub fn binding_type(&self) -> Option<StorageType> {
        if self.required {
            self.kind
        } else {
            None
        }
    }
}

/// Optional scheduling hints attached to a pod.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulingHints {
    /// The pod should land on bare-metal hardware.
    #[serde(default)]
    pub requires_baremetal: bool,
    /// Pods sharing this key must not share a physical host.
    #[serde(default)]
    pub anti_affinity_key: Option<String>,
    /// Label selector the pod advertises.
    #[serde(default)]
    pub node_selector: BTreeMap<String, String>,
}

/// Infrastructure descriptor of a node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Infrastructure {
    /// Role the node plays.
    pub node_type: NodeType,
    /// Virtualisation layer, if known.
    #[serde(default)]
    pub hypervisor: Option<Hypervisor>,
    /// Physical host running the node; absent for bare-metal nodes.
    #[serde(default)]
    pub physical_host: Option<HostId>,
    /// Storage backends offered by the node.
    #[serde(default)]
    pub storage_types: BTreeSet<StorageType>,
    /// Availability zone, if any.
    #[serde(default)]
    pub zone: Option<String>,
}

/// Constraint families switched on for a level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidationFlags {
    /// Enforce vCPU and memory budgets.
    #[serde(default)]
    pub resources: bool,
    /// Enforce storage backend compatibility.
    #[serde(default)]
    pub storage: bool,
    /// Enforce physical-host anti-affinity.
    #[serde(default)]
    pub anti_affinity: bool,
}

/// Commands that express all permissible placement mutations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Moves a pod onto a node, updating occupancy and resource accounting.
    SchedulePod {
        /// Pod being placed.
        pod: PodId,
        /// Node receiving the pod.
        node: NodeId,
    },
    /// Unschedules every pod and empties every node.
    ClearPlacement,
}

/// Events broadcast after commands and session actions are processed.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// A level template was copied into the placement store.
    LevelLoaded {
        /// Zero-based catalog index of the level.
        index: usize,
        /// Display name of the level.
        name: String,
    },
    /// The session entered a new phase.
    PhaseChanged {
        /// Phase that became active.
        phase: GamePhase,
    },
    /// A pod was placed onto a node.
    PodScheduled {
        /// Pod that moved.
        pod: PodId,
        /// Node the pod left, if it was scheduled before.
        from: Option<NodeId>,
        /// Node the pod now occupies.
        to: NodeId,
    },
    /// Every pod was unscheduled.
    PlacementCleared,
    /// A proposed move broke a placement constraint.
    MoveRejected {
        /// Pod the player tried to move.
        pod: PodId,
        /// Node the player targeted.
        node: NodeId,
        /// Constraint that failed.
        reason: MoveRejection,
    },
    /// Objectives were re-scored against the current placement.
    ObjectivesEvaluated {
        /// Number of satisfied objectives.
        satisfied: usize,
        /// Number of objectives in the level.
        total: usize,
    },
    /// The current level was completed.
    LevelCompleted {
        /// Zero-based catalog index of the level.
        index: usize,
        /// Score awarded for the completion.
        award: u64,
    },
    /// The canonical solution was applied.
    SolutionRevealed {
        /// Reveals left in the current run.
        remaining: u8,
    },
    /// A session action was refused without changing state.
    ActionRejected {
        /// Category of the refusal.
        kind: ErrorKind,
    },
}

/// Flat classification of every refusal the engine can report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The target node has no free pod slot.
    CapacityExceeded,
    /// The target node lacks vCPU headroom.
    InsufficientVcpu,
    /// The target node lacks memory headroom.
    InsufficientMemory,
    /// The target node does not offer the required storage backend.
    UnsupportedStorageType,
    /// A pod with the same anti-affinity key shares the physical host.
    AntiAffinityViolation,
    /// A pod or node identifier does not exist.
    UnknownEntity,
    /// No solution reveals remain in the current run.
    RevealQuotaExhausted,
    /// The requested level index is outside the catalog.
    InvalidLevelIndex,
    /// The action is not available in the current phase.
    PhaseMismatch,
}

/// Reasons a proposed move may be rejected by the constraint validator.
#[derive(Clone, Debug, PartialEq, Error, Serialize, Deserialize)]
pub enum MoveRejection {
    /// The target node already hosts as many pods as it has slots.
    #[error("node {node} is at capacity ({capacity} pods)")]
    CapacityExceeded {
        /// Display name of the full node.
        node: String,
        /// Pod slots offered by the node.
        capacity: usize,
    },
    /// The pod requests more vCPU than the node has left.
    #[error("insufficient vCPU on {node}: needs {requested}, available {available:.1}")]
    InsufficientVcpu {
        /// Display name of the target node.
        node: String,
        /// vCPU requested by the pod.
        requested: f64,
        /// vCPU still unclaimed on the node.
        available: f64,
        /// Missing vCPU.
        shortfall: f64,
    },
    /// The pod requests more memory than the node has left.
    #[error("insufficient memory on {node}: needs {requested}GB, available {available:.1}GB")]
    InsufficientMemory {
        /// Display name of the target node.
        node: String,
        /// Memory requested by the pod in GB.
        requested: f64,
        /// Memory still unclaimed on the node in GB.
        available: f64,
        /// Missing memory in GB.
        shortfall: f64,
    },
    /// The node does not offer the storage backend the pod requires.
    #[error("node {node} does not support {required} storage (available: {})", list_storage(.available))]
    UnsupportedStorageType {
        /// Display name of the target node.
        node: String,
        /// Backend the pod requires.
        required: StorageType,
        /// Backends the node offers.
        available: Vec<StorageType>,
    },
    /// Another pod with the same anti-affinity key already runs on the physical host.
    #[error("anti-affinity violation: {conflicting_pod} already on physical host {host}")]
    AntiAffinityViolation {
        /// Anti-affinity key shared by both pods.
        key: String,
        /// Display name of the pod already on the host.
        conflicting_pod: String,
        /// Physical host both placements would share.
        host: HostId,
    },
}

impl MoveRejection {
    /// Flat classification of the rejection.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::CapacityExceeded { .. } => ErrorKind::CapacityExceeded,
            Self::InsufficientVcpu { .. } => ErrorKind::InsufficientVcpu,
            Self::InsufficientMemory { .. } => ErrorKind::InsufficientMemory,
            Self::UnsupportedStorageType { .. } => ErrorKind::UnsupportedStorageType,
            Self::AntiAffinityViolation { .. } => ErrorKind::AntiAffinityViolation,
        }
    }
}

fn list_storage(types: &[StorageType]) -> String {
    if types.is_empty() {
        return "none".to_owned();
    }
    types
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Identifier supplied by a caller that matches nothing in the placement store.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum UnknownEntity {
    /// No pod carries the identifier.
    #[error("unknown pod {0}")]
    Pod(PodId),
    /// No node carries the identifier.
    #[error("unknown node {0}")]
    Node(NodeId),
}

/// Result of asking the engine to move a pod.
#[derive(Clone, Debug, PartialEq)]
pub enum MoveOutcome {
    /// The pod moved onto the target node.
    Scheduled {
        /// Node the pod left, if it was scheduled before.
        from: Option<NodeId>,
    },
    /// The pod already ran on the target node; nothing changed.
    Unchanged,
    /// A placement constraint refused the move; nothing changed.
    Rejected(MoveRejection),
    /// The request referenced unknown identifiers and was ignored.
    Ignored(UnknownEntity),
}

impl MoveOutcome {
    /// Reports whether the move was accepted.
    #[must_use]
    pub const fn accepted(&self) -> bool {
        matches!(self, Self::Scheduled { .. } | Self::Unchanged)
    }

    /// Category of the refusal, if the move was not accepted.
    #[must_use]
    pub const fn reason(&self) -> Option<ErrorKind> {
        match self {
            Self::Scheduled { .. } | Self::Unchanged => None,
            Self::Rejected(rejection) => Some(rejection.kind()),
            Self::Ignored(_) => Some(ErrorKind::UnknownEntity),
        }
    }

    /// Human-readable explanation of the refusal, if any.
    #[must_use]
    pub fn detail(&self) -> Option<String> {
        match self {
            Self::Scheduled { .. } | Self::Unchanged => None,
            Self::Rejected(rejection) => Some(rejection.to_string()),
            Self::Ignored(unknown) => Some(unknown.to_string()),
        }
    }
}

/// Session-level actions that can be refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    /// Leave the menu and load the first level.
    Start,
    /// Leave the briefing and start playing.
    Begin,
    /// Move past a completed level.
    Advance,
    /// Apply the canonical solution.
    Reveal,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Start => "start",
            Self::Begin => "begin",
            Self::Advance => "advance",
            Self::Reveal => "reveal the solution",
        };
        f.write_str(label)
    }
}

/// Non-fatal refusals of session actions.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Every solution reveal of the run was used.
    #[error("no solution reveals remaining")]
    RevealQuotaExhausted,
    /// The level index lies outside the catalog.
    #[error("invalid level index {index}; the catalog holds {levels} levels")]
    InvalidLevelIndex {
        /// Index that was requested.
        index: usize,
        /// Number of levels in the catalog.
        levels: usize,
    },
    /// The action is not available in the current phase.
    #[error("cannot {action} during {phase}")]
    PhaseMismatch {
        /// Action that was requested.
        action: Action,
        /// Phase the session was in.
        phase: GamePhase,
    },
}

impl SessionError {
    /// Flat classification of the refusal.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::RevealQuotaExhausted => ErrorKind::RevealQuotaExhausted,
            Self::InvalidLevelIndex { .. } => ErrorKind::InvalidLevelIndex,
            Self::PhaseMismatch { .. } => ErrorKind::PhaseMismatch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Command, ErrorKind, MoveOutcome, MoveRejection, NodeId, PodId, StorageRequirement,
        StorageType, UnknownEntity,
    };

    #[test]
    fn rejection_detail_names_storage_backends() {
        let rejection = MoveRejection::UnsupportedStorageType {
            node: "storage-1".to_owned(),
            required: StorageType::Nfs,
            available: vec![StorageType::Block, StorageType::Object],
        };

        let outcome = MoveOutcome::Rejected(rejection);

        assert!(!outcome.accepted());
        assert_eq!(outcome.reason(), Some(ErrorKind::UnsupportedStorageType));
        assert_eq!(
            outcome.detail().as_deref(),
            Some("node storage-1 does not support nfs storage (available: block, object)"),
        );
    }

    #[test]
    fn vcpu_rejection_formats_available_headroom() {
        let rejection = MoveRejection::InsufficientVcpu {
            node: "worker-1".to_owned(),
            requested: 5.0,
            available: 4.0,
            shortfall: 1.0,
        };

        assert_eq!(
            rejection.to_string(),
            "insufficient vCPU on worker-1: needs 5, available 4.0"
        );
    }

    #[test]
    fn ignored_moves_report_unknown_entity() {
        let outcome = MoveOutcome::Ignored(UnknownEntity::Pod(PodId::new("pod-99")));

        assert!(!outcome.accepted());
        assert_eq!(outcome.reason(), Some(ErrorKind::UnknownEntity));
        assert_eq!(outcome.detail().as_deref(), Some("unknown pod pod-99"));
    }

    #[test]
    fn unchanged_moves_count_as_accepted() {
        assert!(MoveOutcome::Unchanged.accepted());
        assert_eq!(MoveOutcome::Unchanged.reason(), None);
        assert_eq!(MoveOutcome::Scheduled { from: None }.detail(), None);
    }

    #[test]
    fn optional_storage_does_not_bind_a_backend() {
        let optional = StorageRequirement {
            required: false,
            kind: Some(StorageType::Block),
            size: 10.0,
        };
        let untyped = StorageRequirement {
            required: true,
            kind: None,
            size: 10.0,
        };

        assert_eq!(optional.binding_type(), None);
        assert_eq!(untyped.binding_type(), None);
    }

    #[test]
    fn commands_survive_the_wire() {
        let command = Command::SchedulePod {
            pod: PodId::new("pod-1"),
            node: NodeId::new("node-2"),
        };

        let bytes = bincode::serialize(&command).expect("serialize");
        let restored: Command = bincode::deserialize(&bytes).expect("deserialize");

        assert_eq!(restored, command);
    }
}
