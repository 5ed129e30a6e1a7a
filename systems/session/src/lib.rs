#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Game session orchestrating the placement world and the pure systems.
//!
//! [`Session`] is the engine's external interface. It owns the catalog, the
//! live world, the phase machine, score, reveal quota and the journal. Every
//! method runs to completion before returning; observers read
//! [`Session::current_state`] snapshots and drain the event stream.

mod journal;
mod phase;

use std::{collections::BTreeSet, mem};

use cluster_conductor_core::{
    Action, Catalog, Command, ControlPlaneSnapshot, Event, GamePhase, Level, MoveOutcome, NodeId,
    NodeSnapshot, ObjectiveStatus, PhysicalHostSnapshot, PodId, PodSnapshot, SessionError,
    UnknownEntity, ValidationFlags, AWARD_PER_ORDINAL, DEFAULT_REVEAL_QUOTA,
};
use cluster_conductor_system_admission::{self as admission, Admission};
use cluster_conductor_system_objectives as objectives;
use cluster_conductor_world::{self as world, query, World};
use serde::Serialize;
use tracing::{debug, info, warn};

pub use journal::{Journal, LogEntry, Severity};

/// Number of journal entries kept by default.
pub const DEFAULT_JOURNAL_CAPACITY: usize = 20;

/// Tunables of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Solution reveals granted per run.
    pub reveal_quota: u8,
    /// Journal entries retained.
    pub journal_capacity: usize,
    /// Score per 1-based level ordinal awarded on completion.
    pub award_per_ordinal: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reveal_quota: DEFAULT_REVEAL_QUOTA,
            journal_capacity: DEFAULT_JOURNAL_CAPACITY,
            award_per_ordinal: AWARD_PER_ORDINAL,
        }
    }
}

/// Acknowledgement of an applied solution reveal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RevealReceipt {
    /// Reveals left in the current run.
    pub remaining: u8,
}

/// Read-only view of everything the presentation layer renders.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionSnapshot {
    /// Active phase.
    pub phase: GamePhase,
    /// Zero-based catalog index of the loaded level, if any.
    pub level_index: Option<usize>,
    /// Display name of the loaded level, if any.
    pub level_name: Option<String>,
    /// Hint of the loaded level, if any.
    pub hint: Option<String>,
    /// Constraint families enforced for the loaded level.
    pub validation: ValidationFlags,
    /// Nodes in template order.
    pub nodes: Vec<NodeSnapshot>,
    /// Pods in template order.
    pub pods: Vec<PodSnapshot>,
    /// Physical hosts with their derived node lists.
    pub physical_hosts: Vec<PhysicalHostSnapshot>,
    /// Control-plane components.
    pub control_plane: Vec<ControlPlaneSnapshot>,
    /// Objective statuses in level order.
    pub objectives: Vec<ObjectiveStatus>,
    /// Accumulated score of the run.
    pub score: u64,
    /// Solution reveals left in the run.
    pub reveals_remaining: u8,
    /// Whether the canonical solution was applied to the loaded level.
    pub solution_revealed: bool,
    /// Zero-based indices of completed levels, ascending.
    pub completed_levels: Vec<usize>,
}

/// Single game run over a catalog of levels.
#[derive(Debug)]
pub struct Session {
    catalog: Catalog,
    config: SessionConfig,
    phase: GamePhase,
    level_index: Option<usize>,
    world: Option<World>,
    objectives: Vec<ObjectiveStatus>,
    score: u64,
    reveals_remaining: u8,
    solution_revealed: bool,
    completed_levels: BTreeSet<usize>,
    journal: Journal,
    events: Vec<Event>,
}

impl Session {
    /// Creates a session in the menu phase using the default configuration.
    #[must_use]
    pub fn new(catalog: Catalog) -> Self {
        Self::with_config(catalog, SessionConfig::default())
    }

    /// Creates a session in the menu phase using the provided configuration.
    #[must_use]
    pub fn with_config(catalog: Catalog, config: SessionConfig) -> Self {
        Self {
            catalog,
            config,
            phase: GamePhase::Menu,
            level_index: None,
            world: None,
            objectives: Vec::new(),
            score: 0,
            reveals_remaining: config.reveal_quota,
            solution_revealed: false,
            completed_levels: BTreeSet::new(),
            journal: Journal::with_capacity(config.journal_capacity),
            events: Vec::new(),
        }
    }

    /// Catalog the session plays through.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Active phase.
    #[must_use]
    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    /// Template of the loaded level, if any.
    #[must_use]
    pub fn level(&self) -> Option<&Level> {
        self.level_index.and_then(|index| self.catalog.get(index))
    }

    /// Bounded log of recent activity.
    #[must_use]
    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Removes and returns every event emitted since the previous drain.
    pub fn drain_events(&mut self) -> Vec<Event> {
        mem::take(&mut self.events)
    }

    /// Leaves the menu and loads the first level's briefing.
    pub fn start(&mut self) -> Result<(), SessionError> {
        let next = self.guard(Action::Start)?;
        self.load_level(0)?;
        self.enter(next);
        Ok(())
    }

    /// Leaves the briefing and starts playing the loaded level.
    pub fn begin(&mut self) -> Result<(), SessionError> {
        let next = self.guard(Action::Begin)?;
        self.enter(next);
        Ok(())
    }

    /// Moves past a completed level to the next briefing, or ends the game.
    pub fn advance(&mut self) -> Result<(), SessionError> {
        let next = self.guard(Action::Advance)?;
        if next == GamePhase::Briefing {
            self.load_level(self.next_level_index())?;
        } else {
            self.journal
                .record(Severity::Success, "All levels complete. Cluster conducted.");
        }
        self.enter(next);
        Ok(())
    }

    /// Returns to the menu and resets every piece of run state.
    pub fn restart(&mut self) {
        self.world = None;
        self.level_index = None;
        self.objectives.clear();
        self.score = 0;
        self.reveals_remaining = self.config.reveal_quota;
        self.solution_revealed = false;
        self.completed_levels.clear();
        self.journal.clear();
        info!("session restarted");
        self.enter(GamePhase::Menu);
    }

    /// Loads a level and shows its briefing, regardless of the current phase.
    pub fn jump_to_level(&mut self, index: usize) -> Result<(), SessionError> {
        self.load_level(index)?;
        self.enter(GamePhase::Briefing);
        Ok(())
    }

    /// Copies a level template into a fresh world without changing phase.
    ///
    /// Objectives start unevaluated and the revealed flag is cleared. The
    /// reveal quota belongs to the run and is left untouched.
    pub fn load_level(&mut self, index: usize) -> Result<(), SessionError> {
        let Some(level) = self.catalog.get(index) else {
            return Err(self.refuse(SessionError::InvalidLevelIndex {
                index,
                levels: self.catalog.len(),
            }));
        };

        let name = level.name.clone();
        self.objectives = level
            .objectives
            .iter()
            .map(ObjectiveStatus::pristine)
            .collect();
        self.world = Some(World::from_level(level));
        self.level_index = Some(index);
        self.solution_revealed = false;

        info!(index, level = %name, "level loaded");
        self.journal
            .record(Severity::Info, format!("Loaded level {}: {name}", index + 1));
        self.events.push(Event::LevelLoaded { index, name });
        Ok(())
    }

    /// Attempts to schedule a pod onto a node.
    ///
    /// Accepted moves are applied and every objective is re-scored; when all
    /// objectives hold while playing, the level completes. Refused moves leave
    /// state unchanged.
    pub fn attempt_move(&mut self, pod: &PodId, node: &NodeId) -> MoveOutcome {
        let Some(world) = self.world.as_mut() else {
            warn!(%pod, %node, "move requested without a loaded level");
            return MoveOutcome::Ignored(UnknownEntity::Pod(pod.clone()));
        };

        let Some(pod_view) = query::pod(world, pod) else {
            warn!(%pod, "move references an unknown pod");
            return MoveOutcome::Ignored(UnknownEntity::Pod(pod.clone()));
        };
        let Some(node_view) = query::node(world, node) else {
            warn!(%node, "move references an unknown node");
            return MoveOutcome::Ignored(UnknownEntity::Node(node.clone()));
        };

        let nodes = query::nodes(world);
        let pods = query::pods(world);
        match admission::admit(&pod_view, &node_view, &nodes, &pods, query::validation(world)) {
            Err(rejection) => {
                self.journal.record(
                    Severity::Error,
                    format!("Cannot schedule {}: {rejection}", pod_view.name),
                );
                self.events.push(Event::MoveRejected {
                    pod: pod.clone(),
                    node: node.clone(),
                    reason: rejection.clone(),
                });
                MoveOutcome::Rejected(rejection)
            }
            Ok(Admission::AlreadyPlaced) => {
                debug!(%pod, %node, "pod already on target node");
                MoveOutcome::Unchanged
            }
            Ok(Admission::Admit) => {
                let from = pod_view.node.clone();
                world::apply(
                    world,
                    Command::SchedulePod {
                        pod: pod.clone(),
                        node: node.clone(),
                    },
                    &mut self.events,
                );
                self.journal.record(
                    Severity::Info,
                    format!("pod/{} scheduled on {}", pod_view.name, node_view.name),
                );
                self.rescore();
                if self.phase == GamePhase::Playing && objectives::all_complete(&self.objectives) {
                    self.complete_level();
                }
                MoveOutcome::Scheduled { from }
            }
        }
    }

    /// Replaces the placement with the level's canonical solution.
    ///
    /// Only available while playing. Consumes one reveal; objectives are
    /// re-scored for display but the level is not completed and no score is
    /// awarded. Pods the solution does not mention end up unscheduled.
    pub fn reveal_solution(&mut self) -> Result<RevealReceipt, SessionError> {
        let _ = self.guard(Action::Reveal)?;
        if self.reveals_remaining == 0 {
            return Err(self.refuse(SessionError::RevealQuotaExhausted));
        }
        let (Some(level), Some(world)) = (
            self.level_index.and_then(|index| self.catalog.get(index)),
            self.world.as_mut(),
        ) else {
            return Err(self.refuse(SessionError::PhaseMismatch {
                action: Action::Reveal,
                phase: self.phase,
            }));
        };

        world::apply(world, Command::ClearPlacement, &mut self.events);
        for (pod, node) in &level.solution {
            world::apply(
                world,
                Command::SchedulePod {
                    pod: pod.clone(),
                    node: node.clone(),
                },
                &mut self.events,
            );
        }

        self.reveals_remaining -= 1;
        self.solution_revealed = true;
        let remaining = self.reveals_remaining;
        self.journal.record(
            Severity::Success,
            format!("Solution revealed ({remaining} remaining)"),
        );
        self.events.push(Event::SolutionRevealed { remaining });
        self.rescore();
        Ok(RevealReceipt { remaining })
    }

    /// Nodes the pod could currently be scheduled onto.
    #[must_use]
    pub fn placeable_nodes(&self, pod: &PodId) -> Vec<NodeId> {
        let Some(world) = self.world.as_ref() else {
            return Vec::new();
        };
        let Some(pod_view) = query::pod(world, pod) else {
            return Vec::new();
        };
        admission::placeable_nodes(
            &pod_view,
            &query::nodes(world),
            &query::pods(world),
            query::validation(world),
        )
    }

    /// Captures the complete observable state.
    #[must_use]
    pub fn current_state(&self) -> SessionSnapshot {
        let level = self.level();
        let (nodes, pods, physical_hosts, control_plane, validation) = match self.world.as_ref() {
            Some(world) => (
                query::nodes(world),
                query::pods(world),
                query::physical_hosts(world),
                query::control_plane(world),
                query::validation(world),
            ),
            None => (
                Vec::new(),
                Vec::new(),
                Vec::new(),
                Vec::new(),
                ValidationFlags::default(),
            ),
        };

        SessionSnapshot {
            phase: self.phase,
            level_index: self.level_index,
            level_name: level.map(|level| level.name.clone()),
            hint: level.and_then(|level| level.hint.clone()),
            validation,
            nodes,
            pods,
            physical_hosts,
            control_plane,
            objectives: self.objectives.clone(),
            score: self.score,
            reveals_remaining: self.reveals_remaining,
            solution_revealed: self.solution_revealed,
            completed_levels: self.completed_levels.iter().copied().collect(),
        }
    }

    fn next_level_index(&self) -> usize {
        self.level_index.map_or(0, |index| index + 1)
    }

    fn guard(&mut self, action: Action) -> Result<GamePhase, SessionError> {
        let has_next_level = self.next_level_index() < self.catalog.len();
        phase::next_phase(self.phase, action, has_next_level).map_err(|error| self.refuse(error))
    }

    fn refuse(&mut self, error: SessionError) -> SessionError {
        self.journal.record(Severity::Error, error.to_string());
        self.events.push(Event::ActionRejected { kind: error.kind() });
        error
    }

    fn enter(&mut self, phase: GamePhase) {
        if self.phase != phase {
            info!(from = %self.phase, to = %phase, "phase changed");
        }
        self.phase = phase;
        self.events.push(Event::PhaseChanged { phase });
    }

    fn rescore(&mut self) {
        let (Some(level), Some(world)) = (self.level(), self.world.as_ref()) else {
            return;
        };
        let statuses = objectives::evaluate(
            &level.objectives,
            &query::nodes(world),
            &query::pods(world),
        );
        self.objectives = statuses;
        let satisfied = objectives::completed_count(&self.objectives);
        let total = self.objectives.len();
        debug!(satisfied, total, "objectives evaluated");
        self.events
            .push(Event::ObjectivesEvaluated { satisfied, total });
    }

    fn complete_level(&mut self) {
        let Some(index) = self.level_index else {
            return;
        };
        let award = self.config.award_per_ordinal * (index as u64 + 1);
        self.score += award;
        let _ = self.completed_levels.insert(index);
        self.journal.record(
            Severity::Success,
            format!("Level {} complete! +{award} points", index + 1),
        );
        self.events.push(Event::LevelCompleted { index, award });
        self.enter(GamePhase::LevelComplete);
    }
}
