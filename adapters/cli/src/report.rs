use std::fmt;

use cluster_conductor_system_session::SessionSnapshot;

/// Plain-text rendering of a session snapshot.
pub(crate) struct StatusReport<'a>(pub(crate) &'a SessionSnapshot);

impl fmt::Display for StatusReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.0;
        writeln!(f, "phase: {}", state.phase)?;
        if let (Some(index), Some(name)) = (state.level_index, &state.level_name) {
            writeln!(f, "level {}: {name}", index + 1)?;
        }
        writeln!(
            f,
            "score: {}  reveals left: {}{}",
            state.score,
            state.reveals_remaining,
            if state.solution_revealed {
                "  (solution revealed)"
            } else {
                ""
            }
        )?;

        if !state.nodes.is_empty() {
            writeln!(f, "nodes:")?;
        }
        for node in &state.nodes {
            write!(
                f,
                "  {} {} [{}/{}] vCPU {:.1}/{:.1} mem {:.1}/{:.1}",
                node.id,
                node.name,
                node.occupants.len(),
                node.capacity,
                node.budget.vcpu_used,
                node.budget.vcpu,
                node.budget.memory_used,
                node.budget.memory,
            )?;
            if node.occupants.is_empty() {
                writeln!(f)?;
            } else {
                let occupants: Vec<&str> = node.occupants.iter().map(|pod| pod.as_str()).collect();
                writeln!(f, ": {}", occupants.join(", "))?;
            }
        }

        let pending: Vec<&str> = state
            .pods
            .iter()
            .filter(|pod| !pod.is_scheduled())
            .map(|pod| pod.id.as_str())
            .collect();
        if !pending.is_empty() {
            writeln!(f, "unscheduled: {}", pending.join(", "))?;
        }

        if !state.objectives.is_empty() {
            let satisfied = state
                .objectives
                .iter()
                .filter(|objective| objective.completed)
                .count();
            writeln!(f, "objectives ({satisfied}/{}):", state.objectives.len())?;
        }
        for objective in &state.objectives {
            let mark = if objective.completed { 'x' } else { ' ' };
            writeln!(f, "  [{mark}] {}", objective.description)?;
        }
        Ok(())
    }
}
