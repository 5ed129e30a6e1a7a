//! Line-oriented session scripts.
//!
//! One action per line; blank lines and `#` comments are skipped:
//!
//! ```text
//! start
//! begin
//! move frontend-a node-1
//! candidates backend-a
//! reveal
//! advance
//! jump 2
//! restart
//! status
//! export
//! import cluster:v1:1:<payload>
//! ```

use std::io::Write;

use anyhow::{anyhow, bail, Context, Result};
use cluster_conductor_core::{Event, MoveOutcome, NodeId, PodId, SessionError};
use cluster_conductor_system_session::Session;

use crate::{placement_transfer::PlacementSnapshot, report::StatusReport};

/// Single scripted action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Step {
    Start,
    Begin,
    Advance,
    Restart,
    Reveal,
    /// Zero-based catalog index.
    Jump(usize),
    Move {
        pod: PodId,
        node: NodeId,
    },
    Candidates(PodId),
    Status,
    Export,
    Import(String),
}

/// Parses a script, reporting the first malformed line.
pub(crate) fn parse(source: &str) -> Result<Vec<Step>> {
    let mut steps = Vec::new();
    for (number, line) in source.lines().enumerate() {
        let line = line.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }
        let step = parse_line(line).with_context(|| format!("script line {}", number + 1))?;
        steps.push(step);
    }
    Ok(steps)
}

fn parse_line(line: &str) -> Result<Step> {
    let mut words = line.split_whitespace();
    let verb = words.next().unwrap_or_default();
    let mut argument = |name: &str| {
        words
            .next()
            .ok_or_else(|| anyhow!("`{verb}` expects a {name}"))
    };

    let step = match verb {
        "start" => Step::Start,
        "begin" => Step::Begin,
        "advance" => Step::Advance,
        "restart" => Step::Restart,
        "reveal" => Step::Reveal,
        "status" => Step::Status,
        "export" => Step::Export,
        "jump" => {
            let index = argument("level index")?;
            Step::Jump(
                index
                    .parse()
                    .with_context(|| format!("invalid level index '{index}'"))?,
            )
        }
        "move" => {
            let pod = PodId::new(argument("pod")?);
            let node = NodeId::new(argument("node")?);
            Step::Move { pod, node }
        }
        "candidates" => Step::Candidates(PodId::new(argument("pod")?)),
        "import" => Step::Import(argument("placement string")?.to_owned()),
        other => bail!("unknown action '{other}'"),
    };

    if let Some(extra) = words.next() {
        bail!("unexpected argument '{extra}' after `{verb}`");
    }
    Ok(step)
}

/// Applies every step to the session, narrating the outcome of each.
///
/// Refused actions are reported and the script continues; only output
/// failures abort the run.
pub(crate) fn run(session: &mut Session, steps: &[Step], out: &mut impl Write) -> Result<()> {
    for step in steps {
        match step {
            Step::Start => {
                let result = session.start();
                acknowledge(out, session, result)?;
            }
            Step::Begin => {
                let result = session.begin();
                acknowledge(out, session, result)?;
            }
            Step::Advance => {
                let result = session.advance();
                acknowledge(out, session, result)?;
            }
            Step::Jump(index) => {
                let result = session.jump_to_level(*index);
                acknowledge(out, session, result)?;
            }
            Step::Restart => {
                session.restart();
                acknowledge(out, session, Ok(()))?;
            }
            Step::Reveal => match session.reveal_solution() {
                Ok(receipt) => writeln!(
                    out,
                    "solution revealed ({} remaining)",
                    receipt.remaining
                )?,
                Err(error) => writeln!(out, "refused: {error}")?,
            },
            Step::Move { pod, node } => {
                let outcome = session.attempt_move(pod, node);
                describe_move(out, pod, node, &outcome)?;
                if let Some(name) = completed_level(session) {
                    writeln!(out, "level complete: {name}")?;
                }
            }
            Step::Candidates(pod) => {
                let nodes = session.placeable_nodes(pod);
                let listed: Vec<&str> = nodes.iter().map(NodeId::as_str).collect();
                if listed.is_empty() {
                    writeln!(out, "candidates for {pod}: none")?;
                } else {
                    writeln!(out, "candidates for {pod}: {}", listed.join(", "))?;
                }
            }
            Step::Status => write!(out, "{}", StatusReport(&session.current_state()))?,
            Step::Export => match PlacementSnapshot::capture(&session.current_state()) {
                Some(snapshot) => writeln!(out, "{}", snapshot.encode()?)?,
                None => writeln!(out, "refused: no level loaded")?,
            },
            Step::Import(code) => import(session, code, out)?,
        }
    }
    Ok(())
}

/// Decodes a placement string and replays it into the session.
pub(crate) fn import(session: &mut Session, code: &str, out: &mut impl Write) -> Result<()> {
    let snapshot = match PlacementSnapshot::decode(code) {
        Ok(snapshot) => snapshot,
        Err(error) => {
            writeln!(out, "refused: {error}")?;
            return Ok(());
        }
    };

    match snapshot.replay(session) {
        Ok(outcomes) => {
            for (placement, outcome) in snapshot.placements.iter().zip(&outcomes) {
                describe_move(out, &placement.pod, &placement.node, outcome)?;
            }
            if let Some(name) = completed_level(session) {
                writeln!(out, "level complete: {name}")?;
            }
        }
        Err(error) => writeln!(out, "refused: {error}")?,
    }
    Ok(())
}

fn acknowledge(
    out: &mut impl Write,
    session: &Session,
    result: Result<(), SessionError>,
) -> Result<()> {
    match result {
        Ok(()) => writeln!(out, "ok: {}", session.phase())?,
        Err(error) => writeln!(out, "refused: {error}")?,
    }
    Ok(())
}

fn describe_move(
    out: &mut impl Write,
    pod: &PodId,
    node: &NodeId,
    outcome: &MoveOutcome,
) -> Result<()> {
    match outcome {
        MoveOutcome::Scheduled { .. } => writeln!(out, "scheduled {pod} on {node}")?,
        MoveOutcome::Unchanged => writeln!(out, "{pod} already on {node}")?,
        MoveOutcome::Rejected(rejection) => writeln!(out, "rejected: {rejection}")?,
        MoveOutcome::Ignored(unknown) => writeln!(out, "ignored: {unknown}")?,
    }
    Ok(())
}

fn completed_level(session: &mut Session) -> Option<String> {
    session
        .drain_events()
        .into_iter()
        .find_map(|event| match event {
            Event::LevelCompleted { index, award } => {
                let name = session
                    .catalog()
                    .get(index)
                    .map_or_else(String::new, |level| level.name.clone());
                Some(format!("{name} (+{award})"))
            }
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_actions_and_skips_comments() {
        let steps = parse(
            "# warm up\nstart\n\nbegin   # play\nmove frontend-a node-1\njump 3\nimport cluster:v1:1:W10\n",
        )
        .expect("script parses");

        assert_eq!(
            steps,
            vec![
                Step::Start,
                Step::Begin,
                Step::Move {
                    pod: PodId::new("frontend-a"),
                    node: NodeId::new("node-1"),
                },
                Step::Jump(3),
                Step::Import("cluster:v1:1:W10".to_owned()),
            ]
        );
    }

    #[test]
    fn reports_the_offending_line() {
        let error = parse("start\nmove frontend-a\n").expect_err("move lacks a node");

        assert_eq!(error.to_string(), "script line 2");
        assert_eq!(error.root_cause().to_string(), "`move` expects a node");
    }

    #[test]
    fn rejects_unknown_actions_and_extra_arguments() {
        assert!(parse("deploy everything").is_err());
        assert!(parse("begin now").is_err());
        assert!(parse("jump two").is_err());
    }
}
