use cluster_conductor_core::{Action, GamePhase, SessionError};

/// Phase reached by performing `action` in `current`.
///
/// Restart and level jumps are accepted from every phase and never consult
/// this table.
pub(crate) fn next_phase(
    current: GamePhase,
    action: Action,
    has_next_level: bool,
) -> Result<GamePhase, SessionError> {
    match (action, current) {
        (Action::Start, GamePhase::Menu) => Ok(GamePhase::Briefing),
        (Action::Begin, GamePhase::Briefing) => Ok(GamePhase::Playing),
        (Action::Advance, GamePhase::LevelComplete) if has_next_level => Ok(GamePhase::Briefing),
        (Action::Advance, GamePhase::LevelComplete) => Ok(GamePhase::GameComplete),
        (Action::Reveal, GamePhase::Playing) => Ok(GamePhase::Playing),
        (action, phase) => Err(SessionError::PhaseMismatch { action, phase }),
    }
}
