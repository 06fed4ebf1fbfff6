use crate::model::{Phase, Snapshot};
use crate::orchestrator::UiCommand;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

pub const TAB_DASHBOARD: usize = 0;
pub const TAB_HISTORY: usize = 1;
pub const TAB_HELP: usize = 2;
const TAB_COUNT: usize = 3;

/// UI-local state. Everything about the test itself comes from the snapshot.
#[derive(Default)]
pub struct UiState {
    pub tab: usize,
    pub info: String,
    pub snapshot: Snapshot,
}

/// What the event loop should do after a key press.
#[derive(Debug)]
pub(crate) enum KeyAction {
    None,
    Command(UiCommand),
    Share,
    Quit,
}

/// Map a key press to an action, updating UI-local state on the way.
pub(crate) fn handle_key(state: &mut UiState, key: KeyEvent) -> KeyAction {
    let run = &state.snapshot.run;
    match (key.modifiers, key.code) {
        (_, KeyCode::Char('q')) | (KeyModifiers::CONTROL, KeyCode::Char('c')) => KeyAction::Quit,
        (_, KeyCode::Enter) | (_, KeyCode::Char(' ')) => {
            if run.running || run.phase != Phase::Idle {
                return KeyAction::None;
            }
            state.tab = TAB_DASHBOARD;
            state.info.clear();
            KeyAction::Command(UiCommand::Start)
        }
        (_, KeyCode::Char('r')) => {
            if run.running {
                state.info = "Test in progress; press x to cancel first".into();
                return KeyAction::None;
            }
            state.info.clear();
            KeyAction::Command(UiCommand::Reset)
        }
        (_, KeyCode::Char('x')) => {
            if !run.running {
                return KeyAction::None;
            }
            state.info = "Cancelling…".into();
            KeyAction::Command(UiCommand::Cancel)
        }
        (_, KeyCode::Char('p')) => {
            if !run.running {
                return KeyAction::None;
            }
            KeyAction::Command(UiCommand::Pause(!run.paused))
        }
        (_, KeyCode::Char('s')) => KeyAction::Share,
        (_, KeyCode::Tab) => {
            state.tab = (state.tab + 1) % TAB_COUNT;
            KeyAction::None
        }
        (_, KeyCode::Char('?')) => {
            state.tab = TAB_HELP;
            KeyAction::None
        }
        _ => KeyAction::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::sample_result;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn enter_starts_only_from_idle() {
        let mut state = UiState::default();
        assert!(matches!(
            handle_key(&mut state, key(KeyCode::Enter)),
            KeyAction::Command(UiCommand::Start)
        ));

        state.snapshot.run.running = true;
        state.snapshot.run.phase = Phase::Ping;
        assert!(matches!(
            handle_key(&mut state, key(KeyCode::Enter)),
            KeyAction::None
        ));

        state.snapshot.run.running = false;
        state.snapshot.run.phase = Phase::Complete;
        state.snapshot.result = Some(sample_result(1));
        assert!(matches!(
            handle_key(&mut state, key(KeyCode::Char(' '))),
            KeyAction::None
        ));
    }

    #[test]
    fn reset_is_refused_while_running() {
        let mut state = UiState::default();
        state.snapshot.run.running = true;
        assert!(matches!(
            handle_key(&mut state, key(KeyCode::Char('r'))),
            KeyAction::None
        ));
        assert!(!state.info.is_empty());

        state.snapshot.run.running = false;
        assert!(matches!(
            handle_key(&mut state, key(KeyCode::Char('r'))),
            KeyAction::Command(UiCommand::Reset)
        ));
    }

    #[test]
    fn pause_toggles_against_current_state() {
        let mut state = UiState::default();
        state.snapshot.run.running = true;
        assert!(matches!(
            handle_key(&mut state, key(KeyCode::Char('p'))),
            KeyAction::Command(UiCommand::Pause(true))
        ));
        state.snapshot.run.paused = true;
        assert!(matches!(
            handle_key(&mut state, key(KeyCode::Char('p'))),
            KeyAction::Command(UiCommand::Pause(false))
        ));
    }

    #[test]
    fn tab_cycles_and_help_jumps() {
        let mut state = UiState::default();
        handle_key(&mut state, key(KeyCode::Tab));
        assert_eq!(state.tab, TAB_HISTORY);
        handle_key(&mut state, key(KeyCode::Tab));
        handle_key(&mut state, key(KeyCode::Tab));
        assert_eq!(state.tab, TAB_DASHBOARD);
        handle_key(&mut state, key(KeyCode::Char('?')));
        assert_eq!(state.tab, TAB_HELP);
    }

    #[test]
    fn ctrl_c_quits() {
        let mut state = UiState::default();
        let ev = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(matches!(handle_key(&mut state, ev), KeyAction::Quit));
    }
}
