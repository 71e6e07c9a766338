//! Key bindings: normal and vim-style.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use gemfall::Direction;

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Move the cursor one cell on screen.
    Cursor(Direction),
    /// Pick the gem under the cursor, or swap with the picked one.
    Select,
    Cancel,
    DisableRandom,
    SlowMotion,
    ToggleBusy,
    Regenerate,
    Pause,
    Quit,
    None,
}

/// Map key event to board action. Supports both normal (arrows, enter) and vim (hjkl).
/// Screen up is towards higher rows, so `Up` maps straight through.
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    let no_mod = modifiers.is_empty() || modifiers == KeyModifiers::SHIFT;
    if modifiers == KeyModifiers::CONTROL && code == KeyCode::Char('c') {
        return Action::Quit;
    }
    if !no_mod {
        return Action::None;
    }
    match code {
        KeyCode::Char('q' | 'Q') => Action::Quit,
        KeyCode::Esc => Action::Cancel,
        KeyCode::Char('p' | 'P') => Action::Pause,
        KeyCode::Left | KeyCode::Char('h') => Action::Cursor(Direction::Left),
        KeyCode::Right | KeyCode::Char('l') => Action::Cursor(Direction::Right),
        KeyCode::Up | KeyCode::Char('k') => Action::Cursor(Direction::Up),
        KeyCode::Down | KeyCode::Char('j') => Action::Cursor(Direction::Down),
        KeyCode::Enter | KeyCode::Char(' ') => Action::Select,
        KeyCode::Char('d' | 'D') => Action::DisableRandom,
        KeyCode::Char('s' | 'S') => Action::SlowMotion,
        KeyCode::Char('b' | 'B') => Action::ToggleBusy,
        KeyCode::Char('r' | 'R') => Action::Regenerate,
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventKind;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: crossterm::event::KeyEventState::NONE,
        }
    }

    #[test]
    fn arrows_and_vim_keys_agree() {
        for (arrow, vim) in [
            (KeyCode::Left, 'h'),
            (KeyCode::Down, 'j'),
            (KeyCode::Up, 'k'),
            (KeyCode::Right, 'l'),
        ] {
            assert_eq!(
                key_to_action(press(arrow, KeyModifiers::NONE)),
                key_to_action(press(KeyCode::Char(vim), KeyModifiers::NONE))
            );
        }
    }

    #[test]
    fn modifiers_block_bindings_except_ctrl_c() {
        assert_eq!(
            key_to_action(press(KeyCode::Char('d'), KeyModifiers::ALT)),
            Action::None
        );
        assert_eq!(
            key_to_action(press(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Action::Quit
        );
        assert_eq!(
            key_to_action(press(KeyCode::Char('R'), KeyModifiers::SHIFT)),
            Action::Regenerate
        );
    }
}
