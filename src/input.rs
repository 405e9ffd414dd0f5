//! Key bindings: arrows, WASD and vim-style.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::session::Input;

/// What a key press asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Game(Input),
    Quit,
    None,
}

/// Map a key event to an action. Releases and repeats are ignored.
pub fn key_to_action(key: KeyEvent) -> Action {
    if key.kind != KeyEventKind::Press {
        return Action::None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Action::Quit,
            _ => Action::None,
        };
    }
    match key.code {
        KeyCode::Esc | KeyCode::Char('q' | 'Q') => Action::Quit,
        KeyCode::Left | KeyCode::Char('a' | 'A' | 'h') => Action::Game(Input::MoveLeft),
        KeyCode::Right | KeyCode::Char('d' | 'D' | 'l') => Action::Game(Input::MoveRight),
        KeyCode::Down | KeyCode::Char('s' | 'S' | 'j') => Action::Game(Input::SoftDrop),
        KeyCode::Up | KeyCode::Char('w' | 'W' | 'k') => Action::Game(Input::Rotate),
        KeyCode::Char('r' | 'R') => Action::Game(Input::Restart),
        _ => Action::None,
    }
}
