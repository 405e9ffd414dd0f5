//! Owns the running game: turns inputs into commands, folds them into the
//! state, reports what happened and keeps the persisted high score current.

use std::time::Duration;

use crate::command::{reduce, Command};
use crate::game::{find_full_rows, GameState, PieceSource};
use crate::highscore::{HighScoreError, HighScoreStore};

/// Everything the outside world can feed into a session, in arrival order.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Input {
    MoveLeft,
    MoveRight,
    SoftDrop,
    Rotate,
    Restart,
    Tick(Duration),
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum GameEvent {
    PieceMoved,
    PieceRotated,
    PieceLocked,
    RowCleared(usize),
    NewHighScore(u32),
    GameOver,
    GameRestarted,
}

pub struct Session<S: HighScoreStore> {
    state: GameState,
    store: S,
    pieces: Box<dyn PieceSource>,
    events: Vec<GameEvent>,
}

impl<S: HighScoreStore> Session<S> {
    pub fn new(store: S, mut pieces: Box<dyn PieceSource>) -> Self {
        let state = GameState::initial(pieces.as_mut(), store.read());
        Self::with_state(state, store, pieces)
    }

    pub fn with_state(state: GameState, store: S, pieces: Box<dyn PieceSource>) -> Self {
        Self {
            state,
            store,
            pieces,
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn command_for(&self, input: Input) -> Command {
        match input {
            Input::MoveLeft => Command::MOVE_LEFT,
            Input::MoveRight => Command::MOVE_RIGHT,
            Input::SoftDrop => Command::SOFT_DROP,
            Input::Rotate => Command::ROTATE,
            Input::Tick(elapsed) => Command::Tick { elapsed },
            // The store may lag behind if a write failed.
            Input::Restart => Command::Restart {
                highscore: self.store.read().max(self.state.highscore),
            },
        }
    }

    /// Applies one input. The state always advances; an error only means the
    /// new high score could not be written.
    pub fn dispatch(&mut self, input: Input) -> Result<&GameState, HighScoreError> {
        let command = self.command_for(input);
        let next = reduce(&self.state, command, self.pieces.as_mut());
        let previous = std::mem::replace(&mut self.state, next);
        self.record_events(&previous, command);

        if !matches!(command, Command::Restart { .. }) && self.state.highscore > previous.highscore
        {
            self.events.push(GameEvent::NewHighScore(self.state.highscore));
            self.store.write(self.state.highscore)?;
        }
        Ok(&self.state)
    }

    /// Takes and clears all pending events.
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    fn record_events(&mut self, previous: &GameState, command: Command) {
        let next = &self.state;
        let moved = previous.current_piece.positions != next.current_piece.positions;
        match command {
            Command::Restart { .. } => self.events.push(GameEvent::GameRestarted),
            Command::Move { .. } if moved => self.events.push(GameEvent::PieceMoved),
            Command::Rotate { .. } if moved => self.events.push(GameEvent::PieceRotated),
            Command::Tick { .. } if next.score > previous.score => {
                if let Some(&y) = find_full_rows(&previous.grid).first() {
                    self.events.push(GameEvent::RowCleared(y));
                }
            }
            Command::Tick { .. } if next.game_end && !previous.game_end => {
                self.events.push(GameEvent::GameOver);
            }
            Command::Tick { .. } if next.current_piece.id != previous.current_piece.id => {
                self.events.push(GameEvent::PieceLocked);
            }
            _ => {}
        }
    }
}
