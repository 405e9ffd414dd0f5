//! Commands and the reducer that turns one game state into the next.

use std::time::Duration;

use crate::game::{
    clear_row, find_full_rows, has_horizontal_collision, has_vertical_collision, try_rotate,
    GameState, Piece, PieceSource, ROW_CLEAR_SCORE,
};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Command {
    Move { dx: i16, dy: i16 },
    /// `direction` is carried along but every rotation is clockwise.
    Rotate { direction: i8 },
    Tick { elapsed: Duration },
    /// Starts over, seeding the high score with the persisted value.
    Restart { highscore: u32 },
}

impl Command {
    pub const MOVE_LEFT: Self = Self::Move { dx: -1, dy: 0 };
    pub const MOVE_RIGHT: Self = Self::Move { dx: 1, dy: 0 };
    pub const SOFT_DROP: Self = Self::Move { dx: 0, dy: 1 };
    pub const ROTATE: Self = Self::Rotate { direction: 1 };

    pub fn apply(self, state: &GameState, pieces: &mut dyn PieceSource) -> GameState {
        reduce(state, self, pieces)
    }
}

/// Produces the state that follows `state` under `command`. The input state is
/// never modified; `pieces` is only drawn from on lock and restart.
///
/// A finished game ignores everything but `Restart`.
pub fn reduce(state: &GameState, command: Command, pieces: &mut dyn PieceSource) -> GameState {
    match command {
        Command::Restart { highscore } => GameState::initial(pieces, highscore),
        _ if state.game_end => state.clone(),
        Command::Move { dx, dy } => {
            try_place(state, state.current_piece.checked_translated(dx, dy), dx)
        }
        Command::Rotate { .. } => try_place(state, try_rotate(&state.current_piece), 0),
        Command::Tick { .. } => tick(state, pieces),
    }
}

/// Left fold over `commands`, yielding every intermediate state in order.
pub fn states<'a, I>(
    initial: GameState,
    commands: I,
    pieces: &'a mut dyn PieceSource,
) -> impl Iterator<Item = GameState> + 'a
where
    I: IntoIterator<Item = Command>,
    I::IntoIter: 'a,
{
    commands.into_iter().scan(initial, move |state, command| {
        *state = reduce(state, command, pieces);
        Some(state.clone())
    })
}

/// The state left after applying every command in turn.
pub fn run<I>(initial: GameState, commands: I, pieces: &mut dyn PieceSource) -> GameState
where
    I: IntoIterator<Item = Command>,
{
    commands
        .into_iter()
        .fold(initial, |state, command| reduce(&state, command, pieces))
}

/// Keeps `candidate` unless it collides or could not be computed at all.
fn try_place(state: &GameState, candidate: Option<Piece>, dx: i16) -> GameState {
    let Some(candidate) = candidate else {
        return state.clone();
    };
    if has_horizontal_collision(&candidate, dx.signum())
        || has_vertical_collision(&candidate, &state.grid)
    {
        return state.clone();
    }
    GameState {
        current_piece: candidate,
        ..state.clone()
    }
}

fn tick(state: &GameState, pieces: &mut dyn PieceSource) -> GameState {
    // One row per tick; the rest wait for the following ticks.
    if let Some(&y) = find_full_rows(&state.grid).first() {
        let score = state.score.saturating_add(ROW_CLEAR_SCORE);
        return GameState {
            grid: clear_row(&state.grid, y),
            score,
            highscore: state.highscore.max(score),
            ..state.clone()
        };
    }

    if state.grid.row(0).iter().any(Option::is_some) {
        return GameState {
            game_end: true,
            ..state.clone()
        };
    }

    if !has_vertical_collision(&state.current_piece, &state.grid) {
        return GameState {
            current_piece: state.current_piece.translated(0, 1),
            ..state.clone()
        };
    }

    GameState {
        grid: state.grid.lock(&state.current_piece),
        current_piece: state.next_piece.clone(),
        next_piece: pieces.draw(),
        ..state.clone()
    }
}
