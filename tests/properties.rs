//! Property tests for the reducer and its building blocks.
//!
//! Invariants covered:
//! - `find_full_rows` lists exactly the rows without empty cells, ascending.
//! - `clear_row` never changes the grid height.
//! - Four rotations give back the starting cells for every shape.
//! - Moving left against the wall reaches a fixed point.
//! - A tick on a resting piece locks it and promotes the next piece.
//! - Score and high score never drop without a restart.

use std::time::Duration;

use proptest::prelude::*;

use blockfall::command::{reduce, Command};
use blockfall::game::{
    clear_row, find_full_rows, has_vertical_collision, rotate, test_helpers::*, GameState, Grid,
    Piece, Position, RandomPieces, ShapeKind, GRID_HEIGHT, GRID_WIDTH,
};

fn shape() -> impl Strategy<Value = ShapeKind> {
    prop::sample::select(ShapeKind::ALL.to_vec())
}

/// Random cells, with some rows forced full so full rows actually show up.
fn grids() -> impl Strategy<Value = Grid> {
    (
        prop::collection::vec(prop::collection::vec(any::<bool>(), GRID_WIDTH), GRID_HEIGHT),
        prop::collection::vec(prop::bool::weighted(0.3), GRID_HEIGHT),
    )
        .prop_map(|(cells, full)| {
            let filled: Vec<Position> = (0..GRID_HEIGHT)
                .flat_map(|y| (0..GRID_WIDTH).map(move |x| (x, y)))
                .filter(|&(x, y)| cells[y][x] || full[y])
                .map(|(x, y)| Position::new(x as i16, y as i16))
                .collect();
            Grid::empty().with_cells(&filled, &filler())
        })
}

fn command() -> impl Strategy<Value = Command> {
    prop_oneof![
        1 => Just(Command::MOVE_LEFT),
        1 => Just(Command::MOVE_RIGHT),
        1 => Just(Command::SOFT_DROP),
        1 => Just(Command::ROTATE),
        2 => Just(Command::Tick {
            elapsed: Duration::from_millis(500)
        }),
    ]
}

proptest! {
    #[test]
    fn full_rows_are_exactly_the_rows_without_gaps(grid in grids()) {
        let expected: Vec<usize> = (0..GRID_HEIGHT)
            .filter(|&y| (0..GRID_WIDTH).all(|x| grid.is_occupied(x as i16, y as i16)))
            .collect();
        prop_assert_eq!(find_full_rows(&grid), expected);
    }

    #[test]
    fn clearing_keeps_the_height(grid in grids(), y in 0usize..GRID_HEIGHT + 5) {
        let cleared = clear_row(&grid, y);
        prop_assert_eq!(cleared.height(), GRID_HEIGHT);
        prop_assert_eq!(grid.height(), GRID_HEIGHT);
        for row in cleared.rows() {
            prop_assert_eq!(row.len(), GRID_WIDTH);
        }
    }

    #[test]
    fn four_rotations_are_identity(kind in shape(), dx in -5i16..5, dy in 0i16..15) {
        let piece = Piece::new(kind).translated(dx, dy);
        let turned = rotate(&rotate(&rotate(&rotate(&piece))));
        prop_assert_eq!(turned.positions, piece.positions);
    }

    #[test]
    fn moving_left_settles_at_the_wall(kind in shape(), dy in 2i16..14) {
        let piece = Piece::new(kind).translated(0, dy);
        let mut state = state_with(Grid::empty(), piece, Piece::new(ShapeKind::O));
        let mut source = RandomPieces::seeded(1);
        for _ in 0..GRID_WIDTH {
            state = reduce(&state, Command::MOVE_LEFT, &mut source);
        }
        let settled = reduce(&state, Command::MOVE_LEFT, &mut source);
        prop_assert_eq!(settled.current_piece.positions, state.current_piece.positions);
        prop_assert!(state.current_piece.positions.iter().any(|pos| pos.x <= 0));
    }

    #[test]
    fn resting_piece_locks_on_tick(kind in shape(), dx in -3i16..=3) {
        let spawn = Piece::new(kind);
        let bottom = spawn.positions.iter().map(|pos| pos.y).max().unwrap_or(0);
        let piece = spawn.translated(dx, GRID_HEIGHT as i16 - 1 - bottom);
        let state = state_with(Grid::empty(), piece.clone(), Piece::new(ShapeKind::O));
        prop_assert!(has_vertical_collision(&piece, &state.grid));

        let next = reduce(&state, Command::Tick { elapsed: Duration::ZERO }, &mut RandomPieces::seeded(2));

        prop_assert_eq!(next.current_piece.id, state.next_piece.id);
        prop_assert_eq!(next.grid.filled_count(), 4);
        for pos in piece.positions {
            prop_assert_eq!(next.grid.cell(pos.x, pos.y).map(|p| p.id), Some(piece.id));
        }
    }

    #[test]
    fn score_and_highscore_never_drop(
        seed in any::<u64>(),
        commands in prop::collection::vec(command(), 1..400),
    ) {
        let mut source = RandomPieces::seeded(seed);
        let mut state = GameState::initial(&mut source, 0);
        for command in commands {
            let next = reduce(&state, command, &mut source);
            prop_assert!(next.score >= state.score);
            prop_assert!(next.highscore >= state.highscore);
            prop_assert!(next.highscore >= next.score);
            prop_assert_eq!(next.grid.height(), GRID_HEIGHT);
            if state.game_end {
                prop_assert!(next.game_end);
            }
            state = next;
        }
    }
}
