use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ============================================================================
// Configuration
// ============================================================================

pub const GRID_WIDTH: usize = 10;
pub const GRID_HEIGHT: usize = 20;

/// Points awarded for each cleared row.
pub const ROW_CLEAR_SCORE: u32 = 100;

// ============================================================================
// Types
// ============================================================================

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct Position {
    pub x: i16,
    pub y: i16,
}

impl Position {
    pub const fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }

    pub const fn offset(self, dx: i16, dy: i16) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    pub const fn checked_offset(self, dx: i16, dy: i16) -> Option<Self> {
        match (self.x.checked_add(dx), self.y.checked_add(dy)) {
            (Some(x), Some(y)) => Some(Self { x, y }),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum ShapeKind {
    I,
    J,
    L,
    O,
    S,
    T,
    Z,
}

impl ShapeKind {
    pub const ALL: [Self; 7] = [
        Self::I,
        Self::J,
        Self::L,
        Self::O,
        Self::S,
        Self::T,
        Self::Z,
    ];

    /// `CATALOG` lists the shapes in declaration order.
    pub fn entry(self) -> &'static CatalogEntry {
        &CATALOG[self as usize]
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PieceColor {
    Cyan,
    Blue,
    Orange,
    Yellow,
    Green,
    Purple,
    Red,
}

/// Opaque identity of a drawn piece. Only the display layer looks at it.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, PartialOrd, Ord)]
pub struct PieceId(u64);

impl PieceId {
    fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

// ============================================================================
// Piece Catalog
// ============================================================================

/// Spawn layout of one shape. `pivot` indexes the cell that stays put when the
/// piece rotates; it is chosen by hand per shape, never computed.
#[derive(Debug)]
pub struct CatalogEntry {
    pub kind: ShapeKind,
    pub cells: [Position; 4],
    pub color: PieceColor,
    pub pivot: usize,
}

const fn p(x: i16, y: i16) -> Position {
    Position::new(x, y)
}

pub static CATALOG: [CatalogEntry; 7] = [
    // I: ####, turns around the second block from the left.
    CatalogEntry {
        kind: ShapeKind::I,
        cells: [p(3, 0), p(4, 0), p(5, 0), p(6, 0)],
        color: PieceColor::Cyan,
        pivot: 1,
    },
    // J: corner on the top left, turns around the middle of the long side.
    CatalogEntry {
        kind: ShapeKind::J,
        cells: [p(3, 0), p(4, 1), p(3, 1), p(5, 1)],
        color: PieceColor::Blue,
        pivot: 1,
    },
    // L: corner on the top right, turns around the middle of the long side.
    CatalogEntry {
        kind: ShapeKind::L,
        cells: [p(5, 0), p(4, 1), p(3, 1), p(5, 1)],
        color: PieceColor::Orange,
        pivot: 1,
    },
    // O: turns around its top right block, so it shifts when rotated.
    CatalogEntry {
        kind: ShapeKind::O,
        cells: [p(3, 0), p(4, 0), p(3, 1), p(4, 1)],
        color: PieceColor::Yellow,
        pivot: 1,
    },
    // S: turns around the bottom block under the upper pair.
    CatalogEntry {
        kind: ShapeKind::S,
        cells: [p(3, 1), p(4, 1), p(4, 0), p(5, 0)],
        color: PieceColor::Green,
        pivot: 1,
    },
    // T: turns around the stem's base.
    CatalogEntry {
        kind: ShapeKind::T,
        cells: [p(3, 1), p(4, 1), p(5, 1), p(4, 0)],
        color: PieceColor::Purple,
        pivot: 1,
    },
    // Z: turns around the top block above the lower pair.
    CatalogEntry {
        kind: ShapeKind::Z,
        cells: [p(3, 0), p(4, 0), p(4, 1), p(5, 1)],
        color: PieceColor::Red,
        pivot: 1,
    },
];

// ============================================================================
// Piece
// ============================================================================

#[derive(Clone, Debug)]
pub struct Piece {
    pub kind: ShapeKind,
    pub positions: [Position; 4],
    pub color: PieceColor,
    pub id: PieceId,
}

impl Piece {
    /// A fresh piece in its catalog spawn position.
    pub fn new(kind: ShapeKind) -> Self {
        Self::with_positions(kind, kind.entry().cells)
    }

    /// A fresh piece of `kind` occupying `positions`, listed in catalog order.
    pub fn with_positions(kind: ShapeKind, positions: [Position; 4]) -> Self {
        Self {
            kind,
            positions,
            color: kind.entry().color,
            id: PieceId::fresh(),
        }
    }

    pub fn pivot(&self) -> Position {
        self.positions[self.kind.entry().pivot]
    }

    pub fn translated(&self, dx: i16, dy: i16) -> Self {
        Self {
            positions: self.positions.map(|pos| pos.offset(dx, dy)),
            ..self.clone()
        }
    }

    /// `None` when a cell would leave the coordinate range.
    pub fn checked_translated(&self, dx: i16, dy: i16) -> Option<Self> {
        let mut positions = self.positions;
        for pos in &mut positions {
            *pos = pos.checked_offset(dx, dy)?;
        }
        Some(Self {
            positions,
            ..self.clone()
        })
    }
}

/// Draws one catalog shape uniformly at random.
pub fn draw_random_piece() -> Piece {
    draw_random_piece_with(&mut rand::thread_rng())
}

pub fn draw_random_piece_with<R: Rng>(rng: &mut R) -> Piece {
    Piece::new(ShapeKind::ALL[rng.gen_range(0..ShapeKind::ALL.len())])
}

// ============================================================================
// Piece Source Trait
// ============================================================================

pub trait PieceSource {
    fn draw(&mut self) -> Piece;
}

/// Uniform, independent draws with no bag or repeat protection.
pub struct RandomPieces {
    rng: StdRng,
}

impl RandomPieces {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomPieces {
    fn default() -> Self {
        Self::new()
    }
}

impl PieceSource for RandomPieces {
    fn draw(&mut self) -> Piece {
        draw_random_piece_with(&mut self.rng)
    }
}

pub struct SequencePieces {
    kinds: Vec<ShapeKind>,
    index: usize,
}

impl SequencePieces {
    pub fn new(kinds: Vec<ShapeKind>) -> Self {
        assert!(!kinds.is_empty(), "piece sequence must not be empty");
        Self { kinds, index: 0 }
    }
}

impl PieceSource for SequencePieces {
    fn draw(&mut self) -> Piece {
        let kind = self.kinds[self.index % self.kinds.len()];
        self.index += 1;
        Piece::new(kind)
    }
}

// ============================================================================
// Grid
// ============================================================================

/// A grid cell: empty, or shared with every other cell of the piece locked there.
pub type Cell = Option<Rc<Piece>>;

/// `GRID_HEIGHT` rows of `GRID_WIDTH` cells, row 0 at the top.
///
/// Rows are shared between grid values; every update builds a new grid and
/// copies only the rows it touches.
#[derive(Clone, Debug)]
pub struct Grid {
    rows: Vec<Rc<[Cell]>>,
}

fn empty_row() -> Rc<[Cell]> {
    vec![None; GRID_WIDTH].into()
}

impl Grid {
    pub fn empty() -> Self {
        Self {
            rows: (0..GRID_HEIGHT).map(|_| empty_row()).collect(),
        }
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        GRID_WIDTH
    }

    pub fn row(&self, y: usize) -> &[Cell] {
        &self.rows[y]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.rows.iter().map(|row| &row[..])
    }

    /// The piece locked at `(x, y)`; `None` when empty or outside the grid.
    pub fn cell(&self, x: i16, y: i16) -> Option<&Rc<Piece>> {
        if !in_bounds(x, y) {
            return None;
        }
        self.rows[y as usize][x as usize].as_ref()
    }

    pub fn is_occupied(&self, x: i16, y: i16) -> bool {
        self.cell(x, y).is_some()
    }

    /// Writes `piece` into every listed cell that lies inside the grid and is
    /// still empty. Anything else is skipped.
    pub fn with_cells(&self, cells: &[Position], piece: &Rc<Piece>) -> Self {
        let mut rows = self.rows.clone();
        for pos in cells {
            if !in_bounds(pos.x, pos.y) {
                continue;
            }
            let (x, y) = (pos.x as usize, pos.y as usize);
            if rows[y][x].is_some() {
                continue;
            }
            let mut row = rows[y].to_vec();
            row[x] = Some(Rc::clone(piece));
            rows[y] = row.into();
        }
        Self { rows }
    }

    /// Locks `piece` into a copy of this grid.
    pub fn lock(&self, piece: &Piece) -> Self {
        self.with_cells(&piece.positions, &Rc::new(piece.clone()))
    }

    pub fn filled_count(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|row| row.iter())
            .filter(|cell| cell.is_some())
            .count()
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::empty()
    }
}

fn in_bounds(x: i16, y: i16) -> bool {
    x >= 0 && (x as usize) < GRID_WIDTH && y >= 0 && (y as usize) < GRID_HEIGHT
}

// ============================================================================
// Collision Detection
// ============================================================================

/// True when the piece cannot fall another row from where it is: some cell
/// sits on the last row or directly above a locked cell.
pub fn has_vertical_collision(piece: &Piece, grid: &Grid) -> bool {
    piece
        .positions
        .iter()
        .any(|pos| pos.y >= GRID_HEIGHT as i16 - 1 || grid.is_occupied(pos.x, pos.y + 1))
}

/// True when shifting the piece by `dx` would put a cell more than one column
/// past either edge. Locked cells are not consulted.
pub fn has_horizontal_collision(piece: &Piece, dx: i16) -> bool {
    piece.positions.iter().any(|pos| {
        pos.x
            .checked_add(dx)
            .map_or(true, |x| x < -1 || x >= GRID_WIDTH as i16 + 1)
    })
}

// ============================================================================
// Rotation
// ============================================================================

/// Rotates 90 degrees clockwise (y grows downward) about the piece's pivot.
/// The result is not checked against the grid.
pub fn rotate(piece: &Piece) -> Piece {
    try_rotate(piece).unwrap_or_else(|| piece.clone())
}

/// Like [`rotate`], but `None` when a cell would leave the coordinate range.
pub fn try_rotate(piece: &Piece) -> Option<Piece> {
    let pivot = piece.pivot();
    let mut positions = piece.positions;
    for pos in &mut positions {
        let dx = pos.x.checked_sub(pivot.x)?;
        let dy = pos.y.checked_sub(pivot.y)?;
        // [cos 90, -sin 90; sin 90, cos 90] applied to (dx, dy)
        *pos = Position::new(pivot.x.checked_sub(dy)?, pivot.y.checked_add(dx)?);
    }
    Some(Piece {
        positions,
        ..piece.clone()
    })
}

// ============================================================================
// Row Clearing
// ============================================================================

/// Indices of rows with no empty cell, top to bottom.
pub fn find_full_rows(grid: &Grid) -> Vec<usize> {
    grid.rows()
        .enumerate()
        .filter(|(_, row)| row.iter().all(Option::is_some))
        .map(|(y, _)| y)
        .collect()
}

/// Drops row `y` and pushes a fresh empty row in at the top. An index outside
/// the grid leaves it as is.
pub fn clear_row(grid: &Grid, y: usize) -> Grid {
    if y >= grid.height() {
        return grid.clone();
    }
    let mut rows = Vec::with_capacity(grid.height());
    rows.push(empty_row());
    rows.extend(
        grid.rows
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != y)
            .map(|(_, row)| Rc::clone(row)),
    );
    Grid { rows }
}

// ============================================================================
// Game State
// ============================================================================

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Falling,
    RowClearing,
    GameOver,
}

#[derive(Clone, Debug)]
pub struct GameState {
    pub current_piece: Piece,
    pub next_piece: Piece,
    pub grid: Grid,
    pub score: u32,
    pub highscore: u32,
    pub game_end: bool,
}

impl GameState {
    /// Two fresh pieces, an empty grid, no score.
    pub fn initial(pieces: &mut dyn PieceSource, highscore: u32) -> Self {
        let current_piece = pieces.draw();
        let next_piece = pieces.draw();
        Self {
            current_piece,
            next_piece,
            grid: Grid::empty(),
            score: 0,
            highscore,
            game_end: false,
        }
    }

    /// What the next tick will do.
    pub fn phase(&self) -> Phase {
        if self.game_end {
            Phase::GameOver
        } else if find_full_rows(&self.grid).is_empty() {
            Phase::Falling
        } else {
            Phase::RowClearing
        }
    }

    /// Colours of the grid with the falling piece drawn over it. Cells of the
    /// piece hanging outside the grid are left out.
    pub fn render_grid(&self) -> Vec<Vec<Option<PieceColor>>> {
        let mut visual: Vec<Vec<Option<PieceColor>>> = self
            .grid
            .rows()
            .map(|row| row.iter().map(|cell| cell.as_ref().map(|piece| piece.color)).collect())
            .collect();

        if !self.game_end {
            for pos in self.current_piece.positions {
                if in_bounds(pos.x, pos.y) {
                    visual[pos.y as usize][pos.x as usize] = Some(self.current_piece.color);
                }
            }
        }

        visual
    }
}

// ============================================================================
// Test Helpers
// ============================================================================

pub mod test_helpers {
    use super::*;

    pub fn filler() -> Rc<Piece> {
        Rc::new(Piece::new(ShapeKind::T))
    }

    pub fn fill_row(grid: &Grid, y: usize) -> Grid {
        let cells: Vec<Position> = (0..GRID_WIDTH)
            .map(|x| Position::new(x as i16, y as i16))
            .collect();
        grid.with_cells(&cells, &filler())
    }

    pub fn fill_row_with_gap(grid: &Grid, y: usize, gap_x: usize) -> Grid {
        let cells: Vec<Position> = (0..GRID_WIDTH)
            .filter(|x| *x != gap_x)
            .map(|x| Position::new(x as i16, y as i16))
            .collect();
        grid.with_cells(&cells, &filler())
    }

    pub fn state_with(grid: Grid, current_piece: Piece, next_piece: Piece) -> GameState {
        GameState {
            current_piece,
            next_piece,
            grid,
            score: 0,
            highscore: 0,
            game_end: false,
        }
    }
}
