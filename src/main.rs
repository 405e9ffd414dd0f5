use std::io::{stdout, Stdout};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, Event},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};

use blockfall::game::{GameState, PieceColor, PieceSource, RandomPieces, GRID_HEIGHT, GRID_WIDTH};
use blockfall::highscore::{FileHighScoreStore, HighScoreError, LOCAL_HIGH_SCORE_FILE};
use blockfall::input::{key_to_action, Action};
use blockfall::session::{GameEvent, Input, Session};

/// Falling-block puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "blockfall",
    version,
    about = "Falling-block puzzle in the terminal. Fill rows to clear them.",
    long_about = "Falling-block puzzle in the terminal.\n\n\
        CONTROLS:\n  Left/A/H   Move left    Right/D/L  Move right\n  \
        Down/S/J   Soft drop    Up/W/K     Rotate\n  R          Restart      Q / Esc    Quit"
)]
struct Args {
    /// Time between gravity ticks.
    #[arg(long, default_value = "500", value_name = "MS")]
    tick_ms: u64,

    /// File holding the high score. Defaults to the user config directory.
    #[arg(long, value_name = "FILE")]
    highscore_file: Option<PathBuf>,

    /// Seed for the piece sequence.
    #[arg(long, value_name = "N")]
    seed: Option<u64>,
}

// ============================================================================
// Visual Constants
// ============================================================================

const CELL_WIDTH: u16 = 2;
const BLOCK_CHAR: &str = "██";
const EMPTY_CHAR: &str = "  ";

fn piece_color(color: PieceColor) -> Color {
    match color {
        PieceColor::Cyan => Color::Cyan,
        PieceColor::Blue => Color::Blue,
        PieceColor::Orange => Color::Rgb(255, 165, 0),
        PieceColor::Yellow => Color::Yellow,
        PieceColor::Green => Color::Green,
        PieceColor::Purple => Color::Magenta,
        PieceColor::Red => Color::Red,
    }
}

/// Display-only state gathered from session events.
#[derive(Default)]
struct View {
    new_record: bool,
    save_error: Option<HighScoreError>,
}

// ============================================================================
// Rendering
// ============================================================================

fn render(frame: &mut Frame, state: &GameState, view: &View) {
    let area = frame.size();

    let grid_display_width = (GRID_WIDTH as u16 * CELL_WIDTH) + 2;
    let grid_display_height = GRID_HEIGHT as u16 + 2;
    let side_width = 14;
    let total_width = grid_display_width + side_width + 2;
    let total_height = grid_display_height + 2;

    let main_area = centered_rect(total_width, total_height, area);
    let vertical = Layout::vertical([
        Constraint::Length(grid_display_height),
        Constraint::Fill(1),
    ])
    .split(main_area);

    let horizontal = Layout::horizontal([
        Constraint::Length(grid_display_width),
        Constraint::Length(side_width),
    ])
    .split(vertical[0]);

    let side = Layout::vertical([Constraint::Length(6), Constraint::Fill(1)]).split(horizontal[1]);

    render_grid(frame, state, horizontal[0]);
    render_preview(frame, state, side[0]);
    render_info(frame, state, view, side[1]);

    let controls = Paragraph::new(Line::from("←→: Move | ↓: Drop | ↑: Rotate | R: Restart | Q: Quit"))
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(controls, vertical[1]);

    if state.game_end {
        render_game_over(frame, state, area);
    }
}

fn render_grid(frame: &mut Frame, state: &GameState, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Blockfall ")
        .title_alignment(Alignment::Center);

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines: Vec<Line> = state
        .render_grid()
        .into_iter()
        .map(|row| {
            let spans: Vec<Span> = row
                .into_iter()
                .map(|cell| match cell {
                    Some(color) => Span::styled(BLOCK_CHAR, Style::default().fg(piece_color(color))),
                    None => Span::raw(EMPTY_CHAR),
                })
                .collect();
            Line::from(spans)
        })
        .collect();

    frame.render_widget(Paragraph::new(lines), inner);
}

fn render_preview(frame: &mut Frame, state: &GameState, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Next ")
        .title_alignment(Alignment::Center);

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let piece = &state.next_piece;
    let min_x = piece.positions.iter().map(|pos| pos.x).min().unwrap_or(0);
    let min_y = piece.positions.iter().map(|pos| pos.y).min().unwrap_or(0);
    let style = Style::default().fg(piece_color(piece.color));

    let mut lines: Vec<Line> = Vec::new();
    for y in 0..2i16 {
        let mut spans: Vec<Span> = vec![Span::raw(" ")];
        for x in 0..4i16 {
            let filled = piece
                .positions
                .iter()
                .any(|pos| pos.x - min_x == x && pos.y - min_y == y);
            if filled {
                spans.push(Span::styled(BLOCK_CHAR, style));
            } else {
                spans.push(Span::raw(EMPTY_CHAR));
            }
        }
        lines.push(Line::from(spans));
    }

    frame.render_widget(Paragraph::new(lines), inner);
}

fn render_info(frame: &mut Frame, state: &GameState, view: &View, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Info ")
        .title_alignment(Alignment::Center);

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled("Score", Style::default().fg(Color::Yellow))),
        Line::from(format!("{}", state.score)),
        Line::from(""),
        Line::from(Span::styled("Best", Style::default().fg(Color::Cyan))),
        Line::from(format!("{}", state.highscore)),
    ];
    if view.new_record {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("New best!", Style::default().fg(Color::Green))));
    }
    if view.save_error.is_some() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("Not saved", Style::default().fg(Color::Red))));
    }

    frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), inner);
}

fn render_game_over(frame: &mut Frame, state: &GameState, area: Rect) {
    let text = vec![
        Line::from(""),
        Line::from(Span::styled("GAME OVER", Style::default().fg(Color::Red))),
        Line::from(""),
        Line::from(format!("Score: {}", state.score)),
        Line::from(format!("Best: {}", state.highscore)),
        Line::from(""),
        Line::from(Span::styled(
            "R to restart, Q to quit",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let paragraph = Paragraph::new(text).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Game Over ")
            .title_alignment(Alignment::Center)
            .style(Style::default().bg(Color::Black)),
    );

    frame.render_widget(paragraph, centered_rect(28, 10, area));
}

/// A `width` x `height` box in the middle of `area`, shrunk to fit.
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

// ============================================================================
// Main Loop
// ============================================================================

fn apply(session: &mut Session<FileHighScoreStore>, input: Input, view: &mut View) {
    if let Err(err) = session.dispatch(input) {
        view.save_error = Some(err);
    }
    for event in session.take_events() {
        match event {
            GameEvent::NewHighScore(_) => view.new_record = true,
            GameEvent::GameRestarted => view.new_record = false,
            _ => {}
        }
    }
}

/// Timer ticks and key presses are handled strictly one after the other, in
/// the order they arrive.
fn run(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    session: &mut Session<FileHighScoreStore>,
    tick: Duration,
) -> Result<View> {
    let mut view = View::default();
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|frame| render(frame, session.state(), &view))?;

        let timeout = tick.checked_sub(last_tick.elapsed()).unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                match key_to_action(key) {
                    Action::Quit => break,
                    Action::Game(input) => apply(session, input, &mut view),
                    Action::None => {}
                }
            }
        }

        let elapsed = last_tick.elapsed();
        if elapsed >= tick {
            last_tick = Instant::now();
            apply(session, Input::Tick(elapsed), &mut view);
        }
    }

    Ok(view)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let store = match args.highscore_file {
        Some(path) => FileHighScoreStore::new(path),
        None => FileHighScoreStore::at_default_location()
            .unwrap_or_else(|_| FileHighScoreStore::new(LOCAL_HIGH_SCORE_FILE)),
    };
    let pieces: Box<dyn PieceSource> = match args.seed {
        Some(seed) => Box::new(RandomPieces::seeded(seed)),
        None => Box::new(RandomPieces::new()),
    };
    let mut session = Session::new(store, pieces);
    let tick = Duration::from_millis(args.tick_ms.max(1));

    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run(&mut terminal, &mut session, tick);

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    if let Some(err) = result?.save_error {
        eprintln!(
            "could not save high score to {}: {err}",
            session.store().path().display()
        );
    }

    Ok(())
}
