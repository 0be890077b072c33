//! Layout and drawing: playfield, sidebar, pause and game-over overlays, trim fade.

use crate::app::Screen;
use crate::game::{GameState, Outcome};
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Gauge, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Each grid cell is drawn two terminal columns wide so it looks square.
const CELL_WIDTH: u16 = 2;
const CELL_HEIGHT: u16 = 1;
const SIDEBAR_WIDTH: u16 = 24;

/// Duration of the fade applied to trimmed cells (TachyonFX).
const TRIM_FADE_MS: u32 = 400;

/// Grid extent in terminal cells, saturating at `u16::MAX`.
fn span(cells: usize, cell: u16) -> u16 {
    u16::try_from(cells)
        .unwrap_or(u16::MAX)
        .saturating_mul(cell)
}

/// Playfield size in terminal cells (border + grid) for given grid dimensions.
fn playfield_outer_size(width: usize, rows: usize) -> (u16, u16) {
    (
        span(width, CELL_WIDTH).saturating_add(2),
        span(rows, CELL_HEIGHT).saturating_add(2),
    )
}

/// First grid row on screen when only `visible` rows fit. The bar's row stays in
/// view with up to a third of the view showing the rows beneath it.
fn first_visible_row(rows: usize, visible: usize, bar_row: usize) -> usize {
    if visible == 0 || rows <= visible {
        return 0;
    }
    let below = (visible / 3).max(1).min(visible - 1);
    (bar_row + 1 + below)
        .saturating_sub(visible)
        .min(rows - visible)
}

/// Cells cut off by the most recent stack while they fade out.
#[derive(Default)]
pub struct TrimFade {
    /// (row, column) of every trimmed cell.
    cells: Vec<(usize, usize)>,
    effect: Option<Effect>,
    last_process: Option<Instant>,
}

impl TrimFade {
    pub fn start(&mut self, row: usize, columns: &[usize]) {
        self.cells = columns.iter().map(|&x| (row, x)).collect();
        self.effect = None;
        self.last_process = None;
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.effect = None;
        self.last_process = None;
    }

    pub fn is_active(&self) -> bool {
        !self.cells.is_empty()
    }

    pub fn is_done(&self) -> bool {
        self.effect.as_ref().is_some_and(Effect::done)
    }

    fn contains(&self, row: usize, column: usize) -> bool {
        self.cells.contains(&(row, column))
    }
}

/// Draw the current screen. Playing shows the board (with optional pause overlay);
/// GameOver keeps the final board visible under a result popup.
pub fn draw(
    frame: &mut Frame,
    screen: Screen,
    state: &GameState,
    theme: &Theme,
    paused: bool,
    best: u32,
    new_best: bool,
    trim: &mut TrimFade,
    now: Instant,
) {
    let area = frame.area();
    let (board, top) = draw_game(frame, state, theme, best, trim, area);
    if trim.is_active() {
        apply_trim_effect(frame, theme, board, top, trim, now);
    }
    match screen {
        Screen::Playing => {
            if paused {
                draw_pause_overlay(frame, theme, area);
            }
        }
        Screen::GameOver => draw_game_over(frame, state, theme, best, new_best, area),
    }
}

/// Create or update the trim fade and process it for this frame.
fn apply_trim_effect(
    frame: &mut Frame,
    theme: &Theme,
    board: Rect,
    top: usize,
    trim: &mut TrimFade,
    now: Instant,
) {
    let delta = trim
        .last_process
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    trim.last_process = Some(now);

    if trim.effect.is_none() {
        let positions = trim_buffer_positions(board, top, &trim.cells);
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            positions.contains(&(pos.x, pos.y))
        }));
        let effect = fx::fade_to(theme.bg, theme.bg, (TRIM_FADE_MS, Interpolation::Linear))
            .with_filter(filter)
            .with_area(board);
        trim.effect = Some(effect);
    }

    if let Some(effect) = trim.effect.as_mut() {
        frame.render_effect(effect, board, TfxDuration::from_millis(delta_ms));
    }
}

/// Buffer (x, y) positions covered by the given grid cells, with grid row `top`
/// drawn on the first board line. Cells scrolled out of view are skipped.
fn trim_buffer_positions(
    board: Rect,
    top: usize,
    cells: &[(usize, usize)],
) -> HashSet<(u16, u16)> {
    let mut set = HashSet::new();
    for &(row, column) in cells {
        let Some(row) = row.checked_sub(top) else {
            continue;
        };
        let x0 = board.x.saturating_add(span(column, CELL_WIDTH));
        let y0 = board.y.saturating_add(span(row, CELL_HEIGHT));
        for bx in x0..x0.saturating_add(CELL_WIDTH).min(board.right()) {
            for by in y0..y0.saturating_add(CELL_HEIGHT).min(board.bottom()) {
                set.insert((bx, by));
            }
        }
    }
    set
}

/// Draw playfield + sidebar centered in `area`. Returns the board rect (grid only,
/// no border) and the grid row drawn on its first line.
fn draw_game(
    frame: &mut Frame,
    state: &GameState,
    theme: &Theme,
    best: u32,
    trim: &TrimFade,
    area: Rect,
) -> (Rect, usize) {
    let (pw, ph) = playfield_outer_size(state.grid.width(), state.grid.height());
    let total_w = pw.saturating_add(SIDEBAR_WIDTH);
    let total_h = ph.max(SIDEBAR_HEIGHT);

    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_h),
            Constraint::Fill(1),
        ])
        .split(horiz[1]);
    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(pw), Constraint::Length(SIDEBAR_WIDTH)])
        .split(vert[1]);

    let playfield_area = Rect {
        height: ph.min(inner[0].height),
        ..inner[0]
    };
    let view = draw_playfield(frame, state, theme, trim, playfield_area);
    draw_sidebar(frame, state, theme, best, inner[1]);
    view
}

fn draw_playfield(
    frame: &mut Frame,
    state: &GameState,
    theme: &Theme,
    trim: &TrimFade,
    area: Rect,
) -> (Rect, usize) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(" Stackertui ", theme.title));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());

    let board = Rect {
        x: inner.x,
        y: inner.y,
        width: span(state.grid.width(), CELL_WIDTH).min(inner.width),
        height: span(state.grid.height(), CELL_HEIGHT).min(inner.height),
    };
    let visible = usize::from(board.height / CELL_HEIGHT);
    let top = first_visible_row(state.grid.height(), visible, state.bar.row);

    let buf = frame.buffer_mut();
    for (line, (y, row)) in state.grid.rows().iter().enumerate().skip(top).enumerate() {
        let active = state.is_running() && y == state.bar.row;
        let ry = board.y.saturating_add(span(line, CELL_HEIGHT));
        if ry >= board.bottom() {
            break;
        }
        for (x, cell) in row.cells().enumerate() {
            let rx = board.x.saturating_add(span(x, CELL_WIDTH));
            if rx.saturating_add(CELL_WIDTH) > board.right() {
                break;
            }
            let (symbol, fg) = if trim.contains(y, x) {
                ("██", theme.trimmed)
            } else if cell.is_filled() {
                ("██", if active { theme.bar } else { theme.tower })
            } else if active {
                (" ·", theme.inactive_fg)
            } else {
                ("  ", theme.bg)
            };
            buf.set_string(rx, ry, symbol, Style::default().fg(fg).bg(theme.bg));
        }
    }
    (board, top)
}

/// Score (4 lines + border) + tower (3 lines + border) + keys (4 lines + border), with gaps.
const SIDEBAR_HEIGHT: u16 = 6 + 1 + 5 + 1 + 6;

fn draw_sidebar(frame: &mut Frame, state: &GameState, theme: &Theme, best: u32, area: Rect) {
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let border_style = Style::default().fg(theme.div_line).bg(theme.bg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6), // Score + best
            Constraint::Length(1),
            Constraint::Length(5), // Tower height + bar
            Constraint::Length(1),
            Constraint::Length(6), // Keys
        ])
        .split(area);

    let score_block = Block::default().borders(Borders::ALL).border_style(border_style);
    let score_inner = score_block.inner(chunks[0]);
    score_block.render(chunks[0], frame.buffer_mut());
    let score_lines = vec![
        Line::from(Span::styled("Score", title_style)),
        Line::from(Span::styled(
            state.score.padded(),
            fg_style.add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled("Best", title_style)),
        Line::from(Span::styled(format!("{best:05}"), fg_style)),
    ];
    Paragraph::new(Text::from(score_lines)).render(score_inner, frame.buffer_mut());

    let tower_block = Block::default().borders(Borders::ALL).border_style(border_style);
    let tower_inner = tower_block.inner(chunks[2]);
    tower_block.render(chunks[2], frame.buffer_mut());
    let tower_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(tower_inner);
    let height = state.grid.height();
    Paragraph::new(Line::from(vec![
        Span::styled("Height: ", title_style),
        Span::styled(format!("{}/{}", state.stacks, height), fg_style),
    ]))
    .render(tower_layout[0], frame.buffer_mut());
    let ratio = if height > 0 {
        (state.stacks as f64 / height as f64).min(1.0)
    } else {
        0.0
    };
    Gauge::default()
        .ratio(ratio)
        .label("")
        .gauge_style(Style::default().fg(theme.tower).bg(theme.bg))
        .render(tower_layout[1], frame.buffer_mut());
    Paragraph::new(Line::from(vec![
        Span::styled("Bar: ", title_style),
        Span::styled(state.bar.size.to_string(), fg_style),
    ]))
    .render(tower_layout[2], frame.buffer_mut());

    let keys_block = Block::default().borders(Borders::ALL).border_style(border_style);
    let keys_inner = keys_block.inner(chunks[4]);
    keys_block.render(chunks[4], frame.buffer_mut());
    let key = |k: &'static str, what: &'static str| {
        Line::from(vec![
            Span::styled(k, Style::default().fg(theme.bar)),
            Span::styled(what, fg_style),
        ])
    };
    Paragraph::new(Text::from(vec![
        key("Space ", "Stack"),
        key("P     ", "Pause"),
        key("R     ", "Restart"),
        key("Q     ", "Quit"),
    ]))
    .render(keys_inner, frame.buffer_mut());
}

fn centered_popup(area: Rect, w: u16, h: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(w) / 2,
        y: area.y + area.height.saturating_sub(h) / 2,
        width: w.min(area.width),
        height: h.min(area.height),
    }
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup = centered_popup(area, 28, 6);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " P — Resume    Q — Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
    );
    Clear.render(popup, frame.buffer_mut());
    p.render(popup, frame.buffer_mut());
}

fn draw_game_over(
    frame: &mut Frame,
    state: &GameState,
    theme: &Theme,
    best: u32,
    new_best: bool,
    area: Rect,
) {
    let popup = centered_popup(area, 32, 11);
    let (title, badge) = match state.outcome() {
        Some(Outcome::Victory) => (" YOU WON ", Style::default().fg(Color::Black).bg(Color::Green)),
        _ => (" GAME OVER ", Style::default().fg(Color::White).bg(Color::Red)),
    };
    let mut lines: Vec<Line> = vec![
        Line::from(""),
        Line::from(Span::styled(title, badge.add_modifier(Modifier::BOLD))),
        Line::from(""),
        Line::from(Span::styled(
            format!(" Score: {} ", state.score.padded()),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(Span::styled(
            format!(" Best: {best:05} "),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(Span::styled(
            format!(" Height: {}/{} ", state.stacks, state.grid.height()),
            Style::default().fg(theme.main_fg),
        )),
    ];
    if new_best {
        lines.push(Line::from(Span::styled(
            " New record! ",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        " R — Play again    Q — Quit ",
        Style::default().fg(theme.main_fg),
    )));
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
            .title(Span::styled(" Stackertui ", theme.title)),
    );
    Clear.render(popup, frame.buffer_mut());
    p.render(popup, frame.buffer_mut());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GameConfig, MAX_ROWS, MAX_WIDTH};
    use crate::game::GameEvent;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn render(screen: Screen, state: &GameState, paused: bool) -> String {
        render_sized(screen, state, paused, 60, 24)
    }

    fn render_sized(screen: Screen, state: &GameState, paused: bool, w: u16, h: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(w, h)).unwrap();
        let theme = Theme::default();
        let mut trim = TrimFade::default();
        terminal
            .draw(|f| draw(f, screen, state, &theme, paused, 7, false, &mut trim, Instant::now()))
            .unwrap();
        let buffer = terminal.backend().buffer();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_playfield_size() {
        assert_eq!(playfield_outer_size(6, 8), (14, 10));
    }

    #[test]
    fn test_playfield_size_saturates() {
        assert_eq!(playfield_outer_size(33_000, 2), (u16::MAX, 4));
        assert_eq!(playfield_outer_size(2, 70_000), (6, u16::MAX));
    }

    #[test]
    fn test_widest_grid_draws_on_small_terminal() {
        let oversized = GameConfig {
            width: 33_000,
            rows: 2,
            ..GameConfig::default()
        };
        assert!(GameState::new(&oversized).is_err());

        let config = GameConfig {
            width: MAX_WIDTH,
            rows: MAX_ROWS,
            ..GameConfig::default()
        };
        let mut state = GameState::new(&config).unwrap();
        state.handle(GameEvent::Stack);
        let screen = render_sized(Screen::Playing, &state, false, 20, 6);
        assert_eq!(screen.lines().count(), 6);
    }

    #[test]
    fn test_first_visible_row_follows_bar() {
        // Everything fits.
        assert_eq!(first_visible_row(8, 20, 7), 0);
        // Bar on the bottom row: view pinned to the bottom.
        assert_eq!(first_visible_row(40, 22, 39), 18);
        // Bar mid-tower: seven rows of support stay visible beneath it.
        assert_eq!(first_visible_row(40, 22, 30), 16);
        // Bar near the top: view pinned to the top.
        assert_eq!(first_visible_row(40, 22, 3), 0);
        assert_eq!(first_visible_row(40, 1, 12), 12);
    }

    #[test]
    fn test_tall_grid_keeps_bar_on_screen() {
        let config = GameConfig {
            rows: MAX_ROWS,
            ..GameConfig::default()
        };
        let mut state = GameState::new(&config).unwrap();
        assert!(render(Screen::Playing, &state, false).contains("██████"));

        // Climb a few rows; the bar and the stack below it stay in view.
        for _ in 0..5 {
            state.handle(GameEvent::Stack);
        }
        assert_eq!(state.bar.row, MAX_ROWS - 6);
        let screen = render_sized(Screen::Playing, &state, false, 60, 12);
        let bar_lines = screen.lines().filter(|l| l.contains("██████")).count();
        assert!(bar_lines >= 2, "bar and support rows hidden:\n{screen}");
    }

    #[test]
    fn test_sidebar_shows_padded_score() {
        let mut state = GameState::new(&GameConfig::default()).unwrap();
        state.handle(GameEvent::Stack);
        let screen = render(Screen::Playing, &state, false);
        assert!(screen.contains("00003"));
        assert!(screen.contains("00007"));
        assert!(screen.contains("██████"));
    }

    #[test]
    fn test_pause_overlay() {
        let state = GameState::new(&GameConfig::default()).unwrap();
        assert!(render(Screen::Playing, &state, true).contains("Paused"));
    }

    #[test]
    fn test_game_over_text_depends_on_outcome() {
        let config = GameConfig {
            rows: 1,
            ..GameConfig::default()
        };
        let mut state = GameState::new(&config).unwrap();
        state.handle(GameEvent::Stack);
        let screen = render(Screen::GameOver, &state, false);
        assert!(screen.contains("YOU WON"));

        let config = GameConfig {
            bar_size: 1,
            ..GameConfig::default()
        };
        let mut state = GameState::new(&config).unwrap();
        state.handle(GameEvent::Stack);
        state.handle(GameEvent::Tick);
        state.handle(GameEvent::Stack);
        let screen = render(Screen::GameOver, &state, false);
        assert!(screen.contains("GAME OVER"));
    }

    #[test]
    fn test_trim_positions_cover_double_width_cells() {
        let board = Rect::new(1, 1, 12, 8);
        let set = trim_buffer_positions(board, 0, &[(2, 0), (2, 5)]);
        let expected: HashSet<(u16, u16)> =
            [(1, 3), (2, 3), (11, 3), (12, 3)].into_iter().collect();
        assert_eq!(set, expected);
    }

    #[test]
    fn test_trim_positions_follow_scrolled_view() {
        let board = Rect::new(1, 1, 12, 8);
        let set = trim_buffer_positions(board, 10, &[(12, 1), (4, 1)]);
        let expected: HashSet<(u16, u16)> = [(3, 3), (4, 3)].into_iter().collect();
        assert_eq!(set, expected);
    }
}
