//! Game state: accumulation grid, sweeping bar, stack resolution, score.

use crate::grid::{Cell, Grid};
use crate::{ConfigError, GameConfig};
use std::fmt;

/// Which way the bar moves on the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    Left,
    #[default]
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Running,
    Won,
    Lost,
}

/// How a finished game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Victory,
    Defeat,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Victory => "victory",
            Self::Defeat => "defeat",
        })
    }
}

impl Outcome {
    pub fn is_victory(self) -> bool {
        self == Self::Victory
    }

    pub fn status(self) -> Status {
        match self {
            Self::Victory => Status::Won,
            Self::Defeat => Status::Lost,
        }
    }
}

/// The moving bar: the row it sweeps, its heading and its remaining width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bar {
    pub row: usize,
    pub direction: Direction,
    pub size: usize,
}

/// Running total of bar widths at each successful stack. Only ever grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Score(u32);

impl Score {
    pub fn add(&mut self, amount: usize) {
        self.0 = self.0.saturating_add(amount as u32);
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// Score as shown on the sidebar, e.g. `00042`.
    pub fn padded(self) -> String {
        format!("{:05}", self.0)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Move the bar one cell along its row, bouncing off whichever edge it reaches.
/// The edge is checked after the shift so the bar turns while touching the wall.
pub fn advance(grid: &mut Grid, bar: &mut Bar) {
    let Some(row) = grid.row_mut(bar.row) else {
        return;
    };
    match bar.direction {
        Direction::Right => {
            row.shift_right();
            if row.is_at_right_edge() {
                bar.direction = Direction::Left;
            }
        }
        Direction::Left => {
            row.shift_left();
            if row.is_at_left_edge() {
                bar.direction = Direction::Right;
            }
        }
    }
}

/// What a single stack did to the tower.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackReport {
    /// Row the bar was frozen on.
    pub row: usize,
    /// Columns cleared because nothing was beneath them.
    pub trimmed: Vec<usize>,
    pub bar_size: usize,
    pub score: u32,
    /// Set only by the stack that ended the game.
    pub outcome: Option<Outcome>,
}

/// Freeze the bar where it is. Overhanging cells are cut away and the bar shrinks
/// by the same amount; a surviving bar scores its width and either wins (top row)
/// or respawns flush left on the row above. The bottom row has nothing beneath it
/// and always holds.
pub fn resolve_stack(grid: &mut Grid, bar: &mut Bar, score: &mut Score) -> StackReport {
    let row = bar.row;
    let mut trimmed = Vec::new();
    if let Some((active, Some(below))) = grid.row_with_support(row) {
        debug_assert_eq!(active.filled_count(), bar.size);
        for x in 0..active.width() {
            if active.is_filled(x) && !below.is_filled(x) {
                active.set(x, Cell::Empty);
                trimmed.push(x);
            }
        }
    }
    bar.size = bar.size.saturating_sub(trimmed.len());

    let outcome = if bar.size == 0 {
        Some(Outcome::Defeat)
    } else {
        score.add(bar.size);
        if row == 0 {
            Some(Outcome::Victory)
        } else {
            bar.row = row - 1;
            bar.direction = Direction::Right;
            if let Some(next) = grid.row_mut(bar.row) {
                next.fill_prefix(bar.size);
            }
            None
        }
    };

    StackReport {
        row,
        trimmed,
        bar_size: bar.size,
        score: score.value(),
        outcome,
    }
}

/// Everything that can change a running game. Ticks and key presses both arrive here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    Tick,
    Stack,
}

/// Result of handling one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Game already over; nothing changed.
    Ignored,
    Moved,
    Stacked(StackReport),
}

impl Step {
    /// Terminal outcome, present only on the one step that ended the game.
    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            Self::Stacked(report) => report.outcome,
            _ => None,
        }
    }
}

/// A single game: owns the grid, bar, score and status.
#[derive(Debug, Clone)]
pub struct GameState {
    pub grid: Grid,
    pub bar: Bar,
    pub score: Score,
    pub status: Status,
    /// Successful stacks so far.
    pub stacks: u32,
    config: GameConfig,
}

impl GameState {
    pub fn new(config: &GameConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        log::info!(
            "new game: {}x{} track, bar size {}, tick {} ms",
            config.width,
            config.rows,
            config.bar_size,
            config.tick_ms
        );
        Ok(Self::fresh(config.clone()))
    }

    fn fresh(config: GameConfig) -> Self {
        let grid = Grid::new(config.width, config.rows, config.bar_size);
        let bar = Bar {
            row: grid.bottom(),
            direction: Direction::Right,
            size: config.bar_size,
        };
        Self {
            grid,
            bar,
            score: Score::default(),
            status: Status::Running,
            stacks: 0,
            config,
        }
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.status == Status::Running
    }

    pub fn outcome(&self) -> Option<Outcome> {
        match self.status {
            Status::Running => None,
            Status::Won => Some(Outcome::Victory),
            Status::Lost => Some(Outcome::Defeat),
        }
    }

    /// Single entry point for ticks and stacks; events after the game ended are ignored.
    pub fn handle(&mut self, event: GameEvent) -> Step {
        match event {
            GameEvent::Tick => self.tick(),
            GameEvent::Stack => self.on_player_stack(),
        }
    }

    pub fn tick(&mut self) -> Step {
        if !self.is_running() {
            return Step::Ignored;
        }
        advance(&mut self.grid, &mut self.bar);
        Step::Moved
    }

    pub fn on_player_stack(&mut self) -> Step {
        if !self.is_running() {
            return Step::Ignored;
        }
        let report = resolve_stack(&mut self.grid, &mut self.bar, &mut self.score);
        log::debug!(
            "stack on row {}: kept {:?}, trimmed {:?}, bar {}, score {}",
            report.row,
            self.grid.rows()[report.row].filled_columns(),
            report.trimmed,
            report.bar_size,
            report.score
        );
        match report.outcome {
            Some(outcome) => {
                if outcome.is_victory() {
                    self.stacks += 1;
                }
                self.status = outcome.status();
                log::info!("game over: {outcome} with score {}", report.score);
            }
            None => self.stacks += 1,
        }
        Step::Stacked(report)
    }

    /// Throw the current game away and start over with the same configuration.
    pub fn restart(&mut self) {
        log::info!("restart after {} stacks, score {}", self.stacks, self.score);
        *self = Self::fresh(self.config.clone());
    }
}
