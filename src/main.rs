//! Stackertui — tower-stacking arcade game in the terminal.

mod app;
mod game;
mod grid;
mod input;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, ValueEnum};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Rules of one game, taken from the CLI. Validated before a game is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameConfig {
    pub width: usize,
    pub rows: usize,
    pub bar_size: usize,
    pub tick_ms: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            width: 6,
            rows: 8,
            bar_size: 3,
            tick_ms: 600,
        }
    }
}

/// Widest track the board can lay out.
pub const MAX_WIDTH: usize = 32;
/// Tallest tower; taller boards scroll with the bar.
pub const MAX_ROWS: usize = 100;

/// Settings under which no game can be played.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("track width must be at least 1 column")]
    ZeroWidth,
    #[error("the tower needs at least 1 row")]
    ZeroRows,
    #[error("bar size must be at least 1")]
    ZeroBarSize,
    #[error("bar size {bar_size} leaves no room to move on a {width}-column track")]
    BarTooWide { bar_size: usize, width: usize },
    #[error("track width {0} is more than {MAX_WIDTH} columns")]
    TooWide(usize),
    #[error("tower height {0} is more than {MAX_ROWS} rows")]
    TooTall(usize),
    #[error("tick interval must be greater than 0 ms")]
    ZeroTick,
}

impl GameConfig {
    pub fn from_args(args: &Args) -> Self {
        Self {
            width: args.width,
            rows: args.rows,
            bar_size: args.bar_size,
            tick_ms: args.tick_ms,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 {
            return Err(ConfigError::ZeroWidth);
        }
        if self.rows == 0 {
            return Err(ConfigError::ZeroRows);
        }
        if self.width > MAX_WIDTH {
            return Err(ConfigError::TooWide(self.width));
        }
        if self.rows > MAX_ROWS {
            return Err(ConfigError::TooTall(self.rows));
        }
        if self.bar_size == 0 {
            return Err(ConfigError::ZeroBarSize);
        }
        // A bar touching both walls could never sweep.
        if self.bar_size >= self.width {
            return Err(ConfigError::BarTooWide {
                bar_size: self.bar_size,
                width: self.width,
            });
        }
        if self.tick_ms == 0 {
            return Err(ConfigError::ZeroTick);
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_else(|e| {
        log::warn!("theme not loaded, using defaults: {e}");
        theme::Theme::default()
    });
    let config = GameConfig::from_args(&args);
    let mut app = App::new(&args, &config, theme).context("invalid game settings")?;
    app.run()?;
    Ok(())
}

/// Route `log` output to a file; the terminal belongs to the UI. Without a file, logging stays off.
fn init_logging(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = std::fs::File::create(path)
        .with_context(|| format!("cannot create log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

/// Tower-stacking arcade game in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "stackertui",
    version,
    about = "Tower-stacking arcade game in the terminal. Freeze the sweeping bar on top of the tower; overhangs are cut off.",
    long_about = "Stackertui is a terminal take on the arcade stacker.\n\n\
        A bar sweeps left and right across the track. Press stack to freeze it on top of the \
        tower. Any cells hanging over empty space are cut off and the bar shrinks. Reach the top \
        row to win; lose the whole bar and it is game over.\n\n\
        CONTROLS:\n  Space/Enter/Up/k  Stack    P  Pause    R  Play again    Q / Esc  Quit\n\n\
        Use --theme to load a btop-style theme (e.g. onedark.theme)."
)]
pub struct Args {
    /// Track width in columns (at most 32).
    #[arg(long, default_value = "6", value_name = "COLS")]
    pub width: usize,

    /// Tower height in rows (at most 100); stacking on the top row wins.
    #[arg(long, default_value = "8", value_name = "ROWS")]
    pub rows: usize,

    /// Initial bar width in cells (must be narrower than the track).
    #[arg(short, long, default_value = "3", value_name = "N")]
    pub bar_size: usize,

    /// Time between bar steps in milliseconds.
    #[arg(long, default_value = "600", value_name = "MS")]
    pub tick_ms: u64,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<std::path::PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Disable the fade-out of trimmed cells.
    #[arg(long)]
    pub no_animation: bool,

    /// Write log output to this file (filter with RUST_LOG, default info).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<std::path::PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}
