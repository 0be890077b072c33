//! App: terminal init, main loop, tick timer and key handling.

use crate::game::{GameEvent, GameState, Step};
use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use crate::ui::TrimFade;
use crate::{Args, ConfigError, GameConfig};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};

/// Redraw at roughly 60 FPS between ticks.
const FRAME_DURATION: Duration = Duration::from_millis(16);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Playing,
    GameOver,
}

/// Raw mode and the alternate screen, undone on drop so every exit path
/// (including a failed setup) hands the terminal back.
struct TerminalGuard {
    alternate_screen: bool,
}

impl TerminalGuard {
    fn enter() -> std::io::Result<Self> {
        crossterm::terminal::enable_raw_mode()?;
        let mut guard = Self {
            alternate_screen: false,
        };
        crossterm::execute!(std::io::stdout(), crossterm::terminal::EnterAlternateScreen)?;
        guard.alternate_screen = true;
        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if self.alternate_screen {
            let _ = crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen);
        }
        if let Err(e) = crossterm::terminal::disable_raw_mode() {
            log::warn!("could not leave raw mode: {e}");
        }
    }
}

pub struct App {
    theme: Theme,
    no_animation: bool,
    state: GameState,
    screen: Screen,
    paused: bool,
    last_tick: Instant,
    tick_interval: Duration,
    trim: TrimFade,
    /// Best score this session; not persisted.
    best_score: u32,
    new_best: bool,
}

impl App {
    pub fn new(args: &Args, config: &GameConfig, theme: Theme) -> Result<Self, ConfigError> {
        let state = GameState::new(config)?;
        Ok(Self {
            theme,
            no_animation: args.no_animation,
            state,
            screen: Screen::Playing,
            paused: false,
            last_tick: Instant::now(),
            tick_interval: config.tick_interval(),
            trim: TrimFade::default(),
            best_score: 0,
            new_best: false,
        })
    }

    fn reset_game(&mut self) {
        self.state.restart();
        self.screen = Screen::Playing;
        self.paused = false;
        self.last_tick = Instant::now();
        self.trim.clear();
        self.new_best = false;
    }

    /// Feed one event to the game and react to what it did.
    fn dispatch(&mut self, event: GameEvent) {
        let step = self.state.handle(event);
        if let Step::Stacked(report) = &step {
            if !self.no_animation && !report.trimmed.is_empty() {
                self.trim.start(report.row, &report.trimmed);
            }
        }
        if step.outcome().is_some() {
            // Ticking stops here: run_loop only ticks on the Playing screen.
            self.screen = Screen::GameOver;
            let score = self.state.score.value();
            if score > self.best_score {
                log::info!("new session best {score} (was {})", self.best_score);
                self.best_score = score;
                self.new_best = true;
            }
        }
    }

    /// Returns true when the player asked to quit.
    fn handle_action(&mut self, action: Action) -> bool {
        match (self.screen, action) {
            (_, Action::Quit) => return true,
            (_, Action::Restart) => self.reset_game(),
            (Screen::Playing, Action::Pause) => {
                self.paused = !self.paused;
                if !self.paused {
                    self.last_tick = Instant::now();
                }
            }
            (Screen::Playing, Action::Stack) if !self.paused => self.dispatch(GameEvent::Stack),
            _ => {}
        }
        false
    }

    pub fn run(&mut self) -> Result<()> {
        let guard = TerminalGuard::enter()?;
        let mut terminal =
            DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(std::io::stdout()))?;
        terminal.hide_cursor()?;

        let result = self.run_loop(&mut terminal);

        let _ = terminal.show_cursor();
        drop(guard);
        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        self.last_tick = Instant::now();
        loop {
            let now = Instant::now();
            terminal.draw(|f| {
                crate::ui::draw(
                    f,
                    self.screen,
                    &self.state,
                    &self.theme,
                    self.paused,
                    self.best_score,
                    self.new_best,
                    &mut self.trim,
                    now,
                );
            })?;

            if self.trim.is_done() {
                self.trim.clear();
            }

            let timeout = FRAME_DURATION.saturating_sub(now.elapsed());

            // Keys are handled before the tick of the same frame, each to completion.
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }
                        if self.handle_action(key_to_action(key)) {
                            return Ok(());
                        }
                    }
                }
            }

            if self.screen == Screen::Playing
                && !self.paused
                && self.last_tick.elapsed() >= self.tick_interval
            {
                self.last_tick = Instant::now();
                self.dispatch(GameEvent::Tick);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn new_app(extra: &[&str]) -> App {
        let args = Args::try_parse_from(std::iter::once("stackertui").chain(extra.iter().copied()))
            .unwrap();
        let config = GameConfig::from_args(&args);
        App::new(&args, &config, Theme::default()).unwrap()
    }

    #[test]
    fn test_new_rejects_bad_config() {
        let args = Args::try_parse_from(["stackertui", "--bar-size", "0"]).unwrap();
        let config = GameConfig::from_args(&args);
        assert!(matches!(
            App::new(&args, &config, Theme::default()),
            Err(ConfigError::ZeroBarSize)
        ));
    }

    #[test]
    fn test_win_switches_to_game_over_and_records_best() {
        let mut app = new_app(&["--rows", "2"]);
        app.handle_action(Action::Stack);
        assert_eq!(app.screen, Screen::Playing);
        app.handle_action(Action::Stack);
        assert_eq!(app.screen, Screen::GameOver);
        assert_eq!(app.best_score, 6);
        assert!(app.new_best);

        // Further stacks after the end change nothing.
        app.handle_action(Action::Stack);
        assert_eq!(app.state.score.value(), 6);
    }

    #[test]
    fn test_restart_keeps_session_best() {
        let mut app = new_app(&["--rows", "2"]);
        app.handle_action(Action::Stack);
        app.handle_action(Action::Stack);
        app.handle_action(Action::Restart);
        assert_eq!(app.screen, Screen::Playing);
        assert_eq!(app.state.score.value(), 0);
        assert_eq!(app.best_score, 6);
        assert!(!app.new_best);
    }

    #[test]
    fn test_pause_blocks_stacking() {
        let mut app = new_app(&[]);
        app.handle_action(Action::Pause);
        app.handle_action(Action::Stack);
        assert_eq!(app.state.stacks, 0);
        app.handle_action(Action::Pause);
        app.handle_action(Action::Stack);
        assert_eq!(app.state.stacks, 1);
    }

    #[test]
    fn test_trim_starts_fade_unless_disabled() {
        let mut app = new_app(&[]);
        app.handle_action(Action::Stack);
        app.dispatch(GameEvent::Tick);
        app.handle_action(Action::Stack);
        assert!(app.trim.is_active());

        let mut app = new_app(&["--no-animation"]);
        app.handle_action(Action::Stack);
        app.dispatch(GameEvent::Tick);
        app.handle_action(Action::Stack);
        assert!(!app.trim.is_active());
    }

    #[test]
    fn test_terminal_guard_restores_after_failed_setup() {
        // Setup that stopped before the alternate screen: dropping must only
        // turn raw mode off, which is a no-op when it was never turned on.
        let guard = TerminalGuard {
            alternate_screen: false,
        };
        drop(guard);
        assert!(!crossterm::terminal::is_raw_mode_enabled().unwrap_or(false));
    }

    #[test]
    fn test_quit_from_any_screen() {
        let mut app = new_app(&[]);
        assert!(app.handle_action(Action::Quit));
        app.screen = Screen::GameOver;
        assert!(app.handle_action(Action::Quit));
    }
}
