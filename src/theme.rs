//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// One Dark palette and UI colours loaded from a theme file.
#[derive(Debug, Clone)]
pub struct Theme {
    /// The moving bar.
    pub bar: Color,
    /// Rows already stacked.
    pub tower: Color,
    /// Cells cut off by the last stack, before they fade.
    pub trimmed: Color,
    /// Playfield background.
    pub bg: Color,
    /// Grid / border.
    pub div_line: Color,
    /// Text (score, height).
    pub main_fg: Color,
    /// Highlight / titles.
    pub title: Color,
    /// Lane markers on the active row.
    pub inactive_fg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::onedark_default()
    }
}

const ONEDARK_CYAN: Color = Color::Rgb(0x56, 0xB6, 0xC2);
const ONEDARK_GREEN: Color = Color::Rgb(0x98, 0xC3, 0x79);
const ONEDARK_RED: Color = Color::Rgb(0xE0, 0x6C, 0x75);
const ONEDARK_BG: Color = Color::Rgb(0x31, 0x35, 0x3F);
const ONEDARK_DIV: Color = Color::Rgb(0x3F, 0x44, 0x4F);
const ONEDARK_FG: Color = Color::Rgb(0xAB, 0xB2, 0xBF);
const ONEDARK_YELLOW: Color = Color::Rgb(0xE5, 0xC0, 0x7B);
const ONEDARK_GREY: Color = Color::Rgb(0x5C, 0x63, 0x70);

impl Theme {
    /// One Dark defaults, matching the values in onedark.theme.
    pub const fn onedark_default() -> Self {
        Self {
            bar: ONEDARK_CYAN,         // hi_fg
            tower: ONEDARK_GREEN,      // mem_box
            trimmed: ONEDARK_RED,      // cpu_end
            bg: ONEDARK_BG,            // meter_bg
            div_line: ONEDARK_DIV,     // div_line
            main_fg: ONEDARK_FG,       // main_fg
            title: ONEDARK_YELLOW,     // title
            inactive_fg: ONEDARK_GREY, // inactive_fg
        }
    }

    /// Load theme from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// Falls back to One Dark defaults if path is None or the file is missing.
    /// `palette` then overrides the bar/tower/trim colours.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let mut theme = match path {
            Some(p) if p.exists() => {
                let s = std::fs::read_to_string(p)?;
                Self::from_map(&parse_theme_file(&s))
            }
            _ => Self::onedark_default(),
        };
        theme.apply_palette(palette);
        Ok(theme)
    }

    /// Override play colours for high-contrast or colorblind.
    pub fn apply_palette(&mut self, palette: crate::Palette) {
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => {
                self.bar = Color::Rgb(0x00, 0xFF, 0xFF);
                self.tower = Color::Rgb(0xFF, 0xFF, 0x00);
                self.trimmed = Color::Rgb(0xFF, 0x00, 0x00);
            }
            crate::Palette::Colorblind => {
                // Blue/orange pair stays distinct for red-green deficiencies
                self.bar = Color::Rgb(0x00, 0x77, 0xBB);
                self.tower = Color::Rgb(0xEE, 0x77, 0x33);
                self.trimmed = Color::Rgb(0xEE, 0x33, 0x77);
            }
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |keys: &[&str], fallback: Color| {
            keys.iter()
                .find_map(|k| map.get(*k).and_then(|v| parse_hex(v).ok()))
                .unwrap_or(fallback)
        };
        Self {
            bar: get(&["hi_fg", "proc_misc"], ONEDARK_CYAN),
            tower: get(&["mem_box", "cpu_start"], ONEDARK_GREEN),
            trimmed: get(&["cpu_end", "temp_end"], ONEDARK_RED),
            bg: get(&["meter_bg"], ONEDARK_BG),
            div_line: get(&["div_line"], ONEDARK_DIV),
            main_fg: get(&["main_fg"], ONEDARK_FG),
            title: get(&["title"], ONEDARK_YELLOW),
            inactive_fg: get(&["inactive_fg"], ONEDARK_GREY),
        }
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    s.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let rest = line.strip_prefix("theme[")?;
            let (key, rest) = rest.split_once(']')?;
            let (_, value) = rest.split_once('=')?;
            let value = value.trim().trim_matches('"').trim_matches('\'');
            (!value.is_empty()).then(|| (key.trim().to_string(), value.to_string()))
        })
        .collect()
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(s.to_string());
    let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| invalid());
    if !s.is_ascii() {
        return Err(invalid());
    }
    let (r, g, b) = match s.len() {
        6 => (channel(&s[0..2])?, channel(&s[2..4])?, channel(&s[4..6])?),
        3 => (
            channel(&s[0..1])? * 17,
            channel(&s[1..2])? * 17,
            channel(&s[2..3])? * 17,
        ),
        _ => return Err(invalid()),
    };
    Ok(Color::Rgb(r, g, b))
}
