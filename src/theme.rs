//! Light/dark theming.
//!
//! Both modes share one five-color palette shape. The dark palette comes from
//! a whitespace-separated color string in the config, and the chosen mode is
//! remembered in a small JSON preference file.

use anyhow::{Context, Result};
use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const LIGHT_COLORS: &str = "#fff #000000 #000 #272B2F #fff";

/// Colors for one theme mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    /// Page background
    pub background: Color,
    /// Body text
    pub text: Color,
    /// Titles, borders of the selected widget
    pub primary: Color,
    /// Secondary accents, active scroll indicator
    pub secondary: Color,
    /// Widget panel background
    pub panel: Color,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThemeError {
    #[error("invalid color length in {0:?} (expected 3, 6, or 8 hex chars)")]
    InvalidLength(String),
    #[error("invalid hex character in {0:?}")]
    InvalidHex(String),
    #[error("expected 5 colors, found {0}")]
    WrongColorCount(usize),
}

/// Parse hex color string to Color
/// Supports: #rrggbb, #rgb, rrggbb, rgb, #rrggbbaa (alpha ignored)
pub fn parse_hex_color(s: &str) -> Result<Color, ThemeError> {
    let hex = s.trim().trim_start_matches('#');
    let channel = |range: std::ops::Range<usize>| {
        hex.get(range)
            .and_then(|h| u8::from_str_radix(h, 16).ok())
            .ok_or_else(|| ThemeError::InvalidHex(s.to_string()))
    };

    match hex.len() {
        3 => Ok(Color::Rgb(
            channel(0..1)? * 17,
            channel(1..2)? * 17,
            channel(2..3)? * 17,
        )),
        6 | 8 => Ok(Color::Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
        _ => Err(ThemeError::InvalidLength(s.to_string())),
    }
}

impl Palette {
    /// Parse `"#bg #text #primary #secondary #panel"`.
    pub fn parse(colors: &str) -> Result<Self, ThemeError> {
        let parts: Vec<&str> = colors.split_whitespace().collect();
        if parts.len() != 5 {
            return Err(ThemeError::WrongColorCount(parts.len()));
        }

        Ok(Self {
            background: parse_hex_color(parts[0])?,
            text: parse_hex_color(parts[1])?,
            primary: parse_hex_color(parts[2])?,
            secondary: parse_hex_color(parts[3])?,
            panel: parse_hex_color(parts[4])?,
        })
    }

    pub fn light() -> Self {
        Self {
            background: Color::Rgb(255, 255, 255),
            text: Color::Rgb(0, 0, 0),
            primary: Color::Rgb(0, 0, 0),
            secondary: Color::Rgb(39, 43, 47),
            panel: Color::Rgb(255, 255, 255),
        }
    }

    pub fn dark() -> Self {
        Self {
            background: Color::Rgb(26, 26, 26),
            text: Color::Rgb(245, 245, 245),
            primary: Color::Rgb(255, 255, 255),
            secondary: Color::Rgb(58, 63, 68),
            panel: Color::Rgb(36, 36, 36),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Flag {
    On,
    Off,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PreferenceFile {
    #[serde(rename = "darkMode", skip_serializing_if = "Option::is_none")]
    dark_mode: Option<Flag>,
}

/// The single persisted preference: whether dark mode is on.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("homedash")
            .join("preferences.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `None` when nothing has been stored yet.
    pub fn load_dark_mode(&self) -> Result<Option<bool>> {
        if !self.path.exists() {
            tracing::debug!("No preference file found");
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let prefs: PreferenceFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", self.path.display()))?;

        Ok(prefs.dark_mode.map(|flag| flag == Flag::On))
    }

    pub fn save_dark_mode(&self, dark: bool) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let prefs = PreferenceFile {
            dark_mode: Some(if dark { Flag::On } else { Flag::Off }),
        };
        let content = serde_json::to_string(&prefs)?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }
}

/// Current theme mode plus the palettes for both modes.
#[derive(Debug, Clone)]
pub struct Theme {
    dark: bool,
    light_palette: Palette,
    dark_palette: Palette,
    store: PreferenceStore,
}

impl Theme {
    /// Restore the stored mode. Unreadable or missing preferences mean light.
    pub fn load(dark_colors: &str, store: PreferenceStore) -> Self {
        let dark_palette = Palette::parse(dark_colors).unwrap_or_else(|e| {
            tracing::warn!("Invalid dark palette {:?}: {}, using built-in", dark_colors, e);
            Palette::dark()
        });
        let light_palette = Palette::parse(LIGHT_COLORS).unwrap_or_else(|_| Palette::light());

        let dark = match store.load_dark_mode() {
            Ok(flag) => flag.unwrap_or(false),
            Err(e) => {
                tracing::warn!("Ignoring theme preference: {:#}", e);
                false
            }
        };

        Self {
            dark,
            light_palette,
            dark_palette,
            store,
        }
    }

    pub fn is_dark(&self) -> bool {
        self.dark
    }

    pub fn palette(&self) -> &Palette {
        if self.dark {
            &self.dark_palette
        } else {
            &self.light_palette
        }
    }

    pub fn toggle(&mut self) {
        self.set_dark(!self.dark);
    }

    /// Switch mode and persist it. A failed write only costs persistence.
    pub fn set_dark(&mut self, dark: bool) {
        self.dark = dark;
        if let Err(e) = self.store.save_dark_mode(dark) {
            tracing::warn!("Failed to save theme preference: {:#}", e);
        }
    }

    /// Toggle button glyph: dark mode offers the sun, light mode the moon.
    pub fn toggle_icon(&self) -> &'static str {
        if self.dark {
            "☀"
        } else {
            "☾"
        }
    }

    /// What pressing the toggle will switch to.
    pub fn toggle_hint(&self) -> &'static str {
        if self.dark {
            "Light Mode"
        } else {
            "Dark Mode"
        }
    }
}
