//! Persisted overlay settings.
//!
//! Stored as a JSON document next to the rule directory. Unknown fields are
//! ignored and missing ones take their defaults, so older files keep loading.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::highlight::HighlightOptions;
use crate::ruleset::{RuleDirectories, RuleSetEntry};

/// Frame thickness bounds, in pixels.
pub const MIN_FRAME_THICKNESS: u32 = 1;
pub const MAX_FRAME_THICKNESS: u32 = 20;

/// Alpha of the dimmed frame drawn under the hovered item's tooltip.
pub const DIMMED_ALPHA: u8 = 45;

/// RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const RED: Color = Color::rgba(255, 0, 0, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Color { r, g, b, a }
    }

    pub fn with_alpha(self, a: u8) -> Self {
        Color { a, ..self }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Master switch; nothing is drawn while off.
    pub enable: bool,
    /// Also highlight outside towns and hideouts.
    pub run_outside_town: bool,
    pub enable_for_stash: bool,
    pub frame_color: Color,
    pub frame_thickness: u32,
    /// Folder name resolved next to the default rule directory.
    pub custom_config_directory: Option<String>,
    pub rules: Vec<RuleSetEntry>,
    /// Ad-hoc expression tested against the hovered item. Never saved.
    #[serde(skip)]
    pub filter_test: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            enable: false,
            run_outside_town: true,
            enable_for_stash: true,
            frame_color: Color::RED,
            frame_thickness: MIN_FRAME_THICKNESS,
            custom_config_directory: None,
            rules: Vec::new(),
            filter_test: None,
        }
    }
}

impl Settings {
    /// Load settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Settings> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::info!("No settings at {}, using defaults", path.display());
                return Ok(Settings::default());
            }
            Err(e) => return Err(e.into()),
        };
        let mut settings: Settings = serde_json::from_str(&text)?;
        settings.frame_thickness = clamp_thickness(settings.frame_thickness);
        Ok(settings)
    }

    /// Write settings as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn set_frame_thickness(&mut self, thickness: u32) {
        self.frame_thickness = clamp_thickness(thickness);
    }

    pub fn highlight_options(&self) -> HighlightOptions {
        HighlightOptions {
            enabled: self.enable,
            frame_color: self.frame_color,
            frame_thickness: clamp_thickness(self.frame_thickness),
            run_outside_town: self.run_outside_town,
            enable_for_stash: self.enable_for_stash,
            filter_test: self.filter_test.clone().filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn rule_directories(&self, default: &Path) -> RuleDirectories {
        RuleDirectories::new(default).with_custom(self.custom_config_directory.clone())
    }
}

fn clamp_thickness(t: u32) -> u32 {
    t.clamp(MIN_FRAME_THICKNESS, MAX_FRAME_THICKNESS)
}
