//! Color-name resolution: an optional level theme layered over the built-in palette.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::Color;
use crate::project::{read_json, ProjectError};

/// Maps a color name to a color. Names are matched case-insensitively.
pub trait ColorResolver {
    fn resolve(&self, name: &str) -> Option<Color>;
}

/// A level's color legend, loaded from JSON:
///
/// ```json
/// { "name": "Forest", "colors": { "leaf": { "r": 40, "g": 160, "b": 60, "a": 255 } } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub name: String,
    #[serde(default)]
    pub colors: IndexMap<String, Color>,
}

impl Theme {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            colors: IndexMap::new(),
        }
    }

    pub fn with_color(mut self, name: impl Into<String>, color: Color) -> Self {
        self.colors.insert(name.into(), color);
        self
    }
}

impl ColorResolver for Theme {
    fn resolve(&self, name: &str) -> Option<Color> {
        self.colors
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, &color)| color)
    }
}

/// The fixed built-in palette.
#[derive(Debug, Clone, Copy, Default)]
pub struct Palette;

/// Built-in colors, in legend order.
pub const PALETTE: &[(&str, Color)] = &[
    ("blue", Color::rgb(0, 0, 255)),
    ("darkblue", Color::rgb(0, 0, 128)),
    ("darkred", Color::rgb(128, 0, 0)),
    ("steelblue", Color::rgb(26, 51, 77)),
    ("cyan", Color::rgb(0, 255, 255)),
    ("purple", Color::rgb(128, 0, 128)),
    ("green", Color::rgb(0, 255, 0)),
    ("red", Color::rgb(255, 0, 0)),
    ("yellow", Color::rgb(255, 235, 4)),
    ("orange", Color::rgb(255, 128, 0)),
    ("brown", Color::rgb(153, 77, 26)),
    ("coral", Color::rgb(255, 128, 77)),
    ("burgundy", Color::rgb(102, 0, 26)),
    ("gray", Color::rgb(128, 128, 128)),
    ("black", Color::BLACK),
    ("turquoise", Color::rgb(64, 224, 209)),
    ("lime", Color::rgb(191, 255, 0)),
    ("white", Color::WHITE),
    ("pink", Color::rgb(255, 102, 179)),
    ("transparent", Color::TRANSPARENT),
];

impl ColorResolver for Palette {
    fn resolve(&self, name: &str) -> Option<Color> {
        PALETTE
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|&(_, color)| color)
    }
}

/// Resolve `name` through `theme` first, then the built-in palette.
/// Blank names never resolve.
pub fn resolve_color(name: &str, theme: Option<&dyn ColorResolver>) -> Option<Color> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    theme
        .and_then(|t| t.resolve(name))
        .or_else(|| Palette.resolve(name))
}

/// Canvas background: any name `resolve_color` accepts, or a `#rrggbb[aa]`
/// literal. Scripts themselves only ever see names.
pub fn resolve_background(name: &str, theme: Option<&dyn ColorResolver>) -> Option<Color> {
    resolve_color(name, theme).or_else(|| Color::from_hex(name))
}

/// Every name `resolve_color` accepts under `theme`: theme names first, then
/// palette names the theme does not shadow.
pub fn legend(theme: Option<&Theme>) -> Vec<(String, Color)> {
    let mut out: Vec<(String, Color)> = theme
        .map(|t| t.colors.iter().map(|(k, &v)| (k.clone(), v)).collect())
        .unwrap_or_default();
    for &(name, color) in PALETTE {
        if !out.iter().any(|(k, _)| k.eq_ignore_ascii_case(name)) {
            out.push((name.to_string(), color));
        }
    }
    out
}

pub fn load_theme(path: &Path) -> Result<Theme, ProjectError> {
    let theme: Theme = read_json(path)?;
    if let Some(blank) = theme.colors.keys().find(|k| k.trim().is_empty()) {
        return Err(ProjectError::InvalidProject(format!(
            "theme '{}' has a blank color name {blank:?}",
            theme.name
        )));
    }
    Ok(theme)
}
