//! Centralized path definitions for all data files and directories.
//!
//! This module is the single source of truth for leaf filenames, directory names,
//! and path-building functions. No other module should hard-code these strings.

use std::path::{Path, PathBuf};

// ── Application identity ─────────────────────────────────────────

pub const APP_DIR_NAME: &str = "pixel-walle";

// ── Leaf filenames ───────────────────────────────────────────────

pub const SETTINGS_FILE: &str = "settings.json";

/// Extension of drawing scripts, without the dot.
pub const SCRIPT_EXTENSION: &str = "pw";

pub const THEME_EXTENSION: &str = "json";

// ── Directory names ──────────────────────────────────────────────

pub const THEMES_DIR: &str = "themes";

// ── Config-dir functions (take app_config_dir) ───────────────────

/// Default config directory: `$XDG_CONFIG_HOME/pixel-walle`, falling back to
/// `$HOME/.config/pixel-walle`, then `./.pixel-walle`.
pub fn default_config_dir() -> PathBuf {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(xdg).join(APP_DIR_NAME);
    }
    if let Some(home) = std::env::var_os("HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(home).join(".config").join(APP_DIR_NAME);
    }
    PathBuf::from(format!(".{APP_DIR_NAME}"))
}

pub fn settings_path(app_config_dir: &Path) -> PathBuf {
    app_config_dir.join(SETTINGS_FILE)
}

pub fn themes_dir(app_config_dir: &Path) -> PathBuf {
    app_config_dir.join(THEMES_DIR)
}

/// Resolve a theme reference. An existing file path wins; otherwise the
/// reference is treated as a theme name inside the config dir's `themes/`.
pub fn theme_path(app_config_dir: &Path, reference: &str) -> PathBuf {
    let direct = PathBuf::from(reference);
    if direct.is_file() {
        return direct;
    }
    themes_dir(app_config_dir).join(format!("{reference}.{THEME_EXTENSION}"))
}

// ── Script helpers ───────────────────────────────────────────────

pub fn is_script(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(SCRIPT_EXTENSION))
}
