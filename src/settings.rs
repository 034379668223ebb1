use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::dsl::interpreter::{InterpreterOptions, DEFAULT_MAX_GOTO_VISITS};
use crate::project::{read_json, write_json, ExportFormat, ProjectError};

// ── App settings ─────────────────────────────────────────────────

/// User defaults for running scripts, stored in the config directory.
///
/// Missing fields fall back to their defaults, so older settings files keep loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AppSettings {
    pub version: u32,
    /// Side length of a fresh canvas.
    #[serde(default = "default_canvas_size")]
    pub canvas_size: usize,
    /// Color name painted on a fresh canvas.
    #[serde(default = "default_background")]
    pub background: String,
    /// Theme file or theme name under `themes/`. None = built-in palette only.
    #[serde(default)]
    pub theme: Option<PathBuf>,
    #[serde(default = "default_max_goto_visits")]
    pub max_goto_visits: u32,
    #[serde(default)]
    pub export_format: ExportFormat,
}

const SETTINGS_VERSION: u32 = 1;

fn default_canvas_size() -> usize {
    32
}

fn default_background() -> String {
    "white".to_string()
}

fn default_max_goto_visits() -> u32 {
    DEFAULT_MAX_GOTO_VISITS
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            canvas_size: default_canvas_size(),
            background: default_background(),
            theme: None,
            max_goto_visits: default_max_goto_visits(),
            export_format: ExportFormat::default(),
        }
    }
}

impl AppSettings {
    pub fn interpreter_options(&self) -> InterpreterOptions {
        InterpreterOptions {
            max_goto_visits: self.max_goto_visits,
        }
    }

    /// Reject values no run could use.
    pub fn validate(&self) -> Result<(), ProjectError> {
        if self.version > SETTINGS_VERSION {
            return Err(ProjectError::InvalidProject(format!(
                "Settings version {} is newer than supported version {SETTINGS_VERSION}",
                self.version
            )));
        }
        if self.canvas_size == 0 {
            return Err(ProjectError::InvalidProject("canvas_size must be at least 1".into()));
        }
        if self.max_goto_visits == 0 {
            return Err(ProjectError::InvalidProject("max_goto_visits must be at least 1".into()));
        }
        Ok(())
    }
}

/// Load settings from the app config directory. Returns None if no settings
/// file exists or it cannot be read.
pub fn load_settings(app_config_dir: &Path) -> Option<AppSettings> {
    let path = crate::paths::settings_path(app_config_dir);
    if !path.exists() {
        return None;
    }
    read_json::<AppSettings>(&path).ok()
}

/// Save settings to the app config directory.
pub fn save_settings(app_config_dir: &Path, settings: &AppSettings) -> Result<(), ProjectError> {
    settings.validate()?;
    std::fs::create_dir_all(app_config_dir)?;
    write_json(&crate::paths::settings_path(app_config_dir), settings)
}
