//! Report Settings
//! Options for one report run, optionally read from a JSON file.

use crate::charts::ChartSize;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid settings {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Invalid settings: {0}")]
    Invalid(String),
}

/// User settings for a report run. Missing JSON fields take the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    pub output_dir: PathBuf,
    pub charts: bool,
    pub chart_width: u32,
    pub chart_height: u32,
    /// Months after origination at which debt is treated as noncollectable.
    pub noncollectable_after: Option<u32>,
    pub print_summary: bool,
}

impl Default for ReportSettings {
    fn default() -> Self {
        let size = ChartSize::default();
        Self {
            output_dir: PathBuf::from("report"),
            charts: true,
            chart_width: size.width,
            chart_height: size.height,
            noncollectable_after: None,
            print_summary: true,
        }
    }
}

impl ReportSettings {
    pub fn from_json_file(path: &Path) -> Result<Self, SettingsError> {
        let text = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Self = serde_json::from_str(&text).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.chart_width < 200 || self.chart_height < 200 {
            return Err(SettingsError::Invalid(format!(
                "chart size {}x{} is below 200x200",
                self.chart_width, self.chart_height
            )));
        }
        Ok(())
    }

    pub fn chart_size(&self) -> ChartSize {
        ChartSize {
            width: self.chart_width,
            height: self.chart_height,
        }
    }
}
