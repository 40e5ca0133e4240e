use std::fmt;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::WorkspaceResult;
use super::atomic::write_bytes_atomic;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Csv,
    Json,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "ndjson",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        })
    }
}

/// Defaults for CLI runs, stored in `datagen.toml`. Flags win over them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatagenSettings {
    pub threads: usize,
    pub batch_size: usize,
    pub format: OutputFormat,
    pub runs_dir: PathBuf,
    pub log_level: String,
    pub seed: Option<u64>,
}

impl Default for DatagenSettings {
    fn default() -> Self {
        Self {
            threads: std::thread::available_parallelism()
                .map(|threads| threads.get())
                .unwrap_or(1),
            batch_size: 1000,
            format: OutputFormat::Csv,
            runs_dir: PathBuf::from("runs"),
            log_level: "info".to_string(),
            seed: None,
        }
    }
}

pub fn load_or_create_settings(path: &Path) -> WorkspaceResult<DatagenSettings> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let settings: DatagenSettings = toml::from_str(&content)?;
        return Ok(settings);
    }

    let settings = DatagenSettings::default();
    save_settings(path, &settings)?;
    Ok(settings)
}

pub fn save_settings(path: &Path, settings: &DatagenSettings) -> WorkspaceResult<()> {
    let encoded = toml::to_string_pretty(settings)?;
    write_bytes_atomic(path, encoded.as_bytes())
}
