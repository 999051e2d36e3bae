//! Run configuration.
//!
//! Values come from an optional TOML file with environment overrides on
//! top; `main` loads a `.env` through dotenv first, so unattended runs
//! keep their paths next to the unit file. A missing config file is not
//! an error; the shipped defaults describe a standard deployment.
//!
//! The process environment is passed into the override step as a lookup
//! function, so the precedence logic stays deterministic under test.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::ingest::madrid::DEFAULT_FEED_URL;
use crate::model::MAGNITUDE_NO2;

/// Config file looked for when none is named on the command line.
pub const DEFAULT_CONFIG_PATH: &str = "aqmon.toml";

/// Everything a daily run needs to know.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding the date-stamped snapshot records.
    pub data_dir: PathBuf,
    /// File the resolved scene number is published to.
    pub scene_path: PathBuf,
    /// Hourly feed endpoint.
    pub feed_url: String,
    /// Magnitude code of the pollutant channel the detector reads.
    pub pollutant: u8,
    /// Optional TOML file replacing the built-in zone registry.
    pub zones_file: Option<PathBuf>,
    /// Optional log file appended to by every run.
    pub log_file: Option<String>,
    /// Optional saved feed body to replay instead of fetching live.
    pub replay_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            data_dir: PathBuf::from("data/pollution"),
            scene_path: PathBuf::from("data/scene.json"),
            feed_url: DEFAULT_FEED_URL.to_string(),
            pollutant: MAGNITUDE_NO2,
            zones_file: None,
            log_file: None,
            replay_file: None,
        }
    }
}

/// Loads configuration from `path` and the process environment.
pub fn load(path: &Path) -> Result<AppConfig, Box<dyn std::error::Error>> {
    load_with(path, |key| std::env::var(key).ok())
}

/// Same as [`load`], with the environment supplied as a lookup.
///
/// Precedence, lowest to highest: shipped defaults, the TOML file, then
/// `AQMON_*` variables. A file that does not exist falls back to defaults
/// in the same single read that would have loaded it.
pub fn load_with<F>(path: &Path, get: F) -> Result<AppConfig, Box<dyn std::error::Error>>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str(&content)
            .map_err(|e| format!("Failed to parse config {}: {}", path.display(), e))?,
        Err(e) if e.kind() == ErrorKind::NotFound => AppConfig::default(),
        Err(e) => {
            return Err(format!("Failed to read config {}: {}", path.display(), e).into());
        }
    };
    apply_overrides(&mut config, get)?;
    Ok(config)
}

fn apply_overrides<F>(config: &mut AppConfig, get: F) -> Result<(), Box<dyn std::error::Error>>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(dir) = get("AQMON_DATA_DIR") {
        config.data_dir = PathBuf::from(dir);
    }
    if let Some(path) = get("AQMON_SCENE_PATH") {
        config.scene_path = PathBuf::from(path);
    }
    if let Some(url) = get("AQMON_FEED_URL") {
        config.feed_url = url;
    }
    if let Some(code) = get("AQMON_POLLUTANT") {
        config.pollutant = code
            .trim()
            .parse()
            .map_err(|_| format!("AQMON_POLLUTANT must be a magnitude code, got '{}'", code))?;
    }
    if let Some(path) = get("AQMON_ZONES_FILE") {
        config.zones_file = Some(PathBuf::from(path));
    }
    if let Some(path) = get("AQMON_LOG_FILE") {
        config.log_file = Some(path);
    }
    if let Some(path) = get("AQMON_REPLAY_FILE") {
        config.replay_file = Some(PathBuf::from(path));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
