use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use exam_core::highlight::RenderMode;
use exam_core::sections::{LISTENING_SECTIONS, READING_SECTIONS, SectionCatalog};
use tracing::debug;

use crate::error::ConfigError;

const DEFAULT_DB_URL: &str = "sqlite://exam.sqlite3";
const DEFAULT_TICK_MILLIS: u64 = 1_000;

/// Runtime settings for exam services.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExamConfig {
    pub db_url: String,
    /// Directory holding `reading.toml` and/or `listening.toml` overrides.
    pub sections_dir: Option<PathBuf>,
    pub tick: Duration,
    pub auto_submit: bool,
    pub render_mode: RenderMode,
}

impl Default for ExamConfig {
    fn default() -> Self {
        Self {
            db_url: DEFAULT_DB_URL.into(),
            sections_dir: None,
            tick: Duration::from_millis(DEFAULT_TICK_MILLIS),
            auto_submit: true,
            render_mode: RenderMode::default(),
        }
    }
}

impl ExamConfig {
    /// Reads `EXAM_*` environment variables, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an unparsable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an unparsable value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = var("EXAM_DB_URL") {
            config.db_url = url;
        }
        config.sections_dir = var("EXAM_SECTIONS_DIR").map(PathBuf::from);

        if let Some(raw) = var("EXAM_TICK_MILLIS") {
            let millis = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|m| *m > 0)
                .ok_or(ConfigError::InvalidNumber {
                    var: "EXAM_TICK_MILLIS",
                    raw: raw.clone(),
                })?;
            config.tick = Duration::from_millis(millis);
        }

        if let Some(raw) = var("EXAM_AUTO_SUBMIT") {
            config.auto_submit = parse_bool(&raw).ok_or(ConfigError::InvalidBool {
                var: "EXAM_AUTO_SUBMIT",
                raw: raw.clone(),
            })?;
        }

        if let Some(raw) = var("EXAM_RENDER_MODE") {
            config.render_mode = raw.parse().map_err(ConfigError::InvalidRenderMode)?;
        }

        Ok(config)
    }

    /// Builds the section catalog, preferring files in `sections_dir` over
    /// the embedded tables. A missing file keeps the embedded one.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an override cannot be read or is invalid.
    pub fn load_catalog(&self) -> Result<SectionCatalog, ConfigError> {
        let Some(dir) = &self.sections_dir else {
            return Ok(SectionCatalog::builtin()?);
        };
        let reading = read_override(dir, "reading.toml")?;
        let listening = read_override(dir, "listening.toml")?;
        Ok(SectionCatalog::from_sources(
            reading.as_deref().unwrap_or(READING_SECTIONS),
            listening.as_deref().unwrap_or(LISTENING_SECTIONS),
        )?)
    }
}

fn read_override(dir: &Path, file: &str) -> Result<Option<String>, ConfigError> {
    let path = dir.join(file);
    match fs::read_to_string(&path) {
        Ok(source) => {
            debug!(path = %path.display(), "using section table override");
            Ok(Some(source))
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ConfigError::ReadSections { path, source }),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
