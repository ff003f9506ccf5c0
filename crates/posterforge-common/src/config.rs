//! Application configuration.
//!
//! Configuration is read from `config.yaml` in the config directory and then
//! overlaid with `config.env.<env>.yaml` when that file exists. The overlay
//! only overrides fields it sets to a non-zero, non-empty value. Every
//! section defaults sensibly, so a nearly empty base file is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::error::{Error, Result};

/// Environment variable selecting the overlay file.
pub const ENV_VAR: &str = "ENV";
/// Environment assumed when [`ENV_VAR`] is unset.
pub const DEFAULT_ENV: &str = "DEV";
/// Base configuration file name.
pub const BASE_FILE: &str = "config.yaml";

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// The environment name from [`ENV_VAR`], defaulting to [`DEFAULT_ENV`].
pub fn current_env() -> String {
    std::env::var(ENV_VAR)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_ENV.to_string())
}

/// Path of the overlay file for `env` inside `dir`.
pub fn overlay_path(dir: &Path, env: &str) -> PathBuf {
    dir.join(format!("config.env.{}.yaml", env.to_lowercase()))
}

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub plex: PlexConfig,
    pub tmdb: TmdbConfig,
    pub performance: PerformanceConfig,
    pub http_client: HttpClientConfig,
    pub logger: LoggerConfig,
    pub processor: ProcessorConfig,
    pub assets: AssetsConfig,
}

impl Config {
    /// Deserialize a `Config` from a YAML string without validating it.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| Error::ConfigInvalid(format!("parse error: {e}")))
    }

    /// Load the base file and the overlay for `env` from `dir`, merge them
    /// and validate the result.
    pub fn load(dir: &Path, env: &str) -> Result<Self> {
        let base_path = dir.join(BASE_FILE);
        let mut merged = read_yaml(&base_path)?;

        let overlay = overlay_path(dir, env);
        if overlay.exists() {
            tracing::debug!("Applying config overlay {}", overlay.display());
            merge_values(&mut merged, read_yaml(&overlay)?);
        }

        let config: Config = serde_yaml::from_value(merged)
            .map_err(|e| Error::ConfigInvalid(format!("{}: {e}", base_path.display())))?;
        config.validate(env)?;
        Ok(config)
    }

    /// [`Config::load`] using the environment named by [`ENV_VAR`].
    pub fn load_from_env(dir: &Path) -> Result<Self> {
        Self::load(dir, &current_env())
    }

    /// Check the merged configuration, reporting every problem at once.
    pub fn validate(&self, env: &str) -> Result<()> {
        let mut problems = Vec::new();

        let level = self.logger.log_level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            problems.push(format!(
                "logger.log_level '{}' is not one of {}",
                self.logger.log_level,
                LOG_LEVELS.join(", ")
            ));
        }
        if env.eq_ignore_ascii_case("PROD") && level == "debug" {
            problems.push("logger.log_level 'debug' is not allowed in PROD".into());
        }

        if self.plex.enabled {
            if self.plex.url.is_empty() {
                problems.push("plex.url is empty".into());
            } else if url::Url::parse(&self.plex.url).is_err() {
                problems.push(format!("plex.url '{}' is not a valid URL", self.plex.url));
            }
            if self.plex.token.is_empty() {
                problems.push("plex.token is empty".into());
            }
        }

        for (i, lib) in self.plex.libraries.iter().enumerate() {
            if lib.name.trim().is_empty() {
                problems.push(format!("plex.libraries[{i}].name is empty"));
            }
            if lib.enabled && lib.path.as_os_str().is_empty() {
                problems.push(format!("plex.libraries[{i}].path is empty"));
            }
            let overlay = &lib.overlay;
            if !(overlay.height > 0.0 && overlay.height < 1.0) {
                problems.push(format!(
                    "plex.libraries[{i}].overlay.height {} must be between 0 and 1",
                    overlay.height
                ));
            }
            if !(0.0..=1.0).contains(&overlay.transparency) {
                problems.push(format!(
                    "plex.libraries[{i}].overlay.transparency {} must be between 0 and 1",
                    overlay.transparency
                ));
            }
        }

        if self.tmdb.enabled && self.tmdb.api_key.is_empty() {
            problems.push("tmdb.api_key is empty".into());
        }

        if self.performance.library_processing_timeout == 0 {
            problems.push("performance.library_processing_timeout must be positive".into());
        }
        if self.processor.library_processor.default_timeout == 0 {
            problems.push("processor.library_processor.default_timeout must be positive".into());
        }
        if self.processor.item_processor.rating_builder.timeout == 0 {
            problems.push(
                "processor.item_processor.rating_builder.timeout must be positive".into(),
            );
        }
        if self.http_client.timeout == 0 {
            problems.push("http_client.timeout must be positive".into());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::ConfigInvalid(problems.join("; ")))
        }
    }

    /// Worker budget for this host.
    pub fn max_threads(&self) -> usize {
        resolve_max_threads(self.performance.max_threads, num_cpus::get())
    }

    pub fn library_processing_timeout(&self) -> Duration {
        Duration::from_secs(self.performance.library_processing_timeout)
    }

    pub fn library_timeout(&self) -> Duration {
        Duration::from_secs(self.processor.library_processor.default_timeout)
    }

    pub fn rating_timeout(&self) -> Duration {
        Duration::from_secs(self.processor.item_processor.rating_builder.timeout)
    }
}

/// `min(configured, cpus - 1)` when configured, else `cpus - 1`; never 0.
pub fn resolve_max_threads(configured: usize, cpus: usize) -> usize {
    let available = cpus.saturating_sub(1).max(1);
    if configured == 0 {
        available
    } else {
        configured.min(available)
    }
}

fn read_yaml(path: &Path) -> Result<Value> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| Error::ConfigInvalid(format!("failed to read {}: {e}", path.display())))?;
    let value: Value = serde_yaml::from_str(&contents)
        .map_err(|e| Error::ConfigInvalid(format!("failed to parse {}: {e}", path.display())))?;
    // An empty file parses as null; treat it as an empty mapping.
    Ok(match value {
        Value::Null => Value::Mapping(Default::default()),
        other => other,
    })
}

/// Deep-merge `overlay` into `base`. Overlay values that are null, zero,
/// `false`, empty strings or empty sequences leave the base untouched.
fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        if !is_unset(&value) {
                            base_map.insert(key, value);
                        }
                    }
                }
            }
        }
        (base, overlay) => {
            if !is_unset(&overlay) {
                *base = overlay;
            }
        }
    }
}

fn is_unset(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Sequence(seq) => seq.is_empty(),
        Value::Mapping(map) => map.is_empty(),
        Value::Tagged(_) => false,
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Plex media server connection and per-library settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlexConfig {
    pub enabled: bool,
    pub url: String,
    pub token: String,
    pub libraries: Vec<LibraryConfig>,
}

/// Per-library user settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    pub name: String,
    pub enabled: bool,
    /// Ask the media server to refresh the library after processing.
    pub refresh: bool,
    /// Filesystem root of this library's media.
    pub path: PathBuf,
    pub filters: LibraryFilters,
    pub overlay: OverlayConfig,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            enabled: true,
            refresh: false,
            path: PathBuf::new(),
            filters: LibraryFilters::default(),
            overlay: OverlayConfig::default(),
        }
    }
}

/// Item filters forwarded to the media server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryFilters {
    pub years: Vec<u32>,
    pub titles: Vec<String>,
    pub genres: Vec<String>,
    /// `last_<N>_<days|months|years>`; anything else disables the filter.
    pub added_at: String,
}

/// Overlay variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayKind {
    /// Black frame around a shrunk poster with the band below it.
    Frame,
    /// Semi-transparent band drawn over the bottom of the poster.
    #[default]
    Bar,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    #[serde(rename = "type")]
    pub kind: OverlayKind,
    /// Band height as a fraction of the poster height.
    pub height: f32,
    /// Band opacity for the `bar` variant, 0 to 1.
    pub transparency: f32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            kind: OverlayKind::Bar,
            height: 0.1,
            transparency: 0.6,
        }
    }
}

/// TMDB rating provider credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TmdbConfig {
    pub enabled: bool,
    pub api_key: String,
    pub language: String,
    pub region: String,
    pub base_url: String,
    pub requests_per_second: u32,
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            language: "en-US".into(),
            region: String::new(),
            base_url: "https://api.themoviedb.org/3".into(),
            requests_per_second: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Worker cap; 0 picks `cpus - 1`.
    pub max_threads: usize,
    /// Run-wide deadline, seconds.
    pub library_processing_timeout: u64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            max_threads: 0,
            library_processing_timeout: 3 * 60 * 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpClientConfig {
    /// Per-request timeout, seconds.
    pub timeout: u64,
    pub max_retries: u32,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: 30,
            max_retries: 3,
        }
    }
}

impl HttpClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub log_level: String,
    pub format: LogFormat,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    pub library_processor: LibraryProcessorConfig,
    pub item_processor: ItemProcessorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryProcessorConfig {
    /// Per-library deadline, seconds.
    pub default_timeout: u64,
}

impl Default for LibraryProcessorConfig {
    fn default() -> Self {
        Self {
            default_timeout: 60 * 60,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemProcessorConfig {
    pub rating_builder: RatingBuilderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingBuilderConfig {
    /// Deadline for one rating-provider call, seconds.
    pub timeout: u64,
}

impl Default for RatingBuilderConfig {
    fn default() -> Self {
        Self { timeout: 30 }
    }
}

/// Static assets used by the compositor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    pub logos_dir: PathBuf,
    /// Font for score text; badges are logo-only without one.
    pub font_path: Option<PathBuf>,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            logos_dir: PathBuf::from("./assets/logos"),
            font_path: None,
        }
    }
}
