//! Harmonizer Configuration - directory layout, worker pool and output format
//!
//! Each struct implements `Default` with the built-in values from
//! [`defaults`](super::defaults), so a missing or partial config file behaves
//! exactly like the documented defaults.

use super::defaults;
use crate::types::DEFAULT_NULL_VALUE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "LAS_HARMONIZER_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "las_harmonizer.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a batch run.
///
/// Load with `HarmonizerConfig::load()` which searches:
/// 1. `$LAS_HARMONIZER_CONFIG` env var
/// 2. `./las_harmonizer.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarmonizerConfig {
    /// Input, output and ledger locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Worker pool and file discovery
    #[serde(default)]
    pub processing: ProcessingConfig,

    /// Output document formatting
    #[serde(default)]
    pub output: OutputConfig,

    /// Reference table file-name prefixes
    #[serde(default)]
    pub tables: TablesConfig,
}

impl HarmonizerConfig {
    /// Load configuration using the standard search order:
    /// 1. `$LAS_HARMONIZER_CONFIG` environment variable
    /// 2. `./las_harmonizer.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        // 1. Check env var
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded config from {}", CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        // 2. Check ./las_harmonizer.toml
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        // 3. Defaults
        info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;

        // Unknown keys only warn; they never break an existing config
        for w in super::validation::validate_unknown_keys(&contents) {
            warn!("{}", w);
        }

        let config: Self = toml::from_str(&contents)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Number of workers to run, resolving `0` to the available CPU count.
    pub fn effective_concurrency(&self) -> usize {
        match self.processing.concurrency {
            0 => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            n => n,
        }
    }

    /// Validate the whole config, collecting every problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        if self.paths.source_dir == self.paths.destination_dir {
            errors.push(format!(
                "paths.destination_dir must differ from paths.source_dir ({})",
                self.paths.source_dir.display()
            ));
        }
        if self.paths.ledger_path.as_os_str().is_empty() {
            errors.push("paths.ledger_path must not be empty".to_string());
        }

        if self.processing.concurrency > defaults::MAX_CONCURRENCY {
            errors.push(format!(
                "processing.concurrency ({}) must be at most {}",
                self.processing.concurrency,
                defaults::MAX_CONCURRENCY
            ));
        }
        Self::check_extension(&self.processing.archive_extension, "processing.archive_extension", &mut errors);
        Self::check_extension(&self.processing.log_extension, "processing.log_extension", &mut errors);
        if self.processing.file_timeout_secs == 0 {
            errors.push("processing.file_timeout_secs must be greater than 0".to_string());
        }

        if !(1..=10).contains(&self.output.curve_precision) {
            errors.push(format!(
                "output.curve_precision ({}) must be between 1 and 10",
                self.output.curve_precision
            ));
        }
        if self.output.depth_precision > 6 {
            errors.push(format!(
                "output.depth_precision ({}) must be at most 6",
                self.output.depth_precision
            ));
        }
        if !self.output.default_null_value.is_finite() {
            errors.push("output.default_null_value must be a finite number".to_string());
        }

        let prefixes = [
            ("tables.wells_prefix", &self.tables.wells_prefix),
            ("tables.logs_prefix", &self.tables.logs_prefix),
            ("tables.tops_prefix", &self.tables.tops_prefix),
            ("tables.index_prefix", &self.tables.index_prefix),
        ];
        for (i, (name, prefix)) in prefixes.iter().enumerate() {
            if prefix.trim().is_empty() {
                errors.push(format!("{} must not be empty", name));
            }
            for (other_name, other) in &prefixes[i + 1..] {
                if prefix == other {
                    errors.push(format!("{} and {} must differ ('{}')", name, other_name, prefix));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_extension(ext: &str, name: &str, errors: &mut Vec<String>) {
        if ext.is_empty() {
            errors.push(format!("{} must not be empty", name));
        } else if ext.contains('.') {
            errors.push(format!("{} ('{}') must not contain a dot", name, ext));
        }
    }
}

// ============================================================================
// Config Error
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Paths
// ============================================================================

/// Directory layout. Each root holds one sub-directory per field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Per-field directories of zipped raw logs
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,

    /// Per-field directories of reference CSV tables
    #[serde(default = "default_tables_dir")]
    pub tables_dir: PathBuf,

    /// Per-field output directories
    #[serde(default = "default_destination_dir")]
    pub destination_dir: PathBuf,

    /// JSON error ledger
    #[serde(default = "default_ledger_path")]
    pub ledger_path: PathBuf,
}

fn default_source_dir() -> PathBuf {
    PathBuf::from(defaults::SOURCE_DIR)
}
fn default_tables_dir() -> PathBuf {
    PathBuf::from(defaults::TABLES_DIR)
}
fn default_destination_dir() -> PathBuf {
    PathBuf::from(defaults::DESTINATION_DIR)
}
fn default_ledger_path() -> PathBuf {
    PathBuf::from(defaults::LEDGER_PATH)
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source_dir: default_source_dir(),
            tables_dir: default_tables_dir(),
            destination_dir: default_destination_dir(),
            ledger_path: default_ledger_path(),
        }
    }
}

// ============================================================================
// Processing
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Worker pool size; 0 means one worker per available CPU
    #[serde(default)]
    pub concurrency: usize,

    /// Extension of archives to extract
    #[serde(default = "default_archive_extension")]
    pub archive_extension: String,

    /// Extension of well-log files to process
    #[serde(default = "default_log_extension")]
    pub log_extension: String,

    /// Seconds allowed per file; a group gets this times its file count
    #[serde(default = "default_file_timeout_secs")]
    pub file_timeout_secs: u64,
}

impl ProcessingConfig {
    pub fn file_timeout(&self) -> Duration {
        Duration::from_secs(self.file_timeout_secs)
    }
}

fn default_archive_extension() -> String {
    defaults::ARCHIVE_EXTENSION.to_string()
}
fn default_log_extension() -> String {
    defaults::LOG_EXTENSION.to_string()
}
fn default_file_timeout_secs() -> u64 {
    defaults::FILE_TIMEOUT_SECS
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            concurrency: 0,
            archive_extension: default_archive_extension(),
            log_extension: default_log_extension(),
            file_timeout_secs: default_file_timeout_secs(),
        }
    }
}

// ============================================================================
// Output
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Decimal places for curve values
    #[serde(default = "default_curve_precision")]
    pub curve_precision: usize,

    /// Decimal places for the depth column
    #[serde(default = "default_depth_precision")]
    pub depth_precision: usize,

    /// NULL sentinel assigned when a source document declares none
    #[serde(default = "default_null_value")]
    pub default_null_value: f64,
}

fn default_curve_precision() -> usize {
    defaults::CURVE_PRECISION
}
fn default_depth_precision() -> usize {
    defaults::DEPTH_PRECISION
}
fn default_null_value() -> f64 {
    DEFAULT_NULL_VALUE
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            curve_precision: default_curve_precision(),
            depth_precision: default_depth_precision(),
            default_null_value: default_null_value(),
        }
    }
}

// ============================================================================
// Reference tables
// ============================================================================

/// File-name prefixes identifying the four reference tables of a field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TablesConfig {
    #[serde(default = "default_wells_prefix")]
    pub wells_prefix: String,

    #[serde(default = "default_logs_prefix")]
    pub logs_prefix: String,

    #[serde(default = "default_tops_prefix")]
    pub tops_prefix: String,

    /// File-name to identity index table
    #[serde(default = "default_index_prefix")]
    pub index_prefix: String,
}

fn default_wells_prefix() -> String {
    defaults::WELLS_PREFIX.to_string()
}
fn default_logs_prefix() -> String {
    defaults::LOGS_PREFIX.to_string()
}
fn default_tops_prefix() -> String {
    defaults::TOPS_PREFIX.to_string()
}
fn default_index_prefix() -> String {
    defaults::INDEX_PREFIX.to_string()
}

impl Default for TablesConfig {
    fn default() -> Self {
        Self {
            wells_prefix: default_wells_prefix(),
            logs_prefix: default_logs_prefix(),
            tops_prefix: default_tops_prefix(),
            index_prefix: default_index_prefix(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = HarmonizerConfig::default();
        assert!(config.validate().is_ok(), "Default config must always validate");
    }

    #[test]
    fn test_empty_toml_produces_defaults() {
        let config: HarmonizerConfig = toml::from_str("").expect("empty TOML should parse");
        assert_eq!(config.output.curve_precision, 4);
        assert_eq!(config.output.depth_precision, 2);
        assert_eq!(config.output.default_null_value, -999.25);
        assert_eq!(config.tables.wells_prefix, "Wells_");
        assert_eq!(config.processing.log_extension, "las");
    }

    #[test]
    fn test_partial_toml_override() {
        let toml_str = r#"
[paths]
source_dir = "/mnt/kgs/zips"

[processing]
concurrency = 3
"#;
        let config: HarmonizerConfig = toml::from_str(toml_str).expect("partial TOML should parse");
        // Overridden values
        assert_eq!(config.paths.source_dir, PathBuf::from("/mnt/kgs/zips"));
        assert_eq!(config.effective_concurrency(), 3);
        // Non-overridden values retain defaults
        assert_eq!(config.paths.tables_dir, PathBuf::from(defaults::TABLES_DIR));
        assert_eq!(config.processing.archive_extension, "zip");
    }

    #[test]
    fn test_zero_concurrency_uses_cpu_count() {
        let config = HarmonizerConfig::default();
        assert!(config.effective_concurrency() >= 1);
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let mut config = HarmonizerConfig::default();
        config.paths.destination_dir = config.paths.source_dir.clone();
        config.output.curve_precision = 0;
        config.processing.log_extension = ".las".to_string();
        config.tables.logs_prefix = config.tables.wells_prefix.clone();

        match config.validate() {
            Err(ConfigError::Validation(errors)) => {
                assert_eq!(errors.len(), 4, "{:?}", errors);
                assert!(errors.iter().any(|e| e.contains("destination_dir")));
                assert!(errors.iter().any(|e| e.contains("curve_precision")));
                assert!(errors.iter().any(|e| e.contains("log_extension")));
                assert!(errors.iter().any(|e| e.contains("logs_prefix")));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_file_timeout_is_rejected() {
        let mut config = HarmonizerConfig::default();
        assert_eq!(config.processing.file_timeout(), Duration::from_secs(defaults::FILE_TIMEOUT_SECS));
        config.processing.file_timeout_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("processing.file_timeout_secs"));
    }

    #[test]
    fn test_load_from_file_rejects_invalid() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("las_harmonizer.toml");
        std::fs::write(&path, "[output]\ncurve_precision = 42\n").unwrap();
        assert!(matches!(
            HarmonizerConfig::load_from_file(&path),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_toml_roundtrip_keeps_values() {
        let mut config = HarmonizerConfig::default();
        config.processing.concurrency = 8;
        let text = config.to_toml().unwrap();
        let back: HarmonizerConfig = toml::from_str(&text).unwrap();
        assert_eq!(back.processing.concurrency, 8);
    }
}
