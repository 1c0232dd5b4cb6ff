//! Configuration loading and credential/root folder resolution
//!
//! Values are resolved with the priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//!
//! There is no compiled-in fallback for the API key or the library root: a
//! tagging run must not start against a guessed folder.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable holding the AcoustID API key
pub const ACOUSTID_API_KEY_ENV: &str = "ACOUSTID_API_KEY";

/// Environment variable holding the music library root
pub const ROOT_FOLDER_ENV: &str = "ROOT_FOLDER";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Music library root to scan
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// AcoustID application API key
    #[serde(default)]
    pub acoustid_api_key: Option<String>,

    /// Explicit path to the Chromaprint `fpcalc` tool
    #[serde(default)]
    pub fpcalc_path: Option<PathBuf>,

    /// Audio file extensions considered by the scanner (without dot)
    #[serde(default = "default_audio_extensions")]
    pub audio_extensions: Vec<String>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Request pacing and retry timings (optional)
    #[serde(default)]
    pub pacing: PacingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            acoustid_api_key: None,
            fpcalc_path: None,
            audio_extensions: default_audio_extensions(),
            logging: LoggingConfig::default(),
            pacing: PacingConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path, in addition to stderr (optional)
    #[serde(default = "default_log_file")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Timings used to respect upstream rate limits and to ride out file locks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    /// Delay after every successful fingerprint lookup, raised to 1200 if lower
    #[serde(default = "default_lookup_interval_ms")]
    pub lookup_interval_ms: u64,

    /// Delay after a failed fingerprint lookup
    #[serde(default = "default_failure_backoff_ms")]
    pub failure_backoff_ms: u64,

    /// Delay before moving on after a recording fetch network error
    #[serde(default = "default_fetch_retry_delay_ms")]
    pub fetch_retry_delay_ms: u64,

    /// Attempts per file move before the final attempt
    #[serde(default = "default_move_retry_attempts")]
    pub move_retry_attempts: u32,

    /// Delay between file move attempts
    #[serde(default = "default_move_retry_delay_ms")]
    pub move_retry_delay_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            lookup_interval_ms: default_lookup_interval_ms(),
            failure_backoff_ms: default_failure_backoff_ms(),
            fetch_retry_delay_ms: default_fetch_retry_delay_ms(),
            move_retry_attempts: default_move_retry_attempts(),
            move_retry_delay_ms: default_move_retry_delay_ms(),
        }
    }
}

fn default_audio_extensions() -> Vec<String> {
    vec!["mp3".to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> Option<PathBuf> {
    Some(PathBuf::from("logs").join("metadata_fix.log"))
}

fn default_lookup_interval_ms() -> u64 {
    1200
}

fn default_failure_backoff_ms() -> u64 {
    1000
}

fn default_fetch_retry_delay_ms() -> u64 {
    3000
}

fn default_move_retry_attempts() -> u32 {
    5
}

fn default_move_retry_delay_ms() -> u64 {
    500
}

/// TOML configuration together with the file it came from
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: TomlConfig,
    /// `None` when no config file was found and defaults are in use
    pub source: Option<PathBuf>,
}

/// Default configuration file path: `<config dir>/mdfix/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("mdfix").join("config.toml"))
}

/// Load the TOML configuration
///
/// An explicitly requested file must exist. When no file is requested and the
/// default location has none, built-in defaults are returned.
pub fn load_toml_config(explicit_path: Option<&Path>) -> Result<LoadedConfig> {
    let path = match explicit_path {
        Some(path) => {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            path.to_path_buf()
        }
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => {
                return Ok(LoadedConfig {
                    config: TomlConfig::default(),
                    source: None,
                })
            }
        },
    };

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
    let config = parse_toml_config(&content)?;

    Ok(LoadedConfig {
        config,
        source: Some(path),
    })
}

/// Parse TOML configuration text
pub fn parse_toml_config(content: &str) -> Result<TomlConfig> {
    toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}

/// Resolve the AcoustID API key
///
/// **Priority:** CLI → ENV → TOML
pub fn resolve_acoustid_api_key(cli_key: Option<&str>, toml_config: &TomlConfig) -> Result<String> {
    let env_key = std::env::var(ACOUSTID_API_KEY_ENV).ok();
    let toml_key = toml_config.acoustid_api_key.as_deref();

    let candidates = [
        ("command line", cli_key),
        ("environment", env_key.as_deref()),
        ("TOML", toml_key),
    ];

    let sources: Vec<&str> = candidates
        .iter()
        .filter(|(_, key)| key.is_some_and(is_valid_key))
        .map(|(source, _)| *source)
        .collect();

    if sources.len() > 1 {
        warn!(
            "AcoustID API key found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    for (source, key) in candidates {
        if let Some(key) = key.filter(|k| is_valid_key(k)) {
            info!("AcoustID API key loaded from {}", source);
            return Ok(key.trim().to_string());
        }
    }

    Err(Error::Config(format!(
        "AcoustID API key not configured. Please configure using one of:\n\
         1. Command line: --api-key your-key-here\n\
         2. Environment: {}=your-key-here (a .env file is honoured)\n\
         3. TOML config: acoustid_api_key = \"your-key\"\n\
         \n\
         Obtain API key at: https://acoustid.org/new-application",
        ACOUSTID_API_KEY_ENV
    )))
}

/// Resolve the music library root
///
/// **Priority:** CLI → ENV → TOML. The folder must exist and be a directory.
pub fn resolve_root_folder(cli_path: Option<&Path>, toml_config: &TomlConfig) -> Result<PathBuf> {
    let root = if let Some(path) = cli_path {
        path.to_path_buf()
    } else if let Some(path) = std::env::var_os(ROOT_FOLDER_ENV).filter(|v| !v.is_empty()) {
        PathBuf::from(path)
    } else if let Some(path) = &toml_config.root_folder {
        path.clone()
    } else {
        return Err(Error::Config(format!(
            "Library root not configured. Pass it as an argument, set {} or add root_folder to the TOML config",
            ROOT_FOLDER_ENV
        )));
    };

    validate_root_folder(&root)?;
    Ok(root)
}

/// Check that a library root exists and is a directory
pub fn validate_root_folder(root: &Path) -> Result<()> {
    if !root.exists() {
        return Err(Error::Config(format!("Folder not found: {}", root.display())));
    }
    if !root.is_dir() {
        return Err(Error::Config(format!("Not a directory: {}", root.display())));
    }
    Ok(())
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
