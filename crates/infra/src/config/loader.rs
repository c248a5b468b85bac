//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If the required variables are missing, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `TIDES_ENV`: Deployment environment (production/staging/development/test)
//! - `TIDES_DB_PATH`: SQLite database file path
//! - `TIDES_DB_POOL_SIZE`: Connection pool size (optional, default 8)
//! - `TIDES_OBJECT_STORE_ROOT`: Object-store root directory (optional)
//! - `TIDES_BIND_ADDR`: HTTP bind address (optional, default 127.0.0.1:8787)
//! - `TIDES_REQUEST_TIMEOUT`: Request timeout in seconds (optional)
//! - `TIDES_API_KEY`: Expected client API key (optional; any non-empty key
//!   is accepted when unset)
//! - `TIDES_MODEL_ENDPOINT`: Model capability endpoint (optional)
//! - `TIDES_MODEL_API_KEY`: Model capability API key (optional)
//! - `TIDES_MODEL_TIMEOUT`: Model request timeout in seconds (optional)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./tides.json` or `./tides.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. `../../config.json` or `../../config.toml` (grandparent directory)
//! 5. Relative to executable location

use std::path::{Path, PathBuf};

use tides_domain::{
    AuthConfig, Config, Environment, ModelConfig, Result, ServerConfig, StorageConfig, TidesError,
};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If the required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `TidesError::Config` if configuration cannot be loaded from
/// either source.
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// `TIDES_ENV` and `TIDES_DB_PATH` are required; every other variable falls
/// back to its default from [`Config::default`].
///
/// # Errors
/// Returns `TidesError::Config` if required variables are missing or have
/// invalid values.
pub fn load_from_env() -> Result<Config> {
    let environment = env_var("TIDES_ENV").and_then(|s| {
        Environment::parse(&s)
            .ok_or_else(|| TidesError::Config(format!("Invalid environment: {s}")))
    })?;
    let sqlite_path = env_var("TIDES_DB_PATH")?;

    let defaults = Config::default();
    let pool_size = env_parse("TIDES_DB_POOL_SIZE", defaults.storage.pool_size)?;
    let object_store_root = std::env::var("TIDES_OBJECT_STORE_ROOT")
        .unwrap_or(defaults.storage.object_store_root);

    let bind_addr = std::env::var("TIDES_BIND_ADDR").unwrap_or(defaults.server.bind_addr);
    let request_timeout_seconds =
        env_parse("TIDES_REQUEST_TIMEOUT", defaults.server.request_timeout_seconds)?;

    let api_key = std::env::var("TIDES_API_KEY").ok();

    let model_endpoint = std::env::var("TIDES_MODEL_ENDPOINT").unwrap_or(defaults.model.endpoint);
    let model_api_key = std::env::var("TIDES_MODEL_API_KEY").ok();
    let model_timeout_seconds =
        env_parse("TIDES_MODEL_TIMEOUT", defaults.model.timeout_seconds)?;

    Ok(Config {
        server: ServerConfig { bind_addr, request_timeout_seconds },
        storage: StorageConfig { environment, sqlite_path, pool_size, object_store_root },
        auth: AuthConfig { api_key },
        model: ModelConfig {
            endpoint: model_endpoint,
            api_key: model_api_key,
            timeout_seconds: model_timeout_seconds,
        },
    })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `TidesError::Config` if no config file is found or the file
/// fails to parse.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(TidesError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            TidesError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| TidesError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content, format detected by extension.
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| TidesError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| TidesError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(TidesError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// Searches the current working directory, up to two parent levels, then
/// the executable's directory. Returns the first config file found.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidate_set(&cwd));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(candidate_set(exe_dir));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn candidate_set(dir: &Path) -> Vec<PathBuf> {
    vec![
        dir.join("config.json"),
        dir.join("config.toml"),
        dir.join("tides.json"),
        dir.join("tides.toml"),
        dir.join("../config.json"),
        dir.join("../config.toml"),
        dir.join("../../config.json"),
        dir.join("../../config.toml"),
    ]
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| TidesError::Config(format!("Missing required environment variable: {key}")))
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value
            .parse::<T>()
            .map_err(|e| TidesError::Config(format!("Invalid value for {key}: {e}"))),
        Err(_) => Ok(default),
    }
}
