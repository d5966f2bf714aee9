//! Configuration loader
//!
//! Loads client configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Reads a `.env` file from the working directory (if present) into the
//!    process environment without overriding variables already set
//! 2. Attempts to load from environment variables
//! 3. Only if the subscription key is not set, falls back to loading from
//!    file; other environment errors are returned
//! 4. Probes multiple paths for config files
//! 5. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `MOMO_SUBSCRIPTION_KEY`: Primary subscription key (required)
//! - `MOMO_BASE_URL`: API base URL
//! - `MOMO_ENVIRONMENT`: Target environment (`sandbox` or `production`)
//! - `MOMO_API_USER_ID`: Existing API user id
//! - `MOMO_API_KEY`: Existing API key for `MOMO_API_USER_ID`
//! - `MOMO_CALLBACK_HOST`: Provider callback host for new API users
//! - `MOMO_TIMEOUT_SECS`: HTTP request timeout in seconds
//! - `MOMO_TOKEN_REFRESH_MARGIN_SECS`: Renew tokens this many seconds early
//! - `MOMO_NO_PROXY`: `true` to ignore proxy environment variables
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./momo.json` or `./momo.toml` (current working directory)
//! 2. `./config.json` or `./config.toml` (current working directory)
//! 3. The same names relative to the executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use momo_domain::{ApiKey, MomoConfig, MomoError, Result, TargetEnvironment};

const SUBSCRIPTION_KEY_VAR: &str = "MOMO_SUBSCRIPTION_KEY";
const CONFIG_FILE_NAMES: [&str; 4] = ["momo.json", "momo.toml", "config.json", "config.toml"];

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables (after reading `.env`).
/// Only when the subscription key is not set there does it fall back to a
/// config file; any other environment error is returned as is.
///
/// # Errors
/// Returns `MomoError::Config` if:
/// - An environment variable is set but invalid
/// - No subscription key is set and no config file is found
/// - File format is invalid
/// - A value fails validation
pub fn load() -> Result<MomoConfig> {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "Ignoring unreadable .env file"),
    }

    if env_opt(SUBSCRIPTION_KEY_VAR).is_none() {
        tracing::debug!("{SUBSCRIPTION_KEY_VAR} not set, trying config file");
        return load_from_file(None);
    }

    let config = load_from_env()?;
    tracing::info!("Configuration loaded from environment variables");
    Ok(config)
}

/// Load configuration from environment variables
///
/// Only `MOMO_SUBSCRIPTION_KEY` is required; every other variable falls back
/// to its default when unset or empty.
///
/// # Errors
/// Returns `MomoError::Config` if the subscription key is missing or a value
/// cannot be parsed.
pub fn load_from_env() -> Result<MomoConfig> {
    let mut config = MomoConfig::new(env_var(SUBSCRIPTION_KEY_VAR)?);

    if let Some(base_url) = env_opt("MOMO_BASE_URL") {
        config.base_url = base_url;
    }
    if let Some(environment) = env_opt("MOMO_ENVIRONMENT") {
        config.environment = TargetEnvironment::from_str(&environment)
            .map_err(|e| MomoError::Config(format!("Invalid MOMO_ENVIRONMENT: {e}")))?;
    }
    config.api_user_id = env_opt("MOMO_API_USER_ID");
    config.api_key = env_opt("MOMO_API_KEY").map(ApiKey::new);
    if let Some(callback_host) = env_opt("MOMO_CALLBACK_HOST") {
        config.callback_host = callback_host;
    }
    if let Some(timeout) = env_parse::<u64>("MOMO_TIMEOUT_SECS")? {
        config.timeout_secs = timeout;
    }
    if let Some(margin) = env_parse::<i64>("MOMO_TOKEN_REFRESH_MARGIN_SECS")? {
        config.token_refresh_margin_secs = margin;
    }
    if let Some(no_proxy) = env_parse::<bool>("MOMO_NO_PROXY")? {
        config.no_proxy = no_proxy;
    }

    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Arguments
/// * `path` - Optional path to config file. If `None`, uses
///   [`probe_config_paths`].
///
/// # Errors
/// Returns `MomoError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - Required fields are missing or fail validation
pub fn load_from_file(path: Option<PathBuf>) -> Result<MomoConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(MomoError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            MomoError::Config(
                "No MOMO_SUBSCRIPTION_KEY in the environment and no config file found".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| MomoError::Config(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
///
/// # Errors
/// Returns `MomoError::Config` if format is invalid or parsing fails.
fn parse_config(contents: &str, path: &Path) -> Result<MomoConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| MomoError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| MomoError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(MomoError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe the standard locations for a configuration file
///
/// Searches the current working directory first, then the directory of the
/// running executable.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.push(exe_dir.to_path_buf());
        }
    }

    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

/// Get required environment variable
///
/// # Errors
/// Returns `MomoError::Config` if the variable is not set or empty.
fn env_var(key: &str) -> Result<String> {
    env_opt(key)
        .ok_or_else(|| MomoError::Config(format!("Missing required environment variable: {key}")))
}

/// Optional environment variable; empty values count as unset
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Parse an optional environment variable
///
/// # Errors
/// Returns `MomoError::Config` if the variable is set but does not parse.
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_opt(key)
        .map(|raw| {
            raw.parse::<T>().map_err(|e| MomoError::Config(format!("Invalid {key} '{raw}': {e}")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use once_cell::sync::Lazy;
    use tempfile::NamedTempFile;

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    const ALL_VARS: [&str; 9] = [
        "MOMO_SUBSCRIPTION_KEY",
        "MOMO_BASE_URL",
        "MOMO_ENVIRONMENT",
        "MOMO_API_USER_ID",
        "MOMO_API_KEY",
        "MOMO_CALLBACK_HOST",
        "MOMO_TIMEOUT_SECS",
        "MOMO_TOKEN_REFRESH_MARGIN_SECS",
        "MOMO_NO_PROXY",
    ];

    fn clear_env() {
        for key in ALL_VARS {
            std::env::remove_var(key);
        }
    }

    fn temp_config(contents: &str, extension: &str) -> PathBuf {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(contents.as_bytes()).unwrap();
        let path = temp_file.path().with_extension(extension);
        std::fs::copy(temp_file.path(), &path).unwrap();
        path
    }

    #[test]
    fn test_load_from_env_all_vars_set() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("MOMO_SUBSCRIPTION_KEY", "sub123");
        std::env::set_var("MOMO_BASE_URL", "http://localhost:9000");
        std::env::set_var("MOMO_ENVIRONMENT", "production");
        std::env::set_var("MOMO_API_USER_ID", "c72025f5-5cd1-4630-99e4-8ba4722fad56");
        std::env::set_var("MOMO_API_KEY", "f1db798c98df4bcf83b538175893bbf0");
        std::env::set_var("MOMO_CALLBACK_HOST", "example.org");
        std::env::set_var("MOMO_TIMEOUT_SECS", "10");
        std::env::set_var("MOMO_TOKEN_REFRESH_MARGIN_SECS", "60");
        std::env::set_var("MOMO_NO_PROXY", "true");

        let result = load_from_env();
        assert!(result.is_ok(), "Should load config from env vars, error: {:?}", result.err());

        let config = result.unwrap();
        assert_eq!(config.subscription_key, "sub123");
        assert_eq!(config.base_url, "http://localhost:9000");
        assert_eq!(config.environment, TargetEnvironment::Production);
        assert_eq!(config.api_user_id.as_deref(), Some("c72025f5-5cd1-4630-99e4-8ba4722fad56"));
        assert_eq!(
            config.api_key.as_ref().map(ApiKey::expose),
            Some("f1db798c98df4bcf83b538175893bbf0")
        );
        assert_eq!(config.callback_host, "example.org");
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.token_refresh_margin_secs, 60);
        assert!(config.no_proxy);

        clear_env();
    }

    #[test]
    fn test_load_from_env_defaults() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        std::env::set_var("MOMO_SUBSCRIPTION_KEY", "sub123");
        std::env::set_var("MOMO_BASE_URL", "");

        let config = load_from_env().unwrap();
        assert_eq!(config, MomoConfig::new("sub123"));

        clear_env();
    }

    #[test]
    fn test_load_from_env_missing_subscription_key() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        let result = load_from_env();
        assert!(matches!(result, Err(MomoError::Config(msg)) if msg.contains("MOMO_SUBSCRIPTION_KEY")));
    }

    #[test]
    fn test_load_from_env_invalid_number() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        std::env::set_var("MOMO_SUBSCRIPTION_KEY", "sub123");
        std::env::set_var("MOMO_TIMEOUT_SECS", "soon");

        let result = load_from_env();
        assert!(matches!(result, Err(MomoError::Config(msg)) if msg.contains("MOMO_TIMEOUT_SECS")));

        clear_env();
    }

    #[test]
    fn test_load_reports_env_error_instead_of_file_fallback() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        std::env::set_var("MOMO_SUBSCRIPTION_KEY", "sub123");
        std::env::set_var("MOMO_TIMEOUT_SECS", "soon");

        let result = load();
        assert!(
            matches!(&result, Err(MomoError::Config(msg)) if msg.contains("MOMO_TIMEOUT_SECS")),
            "expected the invalid variable to be reported, got {result:?}"
        );

        clear_env();
    }

    #[test]
    fn test_load_from_env_invalid_environment() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        std::env::set_var("MOMO_SUBSCRIPTION_KEY", "sub123");
        std::env::set_var("MOMO_ENVIRONMENT", "staging");

        assert!(matches!(load_from_env(), Err(MomoError::Config(_))));

        clear_env();
    }

    #[test]
    fn test_load_from_env_key_without_user() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        std::env::set_var("MOMO_SUBSCRIPTION_KEY", "sub123");
        std::env::set_var("MOMO_API_KEY", "orphan");

        assert!(matches!(load_from_env(), Err(MomoError::Config(_))));

        clear_env();
    }

    #[test]
    fn test_load_from_file_json() {
        let path = temp_config(
            r#"{
                "subscription_key": "sub123",
                "environment": "sandbox",
                "callback_host": "webhook.site",
                "timeout_secs": 15
            }"#,
            "json",
        );

        let config = load_from_file(Some(path.clone())).unwrap();
        assert_eq!(config.subscription_key, "sub123");
        assert_eq!(config.timeout_secs, 15);
        assert_eq!(config.base_url, momo_domain::constants::DEFAULT_BASE_URL);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_from_file_toml() {
        let path = temp_config(
            r#"
subscription_key = "sub123"
environment = "production"
api_user_id = "c72025f5-5cd1-4630-99e4-8ba4722fad56"
api_key = "f1db798c98df4bcf83b538175893bbf0"
token_refresh_margin_secs = 30
"#,
            "toml",
        );

        let config = load_from_file(Some(path.clone())).unwrap();
        assert_eq!(config.environment, TargetEnvironment::Production);
        assert!(config.api_key.is_some());
        assert_eq!(config.token_refresh_margin_secs, 30);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_from_file_not_found() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/momo.json")));
        assert!(matches!(result, Err(MomoError::Config(_))), "Should be a Config error");
    }

    #[test]
    fn test_load_from_file_invalid_json() {
        let path = temp_config(r#"{ "this is": "not valid json" "#, "json");

        let result = load_from_file(Some(path.clone()));
        assert!(matches!(result, Err(MomoError::Config(msg)) if msg.contains("Invalid JSON")));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_from_file_missing_subscription_key() {
        let path = temp_config(r#"{ "base_url": "http://localhost" }"#, "json");

        assert!(matches!(load_from_file(Some(path.clone())), Err(MomoError::Config(_))));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_parse_config_unsupported_extension() {
        let result = parse_config("subscription_key: sub123", Path::new("momo.yaml"));
        assert!(matches!(result, Err(MomoError::Config(msg)) if msg.contains("yaml")));
    }
}
