//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If `NISHIKI_CLIENT_ID` is unset, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! Whatever the source, an empty `redirect_url` is derived from `port` and
//! every URL is validated before the config is returned.
//!
//! ## Environment Variables
//! - `NISHIKI_CLIENT_ID`: OAuth client ID (required)
//! - `NISHIKI_BACKEND_URL`: Backend base URL
//! - `NISHIKI_AUTH_URL`: Identity provider application URL
//! - `NISHIKI_REDIRECT_URL`: OAuth redirect URI
//! - `NISHIKI_PORT`: Local UI port, used to derive the redirect URI
//! - `NISHIKI_END_SESSION_URL`: Identity provider logout endpoint
//! - `NISHIKI_TOKEN_TIMEOUT_SECS`: Token endpoint timeout in seconds
//! - `NISHIKI_LOG_LEVEL`: Default tracing filter
//!
//! ## File Locations
//! The loader probes the following paths (in order), each as `.toml`
//! then `.json`:
//! 1. `./config` (current working directory)
//! 2. `./nishiki`
//! 3. `./config/config`
//! 4. The same names next to the executable

use std::path::{Path, PathBuf};

use nishiki_domain::{AppConfig, NishikiError, Result};
use url::Url;

const CONFIG_STEMS: [&str; 3] = ["config", "nishiki", "config/config"];

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If the client ID is
/// not set there, falls back to loading from a config file.
///
/// # Errors
/// Returns `NishikiError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - A URL is malformed
pub fn load() -> Result<AppConfig> {
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
/// Only `NISHIKI_CLIENT_ID` is required; everything else keeps its default
/// when unset.
///
/// # Errors
/// Returns `NishikiError::Config` if the client ID is missing or a value is
/// invalid.
pub fn load_from_env() -> Result<AppConfig> {
    let mut config = AppConfig { client_id: env_var("NISHIKI_CLIENT_ID")?, ..AppConfig::default() };

    if let Some(url) = env_opt("NISHIKI_BACKEND_URL") {
        config.backend_url = url;
    }
    if let Some(url) = env_opt("NISHIKI_AUTH_URL") {
        config.auth_url = url;
    }
    if let Some(url) = env_opt("NISHIKI_REDIRECT_URL") {
        config.redirect_url = url;
    }
    if let Some(port) = env_opt("NISHIKI_PORT") {
        config.port = Some(
            port.parse::<u16>()
                .map_err(|e| NishikiError::Config(format!("Invalid port: {}", e)))?,
        );
    }
    config.end_session_url = env_opt("NISHIKI_END_SESSION_URL");
    if let Some(secs) = env_opt("NISHIKI_TOKEN_TIMEOUT_SECS") {
        config.token_timeout_secs = secs
            .parse::<u64>()
            .map_err(|e| NishikiError::Config(format!("Invalid token timeout: {}", e)))?;
    }
    if let Some(level) = env_opt("NISHIKI_LOG_LEVEL") {
        config.log_level = level;
    }

    finish(config)
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
/// Returns `NishikiError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<AppConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(NishikiError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            NishikiError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| NishikiError::Config(format!("Failed to read config file: {}", e)))?;

    finish(parse_config(&contents, &config_path)?)
}

/// Check that the configuration can drive a sign-in
///
/// # Errors
/// Returns `NishikiError::Config` naming the first bad field
pub fn validate(config: &AppConfig) -> Result<()> {
    if config.client_id.trim().is_empty() {
        return Err(NishikiError::Config("client_id must be set".to_string()));
    }
    if config.token_timeout_secs == 0 {
        return Err(NishikiError::Config("token_timeout_secs must be positive".to_string()));
    }

    check_url("backend_url", &config.backend_url)?;
    check_url("auth_url", &config.auth_url)?;
    if config.redirect_url.is_empty() {
        return Err(NishikiError::Config(
            "redirect_url must be set (or derived from port)".to_string(),
        ));
    }
    check_url("redirect_url", &config.redirect_url)?;
    if let Some(url) = config.end_session_url.as_deref() {
        check_url("end_session_url", url)?;
    }
    Ok(())
}

fn finish(mut config: AppConfig) -> Result<AppConfig> {
    config.resolve_redirect_url();
    validate(&config)?;
    Ok(config)
}

fn check_url(field: &str, value: &str) -> Result<()> {
    let url = Url::parse(value)
        .map_err(|e| NishikiError::Config(format!("{}: invalid URL {:?}: {}", field, value, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(NishikiError::Config(format!("{}: unsupported scheme {}", field, other))),
    }
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
///
/// # Errors
/// Returns `NishikiError::Config` if format is invalid or parsing fails.
fn parse_config(contents: &str, path: &Path) -> Result<AppConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| NishikiError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| NishikiError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(NishikiError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// Searches the working directory first, then the executable's directory.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd);
    }
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.push(exe_dir.to_path_buf());
        }
    }

    roots.iter().find_map(|root| probe_in(root))
}

fn probe_in(root: &Path) -> Option<PathBuf> {
    CONFIG_STEMS
        .iter()
        .flat_map(|stem| ["toml", "json"].map(|ext| root.join(format!("{}.{}", stem, ext))))
        .find(|path| path.is_file())
}

/// Get required environment variable
///
/// # Errors
/// Returns `NishikiError::Config` if the variable is not set.
fn env_var(key: &str) -> Result<String> {
    env_opt(key).ok_or_else(|| {
        NishikiError::Config(format!("Missing required environment variable: {}", key))
    })
}

/// Optional environment variable; empty values count as unset
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use once_cell::sync::Lazy;
    use tempfile::{NamedTempFile, TempDir};

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    const ENV_KEYS: [&str; 8] = [
        "NISHIKI_CLIENT_ID",
        "NISHIKI_BACKEND_URL",
        "NISHIKI_AUTH_URL",
        "NISHIKI_REDIRECT_URL",
        "NISHIKI_PORT",
        "NISHIKI_END_SESSION_URL",
        "NISHIKI_TOKEN_TIMEOUT_SECS",
        "NISHIKI_LOG_LEVEL",
    ];

    fn clear_env() {
        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
    }

    fn write_config(extension: &str, contents: &str) -> (NamedTempFile, PathBuf) {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(contents.as_bytes()).unwrap();
        let path = temp_file.path().with_extension(extension);
        std::fs::copy(temp_file.path(), &path).unwrap();
        (temp_file, path)
    }

    #[test]
    fn test_load_from_env_all_vars_set() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("NISHIKI_CLIENT_ID", "nishiki");
        std::env::set_var("NISHIKI_BACKEND_URL", "https://api.example.com");
        std::env::set_var("NISHIKI_AUTH_URL", "https://auth.example.com/application/o");
        std::env::set_var("NISHIKI_REDIRECT_URL", "https://app.example.com/auth/callback");
        std::env::set_var("NISHIKI_END_SESSION_URL", "https://auth.example.com/end-session/");
        std::env::set_var("NISHIKI_TOKEN_TIMEOUT_SECS", "10");
        std::env::set_var("NISHIKI_LOG_LEVEL", "debug");

        let result = load_from_env();
        clear_env();

        let config = result.expect("config from env");
        assert_eq!(config.client_id, "nishiki");
        assert_eq!(config.backend_url, "https://api.example.com");
        assert_eq!(config.redirect_url, "https://app.example.com/auth/callback");
        assert_eq!(
            config.end_session_url.as_deref(),
            Some("https://auth.example.com/end-session/")
        );
        assert_eq!(config.token_timeout_secs, 10);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_load_from_env_derives_redirect_from_port() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("NISHIKI_CLIENT_ID", "nishiki");
        std::env::set_var("NISHIKI_PORT", "8080");

        let result = load_from_env();
        clear_env();

        let config = result.expect("config from env");
        assert_eq!(config.port, Some(8080));
        assert_eq!(config.redirect_url, "http://localhost:8080/auth/callback");
    }

    #[test]
    fn test_load_from_env_missing_client_id() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        let result = load_from_env();
        assert!(matches!(result, Err(NishikiError::Config(_))));
    }

    #[test]
    fn test_load_from_env_invalid_number() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("NISHIKI_CLIENT_ID", "nishiki");
        std::env::set_var("NISHIKI_PORT", "not-a-port");

        let result = load_from_env();
        clear_env();

        assert!(matches!(result, Err(NishikiError::Config(msg)) if msg.contains("port")));
    }

    #[test]
    fn test_load_from_file_toml() {
        let (_temp, path) = write_config(
            "toml",
            r#"
client_id = "nishiki"
backend_url = "http://localhost:3001"
auth_url = "https://auth.example.com/application/o"
port = 5173
scopes = ["openid", "email"]
"#,
        );

        let result = load_from_file(Some(path.clone()));
        std::fs::remove_file(&path).ok();

        let config = result.expect("config from TOML");
        assert_eq!(config.redirect_url, "http://localhost:5173/auth/callback");
        assert_eq!(config.scopes, vec!["openid".to_string(), "email".to_string()]);
        assert_eq!(config.token_timeout_secs, 30);
    }

    #[test]
    fn test_load_from_file_json() {
        let (_temp, path) = write_config(
            "json",
            r#"{
                "client_id": "nishiki",
                "redirect_url": "http://localhost:8080/auth/callback",
                "end_session_url": "https://auth.example.com/end-session/"
            }"#,
        );

        let result = load_from_file(Some(path.clone()));
        std::fs::remove_file(&path).ok();

        let config = result.expect("config from JSON");
        assert_eq!(config.client_id, "nishiki");
        assert_eq!(config.backend_url, "http://localhost:3001");
    }

    #[test]
    fn test_load_from_file_rejects_bad_url() {
        let (_temp, path) = write_config(
            "toml",
            r#"
client_id = "nishiki"
redirect_url = "http://localhost:8080/auth/callback"
backend_url = "not a url"
"#,
        );

        let result = load_from_file(Some(path.clone()));
        std::fs::remove_file(&path).ok();

        assert!(matches!(result, Err(NishikiError::Config(msg)) if msg.starts_with("backend_url")));
    }

    #[test]
    fn test_load_from_file_not_found() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/config.toml")));
        assert!(matches!(result, Err(NishikiError::Config(_))));
    }

    #[test]
    fn test_validate_requires_redirect() {
        let config = AppConfig { client_id: "nishiki".to_string(), ..AppConfig::default() };
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_rejects_non_http_scheme() {
        let config = AppConfig {
            client_id: "nishiki".to_string(),
            redirect_url: "ftp://localhost/auth/callback".to_string(),
            ..AppConfig::default()
        };
        let result = validate(&config);
        assert!(matches!(result, Err(NishikiError::Config(msg)) if msg.contains("scheme")));
    }

    #[test]
    fn test_probe_prefers_toml_then_json_in_order() {
        let dir = TempDir::new().unwrap();
        assert!(probe_in(dir.path()).is_none());

        std::fs::write(dir.path().join("nishiki.json"), "{}").unwrap();
        assert_eq!(probe_in(dir.path()), Some(dir.path().join("nishiki.json")));

        std::fs::write(dir.path().join("config.json"), "{}").unwrap();
        assert_eq!(probe_in(dir.path()), Some(dir.path().join("config.json")));

        std::fs::write(dir.path().join("config.toml"), "").unwrap();
        assert_eq!(probe_in(dir.path()), Some(dir.path().join("config.toml")));
    }

    #[test]
    fn test_parse_config_unsupported_format() {
        let result = parse_config("client_id: nishiki", &PathBuf::from("config.yaml"));
        assert!(result.is_err(), "Should fail with unsupported format");
    }
}
