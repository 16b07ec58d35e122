use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_SHEET_BACKEND: &str = "google";
const DEFAULT_TAB_NAME: &str = "Data";
const DEFAULT_TIMEZONE: &str = "Europe/Sofia";
const DEFAULT_SHEETS_API_BASE_URL: &str = "https://sheets.googleapis.com";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Static shared secret expected in the `x-api-key` header
    #[validate(custom = "validate_api_key")]
    pub api_key: String,

    /// Sheet backend selection ("google" or "in-memory")
    #[serde(default = "default_sheet_backend")]
    #[validate(custom = "validate_sheet_backend")]
    pub sheet_backend: String,

    /// Spreadsheet identifier
    #[serde(default)]
    pub sheet_id: Option<String>,

    /// Tab inside the spreadsheet that holds the event log
    #[serde(default = "default_tab_name")]
    #[validate(length(min = 1))]
    pub tab_name: String,

    /// Path to a service-account key file
    #[serde(default)]
    pub service_account_file: Option<String>,

    /// Inline service-account key JSON
    #[serde(default)]
    pub service_account_json: Option<String>,

    /// Static bearer token; bypasses the service-account exchange
    #[serde(default)]
    pub sheets_access_token: Option<String>,

    /// Base URL of the Sheets REST API
    #[serde(default = "default_sheets_api_base_url")]
    pub sheets_api_base_url: String,

    /// Timeout applied to every outbound Sheets call and to inbound requests
    #[serde(default = "default_request_timeout_secs")]
    #[validate(range(min = 1, max = 300))]
    pub request_timeout_secs: u64,

    /// IANA timezone used for server-assigned timestamps and `DD-MM-YYYY` cells
    #[serde(default = "default_timezone")]
    #[validate(custom = "validate_timezone")]
    pub timezone: String,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback
    #[serde(default)]
    pub cors_allow_any_origin: bool,
}

impl AppConfig {
    /// Creates a configuration with defaults for everything but the API key.
    pub fn new(api_key: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: environment.into(),
            log_level: default_log_level(),
            log_json: false,
            api_key: api_key.into(),
            sheet_backend: default_sheet_backend(),
            sheet_id: None,
            tab_name: default_tab_name(),
            service_account_file: None,
            service_account_json: None,
            sheets_access_token: None,
            sheets_api_base_url: default_sheets_api_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            timezone: default_timezone(),
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
        }
    }

    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Checks if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Whether the in-memory sheet store was selected
    pub fn uses_in_memory_sheet(&self) -> bool {
        self.sheet_backend.eq_ignore_ascii_case("in-memory")
    }

    /// Returns true if explicit CORS origins are configured
    pub fn has_cors_allowed_origins(&self) -> bool {
        self.cors_allowed_origins
            .as_ref()
            .map(|raw| raw.split(',').any(|origin| !origin.trim().is_empty()))
            .unwrap_or(false)
    }

    /// Whether we should fall back to permissive CORS
    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Parsed timezone. Validation guarantees the name parses; UTC is the fallback.
    pub fn tz(&self) -> chrono_tz::Tz {
        self.timezone.parse().unwrap_or(chrono_tz::UTC)
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.should_allow_permissive_cors() && !self.has_cors_allowed_origins() {
            let mut err = ValidationError::new("cors_allowed_origins_required");
            err.message = Some(
                "Set APP__CORS_ALLOWED_ORIGINS for non-development environments or explicitly opt-in via APP__CORS_ALLOW_ANY_ORIGIN=true".into(),
            );
            errors.add("cors_allowed_origins", err);
        }

        if !self.uses_in_memory_sheet() {
            let sheet_id_missing = self
                .sheet_id
                .as_deref()
                .map(|id| id.trim().is_empty())
                .unwrap_or(true);
            if sheet_id_missing {
                let mut err = ValidationError::new("sheet_id_required");
                err.message = Some("Set APP__SHEET_ID to the target spreadsheet id".into());
                errors.add("sheet_id", err);
            }

            let credential_sources = [
                &self.service_account_file,
                &self.service_account_json,
                &self.sheets_access_token,
            ]
            .iter()
            .filter(|source| source.as_deref().map(|s| !s.trim().is_empty()).unwrap_or(false))
            .count();
            if credential_sources != 1 {
                let mut err = ValidationError::new("sheet_credentials");
                err.message = Some(
                    "Provide exactly one of APP__SERVICE_ACCOUNT_FILE, APP__SERVICE_ACCOUNT_JSON or APP__SHEETS_ACCESS_TOKEN".into(),
                );
                errors.add("service_account_file", err);
            }
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Runs field and cross-field validation.
    pub fn validate_all(&self) -> Result<(), AppConfigError> {
        self.validate().map_err(|e| {
            error!("Configuration validation failed: {:?}", e);
            AppConfigError::Validation(e)
        })?;
        self.validate_additional_constraints().map_err(|e| {
            error!("Configuration constraint validation failed: {:?}", e);
            AppConfigError::Validation(e)
        })
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_sheet_backend() -> String {
    DEFAULT_SHEET_BACKEND.to_string()
}

fn default_tab_name() -> String {
    DEFAULT_TAB_NAME.to_string()
}

fn default_sheets_api_base_url() -> String {
    DEFAULT_SHEETS_API_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

fn validate_sheet_backend(value: &str) -> Result<(), ValidationError> {
    match value.to_ascii_lowercase().as_str() {
        "google" | "in-memory" => Ok(()),
        _ => {
            let mut err = ValidationError::new("sheet_backend");
            err.message = Some("Must be one of: google, in-memory".into());
            Err(err)
        }
    }
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_api_key(key: &str) -> Result<(), ValidationError> {
    if key.trim().is_empty() {
        let mut err = ValidationError::new("api_key");
        err.message = Some("API key must not be empty".into());
        return Err(err);
    }
    Ok(())
}

fn validate_timezone(name: &str) -> Result<(), ValidationError> {
    if name.parse::<chrono_tz::Tz>().is_err() {
        let mut err = ValidationError::new("timezone");
        err.message = Some("Must be an IANA timezone name such as Europe/Sofia".into());
        return Err(err);
    }
    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::fmt;

    let default_directive = format!("sheets_inventory_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let config = Config::builder()
        .set_default("environment", run_env.as_str())?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    // api_key has no default; fail with a readable message instead of a serde one
    if config.get_string("api_key").is_err() {
        error!("API key is not configured. Set APP__API_KEY to the shared secret clients send in x-api-key.");
        return Err(AppConfigError::Load(ConfigError::NotFound(
            "api_key is required but not configured. Set APP__API_KEY environment variable."
                .into(),
        )));
    }

    let app_config: AppConfig = config.try_deserialize()?;
    app_config.validate_all()?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn google_config() -> AppConfig {
        let mut cfg = AppConfig::new("secret-key", "development");
        cfg.sheet_id = Some("spreadsheet-123".into());
        cfg.sheets_access_token = Some("ya29.token".into());
        cfg
    }

    #[test]
    fn google_backend_with_single_credential_passes() {
        assert!(google_config().validate_all().is_ok());
    }

    #[test]
    fn google_backend_requires_sheet_id() {
        let mut cfg = google_config();
        cfg.sheet_id = Some("  ".into());
        let err = cfg.validate_additional_constraints().unwrap_err();
        assert!(err.field_errors().contains_key("sheet_id"));
    }

    #[test]
    fn google_backend_rejects_ambiguous_credentials() {
        let mut cfg = google_config();
        cfg.service_account_json = Some("{}".into());
        let err = cfg.validate_additional_constraints().unwrap_err();
        assert!(err.field_errors().contains_key("service_account_file"));

        cfg.service_account_json = None;
        cfg.sheets_access_token = None;
        assert!(cfg.validate_additional_constraints().is_err());
    }

    #[test]
    fn in_memory_backend_needs_no_credentials() {
        let mut cfg = AppConfig::new("secret-key", "development");
        cfg.sheet_backend = "in-memory".into();
        assert!(cfg.validate_all().is_ok());
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let mut cfg = google_config();
        cfg.api_key = "   ".into();
        let err = cfg.validate().unwrap_err();
        assert!(err.field_errors().contains_key("api_key"));
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        let mut cfg = google_config();
        cfg.timezone = "Mars/Olympus".into();
        let err = cfg.validate().unwrap_err();
        assert!(err.field_errors().contains_key("timezone"));
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let mut cfg = google_config();
        cfg.sheet_backend = "excel".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn non_dev_requires_cors_origins() {
        let mut cfg = google_config();
        cfg.environment = "production".into();
        assert!(cfg.validate_additional_constraints().is_err());

        cfg.cors_allowed_origins = Some("https://example.com".into());
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn tz_parses_configured_name() {
        let cfg = google_config();
        assert_eq!(cfg.tz(), chrono_tz::Europe::Sofia);
    }
}
