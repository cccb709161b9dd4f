//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/default.toml, config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub export: ExportConfig,
    pub logging: LoggingConfig,
}

/// Data service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the REST data service (e.g., "https://db.example.com/rest/v1")
    pub base_url: String,
    /// Optional service key, sent as `apikey` and bearer token
    pub api_key: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_seconds: u64,
    /// User-Agent header for outgoing requests
    pub user_agent: String,
}

/// Client-side session storage
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// File holding the raw bearer token of the logged-in user
    pub token_path: PathBuf,
}

/// Technical sheet export configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    /// Directory exported PNG/PDF files are written to
    pub output_dir: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set
    pub fn default_directive(&self) -> String {
        format!("autolote={}", self.level.trim().to_ascii_lowercase())
    }

    pub fn is_json(&self) -> bool {
        self.format.trim().eq_ignore_ascii_case("json")
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (AUTOLOTE__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            .set_default("api.base_url", "http://127.0.0.1:3000")?
            .set_default("api.timeout_seconds", 30)?
            .set_default("api.user_agent", "Autolote/0.1.0")?
            .set_default("session.token_path", ".autolote/user_token")?
            .set_default("export.output_dir", "exports")?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("AUTOLOTE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// Build a configuration pointing at `base_url` with defaults for the rest
    pub fn for_base_url(base_url: impl Into<String>, data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            api: ApiConfig {
                base_url: base_url.into(),
                api_key: None,
                timeout_seconds: 30,
                user_agent: "Autolote/0.1.0".to_string(),
            },
            session: SessionConfig {
                token_path: data_dir.join("user_token"),
            },
            export: ExportConfig {
                output_dir: data_dir.join("exports"),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }

    pub(crate) fn validate(&self) -> Result<(), crate::error::AppError> {
        let base_url = self.api.base_url.trim();
        if base_url.is_empty() {
            return Err(crate::error::AppError::Config(
                "api.base_url must not be empty".to_string(),
            ));
        }

        let parsed = url::Url::parse(base_url)
            .map_err(|e| crate::error::AppError::Config(format!("api.base_url: {e}")))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(crate::error::AppError::Config(
                "api.base_url must use http or https".to_string(),
            ));
        }

        if self.api.timeout_seconds == 0 {
            return Err(crate::error::AppError::Config(
                "api.timeout_seconds must be greater than 0".to_string(),
            ));
        }

        let level = self.logging.level.trim().to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(crate::error::AppError::Config(format!(
                "logging.level must be one of {}",
                LOG_LEVELS.join(", ")
            )));
        }

        let format = self.logging.format.trim();
        if !format.eq_ignore_ascii_case("pretty") && !format.eq_ignore_ascii_case("json") {
            return Err(crate::error::AppError::Config(
                "logging.format must be pretty or json".to_string(),
            ));
        }

        if parsed.scheme() == "http" && self.api.api_key.is_some() {
            tracing::warn!(
                base_url = %base_url,
                "Sending the service key over plain http"
            );
        }

        Ok(())
    }
}
