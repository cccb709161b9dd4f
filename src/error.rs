//! Error types for Autolote
//!
//! Every fallible operation in the crate returns `AppError`. Workflows
//! catch errors at their boundary and turn them into a single
//! user-facing message with [`AppError::user_message`].

use thiserror::Error;

/// Application-wide error type
#[derive(Debug, Error)]
pub enum AppError {
    /// The requested row does not exist
    #[error("Resource not found")]
    NotFound,

    /// No usable credential, or the data service rejected it
    #[error("Authentication required")]
    Unauthorized,

    /// Client-side validation failed before any request was sent
    #[error("Validation error: {0}")]
    Validation(String),

    /// The data service rejected a write because the row already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Sold listings are read-only in the publication workflow
    #[error("Listing is sold and can no longer be edited")]
    SoldListing,

    /// Non-success response from the data service
    #[error("Data API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Transport-level failure
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Payload (de)serialization failure
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Image decoding or encoding failure
    #[error("Image error: {0}")]
    Image(String),

    /// Technical sheet export failure
    #[error("Export error: {0}")]
    Export(String),

    /// Local persistent storage (token file, export directory)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The request was superseded or its view was closed
    #[error("Request cancelled")]
    Cancelled,

    /// Anything else
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<image::ImageError> for AppError {
    fn from(err: image::ImageError) -> Self {
        AppError::Image(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl AppError {
    /// Short machine-readable class, used as a metric label
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound => "not_found",
            AppError::Unauthorized => "unauthorized",
            AppError::Validation(_) => "validation",
            AppError::Conflict(_) => "conflict",
            AppError::SoldListing => "sold_listing",
            AppError::Api { .. } => "api",
            AppError::HttpClient(_) => "http_client",
            AppError::Json(_) => "json",
            AppError::Image(_) => "image",
            AppError::Export(_) => "export",
            AppError::Storage(_) => "storage",
            AppError::Config(_) => "config",
            AppError::Cancelled => "cancelled",
            AppError::Internal(_) => "internal",
        }
    }

    /// Message shown to the user in a toast or modal
    ///
    /// Validation messages are shown verbatim, conflicts become a benign
    /// notice, and everything else collapses to a generic failure text.
    /// Records the error metric for `operation`.
    pub fn user_message(&self, operation: &str) -> String {
        use crate::metrics::ERRORS_TOTAL;
        ERRORS_TOTAL
            .with_label_values(&[self.kind(), operation])
            .inc();

        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::Conflict(_) => "Este vehículo ya está en tus favoritos".to_string(),
            AppError::SoldListing => {
                "Este vehículo ya fue vendido y no se puede editar".to_string()
            }
            AppError::Unauthorized => "Debes iniciar sesión para continuar".to_string(),
            AppError::NotFound => "No se encontró el registro solicitado".to_string(),
            _ => "Ocurrió un error, inténtalo de nuevo".to_string(),
        }
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
