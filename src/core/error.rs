//! Typed error handling for the shop backend
//!
//! Every public service operation returns [`ShopAppResult`]. Errors are split
//! into categories so callers (and the HTTP layer) can react to them
//! specifically instead of matching on message text.
//!
//! # Error Categories
//!
//! - [`EntityError`]: a shop (or other record) could not be found
//! - [`ValidationError`]: rejected input (opening hours, dates, payload fields)
//! - [`StorageError`]: the store or the search index failed
//! - [`ConfigError`]: configuration could not be loaded
//!
//! Storage failures keep the original error as their `source()`, so the full
//! cause chain is available to logs and callers.
//!
//! # Example
//!
//! ```rust,ignore
//! match service.get_shop(42).await {
//!     Ok(shop) => println!("Found: {}", shop.name),
//!     Err(ShopAppError::Entity(EntityError::NotFound { id, .. })) => {
//!         println!("Shop {} not found", id);
//!     }
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::NaiveTime;
use serde::Serialize;
use std::fmt;

/// The main error type of the shop backend
#[derive(Debug)]
pub enum ShopAppError {
    /// Entity lookups
    Entity(EntityError),

    /// Rejected input
    Validation(ValidationError),

    /// Store or search index failures
    Storage(StorageError),

    /// Configuration errors
    Config(ConfigError),
}

impl fmt::Display for ShopAppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShopAppError::Entity(e) => write!(f, "{}", e),
            ShopAppError::Validation(e) => write!(f, "{}", e),
            ShopAppError::Storage(e) => write!(f, "{}", e),
            ShopAppError::Config(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ShopAppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ShopAppError::Entity(e) => Some(e),
            ShopAppError::Validation(e) => Some(e),
            ShopAppError::Storage(e) => Some(e),
            ShopAppError::Config(e) => Some(e),
        }
    }
}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ShopAppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ShopAppError::Entity(e) => e.status_code(),
            ShopAppError::Validation(_) => StatusCode::BAD_REQUEST,
            ShopAppError::Storage(e) => e.status_code(),
            ShopAppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            ShopAppError::Entity(e) => e.error_code(),
            ShopAppError::Validation(e) => e.error_code(),
            ShopAppError::Storage(e) => e.error_code(),
            ShopAppError::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: self.details(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            ShopAppError::Entity(EntityError::NotFound { entity_type, id }) => {
                Some(serde_json::json!({
                    "entity_type": entity_type,
                    "id": id
                }))
            }
            ShopAppError::Validation(ValidationError::FieldErrors(errors)) => {
                Some(serde_json::json!({ "fields": errors }))
            }
            ShopAppError::Validation(ValidationError::OverlappingHours { day, .. })
            | ShopAppError::Validation(ValidationError::InvalidInterval { day, .. }) => {
                Some(serde_json::json!({ "day": day }))
            }
            ShopAppError::Validation(ValidationError::InvalidDate { parameter, value, .. }) => {
                Some(serde_json::json!({
                    "parameter": parameter,
                    "value": value
                }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for ShopAppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = ?self, code = self.error_code(), "request failed");
        }
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

// =============================================================================
// Entity Errors
// =============================================================================

/// Errors related to entity lookups
#[derive(Debug)]
pub enum EntityError {
    /// Entity was not found
    NotFound { entity_type: String, id: i64 },
}

impl EntityError {
    /// Shorthand for a missing shop
    pub fn shop_not_found(id: i64) -> Self {
        EntityError::NotFound {
            entity_type: "Shop".to_string(),
            id,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            EntityError::NotFound { .. } => StatusCode::NOT_FOUND,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            EntityError::NotFound { .. } => "ENTITY_NOT_FOUND",
        }
    }
}

impl fmt::Display for EntityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityError::NotFound { entity_type, id } => {
                write!(f, "{} with id {} not found", entity_type, id)
            }
        }
    }
}

impl std::error::Error for EntityError {}

impl From<EntityError> for ShopAppError {
    fn from(err: EntityError) -> Self {
        ShopAppError::Entity(err)
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Errors related to input validation
#[derive(Debug)]
pub enum ValidationError {
    /// Single field validation error
    FieldError { field: String, message: String },

    /// Multiple field validation errors
    FieldErrors(Vec<FieldValidationError>),

    /// Two intervals of the same day overlap
    OverlappingHours {
        day: i64,
        first: (NaiveTime, NaiveTime),
        second: (NaiveTime, NaiveTime),
    },

    /// An interval does not close after it opens
    InvalidInterval {
        day: i64,
        open_at: NaiveTime,
        close_at: NaiveTime,
    },

    /// A date parameter could not be parsed as a calendar date
    InvalidDate {
        parameter: String,
        value: String,
        message: String,
    },

    /// Missing required argument
    MissingArgument { argument: String },

    /// Invalid JSON format
    InvalidJson { message: String },
}

/// A single field validation error
#[derive(Debug, Clone, Serialize)]
pub struct FieldValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ValidationError::OverlappingHours { .. } => "OVERLAPPING_OPENING_HOURS",
            ValidationError::InvalidInterval { .. } => "INVALID_OPENING_HOURS",
            ValidationError::InvalidDate { .. } => "INVALID_DATE",
            _ => "VALIDATION_ERROR",
        }
    }
}

fn hhmm(time: &NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::FieldError { field, message } => {
                write!(f, "Validation error for field '{}': {}", field, message)
            }
            ValidationError::FieldErrors(errors) => {
                let msgs: Vec<String> = errors
                    .iter()
                    .map(|e| format!("{}: {}", e.field, e.message))
                    .collect();
                write!(f, "Validation errors: {}", msgs.join(", "))
            }
            ValidationError::OverlappingHours { day, first, second } => {
                write!(
                    f,
                    "Overlapping opening hours on day {}: {}-{} conflicts with {}-{}",
                    day,
                    hhmm(&first.0),
                    hhmm(&first.1),
                    hhmm(&second.0),
                    hhmm(&second.1)
                )
            }
            ValidationError::InvalidInterval {
                day,
                open_at,
                close_at,
            } => {
                write!(
                    f,
                    "Invalid opening hours on day {}: {}-{} does not close after it opens",
                    day,
                    hhmm(open_at),
                    hhmm(close_at)
                )
            }
            ValidationError::InvalidDate {
                parameter,
                value,
                message,
            } => {
                write!(
                    f,
                    "Invalid date '{}' for parameter '{}': {}",
                    value, parameter, message
                )
            }
            ValidationError::MissingArgument { argument } => {
                write!(f, "Missing required argument: {}", argument)
            }
            ValidationError::InvalidJson { message } => {
                write!(f, "Invalid JSON: {}", message)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for ShopAppError {
    fn from(err: ValidationError) -> Self {
        ShopAppError::Validation(err)
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors raised by the store or the search index
#[derive(Debug)]
pub enum StorageError {
    /// A backend call failed; `source` is the original error
    Backend {
        operation: String,
        source: anyhow::Error,
    },
}

impl StorageError {
    /// Build a `map_err` adapter that wraps a backend error for `operation`
    ///
    /// ```rust,ignore
    /// let shop = repo.find_by_id(id).await.map_err(StorageError::wrap("find shop"))?;
    /// ```
    pub fn wrap(operation: &str) -> impl FnOnce(anyhow::Error) -> ShopAppError + '_ {
        move |source| {
            ShopAppError::Storage(StorageError::Backend {
                operation: operation.to_string(),
                source,
            })
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            StorageError::Backend { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            StorageError::Backend { .. } => "STORAGE_ERROR",
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Backend { operation, source } => {
                write!(f, "Failed to {}: {}", operation, source)
            }
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Backend { source, .. } => Some(&**source),
        }
    }
}

impl From<StorageError> for ShopAppError {
    fn from(err: StorageError) -> Self {
        ShopAppError::Storage(err)
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors related to configuration
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to parse configuration file
    ParseError {
        file: Option<String>,
        message: String,
    },

    /// Invalid value in configuration
    InvalidValue {
        field: String,
        value: String,
        message: String,
    },

    /// Configuration file not found
    FileNotFound { path: String },

    /// IO error while reading configuration
    IoError { message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError { file, message } => {
                if let Some(file) = file {
                    write!(f, "Failed to parse config file '{}': {}", file, message)
                } else {
                    write!(f, "Failed to parse config: {}", message)
                }
            }
            ConfigError::InvalidValue {
                field,
                value,
                message,
            } => {
                write!(
                    f,
                    "Invalid value '{}' for field '{}': {}",
                    value, field, message
                )
            }
            ConfigError::FileNotFound { path } => {
                write!(f, "Configuration file not found: {}", path)
            }
            ConfigError::IoError { message } => {
                write!(f, "IO error: {}", message)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for ShopAppError {
    fn from(err: ConfigError) -> Self {
        ShopAppError::Config(err)
    }
}

// =============================================================================
// Conversions from external errors
// =============================================================================

impl From<serde_yaml::Error> for ShopAppError {
    fn from(err: serde_yaml::Error) -> Self {
        ShopAppError::Config(ConfigError::ParseError {
            file: None,
            message: err.to_string(),
        })
    }
}

impl From<validator::ValidationErrors> for ShopAppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldValidationError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| FieldValidationError {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        ShopAppError::Validation(ValidationError::FieldErrors(fields))
    }
}

// =============================================================================
// Result type alias
// =============================================================================

/// A specialized Result type for shop backend operations
pub type ShopAppResult<T> = Result<T, ShopAppError>;
