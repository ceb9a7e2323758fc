//! Error types and error handling for devtron-client.
//!
//! This module defines the structured error every API call fails with
//! ([`ServerError`]), the crate-wide error type ([`DevtronError`]) and the
//! CLI exit codes.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use thiserror::Error;

use crate::client::response::body_code;
use crate::client::status::status_text;

/// Error code used for transport-level failures.
pub const NETWORK_ERROR_CODE: u16 = 0;

/// Error code used for timeouts and unrecognized race failures.
pub const TIMEOUT_ERROR_CODE: u16 = 408;

/// Error code used for expired sessions.
pub const UNAUTHORIZED_ERROR_CODE: u16 = 401;

/// Message reported when an external cancellation token aborts a request.
pub const ABORTED_MESSAGE: &str = "The user aborted a request.";

/// CLI exit codes.
pub mod exit_code {
    /// Success
    pub const SUCCESS: i32 = 0;
    /// General error
    pub const GENERAL_ERROR: i32 = 1;
    /// Configuration error
    pub const CONFIG_ERROR: i32 = 2;
    /// Connection error
    pub const CONNECTION_ERROR: i32 = 3;
    /// Timeout error
    pub const TIMEOUT_ERROR: i32 = 4;
    /// Authentication error
    pub const AUTH_ERROR: i32 = 5;
    /// Command line argument error
    pub const CLI_ERROR: i32 = 64;
}

/// A single entry of a structured error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEntry {
    /// Error code (HTTP status, 0 or 408).
    pub code: u16,
    /// Message meant for logs and developers.
    pub internal_message: String,
    /// Message meant for display. Never empty.
    pub user_message: String,
}

impl ErrorEntry {
    /// Creates an entry.
    pub fn new(
        code: u16,
        internal_message: impl Into<String>,
        user_message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            internal_message: internal_message.into(),
            user_message: user_message.into(),
        }
    }

    /// Creates an entry with the same internal and user message.
    pub fn with_message(code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(code, message.clone(), message)
    }
}

/// Error entry as sent by the orchestrator.
///
/// The backend emits codes as strings ("000", "11002") as often as numbers,
/// and either message may be missing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireErrorEntry {
    #[serde(default, deserialize_with = "lenient_code")]
    pub code: Option<u16>,
    #[serde(default)]
    pub internal_message: Option<String>,
    #[serde(default)]
    pub user_message: Option<String>,
}

impl WireErrorEntry {
    /// Normalizes the entry, falling back to `status` for a missing code
    /// and guaranteeing a populated user message.
    pub fn normalize(self, status: u16) -> ErrorEntry {
        let internal = self.internal_message.unwrap_or_default();
        let user = match self.user_message {
            Some(m) if !m.trim().is_empty() => m,
            _ if !internal.trim().is_empty() => internal.clone(),
            _ => status_text(status).unwrap_or("Something went wrong").to_string(),
        };

        ErrorEntry {
            code: self.code.unwrap_or(status),
            internal_message: internal,
            user_message: user,
        }
    }
}

fn lenient_code<'de, D>(deserializer: D) -> std::result::Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(body_code))
}

/// Structured error produced by every failed API call.
///
/// `errors` is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerError {
    /// HTTP status, or 0 for transport failures, or 408 for timeouts.
    pub code: u16,
    /// Ordered error entries.
    pub errors: Vec<ErrorEntry>,
}

impl ServerError {
    /// Creates a structured error. An empty `errors` list is replaced by a
    /// single entry derived from `code`.
    pub fn new(code: u16, errors: Vec<ErrorEntry>) -> Self {
        let errors = if errors.is_empty() {
            vec![ErrorEntry::with_message(
                code,
                status_text(code).unwrap_or("Something went wrong"),
            )]
        } else {
            errors
        };
        Self { code, errors }
    }

    /// Creates a structured error carrying a single entry.
    pub fn single(
        code: u16,
        internal_message: impl Into<String>,
        user_message: impl Into<String>,
    ) -> Self {
        Self::new(code, vec![ErrorEntry::new(code, internal_message, user_message)])
    }

    /// The request did not settle within its timeout.
    pub fn timeout() -> Self {
        Self::single(TIMEOUT_ERROR_CODE, "Request cancelled", "Request Cancelled")
    }

    /// The race failed in a way that was not already a structured error.
    pub fn took_too_long() -> Self {
        let message = "That took longer than expected.";
        Self::single(TIMEOUT_ERROR_CODE, message, message)
    }

    /// The session is no longer valid.
    pub fn unauthorized() -> Self {
        let message = "Please login again";
        Self::single(UNAUTHORIZED_ERROR_CODE, message, message)
    }

    /// Wraps a transport-level failure.
    pub fn network(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::single(NETWORK_ERROR_CODE, message.clone(), message)
    }

    /// The request was cancelled through the caller's token.
    pub fn aborted() -> Self {
        Self::network(ABORTED_MESSAGE)
    }

    /// Builds an error from server-supplied entries, normalizing each one.
    pub fn from_wire(code: u16, errors: Vec<WireErrorEntry>) -> Self {
        Self::new(code, errors.into_iter().map(|e| e.normalize(code)).collect())
    }

    /// Concatenation of each entry's internal message, or its user message
    /// when the internal one is empty.
    pub fn message(&self) -> String {
        self.errors
            .iter()
            .map(|e| {
                if e.internal_message.is_empty() {
                    e.user_message.as_str()
                } else {
                    e.internal_message.as_str()
                }
            })
            .collect()
    }

    /// Returns the user-facing message of the first entry.
    pub fn user_message(&self) -> &str {
        self.errors
            .first()
            .map(|e| e.user_message.as_str())
            .unwrap_or_default()
    }

    /// Returns true if this error was caused by the caller cancelling the request.
    pub fn is_request_aborted(&self) -> bool {
        self.code == NETWORK_ERROR_CODE
            && self.errors.iter().any(|e| e.internal_message == ABORTED_MESSAGE)
    }

    /// Returns the CLI exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self.code {
            NETWORK_ERROR_CODE => exit_code::CONNECTION_ERROR,
            TIMEOUT_ERROR_CODE => exit_code::TIMEOUT_ERROR,
            UNAUTHORIZED_ERROR_CODE => exit_code::AUTH_ERROR,
            _ => exit_code::GENERAL_ERROR,
        }
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ServerError {}

fn server_summary(err: &ServerError) -> String {
    format!("[{}] {}", err.code, err.user_message())
}

/// The main error type for devtron-client.
#[derive(Debug, Error)]
pub enum DevtronError {
    /// Configuration file is invalid or cannot be loaded.
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Request could not be built from the given input.
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// An API call failed.
    #[error("{}", server_summary(.0))]
    Server(#[from] ServerError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing error.
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DevtronError {
    /// Returns the CLI exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            DevtronError::Config { .. } | DevtronError::Yaml(_) => exit_code::CONFIG_ERROR,
            DevtronError::InvalidRequest { .. } => exit_code::CLI_ERROR,
            DevtronError::Server(e) => e.exit_code(),
            _ => exit_code::GENERAL_ERROR,
        }
    }

    /// Creates a configuration error with a message.
    pub fn config(message: impl Into<String>) -> Self {
        DevtronError::Config {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a configuration error with a message and source.
    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        DevtronError::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        DevtronError::InvalidRequest {
            message: message.into(),
        }
    }
}

/// Result type alias for devtron-client operations.
pub type Result<T> = std::result::Result<T, DevtronError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_error_shape() {
        let err = ServerError::timeout();
        assert_eq!(err.code, 408);
        assert_eq!(
            err.errors,
            vec![ErrorEntry::new(408, "Request cancelled", "Request Cancelled")]
        );
        assert_eq!(err.message(), "Request cancelled");
    }

    #[test]
    fn test_took_too_long_error_shape() {
        let err = ServerError::took_too_long();
        assert_eq!(err.code, 408);
        assert_eq!(err.user_message(), "That took longer than expected.");
    }

    #[test]
    fn test_unauthorized_error_shape() {
        let err = ServerError::unauthorized();
        assert_eq!(err.code, 401);
        assert_eq!(err.message(), "Please login again");
        assert_eq!(err.user_message(), "Please login again");
    }

    #[test]
    fn test_message_concatenates_entries() {
        let err = ServerError::new(
            500,
            vec![
                ErrorEntry::new(500, "first. ", "ignored"),
                ErrorEntry::new(500, "", "second"),
            ],
        );
        assert_eq!(err.message(), "first. second");
        assert_eq!(err.to_string(), "first. second");
    }

    #[test]
    fn test_empty_errors_are_backfilled() {
        let err = ServerError::new(404, Vec::new());
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.errors[0].code, 404);
        assert_eq!(err.user_message(), "Not Found");
    }

    #[test]
    fn test_wire_entry_accepts_string_and_numeric_codes() {
        let entries: Vec<WireErrorEntry> = serde_json::from_str(
            r#"[
                {"code": "11002", "internalMessage": "pg: no rows", "userMessage": "App not found"},
                {"code": 500, "internalMessage": "boom"},
                {"code": "abc", "userMessage": "odd code"},
                {},
                {"code": "70000", "internalMessage": "overflow"}
            ]"#,
        )
        .unwrap();

        let err = ServerError::from_wire(404, entries);
        assert_eq!(err.errors[0].code, 11002);
        assert_eq!(err.errors[0].user_message, "App not found");
        assert_eq!(err.errors[1].code, 500);
        assert_eq!(err.errors[1].user_message, "boom");
        assert_eq!(err.errors[2].code, 404);
        assert_eq!(err.errors[3].user_message, "Not Found");
        // out of u16 range falls back to the status
        assert_eq!(err.errors[4].code, 404);
        assert_eq!(err.errors[4].user_message, "overflow");
    }

    #[test]
    fn test_is_request_aborted() {
        assert!(ServerError::aborted().is_request_aborted());
        assert!(!ServerError::network("connection refused").is_request_aborted());
        assert!(!ServerError::timeout().is_request_aborted());
    }

    #[test]
    fn test_server_error_exit_code() {
        assert_eq!(ServerError::network("x").exit_code(), exit_code::CONNECTION_ERROR);
        assert_eq!(ServerError::timeout().exit_code(), exit_code::TIMEOUT_ERROR);
        assert_eq!(ServerError::unauthorized().exit_code(), exit_code::AUTH_ERROR);
        assert_eq!(ServerError::new(500, Vec::new()).exit_code(), exit_code::GENERAL_ERROR);
    }

    #[test]
    fn test_devtron_error_exit_code() {
        let err = DevtronError::config("bad root");
        assert_eq!(err.exit_code(), exit_code::CONFIG_ERROR);

        let err = DevtronError::from(ServerError::timeout());
        assert_eq!(err.exit_code(), exit_code::TIMEOUT_ERROR);

        let err = DevtronError::invalid_request("bad --form");
        assert_eq!(err.exit_code(), exit_code::CLI_ERROR);
    }

    #[test]
    fn test_error_display() {
        let err = DevtronError::from(ServerError::single(500, "boom", "Something failed"));
        assert_eq!(format!("{}", err), "[500] Something failed");

        let err = DevtronError::config("api.timeout_ms must be > 0");
        assert_eq!(
            format!("{}", err),
            "Configuration error: api.timeout_ms must be > 0"
        );
    }

    #[test]
    fn test_serialization_uses_camel_case() {
        let json = serde_json::to_string(&ServerError::timeout()).unwrap();
        assert!(json.contains("\"internalMessage\":\"Request cancelled\""));
        assert!(json.contains("\"userMessage\":\"Request Cancelled\""));
    }
}
