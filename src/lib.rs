//! devtron-client - Typed HTTP client for the Devtron orchestrator API
//!
//! Every call performs exactly one network attempt, bounded by a timeout,
//! and settles to either a response envelope or a structured error.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface definitions
//! - [`client`] - HTTP client, request options and response types
//! - [`config`] - Configuration file parsing and validation
//! - [`error`] - Error types and error handling

pub mod cli;
pub mod client;
pub mod config;
pub mod error;

// Re-exports for convenience
pub use cli::Cli;
pub use client::{ApiClient, ApiResponse, RequestOptions, ResponseEnvelope, SessionHandler};
pub use config::Config;
pub use error::{DevtronError, ErrorEntry, Result, ServerError};
