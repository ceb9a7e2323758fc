//! HTTP client module for devtron-client.
//!
//! This module provides the client for calling the orchestrator API, along
//! with the request and response types it works with.

pub mod api;
pub mod request;
pub mod response;
pub mod status;


pub use api::{ApiClient, SessionHandler};
pub use request::{Method, Payload, RequestOptions};
pub use response::{ApiResponse, ContentKind, ResponseEnvelope};
