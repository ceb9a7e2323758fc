//! Request description types.

use reqwest::multipart::Form;
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(60_000);

/// HTTP method of an API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
}

impl Method {
    /// Returns the method as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Request body.
#[derive(Debug, Default)]
pub enum Payload {
    /// No body.
    #[default]
    Empty,
    /// JSON-encoded body, sent with credentials.
    Json(serde_json::Value),
    /// Pre-built multipart form, sent untouched with credentials.
    Multipart(Form),
}

impl Payload {
    /// Returns true for multipart payloads.
    pub fn is_multipart(&self) -> bool {
        matches!(self, Payload::Multipart(_))
    }
}

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Maximum time to wait for the call to settle. Falls back to the
    /// client's default when unset.
    pub timeout: Option<Duration>,
    /// Caller-owned cancellation token.
    pub signal: Option<CancellationToken>,
    /// Return a 401 as data instead of failing with "Please login again".
    pub prevent_auto_logout: bool,
}

impl RequestOptions {
    /// Creates default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the timeout in milliseconds. A call with a zero timeout fails without sending.
    pub fn timeout_ms(mut self, millis: u64) -> Self {
        self.timeout = Some(Duration::from_millis(millis));
        self
    }

    /// Sets the caller's cancellation token.
    pub fn signal(mut self, token: CancellationToken) -> Self {
        self.signal = Some(token);
        self
    }

    /// Sets whether a 401 is returned as data.
    pub fn prevent_auto_logout(mut self, prevent: bool) -> Self {
        self.prevent_auto_logout = prevent;
        self
    }
}

/// Joins a relative API path under the root URL.
pub fn join_url(root: &str, path: &str) -> String {
    format!(
        "{}/{}",
        root.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
