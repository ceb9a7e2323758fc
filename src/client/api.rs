//! Devtron HTTP client API.
//!
//! Every call is raced against a timeout and settles to either an
//! [`ApiResponse`] or a [`ServerError`], never both.

use crate::client::request::{join_url, Method, Payload, RequestOptions, DEFAULT_TIMEOUT};
use crate::client::response::{body_code, ApiResponse, ContentKind, ResponseEnvelope};
use crate::client::status::status_text;
use crate::config::ApiConfig;
use crate::error::{DevtronError, Result, ServerError, WireErrorEntry};
use reqwest::cookie::Jar;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::Form;
use reqwest::{Client, RequestBuilder, Url};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Name of the session cookie the orchestrator authenticates with.
pub const SESSION_COOKIE: &str = "argocd.token";

/// Receives notice that the session expired.
///
/// Called whenever a 401 is escalated to an error, i.e. when the call did
/// not set `prevent_auto_logout`.
pub trait SessionHandler: Send + Sync {
    /// The orchestrator rejected the session.
    fn on_session_expired(&self);
}

impl<F> SessionHandler for F
where
    F: Fn() + Send + Sync,
{
    fn on_session_expired(&self) {
        self()
    }
}

/// HTTP client for the orchestrator API.
#[derive(Clone)]
pub struct ApiClient {
    /// Client carrying the session cookie store.
    client: Client,
    /// Root every relative path is joined under.
    root_url: String,
    /// Timeout applied when a call does not set one.
    default_timeout: Duration,
    /// Notified when a 401 escalates.
    session_handler: Option<Arc<dyn SessionHandler>>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("root_url", &self.root_url)
            .field("default_timeout", &self.default_timeout)
            .field("session_handler", &self.session_handler.is_some())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Creates a new client for the given root URL.
    ///
    /// # Arguments
    /// * `root_url` - Root of the API (e.g., "http://localhost:8080/orchestrator")
    pub fn new(root_url: impl Into<String>) -> Result<Self> {
        Self::build(root_url.into(), DEFAULT_TIMEOUT, None)
    }

    /// Creates a new client from the API configuration.
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        Self::build(
            config.root_url.clone(),
            Duration::from_millis(config.timeout_ms),
            config.token.as_deref(),
        )
    }

    fn build(root_url: String, default_timeout: Duration, token: Option<&str>) -> Result<Self> {
        let jar = Arc::new(Jar::default());

        if let Some(token) = token {
            let url: Url = root_url.parse().map_err(|e| {
                DevtronError::config_with_source(format!("Invalid root URL '{}'", root_url), e)
            })?;
            jar.add_cookie_str(&format!("{}={}; Path=/", SESSION_COOKIE, token), &url);
        }

        let client = Client::builder()
            .cookie_provider(jar)
            .build()
            .map_err(|e| DevtronError::config_with_source("Failed to create HTTP client", e))?;

        Ok(Self {
            client,
            root_url,
            default_timeout,
            session_handler: None,
        })
    }

    /// Sets the handler notified when the session expires.
    pub fn with_session_handler(mut self, handler: Arc<dyn SessionHandler>) -> Self {
        self.session_handler = Some(handler);
        self
    }

    /// Returns the root URL.
    pub fn root_url(&self) -> &str {
        &self.root_url
    }

    /// Returns the timeout used when a call sets none.
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Sends a GET request.
    pub async fn get(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> std::result::Result<ApiResponse, ServerError> {
        self.request(Method::Get, url, Payload::Empty, options).await
    }

    /// Sends a POST request with a JSON body.
    pub async fn post<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        options: RequestOptions,
    ) -> std::result::Result<ApiResponse, ServerError> {
        self.request(Method::Post, url, json_payload(body)?, options)
            .await
    }

    /// Sends a POST request with a multipart form, e.g. a file upload.
    pub async fn post_multipart(
        &self,
        url: &str,
        form: Form,
        options: RequestOptions,
    ) -> std::result::Result<ApiResponse, ServerError> {
        self.request(Method::Post, url, Payload::Multipart(form), options)
            .await
    }

    /// Sends a PUT request with a JSON body.
    pub async fn put<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        options: RequestOptions,
    ) -> std::result::Result<ApiResponse, ServerError> {
        self.request(Method::Put, url, json_payload(body)?, options)
            .await
    }

    /// Sends a DELETE request with an optional JSON body.
    pub async fn trash<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        options: RequestOptions,
    ) -> std::result::Result<ApiResponse, ServerError> {
        self.request(Method::Delete, url, json_payload(body)?, options)
            .await
    }

    /// Performs one call: builds the request, races it against the timeout
    /// and normalizes the outcome.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        payload: Payload,
        options: RequestOptions,
    ) -> std::result::Result<ApiResponse, ServerError> {
        let url = join_url(&self.root_url, path);
        let timeout = options.timeout.unwrap_or(self.default_timeout);

        if timeout.is_zero() {
            return Err(ServerError::network("Request timeout must be greater than zero"));
        }

        debug!(
            method = %method,
            url = %url,
            timeout_ms = timeout.as_millis() as u64,
            multipart = payload.is_multipart(),
            "Sending API request"
        );

        let builder = match payload {
            Payload::Multipart(form) => self.client.request(method.into(), &url).multipart(form),
            Payload::Json(body) => self.client.request(method.into(), &url).json(&body),
            Payload::Empty => self.client.request(method.into(), &url),
        };

        let internal = CancellationToken::new();
        let signal = options.signal.clone().unwrap_or_else(|| internal.clone());
        let session = if options.prevent_auto_logout {
            None
        } else {
            self.session_handler.clone()
        };

        let mut task = tokio::spawn(fetch(
            builder,
            signal,
            options.prevent_auto_logout,
            session,
        ));
        let guard = AbortOnDrop(Some(task.abort_handle()));

        let outcome = tokio::select! {
            joined = &mut task => match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(method = %method, url = %url, error = %e, "API request task failed");
                    Err(ServerError::took_too_long())
                }
            },
            _ = tokio::time::sleep(timeout) => {
                internal.cancel();
                warn!(
                    method = %method,
                    url = %url,
                    timeout_ms = timeout.as_millis() as u64,
                    "API request timed out"
                );
                Err(ServerError::timeout())
            }
        };
        guard.disarm();

        match &outcome {
            Ok(_) => debug!(method = %method, url = %url, "API request completed"),
            Err(e) if e.is_request_aborted() => {
                debug!(method = %method, url = %url, "API request aborted by caller")
            }
            Err(e) => warn!(
                method = %method,
                url = %url,
                code = e.code,
                error = %e,
                "API request failed"
            ),
        }

        outcome
    }
}

/// Aborts the fetch task if the call is dropped before it settles.
struct AbortOnDrop(Option<AbortHandle>);

impl AbortOnDrop {
    fn disarm(mut self) {
        self.0 = None;
    }
}

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        if let Some(handle) = self.0.take() {
            handle.abort();
        }
    }
}

/// Encodes a body as JSON. `null` means no body.
fn json_payload<B: Serialize + ?Sized>(body: &B) -> std::result::Result<Payload, ServerError> {
    let value = serde_json::to_value(body)
        .map_err(|e| ServerError::network(format!("Failed to encode request body: {}", e)))?;

    Ok(match value {
        serde_json::Value::Null => Payload::Empty,
        value => Payload::Json(value),
    })
}

/// Sends the request and interprets the response.
async fn fetch(
    builder: RequestBuilder,
    signal: CancellationToken,
    prevent_auto_logout: bool,
    session: Option<Arc<dyn SessionHandler>>,
) -> std::result::Result<ApiResponse, ServerError> {
    let response = tokio::select! {
        sent = builder.send() => sent.map_err(|e| ServerError::network(error_chain(&e)))?,
        _ = signal.cancelled() => return Err(ServerError::aborted()),
    };

    let status = response.status().as_u16();
    let kind = ContentKind::classify(
        response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
    );

    if status == 401 {
        if prevent_auto_logout {
            return Ok(ApiResponse::Json(ResponseEnvelope::unauthorized()));
        }
        if let Some(handler) = session {
            handler.on_session_expired();
        }
        return Err(ServerError::unauthorized());
    }

    if is_error_status(status) {
        return Err(error_response(status, kind, response, &signal).await);
    }

    match kind {
        ContentKind::Json => {
            let body = read_json(response, &signal).await?;
            match body.get("code").and_then(body_code) {
                Some(code) if is_error_status(code) => Err(error_from_body(code, body)),
                _ => Ok(ApiResponse::Json(ResponseEnvelope::from_body(status, body))),
            }
        }
        ContentKind::OctetStream => Ok(ApiResponse::Stream(response)),
        ContentKind::Unhandled => Ok(ApiResponse::Empty),
    }
}

fn is_error_status(code: u16) -> bool {
    (300..=599).contains(&code)
}

/// Builds the structured error for a 3xx-5xx response.
async fn error_response(
    status: u16,
    kind: ContentKind,
    response: reqwest::Response,
    signal: &CancellationToken,
) -> ServerError {
    if kind != ContentKind::Json {
        let text = status_text(status).unwrap_or("Something went wrong");
        let message = format!("{}. Please try again.", text);
        return ServerError::single(status, message.clone(), message);
    }

    match read_json(response, signal).await {
        Ok(body) => error_from_body(status, body),
        Err(e) if e.is_request_aborted() => e,
        // Unreadable error bodies keep the server's status.
        Err(_) => ServerError::new(status, Vec::new()),
    }
}

/// Builds a structured error from a JSON body, using its `errors` verbatim
/// when present.
fn error_from_body(code: u16, mut body: serde_json::Value) -> ServerError {
    let errors = body
        .get_mut("errors")
        .map(serde_json::Value::take)
        .and_then(|errors| serde_json::from_value::<Vec<WireErrorEntry>>(errors).ok())
        .unwrap_or_default();

    ServerError::from_wire(code, errors)
}

async fn read_json(
    response: reqwest::Response,
    signal: &CancellationToken,
) -> std::result::Result<serde_json::Value, ServerError> {
    tokio::select! {
        body = response.json::<serde_json::Value>() => {
            body.map_err(|e| ServerError::network(error_chain(&e)))
        }
        _ = signal.cancelled() => Err(ServerError::aborted()),
    }
}

/// Formats an error with its sources, e.g.
/// "error sending request for url (...): client error (Connect): tcp connect error: Connection refused".
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
