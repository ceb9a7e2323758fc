//! Response types and content classification.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::client::status::status_text;
use crate::error::ServerError;

/// How a response body is handled, decided from its `Content-Type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// `application/json`
    Json,
    /// `application/octet-stream` or `octet-stream`
    OctetStream,
    /// Anything else, including a missing header.
    Unhandled,
}

impl ContentKind {
    /// Classifies a `Content-Type` header value by its MIME essence.
    pub fn classify(content_type: Option<&str>) -> Self {
        let Some(value) = content_type else {
            return ContentKind::Unhandled;
        };

        let essence = value.split(';').next().unwrap_or_default().trim();
        if essence.eq_ignore_ascii_case("application/json") {
            ContentKind::Json
        } else if essence.eq_ignore_ascii_case("application/octet-stream")
            || essence.eq_ignore_ascii_case("octet-stream")
        {
            ContentKind::OctetStream
        } else {
            ContentKind::Unhandled
        }
    }
}

/// Normalized success body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Status code reported by the body.
    pub code: u16,
    /// Status description.
    pub status: String,
    /// Payload.
    pub result: serde_json::Value,
    /// The decoded body as the server sent it, including fields beyond
    /// `code`/`status`/`result`.
    #[serde(skip)]
    pub body: serde_json::Value,
}

impl ResponseEnvelope {
    /// The envelope returned for a 401 when auto-logout is disabled.
    pub fn unauthorized() -> Self {
        Self {
            code: 401,
            status: "Unauthorized".to_string(),
            result: serde_json::Value::Array(Vec::new()),
            body: serde_json::json!({"code": 401, "status": "Unauthorized", "result": []}),
        }
    }

    /// Builds an envelope from a decoded JSON body.
    ///
    /// Missing `code`/`status` fall back to the HTTP status; a body with no
    /// `result` key is used as the result whole. The body itself is kept
    /// verbatim in [`ResponseEnvelope::body`].
    pub fn from_body(http_status: u16, body: serde_json::Value) -> Self {
        let code = body
            .get("code")
            .and_then(body_code)
            .unwrap_or(http_status);
        let status = body
            .get("status")
            .and_then(|s| s.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| status_text(code).unwrap_or_default().to_string());

        let result = match &body {
            serde_json::Value::Object(map) => map
                .get("result")
                .cloned()
                .unwrap_or_else(|| body.clone()),
            other => other.clone(),
        };

        Self {
            code,
            status,
            result,
            body,
        }
    }

    /// Decodes the result into a concrete type.
    pub fn result_as<T: DeserializeOwned>(&self) -> Result<T, ServerError> {
        T::deserialize(&self.result)
            .map_err(|e| ServerError::network(format!("Failed to decode result: {}", e)))
    }
}

/// Reads a numeric or numeric-string `code` field.
pub(crate) fn body_code(value: &serde_json::Value) -> Option<u16> {
    match value {
        serde_json::Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Outcome of a successful API call.
#[derive(Debug)]
pub enum ApiResponse {
    /// JSON body normalized into an envelope.
    Json(ResponseEnvelope),
    /// Binary body; the caller consumes the stream.
    Stream(reqwest::Response),
    /// Content type not handled; nothing to return.
    Empty,
}

impl ApiResponse {
    /// Returns the envelope, if any.
    pub fn envelope(&self) -> Option<&ResponseEnvelope> {
        match self {
            ApiResponse::Json(envelope) => Some(envelope),
            _ => None,
        }
    }

    /// Consumes the response, returning the envelope if any.
    pub fn into_envelope(self) -> Option<ResponseEnvelope> {
        match self {
            ApiResponse::Json(envelope) => Some(envelope),
            _ => None,
        }
    }

    /// Consumes the response, returning the raw stream if any.
    pub fn into_stream(self) -> Option<reqwest::Response> {
        match self {
            ApiResponse::Stream(response) => Some(response),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_content_type() {
        assert_eq!(ContentKind::classify(Some("application/json")), ContentKind::Json);
        assert_eq!(
            ContentKind::classify(Some("application/json; charset=utf-8")),
            ContentKind::Json
        );
        assert_eq!(ContentKind::classify(Some("Application/JSON")), ContentKind::Json);
        assert_eq!(
            ContentKind::classify(Some("application/octet-stream")),
            ContentKind::OctetStream
        );
        assert_eq!(ContentKind::classify(Some("octet-stream")), ContentKind::OctetStream);
        assert_eq!(ContentKind::classify(Some("text/html")), ContentKind::Unhandled);
        assert_eq!(ContentKind::classify(None), ContentKind::Unhandled);
    }

    #[test]
    fn test_envelope_from_full_body() {
        let body = json!({"code": 201, "status": "Created", "result": {"id": 1}});
        let envelope = ResponseEnvelope::from_body(201, body);

        assert_eq!(envelope.code, 201);
        assert_eq!(envelope.status, "Created");
        assert_eq!(envelope.result, json!({"id": 1}));
    }

    #[test]
    fn test_envelope_keeps_extra_fields() {
        let body = json!({
            "code": 200,
            "status": "OK",
            "result": {"id": 1},
            "pagination": {"page": 2, "total": 40}
        });
        let envelope = ResponseEnvelope::from_body(200, body.clone());

        assert_eq!(envelope.result, json!({"id": 1}));
        assert_eq!(envelope.body, body);
        assert_eq!(envelope.body["pagination"]["total"], json!(40));

        // serialized form stays {code, status, result}
        let serialized = serde_json::to_value(&envelope).unwrap();
        assert!(serialized.get("pagination").is_none());
        assert!(serialized.get("body").is_none());
    }

    #[test]
    fn test_envelope_from_bare_body() {
        let envelope = ResponseEnvelope::from_body(200, json!([1, 2, 3]));

        assert_eq!(envelope.code, 200);
        assert_eq!(envelope.status, "OK");
        assert_eq!(envelope.result, json!([1, 2, 3]));
        assert_eq!(envelope.body, json!([1, 2, 3]));
    }

    #[test]
    fn test_unauthorized_envelope() {
        let envelope = ResponseEnvelope::unauthorized();
        assert_eq!(envelope.code, 401);
        assert_eq!(envelope.status, "Unauthorized");
        assert_eq!(envelope.result, json!([]));
    }

    #[test]
    fn test_result_as() {
        #[derive(Deserialize)]
        struct Item {
            id: u32,
        }

        let envelope = ResponseEnvelope::from_body(200, json!({"code": 200, "result": {"id": 7}}));
        let item: Item = envelope.result_as().unwrap();
        assert_eq!(item.id, 7);

        let err = envelope.result_as::<Vec<String>>().unwrap_err();
        assert_eq!(err.code, 0);
    }

    #[test]
    fn test_body_code() {
        assert_eq!(body_code(&json!(500)), Some(500));
        assert_eq!(body_code(&json!("404")), Some(404));
        assert_eq!(body_code(&json!("nope")), None);
        assert_eq!(body_code(&json!(null)), None);
    }
}
