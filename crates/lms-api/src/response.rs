//! Response envelope shared by every endpoint.
//!
//! One discriminated shape instead of ad-hoc per-handler JSON:
//! `{"ok": true, "payload": ...}` on success, and
//! `{"ok": false, "error_kind": ..., "message": ...}` on failure, with the
//! HTTP status mirroring the `ok` flag.

use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Client-actionable error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unauthorized,
    Forbidden,
    NotFound,
    BadRequest,
    Validation,
    Conflict,
    RateLimited,
    Internal,
}

/// Success envelope.
#[derive(Debug, Serialize)]
pub struct OkEnvelope<T> {
    pub ok: bool,
    pub payload: T,
}

/// Failure envelope.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub ok: bool,
    pub error_kind: ErrorKind,
    pub message: String,
}

impl ErrorEnvelope {
    pub fn new(error_kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            error_kind,
            message: message.into(),
        }
    }
}

/// Wrap a payload in the success envelope.
pub fn ok<T: Serialize>(payload: T) -> ApiOk<T> {
    ApiOk(payload)
}

/// Success response: serializes as the `ok: true` envelope.
pub struct ApiOk<T>(pub T);

impl<T: Serialize> IntoResponse for ApiOk<T> {
    fn into_response(self) -> Response {
        Json(OkEnvelope {
            ok: true,
            payload: self.0,
        })
        .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_shape() {
        let body = serde_json::to_value(OkEnvelope {
            ok: true,
            payload: serde_json::json!({"n": 1}),
        })
        .unwrap();
        assert_eq!(body["ok"], true);
        assert_eq!(body["payload"]["n"], 1);
    }

    #[test]
    fn error_envelope_shape() {
        let body =
            serde_json::to_value(ErrorEnvelope::new(ErrorKind::Conflict, "already reviewed"))
                .unwrap();
        assert_eq!(body["ok"], false);
        assert_eq!(body["error_kind"], "conflict");
        assert_eq!(body["message"], "already reviewed");
    }
}
