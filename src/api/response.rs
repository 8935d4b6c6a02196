//! API response lines
//!
//! `{"status":"ok","data":...}` or
//! `{"status":"error","code":"...","message":"..."}`.

use serde::Serialize;
use serde_json::Value;

use super::errors::ApiError;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Response {
    Ok { data: Value },
    Error { code: String, message: String },
}

impl Response {
    pub fn success(data: Value) -> Self {
        Response::Ok { data }
    }

    pub fn error(err: &ApiError) -> Self {
        Response::Error {
            code: err.code().to_string(),
            message: err.message().to_string(),
        }
    }

    pub fn to_json(&self) -> String {
        // Only strings and already-encoded values inside; cannot fail.
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"status":"error","code":"PALIMPSEST_ENCODING_FAILED","message":"response encoding failed"}"#
                .to_string()
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Response::Ok { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_shape() {
        let parsed: Value = serde_json::from_str(&Response::success(json!({"version": 2})).to_json()).unwrap();
        assert_eq!(parsed, json!({"status": "ok", "data": {"version": 2}}));
    }

    #[test]
    fn test_error_shape() {
        let resp = Response::error(&ApiError::invalid_request("bad"));
        assert!(!resp.is_success());
        let parsed: Value = serde_json::from_str(&resp.to_json()).unwrap();
        assert_eq!(
            parsed,
            json!({"status": "error", "code": "PALIMPSEST_INVALID_REQUEST", "message": "bad"})
        );
    }
}
