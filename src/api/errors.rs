//! API error types
//!
//! Error codes added by this layer:
//! - PALIMPSEST_INVALID_REQUEST (ERROR)
//! - PALIMPSEST_ENCODING_FAILED (ERROR)
//!
//! Every other code passes through unchanged from the operation that
//! failed.

use std::fmt;

use crate::errors::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCode {
    InvalidRequest,
    EncodingFailed,
}

impl ApiErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            ApiErrorCode::InvalidRequest => "PALIMPSEST_INVALID_REQUEST",
            ApiErrorCode::EncodingFailed => "PALIMPSEST_ENCODING_FAILED",
        }
    }
}

/// API error with the failing subsystem's code preserved
#[derive(Debug)]
pub struct ApiError {
    code: String,
    message: String,
    fatal: bool,
}

impl ApiError {
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self {
            code: ApiErrorCode::InvalidRequest.code().to_string(),
            message: reason.into(),
            fatal: false,
        }
    }

    pub fn encoding_failed(reason: impl Into<String>) -> Self {
        Self {
            code: ApiErrorCode::EncodingFailed.code().to_string(),
            message: reason.into(),
            fatal: false,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_fatal(&self) -> bool {
        self.fatal
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
            fatal: err.is_fatal(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::EntityId;

    #[test]
    fn test_invalid_request_error() {
        let err = ApiError::invalid_request("missing field");
        assert_eq!(err.code(), "PALIMPSEST_INVALID_REQUEST");
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_service_error_code_passes_through() {
        let id = EntityId::new();
        let err = ApiError::from(ServiceError::EntityNotFound(id));
        assert_eq!(err.code(), "PALIMPSEST_ENTITY_NOT_FOUND");
        assert!(err.message().contains(&id.to_string()));
    }
}
