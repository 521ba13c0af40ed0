use http::StatusCode;

use chatgate_protocol::openai::error::{ErrorEnvelope, ErrorType};

use crate::backend::BackendError;

/// Every failure surfaced to a client, one-to-one with a status code and an
/// OpenAI error envelope. Mapped exactly once, at the handler boundary.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{message}")]
    Auth {
        message: &'static str,
        code: &'static str,
    },
    #[error("{message}")]
    Validation {
        message: String,
        param: Option<String>,
    },
    #[error("model '{model}' not found")]
    ModelNotFound { model: String },
    #[error("rate limit exceeded, retry in {retry_after}s")]
    RateLimited { retry_after: u64 },
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("unexpected internal error")]
    Internal,
}

impl ApiError {
    pub fn missing_api_key() -> Self {
        ApiError::Auth {
            message: "Missing API key. Please provide a valid API key in the Authorization \
                      header using the Bearer scheme.",
            code: "missing_api_key",
        }
    }

    pub fn invalid_auth_format() -> Self {
        ApiError::Auth {
            message: "Invalid authentication format. Please use 'Bearer YOUR_API_KEY'.",
            code: "invalid_auth_format",
        }
    }

    pub fn invalid_api_key() -> Self {
        ApiError::Auth {
            message: "Invalid API key. Please provide a valid API key in the Authorization \
                      header using the Bearer scheme.",
            code: "invalid_api_key",
        }
    }

    pub fn validation(message: impl Into<String>, param: Option<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            param,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Auth { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::ModelNotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Backend(err) => err
                .upstream_status()
                .and_then(|status| StatusCode::from_u16(status).ok())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Seconds until the current rate window resets, for `Retry-After`.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            ApiError::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        match self {
            ApiError::Auth { message, code } => {
                ErrorEnvelope::new(ErrorType::AuthenticationError, *message).with_code(*code)
            }
            ApiError::Validation { message, param } => {
                let envelope = ErrorEnvelope::new(ErrorType::InvalidRequestError, message.clone())
                    .with_code("validation_error");
                match param {
                    Some(param) => envelope.with_param(param.clone()),
                    None => envelope,
                }
            }
            ApiError::ModelNotFound { model } => {
                ErrorEnvelope::new(ErrorType::InvalidRequestError, format!("Model '{model}' not found"))
                    .with_param("model_id")
                    .with_code("model_not_found")
            }
            ApiError::RateLimited { retry_after } => ErrorEnvelope::new(
                ErrorType::RateLimitError,
                format!("Rate limit exceeded. Please retry after {retry_after} seconds."),
            )
            .with_code("rate_limit_exceeded"),
            ApiError::Backend(err) => {
                ErrorEnvelope::new(ErrorType::ApiError, err.to_string()).with_code("backend_error")
            }
            ApiError::Internal => ErrorEnvelope::new(
                ErrorType::ApiError,
                "An unexpected error occurred. Please try again later.",
            )
            .with_code("internal_server_error"),
        }
    }
}
