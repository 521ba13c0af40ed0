use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorType {
    /// 401
    #[serde(rename = "authentication_error")]
    AuthenticationError,
    /// 404 / 422
    #[serde(rename = "invalid_request_error")]
    InvalidRequestError,
    /// 429
    #[serde(rename = "rate_limit_error")]
    RateLimitError,
    /// 5xx
    #[serde(rename = "api_error")]
    ApiError,
}

/// `param` and `code` are serialized as explicit `null` when unset; OpenAI's
/// envelope always carries all four fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub r#type: ErrorType,
    pub param: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ErrorEnvelope {
    pub error: ErrorDetail,
}

impl ErrorEnvelope {
    pub fn new(r#type: ErrorType, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                message: message.into(),
                r#type,
                param: None,
                code: None,
            },
        }
    }

    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.error.param = Some(param.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.error.code = Some(code.into());
        self
    }
}
