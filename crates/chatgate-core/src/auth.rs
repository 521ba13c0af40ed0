use std::collections::HashSet;
use std::fmt;

use tracing::warn;

use crate::error::ApiError;

/// An opaque bearer token authorizing API use. Compared, never mutated;
/// Debug output is redacted so credentials cannot leak into logs.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Validates the `Authorization` header of protected requests against the
/// process-wide credential set. The set is loaded once at startup and
/// read-only thereafter, so lookups need no synchronization.
#[derive(Debug)]
pub struct AuthGate {
    tokens: HashSet<String>,
}

impl AuthGate {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    /// Pure lookup: returns the matched credential or the 401-mapped error.
    pub fn authenticate(&self, header: Option<&str>) -> Result<Credential, ApiError> {
        let Some(header) = header.map(str::trim).filter(|value| !value.is_empty()) else {
            warn!("missing authorization header");
            return Err(ApiError::missing_api_key());
        };

        let prefix = "Bearer ";
        if header.len() <= prefix.len() || !header[..prefix.len()].eq_ignore_ascii_case(prefix) {
            warn!("invalid authorization header format");
            return Err(ApiError::invalid_auth_format());
        }

        let token = header[prefix.len()..].trim();
        if token.is_empty() {
            warn!("invalid authorization header format");
            return Err(ApiError::invalid_auth_format());
        }

        if !self.tokens.contains(token) {
            warn!("invalid api key provided");
            return Err(ApiError::invalid_api_key());
        }

        Ok(Credential::new(token))
    }
}
