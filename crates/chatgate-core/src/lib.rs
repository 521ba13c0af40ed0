pub mod auth;
pub mod backend;
pub mod catalog;
pub mod config;
pub mod error;
pub mod rate_limit;

pub use auth::{AuthGate, Credential};
pub use backend::{Backend, BackendError, ChunkStream, MockBackend};
pub use catalog::ModelCatalog;
pub use config::{
    ConfigError, ConfigOverrides, EffectiveConfig, Environment, TokenFallback, ValidationPolicy,
    resolve_policy,
};
pub use error::ApiError;
pub use rate_limit::RateLimiter;
