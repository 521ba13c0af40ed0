use std::fmt;

use rand::Rng;
use tracing::warn;

pub const MIN_TOKEN_LENGTH: usize = 16;
pub const DEV_TOKEN_PREFIX: &str = "dev_";
pub const TEST_TOKEN: &str = "test_key";

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Environment {
    Development,
    Test,
    Staging,
    Production,
}

impl Environment {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "development" => Some(Environment::Development),
            "test" => Some(Environment::Test),
            "staging" => Some(Environment::Staging),
            "production" => Some(Environment::Production),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Test => "test",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How to obtain a credential set when none was configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenFallback {
    /// No fallback: an empty set is a fatal startup error.
    None,
    /// Synthesize one random token with the `dev_` marker prefix.
    Generated,
    /// Use the fixed well-known token so automated tests need no secrets.
    WellKnown,
}

/// Environment-dependent validation strictness, resolved once so that the
/// config resolver and the auth gate consume the same thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationPolicy {
    pub min_token_length: usize,
    /// Short or missing tokens abort startup instead of degrading to a warning.
    pub strict: bool,
    pub fallback: TokenFallback,
}

pub fn resolve_policy(environment: Environment) -> ValidationPolicy {
    match environment {
        Environment::Production | Environment::Staging => ValidationPolicy {
            min_token_length: MIN_TOKEN_LENGTH,
            strict: true,
            fallback: TokenFallback::None,
        },
        Environment::Development => ValidationPolicy {
            min_token_length: MIN_TOKEN_LENGTH,
            strict: false,
            fallback: TokenFallback::Generated,
        },
        Environment::Test => ValidationPolicy {
            min_token_length: MIN_TOKEN_LENGTH,
            strict: false,
            fallback: TokenFallback::WellKnown,
        },
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no API authentication tokens configured in {0} environment")]
    MissingTokens(Environment),
    #[error("API token is too short (less than {MIN_TOKEN_LENGTH} characters): '{preview}...'")]
    TokenTooShort { preview: String },
    #[error("invalid {name} value '{value}'")]
    InvalidValue { name: &'static str, value: String },
}

/// Final, merged configuration used by the running process.
///
/// Merge order: CLI overrides > environment variables > defaults. Resolved
/// once at startup; immutable for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveConfig {
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub api_auth_tokens: Vec<String>,
    pub rate_limit_per_minute: u32,
}

/// CLI-supplied layer merged over environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub environment: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl EffectiveConfig {
    /// Resolve from process environment variables plus CLI overrides.
    ///
    /// In production/staging any failure here is fatal: the caller must not
    /// bind a listener. Outside those environments recoverable problems
    /// degrade to warnings and defaults.
    pub fn from_env(overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        let raw_environment = overrides
            .environment
            .clone()
            .or_else(|| std::env::var("ENVIRONMENT").ok());
        let environment = parse_environment(raw_environment.as_deref());
        let policy = resolve_policy(environment);

        let host = overrides
            .host
            .clone()
            .or_else(|| env_nonempty("HOST"))
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match overrides.port {
            Some(port) => port,
            None => parse_numeric("PORT", DEFAULT_PORT, policy.strict)?,
        };
        let log_level = env_nonempty("LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
        let rate_limit_per_minute = parse_numeric(
            "RATE_LIMIT_PER_MINUTE",
            DEFAULT_RATE_LIMIT_PER_MINUTE,
            policy.strict,
        )?;

        let configured = split_tokens(std::env::var("API_AUTH_TOKENS").ok().as_deref());
        let api_auth_tokens = resolve_tokens(configured, environment, &policy)?;

        Ok(Self {
            environment,
            host,
            port,
            log_level,
            api_auth_tokens,
            rate_limit_per_minute,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_environment(raw: Option<&str>) -> Environment {
    let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Environment::Development;
    };
    match Environment::parse(raw) {
        Some(environment) => environment,
        None => {
            warn!(value = %raw, "invalid ENVIRONMENT value, defaulting to development");
            Environment::Development
        }
    }
}

/// Validate the configured token set against the environment policy,
/// synthesizing a fallback credential where the policy allows one.
pub fn resolve_tokens(
    configured: Vec<String>,
    environment: Environment,
    policy: &ValidationPolicy,
) -> Result<Vec<String>, ConfigError> {
    let tokens = if configured.is_empty() {
        match policy.fallback {
            TokenFallback::None => return Err(ConfigError::MissingTokens(environment)),
            TokenFallback::Generated => {
                let token = generate_dev_token();
                warn!(
                    environment = %environment,
                    token = %token,
                    "no API tokens configured, using an auto-generated development token; \
                     this would not be allowed in production"
                );
                vec![token]
            }
            TokenFallback::WellKnown => {
                warn!(
                    environment = %environment,
                    "no API tokens configured, using the fixed test token; \
                     this would not be allowed in production"
                );
                vec![TEST_TOKEN.to_string()]
            }
        }
    } else {
        configured
    };

    for token in &tokens {
        if token.len() < policy.min_token_length {
            let preview: String = token.chars().take(10).collect();
            if policy.strict {
                return Err(ConfigError::TokenTooShort { preview });
            }
            warn!(
                token_prefix = %preview,
                "API token is shorter than {MIN_TOKEN_LENGTH} characters; \
                 this would be rejected in production"
            );
        }
    }

    Ok(tokens)
}

/// Split a comma-separated token list, dropping surrounding whitespace and
/// empty entries.
pub fn split_tokens(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

fn generate_dev_token() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";
    let mut rng = rand::rng();
    let suffix: String = (0..22)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect();
    format!("{DEV_TOKEN_PREFIX}{suffix}")
}

fn parse_numeric<T>(name: &'static str, default: T, strict: bool) -> Result<T, ConfigError>
where
    T: std::str::FromStr + Copy,
{
    let Some(raw) = env_nonempty(name) else {
        return Ok(default);
    };
    match raw.parse::<T>() {
        Ok(value) => Ok(value),
        Err(_) if strict => Err(ConfigError::InvalidValue { name, value: raw }),
        Err(_) => {
            warn!(name, value = %raw, "unparseable numeric config value, using default");
            Ok(default)
        }
    }
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_is_strict_only_in_production_and_staging() {
        assert!(resolve_policy(Environment::Production).strict);
        assert!(resolve_policy(Environment::Staging).strict);
        assert!(!resolve_policy(Environment::Development).strict);
        assert!(!resolve_policy(Environment::Test).strict);
    }

    #[test]
    fn missing_tokens_are_fatal_in_strict_environments() {
        let policy = resolve_policy(Environment::Production);
        let err = resolve_tokens(Vec::new(), Environment::Production, &policy).unwrap_err();
        assert!(matches!(err, ConfigError::MissingTokens(Environment::Production)));
    }

    #[test]
    fn development_synthesizes_a_marked_token() {
        let policy = resolve_policy(Environment::Development);
        let tokens = resolve_tokens(Vec::new(), Environment::Development, &policy).unwrap();
        assert_eq!(tokens.len(), 1);
        assert!(tokens[0].starts_with(DEV_TOKEN_PREFIX));
        assert!(tokens[0].len() >= MIN_TOKEN_LENGTH);
    }

    #[test]
    fn test_environment_uses_the_well_known_token() {
        let policy = resolve_policy(Environment::Test);
        let tokens = resolve_tokens(Vec::new(), Environment::Test, &policy).unwrap();
        assert_eq!(tokens, vec![TEST_TOKEN.to_string()]);
    }

    #[test]
    fn short_token_is_fatal_only_when_strict() {
        let short = vec!["tiny".to_string()];

        let strict = resolve_policy(Environment::Staging);
        let err = resolve_tokens(short.clone(), Environment::Staging, &strict).unwrap_err();
        assert!(matches!(err, ConfigError::TokenTooShort { .. }));

        let lax = resolve_policy(Environment::Development);
        let tokens = resolve_tokens(short, Environment::Development, &lax).unwrap();
        assert_eq!(tokens, vec!["tiny".to_string()]);
    }

    #[test]
    fn long_enough_tokens_pass_everywhere() {
        let tokens = vec!["0123456789abcdef".to_string()];
        let policy = resolve_policy(Environment::Production);
        let resolved = resolve_tokens(tokens.clone(), Environment::Production, &policy).unwrap();
        assert_eq!(resolved, tokens);
    }

    #[test]
    fn token_list_splitting_trims_and_drops_empties() {
        let tokens = split_tokens(Some(" alpha-0123456789 , ,beta-0123456789,"));
        assert_eq!(tokens, vec!["alpha-0123456789", "beta-0123456789"]);
        assert!(split_tokens(None).is_empty());
    }

    #[test]
    fn environment_parsing_is_case_insensitive() {
        assert_eq!(Environment::parse(" Production "), Some(Environment::Production));
        assert_eq!(Environment::parse("TEST"), Some(Environment::Test));
        assert_eq!(Environment::parse("qa"), None);
    }
}
