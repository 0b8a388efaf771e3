//! Runtime configuration.
//!
//! Loaded once at process start and injected into the issuer and engine
//! constructors; nothing reads the environment mid-request.

use std::{env, fmt};

use jiff::SignedDuration;
use thiserror::Error;
use zeroize::Zeroize;

/// Default lifetime of a signed access credential.
pub const DEFAULT_ACCESS_TOKEN_TTL: SignedDuration = SignedDuration::from_mins(15);

/// Default lifetime of a renewal credential.
pub const DEFAULT_REFRESH_TOKEN_TTL: SignedDuration = SignedDuration::from_hours(24 * 7);

/// Development-only signing secret shipped as the default. Production
/// startup refuses to proceed while this value is still in place.
pub const PLACEHOLDER_SIGNING_SECRET: &str = "change-me-arbor-signing-secret";

const ACCESS_TOKEN_TTL_VAR: &str = "ACCESS_TOKEN_TTL";
const REFRESH_TOKEN_TTL_VAR: &str = "REFRESH_TOKEN_TTL";
const ROTATION_ENABLED_VAR: &str = "REFRESH_ROTATION_ENABLED";
const SIGNING_SECRET_VAR: &str = "SIGNING_SECRET";
const APP_ENV_VAR: &str = "APP_ENV";

/// Deployment environment the process runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(ConfigError::UnknownEnvironment {
                value: other.to_string(),
            }),
        }
    }
}

/// HMAC secret used to sign access credentials.
///
/// Zeroed on drop and redacted from `Debug` output.
#[derive(Clone)]
pub struct SigningSecret(String);

impl SigningSecret {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.0 == PLACEHOLDER_SIGNING_SECRET
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningSecret(**redacted**)")
    }
}

impl Drop for SigningSecret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Typed auth configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub access_token_ttl: SignedDuration,
    pub refresh_token_ttl: SignedDuration,
    pub rotation_enabled: bool,
    pub signing_secret: SigningSecret,
    pub environment: Environment,
}

impl AuthConfig {
    /// Load configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error when a duration or boolean fails to parse, when the
    /// environment name is unknown, or when validation rejects the secret.
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = match env::var(APP_ENV_VAR).ok() {
            Some(value) => Environment::parse(&value)?,
            None => Environment::Development,
        };

        let access_token_ttl = match env::var(ACCESS_TOKEN_TTL_VAR).ok() {
            Some(value) => parse_duration(ACCESS_TOKEN_TTL_VAR, &value)?,
            None => DEFAULT_ACCESS_TOKEN_TTL,
        };

        let refresh_token_ttl = match env::var(REFRESH_TOKEN_TTL_VAR).ok() {
            Some(value) => parse_duration(REFRESH_TOKEN_TTL_VAR, &value)?,
            None => DEFAULT_REFRESH_TOKEN_TTL,
        };

        let rotation_enabled = match env::var(ROTATION_ENABLED_VAR).ok() {
            Some(value) => parse_bool(ROTATION_ENABLED_VAR, &value)?,
            None => false,
        };

        let signing_secret = match env::var(SIGNING_SECRET_VAR).ok() {
            Some(value) => SigningSecret::new(value),
            None => SigningSecret::new(PLACEHOLDER_SIGNING_SECRET),
        };

        let config = Self {
            access_token_ttl,
            refresh_token_ttl,
            rotation_enabled,
            signing_secret,
            environment,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error for non-positive lifetimes, an empty secret, or the
    /// placeholder secret in production.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.access_token_ttl.is_zero() || self.access_token_ttl.is_negative() {
            return Err(ConfigError::NonPositiveDuration {
                name: ACCESS_TOKEN_TTL_VAR,
            });
        }

        if self.refresh_token_ttl.is_zero() || self.refresh_token_ttl.is_negative() {
            return Err(ConfigError::NonPositiveDuration {
                name: REFRESH_TOKEN_TTL_VAR,
            });
        }

        if self.signing_secret.is_empty() {
            return Err(ConfigError::EmptySecret);
        }

        if self.environment == Environment::Production && self.signing_secret.is_placeholder() {
            return Err(ConfigError::PlaceholderSecret);
        }

        Ok(())
    }
}

/// Parse a duration of the form `<integer><unit>` where the unit is one of
/// `s`, `m`, `h`, `d`.
///
/// Bare numbers and unknown units are rejected rather than defaulted.
///
/// # Errors
///
/// Returns an error when the count or unit fails to parse, or the product
/// overflows.
pub fn parse_duration(name: &'static str, value: &str) -> Result<SignedDuration, ConfigError> {
    let trimmed = value.trim();

    let unit_start = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .ok_or(ConfigError::InvalidDuration {
            name,
            value: value.to_string(),
            reason: "missing unit suffix",
        })?;

    let (count, unit) = trimmed.split_at(unit_start);

    let count: i64 = count.parse().map_err(|_| ConfigError::InvalidDuration {
        name,
        value: value.to_string(),
        reason: "missing or invalid count",
    })?;

    let unit_seconds = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        "d" => 86_400,
        _ => {
            return Err(ConfigError::InvalidDuration {
                name,
                value: value.to_string(),
                reason: "unknown unit",
            });
        }
    };

    let seconds = count
        .checked_mul(unit_seconds)
        .ok_or(ConfigError::InvalidDuration {
            name,
            value: value.to_string(),
            reason: "duration overflows",
        })?;

    Ok(SignedDuration::from_secs(seconds))
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            name,
            value: value.to_string(),
        }),
    }
}

/// Configuration errors; fatal at process startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid duration '{value}' for {name}: {reason}")]
    InvalidDuration {
        name: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("{name} must be a positive duration")]
    NonPositiveDuration { name: &'static str },

    #[error("invalid boolean '{value}' for {name}")]
    InvalidBool { name: &'static str, value: String },

    #[error("unknown environment '{value}'")]
    UnknownEnvironment { value: String },

    #[error("SIGNING_SECRET must not be empty")]
    EmptySecret,

    #[error("SIGNING_SECRET is still the placeholder default; refusing to run in production")]
    PlaceholderSecret,
}
