//! Auth service errors.

use thiserror::Error;

use crate::principals::DirectoryError;

/// Failure modes of the auth engine.
///
/// `Unauthorized` deliberately renders one generic message: unknown
/// identifiers, wrong secrets, inactive principals, and dead renewal
/// credentials are indistinguishable to callers, so account existence
/// cannot be probed.
#[derive(Debug, Error)]
pub enum AuthServiceError {
    #[error("invalid credentials")]
    Unauthorized,

    #[error("invalid request: {reason}")]
    Validation { reason: &'static str },

    #[error("storage error")]
    Storage(#[from] TokenStoreError),

    #[error("principal directory error")]
    Directory(#[source] DirectoryError),

    #[error("signing error")]
    Signing(#[from] SigningError),

    #[error("timestamp arithmetic failed")]
    Time(#[source] jiff::Error),
}

/// Renewal-credential store failures.
#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error("storage error")]
    Sql(#[from] sqlx::Error),

    /// Exhausted regeneration attempts on a token-value collision.
    #[error("token value collided {attempts} times in a row")]
    Collision { attempts: u32 },
}

/// Access-credential signing failures. Surfacing at startup (bad key) is
/// fatal; nothing swallows these.
#[derive(Debug, Error)]
pub enum SigningError {
    #[error("signing key is absent or empty")]
    MissingKey,

    #[error("failed to sign access token")]
    Encode(#[source] jsonwebtoken::errors::Error),
}

/// Access-credential verification failures, kept distinct so callers can
/// log tampering separately from routine expiry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccessTokenError {
    #[error("access token is malformed")]
    Malformed,

    #[error("access token signature is invalid")]
    InvalidSignature,

    #[error("access token is expired")]
    Expired,
}
