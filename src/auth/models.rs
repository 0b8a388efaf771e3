//! Auth data models.

use jiff::Timestamp;

use crate::principals::{PrincipalSummary, PrincipalUuid};

/// Persisted renewal credential.
///
/// Created at login or by rotation; mutated exactly once, when the
/// revocation metadata is set; terminal after that.
#[derive(Debug, Clone)]
pub struct RefreshToken {
    /// Opaque credential value; globally unique, unguessable, primary key.
    pub token: String,

    /// Principal that owns this credential.
    pub principal_uuid: PrincipalUuid,

    pub issued_at: Timestamp,

    pub expires_at: Timestamp,

    pub created_by_ip: String,

    pub revoked: bool,

    pub revoked_at: Option<Timestamp>,

    pub revoked_by_ip: Option<String>,

    /// Set only by rotation; links to the successor in the chain.
    pub replaced_by_token: Option<String>,
}

impl RefreshToken {
    #[must_use]
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expires_at <= now
    }

    /// Active means neither revoked nor expired.
    #[must_use]
    pub fn is_active_at(&self, now: Timestamp) -> bool {
        !self.revoked && !self.is_expired_at(now)
    }
}

/// Persistence payload for a new renewal credential.
#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    pub token: String,
    pub principal_uuid: PrincipalUuid,
    pub issued_at: Timestamp,
    pub expires_at: Timestamp,
    pub created_by_ip: String,
}

/// Outcome of the revocation compare-and-swap.
#[derive(Debug, Clone)]
pub enum RevokeOutcome {
    /// This caller won the swap. When a replacement payload was supplied,
    /// the successor was created in the same transaction.
    Revoked { successor: Option<RefreshToken> },

    /// The record was missing, already revoked, or another caller got
    /// there first.
    AlreadyRevoked,
}

/// Successful login payload.
#[derive(Debug, Clone)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in_seconds: i64,
    pub principal: PrincipalSummary,
}

/// Successful refresh payload.
///
/// `refresh_token` carries the successor when rotation is enabled and
/// echoes the presented value unchanged when it is not.
#[derive(Debug, Clone)]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in_seconds: i64,
    pub rotated: bool,
}

/// Logout outcome. Logout is idempotent, so `revoked_count` may be zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogoutResponse {
    pub success: bool,
    pub revoked_count: u64,
}
