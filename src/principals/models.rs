//! Principal data models.

use crate::uuids::TypedUuid;

/// Principal UUID
pub type PrincipalUuid = TypedUuid<Principal>;

/// Directory record for an authenticated entity. Owned and maintained by
/// the external directory; referenced here by uuid only.
#[derive(Debug, Clone)]
pub struct Principal {
    pub uuid: PrincipalUuid,
    pub status: PrincipalStatus,
    pub role: String,
    pub secret_hash: String,
}

/// Account lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrincipalStatus {
    Active,
    Inactive,
    Suspended,
    Deleted,
}

impl PrincipalStatus {
    /// Only active principals may hold live sessions.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Caller-facing principal summary returned by login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalSummary {
    pub uuid: PrincipalUuid,
    pub role: String,
}

/// Request-scoped identity derived from a verified access credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    pub principal_uuid: PrincipalUuid,
    pub role: String,
}
