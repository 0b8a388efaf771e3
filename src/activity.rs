//! Best-effort activity logging.
//!
//! Auth flows record lifecycle events here on a fire-and-forget basis; a
//! failed activity write never aborts the flow that produced it.

use async_trait::async_trait;
use mockall::automock;
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::principals::PrincipalUuid;

/// Auth lifecycle events worth an activity record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityEvent {
    Login,
    Refresh,
    Logout,
    /// A revoked or rotated renewal credential was presented again.
    TokenReuse,
    SessionsInvalidated,
}

impl ActivityEvent {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Refresh => "refresh",
            Self::Logout => "logout",
            Self::TokenReuse => "token_reuse",
            Self::SessionsInvalidated => "sessions_invalidated",
        }
    }
}

/// Opaque failure from the activity sink.
#[derive(Debug, Error)]
#[error("activity log error: {message}")]
pub struct ActivityError {
    pub message: String,
}

/// Activity sink consumed by the auth engine.
#[automock]
#[async_trait]
pub trait ActivityLog: Send + Sync {
    async fn record(
        &self,
        principal: PrincipalUuid,
        event: ActivityEvent,
        metadata: Value,
        origin_ip: &str,
    ) -> Result<(), ActivityError>;
}

/// Activity sink that emits structured tracing events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingActivityLog;

#[async_trait]
impl ActivityLog for TracingActivityLog {
    async fn record(
        &self,
        principal: PrincipalUuid,
        event: ActivityEvent,
        metadata: Value,
        origin_ip: &str,
    ) -> Result<(), ActivityError> {
        info!(
            target: "arbor_auth::activity",
            %principal,
            event = event.as_str(),
            %metadata,
            origin_ip,
            "activity"
        );

        Ok(())
    }
}
