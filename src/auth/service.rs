//! Auth service: the credential rotation engine.

use std::sync::Arc;

use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};
use mockall::automock;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::{
    activity::{ActivityEvent, ActivityLog},
    auth::{
        errors::{AuthServiceError, SigningError},
        models::{LoginResponse, LogoutResponse, NewRefreshToken, RefreshResponse, RevokeOutcome},
        repository::RefreshTokenStore,
        token::{AccessTokenIssuer, generate_refresh_value},
    },
    clock::Clock,
    config::AuthConfig,
    principals::{PrincipalDirectory, PrincipalSummary, PrincipalUuid, SecretVerifier},
};

/// Session lifecycle operations consumed by the transport layer.
#[automock]
#[async_trait]
pub trait AuthService: Send + Sync {
    async fn login(
        &self,
        identifier: &str,
        secret: &str,
        origin_ip: &str,
    ) -> Result<LoginResponse, AuthServiceError>;

    async fn refresh(
        &self,
        refresh_token: &str,
        origin_ip: &str,
    ) -> Result<RefreshResponse, AuthServiceError>;

    async fn logout<'a>(
        &self,
        principal: PrincipalUuid,
        refresh_token: Option<&'a str>,
        origin_ip: &str,
    ) -> Result<LogoutResponse, AuthServiceError>;

    /// Post-password-change hook. Deletes every renewal credential of the
    /// principal so no session outlives a secret change.
    async fn invalidate_principal_sessions(
        &self,
        principal: PrincipalUuid,
        origin_ip: &str,
    ) -> Result<u64, AuthServiceError>;
}

/// Orchestrates login, refresh, and logout against the store and issuer.
///
/// Holds no cross-request mutable state; rotation race-safety comes from
/// the store's compare-and-swap, and revoke-plus-successor is one store
/// transaction, so a canceled refresh cannot orphan a chain.
pub struct AuthEngine {
    store: Arc<dyn RefreshTokenStore>,
    directory: Arc<dyn PrincipalDirectory>,
    secrets: Arc<dyn SecretVerifier>,
    activity: Arc<dyn ActivityLog>,
    clock: Arc<dyn Clock>,
    issuer: AccessTokenIssuer,
    refresh_ttl: SignedDuration,
    rotation_enabled: bool,
}

impl AuthEngine {
    /// Build the engine from validated configuration and its collaborators.
    ///
    /// # Errors
    ///
    /// Returns an error when the signing key cannot be loaded.
    pub fn new(
        config: &AuthConfig,
        store: Arc<dyn RefreshTokenStore>,
        directory: Arc<dyn PrincipalDirectory>,
        secrets: Arc<dyn SecretVerifier>,
        activity: Arc<dyn ActivityLog>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SigningError> {
        Ok(Self {
            issuer: AccessTokenIssuer::new(&config.signing_secret, config.access_token_ttl)?,
            store,
            directory,
            secrets,
            activity,
            clock,
            refresh_ttl: config.refresh_token_ttl,
            rotation_enabled: config.rotation_enabled,
        })
    }

    fn refresh_expiry(&self, now: Timestamp) -> Result<Timestamp, AuthServiceError> {
        now.checked_add(self.refresh_ttl)
            .map_err(AuthServiceError::Time)
    }

    fn new_refresh_payload(
        &self,
        principal: PrincipalUuid,
        now: Timestamp,
        origin_ip: &str,
    ) -> Result<NewRefreshToken, AuthServiceError> {
        Ok(NewRefreshToken {
            token: generate_refresh_value(),
            principal_uuid: principal,
            issued_at: now,
            expires_at: self.refresh_expiry(now)?,
            created_by_ip: origin_ip.to_string(),
        })
    }

    async fn record_activity(
        &self,
        principal: PrincipalUuid,
        event: ActivityEvent,
        metadata: serde_json::Value,
        origin_ip: &str,
    ) {
        if let Err(error) = self
            .activity
            .record(principal, event, metadata, origin_ip)
            .await
        {
            debug!(%error, event = event.as_str(), "activity record failed");
        }
    }
}

#[async_trait]
impl AuthService for AuthEngine {
    #[tracing::instrument(
        name = "auth.service.login",
        skip_all,
        fields(origin_ip = %origin_ip),
        err
    )]
    async fn login(
        &self,
        identifier: &str,
        secret: &str,
        origin_ip: &str,
    ) -> Result<LoginResponse, AuthServiceError> {
        if identifier.trim().is_empty() || secret.is_empty() {
            return Err(AuthServiceError::Validation {
                reason: "identifier and secret are required",
            });
        }

        let principal = self
            .directory
            .find_by_login_identifier(identifier)
            .await
            .map_err(AuthServiceError::Directory)?;

        // Unknown identifier, wrong secret, and inactive account collapse
        // into one indistinguishable failure.
        let Some(principal) = principal else {
            return Err(AuthServiceError::Unauthorized);
        };

        if !self.secrets.verify(secret, &principal.secret_hash) {
            return Err(AuthServiceError::Unauthorized);
        }

        if !principal.status.is_active() {
            return Err(AuthServiceError::Unauthorized);
        }

        let now = self.clock.now();
        let access = self.issuer.issue(principal.uuid, &principal.role, now)?;

        let record = self
            .store
            .create(self.new_refresh_payload(principal.uuid, now, origin_ip)?)
            .await?;

        // Bookkeeping is best-effort; a failed write never fails a login.
        if let Err(error) = self.directory.update_last_login(principal.uuid, now).await {
            debug!(%error, "failed to update last login");
        }

        self.record_activity(
            principal.uuid,
            ActivityEvent::Login,
            json!({ "identifier": identifier }),
            origin_ip,
        )
        .await;

        info!(principal = %principal.uuid, "principal logged in");

        Ok(LoginResponse {
            access_token: access.token,
            refresh_token: record.token,
            expires_in_seconds: access.expires_in_seconds,
            principal: PrincipalSummary {
                uuid: principal.uuid,
                role: principal.role,
            },
        })
    }

    #[tracing::instrument(
        name = "auth.service.refresh",
        skip_all,
        fields(origin_ip = %origin_ip),
        err
    )]
    async fn refresh(
        &self,
        refresh_token: &str,
        origin_ip: &str,
    ) -> Result<RefreshResponse, AuthServiceError> {
        if refresh_token.is_empty() {
            return Err(AuthServiceError::Validation {
                reason: "refresh token is required",
            });
        }

        let record = self.store.find_by_token(refresh_token).await?;

        // Absence is indistinguishable from revocation to the caller.
        let Some(record) = record else {
            return Err(AuthServiceError::Unauthorized);
        };

        let now = self.clock.now();

        if record.revoked {
            // A dead credential coming back is a theft signal; surface it,
            // but do not cascade through the chain (see DESIGN.md).
            warn!(principal = %record.principal_uuid, "revoked refresh token presented again");

            self.record_activity(
                record.principal_uuid,
                ActivityEvent::TokenReuse,
                json!({ "rotated": record.replaced_by_token.is_some() }),
                origin_ip,
            )
            .await;

            return Err(AuthServiceError::Unauthorized);
        }

        if record.is_expired_at(now) {
            return Err(AuthServiceError::Unauthorized);
        }

        let principal = self
            .directory
            .find_by_uuid(record.principal_uuid)
            .await
            .map_err(AuthServiceError::Directory)?
            .filter(|principal| principal.status.is_active());

        let Some(principal) = principal else {
            // Dead principals keep no live sessions.
            self.store
                .revoke_if_active(refresh_token, origin_ip, None)
                .await?;

            return Err(AuthServiceError::Unauthorized);
        };

        if !self.rotation_enabled {
            let access = self.issuer.issue(principal.uuid, &principal.role, now)?;

            self.record_activity(
                principal.uuid,
                ActivityEvent::Refresh,
                json!({ "rotated": false }),
                origin_ip,
            )
            .await;

            return Ok(RefreshResponse {
                access_token: access.token,
                refresh_token: record.token,
                expires_in_seconds: access.expires_in_seconds,
                rotated: false,
            });
        }

        let replacement = self.new_refresh_payload(principal.uuid, now, origin_ip)?;

        let outcome = self
            .store
            .revoke_if_active(refresh_token, origin_ip, Some(replacement))
            .await?;

        // A lost swap means another refresh already consumed this token;
        // the loser sees the same generic failure as any dead credential.
        let RevokeOutcome::Revoked {
            successor: Some(successor),
        } = outcome
        else {
            return Err(AuthServiceError::Unauthorized);
        };

        let access = self.issuer.issue(principal.uuid, &principal.role, now)?;

        self.record_activity(
            principal.uuid,
            ActivityEvent::Refresh,
            json!({ "rotated": true }),
            origin_ip,
        )
        .await;

        Ok(RefreshResponse {
            access_token: access.token,
            refresh_token: successor.token,
            expires_in_seconds: access.expires_in_seconds,
            rotated: true,
        })
    }

    #[tracing::instrument(
        name = "auth.service.logout",
        skip_all,
        fields(principal = %principal),
        err
    )]
    async fn logout<'a>(
        &self,
        principal: PrincipalUuid,
        refresh_token: Option<&'a str>,
        origin_ip: &str,
    ) -> Result<LogoutResponse, AuthServiceError> {
        let revoked_count = match refresh_token {
            Some(token) => match self.store.find_by_token(token).await? {
                // Absence and ownership mismatch are both silent no-ops.
                None => 0,
                Some(record) if record.principal_uuid != principal => 0,
                Some(_) => match self.store.revoke_if_active(token, origin_ip, None).await? {
                    RevokeOutcome::Revoked { .. } => 1,
                    RevokeOutcome::AlreadyRevoked => 0,
                },
            },
            None => {
                let active = self.store.find_active_by_principal(principal).await?;
                let mut count = 0_u64;

                for record in active {
                    let outcome = self
                        .store
                        .revoke_if_active(&record.token, origin_ip, None)
                        .await?;

                    if matches!(outcome, RevokeOutcome::Revoked { .. }) {
                        count += 1;
                    }
                }

                count
            }
        };

        if revoked_count > 0 {
            self.record_activity(
                principal,
                ActivityEvent::Logout,
                json!({ "revoked_count": revoked_count }),
                origin_ip,
            )
            .await;
        }

        Ok(LogoutResponse {
            success: true,
            revoked_count,
        })
    }

    #[tracing::instrument(
        name = "auth.service.invalidate_principal_sessions",
        skip_all,
        fields(principal = %principal),
        err
    )]
    async fn invalidate_principal_sessions(
        &self,
        principal: PrincipalUuid,
        origin_ip: &str,
    ) -> Result<u64, AuthServiceError> {
        let deleted = self.store.delete_all_for_principal(principal).await?;

        info!(principal = %principal, deleted, "invalidated all sessions");

        self.record_activity(
            principal,
            ActivityEvent::SessionsInvalidated,
            json!({ "deleted": deleted }),
            origin_ip,
        )
        .await;

        Ok(deleted)
    }
}
