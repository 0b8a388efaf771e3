//! App Context

use std::sync::Arc;

use thiserror::Error;

use crate::{
    activity::{ActivityLog, TracingActivityLog},
    auth::{
        AccessTokenValidator, AuthEngine, AuthService, PgRefreshTokenRepository, SigningError,
    },
    clock::{Clock, SystemClock},
    config::AuthConfig,
    database,
    principals::{Argon2SecretVerifier, PrincipalDirectory},
};

#[derive(Debug, Error)]
pub enum AppInitError {
    #[error("failed to connect to database")]
    Database(#[source] sqlx::Error),

    #[error("failed to initialize token signing")]
    Signing(#[from] SigningError),
}

/// Wired auth services.
///
/// The validator is exposed separately from the engine: it performs no I/O
/// and never touches the credential store, so request handlers can verify
/// on every call without store load.
#[derive(Clone)]
pub struct AppContext {
    pub auth: Arc<dyn AuthService>,
    pub validator: Arc<AccessTokenValidator>,
}

impl AppContext {
    /// Build the context from a database URL, validated configuration, and
    /// the externally owned principal directory.
    ///
    /// # Errors
    ///
    /// Returns an error when the database connection or the signing key
    /// setup fails.
    pub async fn from_database_url(
        url: &str,
        config: &AuthConfig,
        directory: Arc<dyn PrincipalDirectory>,
    ) -> Result<Self, AppInitError> {
        let pool = database::connect(url).await.map_err(AppInitError::Database)?;

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store = Arc::new(PgRefreshTokenRepository::new(pool));
        let activity: Arc<dyn ActivityLog> = Arc::new(TracingActivityLog);

        let engine = AuthEngine::new(
            config,
            store,
            directory,
            Arc::new(Argon2SecretVerifier),
            activity,
            Arc::clone(&clock),
        )?;

        Ok(Self {
            auth: Arc::new(engine),
            validator: Arc::new(AccessTokenValidator::new(&config.signing_secret, clock)),
        })
    }
}
