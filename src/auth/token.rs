//! Access-credential issuance and renewal-value generation.

use std::fmt;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use jiff::{SignedDuration, Timestamp};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use rand::{RngCore, rngs::OsRng};
use serde::{Deserialize, Serialize};

use crate::{auth::errors::SigningError, config::SigningSecret, principals::PrincipalUuid};

/// Number of random bytes in a renewal credential value.
pub const REFRESH_VALUE_BYTES: usize = 32;

/// Claims carried by a signed access credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Principal UUID.
    pub sub: String,

    pub role: String,

    pub iat: i64,

    pub exp: i64,
}

/// Signed access credential plus its caller-facing lifetime.
#[derive(Debug, Clone)]
pub struct IssuedAccessToken {
    pub token: String,
    pub expires_in_seconds: i64,
}

/// Signs short-lived access credentials.
pub struct AccessTokenIssuer {
    key: EncodingKey,
    header: Header,
    ttl_seconds: i64,
}

impl AccessTokenIssuer {
    /// Create an issuer from the configured signing secret and access TTL.
    ///
    /// # Errors
    ///
    /// Returns `SigningError::MissingKey` when the secret is empty.
    pub fn new(secret: &SigningSecret, ttl: SignedDuration) -> Result<Self, SigningError> {
        if secret.is_empty() {
            return Err(SigningError::MissingKey);
        }

        Ok(Self {
            key: EncodingKey::from_secret(secret.as_bytes()),
            header: Header::new(Algorithm::HS256),
            ttl_seconds: ttl.as_secs(),
        })
    }

    /// Issue a signed access credential for `principal` at `now`.
    ///
    /// The claims satisfy `exp - iat == ACCESS_TOKEN_TTL` exactly.
    ///
    /// # Errors
    ///
    /// Returns an error when claim serialization or signing fails.
    pub fn issue(
        &self,
        principal: PrincipalUuid,
        role: &str,
        now: Timestamp,
    ) -> Result<IssuedAccessToken, SigningError> {
        let iat = now.as_second();

        let claims = AccessClaims {
            sub: principal.to_string(),
            role: role.to_string(),
            iat,
            exp: iat + self.ttl_seconds,
        };

        let token = encode(&self.header, &claims, &self.key).map_err(SigningError::Encode)?;

        Ok(IssuedAccessToken {
            token,
            expires_in_seconds: self.ttl_seconds,
        })
    }
}

impl fmt::Debug for AccessTokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessTokenIssuer")
            .field("ttl_seconds", &self.ttl_seconds)
            .finish_non_exhaustive()
    }
}

/// Generate a fresh renewal credential value.
///
/// 32 bytes from the OS CSPRNG, URL-safe base64 encoded. Independent of any
/// counter or timestamp, so prior values reveal nothing about future ones.
#[must_use]
pub fn generate_refresh_value() -> String {
    let mut bytes = [0_u8; REFRESH_VALUE_BYTES];

    OsRng.fill_bytes(&mut bytes);

    URL_SAFE_NO_PAD.encode(bytes)
}
