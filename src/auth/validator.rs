//! Stateless access-credential verification for the request hot path.

use std::{fmt, sync::Arc};

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, errors::ErrorKind};
use uuid::Uuid;

use crate::{
    auth::{errors::AccessTokenError, token::AccessClaims},
    clock::Clock,
    config::SigningSecret,
    principals::{PrincipalContext, PrincipalUuid},
};

/// Verifies access credentials and maps their claims to a principal
/// context.
///
/// Performs no I/O and takes no locks, so it can run on every request
/// without touching the credential store.
#[derive(Clone)]
pub struct AccessTokenValidator {
    key: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl AccessTokenValidator {
    #[must_use]
    pub fn new(secret: &SigningSecret, clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);

        // Expiry is checked against the injected clock below, not the
        // library's ambient time.
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            clock,
        }
    }

    /// Verify `token` and produce the request-scoped principal context.
    ///
    /// # Errors
    ///
    /// Returns `Malformed`, `InvalidSignature`, or `Expired`; the kinds are
    /// distinct so tampering can be logged separately from routine expiry.
    pub fn validate(&self, token: &str) -> Result<PrincipalContext, AccessTokenError> {
        let data =
            decode::<AccessClaims>(token, &self.key, &self.validation).map_err(|error| {
                match error.kind() {
                    ErrorKind::InvalidSignature => AccessTokenError::InvalidSignature,
                    ErrorKind::ExpiredSignature => AccessTokenError::Expired,
                    _ => AccessTokenError::Malformed,
                }
            })?;

        let claims = data.claims;

        if claims.exp <= self.clock.now().as_second() {
            return Err(AccessTokenError::Expired);
        }

        let principal_uuid = Uuid::try_parse(&claims.sub).map_err(|_| AccessTokenError::Malformed)?;

        Ok(PrincipalContext {
            principal_uuid: PrincipalUuid::from_uuid(principal_uuid),
            role: claims.role,
        })
    }
}

impl fmt::Debug for AccessTokenValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessTokenValidator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use jiff::{SignedDuration, Timestamp};

    use crate::{
        auth::token::AccessTokenIssuer,
        test::helpers::ManualClock,
    };

    use super::*;

    const SECRET: &str = "validator-test-secret";

    fn issuer(ttl_seconds: i64) -> AccessTokenIssuer {
        AccessTokenIssuer::new(
            &SigningSecret::new(SECRET),
            SignedDuration::from_secs(ttl_seconds),
        )
        .expect("issuer should build")
    }

    fn validator_at(now: Timestamp) -> AccessTokenValidator {
        AccessTokenValidator::new(&SigningSecret::new(SECRET), Arc::new(ManualClock::new(now)))
    }

    #[test]
    fn valid_token_yields_principal_context() {
        let principal = PrincipalUuid::from_uuid(Uuid::now_v7());
        let now = Timestamp::UNIX_EPOCH;

        let issued = issuer(900)
            .issue(principal, "admin", now)
            .expect("issue should succeed");

        let context = validator_at(now)
            .validate(&issued.token)
            .expect("token should validate");

        assert_eq!(context.principal_uuid, principal);
        assert_eq!(context.role, "admin");
    }

    #[test]
    fn expired_token_is_rejected_as_expired() {
        let now = Timestamp::UNIX_EPOCH;

        let issued = issuer(900)
            .issue(PrincipalUuid::from_uuid(Uuid::now_v7()), "staff", now)
            .expect("issue should succeed");

        let later = now
            .checked_add(SignedDuration::from_secs(901))
            .expect("timestamp should advance");

        assert_eq!(
            validator_at(later).validate(&issued.token),
            Err(AccessTokenError::Expired)
        );
    }

    #[test]
    fn tampered_claims_are_rejected_as_invalid_signature() {
        let now = Timestamp::UNIX_EPOCH;

        let issued = issuer(900)
            .issue(PrincipalUuid::from_uuid(Uuid::now_v7()), "staff", now)
            .expect("issue should succeed");

        // Alter one character of the signed payload segment; the signature
        // itself stays intact and decodable.
        let (head, signature) = issued
            .token
            .rsplit_once('.')
            .expect("token should have three segments");
        let mut head = head.to_string();
        let replacement = if head.ends_with('e') { 'f' } else { 'e' };
        head.pop();
        head.push(replacement);

        let tampered = format!("{head}.{signature}");

        assert_eq!(
            validator_at(now).validate(&tampered),
            Err(AccessTokenError::InvalidSignature)
        );
    }

    #[test]
    fn token_signed_with_another_key_is_rejected() {
        let now = Timestamp::UNIX_EPOCH;

        let foreign = AccessTokenIssuer::new(
            &SigningSecret::new("some-other-secret"),
            SignedDuration::from_secs(900),
        )
        .expect("issuer should build")
        .issue(PrincipalUuid::from_uuid(Uuid::now_v7()), "staff", now)
        .expect("issue should succeed");

        assert_eq!(
            validator_at(now).validate(&foreign.token),
            Err(AccessTokenError::InvalidSignature)
        );
    }

    #[test]
    fn garbage_input_is_rejected_as_malformed() {
        let now = Timestamp::UNIX_EPOCH;
        let validator = validator_at(now);

        assert_eq!(
            validator.validate("not-a-token"),
            Err(AccessTokenError::Malformed)
        );
        assert_eq!(validator.validate(""), Err(AccessTokenError::Malformed));
    }
}
