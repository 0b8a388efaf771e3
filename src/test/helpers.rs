//! Test Helpers
//!
//! Fixtures shared across service-level tests: a manually advanced clock,
//! an in-memory principal directory, a plaintext secret verifier, and a
//! recording activity sink, wired into an engine harness.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    activity::{ActivityError, ActivityEvent, ActivityLog},
    auth::{AuthEngine, InMemoryRefreshTokenStore},
    clock::Clock,
    config::{AuthConfig, Environment, SigningSecret},
    principals::{
        DirectoryError, Principal, PrincipalDirectory, PrincipalStatus, PrincipalUuid,
        SecretVerifier,
    },
};

/// Clock fixture that only moves when a test advances it.
pub(crate) struct ManualClock {
    now: Mutex<Timestamp>,
}

impl ManualClock {
    pub(crate) fn new(start: Timestamp) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub(crate) fn advance(&self, by: SignedDuration) {
        let mut now = self.now.lock().expect("clock lock should not be poisoned");
        *now = now.checked_add(by).expect("timestamp should advance");
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock().expect("clock lock should not be poisoned")
    }
}

/// In-memory stand-in for the external principal directory.
#[derive(Default)]
pub(crate) struct FakeDirectory {
    principals: Mutex<Vec<(String, Principal)>>,
}

impl FakeDirectory {
    pub(crate) fn insert(&self, identifier: &str, principal: Principal) {
        self.principals
            .lock()
            .expect("directory lock should not be poisoned")
            .push((identifier.to_string(), principal));
    }

    pub(crate) fn set_status(&self, uuid: PrincipalUuid, status: PrincipalStatus) {
        let mut principals = self
            .principals
            .lock()
            .expect("directory lock should not be poisoned");

        for (_, principal) in principals.iter_mut() {
            if principal.uuid == uuid {
                principal.status = status;
            }
        }
    }
}

#[async_trait]
impl PrincipalDirectory for FakeDirectory {
    async fn find_by_uuid(
        &self,
        uuid: PrincipalUuid,
    ) -> Result<Option<Principal>, DirectoryError> {
        Ok(self
            .principals
            .lock()
            .expect("directory lock should not be poisoned")
            .iter()
            .find(|(_, principal)| principal.uuid == uuid)
            .map(|(_, principal)| principal.clone()))
    }

    async fn find_by_login_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<Principal>, DirectoryError> {
        Ok(self
            .principals
            .lock()
            .expect("directory lock should not be poisoned")
            .iter()
            .find(|(id, _)| id == identifier)
            .map(|(_, principal)| principal.clone()))
    }

    async fn update_last_login(
        &self,
        _uuid: PrincipalUuid,
        _at: Timestamp,
    ) -> Result<(), DirectoryError> {
        Ok(())
    }
}

/// Verifier fixture: the stored "hash" is the plaintext secret itself.
pub(crate) struct PlainSecretVerifier;

impl SecretVerifier for PlainSecretVerifier {
    fn verify(&self, plain: &str, hash: &str) -> bool {
        plain == hash
    }
}

/// Activity sink that captures events for assertions.
#[derive(Default)]
pub(crate) struct RecordingActivityLog {
    events: Mutex<Vec<(PrincipalUuid, ActivityEvent)>>,
}

impl RecordingActivityLog {
    pub(crate) fn events(&self) -> Vec<(PrincipalUuid, ActivityEvent)> {
        self.events
            .lock()
            .expect("activity lock should not be poisoned")
            .clone()
    }
}

#[async_trait]
impl ActivityLog for RecordingActivityLog {
    async fn record(
        &self,
        principal: PrincipalUuid,
        event: ActivityEvent,
        _metadata: Value,
        _origin_ip: &str,
    ) -> Result<(), ActivityError> {
        self.events
            .lock()
            .expect("activity lock should not be poisoned")
            .push((principal, event));

        Ok(())
    }
}

pub(crate) const TEST_SIGNING_SECRET: &str = "unit-test-signing-secret";

pub(crate) fn test_config(rotation_enabled: bool) -> AuthConfig {
    AuthConfig {
        access_token_ttl: SignedDuration::from_mins(15),
        refresh_token_ttl: SignedDuration::from_hours(24 * 7),
        rotation_enabled,
        signing_secret: SigningSecret::new(TEST_SIGNING_SECRET),
        environment: Environment::Development,
    }
}

pub(crate) fn active_principal(role: &str, secret: &str) -> Principal {
    Principal {
        uuid: PrincipalUuid::from_uuid(Uuid::now_v7()),
        status: PrincipalStatus::Active,
        role: role.to_string(),
        secret_hash: secret.to_string(),
    }
}

/// Engine plus handles to every fixture it was wired with.
pub(crate) struct TestHarness {
    pub(crate) engine: AuthEngine,
    pub(crate) store: Arc<InMemoryRefreshTokenStore>,
    pub(crate) clock: Arc<ManualClock>,
    pub(crate) directory: Arc<FakeDirectory>,
    pub(crate) activity: Arc<RecordingActivityLog>,
}

pub(crate) fn harness(config: &AuthConfig) -> TestHarness {
    let clock = Arc::new(ManualClock::new(Timestamp::UNIX_EPOCH));
    let store = Arc::new(InMemoryRefreshTokenStore::new(clock.clone()));
    let directory = Arc::new(FakeDirectory::default());
    let activity = Arc::new(RecordingActivityLog::default());

    let engine = AuthEngine::new(
        config,
        store.clone(),
        directory.clone(),
        Arc::new(PlainSecretVerifier),
        activity.clone(),
        clock.clone(),
    )
    .expect("engine should build from test config");

    TestHarness {
        engine,
        store,
        clock,
        directory,
        activity,
    }
}
