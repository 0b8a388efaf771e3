//! In-memory renewal-credential store.
//!
//! Mirrors the Postgres repository's compare-and-swap semantics under a
//! single mutex. Backs the test suite and ephemeral single-process
//! deployments; nothing survives a restart.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use jiff::Timestamp;

use crate::{
    auth::{
        errors::TokenStoreError,
        models::{NewRefreshToken, RefreshToken, RevokeOutcome},
        repository::RefreshTokenStore,
        token::generate_refresh_value,
    },
    clock::Clock,
    principals::PrincipalUuid,
};

pub struct InMemoryRefreshTokenStore {
    records: Mutex<HashMap<String, RefreshToken>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryRefreshTokenStore {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, RefreshToken>> {
        match self.records.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn materialize(new: NewRefreshToken) -> RefreshToken {
        RefreshToken {
            token: new.token,
            principal_uuid: new.principal_uuid,
            issued_at: new.issued_at,
            expires_at: new.expires_at,
            created_by_ip: new.created_by_ip,
            revoked: false,
            revoked_at: None,
            revoked_by_ip: None,
            replaced_by_token: None,
        }
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryRefreshTokenStore {
    async fn create(&self, mut new: NewRefreshToken) -> Result<RefreshToken, TokenStoreError> {
        let mut records = self.lock();

        while records.contains_key(&new.token) {
            new.token = generate_refresh_value();
        }

        let record = Self::materialize(new);
        records.insert(record.token.clone(), record.clone());

        Ok(record)
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshToken>, TokenStoreError> {
        Ok(self.lock().get(token).cloned())
    }

    async fn find_active_by_principal(
        &self,
        principal: PrincipalUuid,
    ) -> Result<Vec<RefreshToken>, TokenStoreError> {
        let now = self.clock.now();

        let mut active: Vec<RefreshToken> = self
            .lock()
            .values()
            .filter(|record| record.principal_uuid == principal && record.is_active_at(now))
            .cloned()
            .collect();

        active.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));

        Ok(active)
    }

    async fn revoke_if_active(
        &self,
        token: &str,
        revoked_by_ip: &str,
        replacement: Option<NewRefreshToken>,
    ) -> Result<RevokeOutcome, TokenStoreError> {
        // One guard spans the swap and the successor insert, giving the
        // same atomicity as the Postgres transaction.
        let mut records = self.lock();

        let mut replacement = replacement;

        if let Some(new) = replacement.as_mut() {
            while records.contains_key(&new.token) {
                new.token = generate_refresh_value();
            }
        }

        let Some(record) = records.get_mut(token) else {
            return Ok(RevokeOutcome::AlreadyRevoked);
        };

        if record.revoked {
            return Ok(RevokeOutcome::AlreadyRevoked);
        }

        record.revoked = true;
        record.revoked_at = Some(self.clock.now());
        record.revoked_by_ip = Some(revoked_by_ip.to_string());
        record.replaced_by_token = replacement.as_ref().map(|new| new.token.clone());

        let successor = replacement.map(|new| {
            let successor = Self::materialize(new);
            records.insert(successor.token.clone(), successor.clone());
            successor
        });

        Ok(RevokeOutcome::Revoked { successor })
    }

    async fn delete_all_for_principal(
        &self,
        principal: PrincipalUuid,
    ) -> Result<u64, TokenStoreError> {
        let mut records = self.lock();
        let before = records.len();

        records.retain(|_, record| record.principal_uuid != principal);

        Ok((before - records.len()) as u64)
    }

    async fn purge_expired(&self, now: Timestamp) -> Result<u64, TokenStoreError> {
        let mut records = self.lock();
        let before = records.len();

        records.retain(|_, record| record.expires_at > now);

        Ok((before - records.len()) as u64)
    }
}
