// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use tokio::sync::RwLock;

use crate::arn::RoleArn;
use crate::models::Credentials;

/// Role credentials keyed by canonical role ARN.
///
/// Readers always receive a cloned snapshot, so a concurrent refresh swaps the
/// entry without ever exposing a partially written value.
#[derive(Default)]
pub struct CredentialCache {
    entries: RwLock<HashMap<String, Credentials>>,
}

impl CredentialCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, role: &RoleArn) -> Option<Credentials> {
        let entries = self.entries.read().await;
        entries.get(&role.canonical()).cloned()
    }

    /// Stores `credentials` for `role`, replacing any previous snapshot.
    pub async fn insert(&self, role: &RoleArn, credentials: Credentials) {
        let mut entries = self.entries.write().await;
        entries.insert(role.canonical(), credentials);
    }

    /// Removes the entry for `role` only while it is still the snapshot that
    /// expires at `expiration`. A newer snapshot stored in the meantime stays.
    pub async fn remove_snapshot(&self, role: &RoleArn, expiration: DateTime<Utc>) -> bool {
        let mut entries = self.entries.write().await;
        let key = role.canonical();
        let matches = entries
            .get(&key)
            .is_some_and(|current| current.expiration == expiration);
        if matches {
            entries.remove(&key);
        }
        matches
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    #[cfg(test)]
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn role(arn: &str) -> RoleArn {
        RoleArn::parse(arn).unwrap()
    }

    #[tokio::test]
    async fn test_cache_new_is_empty() {
        let cache = CredentialCache::new();
        assert!(cache.is_empty().await);
        assert!(cache.get(&role("arn:aws:iam::1:role/app")).await.is_none());
    }

    #[tokio::test]
    async fn test_insert_replaces_snapshot() {
        let cache = CredentialCache::new();
        let app = role("arn:aws:iam::1:role/app");
        let expiration = Utc::now() + TimeDelta::hours(1);

        cache
            .insert(&app, Credentials::new("first", "s", "t", expiration))
            .await;
        cache
            .insert(&app, Credentials::new("second", "s", "t", expiration))
            .await;

        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get(&app).await.unwrap().access_key_id, "second");
    }

    #[tokio::test]
    async fn test_entries_are_keyed_per_role() {
        let cache = CredentialCache::new();
        let app = role("arn:aws:iam::1:role/app");
        let same_name_other_path = role("arn:aws:iam::1:role/ops/app");
        let expiration = Utc::now() + TimeDelta::hours(1);

        cache
            .insert(&app, Credentials::new("app", "s", "t", expiration))
            .await;

        assert!(cache.get(&same_name_other_path).await.is_none());
        assert!(cache.remove_snapshot(&app, expiration).await);
        assert!(cache.get(&app).await.is_none());
    }

    #[tokio::test]
    async fn test_remove_snapshot_keeps_newer_entry() {
        let cache = CredentialCache::new();
        let app = role("arn:aws:iam::1:role/app");
        let expired = Utc::now() - TimeDelta::seconds(1);
        let fresh = Utc::now() + TimeDelta::hours(1);

        cache
            .insert(&app, Credentials::new("old", "s", "t", expired))
            .await;
        // a concurrent refresh lands before the expired snapshot is removed
        cache
            .insert(&app, Credentials::new("new", "s", "t", fresh))
            .await;

        assert!(!cache.remove_snapshot(&app, expired).await);
        assert_eq!(cache.get(&app).await.unwrap().access_key_id, "new");
    }
}
