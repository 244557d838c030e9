// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Role credential broker.
//!
//! The broker answers "give me usable credentials for this role". Credentials
//! are served from the [`CredentialCache`] until their remaining lifetime
//! drops below the refresh threshold, at which point a new set is requested
//! from the [`CredentialIssuer`]. If that request fails the cached set is
//! still returned as long as it has not actually expired.
//!
//! The issuer call is made without holding the cache lock. Two callers that
//! race on the same role may both issue; whichever result is stored last
//! wins, and both results are valid.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::arn::RoleArn;
use crate::cache::CredentialCache;
use crate::issuer::{CredentialIssuer, session_name};
use crate::models::Credentials;

pub struct CredentialBroker {
    issuer: Arc<dyn CredentialIssuer>,
    cache: CredentialCache,
    refresh_threshold: Duration,
}

impl CredentialBroker {
    pub fn new(issuer: Arc<dyn CredentialIssuer>, refresh_threshold: Duration) -> Self {
        Self {
            issuer,
            cache: CredentialCache::new(),
            refresh_threshold,
        }
    }

    /// Returns current credentials for `role`, or `None` if none could be
    /// obtained and no unexpired credentials are cached.
    #[tracing::instrument(skip(self, role), fields(role = %role))]
    pub async fn credentials_for(&self, role: &RoleArn) -> Option<Credentials> {
        // Fast path: cached credentials with plenty of lifetime left
        let mut cached = self.cache.get(role).await;
        if let Some(ref credentials) = cached {
            let now = Utc::now();
            if !credentials.needs_refresh(now, self.refresh_threshold) {
                tracing::debug!("[broker] using cached credentials for role {}", role);
                return cached;
            }
            if credentials.is_expired(now) {
                tracing::debug!("[broker] discarding expired credentials for role {}", role);
                self.cache
                    .remove_snapshot(role, credentials.expiration)
                    .await;
                cached = None;
            }
        }

        // Slow path: issue new credentials
        let session_name = session_name(role);
        tracing::info!(
            "[broker] credentials request: role={} session={}",
            role,
            session_name
        );

        match self.issuer.assume_role(role, &session_name).await {
            Ok(credentials) => {
                tracing::debug!(
                    "[broker] refreshed credentials for role {}, expires_at: {}",
                    role,
                    credentials.expiration
                );
                self.cache.insert(role, credentials.clone()).await;
                tracing::debug!(
                    "[broker] caching credentials for {} roles",
                    self.cache.len().await
                );
                Some(credentials)
            }
            Err(e) => {
                tracing::error!("[broker] unable to issue credentials for {}: {}", role, e);
                // the cached set may have expired while the issuer call was in flight
                cached.filter(|credentials| !credentials.is_expired(Utc::now()))
            }
        }
    }
}
