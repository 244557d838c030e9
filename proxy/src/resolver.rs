// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Container role resolution.
//!
//! The [`ContainerResolver`] maps a caller's source address to the role its
//! container declared. The mapping is filled lazily: a lookup that finds no
//! valid record triggers a poll of the [`ContainerInventory`] and retries once.
//!
//! # Timers
//!
//! - **Minimum poll interval**: polls start at most once per interval no
//!   matter how many lookups miss. The check and the update of the last poll
//!   time happen under the same write lock.
//! - **Container max age**: a record that has not been seen by a poll for
//!   longer than this is evicted, so a stopped container converges to "no
//!   role" within one window. It must be comfortably longer than the poll
//!   interval.
//!
//! A poll cycle runs in its own task and outlives the lookup that started it.
//! New containers are inspected concurrently, each call bounded by the
//! inventory's own timeout, so one hung container cannot hold back the rest.
//! Inventory calls are made without holding the lock; their results are
//! applied in one short write section (refresh, insert, then evict).

use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::arn::RoleArn;
use crate::inventory::{ContainerInventory, short_id};
use crate::models::ContainerDetail;

/// One tracked container.
#[derive(Debug, Clone)]
pub struct ContainerRecord {
    pub id: String,
    pub name: String,
    pub ip_address: IpAddr,
    pub role: Option<RoleArn>,
    pub refreshed: Instant,
}

#[derive(Default)]
struct ResolverState {
    records: HashMap<IpAddr, ContainerRecord>,
    last_poll: Option<Instant>,
}

impl ResolverState {
    fn tracked_ids(&self) -> HashSet<String> {
        self.records.values().map(|r| r.id.clone()).collect()
    }

    fn roles(&self) -> Vec<String> {
        let mut roles: Vec<String> = self
            .records
            .values()
            .filter_map(|r| r.role.as_ref().map(RoleArn::canonical))
            .collect();
        roles.sort();
        roles.dedup();
        roles
    }
}

struct ResolverInner {
    inventory: Arc<dyn ContainerInventory>,
    state: RwLock<ResolverState>,
    min_poll_interval: Duration,
    max_age: Duration,
}

pub struct ContainerResolver {
    inner: Arc<ResolverInner>,
}

impl ContainerResolver {
    pub fn new(
        inventory: Arc<dyn ContainerInventory>,
        min_poll_interval: Duration,
        max_age: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(ResolverInner {
                inventory,
                state: RwLock::new(ResolverState::default()),
                min_poll_interval,
                max_age,
            }),
        }
    }

    /// Role declared by the container at `ip`, if any.
    ///
    /// Returns `None` both for unknown addresses and for containers that
    /// declared no (valid) role.
    #[tracing::instrument(skip(self))]
    pub async fn role_for_address(&self, ip: IpAddr) -> Option<RoleArn> {
        if let Some(role) = self.inner.lookup(ip).await {
            return role;
        }

        let inner = Arc::clone(&self.inner);
        if let Err(e) = tokio::spawn(async move { inner.poll().await }).await {
            tracing::error!("[resolver] poll task failed: {}", e);
        }

        self.inner.lookup(ip).await.flatten()
    }

    /// Canonical role of every tracked container that declared one.
    pub async fn tracked_roles(&self) -> Vec<String> {
        self.inner.state.read().await.roles()
    }
}

impl ResolverInner {
    /// `Some(role)` when a valid record exists for `ip`.
    async fn lookup(&self, ip: IpAddr) -> Option<Option<RoleArn>> {
        let state = self.state.read().await;
        state
            .records
            .get(&ip)
            .filter(|record| record.refreshed.elapsed() <= self.max_age)
            .map(|record| record.role.clone())
    }

    /// Claims the poll slot if the minimum interval has elapsed.
    async fn try_start_poll(&self) -> Option<HashSet<String>> {
        let mut state = self.state.write().await;
        let now = Instant::now();
        if let Some(last_poll) = state.last_poll
            && now.duration_since(last_poll) < self.min_poll_interval
        {
            tracing::trace!("[resolver] poll throttled");
            return None;
        }
        state.last_poll = Some(now);
        Some(state.tracked_ids())
    }

    #[tracing::instrument(skip(self))]
    async fn poll(&self) {
        let Some(tracked) = self.try_start_poll().await else {
            return;
        };

        tracing::debug!("[resolver] synchronising state with running containers");

        let running = match self.inventory.list_running().await {
            Ok(running) => running,
            Err(e) => {
                // keep existing records; they expire on their own schedule
                tracing::error!("[resolver] {}", e);
                Vec::new()
            }
        };

        let mut seen = HashSet::new();
        let mut inspections = JoinSet::new();
        for id in running {
            if tracked.contains(&id) {
                seen.insert(id);
                continue;
            }
            let inventory = Arc::clone(&self.inventory);
            inspections.spawn(async move { inventory.inspect(&id).await });
        }

        let mut discovered = Vec::new();
        while let Some(result) = inspections.join_next().await {
            match result {
                Ok(Ok(detail)) => discovered.push(detail),
                Ok(Err(e)) => tracing::warn!("[resolver] error inspecting container: {}", e),
                Err(e) => tracing::error!("[resolver] inspect task failed: {}", e),
            }
        }

        let mut state = self.state.write().await;
        let now = Instant::now();

        for record in state.records.values_mut() {
            if seen.contains(&record.id) {
                record.refreshed = now;
            }
        }

        for detail in discovered {
            if let Some(record) = new_record(detail, now) {
                state.records.insert(record.ip_address, record);
            }
        }

        let max_age = self.max_age;
        state.records.retain(|ip, record| {
            let keep = now.duration_since(record.refreshed) <= max_age;
            if !keep {
                tracing::info!(
                    "[resolver] evicting container: id={} ip={}",
                    short_id(&record.id),
                    ip
                );
            }
            keep
        });

        tracing::debug!(
            "[resolver] tracking {} containers, roles: {:?}",
            state.records.len(),
            state.roles()
        );
    }
}

fn new_record(detail: ContainerDetail, now: Instant) -> Option<ContainerRecord> {
    let id = short_id(&detail.id).to_string();

    let Some(ip_address) = detail.ip_address else {
        tracing::debug!("[resolver] container {} has no network address", id);
        return None;
    };

    let role = match detail.role.as_deref().map(RoleArn::parse) {
        Some(Ok(role)) => Some(role),
        Some(Err(e)) => {
            tracing::warn!("[resolver] bad role for container {}: {}", id, e);
            None
        }
        None => None,
    };

    tracing::info!(
        "[resolver] container: id={} name={} ip={} role={}",
        id,
        detail.name,
        ip_address,
        role.as_ref().map(RoleArn::canonical).unwrap_or_default()
    );

    Some(ContainerRecord {
        id: detail.id,
        name: detail.name,
        ip_address,
        role,
        refreshed: now,
    })
}
