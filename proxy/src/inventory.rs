// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Container inventory.
//!
//! [`ContainerInventory`] lists running containers and reports the network
//! address and declared role of each one. [`DockerInventory`] talks to the
//! local Docker daemon.

use std::future::Future;
use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use bollard::Docker;
use bollard::container::{InspectContainerOptions, ListContainersOptions};
use bollard::models::ContainerInspectResponse;

use crate::constants::{ROLE_ENV_VAR, SHORT_CONTAINER_ID_LEN};
use crate::errors::InventoryError;
use crate::models::ContainerDetail;

#[async_trait]
pub trait ContainerInventory: Send + Sync {
    /// Ids of all running containers.
    async fn list_running(&self) -> Result<Vec<String>, InventoryError>;

    async fn inspect(&self, id: &str) -> Result<ContainerDetail, InventoryError>;
}

pub struct DockerInventory {
    docker: Docker,
    timeout: Duration,
}

impl DockerInventory {
    /// Connects to `socket`, or to the platform default socket when `None`.
    pub async fn connect(socket: Option<&str>, timeout: Duration) -> Result<Self, InventoryError> {
        let docker = match socket {
            Some(path) => {
                Docker::connect_with_unix(path, timeout.as_secs(), bollard::API_DEFAULT_VERSION)
            }
            None => Docker::connect_with_local_defaults(),
        }
        .map_err(|e| InventoryError::Connect(e.to_string()))?;

        // fail at startup rather than on the first credentials request
        let version = call_with_timeout(timeout, docker.version())
            .await?
            .map_err(|e| InventoryError::Connect(e.to_string()))?;

        tracing::info!(
            "[docker] connected to docker {}",
            version.version.unwrap_or_default()
        );

        Ok(Self { docker, timeout })
    }
}

#[async_trait]
impl ContainerInventory for DockerInventory {
    #[tracing::instrument(skip(self))]
    async fn list_running(&self) -> Result<Vec<String>, InventoryError> {
        let options = ListContainersOptions::<String> {
            all: false, // only running containers
            size: false,
            ..Default::default()
        };

        let containers = call_with_timeout(self.timeout, self.docker.list_containers(Some(options)))
            .await?
            .map_err(|e| InventoryError::List(e.to_string()))?;

        Ok(containers.into_iter().filter_map(|c| c.id).collect())
    }

    #[tracing::instrument(skip(self, id), fields(id = %short_id(id)))]
    async fn inspect(&self, id: &str) -> Result<ContainerDetail, InventoryError> {
        let response = call_with_timeout(
            self.timeout,
            self.docker
                .inspect_container(id, None::<InspectContainerOptions>),
        )
        .await?
        .map_err(|e| InventoryError::Inspect(short_id(id).to_string(), e.to_string()))?;

        Ok(container_detail(id, response))
    }
}

async fn call_with_timeout<F: Future>(
    timeout: Duration,
    call: F,
) -> Result<F::Output, InventoryError> {
    tokio::time::timeout(timeout, call)
        .await
        .map_err(|_| InventoryError::Timeout)
}

/// First characters of a container id, as printed by `docker ps`.
pub fn short_id(id: &str) -> &str {
    id.get(..SHORT_CONTAINER_ID_LEN).unwrap_or(id)
}

fn container_detail(id: &str, response: ContainerInspectResponse) -> ContainerDetail {
    let name = response
        .name
        .map(|name| name.trim_start_matches('/').to_string())
        .unwrap_or_default();

    let role = response
        .config
        .and_then(|config| config.env)
        .and_then(|env| role_from_env(&env));

    // containers on user-defined networks have no default bridge address
    let ip_address = response.network_settings.and_then(|settings| {
        let bridge = settings.ip_address.filter(|ip| !ip.is_empty());
        let attached = || {
            settings.networks.and_then(|networks| {
                let mut networks: Vec<_> = networks.into_iter().collect();
                networks.sort_by(|a, b| a.0.cmp(&b.0));
                networks
                    .into_iter()
                    .filter_map(|(_, endpoint)| endpoint.ip_address)
                    .find(|ip| !ip.is_empty())
            })
        };
        bridge.or_else(attached).and_then(|ip| ip.parse::<IpAddr>().ok())
    });

    ContainerDetail {
        id: id.to_string(),
        name,
        ip_address,
        role,
    }
}

/// Value of the role variable in a `KEY=value` environment list.
pub fn role_from_env(env: &[String]) -> Option<String> {
    env.iter().find_map(|entry| {
        let (key, value) = entry.split_once('=')?;
        (key == ROLE_ENV_VAR).then(|| value.to_string())
    })
}
