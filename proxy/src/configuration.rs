// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::time::Duration;

use clap::Parser;

use crate::constants;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct ProxyOptions {
    #[arg(long, default_value = "0.0.0.0", env("METAPROXY_HTTP_HOST"))]
    pub host: String,
    #[arg(long, default_value = "18000", env("METAPROXY_HTTP_PORT"))]
    pub port: u16,
    #[arg(
        long,
        default_value = constants::DEFAULT_METADATA_ENDPOINT,
        env("METAPROXY_METADATA_ENDPOINT")
    )]
    pub metadata_endpoint: String,
    /// Region of the STS endpoint; defaults to the SDK provider chain
    #[arg(long, env("METAPROXY_REGION"))]
    pub region: Option<String>,
    /// Docker socket path; defaults to the platform socket
    #[arg(long, env("METAPROXY_DOCKER_SOCKET"))]
    pub docker_socket: Option<String>,
    #[arg(long, default_value = "5", env("METAPROXY_MIN_POLL_INTERVAL_SECS"))]
    pub min_poll_interval_secs: u64,
    #[arg(long, default_value = "30", env("METAPROXY_CONTAINER_MAX_AGE_SECS"))]
    pub container_max_age_secs: u64,
    #[arg(long, default_value = "2400", env("METAPROXY_REFRESH_THRESHOLD_SECS"))]
    pub refresh_threshold_secs: u64,
    #[arg(long, default_value = "3600", env("METAPROXY_SESSION_DURATION_SECS"))]
    pub session_duration_secs: u64,
    #[arg(long, default_value = "5", env("METAPROXY_UPSTREAM_TIMEOUT_SECS"))]
    pub upstream_timeout_secs: u64,
    #[arg(long, default_value = "5", env("METAPROXY_INVENTORY_TIMEOUT_SECS"))]
    pub inventory_timeout_secs: u64,
    #[arg(long, default_value = "10", env("METAPROXY_ISSUER_TIMEOUT_SECS"))]
    pub issuer_timeout_secs: u64,
}

impl ProxyOptions {
    pub fn min_poll_interval(&self) -> Duration {
        Duration::from_secs(self.min_poll_interval_secs)
    }

    pub fn container_max_age(&self) -> Duration {
        Duration::from_secs(self.container_max_age_secs)
    }

    pub fn refresh_threshold(&self) -> Duration {
        Duration::from_secs(self.refresh_threshold_secs)
    }

    pub fn session_duration(&self) -> Duration {
        Duration::from_secs(self.session_duration_secs)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    pub fn inventory_timeout(&self) -> Duration {
        Duration::from_secs(self.inventory_timeout_secs)
    }

    pub fn issuer_timeout(&self) -> Duration {
        Duration::from_secs(self.issuer_timeout_secs)
    }

    /// Metadata service base URL without a trailing slash.
    pub fn metadata_base_url(&self) -> &str {
        self.metadata_endpoint.trim_end_matches('/')
    }

    /// Rejects timer combinations that would evict live containers or never
    /// serve cached credentials.
    pub fn validate(&self) -> Result<(), String> {
        if self.container_max_age() <= self.min_poll_interval() {
            return Err(format!(
                "container max age ({}s) must exceed the minimum poll interval ({}s)",
                self.container_max_age_secs, self.min_poll_interval_secs
            ));
        }
        if self.refresh_threshold() >= self.session_duration() {
            return Err(format!(
                "refresh threshold ({}s) must be shorter than the session duration ({}s)",
                self.refresh_threshold_secs, self.session_duration_secs
            ));
        }
        Ok(())
    }
}

impl Default for ProxyOptions {
    fn default() -> Self {
        ProxyOptions {
            host: "0.0.0.0".to_string(),
            port: 18000,
            metadata_endpoint: constants::DEFAULT_METADATA_ENDPOINT.to_string(),
            region: None,
            docker_socket: None,
            min_poll_interval_secs: constants::DEFAULT_MIN_POLL_INTERVAL.as_secs(),
            container_max_age_secs: constants::DEFAULT_CONTAINER_MAX_AGE.as_secs(),
            refresh_threshold_secs: constants::DEFAULT_REFRESH_THRESHOLD.as_secs(),
            session_duration_secs: constants::DEFAULT_SESSION_DURATION.as_secs(),
            upstream_timeout_secs: constants::DEFAULT_UPSTREAM_TIMEOUT.as_secs(),
            inventory_timeout_secs: constants::DEFAULT_INVENTORY_TIMEOUT.as_secs(),
            issuer_timeout_secs: constants::DEFAULT_ISSUER_TIMEOUT.as_secs(),
        }
    }
}
