// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::time::Duration;

/// Container environment variable carrying the role ARN.
pub const ROLE_ENV_VAR: &str = "IAM_ROLE";
pub const SHORT_CONTAINER_ID_LEN: usize = 12;

/// Role session names are `SESSION_NAME_PREFIX` followed by the role name.
pub const SESSION_NAME_PREFIX: &str = "Proxy_";
pub const MAX_SESSION_NAME_LEN: usize = 32;

pub const CREDENTIALS_CODE: &str = "Success";
pub const CREDENTIALS_TYPE: &str = "AWS-HMAC";

pub const DEFAULT_METADATA_ENDPOINT: &str = "http://169.254.169.254";
pub const DEFAULT_MIN_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_CONTAINER_MAX_AGE: Duration = Duration::from_secs(30);
pub const DEFAULT_REFRESH_THRESHOLD: Duration = Duration::from_secs(40 * 60); // 40 minutes
pub const DEFAULT_SESSION_DURATION: Duration = Duration::from_secs(3600); // max for chained roles
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_INVENTORY_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_ISSUER_TIMEOUT: Duration = Duration::from_secs(10);

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const MAX_REQUEST_BODY_SIZE: usize = 1024 * 1024; // 1 MB
