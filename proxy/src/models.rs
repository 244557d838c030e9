// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use zeroize::ZeroizeOnDrop;

use crate::constants::{CREDENTIALS_CODE, CREDENTIALS_TYPE};

/// Temporary security credentials for one role.
///
/// Snapshots are replaced in the cache on refresh, never mutated in place.
#[derive(Clone, PartialEq, Eq, Serialize, ZeroizeOnDrop)]
pub struct Credentials {
    #[serde(rename = "AccessKeyId")]
    pub access_key_id: String,

    #[serde(rename = "SecretAccessKey")]
    pub secret_access_key: String,

    #[serde(rename = "Token")]
    pub session_token: String,

    #[serde(rename = "Expiration", serialize_with = "serialize_timestamp")]
    #[zeroize(skip)]
    pub expiration: DateTime<Utc>,
}

impl Credentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: impl Into<String>,
        expiration: DateTime<Utc>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: session_token.into(),
            expiration,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiration
    }

    /// True once the remaining lifetime has dropped below `threshold`.
    pub fn needs_refresh(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        match (self.expiration - now).to_std() {
            Ok(remaining) => remaining < threshold,
            Err(_) => true, // already expired
        }
    }
}

// Custom Debug implementation to prevent accidental logging of sensitive data
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &"[REDACTED]")
            .field("secret_access_key", &"[REDACTED]")
            .field("session_token", &"[REDACTED]")
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// Body served for `.../meta-data/iam/security-credentials/<role>`, in the
/// same flat shape the instance metadata service uses.
#[derive(Debug, Serialize)]
pub struct IamCredentialsDocument {
    #[serde(rename = "Code")]
    pub code: &'static str,

    #[serde(rename = "Type")]
    pub credential_type: &'static str,

    #[serde(rename = "LastUpdated", serialize_with = "serialize_timestamp")]
    pub last_updated: DateTime<Utc>,

    #[serde(flatten)]
    pub credentials: Credentials,
}

impl IamCredentialsDocument {
    pub fn success(credentials: Credentials, last_updated: DateTime<Utc>) -> Self {
        Self {
            code: CREDENTIALS_CODE,
            credential_type: CREDENTIALS_TYPE,
            last_updated,
            credentials,
        }
    }
}

/// What the container inventory reports for a single container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerDetail {
    pub id: String,
    pub name: String,
    pub ip_address: Option<IpAddr>,
    /// Raw value of the role environment variable, if the container set one.
    pub role: Option<String>,
}

fn serialize_timestamp<S: Serializer>(
    timestamp: &DateTime<Utc>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&timestamp.to_rfc3339_opts(SecondsFormat::Secs, true))
}
