// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Credential issuance.
//!
//! [`CredentialIssuer`] is the narrow seam the broker depends on. The
//! production implementation, [`StsIssuer`], calls STS `AssumeRole` with the
//! proxy host's own credentials and translates the SDK response into a plain
//! [`Credentials`] value.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_sts::error::DisplayErrorContext;
use chrono::{DateTime, Utc};
use regex::Regex;

use crate::arn::RoleArn;
use crate::constants::{MAX_SESSION_NAME_LEN, SESSION_NAME_PREFIX};
use crate::errors::IssuerError;
use crate::models::Credentials;

// characters STS does not accept in a role session name
static INVALID_SESSION_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^A-Za-z0-9_+=,.@-]").expect("session name pattern is valid")
});

#[async_trait]
pub trait CredentialIssuer: Send + Sync {
    async fn assume_role(
        &self,
        role: &RoleArn,
        session_name: &str,
    ) -> Result<Credentials, IssuerError>;
}

/// Session name used when assuming `role`, so that CloudTrail entries can be
/// attributed to this proxy and the role it acted for.
pub fn session_name(role: &RoleArn) -> String {
    let name = format!("{}{}", SESSION_NAME_PREFIX, role.name());
    let mut name = INVALID_SESSION_CHARS.replace_all(&name, "_").into_owned();
    name.truncate(MAX_SESSION_NAME_LEN);
    name
}

pub struct StsIssuer {
    client: aws_sdk_sts::Client,
    session_duration: Duration,
    timeout: Duration,
}

impl StsIssuer {
    /// Builds an STS client from the default credential chain of the host.
    pub async fn new(
        region: Option<String>,
        session_duration: Duration,
        timeout: Duration,
    ) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region));
        }
        let config = loader.load().await;

        Self::from_client(aws_sdk_sts::Client::new(&config), session_duration, timeout)
    }

    pub fn from_client(
        client: aws_sdk_sts::Client,
        session_duration: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            session_duration,
            timeout,
        }
    }
}

#[async_trait]
impl CredentialIssuer for StsIssuer {
    #[tracing::instrument(skip(self, role), fields(role = %role))]
    async fn assume_role(
        &self,
        role: &RoleArn,
        session_name: &str,
    ) -> Result<Credentials, IssuerError> {
        let duration_seconds =
            i32::try_from(self.session_duration.as_secs()).unwrap_or(i32::MAX);

        let request = self
            .client
            .assume_role()
            .role_arn(role.canonical())
            .role_session_name(session_name)
            .duration_seconds(duration_seconds)
            .send();

        let response = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| IssuerError::Timeout)?
            .map_err(|e| IssuerError::AssumeRole(DisplayErrorContext(&e).to_string()))?;

        let credentials = response
            .credentials()
            .ok_or(IssuerError::MissingCredentials)?;

        let expiration = credentials.expiration();
        let expiration: DateTime<Utc> =
            DateTime::from_timestamp(expiration.secs(), expiration.subsec_nanos())
                .ok_or(IssuerError::InvalidExpiration)?;

        tracing::debug!("[sts] assumed role {}, expires_at: {}", role, expiration);

        Ok(Credentials::new(
            credentials.access_key_id(),
            credentials.secret_access_key(),
            credentials.session_token(),
            expiration,
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_session_name_prefixes_role_name() {
        let role = RoleArn::parse("arn:aws:iam::12345:role/path/worker").unwrap();
        assert_eq!(session_name(&role), "Proxy_worker");
    }

    #[test]
    fn test_session_name_is_deterministic() {
        let role = RoleArn::parse("arn:aws:iam::12345:role/worker").unwrap();
        assert_eq!(session_name(&role), session_name(&role.clone()));
    }

    #[test]
    fn test_session_name_keeps_allowed_punctuation() {
        let role = RoleArn::parse("arn:aws:iam::12345:role/a+b=c,d.e@f-g").unwrap();
        assert_eq!(session_name(&role), "Proxy_a+b=c,d.e@f-g");
    }

    #[test]
    fn test_session_name_is_truncated() {
        let role =
            RoleArn::parse("arn:aws:iam::12345:role/a-very-long-role-name-for-the-batch-tier")
                .unwrap();
        let name = session_name(&role);
        assert_eq!(name.len(), MAX_SESSION_NAME_LEN);
        assert!(name.starts_with("Proxy_a-very-long"));
    }

    #[test]
    fn test_session_name_replaces_invalid_characters() {
        let role = RoleArn::parse("arn:aws:iam::12345:role/app#1").unwrap();
        assert_eq!(session_name(&role), "Proxy_app_1");
    }

    const ASSUME_ROLE_RESPONSE: &str = r#"<AssumeRoleResponse xmlns="https://sts.amazonaws.com/doc/2011-06-15/">
  <AssumeRoleResult>
    <Credentials>
      <AccessKeyId>ASIAEXAMPLE</AccessKeyId>
      <SecretAccessKey>example-secret</SecretAccessKey>
      <SessionToken>example-token</SessionToken>
      <Expiration>2030-01-01T00:00:00Z</Expiration>
    </Credentials>
    <AssumedRoleUser>
      <AssumedRoleId>AROAEXAMPLE:Proxy_worker</AssumedRoleId>
      <Arn>arn:aws:sts::12345:assumed-role/worker/Proxy_worker</Arn>
    </AssumedRoleUser>
  </AssumeRoleResult>
  <ResponseMetadata>
    <RequestId>c6104cbe-af31-11e0-8154-cbc7ccf896c7</RequestId>
  </ResponseMetadata>
</AssumeRoleResponse>"#;

    fn issuer(endpoint: String, timeout: Duration) -> StsIssuer {
        use aws_sdk_sts::config::Credentials as StaticCredentials;

        let config = aws_sdk_sts::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(StaticCredentials::new(
                "AKIDEXAMPLE",
                "example",
                None,
                None,
                "test",
            ))
            .endpoint_url(endpoint)
            .build();

        StsIssuer::from_client(
            aws_sdk_sts::Client::from_conf(config),
            Duration::from_secs(3600),
            timeout,
        )
    }

    #[tokio::test]
    async fn test_assume_role_converts_response() {
        use wiremock::matchers::{body_string_contains, method};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let sts = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("Action=AssumeRole"))
            .and(body_string_contains("RoleSessionName=Proxy_worker"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/xml")
                    .set_body_string(ASSUME_ROLE_RESPONSE),
            )
            .expect(1)
            .mount(&sts)
            .await;

        let role = RoleArn::parse("arn:aws:iam::12345:role/worker").unwrap();
        let credentials = issuer(sts.uri(), Duration::from_secs(5))
            .assume_role(&role, &session_name(&role))
            .await
            .unwrap();

        assert_eq!(credentials.access_key_id, "ASIAEXAMPLE");
        assert_eq!(credentials.session_token, "example-token");
        assert_eq!(
            credentials.expiration,
            DateTime::parse_from_rfc3339("2030-01-01T00:00:00Z")
                .unwrap()
                .with_timezone(&Utc)
        );
    }

    #[tokio::test]
    async fn test_slow_assume_role_times_out() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let sts = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/xml")
                    .set_body_string(ASSUME_ROLE_RESPONSE)
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&sts)
            .await;

        let role = RoleArn::parse("arn:aws:iam::12345:role/worker").unwrap();
        let result = issuer(sts.uri(), Duration::from_millis(200))
            .assume_role(&role, &session_name(&role))
            .await;

        assert!(matches!(result, Err(IssuerError::Timeout)));
    }
}
