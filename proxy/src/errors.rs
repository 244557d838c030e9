// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Errors that reach the HTTP client.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum AppError {
    #[error("no role defined for container")]
    NoRoleForCaller,
    #[error("no credentials defined for role")]
    NoCredentialsForRole,
    #[error("unrecognized role path")]
    UnrecognizedRolePath,
    #[error("an unexpected error occurred communicating with the metadata service")]
    UpstreamCommunication,
    #[error("internal server error")]
    InternalServerError,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            // mirrors the metadata service: no hint about how close the name was
            Self::UnrecognizedRolePath => return StatusCode::NOT_FOUND.into_response(),
            Self::NoRoleForCaller => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "No role defined for container",
            ),
            Self::NoCredentialsForRole => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "No credentials defined for role",
            ),
            Self::UpstreamCommunication => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Upstream communication error",
            ),
            Self::InternalServerError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        };

        let body = Json(json!({"code": status.as_u16(), "message": message}));

        (status, body).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(_source: reqwest::Error) -> Self {
        tracing::error!("[proxy] metadata service request failed: {:?}", _source);
        AppError::UpstreamCommunication
    }
}

/// Failures talking to the container runtime.
#[derive(thiserror::Error, Debug)]
pub enum InventoryError {
    #[error("unable to connect to container runtime: {0}")]
    Connect(String),
    #[error("unable to list containers: {0}")]
    List(String),
    #[error("unable to inspect container {0}: {1}")]
    Inspect(String, String),
    #[error("container runtime call timed out")]
    Timeout,
}

/// Failures obtaining credentials from the issuing service.
#[derive(thiserror::Error, Debug)]
pub enum IssuerError {
    #[error("assume role failed: {0}")]
    AssumeRole(String),
    #[error("no credentials in assume role response")]
    MissingCredentials,
    #[error("credential expiration out of range")]
    InvalidExpiration,
    #[error("assume role call timed out")]
    Timeout,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(error: AppError) -> (StatusCode, Vec<u8>) {
        let response = error.into_response();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn test_unrecognized_role_path_is_silent_404() {
        let (status, body) = body_of(AppError::UnrecognizedRolePath).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_internal_errors_are_500_with_message() {
        for error in [
            AppError::NoRoleForCaller,
            AppError::NoCredentialsForRole,
            AppError::UpstreamCommunication,
            AppError::InternalServerError,
        ] {
            let (status, body) = body_of(error).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(json["code"], 500);
            assert!(json["message"].is_string());
        }
    }
}
