// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Request interception.
//!
//! Every request enters [`handle`]. Requests for
//! `/<version>/meta-data/iam/security-credentials/[<role>]` are answered
//! locally with the caller's role; everything else is forwarded to the real
//! metadata service.
//!
//! | Request | Response |
//! |---------|----------|
//! | `.../security-credentials/` | `200`, role name as plain text |
//! | `.../security-credentials/<role>[/...]` | `200`, credentials document |
//! | `.../security-credentials/<other>` | `404`, empty body |
//! | caller has no role | `500` |
//! | anything else | relayed from the metadata service |

use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, LazyLock};

use axum::Json;
use axum::body::{Body, to_bytes};
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, Method, header};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use percent_encoding::percent_decode_str;
use regex::Regex;

use crate::application::AppState;
use crate::constants::MAX_REQUEST_BODY_SIZE;
use crate::errors::AppError;
use crate::models::IamCredentialsDocument;

static CREDENTIALS_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/.+/meta-data/iam/security-credentials/(.*)$")
        .expect("credentials path pattern is valid")
});

// Headers that describe a single connection and must not be forwarded.
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Captured role segment of a credentials path, or `None` for pass-through.
pub fn credentials_role(path: &str) -> Option<&str> {
    CREDENTIALS_PATH
        .captures(path)
        .and_then(|captures| captures.get(1))
        .map(|segment| segment.as_str())
}

/// The metadata service ignores anything after `<role>/`, so clients may
/// request sub-paths of their role name.
pub fn role_path_matches(requested: &str, role_name: &str) -> bool {
    requested
        .strip_prefix(role_name)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

#[tracing::instrument(
    skip(state, request),
    fields(method = %request.method(), path = %request.uri().path())
)]
pub async fn handle(
    State(state): State<Arc<AppState>>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    request: Request,
) -> Result<Response, AppError> {
    // IPv4 callers may arrive as IPv4-mapped IPv6 addresses
    let caller = remote.ip().to_canonical();

    // role names are matched on the decoded path
    let path = percent_decode_str(request.uri().path())
        .decode_utf8_lossy()
        .into_owned();

    match credentials_role(&path) {
        Some(requested) => intercept(&state, caller, requested).await,
        None => pass_through(&state, request).await,
    }
}

async fn intercept(
    state: &AppState,
    caller: IpAddr,
    requested: &str,
) -> Result<Response, AppError> {
    let Some(role) = state.resolver.role_for_address(caller).await else {
        tracing::warn!(
            "[proxy] {}: no role defined for container, tracked roles: {:?}",
            caller,
            state.resolver.tracked_roles().await
        );
        return Err(AppError::NoRoleForCaller);
    };

    tracing::debug!("[proxy] {}: resolved role {}", caller, role);

    if requested.is_empty() {
        tracing::info!("[proxy] {}: listing role {}", caller, role.name());
        return Ok(role.name().to_string().into_response());
    }

    if !role_path_matches(requested, role.name()) {
        tracing::warn!(
            "[proxy] {}: requested role {:?} does not match {}",
            caller,
            requested,
            role.name()
        );
        return Err(AppError::UnrecognizedRolePath);
    }

    let Some(credentials) = state.broker.credentials_for(&role).await else {
        tracing::error!("[proxy] {}: no credentials available for {}", caller, role);
        return Err(AppError::NoCredentialsForRole);
    };

    tracing::info!(
        "[proxy] {}: serving credentials for {}, expires_at: {}",
        caller,
        role,
        credentials.expiration
    );

    let document = IamCredentialsDocument::success(credentials, Utc::now());
    Ok(Json(document).into_response())
}

async fn pass_through(state: &AppState, request: Request) -> Result<Response, AppError> {
    let (parts, body) = request.into_parts();
    let path = parts
        .uri
        .path_and_query()
        .map(|p| p.as_str())
        .unwrap_or("/");
    let url = format!("{}{}", state.metadata_endpoint, path);

    let body = to_bytes(body, MAX_REQUEST_BODY_SIZE).await.map_err(|e| {
        tracing::error!("[proxy] unable to read request body: {:?}", e);
        AppError::InternalServerError
    })?;

    let is_head = parts.method == Method::HEAD;
    let mut headers = forwardable(&parts.headers);
    headers.remove(header::HOST);

    tracing::debug!("[proxy] forwarding {} {}", parts.method, url);

    let upstream = state
        .upstream
        .request(parts.method, url)
        .headers(headers)
        .body(body)
        .send()
        .await?;

    let status = upstream.status();
    let mut headers = forwardable(upstream.headers());
    // the relayed body sets its own length, except for HEAD where it is empty
    if !is_head {
        headers.remove(header::CONTENT_LENGTH);
    }
    let body = upstream.bytes().await?;

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}

fn forwardable(headers: &HeaderMap) -> HeaderMap {
    let mut headers = headers.clone();
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
    headers
}
