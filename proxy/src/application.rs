// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use crate::broker::CredentialBroker;
use crate::configuration::ProxyOptions;
use crate::constants;
use crate::proxy;
use crate::resolver::ContainerResolver;
use axum::Router;
use axum::http::StatusCode;
use axum::extract::connect_info::IntoMakeServiceWithConnectInfo;
use axum::serve::Serve;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub struct AppState {
    pub metadata_endpoint: String,
    pub upstream: reqwest::Client,
    pub resolver: Arc<ContainerResolver>,
    pub broker: Arc<CredentialBroker>,
}

impl AppState {
    pub fn new(
        options: &ProxyOptions,
        resolver: Arc<ContainerResolver>,
        broker: Arc<CredentialBroker>,
    ) -> Result<Self, reqwest::Error> {
        let upstream = reqwest::Client::builder()
            .timeout(options.upstream_timeout())
            .no_proxy()
            // redirects are relayed to the caller, not followed
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            metadata_endpoint: options.metadata_base_url().to_string(),
            upstream,
            resolver,
            broker,
        })
    }
}

type ProxyServer = Serve<
    TcpListener,
    IntoMakeServiceWithConnectInfo<Router, SocketAddr>,
    axum::middleware::AddExtension<Router, axum::extract::ConnectInfo<SocketAddr>>,
>;

pub struct Application {
    port: u16,
    server: ProxyServer,
}

impl Application {
    pub async fn build(options: ProxyOptions, state: AppState) -> Result<Self, std::io::Error> {
        let address = format!("{}:{}", options.host, options.port);
        let listener = TcpListener::bind(address).await?;
        let server = run(listener, state)?;
        let port = server.local_addr()?.port();

        tracing::info!("[proxy] listening at http://{}:{}", options.host, port);

        Ok(Self { port, server })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

/// Every method and path is routed to [`proxy::handle`].
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .fallback(proxy::handle)
        .with_state(Arc::new(state))
        .layer(RequestBodyLimitLayer::new(constants::MAX_REQUEST_BODY_SIZE))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::INTERNAL_SERVER_ERROR,
            constants::REQUEST_TIMEOUT,
        ))
        .layer(TraceLayer::new_for_http())
}

#[tracing::instrument(skip(listener, state))]
pub fn run(listener: TcpListener, state: AppState) -> Result<ProxyServer, std::io::Error> {
    let app = create_router(state);
    Ok(axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    ))
}
