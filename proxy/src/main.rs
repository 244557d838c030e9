// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::sync::Arc;

use anyhow::{Context, anyhow};
use clap::Parser;
use metadata_proxy::application::{AppState, Application};
use metadata_proxy::broker::CredentialBroker;
use metadata_proxy::configuration::ProxyOptions;
use metadata_proxy::inventory::DockerInventory;
use metadata_proxy::issuer::StsIssuer;
use metadata_proxy::resolver::ContainerResolver;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("[proxy] init");

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        // this needs to be set to remove duplicated information in the log.
        .with_current_span(false)
        // this needs to be set to false, otherwise ANSI color codes will
        // show up in a confusing manner in CloudWatch logs.
        .with_ansi(false)
        // remove the name of the function from every log entry
        .with_target(false)
        .init();

    // get configuration options from arguments and environment variables
    let options = ProxyOptions::parse();
    options.validate().map_err(|e| anyhow!(e))?;

    tracing::info!("[proxy] {:?}", &options);

    let inventory = DockerInventory::connect(
        options.docker_socket.as_deref(),
        options.inventory_timeout(),
    )
    .await
    .context("unable to connect to docker")?;

    let resolver = Arc::new(ContainerResolver::new(
        Arc::new(inventory),
        options.min_poll_interval(),
        options.container_max_age(),
    ));

    let issuer = StsIssuer::new(
        options.region.clone(),
        options.session_duration(),
        options.issuer_timeout(),
    )
    .await;
    let broker = Arc::new(CredentialBroker::new(
        Arc::new(issuer),
        options.refresh_threshold(),
    ));

    let state = AppState::new(&options, resolver, broker)
        .context("unable to build metadata service client")?;

    let application = Application::build(options, state).await?;

    application.run_until_stopped().await?;

    Ok(())
}
