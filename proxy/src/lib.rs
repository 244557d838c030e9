// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! # Metadata Proxy
//!
//! An intercepting proxy between containers and the EC2 instance metadata
//! service. Containers receive credentials for the IAM role they declared
//! instead of the credentials of the host.
//!
//! ## Architecture
//!
//! ```text
//! Container -> metadata-proxy -> 169.254.169.254 (everything else)
//!                    |
//!                    +-> resolver -> Docker (IP -> declared role)
//!                    +-> broker   -> STS AssumeRole (role -> credentials)
//! ```
//!
//! Requests for `/<version>/meta-data/iam/security-credentials/[<role>]`
//! are answered locally from the caller's source address; all other requests
//! are forwarded unchanged.
//!
//! ## Modules
//!
//! - [`application`]: HTTP server setup with Axum, tracing, and timeouts
//! - [`arn`]: IAM role ARN parsing
//! - [`broker`]: role credentials with refresh and stale fallback
//! - [`cache`]: credential snapshots keyed by role
//! - [`configuration`]: CLI argument parsing with clap
//! - [`constants`]: fixed names and default timers
//! - [`errors`]: application error types with HTTP response mapping
//! - [`inventory`]: container listing and inspection (Docker)
//! - [`issuer`]: credential issuance (STS)
//! - [`models`]: credential and container value types
//! - [`proxy`]: request classification, interception and pass-through
//! - [`resolver`]: container address to role mapping
//!
//! ## Usage
//!
//! ```bash
//! metadata-proxy --host 0.0.0.0 --port 18000 --region eu-west-1
//! ```
//!
//! Container traffic to `169.254.169.254:80` is expected to be redirected to
//! the proxy (for example with an iptables `DNAT` rule on the docker bridge).
//! Each container declares its role in the `IAM_ROLE` environment variable.

pub mod application;
pub mod arn;
pub mod broker;
pub mod cache;
pub mod configuration;
pub mod constants;
pub mod errors;
pub mod inventory;
pub mod issuer;
pub mod models;
pub mod proxy;
pub mod resolver;
