//! Version-check and usage telemetry backend for Python client libraries.
//!
//! Clients report the package, version, platform and interpreter they run;
//! the service records the installation and answers with the latest release
//! on the matching channel. A usage report aggregates the last 24 hours of
//! installations per package.
//!
//! # Modules
//!
//! - [`check`]: Input normalization, version classification, request schema
//! - [`release`]: Latest-release resolution against a package index
//! - [`store`]: SQLite persistence, installation recorder and usage report
//! - [`server`]: axum router and server lifecycle
//! - [`config`]: Server configuration and data paths
//! - [`logging`]: Tracing subscriber setup

pub mod check;
pub mod config;
pub mod logging;
pub mod release;
pub mod server;
pub mod store;
