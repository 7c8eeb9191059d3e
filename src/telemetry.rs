// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Logging setup for test binaries using the harness.
//!
//! Respects `RUST_LOG` if set, otherwise defaults to `info`.
//! Respects `RUST_LOG_FORMAT` (`json` or `text`, default `text`).
//!
//! Example: `RUST_LOG=kubesweep=debug RUST_LOG_FORMAT=json cargo test -- --ignored`

use tracing_subscriber::EnvFilter;

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// Parse a `RUST_LOG_FORMAT` value; anything but `json` means text.
    #[must_use]
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::to_lowercase).as_deref() {
            Some("json") => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Install the global subscriber.
///
/// Safe to call from every test: only the first call installs anything.
/// Returns `true` if this call installed the subscriber.
pub fn init_tracing() -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let format = LogFormat::parse(std::env::var("RUST_LOG_FORMAT").ok().as_deref());

    let installed = match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_file(true)
            .with_line_number(true)
            .with_thread_names(true)
            .with_target(false)
            .with_test_writer()
            .json()
            .try_init(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_file(true)
            .with_line_number(true)
            .with_thread_names(true)
            .with_target(false)
            .with_test_writer()
            .compact()
            .try_init(),
    };

    installed.is_ok()
}

#[cfg(test)]
#[path = "telemetry_tests.rs"]
mod telemetry_tests;
