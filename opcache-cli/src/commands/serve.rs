// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `opcache_exporter serve` command - Serve metrics over HTTP.

use std::path::Path;

use opcache_core::{ConfigLoader, OpcacheCollector, Overrides};

use super::resolve_script;
use crate::server;

pub async fn execute(
    config_file: Option<&Path>,
    overrides: Overrides,
) -> Result<(), Box<dyn std::error::Error>> {
    // Fail fast on invalid config
    let config = ConfigLoader::resolve(config_file, overrides)?;

    // Held until the server stops so the provisioned script outlives every scrape
    let (script, _provisioned) = resolve_script(&config)?;

    tracing::info!(
        endpoint = %config.opcache.endpoint,
        script = %script,
        timeout_ms = config.opcache.fcgi_timeout.map(|t| t.as_millis() as u64),
        "Starting OPcache exporter"
    );

    let collector = OpcacheCollector::new_shared(config.opcache.client(), script);

    server::start_server(&config.web, collector).await
}
