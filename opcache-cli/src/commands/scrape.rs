// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `opcache_exporter scrape` command - Scrape once and print the metrics.

use std::path::Path;

use opcache_core::{exposition, ConfigLoader, OpcacheCollector, Overrides};

use super::resolve_script;

pub async fn execute(
    config_file: Option<&Path>,
    overrides: Overrides,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigLoader::resolve(config_file, overrides)?;
    let (script, provisioned) = resolve_script(&config)?;

    let collector = OpcacheCollector::new(config.opcache.client(), script);
    let report = collector.collect_report().await;

    // Removes the temporary script before a possible early exit
    drop(provisioned);

    print!("{}", exposition::encode(&report.samples)?);

    tracing::debug!(
        elapsed_ms = report.duration.as_millis() as u64,
        "Scrape finished"
    );

    if let Some(e) = report.error {
        eprintln!("✗ Scrape of {} failed:", collector.client().endpoint());
        eprintln!("  {}", e);
        std::process::exit(1);
    }

    Ok(())
}
