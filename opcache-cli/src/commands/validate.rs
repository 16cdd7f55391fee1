// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `opcache_exporter validate` command - Validate configuration file.

use std::path::Path;

use opcache_core::{ConfigLoader, Overrides};

pub async fn execute(
    file: Option<&Path>,
    overrides: Overrides,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(file = ?file, "Validating configuration");

    match ConfigLoader::resolve(file, overrides) {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Web Settings:");
            println!("  Listen Address:  {}", config.web.listen_address);
            println!("  Telemetry Path:  {}", config.web.telemetry_path);
            println!();
            println!("OPcache Settings:");
            println!("  FastCGI URI:     {}", config.opcache.endpoint);
            match &config.opcache.script_path {
                Some(path) => println!("  Script Path:     {}", path),
                None => println!("  Script Path:     (temporary, provisioned at startup)"),
            }
            match config.opcache.fcgi_timeout {
                Some(timeout) => println!("  FastCGI Timeout: {}ms", timeout.as_millis()),
                None => println!("  FastCGI Timeout: none"),
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed:");
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    }
}
