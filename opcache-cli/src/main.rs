// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! OPcache Exporter
//!
//! Prometheus exporter for the PHP OPcache of a PHP-FPM pool.

use std::path::Path;

use clap::{Parser, Subcommand};

use opcache_core::Overrides;

mod commands;
mod server;

/// OPcache Exporter - PHP OPcache metrics over FastCGI
#[derive(Parser)]
#[command(name = "opcache_exporter")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Address to listen on for web interface and telemetry
    #[arg(long = "web.listen-address", global = true)]
    pub listen_address: Option<String>,

    /// Path under which to expose metrics
    #[arg(long = "web.telemetry-path", global = true)]
    pub telemetry_path: Option<String>,

    /// PHP-FPM FastCGI address (host:port, tcp://, unix:// or socket path)
    #[arg(long = "opcache.fcgi-uri", global = true)]
    pub fcgi_uri: Option<String>,

    /// Absolute path of the status script on the PHP-FPM host
    #[arg(long = "opcache.script-path", global = true)]
    pub script_path: Option<String>,

    /// Timeout for one FastCGI exchange in milliseconds
    #[arg(long = "opcache.fcgi-timeout-ms", global = true)]
    pub fcgi_timeout_ms: Option<u64>,

    /// Log level filter
    #[arg(long = "log.level", default_value = "info", global = true)]
    pub log_level: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve metrics over HTTP (default)
    Serve,

    /// Scrape once and print the metrics
    Scrape,

    /// Validate a configuration file
    Validate {
        /// Path to the configuration file (defaults to --config)
        file: Option<String>,
    },
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            listen_address: self.listen_address.clone(),
            telemetry_path: self.telemetry_path.clone(),
            fcgi_uri: self.fcgi_uri.clone(),
            script_path: self.script_path.clone(),
            fcgi_timeout_ms: self.fcgi_timeout_ms,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging. stdout is reserved for `scrape` output.
    let log_level = if cli.verbose {
        "debug"
    } else {
        cli.log_level.as_str()
    };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .init();

    let overrides = cli.overrides();
    let config = cli.config.as_deref().map(Path::new);

    // Dispatch to command handlers
    match &cli.command {
        None | Some(Commands::Serve) => commands::serve::execute(config, overrides).await,
        Some(Commands::Scrape) => commands::scrape::execute(config, overrides).await,
        Some(Commands::Validate { file }) => {
            let file = file.as_deref().map(Path::new).or(config);
            commands::validate::execute(file, overrides).await
        }
    }
}
