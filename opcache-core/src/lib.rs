// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! OPcache Exporter Core Library
//!
//! Bridges PHP-FPM and Prometheus: fetches the OPcache status document over
//! FastCGI, decodes it, and maps it onto a fixed set of gauges. Provides the
//! FastCGI client, status model, metric registry, scrape collector,
//! configuration loading and text exposition.

pub mod collector;
pub mod config;
pub mod error;
pub mod exposition;
pub mod fastcgi;
pub mod metrics;
pub mod script;
pub mod status;
pub mod types;

// Re-export commonly used types
pub use collector::{OpcacheCollector, ScrapeReport};
pub use config::{Config, ConfigLoader, OpcacheConfig, Overrides, WebConfig};
pub use error::{HardValidationError, OpcacheError, OpcacheResult, ScrapeError};
pub use fastcgi::FastCgiClient;
pub use metrics::{MetricDescriptor, Sample, METRIC_COUNT};
pub use script::StatusScript;
pub use status::OpcacheStatus;
pub use types::{Endpoint, ListenAddress, ScriptPath, TelemetryPath, HEALTH_PATH};
