// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Prometheus text exposition of scrape samples.

use prometheus::core::Collector;
use prometheus::proto::MetricFamily;
use prometheus::{Gauge, TextEncoder};

use crate::error::OpcacheResult;
use crate::metrics::Sample;

/// Content type of the rendered output.
pub const CONTENT_TYPE: &str = prometheus::TEXT_FORMAT;

/// Build one gauge family per sample. The gauges are scrape-local, so two
/// scrapes never write into the same metric.
pub fn families(samples: &[Sample]) -> OpcacheResult<Vec<MetricFamily>> {
    let mut families = Vec::with_capacity(samples.len());
    for sample in samples {
        let gauge = Gauge::with_opts(sample.descriptor.opts())?;
        gauge.set(sample.value);
        families.extend(gauge.collect());
    }
    Ok(families)
}

/// Render only the OPcache gauges.
pub fn encode(samples: &[Sample]) -> OpcacheResult<String> {
    let families = families(samples)?;
    Ok(TextEncoder::new().encode_to_string(&families)?)
}

/// Render the OPcache gauges followed by the default registry
/// (`process_*` metrics on Linux).
pub fn encode_with_defaults(samples: &[Sample]) -> OpcacheResult<String> {
    let mut families = families(samples)?;
    families.extend(prometheus::gather());
    Ok(TextEncoder::new().encode_to_string(&families)?)
}
