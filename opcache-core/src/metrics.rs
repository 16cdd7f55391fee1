// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Metric descriptor registry and the status-to-sample mapping.
//!
//! The registry is a fixed, read-only table built once per process. Every
//! status field maps to exactly one gauge, in registry order, so a scrape
//! always yields the full set even when the status is the zero surrogate.

use lazy_static::lazy_static;
use prometheus::Opts;

use crate::status::OpcacheStatus;

/// Metric namespace prefix.
pub const NAMESPACE: &str = "opcache";

/// Number of gauges exported per scrape.
pub const METRIC_COUNT: usize = 25;

/// (name, help) in exposition order.
const DESCRIPTOR_TABLE: [(&str, &str); METRIC_COUNT] = [
    ("enabled", "Is OPcache enabled."),
    ("cache_full", "Is OPcache full."),
    ("restart_pending", "Is restart pending."),
    ("restart_in_progress", "Is restart in progress."),
    ("memory_usage_used_memory", "OPcache used memory."),
    ("memory_usage_free_memory", "OPcache free memory."),
    ("memory_usage_wasted_memory", "OPcache wasted memory."),
    (
        "memory_usage_current_wasted_percentage",
        "OPcache current wasted percentage.",
    ),
    (
        "interned_strings_usage_buffer_size",
        "OPcache interned string buffer size.",
    ),
    (
        "interned_strings_usage_used_memory",
        "OPcache interned string used memory.",
    ),
    (
        "interned_strings_usage_free_memory",
        "OPcache interned string free memory.",
    ),
    (
        "interned_strings_usage_number_of_strings",
        "OPcache interned string number of strings.",
    ),
    (
        "statistics_num_cached_scripts",
        "OPcache statistics, number of cached scripts.",
    ),
    (
        "statistics_num_cached_keys",
        "OPcache statistics, number of cached keys.",
    ),
    (
        "statistics_max_cached_keys",
        "OPcache statistics, max cached keys.",
    ),
    ("statistics_hits", "OPcache statistics, hits."),
    ("statistics_start_time", "OPcache statistics, start time."),
    (
        "statistics_last_restart_time",
        "OPcache statistics, last restart time.",
    ),
    ("statistics_oom_restarts", "OPcache statistics, oom restarts."),
    ("statistics_hash_restarts", "OPcache statistics, hash restarts."),
    (
        "statistics_manual_restarts",
        "OPcache statistics, manual restarts.",
    ),
    ("statistics_misses", "OPcache statistics, misses."),
    (
        "statistics_blacklist_misses",
        "OPcache statistics, blacklist misses.",
    ),
    (
        "statistics_blacklist_miss_ratio",
        "OPcache statistics, blacklist miss ratio.",
    ),
    ("statistics_hit_rate", "OPcache statistics, opcache hit rate."),
];

lazy_static! {
    /// Process-wide descriptor registry, in exposition order.
    pub static ref DESCRIPTORS: Vec<MetricDescriptor> = DESCRIPTOR_TABLE
        .iter()
        .map(|&(name, help)| MetricDescriptor::new(name, help))
        .collect();
}

/// Name and help text of one exported gauge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDescriptor {
    name: &'static str,
    help: &'static str,
    fq_name: String,
}

impl MetricDescriptor {
    fn new(name: &'static str, help: &'static str) -> Self {
        Self {
            name,
            help,
            fq_name: format!("{}_{}", NAMESPACE, name),
        }
    }

    /// Fully qualified name, e.g. `opcache_enabled`.
    pub fn fq_name(&self) -> &str {
        &self.fq_name
    }

    pub fn help(&self) -> &'static str {
        self.help
    }

    /// Options for building a prometheus gauge from this descriptor.
    pub fn opts(&self) -> Opts {
        Opts::new(self.name, self.help).namespace(NAMESPACE)
    }
}

/// One gauge value produced by a scrape.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub descriptor: &'static MetricDescriptor,
    pub value: f64,
}

/// The static descriptor registry.
pub fn descriptors() -> &'static [MetricDescriptor] {
    &DESCRIPTORS
}

/// Project a status snapshot onto the registry. Total and order-preserving.
pub fn map(status: &OpcacheStatus) -> Vec<Sample> {
    descriptors()
        .iter()
        .zip(values(status))
        .map(|(descriptor, value)| Sample { descriptor, value })
        .collect()
}

/// Field values in `DESCRIPTOR_TABLE` order.
fn values(status: &OpcacheStatus) -> [f64; METRIC_COUNT] {
    let memory = &status.memory_usage;
    let strings = &status.interned_strings_usage;
    let stats = &status.statistics;

    [
        bool_value(status.enabled),
        bool_value(status.cache_full),
        bool_value(status.restart_pending),
        bool_value(status.restart_in_progress),
        int_value(memory.used_memory),
        int_value(memory.free_memory),
        int_value(memory.wasted_memory),
        memory.current_wasted_percentage,
        int_value(strings.buffer_size),
        int_value(strings.used_memory),
        int_value(strings.free_memory),
        int_value(strings.number_of_strings),
        int_value(stats.num_cached_scripts),
        int_value(stats.num_cached_keys),
        int_value(stats.max_cached_keys),
        int_value(stats.hits),
        int_value(stats.start_time),
        int_value(stats.last_restart_time),
        int_value(stats.oom_restarts),
        int_value(stats.hash_restarts),
        int_value(stats.manual_restarts),
        int_value(stats.misses),
        int_value(stats.blacklist_misses),
        stats.blacklist_miss_ratio,
        stats.hit_rate,
    ]
}

fn bool_value(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

fn int_value(value: i64) -> f64 {
    value as f64
}
