// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! OPcache status document.
//!
//! Mirrors the JSON produced by `json_encode(opcache_get_status(false))`.
//! Decoding is lenient: unknown keys are ignored and missing keys (or `null`
//! sections) fall back to zero, so newer PHP releases that add fields keep
//! working. The zero value doubles as the failure surrogate used by the
//! collector.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ScrapeError;

/// Full OPcache snapshot. Either decoded from a complete document or the
/// all-zero [`OpcacheStatus::default`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpcacheStatus {
    #[serde(rename = "opcache_enabled", deserialize_with = "null_as_default")]
    pub enabled: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub cache_full: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub restart_pending: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub restart_in_progress: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub memory_usage: MemoryUsage,
    #[serde(deserialize_with = "null_as_default")]
    pub interned_strings_usage: InternedStringsUsage,
    #[serde(rename = "opcache_statistics", deserialize_with = "null_as_default")]
    pub statistics: OpcacheStatistics,
}

/// Shared memory usage, in bytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryUsage {
    #[serde(deserialize_with = "null_as_default")]
    pub used_memory: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub free_memory: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub wasted_memory: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub current_wasted_percentage: f64,
}

/// Interned strings buffer usage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InternedStringsUsage {
    #[serde(deserialize_with = "null_as_default")]
    pub buffer_size: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub used_memory: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub free_memory: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub number_of_strings: i64,
}

/// Hit/miss counters and restart history. Timestamps are unix seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpcacheStatistics {
    #[serde(deserialize_with = "null_as_default")]
    pub num_cached_scripts: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub num_cached_keys: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub max_cached_keys: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub hits: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub start_time: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub last_restart_time: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub oom_restarts: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub hash_restarts: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub manual_restarts: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub misses: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub blacklist_misses: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub blacklist_miss_ratio: f64,
    #[serde(rename = "opcache_hit_rate", deserialize_with = "null_as_default")]
    pub hit_rate: f64,
}

impl OpcacheStatus {
    /// Decode a status document returned by the backend.
    ///
    /// # Errors
    /// Returns [`ScrapeError::Parse`] carrying the raw body when it is not a
    /// JSON object. PHP-FPM error pages and `false` (cache disabled) land here.
    pub fn parse(body: &[u8]) -> Result<Self, ScrapeError> {
        serde_json::from_slice(body).map_err(|e| {
            tracing::debug!(error = %e, bytes = body.len(), "Status document rejected");
            ScrapeError::Parse {
                payload: String::from_utf8_lossy(body).into_owned(),
            }
        })
    }

    /// Encode back into the document schema the backend produces.
    pub fn to_document(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Treat a JSON `null` as an absent value.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
