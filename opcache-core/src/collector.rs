// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Scrape orchestration.
//!
//! Each scrape runs fetch -> parse -> map behind a single-permit gate, so at
//! most one backend exchange is in flight per collector. Failures never
//! reach the caller: the zero status is mapped instead and the error is
//! logged, keeping every series present on every scrape.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;

use crate::error::ScrapeError;
use crate::fastcgi::FastCgiClient;
use crate::metrics::{self, MetricDescriptor, Sample};
use crate::status::OpcacheStatus;
use crate::types::ScriptPath;

/// Outcome of one scrape cycle.
#[derive(Debug)]
pub struct ScrapeReport {
    /// Always the full sample set.
    pub samples: Vec<Sample>,
    /// Why the zero status was substituted, if it was.
    pub error: Option<ScrapeError>,
    pub duration: Duration,
}

/// OPcache collector bound to one backend and one status script.
#[derive(Debug)]
pub struct OpcacheCollector {
    client: FastCgiClient,
    script: ScriptPath,
    gate: Semaphore,
}

impl OpcacheCollector {
    pub fn new(client: FastCgiClient, script: ScriptPath) -> Self {
        Self {
            client,
            script,
            gate: Semaphore::new(1),
        }
    }

    /// Create a collector wrapped in an Arc for sharing across handlers.
    pub fn new_shared(client: FastCgiClient, script: ScriptPath) -> Arc<Self> {
        Arc::new(Self::new(client, script))
    }

    pub fn client(&self) -> &FastCgiClient {
        &self.client
    }

    /// Every descriptor this collector can emit. No backend access.
    pub fn describe(&self) -> &'static [MetricDescriptor] {
        metrics::descriptors()
    }

    /// Run one scrape cycle and return the samples.
    pub async fn collect(&self) -> Vec<Sample> {
        self.collect_report().await.samples
    }

    /// Run one scrape cycle, keeping the masked error for side-channel use.
    pub async fn collect_report(&self) -> ScrapeReport {
        let start = Instant::now();

        let _permit = match self.gate.acquire().await {
            Ok(permit) => permit,
            Err(_) => {
                // The gate is never closed; stay total regardless.
                return ScrapeReport {
                    samples: metrics::map(&OpcacheStatus::default()),
                    error: Some(ScrapeError::transport("scrape gate closed")),
                    duration: start.elapsed(),
                };
            }
        };

        let (status, error) = match self.fetch_status().await {
            Ok(status) => {
                tracing::debug!(
                    endpoint = %self.client.endpoint(),
                    enabled = status.enabled,
                    elapsed_ms = start.elapsed().as_millis(),
                    "Scraped OPcache status"
                );
                (status, None)
            }
            Err(e) => {
                tracing::warn!(
                    endpoint = %self.client.endpoint(),
                    script = %self.script,
                    error = %e,
                    "OPcache scrape failed, reporting zero status"
                );
                (OpcacheStatus::default(), Some(e))
            }
        };

        ScrapeReport {
            samples: metrics::map(&status),
            error,
            duration: start.elapsed(),
        }
    }

    async fn fetch_status(&self) -> Result<OpcacheStatus, ScrapeError> {
        let body = self.client.fetch(&self.script).await?;
        OpcacheStatus::parse(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::METRIC_COUNT;
    use crate::types::Endpoint;

    async fn unreachable_collector() -> OpcacheCollector {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        OpcacheCollector::new(
            FastCgiClient::new(Endpoint::parse(&addr.to_string()).unwrap()),
            ScriptPath::new("/tmp/opcache.php").unwrap(),
        )
    }

    #[tokio::test]
    async fn test_describe_matches_registry() {
        let collector = unreachable_collector().await;
        assert_eq!(collector.describe().len(), METRIC_COUNT);
        assert_eq!(collector.describe()[0].fq_name(), "opcache_enabled");
    }

    #[tokio::test]
    async fn test_unreachable_backend_yields_zeros() {
        let collector = unreachable_collector().await;

        let report = collector.collect_report().await;
        assert!(matches!(report.error, Some(ScrapeError::Connection { .. })));
        assert_eq!(report.samples.len(), METRIC_COUNT);
        assert!(report.samples.iter().all(|s| s.value == 0.0));
    }

    #[tokio::test]
    async fn test_collect_is_repeatable() {
        let collector = unreachable_collector().await;
        let first = collector.collect().await;
        let second = collector.collect().await;
        assert_eq!(first, second);
    }
}
