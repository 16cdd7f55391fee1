// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! End-to-end tests for the scrape path.
//!
//! A fake PHP-FPM speaks just enough FastCGI to answer one request per
//! connection, so the full fetch -> parse -> map cycle runs over real sockets.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use opcache_core::fastcgi::{
    write_end_request, write_stream, ProtocolStatus, RecordHeader, RecordType, HEADER_LEN,
};
use opcache_core::{
    ConfigLoader, Endpoint, FastCgiClient, OpcacheCollector, Sample, ScrapeError, ScriptPath,
    METRIC_COUNT,
};
use tempfile::TempDir;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, UnixListener};

/// Counters shared between the fake backend and the test.
#[derive(Default)]
struct FpmStats {
    active: AtomicUsize,
    max_active: AtomicUsize,
    served: AtomicUsize,
}

/// Read one FastCGI request up to the empty STDIN record and return the
/// PARAMS content.
async fn read_request<S: AsyncRead + Unpin>(stream: &mut S) -> Vec<u8> {
    let mut params = Vec::new();
    loop {
        let mut raw = [0u8; HEADER_LEN];
        stream.read_exact(&mut raw).await.unwrap();
        let header = RecordHeader::decode(&raw).unwrap();

        let mut body = vec![0u8; header.body_len()];
        stream.read_exact(&mut body).await.unwrap();
        body.truncate(header.content_length as usize);

        match header.record_type {
            RecordType::Params => params.extend_from_slice(&body),
            RecordType::Stdin if header.content_length == 0 => return params,
            _ => {}
        }
    }
}

/// Answer one connection with `body` as the script output.
async fn serve_one<S>(mut stream: S, body: Vec<u8>, delay: Duration, stats: Arc<FpmStats>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let now_active = stats.active.fetch_add(1, Ordering::SeqCst) + 1;
    stats.max_active.fetch_max(now_active, Ordering::SeqCst);

    let params = read_request(&mut stream).await;
    assert!(
        params.windows(15).any(|w| w == b"SCRIPT_FILENAME"),
        "request is missing SCRIPT_FILENAME"
    );

    tokio::time::sleep(delay).await;

    let mut stdout = b"X-Powered-By: PHP/8.3.4\r\nContent-type: text/html; charset=UTF-8\r\n\r\n".to_vec();
    stdout.extend_from_slice(&body);

    let mut reply = Vec::new();
    write_stream(&mut reply, RecordType::Stdout, 1, &stdout);
    stream.write_all(&reply).await.unwrap();

    // Leave before END_REQUEST so the next scrape cannot be counted as overlapping.
    stats.active.fetch_sub(1, Ordering::SeqCst);
    stats.served.fetch_add(1, Ordering::SeqCst);

    let mut end = Vec::new();
    write_end_request(&mut end, 1, 0, ProtocolStatus::RequestComplete);
    stream.write_all(&end).await.unwrap();
    stream.shutdown().await.ok();
}

/// Fake PHP-FPM on TCP. `respond` builds the body from the connection number.
async fn spawn_fpm<F>(respond: F, delay: Duration) -> (SocketAddr, Arc<FpmStats>)
where
    F: Fn(usize) -> Vec<u8> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let stats = Arc::new(FpmStats::default());
    let respond = Arc::new(respond);

    let server_stats = Arc::clone(&stats);
    tokio::spawn(async move {
        let mut connection = 0usize;
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            connection += 1;
            let body = respond(connection);
            let stats = Arc::clone(&server_stats);
            // One task per connection so overlapping scrapes would be visible.
            tokio::spawn(serve_one(stream, body, delay, stats));
        }
    });

    (addr, stats)
}

fn collector_for(addr: SocketAddr) -> OpcacheCollector {
    OpcacheCollector::new(
        FastCgiClient::new(Endpoint::parse(&addr.to_string()).unwrap()),
        ScriptPath::new("/var/www/opcache-status.php").unwrap(),
    )
}

fn value_of(samples: &[Sample], fq_name: &str) -> f64 {
    samples
        .iter()
        .find(|s| s.descriptor.fq_name() == fq_name)
        .map(|s| s.value)
        .unwrap_or_else(|| panic!("missing sample {}", fq_name))
}

fn assert_all_zero(samples: &[Sample]) {
    assert_eq!(samples.len(), METRIC_COUNT);
    assert!(samples.iter().all(|s| s.value == 0.0));
}

/// Document where the memory and hit counters all equal `n`.
fn numbered_document(n: usize) -> Vec<u8> {
    format!(
        r#"{{"opcache_enabled":true,"cache_full":false,
            "memory_usage":{{"used_memory":{n},"free_memory":{n},"wasted_memory":0,"current_wasted_percentage":0.0}},
            "opcache_statistics":{{"hits":{n},"misses":0}}}}"#,
        n = n
    )
    .into_bytes()
}

/// Test the documented scrape scenario end to end
#[tokio::test]
async fn test_scrape_success_scenario() {
    let document = br#"{"opcache_enabled":true,"cache_full":false,"restart_pending":false,"restart_in_progress":false,
        "memory_usage":{"used_memory":1000,"free_memory":500,"wasted_memory":0,"current_wasted_percentage":0.0},
        "interned_strings_usage":{"buffer_size":0,"used_memory":0,"free_memory":0,"number_of_strings":0},
        "opcache_statistics":{"num_cached_scripts":0,"num_cached_keys":0,"max_cached_keys":0,"hits":0,
            "start_time":0,"last_restart_time":0,"oom_restarts":0,"hash_restarts":0,"manual_restarts":0,
            "misses":0,"blacklist_misses":0,"blacklist_miss_ratio":0,"opcache_hit_rate":0}}"#
        .to_vec();

    let (addr, stats) = spawn_fpm(move |_| document.clone(), Duration::ZERO).await;
    let collector = collector_for(addr);

    let report = collector.collect_report().await;
    assert!(report.error.is_none(), "unexpected error: {:?}", report.error);

    let samples = report.samples;
    assert_eq!(samples.len(), METRIC_COUNT);
    assert_eq!(value_of(&samples, "opcache_enabled"), 1.0);
    assert_eq!(value_of(&samples, "opcache_cache_full"), 0.0);
    assert_eq!(value_of(&samples, "opcache_memory_usage_used_memory"), 1000.0);
    assert_eq!(value_of(&samples, "opcache_memory_usage_free_memory"), 500.0);
    assert_eq!(stats.served.load(Ordering::SeqCst), 1);
}

/// Test that every scrape performs its own backend call
#[tokio::test]
async fn test_each_scrape_fetches_fresh_state() {
    let (addr, stats) = spawn_fpm(numbered_document, Duration::ZERO).await;
    let collector = collector_for(addr);

    let first = collector.collect().await;
    let second = collector.collect().await;

    assert_eq!(value_of(&first, "opcache_statistics_hits"), 1.0);
    assert_eq!(value_of(&second, "opcache_statistics_hits"), 2.0);
    assert_eq!(stats.served.load(Ordering::SeqCst), 2);
}

/// Test backend connection refused
#[tokio::test]
async fn test_connection_refused_yields_zero_set() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let collector = collector_for(addr);
    let report = collector.collect_report().await;

    assert!(matches!(report.error, Some(ScrapeError::Connection { .. })));
    assert_all_zero(&report.samples);
}

/// Test malformed payloads are masked into the zero set
#[tokio::test]
async fn test_malformed_payloads_yield_zero_set() {
    let payloads: [&'static [u8]; 5] = [
        b"",
        b"Primary script unknown\n",
        b"false",
        b"{\"opcache_enabled\":true,\"memory_usage\":{",
        b"<b>Fatal error</b>: Uncaught Error: Call to undefined function opcache_get_status()",
    ];

    for payload in payloads {
        let (addr, _) = spawn_fpm(move |_| payload.to_vec(), Duration::ZERO).await;
        let report = collector_for(addr).collect_report().await;

        match &report.error {
            Some(ScrapeError::Parse { payload: kept }) => {
                assert_eq!(kept.as_bytes(), payload);
            }
            other => panic!("expected parse error for {:?}, got {:?}", payload, other),
        }
        assert_all_zero(&report.samples);
    }
}

/// Test concurrent scrapes are serialized and never mix responses
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_scrapes_do_not_overlap() {
    const SCRAPES: usize = 8;

    let (addr, stats) = spawn_fpm(numbered_document, Duration::from_millis(20)).await;
    let collector = Arc::new(collector_for(addr));

    let handles: Vec<_> = (0..SCRAPES)
        .map(|_| {
            let collector = Arc::clone(&collector);
            tokio::spawn(async move { collector.collect().await })
        })
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        let samples = handle.await.unwrap();
        assert_eq!(samples.len(), METRIC_COUNT);

        // All three counters come from the same response.
        let hits = value_of(&samples, "opcache_statistics_hits");
        assert_eq!(value_of(&samples, "opcache_memory_usage_used_memory"), hits);
        assert_eq!(value_of(&samples, "opcache_memory_usage_free_memory"), hits);
        assert_eq!(value_of(&samples, "opcache_enabled"), 1.0);
        seen.insert(hits as u64);
    }

    assert_eq!(seen.len(), SCRAPES);
    assert_eq!(stats.served.load(Ordering::SeqCst), SCRAPES);
    assert_eq!(stats.max_active.load(Ordering::SeqCst), 1);
}

/// Test a hung backend is cut off when a timeout is configured
#[tokio::test]
async fn test_timeout_yields_zero_set() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    // Accept and never answer.
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    let client = FastCgiClient::new(Endpoint::parse(&addr.to_string()).unwrap())
        .with_timeout(Some(Duration::from_millis(100)));
    let collector = OpcacheCollector::new(client, ScriptPath::new("/tmp/status.php").unwrap());

    let report = collector.collect_report().await;
    assert!(matches!(report.error, Some(ScrapeError::Transport { .. })));
    assert_all_zero(&report.samples);
}

/// Test scraping over a Unix domain socket
#[tokio::test]
async fn test_unix_socket_endpoint() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let socket_path = temp_dir.path().join("php-fpm.sock");
    let listener = UnixListener::bind(&socket_path).expect("Failed to bind socket");

    let stats = Arc::new(FpmStats::default());
    let server_stats = Arc::clone(&stats);
    tokio::spawn(async move {
        if let Ok((stream, _)) = listener.accept().await {
            serve_one(stream, numbered_document(42), Duration::ZERO, server_stats).await;
        }
    });

    let endpoint = Endpoint::parse(&format!("unix://{}", socket_path.display())).unwrap();
    let collector = OpcacheCollector::new(
        FastCgiClient::new(endpoint),
        ScriptPath::new("/var/www/opcache-status.php").unwrap(),
    );

    let samples = collector.collect().await;
    assert_eq!(value_of(&samples, "opcache_statistics_hits"), 42.0);
    assert_eq!(stats.served.load(Ordering::SeqCst), 1);
}

/// Test configuration file loading drives the client
#[tokio::test]
async fn test_config_file_to_scrape() {
    let (addr, _) = spawn_fpm(numbered_document, Duration::ZERO).await;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("opcache-exporter.yaml");
    std::fs::write(
        &config_path,
        format!(
            r#"
web:
  listen_address: ":9101"
opcache:
  fcgi_uri: "{}"
  script_path: /var/www/opcache-status.php
  fcgi_timeout_ms: 5000
"#,
            addr
        ),
    )
    .expect("Failed to write config");

    let config = ConfigLoader::load_file(&config_path).expect("Failed to load config");
    let script = config.opcache.script_path.clone().unwrap();
    let collector = OpcacheCollector::new(config.opcache.client(), script);

    let samples = collector.collect().await;
    assert_eq!(value_of(&samples, "opcache_enabled"), 1.0);
    assert_eq!(value_of(&samples, "opcache_statistics_hits"), 1.0);
}
