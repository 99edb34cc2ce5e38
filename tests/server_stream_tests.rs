//! Tests for the throttled server stream
//!
//! These tests verify:
//! - Deduplication by message with a per-message count
//! - Write condition (offline and crawler suppression, custom predicates)
//! - Request shape (method, URL, headers, credentials)
//! - Failure reporting without stopping the throttle loop
//! - Stop/start and the flush-on-close teardown path

use async_trait::async_trait;
use browser_bunyan::appenders::{
    BeaconTransport, DeliveryFailure, Environment, ServerStream, ServerStreamConfig,
    StaticEnvironment, Transport, TransportRequest, TransportResponse,
};
use browser_bunyan::core::{
    Level, LogRecord, LogStream, Logger, LoggerError, LoggerOptions, Result, StreamSpec,
};
use serde_json::Value;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

#[derive(Clone)]
struct RecordingTransport {
    requests: Arc<Mutex<Vec<TransportRequest>>>,
    status: Arc<AtomicU16>,
}

impl RecordingTransport {
    fn new() -> Self {
        Self::with_status(200)
    }

    fn with_status(status: u16) -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            status: Arc::new(AtomicU16::new(status)),
        }
    }

    fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn batches(&self) -> Vec<Vec<Value>> {
        self.requests()
            .iter()
            .map(|r| serde_json::from_str(&r.body).expect("body is a JSON array"))
            .collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
        self.requests.lock().unwrap().push(request);
        Ok(TransportResponse::new(self.status.load(Ordering::SeqCst)))
    }
}

struct UnreachableTransport;

#[async_trait]
impl Transport for UnreachableTransport {
    async fn send(&self, _request: TransportRequest) -> Result<TransportResponse> {
        Err(LoggerError::transport("connection refused"))
    }
}

#[derive(Clone, Default)]
struct RecordingBeacon {
    sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl BeaconTransport for RecordingBeacon {
    fn send_beacon(&self, url: &str, body: String) -> bool {
        self.sent.lock().unwrap().push((url.to_string(), body));
        true
    }
}

fn record(msg: &str) -> LogRecord {
    LogRecord::new(Level::INFO, msg)
}

/// Advance the paused clock past one default throttle tick.
async fn next_tick() {
    sleep(Duration::from_millis(3001)).await;
    tokio::task::yield_now().await;
}

#[tokio::test(start_paused = true)]
async fn test_dedup_within_one_tick() {
    let transport = RecordingTransport::new();
    let stream = ServerStream::new(ServerStreamConfig::default(), transport.clone()).unwrap();

    stream.write(&record("one"));
    stream.write(&record("one").with_field("extra", true));
    stream.write(&record("two"));
    assert!(transport.requests().is_empty());

    next_tick().await;

    let batches = transport.batches();
    assert_eq!(batches.len(), 1);
    let batch = &batches[0];
    assert_eq!(batch.len(), 2);
    assert_eq!(batch[0]["msg"], "one");
    assert_eq!(batch[0]["count"], 2);
    // later fields of a repeated message are discarded
    assert!(batch[0].get("extra").is_none());
    assert_eq!(batch[1]["msg"], "two");
    assert_eq!(batch[1]["count"], 1);
    assert_eq!(batch[1]["userAgent"], "no-window");
    assert_eq!(batch[1]["url"], Value::Null);
}

#[tokio::test(start_paused = true)]
async fn test_default_request_shape() {
    let transport = RecordingTransport::new();
    let stream = ServerStream::new(ServerStreamConfig::default(), transport.clone()).unwrap();
    stream.write(&record("shape"));
    next_tick().await;

    let request = &transport.requests()[0];
    assert_eq!(request.method, "PUT");
    assert_eq!(request.url, "/log");
    assert_eq!(request.headers["Content-Type"], "application/json");
    assert!(!request.with_credentials);
}

#[tokio::test(start_paused = true)]
async fn test_custom_request_shape() {
    let transport = RecordingTransport::new();
    let mut config = ServerStreamConfig {
        method: "POST".into(),
        url: "https://logs.example.com/ingest".into(),
        throttle_interval: 500,
        with_credentials: true,
        ..Default::default()
    };
    config.headers.insert("X-Api-Key".into(), "secret".into());
    let stream = ServerStream::new(config, transport.clone()).unwrap();

    stream.write(&record("custom"));
    sleep(Duration::from_millis(501)).await;
    tokio::task::yield_now().await;

    let request = &transport.requests()[0];
    assert_eq!(request.method, "POST");
    assert_eq!(request.url, "https://logs.example.com/ingest");
    assert_eq!(request.headers["X-Api-Key"], "secret");
    assert_eq!(request.headers["Content-Type"], "application/json");
    assert!(request.with_credentials);
}

#[tokio::test(start_paused = true)]
async fn test_empty_tick_sends_nothing() {
    let transport = RecordingTransport::new();
    let _stream = ServerStream::new(ServerStreamConfig::default(), transport.clone()).unwrap();
    sleep(Duration::from_secs(30)).await;
    assert!(transport.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_offline_suppresses_everything() {
    let transport = RecordingTransport::new();
    let env = Arc::new(StaticEnvironment::new().with_online(false));
    let stream = ServerStream::builder(ServerStreamConfig::default())
        .transport(transport.clone())
        .environment_arc(env.clone())
        .build()
        .unwrap();

    stream.write(&record("lost"));
    sleep(Duration::from_secs(60)).await;
    assert!(transport.requests().is_empty());

    env.set_online(true);
    stream.write(&record("back online"));
    next_tick().await;
    assert_eq!(transport.batches()[0][0]["msg"], "back online");
}

#[tokio::test(start_paused = true)]
async fn test_crawler_is_suppressed() {
    let transport = RecordingTransport::new();
    let stream = ServerStream::builder(ServerStreamConfig::default())
        .transport(transport.clone())
        .environment(
            StaticEnvironment::new()
                .with_user_agent("Mozilla/5.0 (compatible; Googlebot/2.1)")
                .with_location("https://example.com/page"),
        )
        .build()
        .unwrap();

    stream.write(&record("from a bot"));
    next_tick().await;
    assert!(transport.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_custom_write_condition_and_location() {
    let transport = RecordingTransport::new();
    let stream = ServerStream::builder(ServerStreamConfig::default())
        .transport(transport.clone())
        .environment(StaticEnvironment::new().with_location("https://example.com/app"))
        .write_condition(|record: &LogRecord, env: &dyn Environment| {
            env.is_online() && record.level() >= Level::WARN
        })
        .build()
        .unwrap();

    stream.write(&record("info is dropped"));
    stream.write(&LogRecord::new(Level::ERROR, "errors go through"));
    next_tick().await;

    let batches = transport.batches();
    assert_eq!(batches[0].len(), 1);
    assert_eq!(batches[0][0]["msg"], "errors go through");
    assert_eq!(batches[0][0]["url"], "https://example.com/app");
}

#[tokio::test(start_paused = true)]
async fn test_error_callback_receives_failed_batch() {
    let transport = RecordingTransport::with_status(500);
    let failures: Arc<Mutex<Vec<(usize, u16)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&failures);
    let stream = ServerStream::builder(ServerStreamConfig::default())
        .transport(transport.clone())
        .on_error(move |_stream, records, failure| {
            let status = match failure {
                DeliveryFailure::Status(response) => response.status,
                DeliveryFailure::Transport(_) => 0,
            };
            sink.lock().unwrap().push((records.len(), status));
        })
        .build()
        .unwrap();

    stream.write(&record("a"));
    stream.write(&record("b"));
    next_tick().await;
    assert_eq!(*failures.lock().unwrap(), vec![(2, 500)]);

    // failed batches are not re-queued, and the loop keeps running
    transport.status.store(200, Ordering::SeqCst);
    stream.write(&record("c"));
    next_tick().await;
    let batches = transport.batches();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[1].len(), 1);
    assert_eq!(failures.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_transport_error_is_reported() {
    let failures = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&failures);
    let stream = ServerStream::builder(ServerStreamConfig::default())
        .transport(UnreachableTransport)
        .on_error(move |_stream, _records, failure| {
            sink.lock().unwrap().push(failure.to_string());
        })
        .build()
        .unwrap();

    stream.write(&record("unreachable"));
    next_tick().await;
    assert_eq!(
        *failures.lock().unwrap(),
        vec!["transport error: Transport error: connection refused".to_string()]
    );
    assert!(stream.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_failure_without_callback_keeps_running() {
    let transport = RecordingTransport::with_status(503);
    let stream = ServerStream::new(ServerStreamConfig::default(), transport.clone()).unwrap();

    stream.write(&record("first"));
    next_tick().await;
    stream.write(&record("second"));
    next_tick().await;

    assert_eq!(transport.requests().len(), 2);
    assert!(stream.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_stop_is_deferred_and_idempotent() {
    let transport = RecordingTransport::new();
    let stream = ServerStream::new(ServerStreamConfig::default(), transport.clone()).unwrap();
    assert!(stream.is_running());
    assert!(!stream.start());

    stream.stop();
    assert!(stream.is_running());
    stream.stop();
    sleep(Duration::from_millis(2)).await;
    assert!(!stream.is_running());

    stream.write(&record("ignored while stopped"));
    assert!(stream.pending_records().is_empty());
    sleep(Duration::from_secs(10)).await;
    assert!(transport.requests().is_empty());

    assert!(stream.start());
    stream.write(&record("restarted"));
    next_tick().await;
    assert_eq!(transport.batches()[0][0]["msg"], "restarted");
}

#[tokio::test(start_paused = true)]
async fn test_pending_records_snapshot() {
    let transport = RecordingTransport::new();
    let stream = ServerStream::new(ServerStreamConfig::default(), transport).unwrap();
    stream.write(&record("x"));
    stream.write(&record("x"));
    stream.write(&record("y"));

    let pending = stream.pending_records();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].get("count").and_then(|v| v.as_i64()), Some(2));
    assert_eq!(pending[1].msg(), "y");
    // a snapshot does not drain
    assert_eq!(stream.pending_records().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_flush_on_close_requires_post() {
    let beacon = RecordingBeacon::default();
    let put = ServerStream::builder(ServerStreamConfig {
        flush_on_close: true,
        ..Default::default()
    })
    .transport(RecordingTransport::new())
    .beacon_transport(beacon.clone())
    .build()
    .unwrap();
    put.write(&record("put"));
    assert!(!put.flush_on_close());
    assert!(beacon.sent.lock().unwrap().is_empty());

    let transport = RecordingTransport::new();
    let post = ServerStream::builder(ServerStreamConfig {
        method: "post".into(),
        flush_on_close: true,
        ..Default::default()
    })
    .transport(transport.clone())
    .beacon_transport(beacon.clone())
    .build()
    .unwrap();
    post.write(&record("bye"));
    post.write(&record("bye"));
    assert!(post.flush_on_close());
    assert!(!post.is_running());

    let sent = beacon.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "/log");
    let body: Vec<Value> = serde_json::from_str(&sent[0].1).unwrap();
    assert_eq!(body[0]["count"], 2);

    // the timer was cancelled, nothing is left for a tick
    next_tick().await;
    assert!(transport.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_flush_on_close_without_flag_is_noop() {
    let beacon = RecordingBeacon::default();
    let stream = ServerStream::builder(ServerStreamConfig {
        method: "POST".into(),
        ..Default::default()
    })
    .transport(RecordingTransport::new())
    .beacon_transport(beacon.clone())
    .build()
    .unwrap();
    stream.write(&record("kept"));
    assert!(!stream.flush_on_close());
    assert!(stream.is_running());
    assert_eq!(stream.pending_records().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_as_logger_stream() {
    let transport = RecordingTransport::new();
    let stream = ServerStream::new(ServerStreamConfig::default(), transport.clone()).unwrap();
    let log = Logger::new(
        LoggerOptions::new()
            .name("web")
            .streams(vec![StreamSpec::new(stream.clone()).level(Level::WARN)]),
    )
    .unwrap();

    log.info("not sent");
    log.warn(("retry %d", 1));
    log.warn(("retry %d", 1));
    log.error("fatal-ish");
    next_tick().await;

    let batch = &transport.batches()[0];
    assert_eq!(batch.len(), 2);
    assert_eq!(batch[0]["msg"], "retry 1");
    assert_eq!(batch[0]["count"], 2);
    assert_eq!(batch[0]["name"], "web");
    assert_eq!(batch[1]["level"], 50);
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let err = ServerStream::new(
        ServerStreamConfig {
            url: String::new(),
            ..Default::default()
        },
        RecordingTransport::new(),
    )
    .unwrap_err();
    assert!(err.is_config());
}
