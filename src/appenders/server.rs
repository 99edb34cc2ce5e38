//! Throttled, deduplicating network stream
//!
//! [`ServerStream`] collects records between throttle ticks and uploads them
//! as one JSON array per tick. Records are deduplicated by message: the first
//! record with a given `msg` is kept and later ones only raise its `count`.
//!
//! The throttle loop is a tokio task:
//!
//! ```text
//! RUNNING --stop()--> STOPPED --start()--> RUNNING
//! ```
//!
//! On each tick the pending records are taken out synchronously, so records
//! written while a request is in flight land in a fresh batch. The loop
//! re-arms after every tick whatever the outcome; a failed batch is reported,
//! never re-queued.

use super::environment::{is_bot, Environment, StaticEnvironment};
use super::transport::{BeaconTransport, DeliveryFailure, Transport, TransportRequest};
use crate::core::{LogRecord, LogStream, LoggerError, Result};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::sleep;

/// Default upload method
pub const DEFAULT_METHOD: &str = "PUT";
/// Default upload URL
pub const DEFAULT_URL: &str = "/log";
/// Default throttle interval in milliseconds
pub const DEFAULT_THROTTLE_INTERVAL_MS: u64 = 3000;

/// Called with the failed batch when an upload does not succeed.
pub type ErrorCallback = Arc<dyn Fn(&ServerStream, &[LogRecord], &DeliveryFailure) + Send + Sync>;

/// Decides whether a record is queued at all.
pub type WriteCondition = Arc<dyn Fn(&LogRecord, &dyn Environment) -> bool + Send + Sync>;

/// Server stream configuration.
///
/// Deserializes from the camelCase keys used by browser configuration
/// (`throttleInterval`, `withCredentials`, `flushOnClose`); every key is
/// optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerStreamConfig {
    pub method: String,
    pub url: String,
    /// Extra request headers. `Content-Type: application/json` is sent unless
    /// overridden here.
    pub headers: IndexMap<String, String>,
    /// Milliseconds between ticks
    pub throttle_interval: u64,
    pub with_credentials: bool,
    /// Deliver pending records through the beacon transport on teardown.
    /// Only honored for POST.
    pub flush_on_close: bool,
}

impl Default for ServerStreamConfig {
    fn default() -> Self {
        Self {
            method: DEFAULT_METHOD.to_string(),
            url: DEFAULT_URL.to_string(),
            headers: IndexMap::new(),
            throttle_interval: DEFAULT_THROTTLE_INTERVAL_MS,
            with_credentials: false,
            flush_on_close: false,
        }
    }
}

impl ServerStreamConfig {
    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_interval)
    }

    /// Headers sent with each upload, defaults first.
    pub fn request_headers(&self) -> IndexMap<String, String> {
        let mut headers = IndexMap::with_capacity(self.headers.len() + 1);
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        for (name, value) in &self.headers {
            headers.retain(|existing: &String, _| !existing.eq_ignore_ascii_case(name));
            headers.insert(name.clone(), value.clone());
        }
        headers
    }

    fn validate(&self) -> Result<()> {
        if self.method.trim().is_empty() {
            return Err(LoggerError::config("server-stream", "method must not be empty"));
        }
        if self.url.trim().is_empty() {
            return Err(LoggerError::config("server-stream", "url must not be empty"));
        }
        if self.throttle_interval == 0 {
            return Err(LoggerError::config(
                "server-stream",
                "throttleInterval must be greater than zero",
            ));
        }
        Ok(())
    }
}

struct PendingRecord {
    record: LogRecord,
    count: u64,
}

struct Inner {
    config: ServerStreamConfig,
    transport: Arc<dyn Transport>,
    beacon: Option<Arc<dyn BeaconTransport>>,
    environment: Arc<dyn Environment>,
    on_error: Option<ErrorCallback>,
    write_condition: WriteCondition,
    /// Keyed by message, in first-seen order.
    pending: Mutex<IndexMap<String, PendingRecord>>,
    /// Present while RUNNING.
    stop_tx: Mutex<Option<watch::Sender<bool>>>,
    runtime: Handle,
}

/// Batching network stream. Clones share the same state.
///
/// Must be built inside a tokio runtime; the throttle loop starts
/// immediately.
#[derive(Clone)]
pub struct ServerStream {
    inner: Arc<Inner>,
}

/// Builder for [`ServerStream`].
pub struct ServerStreamBuilder {
    config: ServerStreamConfig,
    transport: Option<Arc<dyn Transport>>,
    beacon: Option<Arc<dyn BeaconTransport>>,
    environment: Option<Arc<dyn Environment>>,
    on_error: Option<ErrorCallback>,
    write_condition: Option<WriteCondition>,
}

impl ServerStreamBuilder {
    #[must_use]
    pub fn transport<T: Transport + 'static>(mut self, transport: T) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    #[must_use]
    pub fn transport_arc(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Transport used by [`ServerStream::flush_on_close`].
    #[must_use]
    pub fn beacon_transport<B: BeaconTransport + 'static>(mut self, beacon: B) -> Self {
        self.beacon = Some(Arc::new(beacon));
        self
    }

    #[must_use]
    pub fn beacon_transport_arc(mut self, beacon: Arc<dyn BeaconTransport>) -> Self {
        self.beacon = Some(beacon);
        self
    }

    #[must_use]
    pub fn environment<E: Environment + 'static>(self, environment: E) -> Self {
        self.environment_arc(Arc::new(environment))
    }

    #[must_use]
    pub fn environment_arc(mut self, environment: Arc<dyn Environment>) -> Self {
        self.environment = Some(environment);
        self
    }

    #[must_use]
    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ServerStream, &[LogRecord], &DeliveryFailure) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(callback));
        self
    }

    #[must_use]
    pub fn write_condition<F>(mut self, condition: F) -> Self
    where
        F: Fn(&LogRecord, &dyn Environment) -> bool + Send + Sync + 'static,
    {
        self.write_condition = Some(Arc::new(condition));
        self
    }

    /// Validate, then start the throttle loop on the current tokio runtime.
    pub fn build(self) -> Result<ServerStream> {
        self.config.validate()?;
        let runtime = Handle::try_current().map_err(|_| {
            LoggerError::config("server-stream", "must be created inside a tokio runtime")
        })?;
        let transport = match self.transport {
            Some(transport) => transport,
            None => default_transport()?,
        };

        let stream = ServerStream {
            inner: Arc::new(Inner {
                config: self.config,
                transport,
                beacon: self.beacon,
                environment: self
                    .environment
                    .unwrap_or_else(|| Arc::new(StaticEnvironment::new())),
                on_error: self.on_error,
                write_condition: self
                    .write_condition
                    .unwrap_or_else(|| Arc::new(ServerStream::default_write_condition)),
                pending: Mutex::new(IndexMap::new()),
                stop_tx: Mutex::new(None),
                runtime,
            }),
        };
        stream.start();
        Ok(stream)
    }
}

#[cfg(feature = "network")]
fn default_transport() -> Result<Arc<dyn Transport>> {
    Ok(Arc::new(super::transport::HttpTransport::new()))
}

#[cfg(not(feature = "network"))]
fn default_transport() -> Result<Arc<dyn Transport>> {
    Err(LoggerError::config(
        "server-stream",
        "a transport is required (or enable the `network` feature)",
    ))
}

impl ServerStream {
    pub fn builder(config: ServerStreamConfig) -> ServerStreamBuilder {
        ServerStreamBuilder {
            config,
            transport: None,
            beacon: None,
            environment: None,
            on_error: None,
            write_condition: None,
        }
    }

    /// Build with a transport and defaults for everything else.
    pub fn new<T: Transport + 'static>(config: ServerStreamConfig, transport: T) -> Result<Self> {
        Self::builder(config).transport(transport).build()
    }

    /// Queue only while online and not running as a crawler.
    pub fn default_write_condition(_record: &LogRecord, env: &dyn Environment) -> bool {
        env.is_online() && !is_bot(&env.user_agent())
    }

    pub fn config(&self) -> &ServerStreamConfig {
        &self.inner.config
    }

    pub fn is_running(&self) -> bool {
        self.inner.stop_tx.lock().is_some()
    }

    /// Arm the throttle loop. Returns `false` if it was already running.
    pub fn start(&self) -> bool {
        let mut stop_tx = self.inner.stop_tx.lock();
        if stop_tx.is_some() {
            return false;
        }
        let (tx, rx) = watch::channel(false);
        *stop_tx = Some(tx);
        self.inner
            .runtime
            .spawn(throttle_loop(Arc::downgrade(&self.inner), rx));
        true
    }

    /// Cancel the pending tick on the next turn of the scheduler. An upload
    /// already in flight completes. Calling it again is harmless.
    pub fn stop(&self) {
        let inner = Arc::downgrade(&self.inner);
        self.inner.runtime.spawn(async move {
            sleep(Duration::from_millis(1)).await;
            if let Some(inner) = inner.upgrade() {
                cancel(&inner);
            }
        });
    }

    /// Pending records with their `count`, in first-seen order.
    pub fn pending_records(&self) -> Vec<LogRecord> {
        self.inner
            .pending
            .lock()
            .values()
            .map(|p| p.record.clone().with_field("count", p.count))
            .collect()
    }

    fn take_pending(&self) -> Vec<LogRecord> {
        let pending = std::mem::take(&mut *self.inner.pending.lock());
        pending
            .into_values()
            .map(|p| p.record.with_field("count", p.count))
            .collect()
    }

    /// Teardown path: cancel the timer now and hand pending records to the
    /// beacon transport.
    ///
    /// Does nothing unless `flush_on_close` is set, the method is POST and a
    /// beacon transport is installed. Returns whether a beacon was queued.
    /// Never panics.
    pub fn flush_on_close(&self) -> bool {
        let config = &self.inner.config;
        if !config.flush_on_close || !config.method.eq_ignore_ascii_case("POST") {
            return false;
        }
        let Some(beacon) = self.inner.beacon.as_ref() else {
            return false;
        };
        cancel(&self.inner);

        let records = self.take_pending();
        if records.is_empty() {
            return false;
        }
        let url = config.url.clone();
        catch_unwind(AssertUnwindSafe(|| match serde_json::to_string(&records) {
            Ok(body) => beacon.send_beacon(&url, body),
            Err(_) => false,
        }))
        .unwrap_or(false)
    }

    /// One throttle tick.
    async fn flush(&self) {
        let records = self.take_pending();
        if records.is_empty() {
            return;
        }
        let body = match catch_unwind(AssertUnwindSafe(|| serde_json::to_string(&records))) {
            Ok(Ok(body)) => body,
            _ => {
                self.report(&records, DeliveryFailure::Transport("could not serialize batch".into()));
                return;
            }
        };
        let config = &self.inner.config;
        let request = TransportRequest {
            method: config.method.clone(),
            url: config.url.clone(),
            headers: config.request_headers(),
            with_credentials: config.with_credentials,
            body,
        };

        match self.inner.transport.send(request).await {
            Ok(response) if response.is_success() => {}
            Ok(response) => self.report(&records, DeliveryFailure::Status(response)),
            Err(e) => self.report(&records, DeliveryFailure::Transport(e.to_string())),
        }
    }

    fn report(&self, records: &[LogRecord], failure: DeliveryFailure) {
        match &self.inner.on_error {
            Some(callback) => {
                if catch_unwind(AssertUnwindSafe(|| callback(self, records, &failure))).is_err() {
                    eprintln!("[LOGGER WARNING] Browser Bunyan: server stream error callback panicked");
                }
            }
            None => eprintln!(
                "[LOGGER WARNING] Browser Bunyan: A server log write failed ({})",
                failure
            ),
        }
    }
}

fn cancel(inner: &Inner) {
    if let Some(tx) = inner.stop_tx.lock().take() {
        let _ = tx.send(true);
    }
}

async fn throttle_loop(inner: Weak<Inner>, mut stop: watch::Receiver<bool>) {
    let Some(interval) = inner.upgrade().map(|i| i.config.throttle()) else {
        return;
    };
    loop {
        tokio::select! {
            _ = sleep(interval) => {}
            _ = stop.changed() => break,
        }
        let Some(inner) = inner.upgrade() else {
            break;
        };
        ServerStream { inner }.flush().await;
    }
}

impl LogStream for ServerStream {
    /// Adds `url` and `userAgent`, then queues the record if the stream is
    /// running and the write condition accepts it.
    fn write(&self, record: &LogRecord) {
        if !self.is_running() {
            return;
        }
        let env = self.inner.environment.as_ref();
        let record = record
            .clone()
            .with_field("url", env.location())
            .with_field("userAgent", env.user_agent());
        if !(self.inner.write_condition)(&record, env) {
            return;
        }

        let mut pending = self.inner.pending.lock();
        match pending.get_mut(record.msg()) {
            Some(existing) => existing.count += 1,
            None => {
                pending.insert(record.msg().to_string(), PendingRecord { record, count: 1 });
            }
        }
    }

    fn name(&self) -> &str {
        "server"
    }
}

impl fmt::Debug for ServerStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerStream")
            .field("config", &self.inner.config)
            .field("running", &self.is_running())
            .field("pending", &self.inner.pending.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appenders::transport::TransportResponse;

    #[test]
    fn test_config_defaults() {
        let config = ServerStreamConfig::default();
        assert_eq!(config.method, "PUT");
        assert_eq!(config.url, "/log");
        assert_eq!(config.throttle(), Duration::from_millis(3000));
        assert!(!config.with_credentials);
        assert!(!config.flush_on_close);
    }

    #[test]
    fn test_config_deserialize_camel_case() {
        let config: ServerStreamConfig = serde_json::from_str(
            r#"{"method":"POST","throttleInterval":500,"flushOnClose":true,"headers":{"X-Api-Key":"k"}}"#,
        )
        .unwrap();
        assert_eq!(config.method, "POST");
        assert_eq!(config.url, "/log");
        assert_eq!(config.throttle_interval, 500);
        assert!(config.flush_on_close);
        assert_eq!(config.headers["X-Api-Key"], "k");
    }

    #[test]
    fn test_request_headers_override_content_type() {
        let mut config = ServerStreamConfig::default();
        assert_eq!(config.request_headers()["Content-Type"], "application/json");

        config.headers.insert("content-type".into(), "text/plain".into());
        config.headers.insert("X-Trace".into(), "1".into());
        let headers = config.request_headers();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers["content-type"], "text/plain");
        assert!(!headers.contains_key("Content-Type"));
    }

    #[test]
    fn test_invalid_config() {
        let config = ServerStreamConfig {
            throttle_interval: 0,
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().is_config());
    }

    #[test]
    fn test_build_outside_runtime_fails() {
        struct Never;
        #[async_trait::async_trait]
        impl Transport for Never {
            async fn send(&self, _request: TransportRequest) -> Result<TransportResponse> {
                Err(LoggerError::transport("unreachable"))
            }
        }
        let err = ServerStream::new(ServerStreamConfig::default(), Never).unwrap_err();
        assert!(err.is_config());
    }
}
