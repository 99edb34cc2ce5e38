//! Server stream example
//!
//! Batches records and uploads them to an HTTP endpoint every second.
//! Repeated messages are sent once with a `count`.
//!
//! Run with: cargo run --example server_stream --features network -- http://localhost:8080

use browser_bunyan::appenders::{HttpTransport, StaticEnvironment};
use browser_bunyan::prelude::*;
use std::time::Duration;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let base_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://localhost:8080".to_string());

    let config = ServerStreamConfig {
        method: "POST".into(),
        throttle_interval: 1000,
        flush_on_close: true,
        ..Default::default()
    };
    let transport = HttpTransport::new().with_base_url(base_url);
    let server = ServerStream::builder(config)
        .transport(transport.clone())
        .beacon_transport(transport)
        .environment(StaticEnvironment::new().with_user_agent("server-stream-demo/1.0"))
        .on_error(|_stream, records, failure| {
            eprintln!("upload of {} records failed: {}", records.len(), failure);
        })
        .build()?;

    let log = Logger::new(
        LoggerOptions::new()
            .name("server-demo")
            .streams(vec![StreamSpec::new(server.clone()).level(Level::WARN)]),
    )?;

    for i in 0..5 {
        log.warn("cache miss");
        log.error(("request %d failed", i));
    }
    println!("queued: {} distinct records", server.pending_records().len());

    tokio::time::sleep(Duration::from_millis(1500)).await;

    log.warn("shutting down");
    server.flush_on_close();
    // give the beacon a moment to leave
    tokio::time::sleep(Duration::from_millis(200)).await;

    Ok(())
}
