//! Basic logger usage example
//!
//! Demonstrates per-level logging, structured fields, child loggers,
//! serializers and the three console streams.
//!
//! Run with: cargo run --example basic_usage

use browser_bunyan::fields;
use browser_bunyan::prelude::*;

fn main() -> Result<()> {
    println!("=== Browser Bunyan - Basic Usage Example ===\n");

    // Root logger with the default raw console stream (JSON lines)
    let log = Logger::new(LoggerOptions::new().name("demo").level(Level::TRACE))?;

    println!("1. Logging at different levels:");
    log.trace("This is a trace message");
    log.debug("This is a debug message");
    log.info(("Listening on %s:%d", "0.0.0.0", 8080));
    log.warn((fields! { "disk_free_mb" => 120 }, "Low disk space"));
    log.error(ErrorValue::capture("Error", "Something failed"));
    log.fatal("This is a fatal message");

    println!("\n2. Level queries:");
    println!("   debug enabled: {}", log.debug(()));

    println!("\n3. Plain console stream with a child logger:");
    let plain = Logger::new(
        LoggerOptions::new()
            .name("demo")
            .src(true)
            .stream(ConsolePlainStream::new()),
    )?;
    let child = plain.child(LoggerOptions::new().field("childName", "worker"))?;
    child.info(("Processing %d items", 100));

    #[cfg(feature = "console")]
    {
        println!("\n4. Formatted (coloured) console stream:");
        let formatted = Logger::new(
            LoggerOptions::new()
                .name("demo")
                .level(Level::TRACE)
                .stream(ConsoleFormattedStream::new()),
        )?;
        for level in Level::ALL {
            formatted.log(level, ("a %s message", level.name().unwrap_or("custom")));
        }
    }

    println!("\n5. Serializers:");
    let mut log = log;
    log.add_serializers([(
        "user",
        Serializer::from_fn(|value| match value.get("name") {
            Some(name) => name,
            None => value.clone(),
        }),
    )])?;
    log.info((
        fields! { "user" => fields! { "name" => "alice", "password" => "hunter2" } },
        "Serialized user",
    ));

    println!("\n=== Example completed successfully! ===");

    Ok(())
}
