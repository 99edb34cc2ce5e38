//! Criterion benchmarks for browser_bunyan

use browser_bunyan::prelude::*;
use browser_bunyan::fields;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

/// Stream that drops everything, so the benchmarks measure the logger.
struct NullStream;

impl LogStream for NullStream {
    fn write(&self, record: &LogRecord) {
        black_box(record);
    }
}

fn null_logger(level: Level) -> Logger {
    Logger::new(
        LoggerOptions::new()
            .name("bench")
            .field("hostname", "bench-host")
            .level(level)
            .stream(NullStream),
    )
    .expect("Failed to create logger")
}

// ============================================================================
// Logger Creation Benchmarks
// ============================================================================

fn bench_logger_creation(c: &mut Criterion) {
    let mut group = c.benchmark_group("logger_creation");
    group.throughput(Throughput::Elements(1));

    group.bench_function("root", |b| {
        b.iter(|| black_box(null_logger(Level::INFO)));
    });

    let parent = null_logger(Level::INFO);
    group.bench_function("child", |b| {
        b.iter(|| {
            let child = parent
                .child(LoggerOptions::new().field("req_id", black_box("abc")))
                .expect("Failed to create child");
            black_box(child)
        });
    });

    group.bench_function("fast_child", |b| {
        b.iter(|| black_box(parent.fast_child([("req_id", black_box("abc"))])));
    });

    group.finish();
}

// ============================================================================
// Logging Performance Benchmarks
// ============================================================================

fn bench_disabled_level(c: &mut Criterion) {
    let mut group = c.benchmark_group("disabled_level");
    group.throughput(Throughput::Elements(1));

    let logger = null_logger(Level::WARN);

    group.bench_function("query", |b| {
        b.iter(|| black_box(logger.debug(())));
    });

    group.bench_function("message_with_args", |b| {
        b.iter(|| black_box(logger.debug(("request %s took %dms", black_box("/api"), 12))));
    });

    group.finish();
}

fn bench_enabled_logging(c: &mut Criterion) {
    let mut group = c.benchmark_group("enabled_logging");
    group.throughput(Throughput::Elements(1));

    let logger = null_logger(Level::TRACE);

    group.bench_function("plain_message", |b| {
        b.iter(|| logger.info(black_box("Info message")));
    });

    group.bench_function("formatted_message", |b| {
        b.iter(|| logger.info(("request %s took %dms", black_box("/api"), 12)));
    });

    group.bench_function("with_fields", |b| {
        b.iter(|| {
            logger.info((
                fields! { "user_id" => 12345, "action" => "login" },
                "User action",
            ))
        });
    });

    group.bench_function("error_first", |b| {
        let err = ErrorValue::new("Error", "boom").with_stack("Error: boom\n    at main");
        b.iter(|| logger.error(err.clone()));
    });

    group.finish();
}

fn bench_stringify(c: &mut Criterion) {
    let mut group = c.benchmark_group("stringify");
    group.throughput(Throughput::Elements(1));

    let memory = MemoryStream::new();
    let logger = Logger::new(LoggerOptions::new().name("bench").stream(memory.clone()))
        .expect("Failed to create logger");
    let node = FieldObject::new().with_field("id", 1);
    node.insert("parent", node.clone());
    logger.info((fields! { "node" => node, "n" => 42 }, "cyclic record"));
    let record = memory.last().expect("record captured");

    group.bench_function("to_json_line", |b| {
        b.iter(|| black_box(logger.to_json_line(&record)));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_logger_creation,
    bench_disabled_level,
    bench_enabled_logging,
    bench_stringify,
);
criterion_main!(benches);
