//! Integration tests for the dispatch engine
//!
//! These tests verify:
//! - Per-target FIFO ordering
//! - Slow-target isolation
//! - Flush completeness
//! - Backpressure drop accounting
//! - Shutdown semantics
//! - Metrics wiring
//! - End-to-end file output

use logfan::core::level;
use logfan::formatters::{Json, Plain};
use logfan::targets::testing::{BlockingTarget, StoringTarget};
use logfan::targets::FileTarget;
use logfan::{AtomicMetrics, EngineError, Field, Logfan, StdFilter};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

fn wait_for(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while !cond() {
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    true
}

fn add_storing(engine: &Logfan, name: &str, filter_level: logfan::Level) -> StoringTarget {
    let target = StoringTarget::new();
    engine
        .add_target(
            Box::new(target.clone()),
            name,
            Arc::new(StdFilter::new(filter_level)),
            Arc::new(Plain::new()),
            100,
        )
        .expect("add_target");
    target
}

#[test]
fn test_records_arrive_in_fifo_order() {
    let engine = Logfan::builder().build();
    let target = add_storing(&engine, "store", level::TRACE);

    for i in 0..200 {
        engine.log(level::INFO, format!("msg {}", i), Vec::new());
    }
    engine.flush(FLUSH_TIMEOUT).expect("flush");

    let lines = target.lines();
    assert_eq!(lines.len(), 200);
    for (i, line) in lines.iter().enumerate() {
        assert!(
            line.contains(&format!("msg {}", i)),
            "line {} out of order: {}",
            i,
            line
        );
    }
}

#[test]
fn test_slow_target_does_not_stall_healthy_target() {
    let engine = Logfan::builder().build();
    let healthy = add_storing(&engine, "healthy", level::TRACE);

    let slow = BlockingTarget::new();
    engine
        .add_target(
            Box::new(slow.clone()),
            "slow",
            Arc::new(StdFilter::new(level::TRACE)),
            Arc::new(Plain::new()),
            100,
        )
        .expect("add_target");

    for i in 0..50 {
        engine.log(level::INFO, format!("msg {}", i), Vec::new());
    }

    // The slow worker is stuck in its first write, yet the healthy target
    // receives everything.
    assert!(slow.wait_entered(1, Duration::from_secs(5)));
    assert!(wait_for(Duration::from_secs(5), || healthy.len() == 50));

    slow.release();
    engine.shutdown(FLUSH_TIMEOUT).expect("shutdown");
}

#[test]
fn test_flush_covers_everything_enqueued_before_it() {
    let engine = Logfan::builder().build();
    let target = add_storing(&engine, "store", level::TRACE);

    for i in 0..120 {
        engine.log(level::DEBUG, format!("msg {}", i), Vec::new());
    }
    engine.flush(FLUSH_TIMEOUT).expect("flush");
    assert_eq!(target.len(), 120);
}

#[test]
fn test_full_target_queue_drop_hook_counts_drops() {
    let metrics = Arc::new(AtomicMetrics::new());
    let engine = Logfan::builder()
        .metrics(metrics.clone() as Arc<dyn logfan::MetricsCollector>)
        .on_target_queue_full(Arc::new(|_name, _rec, _capacity| true))
        .build();

    let block = BlockingTarget::new();
    engine
        .add_target(
            Box::new(block.clone()),
            "block",
            Arc::new(StdFilter::new(level::TRACE)),
            Arc::new(Plain::new()),
            4,
        )
        .expect("add_target");

    // Wedge the worker inside its first write, fill the queue of 4, then
    // three more must be dropped by the hook.
    engine.log(level::INFO, "wedge", Vec::new());
    assert!(block.wait_entered(1, Duration::from_secs(5)));
    for i in 0..7 {
        engine.log(level::INFO, format!("msg {}", i), Vec::new());
    }

    assert!(wait_for(Duration::from_secs(5), || {
        metrics.counter_value("block", "dropped") == 3
    }));

    block.release();
    engine.shutdown(FLUSH_TIMEOUT).expect("shutdown");
    assert_eq!(metrics.counter_value("block", "dropped"), 3);
}

#[test]
fn test_full_engine_queue_drop_hook_counts_drops() {
    let metrics = Arc::new(AtomicMetrics::new());
    let engine = Logfan::builder()
        .max_queue_size(4)
        .enqueue_timeout(Duration::from_secs(10))
        .on_queue_full(Arc::new(|_rec, _capacity| true))
        .metrics(metrics.clone() as Arc<dyn logfan::MetricsCollector>)
        .build();

    let block = BlockingTarget::new();
    engine
        .add_target(
            Box::new(block.clone()),
            "block",
            Arc::new(StdFilter::new(level::TRACE)),
            Arc::new(Plain::new()),
            1,
        )
        .expect("add_target");

    // Wedge the pipeline end to end: record 1 sits in the target's write,
    // record 2 fills the target queue, record 3 parks the dispatcher in a
    // blocking per-target send. Confirmed via the target's blocked counter.
    engine.log(level::INFO, "wedge", Vec::new());
    assert!(block.wait_entered(1, Duration::from_secs(5)));
    engine.log(level::INFO, "queued", Vec::new());
    engine.log(level::INFO, "parks dispatcher", Vec::new());
    assert!(wait_for(Duration::from_secs(5), || {
        metrics.counter_value("block", "blocked") == 1
    }));

    // Fill the engine queue of 4, then three more must be dropped by the
    // engine-level hook, synchronously in the producer.
    for i in 0..4 {
        engine.log(level::INFO, format!("fills {}", i), Vec::new());
    }
    for i in 0..3 {
        engine.log(level::INFO, format!("dropped {}", i), Vec::new());
    }
    assert_eq!(metrics.counter_value("_engine", "dropped"), 3);
    assert_eq!(metrics.counter_value("_engine", "logged"), 7);

    block.release();
    engine.shutdown(FLUSH_TIMEOUT).expect("shutdown");
    assert_eq!(metrics.counter_value("_engine", "dropped"), 3);
}

#[test]
fn test_full_target_queue_without_hook_reports_enqueue_timeout() {
    let reported: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = reported.clone();
    let engine = Logfan::builder()
        .enqueue_timeout(Duration::from_millis(10))
        .on_error(Arc::new(move |e| sink.lock().push(e.to_string())))
        .build();

    let block = BlockingTarget::new();
    engine
        .add_target(
            Box::new(block.clone()),
            "block",
            Arc::new(StdFilter::new(level::TRACE)),
            Arc::new(Plain::new()),
            2,
        )
        .expect("add_target");

    engine.log(level::INFO, "wedge", Vec::new());
    assert!(block.wait_entered(1, Duration::from_secs(5)));
    for i in 0..4 {
        engine.log(level::INFO, format!("msg {}", i), Vec::new());
    }

    assert!(wait_for(Duration::from_secs(5), || {
        !reported.lock().is_empty()
    }));
    assert!(reported.lock()[0].contains("block"));

    block.release();
    engine.shutdown(FLUSH_TIMEOUT).expect("shutdown");
}

#[test]
fn test_second_shutdown_fails_without_panicking() {
    let engine = Logfan::builder().build();
    add_storing(&engine, "store", level::TRACE);
    engine.log(level::INFO, "last words", Vec::new());

    engine.shutdown(FLUSH_TIMEOUT).expect("first shutdown");
    assert!(matches!(
        engine.shutdown(FLUSH_TIMEOUT),
        Err(EngineError::AlreadyShutdown)
    ));
    assert!(!engine.is_enabled(&level::PANIC));
}

#[test]
fn test_metrics_count_logged_records() {
    let metrics = Arc::new(AtomicMetrics::new());
    let engine = Logfan::builder()
        .metrics(metrics.clone() as Arc<dyn logfan::MetricsCollector>)
        .build();
    add_storing(&engine, "store", level::TRACE);

    for i in 0..30 {
        engine.log(level::INFO, format!("msg {}", i), Vec::new());
    }
    engine.flush(FLUSH_TIMEOUT).expect("flush");

    // Accepted onto the engine queue, then written by the target worker.
    assert_eq!(metrics.counter_value("_engine", "logged"), 30);
    assert_eq!(metrics.counter_value("store", "logged"), 30);
    assert_eq!(metrics.counter_value("store", "errors"), 0);
}

#[test]
fn test_levels_route_per_target_filter() {
    let engine = Logfan::builder().build();
    let errors_only = add_storing(&engine, "errors", level::ERROR);
    let everything = add_storing(&engine, "all", level::TRACE);

    engine.log(level::INFO, "routine", Vec::new());
    engine.log(level::ERROR, "broken", Vec::new());
    engine.flush(FLUSH_TIMEOUT).expect("flush");

    assert_eq!(errors_only.len(), 1);
    assert!(errors_only.lines()[0].contains("broken"));
    assert_eq!(everything.len(), 2);
}

#[test]
fn test_concurrent_producers_lose_nothing() {
    let engine = Logfan::builder().max_queue_size(4096).build();
    let target = add_storing(&engine, "store", level::TRACE);

    let mut handles = Vec::new();
    for t in 0..4 {
        let engine = engine.clone();
        handles.push(std::thread::spawn(move || {
            for i in 0..50 {
                engine.log(
                    level::INFO,
                    format!("t{} msg {}", t, i),
                    vec![Field::int("i", i)],
                );
            }
        }));
    }
    for handle in handles {
        handle.join().expect("producer");
    }
    engine.flush(FLUSH_TIMEOUT).expect("flush");
    assert_eq!(target.len(), 200);

    // Per-producer order survives the shared queue.
    let lines = target.lines();
    for t in 0..4 {
        let of_thread: Vec<&String> = lines
            .iter()
            .filter(|l| l.contains(&format!("t{} ", t)))
            .collect();
        assert_eq!(of_thread.len(), 50);
        for (i, line) in of_thread.iter().enumerate() {
            assert!(line.contains(&format!("msg {}", i)));
        }
    }
}

#[test]
fn test_file_target_end_to_end() {
    let temp_dir = TempDir::new().expect("tempdir");
    let log_file = temp_dir.path().join("out.log");

    let engine = Logfan::builder().build();
    engine
        .add_target(
            Box::new(FileTarget::new(&log_file)),
            "file",
            Arc::new(StdFilter::new(level::DEBUG)),
            Arc::new(Json::new()),
            100,
        )
        .expect("add_target");

    for i in 0..10 {
        engine.log(
            level::INFO,
            format!("event {}", i),
            vec![Field::int("seq", i)],
        );
    }
    engine.shutdown(FLUSH_TIMEOUT).expect("shutdown");

    let content = std::fs::read_to_string(&log_file).expect("read");
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 10);
    for (i, line) in lines.iter().enumerate() {
        let parsed: serde_json::Value = serde_json::from_str(line).expect("json line");
        assert_eq!(parsed["msg"], format!("event {}", i));
        assert_eq!(parsed["fields"]["seq"], i);
        assert_eq!(parsed["level"], "info");
    }
}

#[test]
fn test_newlines_in_messages_are_sanitized() {
    let engine = Logfan::builder().build();
    let target = add_storing(&engine, "store", level::TRACE);

    engine.log(
        level::INFO,
        "user login\nERROR fake injected entry",
        Vec::new(),
    );
    engine.flush(FLUSH_TIMEOUT).expect("flush");

    let lines = target.lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("\\n"));
    assert!(!lines[0].contains('\n'));
}

#[test]
fn test_remove_targets_drains_before_closing() {
    let engine = Logfan::builder().build();
    let target = add_storing(&engine, "store", level::TRACE);

    for i in 0..40 {
        engine.log(level::INFO, format!("msg {}", i), Vec::new());
    }
    engine.flush(FLUSH_TIMEOUT).expect("flush");
    engine
        .remove_targets(FLUSH_TIMEOUT, |name| name == "store")
        .expect("remove");

    assert_eq!(target.len(), 40);
    assert!(!engine.is_enabled(&level::INFO));
}
