//! Stress runs for storm.
//!
//! These verify behavior under repeated and concurrent use of one
//! orchestrator.

use crate::records::Note;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use storm_backend::Context;
use storm_core::Storm;

/// Result of a stress run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the run.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress runs.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of operations to perform.
    pub operations: usize,
    /// Number of concurrent threads (for concurrent runs).
    pub threads: usize,
    /// Number of distinct entities.
    pub entity_count: usize,
    /// Length of each record's payload.
    pub value_size: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 10_000,
            threads: 4,
            entity_count: 1_000,
            value_size: 256,
        }
    }
}

fn entity_id(i: usize) -> String {
    format!("note-{i:06}")
}

fn tally(result: storm_core::CoreResult<()>, successful: &AtomicUsize, failed: &AtomicUsize) {
    match result {
        Ok(()) => successful.fetch_add(1, Ordering::Relaxed),
        Err(_) => failed.fetch_add(1, Ordering::Relaxed),
    };
}

/// Saves `operations` records one after another, cycling through
/// `entity_count` identifiers.
pub fn stress_sequential_saves(storm: &Storm, config: &StressConfig) -> StressTestResult {
    let ctx = Context::background();
    let value = "x".repeat(config.value_size);

    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..config.operations {
        let mut note = Note {
            id: entity_id(i % config.entity_count),
            value: value.clone(),
        };
        match storm.model(&mut note).with_context(ctx.clone()).save() {
            Ok(()) => successful += 1,
            Err(_) => failed += 1,
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}

/// Populates `entity_count` records, then loads them from `threads`
/// threads, each through its own orchestrator clone.
pub fn stress_concurrent_loads(storm: &Storm, config: &StressConfig) -> StressTestResult {
    let ctx = Context::background();
    let value = "x".repeat(config.value_size);
    for i in 0..config.entity_count {
        let mut note = Note {
            id: entity_id(i),
            value: value.clone(),
        };
        let _ = storm.model(&mut note).with_context(ctx.clone()).save();
    }

    let successful = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let ops_per_thread = config.operations / config.threads;
    let entity_count = config.entity_count;

    let start = Instant::now();

    thread::scope(|s| {
        for t in 0..config.threads {
            let storm = storm.clone();
            let ctx = ctx.clone();
            let (successful, failed) = (&successful, &failed);
            s.spawn(move || {
                for i in 0..ops_per_thread {
                    let idx = (t * ops_per_thread + i) % entity_count;
                    let mut note = Note::with_id(entity_id(idx));
                    let result = storm.model(&mut note).with_context(ctx.clone()).load();
                    tally(result, successful, failed);
                }
            });
        }
    });

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

/// Shares one wrapper between `threads` threads that save, cache and
/// uncache the same record concurrently.
pub fn stress_shared_wrapper(storm: &Storm, config: &StressConfig) -> StressTestResult {
    let mut note = Note::new("x".repeat(config.value_size));
    let wrapper = storm.model(&mut note).with_context(Context::background());

    let successful = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let ops_per_thread = config.operations / config.threads;

    let start = Instant::now();

    thread::scope(|s| {
        for t in 0..config.threads {
            let (wrapper, successful, failed) = (&wrapper, &successful, &failed);
            s.spawn(move || {
                for i in 0..ops_per_thread {
                    let result = match (t + i) % 3 {
                        0 => wrapper.save(),
                        1 => wrapper.cache(),
                        _ => wrapper.uncache(),
                    };
                    tally(result, successful, failed);
                }
            });
        }
    });

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}
