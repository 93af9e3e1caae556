//! Integration tests for gridbench
//!
//! These tests drive whole runs through the engine with small timing budgets.

use crossbeam::queue::SegQueue;
use gridbench::prelude::*;
use gridbench::{
    BenchmarkResult, ChannelSink, DefinitionError, FailureReason, InvalidDefinition, RunReport,
    RunSummary, generate_json_report,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[global_allocator]
static GLOBAL: TrackingAllocator = TrackingAllocator;

fn quick_throughput() -> ThroughputConfig {
    ThroughputConfig {
        warmup_time: Duration::from_millis(1),
        max_warmup_iterations: 1_000,
        min_block_time: Duration::from_micros(100),
        max_batch_size: 1 << 16,
        min_blocks: 3,
        max_blocks: 5,
        target_relative_error: 0.02,
    }
}

fn quick_engine() -> Engine {
    Engine::new(EngineConfig {
        timeout: Duration::from_secs(30),
        cleanup_grace: Duration::from_secs(2),
        throughput: quick_throughput(),
        jobs: vec![JobDescriptor::throughput("test")],
        ..EngineConfig::default()
    })
}

fn run(
    engine: &Engine,
    definitions: Vec<BenchmarkDefinition>,
) -> (Vec<BenchmarkResult>, RunSummary) {
    let mut registry = Registry::new();
    for definition in definitions {
        registry.register(definition).unwrap();
    }
    let mut sink = CollectingSink::new();
    let summary = engine.run_registry(&registry, &mut sink);
    (sink.into_results(), summary)
}

#[derive(Default)]
struct Counter {
    n: u64,
    total: u64,
}

#[test]
fn grid_expands_to_one_result_per_case() {
    let def = BenchmarkDefinition::builder::<Counter>("Grid")
        .param("N", [10, 100])
        .setup(|c, p| {
            c.n = p.require_usize("N")? as u64;
            Ok(())
        })
        .measure("A", |c, _| (0..c.n).sum::<u64>())
        .measure("B", |c, _| c.n * 2)
        .measure("C", |c, _| {
            c.total += c.n;
            c.total
        })
        .build()
        .unwrap();

    let (results, summary) = run(&quick_engine(), vec![def]);

    assert_eq!(results.len(), 6);
    assert_eq!(summary.total, 6);
    assert_eq!(summary.completed, 6);
    assert_eq!(summary.failed(), 0);

    let ids: Vec<String> = results.iter().map(|r| r.id.to_string()).collect();
    assert_eq!(ids[0], "Grid.A(N=10) [test/throughput]");
    assert_eq!(ids[1], "Grid.A(N=100) [test/throughput]");
    assert_eq!(ids[5], "Grid.C(N=100) [test/throughput]");

    for result in &results {
        assert!(result.is_completed());
        assert!((3..=5).contains(&result.sample_count()), "{}", result.id);
        assert!(result.ops_per_sample >= 1);
        assert_eq!(
            result.total_operations,
            result.ops_per_sample * result.sample_count() as u64
        );
        assert!(result.statistics.is_some());
        assert!(result.warmup_invocations >= 1);
    }
}

static FAILED_SETUP_CLEANUPS: AtomicUsize = AtomicUsize::new(0);

#[test]
fn failing_setup_still_cleans_up() {
    let def = BenchmarkDefinition::builder::<Counter>("BrokenSetup")
        .param("N", [1, 2])
        .setup(|_, _| Err(anyhow::anyhow!("fixture unavailable")))
        .cleanup(|_, _| {
            FAILED_SETUP_CLEANUPS.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .measure("Op", |c, _| c.n)
        .build()
        .unwrap();

    let (results, summary) = run(&quick_engine(), vec![def]);

    assert_eq!(results.len(), 2);
    assert_eq!(summary.setup_failures, 2);
    for result in &results {
        assert_eq!(result.failure_reason(), Some(FailureReason::Setup));
        assert_eq!(result.sample_count(), 0);
        assert!(result.statistics.is_none());
    }
    assert_eq!(FAILED_SETUP_CLEANUPS.load(Ordering::SeqCst), 2);
}

#[test]
fn slow_case_times_out_and_run_continues() {
    let slow = BenchmarkDefinition::builder::<Counter>("Slow")
        .measure("Sleep", |_, _| std::thread::sleep(Duration::from_millis(300)))
        .timeout(Duration::from_millis(50))
        .jobs([JobDescriptor::monitoring("test")])
        .build()
        .unwrap();
    let fast = BenchmarkDefinition::builder::<Counter>("Fast")
        .measure("Add", |c, _| c.n + 1)
        .jobs([JobDescriptor::monitoring("test")])
        .build()
        .unwrap();

    let (results, summary) = run(&quick_engine(), vec![slow, fast]);

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].failure_reason(), Some(FailureReason::Timeout));
    assert!(results[1].is_completed());
    assert_eq!(summary.timeouts, 1);
    assert_eq!(summary.completed, 1);
}

#[test]
fn slow_measured_invocation_times_out() {
    let def = BenchmarkDefinition::builder::<Counter>("SlowMeasure")
        .measure("Run", |c, _| {
            c.total += 1;
            if c.total >= 2 {
                std::thread::sleep(Duration::from_millis(300));
            }
        })
        .timeout(Duration::from_millis(100))
        .jobs([JobDescriptor::monitoring("test")])
        .build()
        .unwrap();

    let (results, summary) = run(&quick_engine(), vec![def]);

    let result = &results[0];
    assert_eq!(result.failure_reason(), Some(FailureReason::Timeout));
    assert_eq!(result.warmup_invocations, 1);
    assert_eq!(result.sample_count(), 1);
    assert_eq!(summary.timeouts, 1);
}

static ABANDONED_CLEANUPS: AtomicUsize = AtomicUsize::new(0);

#[test]
fn case_past_its_grace_period_is_abandoned() {
    let def = BenchmarkDefinition::builder::<Counter>("Stuck")
        .measure("Run", |_, _| std::thread::sleep(Duration::from_millis(1_500)))
        .cleanup(|_, _| {
            ABANDONED_CLEANUPS.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .jobs([JobDescriptor::monitoring("test")])
        .build()
        .unwrap();
    let engine = Engine::new(EngineConfig {
        timeout: Duration::from_millis(50),
        cleanup_grace: Duration::from_millis(50),
        ..quick_engine().config().clone()
    });

    let (results, summary) = run(&engine, vec![def]);

    let result = &results[0];
    assert_eq!(result.failure_reason(), Some(FailureReason::Timeout));
    assert_eq!(result.sample_count(), 0);
    assert!(result.duration_ns < 1_000_000_000);
    assert_eq!(summary.timeouts, 1);
    assert_eq!(ABANDONED_CLEANUPS.load(Ordering::SeqCst), 0);

    // The abandoned thread still reaches cleanup once its invocation returns.
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while ABANDONED_CLEANUPS.load(Ordering::SeqCst) == 0
        && std::time::Instant::now() < deadline
    {
        std::thread::sleep(Duration::from_millis(20));
    }
    assert_eq!(ABANDONED_CLEANUPS.load(Ordering::SeqCst), 1);
}

#[test]
fn unusable_cpu_pin_does_not_stop_the_run() {
    let def = BenchmarkDefinition::builder::<Counter>("Pinned")
        .measure("Op", |c, _| c.n + 1)
        .jobs([JobDescriptor::monitoring("test")])
        .build()
        .unwrap();
    let engine = Engine::new(EngineConfig {
        pin_cpu: Some(1 << 20),
        ..quick_engine().config().clone()
    });

    let (results, summary) = run(&engine, vec![def]);

    assert!(results[0].is_completed(), "{:?}", results[0].outcome);
    assert_eq!(summary.completed, 1);
}

#[derive(Default)]
struct Drain {
    queue: SegQueue<u64>,
    consumed: Vec<u64>,
}

#[test]
fn concurrent_drain_consumes_every_item() {
    const N: u64 = 100_000;

    let def = BenchmarkDefinition::builder::<Drain>("ConcurrentDrain")
        .try_measure("Run", |d, _| {
            let queue = &d.queue;
            let drained = std::thread::scope(|scope| {
                let consumer = scope.spawn(|| {
                    let mut total = 0u64;
                    while total < N {
                        if queue.pop().is_some() {
                            total += 1;
                        }
                    }
                    total
                });
                for i in 0..N {
                    queue.push(i);
                }
                consumer.join()
            });
            let total = drained.map_err(|_| anyhow::anyhow!("consumer panicked"))?;
            d.consumed.push(total);
            anyhow::ensure!(total == N, "drained {total} of {N}");
            anyhow::ensure!(d.queue.is_empty(), "queue not empty after drain");
            Ok(total)
        })
        .jobs([JobDescriptor::monitoring("test")])
        .build()
        .unwrap();

    let (results, _) = run(&quick_engine(), vec![def]);

    assert_eq!(results.len(), 1);
    let result = &results[0];
    assert!(result.is_completed(), "{:?}", result.outcome);
    assert_eq!(result.sample_count(), 1);
    assert_eq!(result.warmup_invocations, 1);
    assert_eq!(result.total_operations, 1);
    assert_eq!(result.std_dev_ns(), None);
}

#[test]
fn diagnostics_stay_with_the_case_that_asked() {
    let diagnosed = BenchmarkDefinition::builder::<Counter>("Diagnosed")
        .memory_diagnoser(true)
        .measure("Alloc", |_, _| vec![0u8; 4096])
        .jobs([JobDescriptor::monitoring("test")])
        .build()
        .unwrap();
    let plain = BenchmarkDefinition::builder::<Counter>("Plain")
        .measure("Alloc", |_, _| vec![0u8; 4096])
        .jobs([JobDescriptor::monitoring("test")])
        .build()
        .unwrap();

    let (results, _) = run(&quick_engine(), vec![diagnosed, plain]);

    let diagnosed = &results[0];
    let summary = diagnosed.diagnostics.as_ref().unwrap();
    assert!(summary.tracking_active);
    assert!(summary.allocated_bytes_per_op >= 4096.0);
    assert!(diagnosed.samples[0].allocation.is_some());

    let plain = &results[1];
    assert!(plain.diagnostics.is_none());
    assert!(plain.samples.iter().all(|s| s.allocation.is_none()));
}

#[test]
fn cleanup_failure_does_not_fail_the_case() {
    let def = BenchmarkDefinition::builder::<Counter>("LeakyCleanup")
        .measure("Op", |c, _| c.n)
        .cleanup(|_, _| Err(anyhow::anyhow!("temp dir still in use")))
        .jobs([JobDescriptor::monitoring("test")])
        .build()
        .unwrap();

    let (results, summary) = run(&quick_engine(), vec![def]);

    assert!(results[0].is_completed());
    assert!(
        results[0]
            .cleanup_error
            .as_deref()
            .unwrap()
            .contains("temp dir still in use")
    );
    assert_eq!(summary.cleanup_failures, 1);
    assert_eq!(summary.failed(), 0);
}

#[test]
fn failing_operation_reports_iteration_failure() {
    let def = BenchmarkDefinition::builder::<Counter>("Flaky")
        .try_measure("Op", |c, _| {
            c.total += 1;
            anyhow::ensure!(c.total < 50, "gave up after {} calls", c.total);
            Ok(c.total)
        })
        .build()
        .unwrap();

    let (results, summary) = run(&quick_engine(), vec![def]);

    assert_eq!(results[0].failure_reason(), Some(FailureReason::Iteration));
    assert_eq!(summary.iteration_failures, 1);
}

#[test]
fn channel_sink_forwards_results() {
    let def = BenchmarkDefinition::builder::<Counter>("Forwarded")
        .param("N", [1, 2, 3])
        .measure("Op", |c, _| c.n)
        .jobs([JobDescriptor::monitoring("test")])
        .build()
        .unwrap();
    let mut registry = Registry::new();
    registry.register(def).unwrap();

    let (mut sink, rx) = ChannelSink::bounded(8, Duration::from_secs(1));
    let summary = quick_engine().run_registry(&registry, &mut sink);
    drop(sink);

    let received: Vec<_> = rx.iter().collect();
    assert_eq!(received.len(), 3);
    assert_eq!(summary.sink_errors, 0);
}

#[test]
fn registry_rejects_duplicate_names() {
    let build = || {
        BenchmarkDefinition::builder::<Counter>("Twice")
            .measure("Op", |c, _| c.n)
            .build()
            .unwrap()
    };
    let mut registry = Registry::new();
    registry.register(build()).unwrap();

    let err: InvalidDefinition = registry.register(build()).unwrap_err();
    assert_eq!(err.source, DefinitionError::DuplicateDefinition);
    assert_eq!(registry.len(), 1);
}

#[test]
fn json_report_carries_every_result() {
    let def = BenchmarkDefinition::builder::<Counter>("Reported")
        .param("N", [5, 6])
        .measure("Op", |c, _| c.n)
        .jobs([JobDescriptor::monitoring("test")])
        .category("Reports")
        .build()
        .unwrap();

    let (results, summary) = run(&quick_engine(), vec![def]);
    let json = generate_json_report(&RunReport::new(results, summary)).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["schema_version"], 1);
    assert_eq!(value["results"].as_array().unwrap().len(), 2);
    assert_eq!(value["summary"]["completed"], 2);
    assert_eq!(value["results"][0]["benchmark"], "Reported");
    assert_eq!(value["results"][0]["categories"][0], "Reports");
}

#[test]
fn async_operation_runs_to_completion() {
    let def = BenchmarkDefinition::builder::<Counter>("Async")
        .measure_async("RoundTrip", |c, _| {
            c.n += 1;
            let value = c.n;
            async move {
                let (tx, rx) = tokio::sync::oneshot::channel();
                let _ = tx.send(value);
                rx.await.ok()
            }
        })
        .build()
        .unwrap();

    let (results, _) = run(&quick_engine(), vec![def]);

    assert!(results[0].is_completed(), "{:?}", results[0].outcome);
    assert!(results[0].sample_count() >= 3);
}
