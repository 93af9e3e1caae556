//! gridbench Example Suite
//!
//! A small suite covering the harness features: parameter grids, setup and
//! cleanup, multiple operations per definition, monitoring jobs, memory
//! diagnostics and async operations.
//!
//! Run with:
//!   cargo run --release --example suite
//!   cargo run --release --example suite -- --verbose --format json
//!   cargo run --release --example suite -- --config gridbench.toml

use clap::Parser;
use crossbeam::queue::SegQueue;
use gridbench::prelude::*;
use gridbench::{
    GridConfig, OutputFormat, RunReport, generate_json_report, init_tracing, run_with_config,
};
use rand::Rng;
use regex::Regex;
use std::collections::{BTreeSet, VecDeque};
use std::path::PathBuf;

#[global_allocator]
static GLOBAL: TrackingAllocator = TrackingAllocator;

/// gridbench example suite
#[derive(Parser, Debug)]
#[command(name = "suite", about = "Run the gridbench example suite")]
struct Args {
    /// Configuration file (defaults to a discovered gridbench.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format: human or json
    #[arg(long, default_value = "human")]
    format: OutputFormat,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

// ============================================================================
// Collections
// ============================================================================

#[derive(Default)]
struct Queue {
    items: VecDeque<u64>,
    n: u64,
}

fn queue_single() -> Result<BenchmarkDefinition, gridbench::InvalidDefinition> {
    BenchmarkDefinition::builder::<Queue>("QueueBenchmark1")
        .category("Collections")
        .measure("Run", |q, _| {
            q.items.push_back(0);
            q.items.pop_front()
        })
        .jobs(JobSet::main())
        .build()
}

fn queue_churn() -> Result<BenchmarkDefinition, gridbench::InvalidDefinition> {
    BenchmarkDefinition::builder::<Queue>("QueueBenchmark2")
        .category("Collections")
        .param("N", [10, 100, 1_000, 10_000])
        .setup(|q, p| {
            q.n = p.require_usize("N")? as u64;
            Ok(())
        })
        .measure("Run", |q, _| {
            for i in 0..q.n {
                q.items.push_back(i);
            }
            for _ in 0..q.n {
                q.items.pop_front();
            }
        })
        .jobs(JobSet::main())
        .build()
}

#[derive(Default)]
struct SortedSet {
    set: BTreeSet<u64>,
}

fn sorted_set_min() -> Result<BenchmarkDefinition, gridbench::InvalidDefinition> {
    BenchmarkDefinition::builder::<SortedSet>("SortedSetBenchmark1")
        .category("Collections")
        .param("N", [1, 100, 100_000])
        .setup(|s, p| {
            s.set.extend(0..p.require_usize("N")? as u64);
            Ok(())
        })
        .measure("Run", |s, _| s.set.first().copied())
        .cleanup(|s, _| {
            s.set.clear();
            Ok(())
        })
        .jobs(JobSet::main())
        .build()
}

#[derive(Default)]
struct Drain {
    queue: SegQueue<u64>,
    n: u64,
}

/// Producer on the case thread, consumer on a scoped thread; the invocation
/// ends once every item has been dequeued.
fn concurrent_drain() -> Result<BenchmarkDefinition, gridbench::InvalidDefinition> {
    BenchmarkDefinition::builder::<Drain>("ConcurrentQueueBenchmark3")
        .category("Collections")
        .param("N", [1_000_000])
        .setup(|d, p| {
            d.n = p.require_usize("N")? as u64;
            Ok(())
        })
        .try_measure("Run", |d, _| {
            let queue = &d.queue;
            let n = d.n;
            let consumed = std::thread::scope(|scope| {
                let consumer = scope.spawn(|| {
                    let mut total = 0u64;
                    while total < n {
                        if queue.pop().is_some() {
                            total += 1;
                        }
                    }
                    total
                });
                for i in 0..n {
                    queue.push(i);
                }
                consumer.join()
            });
            match consumed {
                Ok(total) => Ok(total),
                Err(_) => anyhow::bail!("consumer thread panicked"),
            }
        })
        .jobs(JobSet::monitoring())
        .build()
}

// ============================================================================
// Text processing
// ============================================================================

#[derive(Default)]
struct Phone {
    pattern: Option<Regex>,
}

fn regex_is_match() -> Result<BenchmarkDefinition, gridbench::InvalidDefinition> {
    BenchmarkDefinition::builder::<Phone>("RegexIsMatchBenchmark")
        .category("TextProcessing")
        .memory_diagnoser(true)
        .setup(|p, _| {
            p.pattern = Some(Regex::new(r"^\d{3}-\d{3}-\d{4}$")?);
            Ok(())
        })
        .try_measure("Run", |p, _| match &p.pattern {
            Some(re) => Ok(re.is_match("555-867-5309")),
            None => anyhow::bail!("pattern not compiled"),
        })
        .jobs(JobSet::main())
        .build()
}

#[derive(Default)]
struct Text {
    chars: Vec<char>,
}

fn utf8_get_bytes() -> Result<BenchmarkDefinition, gridbench::InvalidDefinition> {
    BenchmarkDefinition::builder::<Text>("Utf8GetBytesBenchmark")
        .category("TextProcessing")
        .memory_diagnoser(true)
        .param("N", [256, 512, 1024, 2048])
        .setup(|t, p| {
            let n = p.require_usize("N")?;
            let mut rng = rand::thread_rng();
            t.chars = (0..n).map(|_| rng.gen_range('a'..='ʯ')).collect();
            Ok(())
        })
        .measure("Run", |t, _| {
            let mut bytes = Vec::with_capacity(t.chars.len() * 2);
            let mut buf = [0u8; 4];
            for c in &t.chars {
                bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
            bytes
        })
        .jobs(JobSet::main())
        .build()
}

#[derive(Default)]
struct Timestamp {
    at: chrono::DateTime<chrono::Utc>,
}

fn date_time_to_string() -> Result<BenchmarkDefinition, gridbench::InvalidDefinition> {
    use chrono::TimeZone;

    BenchmarkDefinition::builder::<Timestamp>("DateTimeToStringBenchmark")
        .category("TextProcessing")
        .memory_diagnoser(true)
        .try_measure("RunO", |t, _| anyhow::Ok(t.at.to_rfc3339()))
        .try_measure("RunR", |t, _| anyhow::Ok(t.at.to_rfc2822()))
        .setup(|t, _| {
            t.at = chrono::Utc
                .with_ymd_and_hms(2017, 6, 7, 1, 2, 3)
                .single()
                .ok_or_else(|| anyhow::anyhow!("invalid timestamp"))?;
            Ok(())
        })
        .jobs(JobSet::main())
        .build()
}

// ============================================================================
// Async
// ============================================================================

#[derive(Default)]
struct Ping {
    sent: u64,
}

fn oneshot_round_trip() -> Result<BenchmarkDefinition, gridbench::InvalidDefinition> {
    BenchmarkDefinition::builder::<Ping>("OneshotRoundTrip")
        .category("Async")
        .measure_async("Run", |p, _| {
            p.sent += 1;
            let value = p.sent;
            async move {
                let (tx, rx) = tokio::sync::oneshot::channel();
                let _ = tx.send(value);
                rx.await.ok()
            }
        })
        .build()
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = match &args.config {
        Some(path) => GridConfig::load(path)?,
        None => GridConfig::discover()?.unwrap_or_default(),
    };

    let mut registry = Registry::new();
    for definition in [
        queue_single()?,
        queue_churn()?,
        sorted_set_min()?,
        concurrent_drain()?,
        regex_is_match()?,
        utf8_get_bytes()?,
        date_time_to_string()?,
        oneshot_round_trip()?,
    ] {
        registry.register(definition)?;
    }

    let mut sink = CollectingSink::new();
    let summary = run_with_config(&config, &registry, &mut sink)?;

    match args.format {
        OutputFormat::Human => print!("{}", format_human_output(sink.results(), &summary)),
        OutputFormat::Json => {
            let report = RunReport::new(sink.into_results(), summary);
            println!("{}", generate_json_report(&report)?);
        }
    }
    Ok(())
}
