//! Configuration loading from gridbench.toml
//!
//! gridbench configuration can be specified in a `gridbench.toml` file in the project root.
//! The configuration is automatically discovered by walking up from the current directory.

use crate::engine::EngineConfig;
use anyhow::Context;
use gridbench_core::{JobDescriptor, ThroughputConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// File name looked up by [`GridConfig::discover`]
pub const CONFIG_FILE: &str = "gridbench.toml";

/// gridbench configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GridConfig {
    /// Runner configuration
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Throughput strategy tuning
    #[serde(default)]
    pub throughput: ThroughputSection,
    /// Memory diagnostics configuration
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
    /// Jobs applied to every definition without its own job list
    #[serde(default)]
    pub jobs: Vec<JobDescriptor>,
}

/// Runner configuration for case execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Timeout for a single case (e.g., "60s", "5m")
    #[serde(default = "default_timeout")]
    pub timeout: String,
    /// How long a timed-out case may take to reach cleanup before it is abandoned
    #[serde(default = "default_cleanup_grace")]
    pub cleanup_grace: String,
    /// Pin case threads to this CPU
    #[serde(default)]
    pub pin_cpu: Option<usize>,
    /// Show a progress bar
    #[serde(default)]
    pub progress: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            cleanup_grace: default_cleanup_grace(),
            pin_cpu: None,
            progress: false,
        }
    }
}

fn default_timeout() -> String {
    "60s".to_string()
}
fn default_cleanup_grace() -> String {
    "2s".to_string()
}

/// Throughput tuning as written in the file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThroughputSection {
    /// Warmup budget (e.g., "500ms")
    #[serde(default = "default_warmup_time")]
    pub warmup_time: String,
    /// Soft cap on warmup invocations
    #[serde(default = "default_max_warmup_iterations")]
    pub max_warmup_iterations: u64,
    /// Shortest block the pilot accepts (e.g., "100ms")
    #[serde(default = "default_min_block_time")]
    pub min_block_time: String,
    /// Largest batch the pilot grows to
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: u64,
    /// Blocks always measured
    #[serde(default = "default_min_blocks")]
    pub min_blocks: usize,
    /// Ceiling on measured blocks
    #[serde(default = "default_max_blocks")]
    pub max_blocks: usize,
    /// Relative standard error at which measurement stops
    #[serde(default = "default_target_relative_error")]
    pub target_relative_error: f64,
}

impl Default for ThroughputSection {
    fn default() -> Self {
        Self {
            warmup_time: default_warmup_time(),
            max_warmup_iterations: default_max_warmup_iterations(),
            min_block_time: default_min_block_time(),
            max_batch_size: default_max_batch_size(),
            min_blocks: default_min_blocks(),
            max_blocks: default_max_blocks(),
            target_relative_error: default_target_relative_error(),
        }
    }
}

fn default_warmup_time() -> String {
    "500ms".to_string()
}
fn default_max_warmup_iterations() -> u64 {
    ThroughputConfig::default().max_warmup_iterations
}
fn default_min_block_time() -> String {
    "100ms".to_string()
}
fn default_max_batch_size() -> u64 {
    ThroughputConfig::default().max_batch_size
}
fn default_min_blocks() -> usize {
    ThroughputConfig::default().min_blocks
}
fn default_max_blocks() -> usize {
    ThroughputConfig::default().max_blocks
}
fn default_target_relative_error() -> f64 {
    ThroughputConfig::default().target_relative_error
}

impl ThroughputSection {
    /// Parse durations into a [`ThroughputConfig`]
    pub fn to_config(&self) -> anyhow::Result<ThroughputConfig> {
        Ok(ThroughputConfig {
            warmup_time: GridConfig::parse_duration(&self.warmup_time)?,
            max_warmup_iterations: self.max_warmup_iterations,
            min_block_time: GridConfig::parse_duration(&self.min_block_time)?,
            max_batch_size: self.max_batch_size,
            min_blocks: self.min_blocks,
            max_blocks: self.max_blocks,
            target_relative_error: self.target_relative_error,
        })
    }
}

/// Memory diagnostics configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// Collect allocation figures for every case, not only opted-in definitions
    #[serde(default)]
    pub enabled: bool,
}

impl GridConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Discover and load configuration by walking up from the current directory.
    ///
    /// `Ok(None)` when no `gridbench.toml` exists; a file that exists but
    /// cannot be read or parsed is an error.
    pub fn discover() -> anyhow::Result<Option<Self>> {
        Self::discover_from(&std::env::current_dir()?)
    }

    /// Discover configuration by walking up from `start`
    pub fn discover_from(start: &Path) -> anyhow::Result<Option<Self>> {
        let mut dir = start.to_path_buf();
        loop {
            let config_path = dir.join(CONFIG_FILE);
            if config_path.exists() {
                let config = Self::load(&config_path)
                    .with_context(|| format!("invalid config at {}", config_path.display()))?;
                tracing::debug!(path = %config_path.display(), "loaded configuration");
                return Ok(Some(config));
            }
            if !dir.pop() {
                return Ok(None);
            }
        }
    }

    /// Engine settings described by this configuration
    pub fn engine_config(&self) -> anyhow::Result<EngineConfig> {
        Ok(EngineConfig {
            timeout: Self::parse_duration(&self.runner.timeout)?,
            cleanup_grace: Self::parse_duration(&self.runner.cleanup_grace)?,
            throughput: self.throughput.to_config()?,
            memory_diagnoser: self.diagnostics.enabled,
            jobs: self.jobs.clone(),
            pin_cpu: self.runner.pin_cpu,
            progress: self.runner.progress,
        })
    }

    /// Generate a default configuration as TOML string
    pub fn default_toml() -> String {
        r#"# gridbench configuration

[runner]
# Timeout for a single case
timeout = "60s"
# Time a timed-out case gets to reach cleanup before its thread is abandoned
cleanup_grace = "2s"
# Pin case threads to one CPU (uncomment to enable)
# pin_cpu = 0
# Show a progress bar
progress = false

[throughput]
# Warmup budget before the pilot
warmup_time = "500ms"
# Soft cap on warmup invocations
max_warmup_iterations = 10000000
# Minimum duration of one timed block
min_block_time = "100ms"
# Largest batch the pilot may grow to
max_batch_size = 1073741824
# Blocks always measured
min_blocks = 15
# Ceiling on measured blocks
max_blocks = 100
# Stop when the relative standard error of the mean reaches this
target_relative_error = 0.02

[diagnostics]
# Collect allocation figures for every case
enabled = false

# Jobs for definitions without their own job list (uncomment to enable)
# [[jobs]]
# target = "core-x64"
# strategy = "throughput"
"#
        .to_string()
    }

    /// Parse duration string (e.g., "3s", "500ms", "2m")
    pub fn parse_duration(s: &str) -> anyhow::Result<Duration> {
        let s = s.trim();
        if s.is_empty() {
            return Err(anyhow::anyhow!("Empty duration string"));
        }

        // Find where the number ends and unit begins
        let (num_part, unit_part) = s
            .char_indices()
            .find(|(_, c)| c.is_alphabetic())
            .map(|(i, _)| s.split_at(i))
            .unwrap_or((s, "s"));

        let value: f64 = num_part
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid duration number: {}", num_part))?;
        if !value.is_finite() || value < 0.0 {
            return Err(anyhow::anyhow!("Duration must be non-negative: {}", s));
        }

        let multiplier: f64 = match unit_part.to_lowercase().as_str() {
            "ns" => 1.0,
            "us" | "µs" => 1_000.0,
            "ms" => 1_000_000.0,
            "s" | "" => 1_000_000_000.0,
            "m" | "min" => 60_000_000_000.0,
            _ => return Err(anyhow::anyhow!("Unknown duration unit: {}", unit_part)),
        };

        Ok(Duration::from_nanos((value * multiplier) as u64))
    }
}
