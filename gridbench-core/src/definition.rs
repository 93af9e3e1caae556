//! Benchmark Definitions
//!
//! A definition is the declarative description of one benchmark: its name,
//! parameter declarations, the operations it measures, the setup and cleanup
//! callables that prepare per-case state, and optional per-definition
//! settings (jobs, memory diagnostics, timeout, throughput tuning).
//!
//! Definitions are built with [`DefinitionBuilder`], which validates the whole
//! description before anything can run:
//!
//! ```ignore
//! #[derive(Default)]
//! struct Queue { items: VecDeque<u64>, n: usize }
//!
//! let def = BenchmarkDefinition::builder::<Queue>("QueueBenchmark")
//!     .param("N", [10, 100, 1000])
//!     .setup(|q, p| { q.n = p.require_usize("N")?; Ok(()) })
//!     .measure("Enqueue", |q, _| { q.items.clear(); q.items.extend(0..q.n as u64) })
//!     .build()?;
//! ```

use crate::error::{DefinitionError, InvalidDefinition};
use crate::job::JobDescriptor;
use crate::params::{
    ParamValue, ParameterCombination, ParameterDeclaration, expand_parameters,
};
use crate::strategy::ThroughputConfig;
use crate::workload::{
    HookFn, OperationFn, TypedFactory, Workload, WorkloadFactory, wrap_async, wrap_fallible,
    wrap_sync,
};
use fxhash::FxHashSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// A validated benchmark definition
pub struct BenchmarkDefinition {
    name: String,
    parameters: Vec<ParameterDeclaration>,
    combinations: Vec<ParameterCombination>,
    operations: Vec<String>,
    categories: Vec<String>,
    memory_diagnoser: bool,
    jobs: Option<Vec<JobDescriptor>>,
    timeout: Option<Duration>,
    throughput: Option<ThroughputConfig>,
    factory: Box<dyn WorkloadFactory>,
}

impl BenchmarkDefinition {
    /// Start building a definition whose per-case state is `S`.
    ///
    /// Every case gets a fresh `S::default()`.
    pub fn builder<S: Default + 'static>(name: impl Into<String>) -> DefinitionBuilder<S> {
        DefinitionBuilder::new(name)
    }

    /// Definition name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter declarations, in declaration order
    pub fn parameters(&self) -> &[ParameterDeclaration] {
        &self.parameters
    }

    /// Expanded parameter combinations, in enumeration order
    pub fn combinations(&self) -> &[ParameterCombination] {
        &self.combinations
    }

    /// Measured operation names, in declaration order
    pub fn operations(&self) -> &[String] {
        &self.operations
    }

    /// Category tags
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Whether cases of this definition collect allocation figures
    pub fn memory_diagnoser(&self) -> bool {
        self.memory_diagnoser
    }

    /// Jobs declared on the definition, overriding the engine's job list
    pub fn jobs(&self) -> Option<&[JobDescriptor]> {
        self.jobs.as_deref()
    }

    /// Per-case timeout override
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Throughput tuning override
    pub fn throughput(&self) -> Option<&ThroughputConfig> {
        self.throughput.as_ref()
    }

    /// Fresh workload for operation `operation` bound to `params`
    pub(crate) fn instantiate(
        &self,
        operation: usize,
        params: &ParameterCombination,
    ) -> Option<Box<dyn Workload>> {
        self.factory.instantiate(operation, params)
    }
}

impl fmt::Debug for BenchmarkDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BenchmarkDefinition")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .field("operations", &self.operations)
            .field("categories", &self.categories)
            .field("memory_diagnoser", &self.memory_diagnoser)
            .field("jobs", &self.jobs)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Builder for [`BenchmarkDefinition`]
pub struct DefinitionBuilder<S> {
    name: String,
    parameters: Vec<ParameterDeclaration>,
    categories: Vec<String>,
    memory_diagnoser: bool,
    jobs: Option<Vec<JobDescriptor>>,
    timeout: Option<Duration>,
    throughput: Option<ThroughputConfig>,
    setup: Option<HookFn<S>>,
    cleanup: Option<HookFn<S>>,
    operations: Vec<(String, OperationFn<S>)>,
}

impl<S: Default + 'static> DefinitionBuilder<S> {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            categories: Vec::new(),
            memory_diagnoser: false,
            jobs: None,
            timeout: None,
            throughput: None,
            setup: None,
            cleanup: None,
            operations: Vec::new(),
        }
    }

    /// Declare a parameter and its ordered values
    pub fn param<V: Into<ParamValue>>(
        mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.parameters.push(ParameterDeclaration::new(name, values));
        self
    }

    /// Add a category tag
    pub fn category(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if !self.categories.contains(&tag) {
            self.categories.push(tag);
        }
        self
    }

    /// Callable run once per case before warmup
    pub fn setup<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut S, &ParameterCombination) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.setup = Some(Arc::new(f));
        self
    }

    /// Callable run once per case after measurement, even if earlier phases failed
    pub fn cleanup<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut S, &ParameterCombination) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.cleanup = Some(Arc::new(f));
        self
    }

    /// Declare a measured operation; its return value is kept from being optimized away
    pub fn measure<T, F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut S, &ParameterCombination) -> T + Send + Sync + 'static,
    {
        self.operations.push((name.into(), wrap_sync(f)));
        self
    }

    /// Declare a measured operation that can fail; an error fails the case
    pub fn try_measure<T, F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut S, &ParameterCombination) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.operations.push((name.into(), wrap_fallible(f)));
        self
    }

    /// Declare an asynchronous measured operation.
    ///
    /// Each invocation is driven to completion on a per-case current-thread
    /// runtime, so the measured time covers the whole future.
    pub fn measure_async<T, F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut S, &ParameterCombination) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + 'static,
        T: 'static,
    {
        self.operations.push((name.into(), wrap_async(f)));
        self
    }

    /// Enable or disable memory diagnostics for this definition
    pub fn memory_diagnoser(mut self, enabled: bool) -> Self {
        self.memory_diagnoser = enabled;
        self
    }

    /// Run this definition under these jobs instead of the engine's
    pub fn jobs(mut self, jobs: impl IntoIterator<Item = JobDescriptor>) -> Self {
        self.jobs = Some(jobs.into_iter().collect());
        self
    }

    /// Per-case timeout override
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Throughput tuning override
    pub fn throughput(mut self, config: ThroughputConfig) -> Self {
        self.throughput = Some(config);
        self
    }

    /// Validate and freeze the definition
    pub fn build(self) -> Result<BenchmarkDefinition, InvalidDefinition> {
        let invalid = |source: DefinitionError| InvalidDefinition::new(self.name.clone(), source);

        if self.name.trim().is_empty() {
            return Err(invalid(DefinitionError::EmptyName));
        }
        if self.operations.is_empty() {
            return Err(invalid(DefinitionError::NoOperations));
        }
        let mut seen = FxHashSet::default();
        for (operation, _) in &self.operations {
            if !seen.insert(operation.as_str()) {
                return Err(invalid(DefinitionError::DuplicateOperation {
                    operation: operation.clone(),
                }));
            }
        }
        if self.jobs.as_ref().is_some_and(Vec::is_empty) {
            return Err(invalid(DefinitionError::EmptyJobs));
        }
        let combinations = expand_parameters(&self.parameters).map_err(invalid)?;

        let (operations, callables): (Vec<_>, Vec<_>) = self.operations.into_iter().unzip();
        Ok(BenchmarkDefinition {
            name: self.name,
            parameters: self.parameters,
            combinations,
            operations,
            categories: self.categories,
            memory_diagnoser: self.memory_diagnoser,
            jobs: self.jobs,
            timeout: self.timeout,
            throughput: self.throughput,
            factory: Box::new(TypedFactory {
                setup: self.setup,
                cleanup: self.cleanup,
                operations: callables,
            }),
        })
    }
}
