//! Job Matrix
//!
//! Expands definitions into the ordered list of cases the engine runs:
//! operations in declaration order, then parameter combinations in
//! enumeration order, then jobs in list order.

use crate::case::BenchmarkCase;
use crate::definition::BenchmarkDefinition;
use crate::job::JobDescriptor;
use fxhash::FxHashSet;
use std::sync::Arc;

/// Jobs a definition runs under.
///
/// The definition's own jobs win over `engine_jobs`; with neither, a single
/// default throughput job is used. Repeated descriptors keep their first
/// occurrence.
pub fn effective_jobs(
    definition: &BenchmarkDefinition,
    engine_jobs: &[JobDescriptor],
) -> Vec<JobDescriptor> {
    let source = match definition.jobs() {
        Some(jobs) => jobs,
        None => engine_jobs,
    };
    if source.is_empty() {
        return vec![JobDescriptor::default()];
    }

    let mut seen = FxHashSet::default();
    let mut jobs = Vec::with_capacity(source.len());
    for job in source {
        if seen.insert(job) {
            jobs.push(job.clone());
        } else {
            tracing::debug!(benchmark = definition.name(), %job, "dropping repeated job");
        }
    }
    jobs
}

/// Cases for one definition
pub fn build_cases(
    definition: &Arc<BenchmarkDefinition>,
    engine_jobs: &[JobDescriptor],
) -> Vec<BenchmarkCase> {
    let jobs = effective_jobs(definition, engine_jobs);
    let combinations = definition.combinations();
    let mut cases =
        Vec::with_capacity(definition.operations().len() * combinations.len() * jobs.len());

    for operation in 0..definition.operations().len() {
        for params in combinations {
            for job in &jobs {
                cases.push(BenchmarkCase::new(
                    Arc::clone(definition),
                    operation,
                    params.clone(),
                    job.clone(),
                ));
            }
        }
    }
    cases
}

/// Cases for every definition, in definition order
pub fn build_matrix(
    definitions: &[Arc<BenchmarkDefinition>],
    engine_jobs: &[JobDescriptor],
) -> Vec<BenchmarkCase> {
    definitions
        .iter()
        .flat_map(|def| build_cases(def, engine_jobs))
        .collect()
}
