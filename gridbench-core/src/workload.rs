//! Workloads
//!
//! A `Workload` is one case's live benchmark instance: fresh user state, the
//! bound parameter combination, and the callables that act on them. Strategies
//! and the lifecycle runner only see this trait, which keeps them independent
//! of the user's state type.

use crate::params::ParameterCombination;
use std::future::Future;
use std::hint::black_box;
use std::pin::Pin;
use std::sync::Arc;

/// Lifecycle surface of one case's benchmark instance
pub trait Workload {
    /// Run the setup callable, if any
    fn setup(&mut self) -> anyhow::Result<()>;

    /// Run the measured operation `ops` times back to back
    fn run(&mut self, ops: u64) -> anyhow::Result<()>;

    /// Run the cleanup callable, if any
    fn cleanup(&mut self) -> anyhow::Result<()>;
}

pub(crate) type HookFn<S> =
    Arc<dyn Fn(&mut S, &ParameterCombination) -> anyhow::Result<()> + Send + Sync>;

pub(crate) type LocalBoxFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>>>>;

pub(crate) type AsyncOpFn<S> =
    Arc<dyn Fn(&mut S, &ParameterCombination) -> LocalBoxFuture + Send + Sync>;

/// A measured operation, erased to a uniform signature
pub(crate) enum OperationFn<S> {
    Sync(HookFn<S>),
    Async(AsyncOpFn<S>),
}

impl<S> Clone for OperationFn<S> {
    fn clone(&self) -> Self {
        match self {
            OperationFn::Sync(f) => OperationFn::Sync(Arc::clone(f)),
            OperationFn::Async(f) => OperationFn::Async(Arc::clone(f)),
        }
    }
}

/// Builds workloads for a definition without exposing its state type
pub(crate) trait WorkloadFactory: Send + Sync {
    fn instantiate(
        &self,
        operation: usize,
        params: &ParameterCombination,
    ) -> Option<Box<dyn Workload>>;
}

pub(crate) struct TypedFactory<S> {
    pub(crate) setup: Option<HookFn<S>>,
    pub(crate) cleanup: Option<HookFn<S>>,
    pub(crate) operations: Vec<OperationFn<S>>,
}

impl<S: Default + 'static> WorkloadFactory for TypedFactory<S> {
    fn instantiate(
        &self,
        operation: usize,
        params: &ParameterCombination,
    ) -> Option<Box<dyn Workload>> {
        let operation = self.operations.get(operation)?.clone();
        Some(Box::new(TypedWorkload {
            state: S::default(),
            params: params.clone(),
            setup: self.setup.clone(),
            cleanup: self.cleanup.clone(),
            operation,
            runtime: None,
        }))
    }
}

struct TypedWorkload<S> {
    state: S,
    params: ParameterCombination,
    setup: Option<HookFn<S>>,
    cleanup: Option<HookFn<S>>,
    operation: OperationFn<S>,
    // Built on first async invocation (always during warmup) and reused.
    runtime: Option<tokio::runtime::Runtime>,
}

impl<S> Workload for TypedWorkload<S> {
    fn setup(&mut self) -> anyhow::Result<()> {
        match &self.setup {
            Some(setup) => setup(&mut self.state, &self.params),
            None => Ok(()),
        }
    }

    #[inline]
    fn run(&mut self, ops: u64) -> anyhow::Result<()> {
        let TypedWorkload {
            state,
            params,
            operation,
            runtime,
            ..
        } = self;

        match operation {
            OperationFn::Sync(op) => {
                for _ in 0..ops {
                    op(&mut *state, params)?;
                }
                Ok(())
            }
            OperationFn::Async(op) => {
                let rt = match runtime {
                    Some(rt) => rt,
                    None => runtime.insert(
                        tokio::runtime::Builder::new_current_thread()
                            .enable_all()
                            .build()?,
                    ),
                };
                rt.block_on(async {
                    for _ in 0..ops {
                        op(&mut *state, params).await?;
                    }
                    Ok::<(), anyhow::Error>(())
                })
            }
        }
    }

    fn cleanup(&mut self) -> anyhow::Result<()> {
        match &self.cleanup {
            Some(cleanup) => cleanup(&mut self.state, &self.params),
            None => Ok(()),
        }
    }
}

/// Wrap an infallible operation; its output is passed through `black_box`.
pub(crate) fn wrap_sync<S, T, F>(f: F) -> OperationFn<S>
where
    F: Fn(&mut S, &ParameterCombination) -> T + Send + Sync + 'static,
{
    OperationFn::Sync(Arc::new(
        move |state: &mut S, params: &ParameterCombination| -> anyhow::Result<()> {
            black_box(f(state, params));
            Ok(())
        },
    ))
}

/// Wrap a fallible operation; its `Ok` output is passed through `black_box`.
pub(crate) fn wrap_fallible<S, T, F>(f: F) -> OperationFn<S>
where
    F: Fn(&mut S, &ParameterCombination) -> anyhow::Result<T> + Send + Sync + 'static,
{
    OperationFn::Sync(Arc::new(
        move |state: &mut S, params: &ParameterCombination| -> anyhow::Result<()> {
            black_box(f(state, params)?);
            Ok(())
        },
    ))
}

/// Wrap a future factory. Each invocation boxes the returned future, which is
/// one small allocation per operation on top of whatever the future does.
pub(crate) fn wrap_async<S, T, F, Fut>(f: F) -> OperationFn<S>
where
    F: Fn(&mut S, &ParameterCombination) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = T> + 'static,
    T: 'static,
{
    OperationFn::Async(Arc::new(
        move |state: &mut S, params: &ParameterCombination| -> LocalBoxFuture {
            let fut = f(state, params);
            Box::pin(async move {
                black_box(fut.await);
                Ok(())
            })
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        setups: u32,
        runs: u64,
        cleanups: u32,
    }

    fn factory(operation: OperationFn<Counter>) -> TypedFactory<Counter> {
        TypedFactory {
            setup: Some(Arc::new(|s: &mut Counter, _: &ParameterCombination| -> anyhow::Result<()> {
                s.setups += 1;
                Ok(())
            })),
            cleanup: Some(Arc::new(|s: &mut Counter, _: &ParameterCombination| -> anyhow::Result<()> {
                s.cleanups += 1;
                anyhow::ensure!(s.setups == 1 && s.runs == 7, "unexpected state");
                Ok(())
            })),
            operations: vec![operation],
        }
    }

    #[test]
    fn sync_workload_runs_requested_ops() {
        let factory = factory(wrap_sync(|s: &mut Counter, _| s.runs += 1));
        let mut workload = factory
            .instantiate(0, &ParameterCombination::default())
            .unwrap();

        workload.setup().unwrap();
        workload.run(3).unwrap();
        workload.run(4).unwrap();
        workload.cleanup().unwrap();
    }

    #[test]
    fn async_workload_drives_futures() {
        let factory = factory(wrap_async(|s: &mut Counter, _| {
            s.runs += 1;
            async { tokio::task::yield_now().await }
        }));
        let mut workload = factory
            .instantiate(0, &ParameterCombination::default())
            .unwrap();

        workload.setup().unwrap();
        workload.run(7).unwrap();
        workload.cleanup().unwrap();
    }

    #[test]
    fn fallible_operation_stops_the_batch() {
        let factory = factory(wrap_fallible(|s: &mut Counter, _| {
            s.runs += 1;
            anyhow::ensure!(s.runs < 3, "third call fails");
            Ok(s.runs)
        }));
        let mut workload = factory
            .instantiate(0, &ParameterCombination::default())
            .unwrap();

        let err = workload.run(10).unwrap_err();
        assert_eq!(err.to_string(), "third call fails");
    }

    #[test]
    fn unknown_operation_index_is_none() {
        let factory = factory(wrap_sync(|_: &mut Counter, _| ()));
        assert!(factory.instantiate(1, &ParameterCombination::default()).is_none());
    }
}
