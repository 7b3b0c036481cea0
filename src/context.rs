//! Shared run context: attribution slot, ledger and external channel
//!
//! The original design kept "which test is running" in ambient process
//! globals. Here it is an explicit context object handed to every
//! interceptor, preserving the single sequential attribution contract while
//! keeping the ledger and aggregator testable in isolation.

use crate::category::Category;
use crate::ledger::{ExternalChannel, Ledger, OperationKey, TestIdentity};
use crate::sample::SourceKind;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Mutable state for one suite run.
///
/// The attribution slot is a single value because the execution model is
/// strictly sequential: one test runs to completion before the next start
/// event fires. Concurrent test execution would need a per-task slot.
#[derive(Debug, Default)]
pub struct RunContext {
    current: Option<TestIdentity>,
    pub ledger: Ledger,
    pub external: ExternalChannel,
}

impl RunContext {
    pub fn set_current_test(&mut self, identity: TestIdentity) {
        self.current = Some(identity);
    }

    pub fn current_test(&self) -> Option<&TestIdentity> {
        self.current.as_ref()
    }

    /// The attribution target for a sample firing right now.
    ///
    /// An operation firing outside any test is filed under the sentinel
    /// bucket rather than raising.
    pub fn attribution(&self) -> TestIdentity {
        self.current
            .clone()
            .unwrap_or_else(TestIdentity::unattributed)
    }
}

/// Cheaply cloneable handle to the run context.
///
/// Instrumented operations hold one of these and read the attribution slot
/// at call time, never caching it in a wrapper closure: the same wrapped
/// method is invoked under different attributions across different tests.
#[derive(Debug, Clone, Default)]
pub struct SharedRunContext {
    inner: Arc<Mutex<RunContext>>,
}

impl SharedRunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the context. A poisoned lock is recovered rather than
    /// propagated; a panicking test body must not corrupt the report.
    pub fn lock(&self) -> MutexGuard<'_, RunContext> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_current_test(&self, identity: TestIdentity) {
        self.lock().set_current_test(identity);
    }

    pub fn current_test(&self) -> Option<TestIdentity> {
        self.lock().current_test().cloned()
    }

    /// Record a sample against the current attribution target.
    pub fn record(
        &self,
        category: Category,
        key: impl Into<OperationKey>,
        elapsed_us: f64,
        tag: Option<SourceKind>,
    ) {
        let mut ctx = self.lock();
        let test = ctx.attribution();
        ctx.ledger.record(&test, category, key, elapsed_us, tag);
    }

    /// Merge one category of the external channel into the current test's
    /// ledger entry, draining the channel for that category.
    pub fn merge_external(&self, category: Category) {
        let mut ctx = self.lock();
        let test = ctx.attribution();
        let drained = ctx.external.drain(category);
        if !drained.is_empty() {
            ctx.ledger.merge_external(&test, category, drained);
        }
    }
}
