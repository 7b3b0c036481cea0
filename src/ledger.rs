//! Granular time ledger
//!
//! Append-only nested store of raw timing samples keyed by
//! test identity, category and operation key. Absence of a key is never an
//! error, it means "zero samples so far". The ledger accumulates for the
//! whole suite run and is only consumed at final aggregation.

use crate::category::Category;
use crate::sample::{Sample, SourceKind};
use std::collections::BTreeMap;

/// Identifies the specific instrumented call site within a category,
/// e.g. `Router.set_voltage` or `Router.bring_up.sleep`.
pub type OperationKey = String;

/// Samples grouped by operation key within one category.
pub type CategorySamples = BTreeMap<OperationKey, Vec<Sample>>;

/// Stable key identifying one test case for one suite run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TestIdentity(String);

impl TestIdentity {
    /// Sentinel bucket for samples that fire with no current test set.
    pub const UNATTRIBUTED: &'static str = "unattributed";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Derive an identity from a test's owning type lineage and name.
    ///
    /// The lineage runs immediate type first, root ancestor last; the root
    /// name is used so subclassed suites attribute to a common label. A
    /// classless test falls back to its bare name.
    pub fn derive(lineage: &[String], test_name: &str) -> Self {
        match lineage.last() {
            Some(root) if !root.is_empty() => Self(format!("{}.{}", root, test_name)),
            _ => Self(test_name.to_string()),
        }
    }

    pub fn unattributed() -> Self {
        Self(Self::UNATTRIBUTED.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TestIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// External per-command timing channel.
///
/// A lower transport layer accumulates its own per-command timings here
/// independently of the interceptors. At test teardown the channel is
/// merged into the ledger and drained so nothing leaks into the next test.
#[derive(Debug, Default)]
pub struct ExternalChannel {
    buckets: BTreeMap<Category, CategorySamples>,
}

impl ExternalChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a timing captured by the external source.
    pub fn record(
        &mut self,
        category: Category,
        key: impl Into<OperationKey>,
        elapsed_us: f64,
        tag: Option<SourceKind>,
    ) {
        self.buckets
            .entry(category)
            .or_default()
            .entry(key.into())
            .or_default()
            .push(Sample::new(elapsed_us, tag));
    }

    /// Take every buffered sample for one category, leaving it empty.
    pub fn drain(&mut self, category: Category) -> CategorySamples {
        self.buckets.remove(&category).unwrap_or_default()
    }

    /// Drop all buffered samples.
    pub fn reset(&mut self) {
        self.buckets.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.values().all(|b| b.is_empty())
    }
}

/// Accumulating store of raw samples for the whole suite run.
#[derive(Debug, Default)]
pub struct Ledger {
    entries: BTreeMap<TestIdentity, BTreeMap<Category, CategorySamples>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample, creating intermediate mappings on first use.
    pub fn record(
        &mut self,
        test: &TestIdentity,
        category: Category,
        key: impl Into<OperationKey>,
        elapsed_us: f64,
        tag: Option<SourceKind>,
    ) {
        self.entries
            .entry(test.clone())
            .or_default()
            .entry(category)
            .or_default()
            .entry(key.into())
            .or_default()
            .push(Sample::new(elapsed_us, tag));
    }

    /// Fold externally captured samples into a test's entry.
    ///
    /// The external channel is authoritative for the keys it carries: an
    /// existing key under the same category is replaced, not appended to,
    /// so the two timing sources never double-count.
    pub fn merge_external(
        &mut self,
        test: &TestIdentity,
        category: Category,
        external: CategorySamples,
    ) {
        let bucket = self
            .entries
            .entry(test.clone())
            .or_default()
            .entry(category)
            .or_default();
        for (key, samples) in external {
            bucket.insert(key, samples);
        }
    }

    /// Samples recorded for one test and category, if any.
    pub fn samples(&self, test: &TestIdentity, category: Category) -> Option<&CategorySamples> {
        self.entries.get(test)?.get(&category)
    }

    /// Iterate tests in deterministic order.
    pub fn tests(
        &self,
    ) -> impl Iterator<Item = (&TestIdentity, &BTreeMap<Category, CategorySamples>)> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
