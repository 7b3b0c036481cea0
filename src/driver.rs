//! Lifecycle driver
//!
//! Thin adapter between the external test runner's hook interface and the
//! accounting core: updates attribution at test start, merges the external
//! channel at teardown, and emits the report at suite end. The summary is
//! the only point where I/O happens.

use crate::aggregate::{aggregate, TimeReport};
use crate::category::Category;
use crate::config::ReportConfig;
use crate::context::SharedRunContext;
use crate::html_output::{HtmlReport, HTML_REPORT_FILE_NAME};
use crate::intercept::{Interceptor, MethodSpec};
use crate::json_output::{JsonReport, REPORT_FILE_NAME};
use crate::ledger::TestIdentity;
use crate::upload::{RetryPolicy, Uploader};
use std::time::Instant;

/// Operation key for the driver-measured per-test wall clock.
const WALL_CLOCK_KEY: &str = "wall_clock";

/// What the runner knows about a test item at hook time.
#[derive(Debug, Clone, Default)]
pub struct TestDescriptor {
    /// Owning type hierarchy, immediate type first, root ancestor last;
    /// empty for classless tests
    pub lineage: Vec<String>,
    /// Test function name
    pub name: String,
}

impl TestDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            lineage: Vec::new(),
            name: name.into(),
        }
    }

    pub fn with_lineage(mut self, lineage: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.lineage = lineage.into_iter().map(Into::into).collect();
        self
    }

    /// The immediate owning type, used for interception installation.
    pub fn owner(&self) -> Option<&str> {
        self.lineage.first().map(String::as_str)
    }

    pub fn identity(&self) -> TestIdentity {
        TestIdentity::derive(&self.lineage, &self.name)
    }
}

/// Instrumentation offer for one owning type, supplied at composition time
/// in place of reflection-based class scanning.
pub struct InstallPlan {
    pub owner: String,
    pub methods: Vec<MethodSpec>,
}

/// Drives installation, attribution updates and report emission across one
/// suite run.
pub struct SuiteDriver {
    ctx: SharedRunContext,
    interceptor: Interceptor,
    config: ReportConfig,
    test_started_at: Option<Instant>,
}

impl SuiteDriver {
    pub fn new(config: ReportConfig) -> Self {
        let ctx = SharedRunContext::new();
        let interceptor = Interceptor::new(ctx.clone());
        Self {
            ctx,
            interceptor,
            config,
            test_started_at: None,
        }
    }

    /// Handle to the shared run context, for external timing sources.
    pub fn context(&self) -> &SharedRunContext {
        &self.ctx
    }

    /// The interceptor holding the instrumented operation registry.
    pub fn interceptor_mut(&mut self) -> &mut Interceptor {
        &mut self.interceptor
    }

    /// Test-start hook: derive the identity, point attribution at it, and
    /// install interception for the owning type if not yet installed.
    pub fn on_run_start(&mut self, descriptor: &TestDescriptor, plan: Option<InstallPlan>) {
        let identity = descriptor.identity();
        tracing::debug!(test = %identity, "test starting");
        self.ctx.set_current_test(identity);
        if let Some(plan) = plan {
            self.interceptor.install(&plan.owner, plan.methods);
        }
        self.test_started_at = Some(Instant::now());
    }

    /// Teardown hook: record the test's wall clock, then fold and drain
    /// the external channel so nothing leaks into the next test.
    pub fn on_run_teardown(&mut self, descriptor: &TestDescriptor, _next: Option<&TestDescriptor>) {
        if let Some(started) = self.test_started_at.take() {
            let elapsed_us = started.elapsed().as_secs_f64() * 1_000_000.0;
            self.ctx
                .record(Category::TotalTime, WALL_CLOCK_KEY, elapsed_us, None);
        }
        for category in Category::external_channel_categories() {
            self.ctx.merge_external(category);
        }
        self.ctx.lock().external.reset();
        tracing::debug!(test = %descriptor.identity(), "test torn down");
    }

    /// Suite-summary hook: aggregate the ledger, write the JSON and HTML
    /// report files, then attempt the collector upload.
    ///
    /// File write failures surface; a failed upload is logged and
    /// swallowed so a down collector never fails a local run.
    pub fn on_suite_summary(&self) -> anyhow::Result<TimeReport> {
        let report = {
            let guard = self.ctx.lock();
            aggregate(&guard.ledger)
        };

        let json_report = JsonReport::from_report(&report);
        json_report.write_to(&self.config.work_dir.join(REPORT_FILE_NAME))?;
        HtmlReport::write_to(&report, &self.config.work_dir.join(HTML_REPORT_FILE_NAME))?;

        if let (Some(url), Some(api_key)) = (
            self.config.collector_url.as_deref(),
            self.config.api_key.as_deref(),
        ) {
            match Uploader::new(RetryPolicy::default()) {
                Ok(uploader) => {
                    if let Err(err) =
                        uploader.post_report(url, api_key, &self.config.run_id, &json_report)
                    {
                        tracing::warn!(url, error = %err, "report upload failed");
                    }
                }
                Err(err) => tracing::warn!(error = %err, "collector client unavailable"),
            }
        }

        Ok(report)
    }
}

/// Initialize a tracing subscriber for debug output. Opt-in; library
/// consumers usually install their own.
pub fn init_tracing(debug: bool) {
    if debug {
        use tracing_subscriber::EnvFilter;
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}
