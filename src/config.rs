//! Environment-sourced configuration for report output and upload

use std::path::PathBuf;

/// Environment variable naming the run for uploaded reports.
pub const RUN_ID_ENV: &str = "TIMEGRAIN_RUN_ID";
/// Environment variable with the collector endpoint URL.
pub const COLLECTOR_URL_ENV: &str = "TIMEGRAIN_COLLECTOR_URL";
/// Environment variable with the collector bearer token.
pub const API_KEY_ENV: &str = "TIMEGRAIN_API_KEY";

/// Run identifier used when the environment does not provide one.
pub const DEFAULT_RUN_ID: &str = "local_run";

/// Where reports go and how they are tagged.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// Directory the JSON and HTML report files are written into
    pub work_dir: PathBuf,
    /// Collector endpoint; upload is skipped when unset
    pub collector_url: Option<String>,
    /// Bearer token for the collector
    pub api_key: Option<String>,
    /// Run identifier tagging the uploaded report
    pub run_id: String,
}

impl ReportConfig {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            collector_url: None,
            api_key: None,
            run_id: DEFAULT_RUN_ID.to_string(),
        }
    }

    /// Read collector settings from the process environment.
    pub fn from_env(work_dir: impl Into<PathBuf>) -> Self {
        Self::from_lookup(work_dir, |key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injected lookup, so
    /// tests stay independent of process-global state.
    pub fn from_lookup(
        work_dir: impl Into<PathBuf>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        Self {
            work_dir: work_dir.into(),
            collector_url: lookup(COLLECTOR_URL_ENV),
            api_key: lookup(API_KEY_ENV),
            run_id: lookup(RUN_ID_ENV).unwrap_or_else(|| DEFAULT_RUN_ID.to_string()),
        }
    }

    pub fn with_collector(mut self, url: impl Into<String>, api_key: impl Into<String>) -> Self {
        self.collector_url = Some(url.into());
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }
}
