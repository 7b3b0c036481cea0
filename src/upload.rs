//! Collector upload with bounded retry
//!
//! Posts the serialized report to a remote collection endpoint with a
//! bearer-token header. The retrying call is modeled as a typed Result
//! instead of catch-and-log: the caller decides that a down collector
//! never fails a local run.

use crate::json_output::JsonReport;
use std::time::Duration;
use thiserror::Error;

/// Errors from the retrying upload call.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("retries exhausted after {attempts} attempts to {url} (last status {last_status})")]
    RetryExhausted {
        attempts: u32,
        url: String,
        last_status: u16,
    },

    #[error("connection to {url} failed: {source}")]
    ConnectionFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("upload failed: {0}")]
    Other(String),
}

/// Bounded retry with exponential backoff.
///
/// Mirrors the collector client contract: 5 attempts, backoff factor of
/// one second, and a fixed small set of retryable statuses.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_base: Duration,
}

/// HTTP statuses worth retrying; everything else fails immediately.
pub const RETRYABLE_STATUSES: [u16; 4] = [502, 503, 504, 404];

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_base: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn is_retryable(&self, status: u16) -> bool {
        RETRYABLE_STATUSES.contains(&status)
    }

    /// Backoff before the given retry; doubles per attempt.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_base * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Blocking collector client.
pub struct Uploader {
    client: reqwest::blocking::Client,
    policy: RetryPolicy,
}

/// Upload payload: run identifier plus the transformed report.
pub fn payload(run_id: &str, report: &JsonReport) -> serde_json::Value {
    serde_json::json!({
        "run_id": run_id,
        "gta": report,
    })
}

impl Uploader {
    pub fn new(policy: RetryPolicy) -> Result<Self, UploadError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| UploadError::Other(e.to_string()))?;
        Ok(Self { client, policy })
    }

    /// POST the report, retrying on connection failures and retryable
    /// statuses with exponential backoff.
    pub fn post_report(
        &self,
        url: &str,
        api_key: &str,
        run_id: &str,
        report: &JsonReport,
    ) -> Result<(), UploadError> {
        let body = payload(run_id, report);
        let mut last_status = 0u16;

        for attempt in 1..=self.policy.max_attempts {
            let result = self
                .client
                .post(url)
                .bearer_auth(api_key)
                .json(&body)
                .send();

            match result {
                Ok(response) if response.status().is_success() => {
                    tracing::debug!(url, run_id, "report uploaded to collector");
                    return Ok(());
                }
                Ok(response) => {
                    last_status = response.status().as_u16();
                    if !self.policy.is_retryable(last_status) {
                        return Err(UploadError::Other(format!(
                            "collector at {url} returned status {last_status}"
                        )));
                    }
                    tracing::warn!(
                        url,
                        method = "POST",
                        status = last_status,
                        attempt,
                        "retryable collector status"
                    );
                }
                Err(source) => {
                    tracing::warn!(
                        url,
                        method = "POST",
                        attempt,
                        error = %source,
                        "collector request failed"
                    );
                    if attempt == self.policy.max_attempts {
                        return Err(UploadError::ConnectionFailed {
                            url: url.to_string(),
                            source,
                        });
                    }
                }
            }

            if attempt < self.policy.max_attempts {
                std::thread::sleep(self.policy.backoff_for(attempt));
            }
        }

        Err(UploadError::RetryExhausted {
            attempts: self.policy.max_attempts,
            url: url.to_string(),
            last_status,
        })
    }
}
