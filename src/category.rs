//! Timing categories for instrumented operations
//!
//! Every recorded sample belongs to exactly one category. The category
//! decides which interceptor produced the sample and how the aggregator
//! folds it into the report totals.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a timed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Time spent inside the sleep primitive
    SleepTime,
    /// Device "set" command execution
    SetCommand,
    /// Device "get" command execution
    GetCommand,
    /// Subprocess execution time
    BashTime,
    /// Whole-test wall clock, measured by the lifecycle driver
    TotalTime,
}

impl Category {
    /// Wire name used in the serialized report.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::SleepTime => "sleep_time",
            Category::SetCommand => "set_command",
            Category::GetCommand => "get_command",
            Category::BashTime => "bash_time",
            Category::TotalTime => "total_time",
        }
    }

    /// Categories whose samples may arrive through the external
    /// per-command channel and must be merged at test teardown.
    pub fn external_channel_categories() -> [Category; 3] {
        [
            Category::SetCommand,
            Category::GetCommand,
            Category::SleepTime,
        ]
    }

    /// All categories that carry raw samples in the ledger.
    pub fn sample_categories() -> [Category; 4] {
        [
            Category::SleepTime,
            Category::SetCommand,
            Category::GetCommand,
            Category::BashTime,
        ]
    }

    /// Classify a member name by its instrumentation prefix.
    ///
    /// Returns `None` for names that do not qualify for interception.
    pub fn from_method_prefix(name: &str) -> Option<Category> {
        if name.starts_with("set") {
            Some(Category::SetCommand)
        } else if name.starts_with("get") {
            Some(Category::GetCommand)
        } else {
            None
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
