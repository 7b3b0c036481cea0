//! Timing samples and their source classification

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Path fragments that mark an instrumented call as product logic rather
/// than test infrastructure.
const NON_INFRA_MARKERS: &[&str] = &["lib/feature_lib", "lib/hw"];

/// Origin classification of an instrumented call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    /// Test-infrastructure code
    #[serde(rename = "infra")]
    Infra,
    /// Feature/hardware library code (product logic)
    #[serde(rename = "non-infra")]
    NonInfra,
}

impl SourceKind {
    /// Classify by the source file path of the call's origin.
    ///
    /// Paths under a known feature/hardware library tree are `NonInfra`;
    /// everything else is `Infra`.
    pub fn from_path(path: impl AsRef<Path>) -> SourceKind {
        let path = path.as_ref().to_string_lossy();
        if NON_INFRA_MARKERS.iter().any(|m| path.contains(m)) {
            SourceKind::NonInfra
        } else {
            SourceKind::Infra
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Infra => "infra",
            SourceKind::NonInfra => "non-infra",
        }
    }
}

/// A single timing measurement, immutable once recorded.
///
/// The elapsed unit is microseconds for every category so cross-category
/// totals stay coherent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Elapsed wall-clock time in microseconds
    pub elapsed_us: f64,
    /// Source classification of the instrumented call's origin
    pub tag: Option<SourceKind>,
}

impl Sample {
    pub fn new(elapsed_us: f64, tag: Option<SourceKind>) -> Self {
        Self { elapsed_us, tag }
    }
}
