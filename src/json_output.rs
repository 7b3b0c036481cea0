//! JSON report file for granular time accounting
//!
//! Serializes the aggregated report into the collector's
//! `{categories, totals}` shape. The wire field `occurence` keeps its
//! historical spelling; consumers already depend on it.

use crate::aggregate::TimeReport;
use crate::sample::SourceKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Default report file name, written into the work directory.
pub const REPORT_FILE_NAME: &str = "granular_time_report.json";

/// One aggregated operation within a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    /// Operation key, e.g. `Router.set_mtu`
    pub source: String,
    /// Summed elapsed microseconds, two-decimal precision
    pub total_time: f64,
    /// Number of invocations
    #[serde(rename = "occurence")]
    pub occurrence: f64,
    /// Source classification of the operation
    #[serde(rename = "type")]
    pub kind: Option<SourceKind>,
}

/// Per-test section of the report file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestSection {
    pub categories: BTreeMap<String, Vec<ReportEntry>>,
    pub totals: BTreeMap<String, f64>,
}

/// Root structure of the report file: test identity to section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JsonReport {
    pub tests: BTreeMap<String, TestSection>,
}

/// Round to the report's two-decimal precision.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl JsonReport {
    /// Build the serializable form from an aggregated report.
    pub fn from_report(report: &TimeReport) -> Self {
        let mut tests = BTreeMap::new();
        for (identity, entry) in &report.tests {
            let mut section = TestSection::default();

            for (category, folded) in &entry.categories {
                let entries: Vec<ReportEntry> = folded
                    .iter()
                    .map(|(key, agg)| ReportEntry {
                        source: key.clone(),
                        total_time: round2(agg.total_us),
                        occurrence: agg.count as f64,
                        kind: agg.tag,
                    })
                    .collect();
                section
                    .categories
                    .insert(category.as_str().to_string(), entries);
            }

            let totals = &entry.totals;
            section
                .totals
                .insert("total_sleep_time".into(), round2(totals.sleep_time_us));
            section.totals.insert(
                "total_set_command_time".into(),
                round2(totals.set_command_us),
            );
            section.totals.insert(
                "total_get_command_time".into(),
                round2(totals.get_command_us),
            );
            section
                .totals
                .insert("total_bash_time".into(), round2(totals.bash_time_us));
            section
                .totals
                .insert("total_time".into(), round2(totals.total_time_us));

            tests.insert(identity.as_str().to_string(), section);
        }
        Self { tests }
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report file. Failures surface to the caller: a missing
    /// work directory must fail the summary step.
    pub fn write_to(&self, path: &Path) -> anyhow::Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;
    use crate::ledger::{Ledger, TestIdentity};

    fn sample_report() -> TimeReport {
        let mut ledger = Ledger::new();
        let t = TestIdentity::new("Suite.test_a");
        ledger.record(
            &t,
            Category::SleepTime,
            "C.m.sleep",
            1.234,
            Some(SourceKind::NonInfra),
        );
        ledger.record(
            &t,
            Category::SleepTime,
            "C.m.sleep",
            2.339,
            Some(SourceKind::NonInfra),
        );
        crate::aggregate::aggregate(&ledger)
    }

    #[test]
    fn test_transformed_shape() {
        let json_report = JsonReport::from_report(&sample_report());
        let section = &json_report.tests["Suite.test_a"];

        let sleeps = &section.categories["sleep_time"];
        assert_eq!(sleeps.len(), 1);
        assert_eq!(sleeps[0].source, "C.m.sleep");
        assert_eq!(sleeps[0].total_time, 3.57);
        assert_eq!(sleeps[0].occurrence, 2.0);
        assert_eq!(sleeps[0].kind, Some(SourceKind::NonInfra));

        // Missing categories serialize as empty arrays, not errors.
        assert!(section.categories["bash_time"].is_empty());
        assert_eq!(section.totals["total_bash_time"], 0.0);
        assert_eq!(section.totals["total_sleep_time"], 3.57);
        assert_eq!(section.totals["total_time"], 3.57);
    }

    #[test]
    fn test_wire_spelling_and_nesting() {
        let json = JsonReport::from_report(&sample_report()).to_json().unwrap();
        assert!(json.contains("\"occurence\""));
        assert!(json.contains("\"type\": \"non-infra\""));
        assert!(json.contains("\"categories\""));
        assert!(json.contains("\"totals\""));

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(parsed["Suite.test_a"]["categories"]["sleep_time"].is_array());
        assert!(parsed["Suite.test_a"]["totals"]["total_time"].is_f64());
    }

    #[test]
    fn test_write_to_work_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(REPORT_FILE_NAME);

        JsonReport::from_report(&sample_report())
            .write_to(&path)
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: JsonReport = serde_json::from_str(&content).unwrap();
        assert!(parsed.tests.contains_key("Suite.test_a"));
    }

    #[test]
    fn test_write_to_missing_dir_is_error() {
        let report = JsonReport::from_report(&sample_report());
        let result = report.write_to(Path::new("/nonexistent-dir-9a1b/report.json"));
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_report_serializes_to_empty_object() {
        let json = JsonReport::default().to_json().unwrap();
        assert_eq!(json.trim(), "{}");
    }
}
