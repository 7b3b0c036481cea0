//! Aggregator: folds raw ledger samples into the report structure
//!
//! Pure function of ledger state: aggregating the same unmodified ledger
//! twice yields identical reports. Internal accumulation is full f64;
//! two-decimal formatting happens only at the serialization boundary.

use crate::category::Category;
use crate::ledger::{CategorySamples, Ledger, OperationKey, TestIdentity};
use crate::sample::SourceKind;
use std::collections::BTreeMap;

/// Aggregate of all samples for one operation key.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryAggregate {
    /// Sum of elapsed values in microseconds
    pub total_us: f64,
    /// Number of samples
    pub count: usize,
    /// Source classification carried from the first sample; tags within
    /// one operation key are homogeneous
    pub tag: Option<SourceKind>,
}

/// Per-key aggregates within one category.
pub type CategoryReport = BTreeMap<OperationKey, CategoryAggregate>;

/// Cross-category totals for one test.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestTotals {
    pub sleep_time_us: f64,
    pub set_command_us: f64,
    pub get_command_us: f64,
    pub bash_time_us: f64,
    /// Measured wall clock when the driver recorded one, otherwise the sum
    /// of sleep + set + get
    pub total_time_us: f64,
}

/// Aggregated view of one test case.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestTimeReport {
    pub categories: BTreeMap<Category, CategoryReport>,
    pub totals: TestTotals,
}

/// Aggregated, serializable summary of the whole suite run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeReport {
    pub tests: BTreeMap<TestIdentity, TestTimeReport>,
}

/// Running per-category accumulator used while folding one test.
///
/// Reset after each test's figures are finalized so totals never bleed
/// into the next test's row. The reset is correctness-critical, not an
/// optimization.
#[derive(Debug, Default)]
struct TotalsAccumulator {
    sleep_us: f64,
    set_us: f64,
    get_us: f64,
    bash_us: f64,
}

impl TotalsAccumulator {
    fn add(&mut self, category: Category, sum_us: f64) {
        match category {
            Category::SleepTime => self.sleep_us += sum_us,
            Category::SetCommand => self.set_us += sum_us,
            Category::GetCommand => self.get_us += sum_us,
            Category::BashTime => self.bash_us += sum_us,
            Category::TotalTime => {}
        }
    }

    fn finalize(&self, measured_total_us: Option<f64>) -> TestTotals {
        TestTotals {
            sleep_time_us: self.sleep_us,
            set_command_us: self.set_us,
            get_command_us: self.get_us,
            bash_time_us: self.bash_us,
            total_time_us: measured_total_us
                .unwrap_or(self.sleep_us + self.set_us + self.get_us),
        }
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Fold one category's samples into per-key sum/count aggregates.
fn fold_category(samples: &CategorySamples) -> CategoryReport {
    samples
        .iter()
        .map(|(key, list)| {
            let total_us = list.iter().map(|s| s.elapsed_us).sum();
            let tag = list.first().and_then(|s| s.tag);
            (
                key.clone(),
                CategoryAggregate {
                    total_us,
                    count: list.len(),
                    tag,
                },
            )
        })
        .collect()
}

/// Two-decimal rendering of an elapsed value, applied only at the
/// serialization boundary.
pub fn format_elapsed(elapsed_us: f64) -> String {
    format!("{:.2}", elapsed_us)
}

/// Formatted `{key: (sum, count, tag)}` view of one category, matching the
/// serialized report's precision.
pub fn time_data(report: &CategoryReport) -> BTreeMap<String, (String, usize, Option<SourceKind>)> {
    report
        .iter()
        .map(|(key, agg)| {
            (
                key.clone(),
                (format_elapsed(agg.total_us), agg.count, agg.tag),
            )
        })
        .collect()
}

/// Fold the whole ledger into a report.
///
/// A test entry missing a category aggregates to an empty mapping and a
/// zero total, never an error.
pub fn aggregate(ledger: &Ledger) -> TimeReport {
    let mut report = TimeReport::default();
    let mut accumulator = TotalsAccumulator::default();

    for (test, by_category) in ledger.tests() {
        let mut entry = TestTimeReport::default();

        for category in Category::sample_categories() {
            let folded = by_category
                .get(&category)
                .map(fold_category)
                .unwrap_or_default();
            let sum: f64 = folded.values().map(|a| a.total_us).sum();
            accumulator.add(category, sum);
            entry.categories.insert(category, folded);
        }

        let measured_total = by_category.get(&Category::TotalTime).map(|samples| {
            samples
                .values()
                .flat_map(|list| list.iter().map(|s| s.elapsed_us))
                .sum::<f64>()
        });

        entry.totals = accumulator.finalize(measured_total);
        accumulator.reset();
        report.tests.insert(test.clone(), entry);
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger_with(entries: &[(&str, Category, &str, f64)]) -> Ledger {
        let mut ledger = Ledger::new();
        for (test, category, key, elapsed) in entries {
            ledger.record(&TestIdentity::new(*test), *category, *key, *elapsed, None);
        }
        ledger
    }

    #[test]
    fn test_sum_and_count_invariant() {
        let ledger = ledger_with(&[
            ("t", Category::SleepTime, "method1", 1.23),
            ("t", Category::SleepTime, "method1", 2.34),
        ]);

        let report = aggregate(&ledger);
        let agg = &report.tests[&TestIdentity::new("t")].categories[&Category::SleepTime]["method1"];
        assert!((agg.total_us - 3.57).abs() < 1e-9);
        assert_eq!(agg.count, 2);
    }

    #[test]
    fn test_time_data_formatted_view() {
        let ledger = ledger_with(&[
            ("test_case_1", Category::SleepTime, "method1", 1.23),
            ("test_case_1", Category::SleepTime, "method1", 2.34),
        ]);

        let report = aggregate(&ledger);
        let view = time_data(
            &report.tests[&TestIdentity::new("test_case_1")].categories[&Category::SleepTime],
        );
        assert_eq!(view["method1"].0, "3.57");
        assert_eq!(view["method1"].1, 2);
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let ledger = ledger_with(&[
            ("a", Category::SetCommand, "R.set_x", 5.0),
            ("a", Category::GetCommand, "R.get_x", 7.0),
            ("b", Category::SleepTime, "C.m.sleep", 11.0),
        ]);

        assert_eq!(aggregate(&ledger), aggregate(&ledger));
    }

    #[test]
    fn test_accumulator_reset_prevents_cross_test_bleed() {
        let ledger = ledger_with(&[
            ("a", Category::SleepTime, "x", 100.0),
            ("a", Category::SetCommand, "y", 40.0),
            ("b", Category::SleepTime, "x", 7.0),
        ]);

        let report = aggregate(&ledger);
        let a = &report.tests[&TestIdentity::new("a")].totals;
        let b = &report.tests[&TestIdentity::new("b")].totals;

        assert_eq!(a.sleep_time_us, 100.0);
        assert_eq!(a.total_time_us, 140.0);
        // Test b must not include any of a's values.
        assert_eq!(b.sleep_time_us, 7.0);
        assert_eq!(b.set_command_us, 0.0);
        assert_eq!(b.total_time_us, 7.0);
    }

    #[test]
    fn test_missing_category_is_empty_and_zero() {
        let ledger = ledger_with(&[("t", Category::SleepTime, "x", 1.0)]);

        let report = aggregate(&ledger);
        let entry = &report.tests[&TestIdentity::new("t")];
        assert!(entry.categories[&Category::BashTime].is_empty());
        assert_eq!(format_elapsed(entry.totals.bash_time_us), "0.00");
    }

    #[test]
    fn test_tag_carried_from_first_sample() {
        let mut ledger = Ledger::new();
        let t = TestIdentity::new("t");
        ledger.record(
            &t,
            Category::SleepTime,
            "C.m.sleep",
            1.0,
            Some(SourceKind::NonInfra),
        );
        ledger.record(
            &t,
            Category::SleepTime,
            "C.m.sleep",
            2.0,
            Some(SourceKind::NonInfra),
        );

        let report = aggregate(&ledger);
        let agg = &report.tests[&t].categories[&Category::SleepTime]["C.m.sleep"];
        assert_eq!(agg.tag, Some(SourceKind::NonInfra));
    }

    #[test]
    fn test_grand_total_falls_back_to_category_sum() {
        let ledger = ledger_with(&[
            ("t", Category::SleepTime, "a", 10.0),
            ("t", Category::SetCommand, "b", 20.0),
            ("t", Category::GetCommand, "c", 30.0),
            // bash_time is excluded from the fallback formula
            ("t", Category::BashTime, "d", 99.0),
        ]);

        let report = aggregate(&ledger);
        assert_eq!(report.tests[&TestIdentity::new("t")].totals.total_time_us, 60.0);
    }

    #[test]
    fn test_measured_wall_clock_overrides_fallback() {
        let ledger = ledger_with(&[
            ("t", Category::SleepTime, "a", 10.0),
            ("t", Category::TotalTime, "wall_clock", 500.0),
        ]);

        let report = aggregate(&ledger);
        assert_eq!(
            report.tests[&TestIdentity::new("t")].totals.total_time_us,
            500.0
        );
    }

    #[test]
    fn test_empty_ledger_empty_report() {
        let report = aggregate(&Ledger::new());
        assert!(report.tests.is_empty());
    }
}
