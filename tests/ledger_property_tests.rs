//! Property-based tests for the ledger/aggregator core
//!
//! The sum/count invariant and aggregation idempotence must hold for any
//! recorded sequence of samples, independent of insertion order.

use proptest::prelude::*;
use timegrain::aggregate::{aggregate, format_elapsed};
use timegrain::category::Category;
use timegrain::ledger::{Ledger, TestIdentity};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_sum_and_count_match_arithmetic(
        elapsed in prop::collection::vec(0.0f64..10_000.0, 1..50),
    ) {
        let mut ledger = Ledger::new();
        let test = TestIdentity::new("t");
        for value in &elapsed {
            ledger.record(&test, Category::SleepTime, "C.m.sleep", *value, None);
        }

        let report = aggregate(&ledger);
        let agg = &report.tests[&test].categories[&Category::SleepTime]["C.m.sleep"];

        let expected: f64 = elapsed.iter().sum();
        prop_assert!((agg.total_us - expected).abs() < 1e-6 * expected.max(1.0));
        prop_assert_eq!(agg.count, elapsed.len());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_insertion_order_is_irrelevant(
        elapsed in prop::collection::vec(0.0f64..1_000.0, 1..30),
    ) {
        let test = TestIdentity::new("t");

        let mut forward = Ledger::new();
        for value in &elapsed {
            forward.record(&test, Category::SetCommand, "R.set_x", *value, None);
        }

        let mut reversed = Ledger::new();
        for value in elapsed.iter().rev() {
            reversed.record(&test, Category::SetCommand, "R.set_x", *value, None);
        }

        let a = &aggregate(&forward).tests[&test].categories[&Category::SetCommand]["R.set_x"];
        let b = &aggregate(&reversed).tests[&test].categories[&Category::SetCommand]["R.set_x"];
        prop_assert!((a.total_us - b.total_us).abs() < 1e-6);
        prop_assert_eq!(a.count, b.count);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_aggregate_is_pure(
        entries in prop::collection::vec(
            ("[a-c]", 0.0f64..1_000.0),
            0..40,
        ),
    ) {
        let mut ledger = Ledger::new();
        for (test_name, value) in &entries {
            ledger.record(
                &TestIdentity::new(test_name.clone()),
                Category::GetCommand,
                "R.get_x",
                *value,
                None,
            );
        }

        // Aggregating twice without touching the ledger yields identical
        // reports.
        prop_assert_eq!(aggregate(&ledger), aggregate(&ledger));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_formatting_always_two_decimals(value in 0.0f64..1e9) {
        let text = format_elapsed(value);
        let (_, decimals) = text.split_once('.').expect("decimal point present");
        prop_assert_eq!(decimals.len(), 2);
    }
}
