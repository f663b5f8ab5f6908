//! End-to-end integration tests
//!
//! These tests validate the complete pipeline using predefined CSV test
//! fixtures. Each test:
//! 1. Reads catalog.csv and input.csv from a fixture directory
//! 2. Applies all operations through the engine with the clock pinned to
//!    2026-06-01
//! 3. Compares the booking report with expected_bookings.csv, and the
//!    payment report with expected_payments.csv when the fixture has one
//!
//! Each fixture is run twice: once with the synchronous strategy and once
//! with the asynchronous one; both must produce identical reports.

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rental_engine::cli::{ReportKind, StrategyType};
    use rental_engine::strategy::create_strategy;
    use rstest::rstest;
    use std::fs;
    use std::path::Path;

    fn fixture_today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
    }

    /// Run one report for a fixture and compare it with the expected file
    fn run_report(
        fixture_dir: &str,
        strategy_type: StrategyType,
        report: ReportKind,
        expected_file: &str,
    ) {
        let catalog_path = format!("{}/catalog.csv", fixture_dir);
        let input_path = format!("{}/input.csv", fixture_dir);
        let expected_path = format!("{}/{}", fixture_dir, expected_file);

        let strategy = create_strategy(strategy_type, Some(fixture_today()));
        let mut output = Vec::new();
        strategy
            .process(
                Path::new(&catalog_path),
                Path::new(&input_path),
                report,
                &mut output,
            )
            .unwrap_or_else(|e| panic!("Failed to process {}: {}", fixture_dir, e));

        let actual = String::from_utf8(output).expect("Report is not UTF-8");
        let expected = fs::read_to_string(&expected_path)
            .unwrap_or_else(|e| panic!("Failed to read {}: {}", expected_path, e));

        assert_eq!(
            actual, expected,
            "\n\nReport mismatch for fixture {} (strategy {:?}, report {:?})\n\nActual:\n{}\n\nExpected:\n{}\n",
            fixture_dir, strategy_type, report, actual, expected
        );
    }

    fn run_test_fixture(fixture_name: &str, strategy_type: StrategyType) {
        let fixture_dir = format!("tests/fixtures/{}", fixture_name);
        assert!(
            Path::new(&fixture_dir).exists(),
            "Fixture not found: {}",
            fixture_dir
        );

        run_report(
            &fixture_dir,
            strategy_type,
            ReportKind::Bookings,
            "expected_bookings.csv",
        );

        if Path::new(&format!("{}/expected_payments.csv", fixture_dir)).exists() {
            run_report(
                &fixture_dir,
                strategy_type,
                ReportKind::Payments,
                "expected_payments.csv",
            );
        }
    }

    /// End-to-end test for all fixtures with both processing strategies
    #[rstest]
    #[case("happy_path")]
    #[case("availability_conflict")]
    #[case("offline_approval")]
    #[case("offline_payment")]
    #[case("refund_cancellation")]
    #[case("duplicate_notifications")]
    #[case("superseded_attempt")]
    #[case("malformed_data")]
    fn test_fixtures(
        #[case] fixture: &str,
        #[values(StrategyType::Sync, StrategyType::Async)] strategy: StrategyType,
    ) {
        run_test_fixture(fixture, strategy);
    }
}
