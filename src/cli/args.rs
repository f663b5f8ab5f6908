use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Process equipment-rental operation scripts
#[derive(Parser, Debug)]
#[command(name = "rental-engine")]
#[command(about = "Process equipment rental bookings and payments", long_about = None)]
pub struct CliArgs {
    /// Equipment catalog CSV file
    #[arg(
        long = "catalog",
        value_name = "CATALOG",
        help = "Path to the equipment catalog CSV file"
    )]
    pub catalog: PathBuf,

    /// Input CSV file path containing the operation script
    #[arg(value_name = "INPUT", help = "Path to the operations CSV file")]
    pub input_file: PathBuf,

    /// Processing strategy
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "sync",
        help = "Processing strategy: 'sync' for synchronous or 'async' for asynchronous"
    )]
    pub strategy: StrategyType,

    /// Which report to write to stdout
    #[arg(
        long = "report",
        value_name = "REPORT",
        default_value = "bookings",
        help = "Report to emit: 'bookings' or 'payments'"
    )]
    pub report: ReportKind,

    /// Pin the engine clock to a fixed day for reproducible runs
    #[arg(
        long = "today",
        value_name = "DATE",
        help = "Treat this date (YYYY-MM-DD) as today instead of the system clock"
    )]
    pub today: Option<NaiveDate>,
}

/// Available processing strategies
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

/// Reports the pipeline can emit
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ReportKind {
    Bookings,
    Payments,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::default_strategy(
        &["program", "--catalog", "catalog.csv", "ops.csv"],
        StrategyType::Sync
    )]
    #[case::explicit_sync(
        &["program", "--catalog", "catalog.csv", "--strategy", "sync", "ops.csv"],
        StrategyType::Sync
    )]
    #[case::explicit_async(
        &["program", "--catalog", "catalog.csv", "--strategy", "async", "ops.csv"],
        StrategyType::Async
    )]
    fn test_strategy_parsing(#[case] args: &[&str], #[case] expected: StrategyType) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert!(matches!(
            (parsed.strategy, expected),
            (StrategyType::Sync, StrategyType::Sync) | (StrategyType::Async, StrategyType::Async)
        ));
    }

    #[rstest]
    #[case::default_report(
        &["program", "--catalog", "catalog.csv", "ops.csv"],
        ReportKind::Bookings
    )]
    #[case::payments_report(
        &["program", "--catalog", "catalog.csv", "--report", "payments", "ops.csv"],
        ReportKind::Payments
    )]
    fn test_report_parsing(#[case] args: &[&str], #[case] expected: ReportKind) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert!(matches!(
            (parsed.report, expected),
            (ReportKind::Bookings, ReportKind::Bookings)
                | (ReportKind::Payments, ReportKind::Payments)
        ));
    }

    #[test]
    fn test_today_parsing() {
        let parsed = CliArgs::try_parse_from([
            "program",
            "--catalog",
            "catalog.csv",
            "--today",
            "2026-06-01",
            "ops.csv",
        ])
        .unwrap();
        assert_eq!(parsed.today, NaiveDate::from_ymd_opt(2026, 6, 1));
    }

    #[rstest]
    #[case::missing_input(&["program", "--catalog", "catalog.csv"])]
    #[case::missing_catalog(&["program", "ops.csv"])]
    #[case::invalid_strategy(
        &["program", "--catalog", "catalog.csv", "--strategy", "parallel", "ops.csv"]
    )]
    #[case::invalid_date(
        &["program", "--catalog", "catalog.csv", "--today", "June 1st", "ops.csv"]
    )]
    fn test_parsing_errors(#[case] args: &[&str]) {
        assert!(CliArgs::try_parse_from(args).is_err());
    }
}
