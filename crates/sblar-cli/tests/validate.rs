use std::io::Write;

use sblar_cli::cli::{ReportFormatArg, ValidateArgs};
use sblar_cli::commands::run_validate;
use sblar_engine::RunReport;

const HEADER: &str = "uid,app_date,app_method,app_recipient,ct_credit_product,\
ct_credit_product_ff,ct_guarantee,amount_applied_for_flag,amount_applied_for,\
action_taken,action_taken_date,denial_reasons,denial_reasons_ff,\
census_tract_number,naics_code";

fn write_register(rows: &[&str]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "{HEADER}").expect("header");
    for row in rows {
        writeln!(file, "{row}").expect("row");
    }
    file
}

fn args(register: &tempfile::NamedTempFile, output: &std::path::Path) -> ValidateArgs {
    ValidateArgs {
        register: register.path().to_path_buf(),
        lei: Some("000TESTFIUIDDONOTUSE".to_string()),
        expected_record_count: None,
        context: Vec::new(),
        naics_file: None,
        geoids_file: None,
        batch_size: 50_000,
        allow_missing_columns: false,
        run_all_phases: false,
        warnings_advisory: false,
        max_findings: sblar_engine::DEFAULT_MAX_FINDINGS,
        format: ReportFormatArg::Json,
        output: Some(output.to_path_buf()),
    }
}

#[test]
fn validate_writes_a_json_report_and_returns_the_verdict() {
    let register = write_register(&[
        "000TESTFIUIDDONOTUSEXGXVID11XTC1,20241201,1,1,1,,1,900,5000,1,20241215,999,,,",
    ]);
    let dir = tempfile::tempdir().expect("tempdir");
    let report_path = dir.path().join("report.json");

    let report = run_validate(&args(&register, &report_path)).expect("run");
    assert!(report.is_valid);
    assert_eq!(report.record_count, 1);

    let written: RunReport =
        serde_json::from_slice(&std::fs::read(&report_path).expect("read report"))
            .expect("parse report");
    assert!(written.is_valid);
    assert_eq!(written.results.len(), 3);
}

#[test]
fn validate_reports_findings_for_a_bad_record() {
    let register = write_register(&[
        "000TESTFIUIDDONOTUSEXGXVID11XTC1,20241301,9,1,1,,1,900,5000,1,20241215,999,,,",
    ]);
    let dir = tempfile::tempdir().expect("tempdir");
    let report_path = dir.path().join("report.json");

    let report = run_validate(&args(&register, &report_path)).expect("run");
    assert!(!report.is_valid);
    // Bad date and bad application method, with later phases gated off.
    assert_eq!(report.error_total(), 2);
    assert_eq!(report.results.len(), 1);
}

#[test]
fn missing_register_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let register_path = dir.path().join("missing.csv");
    let mut args = args(&write_register(&[]), &dir.path().join("report.json"));
    args.register = register_path;
    assert!(run_validate(&args).is_err());
}
