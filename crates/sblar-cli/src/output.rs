//! Report rendering: summary table, findings table, CSV, and JSON.

use std::io::Write;

use comfy_table::{Cell, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};

use sblar_engine::{GateDecision, RunReport};
use sblar_model::Finding;

/// Render the run report in the requested format.
pub fn render_report<W: Write>(
    report: &RunReport,
    format: ReportFormat,
    writer: &mut W,
) -> anyhow::Result<()> {
    match format {
        ReportFormat::Table => render_tables(report, writer),
        ReportFormat::Csv => render_csv(report, writer),
        ReportFormat::Json => {
            serde_json::to_writer_pretty(&mut *writer, report)?;
            writeln!(writer)?;
            Ok(())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Table,
    Csv,
    Json,
}

fn render_tables<W: Write>(report: &RunReport, writer: &mut W) -> anyhow::Result<()> {
    let mut summary = Table::new();
    summary
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Phase", "Records", "Errors", "Warnings", "Valid"]);
    for results in &report.results {
        summary.add_row(vec![
            Cell::new(results.phase),
            Cell::new(results.record_count),
            Cell::new(results.error_counts.total_count),
            Cell::new(results.warning_counts.total_count),
            Cell::new(if results.is_valid { "yes" } else { "no" }),
        ]);
    }
    writeln!(writer, "{summary}")?;

    if let GateDecision::SkippedOnSyntaxErrors { error_total } = report.gate {
        writeln!(
            writer,
            "register and logical phases skipped: {error_total} syntactical error(s)"
        )?;
    }

    let findings: Vec<&Finding> = report.findings().collect();
    if !findings.is_empty() {
        let mut detail = Table::new();
        detail
            .load_preset(UTF8_FULL_CONDENSED)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                "Record", "Rule", "Severity", "Name", "Fields",
            ]);
        for finding in findings {
            let fields = finding
                .fields
                .iter()
                .map(|f| format!("{}={}", f.name, f.value))
                .collect::<Vec<_>>()
                .join(", ");
            detail.add_row(vec![
                Cell::new(finding.record_no),
                Cell::new(&finding.validation_id),
                Cell::new(finding.severity),
                Cell::new(&finding.validation_name),
                Cell::new(fields),
            ]);
        }
        writeln!(writer, "{detail}")?;
    }

    writeln!(
        writer,
        "{} record(s), {} error(s), {} warning(s): {}",
        report.record_count,
        report.error_total(),
        report.warning_total(),
        if report.is_valid { "valid" } else { "not valid" }
    )?;
    Ok(())
}

fn render_csv<W: Write>(report: &RunReport, writer: &mut W) -> anyhow::Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record([
        "phase",
        "record_no",
        "validation_id",
        "validation_name",
        "severity",
        "scope",
        "uid",
        "fields",
        "related_records",
        "fig_link",
    ])?;
    for finding in report.findings() {
        let fields = finding
            .fields
            .iter()
            .map(|f| format!("{}={}", f.name, f.value))
            .collect::<Vec<_>>()
            .join(";");
        let related = finding
            .related_records
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(";");
        csv.write_record([
            finding.phase.to_string(),
            finding.record_no.to_string(),
            finding.validation_id.clone(),
            finding.validation_name.clone(),
            finding.severity.to_string(),
            finding.scope.to_string(),
            finding.uid.clone(),
            fields,
            related,
            finding.fig_link.clone(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sblar_model::{
        Counts, FindingField, RuleMeta, RuleScope, Severity, ValidationPhase, ValidationResults,
    };

    fn report_with_one_finding() -> RunReport {
        let meta = RuleMeta {
            id: "E0040".to_string(),
            name: "app_method.invalid_enum_value".to_string(),
            description: String::new(),
            severity: Severity::Error,
            scope: RuleScope::SingleField,
            fig_link: "https://example.test/#4.1.4".to_string(),
        };
        let finding = Finding::new(
            &meta,
            ValidationPhase::Syntactical,
            7,
            "UID",
            vec![FindingField {
                name: "app_method".to_string(),
                value: "9".to_string(),
            }],
        );
        let mut error_counts = Counts::default();
        error_counts.record(RuleScope::SingleField);
        RunReport {
            results: vec![ValidationResults {
                phase: ValidationPhase::Syntactical,
                error_counts,
                warning_counts: Counts::default(),
                is_valid: false,
                findings: vec![finding],
                record_count: 10,
            }],
            gate: GateDecision::SkippedOnSyntaxErrors { error_total: 1 },
            record_count: 10,
            is_valid: false,
        }
    }

    #[test]
    fn csv_report_lists_each_finding() {
        let mut out = Vec::new();
        render_csv(&report_with_one_finding(), &mut out).expect("render");
        let text = String::from_utf8(out).expect("utf8");
        let mut lines = text.lines();
        assert!(lines.next().expect("header").starts_with("phase,record_no"));
        let row = lines.next().expect("row");
        assert!(row.contains("E0040"));
        assert!(row.contains("app_method=9"));
    }

    #[test]
    fn table_report_mentions_the_gate() {
        let mut out = Vec::new();
        render_tables(&report_with_one_finding(), &mut out).expect("render");
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("skipped"));
        assert!(text.contains("not valid"));
    }

    #[test]
    fn json_report_round_trips() {
        let mut out = Vec::new();
        render_report(&report_with_one_finding(), ReportFormat::Json, &mut out).expect("render");
        let parsed: RunReport = serde_json::from_slice(&out).expect("parse");
        assert_eq!(parsed.record_count, 10);
        assert!(!parsed.is_valid);
    }
}
