//! Running a phase schema over one batch.

use sblar_ingest::Batch;
use sblar_model::{Counts, Finding, FindingField, Result, Severity};
use sblar_rules::UID_FIELD;

use crate::evaluator::BatchEvaluator;
use crate::schema::PhaseSchema;

/// Findings and counts produced by one batch of one phase.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub findings: Vec<Finding>,
    pub error_counts: Counts,
    pub warning_counts: Counts,
    pub record_count: u64,
}

/// Evaluate every check of the schema against one batch.
///
/// Findings come out in registration order, then record order; one finding
/// per (rule, failing record). Counts always reflect every failure, even
/// when the caller later truncates the finding detail.
pub fn run_phase_batch(schema: &PhaseSchema, batch: &Batch) -> Result<BatchOutcome> {
    let mut eval = BatchEvaluator::new(batch);
    let mut outcome = BatchOutcome {
        record_count: batch.height() as u64,
        ..BatchOutcome::default()
    };

    for column in &schema.columns {
        for check in &column.checks {
            let failing = eval.failing_rows(check)?;
            if failing.is_empty() {
                continue;
            }
            tracing::debug!(
                rule = %check.meta.id,
                batch = batch.index,
                failures = failing.len(),
                "check failed"
            );
            let implicated = check.implicated_fields();
            for row in failing {
                let counts = match check.meta.severity {
                    Severity::Error => &mut outcome.error_counts,
                    Severity::Warning => &mut outcome.warning_counts,
                };
                counts.record(check.meta.scope);

                let mut fields = Vec::with_capacity(implicated.len());
                for name in &implicated {
                    fields.push(FindingField {
                        name: name.clone(),
                        value: eval.value(name, row)?,
                    });
                }
                let uid = eval.value(UID_FIELD, row).unwrap_or_default();
                outcome.findings.push(Finding::new(
                    &check.meta,
                    schema.phase,
                    batch.record_no(row),
                    uid,
                    fields,
                ));
            }
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;
    use sblar_model::{RuleScope, ValidationPhase};
    use sblar_rules::{FieldValidations, phase_validations};
    use sblar_model::RunContext;
    use std::collections::HashSet;
    use std::sync::Arc;

    use crate::schema::render_schema;

    fn catalogue() -> Vec<FieldValidations> {
        let empty: Arc<dyn sblar_model::CodeLookup> = Arc::new(HashSet::<String>::new());
        phase_validations(&RunContext::new(), empty.clone(), empty).expect("render")
    }

    fn batch_from(columns: Vec<(&str, Vec<&str>)>) -> Batch {
        let series: Vec<Column> = columns
            .into_iter()
            .map(|(name, values)| {
                let owned: Vec<String> = values.into_iter().map(str::to_string).collect();
                Series::new(name.into(), owned).into()
            })
            .collect();
        Batch {
            index: 0,
            row_start: 100,
            df: DataFrame::new(series).expect("frame"),
        }
    }

    /// One record per column of the full catalogue, all values valid.
    fn clean_columns() -> Vec<(&'static str, Vec<&'static str>)> {
        vec![
            ("uid", vec!["000TESTFIUIDDONOTUSEXGXVID11XTC1"]),
            ("app_date", vec!["20241201"]),
            ("app_method", vec!["1"]),
            ("app_recipient", vec!["1"]),
            ("ct_credit_product", vec!["1"]),
            ("ct_credit_product_ff", vec![""]),
            ("ct_guarantee", vec!["1"]),
            ("amount_applied_for_flag", vec!["900"]),
            ("amount_applied_for", vec!["5000"]),
            ("action_taken", vec!["1"]),
            ("action_taken_date", vec!["20241215"]),
            ("denial_reasons", vec!["999"]),
            ("denial_reasons_ff", vec![""]),
            ("census_tract_number", vec![""]),
            ("naics_code", vec![""]),
        ]
    }

    #[test]
    fn clean_record_produces_no_syntactical_findings() {
        let schema = render_schema(&catalogue(), ValidationPhase::Syntactical).expect("schema");
        let batch = batch_from(clean_columns());
        let outcome = run_phase_batch(&schema, &batch).expect("run");
        assert!(outcome.findings.is_empty(), "{:?}", outcome.findings);
        assert_eq!(outcome.error_counts.total_count, 0);
        assert_eq!(outcome.record_count, 1);
    }

    #[test]
    fn findings_carry_batch_offset_record_numbers_and_uid() {
        let mut columns = clean_columns();
        for (name, values) in &mut columns {
            if *name == "app_method" {
                *values = vec!["9"];
            }
        }
        let schema = render_schema(&catalogue(), ValidationPhase::Syntactical).expect("schema");
        let batch = batch_from(columns);
        let outcome = run_phase_batch(&schema, &batch).expect("run");
        assert_eq!(outcome.findings.len(), 1);
        let finding = &outcome.findings[0];
        assert_eq!(finding.validation_id, "E0040");
        assert_eq!(finding.record_no, 101);
        assert_eq!(finding.uid, "000TESTFIUIDDONOTUSEXGXVID11XTC1");
        assert_eq!(finding.fields.len(), 1);
        assert_eq!(finding.fields[0].name, "app_method");
        assert_eq!(finding.fields[0].value, "9");
        assert_eq!(outcome.error_counts.single_field_count, 1);
    }

    #[test]
    fn group_conflict_implicates_both_fields() {
        let mut columns: Vec<(&str, Vec<&str>)> = clean_columns()
            .into_iter()
            .map(|(name, values)| (name, vec![values[0], values[0]]))
            .collect();
        for (name, values) in &mut columns {
            match *name {
                "uid" => {
                    *values = vec![
                        "000TESTFIUIDDONOTUSEXGXVID11XTC1",
                        "000TESTFIUIDDONOTUSEXGXVID11XTC2",
                    ]
                }
                "ct_credit_product" => *values = vec!["977", "1"],
                "ct_credit_product_ff" => *values = vec!["", "stray text"],
                _ => {}
            }
        }
        let schema = render_schema(&catalogue(), ValidationPhase::Logical).expect("schema");
        let batch = batch_from(columns);
        let outcome = run_phase_batch(&schema, &batch).expect("run");

        let conflicts: Vec<&Finding> = outcome
            .findings
            .iter()
            .filter(|f| f.validation_id == "E2000")
            .collect();
        assert_eq!(conflicts.len(), 2);
        assert_eq!(conflicts[0].record_no, 101);
        assert_eq!(conflicts[1].record_no, 102);
        let names: Vec<&str> = conflicts[0].fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["ct_credit_product_ff", "ct_credit_product"]);
        assert_eq!(conflicts[0].scope, RuleScope::MultiField);
        assert_eq!(outcome.error_counts.multi_field_count, 2);
    }
}
