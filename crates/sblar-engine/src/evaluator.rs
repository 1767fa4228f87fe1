//! Check evaluation over one batch.
//!
//! The evaluator caches extracted columns and group partitions for the
//! lifetime of a batch, so several checks keyed on the same column share
//! one pass over the data.

use std::collections::HashMap;

use sblar_ingest::Batch;
use sblar_model::{Result, ValidationError};
use sblar_rules::{CheckShape, SblarCheck};

/// Row indices of one group partition, paired with the shared key value.
type Partitions = Vec<(String, Vec<usize>)>;

/// Per-batch evaluation state.
pub struct BatchEvaluator<'a> {
    batch: &'a Batch,
    columns: HashMap<String, Vec<String>>,
    partitions: HashMap<String, Partitions>,
}

impl<'a> BatchEvaluator<'a> {
    pub fn new(batch: &'a Batch) -> Self {
        Self {
            batch,
            columns: HashMap::new(),
            partitions: HashMap::new(),
        }
    }

    pub fn batch(&self) -> &Batch {
        self.batch
    }

    /// The extracted values of one column, extracted at most once per batch.
    pub fn column(&mut self, field: &str) -> Result<&[String]> {
        if !self.columns.contains_key(field) {
            let values = self.batch.values(field)?;
            self.columns.insert(field.to_string(), values);
        }
        Ok(self.columns[field].as_slice())
    }

    /// Row value of one column.
    pub fn value(&mut self, field: &str, row: usize) -> Result<String> {
        Ok(self.column(field)?.get(row).cloned().unwrap_or_default())
    }

    /// Partitions of the batch by the given key column, first-seen order,
    /// row order preserved within each partition.
    fn partition(&mut self, key: &str) -> Result<&Partitions> {
        if !self.partitions.contains_key(key) {
            let values = self.column(key)?.to_vec();
            let mut order: Vec<String> = Vec::new();
            let mut members: HashMap<String, Vec<usize>> = HashMap::new();
            for (row, value) in values.into_iter().enumerate() {
                members
                    .entry(value.clone())
                    .or_insert_with(|| {
                        order.push(value);
                        Vec::new()
                    })
                    .push(row);
            }
            let partitions = order
                .into_iter()
                .map(|value| {
                    let rows = members.remove(&value).unwrap_or_default();
                    (value, rows)
                })
                .collect();
            self.partitions.insert(key.to_string(), partitions);
        }
        Ok(&self.partitions[key])
    }

    /// Evaluate one check over the batch, returning the failing row
    /// indices in ascending order.
    pub fn failing_rows(&mut self, check: &SblarCheck) -> Result<Vec<usize>> {
        match &check.shape {
            CheckShape::ElementWise(f) => {
                let values = self.column(&check.field)?;
                Ok(values
                    .iter()
                    .enumerate()
                    .filter(|(_, v)| !f(v, &check.params))
                    .map(|(row, _)| row)
                    .collect())
            }
            CheckShape::MultiField {
                related_fields,
                check: f,
            } => {
                let height = self.batch.height();
                let mut related: Vec<Vec<String>> = Vec::with_capacity(related_fields.len());
                for field in related_fields {
                    related.push(self.column(field)?.to_vec());
                }
                let primary = self.column(&check.field)?;
                let mut failing = Vec::new();
                let mut row_related = vec![String::new(); related.len()];
                for row in 0..height {
                    for (slot, column) in related.iter().enumerate() {
                        row_related[slot].clone_from(&column[row]);
                    }
                    if !f(&primary[row], &row_related, &check.params) {
                        failing.push(row);
                    }
                }
                Ok(failing)
            }
            CheckShape::GroupBy { key, check: f } => {
                let primary = self.column(&check.field)?.to_vec();
                let key_name = key.clone();
                let partitions = self.partition(&key_name)?;
                let mut failing = Vec::new();
                for (key_value, rows) in partitions {
                    let members: Vec<String> =
                        rows.iter().map(|&row| primary[row].clone()).collect();
                    let verdicts = f(key_value, &members, &check.params);
                    if verdicts.len() != rows.len() {
                        return Err(ValidationError::configuration(format!(
                            "rule {} returned {} verdicts for a partition of {} rows",
                            check.meta.id,
                            verdicts.len(),
                            rows.len()
                        )));
                    }
                    for (&row, passed) in rows.iter().zip(verdicts) {
                        if !passed {
                            failing.push(row);
                        }
                    }
                }
                failing.sort_unstable();
                Ok(failing)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;
    use sblar_model::{RuleMeta, RuleScope, Severity};
    use sblar_rules::{CheckParams, functions};
    use std::collections::BTreeSet;

    fn batch(columns: &[(&str, &[&str])]) -> Batch {
        let series: Vec<Column> = columns
            .iter()
            .map(|(name, values)| {
                let owned: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                Series::new((*name).into(), owned).into()
            })
            .collect();
        Batch {
            index: 0,
            row_start: 0,
            df: DataFrame::new(series).expect("frame"),
        }
    }

    fn meta(id: &str, scope: RuleScope) -> RuleMeta {
        RuleMeta {
            id: id.to_string(),
            name: format!("test.{id}"),
            description: String::new(),
            severity: Severity::Error,
            scope,
            fig_link: String::new(),
        }
    }

    #[test]
    fn element_wise_reports_failing_rows_in_order() {
        let batch = batch(&[("app_method", &["1", "9", "2", "x"])]);
        let mut eval = BatchEvaluator::new(&batch);
        let check = SblarCheck::new(
            meta("E0040", RuleScope::SingleField),
            "app_method",
            CheckShape::ElementWise(functions::is_valid_enum),
            CheckParams {
                accepted_values: vec!["1".into(), "2".into(), "3".into(), "4".into()],
                ..CheckParams::default()
            },
        );
        assert_eq!(eval.failing_rows(&check).expect("eval"), vec![1, 3]);
    }

    #[test]
    fn group_by_aligns_verdicts_with_partition_rows() {
        // Rows 1 and 3 conflict: 977 with blank text, non-977 with text.
        let batch = batch(&[
            ("ct_credit_product_ff", &["other product", "", "", "stray"]),
            ("ct_credit_product", &["977", "977", "1", "1"]),
        ]);
        let mut eval = BatchEvaluator::new(&batch);
        let check = SblarCheck::new(
            meta("E2000", RuleScope::MultiField),
            "ct_credit_product_ff",
            CheckShape::GroupBy {
                key: "ct_credit_product".to_string(),
                check: functions::conditional_field_conflict_by_group,
            },
            CheckParams {
                condition_values: BTreeSet::from(["977".to_string()]),
                ..CheckParams::default()
            },
        );
        assert_eq!(eval.failing_rows(&check).expect("eval"), vec![1, 3]);
    }

    #[test]
    fn misaligned_group_verdicts_are_a_configuration_error() {
        fn short(_: &str, _: &[String], _: &CheckParams) -> Vec<bool> {
            vec![true]
        }
        let batch = batch(&[("a", &["1", "1"]), ("k", &["x", "x"])]);
        let mut eval = BatchEvaluator::new(&batch);
        let check = SblarCheck::new(
            meta("E9999", RuleScope::MultiField),
            "a",
            CheckShape::GroupBy {
                key: "k".to_string(),
                check: short,
            },
            CheckParams::default(),
        );
        let err = eval.failing_rows(&check).unwrap_err();
        assert!(matches!(err, ValidationError::Configuration(_)));
    }

    #[test]
    fn multi_field_passes_related_values_in_declaration_order() {
        let batch = batch(&[
            ("action_taken_date", &["20220110", "20220101"]),
            ("app_date", &["20220105", "20220105"]),
        ]);
        let mut eval = BatchEvaluator::new(&batch);
        let check = SblarCheck::new(
            meta("E2009", RuleScope::MultiField),
            "action_taken_date",
            CheckShape::MultiField {
                related_fields: vec!["app_date".to_string()],
                check: functions::is_date_after,
            },
            CheckParams::default(),
        );
        assert_eq!(eval.failing_rows(&check).expect("eval"), vec![1]);
    }
}
