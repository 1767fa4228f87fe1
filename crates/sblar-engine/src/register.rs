//! Whole-register rule evaluation.
//!
//! The accumulator observes every batch of the single streaming pass and
//! keeps only the evidence register rules need: identifier occurrences by
//! value, occurrences by LEI prefix, and the running record total.
//! Finalizing consumes the evidence and emits register findings.

use std::collections::BTreeMap;

use sblar_ingest::Batch;
use sblar_model::{
    Counts, Finding, FindingField, Result, RunContext, ValidationPhase, ValidationResults,
};
use sblar_rules::{RegisterRule, UID_FIELD, UID_LEI_PREFIX_LEN};

/// Evidence gathered across every batch for the register phase.
#[derive(Debug, Default)]
pub struct RegisterAccumulator {
    /// Record numbers per identifier value, insertion-ordered within each
    /// entry.
    occurrences: BTreeMap<String, Vec<u64>>,
    /// Record numbers per identifier prefix.
    prefixes: BTreeMap<String, Vec<u64>>,
    total: u64,
}

impl RegisterAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn observe(&mut self, batch: &Batch) -> Result<()> {
        let uids = batch.values(UID_FIELD)?;
        for (row, uid) in uids.into_iter().enumerate() {
            let record_no = batch.record_no(row);
            self.total += 1;
            let prefix: String = uid.chars().take(UID_LEI_PREFIX_LEN).collect();
            self.prefixes.entry(prefix).or_default().push(record_no);
            self.occurrences.entry(uid).or_default().push(record_no);
        }
        Ok(())
    }

    /// Evaluate every register rule over the accumulated evidence.
    pub fn finalize(self, ctx: &RunContext) -> Result<ValidationResults> {
        let mut findings = Vec::new();
        let mut error_counts = Counts::default();
        let warning_counts = Counts::default();

        for rule in RegisterRule::all() {
            match rule {
                RegisterRule::UniqueUid => {
                    for (uid, records) in &self.occurrences {
                        if records.len() < 2 {
                            continue;
                        }
                        let meta = rule.meta();
                        error_counts.record(meta.scope);
                        let mut finding = Finding::new(
                            &meta,
                            ValidationPhase::Register,
                            records[0],
                            uid.clone(),
                            vec![FindingField {
                                name: UID_FIELD.to_string(),
                                value: uid.clone(),
                            }],
                        );
                        finding.related_records = records.clone();
                        findings.push(finding);
                    }
                }
                RegisterRule::SingleLeiPrefix => {
                    if self.prefixes.len() < 2 {
                        continue;
                    }
                    // The register's prefix is the one carried by its first
                    // record; every other prefix group is flagged once.
                    let expected = self
                        .prefixes
                        .iter()
                        .min_by_key(|(_, records)| records[0])
                        .map(|(prefix, _)| prefix.clone())
                        .unwrap_or_default();
                    for (prefix, records) in &self.prefixes {
                        if *prefix == expected {
                            continue;
                        }
                        let meta = rule.meta();
                        error_counts.record(meta.scope);
                        let mut finding = Finding::new(
                            &meta,
                            ValidationPhase::Register,
                            records[0],
                            String::new(),
                            vec![FindingField {
                                name: UID_FIELD.to_string(),
                                value: prefix.clone(),
                            }],
                        );
                        finding.related_records = records.clone();
                        findings.push(finding);
                    }
                }
                RegisterRule::ExpectedRecordCount => {
                    let Some(declared) = ctx.expected_record_count()? else {
                        continue;
                    };
                    if declared == self.total {
                        continue;
                    }
                    let meta = rule.meta();
                    error_counts.record(meta.scope);
                    // record_no 0: the mismatch implicates the whole
                    // register, not any single row.
                    findings.push(Finding::new(
                        &meta,
                        ValidationPhase::Register,
                        0,
                        String::new(),
                        vec![
                            FindingField {
                                name: "declared_record_count".to_string(),
                                value: declared.to_string(),
                            },
                            FindingField {
                                name: "observed_record_count".to_string(),
                                value: self.total.to_string(),
                            },
                        ],
                    ));
                }
            }
        }

        let is_valid = error_counts.total_count == 0;
        Ok(ValidationResults {
            phase: ValidationPhase::Register,
            error_counts,
            warning_counts,
            is_valid,
            findings,
            record_count: self.total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;
    use sblar_model::RECORD_COUNT_PARAM;

    fn batch(index: usize, row_start: u64, uids: &[&str]) -> Batch {
        let owned: Vec<String> = uids.iter().map(|v| v.to_string()).collect();
        Batch {
            index,
            row_start,
            df: DataFrame::new(vec![Series::new("uid".into(), owned).into()]).expect("frame"),
        }
    }

    const UID_A: &str = "000TESTFIUIDDONOTUSEXGXVID11XTC1";
    const UID_B: &str = "000TESTFIUIDDONOTUSEXGXVID11XTC2";

    #[test]
    fn duplicate_across_batches_yields_one_finding_with_all_records() {
        let mut acc = RegisterAccumulator::new();
        acc.observe(&batch(0, 0, &[UID_A, UID_B])).expect("observe");
        acc.observe(&batch(1, 2, &[UID_A])).expect("observe");

        let results = acc.finalize(&RunContext::new()).expect("finalize");
        assert_eq!(results.findings.len(), 1);
        let finding = &results.findings[0];
        assert_eq!(finding.validation_id, "E3000");
        assert_eq!(finding.record_no, 1);
        assert_eq!(finding.related_records, vec![1, 3]);
        assert_eq!(results.error_counts.register_count, 1);
        assert!(!results.is_valid);
        assert_eq!(results.record_count, 3);
    }

    #[test]
    fn unique_register_is_valid() {
        let mut acc = RegisterAccumulator::new();
        acc.observe(&batch(0, 0, &[UID_A, UID_B])).expect("observe");
        let results = acc.finalize(&RunContext::new()).expect("finalize");
        assert!(results.findings.is_empty());
        assert!(results.is_valid);
    }

    #[test]
    fn mixed_lei_prefixes_flag_the_minority_group() {
        let stranger = "ZZZOTHERFIRMLEIXXXXXGXVID11XTC9";
        let mut acc = RegisterAccumulator::new();
        acc.observe(&batch(0, 0, &[UID_A, stranger, UID_B]))
            .expect("observe");

        let results = acc.finalize(&RunContext::new()).expect("finalize");
        assert_eq!(results.findings.len(), 1);
        let finding = &results.findings[0];
        assert_eq!(finding.validation_id, "E3001");
        assert_eq!(finding.record_no, 2);
        assert_eq!(finding.related_records, vec![2]);
    }

    #[test]
    fn record_count_mismatch_reports_declared_and_observed() {
        let mut acc = RegisterAccumulator::new();
        acc.observe(&batch(0, 0, &[UID_A, UID_B])).expect("observe");

        let ctx = RunContext::new().with_param(RECORD_COUNT_PARAM, "3");
        let results = acc.finalize(&ctx).expect("finalize");
        assert_eq!(results.findings.len(), 1);
        let finding = &results.findings[0];
        assert_eq!(finding.validation_id, "E3002");
        // Register-wide finding: record_no 0 means no single row is implicated.
        assert_eq!(finding.record_no, 0);
        assert_eq!(finding.fields[0].value, "3");
        assert_eq!(finding.fields[1].value, "2");
    }

    #[test]
    fn matching_record_count_is_silent() {
        let mut acc = RegisterAccumulator::new();
        acc.observe(&batch(0, 0, &[UID_A, UID_B])).expect("observe");
        let ctx = RunContext::new().with_param(RECORD_COUNT_PARAM, "2");
        let results = acc.finalize(&ctx).expect("finalize");
        assert!(results.findings.is_empty());
        assert!(results.is_valid);
    }
}
