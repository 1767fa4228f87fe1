//! Merging per-batch outcomes into per-phase results.

use std::collections::HashMap;

use sblar_model::{Counts, Finding, ValidationResults};

use crate::options::WarningPolicy;
use crate::runner::BatchOutcome;
use crate::schema::PhaseSchema;

/// Accumulates batch outcomes for one phase and produces the final,
/// deterministically ordered results.
pub struct PhaseAggregator {
    phase: sblar_model::ValidationPhase,
    /// Rule id to registration ordinal, for the final sort.
    order: HashMap<String, usize>,
    findings: Vec<Finding>,
    error_counts: Counts,
    warning_counts: Counts,
    record_count: u64,
}

impl PhaseAggregator {
    pub fn new(schema: &PhaseSchema) -> Self {
        let order = schema
            .checks()
            .enumerate()
            .map(|(idx, check)| (check.meta.id.clone(), idx))
            .collect();
        Self {
            phase: schema.phase,
            order,
            findings: Vec::new(),
            error_counts: Counts::default(),
            warning_counts: Counts::default(),
            record_count: 0,
        }
    }

    pub fn absorb(&mut self, outcome: BatchOutcome) {
        self.findings.extend(outcome.findings);
        self.error_counts.merge(&outcome.error_counts);
        self.warning_counts.merge(&outcome.warning_counts);
        self.record_count += outcome.record_count;
    }

    pub fn error_total(&self) -> u64 {
        self.error_counts.total_count
    }

    /// Sort findings by rule registration order then record number, apply
    /// the finding budget, and compute the phase verdict. Counts are never
    /// reduced by truncation.
    pub fn finish(mut self, policy: WarningPolicy, budget: usize) -> ValidationResults {
        let order = &self.order;
        self.findings.sort_by_key(|finding| {
            (
                order.get(&finding.validation_id).copied().unwrap_or(usize::MAX),
                finding.record_no,
            )
        });
        if self.findings.len() > budget {
            tracing::warn!(
                phase = %self.phase,
                kept = budget,
                dropped = self.findings.len() - budget,
                "finding budget exhausted, detail truncated"
            );
            self.findings.truncate(budget);
        }

        let warnings_block = matches!(policy, WarningPolicy::WarningsFailValidation);
        let is_valid = self.error_counts.total_count == 0
            && (!warnings_block || self.warning_counts.total_count == 0);

        ValidationResults {
            phase: self.phase,
            error_counts: self.error_counts,
            warning_counts: self.warning_counts,
            is_valid,
            findings: self.findings,
            record_count: self.record_count,
        }
    }
}
