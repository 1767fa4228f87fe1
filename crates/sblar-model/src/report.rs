//! Findings, counts, and per-phase validation results.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity of a validation rule.
///
/// Errors are submission-blocking; warnings are advisory but still make a
/// submission "not clean" under the default policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// Ordered validation stage. Later phases assume earlier phases passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationPhase {
    Syntactical,
    Logical,
    Register,
}

impl fmt::Display for ValidationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntactical => write!(f, "Syntactical"),
            Self::Logical => write!(f, "Logical"),
            Self::Register => write!(f, "Register"),
        }
    }
}

/// Evaluation scope of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleScope {
    SingleField,
    MultiField,
    Register,
}

impl fmt::Display for RuleScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SingleField => write!(f, "single-field"),
            Self::MultiField => write!(f, "multi-field"),
            Self::Register => write!(f, "register"),
        }
    }
}

/// Immutable descriptive metadata of a rule.
///
/// A rule missing its identifier or name is a configuration error, not a
/// data finding; the registry rejects such definitions at build time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleMeta {
    /// Unique identifier, e.g. `E3000`.
    pub id: String,
    /// Dotted human name, e.g. `uid.duplicates_in_dataset`.
    pub name: String,
    /// Long-form description from the filing instructions guide.
    pub description: String,
    pub severity: Severity,
    pub scope: RuleScope,
    /// Anchor into the filing instructions guide.
    pub fig_link: String,
}

/// One implicated field and the raw value read from the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingField {
    pub name: String,
    pub value: String,
}

/// A structured record of one rule failing for one row.
///
/// Implicated fields are the rule's primary field plus any grouping or
/// companion fields, deduplicated with the primary field first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub validation_id: String,
    pub validation_name: String,
    pub description: String,
    pub severity: Severity,
    pub scope: RuleScope,
    pub fig_link: String,
    pub phase: ValidationPhase,
    /// 1-based row number in the submission, stable across batch sizes.
    /// 0 marks a register-wide finding that implicates the submission as a
    /// whole rather than any single row (record-count mismatch).
    pub record_no: u64,
    /// Unique identifier of the implicated record.
    pub uid: String,
    pub fields: Vec<FindingField>,
    /// Additional row numbers implicated by the same finding. Used by
    /// register rules where a single finding spans several records (every
    /// row sharing a duplicated uid, for example).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_records: Vec<u64>,
}

impl Finding {
    pub fn new(
        meta: &RuleMeta,
        phase: ValidationPhase,
        record_no: u64,
        uid: impl Into<String>,
        fields: Vec<FindingField>,
    ) -> Self {
        Self {
            validation_id: meta.id.clone(),
            validation_name: meta.name.clone(),
            description: meta.description.clone(),
            severity: meta.severity,
            scope: meta.scope,
            fig_link: meta.fig_link.clone(),
            phase,
            record_no,
            uid: uid.into(),
            fields,
            related_records: Vec::new(),
        }
    }
}

/// Finding counts for one severity, split by rule scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    pub single_field_count: u64,
    pub multi_field_count: u64,
    pub register_count: u64,
    pub total_count: u64,
}

impl Counts {
    /// Record one finding of the given scope.
    pub fn record(&mut self, scope: RuleScope) {
        match scope {
            RuleScope::SingleField => self.single_field_count += 1,
            RuleScope::MultiField => self.multi_field_count += 1,
            RuleScope::Register => self.register_count += 1,
        }
        self.total_count += 1;
    }

    pub fn merge(&mut self, other: &Counts) {
        self.single_field_count += other.single_field_count;
        self.multi_field_count += other.multi_field_count;
        self.register_count += other.register_count;
        self.total_count += other.total_count;
    }

    /// Invariant: the scope counts always sum to the total.
    pub fn is_consistent(&self) -> bool {
        self.single_field_count + self.multi_field_count + self.register_count == self.total_count
    }
}

/// One phase's (or phase-per-batch's) findings and rollup counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResults {
    pub phase: ValidationPhase,
    pub error_counts: Counts,
    pub warning_counts: Counts,
    /// True iff the phase produced no blocking findings under the active
    /// warning policy.
    pub is_valid: bool,
    pub findings: Vec<Finding>,
    /// Number of records processed by this phase.
    pub record_count: u64,
}

impl ValidationResults {
    pub fn empty(phase: ValidationPhase) -> Self {
        Self {
            phase,
            error_counts: Counts::default(),
            warning_counts: Counts::default(),
            is_valid: true,
            findings: Vec::new(),
            record_count: 0,
        }
    }

    pub fn finding_count(&self) -> usize {
        self.findings.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_rollup_matches_total() {
        let mut counts = Counts::default();
        counts.record(RuleScope::SingleField);
        counts.record(RuleScope::SingleField);
        counts.record(RuleScope::MultiField);
        counts.record(RuleScope::Register);
        assert_eq!(counts.total_count, 4);
        assert!(counts.is_consistent());

        let mut merged = Counts::default();
        merged.merge(&counts);
        merged.merge(&counts);
        assert_eq!(merged.total_count, 8);
        assert!(merged.is_consistent());
    }

    #[test]
    fn scope_serializes_kebab_case() {
        let json = serde_json::to_string(&RuleScope::SingleField).unwrap();
        assert_eq!(json, "\"single-field\"");
        let json = serde_json::to_string(&Severity::Warning).unwrap();
        assert_eq!(json, "\"warning\"");
    }
}
