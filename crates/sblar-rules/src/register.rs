//! Register-scope rules.
//!
//! These rules see the whole submission rather than one batch. The engine
//! accumulates the evidence they need (identifier occurrences, record
//! totals) while streaming batches and finalizes them once the stream is
//! exhausted, so a register rule never requires the full register in
//! memory.

use sblar_model::{RuleMeta, RuleScope, Severity};

use crate::catalogue::FIG_BASE_URL;

/// Number of leading identifier characters that must carry the LEI.
pub const UID_LEI_PREFIX_LEN: usize = 20;

/// Whole-register rules, evaluated after every batch has been observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterRule {
    /// Every record's unique identifier must occur exactly once.
    UniqueUid,
    /// All identifiers must share a single LEI prefix.
    SingleLeiPrefix,
    /// The register must contain the declared number of records, when a
    /// count was declared for the run.
    ExpectedRecordCount,
}

impl RegisterRule {
    /// All register rules, in evaluation order.
    pub fn all() -> [RegisterRule; 3] {
        [
            RegisterRule::UniqueUid,
            RegisterRule::SingleLeiPrefix,
            RegisterRule::ExpectedRecordCount,
        ]
    }

    pub fn meta(self) -> RuleMeta {
        match self {
            RegisterRule::UniqueUid => RuleMeta {
                id: "E3000".to_string(),
                name: "uid.duplicates_in_dataset".to_string(),
                description:
                    "Any 'unique identifier' may not be used in more than one record within a register."
                        .to_string(),
                severity: Severity::Error,
                scope: RuleScope::Register,
                fig_link: format!("{FIG_BASE_URL}#4.3.1"),
            },
            RegisterRule::SingleLeiPrefix => RuleMeta {
                id: "E3001".to_string(),
                name: "uid.multiple_lei_in_register".to_string(),
                description:
                    "The first 20 characters of every 'unique identifier' in a register must match; a register covers a single financial institution."
                        .to_string(),
                severity: Severity::Error,
                scope: RuleScope::Register,
                fig_link: format!("{FIG_BASE_URL}#4.3.2"),
            },
            RegisterRule::ExpectedRecordCount => RuleMeta {
                id: "E3002".to_string(),
                name: "register.record_count_mismatch".to_string(),
                description:
                    "The number of records in the register must equal the record count declared for the submission."
                        .to_string(),
                severity: Severity::Error,
                scope: RuleScope::Register,
                fig_link: format!("{FIG_BASE_URL}#4.3.3"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_rules_are_register_scoped_errors() {
        for rule in RegisterRule::all() {
            let meta = rule.meta();
            assert_eq!(meta.scope, RuleScope::Register);
            assert_eq!(meta.severity, Severity::Error);
            assert!(meta.id.starts_with("E3"));
            assert!(meta.fig_link.starts_with(FIG_BASE_URL));
        }
    }
}
