//! Check definitions: evaluation shapes and parameters.
//!
//! A check is data, not behavior: a metadata block, a primary field, a
//! closed evaluation shape, and a parameter bag. The engine owns the
//! execution strategy per shape; the set of shapes is closed and known at
//! design time, so it is a tagged enum rather than a trait object.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use regex::Regex;

use sblar_model::{CodeLookup, RuleMeta};

/// Element-wise check: one field's raw value to pass/fail, applied
/// independently to every row.
pub type ElementFn = fn(&str, &CheckParams) -> bool;

/// Multi-field check: the row's primary value plus the values of the
/// declared companion fields, in declaration order.
pub type MultiFieldFn = fn(&str, &[String], &CheckParams) -> bool;

/// Group-by check: the partition's key value and the primary-field values
/// of every row in the partition, returning one boolean per row in the
/// partition, in row order.
pub type GroupFn = fn(&str, &[String], &CheckParams) -> Vec<bool>;

/// The three evaluation shapes a batch-level rule can take.
#[derive(Clone)]
pub enum CheckShape {
    ElementWise(ElementFn),
    MultiField {
        related_fields: Vec<String>,
        check: MultiFieldFn,
    },
    GroupBy {
        key: String,
        check: GroupFn,
    },
}

impl fmt::Debug for CheckShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ElementWise(_) => f.write_str("ElementWise"),
            Self::MultiField { related_fields, .. } => f
                .debug_struct("MultiField")
                .field("related_fields", related_fields)
                .finish_non_exhaustive(),
            Self::GroupBy { key, .. } => f
                .debug_struct("GroupBy")
                .field("key", key)
                .finish_non_exhaustive(),
        }
    }
}

/// Parameters accepted by the check functions.
///
/// Mirrors the keyword arguments of the rule catalogue: each function reads
/// only the fields it documents and ignores the rest.
#[derive(Clone, Default)]
pub struct CheckParams {
    /// Accepted values for enum checks.
    pub accepted_values: Vec<String>,
    /// Selector values that flip a conditional check's expectation.
    pub condition_values: BTreeSet<String>,
    /// Separator for delimited multi-value fields. Empty means the field
    /// is single-valued.
    pub separator: Option<String>,
    /// Blank values pass instead of failing.
    pub accept_blank: bool,
    /// Lower bound for numeric comparisons.
    pub min_value: Option<f64>,
    /// Upper bound for numeric comparisons.
    pub max_value: Option<f64>,
    /// Minimum text length in characters.
    pub min_length: Option<usize>,
    /// Maximum text length in characters.
    pub max_length: Option<usize>,
    /// Maximum number of entries in a delimited multi-value field.
    pub max_value_count: Option<usize>,
    /// Numeric values must be whole numbers.
    pub is_whole: bool,
    /// Compiled pattern for format checks.
    pub regex: Option<Regex>,
    /// Expected leading text for prefix checks (e.g. the LEI). `None`
    /// disables the check, matching an absent run context.
    pub containing_value: Option<String>,
    /// Number of leading characters compared by prefix checks.
    pub end_idx: Option<usize>,
    /// Reference code set for membership checks.
    pub codes: Option<Arc<dyn CodeLookup>>,
}

impl fmt::Debug for CheckParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckParams")
            .field("accepted_values", &self.accepted_values)
            .field("condition_values", &self.condition_values)
            .field("accept_blank", &self.accept_blank)
            .field("has_codes", &self.codes.is_some())
            .finish_non_exhaustive()
    }
}

/// Default separator for delimited multi-value fields.
pub const MULTI_VALUE_SEPARATOR: &str = ";";

impl CheckParams {
    pub fn separator(&self) -> &str {
        self.separator.as_deref().unwrap_or(MULTI_VALUE_SEPARATOR)
    }

    /// Split a delimited field into trimmed, non-empty entries.
    pub fn split_values<'a>(&self, value: &'a str) -> Vec<&'a str> {
        value
            .split(self.separator())
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .collect()
    }
}

/// One registered validation: metadata, the field it applies to, its
/// evaluation shape, and its parameters. Immutable once registered.
#[derive(Debug, Clone)]
pub struct SblarCheck {
    pub meta: RuleMeta,
    /// Primary field the check is registered on.
    pub field: String,
    pub shape: CheckShape,
    pub params: CheckParams,
}

impl SblarCheck {
    pub fn new(
        meta: RuleMeta,
        field: impl Into<String>,
        shape: CheckShape,
        params: CheckParams,
    ) -> Self {
        Self {
            meta,
            field: field.into(),
            shape,
            params,
        }
    }

    /// The primary field plus any grouping/companion fields, deduplicated
    /// with declaration order kept.
    pub fn implicated_fields(&self) -> Vec<String> {
        let mut fields = vec![self.field.clone()];
        match &self.shape {
            CheckShape::ElementWise(_) => {}
            CheckShape::MultiField { related_fields, .. } => {
                fields.extend(related_fields.iter().cloned());
            }
            CheckShape::GroupBy { key, .. } => fields.push(key.clone()),
        }
        let mut seen = BTreeSet::new();
        fields.retain(|f| seen.insert(f.clone()));
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sblar_model::{RuleScope, Severity};

    fn meta(scope: RuleScope) -> RuleMeta {
        RuleMeta {
            id: "E0000".to_string(),
            name: "test.check".to_string(),
            description: String::new(),
            severity: Severity::Error,
            scope,
            fig_link: String::new(),
        }
    }

    #[test]
    fn implicated_fields_deduplicate_and_keep_order() {
        fn passthrough(_: &str, _: &[String], _: &CheckParams) -> bool {
            true
        }
        let check = SblarCheck::new(
            meta(RuleScope::MultiField),
            "amount_applied_for",
            CheckShape::MultiField {
                related_fields: vec![
                    "amount_applied_for_flag".to_string(),
                    "amount_applied_for".to_string(),
                ],
                check: passthrough,
            },
            CheckParams::default(),
        );
        assert_eq!(
            check.implicated_fields(),
            vec!["amount_applied_for", "amount_applied_for_flag"]
        );
    }

    #[test]
    fn split_values_trims_and_drops_blanks() {
        let params = CheckParams::default();
        assert_eq!(params.split_values("1; 2 ;;3"), vec!["1", "2", "3"]);
        assert!(params.split_values("  ").is_empty());
    }
}
