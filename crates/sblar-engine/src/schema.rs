//! Phase schemas rendered from the rule catalogue.
//!
//! A schema is the per-phase execution plan: every catalogue field with the
//! checks that run against it in that phase, in registration order.
//! Rendering validates the wiring once so the evaluator can assume it.

use std::collections::BTreeSet;

use sblar_model::{Result, ValidationError, ValidationPhase};
use sblar_rules::{FieldValidations, SblarCheck};

/// Checks registered against one column for one phase.
#[derive(Debug, Clone)]
pub struct ColumnChecks {
    pub field: String,
    pub checks: Vec<SblarCheck>,
}

/// All checks of one batch-level phase, in catalogue order.
#[derive(Debug, Clone)]
pub struct PhaseSchema {
    pub phase: ValidationPhase,
    pub columns: Vec<ColumnChecks>,
}

impl PhaseSchema {
    pub fn check_count(&self) -> usize {
        self.columns.iter().map(|c| c.checks.len()).sum()
    }

    /// Checks in registration order (catalogue field order, then
    /// declaration order within a field).
    pub fn checks(&self) -> impl Iterator<Item = &SblarCheck> {
        self.columns.iter().flat_map(|c| c.checks.iter())
    }
}

/// Render the execution plan for a batch-level phase.
///
/// Fails with a configuration error when a check references a field the
/// catalogue does not carry, when a check is registered under the wrong
/// field, or when rule identifiers collide.
pub fn render_schema(
    catalogue: &[FieldValidations],
    phase: ValidationPhase,
) -> Result<PhaseSchema> {
    if matches!(phase, ValidationPhase::Register) {
        return Err(ValidationError::configuration(
            "register rules are not rendered from the field catalogue",
        ));
    }

    let known: BTreeSet<&str> = catalogue.iter().map(|fv| fv.field.as_str()).collect();
    let mut seen_ids = BTreeSet::new();

    let mut columns = Vec::with_capacity(catalogue.len());
    for fv in catalogue {
        let checks = match phase {
            ValidationPhase::Syntactical => &fv.phase1,
            _ => &fv.phase2,
        };

        for check in checks {
            if check.meta.id.trim().is_empty() || check.meta.name.trim().is_empty() {
                return Err(ValidationError::configuration(format!(
                    "rule on field {} is missing an identifier or name",
                    fv.field
                )));
            }
            if check.field != fv.field {
                return Err(ValidationError::configuration(format!(
                    "rule {} is registered under {} but targets {}",
                    check.meta.id, fv.field, check.field
                )));
            }
            if !seen_ids.insert(check.meta.id.clone()) {
                return Err(ValidationError::configuration(format!(
                    "duplicate rule identifier {}",
                    check.meta.id
                )));
            }
            for field in check.implicated_fields() {
                if !known.contains(field.as_str()) {
                    return Err(ValidationError::configuration(format!(
                        "rule {} references unknown field {field}",
                        check.meta.id
                    )));
                }
            }
        }

        columns.push(ColumnChecks {
            field: fv.field.clone(),
            checks: checks.clone(),
        });
    }

    Ok(PhaseSchema { phase, columns })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sblar_rules::{CheckParams, CheckShape, functions};
    use sblar_model::{RuleMeta, RuleScope, Severity};

    fn meta(id: &str) -> RuleMeta {
        RuleMeta {
            id: id.to_string(),
            name: format!("test.{id}"),
            description: String::new(),
            severity: Severity::Error,
            scope: RuleScope::SingleField,
            fig_link: String::new(),
        }
    }

    fn field(name: &str, phase1: Vec<SblarCheck>) -> FieldValidations {
        FieldValidations {
            field: name.to_string(),
            phase1,
            phase2: Vec::new(),
        }
    }

    #[test]
    fn renders_phase_one_in_catalogue_order() {
        let catalogue = vec![
            field(
                "uid",
                vec![SblarCheck::new(
                    meta("E0001"),
                    "uid",
                    CheckShape::ElementWise(functions::is_valid_enum),
                    CheckParams::default(),
                )],
            ),
            field("app_date", Vec::new()),
        ];
        let schema = render_schema(&catalogue, ValidationPhase::Syntactical).expect("render");
        assert_eq!(schema.columns.len(), 2);
        assert_eq!(schema.check_count(), 1);
        assert_eq!(schema.columns[0].field, "uid");
    }

    #[test]
    fn unknown_referenced_field_is_a_configuration_error() {
        let catalogue = vec![field(
            "uid",
            vec![SblarCheck::new(
                meta("E0001"),
                "uid",
                CheckShape::GroupBy {
                    key: "nonexistent".to_string(),
                    check: functions::conditional_field_conflict_by_group,
                },
                CheckParams::default(),
            )],
        )];
        let err = render_schema(&catalogue, ValidationPhase::Syntactical).unwrap_err();
        assert!(matches!(err, ValidationError::Configuration(_)));
    }

    #[test]
    fn duplicate_rule_id_is_a_configuration_error() {
        let check = SblarCheck::new(
            meta("E0001"),
            "uid",
            CheckShape::ElementWise(functions::is_valid_enum),
            CheckParams::default(),
        );
        let catalogue = vec![field("uid", vec![check.clone(), check])];
        let err = render_schema(&catalogue, ValidationPhase::Syntactical).unwrap_err();
        assert!(matches!(err, ValidationError::Configuration(_)));
    }

    #[test]
    fn empty_rule_id_is_a_configuration_error() {
        let mut bad = meta("");
        bad.name = "test.nameless".to_string();
        let catalogue = vec![field(
            "uid",
            vec![SblarCheck::new(
                bad,
                "uid",
                CheckShape::ElementWise(functions::is_valid_enum),
                CheckParams::default(),
            )],
        )];
        let err = render_schema(&catalogue, ValidationPhase::Syntactical).unwrap_err();
        assert!(matches!(err, ValidationError::Configuration(_)));
    }

    #[test]
    fn register_phase_cannot_be_rendered() {
        // The rejection must not depend on the catalogue having fields.
        let err = render_schema(&[], ValidationPhase::Register).unwrap_err();
        assert!(matches!(err, ValidationError::Configuration(_)));

        let catalogue = vec![field("uid", Vec::new())];
        let err = render_schema(&catalogue, ValidationPhase::Register).unwrap_err();
        assert!(matches!(err, ValidationError::Configuration(_)));
    }
}
