//! The per-field rule catalogue.
//!
//! Checks are declared per field, split into the syntactical (phase 1) and
//! logical (phase 2) lists the engine renders into schemas. Rendering is
//! copy-on-render: every call builds fresh `SblarCheck` values parameterized
//! by the run context, so the shared definitions are never mutated.
//!
//! This carries a representative subset of the published field catalogue;
//! rule identifiers, names, and guide anchors follow the filing
//! instructions guide numbering.

use std::collections::BTreeSet;
use std::sync::Arc;

use regex::Regex;

use sblar_model::{CodeLookup, Result, RuleMeta, RuleScope, RunContext, Severity, ValidationError};

use crate::check::{CheckParams, CheckShape, SblarCheck};
use crate::functions;

/// Base URL of the filing instructions guide; rule anchors are appended.
pub const FIG_BASE_URL: &str = "https://www.consumerfinance.gov/data-research/small-business-lending/filing-instructions-guide/2024-guide/";

/// Name of the unique-identifier column every register must carry.
pub const UID_FIELD: &str = "uid";

/// Checks registered on one field, per phase, in declaration order.
#[derive(Debug, Clone)]
pub struct FieldValidations {
    pub field: String,
    pub phase1: Vec<SblarCheck>,
    pub phase2: Vec<SblarCheck>,
}

/// Ordered field names of the catalogue; the batch reader validates source
/// headers against this list.
pub fn catalogue_fields(catalogue: &[FieldValidations]) -> Vec<String> {
    catalogue.iter().map(|fv| fv.field.clone()).collect()
}

fn meta(
    id: &str,
    name: &str,
    description: &str,
    severity: Severity,
    scope: RuleScope,
    anchor: &str,
) -> RuleMeta {
    RuleMeta {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        severity,
        scope,
        fig_link: format!("{FIG_BASE_URL}{anchor}"),
    }
}

fn values(entries: &[&str]) -> Vec<String> {
    entries.iter().map(|v| (*v).to_string()).collect()
}

fn value_set(entries: &[&str]) -> BTreeSet<String> {
    entries.iter().map(|v| (*v).to_string()).collect()
}

fn pattern(raw: &str) -> Result<Regex> {
    Regex::new(raw)
        .map_err(|e| ValidationError::configuration(format!("invalid rule pattern {raw:?}: {e}")))
}

/// Render the full field catalogue for one run.
///
/// `ctx` supplies the expected LEI used by the identity-prefix rule;
/// `naics` and `geoids` are the reference lookup sets.
pub fn phase_validations(
    ctx: &RunContext,
    naics: Arc<dyn CodeLookup>,
    geoids: Arc<dyn CodeLookup>,
) -> Result<Vec<FieldValidations>> {
    let lei = ctx.lei().map(str::to_string);

    Ok(vec![
        FieldValidations {
            field: "uid".to_string(),
            phase1: vec![
                SblarCheck::new(
                    meta(
                        "E0001",
                        "uid.invalid_text_length",
                        "'Unique identifier' must be at least 21 characters in length and at most 45 characters in length.",
                        Severity::Error,
                        RuleScope::SingleField,
                        "#4.1.1",
                    ),
                    "uid",
                    CheckShape::ElementWise(functions::has_valid_text_length),
                    CheckParams {
                        min_length: Some(21),
                        max_length: Some(45),
                        ..CheckParams::default()
                    },
                ),
                SblarCheck::new(
                    meta(
                        "E0002",
                        "uid.invalid_text_pattern",
                        "'Unique identifier' may contain any combination of numbers and/or uppercase letters (i.e., 0-9 and A-Z), and must not contain any other characters.",
                        Severity::Error,
                        RuleScope::SingleField,
                        "#4.1.2",
                    ),
                    "uid",
                    CheckShape::ElementWise(functions::has_valid_format),
                    CheckParams {
                        regex: Some(pattern("^[A-Z0-9]+$")?),
                        ..CheckParams::default()
                    },
                ),
            ],
            phase2: vec![SblarCheck::new(
                meta(
                    "W0003",
                    "uid.invalid_uid_lei",
                    "The first 20 characters of the 'unique identifier' should match the Legal Entity Identifier (LEI) for the financial institution.",
                    Severity::Warning,
                    RuleScope::SingleField,
                    "#4.4.1",
                ),
                "uid",
                CheckShape::ElementWise(functions::string_contains),
                CheckParams {
                    containing_value: lei.clone(),
                    end_idx: Some(20),
                    ..CheckParams::default()
                },
            )],
        },
        FieldValidations {
            field: "app_date".to_string(),
            phase1: vec![SblarCheck::new(
                meta(
                    "E0020",
                    "app_date.invalid_date_format",
                    "'Application date' must be a real calendar date using YYYYMMDD format.",
                    Severity::Error,
                    RuleScope::SingleField,
                    "#4.1.3",
                ),
                "app_date",
                CheckShape::ElementWise(functions::is_date),
                CheckParams::default(),
            )],
            phase2: vec![],
        },
        FieldValidations {
            field: "app_method".to_string(),
            phase1: vec![SblarCheck::new(
                meta(
                    "E0040",
                    "app_method.invalid_enum_value",
                    "'Application method' must equal 1, 2, 3, or 4.",
                    Severity::Error,
                    RuleScope::SingleField,
                    "#4.1.4",
                ),
                "app_method",
                CheckShape::ElementWise(functions::is_valid_enum),
                CheckParams {
                    accepted_values: values(&["1", "2", "3", "4"]),
                    ..CheckParams::default()
                },
            )],
            phase2: vec![],
        },
        FieldValidations {
            field: "app_recipient".to_string(),
            phase1: vec![SblarCheck::new(
                meta(
                    "E0060",
                    "app_recipient.invalid_enum_value",
                    "'Application recipient' must equal 1 or 2.",
                    Severity::Error,
                    RuleScope::SingleField,
                    "#4.1.5",
                ),
                "app_recipient",
                CheckShape::ElementWise(functions::is_valid_enum),
                CheckParams {
                    accepted_values: values(&["1", "2"]),
                    ..CheckParams::default()
                },
            )],
            phase2: vec![],
        },
        FieldValidations {
            field: "ct_credit_product".to_string(),
            phase1: vec![SblarCheck::new(
                meta(
                    "E0080",
                    "ct_credit_product.invalid_enum_value",
                    "'Credit product' must equal 1, 2, 3, 4, 5, 6, 7, 8, 977, or 988.",
                    Severity::Error,
                    RuleScope::SingleField,
                    "#4.1.6",
                ),
                "ct_credit_product",
                CheckShape::ElementWise(functions::is_valid_enum),
                CheckParams {
                    accepted_values: values(&["1", "2", "3", "4", "5", "6", "7", "8", "977", "988"]),
                    ..CheckParams::default()
                },
            )],
            phase2: vec![],
        },
        FieldValidations {
            field: "ct_credit_product_ff".to_string(),
            phase1: vec![SblarCheck::new(
                meta(
                    "E0100",
                    "ct_credit_product_ff.invalid_text_length",
                    "'Free-form text field for other credit products' must not exceed 300 characters in length.",
                    Severity::Error,
                    RuleScope::SingleField,
                    "#4.1.7",
                ),
                "ct_credit_product_ff",
                CheckShape::ElementWise(functions::has_valid_text_length),
                CheckParams {
                    max_length: Some(300),
                    accept_blank: true,
                    ..CheckParams::default()
                },
            )],
            phase2: vec![SblarCheck::new(
                meta(
                    "E2000",
                    "ct_credit_product_ff.conditional_field_conflict",
                    "When 'credit product' does not equal 977 (other), 'free-form text field for other credit products' must be blank. When 'credit product' equals 977, 'free-form text field for other credit products' must not be blank.",
                    Severity::Error,
                    RuleScope::MultiField,
                    "#4.2.1",
                ),
                "ct_credit_product_ff",
                CheckShape::GroupBy {
                    key: "ct_credit_product".to_string(),
                    check: functions::conditional_field_conflict_by_group,
                },
                CheckParams {
                    condition_values: value_set(&["977"]),
                    ..CheckParams::default()
                },
            )],
        },
        FieldValidations {
            field: "ct_guarantee".to_string(),
            phase1: vec![SblarCheck::new(
                meta(
                    "E0120",
                    "ct_guarantee.invalid_enum_value",
                    "Each value in 'type of guarantee' (separated by semicolons) must equal 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 977, or 999.",
                    Severity::Error,
                    RuleScope::SingleField,
                    "#4.1.8",
                ),
                "ct_guarantee",
                CheckShape::ElementWise(functions::is_valid_multi_enum),
                CheckParams {
                    accepted_values: values(&[
                        "1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "977", "999",
                    ]),
                    ..CheckParams::default()
                },
            )],
            phase2: vec![
                SblarCheck::new(
                    meta(
                        "E0121",
                        "ct_guarantee.invalid_number_of_values",
                        "'Type of guarantee' must contain at least one and at most five values, separated by semicolons.",
                        Severity::Error,
                        RuleScope::SingleField,
                        "#4.1.9",
                    ),
                    "ct_guarantee",
                    CheckShape::ElementWise(functions::has_valid_value_count),
                    CheckParams {
                        max_value_count: Some(5),
                        ..CheckParams::default()
                    },
                ),
                SblarCheck::new(
                    meta(
                        "W0122",
                        "ct_guarantee.multi_value_field_restriction",
                        "When 'type of guarantee' contains 999 (no guarantee), it should be the only value.",
                        Severity::Warning,
                        RuleScope::SingleField,
                        "#4.4.2",
                    ),
                    "ct_guarantee",
                    CheckShape::ElementWise(functions::meets_multi_value_field_restriction),
                    CheckParams {
                        condition_values: value_set(&["999"]),
                        ..CheckParams::default()
                    },
                ),
                SblarCheck::new(
                    meta(
                        "W0123",
                        "ct_guarantee.duplicates_in_field",
                        "'Type of guarantee' should not contain duplicated values.",
                        Severity::Warning,
                        RuleScope::SingleField,
                        "#4.4.3",
                    ),
                    "ct_guarantee",
                    CheckShape::ElementWise(functions::is_unique_in_field),
                    CheckParams::default(),
                ),
            ],
        },
        FieldValidations {
            field: "amount_applied_for_flag".to_string(),
            phase1: vec![SblarCheck::new(
                meta(
                    "E0240",
                    "amount_applied_for_flag.invalid_enum_value",
                    "'Amount applied for: NA/NP flag' must equal 900, 988, or 999.",
                    Severity::Error,
                    RuleScope::SingleField,
                    "#4.1.17",
                ),
                "amount_applied_for_flag",
                CheckShape::ElementWise(functions::is_valid_enum),
                CheckParams {
                    accepted_values: values(&["900", "988", "999"]),
                    ..CheckParams::default()
                },
            )],
            phase2: vec![],
        },
        FieldValidations {
            field: "amount_applied_for".to_string(),
            phase1: vec![SblarCheck::new(
                meta(
                    "E0260",
                    "amount_applied_for.invalid_numeric_format",
                    "When present, 'amount applied for' must be a numeric value.",
                    Severity::Error,
                    RuleScope::SingleField,
                    "#4.1.18",
                ),
                "amount_applied_for",
                CheckShape::ElementWise(functions::is_number),
                CheckParams {
                    accept_blank: true,
                    ..CheckParams::default()
                },
            )],
            phase2: vec![
                SblarCheck::new(
                    meta(
                        "E2007",
                        "amount_applied_for.conditional_field_conflict",
                        "When 'amount applied for: NA/NP flag' does not equal 900 (applicable and reported), 'amount applied for' must be blank. When 'amount applied for: NA/NP flag' equals 900, 'amount applied for' must not be blank.",
                        Severity::Error,
                        RuleScope::MultiField,
                        "#4.2.6",
                    ),
                    "amount_applied_for",
                    CheckShape::GroupBy {
                        key: "amount_applied_for_flag".to_string(),
                        check: functions::conditional_field_conflict_by_group,
                    },
                    CheckParams {
                        condition_values: value_set(&["900"]),
                        ..CheckParams::default()
                    },
                ),
                SblarCheck::new(
                    meta(
                        "E0261",
                        "amount_applied_for.invalid_numeric_value",
                        "When present, 'amount applied for' must be greater than 0.",
                        Severity::Error,
                        RuleScope::SingleField,
                        "#4.1.19",
                    ),
                    "amount_applied_for",
                    CheckShape::ElementWise(functions::is_greater_than),
                    CheckParams {
                        min_value: Some(0.0),
                        accept_blank: true,
                        ..CheckParams::default()
                    },
                ),
            ],
        },
        FieldValidations {
            field: "action_taken".to_string(),
            phase1: vec![SblarCheck::new(
                meta(
                    "E0300",
                    "action_taken.invalid_enum_value",
                    "'Action taken' must equal 1, 2, 3, 4, or 5.",
                    Severity::Error,
                    RuleScope::SingleField,
                    "#4.1.22",
                ),
                "action_taken",
                CheckShape::ElementWise(functions::is_valid_enum),
                CheckParams {
                    accepted_values: values(&["1", "2", "3", "4", "5"]),
                    ..CheckParams::default()
                },
            )],
            phase2: vec![],
        },
        FieldValidations {
            field: "action_taken_date".to_string(),
            phase1: vec![SblarCheck::new(
                meta(
                    "E0320",
                    "action_taken_date.invalid_date_format",
                    "'Action taken date' must be a real calendar date using YYYYMMDD format.",
                    Severity::Error,
                    RuleScope::SingleField,
                    "#4.1.23",
                ),
                "action_taken_date",
                CheckShape::ElementWise(functions::is_date),
                CheckParams::default(),
            )],
            phase2: vec![SblarCheck::new(
                meta(
                    "E2009",
                    "action_taken_date.date_value_conflict",
                    "'Action taken date' must be on or after 'application date'.",
                    Severity::Error,
                    RuleScope::MultiField,
                    "#4.2.8",
                ),
                "action_taken_date",
                CheckShape::MultiField {
                    related_fields: vec!["app_date".to_string()],
                    check: functions::is_date_after,
                },
                CheckParams::default(),
            )],
        },
        FieldValidations {
            field: "denial_reasons".to_string(),
            phase1: vec![SblarCheck::new(
                meta(
                    "E0340",
                    "denial_reasons.invalid_enum_value",
                    "Each value in 'denial reason(s)' (separated by semicolons) must equal 1, 2, 3, 4, 5, 6, 7, 8, 9, 977, or 999.",
                    Severity::Error,
                    RuleScope::SingleField,
                    "#4.1.24",
                ),
                "denial_reasons",
                CheckShape::ElementWise(functions::is_valid_multi_enum),
                CheckParams {
                    accepted_values: values(&[
                        "1", "2", "3", "4", "5", "6", "7", "8", "9", "977", "999",
                    ]),
                    ..CheckParams::default()
                },
            )],
            phase2: vec![
                SblarCheck::new(
                    meta(
                        "E0341",
                        "denial_reasons.invalid_number_of_values",
                        "'Denial reason(s)' must contain at least one and at most four values, separated by semicolons.",
                        Severity::Error,
                        RuleScope::SingleField,
                        "#4.1.25",
                    ),
                    "denial_reasons",
                    CheckShape::ElementWise(functions::has_valid_value_count),
                    CheckParams {
                        max_value_count: Some(4),
                        ..CheckParams::default()
                    },
                ),
                SblarCheck::new(
                    meta(
                        "W0340",
                        "denial_reasons.multi_value_field_restriction",
                        "When 'denial reason(s)' contains 999 (not denied), it should be the only value.",
                        Severity::Warning,
                        RuleScope::SingleField,
                        "#4.4.5",
                    ),
                    "denial_reasons",
                    CheckShape::ElementWise(functions::meets_multi_value_field_restriction),
                    CheckParams {
                        condition_values: value_set(&["999"]),
                        ..CheckParams::default()
                    },
                ),
                SblarCheck::new(
                    meta(
                        "W0341",
                        "denial_reasons.duplicates_in_field",
                        "'Denial reason(s)' should not contain duplicated values.",
                        Severity::Warning,
                        RuleScope::SingleField,
                        "#4.4.6",
                    ),
                    "denial_reasons",
                    CheckShape::ElementWise(functions::is_unique_in_field),
                    CheckParams::default(),
                ),
            ],
        },
        FieldValidations {
            field: "denial_reasons_ff".to_string(),
            phase1: vec![SblarCheck::new(
                meta(
                    "E0360",
                    "denial_reasons_ff.invalid_text_length",
                    "'Free-form text field for other denial reason(s)' must not exceed 300 characters in length.",
                    Severity::Error,
                    RuleScope::SingleField,
                    "#4.1.26",
                ),
                "denial_reasons_ff",
                CheckShape::ElementWise(functions::has_valid_text_length),
                CheckParams {
                    max_length: Some(300),
                    accept_blank: true,
                    ..CheckParams::default()
                },
            )],
            phase2: vec![SblarCheck::new(
                meta(
                    "E2012",
                    "denial_reasons_ff.conditional_field_conflict",
                    "When 'denial reason(s)' does not contain 977 (other), 'free-form text field for other denial reason(s)' must be blank. When 'denial reason(s)' contains 977, 'free-form text field for other denial reason(s)' must not be blank.",
                    Severity::Error,
                    RuleScope::MultiField,
                    "#4.2.11",
                ),
                "denial_reasons_ff",
                CheckShape::MultiField {
                    related_fields: vec!["denial_reasons".to_string()],
                    check: functions::has_no_conditional_field_conflict,
                },
                CheckParams {
                    condition_values: value_set(&["977"]),
                    ..CheckParams::default()
                },
            )],
        },
        FieldValidations {
            field: "census_tract_number".to_string(),
            phase1: vec![SblarCheck::new(
                meta(
                    "E0680",
                    "census_tract_number.invalid_text_length",
                    "When present, 'census tract: tract number' must be a GEOID with exactly 11 digits.",
                    Severity::Error,
                    RuleScope::SingleField,
                    "#4.1.38",
                ),
                "census_tract_number",
                CheckShape::ElementWise(functions::has_valid_text_length),
                CheckParams {
                    min_length: Some(11),
                    max_length: Some(11),
                    accept_blank: true,
                    ..CheckParams::default()
                },
            )],
            phase2: vec![SblarCheck::new(
                meta(
                    "W0680",
                    "census_tract_number.invalid_geoid",
                    "When present, 'census tract: tract number' should be a valid census tract GEOID as defined by the U.S. Census Bureau.",
                    Severity::Warning,
                    RuleScope::SingleField,
                    "#4.4.11",
                ),
                "census_tract_number",
                CheckShape::ElementWise(functions::is_valid_code),
                CheckParams {
                    accept_blank: true,
                    codes: Some(geoids),
                    ..CheckParams::default()
                },
            )],
        },
        FieldValidations {
            field: "naics_code".to_string(),
            phase1: vec![SblarCheck::new(
                meta(
                    "E0761",
                    "naics_code.invalid_naics_format",
                    "When present, 'North American Industry Classification System (NAICS) code' must be a three digit number.",
                    Severity::Error,
                    RuleScope::SingleField,
                    "#4.1.42",
                ),
                "naics_code",
                CheckShape::ElementWise(functions::has_valid_format),
                CheckParams {
                    regex: Some(pattern("^[0-9]{3}$")?),
                    accept_blank: true,
                    ..CheckParams::default()
                },
            )],
            phase2: vec![SblarCheck::new(
                meta(
                    "W0762",
                    "naics_code.invalid_naics_value",
                    "When present, 'North American Industry Classification System (NAICS) code' should be a valid NAICS code.",
                    Severity::Warning,
                    RuleScope::SingleField,
                    "#4.4.13",
                ),
                "naics_code",
                CheckShape::ElementWise(functions::is_valid_code),
                CheckParams {
                    accept_blank: true,
                    codes: Some(naics),
                    ..CheckParams::default()
                },
            )],
        },
    ])
}
