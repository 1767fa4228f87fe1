//! The check function library.
//!
//! Every function here is a pure function over raw text: submission values
//! are never pre-coerced, so each check decides how to parse. Blank (empty
//! or whitespace-only) is distinct from unparsable; functions taking an
//! `accept_blank` parameter pass blanks through when it is set.

use chrono::NaiveDate;

use sblar_common::parse_f64;

use crate::check::CheckParams;

/// Blank handling shared by the value checks: a blank value passes iff
/// `accept_blank` is set, a non-blank value falls through to the check
/// result.
fn check_blank(value: &str, check_result: bool, accept_blank: bool) -> bool {
    if value.trim().is_empty() {
        accept_blank
    } else {
        check_result
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// The value must be a real calendar date in `YYYYMMDD` form.
///
/// `20221344` is invalid because month 13 does not exist; `20220115` is
/// valid. The full eight digits are required, so non-padded days are
/// rejected before the calendar parse runs.
pub fn is_date(value: &str, _params: &CheckParams) -> bool {
    let trimmed = value.trim();
    if trimmed.len() != 8 || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    NaiveDate::parse_from_str(trimmed, "%Y%m%d").is_ok()
}

/// The value must match `params.regex`.
pub fn has_valid_format(value: &str, params: &CheckParams) -> bool {
    let matched = params
        .regex
        .as_ref()
        .is_some_and(|re| re.is_match(value.trim()));
    check_blank(value, matched, params.accept_blank)
}

/// Character count must fall within `params.min_length..=params.max_length`.
pub fn has_valid_text_length(value: &str, params: &CheckParams) -> bool {
    let length = value.chars().count();
    let min_ok = params.min_length.is_none_or(|min| length >= min);
    let max_ok = params.max_length.is_none_or(|max| length <= max);
    check_blank(value, min_ok && max_ok, params.accept_blank)
}

/// The whole value must equal one of `params.accepted_values`.
pub fn is_valid_enum(value: &str, params: &CheckParams) -> bool {
    let accepted = params.accepted_values.iter().any(|v| v == value.trim());
    check_blank(value, accepted, params.accept_blank)
}

/// Every entry of a delimited multi-value field must be an accepted value.
pub fn is_valid_multi_enum(value: &str, params: &CheckParams) -> bool {
    if is_blank(value) {
        return params.accept_blank;
    }
    let entries = params.split_values(value);
    !entries.is_empty()
        && entries
            .iter()
            .all(|entry| params.accepted_values.iter().any(|v| v == entry))
}

/// A delimited multi-value field may not contain the same entry twice.
pub fn is_unique_in_field(value: &str, params: &CheckParams) -> bool {
    let entries = params.split_values(value);
    let mut seen = std::collections::BTreeSet::new();
    entries.iter().all(|entry| seen.insert(*entry))
}

/// A delimited multi-value field may hold at most `params.max_value_count`
/// entries.
pub fn has_valid_value_count(value: &str, params: &CheckParams) -> bool {
    let entries = params.split_values(value);
    params.max_value_count.is_none_or(|max| entries.len() <= max)
}

/// When any entry of the value is in `params.condition_values`, it must be
/// the only entry present.
pub fn meets_multi_value_field_restriction(value: &str, params: &CheckParams) -> bool {
    let entries = params.split_values(value);
    let restricted = entries
        .iter()
        .filter(|entry| params.condition_values.contains(**entry))
        .count();
    restricted == 0 || entries.len() == 1
}

/// The value must parse as a number; `params.is_whole` restricts to digits
/// only.
pub fn is_number(value: &str, params: &CheckParams) -> bool {
    let trimmed = value.trim();
    let parsed = if params.is_whole {
        !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit())
    } else {
        parse_f64(trimmed).is_some()
    };
    check_blank(value, parsed, params.accept_blank)
}

fn compare(value: &str, limit: Option<f64>, accept_blank: bool, op: fn(f64, f64) -> bool) -> bool {
    if is_blank(value) {
        return accept_blank;
    }
    match (parse_f64(value), limit) {
        (Some(number), Some(limit)) => op(number, limit),
        // Unparsable numbers are a different rule's finding.
        (None, _) => true,
        (_, None) => true,
    }
}

/// Numeric value must exceed `params.min_value`.
pub fn is_greater_than(value: &str, params: &CheckParams) -> bool {
    compare(value, params.min_value, params.accept_blank, |a, b| a > b)
}

/// Numeric value must be at least `params.min_value`.
pub fn is_greater_than_or_equal_to(value: &str, params: &CheckParams) -> bool {
    compare(value, params.min_value, params.accept_blank, |a, b| a >= b)
}

/// Numeric value must be below `params.max_value`.
pub fn is_less_than(value: &str, params: &CheckParams) -> bool {
    compare(value, params.max_value, params.accept_blank, |a, b| a < b)
}

/// The value must be a member of the referenced code set.
pub fn is_valid_code(value: &str, params: &CheckParams) -> bool {
    let member = params
        .codes
        .as_ref()
        .is_some_and(|codes| codes.contains(value.trim()));
    check_blank(value, member, params.accept_blank)
}

/// The leading `params.end_idx` characters must equal
/// `params.containing_value`. Passes when no expected value was supplied
/// (the rule was rendered without its context parameter).
pub fn string_contains(value: &str, params: &CheckParams) -> bool {
    let Some(expected) = params.containing_value.as_deref() else {
        return true;
    };
    let prefix: String = match params.end_idx {
        Some(end) => value.chars().take(end).collect(),
        None => value.to_string(),
    };
    check_blank(value, prefix == expected, params.accept_blank)
}

/// Row-wise conditional: when the companion field (first related field)
/// holds any of `params.condition_values`, the primary value must not be
/// blank; otherwise it must be blank. Both directions produce findings.
pub fn has_no_conditional_field_conflict(
    value: &str,
    related: &[String],
    params: &CheckParams,
) -> bool {
    let selector = related.first().map(String::as_str).unwrap_or_default();
    let condition_met = params
        .split_values(selector)
        .iter()
        .any(|entry| params.condition_values.contains(*entry));
    if condition_met {
        !is_blank(value)
    } else {
        is_blank(value)
    }
}

/// Row-wise date ordering: the primary date must be on or after the
/// companion date. Unparsable dates pass; the syntactical phase already
/// reported them.
pub fn is_date_after(value: &str, related: &[String], _params: &CheckParams) -> bool {
    let other = related.first().map(String::as_str).unwrap_or_default();
    let (Ok(own), Ok(earlier)) = (
        NaiveDate::parse_from_str(value.trim(), "%Y%m%d"),
        NaiveDate::parse_from_str(other.trim(), "%Y%m%d"),
    ) else {
        return true;
    };
    own >= earlier
}

/// Group-by conditional: rows are partitioned by the selector field. In
/// partitions whose key is one of `params.condition_values` every primary
/// value must be non-blank; in all other partitions every primary value
/// must be blank. Returns one boolean per row of the partition, in order.
pub fn conditional_field_conflict_by_group(
    group_key: &str,
    values: &[String],
    params: &CheckParams,
) -> Vec<bool> {
    let condition_met = params
        .split_values(group_key)
        .iter()
        .any(|entry| params.condition_values.contains(*entry));
    values
        .iter()
        .map(|value| {
            if condition_met {
                !is_blank(value)
            } else {
                is_blank(value)
            }
        })
        .collect()
}
