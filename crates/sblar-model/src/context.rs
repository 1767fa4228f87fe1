//! Run-time context parameters for a validation run.

use std::collections::BTreeMap;

use crate::error::{Result, ValidationError};

/// Key under which the expected legal-entity identifier prefix is supplied.
pub const LEI_PARAM: &str = "lei";

/// Key for the expected total record count of the register.
pub const RECORD_COUNT_PARAM: &str = "expected_record_count";

/// Named string parameters supplied by the caller, used to parameterize
/// contextual rules without mutating the shared rule definitions.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    params: BTreeMap<String, String>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// The caller-supplied legal-entity identifier, if any.
    pub fn lei(&self) -> Option<&str> {
        self.get(LEI_PARAM)
    }

    /// The expected register record count, if supplied.
    ///
    /// A non-numeric value is a configuration error.
    pub fn expected_record_count(&self) -> Result<Option<u64>> {
        match self.get(RECORD_COUNT_PARAM) {
            None => Ok(None),
            Some(raw) => raw.trim().parse::<u64>().map(Some).map_err(|_| {
                ValidationError::configuration(format!(
                    "context parameter {RECORD_COUNT_PARAM} must be a whole number, got {raw:?}"
                ))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_round_trips_params() {
        let ctx = RunContext::new()
            .with_param(LEI_PARAM, "000TESTFIUIDDONOTUSE")
            .with_param(RECORD_COUNT_PARAM, "12");
        assert_eq!(ctx.lei(), Some("000TESTFIUIDDONOTUSE"));
        assert_eq!(ctx.expected_record_count().unwrap(), Some(12));
    }

    #[test]
    fn bad_record_count_is_configuration_error() {
        let ctx = RunContext::new().with_param(RECORD_COUNT_PARAM, "twelve");
        assert!(matches!(
            ctx.expected_record_count(),
            Err(ValidationError::Configuration(_))
        ));
    }
}
