pub mod context;
pub mod error;
pub mod lookup;
pub mod report;

pub use context::{LEI_PARAM, RECORD_COUNT_PARAM, RunContext};
pub use error::{Result, ValidationError};
pub use lookup::CodeLookup;
pub use report::{
    Counts, Finding, FindingField, RuleMeta, RuleScope, Severity, ValidationPhase,
    ValidationResults,
};
