//! Rule definitions for small business lending register validation.
//!
//! The catalogue declares what is checked; the engine decides how and when.
//! Batch-level checks come in three evaluation shapes (element-wise,
//! multi-field, group-by) and register-level rules are a separate closed
//! set evaluated over accumulated whole-submission evidence.

pub mod catalogue;
pub mod check;
pub mod functions;
pub mod register;

pub use catalogue::{FIG_BASE_URL, FieldValidations, UID_FIELD, catalogue_fields, phase_validations};
pub use check::{
    CheckParams, CheckShape, ElementFn, GroupFn, MULTI_VALUE_SEPARATOR, MultiFieldFn, SblarCheck,
};
pub use register::{RegisterRule, UID_LEI_PREFIX_LEN};
