//! Input validation.
//!
//! Each action declares its parameters as [`FieldRules`]. Per request the
//! pipeline runs an [`InputValidator`] over the raw [`Request`](crate::Request)
//! and either gets a [`ValidatedInput`] for the handler or a list of
//! [`FieldError`]s for the client.
//!
//! # Rule language
//!
//! | token           | meaning                                          |
//! |-----------------|--------------------------------------------------|
//! | `required`      | field must be present                            |
//! | `fatal`         | failure makes the whole result fatal             |
//! | `string`        | scalar string                                    |
//! | `not_empty`     | string or list must not be empty                 |
//! | `length N`      | string at most `N` characters                    |
//! | `in a,b`        | value must be listed; integer ranges as `lo:hi`  |
//! | `int32`         | signed 32-bit integer                            |
//! | `ge N` / `le N` | inclusive integer bounds                         |
//! | `id`            | unsigned identifier up to [`MAX_ID`]             |
//! | `db table.col`  | same as `id`, documents the referenced column    |
//! | `array`         | list of strings                                  |
//! | `array_id`      | list of identifiers                              |

mod input;
mod rule;
mod validator;

pub use input::{InputValue, ValidatedInput};
pub use rule::{FieldRule, FieldRules, FieldType, InOption, RuleError, MAX_ID};
pub use validator::{
    FieldError, FieldErrorKind, InputValidator, ValidationResult, DEFAULT_MAX_STRING_LENGTH,
};
