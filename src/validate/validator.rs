use std::fmt;

use indexmap::IndexMap;

use super::input::{InputValue, ValidatedInput};
use super::rule::{FieldRule, FieldRules, FieldType, InOption, MAX_ID};
use crate::request::{ParamValue, Request};

/// Default bound on any single string value, in characters.
pub const DEFAULT_MAX_STRING_LENGTH: usize = 2048;

/// Why a field failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldErrorKind {
    /// A required field was not sent.
    Missing,
    /// The value has the wrong shape (list vs scalar, not a number, ...).
    Type,
    /// The value is empty but the rule says `not_empty`.
    Empty,
    /// The value exceeds the maximum length.
    TooLong,
    /// The value contains control or non-printable characters.
    ContainsControlChars,
    /// The value is not one of the allowed values.
    NotInList,
    /// The number is outside the allowed range.
    OutOfRange,
}

impl fmt::Display for FieldErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "missing"),
            Self::Type => write!(f, "wrong type"),
            Self::Empty => write!(f, "empty"),
            Self::TooLong => write!(f, "too long"),
            Self::ContainsControlChars => write!(f, "contains control characters"),
            Self::NotInList => write!(f, "not allowed"),
            Self::OutOfRange => write!(f, "out of range"),
        }
    }
}

/// A single field-level validation failure.
///
/// The message names the field and the violated constraint but never
/// echoes the rejected value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    field: String,
    kind: FieldErrorKind,
    message: String,
}

impl FieldError {
    fn new(field: &str, kind: FieldErrorKind, detail: impl fmt::Display) -> Self {
        let message = match kind {
            FieldErrorKind::Missing => format!("Field \"{field}\" is mandatory."),
            _ => format!("Incorrect value for field \"{field}\": {detail}."),
        };
        Self {
            field: field.to_string(),
            kind,
            message,
        }
    }

    /// Returns the failing field's name.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Returns the failure kind.
    pub fn kind(&self) -> FieldErrorKind {
        self.kind
    }

    /// Returns the user-facing message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Outcome of validating a request against an action's rules.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    errors: Vec<FieldError>,
    fatal: bool,
    input: Option<ValidatedInput>,
}

impl ValidationResult {
    /// Returns `true` if every declared field passed.
    pub fn ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns field errors in declaration order.
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Returns `true` if a field marked `fatal` failed.
    pub fn is_fatal(&self) -> bool {
        self.fatal
    }

    /// Names of the failing fields, in declaration order.
    pub fn failed_fields(&self) -> Vec<&str> {
        self.errors.iter().map(FieldError::field).collect()
    }

    /// Returns the validated input, if validation passed.
    pub fn input(&self) -> Option<&ValidatedInput> {
        self.input.as_ref()
    }

    /// Splits the result into the validated input or the errors.
    ///
    /// # Errors
    ///
    /// Returns the field errors if validation failed.
    pub fn into_input(self) -> Result<ValidatedInput, Vec<FieldError>> {
        match self.input {
            Some(input) if self.errors.is_empty() => Ok(input),
            _ => Err(self.errors),
        }
    }
}

/// Checks a request's parameters against declared field rules.
///
/// Pure: the request is only read, and every input, however malformed,
/// yields a [`ValidationResult`] instead of a panic. Parameters that the
/// rules do not declare are ignored.
///
/// # Examples
///
/// ```
/// use action_pipeline::Request;
/// use action_pipeline::validate::{FieldRules, InputValidator};
///
/// let rules = FieldRules::parse([
///     ("id", "required|id"),
///     ("name", "string|not_empty"),
/// ])
/// .unwrap();
///
/// let request = Request::builder("req-1").param("name", "missing-required").build();
/// let result = InputValidator::new(&rules).validate(&request);
///
/// assert!(!result.ok());
/// assert_eq!(result.failed_fields(), vec!["id"]);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct InputValidator<'a> {
    rules: &'a FieldRules,
    max_string_length: usize,
}

impl<'a> InputValidator<'a> {
    /// Creates a validator with the default string length bound.
    pub fn new(rules: &'a FieldRules) -> Self {
        Self {
            rules,
            max_string_length: DEFAULT_MAX_STRING_LENGTH,
        }
    }

    /// Overrides the global string length bound.
    pub fn with_max_string_length(mut self, max_string_length: usize) -> Self {
        self.max_string_length = max_string_length.max(1);
        self
    }

    /// Validates `request`.
    pub fn validate(&self, request: &Request) -> ValidationResult {
        let mut errors = Vec::new();
        let mut fatal = false;
        let mut values = IndexMap::new();

        for (field, rule) in self.rules.iter() {
            let checked = match request.param(field) {
                None if rule.required => {
                    Err(FieldError::new(field, FieldErrorKind::Missing, "missing"))
                }
                None => continue,
                Some(raw) => self.check(field, rule, raw),
            };

            match checked {
                Ok(value) => {
                    values.insert(field.to_string(), value);
                }
                Err(error) => {
                    fatal |= rule.fatal;
                    errors.push(error);
                }
            }
        }

        let input = errors.is_empty().then(|| ValidatedInput::new(values));
        ValidationResult {
            errors,
            fatal,
            input,
        }
    }

    fn check(&self, field: &str, rule: &FieldRule, raw: &ParamValue) -> Result<InputValue, FieldError> {
        match rule.ty {
            FieldType::Any => match raw {
                ParamValue::Scalar(s) => {
                    self.check_chars(field, s)?;
                    Ok(InputValue::Str(s.clone()))
                }
                ParamValue::List(items) => {
                    for item in items {
                        self.check_chars(field, item)?;
                    }
                    Ok(InputValue::List(items.clone()))
                }
            },
            FieldType::String => {
                let s = scalar(field, raw, "a string")?;
                self.check_string(field, rule, s)?;
                Ok(InputValue::Str(s.to_string()))
            }
            FieldType::Int32 => {
                let s = scalar(field, raw, "an integer")?;
                check_int32(field, rule, s).map(InputValue::Int)
            }
            FieldType::Id => {
                let s = scalar(field, raw, "an identifier")?;
                parse_id(s)
                    .map(InputValue::Id)
                    .ok_or_else(|| FieldError::new(field, FieldErrorKind::Type, "an identifier is expected"))
            }
            FieldType::Array => {
                let items = list(field, rule, raw)?;
                for item in items {
                    self.check_chars(field, item)?;
                }
                Ok(InputValue::List(items.to_vec()))
            }
            FieldType::ArrayId => {
                let items = list(field, rule, raw)?;
                items
                    .iter()
                    .map(|item| {
                        parse_id(item).ok_or_else(|| {
                            FieldError::new(field, FieldErrorKind::Type, "a list of identifiers is expected")
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(InputValue::Ids)
            }
        }
    }

    fn check_string(&self, field: &str, rule: &FieldRule, s: &str) -> Result<(), FieldError> {
        if rule.not_empty && s.is_empty() {
            return Err(FieldError::new(field, FieldErrorKind::Empty, "cannot be empty"));
        }
        self.check_chars(field, s)?;
        if let Some(max_len) = rule.max_len {
            if s.chars().count() > max_len {
                return Err(FieldError::new(
                    field,
                    FieldErrorKind::TooLong,
                    format_args!("value is too long, maximum is {max_len} characters"),
                ));
            }
        }
        if let Some(allowed) = &rule.allowed {
            let listed = allowed
                .iter()
                .any(|option| matches!(option, InOption::Value(v) if v == s));
            if !listed {
                return Err(FieldError::new(field, FieldErrorKind::NotInList, "value is not allowed"));
            }
        }
        Ok(())
    }

    fn check_chars(&self, field: &str, s: &str) -> Result<(), FieldError> {
        if s.chars().any(|c| c.is_control()) {
            return Err(FieldError::new(
                field,
                FieldErrorKind::ContainsControlChars,
                "contains control characters",
            ));
        }
        if s.chars().count() > self.max_string_length {
            return Err(FieldError::new(
                field,
                FieldErrorKind::TooLong,
                format_args!("value is too long, maximum is {} characters", self.max_string_length),
            ));
        }
        Ok(())
    }
}

fn scalar<'r>(field: &str, raw: &'r ParamValue, expected: &str) -> Result<&'r str, FieldError> {
    raw.as_scalar().ok_or_else(|| {
        FieldError::new(field, FieldErrorKind::Type, format_args!("{expected} is expected"))
    })
}

fn list<'r>(field: &str, rule: &FieldRule, raw: &'r ParamValue) -> Result<&'r [String], FieldError> {
    let items = raw
        .as_list()
        .ok_or_else(|| FieldError::new(field, FieldErrorKind::Type, "an array is expected"))?;
    if rule.not_empty && items.is_empty() {
        return Err(FieldError::new(field, FieldErrorKind::Empty, "cannot be empty"));
    }
    Ok(items)
}

fn check_int32(field: &str, rule: &FieldRule, s: &str) -> Result<i32, FieldError> {
    let value: i32 = parse_int32(s)
        .ok_or_else(|| FieldError::new(field, FieldErrorKind::Type, "an integer is expected"))?;
    let wide = i64::from(value);

    if let Some(allowed) = &rule.allowed {
        let listed = allowed.iter().any(|option| match option {
            InOption::Value(v) => v.parse::<i64>().is_ok_and(|n| n == wide),
            InOption::Range(lo, hi) => lo.map_or(true, |l| l <= wide) && hi.map_or(true, |h| wide <= h),
        });
        if !listed {
            return Err(FieldError::new(field, FieldErrorKind::NotInList, "value is not allowed"));
        }
    }
    if let Some(min) = rule.min {
        if wide < min {
            return Err(FieldError::new(
                field,
                FieldErrorKind::OutOfRange,
                format_args!("value must be no less than \"{min}\""),
            ));
        }
    }
    if let Some(max) = rule.max {
        if wide > max {
            return Err(FieldError::new(
                field,
                FieldErrorKind::OutOfRange,
                format_args!("value must be no greater than \"{max}\""),
            ));
        }
    }
    Ok(value)
}

/// Parses `-?[0-9]+` into an `i32`; no `+` sign, no whitespace.
fn parse_int32(s: &str) -> Option<i32> {
    let digits = s.strip_prefix('-').unwrap_or(s);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Parses an unsigned decimal identifier, ignoring leading zeros.
fn parse_id(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let trimmed = s.trim_start_matches('0');
    if trimmed.is_empty() {
        return Some(0);
    }
    trimmed.parse::<u64>().ok().filter(|id| *id <= MAX_ID)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(fields: &[(&str, &str)]) -> FieldRules {
        FieldRules::parse(fields.iter().copied()).expect("valid rules")
    }

    #[test]
    fn missing_required_field_is_named() {
        let rules = rules(&[("id", "required|id")]);
        let request = Request::builder("r").param("name", "missing-required").build();

        let result = InputValidator::new(&rules).validate(&request);

        assert!(!result.ok());
        assert_eq!(result.failed_fields(), vec!["id"]);
        assert_eq!(result.errors()[0].kind(), FieldErrorKind::Missing);
        assert_eq!(result.errors()[0].message(), "Field \"id\" is mandatory.");
        assert!(result.input().is_none());
    }

    #[test]
    fn optional_and_extra_fields_pass() {
        let rules = rules(&[("filter", "string"), ("page", "int32")]);
        let request = Request::builder("r")
            .param("unrelated", "\u{0}whatever")
            .list_param("also_unrelated", ["x"])
            .build();

        let result = InputValidator::new(&rules).validate(&request);

        assert!(result.ok());
        let input = result.into_input().unwrap();
        assert!(input.is_empty());
        assert!(!input.has("unrelated"));
    }

    #[test]
    fn errors_follow_declaration_order() {
        let rules = rules(&[
            ("b", "required|string"),
            ("a", "required|int32"),
            ("c", "string"),
        ]);
        let request = Request::builder("r").param("a", "x").build();

        let result = InputValidator::new(&rules).validate(&request);

        assert_eq!(result.failed_fields(), vec!["b", "a"]);
    }

    #[test]
    fn string_enum() {
        let rules = rules(&[("context", "required|string|in host,template")]);
        let validator = InputValidator::new(&rules);

        let ok = Request::builder("r").param("context", "template").build();
        assert!(validator.validate(&ok).ok());

        let bad = Request::builder("r").param("context", "proxy").build();
        let result = validator.validate(&bad);
        assert_eq!(result.errors()[0].kind(), FieldErrorKind::NotInList);
        assert!(!result.errors()[0].message().contains("proxy"));
    }

    #[test]
    fn string_rejects_list_and_control_chars() {
        let rules = rules(&[("name", "string")]);
        let validator = InputValidator::new(&rules);

        let list = Request::builder("r").list_param("name", ["a"]).build();
        assert_eq!(validator.validate(&list).errors()[0].kind(), FieldErrorKind::Type);

        let ctrl = Request::builder("r").param("name", "a\nb").build();
        assert_eq!(
            validator.validate(&ctrl).errors()[0].kind(),
            FieldErrorKind::ContainsControlChars
        );
    }

    #[test]
    fn not_empty_and_length() {
        let rules = rules(&[("dstfld1", "string|not_empty|length 5")]);
        let validator = InputValidator::new(&rules);

        let empty = Request::builder("r").param("dstfld1", "").build();
        assert_eq!(validator.validate(&empty).errors()[0].kind(), FieldErrorKind::Empty);

        let long = Request::builder("r").param("dstfld1", "abcdef").build();
        assert_eq!(validator.validate(&long).errors()[0].kind(), FieldErrorKind::TooLong);

        let unicode = Request::builder("r").param("dstfld1", "héllo").build();
        assert!(validator.validate(&unicode).ok());
    }

    #[test]
    fn global_length_bound() {
        let rules = rules(&[("q", "string")]);
        let validator = InputValidator::new(&rules).with_max_string_length(4);

        let request = Request::builder("r").param("q", "12345").build();
        let result = validator.validate(&request);

        assert_eq!(result.errors()[0].kind(), FieldErrorKind::TooLong);
        assert!(result.errors()[0].message().contains('4'));
    }

    #[test]
    fn int32_bounds_and_ranges() {
        let rules = rules(&[("page", "ge 1|le 10"), ("severity", "int32|in 0:5,10")]);
        let validator = InputValidator::new(&rules);

        let ok = Request::builder("r").param("page", "10").param("severity", "10").build();
        let input = validator.validate(&ok).into_input().unwrap();
        assert_eq!(input.int("page"), Some(10));
        assert_eq!(input.int("severity"), Some(10));

        let low = Request::builder("r").param("page", "0").build();
        assert_eq!(validator.validate(&low).errors()[0].kind(), FieldErrorKind::OutOfRange);

        let unlisted = Request::builder("r").param("severity", "7").build();
        assert_eq!(
            validator.validate(&unlisted).errors()[0].kind(),
            FieldErrorKind::NotInList
        );
    }

    #[test]
    fn int32_rejects_non_numbers_and_overflow() {
        let rules = rules(&[("n", "int32")]);
        let validator = InputValidator::new(&rules);

        for bad in ["", "abc", "1.5", "+1", " 1", "2147483648", "-"] {
            let request = Request::builder("r").param("n", bad).build();
            assert_eq!(
                validator.validate(&request).errors()[0].kind(),
                FieldErrorKind::Type,
                "input {bad:?}"
            );
        }

        let min = Request::builder("r").param("n", "-2147483648").build();
        assert_eq!(validator.validate(&min).into_input().unwrap().int("n"), Some(i32::MIN));
    }

    #[test]
    fn ids_are_normalised() {
        let rules = rules(&[("hostid", "db hosts.hostid"), ("groupids", "array_id")]);
        let validator = InputValidator::new(&rules);

        let request = Request::builder("r")
            .param("hostid", "0010084")
            .list_param("groupids", ["0", "004"])
            .build();
        let input = validator.validate(&request).into_input().unwrap();

        assert_eq!(input.id("hostid"), Some(10084));
        assert_eq!(input.ids("groupids"), Some(&[0, 4][..]));
    }

    #[test]
    fn id_bounds() {
        assert_eq!(parse_id("9223372036854775807"), Some(MAX_ID));
        assert_eq!(parse_id("9223372036854775808"), None);
        assert_eq!(parse_id("000"), Some(0));
        assert_eq!(parse_id("-1"), None);
        assert_eq!(parse_id(""), None);
        assert_eq!(parse_id("99999999999999999999999"), None);
    }

    #[test]
    fn array_not_empty() {
        let rules = rules(&[("host_pattern", "array|not_empty")]);
        let validator = InputValidator::new(&rules);

        let empty = Request::builder("r").list_param("host_pattern", Vec::<String>::new()).build();
        assert_eq!(validator.validate(&empty).errors()[0].kind(), FieldErrorKind::Empty);

        let scalar = Request::builder("r").param("host_pattern", "x").build();
        assert_eq!(validator.validate(&scalar).errors()[0].kind(), FieldErrorKind::Type);
    }

    #[test]
    fn fatal_flag_propagates() {
        let rules = rules(&[("dstfrm", "string|fatal"), ("x", "int32")]);
        let validator = InputValidator::new(&rules);

        let request = Request::builder("r").list_param("dstfrm", ["a"]).build();
        assert!(validator.validate(&request).is_fatal());

        let request = Request::builder("r").param("x", "y").build();
        let result = validator.validate(&request);
        assert!(!result.ok());
        assert!(!result.is_fatal());
    }

    #[test]
    fn any_type_keeps_shape() {
        let rules = rules(&[("params", "")]);
        let validator = InputValidator::new(&rules);

        let request = Request::builder("r").list_param("params", ["1", "2"]).build();
        let input = validator.validate(&request).into_input().unwrap();

        assert_eq!(input.list("params"), Some(&["1".to_string(), "2".to_string()][..]));
    }

    #[test]
    fn untyped_field_rejects_control_chars() {
        let rules = rules(&[("params", "")]);
        let validator = InputValidator::new(&rules);

        let scalar = Request::builder("r").param("params", "a\0b").build();
        assert_eq!(
            validator.validate(&scalar).errors()[0].kind(),
            FieldErrorKind::ContainsControlChars
        );

        let list = Request::builder("r").list_param("params", ["ok", "x\ny"]).build();
        assert_eq!(
            validator.validate(&list).errors()[0].kind(),
            FieldErrorKind::ContainsControlChars
        );
    }

    #[test]
    fn untyped_field_obeys_global_length_bound() {
        let rules = rules(&[("params", "required|fatal")]);
        let validator = InputValidator::new(&rules).with_max_string_length(4);

        let long = Request::builder("r").param("params", "abcdefghij").build();
        let result = validator.validate(&long);
        assert_eq!(result.errors()[0].kind(), FieldErrorKind::TooLong);
        assert!(result.is_fatal());

        let short = Request::builder("r").param("params", "abcd").build();
        assert!(validator.validate(&short).ok());
    }

    #[test]
    fn array_items_obey_global_length_bound() {
        let rules = rules(&[("tags", "array")]);
        let validator = InputValidator::new(&rules).with_max_string_length(3);

        let long = Request::builder("r").list_param("tags", ["abc", "abcd"]).build();
        assert_eq!(validator.validate(&long).errors()[0].kind(), FieldErrorKind::TooLong);

        let fits = Request::builder("r").list_param("tags", ["abc", "de"]).build();
        assert!(validator.validate(&fits).ok());
    }
}
