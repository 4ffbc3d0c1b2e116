//! Field rule language.
//!
//! A rule is a `|`-separated list of tokens, e.g. `"required|string|in host,template"`.
//! Rules are parsed once, when an action is declared, so a typo in a rule
//! fails at startup instead of on the first request.

use indexmap::IndexMap;

/// Largest identifier accepted by `id` fields.
pub const MAX_ID: u64 = 9_223_372_036_854_775_807;

/// Error in a rule string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    /// A token is not part of the rule language
    #[error("field '{field}': unknown rule token '{token}'")]
    UnknownToken {
        /// Field the rule belongs to
        field: String,
        /// Offending token
        token: String,
    },
    /// A token that needs an argument was given none
    #[error("field '{field}': rule '{token}' requires an argument")]
    MissingArgument {
        /// Field the rule belongs to
        field: String,
        /// Offending token
        token: String,
    },
    /// A token's argument could not be parsed
    #[error("field '{field}': invalid argument '{argument}' for rule '{token}'")]
    InvalidArgument {
        /// Field the rule belongs to
        field: String,
        /// Offending token
        token: String,
        /// The argument as written
        argument: String,
    },
    /// More than one type token was given
    #[error("field '{field}': conflicting type rules '{first}' and '{second}'")]
    ConflictingTypes {
        /// Field the rule belongs to
        field: String,
        /// Type declared first
        first: &'static str,
        /// Type declared second
        second: &'static str,
    },
    /// A token does not apply to the field's type
    #[error("field '{field}': rule '{token}' cannot be used with type '{ty}'")]
    IncompatibleToken {
        /// Field the rule belongs to
        field: String,
        /// Offending token
        token: String,
        /// Resolved field type
        ty: &'static str,
    },
    /// The same field was declared twice
    #[error("field '{field}' is declared twice")]
    DuplicateField {
        /// Field name
        field: String,
    },
}

/// Expected shape of a field's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Anything, scalar or list, unchecked.
    Any,
    /// A scalar string.
    String,
    /// A signed 32-bit integer.
    Int32,
    /// An unsigned database identifier.
    Id,
    /// A list of strings.
    Array,
    /// A list of identifiers.
    ArrayId,
}

impl FieldType {
    /// Rule-language name of the type.
    pub fn name(self) -> &'static str {
        match self {
            FieldType::Any => "any",
            FieldType::String => "string",
            FieldType::Int32 => "int32",
            FieldType::Id => "id",
            FieldType::Array => "array",
            FieldType::ArrayId => "array_id",
        }
    }
}

/// One entry of an `in` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InOption {
    /// An exact value.
    Value(String),
    /// An inclusive integer range, open on a missing side (`5:`, `:10`).
    Range(Option<i64>, Option<i64>),
}

/// Parsed rule for a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRule {
    pub(crate) ty: FieldType,
    pub(crate) required: bool,
    pub(crate) fatal: bool,
    pub(crate) not_empty: bool,
    pub(crate) allowed: Option<Vec<InOption>>,
    pub(crate) min: Option<i64>,
    pub(crate) max: Option<i64>,
    pub(crate) max_len: Option<usize>,
}

impl FieldRule {
    /// Parses a rule string for `field`.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError`] for unknown tokens, missing or bad arguments,
    /// conflicting types and tokens that do not fit the resolved type.
    ///
    /// # Examples
    ///
    /// ```
    /// use action_pipeline::validate::{FieldRule, FieldType};
    ///
    /// let rule = FieldRule::parse("context", "required|string|in host,template").unwrap();
    /// assert!(rule.is_required());
    /// assert_eq!(rule.field_type(), FieldType::String);
    ///
    /// assert!(FieldRule::parse("x", "reqired").is_err());
    /// ```
    pub fn parse(field: &str, rule: &str) -> Result<Self, RuleError> {
        let mut ty: Option<FieldType> = None;
        let mut parsed = FieldRule {
            ty: FieldType::Any,
            required: false,
            fatal: false,
            not_empty: false,
            allowed: None,
            min: None,
            max: None,
            max_len: None,
        };

        for raw in rule.split('|') {
            let token = raw.trim();
            if token.is_empty() {
                continue;
            }

            let (keyword, argument) = match token.split_once(' ') {
                Some((k, a)) => (k, Some(a.trim())),
                None => (token, None),
            };

            match keyword {
                "required" => parsed.required = true,
                "fatal" => parsed.fatal = true,
                "not_empty" => parsed.not_empty = true,
                "string" => set_type(field, &mut ty, FieldType::String)?,
                "int32" => set_type(field, &mut ty, FieldType::Int32)?,
                "id" => set_type(field, &mut ty, FieldType::Id)?,
                "array" => set_type(field, &mut ty, FieldType::Array)?,
                "array_id" => set_type(field, &mut ty, FieldType::ArrayId)?,
                "db" => {
                    let target = require_arg(field, keyword, argument)?;
                    let valid = target
                        .split_once('.')
                        .is_some_and(|(table, column)| !table.is_empty() && !column.is_empty());
                    if !valid {
                        return Err(invalid_arg(field, keyword, target));
                    }
                    set_type(field, &mut ty, FieldType::Id)?;
                }
                "in" => {
                    let list = require_arg(field, keyword, argument)?;
                    parsed.allowed = Some(parse_in(field, list)?);
                }
                "ge" => {
                    let arg = require_arg(field, keyword, argument)?;
                    parsed.min = Some(arg.parse().map_err(|_| invalid_arg(field, keyword, arg))?);
                }
                "le" => {
                    let arg = require_arg(field, keyword, argument)?;
                    parsed.max = Some(arg.parse().map_err(|_| invalid_arg(field, keyword, arg))?);
                }
                "length" => {
                    let arg = require_arg(field, keyword, argument)?;
                    let len: usize = arg.parse().map_err(|_| invalid_arg(field, keyword, arg))?;
                    if len == 0 {
                        return Err(invalid_arg(field, keyword, arg));
                    }
                    parsed.max_len = Some(len);
                }
                _ => {
                    return Err(RuleError::UnknownToken {
                        field: field.to_string(),
                        token: token.to_string(),
                    })
                }
            }
        }

        parsed.ty = match ty {
            Some(t) => t,
            None if parsed.min.is_some() || parsed.max.is_some() => FieldType::Int32,
            None if parsed.allowed.is_some() || parsed.not_empty || parsed.max_len.is_some() => {
                FieldType::String
            }
            None => FieldType::Any,
        };

        parsed.check_compatible(field)?;
        Ok(parsed)
    }

    fn check_compatible(&self, field: &str) -> Result<(), RuleError> {
        let incompatible = |token: &str| RuleError::IncompatibleToken {
            field: field.to_string(),
            token: token.to_string(),
            ty: self.ty.name(),
        };

        if (self.min.is_some() || self.max.is_some()) && self.ty != FieldType::Int32 {
            return Err(incompatible(if self.min.is_some() { "ge" } else { "le" }));
        }
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(incompatible("ge"));
            }
        }
        if self.max_len.is_some() && self.ty != FieldType::String {
            return Err(incompatible("length"));
        }
        if let Some(allowed) = &self.allowed {
            match self.ty {
                FieldType::String | FieldType::Any => {
                    if allowed.iter().any(|o| matches!(o, InOption::Range(..))) {
                        return Err(incompatible("in"));
                    }
                }
                FieldType::Int32 => {
                    let numeric = allowed.iter().all(|o| match o {
                        InOption::Value(v) => v.parse::<i64>().is_ok(),
                        InOption::Range(..) => true,
                    });
                    if !numeric {
                        return Err(incompatible("in"));
                    }
                }
                _ => return Err(incompatible("in")),
            }
        }
        if self.not_empty && matches!(self.ty, FieldType::Int32 | FieldType::Id) {
            return Err(incompatible("not_empty"));
        }
        Ok(())
    }

    /// Returns the resolved value type.
    pub fn field_type(&self) -> FieldType {
        self.ty
    }

    /// Returns `true` if the field must be present.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Returns `true` if a failure of this field is fatal.
    pub fn is_fatal(&self) -> bool {
        self.fatal
    }
}

fn set_type(field: &str, slot: &mut Option<FieldType>, ty: FieldType) -> Result<(), RuleError> {
    match slot {
        Some(existing) if *existing != ty => Err(RuleError::ConflictingTypes {
            field: field.to_string(),
            first: existing.name(),
            second: ty.name(),
        }),
        _ => {
            *slot = Some(ty);
            Ok(())
        }
    }
}

fn require_arg<'a>(
    field: &str,
    token: &str,
    argument: Option<&'a str>,
) -> Result<&'a str, RuleError> {
    match argument {
        Some(arg) if !arg.is_empty() => Ok(arg),
        _ => Err(RuleError::MissingArgument {
            field: field.to_string(),
            token: token.to_string(),
        }),
    }
}

fn invalid_arg(field: &str, token: &str, argument: &str) -> RuleError {
    RuleError::InvalidArgument {
        field: field.to_string(),
        token: token.to_string(),
        argument: argument.to_string(),
    }
}

fn parse_in(field: &str, list: &str) -> Result<Vec<InOption>, RuleError> {
    list.split(',')
        .map(|item| {
            let Some((lo, hi)) = item.split_once(':') else {
                return Ok(InOption::Value(item.to_string()));
            };
            let bound = |s: &str| -> Result<Option<i64>, RuleError> {
                if s.is_empty() {
                    Ok(None)
                } else {
                    s.parse().map(Some).map_err(|_| invalid_arg(field, "in", item))
                }
            };
            match (bound(lo)?, bound(hi)?) {
                (None, None) => Err(invalid_arg(field, "in", item)),
                (Some(l), Some(h)) if l >= h => Err(invalid_arg(field, "in", item)),
                (l, h) => Ok(InOption::Range(l, h)),
            }
        })
        .collect()
}

/// The declared parameters of one action, in declaration order.
///
/// # Examples
///
/// ```
/// use action_pipeline::validate::FieldRules;
///
/// let rules = FieldRules::parse([
///     ("hostid", "required|db hosts.hostid"),
///     ("filter_name", "string"),
///     ("page", "ge 1"),
/// ])
/// .unwrap();
///
/// assert_eq!(rules.len(), 3);
/// assert!(rules.get("hostid").unwrap().is_required());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldRules {
    rules: IndexMap<String, FieldRule>,
}

impl FieldRules {
    /// Creates an empty rule set; an action with no declared parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `(field, rule)` pairs.
    ///
    /// # Errors
    ///
    /// Returns the first [`RuleError`] encountered, including
    /// [`RuleError::DuplicateField`] when a field appears twice.
    pub fn parse<'a, I>(fields: I) -> Result<Self, RuleError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        fields
            .into_iter()
            .try_fold(Self::new(), |rules, (field, rule)| rules.field(field, rule))
    }

    /// Adds one field.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError`] if the rule does not parse or the field is
    /// already declared.
    pub fn field(mut self, field: &str, rule: &str) -> Result<Self, RuleError> {
        if self.rules.contains_key(field) {
            return Err(RuleError::DuplicateField {
                field: field.to_string(),
            });
        }
        let parsed = FieldRule::parse(field, rule)?;
        self.rules.insert(field.to_string(), parsed);
        Ok(self)
    }

    /// Returns the rule for a field.
    pub fn get(&self, field: &str) -> Option<&FieldRule> {
        self.rules.get(field)
    }

    /// Iterates over fields in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldRule)> {
        self.rules.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of declared fields.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` if no fields are declared.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
