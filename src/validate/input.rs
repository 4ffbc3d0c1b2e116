//! Validated, normalised request input.

use indexmap::IndexMap;

/// A parameter value that passed its field rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputValue {
    /// A string (leading/trailing whitespace preserved).
    Str(String),
    /// A 32-bit integer.
    Int(i32),
    /// An identifier with leading zeros removed.
    Id(u64),
    /// A list of strings.
    List(Vec<String>),
    /// A list of identifiers.
    Ids(Vec<u64>),
}

/// Request parameters that passed validation.
///
/// Only fields declared in the action's [`FieldRules`](super::FieldRules)
/// are present; extras sent by the client are dropped. A `ValidatedInput`
/// can only be produced by [`InputValidator`](super::InputValidator), so a
/// handler holding one knows every value in it was checked.
///
/// ```compile_fail
/// use action_pipeline::validate::ValidatedInput;
///
/// // No public constructor:
/// let input = ValidatedInput { values: Default::default() };
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedInput {
    values: IndexMap<String, InputValue>,
}

impl ValidatedInput {
    pub(crate) fn new(values: IndexMap<String, InputValue>) -> Self {
        Self { values }
    }

    /// Returns `true` if the field was sent and validated.
    pub fn has(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    /// Returns the raw validated value.
    pub fn get(&self, field: &str) -> Option<&InputValue> {
        self.values.get(field)
    }

    /// Returns a string field.
    pub fn str(&self, field: &str) -> Option<&str> {
        match self.values.get(field)? {
            InputValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns a string field, or `default` if it was not sent.
    pub fn str_or<'a>(&'a self, field: &str, default: &'a str) -> &'a str {
        self.str(field).unwrap_or(default)
    }

    /// Returns an integer field.
    pub fn int(&self, field: &str) -> Option<i32> {
        match self.values.get(field)? {
            InputValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns an identifier field.
    pub fn id(&self, field: &str) -> Option<u64> {
        match self.values.get(field)? {
            InputValue::Id(id) => Some(*id),
            _ => None,
        }
    }

    /// Returns a list field.
    pub fn list(&self, field: &str) -> Option<&[String]> {
        match self.values.get(field)? {
            InputValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns an identifier list field.
    pub fn ids(&self, field: &str) -> Option<&[u64]> {
        match self.values.get(field)? {
            InputValue::Ids(ids) => Some(ids),
            _ => None,
        }
    }

    /// Iterates over validated fields in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &InputValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of validated fields.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no declared field was sent.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
