//! Incoming request data and the principal it is made on behalf of.

use std::collections::BTreeMap;
use std::fmt;

use crate::secret::Secret;

/// A raw request parameter value.
///
/// Form and query encodings deliver either a single value (`name=x`) or a
/// list (`name[]=x&name[]=y`); nothing has been checked yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// A single value.
    Scalar(String),
    /// A list of values.
    List(Vec<String>),
}

impl ParamValue {
    /// Returns the scalar value, or `None` for a list.
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            ParamValue::Scalar(s) => Some(s),
            ParamValue::List(_) => None,
        }
    }

    /// Returns the list items, or `None` for a scalar.
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            ParamValue::Scalar(_) => None,
            ParamValue::List(items) => Some(items),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Scalar(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Scalar(s)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(items: Vec<String>) -> Self {
        ParamValue::List(items)
    }
}

/// An incoming request, immutable once built.
///
/// Holds the raw parameters plus the identity token (session id) and the
/// CSRF token sent by the client. Both tokens are [`Secret`]s, so a request
/// can be logged with `{:?}` without leaking them.
///
/// # Examples
///
/// ```
/// use action_pipeline::Request;
///
/// let request = Request::builder("req-1")
///     .param("hostid", "10084")
///     .session_id("4f1b9c")
///     .csrf_token("tok")
///     .build();
///
/// assert_eq!(request.request_id(), "req-1");
/// assert_eq!(request.param("hostid").and_then(|v| v.as_scalar()), Some("10084"));
/// assert!(!format!("{:?}", request).contains("4f1b9c"));
/// ```
pub struct Request {
    request_id: String,
    params: BTreeMap<String, ParamValue>,
    session_id: Option<Secret<String>>,
    csrf_token: Option<Secret<String>>,
}

impl Request {
    /// Starts building a request with the given request id.
    pub fn builder(request_id: impl Into<String>) -> RequestBuilder {
        RequestBuilder {
            request_id: request_id.into(),
            params: BTreeMap::new(),
            session_id: None,
            csrf_token: None,
        }
    }

    /// Returns the request id used for log correlation.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Returns a raw parameter, if present.
    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }

    /// Returns `true` if the parameter is present.
    pub fn has_param(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    /// Iterates over all raw parameters in name order.
    pub fn params(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of raw parameters.
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Returns the session id, if the client sent one.
    pub fn session_id(&self) -> Option<&Secret<String>> {
        self.session_id.as_ref()
    }

    /// Returns the CSRF token, if the client sent one.
    pub fn csrf_token(&self) -> Option<&Secret<String>> {
        self.csrf_token.as_ref()
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("request_id", &self.request_id)
            .field("params", &self.params)
            .field("session_id", &self.session_id)
            .field("csrf_token", &self.csrf_token)
            .finish()
    }
}

/// Builder for [`Request`].
///
/// Host integrations translate their framework's request type into one of
/// these. Later values for the same parameter name replace earlier ones.
#[derive(Debug)]
pub struct RequestBuilder {
    request_id: String,
    params: BTreeMap<String, ParamValue>,
    session_id: Option<Secret<String>>,
    csrf_token: Option<Secret<String>>,
}

impl RequestBuilder {
    /// Adds a parameter.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Adds a list parameter.
    pub fn list_param<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items = values.into_iter().map(Into::into).collect();
        self.params.insert(name.into(), ParamValue::List(items));
        self
    }

    /// Sets the session id.
    pub fn session_id(mut self, sid: impl Into<String>) -> Self {
        self.session_id = Some(Secret::new(sid.into()));
        self
    }

    /// Sets the CSRF token.
    pub fn csrf_token(mut self, token: impl Into<String>) -> Self {
        self.csrf_token = Some(Secret::new(token.into()));
        self
    }

    /// Finishes the request.
    pub fn build(self) -> Request {
        Request {
            request_id: self.request_id,
            params: self.params,
            session_id: self.session_id,
            csrf_token: self.csrf_token,
        }
    }
}

/// Account type of a principal, ordered by privilege.
///
/// Numeric values match the frontend's stored user types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UserType {
    /// Regular user.
    User = 1,
    /// Administrator.
    Admin = 2,
    /// Super administrator.
    SuperAdmin = 3,
}

impl UserType {
    /// Converts a stored numeric user type.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(UserType::User),
            2 => Some(UserType::Admin),
            3 => Some(UserType::SuperAdmin),
            _ => None,
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserType::User => write!(f, "user"),
            UserType::Admin => write!(f, "admin"),
            UserType::SuperAdmin => write!(f, "super_admin"),
        }
    }
}

/// An authenticated user on whose behalf a request runs.
///
/// Supplied by the host's authentication layer; this crate never creates
/// one from request data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Unique identifier for this principal
    pub id: String,
    /// Display name
    pub name: String,
    /// Account type
    pub user_type: UserType,
}

impl Principal {
    /// Creates a principal.
    pub fn new(id: impl Into<String>, name: impl Into<String>, user_type: UserType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            user_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_params() {
        let request = Request::builder("req-1")
            .param("q", "search")
            .list_param("groupids", ["4", "5"])
            .build();

        assert_eq!(request.param_count(), 2);
        assert_eq!(request.param("q"), Some(&ParamValue::from("search")));
        assert_eq!(
            request.param("groupids").and_then(ParamValue::as_list),
            Some(&["4".to_string(), "5".to_string()][..])
        );
        assert!(request.param("missing").is_none());
    }

    #[test]
    fn later_param_replaces_earlier() {
        let request = Request::builder("req-2")
            .param("view", "list")
            .param("view", "grid")
            .build();

        assert_eq!(
            request.param("view").and_then(ParamValue::as_scalar),
            Some("grid")
        );
    }

    #[test]
    fn debug_hides_tokens() {
        let request = Request::builder("req-3")
            .session_id("sid-value-123")
            .csrf_token("csrf-value-456")
            .build();

        let output = format!("{:?}", request);
        assert!(output.contains("req-3"));
        assert!(!output.contains("sid-value-123"));
        assert!(!output.contains("csrf-value-456"));
    }

    #[test]
    fn user_types_are_ordered() {
        assert!(UserType::User < UserType::Admin);
        assert!(UserType::Admin < UserType::SuperAdmin);
        assert_eq!(UserType::from_code(2), Some(UserType::Admin));
        assert_eq!(UserType::from_code(7), None);
    }
}
