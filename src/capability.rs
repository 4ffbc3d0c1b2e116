use std::borrow::Cow;
use std::fmt;

/// A named permission an action may require.
///
/// Capabilities are plain names (`"admin"`, `"hosts.write"`); what a
/// principal is allowed to do is decided by the host's
/// [`Authorizer`](crate::Authorizer), not by this type.
///
/// # Examples
///
/// ```
/// use action_pipeline::Capability;
///
/// const ADMIN: Capability = Capability::from_static("admin");
///
/// assert_eq!(ADMIN.name(), "admin");
/// assert_eq!(ADMIN, Capability::new("admin".to_string()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Capability(Cow<'static, str>);

impl Capability {
    /// Creates a capability from a static name, usable in `const` items.
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Creates a capability from an owned name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// Returns the capability name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for Capability {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_and_owned_compare_equal() {
        let a = Capability::from_static("reports.read");
        let b = Capability::new("reports.read");

        assert_eq!(a, b);
        assert_eq!(a.to_string(), "reports.read");
    }

    #[test]
    fn from_str_literal() {
        let cap: Capability = "admin".into();
        assert_eq!(cap.name(), "admin");
    }
}
