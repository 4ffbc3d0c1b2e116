use std::fmt;

/// A request credential that must never show up in logs.
///
/// Session identifiers and CSRF tokens travel with every [`Request`](crate::Request)
/// and the request is logged in several places, so both are wrapped in
/// `Secret<T>`. Formatting always prints `[REDACTED]`.
///
/// # Examples
///
/// ```
/// use action_pipeline::Secret;
///
/// let sid = Secret::new("a1b2c3d4".to_string());
///
/// assert_eq!(format!("{:?}", sid), "[REDACTED]");
/// assert_eq!(format!("{}", sid), "[REDACTED]");
/// assert_eq!(sid.expose_secret(), "a1b2c3d4");
/// ```
// Do NOT add Clone, Copy or Default derives, and keep `inner` private.
pub struct Secret<T> {
    inner: T,
}

impl<T> Secret<T> {
    /// Wraps a sensitive value.
    pub fn new(value: T) -> Self {
        Self { inner: value }
    }

    /// Explicitly exposes the wrapped value.
    ///
    /// Never pass the result to a logger.
    pub fn expose_secret(&self) -> &T {
        &self.inner
    }
}

impl<T: AsRef<[u8]>> Secret<T> {
    /// Compares the secret against `candidate` without short-circuiting on
    /// the first differing byte.
    ///
    /// ```
    /// use action_pipeline::Secret;
    ///
    /// let token = Secret::new("f00d".to_string());
    /// assert!(token.matches("f00d"));
    /// assert!(!token.matches("f00e"));
    /// ```
    pub fn matches(&self, candidate: impl AsRef<[u8]>) -> bool {
        let a = self.inner.as_ref();
        let b = candidate.as_ref();
        if a.len() != b.len() {
            return false;
        }
        a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
    }
}

impl<T> fmt::Debug for Secret<T> {
    // Must unconditionally print "[REDACTED]" (CWE-532).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl<T> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}
