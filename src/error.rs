use std::fmt;

use crate::config::ConfigError;
use crate::validate::RuleError;

/// Errors raised while assembling an application.
///
/// Everything here is startup-fatal: a process that hits one of these
/// should refuse to serve requests. Per-request failures are reported as
/// [`Outcome`](crate::Outcome) variants instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A module or action could not be registered
    #[error(transparent)]
    Registration(#[from] RegistrationError),
    /// An action declared a malformed validation rule
    #[error(transparent)]
    Rule(#[from] RuleError),
    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Failure during module registration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    /// The module has already been registered once
    #[error("module '{module}' is already registered")]
    DuplicateRegistration {
        /// Module id
        module: String,
    },
    /// Another module already routes this action id
    #[error("action '{action}' is already routed")]
    DuplicateAction {
        /// Action id
        action: String,
    },
    /// A registration hook looked up a menu node that does not exist
    #[error("menu node '{name}' not found")]
    MenuNodeNotFound {
        /// Node name that was looked up
        name: String,
    },
    /// A registration hook rejected its own configuration
    #[error("module '{module}' failed to register: {reason}")]
    Hook {
        /// Module id
        module: String,
        /// What went wrong
        reason: String,
    },
}

/// What kind of failure an action handler hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerErrorKind {
    /// Unexpected internal failure
    Internal,
    /// A referenced object does not exist
    NotFound,
    /// The requested change conflicts with current state
    Conflict,
    /// An external collaborator (database, API) failed
    External,
}

impl fmt::Display for HandlerErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerErrorKind::Internal => write!(f, "internal"),
            HandlerErrorKind::NotFound => write!(f, "not found"),
            HandlerErrorKind::Conflict => write!(f, "conflict"),
            HandlerErrorKind::External => write!(f, "external"),
        }
    }
}

/// Structured failure returned by an action handler.
///
/// The message is logged by the pipeline but never shown to the client.
///
/// # Examples
///
/// ```
/// use action_pipeline::{HandlerError, HandlerErrorKind};
///
/// let err = HandlerError::new(HandlerErrorKind::NotFound, "host 10084 does not exist");
/// assert_eq!(err.kind(), HandlerErrorKind::NotFound);
/// assert_eq!(err.to_string(), "not found: host 10084 does not exist");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct HandlerError {
    kind: HandlerErrorKind,
    message: String,
}

impl HandlerError {
    /// Creates a new handler error.
    pub fn new(kind: HandlerErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for an [`HandlerErrorKind::Internal`] error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(HandlerErrorKind::Internal, message)
    }

    /// Returns the error kind.
    pub fn kind(&self) -> HandlerErrorKind {
        self.kind
    }

    /// Returns the detailed message.
    pub fn message(&self) -> &str {
        &self.message
    }
}
