//! Actions: the unit of request handling.
//!
//! An [`Action`] pairs a declarative [`ActionDescriptor`] (id, access flag,
//! capability, parameter rules) with a [`Handler`] that does the work. The
//! pipeline reads the descriptor; only the handler has side effects.

use std::fmt;
use std::sync::Arc;

use crate::capability::Capability;
use crate::error::HandlerError;
use crate::logging::RequestLog;
use crate::request::{Principal, Request};
use crate::response::ResponsePayload;
use crate::session::Session;
use crate::validate::{FieldRules, RuleError, ValidatedInput};

/// Declarative description of an action.
///
/// Whether an action is reachable without logging in is a visible flag set
/// at declaration time: [`ActionDescriptor::new`] creates a protected
/// action, [`ActionDescriptor::public`] a public one. There is no way to
/// switch checks off at request time.
///
/// # Examples
///
/// ```
/// use action_pipeline::ActionDescriptor;
///
/// let action = ActionDescriptor::new("host.update")
///     .capability("hosts.write")
///     .fields([("hostid", "required|db hosts.hostid"), ("name", "string|not_empty")])
///     .unwrap();
///
/// assert!(action.requires_auth());
/// assert_eq!(action.field_rules().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct ActionDescriptor {
    id: String,
    requires_auth: bool,
    capability: Option<Capability>,
    title: Option<String>,
    rules: FieldRules,
}

impl ActionDescriptor {
    /// Declares an action that requires an authenticated principal.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            requires_auth: true,
            capability: None,
            title: None,
            rules: FieldRules::new(),
        }
    }

    /// Declares a public action (diagnostics, login page, ...).
    ///
    /// Public actions skip the principal, capability and CSRF checks.
    pub fn public(id: impl Into<String>) -> Self {
        Self {
            requires_auth: false,
            ..Self::new(id)
        }
    }

    /// Requires `capability` to invoke the action.
    pub fn capability(mut self, capability: impl Into<Capability>) -> Self {
        self.capability = Some(capability.into());
        self
    }

    /// Sets the title used for error responses of this action.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the parameter rules.
    pub fn rules(mut self, rules: FieldRules) -> Self {
        self.rules = rules;
        self
    }

    /// Parses and sets the parameter rules.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError`] if a rule string is malformed.
    pub fn fields<'a, I>(self, fields: I) -> Result<Self, RuleError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        Ok(self.rules(FieldRules::parse(fields)?))
    }

    /// Returns the action id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns `true` unless the action is public.
    pub fn requires_auth(&self) -> bool {
        self.requires_auth
    }

    /// Returns the capability the action requires, if any.
    pub fn required_capability(&self) -> Option<&Capability> {
        self.capability.as_ref()
    }

    /// Returns the error title, if set.
    pub fn error_title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Returns the declared parameter rules.
    pub fn field_rules(&self) -> &FieldRules {
        &self.rules
    }
}

/// Everything a handler may use while executing.
///
/// Built by the pipeline after validation and authorization succeeded;
/// handlers cannot construct one themselves.
pub struct ActionContext<'a> {
    pub(crate) action: &'a ActionDescriptor,
    pub(crate) request: &'a Request,
    pub(crate) input: &'a ValidatedInput,
    pub(crate) principal: Option<&'a Principal>,
    pub(crate) session: Session<'a>,
}

impl<'a> ActionContext<'a> {
    /// Returns the action being executed.
    pub fn action(&self) -> &ActionDescriptor {
        self.action
    }

    /// Returns the raw request.
    pub fn request(&self) -> &Request {
        self.request
    }

    /// Returns the validated parameters.
    pub fn input(&self) -> &ValidatedInput {
        self.input
    }

    /// Returns the principal, `None` only for public actions.
    pub fn principal(&self) -> Option<&Principal> {
        self.principal
    }

    /// Returns the request's session.
    pub fn session(&self) -> Session<'a> {
        self.session
    }

    /// Returns a logger stamped with request and action ids.
    pub fn log(&self) -> RequestLog<'_> {
        RequestLog::new(self.request.request_id(), self.action.id())
    }
}

impl fmt::Debug for ActionContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionContext")
            .field("action", &self.action.id())
            .field("request_id", &self.request.request_id())
            .field("principal", &self.principal.map(|p| &p.id))
            .finish()
    }
}

/// Executes an action's business step.
///
/// Closures of the right shape implement this trait; [`Action::from_fn`]
/// is the convenient way to route one:
///
/// ```
/// use action_pipeline::{Action, ActionDescriptor, ResponsePayload};
///
/// let action = Action::from_fn(ActionDescriptor::new("host.count"), |ctx| {
///     Ok(ResponsePayload::new().title("Hosts").with("count", ctx.input().len()))
/// });
/// assert_eq!(action.id(), "host.count");
/// ```
pub trait Handler: Send + Sync {
    /// Runs the action.
    ///
    /// # Errors
    ///
    /// Returns a [`HandlerError`] on failure; the pipeline logs its detail
    /// and sends the client a generic message.
    fn execute(&self, ctx: &ActionContext<'_>) -> Result<ResponsePayload, HandlerError>;
}

impl<F> Handler for F
where
    F: Fn(&ActionContext<'_>) -> Result<ResponsePayload, HandlerError> + Send + Sync,
{
    fn execute(&self, ctx: &ActionContext<'_>) -> Result<ResponsePayload, HandlerError> {
        self(ctx)
    }
}

/// A routable action: descriptor plus handler.
#[derive(Clone)]
pub struct Action {
    descriptor: ActionDescriptor,
    handler: Arc<dyn Handler>,
}

impl Action {
    /// Pairs a descriptor with its handler.
    pub fn new(descriptor: ActionDescriptor, handler: impl Handler + 'static) -> Self {
        Self {
            descriptor,
            handler: Arc::new(handler),
        }
    }

    /// Pairs a descriptor with a closure handler.
    pub fn from_fn<F>(descriptor: ActionDescriptor, handler: F) -> Self
    where
        F: Fn(&ActionContext<'_>) -> Result<ResponsePayload, HandlerError> + Send + Sync + 'static,
    {
        Self::new(descriptor, handler)
    }

    /// Returns the descriptor.
    pub fn descriptor(&self) -> &ActionDescriptor {
        &self.descriptor
    }

    /// Returns the action id.
    pub fn id(&self) -> &str {
        self.descriptor.id()
    }

    pub(crate) fn handler(&self) -> &dyn Handler {
        self.handler.as_ref()
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}
