//! The request pipeline: Validate -> Authorize -> Execute -> Render.
//!
//! [`Bootstrap`] owns everything that may change at startup (menu, routes,
//! module states). [`Bootstrap::finish`] consumes it and freezes that state
//! into an [`Application`], which only reads it. Because registration needs
//! `&mut Bootstrap` and dispatch needs an `Application`, no request can run
//! before registration is over.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, info_span, warn};

use crate::action::{Action, ActionContext, ActionDescriptor};
use crate::authz::{Authorizer, PermissionChecker};
use crate::config::{AppConfig, ConfigError};
use crate::error::RegistrationError;
use crate::menu::Menu;
use crate::module::{ModuleDescriptor, ModuleRegistry, ModuleState};
use crate::render::{JsonRenderer, Renderer};
use crate::request::{Principal, Request};
use crate::response::ResponsePayload;
use crate::router::Router;
use crate::session::{MemorySessionStore, Session, SessionStore};
use crate::validate::{FieldError, InputValidator};

/// Message shown to the client for any handler or render failure.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error.";

const NOT_FOUND_TITLE: &str = "Page not found";
const VALIDATION_TITLE: &str = "Cannot process request";
const FORBIDDEN_TITLE: &str = "Access denied";
const FORBIDDEN_MESSAGE: &str = "No permissions to referred object or it does not exist!";
const FATAL_MESSAGE: &str = "Invalid request.";

/// A successfully rendered response.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    body: Vec<u8>,
    content_type: &'static str,
    payload: ResponsePayload,
}

impl Rendered {
    /// Returns the rendered body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Returns the body's MIME type.
    pub fn content_type(&self) -> &'static str {
        self.content_type
    }

    /// Returns the payload the handler produced.
    pub fn payload(&self) -> &ResponsePayload {
        &self.payload
    }

    /// Consumes the response, returning the body.
    pub fn into_body(self) -> Vec<u8> {
        self.body
    }
}

/// Terminal outcome of one dispatch.
///
/// Exactly one variant per request; only [`Outcome::Rendered`] involved
/// the renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Every stage passed.
    Rendered(Rendered),
    /// No action is routed under the requested id.
    NotFound,
    /// One or more parameters failed validation.
    ValidationFailed {
        /// Field errors in declaration order.
        errors: Vec<FieldError>,
        /// A field marked `fatal` failed.
        fatal: bool,
    },
    /// The caller may not invoke the action.
    Forbidden,
    /// The handler or renderer failed; the detail is only in the logs.
    HandlerFailed {
        /// Client-facing message.
        message: String,
    },
}

impl Outcome {
    /// Returns `true` for [`Outcome::Rendered`].
    pub fn is_rendered(&self) -> bool {
        matches!(self, Self::Rendered(_))
    }

    /// Returns the rendered response, if any.
    pub fn rendered(&self) -> Option<&Rendered> {
        match self {
            Self::Rendered(rendered) => Some(rendered),
            _ => None,
        }
    }

    /// Builds the fixed error shape for a failure outcome.
    ///
    /// Returns `None` for [`Outcome::Rendered`]. Otherwise the payload is
    /// `{"title": .., "data": {"error": {"title": .., "messages": [..]}}}`.
    /// A fatal validation failure carries one generic message and no
    /// field detail.
    ///
    /// ```
    /// use action_pipeline::Outcome;
    /// use serde_json::json;
    ///
    /// let payload = Outcome::Forbidden.error_payload().unwrap();
    /// assert_eq!(payload.get("error").unwrap()["title"], json!("Access denied"));
    /// ```
    pub fn error_payload(&self) -> Option<ResponsePayload> {
        self.titled_error_payload(None)
    }

    fn titled_error_payload(&self, title: Option<&str>) -> Option<ResponsePayload> {
        let payload = match self {
            Self::Rendered(_) => return None,
            Self::NotFound => ResponsePayload::error(NOT_FOUND_TITLE, [NOT_FOUND_TITLE]),
            Self::ValidationFailed { fatal: true, .. } => {
                ResponsePayload::error(title.unwrap_or(VALIDATION_TITLE), [FATAL_MESSAGE])
            }
            Self::ValidationFailed { errors, .. } => ResponsePayload::error(
                title.unwrap_or(VALIDATION_TITLE),
                errors.iter().map(FieldError::message),
            ),
            Self::Forbidden => ResponsePayload::error(FORBIDDEN_TITLE, [FORBIDDEN_MESSAGE]),
            Self::HandlerFailed { message } => {
                ResponsePayload::error(title.unwrap_or(INTERNAL_ERROR_MESSAGE), [message.as_str()])
            }
        };
        Some(payload)
    }

    fn handler_failed() -> Self {
        Self::HandlerFailed {
            message: INTERNAL_ERROR_MESSAGE.to_string(),
        }
    }
}

/// Startup-time application builder.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use action_pipeline::{
///     Action, ActionDescriptor, AppConfig, Bootstrap, GrantTable, ModuleDescriptor,
///     Request, ResponsePayload,
/// };
///
/// let ping = ModuleDescriptor::new("ping", |reg| {
///     reg.add_action(Action::from_fn(ActionDescriptor::public("system.ping"), |_| {
///         Ok(ResponsePayload::new().with("pong", true))
///     }))
/// });
///
/// let mut bootstrap = Bootstrap::new(AppConfig::default(), Arc::new(GrantTable::new())).unwrap();
/// bootstrap.register_all([&ping]).unwrap();
/// let app = bootstrap.finish();
///
/// let outcome = app.dispatch("system.ping", &Request::builder("r1").build(), None);
/// assert_eq!(outcome.rendered().unwrap().body(), br#"{"data":{"pong":true}}"#);
/// ```
pub struct Bootstrap {
    config: AppConfig,
    registry: ModuleRegistry,
    authorizer: Arc<dyn Authorizer>,
    sessions: Arc<dyn SessionStore>,
    renderer: Arc<dyn Renderer>,
}

impl Bootstrap {
    /// Starts a bootstrap with an empty menu, an in-memory session store
    /// and a JSON renderer.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `config` fails
    /// [`AppConfig::validate`].
    pub fn new(config: AppConfig, authorizer: Arc<dyn Authorizer>) -> Result<Self, ConfigError> {
        config.validate()?;
        let renderer = if config.render.pretty {
            JsonRenderer::pretty()
        } else {
            JsonRenderer::new()
        };
        Ok(Self {
            config,
            registry: ModuleRegistry::default(),
            authorizer,
            sessions: Arc::new(MemorySessionStore::new()),
            renderer: Arc::new(renderer),
        })
    }

    /// Replaces the session store.
    pub fn session_store(mut self, sessions: Arc<dyn SessionStore>) -> Self {
        self.sessions = sessions;
        self
    }

    /// Replaces the renderer.
    pub fn renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Returns the menu for core (non-module) entries.
    pub fn menu_mut(&mut self) -> &mut Menu {
        self.registry.menu_mut()
    }

    /// Routes a core action that belongs to no module.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::DuplicateAction`] if the id is taken.
    pub fn add_action(&mut self, action: Action) -> Result<(), RegistrationError> {
        self.registry.router_mut().add(action)
    }

    /// Registers one module. See [`ModuleRegistry::register`].
    ///
    /// # Errors
    ///
    /// Returns the registration error; menu and routes are unchanged.
    pub fn register(&mut self, module: &ModuleDescriptor) -> Result<(), RegistrationError> {
        self.registry.register(module)
    }

    /// Registers modules in order, stopping at the first error.
    ///
    /// # Errors
    ///
    /// Returns the first registration error.
    pub fn register_all<'m, I>(&mut self, modules: I) -> Result<(), RegistrationError>
    where
        I: IntoIterator<Item = &'m ModuleDescriptor>,
    {
        self.registry.register_all(modules)
    }

    /// Returns the state of a module.
    pub fn state(&self, module_id: &str) -> ModuleState {
        self.registry.state(module_id)
    }

    /// Returns the menu as built so far.
    pub fn menu(&self) -> &Menu {
        self.registry.menu()
    }

    /// Freezes menu and routes and returns the serving application.
    pub fn finish(self) -> Application {
        let (menu, router, modules) = self.registry.into_parts();
        info!(
            modules = modules.len(),
            actions = router.len(),
            "application ready"
        );
        Application {
            menu: Arc::new(menu),
            router: Arc::new(router),
            modules: modules.into(),
            authorizer: self.authorizer,
            sessions: self.sessions,
            renderer: self.renderer,
            csrf_key: self.config.session.csrf_key,
            max_string_length: self.config.validation.max_string_length,
        }
    }
}

impl fmt::Debug for Bootstrap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bootstrap")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// The serving application.
///
/// Cheap to clone and safe to share between threads; every dispatch only
/// reads the frozen menu and routes.
#[derive(Clone)]
pub struct Application {
    menu: Arc<Menu>,
    router: Arc<Router>,
    modules: Arc<[String]>,
    authorizer: Arc<dyn Authorizer>,
    sessions: Arc<dyn SessionStore>,
    renderer: Arc<dyn Renderer>,
    csrf_key: String,
    max_string_length: usize,
}

impl Application {
    /// Processes one request to a terminal outcome.
    ///
    /// Stages run in order and stop at the first failure. The handler runs
    /// only if validation and authorization passed; the renderer only if
    /// the handler succeeded.
    pub fn dispatch(&self, action_id: &str, request: &Request, principal: Option<&Principal>) -> Outcome {
        let span = info_span!(
            "dispatch",
            request_id = %request.request_id(),
            action = %action_id,
        );
        let _entered = span.enter();

        let Some(action) = self.router.get(action_id) else {
            debug!("no such action");
            return Outcome::NotFound;
        };
        let descriptor = action.descriptor();

        let validation = InputValidator::new(descriptor.field_rules())
            .with_max_string_length(self.max_string_length)
            .validate(request);
        let fatal = validation.is_fatal();
        let input = match validation.into_input() {
            Ok(input) => input,
            Err(errors) => {
                debug!(
                    fields = ?errors.iter().map(FieldError::field).collect::<Vec<_>>(),
                    fatal,
                    "validation failed"
                );
                return Outcome::ValidationFailed { errors, fatal };
            }
        };

        let session = Session::new(
            self.sessions.as_ref(),
            request.session_id().map(|sid| sid.expose_secret().as_str()),
        );

        if !PermissionChecker::new(self.authorizer.as_ref()).authorize(principal, descriptor) {
            warn!(
                principal = principal.map(|p| p.id.as_str()),
                capability = descriptor.required_capability().map(|c| c.name()),
                "permission denied"
            );
            return Outcome::Forbidden;
        }
        if descriptor.requires_auth() && !self.csrf_token_valid(request, session) {
            warn!("anti-forgery token missing or mismatched");
            return Outcome::Forbidden;
        }

        let ctx = ActionContext {
            action: descriptor,
            request,
            input: &input,
            principal,
            session,
        };
        let payload = match action.handler().execute(&ctx) {
            Ok(payload) => payload,
            Err(err) => {
                error!(kind = %err.kind(), error = %err.message(), "handler failed");
                return Outcome::handler_failed();
            }
        };

        match self.renderer.render(&payload) {
            Ok(body) => {
                debug!(bytes = body.len(), "rendered");
                Outcome::Rendered(Rendered {
                    body,
                    content_type: self.renderer.content_type(),
                    payload,
                })
            }
            Err(err) => {
                error!(error = %err, "render failed");
                Outcome::handler_failed()
            }
        }
    }

    /// Builds the error payload for `outcome`, titled with the action's
    /// error title when it has one.
    pub fn error_payload(&self, action_id: &str, outcome: &Outcome) -> Option<ResponsePayload> {
        let title = self.action(action_id).and_then(ActionDescriptor::error_title);
        outcome.titled_error_payload(title)
    }

    /// Returns the frozen menu.
    pub fn menu(&self) -> &Menu {
        &self.menu
    }

    /// Looks up a routed action's descriptor.
    pub fn action(&self, action_id: &str) -> Option<&ActionDescriptor> {
        self.router.get(action_id).map(Action::descriptor)
    }

    /// Routed action ids, sorted.
    pub fn action_ids(&self) -> Vec<&str> {
        self.router.ids()
    }

    /// Ids of registered modules, in registration order.
    pub fn modules(&self) -> &[String] {
        &self.modules
    }

    fn csrf_token_valid(&self, request: &Request, session: Session<'_>) -> bool {
        let Some(token) = request.csrf_token() else {
            return false;
        };
        match session.get(&self.csrf_key) {
            Some(serde_json::Value::String(expected)) => token.matches(expected),
            _ => false,
        }
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("modules", &self.modules)
            .field("actions", &self.router.ids())
            .field("csrf_key", &self.csrf_key)
            .field("max_string_length", &self.max_string_length)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::UserTypeAuthorizer;
    use crate::error::HandlerError;
    use crate::render::RenderError;
    use crate::request::UserType;
    use serde_json::json;

    struct FailingRenderer;

    impl Renderer for FailingRenderer {
        fn render(&self, _payload: &ResponsePayload) -> Result<Vec<u8>, RenderError> {
            Err(RenderError::View("template missing".to_string()))
        }
    }

    fn admin() -> Principal {
        Principal::new("1", "Admin", UserType::SuperAdmin)
    }

    fn bootstrap() -> Bootstrap {
        let authorizer = UserTypeAuthorizer::new().min_user_type("admin", UserType::Admin);
        let mut bootstrap = Bootstrap::new(AppConfig::default(), Arc::new(authorizer)).unwrap();
        bootstrap
            .add_action(Action::from_fn(
                ActionDescriptor::public("echo")
                    .fields([("text", "string")])
                    .unwrap(),
                |ctx| Ok(ResponsePayload::new().with("text", ctx.input().str_or("text", ""))),
            ))
            .unwrap();
        bootstrap
            .add_action(Action::from_fn(
                ActionDescriptor::new("host.delete").capability("admin").title("Cannot delete host"),
                |_| Err(HandlerError::internal("db down")),
            ))
            .unwrap();
        bootstrap
    }

    fn signed(sessions: &MemorySessionStore) -> Request {
        sessions.set("sid", "csrf_token", json!("tok")).unwrap();
        Request::builder("r").session_id("sid").csrf_token("tok").build()
    }

    #[test]
    fn application_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Application>();
    }

    #[test]
    fn unknown_action_is_not_found() {
        let app = bootstrap().finish();
        let outcome = app.dispatch("nope", &Request::builder("r").build(), None);

        assert_eq!(outcome, Outcome::NotFound);
        assert!(outcome.error_payload().is_some());
    }

    #[test]
    fn public_action_renders() {
        let app = bootstrap().finish();
        let request = Request::builder("r").param("text", "hi").build();

        let outcome = app.dispatch("echo", &request, None);
        let rendered = outcome.rendered().expect("rendered");

        assert_eq!(rendered.content_type(), "application/json");
        assert_eq!(rendered.body(), br#"{"data":{"text":"hi"}}"#);
        assert!(outcome.error_payload().is_none());
    }

    #[test]
    fn handler_detail_is_not_leaked() {
        let sessions = Arc::new(MemorySessionStore::new());
        let app = bootstrap().session_store(sessions.clone()).finish();
        let request = signed(&sessions);

        let outcome = app.dispatch("host.delete", &request, Some(&admin()));

        assert_eq!(
            outcome,
            Outcome::HandlerFailed {
                message: INTERNAL_ERROR_MESSAGE.to_string()
            }
        );
        let payload = app.error_payload("host.delete", &outcome).unwrap();
        assert_eq!(
            payload.get("error"),
            Some(&json!({"title": "Cannot delete host", "messages": ["Internal server error."]}))
        );
    }

    #[test]
    fn render_failure_is_handler_failure() {
        let app = bootstrap().renderer(Arc::new(FailingRenderer)).finish();

        let outcome = app.dispatch("echo", &Request::builder("r").build(), None);

        assert!(matches!(outcome, Outcome::HandlerFailed { .. }));
    }

    #[test]
    fn protected_action_needs_csrf_token() {
        let sessions = Arc::new(MemorySessionStore::new());
        let app = bootstrap().session_store(sessions.clone()).finish();
        sessions.set("sid", "csrf_token", json!("tok")).unwrap();

        let missing = Request::builder("r").session_id("sid").build();
        let wrong = Request::builder("r").session_id("sid").csrf_token("tik").build();
        let no_session = Request::builder("r").csrf_token("tok").build();

        for request in [missing, wrong, no_session] {
            assert_eq!(app.dispatch("host.delete", &request, Some(&admin())), Outcome::Forbidden);
        }
    }

    #[test]
    fn custom_csrf_key() {
        let mut config = AppConfig::default();
        config.session.csrf_key = "_sid".to_string();
        let sessions = Arc::new(MemorySessionStore::new());
        let authorizer = UserTypeAuthorizer::new().min_user_type("admin", UserType::Admin);
        let mut bootstrap = Bootstrap::new(config, Arc::new(authorizer))
            .unwrap()
            .session_store(sessions.clone());
        bootstrap
            .add_action(Action::from_fn(ActionDescriptor::new("whoami"), |ctx| {
                Ok(ResponsePayload::new().with("name", ctx.principal().map(|p| p.name.clone())))
            }))
            .unwrap();
        let app = bootstrap.finish();

        sessions.set("sid", "_sid", json!("abc")).unwrap();
        let request = Request::builder("r").session_id("sid").csrf_token("abc").build();

        assert!(app.dispatch("whoami", &request, Some(&admin())).is_rendered());
    }

    #[test]
    fn max_string_length_comes_from_config() {
        let mut config = AppConfig::default();
        config.validation.max_string_length = 3;
        let mut bootstrap = Bootstrap::new(config, Arc::new(UserTypeAuthorizer::new())).unwrap();
        bootstrap
            .add_action(Action::from_fn(
                ActionDescriptor::public("echo").fields([("text", "string")]).unwrap(),
                |_| Ok(ResponsePayload::new()),
            ))
            .unwrap();
        let app = bootstrap.finish();

        let outcome = app.dispatch("echo", &Request::builder("r").param("text", "abcd").build(), None);

        assert!(matches!(outcome, Outcome::ValidationFailed { .. }));
    }

    #[test]
    fn error_payload_shapes() {
        let forbidden = Outcome::Forbidden.error_payload().unwrap();
        assert_eq!(forbidden.title_str(), Some("Access denied"));

        let failed = Outcome::ValidationFailed {
            errors: Vec::new(),
            fatal: false,
        }
        .error_payload()
        .unwrap();
        assert_eq!(
            failed.get("error"),
            Some(&json!({"title": "Cannot process request", "messages": []}))
        );
    }

    #[test]
    fn fatal_validation_hides_field_detail() {
        let mut bootstrap =
            Bootstrap::new(AppConfig::default(), Arc::new(UserTypeAuthorizer::new())).unwrap();
        bootstrap
            .add_action(Action::from_fn(
                ActionDescriptor::public("popup.generic")
                    .fields([("srctbl", "required|string|fatal|in hosts,items")])
                    .unwrap(),
                |_| Ok(ResponsePayload::new()),
            ))
            .unwrap();
        let app = bootstrap.finish();

        let request = Request::builder("r").param("srctbl", "users").build();
        let outcome = app.dispatch("popup.generic", &request, None);

        assert!(matches!(outcome, Outcome::ValidationFailed { fatal: true, .. }));
        let payload = outcome.error_payload().unwrap();
        assert_eq!(
            payload.get("error"),
            Some(&json!({"title": "Cannot process request", "messages": ["Invalid request."]}))
        );
        assert!(!serde_json::to_string(&payload).unwrap().contains("srctbl"));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = AppConfig::default();
        config.session.csrf_key = String::new();
        let err = Bootstrap::new(config, Arc::new(UserTypeAuthorizer::new())).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("csrf_key")));

        let mut config = AppConfig::default();
        config.validation.max_string_length = 0;
        assert!(Bootstrap::new(config, Arc::new(UserTypeAuthorizer::new())).is_err());
    }
}
