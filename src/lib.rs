//! Request pipeline for action-based web frontends.
//!
//! Every request names an action. The pipeline runs four stages in order
//! and stops at the first failure:
//!
//! 1. **Validate**: parameters are checked against the action's declared
//!    field rules ([`validate`]).
//! 2. **Authorize**: the principal must hold the action's [`Capability`],
//!    and protected actions must carry the session's anti-forgery token.
//! 3. **Execute**: the action's [`Handler`] runs with an [`ActionContext`].
//! 4. **Render**: the handler's [`ResponsePayload`] goes to the [`Renderer`].
//!
//! Pluggable modules extend the [`Menu`] and route table once, at startup,
//! through [`ModuleDescriptor`] hooks. [`Bootstrap::finish`] then freezes
//! both into an [`Application`] that can be shared across threads.
//!
//! # Core Types
//!
//! - [`ActionDescriptor`]: id, access flag, capability and field rules
//! - [`Application`]: dispatches requests to terminal [`Outcome`]s
//! - [`Bootstrap`]: registers modules and core actions
//! - [`Secret<T>`]: wrapper that redacts session ids and tokens in logs
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use action_pipeline::{
//!     Action, ActionDescriptor, AppConfig, Bootstrap, Outcome, Principal, Request,
//!     ResponsePayload, UserType, UserTypeAuthorizer,
//! };
//!
//! let authorizer = UserTypeAuthorizer::new().min_user_type("admin", UserType::Admin);
//! let mut bootstrap = Bootstrap::new(AppConfig::default(), Arc::new(authorizer)).unwrap();
//! bootstrap
//!     .add_action(Action::from_fn(
//!         ActionDescriptor::new("user.delete")
//!             .capability("admin")
//!             .fields([("id", "required|id")])
//!             .unwrap(),
//!         |ctx| Ok(ResponsePayload::new().with("deleted", ctx.input().id("id"))),
//!     ))
//!     .unwrap();
//! let app = bootstrap.finish();
//!
//! let request = Request::builder("req-1").param("name", "missing-required").build();
//! let alice = Principal::new("7", "Alice", UserType::User);
//!
//! match app.dispatch("user.delete", &request, Some(&alice)) {
//!     Outcome::ValidationFailed { errors, .. } => assert_eq!(errors[0].field(), "id"),
//!     other => panic!("unexpected outcome: {other:?}"),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod action;
mod authz;
mod capability;
pub mod config;
mod error;
mod logging;
mod menu;
mod module;
mod pipeline;
mod render;
mod request;
mod response;
mod router;
mod secret;
mod session;
pub mod telemetry;
pub mod validate;

pub use action::{Action, ActionContext, ActionDescriptor, Handler};
pub use authz::{Authorizer, GrantTable, PermissionChecker, UserTypeAuthorizer};
pub use capability::Capability;
pub use config::{AppConfig, ConfigError};
pub use error::{Error, HandlerError, HandlerErrorKind, RegistrationError};
pub use logging::RequestLog;
pub use menu::{Menu, MenuEntry, SubMenu};
pub use module::{ModuleDescriptor, ModuleRegistry, ModuleState, Registrar};
pub use pipeline::{Application, Bootstrap, Outcome, Rendered, INTERNAL_ERROR_MESSAGE};
pub use render::{JsonRenderer, RenderError, Renderer};
pub use request::{ParamValue, Principal, Request, RequestBuilder, UserType};
pub use response::ResponsePayload;
pub use router::Router;
pub use secret::Secret;
pub use session::{MemorySessionStore, Session, SessionError, SessionStore};
