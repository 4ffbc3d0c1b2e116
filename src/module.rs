//! Pluggable modules and their one-time registration.
//!
//! A module is a [`ModuleDescriptor`]: an id plus a registration hook. At
//! bootstrap every module is passed once to [`ModuleRegistry::register`],
//! whose hook may attach menu entries and route actions through a
//! [`Registrar`]. Each module moves `Unregistered -> Registered` exactly
//! once; a second attempt is [`RegistrationError::DuplicateRegistration`].

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::action::Action;
use crate::error::RegistrationError;
use crate::menu::{Menu, MenuEntry};
use crate::router::Router;

type RegisterHook = dyn Fn(&mut Registrar<'_>) -> Result<(), RegistrationError> + Send + Sync;

/// Registration state of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    /// Not registered yet.
    Unregistered,
    /// Registered; the menu and routes contain its contributions.
    Registered,
}

/// A pluggable unit and its registration hook.
///
/// # Examples
///
/// ```
/// use action_pipeline::{Action, ActionDescriptor, MenuEntry, ModuleDescriptor, ResponsePayload};
///
/// let geomap = ModuleDescriptor::new("geomap", |reg| {
///     reg.menu_node("Monitoring")?
///         .sub_menu_mut()
///         .add(MenuEntry::new("Geomap").action("geomap.view"));
///     reg.add_action(Action::from_fn(ActionDescriptor::new("geomap.view"), |_| {
///         Ok(ResponsePayload::new().title("Geomap"))
///     }))
/// });
///
/// assert_eq!(geomap.id(), "geomap");
/// ```
#[derive(Clone)]
pub struct ModuleDescriptor {
    id: String,
    hook: Arc<RegisterHook>,
}

impl ModuleDescriptor {
    /// Creates a descriptor from an id and a registration hook.
    pub fn new<F>(id: impl Into<String>, hook: F) -> Self
    where
        F: Fn(&mut Registrar<'_>) -> Result<(), RegistrationError> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            hook: Arc::new(hook),
        }
    }

    /// Returns the module id.
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// What a registration hook may change.
///
/// Only exists while a hook runs; after bootstrap nothing can obtain one,
/// which is what makes the menu read-only at request time.
pub struct Registrar<'a> {
    module: &'a str,
    menu: &'a mut Menu,
    router: &'a mut Router,
}

impl<'a> Registrar<'a> {
    /// Returns the id of the module being registered.
    pub fn module_id(&self) -> &str {
        self.module
    }

    /// Returns the menu for modification.
    pub fn menu_mut(&mut self) -> &mut Menu {
        self.menu
    }

    /// Finds a top-level menu node.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::MenuNodeNotFound`] if no such node exists.
    pub fn menu_node(&mut self, name: &str) -> Result<&mut MenuEntry, RegistrationError> {
        self.menu
            .find_mut(name)
            .ok_or_else(|| RegistrationError::MenuNodeNotFound {
                name: name.to_string(),
            })
    }

    /// Routes an action contributed by the module.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::DuplicateAction`] if the id is taken.
    pub fn add_action(&mut self, action: Action) -> Result<(), RegistrationError> {
        debug!(module = %self.module, action = %action.id(), "routing action");
        self.router.add(action)
    }
}

/// Registers modules into a menu and route table.
///
/// A hook runs against staged copies of the menu and route table, which
/// replace the live ones only if the hook succeeds; a failed or duplicate
/// registration leaves both exactly as they were.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    menu: Menu,
    router: Router,
    registered: Vec<String>,
}

impl ModuleRegistry {
    /// Creates a registry over an initial menu and route table.
    pub fn new(menu: Menu, router: Router) -> Self {
        Self {
            menu,
            router,
            registered: Vec::new(),
        }
    }

    /// Returns the state of a module.
    pub fn state(&self, module_id: &str) -> ModuleState {
        if self.registered.iter().any(|id| id == module_id) {
            ModuleState::Registered
        } else {
            ModuleState::Unregistered
        }
    }

    /// Registers one module.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::DuplicateRegistration`] if the module
    /// is already registered, or whatever error the hook returns. Either
    /// way the menu and route table are unchanged.
    pub fn register(&mut self, module: &ModuleDescriptor) -> Result<(), RegistrationError> {
        if self.state(module.id()) == ModuleState::Registered {
            warn!(module = %module.id(), "duplicate module registration");
            return Err(RegistrationError::DuplicateRegistration {
                module: module.id().to_string(),
            });
        }

        let mut menu = self.menu.clone();
        let mut router = self.router.clone();
        let mut registrar = Registrar {
            module: module.id(),
            menu: &mut menu,
            router: &mut router,
        };

        (module.hook)(&mut registrar).inspect_err(|err| {
            warn!(module = %module.id(), error = %err, "module registration failed");
        })?;

        self.menu = menu;
        self.router = router;
        self.registered.push(module.id().to_string());
        info!(module = %module.id(), actions = self.router.len(), "module registered");
        Ok(())
    }

    /// Registers modules in order, stopping at the first error.
    ///
    /// # Errors
    ///
    /// Returns the first registration error; modules before it stay
    /// registered.
    pub fn register_all<'m, I>(&mut self, modules: I) -> Result<(), RegistrationError>
    where
        I: IntoIterator<Item = &'m ModuleDescriptor>,
    {
        modules.into_iter().try_for_each(|module| self.register(module))
    }

    /// Returns the current menu.
    pub fn menu(&self) -> &Menu {
        &self.menu
    }

    /// Returns the current route table.
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Ids of registered modules, in registration order.
    pub fn registered(&self) -> &[String] {
        &self.registered
    }

    pub(crate) fn menu_mut(&mut self) -> &mut Menu {
        &mut self.menu
    }

    pub(crate) fn router_mut(&mut self) -> &mut Router {
        &mut self.router
    }

    pub(crate) fn into_parts(self) -> (Menu, Router, Vec<String>) {
        (self.menu, self.router, self.registered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionDescriptor;
    use crate::response::ResponsePayload;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn base_menu() -> Menu {
        let mut menu = Menu::new();
        menu.add(MenuEntry::new("Reports"));
        menu
    }

    fn reports_module(id: &str, entry: &'static str, action: &'static str) -> ModuleDescriptor {
        ModuleDescriptor::new(id, move |reg| {
            reg.menu_node("Reports")?
                .sub_menu_mut()
                .add(MenuEntry::new(entry).action(action));
            reg.add_action(Action::from_fn(ActionDescriptor::new(action), |_| {
                Ok(ResponsePayload::new())
            }))
        })
    }

    #[test]
    fn registers_once() {
        let mut registry = ModuleRegistry::new(base_menu(), Router::new());
        let module = reports_module("top", "Top hosts", "report.top");

        assert_eq!(registry.state("top"), ModuleState::Unregistered);
        registry.register(&module).unwrap();
        assert_eq!(registry.state("top"), ModuleState::Registered);

        assert!(registry.router().contains("report.top"));
        assert_eq!(
            registry
                .menu()
                .find_path(&["Reports", "Top hosts"])
                .and_then(MenuEntry::action_id),
            Some("report.top")
        );
    }

    #[test]
    fn duplicate_registration_leaves_menu_unchanged() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let module = ModuleDescriptor::new("counter", move |reg| {
            counter.fetch_add(1, Ordering::SeqCst);
            reg.menu_mut().add(MenuEntry::new("Extra"));
            Ok(())
        });

        let mut registry = ModuleRegistry::default();
        registry.register(&module).unwrap();
        let menu_before = registry.menu().clone();

        let err = registry.register(&module).unwrap_err();

        assert_eq!(
            err,
            RegistrationError::DuplicateRegistration {
                module: "counter".to_string()
            }
        );
        assert_eq!(registry.menu(), &menu_before);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.registered(), &["counter".to_string()]);
    }

    #[test]
    fn failing_hook_is_rolled_back() {
        let module = ModuleDescriptor::new("half", |reg| {
            reg.menu_mut().add(MenuEntry::new("Partial"));
            reg.add_action(Action::from_fn(ActionDescriptor::new("half.view"), |_| {
                Ok(ResponsePayload::new())
            }))?;
            reg.menu_node("Missing").map(|_| ())
        });

        let mut registry = ModuleRegistry::new(base_menu(), Router::new());
        let err = registry.register(&module).unwrap_err();

        assert_eq!(
            err,
            RegistrationError::MenuNodeNotFound {
                name: "Missing".to_string()
            }
        );
        assert_eq!(registry.menu(), &base_menu());
        assert!(registry.router().is_empty());
        assert_eq!(registry.state("half"), ModuleState::Unregistered);
    }

    #[test]
    fn conflicting_action_ids() {
        let mut registry = ModuleRegistry::new(base_menu(), Router::new());
        let first = reports_module("a", "A", "report.shared");
        let second = reports_module("b", "B", "report.shared");

        let err = registry.register_all([&first, &second]).unwrap_err();

        assert!(matches!(err, RegistrationError::DuplicateAction { .. }));
        assert_eq!(registry.registered(), &["a".to_string()]);
        assert!(registry.menu().find_path(&["Reports", "B"]).is_none());
    }

    #[test]
    fn registrar_exposes_module_id() {
        let module = ModuleDescriptor::new("inspect", |reg| {
            assert_eq!(reg.module_id(), "inspect");
            Ok(())
        });

        let mut registry = ModuleRegistry::default();
        registry.register(&module).unwrap();
    }
}
