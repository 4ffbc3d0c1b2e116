use std::collections::HashMap;

use crate::action::Action;
use crate::error::RegistrationError;

/// Maps action ids to actions.
///
/// Filled during bootstrap, immutable once the application is serving.
#[derive(Debug, Clone, Default)]
pub struct Router {
    actions: HashMap<String, Action>,
}

impl Router {
    /// Creates an empty route table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes an action.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::DuplicateAction`] if the id is taken;
    /// the table is left unchanged.
    pub fn add(&mut self, action: Action) -> Result<(), RegistrationError> {
        if self.actions.contains_key(action.id()) {
            return Err(RegistrationError::DuplicateAction {
                action: action.id().to_string(),
            });
        }
        self.actions.insert(action.id().to_string(), action);
        Ok(())
    }

    /// Looks up an action.
    pub fn get(&self, id: &str) -> Option<&Action> {
        self.actions.get(id)
    }

    /// Returns `true` if the id is routed.
    pub fn contains(&self, id: &str) -> bool {
        self.actions.contains_key(id)
    }

    /// Number of routed actions.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Returns `true` if nothing is routed.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Routed action ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<_> = self.actions.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionDescriptor;
    use crate::response::ResponsePayload;

    fn noop(id: &str) -> Action {
        Action::from_fn(ActionDescriptor::new(id), |_| Ok(ResponsePayload::new()))
    }

    #[test]
    fn add_and_get() {
        let mut router = Router::new();
        router.add(noop("host.list")).unwrap();

        assert!(router.contains("host.list"));
        assert_eq!(router.get("host.list").map(Action::id), Some("host.list"));
        assert!(router.get("host.edit").is_none());
    }

    #[test]
    fn duplicate_is_rejected() {
        let mut router = Router::new();
        router.add(noop("host.list")).unwrap();

        let err = router.add(noop("host.list")).unwrap_err();
        assert_eq!(
            err,
            RegistrationError::DuplicateAction {
                action: "host.list".to_string()
            }
        );
        assert_eq!(router.len(), 1);
    }

    #[test]
    fn ids_are_sorted() {
        let mut router = Router::new();
        router.add(noop("b")).unwrap();
        router.add(noop("a")).unwrap();

        assert_eq!(router.ids(), vec!["a", "b"]);
    }
}
