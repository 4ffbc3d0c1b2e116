//! Permission checking.
//!
//! [`PermissionChecker`] makes the per-request allow/deny decision for an
//! action. What a principal may do is answered by an [`Authorizer`], the
//! host's authorization collaborator.

use std::collections::{HashMap, HashSet};

use crate::action::ActionDescriptor;
use crate::capability::Capability;
use crate::request::{Principal, UserType};

/// Answers whether a principal holds a capability.
///
/// Implementations are shared by every concurrent request and must be
/// safe for concurrent reads.
pub trait Authorizer: Send + Sync {
    /// Returns `true` if `principal` holds `capability`.
    fn can(&self, principal: &Principal, capability: &Capability) -> bool;
}

impl<A: Authorizer + ?Sized> Authorizer for std::sync::Arc<A> {
    fn can(&self, principal: &Principal, capability: &Capability) -> bool {
        (**self).can(principal, capability)
    }
}

/// Decides whether a principal may invoke an action.
///
/// The decision has no side effects and depends only on the action's
/// `requires_auth` flag, its declared capability and the [`Authorizer`]:
///
/// | `requires_auth` | principal | capability | result                 |
/// |-----------------|-----------|------------|------------------------|
/// | `false`         | any       | any        | allowed                |
/// | `true`          | none      | any        | denied                 |
/// | `true`          | some      | none       | allowed                |
/// | `true`          | some      | some       | `authorizer.can(..)`   |
///
/// # Examples
///
/// ```
/// use action_pipeline::{
///     ActionDescriptor, Capability, PermissionChecker, Principal, UserType, UserTypeAuthorizer,
/// };
///
/// let authorizer = UserTypeAuthorizer::new().min_user_type("admin", UserType::Admin);
/// let checker = PermissionChecker::new(&authorizer);
///
/// let action = ActionDescriptor::new("user.delete").capability("admin");
/// let user = Principal::new("1", "guest", UserType::User);
/// let admin = Principal::new("2", "Admin", UserType::SuperAdmin);
///
/// assert!(!checker.authorize(Some(&user), &action));
/// assert!(checker.authorize(Some(&admin), &action));
/// assert!(!checker.authorize(None, &action));
/// ```
#[derive(Clone, Copy)]
pub struct PermissionChecker<'a> {
    authorizer: &'a dyn Authorizer,
}

impl<'a> PermissionChecker<'a> {
    /// Creates a checker backed by `authorizer`.
    pub fn new(authorizer: &'a dyn Authorizer) -> Self {
        Self { authorizer }
    }

    /// Returns `true` if `principal` may invoke `action`.
    pub fn authorize(&self, principal: Option<&Principal>, action: &ActionDescriptor) -> bool {
        if !action.requires_auth() {
            return true;
        }
        let Some(principal) = principal else {
            return false;
        };
        match action.required_capability() {
            None => true,
            Some(capability) => self.authorizer.can(principal, capability),
        }
    }
}

/// Grants capabilities by minimum [`UserType`].
///
/// Mirrors the frontend's account levels: an action requiring `"admin"`
/// mapped to [`UserType::Admin`] is open to admins and super admins.
/// Capabilities with no mapping are denied.
#[derive(Debug, Clone, Default)]
pub struct UserTypeAuthorizer {
    min_types: HashMap<Capability, UserType>,
}

impl UserTypeAuthorizer {
    /// Creates an authorizer with no mappings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires at least `user_type` for `capability`.
    pub fn min_user_type(mut self, capability: impl Into<Capability>, user_type: UserType) -> Self {
        self.min_types.insert(capability.into(), user_type);
        self
    }
}

impl Authorizer for UserTypeAuthorizer {
    fn can(&self, principal: &Principal, capability: &Capability) -> bool {
        self.min_types
            .get(capability)
            .is_some_and(|min| principal.user_type >= *min)
    }
}

/// Grants capabilities to individual principals by id.
///
/// # Examples
///
/// ```
/// use action_pipeline::{Authorizer, Capability, GrantTable, Principal, UserType};
///
/// let grants = GrantTable::new().grant("42", "reports.read");
/// let alice = Principal::new("42", "Alice", UserType::User);
///
/// assert!(grants.can(&alice, &Capability::from_static("reports.read")));
/// assert!(!grants.can(&alice, &Capability::from_static("reports.write")));
/// ```
#[derive(Debug, Clone, Default)]
pub struct GrantTable {
    grants: HashMap<String, HashSet<Capability>>,
}

impl GrantTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grants `capability` to the principal with id `principal_id`.
    pub fn grant(mut self, principal_id: impl Into<String>, capability: impl Into<Capability>) -> Self {
        self.grants
            .entry(principal_id.into())
            .or_default()
            .insert(capability.into());
        self
    }
}

impl Authorizer for GrantTable {
    fn can(&self, principal: &Principal, capability: &Capability) -> bool {
        self.grants
            .get(&principal.id)
            .is_some_and(|caps| caps.contains(capability))
    }
}
