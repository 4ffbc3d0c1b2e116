//! Application menu.
//!
//! The menu is built during bootstrap by module registration hooks and is
//! read-only afterwards: [`Application`](crate::Application) only hands out
//! `&Menu`.

use serde::Serialize;

/// One menu item, optionally bound to an action and holding sub-entries.
///
/// # Examples
///
/// ```
/// use action_pipeline::MenuEntry;
///
/// let reports = MenuEntry::new("Reports")
///     .with_entry(MenuEntry::new("System information").action("report.status"))
///     .with_entry(MenuEntry::new("Availability report").action("report.availability"));
///
/// assert_eq!(reports.sub_menu().len(), 2);
/// assert_eq!(
///     reports.sub_menu().find("System information").and_then(|e| e.action_id()),
///     Some("report.status")
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuEntry {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    action: Option<String>,
    #[serde(skip_serializing_if = "SubMenu::is_empty")]
    items: SubMenu,
}

impl MenuEntry {
    /// Creates an entry with no action and no sub-entries.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            action: None,
            items: SubMenu::default(),
        }
    }

    /// Binds the entry to an action id.
    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Appends a sub-entry.
    pub fn with_entry(mut self, entry: MenuEntry) -> Self {
        self.items.add(entry);
        self
    }

    /// Returns the entry name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the bound action id.
    pub fn action_id(&self) -> Option<&str> {
        self.action.as_deref()
    }

    /// Returns the sub-entries.
    pub fn sub_menu(&self) -> &SubMenu {
        &self.items
    }

    /// Returns the sub-entries for modification (registration only).
    pub fn sub_menu_mut(&mut self) -> &mut SubMenu {
        &mut self.items
    }
}

/// An ordered list of menu entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SubMenu {
    entries: Vec<MenuEntry>,
}

impl SubMenu {
    /// Appends an entry and returns it for further nesting.
    pub fn add(&mut self, entry: MenuEntry) -> &mut MenuEntry {
        self.entries.push(entry);
        let last = self.entries.len() - 1;
        &mut self.entries[last]
    }

    /// Inserts an entry right after the entry named `after`.
    ///
    /// Returns `false` and leaves the list unchanged if no such entry exists.
    pub fn insert_after(&mut self, after: &str, entry: MenuEntry) -> bool {
        match self.entries.iter().position(|e| e.name == after) {
            Some(index) => {
                self.entries.insert(index + 1, entry);
                true
            }
            None => false,
        }
    }

    /// Inserts an entry right before the entry named `before`.
    ///
    /// Returns `false` and leaves the list unchanged if no such entry exists.
    pub fn insert_before(&mut self, before: &str, entry: MenuEntry) -> bool {
        match self.entries.iter().position(|e| e.name == before) {
            Some(index) => {
                self.entries.insert(index, entry);
                true
            }
            None => false,
        }
    }

    /// Finds a direct child by name.
    pub fn find(&self, name: &str) -> Option<&MenuEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Finds a direct child by name, mutably.
    pub fn find_mut(&mut self, name: &str) -> Option<&mut MenuEntry> {
        self.entries.iter_mut().find(|e| e.name == name)
    }

    /// Iterates over direct children in order.
    pub fn iter(&self) -> std::slice::Iter<'_, MenuEntry> {
        self.entries.iter()
    }

    /// Number of direct children.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no children.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The application's top-level menu.
///
/// # Examples
///
/// ```
/// use action_pipeline::{Menu, MenuEntry};
///
/// let mut menu = Menu::new();
/// menu.add(MenuEntry::new("Monitoring"));
///
/// menu.find_mut("Monitoring")
///     .unwrap()
///     .sub_menu_mut()
///     .add(MenuEntry::new("Problems").action("problem.view"));
///
/// assert_eq!(menu.find_path(&["Monitoring", "Problems"]).unwrap().action_id(), Some("problem.view"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Menu {
    root: SubMenu,
}

impl Menu {
    /// Creates an empty menu.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a top-level entry.
    pub fn add(&mut self, entry: MenuEntry) -> &mut MenuEntry {
        self.root.add(entry)
    }

    /// Finds a top-level entry by name.
    pub fn find(&self, name: &str) -> Option<&MenuEntry> {
        self.root.find(name)
    }

    /// Finds a top-level entry by name, mutably.
    pub fn find_mut(&mut self, name: &str) -> Option<&mut MenuEntry> {
        self.root.find_mut(name)
    }

    /// Follows a path of entry names from the top level.
    pub fn find_path(&self, path: &[&str]) -> Option<&MenuEntry> {
        let (first, rest) = path.split_first()?;
        rest.iter()
            .try_fold(self.root.find(first)?, |entry, name| entry.items.find(name))
    }

    /// Returns the top-level entries.
    pub fn entries(&self) -> &SubMenu {
        &self.root
    }

    /// Returns the top-level entries for modification (registration only).
    pub fn entries_mut(&mut self) -> &mut SubMenu {
        &mut self.root
    }

    /// Collects every action id bound anywhere in the menu, depth first.
    pub fn action_ids(&self) -> Vec<&str> {
        fn walk<'m>(items: &'m SubMenu, out: &mut Vec<&'m str>) {
            for entry in items.iter() {
                if let Some(action) = entry.action_id() {
                    out.push(action);
                }
                walk(&entry.items, out);
            }
        }

        let mut out = Vec::new();
        walk(&self.root, &mut out);
        out
    }
}
