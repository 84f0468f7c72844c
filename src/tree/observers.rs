//! Observer registration for layered tree events
//!
//! Handlers run synchronously, in registration order, on the thread that
//! triggered the event.

use super::LanguageTree;
use crate::range::Range;
use crate::source::TextEdit;
use std::rc::Rc;
use tree_sitter::Tree;

/// Called after a region is reparsed, with that tree's change list
pub type TreeChangedHandler = Rc<dyn Fn(&[Range], &Tree)>;
/// Called after an edit has shifted every tree, with the node the handler is registered on
pub type BytesHandler = Rc<dyn Fn(&TextEdit, &LanguageTree)>;
/// Called with the child being added or removed
pub type ChildHandler = Rc<dyn Fn(&LanguageTree)>;

/// A set of handlers to register in one call
#[derive(Clone, Default)]
pub struct Observers {
    pub(crate) on_tree_changed: Option<TreeChangedHandler>,
    pub(crate) on_bytes: Option<BytesHandler>,
    pub(crate) on_child_added: Option<ChildHandler>,
    pub(crate) on_child_removed: Option<ChildHandler>,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_tree_changed(mut self, handler: impl Fn(&[Range], &Tree) + 'static) -> Self {
        self.on_tree_changed = Some(Rc::new(handler));
        self
    }

    pub fn on_bytes(mut self, handler: impl Fn(&TextEdit, &LanguageTree) + 'static) -> Self {
        self.on_bytes = Some(Rc::new(handler));
        self
    }

    pub fn on_child_added(mut self, handler: impl Fn(&LanguageTree) + 'static) -> Self {
        self.on_child_added = Some(Rc::new(handler));
        self
    }

    pub fn on_child_removed(mut self, handler: impl Fn(&LanguageTree) + 'static) -> Self {
        self.on_child_removed = Some(Rc::new(handler));
        self
    }
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("on_tree_changed", &self.on_tree_changed.is_some())
            .field("on_bytes", &self.on_bytes.is_some())
            .field("on_child_added", &self.on_child_added.is_some())
            .field("on_child_removed", &self.on_child_removed.is_some())
            .finish()
    }
}

/// Per-event handler lists held by one node
#[derive(Default)]
pub(crate) struct ObserverSet {
    pub(crate) tree_changed: Vec<TreeChangedHandler>,
    pub(crate) bytes: Vec<BytesHandler>,
    pub(crate) child_added: Vec<ChildHandler>,
    pub(crate) child_removed: Vec<ChildHandler>,
    /// Registrations that every child created later inherits
    pub(crate) recursive: Vec<Observers>,
}

impl ObserverSet {
    pub(crate) fn add(&mut self, observers: &Observers) {
        self.tree_changed.extend(observers.on_tree_changed.clone());
        self.bytes.extend(observers.on_bytes.clone());
        self.child_added.extend(observers.on_child_added.clone());
        self.child_removed.extend(observers.on_child_removed.clone());
    }

    pub(crate) fn tree_changed(&self, changes: &[Range], tree: &Tree) {
        for handler in &self.tree_changed {
            handler(changes, tree);
        }
    }

    pub(crate) fn child_added(&self, child: &LanguageTree) {
        for handler in &self.child_added {
            handler(child);
        }
    }

    pub(crate) fn child_removed(&self, child: &LanguageTree) {
        for handler in &self.child_removed {
            handler(child);
        }
    }
}
