//! Information about the displayed page for developer tooling.

use core::cell::{Cell, RefCell};
use core::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::page::PageDefinition;

/// Snapshot of what tooling knows about the application's pages.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// Reference of the page currently displayed.
    pub page_reference: Option<String>,
    /// Definition of every page visited so far.
    pub page_definitions: IndexMap<String, PageDefinition>,
    /// Descriptor of every widget referenced so far.
    pub widget_descriptors: IndexMap<String, Value>,
}

/// Identifies a listener added with [`PageTooling::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ToolingListenerId(u64);

type Listener = Rc<dyn Fn(&PageInfo)>;

#[derive(Default)]
struct ToolingInner {
    info: RefCell<PageInfo>,
    listeners: RefCell<Vec<(ToolingListenerId, Listener)>>,
    next_id: Cell<u64>,
}

/// Shared page information store. Clones observe the same state.
#[derive(Clone, Default)]
pub struct PageTooling {
    inner: Rc<ToolingInner>,
}

impl PageTooling {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the current page information.
    #[must_use]
    pub fn current(&self) -> PageInfo {
        self.inner.info.borrow().clone()
    }

    /// Adds a listener called with a snapshot whenever the current page changes.
    pub fn add_listener(&self, listener: impl Fn(&PageInfo) + 'static) -> ToolingListenerId {
        let id = ToolingListenerId(self.inner.next_id.get());
        self.inner.next_id.set(id.0 + 1);
        self.inner
            .listeners
            .borrow_mut()
            .push((id, Rc::new(listener)));
        id
    }

    /// Removes a listener. Unknown ids are ignored.
    pub fn remove_listener(&self, id: ToolingListenerId) {
        self.inner
            .listeners
            .borrow_mut()
            .retain(|(candidate, _)| *candidate != id);
    }

    /// Records the definition of page `reference`.
    pub fn set_page_definition(&self, reference: &str, page: &PageDefinition) {
        self.inner
            .info
            .borrow_mut()
            .page_definitions
            .insert(reference.to_string(), page.clone());
    }

    /// Records the descriptor of widget `reference`.
    pub fn set_widget_descriptor(&self, reference: &str, descriptor: Value) {
        self.inner
            .info
            .borrow_mut()
            .widget_descriptors
            .insert(reference.to_string(), descriptor);
    }

    /// Marks `reference` as the displayed page and notifies listeners.
    pub fn set_current_page(&self, reference: &str) {
        self.inner.info.borrow_mut().page_reference = Some(reference.to_string());

        let snapshot = self.current();
        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(&snapshot);
        }
    }
}

impl fmt::Debug for PageTooling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageTooling")
            .field("info", &*self.inner.info.borrow())
            .field("listeners", &self.inner.listeners.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn listeners_receive_snapshots_on_page_change() {
        let tooling = PageTooling::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = seen.clone();
        let id = tooling.add_listener(move |info| sink.borrow_mut().push(info.clone()));

        let page = PageDefinition {
            layout: "default".into(),
            ..PageDefinition::default()
        };
        tooling.set_page_definition("editor", &page);
        assert!(seen.borrow().is_empty());

        tooling.set_current_page("editor");
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(seen.borrow()[0].page_reference.as_deref(), Some("editor"));
        assert_eq!(seen.borrow()[0].page_definitions["editor"], page);

        tooling.remove_listener(id);
        tooling.set_current_page("other");
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(tooling.current().page_reference.as_deref(), Some("other"));
    }

    #[test]
    fn listeners_may_read_the_store() {
        let tooling = PageTooling::new();
        let reader = tooling.clone();
        let matched = Rc::new(Cell::new(false));
        let flag = matched.clone();
        tooling.add_listener(move |info| flag.set(reader.current() == *info));

        tooling.set_current_page("editor");
        assert!(matched.get());
    }

    #[test]
    fn serializes_for_tooling_clients() {
        let tooling = PageTooling::new();
        tooling.set_widget_descriptor("someWidgetRef1", json!({ "name": "some-widget" }));
        tooling.set_current_page("editor");

        assert_eq!(
            serde_json::to_value(tooling.current()).unwrap(),
            json!({
                "pageReference": "editor",
                "pageDefinitions": {},
                "widgetDescriptors": { "someWidgetRef1": { "name": "some-widget" } }
            })
        );
    }
}
