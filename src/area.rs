//! Named attachment points of the current page.

use core::cell::RefCell;
use core::fmt;
use std::rc::{Rc, Weak};

use futures::future;
use indexmap::IndexMap;
use tracing::{debug, warn};
use waterpage_dom::Node;

use crate::PageError;
use crate::adapter::AdapterWrapper;

/// Attribute marking an element as a widget area.
pub const AREA_ATTRIBUTE: &str = "ax-widget-area";
/// `data-` variant of [`AREA_ATTRIBUTE`].
pub const DATA_AREA_ATTRIBUTE: &str = "data-ax-widget-area";

/// Scans the descendants of `root` for elements declaring a widget area.
///
/// Returns the area name mapped to its node, in document order. When a name is declared twice the
/// first element wins.
#[must_use]
pub fn find_widget_areas(root: &Node) -> IndexMap<String, Node> {
    root.descendants()
        .into_iter()
        .filter_map(|node| {
            node.attribute(AREA_ATTRIBUTE)
                .or_else(|| node.attribute(DATA_AREA_ATTRIBUTE))
                .map(|name| (name, node))
        })
        .fold(IndexMap::new(), |mut areas, (name, node)| {
            areas.entry(name).or_insert(node);
            areas
        })
}

#[derive(Default)]
struct AreaRegistryInner {
    areas: RefCell<IndexMap<String, Node>>,
}

/// Registry of the areas of one page, shared by the page controller, nested layouts and the
/// visibility collaborator.
#[derive(Clone, Default)]
pub struct AreaRegistry {
    inner: Rc<AreaRegistryInner>,
}

impl AreaRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name` to `node`.
    ///
    /// Registering the same node again is allowed and yields another deregistration handle.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::AreaConflict`] if a different node is registered under `name`.
    pub fn register(&self, name: &str, node: &Node) -> Result<AreaDeregistration, PageError> {
        {
            let mut areas = self.inner.areas.borrow_mut();
            match areas.get(name) {
                Some(existing) if existing != node => {
                    return Err(PageError::AreaConflict(name.to_string()));
                }
                Some(_) => {}
                None => {
                    areas.insert(name.to_string(), node.clone());
                }
            }
        }
        debug!(area = name, "registered widget area");
        Ok(AreaDeregistration {
            registry: Rc::downgrade(&self.inner),
            name: name.to_string(),
            node: node.clone(),
        })
    }

    /// Returns whether `name` is registered.
    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.inner.areas.borrow().contains_key(name)
    }

    /// Returns the node registered for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Node> {
        self.inner.areas.borrow().get(name).cloned()
    }

    /// Returns the registered area names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.inner.areas.borrow().keys().cloned().collect()
    }

    /// Returns the number of registered areas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.areas.borrow().len()
    }

    /// Returns whether no area is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.areas.borrow().is_empty()
    }

    /// Attaches every wrapper to its area, in the order given.
    ///
    /// All templates are awaited first. A wrapper whose area is not registered yet (a sub-area of a
    /// nested layout declared later) is held back and attached as soon as an earlier attachment
    /// registers that area. Wrappers whose area never shows up stay detached and are logged.
    ///
    /// Meant to be called once per page; templates are consumed by the first call.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Template`] if a template fails or was already consumed, and
    /// [`PageError::Attach`] if an adapter rejects its area.
    pub async fn attach_widgets(&self, wrappers: &[Rc<AdapterWrapper>]) -> Result<(), PageError> {
        let templates = future::try_join_all(wrappers.iter().map(|wrapper| {
            let template = wrapper.take_template();
            let id = wrapper.id().to_string();
            async move {
                match template {
                    Some(template) => template
                        .await
                        .map_err(|source| PageError::Template { id, source }),
                    None => Err(PageError::Template {
                        id,
                        source: anyhow::anyhow!("template was already consumed"),
                    }),
                }
            }
        }))
        .await?;

        let mut held_back: Vec<(Rc<AdapterWrapper>, String)> = Vec::new();
        for (wrapper, html) in wrappers.iter().zip(templates) {
            if self.attach(wrapper, &html)? {
                self.attach_held_back(&mut held_back)?;
            } else {
                held_back.push((wrapper.clone(), html));
            }
        }

        for (wrapper, _) in &held_back {
            warn!(
                widget = wrapper.id(),
                area = wrapper.area(),
                "widget area was never registered, widget stays detached"
            );
        }
        Ok(())
    }

    fn attach(&self, wrapper: &AdapterWrapper, html: &str) -> Result<bool, PageError> {
        let Some(node) = self.get(wrapper.area()) else {
            return Ok(false);
        };
        wrapper
            .adapter()
            .dom_attach_to(&node, html)
            .map_err(|source| PageError::Attach {
                id: wrapper.id().to_string(),
                area: wrapper.area().to_string(),
                source,
            })?;
        debug!(widget = wrapper.id(), area = wrapper.area(), "attached widget");
        Ok(true)
    }

    fn attach_held_back(
        &self,
        held_back: &mut Vec<(Rc<AdapterWrapper>, String)>,
    ) -> Result<(), PageError> {
        while let Some(index) = held_back
            .iter()
            .position(|(wrapper, _)| self.exists(wrapper.area()))
        {
            let (wrapper, html) = held_back.remove(index);
            self.attach(&wrapper, &html)?;
        }
        Ok(())
    }
}

impl fmt::Debug for AreaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AreaRegistry")
            .field("areas", &self.names())
            .finish()
    }
}

/// Handle removing one area registration again.
#[must_use = "an area that is never deregistered outlives its page"]
pub struct AreaDeregistration {
    registry: Weak<AreaRegistryInner>,
    name: String,
    node: Node,
}

impl AreaDeregistration {
    /// Returns the registered area name.
    #[must_use]
    pub fn area(&self) -> &str {
        &self.name
    }

    /// Removes the registration if the area still points at the registered node.
    pub fn deregister(self) {
        let Some(inner) = self.registry.upgrade() else {
            return;
        };
        let mut areas = inner.areas.borrow_mut();
        if areas.get(&self.name) == Some(&self.node) {
            areas.shift_remove(&self.name);
            debug!(area = %self.name, "deregistered widget area");
        }
    }
}

impl fmt::Debug for AreaDeregistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AreaDeregistration")
            .field("area", &self.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use core::cell::RefCell;

    use futures::executor::block_on;

    use super::*;
    use crate::adapter::{WidgetAdapter, WidgetConfig};

    type AttachLog = Rc<RefCell<Vec<(String, String)>>>;

    /// Records `(widget, html)` on attach and optionally registers a sub-area like a nested layout.
    struct RecordingAdapter {
        id: String,
        log: AttachLog,
        registers: Option<(AreaRegistry, String)>,
    }

    impl WidgetAdapter for RecordingAdapter {
        fn dom_attach_to(&self, area: &Node, template: &str) -> anyhow::Result<()> {
            self.log
                .borrow_mut()
                .push((self.id.clone(), template.to_string()));
            if let Some((registry, name)) = &self.registers {
                let node = Node::element("div");
                area.append_child(&node)?;
                // Stays registered for the rest of the test.
                core::mem::forget(registry.register(name, &node)?);
            }
            Ok(())
        }

        fn dom_detach(&self) {}

        fn destroy(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn wrapper(
        id: &str,
        area: &str,
        log: &AttachLog,
        registers: Option<(AreaRegistry, String)>,
    ) -> Rc<AdapterWrapper> {
        let adapter = RecordingAdapter {
            id: id.to_string(),
            log: log.clone(),
            registers,
        };
        let html = format!("<p>{id}</p>");
        Rc::new(AdapterWrapper::widget(
            &WidgetConfig::new(id, "w", area),
            Rc::new(adapter),
            async move { Ok(html) },
        ))
    }

    #[test]
    fn finds_areas_in_document_order() {
        let root = Node::element("div");
        root.set_inner_html(
            r#"<div ax-widget-area="a"><span data-ax-widget-area="b"></span></div>
               <div ax-widget-area="a"></div><p></p>"#,
        )
        .unwrap();

        let areas = find_widget_areas(&root);
        assert_eq!(areas.keys().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(areas["a"], root.children()[0]);
    }

    #[test]
    fn register_is_idempotent_for_the_same_node_and_rejects_others() {
        let registry = AreaRegistry::new();
        let node = Node::element("div");

        let first = registry.register("content", &node).unwrap();
        let second = registry.register("content", &node).unwrap();
        assert!(matches!(
            registry.register("content", &Node::element("div")),
            Err(PageError::AreaConflict(name)) if name == "content"
        ));
        assert_eq!(registry.len(), 1);

        first.deregister();
        assert!(!registry.exists("content"));
        second.deregister();
        assert!(registry.is_empty());
    }

    #[test]
    fn stale_deregistration_keeps_a_newer_node() {
        let registry = AreaRegistry::new();
        let old = registry.register("content", &Node::element("div")).unwrap();
        old.deregister();

        let fresh = Node::element("section");
        let _current = registry.register("content", &fresh).unwrap();
        assert_eq!(registry.get("content"), Some(fresh));
    }

    #[test]
    fn attaches_in_input_order() {
        let registry = AreaRegistry::new();
        let _a = registry.register("a", &Node::element("div")).unwrap();
        let _b = registry.register("b", &Node::element("div")).unwrap();
        let log = AttachLog::default();

        let wrappers = vec![
            wrapper("w1", "a", &log, None),
            wrapper("w2", "a", &log, None),
            wrapper("w3", "b", &log, None),
        ];
        block_on(registry.attach_widgets(&wrappers)).unwrap();

        let ids: Vec<_> = log.borrow().iter().map(|(id, _)| id.clone()).collect();
        assert_eq!(ids, ["w1", "w2", "w3"]);
        assert_eq!(log.borrow()[0].1, "<p>w1</p>");
    }

    #[test]
    fn holds_back_widgets_until_their_area_is_registered() {
        let registry = AreaRegistry::new();
        let _root = registry.register("root", &Node::element("div")).unwrap();
        let log = AttachLog::default();

        let wrappers = vec![
            wrapper("inner1", "nested.content", &log, None),
            wrapper("lonely", "nowhere", &log, None),
            wrapper(
                "nested",
                "root",
                &log,
                Some((registry.clone(), "nested.content".into())),
            ),
            wrapper("inner2", "nested.content", &log, None),
        ];
        block_on(registry.attach_widgets(&wrappers)).unwrap();

        let ids: Vec<_> = log.borrow().iter().map(|(id, _)| id.clone()).collect();
        assert_eq!(ids, ["nested", "inner1", "inner2"]);
    }

    #[test]
    fn second_attach_reports_consumed_templates() {
        let registry = AreaRegistry::new();
        let _a = registry.register("a", &Node::element("div")).unwrap();
        let log = AttachLog::default();
        let wrappers = vec![wrapper("w1", "a", &log, None)];

        block_on(registry.attach_widgets(&wrappers)).unwrap();
        assert!(matches!(
            block_on(registry.attach_widgets(&wrappers)),
            Err(PageError::Template { id, .. }) if id == "w1"
        ));
    }
}
