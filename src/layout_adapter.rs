//! Presents a layout embedded in another layout's area as a widget.

use core::cell::RefCell;
use core::fmt;

use anyhow::Context as _;
use tracing::debug;
use waterpage_dom::Node;

use crate::adapter::WidgetAdapter;
use crate::area::{AreaDeregistration, AreaRegistry, find_widget_areas};

/// Adapter for a nested layout.
///
/// The first attach builds a `div` carrying the owning widget's id and the layout's class, injects the
/// layout markup and registers its sub-areas as `<id>.<area>`. Later attaches only re-append that node,
/// so the adapter survives re-parenting but never picks up markup changes.
pub struct NestedLayoutAdapter {
    registry: AreaRegistry,
    id: String,
    area: String,
    path: String,
    class_name: String,
    node: RefCell<Option<Node>>,
    deregistrations: RefCell<Vec<AreaDeregistration>>,
}

impl NestedLayoutAdapter {
    /// Creates an adapter for the layout `path` embedded as widget `id` in `area`.
    pub fn new(
        registry: AreaRegistry,
        id: impl Into<String>,
        area: impl Into<String>,
        path: impl Into<String>,
        class_name: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            id: id.into(),
            area: area.into(),
            path: path.into(),
            class_name: class_name.into(),
            node: RefCell::new(None),
            deregistrations: RefCell::new(Vec::new()),
        }
    }

    /// Returns the layout reference this adapter renders.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the container node, once built.
    #[must_use]
    pub fn node(&self) -> Option<Node> {
        self.node.borrow().clone()
    }

    fn build(&self, template: &str) -> anyhow::Result<Node> {
        let node = Node::element("div");
        node.set_id(&self.id);
        node.set_class_name(&self.class_name);
        node.set_inner_html(template)
            .with_context(|| format!("invalid markup in nested layout `{}`", self.path))?;

        for (name, area) in find_widget_areas(&node) {
            let registration = self.registry.register(&format!("{}.{name}", self.id), &area)?;
            self.deregistrations.borrow_mut().push(registration);
        }
        debug!(
            widget = %self.id,
            layout = %self.path,
            areas = self.deregistrations.borrow().len(),
            "built nested layout"
        );
        Ok(node)
    }
}

impl WidgetAdapter for NestedLayoutAdapter {
    fn dom_attach_to(&self, area: &Node, template: &str) -> anyhow::Result<()> {
        let existing = self.node.borrow().clone();
        let node = match existing {
            Some(node) => node,
            None => {
                let node = self.build(template)?;
                *self.node.borrow_mut() = Some(node.clone());
                node
            }
        };
        area.append_child(&node)?;
        Ok(())
    }

    fn dom_detach(&self) {
        if let Some(node) = self.node.borrow().as_ref() {
            node.remove();
        }
    }

    fn destroy(&self) -> anyhow::Result<()> {
        for registration in self.deregistrations.take() {
            registration.deregister();
        }
        self.node.take();
        Ok(())
    }
}

impl fmt::Debug for NestedLayoutAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NestedLayoutAdapter")
            .field("id", &self.id)
            .field("area", &self.area)
            .field("path", &self.path)
            .field("class_name", &self.class_name)
            .finish_non_exhaustive()
    }
}
