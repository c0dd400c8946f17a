//! Widget adapters and the wrappers the page controller manages them through.
//!
//! Plain widgets and nested layouts share one shape: a wrapper is resolved, its template becomes
//! ready, it is attached to an area node, and finally destroyed. The controller never special-cases
//! nested layouts beyond resolving them.

use core::cell::RefCell;
use core::fmt;
use std::rc::Rc;

use futures::future::{self, LocalBoxFuture};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use waterpage_dom::Node;

/// Per-beat view reconciliation of a widget, invoked by the heartbeat listener.
pub type ViewChanges = Rc<dyn Fn() + 'static>;

/// Pending HTML template of a widget.
pub type Template = LocalBoxFuture<'static, anyhow::Result<String>>;

/// Configuration handed to the widget loader for one widget instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetConfig {
    /// Unique id of the widget instance on its page.
    pub id: String,
    /// Reference to the widget implementation.
    pub widget: String,
    /// Area the widget is attached to.
    pub area: String,
    /// Feature configuration, passed through untouched.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub features: Map<String, Value>,
}

impl WidgetConfig {
    /// Creates a configuration without features.
    pub fn new(id: impl Into<String>, widget: impl Into<String>, area: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            widget: widget.into(),
            area: area.into(),
            features: Map::new(),
        }
    }
}

/// DOM-facing capabilities of one widget instance.
pub trait WidgetAdapter {
    /// Instantiates the widget's controller. Adapters without business logic keep the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the controller cannot be created.
    fn create_controller(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Attaches the widget's DOM to `area`, rendering `template` on the first call.
    ///
    /// # Errors
    ///
    /// Returns an error if the template cannot be rendered or attached.
    fn dom_attach_to(&self, area: &Node, template: &str) -> anyhow::Result<()>;

    /// Detaches the widget's DOM from its area. Must be safe when not attached.
    fn dom_detach(&self);

    /// Releases everything the adapter holds.
    ///
    /// # Errors
    ///
    /// Returns an error if cleanup failed; the page controller keeps destroying the remaining widgets.
    fn destroy(&self) -> anyhow::Result<()>;
}

/// What a wrapper stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WrapperKind {
    /// A regular widget produced by the widget loader.
    Widget,
    /// A layout embedded in an area of another layout.
    NestedLayout,
}

/// A resolved widget or nested layout, owned by the page controller for the lifetime of one page.
pub struct AdapterWrapper {
    id: String,
    area: String,
    kind: WrapperKind,
    adapter: Rc<dyn WidgetAdapter>,
    view_changes: Option<ViewChanges>,
    template: RefCell<Option<Template>>,
}

impl AdapterWrapper {
    /// Wraps a widget adapter. `template` resolves to the widget's HTML.
    pub fn widget(
        config: &WidgetConfig,
        adapter: Rc<dyn WidgetAdapter>,
        template: impl Future<Output = anyhow::Result<String>> + 'static,
    ) -> Self {
        Self {
            id: config.id.clone(),
            area: config.area.clone(),
            kind: WrapperKind::Widget,
            adapter,
            view_changes: None,
            template: RefCell::new(Some(Box::pin(template))),
        }
    }

    /// Wraps a nested layout adapter whose HTML is already known.
    pub(crate) fn nested_layout(
        id: impl Into<String>,
        area: impl Into<String>,
        adapter: Rc<dyn WidgetAdapter>,
        html: String,
    ) -> Self {
        Self {
            id: id.into(),
            area: area.into(),
            kind: WrapperKind::NestedLayout,
            adapter,
            view_changes: None,
            template: RefCell::new(Some(Box::pin(future::ready(Ok(html))))),
        }
    }

    /// Adds per-beat view reconciliation.
    #[must_use]
    pub fn with_view_changes(mut self, view_changes: impl Fn() + 'static) -> Self {
        self.view_changes = Some(Rc::new(view_changes));
        self
    }

    /// Adds a shared reconciliation function; wrappers sharing one are reconciled once per beat.
    #[must_use]
    pub fn with_shared_view_changes(mut self, view_changes: ViewChanges) -> Self {
        self.view_changes = Some(view_changes);
        self
    }

    /// Returns the widget instance id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the target area name.
    #[must_use]
    pub fn area(&self) -> &str {
        &self.area
    }

    /// Returns whether this is a widget or a nested layout.
    #[must_use]
    pub const fn kind(&self) -> WrapperKind {
        self.kind
    }

    /// Returns the wrapped adapter.
    #[must_use]
    pub fn adapter(&self) -> &Rc<dyn WidgetAdapter> {
        &self.adapter
    }

    /// Returns the reconciliation function, if the widget has one.
    #[must_use]
    pub const fn view_changes(&self) -> Option<&ViewChanges> {
        self.view_changes.as_ref()
    }

    /// Takes the pending template. A wrapper is attached once, so later calls return `None`.
    pub(crate) fn take_template(&self) -> Option<Template> {
        self.template.borrow_mut().take()
    }

    /// Destroys the wrapped adapter.
    ///
    /// # Errors
    ///
    /// Propagates the adapter's destroy error.
    pub fn destroy(&self) -> anyhow::Result<()> {
        self.adapter.destroy()
    }
}

impl fmt::Debug for AdapterWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterWrapper")
            .field("id", &self.id)
            .field("area", &self.area)
            .field("kind", &self.kind)
            .field("view_changes", &self.view_changes.is_some())
            .field("template_pending", &self.template.borrow().is_some())
            .finish_non_exhaustive()
    }
}

/// Collects the distinct reconciliation functions of `wrappers`, keeping first-seen order.
pub(crate) fn collect_view_changes(wrappers: &[Rc<AdapterWrapper>]) -> Vec<ViewChanges> {
    wrappers
        .iter()
        .filter_map(|wrapper| wrapper.view_changes().cloned())
        .fold(Vec::new(), |mut collected, candidate| {
            if !collected.iter().any(|seen| Rc::ptr_eq(seen, &candidate)) {
                collected.push(candidate);
            }
            collected
        })
}
