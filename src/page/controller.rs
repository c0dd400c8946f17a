use core::cell::{Cell, RefCell};
use core::fmt;
use std::rc::Rc;

use futures::future;
use futures_timer::Delay;
use serde_json::{Value, json};
use tracing::{Instrument as _, debug, info, info_span, warn};
use waterpage_dom::Node;
use waterpage_heartbeat::ListenerRegistration;

use super::{Collaborators, LayoutInfo, PageName, PageState, WidgetReference, WidgetSource};
use crate::PageError;
use crate::adapter::{AdapterWrapper, ViewChanges, WidgetConfig, collect_view_changes};
use crate::area::{AREA_ATTRIBUTE, AreaDeregistration, AreaRegistry, find_widget_areas};
use crate::collaborator::PublishOptions;
use crate::config::PageConfig;
use crate::error::DestroyFailures;
use crate::layout_adapter::NestedLayoutAdapter;
use crate::tooling::PageTooling;

/// Areas every page has. Hidden ones are synthesized with `display: none`.
const DEFAULT_AREAS: [(&str, bool); 3] = [
    ("activities", true),
    ("popups", false),
    ("popovers", false),
];

/// Undoes what rendering the root layout did to the host element.
#[must_use = "dropping the cleanup leaves the layout areas registered"]
pub struct LayoutCleanup {
    element: Node,
    class_name: String,
    deregistrations: Vec<AreaDeregistration>,
}

impl LayoutCleanup {
    /// Deregisters the layout areas and removes the layout class.
    pub fn run(self) {
        let areas = self.deregistrations.len();
        for registration in self.deregistrations {
            registration.deregister();
        }
        if !self.class_name.is_empty() {
            self.element.remove_class(&self.class_name);
        }
        debug!(areas, class = %self.class_name, "cleaned up layout");
    }
}

impl fmt::Debug for LayoutCleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutCleanup")
            .field("class_name", &self.class_name)
            .field("areas", &self.deregistrations.len())
            .finish_non_exhaustive()
    }
}

/// Sets up and tears down one page inside a host element.
///
/// A controller displays a single page. After teardown it is [`PageState::Released`] and a new
/// controller has to be created for the next page.
pub struct PageController {
    element: Node,
    collaborators: Rc<Collaborators>,
    config: PageConfig,
    tooling: PageTooling,
    state: Cell<PageState>,
    registry: RefCell<Option<AreaRegistry>>,
    active: RefCell<Vec<Rc<AdapterWrapper>>>,
    view_changes: Rc<RefCell<Vec<ViewChanges>>>,
    listener: RefCell<Option<ListenerRegistration>>,
    layout_cleanup: RefCell<Option<LayoutCleanup>>,
}

impl PageController {
    pub(crate) fn new(
        element: Node,
        collaborators: Rc<Collaborators>,
        config: PageConfig,
        tooling: PageTooling,
    ) -> Self {
        Self {
            element,
            collaborators,
            config,
            tooling,
            state: Cell::new(PageState::Idle),
            registry: RefCell::new(None),
            active: RefCell::new(Vec::new()),
            view_changes: Rc::new(RefCell::new(Vec::new())),
            listener: RefCell::new(None),
            layout_cleanup: RefCell::new(None),
        }
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub fn state(&self) -> PageState {
        self.state.get()
    }

    /// Returns the host element.
    #[must_use]
    pub const fn element(&self) -> &Node {
        &self.element
    }

    /// Returns the area registry of the page being set up or displayed.
    #[must_use]
    pub fn area_registry(&self) -> Option<AreaRegistry> {
        self.registry.borrow().clone()
    }

    /// Returns the ids of the active widgets and nested layouts in attachment order.
    #[must_use]
    pub fn active_widgets(&self) -> Vec<String> {
        self.active
            .borrow()
            .iter()
            .map(|wrapper| wrapper.id().to_string())
            .collect()
    }

    /// Loads `page`, announces its lifecycle and attaches its widgets.
    ///
    /// Widgets and nested layouts load concurrently but attach in declaration order, area by area. A
    /// failing step leaves the page as far as it got; the controller is then [`PageState::Failed`] and
    /// only accepts [`tear_down_page`](Self::tear_down_page).
    ///
    /// # Errors
    ///
    /// Returns [`PageError::InvalidState`] unless the controller is idle, otherwise the error of the
    /// first failing step.
    pub async fn setup_page(&self, page: &PageName) -> Result<(), PageError> {
        let state = self.state.get();
        if state != PageState::Idle {
            return Err(PageError::InvalidState {
                expected: "idle",
                actual: state,
            });
        }

        let span = info_span!("setup_page", page = %page);
        let result = self.run_setup(page).instrument(span).await;
        match &result {
            Ok(()) => self.state.set(PageState::Active),
            Err(error) => {
                warn!(page = %page, error = %error, "page setup failed");
                self.state.set(PageState::Failed);
            }
        }
        result
    }

    /// Announces the end of the lifecycle, destroys every widget and removes the layout areas.
    ///
    /// Cleanup always runs to the end. A lifecycle end that was not acknowledged is reported first,
    /// then widgets that failed to destroy.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::InvalidState`] unless the page is active or failed, [`PageError::Publish`]
    /// if the lifecycle end request failed and [`PageError::Destroy`] if widgets failed to destroy.
    pub async fn tear_down_page(&self) -> Result<(), PageError> {
        let state = self.state.get();
        if !matches!(state, PageState::Active | PageState::Failed) {
            return Err(PageError::InvalidState {
                expected: "active or failed",
                actual: state,
            });
        }

        self.state.set(PageState::TearingDown);
        let result = self.run_teardown().instrument(info_span!("tear_down_page")).await;
        self.state.set(PageState::Released);
        result
    }

    async fn run_setup(&self, page: &PageName) -> Result<(), PageError> {
        let collaborators = &self.collaborators;
        self.state.set(PageState::Loading);

        let definition = collaborators
            .page_loader
            .load(page.as_str())
            .await
            .map_err(|source| PageError::PageLoad {
                page: page.to_string(),
                source,
            })?;
        debug!(
            layout = %definition.layout,
            widgets = definition.widget_count(),
            "loaded page definition"
        );

        let registry = AreaRegistry::new();
        collaborators.visibility.set_area_registry(registry.clone());
        *self.registry.borrow_mut() = Some(registry.clone());

        let layout = async {
            let info = collaborators
                .layout_loader
                .load(&definition.layout)
                .await
                .map_err(|source| PageError::LayoutLoad {
                    layout: definition.layout.clone(),
                    source,
                })?;
            let cleanup = self.render_layout(&registry, &definition.layout, &info)?;
            *self.layout_cleanup.borrow_mut() = Some(cleanup);
            Ok::<(), PageError>(())
        };
        let widgets = future::try_join_all(
            definition
                .placements()
                .map(|(area, reference)| self.resolve(&registry, area, reference)),
        );
        let ((), wrappers) = future::try_join(layout, widgets).await?;

        self.tooling.set_page_definition(page.as_str(), &definition);
        self.tooling.set_current_page(page.as_str());
        *self.view_changes.borrow_mut() = collect_view_changes(&wrappers);
        self.active.borrow_mut().clone_from(&wrappers);
        debug!(widgets = wrappers.len(), "resolved widgets");

        collaborators.locale.subscribe();
        collaborators
            .locale
            .initialize()
            .await
            .map_err(|source| PageError::Lifecycle {
                collaborator: "locale manager",
                step: "initialize",
                source,
            })?;

        let theme = collaborators.theme.theme();
        self.publish(format!("didChangeTheme.{theme}"), json!({ "theme": theme }))
            .await?;

        let replies = self
            .gather_replies(
                format!("beginLifecycleRequest.{}", self.config.lifecycle_id()),
                self.lifecycle_payload(),
            )
            .await?;
        debug!(replies = replies.len(), "lifecycle begin acknowledged");

        collaborators
            .visibility
            .initialize()
            .await
            .map_err(|source| PageError::Lifecycle {
                collaborator: "visibility manager",
                step: "initialize",
                source,
            })?;

        self.state.set(PageState::Attaching);
        let delay = self.config.widget_attach_delay();
        if !delay.is_zero() {
            Delay::new(delay).await;
        }
        registry.attach_widgets(&wrappers).await?;

        self.start_view_reconciliation();
        info!(
            widgets = wrappers.len(),
            areas = registry.len(),
            "page is active"
        );
        Ok(())
    }

    async fn run_teardown(&self) -> Result<(), PageError> {
        let collaborators = &self.collaborators;
        collaborators.visibility.unsubscribe();
        collaborators.locale.unsubscribe();

        let lifecycle_end = self
            .gather_replies(
                format!("endLifecycleRequest.{}", self.config.lifecycle_id()),
                self.lifecycle_payload(),
            )
            .await;
        if let Err(error) = &lifecycle_end {
            warn!(error = %error, "lifecycle end failed, cleaning up anyway");
        }

        if let Some(registration) = self.listener.take() {
            registration.deregister();
        }
        self.view_changes.borrow_mut().clear();

        let mut failures = DestroyFailures::default();
        let wrappers = self.active.take();
        for wrapper in &wrappers {
            match wrapper.destroy() {
                Ok(()) => debug!(widget = wrapper.id(), "destroyed widget"),
                Err(error) => {
                    warn!(
                        widget = wrapper.id(),
                        error = %format!("{error:#}"),
                        "failed to destroy widget"
                    );
                    failures.push(wrapper.id(), error);
                }
            }
        }

        if let Some(cleanup) = self.layout_cleanup.take() {
            cleanup.run();
        }
        self.registry.take();
        info!(widgets = wrappers.len(), "page torn down");

        lifecycle_end?;
        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures.into())
        }
    }

    async fn resolve(
        &self,
        registry: &AreaRegistry,
        area: &str,
        reference: &WidgetReference,
    ) -> Result<Rc<AdapterWrapper>, PageError> {
        match &reference.source {
            WidgetSource::Widget { widget } => {
                let config = WidgetConfig {
                    id: reference.id.clone(),
                    widget: widget.clone(),
                    area: area.to_string(),
                    features: reference.features.clone(),
                };
                let wrapper = self
                    .collaborators
                    .widget_loader
                    .load(config)
                    .await
                    .map_err(|source| PageError::WidgetLoad {
                        id: reference.id.clone(),
                        source,
                    })?;
                Ok(Rc::new(wrapper))
            }
            WidgetSource::Layout { layout } => {
                let info = self
                    .collaborators
                    .layout_loader
                    .load(layout)
                    .await
                    .map_err(|source| PageError::LayoutLoad {
                        layout: layout.clone(),
                        source,
                    })?;
                let adapter = NestedLayoutAdapter::new(
                    registry.clone(),
                    &reference.id,
                    area,
                    layout,
                    info.class_name,
                );
                Ok(Rc::new(AdapterWrapper::nested_layout(
                    &reference.id,
                    area,
                    Rc::new(adapter),
                    info.html_content.unwrap_or_default(),
                )))
            }
        }
    }

    /// Renders the root layout into the host element and registers its areas, synthesizing the
    /// default areas the layout does not declare.
    fn render_layout(
        &self,
        registry: &AreaRegistry,
        layout: &str,
        info: &LayoutInfo,
    ) -> Result<LayoutCleanup, PageError> {
        let markup_error = |source| PageError::Markup {
            owner: layout.to_string(),
            source,
        };

        self.element
            .set_inner_html(info.html_content.as_deref().unwrap_or_default())
            .map_err(markup_error)?;
        if !info.class_name.is_empty() {
            self.element.add_class(&info.class_name);
        }

        let mut cleanup = LayoutCleanup {
            element: self.element.clone(),
            class_name: info.class_name.clone(),
            deregistrations: Vec::new(),
        };
        for (name, node) in find_widget_areas(&self.element) {
            cleanup.deregistrations.push(registry.register(&name, &node)?);
        }

        for (name, hidden) in DEFAULT_AREAS {
            if registry.exists(name) {
                continue;
            }
            let node = Node::element("div");
            node.set_attribute(AREA_ATTRIBUTE, name);
            if hidden {
                node.set_style("display", "none");
            }
            cleanup.deregistrations.push(registry.register(name, &node)?);
            self.element.append_child(&node).map_err(markup_error)?;
        }

        debug!(
            layout,
            areas = cleanup.deregistrations.len(),
            "rendered layout"
        );
        Ok(cleanup)
    }

    fn start_view_reconciliation(&self) {
        let view_changes = self.view_changes.clone();
        let registration = self.collaborators.heartbeat.register_listener(move || {
            let current = view_changes.borrow().clone();
            for apply in current {
                apply();
            }
        });
        if let Some(previous) = self.listener.replace(Some(registration)) {
            previous.deregister();
        }
    }

    fn publish_options(&self) -> PublishOptions {
        PublishOptions {
            sender: self.config.collaborator_id().to_string(),
        }
    }

    fn lifecycle_payload(&self) -> Value {
        json!({ "lifecycleId": self.config.lifecycle_id() })
    }

    async fn publish(&self, event: String, payload: Value) -> Result<(), PageError> {
        debug!(event = %event, "publishing");
        let result = self
            .collaborators
            .event_bus
            .publish(&event, payload, self.publish_options())
            .await;
        result.map_err(|source| PageError::Publish { event, source })
    }

    async fn gather_replies(&self, event: String, payload: Value) -> Result<Vec<Value>, PageError> {
        debug!(event = %event, "publishing request");
        let result = self
            .collaborators
            .event_bus
            .publish_and_gather_replies(&event, payload, self.publish_options())
            .await;
        result.map_err(|source| PageError::Publish { event, source })
    }
}

impl fmt::Debug for PageController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageController")
            .field("state", &self.state.get())
            .field("widgets", &self.active_widgets())
            .field("registry", &*self.registry.borrow())
            .finish_non_exhaustive()
    }
}
