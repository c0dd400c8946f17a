//! Page service and the page controller state machine.
//!
//! The [`PageService`] owns at most one [`PageController`] for a host element. The controller sets up
//! one page and tears it down again:
//!
//! ```text
//! Idle ─setup_page─▶ Loading ─▶ Attaching ─▶ Active ─tear_down_page─▶ TearingDown ─▶ Released
//!                      └──────────┴─ error ─▶ Failed ─tear_down_page─────┘
//! ```

mod controller;
mod definition;

use core::cell::RefCell;
use core::fmt;
use std::rc::Rc;

use tracing::info;
use waterpage_dom::Node;
use waterpage_heartbeat::Heartbeat;

pub use controller::{LayoutCleanup, PageController};
pub use definition::{LayoutInfo, PageDefinition, PageName, WidgetReference, WidgetSource};

use crate::PageError;
use crate::collaborator::{
    EventBus, LayoutLoader, LocaleManager, PageLoader, ThemeManager, VisibilityManager,
    WidgetLoader,
};
use crate::config::PageConfig;
use crate::tooling::PageTooling;

/// Lifecycle state of a [`PageController`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PageState {
    /// Created, no page set up yet.
    #[default]
    Idle,
    /// Loading the page, its layout and its widgets and announcing the lifecycle.
    Loading,
    /// Waiting for widgets to settle and attaching them.
    Attaching,
    /// The page is displayed.
    Active,
    /// Announcing the end of the lifecycle and destroying widgets.
    TearingDown,
    /// Torn down. The controller cannot set up another page.
    Released,
    /// Setup returned an error. Only teardown is possible.
    Failed,
}

pub(crate) struct Collaborators {
    pub(crate) heartbeat: Heartbeat,
    pub(crate) event_bus: Rc<dyn EventBus>,
    pub(crate) page_loader: Rc<dyn PageLoader>,
    pub(crate) layout_loader: Rc<dyn LayoutLoader>,
    pub(crate) widget_loader: Rc<dyn WidgetLoader>,
    pub(crate) theme: Rc<dyn ThemeManager>,
    pub(crate) locale: Rc<dyn LocaleManager>,
    pub(crate) visibility: Rc<dyn VisibilityManager>,
}

/// Creates and hands out the page controller of an application.
pub struct PageService {
    collaborators: Rc<Collaborators>,
    config: PageConfig,
    tooling: PageTooling,
    controller: RefCell<Option<Rc<PageController>>>,
}

impl PageService {
    /// Starts building a service. Every collaborator is required.
    #[must_use]
    pub fn builder() -> PageServiceBuilder {
        PageServiceBuilder::default()
    }

    /// Creates the page controller rendering into `element`, which is cleared.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::ControllerExists`] if a controller was already created and not discarded,
    /// and [`PageError::NotAnElement`] if `element` is a text node.
    pub fn create_controller_for(&self, element: &Node) -> Result<Rc<PageController>, PageError> {
        if self.controller.borrow().is_some() {
            return Err(PageError::ControllerExists);
        }
        if !element.is_element() {
            return Err(PageError::NotAnElement);
        }

        element.clear();
        let controller = Rc::new(PageController::new(
            element.clone(),
            self.collaborators.clone(),
            self.config.clone(),
            self.tooling.clone(),
        ));
        *self.controller.borrow_mut() = Some(controller.clone());
        info!(host = ?element.tag_name(), "created page controller");
        Ok(controller)
    }

    /// Returns the current controller.
    #[must_use]
    pub fn controller(&self) -> Option<Rc<PageController>> {
        self.controller.borrow().clone()
    }

    /// Forgets the current controller so that a new one can be created.
    ///
    /// The caller tears the returned controller down first if it displays a page.
    pub fn discard_controller(&self) -> Option<Rc<PageController>> {
        let controller = self.controller.borrow_mut().take();
        if let Some(controller) = &controller {
            info!(state = ?controller.state(), "discarded page controller");
        }
        controller
    }

    /// Returns the configuration handed to controllers.
    #[must_use]
    pub const fn config(&self) -> &PageConfig {
        &self.config
    }

    /// Returns the page information store.
    #[must_use]
    pub const fn tooling(&self) -> &PageTooling {
        &self.tooling
    }
}

impl fmt::Debug for PageService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageService")
            .field("config", &self.config)
            .field("controller", &self.controller.borrow().is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`PageService`].
#[derive(Default)]
pub struct PageServiceBuilder {
    heartbeat: Option<Heartbeat>,
    event_bus: Option<Rc<dyn EventBus>>,
    page_loader: Option<Rc<dyn PageLoader>>,
    layout_loader: Option<Rc<dyn LayoutLoader>>,
    widget_loader: Option<Rc<dyn WidgetLoader>>,
    theme: Option<Rc<dyn ThemeManager>>,
    locale: Option<Rc<dyn LocaleManager>>,
    visibility: Option<Rc<dyn VisibilityManager>>,
    config: PageConfig,
    tooling: PageTooling,
}

impl PageServiceBuilder {
    /// Sets the application heartbeat.
    #[must_use]
    pub fn heartbeat(mut self, heartbeat: Heartbeat) -> Self {
        self.heartbeat = Some(heartbeat);
        self
    }

    /// Sets the event bus.
    #[must_use]
    pub fn event_bus(mut self, event_bus: Rc<dyn EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Sets the page loader.
    #[must_use]
    pub fn page_loader(mut self, loader: Rc<dyn PageLoader>) -> Self {
        self.page_loader = Some(loader);
        self
    }

    /// Sets the layout loader.
    #[must_use]
    pub fn layout_loader(mut self, loader: Rc<dyn LayoutLoader>) -> Self {
        self.layout_loader = Some(loader);
        self
    }

    /// Sets the widget loader.
    #[must_use]
    pub fn widget_loader(mut self, loader: Rc<dyn WidgetLoader>) -> Self {
        self.widget_loader = Some(loader);
        self
    }

    /// Sets the theme manager.
    #[must_use]
    pub fn theme_manager(mut self, theme: Rc<dyn ThemeManager>) -> Self {
        self.theme = Some(theme);
        self
    }

    /// Sets the locale manager.
    #[must_use]
    pub fn locale_manager(mut self, locale: Rc<dyn LocaleManager>) -> Self {
        self.locale = Some(locale);
        self
    }

    /// Sets the visibility manager.
    #[must_use]
    pub fn visibility_manager(mut self, visibility: Rc<dyn VisibilityManager>) -> Self {
        self.visibility = Some(visibility);
        self
    }

    /// Replaces the default configuration.
    #[must_use]
    pub fn config(mut self, config: PageConfig) -> Self {
        self.config = config;
        self
    }

    /// Shares an existing page information store.
    #[must_use]
    pub fn tooling(mut self, tooling: PageTooling) -> Self {
        self.tooling = tooling;
        self
    }

    /// Builds the service.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::MissingCollaborator`] naming the first collaborator that was not set.
    pub fn build(self) -> Result<PageService, PageError> {
        fn required<T>(value: Option<T>, name: &'static str) -> Result<T, PageError> {
            value.ok_or(PageError::MissingCollaborator(name))
        }

        let collaborators = Collaborators {
            event_bus: required(self.event_bus, "event bus")?,
            heartbeat: required(self.heartbeat, "heartbeat")?,
            page_loader: required(self.page_loader, "page loader")?,
            layout_loader: required(self.layout_loader, "layout loader")?,
            widget_loader: required(self.widget_loader, "widget loader")?,
            theme: required(self.theme, "theme manager")?,
            locale: required(self.locale, "locale manager")?,
            visibility: required(self.visibility, "visibility manager")?,
        };
        Ok(PageService {
            collaborators: Rc::new(collaborators),
            config: self.config,
            tooling: self.tooling,
            controller: RefCell::new(None),
        })
    }
}

impl fmt::Debug for PageServiceBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageServiceBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
