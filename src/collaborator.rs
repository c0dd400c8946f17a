//! Contracts of the services the page controller drives but does not implement.
//!
//! Asynchronous calls return [`LocalBoxFuture`]s: everything runs on one thread, and collaborators are
//! free to hold `Rc` state across their own suspension points.

use futures::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::adapter::{AdapterWrapper, WidgetConfig};
use crate::area::AreaRegistry;
use crate::page::{LayoutInfo, PageDefinition};

/// Loads page definitions by name.
pub trait PageLoader {
    /// Loads the definition of `page`.
    fn load<'a>(&'a self, page: &'a str) -> LocalBoxFuture<'a, anyhow::Result<PageDefinition>>;
}

/// Resolves layout references to markup. Applying the layout CSS is the loader's job.
pub trait LayoutLoader {
    /// Resolves `layout`.
    fn load<'a>(&'a self, layout: &'a str) -> LocalBoxFuture<'a, anyhow::Result<LayoutInfo>>;
}

/// Instantiates widgets.
pub trait WidgetLoader {
    /// Creates the widget described by `config` and wraps its adapter.
    fn load(&self, config: WidgetConfig) -> LocalBoxFuture<'_, anyhow::Result<AdapterWrapper>>;
}

/// Options sent along with every published event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishOptions {
    /// Name of the publishing collaborator.
    pub sender: String,
}

/// Publish/subscribe event bus.
pub trait EventBus {
    /// Publishes `event` once every subscriber had a chance to receive it.
    fn publish<'a>(
        &'a self,
        event: &'a str,
        payload: Value,
        options: PublishOptions,
    ) -> LocalBoxFuture<'a, anyhow::Result<()>>;

    /// Publishes a request and resolves once every interested subscriber replied, or the bus gave up
    /// waiting for them.
    fn publish_and_gather_replies<'a>(
        &'a self,
        event: &'a str,
        payload: Value,
        options: PublishOptions,
    ) -> LocalBoxFuture<'a, anyhow::Result<Vec<Value>>>;
}

/// Source of the active theme.
pub trait ThemeManager {
    /// Returns the id of the active theme.
    fn theme(&self) -> String;
}

/// Locale negotiation.
pub trait LocaleManager {
    /// Starts listening for locale changes.
    fn subscribe(&self);

    /// Stops listening for locale changes.
    fn unsubscribe(&self);

    /// Publishes the initial locale state.
    fn initialize(&self) -> LocalBoxFuture<'_, anyhow::Result<()>>;
}

/// Visibility propagation between areas and widgets.
pub trait VisibilityManager {
    /// Hands over the registry of the page being set up.
    fn set_area_registry(&self, registry: AreaRegistry);

    /// Computes initial visibility against the complete registry.
    fn initialize(&self) -> LocalBoxFuture<'_, anyhow::Result<()>>;

    /// Stops reacting to visibility changes.
    fn unsubscribe(&self);
}
