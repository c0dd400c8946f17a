#![doc = include_str!("../README.md")]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::future_not_send)]

pub mod adapter;
pub mod area;
pub mod collaborator;
pub mod config;
pub mod error;
pub mod layout_adapter;
pub mod loader;
pub mod logging;
pub mod page;
pub mod tooling;

pub mod prelude {
    //! Commonly used types for hosts wiring up a page service.
    //!
    //! ```rust
    //! use waterpage::prelude::*;
    //!
    //! let (heartbeat, _dispatcher) = Heartbeat::manual();
    //! assert!(PageName::parse("editor").is_ok());
    //! # let _ = heartbeat;
    //! ```
    pub use crate::adapter::{AdapterWrapper, ViewChanges, WidgetAdapter, WidgetConfig};
    pub use crate::area::{AreaRegistry, find_widget_areas};
    pub use crate::collaborator::{
        EventBus, LayoutLoader, LocaleManager, PageLoader, PublishOptions, ThemeManager,
        VisibilityManager, WidgetLoader,
    };
    pub use crate::config::PageConfig;
    pub use crate::page::{PageController, PageName, PageService, PageState};
    pub use crate::{PageError, dom::Node, heartbeat::Heartbeat};
}

pub use config::PageConfig;
pub use error::{DestroyFailures, PageError};
pub use page::{
    LayoutInfo, PageController, PageDefinition, PageName, PageService, PageServiceBuilder,
    PageState,
};
pub use tracing as log;
pub use waterpage_dom as dom;
pub use waterpage_heartbeat as heartbeat;
