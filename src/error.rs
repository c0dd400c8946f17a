//! Error types produced by the page runtime.

use core::fmt;

use thiserror::Error;
use waterpage_dom::DomError;

use crate::page::PageState;

/// Error type for page setup, teardown and the supporting registries.
#[derive(Debug, Error)]
pub enum PageError {
    /// A page name was empty or contained characters outside `[A-Za-z0-9_./-]`.
    #[error("invalid page name `{0}`")]
    InvalidPageName(String),
    /// `create_controller_for` was called while a controller already exists.
    #[error("cannot create a page controller more than once")]
    ControllerExists,
    /// The host node passed to `create_controller_for` is not an element.
    #[error("a page controller can only be created for a valid DOM element")]
    NotAnElement,
    /// A required collaborator was not supplied to the page service builder.
    #[error("missing collaborator `{0}`")]
    MissingCollaborator(&'static str),
    /// An operation was called in a state that does not allow it.
    #[error("page controller is {actual:?}, expected {expected}")]
    InvalidState {
        /// Human-readable description of the accepted states.
        expected: &'static str,
        /// The state the controller was in.
        actual: PageState,
    },
    /// The page loader rejected.
    #[error("failed to load page `{page}`")]
    PageLoad {
        /// The requested page.
        page: String,
        /// Underlying loader error.
        #[source]
        source: anyhow::Error,
    },
    /// The layout loader rejected.
    #[error("failed to load layout `{layout}`")]
    LayoutLoad {
        /// The requested layout reference.
        layout: String,
        /// Underlying loader error.
        #[source]
        source: anyhow::Error,
    },
    /// The widget loader rejected.
    #[error("failed to load widget `{id}`")]
    WidgetLoad {
        /// Id of the widget instance.
        id: String,
        /// Underlying loader error.
        #[source]
        source: anyhow::Error,
    },
    /// Layout or widget markup could not be injected.
    #[error("invalid markup for `{owner}`")]
    Markup {
        /// Layout or widget the markup belongs to.
        owner: String,
        /// Underlying document error.
        #[source]
        source: DomError,
    },
    /// Another node is already registered for the area.
    #[error("area `{0}` is already registered with a different node")]
    AreaConflict(String),
    /// A widget template could not be produced.
    #[error("failed to provide the template of widget `{id}`")]
    Template {
        /// Id of the widget instance.
        id: String,
        /// Underlying error.
        #[source]
        source: anyhow::Error,
    },
    /// A widget adapter failed to attach to its area.
    #[error("failed to attach widget `{id}` to area `{area}`")]
    Attach {
        /// Id of the widget instance.
        id: String,
        /// Target area name.
        area: String,
        /// Underlying adapter error.
        #[source]
        source: anyhow::Error,
    },
    /// Publishing an event failed.
    #[error("failed to publish `{event}`")]
    Publish {
        /// The event name.
        event: String,
        /// Underlying event bus error.
        #[source]
        source: anyhow::Error,
    },
    /// A locale or visibility collaborator failed during a lifecycle step.
    #[error("{collaborator} failed during {step}")]
    Lifecycle {
        /// The collaborator role.
        collaborator: &'static str,
        /// The lifecycle step.
        step: &'static str,
        /// Underlying error.
        #[source]
        source: anyhow::Error,
    },
    /// One or more widget adapters failed to destroy during teardown.
    #[error(transparent)]
    Destroy(#[from] DestroyFailures),
    /// Configuration could not be read from the environment.
    #[error("invalid configuration value for `{key}`: {reason}")]
    Config {
        /// The environment variable.
        key: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Aggregated destroy failures, reported once every wrapper had its chance to clean up.
#[derive(Debug, Default)]
pub struct DestroyFailures {
    failures: Vec<(String, anyhow::Error)>,
}

impl DestroyFailures {
    pub(crate) fn push(&mut self, id: impl Into<String>, error: anyhow::Error) {
        self.failures.push((id.into(), error));
    }

    /// Returns whether nothing failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Returns the ids of the widgets that failed to destroy, in teardown order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().map(|(id, _)| id.as_str())
    }

    /// Returns the individual failures.
    #[must_use]
    pub fn failures(&self) -> &[(String, anyhow::Error)] {
        &self.failures
    }
}

impl fmt::Display for DestroyFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} widget(s) failed to destroy:", self.failures.len())?;
        for (id, error) in &self.failures {
            write!(f, " `{id}` ({error:#})")?;
        }
        Ok(())
    }
}

impl std::error::Error for DestroyFailures {}
