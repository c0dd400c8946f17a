//! Runtime configuration of the page controller.

use std::time::Duration;

use crate::PageError;

/// Delay between lifecycle begin and attaching widget templates.
pub const DEFAULT_WIDGET_ATTACH_DELAY: Duration = Duration::from_millis(5);
/// Sender name used for every event the page controller publishes.
pub const DEFAULT_COLLABORATOR_ID: &str = "AxPageController";
/// Lifecycle id announced in lifecycle requests.
pub const DEFAULT_LIFECYCLE_ID: &str = "default";

const ENV_ATTACH_DELAY: &str = "WATERPAGE_WIDGET_ATTACH_DELAY_MS";
const ENV_COLLABORATOR_ID: &str = "WATERPAGE_COLLABORATOR_ID";
const ENV_LIFECYCLE_ID: &str = "WATERPAGE_LIFECYCLE_ID";

/// Configuration shared by the page service and its controller.
///
/// The attach delay gives widgets time to react to lifecycle begin on the event bus before the first
/// paint. Widgets may depend on its timing, so change it deliberately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageConfig {
    widget_attach_delay: Duration,
    collaborator_id: String,
    lifecycle_id: String,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            widget_attach_delay: DEFAULT_WIDGET_ATTACH_DELAY,
            collaborator_id: DEFAULT_COLLABORATOR_ID.to_string(),
            lifecycle_id: DEFAULT_LIFECYCLE_ID.to_string(),
        }
    }
}

impl PageConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads overrides from the environment, falling back to defaults for unset variables.
    ///
    /// Recognized variables are `WATERPAGE_WIDGET_ATTACH_DELAY_MS`, `WATERPAGE_COLLABORATOR_ID` and
    /// `WATERPAGE_LIFECYCLE_ID`.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Config`] when a variable is set to an unusable value.
    pub fn from_env() -> Result<Self, PageError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, PageError> {
        let mut config = Self::default();
        if let Some(value) = lookup(ENV_ATTACH_DELAY) {
            let millis = value.trim().parse::<u64>().map_err(|err| PageError::Config {
                key: ENV_ATTACH_DELAY,
                reason: err.to_string(),
            })?;
            config.widget_attach_delay = Duration::from_millis(millis);
        }
        if let Some(value) = lookup(ENV_COLLABORATOR_ID) {
            config.collaborator_id = non_empty(ENV_COLLABORATOR_ID, value)?;
        }
        if let Some(value) = lookup(ENV_LIFECYCLE_ID) {
            config.lifecycle_id = non_empty(ENV_LIFECYCLE_ID, value)?;
        }
        Ok(config)
    }

    /// Sets the delay between lifecycle begin and widget attachment.
    #[must_use]
    pub const fn with_widget_attach_delay(mut self, delay: Duration) -> Self {
        self.widget_attach_delay = delay;
        self
    }

    /// Sets the sender name used for published events.
    #[must_use]
    pub fn with_collaborator_id(mut self, id: impl Into<String>) -> Self {
        self.collaborator_id = id.into();
        self
    }

    /// Sets the lifecycle id announced in lifecycle requests.
    #[must_use]
    pub fn with_lifecycle_id(mut self, id: impl Into<String>) -> Self {
        self.lifecycle_id = id.into();
        self
    }

    /// Returns the delay between lifecycle begin and widget attachment.
    #[must_use]
    pub const fn widget_attach_delay(&self) -> Duration {
        self.widget_attach_delay
    }

    /// Returns the sender name used for published events.
    #[must_use]
    pub fn collaborator_id(&self) -> &str {
        &self.collaborator_id
    }

    /// Returns the lifecycle id.
    #[must_use]
    pub fn lifecycle_id(&self) -> &str {
        &self.lifecycle_id
    }
}

fn non_empty(key: &'static str, value: String) -> Result<String, PageError> {
    if value.trim().is_empty() {
        return Err(PageError::Config {
            key,
            reason: "value is empty".into(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_page_controller_constants() {
        let config = PageConfig::default();
        assert_eq!(config.widget_attach_delay(), Duration::from_millis(5));
        assert_eq!(config.collaborator_id(), "AxPageController");
        assert_eq!(config.lifecycle_id(), "default");
    }

    #[test]
    fn lookup_overrides_defaults() {
        let config = PageConfig::from_lookup(|key| match key {
            "WATERPAGE_WIDGET_ATTACH_DELAY_MS" => Some(" 20 ".into()),
            "WATERPAGE_LIFECYCLE_ID" => Some("secondary".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.widget_attach_delay(), Duration::from_millis(20));
        assert_eq!(config.collaborator_id(), "AxPageController");
        assert_eq!(config.lifecycle_id(), "secondary");
    }

    #[test]
    fn rejects_unusable_values() {
        let err = PageConfig::from_lookup(|key| {
            (key == "WATERPAGE_WIDGET_ATTACH_DELAY_MS").then(|| "soon".to_string())
        })
        .unwrap_err();
        assert!(matches!(
            err,
            PageError::Config {
                key: "WATERPAGE_WIDGET_ATTACH_DELAY_MS",
                ..
            }
        ));

        let err = PageConfig::from_lookup(|key| {
            (key == "WATERPAGE_COLLABORATOR_ID").then(String::new)
        })
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid configuration value for `WATERPAGE_COLLABORATOR_ID`: value is empty"
        );
    }
}
