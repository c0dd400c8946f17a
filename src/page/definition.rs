use core::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::PageError;

/// Validated page name: non-empty, made of ASCII letters, digits, `_`, `-`, `.` and `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageName(String);

impl PageName {
    /// Validates `name`.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::InvalidPageName`] for empty names or unexpected characters.
    pub fn parse(name: impl Into<String>) -> Result<Self, PageError> {
        let name = name.into();
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/'));
        if valid {
            Ok(Self(name))
        } else {
            Err(PageError::InvalidPageName(name))
        }
    }

    /// Returns the name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for PageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A page: one layout plus the widgets placed into its areas.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PageDefinition {
    /// Reference to the root layout.
    pub layout: String,
    /// Widgets per area, in declaration order.
    #[serde(default)]
    pub areas: IndexMap<String, Vec<WidgetReference>>,
}

impl PageDefinition {
    /// Iterates over every widget reference with its area, area by area in declaration order.
    pub fn placements(&self) -> impl Iterator<Item = (&str, &WidgetReference)> {
        self.areas.iter().flat_map(|(area, widgets)| {
            widgets.iter().map(move |widget| (area.as_str(), widget))
        })
    }

    /// Returns the number of widget references on the page.
    #[must_use]
    pub fn widget_count(&self) -> usize {
        self.areas.values().map(Vec::len).sum()
    }
}

/// One entry of an area: a widget or a nested layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetReference {
    /// Instance id, unique on the page.
    pub id: String,
    /// What the entry refers to.
    #[serde(flatten)]
    pub source: WidgetSource,
    /// Feature configuration for widgets.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub features: Map<String, Value>,
}

/// Target of a [`WidgetReference`]. A `layout` key wins over a `widget` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WidgetSource {
    /// A nested layout.
    Layout {
        /// Layout reference.
        layout: String,
    },
    /// A widget implementation.
    Widget {
        /// Widget reference.
        widget: String,
    },
}

/// Resolved layout.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutInfo {
    /// Layout markup.
    #[serde(default)]
    pub html_content: Option<String>,
    /// Applied stylesheet, if any.
    #[serde(default)]
    pub css: Option<String>,
    /// Class added to the element the layout is rendered into.
    pub class_name: String,
}
