//! Layout loader resolving layouts from theme-aware file locations.

use core::cell::RefCell;
use core::fmt;
use std::collections::HashMap;
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use tracing::{debug, warn};

use crate::collaborator::{LayoutLoader, ThemeManager};
use crate::page::LayoutInfo;

/// Theme every layout falls back to.
pub const DEFAULT_THEME: &str = "default.theme";

/// Access to static files of the application.
pub trait FileResourceProvider {
    /// Fetches the content at `url`.
    fn provide<'a>(&'a self, url: &'a str) -> LocalBoxFuture<'a, anyhow::Result<String>>;

    /// Checks whether `url` exists without fetching it.
    fn is_available<'a>(&'a self, url: &'a str) -> LocalBoxFuture<'a, anyhow::Result<bool>>;
}

/// Applies stylesheets to the host document.
pub trait CssLoader {
    /// Loads the stylesheet at `url`. Loading the same URL twice must be harmless.
    fn load(&self, url: &str);
}

/// [`LayoutLoader`] backed by a [`FileResourceProvider`].
///
/// With the theme `blue.theme`, the markup of layout `shop/cart` is looked up at
///
/// 1. `<layouts root>/shop/cart/blue.theme/cart.html`
/// 2. `<themes root>/blue.theme/layouts/shop/cart/cart.html`
///
/// and the same two locations for [`DEFAULT_THEME`]. The stylesheet `css/cart.css` is resolved the
/// same way and applied through the [`CssLoader`]. Loaded markup is cached by URL.
pub struct ResourceLayoutLoader {
    layouts_root: String,
    themes_root: String,
    theme: Rc<dyn ThemeManager>,
    files: Rc<dyn FileResourceProvider>,
    css: Rc<dyn CssLoader>,
    cache: RefCell<HashMap<String, String>>,
}

impl ResourceLayoutLoader {
    /// Creates a loader for layouts below `layouts_root` and themes below `themes_root`.
    pub fn new(
        layouts_root: impl Into<String>,
        themes_root: impl Into<String>,
        theme: Rc<dyn ThemeManager>,
        files: Rc<dyn FileResourceProvider>,
        css: Rc<dyn CssLoader>,
    ) -> Self {
        Self {
            layouts_root: layouts_root.into(),
            themes_root: themes_root.into(),
            theme,
            files,
            css,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Returns the number of cached markup files.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.borrow().len()
    }

    async fn resolve(&self, layout: &str) -> anyhow::Result<LayoutInfo> {
        let layout_path = join(&[self.layouts_root.as_str(), layout]);
        let name = layout_path.rsplit('/').next().unwrap_or(layout);
        let class_name = format!("{}-layout", name.replace('/', "").replace('_', "-"));

        let theme = self.theme.theme();
        let mut themes = vec![theme.as_str()];
        if theme != DEFAULT_THEME {
            themes.push(DEFAULT_THEME);
        }
        let locations: Vec<String> = themes
            .into_iter()
            .flat_map(|theme| {
                [
                    join(&[layout_path.as_str(), theme]),
                    join(&[self.themes_root.as_str(), theme, "layouts", layout]),
                ]
            })
            .collect();

        let html = self.first_available(&locations, &format!("{name}.html")).await?;
        let css = self.first_available(&locations, &format!("css/{name}.css")).await?;

        if let Some(css) = &css {
            self.css.load(css);
        }
        let html_content = match &html {
            Some(url) => Some(self.markup(url).await?),
            None => {
                warn!(layout, theme = %theme, "layout has no markup");
                None
            }
        };
        debug!(layout, html = ?html, css = ?css, "resolved layout");

        Ok(LayoutInfo {
            html_content,
            css,
            class_name,
        })
    }

    async fn first_available(
        &self,
        locations: &[String],
        file: &str,
    ) -> anyhow::Result<Option<String>> {
        for location in locations {
            let url = join(&[location.as_str(), file]);
            if self.files.is_available(&url).await? {
                return Ok(Some(url));
            }
        }
        Ok(None)
    }

    async fn markup(&self, url: &str) -> anyhow::Result<String> {
        let cached = self.cache.borrow().get(url).cloned();
        if let Some(content) = cached {
            return Ok(content);
        }
        let content = self.files.provide(url).await?;
        self.cache
            .borrow_mut()
            .insert(url.to_string(), content.clone());
        Ok(content)
    }
}

impl LayoutLoader for ResourceLayoutLoader {
    fn load<'a>(&'a self, layout: &'a str) -> LocalBoxFuture<'a, anyhow::Result<LayoutInfo>> {
        Box::pin(self.resolve(layout))
    }
}

impl fmt::Debug for ResourceLayoutLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceLayoutLoader")
            .field("layouts_root", &self.layouts_root)
            .field("themes_root", &self.themes_root)
            .field("cached", &self.cached())
            .finish_non_exhaustive()
    }
}

/// Joins path segments with single slashes, keeping a leading slash of the first segment.
fn join(segments: &[&str]) -> String {
    let mut joined = String::new();
    for segment in segments {
        let trimmed = segment.trim_matches('/');
        if trimmed.is_empty() {
            if joined.is_empty() && segment.starts_with('/') {
                joined.push('/');
            }
            continue;
        }
        if joined.is_empty() && segment.starts_with('/') {
            joined.push('/');
        } else if !joined.is_empty() && !joined.ends_with('/') {
            joined.push('/');
        }
        joined.push_str(trimmed);
    }
    joined
}
