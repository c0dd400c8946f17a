//! # Host document model
//!
//! A small, single-threaded document tree that layouts and widgets are attached to. It mirrors the
//! subset of the browser DOM the page runtime relies on: elements with ordered attributes, a class
//! list, inline styles, text nodes, re-parenting on append, and markup fragments via
//! [`Node::set_inner_html`].
//!
//! ```rust
//! use waterpage_dom::Node;
//!
//! let page = Node::element("div");
//! page.set_inner_html(r#"<section><div ax-widget-area="content"></div></section>"#)
//!     .expect("valid markup");
//!
//! let area = page
//!     .descendants()
//!     .into_iter()
//!     .find(|node| node.has_attribute("ax-widget-area"))
//!     .expect("area present");
//! assert_eq!(area.attribute("ax-widget-area").as_deref(), Some("content"));
//! ```

mod error;
mod markup;
mod node;
#[cfg(test)]
mod tests;

pub use error::DomError;
pub use markup::parse_fragment;
pub use node::Node;
