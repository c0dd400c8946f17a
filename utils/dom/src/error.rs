//! Error type for document operations.

use thiserror::Error;

/// Error returned by document mutations and markup parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    /// The node would become its own ancestor, or the target cannot hold children.
    #[error("the node cannot be inserted at this position")]
    HierarchyRequest,
    /// The node passed to `remove_child` is not a child of the target.
    #[error("the node is not a child of this element")]
    NotAChild,
    /// Markup was requested on a text node.
    #[error("the node is not an element")]
    NotAnElement,
    /// A start tag was not closed with `>`.
    #[error("unterminated start tag `<{0}`")]
    UnterminatedTag(String),
    /// A comment was not closed with `-->`.
    #[error("unterminated comment")]
    UnterminatedComment,
}
