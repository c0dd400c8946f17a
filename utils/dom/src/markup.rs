//! Lenient parser for layout and widget markup fragments.
//!
//! Supports elements, quoted and unquoted attributes, boolean attributes, void and self-closing
//! elements, comments and doctype declarations. Elements left open at the end of the input are closed
//! implicitly, and end tags matching no open element are ignored. Whitespace-only text between
//! elements is dropped; entities are kept verbatim.

use crate::node::VOID_ELEMENTS;
use crate::{DomError, Node};

/// Parses `markup` into a list of detached top-level nodes.
///
/// # Errors
///
/// Returns a [`DomError`] for unterminated tags or comments.
pub fn parse_fragment(markup: &str) -> Result<Vec<Node>, DomError> {
    Parser {
        src: markup,
        pos: 0,
        roots: Vec::new(),
        open: Vec::new(),
    }
    .run()
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    roots: Vec<Node>,
    open: Vec<(String, Node)>,
}

impl<'a> Parser<'a> {
    fn run(mut self) -> Result<Vec<Node>, DomError> {
        while self.pos < self.src.len() {
            let rest = self.rest();
            if rest.starts_with("<!--") {
                let end = rest.find("-->").ok_or(DomError::UnterminatedComment)?;
                self.pos += end + 3;
            } else if rest.starts_with("</") {
                self.end_tag()?;
            } else if rest.starts_with("<!") {
                let end = rest
                    .find('>')
                    .ok_or_else(|| DomError::UnterminatedTag("!".into()))?;
                self.pos += end + 1;
            } else if rest.starts_with('<') && rest[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
                self.start_tag()?;
            } else {
                self.text();
            }
        }
        Ok(self.roots)
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn insert(&mut self, node: Node) -> Result<(), DomError> {
        match self.open.last() {
            Some((_, parent)) => parent.append_child(&node),
            None => {
                self.roots.push(node);
                Ok(())
            }
        }
    }

    fn text(&mut self) {
        let rest = self.rest();
        // A '<' that does not start markup is plain text.
        let skip = usize::from(rest.starts_with('<'));
        let end = rest[skip..].find('<').map_or(rest.len(), |i| i + skip);
        let content = &rest[..end];
        self.pos += end;
        if content.trim().is_empty() {
            return;
        }
        // Inserting a fresh text node cannot fail.
        let _ = self.insert(Node::text(content));
    }

    fn end_tag(&mut self) -> Result<(), DomError> {
        let rest = self.rest();
        let end = rest
            .find('>')
            .ok_or_else(|| DomError::UnterminatedTag("/".into()))?;
        let name = rest[2..end].trim().to_ascii_lowercase();
        self.pos += end + 1;

        // Stray end tags and end tags of void elements are dropped.
        if let Some(index) = self.open.iter().rposition(|(tag, _)| *tag == name) {
            self.open.truncate(index);
        }
        Ok(())
    }

    fn start_tag(&mut self) -> Result<(), DomError> {
        self.pos += 1;
        let name = self.take_while(|c| c.is_ascii_alphanumeric() || c == '-' || c == ':' || c == '_');
        let tag = name.to_ascii_lowercase();
        let element = Node::element(&tag);
        let mut self_closing = false;

        loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.is_empty() {
                return Err(DomError::UnterminatedTag(tag));
            }
            if rest.starts_with("/>") {
                self.pos += 2;
                self_closing = true;
                break;
            }
            if rest.starts_with('>') {
                self.pos += 1;
                break;
            }
            if rest.starts_with('/') {
                self.pos += 1;
                continue;
            }

            let attribute = self.take_while(|c| !c.is_whitespace() && !matches!(c, '=' | '>' | '/'));
            self.skip_whitespace();
            let value = if self.rest().starts_with('=') {
                self.pos += 1;
                self.skip_whitespace();
                self.attribute_value(&tag)?
            } else {
                String::new()
            };
            element.set_attribute(attribute, value);
        }

        self.insert(element.clone())?;
        if !self_closing && !VOID_ELEMENTS.contains(&tag.as_str()) {
            self.open.push((tag, element));
        }
        Ok(())
    }

    fn attribute_value(&mut self, tag: &str) -> Result<String, DomError> {
        let rest = self.rest();
        match rest.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let end = rest[1..]
                    .find(quote)
                    .ok_or_else(|| DomError::UnterminatedTag(tag.to_string()))?;
                self.pos += end + 2;
                Ok(rest[1..=end].to_string())
            }
            _ => Ok(self
                .take_while(|c| !c.is_whitespace() && c != '>')
                .to_string()),
        }
    }

    fn take_while(&mut self, predicate: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let end = rest
            .char_indices()
            .find(|(_, c)| !predicate(*c))
            .map_or(rest.len(), |(i, _)| i);
        self.pos += end;
        &rest[..end]
    }

    fn skip_whitespace(&mut self) {
        self.take_while(char::is_whitespace);
    }
}
