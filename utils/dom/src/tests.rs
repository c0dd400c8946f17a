//! Document tree and markup tests.

use crate::{DomError, Node, parse_fragment};

// ============================================================================
// Tree mutations
// ============================================================================

#[test]
fn append_child_sets_parent_and_order() {
    let root = Node::element("DIV");
    let first = Node::element("span");
    let second = Node::text("hello");
    root.append_child(&first).unwrap();
    root.append_child(&second).unwrap();

    assert_eq!(root.tag_name().as_deref(), Some("div"));
    assert_eq!(root.child_nodes(), vec![first.clone(), second]);
    assert_eq!(root.children(), vec![first.clone()]);
    assert_eq!(first.parent(), Some(root));
}

#[test]
fn append_child_moves_node_between_parents() {
    let a = Node::element("div");
    let b = Node::element("div");
    let child = Node::element("p");
    a.append_child(&child).unwrap();
    b.append_child(&child).unwrap();

    assert!(a.child_nodes().is_empty());
    assert_eq!(b.child_nodes(), vec![child.clone()]);
    assert_eq!(child.parent(), Some(b));
}

#[test]
fn append_child_rejects_cycles_and_text_parents() {
    let outer = Node::element("div");
    let inner = Node::element("div");
    outer.append_child(&inner).unwrap();

    assert_eq!(inner.append_child(&outer), Err(DomError::HierarchyRequest));
    assert_eq!(outer.append_child(&outer), Err(DomError::HierarchyRequest));
    assert_eq!(
        Node::text("x").append_child(&Node::element("b")),
        Err(DomError::HierarchyRequest)
    );
}

#[test]
fn remove_is_safe_when_detached() {
    let parent = Node::element("div");
    let child = Node::element("span");
    parent.append_child(&child).unwrap();

    child.remove();
    child.remove();
    assert!(parent.child_nodes().is_empty());
    assert_eq!(child.parent(), None);
    assert_eq!(parent.remove_child(&child), Err(DomError::NotAChild));
}

#[test]
fn classes_behave_like_a_token_list() {
    let node = Node::element("div");
    node.add_class("default-layout");
    node.add_class("default-layout");
    node.add_class("dark");
    assert_eq!(node.class_name(), "default-layout dark");
    assert!(node.has_class("dark"));

    node.remove_class("default-layout");
    assert_eq!(node.class_name(), "dark");
    node.remove_class("dark");
    assert!(!node.has_attribute("class"));
}

#[test]
fn styles_are_serialized_into_the_style_attribute() {
    let node = Node::element("div");
    node.set_attribute("ax-widget-area", "activities");
    node.set_style("display", "none");
    assert_eq!(node.style("display").as_deref(), Some("none"));
    assert_eq!(
        node.outer_html(),
        r#"<div ax-widget-area="activities" style="display: none"></div>"#
    );
}

// ============================================================================
// Markup
// ============================================================================

#[test]
fn parses_nested_elements_and_attributes() {
    let nodes = parse_fragment(
        r#"<section class="grid">
             <div ax-widget-area="testArea1" data-flag></div>
             <div ax-widget-area='testArea2'>text</div>
           </section>"#,
    )
    .unwrap();

    assert_eq!(nodes.len(), 1);
    let section = &nodes[0];
    assert_eq!(section.tag_name().as_deref(), Some("section"));
    assert_eq!(section.class_name(), "grid");

    let areas = section.children();
    assert_eq!(areas.len(), 2);
    assert_eq!(areas[0].attribute("ax-widget-area").as_deref(), Some("testArea1"));
    assert!(areas[0].has_attribute("data-flag"));
    assert_eq!(areas[1].attribute("ax-widget-area").as_deref(), Some("testArea2"));
    assert_eq!(areas[1].text_content(), "text");
}

#[test]
fn handles_void_self_closing_and_comments() {
    let nodes = parse_fragment("<!doctype html><!-- note --><p>a<br>b<img src=x.png/></p><hr/>").unwrap();
    assert_eq!(nodes.len(), 2);
    let paragraph = &nodes[0];
    assert_eq!(paragraph.child_nodes().len(), 4);
    assert_eq!(paragraph.text_content(), "ab");
    assert_eq!(nodes[1].tag_name().as_deref(), Some("hr"));
}

#[test]
fn closes_open_elements_implicitly() {
    let nodes = parse_fragment("<div><span>open").unwrap();
    assert_eq!(nodes[0].outer_html(), "<div><span>open</span></div>");

    let nodes = parse_fragment("<ul><li>one<li>two</ul>").unwrap();
    assert_eq!(nodes.len(), 1);
}

#[test]
fn reports_malformed_markup() {
    assert_eq!(
        parse_fragment("<div class=\"x"),
        Err(DomError::UnterminatedTag("div".into()))
    );
    assert_eq!(parse_fragment("<!-- open"), Err(DomError::UnterminatedComment));
}

#[test]
fn ignores_unmatched_end_tags() {
    let host = Node::element("div");
    host.set_inner_html(r#"<div ax-widget-area="a"><input name="q"></input></div>"#)
        .unwrap();
    assert_eq!(
        host.inner_html(),
        r#"<div ax-widget-area="a"><input name="q"></div>"#
    );

    host.set_inner_html(r#"<div ax-widget-area="a"><p>x</p></span></div><br></br>"#)
        .unwrap();
    let children = host.children();
    assert_eq!(children.len(), 2);
    assert_eq!(children[0].inner_html(), "<p>x</p>");
    assert_eq!(children[1].tag_name().as_deref(), Some("br"));
}

#[test]
fn set_inner_html_replaces_children_and_keeps_them_on_error() {
    let host = Node::element("div");
    host.set_inner_html("<span>hello there</span>").unwrap();
    assert_eq!(host.inner_html(), "<span>hello there</span>");

    assert!(host.set_inner_html("<p").is_err());
    assert_eq!(host.inner_html(), "<span>hello there</span>");

    host.set_inner_html("").unwrap();
    assert!(host.child_nodes().is_empty());
}

#[test]
fn descendants_are_listed_in_document_order() {
    let host = Node::element("div");
    host.set_inner_html(r#"<a id="1"><b id="2"></b></a><c id="3"></c>"#)
        .unwrap();
    let ids: Vec<_> = host.descendants().iter().filter_map(Node::id).collect();
    assert_eq!(ids, ["1", "2", "3"]);
}

#[test]
fn plain_less_than_signs_stay_text() {
    let nodes = parse_fragment("<p>a < b</p>").unwrap();
    assert_eq!(nodes[0].text_content(), "a < b");
}
