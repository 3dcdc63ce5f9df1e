//! DOM helpers over `markup5ever_rcdom`.
//!
//! The host document and every element instance work directly on rcdom
//! handles. These helpers cover the small set of DOM operations the element
//! layer needs: construction, attributes, inner-HTML assignment and
//! serialization, traversal and deep cloning.

use html5ever::serialize::{serialize, SerializeOpts, TraversalScope};
use tendril::{StrTendril, TendrilSink};
use html5ever::{parse_document, parse_fragment, Attribute, LocalName, Namespace, QualName};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom, SerializableHandle};
use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{ElementError, Result};

const HTML_NS: &str = "http://www.w3.org/1999/xhtml";

fn html_name(local: &str) -> QualName {
    QualName::new(None, Namespace::from(HTML_NS), LocalName::from(local))
}

/// Create a detached element.
pub fn create_element(tag: &str) -> Handle {
    Node::new(NodeData::Element {
        name: html_name(&tag.to_ascii_lowercase()),
        attrs: RefCell::new(Vec::new()),
        template_contents: RefCell::new(None),
        mathml_annotation_xml_integration_point: false,
    })
}

pub fn create_text(text: &str) -> Handle {
    Node::new(NodeData::Text {
        contents: RefCell::new(StrTendril::from_slice(text)),
    })
}

/// Create a detached fragment root (used for shadow roots).
pub fn create_fragment() -> Handle {
    Node::new(NodeData::Document)
}

/// Parse a full HTML document.
pub fn parse_html_document(html: &str) -> Result<RcDom> {
    parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut html.as_bytes())
        .map_err(|e| ElementError::parse(format!("Failed to parse HTML: {}", e)))
}

/// Parse markup in a `<div>` context and return the resulting top-level nodes.
pub fn parse_fragment_nodes(html: &str) -> Vec<Handle> {
    let dom = parse_fragment(
        RcDom::default(),
        Default::default(),
        html_name("div"),
        Vec::new(),
    )
    .one(html);

    // Fragment parsing yields Document > <html> > nodes
    let document_children = dom.document.children.borrow();
    let Some(root) = document_children.first() else {
        return Vec::new();
    };
    let nodes: Vec<Handle> = root.children.borrow_mut().drain(..).collect();
    for node in &nodes {
        node.parent.set(None);
    }
    nodes
}

pub fn is_element(node: &Handle) -> bool {
    matches!(node.data, NodeData::Element { .. })
}

/// Lowercase local name of an element, `None` for other nodes.
pub fn tag_name(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.to_string()),
        _ => None,
    }
}

pub fn get_attribute(node: &Handle, name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| &*attr.name.local == name)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

pub fn has_attribute(node: &Handle, name: &str) -> bool {
    get_attribute(node, name).is_some()
}

/// All attributes as (name, value) pairs in source order.
pub fn attributes(node: &Handle) -> Vec<(String, String)> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
            .collect(),
        _ => Vec::new(),
    }
}

/// Set an attribute, returning the previous value.
pub fn set_attribute(node: &Handle, name: &str, value: &str) -> Option<String> {
    let NodeData::Element { attrs, .. } = &node.data else {
        return None;
    };
    let mut attrs = attrs.borrow_mut();
    if let Some(attr) = attrs.iter_mut().find(|attr| &*attr.name.local == name) {
        let old = attr.value.to_string();
        attr.value = StrTendril::from_slice(value);
        return Some(old);
    }
    attrs.push(Attribute {
        name: QualName::new(None, Namespace::from(""), LocalName::from(name)),
        value: StrTendril::from_slice(value),
    });
    None
}

/// Remove an attribute, returning the removed value.
pub fn remove_attribute(node: &Handle, name: &str) -> Option<String> {
    let NodeData::Element { attrs, .. } = &node.data else {
        return None;
    };
    let mut attrs = attrs.borrow_mut();
    let index = attrs.iter().position(|attr| &*attr.name.local == name)?;
    Some(attrs.remove(index).value.to_string())
}

pub fn append_child(parent: &Handle, child: &Handle) {
    detach(child);
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(Rc::clone(child));
}

/// Insert `child` before the current first child of `parent`.
pub fn prepend_child(parent: &Handle, child: &Handle) {
    detach(child);
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().insert(0, Rc::clone(child));
}

/// Remove `node` from its parent, if it has one.
pub fn detach(node: &Handle) {
    let Some(weak) = node.parent.take() else {
        return;
    };
    if let Some(parent) = weak.upgrade() {
        parent
            .children
            .borrow_mut()
            .retain(|child| !Rc::ptr_eq(child, node));
    }
}

pub fn parent(node: &Handle) -> Option<Handle> {
    let weak = node.parent.take()?;
    let parent = weak.upgrade();
    node.parent.set(Some(weak));
    parent
}

pub fn clear_children(node: &Handle) {
    let removed: Vec<Handle> = node.children.borrow_mut().drain(..).collect();
    for child in removed {
        child.parent.set(None);
    }
}

/// Child elements, skipping text and comments.
pub fn element_children(node: &Handle) -> Vec<Handle> {
    node.children
        .borrow()
        .iter()
        .filter(|child| is_element(child))
        .cloned()
        .collect()
}

/// Replace the children of `node` with the parsed nodes of `html`.
pub fn set_inner_html(node: &Handle, html: &str) {
    clear_children(node);
    for child in parse_fragment_nodes(html) {
        append_child(node, &child);
    }
}

pub fn inner_html(node: &Handle) -> Result<String> {
    serialize_node(node, TraversalScope::ChildrenOnly(None))
}

pub fn outer_html(node: &Handle) -> Result<String> {
    serialize_node(node, TraversalScope::IncludeNode)
}

fn serialize_node(node: &Handle, scope: TraversalScope) -> Result<String> {
    let mut bytes = Vec::new();
    let handle: SerializableHandle = Rc::clone(node).into();
    serialize(
        &mut bytes,
        &handle,
        SerializeOpts {
            traversal_scope: scope,
            ..Default::default()
        },
    )
    .map_err(|e| ElementError::parse(format!("Failed to serialize HTML: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| ElementError::parse(e.to_string()))
}

/// Concatenated text of all descendant text nodes.
pub fn text_content(node: &Handle) -> String {
    let mut out = String::new();
    collect_text(node, &mut out);
    out
}

fn collect_text(node: &Handle, out: &mut String) {
    if let NodeData::Text { contents } = &node.data {
        out.push_str(&contents.borrow());
    }
    for child in node.children.borrow().iter() {
        collect_text(child, out);
    }
}

pub fn set_text_content(node: &Handle, text: &str) {
    clear_children(node);
    if !text.is_empty() {
        append_child(node, &create_text(text));
    }
}

/// Content fragment of a `<template>` element.
pub fn template_contents(node: &Handle) -> Option<Handle> {
    match &node.data {
        NodeData::Element {
            template_contents, ..
        } => template_contents.borrow().clone(),
        _ => None,
    }
}

/// Descendant elements of `root` in document order, excluding `root`.
pub fn descendants(root: &Handle) -> Vec<Handle> {
    let mut out = Vec::new();
    collect_descendants(root, &mut out);
    out
}

fn collect_descendants(node: &Handle, out: &mut Vec<Handle>) {
    for child in node.children.borrow().iter() {
        if is_element(child) {
            out.push(Rc::clone(child));
        }
        collect_descendants(child, out);
    }
}

/// Deep copy of a node and its subtree, detached from any parent.
pub fn deep_clone(node: &Handle) -> Handle {
    let copy = match &node.data {
        NodeData::Element {
            name,
            attrs,
            template_contents,
            mathml_annotation_xml_integration_point,
        } => Node::new(NodeData::Element {
            name: name.clone(),
            attrs: RefCell::new(attrs.borrow().clone()),
            template_contents: RefCell::new(template_contents.borrow().as_ref().map(deep_clone)),
            mathml_annotation_xml_integration_point: *mathml_annotation_xml_integration_point,
        }),
        NodeData::Text { contents } => Node::new(NodeData::Text {
            contents: RefCell::new(contents.borrow().clone()),
        }),
        NodeData::Comment { contents } => Node::new(NodeData::Comment {
            contents: contents.clone(),
        }),
        NodeData::Document => Node::new(NodeData::Document),
        NodeData::Doctype {
            name,
            public_id,
            system_id,
        } => Node::new(NodeData::Doctype {
            name: name.clone(),
            public_id: public_id.clone(),
            system_id: system_id.clone(),
        }),
        NodeData::ProcessingInstruction { target, contents } => {
            Node::new(NodeData::ProcessingInstruction {
                target: target.clone(),
                contents: contents.clone(),
            })
        }
    };
    for child in node.children.borrow().iter() {
        append_child(&copy, &deep_clone(child));
    }
    copy
}

/// First descendant element named `tag`, in document order.
pub fn find_first_by_tag(root: &Handle, tag: &str) -> Option<Handle> {
    descendants(root)
        .into_iter()
        .find(|node| tag_name(node).as_deref() == Some(tag))
}
