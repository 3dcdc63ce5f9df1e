//! Host Document
//!
//! Minimal stand-in for the browser runtime the element layer calls into:
//! the custom-element definition table, `<head>`/`<body>`, style injection,
//! connection/disconnection and scope-token issuance.
//!
//! ## Invariants
//!
//! 1. **Unique tags**: a tag is defined at most once per document.
//! 2. **Unique scope tokens**: no two live instances of one document share
//!    a token. A colliding sample is redrawn; once a length is exhausted the
//!    token grows by one character. Released instances return their token.
//! 3. **Cached sheets are shared**: with `style_cache` on, every light-DOM
//!    instance of a tag reuses the same parsed rule blocks, and the entry is
//!    dropped when its last instance is released.

use indexmap::IndexMap;
use markup5ever_rcdom::Handle;
use std::collections::HashSet;
use std::rc::Rc;

use crate::component::{ElementInstance, LifecycleState};
use crate::config::Config;
use crate::css::{self, RuleBlock, StyleCache};
use crate::define::ElementType;
use crate::dom;
use crate::error::{ElementError, Result};
use crate::naming::is_valid_custom_element_name;

/// Redraws at one token length before the length grows.
const MAX_TOKEN_RESAMPLES: usize = 8;

pub struct Document {
    config: Config,
    document_element: Handle,
    head: Handle,
    body: Handle,
    definitions: IndexMap<String, Rc<ElementType>>,
    issued_tokens: HashSet<String>,
    style_cache: StyleCache,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self::build(Config::default())
    }

    /// Document over a validated `config`.
    pub fn with_config(config: Config) -> Result<Self> {
        Ok(Self::build(config.validate()?))
    }

    fn build(config: Config) -> Self {
        let document_element = dom::create_element("html");
        let head = dom::create_element("head");
        let body = dom::create_element("body");
        dom::append_child(&document_element, &head);
        dom::append_child(&document_element, &body);

        Self {
            config,
            document_element,
            head,
            body,
            definitions: IndexMap::new(),
            issued_tokens: HashSet::new(),
            style_cache: StyleCache::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn head(&self) -> &Handle {
        &self.head
    }

    pub fn body(&self) -> &Handle {
        &self.body
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // DEFINITIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Register `element_type` under `tag`.
    pub fn define(&mut self, tag: &str, element_type: Rc<ElementType>) -> Result<()> {
        if !is_valid_custom_element_name(tag) {
            return Err(ElementError::InvalidTagName {
                tag: tag.to_string(),
            });
        }
        if self.definitions.contains_key(tag) {
            return Err(ElementError::AlreadyDefined {
                tag: tag.to_string(),
            });
        }
        tracing::debug!("Defined <{}>", tag);
        self.definitions.insert(tag.to_string(), element_type);
        Ok(())
    }

    pub fn get_definition(&self, tag: &str) -> Option<Rc<ElementType>> {
        self.definitions.get(tag).cloned()
    }

    pub fn is_defined(&self, tag: &str) -> bool {
        self.definitions.contains_key(tag)
    }

    /// Construct a detached instance of a defined tag.
    pub fn create_element(&mut self, tag: &str) -> Option<ElementInstance> {
        let element_type = self.get_definition(tag)?;
        Some(ElementInstance::construct(element_type, self))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CONNECTION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Append the instance's host to `<body>` and fire `connected`.
    pub fn connect(&mut self, element: &mut ElementInstance) {
        let body = Rc::clone(&self.body);
        self.connect_to(&body, element);
    }

    /// Append the instance's host under `parent` and fire `connected`.
    pub fn connect_to(&mut self, parent: &Handle, element: &mut ElementInstance) {
        dom::append_child(parent, element.host());
        element.connected_callback();
    }

    /// Detach the instance's host and fire `disconnected`.
    pub fn disconnect(&mut self, element: &mut ElementInstance) {
        dom::detach(element.host());
        element.disconnected_callback();
    }

    /// Drop an instance for good: disconnect it if needed and release its
    /// light-DOM style sheet.
    pub fn release(&mut self, mut element: ElementInstance) {
        if element.state() == LifecycleState::Connected {
            self.disconnect(&mut element);
        }
        if element.shadow_root().is_some() {
            return;
        }
        if let Some(token) = element.scope_token() {
            self.issued_tokens.remove(token);
        }
        if let Some(style) = element.style_node() {
            dom::detach(style);
            if self.config.style_cache {
                let element_type = Rc::clone(element.element_type());
                self.style_cache
                    .release(element_type.tag(), element_type.styles());
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // STYLES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Draw a scope token not held by any live instance of this document.
    pub(crate) fn issue_scope_token(&mut self) -> String {
        let mut len = self.config.scope_token_len.max(1);
        loop {
            for _ in 0..MAX_TOKEN_RESAMPLES {
                let token = css::random_token(len);
                if self.issued_tokens.insert(token.clone()) {
                    return token;
                }
                tracing::debug!("Scope token collision on {}, resampling", token);
            }
            tracing::warn!(
                "No free scope token of length {} after {} draws; using length {}",
                len,
                MAX_TOKEN_RESAMPLES,
                len + 1
            );
            len += 1;
        }
    }

    pub(crate) fn issued_token_count(&self) -> usize {
        self.issued_tokens.len()
    }

    /// Append a `<style>` holding `sheet` scoped under `scope_attr` to `<head>`.
    pub(crate) fn inject_scoped_style(&mut self, tag: &str, sheet: &str, scope_attr: &str) -> Handle {
        let blocks: Rc<[RuleBlock]> = if self.config.style_cache {
            self.style_cache.acquire(tag, sheet)
        } else {
            css::split_rule_blocks(sheet).into()
        };
        let style = dom::create_element("style");
        dom::set_text_content(&style, &css::render_scoped(&blocks, scope_attr));
        dom::append_child(&self.head, &style);
        style
    }

    /// Text of every `<style>` element in `<head>`, in order.
    pub fn head_styles(&self) -> Vec<String> {
        dom::element_children(&self.head)
            .iter()
            .filter(|node| dom::tag_name(node).as_deref() == Some("style"))
            .map(dom::text_content)
            .collect()
    }

    pub fn style_cache(&self) -> &StyleCache {
        &self.style_cache
    }

    /// Serialized `<html>` element.
    pub fn to_html(&self) -> Result<String> {
        dom::outer_html(&self.document_element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::define::{define, ComponentDefinition};

    fn short_token_document() -> Document {
        Document::with_config(Config {
            scope_token_len: 1,
            ..Config::default()
        })
        .unwrap()
    }

    #[test]
    fn test_scope_tokens_are_unique() {
        let mut document = short_token_document();
        let tokens: HashSet<String> = (0..36).map(|_| document.issue_scope_token()).collect();
        assert_eq!(tokens.len(), 36);
    }

    #[test]
    fn test_exhausted_token_length_grows() {
        let mut document = short_token_document();
        define(&mut document, "x-dot", ComponentDefinition::new().styles("i { x: y }")).unwrap();

        let elements: Vec<_> = (0..40)
            .map(|_| document.create_element("x-dot").unwrap())
            .collect();
        let attributes: HashSet<&str> = elements
            .iter()
            .map(|el| el.scope_attribute().unwrap())
            .collect();
        assert_eq!(attributes.len(), 40);
        assert!(elements
            .iter()
            .any(|el| el.scope_token().map(str::len) == Some(2)));
    }

    #[test]
    fn test_release_returns_scope_token() {
        let mut document = short_token_document();
        define(&mut document, "x-dot", ComponentDefinition::new().styles("i { x: y }")).unwrap();

        let element = document.create_element("x-dot").unwrap();
        assert_eq!(document.issued_token_count(), 1);
        document.release(element);
        assert_eq!(document.issued_token_count(), 0);
    }

    #[test]
    fn test_with_config_rejects_zero_token_len() {
        let result = Document::with_config(Config {
            scope_token_len: 0,
            ..Config::default()
        });
        assert!(matches!(result, Err(ElementError::Config { .. })));
    }

    #[test]
    fn test_create_undefined_element_is_none() {
        let mut document = Document::new();
        assert!(document.create_element("x-missing").is_none());
    }

    #[test]
    fn test_connect_appends_to_body() {
        let mut document = Document::new();
        define(&mut document, "x-box", ComponentDefinition::new().template("<i>b</i>")).unwrap();
        let mut element = document.create_element("x-box").unwrap();
        document.connect(&mut element);
        assert_eq!(
            document.to_html().unwrap(),
            "<html><head></head><body><x-box><i>b</i></x-box></body></html>"
        );
        document.disconnect(&mut element);
        assert!(document.body().children.borrow().is_empty());
    }

    #[test]
    fn test_release_drops_cached_sheet_with_last_instance() {
        let mut document = Document::with_config(Config {
            style_cache: true,
            ..Config::default()
        })
        .unwrap();
        define(
            &mut document,
            "x-card",
            ComponentDefinition::new().styles(".t { color: red; }"),
        )
        .unwrap();

        let a = document.create_element("x-card").unwrap();
        let b = document.create_element("x-card").unwrap();
        assert_eq!(document.head_styles().len(), 2);
        assert_eq!(document.style_cache().live_count("x-card", ".t { color: red; }"), 2);

        document.release(a);
        assert_eq!(document.head_styles().len(), 1);
        document.release(b);
        assert!(document.head_styles().is_empty());
        assert!(document.style_cache().is_empty());
    }
}
