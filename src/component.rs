//! Element Base
//!
//! Behavior shared by every generated element: styling, templating, event
//! binding, reactive properties, attribute sync and scoped queries.
//!
//! ## Lifecycle
//!
//! ```text
//! Constructed → Styled → Templated → Initialized → Connected ⇄ Disconnected
//! ```
//!
//! Construction applies styles before the template so a shadow root's
//! `<style>` is its first child; the `init` capability runs last, once.

use markup5ever_rcdom::Handle;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::rc::Rc;

use crate::define::{ElementType, Method};
use crate::document::Document;
use crate::dom;
use crate::html::EVENT_ATTR_PREFIX;
use crate::naming::{camelize, dasherize};
use crate::selector;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Constructed,
    Styled,
    Templated,
    Initialized,
    Connected,
    Disconnected,
}

/// A listener attached while binding `data-event-*` markers.
struct Listener {
    target: Handle,
    event: String,
    method: Method,
}

/// One live element of a generated type.
pub struct ElementInstance {
    element_type: Rc<ElementType>,
    host: Handle,
    shadow_root: Option<Handle>,
    props: HashMap<String, Value>,
    listeners: Vec<Listener>,
    scope_attribute: Option<String>,
    style_node: Option<Handle>,
    state: LifecycleState,
    repeat_ref_attribute: String,
}

impl ElementInstance {
    /// Construct an instance: shadow root, styles, template, then `init`.
    pub(crate) fn construct(element_type: Rc<ElementType>, document: &mut Document) -> Self {
        let host = dom::create_element(element_type.tag());
        let shadow_root = element_type.use_shadow().then(dom::create_fragment);
        let config = document.config();

        let mut element = Self {
            repeat_ref_attribute: config.repeat_ref_attribute.clone(),
            element_type,
            host,
            shadow_root,
            props: HashMap::new(),
            listeners: Vec::new(),
            scope_attribute: None,
            style_node: None,
            state: LifecycleState::Constructed,
        };

        element.apply_styles(document);
        element.state = LifecycleState::Styled;

        if element.element_type.template().is_some() {
            element.render_template();
        }
        element.state = LifecycleState::Templated;

        if let Some(init) = element.element_type.capabilities().init.clone() {
            init.init(&mut element);
        }
        element.state = LifecycleState::Initialized;

        tracing::debug!("Constructed <{}>", element.tag());
        element
    }

    fn apply_styles(&mut self, document: &mut Document) {
        if !self.element_type.has_styles() {
            return;
        }
        let styles = self.element_type.styles().to_string();

        if let Some(shadow_root) = &self.shadow_root {
            let style = dom::create_element("style");
            dom::set_text_content(&style, &styles);
            dom::append_child(shadow_root, &style);
            self.style_node = Some(style);
            return;
        }

        let token = document.issue_scope_token();
        let attribute = crate::css::scope_attribute(self.tag(), &token);
        dom::set_attribute(&self.host, &attribute, "");
        self.style_node = Some(document.inject_scoped_style(self.tag(), &styles, &attribute));
        self.scope_attribute = Some(attribute);
    }

    /// Replace the rendering root's content with a fresh render and rebind events.
    fn render_template(&mut self) {
        let Some(template) = self.element_type.template().cloned() else {
            return;
        };
        let markup = template.render(self);
        let root = self.root();

        dom::set_inner_html(&root, &markup);
        if self.shadow_root.is_some() {
            // Shadow styles survive re-render
            if let Some(style) = &self.style_node {
                dom::prepend_child(&root, style);
            }
        }

        self.listeners.clear();
        self.bind_events(&root);
    }

    fn bind_events(&mut self, root: &Handle) {
        for node in dom::descendants(root) {
            for (name, handler) in dom::attributes(&node) {
                let Some(event) = name.strip_prefix(EVENT_ATTR_PREFIX) else {
                    continue;
                };
                match self.element_type.method(&handler) {
                    Some(method) => self.listeners.push(Listener {
                        target: Rc::clone(&node),
                        event: event.to_string(),
                        method,
                    }),
                    None => tracing::warn!(
                        "Handler \"{}\" not found for event \"{}\" in <{}>",
                        handler,
                        event,
                        self.tag()
                    ),
                }
                dom::remove_attribute(&node, &name);
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ACCESSORS
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn tag(&self) -> &str {
        self.element_type.tag()
    }

    pub fn element_type(&self) -> &Rc<ElementType> {
        &self.element_type
    }

    pub fn host(&self) -> &Handle {
        &self.host
    }

    pub fn shadow_root(&self) -> Option<&Handle> {
        self.shadow_root.as_ref()
    }

    /// Shadow root when present, else the host element.
    pub fn root(&self) -> Handle {
        Rc::clone(self.shadow_root.as_ref().unwrap_or(&self.host))
    }

    /// `data-<tag>-<token>` attribute carried by light-DOM styled instances.
    pub fn scope_attribute(&self) -> Option<&str> {
        self.scope_attribute.as_deref()
    }

    /// Token part of the scope attribute.
    pub fn scope_token(&self) -> Option<&str> {
        let prefix = crate::css::scope_attribute(self.tag(), "");
        self.scope_attribute.as_deref()?.strip_prefix(prefix.as_str())
    }

    pub(crate) fn style_node(&self) -> Option<&Handle> {
        self.style_node.as_ref()
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Serialized content of the rendering root.
    pub fn inner_html(&self) -> String {
        dom::inner_html(&self.root()).unwrap_or_default()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // LIFECYCLE CALLBACKS
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn connected_callback(&mut self) {
        self.state = LifecycleState::Connected;
        if let Some(connection) = self.element_type.capabilities().connection.clone() {
            connection.connected(self);
        }
    }

    pub fn disconnected_callback(&mut self) {
        self.state = LifecycleState::Disconnected;
        if let Some(connection) = self.element_type.capabilities().connection.clone() {
            connection.disconnected(self);
        }
    }

    /// Sync an observed attribute change into its camelCase property.
    pub fn attribute_changed_callback(
        &mut self,
        name: &str,
        old_value: Option<&str>,
        new_value: Option<&str>,
    ) {
        if old_value == new_value {
            return;
        }
        let property = camelize(name);
        let value = Self::attribute_to_value(new_value);
        self.set_property(&property, value);

        if let Some(observer) = self.element_type.capabilities().attributes.clone() {
            observer.attribute_changed(self, name, old_value, new_value);
        }
    }

    fn attribute_to_value(raw: Option<&str>) -> Value {
        match raw {
            None => Value::Null,
            Some(raw) => {
                serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // PROPERTIES & ATTRIBUTES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Stored value, else the declared default, else `Null`.
    pub fn get_property(&self, name: &str) -> Value {
        if let Some(value) = self.props.get(name) {
            return value.clone();
        }
        self.element_type
            .property(name)
            .and_then(|spec| spec.default.clone())
            .unwrap_or(Value::Null)
    }

    /// Write a property. Declared properties reflect and notify observers;
    /// undeclared names are stored as plain instance state.
    pub fn set_property(&mut self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        let element_type = Rc::clone(&self.element_type);
        let Some(spec) = element_type.property(name) else {
            self.props.insert(name.to_string(), value);
            return;
        };

        let old = self
            .props
            .insert(name.to_string(), value.clone())
            .unwrap_or(Value::Null);

        if spec.reflect {
            self.reflect_to_attribute(&dasherize(name), &value);
        }

        if let Some(observer) = spec.observer.as_deref().and_then(|m| element_type.method(m)) {
            observer(self, &[value.clone(), old.clone(), Value::String(name.to_string())]);
        }

        if old != value {
            if let Some(properties) = element_type.capabilities().properties.clone() {
                properties.property_changed(self, name, &old, &value);
            }
        }
    }

    fn reflect_to_attribute(&mut self, attribute: &str, value: &Value) {
        match value {
            Value::Null | Value::Bool(false) => self.remove_attribute(attribute),
            Value::Bool(true) => self.set_attribute(attribute, ""),
            Value::String(s) => self.set_attribute(attribute, s),
            Value::Number(n) => self.set_attribute(attribute, &number_to_attribute(n)),
            other => self.set_attribute(attribute, &other.to_string()),
        }
    }

    pub fn get_attribute(&self, name: &str) -> Option<String> {
        dom::get_attribute(&self.host, name)
    }

    /// Set a host attribute; observed attributes fire the change callback.
    pub fn set_attribute(&mut self, name: &str, value: &str) {
        let old = dom::set_attribute(&self.host, name, value);
        if self.element_type.observes(name) {
            self.attribute_changed_callback(name, old.as_deref(), Some(value));
        }
    }

    pub fn remove_attribute(&mut self, name: &str) {
        let old = dom::remove_attribute(&self.host, name);
        if old.is_some() && self.element_type.observes(name) {
            self.attribute_changed_callback(name, old.as_deref(), None);
        }
    }

    /// Set each property, then re-render if the type has a template.
    pub fn update<I, K, V>(&mut self, props: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (name, value) in props {
            self.set_property(name.as_ref(), value);
        }
        if self.element_type.template().is_some() {
            self.render_template();
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn get_element(&self, selector: &str) -> Option<Handle> {
        selector::query_selector(&self.root(), selector)
    }

    pub fn get_all_elements(&self, selector: &str) -> Vec<Handle> {
        selector::query_selector_all(&self.root(), selector)
    }

    /// Fill `container_selector` with one clone of the `template_ref` element
    /// per item. Lookup failures are logged and yield an empty vector.
    pub fn render_repeatable_elements<T, F>(
        &mut self,
        container_selector: &str,
        template_ref: &str,
        items: &[T],
        mut configure: F,
    ) -> Vec<Handle>
    where
        F: FnMut(&Handle, &T),
    {
        let Some(container) = self.get_element(container_selector) else {
            tracing::error!("Container element not found: {}", container_selector);
            return Vec::new();
        };
        let template_selector = format!("[{}=\"{}\"]", self.repeat_ref_attribute, template_ref);
        let Some(template) = self.get_element(&template_selector) else {
            tracing::error!("Template element not found: {}", template_ref);
            return Vec::new();
        };

        let source = dom::deep_clone(&template);
        dom::clear_children(&container);

        items
            .iter()
            .map(|item| {
                let clone = dom::deep_clone(&source);
                dom::remove_attribute(&clone, &self.repeat_ref_attribute);
                configure(&clone, item);
                dom::append_child(&container, &clone);
                clone
            })
            .collect()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // EVENTS & METHODS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Deliver `event` at `target`, bubbling up to the rendering root.
    /// Returns the number of listeners invoked.
    pub fn dispatch_event(&mut self, target: &Handle, event: &str) -> usize {
        let root = self.root();
        let mut path = vec![Rc::clone(target)];
        let mut current = Rc::clone(target);
        while let Some(parent) = dom::parent(&current) {
            if Rc::ptr_eq(&parent, &root) {
                break;
            }
            path.push(Rc::clone(&parent));
            current = parent;
        }

        let methods: Vec<Method> = path
            .iter()
            .flat_map(|node| {
                self.listeners
                    .iter()
                    .filter(move |l| l.event == event && Rc::ptr_eq(&l.target, node))
                    .map(|l| Rc::clone(&l.method))
            })
            .collect();

        let payload = [json!({ "type": event })];
        for method in &methods {
            method(self, &payload);
        }
        methods.len()
    }

    /// Invoke a method from the type's method table.
    pub fn call_method(&mut self, name: &str, args: &[Value]) -> bool {
        match self.element_type.method(name) {
            Some(method) => {
                method(self, args);
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for ElementInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementInstance")
            .field("tag", &self.tag())
            .field("state", &self.state)
            .field("props", &self.props)
            .field("scope_attribute", &self.scope_attribute)
            .finish()
    }
}

/// Integral numbers in integer form, everything else as JSON renders it.
fn number_to_attribute(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => (f as i64).to_string(),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}
