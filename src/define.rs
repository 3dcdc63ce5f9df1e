//! Definition Compiler
//!
//! Turns a declarative [`ComponentDefinition`] into an [`ElementType`] and
//! registers it with the host [`Document`].
//!
//! ## Invariants
//!
//! 1. **One definition, one type**: `define` consumes the definition; the
//!    resulting type is shared by every instance through an `Rc`.
//! 2. **Reflective properties are observed**: every property with
//!    `reflect: true` has its dasherized name in the observed-attribute list,
//!    added after the explicitly observed ones and never duplicated.
//! 3. **Capabilities are optional**: lifecycle hooks are held as
//!    `Option<Rc<dyn Trait>>`. Hook-named entries in the method table
//!    (`init`, `connected`, `disconnected`, `attributeChanged`,
//!    `propertyChanged`) fill capabilities the definition left empty.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::rc::Rc;

use crate::component::ElementInstance;
use crate::document::Document;
use crate::error::Result;
use crate::naming::dasherize;

/// An author-supplied method. Receives the instance and call arguments.
pub type Method = Rc<dyn Fn(&mut ElementInstance, &[Value])>;

/// Markup source for a component.
#[derive(Clone)]
pub enum Template {
    Static(String),
    /// Re-evaluated on every render with the instance as context.
    Render(Rc<dyn Fn(&ElementInstance) -> String>),
}

impl Template {
    pub fn render(&self, element: &ElementInstance) -> String {
        match self {
            Template::Static(markup) => markup.clone(),
            Template::Render(render) => render(element),
        }
    }
}

impl std::fmt::Debug for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Template::Static(markup) => f.debug_tuple("Static").field(markup).finish(),
            Template::Render(_) => f.write_str("Render(..)"),
        }
    }
}

/// Contract for one reactive property.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertySpec {
    /// Value read before the property is first set.
    pub default: Option<Value>,
    /// Mirror writes onto the dasherized attribute.
    pub reflect: bool,
    /// Method invoked with `(new, old, name)` on every write.
    pub observer: Option<String>,
}

impl PropertySpec {
    pub fn new(default: impl Into<Value>) -> Self {
        Self {
            default: Some(default.into()),
            ..Default::default()
        }
    }

    pub fn reflect(mut self) -> Self {
        self.reflect = true;
        self
    }

    pub fn observer(mut self, method: &str) -> Self {
        self.observer = Some(method.to_string());
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CAPABILITIES
// ═══════════════════════════════════════════════════════════════════════════════

/// Runs once after styles and template are applied.
pub trait Initializable {
    fn init(&self, element: &mut ElementInstance);
}

/// Runs on every connection to / disconnection from the document.
pub trait Connectable {
    fn connected(&self, _element: &mut ElementInstance) {}
    fn disconnected(&self, _element: &mut ElementInstance) {}
}

/// Runs after an observed attribute changed and its property was updated.
pub trait AttributeObserver {
    fn attribute_changed(
        &self,
        element: &mut ElementInstance,
        name: &str,
        old_value: Option<&str>,
        new_value: Option<&str>,
    );
}

/// Runs after a declared property was written with a different value.
pub trait PropertyObserver {
    fn property_changed(&self, element: &mut ElementInstance, name: &str, old: &Value, new: &Value);
}

impl<F> Initializable for F
where
    F: Fn(&mut ElementInstance),
{
    fn init(&self, element: &mut ElementInstance) {
        self(element)
    }
}

impl<F> AttributeObserver for F
where
    F: Fn(&mut ElementInstance, &str, Option<&str>, Option<&str>),
{
    fn attribute_changed(
        &self,
        element: &mut ElementInstance,
        name: &str,
        old_value: Option<&str>,
        new_value: Option<&str>,
    ) {
        self(element, name, old_value, new_value)
    }
}

impl<F> PropertyObserver for F
where
    F: Fn(&mut ElementInstance, &str, &Value, &Value),
{
    fn property_changed(&self, element: &mut ElementInstance, name: &str, old: &Value, new: &Value) {
        self(element, name, old, new)
    }
}

type Hook = Box<dyn Fn(&mut ElementInstance)>;

/// [`Connectable`] built from two optional closures.
#[derive(Default)]
pub struct ConnectionHooks {
    connected: Option<Hook>,
    disconnected: Option<Hook>,
}

impl ConnectionHooks {
    pub fn is_empty(&self) -> bool {
        self.connected.is_none() && self.disconnected.is_none()
    }
}

impl Connectable for ConnectionHooks {
    fn connected(&self, element: &mut ElementInstance) {
        if let Some(hook) = &self.connected {
            hook(element);
        }
    }

    fn disconnected(&self, element: &mut ElementInstance) {
        if let Some(hook) = &self.disconnected {
            hook(element);
        }
    }
}

/// Adapts a method-table entry to the single-method capabilities.
struct MethodHook(Method);

fn optional_string(value: Option<&str>) -> Value {
    value.map(|v| Value::String(v.to_string())).unwrap_or(Value::Null)
}

impl Initializable for MethodHook {
    fn init(&self, element: &mut ElementInstance) {
        (self.0)(element, &[])
    }
}

impl AttributeObserver for MethodHook {
    fn attribute_changed(
        &self,
        element: &mut ElementInstance,
        name: &str,
        old_value: Option<&str>,
        new_value: Option<&str>,
    ) {
        let args = [
            Value::String(name.to_string()),
            optional_string(old_value),
            optional_string(new_value),
        ];
        (self.0)(element, &args)
    }
}

impl PropertyObserver for MethodHook {
    fn property_changed(&self, element: &mut ElementInstance, name: &str, old: &Value, new: &Value) {
        let args = [Value::String(name.to_string()), old.clone(), new.clone()];
        (self.0)(element, &args)
    }
}

struct MethodConnection {
    connected: Option<Method>,
    disconnected: Option<Method>,
}

impl Connectable for MethodConnection {
    fn connected(&self, element: &mut ElementInstance) {
        if let Some(method) = &self.connected {
            method(element, &[]);
        }
    }

    fn disconnected(&self, element: &mut ElementInstance) {
        if let Some(method) = &self.disconnected {
            method(element, &[]);
        }
    }
}

/// Lifecycle hooks a generated type implements.
#[derive(Clone, Default)]
pub struct Capabilities {
    pub init: Option<Rc<dyn Initializable>>,
    pub connection: Option<Rc<dyn Connectable>>,
    pub attributes: Option<Rc<dyn AttributeObserver>>,
    pub properties: Option<Rc<dyn PropertyObserver>>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// DEFINITION
// ═══════════════════════════════════════════════════════════════════════════════

/// Declarative description of a component.
#[derive(Default)]
pub struct ComponentDefinition {
    pub template: Option<Template>,
    pub styles: String,
    pub use_shadow: bool,
    pub observed_attributes: Vec<String>,
    pub methods: IndexMap<String, Method>,
    pub properties: IndexMap<String, PropertySpec>,
    pub capabilities: Capabilities,
    connection_hooks: ConnectionHooks,
}

impl ComponentDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn template(mut self, markup: impl Into<String>) -> Self {
        self.template = Some(Template::Static(markup.into()));
        self
    }

    pub fn render<F>(mut self, render: F) -> Self
    where
        F: Fn(&ElementInstance) -> String + 'static,
    {
        self.template = Some(Template::Render(Rc::new(render)));
        self
    }

    pub fn styles(mut self, styles: impl Into<String>) -> Self {
        self.styles = styles.into();
        self
    }

    pub fn use_shadow(mut self, use_shadow: bool) -> Self {
        self.use_shadow = use_shadow;
        self
    }

    pub fn observe(mut self, attribute: &str) -> Self {
        self.observed_attributes.push(attribute.to_string());
        self
    }

    pub fn method<F>(mut self, name: &str, method: F) -> Self
    where
        F: Fn(&mut ElementInstance, &[Value]) + 'static,
    {
        self.methods.insert(name.to_string(), Rc::new(method));
        self
    }

    pub fn method_rc(mut self, name: &str, method: Method) -> Self {
        self.methods.insert(name.to_string(), method);
        self
    }

    pub fn property(mut self, name: &str, spec: PropertySpec) -> Self {
        self.properties.insert(name.to_string(), spec);
        self
    }

    pub fn on_init<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut ElementInstance) + 'static,
    {
        self.capabilities.init = Some(Rc::new(hook));
        self
    }

    pub fn on_connected<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut ElementInstance) + 'static,
    {
        self.connection_hooks.connected = Some(Box::new(hook));
        self
    }

    pub fn on_disconnected<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut ElementInstance) + 'static,
    {
        self.connection_hooks.disconnected = Some(Box::new(hook));
        self
    }

    pub fn on_attribute_changed<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut ElementInstance, &str, Option<&str>, Option<&str>) + 'static,
    {
        self.capabilities.attributes = Some(Rc::new(hook));
        self
    }

    pub fn on_property_changed<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut ElementInstance, &str, &Value, &Value) + 'static,
    {
        self.capabilities.properties = Some(Rc::new(hook));
        self
    }

    /// Install a full [`Connectable`] implementation, replacing closure hooks.
    pub fn connectable(mut self, connectable: impl Connectable + 'static) -> Self {
        self.capabilities.connection = Some(Rc::new(connectable));
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ELEMENT TYPE
// ═══════════════════════════════════════════════════════════════════════════════

/// A compiled component: type-level state shared by all instances.
pub struct ElementType {
    tag: String,
    template: Option<Template>,
    styles: String,
    use_shadow: bool,
    observed_attributes: Vec<String>,
    methods: IndexMap<String, Method>,
    properties: IndexMap<String, PropertySpec>,
    capabilities: Capabilities,
}

impl ElementType {
    /// Build a type from a definition without registering it.
    pub fn compile(tag: &str, definition: ComponentDefinition) -> Self {
        let ComponentDefinition {
            template,
            styles,
            use_shadow,
            mut observed_attributes,
            methods,
            properties,
            mut capabilities,
            connection_hooks,
        } = definition;

        for (name, spec) in &properties {
            if !spec.reflect {
                continue;
            }
            let attribute = dasherize(name);
            if !observed_attributes.contains(&attribute) {
                observed_attributes.push(attribute);
            }
        }

        if capabilities.connection.is_none() {
            if !connection_hooks.is_empty() {
                capabilities.connection = Some(Rc::new(connection_hooks));
            } else {
                let connected = methods.get("connected").cloned();
                let disconnected = methods.get("disconnected").cloned();
                if connected.is_some() || disconnected.is_some() {
                    capabilities.connection = Some(Rc::new(MethodConnection {
                        connected,
                        disconnected,
                    }));
                }
            }
        }
        if capabilities.init.is_none() {
            if let Some(method) = methods.get("init") {
                capabilities.init = Some(Rc::new(MethodHook(Rc::clone(method))));
            }
        }
        if capabilities.attributes.is_none() {
            if let Some(method) = methods.get("attributeChanged") {
                capabilities.attributes = Some(Rc::new(MethodHook(Rc::clone(method))));
            }
        }
        if capabilities.properties.is_none() {
            if let Some(method) = methods.get("propertyChanged") {
                capabilities.properties = Some(Rc::new(MethodHook(Rc::clone(method))));
            }
        }

        let template = template.filter(|t| !matches!(t, Template::Static(s) if s.is_empty()));

        Self {
            tag: tag.to_string(),
            template,
            styles,
            use_shadow,
            observed_attributes,
            methods,
            properties,
            capabilities,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn template(&self) -> Option<&Template> {
        self.template.as_ref()
    }

    pub fn styles(&self) -> &str {
        &self.styles
    }

    pub fn has_styles(&self) -> bool {
        !self.styles.trim().is_empty()
    }

    pub fn use_shadow(&self) -> bool {
        self.use_shadow
    }

    pub fn observed_attributes(&self) -> &[String] {
        &self.observed_attributes
    }

    pub fn observes(&self, attribute: &str) -> bool {
        self.observed_attributes.iter().any(|a| a == attribute)
    }

    pub fn method(&self, name: &str) -> Option<Method> {
        self.methods.get(name).cloned()
    }

    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(|name| name.as_str())
    }

    pub fn property(&self, name: &str) -> Option<&PropertySpec> {
        self.properties.get(name)
    }

    pub fn properties(&self) -> &IndexMap<String, PropertySpec> {
        &self.properties
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }
}

impl std::fmt::Debug for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementType")
            .field("tag", &self.tag)
            .field("template", &self.template)
            .field("use_shadow", &self.use_shadow)
            .field("observed_attributes", &self.observed_attributes)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("properties", &self.properties)
            .finish()
    }
}

/// Compile `definition` and register it under `tag` in the host document.
pub fn define(
    document: &mut Document,
    tag: &str,
    definition: ComponentDefinition,
) -> Result<Rc<ElementType>> {
    let element_type = Rc::new(ElementType::compile(tag, definition));
    document.define(tag, Rc::clone(&element_type))?;
    Ok(element_type)
}
