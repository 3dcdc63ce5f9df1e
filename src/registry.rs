//! Component Registry
//!
//! `register` turns a component source (a URL, an already-parsed file or an
//! inline definition) into an element type, defines it in the host document
//! and records it in a tag → type store.
//!
//! ## Invariants
//!
//! 1. **Nothing half-registered**: a failed fetch or parse defines nothing.
//! 2. **Permanent entries**: the store offers no removal.
//! 3. **Behavior is injected**: methods and hooks a component file declares
//!    are resolved by name against a [`HandlerSet`]; missing names are logged
//!    and skipped.

use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use crate::component::ElementInstance;
use crate::define::{define, ComponentDefinition, ElementType, Method};
use crate::document::Document;
use crate::error::Result;
use crate::loader::{self, discover_component_files, Fetch, FsFetcher, ParsedComponent};

/// Tag → element-type store.
pub trait RegistryStore {
    fn get(&self, tag: &str) -> Option<Rc<ElementType>>;
    fn has(&self, tag: &str) -> bool;
    fn set(&mut self, tag: &str, element_type: Rc<ElementType>);
}

/// In-memory store, in registration order.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    components: IndexMap<String, Rc<ElementType>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(|tag| tag.as_str())
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl RegistryStore for ComponentRegistry {
    fn get(&self, tag: &str) -> Option<Rc<ElementType>> {
        self.components.get(tag).cloned()
    }

    fn has(&self, tag: &str) -> bool {
        self.components.contains_key(tag)
    }

    fn set(&mut self, tag: &str, element_type: Rc<ElementType>) {
        self.components.insert(tag.to_string(), element_type);
    }
}

pub fn get_component<S: RegistryStore>(store: &S, tag: &str) -> Option<Rc<ElementType>> {
    store.get(tag)
}

pub fn has_component<S: RegistryStore>(store: &S, tag: &str) -> bool {
    store.has(tag)
}

/// Named behavior for methods and hooks declared by component files.
#[derive(Clone, Default)]
pub struct HandlerSet {
    handlers: HashMap<String, Method>,
}

impl HandlerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handler<F>(mut self, name: &str, handler: F) -> Self
    where
        F: Fn(&mut ElementInstance, &[Value]) + 'static,
    {
        self.handlers.insert(name.to_string(), Rc::new(handler));
        self
    }

    pub fn get(&self, name: &str) -> Option<Method> {
        self.handlers.get(name).cloned()
    }
}

/// Where a component comes from.
pub enum ComponentSource {
    /// A component file to fetch and parse.
    Url(String),
    Parsed(ParsedComponent),
    Definition(ComponentDefinition),
}

impl From<ComponentDefinition> for ComponentSource {
    fn from(definition: ComponentDefinition) -> Self {
        ComponentSource::Definition(definition)
    }
}

impl From<ParsedComponent> for ComponentSource {
    fn from(parsed: ParsedComponent) -> Self {
        ComponentSource::Parsed(parsed)
    }
}

/// Build a definition from a parsed file, resolving behavior in `handlers`.
pub fn definition_from_parsed(parsed: &ParsedComponent, handlers: &HandlerSet) -> ComponentDefinition {
    let script = &parsed.script;
    let mut definition = ComponentDefinition::new()
        .template(parsed.template.as_str())
        .styles(parsed.style.as_str())
        .use_shadow(script.use_shadow);

    for attribute in &script.observed_attributes {
        definition = definition.observe(attribute);
    }

    let names = script
        .methods
        .keys()
        .map(String::as_str)
        .chain(script.declared_hooks());
    for name in names {
        match handlers.get(name) {
            Some(handler) => definition = definition.method_rc(name, handler),
            None => tracing::warn!("No handler registered for \"{}\"; skipping", name),
        }
    }

    for (name, spec) in &script.properties {
        definition = definition.property(name, spec.clone());
    }
    definition
}

/// Register a component under `tag` from any source. URL sources are
/// fetched with `fetcher`; inline callers can use [`register_parsed`] or
/// [`register_definition`] and skip the fetcher.
pub async fn register<S, F>(
    store: &mut S,
    document: &mut Document,
    fetcher: &F,
    tag: &str,
    source: ComponentSource,
    handlers: &HandlerSet,
) -> Result<Rc<ElementType>>
where
    S: RegistryStore,
    F: Fetch,
{
    match source {
        ComponentSource::Url(url) => register_url(store, document, fetcher, tag, &url, handlers).await,
        ComponentSource::Parsed(parsed) => register_parsed(store, document, tag, &parsed, handlers),
        ComponentSource::Definition(definition) => register_definition(store, document, tag, definition),
    }
}

/// Fetch and parse the component file at `url`, then register it.
pub async fn register_url<S, F>(
    store: &mut S,
    document: &mut Document,
    fetcher: &F,
    tag: &str,
    url: &str,
    handlers: &HandlerSet,
) -> Result<Rc<ElementType>>
where
    S: RegistryStore,
    F: Fetch,
{
    let parsed = loader::load_component(fetcher, url).await.map_err(|e| {
        tracing::error!("Failed to register component {}: {}", tag, e);
        e
    })?;
    register_parsed(store, document, tag, &parsed, handlers)
}

/// Register an already parsed component file.
pub fn register_parsed<S: RegistryStore>(
    store: &mut S,
    document: &mut Document,
    tag: &str,
    parsed: &ParsedComponent,
    handlers: &HandlerSet,
) -> Result<Rc<ElementType>> {
    register_definition(store, document, tag, definition_from_parsed(parsed, handlers))
}

/// Register an inline definition; no fetch involved.
pub fn register_definition<S: RegistryStore>(
    store: &mut S,
    document: &mut Document,
    tag: &str,
    definition: ComponentDefinition,
) -> Result<Rc<ElementType>> {
    let element_type = define(document, tag, definition)?;
    store.set(tag, Rc::clone(&element_type));
    tracing::debug!("Registered <{}>", tag);
    Ok(element_type)
}

/// Register every component file under `dir`. Failures are logged and the
/// remaining files are still registered. Returns the registered tags.
pub async fn register_dir<S: RegistryStore>(
    store: &mut S,
    document: &mut Document,
    dir: &Path,
    handlers: &HandlerSet,
) -> Vec<String> {
    let fetcher = FsFetcher::new(dir);
    let mut registered = Vec::new();

    for (tag, path) in discover_component_files(dir) {
        let relative = path.strip_prefix(dir).unwrap_or(&path).to_string_lossy().to_string();
        match register_url(store, document, &fetcher, &tag, &relative, handlers).await {
            Ok(_) => registered.push(tag),
            Err(e) => tracing::error!("Skipping {}: {}", path.display(), e),
        }
    }
    registered
}
