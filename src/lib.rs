//! # Element Native
//!
//! Declarative custom elements over an in-memory HTML document. A component
//! is described as data (template, styles, methods, reactive properties,
//! lifecycle hooks) or as a single-file `.html` document, and registered as
//! an element type that the host [`Document`] can instantiate.
//!
//! ## Invariants
//!
//! 1. **Escaped interpolation**: values interpolated by [`html()`] are
//!    HTML-escaped; only literal fragments and event markers pass through.
//!
//! 2. **Scoped light-DOM styles**: without a shadow root, every instance gets
//!    a unique `data-<tag>-<token>` attribute and its sheet's top-level
//!    selectors are prefixed with it. At-rules are emitted unchanged.
//!
//! 3. **Markers never reach the DOM**: `data-event-*` attributes are consumed
//!    and removed when a template renders, whether or not the named handler
//!    resolves.
//!
//! 4. **Property/attribute sync**: reflective properties mirror onto their
//!    dasherized attribute; observed attribute changes flow back into the
//!    camelCase property, JSON-parsed when possible.
//!
//! 5. **No script execution**: component-file scripts are parsed, never run.
//!    Their `exportDefault({...})` literal is read statically and behavior is
//!    bound by name from a host-supplied [`HandlerSet`].

#[cfg(feature = "napi")]
mod bindings;

pub mod component;
pub mod config;
pub mod css;
pub mod define;
pub mod document;
pub mod dom;
pub mod error;
pub mod html;
pub mod loader;
pub mod logging;
pub mod naming;
pub mod registry;
pub mod script;
pub mod selector;

#[cfg(test)]
mod component_tests;

#[cfg(feature = "napi")]
pub use bindings::{escape_html_native, parse_component_native, render_scoped_styles_native};

pub use component::{ElementInstance, LifecycleState};
pub use config::{Config, LoggingConfig};
pub use css::{scope_styles, StyleCache};
pub use define::{
    define, AttributeObserver, ComponentDefinition, Connectable, ConnectionHooks, ElementType,
    Initializable, Method, PropertyObserver, PropertySpec, Template,
};
pub use document::Document;
pub use error::{ElementError, Result};
pub use html::{css, escape_html, event, html, EventBinding, TemplateValue};
pub use loader::{
    discover_component_files, load_component, parse_component, Fetch, FsFetcher, HttpFetcher,
    MemoryFetcher, ParsedComponent,
};
pub use logging::init_logging;
pub use registry::{
    get_component, has_component, register, register_definition, register_dir, register_parsed,
    register_url, ComponentRegistry, ComponentSource, HandlerSet, RegistryStore,
};
pub use script::ScriptDescriptor;
