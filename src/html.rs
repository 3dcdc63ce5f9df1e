//! Template Renderer
//!
//! Builds markup from literal fragments and interpolated values. Fragments
//! are author-controlled and emitted verbatim; interpolated plain values are
//! HTML-escaped. Event bindings render as inert `data-event-<name>` marker
//! attributes that the element base consumes and strips at render time.

use serde_json::Value;

/// Attribute prefix for event-binding markers.
pub const EVENT_ATTR_PREFIX: &str = "data-event-";

/// "When `event` fires on this element, invoke method `handler` on the
/// component instance."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBinding {
    pub event: String,
    pub handler: String,
}

/// Create an event binding for use in templates.
pub fn event(event_name: &str, handler_name: &str) -> EventBinding {
    EventBinding {
        event: event_name.to_string(),
        handler: handler_name.to_string(),
    }
}

/// A value interpolated between two template fragments.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateValue {
    /// `null` / `undefined`: renders nothing.
    Null,
    /// Plain data, escaped on output.
    Text(String),
    /// Pre-rendered markup pieces, concatenated without a separator.
    List(Vec<String>),
    Event(EventBinding),
}

impl TemplateValue {
    fn render(&self, out: &mut String) {
        match self {
            TemplateValue::Null => {}
            TemplateValue::Text(text) => out.push_str(&escape_html(text)),
            TemplateValue::List(items) => {
                for item in items {
                    out.push_str(item);
                }
            }
            TemplateValue::Event(binding) => {
                out.push_str(EVENT_ATTR_PREFIX);
                out.push_str(&binding.event);
                out.push_str("=\"");
                out.push_str(&binding.handler);
                out.push('"');
            }
        }
    }
}

impl From<&str> for TemplateValue {
    fn from(value: &str) -> Self {
        TemplateValue::Text(value.to_string())
    }
}

impl From<String> for TemplateValue {
    fn from(value: String) -> Self {
        TemplateValue::Text(value)
    }
}

impl From<&String> for TemplateValue {
    fn from(value: &String) -> Self {
        TemplateValue::Text(value.clone())
    }
}

impl From<bool> for TemplateValue {
    fn from(value: bool) -> Self {
        TemplateValue::Text(value.to_string())
    }
}

macro_rules! text_from_display {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for TemplateValue {
                fn from(value: $ty) -> Self {
                    TemplateValue::Text(value.to_string())
                }
            }
        )*
    };
}

text_from_display!(i32, i64, u32, u64, usize, f32, f64);

impl From<EventBinding> for TemplateValue {
    fn from(value: EventBinding) -> Self {
        TemplateValue::Event(value)
    }
}

impl<T: Into<TemplateValue>> From<Option<T>> for TemplateValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(inner) => inner.into(),
            None => TemplateValue::Null,
        }
    }
}

impl<T: ToString> From<Vec<T>> for TemplateValue {
    fn from(items: Vec<T>) -> Self {
        TemplateValue::List(items.iter().map(|item| item.to_string()).collect())
    }
}

impl From<&Value> for TemplateValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => TemplateValue::Null,
            Value::String(s) => TemplateValue::Text(s.clone()),
            Value::Array(items) => TemplateValue::List(
                items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => s.clone(),
                        Value::Null => String::new(),
                        other => other.to_string(),
                    })
                    .collect(),
            ),
            other => TemplateValue::Text(other.to_string()),
        }
    }
}

impl From<Value> for TemplateValue {
    fn from(value: Value) -> Self {
        TemplateValue::from(&value)
    }
}

/// Render literal fragments interleaved with interpolated values.
///
/// `fragments` normally has one more element than `values`. Extra fragments
/// are appended verbatim and extra values are ignored.
pub fn html(fragments: &[&str], values: &[TemplateValue]) -> String {
    let mut out = String::new();
    for (i, fragment) in fragments.iter().enumerate() {
        out.push_str(fragment);
        if i + 1 < fragments.len() {
            if let Some(value) = values.get(i) {
                value.render(&mut out);
            }
        }
    }
    out
}

/// Join style fragments with interpolated values, without escaping.
pub fn css(fragments: &[&str], values: &[&str]) -> String {
    let mut out = String::new();
    for (i, fragment) in fragments.iter().enumerate() {
        out.push_str(fragment);
        if let Some(value) = values.get(i) {
            out.push_str(value);
        }
    }
    out
}

/// Escape HTML special characters.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            other => out.push(other),
        }
    }
    out
}
