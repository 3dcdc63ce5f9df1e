//! Node bindings for build tooling: scope a sheet, escape text, split a
//! component file. Compiled only with the `napi` feature.

use napi_derive::napi;

use crate::css;
use crate::html;
use crate::loader;

#[napi]
pub fn render_scoped_styles_native(sheet: String, scope_attr: String) -> String {
    css::scope_styles(&sheet, &scope_attr)
}

#[napi]
pub fn escape_html_native(input: String) -> String {
    html::escape_html(&input)
}

#[napi]
pub fn parse_component_native(source: String) -> napi::Result<serde_json::Value> {
    let parsed = loader::parse_component(&source).map_err(|e| napi::Error::from_reason(e.to_string()))?;
    serde_json::to_value(parsed).map_err(|e| napi::Error::from_reason(e.to_string()))
}

#[napi]
pub fn bridge_version() -> String {
    format!("element-native {}", env!("CARGO_PKG_VERSION"))
}
