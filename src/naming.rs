//! Attribute / property name conversions.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref KEBAB_SEGMENT_RE: Regex = Regex::new(r"-([a-z])").unwrap();
    static ref UPPERCASE_RE: Regex = Regex::new(r"([A-Z])").unwrap();
    /// Valid custom element names: lowercase start, at least one hyphen.
    static ref CUSTOM_ELEMENT_NAME_RE: Regex =
        Regex::new(r"^[a-z][a-z0-9._]*(-[a-z0-9._]*)+$").unwrap();
}

/// Names the HTML standard reserves even though they contain a hyphen.
const RESERVED_ELEMENT_NAMES: &[&str] = &[
    "annotation-xml",
    "color-profile",
    "font-face",
    "font-face-src",
    "font-face-uri",
    "font-face-format",
    "font-face-name",
    "missing-glyph",
];

/// `is-open` → `isOpen`
pub fn camelize(name: &str) -> String {
    KEBAB_SEGMENT_RE
        .replace_all(name, |caps: &regex::Captures| caps[1].to_uppercase())
        .to_string()
}

/// `isOpen` → `is-open`
pub fn dasherize(name: &str) -> String {
    UPPERCASE_RE.replace_all(name, "-$1").to_lowercase()
}

pub fn is_valid_custom_element_name(tag: &str) -> bool {
    CUSTOM_ELEMENT_NAME_RE.is_match(tag) && !RESERVED_ELEMENT_NAMES.contains(&tag)
}
