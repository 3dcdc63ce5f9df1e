//! Component Loader
//!
//! Fetches single-file component documents and splits them into template,
//! style, script descriptor and root-element attributes.
//!
//! A component file looks like:
//!
//! ```html
//! <template><button data-event-click="increment">+</button></template>
//! <style>button { font-weight: bold; }</style>
//! <script>exportDefault({ properties: { count: { default: 0, reflect: true } } });</script>
//! <div data-version="1.0"></div>
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::dom;
use crate::error::{ElementError, Result};
use crate::naming::{camelize, is_valid_custom_element_name};
use crate::script::{self, ScriptDescriptor};

/// The pieces of one component file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedComponent {
    pub template: String,
    pub style: String,
    pub script: ScriptDescriptor,
    /// `data-*` attributes of the first body element, keyed in camelCase.
    pub attributes: IndexMap<String, String>,
}

/// Parse a component document. Script failures degrade to an empty descriptor.
pub fn parse_component(html: &str) -> Result<ParsedComponent> {
    let dom = dom::parse_html_document(html)?;
    let document = &dom.document;

    let template = match dom::find_first_by_tag(document, "template") {
        Some(element) => {
            let contents = dom::template_contents(&element).unwrap_or(element);
            dom::inner_html(&contents)?.trim().to_string()
        }
        None => String::new(),
    };

    let style = dom::find_first_by_tag(document, "style")
        .map(|element| dom::text_content(&element).trim().to_string())
        .unwrap_or_default();

    let script = match dom::find_first_by_tag(document, "script") {
        Some(element) => {
            let source = dom::text_content(&element);
            script::evaluate_descriptor(source.trim()).unwrap_or_else(|e| {
                tracing::error!("{}", e);
                ScriptDescriptor::default()
            })
        }
        None => ScriptDescriptor::default(),
    };

    let mut attributes = IndexMap::new();
    let root = dom::find_first_by_tag(document, "body")
        .and_then(|body| dom::element_children(&body).into_iter().next());
    if let Some(root) = root {
        for (name, value) in dom::attributes(&root) {
            if let Some(key) = name.strip_prefix("data-") {
                attributes.insert(camelize(key), value);
            }
        }
    }

    Ok(ParsedComponent {
        template,
        style,
        script,
        attributes,
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// FETCHERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Source of component file text.
pub trait Fetch {
    fn fetch_text(&self, url: &str) -> impl Future<Output = Result<String>>;
}

/// Fetch and parse the component file at `url`.
pub async fn load_component<F: Fetch>(fetcher: &F, url: &str) -> Result<ParsedComponent> {
    let html = fetcher.fetch_text(url).await.map_err(|e| {
        tracing::error!("Error loading component: {}", e);
        e
    })?;
    parse_component(&html)
}

/// HTTP(S) fetcher.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Fetch for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ElementError::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ElementError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
            });
        }

        response.text().await.map_err(|e| ElementError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Reads paths (or `file://` URLs) relative to a root directory.
#[derive(Debug, Clone)]
pub struct FsFetcher {
    root: PathBuf,
}

impl FsFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn resolve(&self, url: &str) -> PathBuf {
        let path = url.strip_prefix("file://").unwrap_or(url);
        self.root.join(path.trim_start_matches('/'))
    }
}

impl Fetch for FsFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        let path = self.resolve(url);
        std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ElementError::Status {
                url: url.to_string(),
                status: 404,
                reason: "Not Found".to_string(),
            },
            _ => ElementError::Io {
                path: path.display().to_string(),
                reason: e.to_string(),
            },
        })
    }
}

/// In-memory url → text table.
#[derive(Debug, Clone, Default)]
pub struct MemoryFetcher {
    files: HashMap<String, String>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, text: &str) -> Self {
        self.insert(url, text);
        self
    }

    pub fn insert(&mut self, url: &str, text: &str) {
        self.files.insert(url.to_string(), text.to_string());
    }
}

impl Fetch for MemoryFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        self.files.get(url).cloned().ok_or_else(|| ElementError::Status {
            url: url.to_string(),
            status: 404,
            reason: "Not Found".to_string(),
        })
    }
}

/// Component files under `dir`: `*.html` whose stem is a valid tag name.
/// Returns `(tag, path)` pairs sorted by path.
pub fn discover_component_files(dir: &Path) -> Vec<(String, PathBuf)> {
    let mut files: Vec<(String, PathBuf)> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let path = entry.into_path();
            if path.extension().and_then(|e| e.to_str()) != Some("html") {
                return None;
            }
            let tag = path.file_stem()?.to_str()?.to_string();
            if !is_valid_custom_element_name(&tag) {
                tracing::debug!("Skipping {}: not a custom element name", path.display());
                return None;
            }
            Some((tag, path))
        })
        .collect();
    files.sort_by(|a, b| a.1.cmp(&b.1));
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    const COUNTER_FILE: &str = r#"
<template>
  <button data-event-click="increment">+</button>
  <span class="value"></span>
</template>
<style>
  .value { font-weight: bold; }
</style>
<script>
  exportDefault({
    properties: { count: { default: 0, reflect: true } },
    methods: { increment() { this.count++; } }
  });
</script>
<div data-version="1.0" data-display-name="Counter" class="root"></div>
"#;

    #[test]
    fn test_parse_component_sections() {
        let parsed = parse_component(COUNTER_FILE).unwrap();
        assert!(parsed.template.starts_with("<button data-event-click=\"increment\">+</button>"));
        assert!(parsed.template.ends_with("<span class=\"value\"></span>"));
        assert_eq!(parsed.style, ".value { font-weight: bold; }");
        assert!(parsed.script.methods.contains_key("increment"));
        assert_eq!(parsed.attributes.get("version").map(String::as_str), Some("1.0"));
        assert_eq!(
            parsed.attributes.get("displayName").map(String::as_str),
            Some("Counter")
        );
        assert_eq!(parsed.attributes.len(), 2);
    }

    #[test]
    fn test_bad_script_degrades_to_empty_descriptor() {
        let parsed =
            parse_component("<template><p>x</p></template><script>exportDefault({ a: b });</script>")
                .unwrap();
        assert_eq!(parsed.template, "<p>x</p>");
        assert_eq!(parsed.script, ScriptDescriptor::default());
    }

    #[test]
    fn test_missing_sections_are_empty() {
        let parsed = parse_component("<p>nothing here</p>").unwrap();
        assert_eq!(parsed.template, "");
        assert_eq!(parsed.style, "");
        assert!(parsed.attributes.is_empty());
    }

    #[tokio::test]
    async fn test_load_component_reports_status() {
        let fetcher = MemoryFetcher::new().with("/c/x-counter.html", COUNTER_FILE);
        assert!(load_component(&fetcher, "/c/x-counter.html").await.is_ok());

        let err = load_component(&fetcher, "/c/missing.html").await.unwrap_err();
        assert_eq!(
            err,
            ElementError::Status {
                url: "/c/missing.html".to_string(),
                status: 404,
                reason: "Not Found".to_string(),
            }
        );
    }

    #[test]
    fn test_fs_fetcher_resolves_file_urls() {
        let fetcher = FsFetcher::new("/srv/components");
        assert_eq!(
            fetcher.resolve("file:///x-card.html"),
            PathBuf::from("/srv/components/x-card.html")
        );
        assert_eq!(
            fetcher.resolve("nested/x-card.html"),
            PathBuf::from("/srv/components/nested/x-card.html")
        );
    }

    #[test]
    fn test_discover_component_files() {
        let dir = std::env::temp_dir().join(format!("element-native-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(dir.join("nested")).unwrap();
        std::fs::write(dir.join("x-card.html"), "<template></template>").unwrap();
        std::fs::write(dir.join("nested/my-list.html"), "<template></template>").unwrap();
        std::fs::write(dir.join("index.html"), "").unwrap();
        std::fs::write(dir.join("x-notes.txt"), "").unwrap();

        let tags: Vec<String> = discover_component_files(&dir)
            .into_iter()
            .map(|(tag, _)| tag)
            .collect();
        assert_eq!(tags, vec!["my-list", "x-card"]);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
