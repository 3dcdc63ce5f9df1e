//! Style Scoper
//!
//! Without a shadow boundary, component styles are rewritten so every
//! top-level selector is prefixed by a per-instance attribute selector
//! (`[data-my-card-k3x9qa] .title`). At-rules pass through untouched.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::rc::Rc;

/// One top-level piece of a style sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleBlock {
    /// Ordinary rule: selector list and declaration body, both trimmed.
    Style {
        selectors: Vec<String>,
        body: String,
    },
    /// `@media`, `@keyframes` or `@import ...;`, emitted byte-identical.
    AtRule(String),
}

impl RuleBlock {
    fn render(&self, scope_attr: &str) -> String {
        match self {
            RuleBlock::AtRule(raw) => raw.clone(),
            RuleBlock::Style { selectors, body } => {
                let scoped = selectors
                    .iter()
                    .map(|s| format!("[{}] {}", scope_attr, s))
                    .collect::<Vec<_>>()
                    .join(", ");
                if body.is_empty() {
                    format!("{} {{ }}", scoped)
                } else {
                    format!("{} {{ {} }}", scoped, body)
                }
            }
        }
    }
}

/// Split a sheet into top-level rule blocks.
///
/// Blank blocks and trailing text without `{` are dropped.
pub fn split_rule_blocks(sheet: &str) -> Vec<RuleBlock> {
    let bytes = sheet.as_bytes();
    let mut blocks = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let rest = &sheet[pos..];
        let lead = rest.len() - rest.trim_start().len();
        let start = pos + lead;
        if start >= bytes.len() {
            break;
        }

        let open = match sheet[start..].find('{') {
            Some(offset) => start + offset,
            None => break,
        };

        // Block-less at-rule statement before the next block (`@import url(x);`)
        if bytes[start] == b'@' {
            if let Some(semi) = sheet[start..open].find(';') {
                let end = start + semi + 1;
                blocks.push(RuleBlock::AtRule(sheet[start..end].to_string()));
                pos = end;
                continue;
            }
        }

        let selector = sheet[start..open].trim();

        if selector.starts_with('@') {
            let close = find_balanced_close(bytes, open).unwrap_or(bytes.len());
            let end = (close + 1).min(bytes.len());
            blocks.push(RuleBlock::AtRule(sheet[start..end].to_string()));
            pos = end;
            continue;
        }

        let close = match sheet[open + 1..].find('}') {
            Some(offset) => open + 1 + offset,
            None => bytes.len(),
        };
        let body = sheet[open + 1..close].trim().to_string();

        if !selector.is_empty() {
            let selectors = selector
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            blocks.push(RuleBlock::Style { selectors, body });
        }

        pos = (close + 1).min(bytes.len());
    }

    blocks
}

/// Index of the `}` matching the `{` at `open`.
fn find_balanced_close(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate().skip(open) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Render pre-split blocks under `scope_attr`.
pub fn render_scoped(blocks: &[RuleBlock], scope_attr: &str) -> String {
    blocks
        .iter()
        .map(|block| block.render(scope_attr))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prefix every top-level selector in `sheet` with `[scope_attr]`.
pub fn scope_styles(sheet: &str, scope_attr: &str) -> String {
    render_scoped(&split_rule_blocks(sheet), scope_attr)
}

/// Scope attribute for an instance of `tag`: `data-<tag>-<token>`.
pub fn scope_attribute(tag: &str, token: &str) -> String {
    format!("data-{}-{}", tag.to_ascii_lowercase(), token)
}

/// Sample a lowercase base-36 token of `len` characters.
pub fn random_token(len: usize) -> String {
    const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut out = String::with_capacity(len);
    while out.len() < len {
        let bytes = *uuid::Uuid::new_v4().as_bytes();
        let mut n = u128::from_le_bytes(bytes);
        // 16 digits per sample keeps each one well inside the 128 bits of entropy
        for _ in 0..16 {
            if out.len() == len {
                break;
            }
            out.push(ALPHABET[(n % 36) as usize] as char);
            n /= 36;
        }
    }
    out
}

pub fn sheet_hash(sheet: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(sheet.as_bytes());
    format!("{:x}", hasher.finalize())
}

struct CacheEntry {
    blocks: Rc<[RuleBlock]>,
    live: usize,
}

/// Reference-counted parse cache for light-DOM style sheets.
///
/// Keyed by (tag, sha256(sheet)). Each live instance holds one reference;
/// the entry is dropped with the last one.
#[derive(Default)]
pub struct StyleCache {
    entries: HashMap<(String, String), CacheEntry>,
}

impl StyleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&mut self, tag: &str, sheet: &str) -> Rc<[RuleBlock]> {
        let key = (tag.to_string(), sheet_hash(sheet));
        let entry = self.entries.entry(key).or_insert_with(|| CacheEntry {
            blocks: split_rule_blocks(sheet).into(),
            live: 0,
        });
        entry.live += 1;
        Rc::clone(&entry.blocks)
    }

    pub fn release(&mut self, tag: &str, sheet: &str) {
        let key = (tag.to_string(), sheet_hash(sheet));
        let remove = match self.entries.get_mut(&key) {
            Some(entry) => {
                entry.live = entry.live.saturating_sub(1);
                entry.live == 0
            }
            None => false,
        };
        if remove {
            self.entries.remove(&key);
        }
    }

    pub fn live_count(&self, tag: &str, sheet: &str) -> usize {
        self.entries
            .get(&(tag.to_string(), sheet_hash(sheet)))
            .map(|entry| entry.live)
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scopes_selector_list_and_keeps_media_verbatim() {
        let sheet =
            ".a, .b { color: red; } @media (min-width: 1px) { .c { color: blue; } }";
        let out = scope_styles(sheet, "t1");
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "[t1] .a, [t1] .b { color: red; }");
        assert_eq!(lines[1], "@media (min-width: 1px) { .c { color: blue; } }");
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_skips_blank_and_braceless_blocks() {
        let out = scope_styles("  \n .x { margin: 0 }  \n trailing", "s");
        assert_eq!(out, "[s] .x { margin: 0 }");
    }

    #[test]
    fn test_keyframes_pass_through() {
        let sheet = "@keyframes spin { from { transform: rotate(0) } to { transform: rotate(1turn) } }\n.s { animation: spin 1s }";
        let blocks = split_rule_blocks(sheet);
        assert_eq!(blocks.len(), 2);
        assert_eq!(
            blocks[0],
            RuleBlock::AtRule(
                "@keyframes spin { from { transform: rotate(0) } to { transform: rotate(1turn) } }"
                    .to_string()
            )
        );
        assert!(scope_styles(sheet, "k").ends_with("[k] .s { animation: spin 1s }"));
    }

    #[test]
    fn test_import_statement_kept() {
        let out = scope_styles("@import url(base.css);\np { color: red }", "q");
        assert_eq!(out, "@import url(base.css);\n[q] p { color: red }");
    }

    #[test]
    fn test_scope_attribute_name() {
        assert_eq!(scope_attribute("My-Card", "abc123"), "data-my-card-abc123");
    }

    #[test]
    fn test_random_token_shape() {
        let token = random_token(6);
        assert_eq!(token.len(), 6);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        assert_eq!(random_token(40).len(), 40);
    }

    #[test]
    fn test_cache_refcounts_per_tag_and_sheet() {
        let mut cache = StyleCache::new();
        let a = cache.acquire("x-a", ".a { }");
        let b = cache.acquire("x-a", ".a { }");
        assert!(Rc::ptr_eq(&a, &b));
        cache.acquire("x-b", ".a { }");
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.live_count("x-a", ".a { }"), 2);

        cache.release("x-a", ".a { }");
        assert_eq!(cache.live_count("x-a", ".a { }"), 1);
        cache.release("x-a", ".a { }");
        assert_eq!(cache.live_count("x-a", ".a { }"), 0);
        assert_eq!(cache.len(), 1);
    }
}
