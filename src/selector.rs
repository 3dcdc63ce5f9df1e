//! Selector matching for scoped queries.
//!
//! Supports the subset component code actually uses: type (`button`),
//! universal (`*`), id (`#total`), class (`.row`), attribute presence and
//! equality (`[data-ref]`, `[data-ref="item"]`, `[data-ref=item]`),
//! compound selectors, descendant (` `) and child (`>`) combinators, and
//! comma-separated selector groups.
//!
//! Only descendants of the query root are returned, but combinators match
//! ancestors anywhere above them, up to the document or a shadow root.

use markup5ever_rcdom::Handle;

use crate::dom;

#[derive(Debug, Clone, PartialEq, Eq)]
enum SimpleSelector {
    Universal,
    Tag(String),
    Id(String),
    Class(String),
    Attr { name: String, value: Option<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

/// A compound selector plus the combinator linking it to the previous one.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Compound {
    parts: Vec<SimpleSelector>,
    combinator: Option<Combinator>,
}

/// A parsed selector group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    groups: Vec<Vec<Compound>>,
}

impl Selector {
    /// Parse a selector. Returns `None` for syntax outside the supported subset.
    pub fn parse(input: &str) -> Option<Self> {
        let mut groups = Vec::new();
        for group in split_top_level_commas(input) {
            let group = group.trim();
            if group.is_empty() {
                return None;
            }
            groups.push(parse_complex(group)?);
        }
        if groups.is_empty() {
            return None;
        }
        Some(Self { groups })
    }

    /// Whether `element` matches, looking at any of its element ancestors.
    pub fn matches(&self, element: &Handle) -> bool {
        self.groups
            .iter()
            .any(|compounds| matches_complex(compounds, compounds.len() - 1, element))
    }
}

fn split_top_level_commas(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in input.char_indices() {
        match (quote, c) {
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

fn parse_complex(input: &str) -> Option<Vec<Compound>> {
    let chars: Vec<char> = input.chars().collect();
    let mut compounds = Vec::new();
    let mut pending: Option<Combinator> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            if !compounds.is_empty() && pending.is_none() {
                pending = Some(Combinator::Descendant);
            }
            i += 1;
            continue;
        }
        if c == '>' {
            if compounds.is_empty() {
                return None;
            }
            pending = Some(Combinator::Child);
            i += 1;
            continue;
        }

        let (parts, next) = parse_compound(&chars, i)?;
        let combinator = if compounds.is_empty() { None } else { pending.take() };
        compounds.push(Compound { parts, combinator });
        pending = None;
        i = next;
    }

    if compounds.is_empty() || pending == Some(Combinator::Child) {
        return None;
    }
    Some(compounds)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn read_ident(chars: &[char], mut i: usize) -> (String, usize) {
    let start = i;
    while i < chars.len() && is_ident_char(chars[i]) {
        i += 1;
    }
    (chars[start..i].iter().collect(), i)
}

fn parse_compound(chars: &[char], mut i: usize) -> Option<(Vec<SimpleSelector>, usize)> {
    let mut parts = Vec::new();

    while i < chars.len() {
        match chars[i] {
            '*' => {
                parts.push(SimpleSelector::Universal);
                i += 1;
            }
            '#' => {
                let (ident, next) = read_ident(chars, i + 1);
                if ident.is_empty() {
                    return None;
                }
                parts.push(SimpleSelector::Id(ident));
                i = next;
            }
            '.' => {
                let (ident, next) = read_ident(chars, i + 1);
                if ident.is_empty() {
                    return None;
                }
                parts.push(SimpleSelector::Class(ident));
                i = next;
            }
            '[' => {
                let (attr, next) = parse_attribute(chars, i + 1)?;
                parts.push(attr);
                i = next;
            }
            c if is_ident_char(c) => {
                let (ident, next) = read_ident(chars, i);
                parts.push(SimpleSelector::Tag(ident.to_ascii_lowercase()));
                i = next;
            }
            c if c.is_whitespace() || c == '>' => break,
            _ => return None,
        }
    }

    if parts.is_empty() {
        return None;
    }
    Some((parts, i))
}

fn parse_attribute(chars: &[char], i: usize) -> Option<(SimpleSelector, usize)> {
    let mut i = skip_ws(chars, i);
    let (name, next) = read_ident(chars, i);
    if name.is_empty() {
        return None;
    }
    i = skip_ws(chars, next);

    match chars.get(i)? {
        ']' => Some((SimpleSelector::Attr { name, value: None }, i + 1)),
        '=' => {
            i = skip_ws(chars, i + 1);
            let (value, next) = match chars.get(i)? {
                q @ ('"' | '\'') => {
                    let end = chars[i + 1..].iter().position(|c| c == q)? + i + 1;
                    (chars[i + 1..end].iter().collect::<String>(), end + 1)
                }
                _ => {
                    let (ident, next) = read_ident(chars, i);
                    if ident.is_empty() {
                        return None;
                    }
                    (ident, next)
                }
            };
            i = skip_ws(chars, next);
            if chars.get(i) != Some(&']') {
                return None;
            }
            Some((
                SimpleSelector::Attr {
                    name,
                    value: Some(value),
                },
                i + 1,
            ))
        }
        _ => None,
    }
}

fn skip_ws(chars: &[char], mut i: usize) -> usize {
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }
    i
}

fn matches_compound(parts: &[SimpleSelector], element: &Handle) -> bool {
    parts.iter().all(|part| match part {
        SimpleSelector::Universal => dom::is_element(element),
        SimpleSelector::Tag(tag) => dom::tag_name(element).as_deref() == Some(tag.as_str()),
        SimpleSelector::Id(id) => dom::get_attribute(element, "id").as_deref() == Some(id.as_str()),
        SimpleSelector::Class(class) => dom::get_attribute(element, "class")
            .map(|classes| classes.split_whitespace().any(|c| c == class))
            .unwrap_or(false),
        SimpleSelector::Attr { name, value } => match value {
            None => dom::has_attribute(element, name),
            Some(expected) => dom::get_attribute(element, name).as_deref() == Some(expected.as_str()),
        },
    })
}

/// Parent element of `node`; a document or shadow-root fragment ends the chain.
fn parent_element(node: &Handle) -> Option<Handle> {
    dom::parent(node).filter(dom::is_element)
}

fn matches_complex(compounds: &[Compound], index: usize, element: &Handle) -> bool {
    let compound = &compounds[index];
    if !matches_compound(&compound.parts, element) {
        return false;
    }
    if index == 0 {
        return true;
    }

    match compound.combinator {
        Some(Combinator::Child) => parent_element(element)
            .map(|parent| matches_complex(compounds, index - 1, &parent))
            .unwrap_or(false),
        _ => {
            let mut ancestor = parent_element(element);
            while let Some(node) = ancestor {
                if matches_complex(compounds, index - 1, &node) {
                    return true;
                }
                ancestor = parent_element(&node);
            }
            false
        }
    }
}

/// First descendant of `root` matching `selector`.
pub fn query_selector(root: &Handle, selector: &str) -> Option<Handle> {
    let parsed = parse_or_warn(selector)?;
    dom::descendants(root)
        .into_iter()
        .find(|node| parsed.matches(node))
}

/// All descendants of `root` matching `selector`, in document order.
pub fn query_selector_all(root: &Handle, selector: &str) -> Vec<Handle> {
    let Some(parsed) = parse_or_warn(selector) else {
        return Vec::new();
    };
    dom::descendants(root)
        .into_iter()
        .filter(|node| parsed.matches(node))
        .collect()
}

fn parse_or_warn(selector: &str) -> Option<Selector> {
    let parsed = Selector::parse(selector);
    if parsed.is_none() {
        tracing::warn!("Unsupported selector: {:?}", selector);
    }
    parsed
}
