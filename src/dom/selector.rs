//! A small CSS selector subset used to address the page's DOM contract.
//!
//! Supported: type selectors, `#id`, `.class`, `[attr]`, `[attr=value]`,
//! `:first-child`, `:last-child`, and the descendant combinator
//! (whitespace). That covers every selector the controllers and the
//! scenario tests use, e.g. `.artwork:last-child .artwork-image`.

use crate::{Error, Result};

/// An attribute condition inside a compound selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrMatch {
    pub name: String,
    pub value: Option<String>,
}

/// A compound selector: every condition must hold on the same element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Compound {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attrs: Vec<AttrMatch>,
    pub first_child: bool,
    pub last_child: bool,
}

/// A chain of compound selectors joined by descendant combinators,
/// stored left to right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    parts: Vec<Compound>,
}

impl Selector {
    /// Parse a selector string
    pub fn parse(input: &str) -> Result<Self> {
        let parts = split_compounds(input)
            .into_iter()
            .map(|chunk| parse_compound(chunk, input))
            .collect::<Result<Vec<_>>>()?;
        if parts.is_empty() {
            return Err(invalid(input, "empty selector"));
        }
        Ok(Self { parts })
    }

    pub fn parts(&self) -> &[Compound] {
        &self.parts
    }
}

impl std::str::FromStr for Selector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Selector::parse(s)
    }
}

fn invalid(selector: &str, reason: impl Into<String>) -> Error {
    Error::Selector {
        selector: selector.to_string(),
        reason: reason.into(),
    }
}

// Split on whitespace that is not inside brackets or quotes.
fn split_compounds(input: &str) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start: Option<usize> = None;

    for (i, ch) in input.char_indices() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None => match ch {
                '"' | '\'' => quote = Some(ch),
                '[' => depth += 1,
                ']' => depth = depth.saturating_sub(1),
                c if c.is_whitespace() && depth == 0 => {
                    if let Some(s) = start.take() {
                        chunks.push(&input[s..i]);
                    }
                    continue;
                }
                _ => {}
            },
        }
        if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        chunks.push(&input[s..]);
    }
    chunks
}

fn is_ident(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn next_boundary(s: &str) -> usize {
    s.find(['#', '.', '[', ':']).unwrap_or(s.len())
}

fn parse_compound(chunk: &str, full: &str) -> Result<Compound> {
    let mut compound = Compound::default();

    let end = next_boundary(chunk);
    let tag = &chunk[..end];
    if !tag.is_empty() && tag != "*" {
        if !is_ident(tag) {
            return Err(invalid(full, format!("bad type selector `{}`", tag)));
        }
        compound.tag = Some(tag.to_ascii_lowercase());
    }

    let mut rest = &chunk[end..];
    while let Some(ch) = rest.chars().next() {
        match ch {
            '#' | '.' => {
                let body = &rest[1..];
                let end = next_boundary(body);
                let name = &body[..end];
                if !is_ident(name) {
                    return Err(invalid(full, format!("bad name after `{}`", ch)));
                }
                if ch == '#' {
                    compound.id = Some(name.to_string());
                } else {
                    compound.classes.push(name.to_string());
                }
                rest = &body[end..];
            }
            '[' => {
                let close = rest
                    .find(']')
                    .ok_or_else(|| invalid(full, "unterminated attribute selector"))?;
                compound.attrs.push(parse_attr(&rest[1..close], full)?);
                rest = &rest[close + 1..];
            }
            ':' => {
                let body = &rest[1..];
                let end = next_boundary(body);
                match &body[..end] {
                    "first-child" => compound.first_child = true,
                    "last-child" => compound.last_child = true,
                    other => {
                        return Err(invalid(full, format!("unsupported pseudo-class `:{}`", other)))
                    }
                }
                rest = &body[end..];
            }
            _ => return Err(invalid(full, format!("unexpected `{}`", ch))),
        }
    }
    Ok(compound)
}

fn parse_attr(inner: &str, full: &str) -> Result<AttrMatch> {
    let (name, value) = match inner.split_once('=') {
        Some((n, v)) => {
            let v = v.trim();
            let v = v
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .or_else(|| v.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                .unwrap_or(v);
            (n.trim(), Some(v.to_string()))
        }
        None => (inner.trim(), None),
    };
    if !is_ident(name) {
        return Err(invalid(full, format!("bad attribute name `{}`", name)));
    }
    Ok(AttrMatch {
        name: name.to_ascii_lowercase(),
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_descendant_chain_with_pseudo() {
        let sel = Selector::parse(".artwork:last-child .artwork-image").unwrap();
        let parts = sel.parts();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].classes, vec!["artwork".to_string()]);
        assert!(parts[0].last_child);
        assert_eq!(parts[1].classes, vec!["artwork-image".to_string()]);
    }

    #[test]
    fn parses_attribute_with_quoted_spaces() {
        let sel = Selector::parse(r#"meta[name="og title"]"#).unwrap();
        let part = &sel.parts()[0];
        assert_eq!(part.tag.as_deref(), Some("meta"));
        assert_eq!(part.attrs[0].value.as_deref(), Some("og title"));
    }

    #[test]
    fn parses_id_and_classes_on_one_element() {
        let sel = Selector::parse("div#lightbox.lightbox.active").unwrap();
        let part = &sel.parts()[0];
        assert_eq!(part.id.as_deref(), Some("lightbox"));
        assert_eq!(part.classes.len(), 2);
    }

    #[test]
    fn rejects_unsupported_pseudo_and_empty_input() {
        assert!(Selector::parse("a:hover").is_err());
        assert!(Selector::parse("   ").is_err());
        assert!(Selector::parse("[unterminated").is_err());
    }
}
