//! Accessibility tree representation for tests and the `a11y` command.
//!
//! Roles and names follow the subset of the ARIA mapping that the portfolio
//! markup uses. Elements without a role are flattened into their parent.

use crate::dom::{Document, NodeId};
use crate::rendering::Layout;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessibilityNode {
    pub id: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expanded: Option<bool>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub focused: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<(i32, i32, u32, u32)>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<AccessibilityNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessibilityTree {
    pub root_id: Option<String>,
    pub nodes: Vec<AccessibilityNode>,
}

impl AccessibilityTree {
    /// Depth-first search over the exported nodes
    pub fn find(&self, role: &str, name: &str) -> Option<&AccessibilityNode> {
        fn walk<'a>(nodes: &'a [AccessibilityNode], role: &str, name: &str) -> Option<&'a AccessibilityNode> {
            for n in nodes {
                if n.role == role && name_matches(n.name.as_deref(), name) {
                    return Some(n);
                }
                if let Some(found) = walk(&n.children, role, name) {
                    return Some(found);
                }
            }
            None
        }
        walk(&self.nodes, role, name)
    }
}

pub trait AccessibilityProvider {
    /// Export a reproducible accessibility tree snapshot
    fn export_tree(&self) -> AccessibilityTree;
}

/// Accessibility view over a [`Document`], optionally with layout bounds
pub struct DocumentAccessibility<'a> {
    doc: &'a Document,
    layout: Option<&'a Layout>,
}

impl<'a> DocumentAccessibility<'a> {
    pub fn new(doc: &'a Document) -> Self {
        Self { doc, layout: None }
    }

    pub fn with_layout(mut self, layout: &'a Layout) -> Self {
        self.layout = Some(layout);
        self
    }

    fn collect(&self, node: NodeId) -> Vec<AccessibilityNode> {
        let doc = self.doc;
        if !doc.is_rendered(node) {
            return Vec::new();
        }
        let children: Vec<AccessibilityNode> = doc
            .element_children(node)
            .flat_map(|c| self.collect(c))
            .collect();

        let Some(role) = role(doc, node) else {
            return children;
        };
        let id = doc
            .attr(node, "id")
            .map(str::to_string)
            .unwrap_or_else(|| format!("node-{}", node.index()));
        vec![AccessibilityNode {
            id,
            role,
            name: accessible_name(doc, node),
            expanded: doc.attr(node, "aria-expanded").map(|v| v == "true"),
            focused: doc.focused() == Some(node),
            bounds: self
                .layout
                .and_then(|l| l.rect(node))
                .map(|r| (r.x, r.y, r.width, r.height)),
            children,
        }]
    }
}

impl AccessibilityProvider for DocumentAccessibility<'_> {
    fn export_tree(&self) -> AccessibilityTree {
        let start = self.doc.body().unwrap_or_else(|| self.doc.root());
        let nodes = self.collect(start);
        AccessibilityTree {
            root_id: nodes.first().map(|n| n.id.clone()),
            nodes,
        }
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// ARIA role of an element, `None` for generic containers
pub fn role(doc: &Document, node: NodeId) -> Option<String> {
    if let Some(explicit) = doc.attr(node, "role") {
        let explicit = explicit.trim();
        if !explicit.is_empty() && explicit != "presentation" && explicit != "none" {
            return Some(explicit.to_string());
        }
        return None;
    }
    let implicit = match doc.tag(node)? {
        "button" => "button",
        "a" if doc.has_attr(node, "href") => "link",
        "img" if doc.attr(node, "alt").is_some_and(|a| !a.trim().is_empty()) => "img",
        "nav" => "navigation",
        "main" => "main",
        "header" => "banner",
        "footer" => "contentinfo",
        "dialog" => "dialog",
        "ul" | "ol" => "list",
        "li" => "listitem",
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => "heading",
        _ => return None,
    };
    Some(implicit.to_string())
}

/// Accessible name: `aria-label`, then `alt` for images, then the text of
/// the subtree (falling back to descendant image alts).
pub fn accessible_name(doc: &Document, node: NodeId) -> Option<String> {
    if let Some(label) = doc.attr(node, "aria-label") {
        let label = collapse_whitespace(label);
        if !label.is_empty() {
            return Some(label);
        }
    }
    if doc.tag(node) == Some("img") {
        return doc
            .attr(node, "alt")
            .map(collapse_whitespace)
            .filter(|a| !a.is_empty());
    }
    let text = collapse_whitespace(&doc.text_content(node));
    if !text.is_empty() {
        return Some(text);
    }
    let alts: Vec<String> = doc
        .descendants(node)
        .into_iter()
        .filter(|d| doc.tag(*d) == Some("img"))
        .filter_map(|d| doc.attr(d, "alt").map(collapse_whitespace))
        .filter(|a| !a.is_empty())
        .collect();
    (!alts.is_empty()).then(|| alts.join(" "))
}

// Case-insensitive substring match, like a non-exact `getByRole` name.
fn name_matches(name: Option<&str>, wanted: &str) -> bool {
    name.is_some_and(|n| n.to_lowercase().contains(&wanted.to_lowercase()))
}

/// First rendered element with `role` whose accessible name contains `name`
pub fn find_by_role(doc: &Document, role_name: &str, name: &str) -> Option<NodeId> {
    doc.descendants(doc.root()).into_iter().find(|n| {
        doc.is_rendered(*n)
            && role(doc, *n).as_deref() == Some(role_name)
            && name_matches(accessible_name(doc, *n).as_deref(), name)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
        <nav><button id="menu" aria-label="Toggle navigation" aria-expanded="false"><span></span></button></nav>
        <main>
          <h2>Gallery</h2>
          <div class="artwork-image" role="button" tabindex="0"><img src="a.webp" alt="Blue Lungs"></div>
          <div class="placeholder"><img src="p.svg" alt=""></div>
        </main>
    </body></html>"#;

    #[test]
    fn exports_roles_and_names() {
        let doc = Document::parse(PAGE);
        let tree = DocumentAccessibility::new(&doc).export_tree();
        let nav = &tree.nodes[0];
        assert_eq!(nav.role, "navigation");
        let button = tree.find("button", "toggle navigation").unwrap();
        assert_eq!(button.expanded, Some(false));
        assert_eq!(button.id, "menu");

        let artwork = tree.find("button", "Blue Lungs").unwrap();
        assert_eq!(artwork.children[0].role, "img");
        assert!(tree.find("img", "").is_some());
    }

    #[test]
    fn empty_alt_is_presentational() {
        let doc = Document::parse(PAGE);
        let tree = DocumentAccessibility::new(&doc).export_tree();
        let json = serde_json::to_string(&tree).unwrap();
        assert!(!json.contains("p.svg"));
        assert_eq!(json.matches("\"role\":\"img\"").count(), 1);
    }

    #[test]
    fn find_by_role_resolves_nodes() {
        let doc = Document::parse(PAGE);
        let heading = find_by_role(&doc, "heading", "gallery").unwrap();
        assert_eq!(doc.tag(heading), Some("h2"));
        assert!(find_by_role(&doc, "link", "anything").is_none());
    }
}
