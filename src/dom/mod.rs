//! Mutable, headless document model.
//!
//! HTML is parsed once with `scraper` and copied into an arena of nodes so
//! the controllers can mutate classes and attributes, and move focus, the
//! way page scripts do in a browser. Nodes are addressed by [`NodeId`],
//! which stays valid for the lifetime of the document.

pub mod selector;

pub use selector::Selector;

use crate::Result;
use scraper::Html;
use serde::Serialize;

/// Tags that never produce a rendered box
const UNRENDERED_TAGS: &[&str] = &["head", "title", "meta", "link", "script", "style", "template"];

/// Tags that take focus without a `tabindex`
const NATIVELY_FOCUSABLE: &[&str] = &["button", "input", "select", "textarea"];

/// Handle to a node of a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct ElementData {
    pub tag: String,
    attrs: Vec<(String, String)>,
}

impl ElementData {
    pub fn attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[derive(Debug, Clone)]
pub enum NodeData {
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

/// An element class that is only rendered while it also carries
/// `shown_by`, e.g. `.lightbox` needs `.active` to be visible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayRule {
    pub class: String,
    pub shown_by: String,
}

impl OverlayRule {
    pub fn new(class: impl Into<String>, shown_by: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            shown_by: shown_by.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    focused: Option<NodeId>,
    overlays: Vec<OverlayRule>,
}

impl Document {
    /// Parse an HTML document. The root node is the `<html>` element.
    pub fn parse(html: &str) -> Self {
        let parsed = Html::parse_document(html);
        let mut doc = Document {
            nodes: Vec::new(),
            root: NodeId(0),
            focused: None,
            overlays: Vec::new(),
        };

        // Preorder walk; children are pushed reversed so nodes are created
        // in document order and appended to their parent in order.
        let mut stack = vec![(*parsed.root_element(), None::<NodeId>)];
        while let Some((node, parent)) = stack.pop() {
            let data = match node.value() {
                scraper::Node::Element(el) => NodeData::Element(ElementData {
                    tag: el.name().to_ascii_lowercase(),
                    attrs: el
                        .attrs()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                }),
                scraper::Node::Text(text) => NodeData::Text(String::from(&**text)),
                _ => continue,
            };
            let id = doc.push(parent, data);
            let children: Vec<_> = node.children().collect();
            for child in children.into_iter().rev() {
                stack.push((child, Some(id)));
            }
        }
        doc
    }

    fn push(&mut self, parent: Option<NodeId>, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            data,
        });
        if let Some(p) = parent {
            self.nodes[p.0].children.push(id);
        }
        id
    }

    /// Append a new element under `parent`, the way a script inserts
    /// markup after load
    pub fn append_element(&mut self, parent: NodeId, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let data = NodeData::Element(ElementData {
            tag: tag.to_ascii_lowercase(),
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });
        self.push(Some(parent), data)
    }

    pub fn set_overlay_rules(&mut self, rules: Vec<OverlayRule>) {
        self.overlays = rules;
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn data(&self, node: NodeId) -> &NodeData {
        &self.nodes[node.0].data
    }

    pub fn element(&self, node: NodeId) -> Option<&ElementData> {
        match &self.nodes.get(node.0)?.data {
            NodeData::Element(el) => Some(el),
            NodeData::Text(_) => None,
        }
    }

    fn element_mut(&mut self, node: NodeId) -> Option<&mut ElementData> {
        match &mut self.nodes.get_mut(node.0)?.data {
            NodeData::Element(el) => Some(el),
            NodeData::Text(_) => None,
        }
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|el| el.tag.as_str())
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0)?.parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    pub fn element_children(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(node)
            .iter()
            .copied()
            .filter(move |c| self.element(*c).is_some())
    }

    /// Element descendants of `node` in document order, excluding `node`
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.element_children(node).collect();
        stack.reverse();
        while let Some(n) = stack.pop() {
            out.push(n);
            let mut kids: Vec<NodeId> = self.element_children(n).collect();
            kids.reverse();
            stack.extend(kids);
        }
        out
    }

    /// Inclusive ancestor check
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    // --- attributes ---

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node)?
            .attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, node: NodeId, name: &str) -> bool {
        self.attr(node, name).is_some()
    }

    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(el) = self.element_mut(node) {
            match el.attrs.iter_mut().find(|(k, _)| k == name) {
                Some((_, v)) => *v = value.to_string(),
                None => el.attrs.push((name.to_string(), value.to_string())),
            }
        }
    }

    // --- class list ---

    pub fn classes(&self, node: NodeId) -> impl Iterator<Item = &str> {
        self.attr(node, "class").unwrap_or("").split_whitespace()
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.classes(node).any(|c| c == class)
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) {
        if self.element(node).is_none() || self.has_class(node, class) {
            return;
        }
        let mut list: Vec<String> = self.classes(node).map(str::to_string).collect();
        list.push(class.to_string());
        self.set_attr(node, "class", &list.join(" "));
    }

    pub fn remove_class(&mut self, node: NodeId, class: &str) {
        if !self.has_class(node, class) {
            return;
        }
        let list: Vec<String> = self
            .classes(node)
            .filter(|c| *c != class)
            .map(str::to_string)
            .collect();
        self.set_attr(node, "class", &list.join(" "));
    }

    /// Toggle `class`; returns whether it is present afterwards
    pub fn toggle_class(&mut self, node: NodeId, class: &str) -> bool {
        if self.has_class(node, class) {
            self.remove_class(node, class);
            false
        } else {
            self.add_class(node, class);
            self.has_class(node, class)
        }
    }

    // --- text ---

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            match &self.nodes[n.0].data {
                NodeData::Text(t) => out.push_str(t),
                NodeData::Element(_) => {
                    stack.extend(self.nodes[n.0].children.iter().rev().copied());
                }
            }
        }
        out
    }

    /// Replace all children of `node` with a single text node. An existing
    /// text child is rewritten in place so repeated updates do not grow the
    /// arena.
    pub fn set_text_content(&mut self, node: NodeId, text: &str) {
        if self.element(node).is_none() {
            return;
        }
        let old = std::mem::take(&mut self.nodes[node.0].children);
        let mut kept = None;
        for child in old {
            if kept.is_none() {
                if let NodeData::Text(t) = &mut self.nodes[child.0].data {
                    t.clear();
                    t.push_str(text);
                    kept = Some(child);
                    continue;
                }
            }
            self.nodes[child.0].parent = None;
            if self.focused.is_some_and(|f| self.contains(child, f)) {
                self.focused = None;
            }
        }
        match kept {
            Some(child) => self.nodes[node.0].children.push(child),
            None => {
                self.push(Some(node), NodeData::Text(text.to_string()));
            }
        }
    }

    pub fn title(&self) -> String {
        self.descendants(self.root)
            .into_iter()
            .find(|n| self.tag(*n) == Some("title"))
            .map(|n| self.text_content(n).trim().to_string())
            .unwrap_or_default()
    }

    pub fn body(&self) -> Option<NodeId> {
        self.element_children(self.root)
            .find(|n| self.tag(*n) == Some("body"))
    }

    // --- lookup ---

    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants_inclusive(self.root)
            .into_iter()
            .find(|n| self.attr(*n, "id") == Some(id))
    }

    fn descendants_inclusive(&self, node: NodeId) -> Vec<NodeId> {
        let mut all = vec![node];
        all.extend(self.descendants(node));
        all
    }

    /// First element matching `selector` in the whole document
    pub fn query(&self, selector: &str) -> Result<Option<NodeId>> {
        Ok(self.query_all(selector)?.into_iter().next())
    }

    pub fn query_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        let sel = Selector::parse(selector)?;
        Ok(self.select_within(self.root, &sel, true))
    }

    /// First descendant of `scope` matching `selector`
    pub fn query_within(&self, scope: NodeId, selector: &str) -> Result<Option<NodeId>> {
        Ok(self.query_all_within(scope, selector)?.into_iter().next())
    }

    pub fn query_all_within(&self, scope: NodeId, selector: &str) -> Result<Vec<NodeId>> {
        let sel = Selector::parse(selector)?;
        Ok(self.select_within(scope, &sel, false))
    }

    pub fn select_within(&self, scope: NodeId, sel: &Selector, inclusive: bool) -> Vec<NodeId> {
        let candidates = if inclusive {
            self.descendants_inclusive(scope)
        } else {
            self.descendants(scope)
        };
        candidates
            .into_iter()
            .filter(|n| self.matches(*n, sel))
            .collect()
    }

    /// Nearest inclusive ancestor matching `sel`
    pub fn closest(&self, node: NodeId, sel: &Selector) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(n) = current {
            if self.matches(n, sel) {
                return Some(n);
            }
            current = self.parent(n);
        }
        None
    }

    pub fn matches(&self, node: NodeId, sel: &Selector) -> bool {
        let Some((last, ancestors)) = sel.parts().split_last() else {
            return false;
        };
        if !self.matches_compound(node, last) {
            return false;
        }
        // Descendant-only chains: nearest matching ancestor is always safe.
        let mut current = node;
        for part in ancestors.iter().rev() {
            loop {
                match self.parent(current) {
                    Some(p) => {
                        current = p;
                        if self.matches_compound(p, part) {
                            break;
                        }
                    }
                    None => return false,
                }
            }
        }
        true
    }

    fn matches_compound(&self, node: NodeId, c: &selector::Compound) -> bool {
        let Some(el) = self.element(node) else {
            return false;
        };
        if c.tag.as_deref().is_some_and(|t| t != el.tag) {
            return false;
        }
        if c.id.as_deref().is_some_and(|id| self.attr(node, "id") != Some(id)) {
            return false;
        }
        if !c.classes.iter().all(|cl| self.has_class(node, cl)) {
            return false;
        }
        let attrs_ok = c.attrs.iter().all(|a| match (&a.value, self.attr(node, &a.name)) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(want), Some(have)) => want == have,
        });
        if !attrs_ok {
            return false;
        }
        if c.first_child || c.last_child {
            let Some(parent) = self.parent(node) else {
                return false;
            };
            let siblings: Vec<NodeId> = self.element_children(parent).collect();
            if c.first_child && siblings.first() != Some(&node) {
                return false;
            }
            if c.last_child && siblings.last() != Some(&node) {
                return false;
            }
        }
        true
    }

    // --- rendering and focus ---

    /// Whether `node` would produce a box: not inside `<head>`-like
    /// content, not `hidden`, and not inside an overlay that is shut.
    pub fn is_rendered(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if let Some(el) = self.element(n) {
                if UNRENDERED_TAGS.contains(&el.tag.as_str()) || self.has_attr(n, "hidden") {
                    return false;
                }
                let shut = self
                    .overlays
                    .iter()
                    .any(|r| self.has_class(n, &r.class) && !self.has_class(n, &r.shown_by));
                if shut {
                    return false;
                }
            }
            current = self.parent(n);
        }
        true
    }

    /// Whether `node` is an overlay root (fixed to the viewport, out of flow)
    pub fn is_overlay(&self, node: NodeId) -> bool {
        self.overlays.iter().any(|r| self.has_class(node, &r.class))
    }

    fn tabindex(&self, node: NodeId) -> Option<i32> {
        self.attr(node, "tabindex")?.trim().parse().ok()
    }

    /// Whether `focus()` can ever land on this element
    pub fn is_focusable(&self, node: NodeId) -> bool {
        let Some(el) = self.element(node) else {
            return false;
        };
        if self.has_attr(node, "disabled") {
            return false;
        }
        self.tabindex(node).is_some()
            || NATIVELY_FOCUSABLE.contains(&el.tag.as_str())
            || (el.tag == "a" && self.has_attr(node, "href"))
    }

    /// Focusable, rendered and reachable with Tab
    pub fn is_tabbable(&self, node: NodeId) -> bool {
        self.is_focusable(node)
            && self.tabindex(node).map_or(true, |t| t >= 0)
            && self.is_rendered(node)
    }

    /// Tab order: positive tabindex ascending, then document order
    pub fn tab_order(&self) -> Vec<NodeId> {
        let mut positive = Vec::new();
        let mut natural = Vec::new();
        for n in self.descendants(self.root) {
            if !self.is_tabbable(n) {
                continue;
            }
            match self.tabindex(n) {
                Some(t) if t > 0 => positive.push((t, n)),
                _ => natural.push(n),
            }
        }
        positive.sort_by_key(|(t, n)| (*t, *n));
        positive.into_iter().map(|(_, n)| n).chain(natural).collect()
    }

    /// Move focus to `node`; a no-op returning `false` when the element is
    /// not focusable or not rendered.
    pub fn focus(&mut self, node: NodeId) -> bool {
        if self.is_focusable(node) && self.is_rendered(node) {
            self.focused = Some(node);
            true
        } else {
            false
        }
    }

    pub fn blur(&mut self) {
        self.focused = None;
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    /// Nearest inclusive ancestor that can take focus right now
    pub fn focusable_ancestor(&self, node: NodeId) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(n) = current {
            if self.is_focusable(n) && self.is_rendered(n) {
                return Some(n);
            }
            current = self.parent(n);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r##"<html><head><title> Gallery </title></head><body>
        <a class="skip-link" href="#main">Skip</a>
        <ul class="list"><li id="a">One</li><li id="b">Two <b>bold</b></li><li id="c" class="x y">Three</li></ul>
        <div class="overlay"><button id="inner">Inner</button></div>
        <div tabindex="-1" id="programmatic">P</div>
        <span tabindex="2" id="first">F</span>
    </body></html>"##;

    #[test]
    fn parses_tree_and_text() {
        let doc = Document::parse(PAGE);
        assert_eq!(doc.tag(doc.root()), Some("html"));
        assert_eq!(doc.title(), "Gallery");
        let b = doc.get_element_by_id("b").unwrap();
        assert_eq!(doc.text_content(b), "Two bold");
    }

    #[test]
    fn pseudo_classes_and_descendants_match() {
        let doc = Document::parse(PAGE);
        let last = doc.query(".list li:last-child").unwrap().unwrap();
        assert_eq!(doc.attr(last, "id"), Some("c"));
        let first = doc.query("ul li:first-child").unwrap().unwrap();
        assert_eq!(doc.attr(first, "id"), Some("a"));
        assert_eq!(doc.query_all("li").unwrap().len(), 3);
        assert!(doc.query(".missing li").unwrap().is_none());
    }

    #[test]
    fn set_text_content_reuses_text_node() {
        let mut doc = Document::parse(PAGE);
        let b = doc.get_element_by_id("b").unwrap();
        doc.set_text_content(b, "first");
        let len = doc.len();
        for caption in ["second", "third", ""] {
            doc.set_text_content(b, caption);
            assert_eq!(doc.text_content(b), caption);
        }
        assert_eq!(doc.len(), len);
        assert_eq!(doc.children(b).len(), 1);
        assert!(doc.query("#b b").unwrap().is_none());
    }

    #[test]
    fn class_list_round_trip() {
        let mut doc = Document::parse(PAGE);
        let c = doc.get_element_by_id("c").unwrap();
        assert!(doc.toggle_class(c, "active"));
        assert!(doc.has_class(c, "x") && doc.has_class(c, "active"));
        assert!(!doc.toggle_class(c, "active"));
        assert_eq!(doc.attr(c, "class"), Some("x y"));
        doc.remove_class(c, "nope");
        assert_eq!(doc.attr(c, "class"), Some("x y"));
    }

    #[test]
    fn overlay_rules_gate_focus() {
        let mut doc = Document::parse(PAGE);
        doc.set_overlay_rules(vec![OverlayRule::new("overlay", "active")]);
        let inner = doc.get_element_by_id("inner").unwrap();
        assert!(!doc.focus(inner));
        assert_eq!(doc.focused(), None);

        let overlay = doc.query(".overlay").unwrap().unwrap();
        doc.add_class(overlay, "active");
        assert!(doc.focus(inner));
        assert_eq!(doc.focused(), Some(inner));
    }

    #[test]
    fn tab_order_puts_positive_tabindex_first_and_skips_negative() {
        let doc = Document::parse(PAGE);
        let order = doc.tab_order();
        assert_eq!(doc.attr(order[0], "id"), Some("first"));
        assert!(doc.has_class(order[1], "skip-link"));
        let programmatic = doc.get_element_by_id("programmatic").unwrap();
        assert!(!order.contains(&programmatic));
        assert!(doc.is_focusable(programmatic));
    }

    #[test]
    fn set_text_content_replaces_children() {
        let mut doc = Document::parse(PAGE);
        let b = doc.get_element_by_id("b").unwrap();
        doc.set_text_content(b, "Replaced");
        assert_eq!(doc.text_content(b), "Replaced");
        assert!(doc.query("#b b").unwrap().is_none());
    }
}
