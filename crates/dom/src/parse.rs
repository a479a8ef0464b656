use std::collections::HashMap;

use scraper::Html;

use crate::node::{Document, ElementData, Namespace, NodeData, NodeId};

/// Marks the element whose children are the parsed fragment when a context
/// wrapper had to be added.
const CONTEXT_MARKER: &str = "data-tessera-context";

/// SVG element names that only get their namespace inside an `<svg>` parent.
const SVG_ONLY_ELEMENTS: &[&str] = &[
    "circle", "clippath", "defs", "ellipse", "foreignobject", "g", "line", "lineargradient",
    "marker", "mask", "path", "pattern", "polygon", "polyline", "radialgradient", "rect",
    "stop", "symbol", "tspan", "use",
];

/// Name of the first start tag in `markup`, lower-cased.
fn first_tag_name(markup: &str) -> Option<String> {
    let bytes = markup.as_bytes();
    let mut i = 0;
    while i + 1 < bytes.len() {
        if bytes[i] == b'<' && bytes[i + 1].is_ascii_alphabetic() {
            let start = i + 1;
            let mut end = start;
            while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'-') {
                end += 1;
            }
            return Some(markup[start..end].to_ascii_lowercase());
        }
        i += 1;
    }
    None
}

/// Wrapper markup that gives table parts and options the parent the HTML
/// parser requires. Without it those start tags are dropped.
fn context_wrapper(tag: &str) -> Option<(String, &'static str)> {
    let (open, close) = match tag {
        "td" | "th" => ("<table><tbody><tr {m}>", "</tr></tbody></table>"),
        "tr" => ("<table><tbody {m}>", "</tbody></table>"),
        "tbody" | "thead" | "tfoot" | "caption" | "colgroup" => ("<table {m}>", "</table>"),
        "col" => ("<table><colgroup {m}>", "</colgroup></table>"),
        "option" | "optgroup" => ("<select {m}>", "</select>"),
        _ => return None,
    };
    Some((open.replace("{m}", CONTEXT_MARKER), close))
}

/// Parse `markup` with `scraper`, adding a context wrapper when the first
/// start tag needs one. Returns whether a wrapper was added.
fn parse_html(markup: &str) -> (Html, bool) {
    match first_tag_name(markup).and_then(|t| context_wrapper(&t)) {
        Some((open, close)) => (Html::parse_fragment(&format!("{open}{markup}{close}")), true),
        None => (Html::parse_fragment(markup), false),
    }
}

impl Document {
    /// Parse an HTML fragment into a new, unwired document.
    pub fn parse_fragment(markup: &str) -> Document {
        let mut doc = Document::new();
        let root = doc.root();
        for node in doc.parse_nodes(markup) {
            // Freshly created nodes cannot form a cycle with the root.
            let _ = doc.append_child(root, node);
        }
        doc
    }

    /// Parse `markup` into detached nodes of this document, returning the
    /// fragment's top-level nodes in order.
    pub fn parse_nodes(&mut self, markup: &str) -> Vec<NodeId> {
        let (html, wrapped) = parse_html(markup);

        let container = if wrapped {
            html.root_element()
                .descendants()
                .find(|n| {
                    n.value()
                        .as_element()
                        .map(|e| e.attr(CONTEXT_MARKER).is_some())
                        .unwrap_or(false)
                })
                .map(|n| n.id())
        } else {
            None
        };
        let container = container.unwrap_or_else(|| html.root_element().id());

        // Preorder walk: a node's parent is always converted before the node.
        let mut mapped = HashMap::new();
        let mut roots = Vec::new();
        let Some(container_ref) = html.tree.get(container) else {
            return roots;
        };
        for node in container_ref.descendants().skip(1) {
            let Some(parent) = node.parent() else { continue };
            let parent_id = if parent.id() == container {
                None
            } else {
                match mapped.get(&parent.id()) {
                    Some(&p) => Some(p),
                    // Parent was skipped, so is this subtree.
                    None => continue,
                }
            };
            let created = match node.value() {
                scraper::Node::Element(el) => {
                    let id = self.create_element_ns(el.name(), Namespace::from_uri(&el.name.ns));
                    if let Ok(data) = self.element_mut(id) {
                        for (name, value) in el.attrs() {
                            if name != CONTEXT_MARKER {
                                data.attributes.push(crate::node::Attribute {
                                    name: name.to_string(),
                                    value: value.to_string(),
                                });
                            }
                        }
                    }
                    id
                }
                scraper::Node::Text(text) => {
                    let text: &str = text;
                    self.create_text(text)
                }
                scraper::Node::Comment(comment) => {
                    let comment: &str = comment;
                    self.create_comment(comment)
                }
                _ => continue,
            };
            mapped.insert(node.id(), created);
            match parent_id {
                Some(p) => {
                    let _ = self.append_child(p, created);
                }
                None => roots.push(created),
            }
        }

        if !wrapped {
            for &root in &roots {
                self.flag_out_of_context(root);
            }
        }
        roots
    }

    /// Flag top-level SVG-only elements that the parser put in the HTML
    /// namespace, together with their HTML-namespace descendants.
    fn flag_out_of_context(&mut self, root: NodeId) {
        let misplaced = matches!(
            self.data(root),
            Some(NodeData::Element(ElementData { name, namespace: Namespace::Html, .. }))
                if SVG_ONLY_ELEMENTS.contains(&name.as_str())
        );
        if !misplaced {
            return;
        }
        let mut nodes = vec![root];
        nodes.extend(self.descendants(root));
        for n in nodes {
            if let Ok(element) = self.element_mut(n) {
                if element.namespace == Namespace::Html {
                    element.out_of_context = true;
                }
            }
        }
    }
}
