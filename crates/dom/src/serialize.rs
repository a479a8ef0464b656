use crate::node::{Document, NodeData, NodeId};

/// Elements that never have content and may be written self-closed.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

pub fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name))
}

pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
    out
}

/// Write ` name="value"`, or just ` name` when the value is empty.
pub fn write_attribute(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    if !value.is_empty() {
        out.push_str("=\"");
        out.push_str(&escape_attribute(value));
        out.push('"');
    }
}

impl Document {
    /// Markup of everything under the document root.
    pub fn to_html(&self) -> String {
        self.inner_html(self.root())
    }

    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(&mut out, id);
        out
    }

    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for &child in self.children(id) {
            self.write_node(&mut out, child);
        }
        out
    }

    /// Markup of several sibling nodes, in order.
    pub fn nodes_html(&self, nodes: &[NodeId]) -> String {
        let mut out = String::new();
        for &n in nodes {
            self.write_node(&mut out, n);
        }
        out
    }

    fn write_node(&self, out: &mut String, id: NodeId) {
        match self.data(id) {
            None => {}
            Some(NodeData::Document) => {
                for &child in self.children(id) {
                    self.write_node(out, child);
                }
            }
            Some(NodeData::Text(t)) => out.push_str(&escape_text(t)),
            Some(NodeData::Comment(c)) => {
                out.push_str("<!--");
                out.push_str(c);
                out.push_str("-->");
            }
            Some(NodeData::Element(e)) => {
                out.push('<');
                out.push_str(&e.name);
                for attr in &e.attributes {
                    write_attribute(out, &attr.name, &attr.value);
                }
                let children = self.children(id);
                if children.is_empty() && is_void_element(&e.name) {
                    out.push_str(" />");
                    return;
                }
                out.push('>');
                for &child in children {
                    self.write_node(out, child);
                }
                out.push_str("</");
                out.push_str(&e.name);
                out.push('>');
            }
        }
    }
}
