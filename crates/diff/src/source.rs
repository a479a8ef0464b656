use tessera_dom::{Document, NodeData, NodeId};

/// A node taking part in a comparison, with its position among the
/// unfiltered siblings and its path from the compared roots.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonSource {
    pub node: NodeId,
    pub index: usize,
    pub path: String,
}

/// An attribute taking part in a comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSource {
    pub element: NodeId,
    pub name: String,
    pub value: String,
    pub path: String,
}

/// Path segment name for a node: the tag name, `#text` or `#comment`.
pub fn segment_name(doc: &Document, node: NodeId) -> String {
    match doc.data(node) {
        Some(NodeData::Element(e)) => e.name.to_ascii_lowercase(),
        Some(NodeData::Text(_)) => "#text".to_string(),
        Some(NodeData::Comment(_)) => "#comment".to_string(),
        Some(NodeData::Document) | None => "#document".to_string(),
    }
}

/// Sources for a sibling list. `parent_path` is `None` for the compared roots.
pub fn child_sources(
    doc: &Document,
    nodes: &[NodeId],
    parent_path: Option<&str>,
) -> Vec<ComparisonSource> {
    nodes
        .iter()
        .enumerate()
        .map(|(index, &node)| {
            let segment = format!("{}({index})", segment_name(doc, node));
            let path = match parent_path {
                Some(parent) => format!("{parent} > {segment}"),
                None => segment,
            };
            ComparisonSource { node, index, path }
        })
        .collect()
}

/// Attribute sources of an element, in document order.
pub fn attribute_sources(doc: &Document, source: &ComparisonSource) -> Vec<AttributeSource> {
    match doc.element(source.node) {
        Some(element) => element
            .attributes
            .iter()
            .map(|a| AttributeSource {
                element: source.node,
                name: a.name.clone(),
                value: a.value.clone(),
                path: format!("{}[{}]", source.path, a.name),
            })
            .collect(),
        None => Vec::new(),
    }
}

/// Short human description of a node for reports.
pub fn describe_node(doc: &Document, node: NodeId) -> String {
    match doc.data(node) {
        Some(NodeData::Element(e)) => format!("<{}>", e.name),
        Some(NodeData::Text(t)) => format!("#text {:?}", abbreviate(t)),
        Some(NodeData::Comment(c)) => format!("#comment {:?}", abbreviate(c)),
        Some(NodeData::Document) => "#document".to_string(),
        None => format!("unknown node {node}"),
    }
}

fn abbreviate(text: &str) -> String {
    const MAX: usize = 40;
    if text.chars().count() <= MAX {
        text.to_string()
    } else {
        let head: String = text.chars().take(MAX).collect();
        format!("{head}...")
    }
}
