use std::any::Any;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::DomError;

/// Index of a node in its [`Document`] arena. Stable until the node is
/// released with [`Document::release`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Html,
    Svg,
    MathMl,
}

impl Namespace {
    pub fn from_uri(uri: &str) -> Self {
        match uri {
            SVG_URI => Namespace::Svg,
            MATHML_URI => Namespace::MathMl,
            _ => Namespace::Html,
        }
    }

    pub fn uri(self) -> &'static str {
        match self {
            Namespace::Html => HTML_URI,
            Namespace::Svg => SVG_URI,
            Namespace::MathMl => MATHML_URI,
        }
    }

    /// Namespace the HTML parser gives an element `name` opened inside an
    /// element `parent_name` of namespace `self`.
    ///
    /// `svg` and `math` start foreign content. It ends again below
    /// `foreignObject` and the MathML text elements.
    pub fn for_child(self, parent_name: &str, name: &str) -> Namespace {
        if name.eq_ignore_ascii_case("svg") {
            return Namespace::Svg;
        }
        if name.eq_ignore_ascii_case("math") {
            return Namespace::MathMl;
        }
        match self {
            Namespace::Svg if !parent_name.eq_ignore_ascii_case("foreignObject") => Namespace::Svg,
            Namespace::MathMl if !MATHML_TEXT_ELEMENTS.contains(&parent_name) => Namespace::MathMl,
            _ => Namespace::Html,
        }
    }
}

const HTML_URI: &str = "http://www.w3.org/1999/xhtml";
const SVG_URI: &str = "http://www.w3.org/2000/svg";
const MATHML_URI: &str = "http://www.w3.org/1998/Math/MathML";

const MATHML_TEXT_ELEMENTS: &[&str] = &["mi", "mo", "mn", "ms", "mtext", "annotation-xml"];

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementData {
    pub name: String,
    pub namespace: Namespace,
    pub attributes: Vec<Attribute>,
    /// Set by the fragment parser when the element was parsed outside the
    /// parent context that would have given it its proper namespace.
    pub out_of_context: bool,
}

impl ElementData {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Document,
    Element(ElementData),
    Text(String),
    Comment(String),
}

impl NodeData {
    pub fn kind_name(&self) -> &'static str {
        match self {
            NodeData::Document => "document",
            NodeData::Element(_) => "element",
            NodeData::Text(_) => "text",
            NodeData::Comment(_) => "comment",
        }
    }
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// An HTML node tree stored as an arena.
///
/// Detached nodes keep their slot until they are released; released slots
/// are reused by later nodes. Documents built by a renderer carry a weak
/// reference to their owner, which is how simulated events find their way
/// back to the framework.
#[derive(Clone)]
pub struct Document {
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
    owner: Option<Weak<dyn Any>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.node_count())
            .field("wired", &self.owner.is_some())
            .field("html", &self.to_html())
            .finish()
    }
}

impl Document {
    pub fn new() -> Self {
        Document {
            nodes: vec![Some(Node {
                data: NodeData::Document,
                parent: None,
                children: Vec::new(),
            })],
            free: Vec::new(),
            owner: None,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Attach the object that handles events raised on this document.
    pub fn set_owner(&mut self, owner: Weak<dyn Any>) {
        self.owner = Some(owner);
    }

    pub fn owner(&self) -> Option<Rc<dyn Any>> {
        self.owner.as_ref().and_then(Weak::upgrade)
    }

    pub fn is_wired(&self) -> bool {
        self.owner().is_some()
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let node = Some(Node {
            data,
            parent: None,
            children: Vec::new(),
        });
        match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = node;
                NodeId(slot)
            }
            None => {
                self.nodes.push(node);
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.create_element_ns(name, Namespace::Html)
    }

    pub fn create_element_ns(&mut self, name: &str, namespace: Namespace) -> NodeId {
        self.push(NodeData::Element(ElementData {
            name: name.to_string(),
            namespace,
            attributes: Vec::new(),
            out_of_context: false,
        }))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Comment(text.to_string()))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    fn node(&self, id: NodeId) -> Result<&Node, DomError> {
        self.get(id).ok_or(DomError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, DomError> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(DomError::UnknownNode(id))
    }

    pub fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.get(id).map(|n| &n.data)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match self.data(id) {
            Some(NodeData::Element(e)) => Some(e),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData, DomError> {
        match &mut self.node_mut(id)?.data {
            NodeData::Element(e) => Ok(e),
            _ => Err(DomError::NotAnElement(id)),
        }
    }

    /// Lower-case local name of an element node.
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.name.as_str())
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    /// True when the node can be reached from the document root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(n) = current {
            if n == self.root() {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.attribute(name))
    }

    /// Set an attribute, keeping its position if it already exists.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let element = self.element_mut(id)?;
        match element.attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value.to_string(),
            None => element.attributes.push(Attribute {
                name: name.to_string(),
                value: value.to_string(),
            }),
        }
        Ok(())
    }

    /// Remove an attribute. Returns whether it was present.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<bool, DomError> {
        let element = self.element_mut(id)?;
        let before = element.attributes.len();
        element.attributes.retain(|a| a.name != name);
        Ok(element.attributes.len() != before)
    }

    /// Character data of a text or comment node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.data(id) {
            Some(NodeData::Text(t)) | Some(NodeData::Comment(t)) => Some(t),
            _ => None,
        }
    }

    /// Replace the character data of a text or comment node in place.
    pub fn set_text(&mut self, id: NodeId, text: &str) -> Result<(), DomError> {
        match &mut self.node_mut(id)?.data {
            NodeData::Text(t) | NodeData::Comment(t) => {
                *t = text.to_string();
                Ok(())
            }
            _ => Err(DomError::NotCharacterData(id)),
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` under `parent` before `reference`, or last when `reference` is `None`.
    /// The child is detached from its previous parent first.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        self.node(parent)?;
        self.node(child)?;
        if child == self.root() || child == parent || self.is_ancestor(child, parent) {
            return Err(DomError::InvalidInsertion {
                parent,
                child,
                reason: "would create a cycle",
            });
        }
        if matches!(self.node(parent)?.data, NodeData::Text(_) | NodeData::Comment(_)) {
            return Err(DomError::InvalidInsertion {
                parent,
                child,
                reason: "character data cannot have children",
            });
        }
        self.detach(child)?;
        let siblings = &mut self.node_mut(parent)?.children;
        let position = match reference {
            Some(r) => siblings.iter().position(|&c| c == r).ok_or(DomError::InvalidInsertion {
                parent,
                child,
                reason: "reference node is not a child of parent",
            })?,
            None => siblings.len(),
        };
        siblings.insert(position, child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Remove a node from its parent. The subtree stays intact and can be reinserted.
    pub fn detach(&mut self, id: NodeId) -> Result<(), DomError> {
        let parent = self.node(id)?.parent;
        if let Some(parent) = parent {
            self.node_mut(parent)?.children.retain(|&c| c != id);
            self.node_mut(id)?.parent = None;
        }
        Ok(())
    }

    /// Detach `id` and free the slots of its whole subtree. The released ids
    /// become unknown and may name new nodes later.
    pub fn release(&mut self, id: NodeId) -> Result<(), DomError> {
        if id == self.root() {
            return Err(DomError::ReleaseRoot);
        }
        self.detach(id)?;
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(n.0).and_then(Option::take) {
                stack.extend(node.children);
                self.free.push(n.0);
            }
        }
        Ok(())
    }

    fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.parent(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// Nodes under `id` in document order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.children(n).iter().rev().copied());
        }
        out
    }

    /// Nearest ancestor element with the given tag name.
    pub fn closest_ancestor(&self, id: NodeId, tag: &str) -> Option<NodeId> {
        let mut current = self.parent(id);
        while let Some(n) = current {
            if self.tag_name(n) == Some(tag) {
                return Some(n);
            }
            current = self.parent(n);
        }
        None
    }

    /// Concatenated text of all text nodes under `id` (or `id` itself if it is text).
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(NodeData::Text(t)) = self.data(id) {
            return t.clone();
        }
        self.descendants(id)
            .into_iter()
            .filter_map(|n| match self.data(n) {
                Some(NodeData::Text(t)) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Deep-copy `node` from another document into this one, detached.
    pub fn import(&mut self, source: &Document, node: NodeId) -> Result<NodeId, DomError> {
        let data = source.node(node)?.data.clone();
        let copy = match data {
            NodeData::Document => self.create_element("template"),
            other => self.push(other),
        };
        for &child in source.children(node) {
            let imported = self.import(source, child)?;
            self.append_child(copy, imported)?;
        }
        Ok(copy)
    }

    /// A new unwired document holding copies of `nodes` as root children.
    pub fn extract(&self, nodes: &[NodeId]) -> Result<Document, DomError> {
        let mut doc = Document::new();
        let root = doc.root();
        for &n in nodes {
            let copy = doc.import(self, n)?;
            doc.append_child(root, copy)?;
        }
        Ok(doc)
    }

    /// Nodes not yet released, attached or not.
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// Size of the arena, released slots included.
    pub fn slot_count(&self) -> usize {
        self.nodes.len()
    }

    /// True when the root has no children.
    pub fn is_empty(&self) -> bool {
        self.children(self.root()).is_empty()
    }
}
