use std::collections::{HashMap, HashSet};

use tessera_dom::{Document, Namespace, NodeId};
use tessera_frames::{
    attribute_run, logical_children, validate_frames, ComponentDiff, ComponentId, EventHandlerId,
    Frame, RenderTreeEdit,
};
use tracing::{debug, trace};

use crate::error::PatchError;
use crate::projector::{project_attribute, projected_names};

/// One entry of the event handler table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerRegistration {
    pub component_id: ComponentId,
    pub event_name: String,
}

/// A component's output as the host sees it: one node per logical child.
///
/// Components have no DOM node of their own. Their content sits directly
/// in the parent element, between the logical siblings around them.
#[derive(Debug, Clone)]
enum LogicalNode {
    Element { node: NodeId, children: Vec<LogicalNode> },
    Text(NodeId),
    Markup(Vec<NodeId>),
    Component(ComponentId),
}

impl LogicalNode {
    fn kind_name(&self) -> &'static str {
        match self {
            LogicalNode::Element { .. } => "element",
            LogicalNode::Text(_) => "text",
            LogicalNode::Markup(_) => "markup",
            LogicalNode::Component(_) => "component",
        }
    }
}

#[derive(Debug, Default)]
struct ComponentEntry {
    children: Vec<LogicalNode>,
    /// Component whose frames reference this one; `None` for roots.
    host: Option<ComponentId>,
}

/// Applies render batches to a live document.
///
/// Edits are applied in place, so node ids seen by a test stay valid across
/// renders as long as the node itself survives.
#[derive(Debug)]
pub struct Patcher {
    document: Document,
    components: HashMap<ComponentId, ComponentEntry>,
    roots: Vec<ComponentId>,
    handlers: HashMap<EventHandlerId, HandlerRegistration>,
    /// Component that created each node. Nodes parsed from markup are only
    /// recorded at their top level.
    owners: HashMap<NodeId, ComponentId>,
    /// Options built from frames. Markup content is left as written.
    options: HashSet<NodeId>,
    /// Options whose `selected` was added to mirror their select's value.
    injected_selected: HashSet<NodeId>,
}

impl Default for Patcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Patcher {
    pub fn new() -> Self {
        Patcher {
            document: Document::new(),
            components: HashMap::new(),
            roots: Vec::new(),
            handlers: HashMap::new(),
            owners: HashMap::new(),
            options: HashSet::new(),
            injected_selected: HashSet::new(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn is_attached(&self, component_id: ComponentId) -> bool {
        self.components.contains_key(&component_id)
    }

    /// Register a root component. Its content is appended after earlier roots.
    pub fn attach_root(&mut self, component_id: ComponentId) -> Result<(), PatchError> {
        if self.components.contains_key(&component_id) {
            return Err(PatchError::ComponentAlreadyAttached(component_id));
        }
        self.components.insert(component_id, ComponentEntry::default());
        self.roots.push(component_id);
        debug!(component = %component_id, "root attached");
        Ok(())
    }

    /// Apply one component's edits. `reference_frames` is the batch's frame array.
    pub fn apply_diff(
        &mut self,
        diff: &ComponentDiff,
        reference_frames: &[Frame],
    ) -> Result<(), PatchError> {
        let component = diff.component_id;
        if !self.components.contains_key(&component) {
            return Err(PatchError::UnknownComponent(component));
        }
        let mut path: Vec<usize> = Vec::new();
        let mut permutation: Vec<(usize, usize)> = Vec::new();

        for edit in &diff.edits {
            trace!(component = %component, edit = edit.name(), depth = path.len(), "applying edit");
            match edit {
                RenderTreeEdit::PrependFrame {
                    sibling_index,
                    reference_frame_index,
                } => {
                    let frames = subtree(reference_frames, *reference_frame_index)?;
                    let (namespace, parent_name) = self.scope(component, &path)?;
                    let nodes = self.build_top(component, frames, (namespace, parent_name.as_str()))?;
                    self.insert(component, &path, *sibling_index, nodes)?;
                }
                RenderTreeEdit::RemoveFrame { sibling_index } => {
                    self.remove(component, &path, *sibling_index)?;
                }
                RenderTreeEdit::SetAttribute {
                    sibling_index,
                    reference_frame_index,
                } => {
                    let element = self.element_at(component, &path, *sibling_index, edit.name())?;
                    let frame = reference_frame(reference_frames, *reference_frame_index)?;
                    self.set_attribute(component, element, frame)?;
                }
                RenderTreeEdit::RemoveAttribute {
                    sibling_index,
                    name,
                } => {
                    let element = self.element_at(component, &path, *sibling_index, edit.name())?;
                    self.clear_attribute(element, name)?;
                    self.sync_after_attribute(element, name)?;
                }
                RenderTreeEdit::UpdateText {
                    sibling_index,
                    reference_frame_index,
                } => {
                    let node = match self.child(component, &path, *sibling_index)? {
                        LogicalNode::Text(node) => *node,
                        other => {
                            return Err(unexpected(component, edit.name(), *sibling_index, "text", other))
                        }
                    };
                    match reference_frame(reference_frames, *reference_frame_index)? {
                        Frame::Text { content } => self.document.set_text(node, content)?,
                        other => return Err(unexpected_frame(edit.name(), other)),
                    }
                }
                RenderTreeEdit::UpdateMarkup {
                    sibling_index,
                    reference_frame_index,
                } => {
                    let content = match reference_frame(reference_frames, *reference_frame_index)? {
                        Frame::Markup { content } => content,
                        other => return Err(unexpected_frame(edit.name(), other)),
                    };
                    self.update_markup(component, &path, *sibling_index, content)?;
                }
                RenderTreeEdit::StepIn { sibling_index } => {
                    self.element_at(component, &path, *sibling_index, edit.name())?;
                    path.push(*sibling_index);
                }
                RenderTreeEdit::StepOut => {
                    path.pop().ok_or(PatchError::UnbalancedStepOut(component))?;
                }
                RenderTreeEdit::PermutationListEntry {
                    from_sibling_index,
                    to_sibling_index,
                } => permutation.push((*from_sibling_index, *to_sibling_index)),
                RenderTreeEdit::PermutationListEnd => {
                    let entries = std::mem::take(&mut permutation);
                    self.permute(component, &path, &entries)?;
                }
            }
        }
        Ok(())
    }

    /// Drop a disposed component: its remaining nodes leave the document and
    /// its handlers leave the table. Unknown ids are ignored, since removing a
    /// parent frame already forgets the components inside it.
    pub fn dispose_component(&mut self, component_id: ComponentId) -> Result<(), PatchError> {
        if self.components.contains_key(&component_id) {
            for node in self.component_nodes(component_id)? {
                self.release(node)?;
            }
            self.forget(&LogicalNode::Component(component_id));
        }
        self.roots.retain(|r| *r != component_id);
        let before = self.handlers.len();
        self.handlers.retain(|_, reg| reg.component_id != component_id);
        debug!(
            component = %component_id,
            handlers = before - self.handlers.len(),
            "component disposed"
        );
        Ok(())
    }

    pub fn dispose_handler(&mut self, handler_id: EventHandlerId) {
        if self.handlers.remove(&handler_id).is_some() {
            trace!(handler = %handler_id, "handler disposed");
        }
    }

    pub fn handler(&self, handler_id: EventHandlerId) -> Option<&HandlerRegistration> {
        self.handlers.get(&handler_id)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Top-level DOM nodes of a component, nested components flattened, in order.
    pub fn component_nodes(&self, component_id: ComponentId) -> Result<Vec<NodeId>, PatchError> {
        let entry = self
            .components
            .get(&component_id)
            .ok_or(PatchError::UnknownComponent(component_id))?;
        let mut out = Vec::new();
        for child in &entry.children {
            self.collect_dom(child, &mut out);
        }
        Ok(out)
    }

    /// First and last DOM node of a component, or `None` while it renders nothing.
    pub fn component_span(
        &self,
        component_id: ComponentId,
    ) -> Result<Option<(NodeId, NodeId)>, PatchError> {
        let nodes = self.component_nodes(component_id)?;
        Ok(nodes.first().zip(nodes.last()).map(|(a, b)| (*a, *b)))
    }

    /// Serialized markup of a component's live nodes.
    pub fn component_html(&self, component_id: ComponentId) -> Result<String, PatchError> {
        Ok(self.document.nodes_html(&self.component_nodes(component_id)?))
    }

    /// Component whose frames produced `node` or its nearest recorded ancestor.
    pub fn owning_component(&self, node: NodeId) -> Option<ComponentId> {
        let mut current = Some(node);
        while let Some(n) = current {
            if let Some(owner) = self.owners.get(&n) {
                return Some(*owner);
            }
            current = self.document.parent(n);
        }
        None
    }

    // Building

    /// Nodes for a prepended frame. A region contributes one node per logical child.
    fn build_top(
        &mut self,
        owner: ComponentId,
        frames: &[Frame],
        parent: (Namespace, &str),
    ) -> Result<Vec<LogicalNode>, PatchError> {
        match frames.first() {
            Some(Frame::Region { .. }) => logical_children(frames, 1..frames.len())
                .into_iter()
                .map(|i| self.build(owner, frames, i, parent))
                .collect(),
            Some(_) => Ok(vec![self.build(owner, frames, 0, parent)?]),
            None => Ok(Vec::new()),
        }
    }

    /// Build the node for `frames[index]` below an element described by
    /// `parent`, whose namespace decides the namespace of new elements.
    fn build(
        &mut self,
        owner: ComponentId,
        frames: &[Frame],
        index: usize,
        parent: (Namespace, &str),
    ) -> Result<LogicalNode, PatchError> {
        match &frames[index] {
            Frame::Element { name, subtree_length } => {
                let namespace = parent.0.for_child(parent.1, name);
                let element = self.document.create_element_ns(name, namespace);
                self.owners.insert(element, owner);
                if name == "option" {
                    self.options.insert(element);
                }
                let run = attribute_run(frames, index);
                for frame in &frames[run.clone()] {
                    if let Some(attr) = project_attribute(frame) {
                        self.document.set_attribute(element, &attr.name, &attr.value)?;
                    }
                    self.register_handler(owner, frame)?;
                }
                let mut children = Vec::new();
                for child in logical_children(frames, run.end..index + subtree_length) {
                    let node = self.build(owner, frames, child, (namespace, name.as_str()))?;
                    for dom in self.dom_nodes(&node) {
                        self.document.append_child(element, dom)?;
                    }
                    children.push(node);
                }
                Ok(LogicalNode::Element { node: element, children })
            }
            Frame::Text { content } => {
                let text = self.document.create_text(content);
                self.owners.insert(text, owner);
                Ok(LogicalNode::Text(text))
            }
            Frame::Markup { content } => Ok(LogicalNode::Markup(self.parse_markup(owner, content))),
            Frame::Component { component_id, .. } => {
                if self.components.contains_key(component_id) {
                    return Err(PatchError::ComponentAlreadyAttached(*component_id));
                }
                self.components.insert(
                    *component_id,
                    ComponentEntry {
                        children: Vec::new(),
                        host: Some(owner),
                    },
                );
                debug!(component = %component_id, host = %owner, "child component attached");
                Ok(LogicalNode::Component(*component_id))
            }
            other => Err(unexpected_frame("PrependFrame", other)),
        }
    }

    fn parse_markup(&mut self, owner: ComponentId, content: &str) -> Vec<NodeId> {
        let nodes = self.document.parse_nodes(content);
        for &node in &nodes {
            self.owners.insert(node, owner);
        }
        nodes
    }

    fn register_handler(&mut self, owner: ComponentId, frame: &Frame) -> Result<(), PatchError> {
        let (Frame::Attribute { name, .. }, Some(id)) = (frame, frame.handler_id()) else {
            return Ok(());
        };
        let registration = HandlerRegistration {
            component_id: owner,
            event_name: name.clone(),
        };
        match self.handlers.get(&id) {
            Some(existing) if *existing != registration => Err(PatchError::DuplicateHandler {
                handler_id: id,
                existing: existing.component_id,
            }),
            Some(_) => Ok(()),
            None => {
                self.handlers.insert(id, registration);
                Ok(())
            }
        }
    }

    // Structural edits

    fn insert(
        &mut self,
        component: ComponentId,
        path: &[usize],
        index: usize,
        nodes: Vec<LogicalNode>,
    ) -> Result<(), PatchError> {
        let len = self.list(component, path)?.len();
        if index > len {
            return Err(PatchError::SiblingOutOfRange {
                component_id: component,
                sibling_index: index,
                len,
            });
        }
        let parent = self.dom_parent(component, path)?;
        let anchor = self.anchor(component, path, index)?;
        let mut inserted = Vec::new();
        for node in &nodes {
            for dom in self.dom_nodes(node) {
                self.document.insert_before(parent, dom, anchor)?;
                inserted.push(dom);
            }
        }
        let list = self.list_mut(component, path)?;
        for (offset, node) in nodes.into_iter().enumerate() {
            list.insert(index + offset, node);
        }
        self.sync_inserted(&inserted)
    }

    fn remove(&mut self, component: ComponentId, path: &[usize], index: usize) -> Result<(), PatchError> {
        let list = self.list_mut(component, path)?;
        if index >= list.len() {
            return Err(PatchError::SiblingOutOfRange {
                component_id: component,
                sibling_index: index,
                len: list.len(),
            });
        }
        let node = list.remove(index);
        for dom in self.dom_nodes(&node) {
            self.release(dom)?;
        }
        self.forget(&node);
        Ok(())
    }

    fn update_markup(
        &mut self,
        component: ComponentId,
        path: &[usize],
        index: usize,
        content: &str,
    ) -> Result<(), PatchError> {
        let old = match self.child(component, path, index)? {
            LogicalNode::Markup(nodes) => nodes.clone(),
            other => return Err(unexpected(component, "UpdateMarkup", index, "markup", other)),
        };
        let parent = self.dom_parent(component, path)?;
        let anchor = self.anchor(component, path, index + 1)?;
        for node in old {
            self.release(node)?;
        }
        let fresh = self.parse_markup(component, content);
        for &node in &fresh {
            self.document.insert_before(parent, node, anchor)?;
        }
        self.list_mut(component, path)?[index] = LogicalNode::Markup(fresh);
        Ok(())
    }

    fn permute(
        &mut self,
        component: ComponentId,
        path: &[usize],
        entries: &[(usize, usize)],
    ) -> Result<(), PatchError> {
        let list = self.list_mut(component, path)?;
        let original = list.clone();
        for &(from, to) in entries {
            if from >= original.len() || to >= original.len() {
                return Err(PatchError::PermutationOutOfRange {
                    from,
                    to,
                    len: original.len(),
                });
            }
            list[to] = original[from].clone();
        }
        let reordered = list.clone();
        let parent = self.dom_parent(component, path)?;
        let anchor = self.anchor(component, path, reordered.len())?;
        for node in &reordered {
            for dom in self.dom_nodes(node) {
                self.document.insert_before(parent, dom, anchor)?;
            }
        }
        Ok(())
    }

    fn set_attribute(
        &mut self,
        owner: ComponentId,
        element: NodeId,
        frame: &Frame,
    ) -> Result<(), PatchError> {
        let Frame::Attribute { name, .. } = frame else {
            return Err(unexpected_frame("SetAttribute", frame));
        };
        self.clear_attribute(element, name)?;
        if let Some(attr) = project_attribute(frame) {
            self.document.set_attribute(element, &attr.name, &attr.value)?;
        }
        self.register_handler(owner, frame)?;
        self.sync_after_attribute(element, name)
    }

    /// Remove every projected form of the attribute `name`.
    fn clear_attribute(&mut self, element: NodeId, name: &str) -> Result<(), PatchError> {
        for projected in projected_names(name) {
            self.document.remove_attribute(element, &projected)?;
        }
        if name == "selected" {
            self.injected_selected.remove(&element);
        }
        Ok(())
    }

    /// Detach `node` and free its subtree along with what is recorded about it.
    fn release(&mut self, node: NodeId) -> Result<(), PatchError> {
        let mut nodes = self.document.descendants(node);
        nodes.push(node);
        for n in &nodes {
            self.owners.remove(n);
            self.options.remove(n);
            self.injected_selected.remove(n);
        }
        self.document.release(node)?;
        Ok(())
    }

    /// Forget components inside a removed subtree.
    fn forget(&mut self, node: &LogicalNode) {
        match node {
            LogicalNode::Element { children, .. } => {
                for child in children {
                    self.forget(child);
                }
            }
            LogicalNode::Component(id) => {
                if let Some(entry) = self.components.remove(id) {
                    for child in &entry.children {
                        self.forget(child);
                    }
                }
            }
            LogicalNode::Text(_) | LogicalNode::Markup(_) => {}
        }
    }

    // Option selection

    fn sync_after_attribute(&mut self, element: NodeId, name: &str) -> Result<(), PatchError> {
        let tag = self.document.tag_name(element).map(str::to_string);
        match tag.as_deref() {
            Some("option") if self.options.contains(&element) => self.sync_option(element),
            Some("select") if name == "value" => {
                let options: Vec<NodeId> = self
                    .options
                    .iter()
                    .copied()
                    .filter(|o| self.document.closest_ancestor(*o, "select") == Some(element))
                    .collect();
                for option in options {
                    self.sync_option(option)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn sync_inserted(&mut self, inserted: &[NodeId]) -> Result<(), PatchError> {
        let mut options = Vec::new();
        for &node in inserted {
            if self.options.contains(&node) {
                options.push(node);
            }
            options.extend(
                self.document
                    .descendants(node)
                    .into_iter()
                    .filter(|n| self.options.contains(n)),
            );
        }
        for option in options {
            self.sync_option(option)?;
        }
        Ok(())
    }

    /// Mark `option` selected exactly when its value equals its select's
    /// value, unless the frames set `selected` themselves. The injected
    /// attribute always goes last.
    fn sync_option(&mut self, option: NodeId) -> Result<(), PatchError> {
        let injected = self.injected_selected.contains(&option);
        if !injected && self.document.attribute(option, "selected").is_some() {
            return Ok(());
        }
        let selected = {
            let select_value = self
                .document
                .closest_ancestor(option, "select")
                .and_then(|select| self.document.attribute(select, "value"));
            matches!(
                (select_value, self.document.attribute(option, "value")),
                (Some(s), Some(v)) if s == v
            )
        };
        if injected {
            self.document.remove_attribute(option, "selected")?;
            self.injected_selected.remove(&option);
        }
        if selected {
            self.document.set_attribute(option, "selected", "")?;
            self.injected_selected.insert(option);
        }
        Ok(())
    }

    // Navigation

    fn list(&self, component: ComponentId, path: &[usize]) -> Result<&Vec<LogicalNode>, PatchError> {
        let mut list = &self
            .components
            .get(&component)
            .ok_or(PatchError::UnknownComponent(component))?
            .children;
        for &index in path {
            list = match list.get(index) {
                Some(LogicalNode::Element { children, .. }) => children,
                Some(other) => return Err(unexpected(component, "StepIn", index, "element", other)),
                None => {
                    return Err(PatchError::SiblingOutOfRange {
                        component_id: component,
                        sibling_index: index,
                        len: list.len(),
                    })
                }
            };
        }
        Ok(list)
    }

    fn list_mut(
        &mut self,
        component: ComponentId,
        path: &[usize],
    ) -> Result<&mut Vec<LogicalNode>, PatchError> {
        // Validate with shared borrows first so the error paths need no `&mut`.
        self.list(component, path)?;
        let mut list = &mut self
            .components
            .get_mut(&component)
            .ok_or(PatchError::UnknownComponent(component))?
            .children;
        for &index in path {
            list = match list.get_mut(index) {
                Some(LogicalNode::Element { children, .. }) => children,
                _ => return Err(PatchError::UnknownComponent(component)),
            };
        }
        Ok(list)
    }

    fn child(
        &self,
        component: ComponentId,
        path: &[usize],
        index: usize,
    ) -> Result<&LogicalNode, PatchError> {
        let list = self.list(component, path)?;
        list.get(index).ok_or(PatchError::SiblingOutOfRange {
            component_id: component,
            sibling_index: index,
            len: list.len(),
        })
    }

    fn element_at(
        &self,
        component: ComponentId,
        path: &[usize],
        index: usize,
        edit: &'static str,
    ) -> Result<NodeId, PatchError> {
        match self.child(component, path, index)? {
            LogicalNode::Element { node, .. } => Ok(*node),
            other => Err(unexpected(component, edit, index, "element", other)),
        }
    }

    /// Where `component` sits inside its host's logical tree.
    fn locate(&self, component: ComponentId) -> Result<Option<(ComponentId, Vec<usize>, usize)>, PatchError> {
        let entry = self
            .components
            .get(&component)
            .ok_or(PatchError::UnknownComponent(component))?;
        let Some(host) = entry.host else {
            return Ok(None);
        };
        let host_entry = self
            .components
            .get(&host)
            .ok_or(PatchError::DetachedComponent(component))?;
        let mut path = Vec::new();
        match find_component(&host_entry.children, component, &mut path) {
            Some(index) => Ok(Some((host, path, index))),
            None => Err(PatchError::DetachedComponent(component)),
        }
    }

    /// DOM node that holds the children listed at `path`.
    fn dom_parent(&self, component: ComponentId, path: &[usize]) -> Result<NodeId, PatchError> {
        if let Some((&last, prefix)) = path.split_last() {
            return self.element_at(component, prefix, last, "StepIn");
        }
        match self.locate(component)? {
            Some((host, host_path, _)) => self.dom_parent(host, &host_path),
            None => Ok(self.document.root()),
        }
    }

    /// Namespace and tag name of the element holding the children at `path`.
    /// Content at the document root is built as HTML.
    fn scope(&self, component: ComponentId, path: &[usize]) -> Result<(Namespace, String), PatchError> {
        let parent = self.dom_parent(component, path)?;
        Ok(self
            .document
            .element(parent)
            .map(|e| (e.namespace, e.name.clone()))
            .unwrap_or((Namespace::Html, String::new())))
    }

    /// DOM node to insert before so new content lands at logical position
    /// `index`, or `None` to append.
    fn anchor(
        &self,
        component: ComponentId,
        path: &[usize],
        index: usize,
    ) -> Result<Option<NodeId>, PatchError> {
        let list = self.list(component, path)?;
        if let Some(node) = list.iter().skip(index).find_map(|n| self.first_dom(n)) {
            return Ok(Some(node));
        }
        if !path.is_empty() {
            return Ok(None);
        }
        match self.locate(component)? {
            Some((host, host_path, position)) => self.anchor(host, &host_path, position + 1),
            None => {
                let later = self.roots.iter().skip_while(|r| **r != component).skip(1);
                Ok(later
                    .filter_map(|r| self.components.get(r))
                    .find_map(|entry| entry.children.iter().find_map(|n| self.first_dom(n))))
            }
        }
    }

    fn first_dom(&self, node: &LogicalNode) -> Option<NodeId> {
        match node {
            LogicalNode::Element { node, .. } | LogicalNode::Text(node) => Some(*node),
            LogicalNode::Markup(nodes) => nodes.first().copied(),
            LogicalNode::Component(id) => self
                .components
                .get(id)
                .and_then(|entry| entry.children.iter().find_map(|n| self.first_dom(n))),
        }
    }

    fn dom_nodes(&self, node: &LogicalNode) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_dom(node, &mut out);
        out
    }

    fn collect_dom(&self, node: &LogicalNode, out: &mut Vec<NodeId>) {
        match node {
            LogicalNode::Element { node, .. } | LogicalNode::Text(node) => out.push(*node),
            LogicalNode::Markup(nodes) => out.extend(nodes),
            LogicalNode::Component(id) => {
                if let Some(entry) = self.components.get(id) {
                    for child in &entry.children {
                        self.collect_dom(child, out);
                    }
                }
            }
        }
    }
}

fn find_component(list: &[LogicalNode], target: ComponentId, path: &mut Vec<usize>) -> Option<usize> {
    for (i, node) in list.iter().enumerate() {
        match node {
            LogicalNode::Component(id) if *id == target => return Some(i),
            LogicalNode::Element { children, .. } => {
                path.push(i);
                if let Some(found) = find_component(children, target, path) {
                    return Some(found);
                }
                path.pop();
            }
            _ => {}
        }
    }
    None
}

/// The subtree starting at `index`, structurally checked.
fn subtree(frames: &[Frame], index: usize) -> Result<&[Frame], PatchError> {
    let first = reference_frame(frames, index)?;
    let end = index + first.subtree_length().max(1);
    if end > frames.len() {
        return Err(PatchError::ReferenceFrameOutOfRange {
            index: end - 1,
            len: frames.len(),
        });
    }
    let slice = &frames[index..end];
    validate_frames(slice)?;
    Ok(slice)
}

fn reference_frame(frames: &[Frame], index: usize) -> Result<&Frame, PatchError> {
    frames.get(index).ok_or(PatchError::ReferenceFrameOutOfRange {
        index,
        len: frames.len(),
    })
}

fn unexpected(
    component_id: ComponentId,
    edit: &'static str,
    sibling_index: usize,
    expected: &'static str,
    found: &LogicalNode,
) -> PatchError {
    PatchError::UnexpectedNode {
        component_id,
        edit,
        sibling_index,
        expected,
        found: found.kind_name(),
    }
}

fn unexpected_frame(edit: &'static str, frame: &Frame) -> PatchError {
    PatchError::UnexpectedFrame {
        edit,
        kind: frame.kind_name(),
    }
}
