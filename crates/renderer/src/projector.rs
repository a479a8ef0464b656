use tessera_dom::{escape_text, is_void_element, write_attribute};
use tessera_frames::{attribute_run, logical_children, AttributeValue, ComponentId, Frame, FrameSource};

use crate::error::ProjectionError;

/// Prefix of every attribute the renderer writes for its own bookkeeping.
pub const FRAMEWORK_PREFIX: &str = "tessera:";

/// Attribute name a reference capture is written under.
pub const ELEMENT_REFERENCE_ATTRIBUTE: &str = "tessera:elementReference";

const INTERNAL_PREFIX: &str = "__internal_";

/// An attribute as it appears in projected markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedAttribute {
    pub name: String,
    /// Empty for bare attributes.
    pub value: String,
}

impl ProjectedAttribute {
    fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        ProjectedAttribute {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// How one attribute-like frame is written, or `None` when it is omitted.
///
/// Used by both the string projector and the document patcher, so the two
/// always agree on names and values.
pub fn project_attribute(frame: &Frame) -> Option<ProjectedAttribute> {
    match frame {
        Frame::Attribute { name, value, .. } => match (frame.handler_id(), value) {
            (Some(id), _) => Some(ProjectedAttribute::new(
                format!("{FRAMEWORK_PREFIX}{name}"),
                id.to_string(),
            )),
            (None, value) => project_value(name, value),
        },
        Frame::ReferenceCapture { capture_id } => Some(ProjectedAttribute::new(
            ELEMENT_REFERENCE_ATTRIBUTE,
            capture_id.as_str(),
        )),
        _ => None,
    }
}

fn project_value(name: &str, value: &AttributeValue) -> Option<ProjectedAttribute> {
    match value {
        AttributeValue::Text(text) => Some(ProjectedAttribute::new(name, text.as_str())),
        AttributeValue::Bool(true) => match internal_attribute(name) {
            Some((category, rest)) => Some(ProjectedAttribute::new(
                format!("{FRAMEWORK_PREFIX}{rest}:{category}"),
                "",
            )),
            None => Some(ProjectedAttribute::new(name, "")),
        },
        AttributeValue::Bool(false) | AttributeValue::Delegate => None,
    }
}

/// Every name an attribute frame called `name` can be written under.
/// Removing an attribute removes all of them.
pub fn projected_names(name: &str) -> Vec<String> {
    let mut names = vec![name.to_string(), format!("{FRAMEWORK_PREFIX}{name}")];
    if let Some((category, rest)) = internal_attribute(name) {
        names.push(format!("{FRAMEWORK_PREFIX}{rest}:{category}"));
    }
    names
}

/// Split `__internal_<category>_<name>` into `(category, name)`.
fn internal_attribute(name: &str) -> Option<(&str, &str)> {
    let rest = name.strip_prefix(INTERNAL_PREFIX)?;
    let (category, attribute) = rest.split_once('_')?;
    if category.is_empty() || attribute.is_empty() {
        return None;
    }
    Some((category, attribute))
}

/// Render a component and every component below it to an HTML string.
///
/// The output depends only on the frames `source` returns; projecting the
/// same state twice yields the same string.
pub fn project_component(
    source: &dyn FrameSource,
    component_id: ComponentId,
) -> Result<String, ProjectionError> {
    let mut projector = Projector {
        source,
        out: String::new(),
        select_values: Vec::new(),
    };
    projector.component(component_id)?;
    Ok(projector.out)
}

struct Projector<'a> {
    source: &'a dyn FrameSource,
    out: String,
    /// `value` of each open `<select>`, innermost last.
    select_values: Vec<Option<String>>,
}

impl Projector<'_> {
    fn component(&mut self, component_id: ComponentId) -> Result<(), ProjectionError> {
        let frames = self
            .source
            .frames(component_id)
            .ok_or(ProjectionError::UnknownComponent(component_id))?;
        self.range(component_id, &frames, 0, frames.len())
    }

    fn range(
        &mut self,
        component_id: ComponentId,
        frames: &[Frame],
        start: usize,
        end: usize,
    ) -> Result<(), ProjectionError> {
        let mut i = start;
        while i < end {
            let frame = &frames[i];
            let len = frame.subtree_length();
            if len == 0 {
                return Err(ProjectionError::ZeroSubtreeLength { component_id, index: i });
            }
            if i + len > end {
                return Err(ProjectionError::SubtreeOverrun {
                    component_id,
                    index: i,
                    subtree_length: len,
                    limit: end,
                });
            }
            match frame {
                Frame::Element { name, .. } => self.element(component_id, frames, i, name)?,
                Frame::Text { content } => self.out.push_str(&escape_text(content)),
                Frame::Markup { content } => self.out.push_str(content),
                Frame::Component { component_id: child, .. } => self.component(*child)?,
                Frame::Region { .. } => self.range(component_id, frames, i + 1, i + len)?,
                Frame::Attribute { .. } | Frame::ReferenceCapture { .. } => {
                    return Err(ProjectionError::StrayAttribute { component_id, index: i });
                }
            }
            i += len;
        }
        Ok(())
    }

    fn element(
        &mut self,
        component_id: ComponentId,
        frames: &[Frame],
        index: usize,
        name: &str,
    ) -> Result<(), ProjectionError> {
        let run = attribute_run(frames, index);
        let end = index + frames[index].subtree_length();
        let attributes = &frames[run.clone()];

        self.out.push('<');
        self.out.push_str(name);
        let mut has_selected = false;
        for frame in attributes {
            if let Some(attr) = project_attribute(frame) {
                has_selected |= attr.name == "selected";
                write_attribute(&mut self.out, &attr.name, &attr.value);
            }
        }

        let is_select = name == "select";
        if name == "option" && !has_selected && self.option_is_selected(attributes) {
            write_attribute(&mut self.out, "selected", "");
        }

        if is_void_element(name) && logical_children(frames, run.end..end).is_empty() {
            self.out.push_str(" />");
            return Ok(());
        }
        self.out.push('>');

        if is_select {
            self.select_values.push(text_attribute(attributes, "value"));
        }
        let inner = self.range(component_id, frames, run.end, end);
        if is_select {
            self.select_values.pop();
        }
        inner?;

        self.out.push_str("</");
        self.out.push_str(name);
        self.out.push('>');
        Ok(())
    }

    fn option_is_selected(&self, attributes: &[Frame]) -> bool {
        match (self.select_values.last(), text_attribute(attributes, "value")) {
            (Some(Some(selected)), Some(value)) => *selected == value,
            _ => false,
        }
    }
}

/// Last text value of the attribute `name` in an attribute run.
fn text_attribute(attributes: &[Frame], name: &str) -> Option<String> {
    attributes.iter().rev().find_map(|frame| match frame {
        Frame::Attribute {
            name: n,
            value: AttributeValue::Text(v),
            ..
        } if n == name && frame.handler_id().is_none() => Some(v.clone()),
        _ => None,
    })
}
