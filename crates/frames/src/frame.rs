use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::FrameError;

/// Identifier the host runtime assigns to a component instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentId(pub u32);

/// Identifier the host runtime assigns to an event handler delegate.
/// Zero is never assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventHandlerId(pub u64);

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for EventHandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Value carried by an attribute frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AttributeValue {
    Text(String),
    Bool(bool),
    /// A callback with no textual form. Only rendered when the frame
    /// carries an event handler id.
    Delegate,
}

impl AttributeValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::Text(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::Text(s)
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        AttributeValue::Bool(b)
    }
}

/// One record of a component's render output.
///
/// A component's frames form a flat, depth-first array. Container frames
/// (`Element`, `Component`, `Region`) store their subtree length so a reader
/// can skip a whole branch without following pointers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    Element {
        name: String,
        subtree_length: usize,
    },
    Text {
        content: String,
    },
    Markup {
        content: String,
    },
    Attribute {
        name: String,
        value: AttributeValue,
        event_handler_id: Option<EventHandlerId>,
    },
    Component {
        component_id: ComponentId,
        subtree_length: usize,
    },
    Region {
        subtree_length: usize,
    },
    ReferenceCapture {
        capture_id: String,
    },
}

impl Frame {
    pub fn element(name: impl Into<String>, subtree_length: usize) -> Self {
        Frame::Element { name: name.into(), subtree_length }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Frame::Text { content: content.into() }
    }

    pub fn markup(content: impl Into<String>) -> Self {
        Frame::Markup { content: content.into() }
    }

    pub fn attribute(name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Frame::Attribute {
            name: name.into(),
            value: value.into(),
            event_handler_id: None,
        }
    }

    pub fn handler(name: impl Into<String>, handler_id: EventHandlerId) -> Self {
        Frame::Attribute {
            name: name.into(),
            value: AttributeValue::Delegate,
            event_handler_id: Some(handler_id),
        }
    }

    /// Handler of an attribute frame. Id 0 is never assigned and counts as none.
    pub fn handler_id(&self) -> Option<EventHandlerId> {
        match self {
            Frame::Attribute {
                event_handler_id: Some(id),
                ..
            } if id.0 != 0 => Some(*id),
            _ => None,
        }
    }

    pub fn component(component_id: ComponentId) -> Self {
        Frame::Component { component_id, subtree_length: 1 }
    }

    /// Number of frames covered by this frame, itself included.
    pub fn subtree_length(&self) -> usize {
        match self {
            Frame::Element { subtree_length, .. }
            | Frame::Component { subtree_length, .. }
            | Frame::Region { subtree_length } => *subtree_length,
            _ => 1,
        }
    }

    /// Attribute and reference-capture frames decorate the element before them.
    pub fn is_attribute_like(&self) -> bool {
        matches!(self, Frame::Attribute { .. } | Frame::ReferenceCapture { .. })
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Frame::Element { .. } => "Element",
            Frame::Text { .. } => "Text",
            Frame::Markup { .. } => "Markup",
            Frame::Attribute { .. } => "Attribute",
            Frame::Component { .. } => "Component",
            Frame::Region { .. } => "Region",
            Frame::ReferenceCapture { .. } => "ReferenceCapture",
        }
    }
}

/// Range of frame indices holding the attribute run of the element at `element_index`.
pub fn attribute_run(frames: &[Frame], element_index: usize) -> std::ops::Range<usize> {
    let start = element_index + 1;
    let end = element_index + frames[element_index].subtree_length();
    let mut i = start;
    while i < end && i < frames.len() && frames[i].is_attribute_like() {
        i += 1;
    }
    start..i
}

/// Indices of the logical children within `range`.
///
/// Attribute-like frames contribute nothing; regions are flattened into the
/// surrounding list. Everything else counts as one child.
pub fn logical_children(frames: &[Frame], range: std::ops::Range<usize>) -> Vec<usize> {
    let mut out = Vec::new();
    collect_logical_children(frames, range, &mut out);
    out
}

fn collect_logical_children(frames: &[Frame], range: std::ops::Range<usize>, out: &mut Vec<usize>) {
    let mut i = range.start;
    while i < range.end && i < frames.len() {
        let frame = &frames[i];
        match frame {
            Frame::Attribute { .. } | Frame::ReferenceCapture { .. } => {}
            Frame::Region { subtree_length } => {
                collect_logical_children(frames, i + 1..i + subtree_length, out);
            }
            _ => out.push(i),
        }
        i += frame.subtree_length().max(1);
    }
}

/// Check the structural invariants of a frame array.
///
/// Subtree lengths must stay inside their parent and attribute-like frames
/// may only appear directly after their element, before any content.
pub fn validate_frames(frames: &[Frame]) -> Result<(), FrameError> {
    validate_range(frames, 0, frames.len())
}

fn validate_range(frames: &[Frame], start: usize, end: usize) -> Result<(), FrameError> {
    let mut i = start;
    while i < end {
        let frame = &frames[i];
        let len = frame.subtree_length();
        if len == 0 {
            return Err(FrameError::ZeroSubtreeLength { index: i });
        }
        if i + len > end {
            return Err(FrameError::SubtreeOverrun {
                index: i,
                subtree_length: len,
                limit: end,
            });
        }
        match frame {
            Frame::Element { .. } => {
                let run = attribute_run(frames, i);
                validate_range(frames, run.end, i + len)?;
            }
            Frame::Region { .. } => validate_range(frames, i + 1, i + len)?,
            Frame::Component { .. } => {
                if len != 1 {
                    // Component frames may only carry parameter attributes.
                    for (offset, child) in frames[i + 1..i + len].iter().enumerate() {
                        if !matches!(child, Frame::Attribute { .. }) {
                            return Err(FrameError::UnexpectedFrame {
                                index: i + 1 + offset,
                                kind: child.kind_name(),
                                context: "component parameters",
                            });
                        }
                    }
                }
            }
            Frame::Attribute { .. } | Frame::ReferenceCapture { .. } => {
                return Err(FrameError::UnexpectedFrame {
                    index: i,
                    kind: frame.kind_name(),
                    context: "content",
                });
            }
            Frame::Text { .. } | Frame::Markup { .. } => {}
        }
        i += len;
    }
    Ok(())
}

