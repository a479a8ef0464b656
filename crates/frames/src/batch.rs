use serde::{Deserialize, Serialize};

use crate::frame::{ComponentId, EventHandlerId, Frame};

/// One structural change between two renders of a component.
///
/// Sibling indices address logical children at the current depth: elements,
/// text, markup and component frames count as one child each, attribute
/// frames count as none and regions are flattened into their parent.
/// Reference frame indices point into [`RenderBatch::reference_frames`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RenderTreeEdit {
    PrependFrame {
        sibling_index: usize,
        reference_frame_index: usize,
    },
    RemoveFrame {
        sibling_index: usize,
    },
    SetAttribute {
        sibling_index: usize,
        reference_frame_index: usize,
    },
    RemoveAttribute {
        sibling_index: usize,
        name: String,
    },
    UpdateText {
        sibling_index: usize,
        reference_frame_index: usize,
    },
    UpdateMarkup {
        sibling_index: usize,
        reference_frame_index: usize,
    },
    StepIn {
        sibling_index: usize,
    },
    StepOut,
    PermutationListEntry {
        from_sibling_index: usize,
        to_sibling_index: usize,
    },
    PermutationListEnd,
}

impl RenderTreeEdit {
    pub fn name(&self) -> &'static str {
        match self {
            RenderTreeEdit::PrependFrame { .. } => "PrependFrame",
            RenderTreeEdit::RemoveFrame { .. } => "RemoveFrame",
            RenderTreeEdit::SetAttribute { .. } => "SetAttribute",
            RenderTreeEdit::RemoveAttribute { .. } => "RemoveAttribute",
            RenderTreeEdit::UpdateText { .. } => "UpdateText",
            RenderTreeEdit::UpdateMarkup { .. } => "UpdateMarkup",
            RenderTreeEdit::StepIn { .. } => "StepIn",
            RenderTreeEdit::StepOut => "StepOut",
            RenderTreeEdit::PermutationListEntry { .. } => "PermutationListEntry",
            RenderTreeEdit::PermutationListEnd => "PermutationListEnd",
        }
    }
}

/// The edits produced for one component in one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDiff {
    pub component_id: ComponentId,
    pub edits: Vec<RenderTreeEdit>,
}

/// Everything the host produced in one unit of scheduling work.
///
/// Diffs apply in order. A parent diff that inserts a child component frame
/// always precedes the child's own diff.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderBatch {
    pub updated_components: Vec<ComponentDiff>,
    pub reference_frames: Vec<Frame>,
    pub disposed_component_ids: Vec<ComponentId>,
    pub disposed_event_handler_ids: Vec<EventHandlerId>,
}

impl RenderBatch {
    pub fn new() -> Self {
        RenderBatch::default()
    }

    /// Append a frame subtree to the reference frames, returning the index of its root.
    pub fn add_reference_frames(&mut self, frames: &[Frame]) -> usize {
        let index = self.reference_frames.len();
        self.reference_frames.extend_from_slice(frames);
        index
    }

    pub fn is_empty(&self) -> bool {
        self.updated_components.is_empty()
            && self.disposed_component_ids.is_empty()
            && self.disposed_event_handler_ids.is_empty()
    }

    pub fn edit_count(&self) -> usize {
        self.updated_components.iter().map(|d| d.edits.len()).sum()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
