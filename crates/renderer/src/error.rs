use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tessera_diff::DiffReport;
use tessera_dom::{DomError, NodeId};
use tessera_frames::{ComponentId, EventHandlerId, FrameError, HostError};
use thiserror::Error;

/// Frames that cannot be turned into markup. Always fatal.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProjectionError {
    #[error("component {component_id}: attribute frame at {index} is outside an attribute run")]
    StrayAttribute {
        component_id: ComponentId,
        index: usize,
    },

    #[error("unknown component: {0}")]
    UnknownComponent(ComponentId),

    #[error("component {component_id}: frame {index} subtree length {subtree_length} runs past {limit}")]
    SubtreeOverrun {
        component_id: ComponentId,
        index: usize,
        subtree_length: usize,
        limit: usize,
    },

    #[error("component {component_id}: frame {index} has a zero subtree length")]
    ZeroSubtreeLength {
        component_id: ComponentId,
        index: usize,
    },
}

/// A batch that does not fit the live document. Always fatal.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PatchError {
    #[error("unknown component: {0}")]
    UnknownComponent(ComponentId),

    #[error("component {0} is already attached")]
    ComponentAlreadyAttached(ComponentId),

    #[error("component {0} is not attached to the document")]
    DetachedComponent(ComponentId),

    #[error("component {component_id}: sibling index {sibling_index} out of range ({len} children)")]
    SiblingOutOfRange {
        component_id: ComponentId,
        sibling_index: usize,
        len: usize,
    },

    #[error("component {component_id}: {edit} expects {expected} at sibling {sibling_index}, found {found}")]
    UnexpectedNode {
        component_id: ComponentId,
        edit: &'static str,
        sibling_index: usize,
        expected: &'static str,
        found: &'static str,
    },

    #[error("reference frame {index} out of range ({len} frames)")]
    ReferenceFrameOutOfRange { index: usize, len: usize },

    #[error("{edit} cannot use a {kind} reference frame")]
    UnexpectedFrame {
        edit: &'static str,
        kind: &'static str,
    },

    #[error("StepOut without a matching StepIn in component {0}")]
    UnbalancedStepOut(ComponentId),

    #[error("permutation {from} -> {to} out of range ({len} children)")]
    PermutationOutOfRange { from: usize, to: usize, len: usize },

    #[error("event handler {handler_id} is already registered to component {existing}")]
    DuplicateHandler {
        handler_id: EventHandlerId,
        existing: ComponentId,
    },

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Dom(#[from] DomError),
}

/// A simulated event that could not be delivered.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DispatchError {
    #[error("node {node} has no `{event}` handler")]
    NoHandler { node: NodeId, event: String },

    #[error("document is not wired to a renderer")]
    NotWired,

    #[error("event handler {0} has been disposed")]
    HandlerDisposed(EventHandlerId),

    #[error("no node matches `{0}`")]
    NodeNotFound(String),
}

/// Rendered markup that differs from the expected markup.
#[derive(Debug, Clone)]
pub struct MarkupMismatch {
    pub report: DiffReport,
}

impl fmt::Display for MarkupMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "markup mismatch: {}", self.report.to_human())
    }
}

impl std::error::Error for MarkupMismatch {}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("projection error: {0}")]
    Projection(#[from] ProjectionError),

    #[error("patch error: {0}")]
    Patch(#[from] PatchError),

    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("document error: {0}")]
    Dom(#[from] DomError),

    #[error("unhandled exception: {0}")]
    Lifecycle(Arc<HostError>),

    #[error(transparent)]
    Assertion(#[from] MarkupMismatch),

    #[error("timed out after {waited:?}{}", .last_failure.as_ref().map(|e| format!("; last failure: {e}")).unwrap_or_default())]
    Timeout {
        waited: Duration,
        last_failure: Option<Box<RenderError>>,
    },
}

impl RenderError {
    /// Wrap a host failure, unwrapping single-error aggregates.
    pub fn lifecycle(error: HostError) -> Self {
        RenderError::Lifecycle(Arc::new(error.unwrap_single()))
    }

    /// Map a failure of a direct host call. An unknown handler at dispatch
    /// time means the handler was disposed between lookup and invocation.
    pub(crate) fn from_host_call(error: HostError) -> Self {
        match error {
            HostError::UnknownHandler(id) => DispatchError::HandlerDisposed(id).into(),
            other => RenderError::lifecycle(other),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, RenderError::Timeout { .. })
    }

    pub fn is_lifecycle(&self) -> bool {
        matches!(self, RenderError::Lifecycle(_))
    }

    /// Structural errors mean the host and renderer disagree; retrying never helps.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            RenderError::Projection(_) | RenderError::Patch(_) | RenderError::Dom(_)
        )
    }
}
