use thiserror::Error;

use crate::frame::{ComponentId, EventHandlerId};

/// Malformed frame data. Always a contract violation by the host runtime.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FrameError {
    #[error("frame {index} has a zero subtree length")]
    ZeroSubtreeLength { index: usize },

    #[error("frame {index} subtree length {subtree_length} runs past {limit}")]
    SubtreeOverrun {
        index: usize,
        subtree_length: usize,
        limit: usize,
    },

    #[error("unexpected {kind} frame at {index} in {context}")]
    UnexpectedFrame {
        index: usize,
        kind: &'static str,
        context: &'static str,
    },
}

/// Failure reported by the host runtime, usually raised by component code.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("component {component_id} failed: {source}")]
    Component {
        component_id: ComponentId,
        #[source]
        source: anyhow::Error,
    },

    #[error("{} errors occurred", .0.len())]
    Aggregate(Vec<HostError>),

    #[error("unknown component: {0}")]
    UnknownComponent(ComponentId),

    #[error("unknown event handler: {0}")]
    UnknownHandler(EventHandlerId),

    #[error("host runtime is not attached to a renderer")]
    Detached,
}

impl HostError {
    pub fn component(component_id: ComponentId, source: impl Into<anyhow::Error>) -> Self {
        HostError::Component {
            component_id,
            source: source.into(),
        }
    }

    /// Unwrap aggregates holding exactly one inner error, recursively, so the
    /// caller sees the original failure.
    pub fn unwrap_single(self) -> HostError {
        match self {
            HostError::Aggregate(mut inner) if inner.len() == 1 => match inner.pop() {
                Some(only) => only.unwrap_single(),
                None => HostError::Aggregate(inner),
            },
            other => other,
        }
    }

    /// The component-level error payload, if this is a component failure.
    pub fn component_error(&self) -> Option<&anyhow::Error> {
        match self {
            HostError::Component { source, .. } => Some(source),
            _ => None,
        }
    }
}
