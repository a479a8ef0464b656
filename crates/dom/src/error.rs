use thiserror::Error;

use crate::node::NodeId;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomError {
    #[error("invalid selector `{selector}`: {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("node {0} is not an element")]
    NotAnElement(NodeId),

    #[error("node {0} is not a text or comment node")]
    NotCharacterData(NodeId),

    #[error("the document root cannot be released")]
    ReleaseRoot,

    #[error("cannot insert node {child} into {parent}: {reason}")]
    InvalidInsertion {
        parent: NodeId,
        child: NodeId,
        reason: &'static str,
    },
}
