pub mod error;
pub mod node;
pub mod parse;
pub mod select;
pub mod serialize;
#[cfg(test)]
mod tests;

pub use error::DomError;
pub use node::{Attribute, Document, ElementData, Namespace, NodeData, NodeId};
pub use serialize::{escape_attribute, escape_text, is_void_element, write_attribute, VOID_ELEMENTS};
