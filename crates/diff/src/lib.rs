//! Semantic comparison of markup trees.
//!
//! Two trees are compared level by level: sources are built for each sibling
//! list, passed through a filter pipeline, matched forward and greedily, and
//! matched pairs are compared with text and attribute comparers. Differences
//! are reported as [`Diff`] records.

pub mod compare;
pub mod diff;
pub mod error;
pub mod filter;
pub mod matcher;
pub mod options;
pub mod source;

pub use compare::{compare, compare_markup, compare_nodes, Differ, BOOLEAN_ATTRIBUTES};
pub use diff::{AttrRef, Diff, DiffReport, NodeRef};
pub use error::DiffError;
pub use filter::{FilterContext, FilterDecision, FilterPipeline, Side};
pub use options::{DiffOptions, WhitespacePolicy};
pub use source::{AttributeSource, ComparisonSource};
