use serde::{Deserialize, Serialize};

use crate::error::DiffError;

/// How text content is compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WhitespacePolicy {
    /// Text compared exactly; whitespace-only text nodes take part in matching.
    Preserve,
    /// Whitespace-only text nodes are dropped; remaining text is compared trimmed.
    RemoveWhitespaceNodes,
    /// Whitespace-only text nodes are dropped; runs of whitespace collapse to one space.
    #[default]
    Normalize,
}

impl WhitespacePolicy {
    /// Parse a `diff:whitespace` directive value. Case and separators are ignored,
    /// so `RemoveWhitespaceNodes`, `remove-whitespace-nodes` and
    /// `remove_whitespace_nodes` are the same.
    pub fn parse(value: &str) -> Option<Self> {
        let key: String = value
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "preserve" => Some(WhitespacePolicy::Preserve),
            "removewhitespacenodes" => Some(WhitespacePolicy::RemoveWhitespaceNodes),
            "normalize" => Some(WhitespacePolicy::Normalize),
            _ => None,
        }
    }
}

/// Elements whose text is always compared with [`WhitespacePolicy::Preserve`].
pub const PRESERVE_WHITESPACE_ELEMENTS: &[&str] = &["pre", "textarea", "script", "style"];

/// Prefixes of attribute names written by the renderer for its own bookkeeping.
pub const DEFAULT_FRAMEWORK_PREFIXES: &[&str] = &["tessera:", "b-"];

/// Comparison settings. Every field has a default, so a partial JSON object is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffOptions {
    pub whitespace: WhitespacePolicy,
    pub ignore_comments: bool,
    pub ignore_case: bool,
    /// Attribute name prefixes treated as framework-internal and never compared.
    pub framework_prefixes: Vec<String>,
}

impl Default for DiffOptions {
    fn default() -> Self {
        DiffOptions {
            whitespace: WhitespacePolicy::default(),
            ignore_comments: true,
            ignore_case: false,
            framework_prefixes: DEFAULT_FRAMEWORK_PREFIXES
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

impl DiffOptions {
    pub fn from_json(json: &str) -> Result<Self, DiffError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_whitespace(mut self, whitespace: WhitespacePolicy) -> Self {
        self.whitespace = whitespace;
        self
    }

    pub fn with_ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    pub fn with_comments(mut self) -> Self {
        self.ignore_comments = false;
        self
    }

    /// Default framework-attribute predicate built from `framework_prefixes`.
    pub fn is_framework_attribute(&self, name: &str) -> bool {
        self.framework_prefixes
            .iter()
            .any(|prefix| name.starts_with(prefix.as_str()))
    }
}
