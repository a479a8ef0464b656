use std::fmt;

use tessera_dom::NodeId;

/// One side of a node diff.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRef {
    pub node: NodeId,
    pub path: String,
    pub description: String,
}

/// One side of an attribute diff.
#[derive(Debug, Clone, PartialEq)]
pub struct AttrRef {
    pub element: NodeId,
    pub path: String,
    pub name: String,
    pub value: String,
}

/// A single difference between the control and the test tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Diff {
    /// Matched nodes whose content differs.
    Node { control: NodeRef, test: NodeRef },
    /// Matched attributes whose values differ.
    Attr { control: AttrRef, test: AttrRef },
    MissingNode { control: NodeRef },
    MissingAttr { control: AttrRef },
    UnexpectedNode { test: NodeRef },
    UnexpectedAttr { test: AttrRef },
}

impl Diff {
    pub fn kind(&self) -> &'static str {
        match self {
            Diff::Node { .. } => "NodeDiff",
            Diff::Attr { .. } => "AttrDiff",
            Diff::MissingNode { .. } => "MissingNode",
            Diff::MissingAttr { .. } => "MissingAttr",
            Diff::UnexpectedNode { .. } => "UnexpectedNode",
            Diff::UnexpectedAttr { .. } => "UnexpectedAttr",
        }
    }

    /// Path of the control side, if there is one.
    pub fn control_path(&self) -> Option<&str> {
        match self {
            Diff::Node { control, .. } | Diff::MissingNode { control } => Some(&control.path),
            Diff::Attr { control, .. } | Diff::MissingAttr { control } => Some(&control.path),
            Diff::UnexpectedNode { .. } | Diff::UnexpectedAttr { .. } => None,
        }
    }

    /// Path of the test side, if there is one.
    pub fn test_path(&self) -> Option<&str> {
        match self {
            Diff::Node { test, .. } | Diff::UnexpectedNode { test } => Some(&test.path),
            Diff::Attr { test, .. } | Diff::UnexpectedAttr { test } => Some(&test.path),
            Diff::MissingNode { .. } | Diff::MissingAttr { .. } => None,
        }
    }

    /// One line naming the kind, the paths involved and what was found.
    pub fn describe(&self) -> String {
        match self {
            Diff::Node { control, test } => format!(
                "NodeDiff: expected {} at {}, found {} at {}",
                control.description, control.path, test.description, test.path
            ),
            Diff::Attr { control, test } => format!(
                "AttrDiff: expected {}=\"{}\" at {}, found \"{}\" at {}",
                control.name, control.value, control.path, test.value, test.path
            ),
            Diff::MissingNode { control } => format!(
                "MissingNode: {} at {} has no match in the test markup",
                control.description, control.path
            ),
            Diff::MissingAttr { control } => format!(
                "MissingAttr: {}=\"{}\" at {} has no match in the test markup",
                control.name, control.value, control.path
            ),
            Diff::UnexpectedNode { test } => format!(
                "UnexpectedNode: {} at {} is not in the control markup",
                test.description, test.path
            ),
            Diff::UnexpectedAttr { test } => format!(
                "UnexpectedAttr: {}=\"{}\" at {} is not in the control markup",
                test.name, test.value, test.path
            ),
        }
    }
}

impl fmt::Display for Diff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// All diffs of one comparison together with both markups.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffReport {
    pub diffs: Vec<Diff>,
    pub control_markup: String,
    pub test_markup: String,
}

impl DiffReport {
    pub fn new(diffs: Vec<Diff>, control_markup: String, test_markup: String) -> Self {
        DiffReport {
            diffs,
            control_markup,
            test_markup,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.diffs.is_empty()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.diffs.iter().filter(|d| d.kind() == kind).count()
    }

    pub fn to_human(&self) -> String {
        let mut out = format!("{} difference(s) found:\n", self.diffs.len());
        for d in &self.diffs {
            out.push_str(&format!("  - {}\n", d.describe()));
        }
        out.push_str("\nexpected markup:\n");
        out.push_str(&self.control_markup);
        out.push_str("\n\nactual markup:\n");
        out.push_str(&self.test_markup);
        out.push('\n');
        out
    }
}

impl fmt::Display for DiffReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_human())
    }
}
