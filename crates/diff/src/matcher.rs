use tessera_dom::{Document, NodeData, NodeId};
use tracing::trace;

use crate::source::{AttributeSource, ComparisonSource};

/// Result of matching one sibling level. Indices point into the source lists
/// given to [`match_nodes`].
#[derive(Debug, Default, PartialEq)]
pub struct NodeMatches {
    pub pairs: Vec<(usize, usize)>,
    pub unmatched_control: Vec<usize>,
    pub unmatched_test: Vec<usize>,
}

/// Strict match: same node type and, for elements, same tag name
/// (case-insensitive) and namespace.
pub fn nodes_match(control_doc: &Document, control: NodeId, test_doc: &Document, test: NodeId) -> bool {
    match (control_doc.data(control), test_doc.data(test)) {
        (Some(NodeData::Element(c)), Some(NodeData::Element(t))) => {
            c.name.eq_ignore_ascii_case(&t.name) && c.namespace == t.namespace
        }
        (Some(NodeData::Text(_)), Some(NodeData::Text(_))) => true,
        (Some(NodeData::Comment(_)), Some(NodeData::Comment(_))) => true,
        _ => false,
    }
}

/// Loose match for elements the parser could not place in their proper
/// context: type and name only.
pub fn nodes_match_out_of_context(
    control_doc: &Document,
    control: NodeId,
    test_doc: &Document,
    test: NodeId,
) -> bool {
    match (control_doc.element(control), test_doc.element(test)) {
        (Some(c), Some(t)) => {
            (c.out_of_context || t.out_of_context) && c.name.eq_ignore_ascii_case(&t.name)
        }
        _ => false,
    }
}

/// Forward, order-preserving, greedy matching. Each control source takes the
/// first matching test source after the previous match; earlier test sources
/// are never revisited, so a reordering shows up as unmatched on both sides.
pub fn match_nodes(
    control_doc: &Document,
    controls: &[ComparisonSource],
    test_doc: &Document,
    tests: &[ComparisonSource],
) -> NodeMatches {
    let mut matches = NodeMatches::default();
    let mut taken = vec![false; tests.len()];
    let mut next = 0;

    for (ci, control) in controls.iter().enumerate() {
        let strict = (next..tests.len())
            .find(|&ti| nodes_match(control_doc, control.node, test_doc, tests[ti].node));
        let found = strict.or_else(|| {
            let loose = (next..tests.len()).find(|&ti| {
                nodes_match_out_of_context(control_doc, control.node, test_doc, tests[ti].node)
            });
            if let Some(ti) = loose {
                trace!(control = %control.path, test = %tests[ti].path, "out-of-context match");
            }
            loose
        });
        match found {
            Some(ti) => {
                taken[ti] = true;
                matches.pairs.push((ci, ti));
                next = ti + 1;
            }
            None => matches.unmatched_control.push(ci),
        }
    }

    matches.unmatched_test = (0..tests.len()).filter(|&ti| !taken[ti]).collect();
    matches
}

/// How a control attribute is compared, from its name postfix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeMode {
    Exact,
    /// `name:ignore`: must be present, value not compared.
    Ignore,
    /// `name:regex`: control value is a regular expression.
    Regex,
}

/// Split a control attribute name into its real name and comparison mode.
pub fn attribute_mode(name: &str) -> (&str, AttributeMode) {
    if let Some(base) = name.strip_suffix(":ignore") {
        (base, AttributeMode::Ignore)
    } else if let Some(base) = name.strip_suffix(":regex") {
        (base, AttributeMode::Regex)
    } else {
        (name, AttributeMode::Exact)
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct AttributeMatches {
    pub pairs: Vec<(usize, usize, AttributeMode)>,
    pub unmatched_control: Vec<usize>,
    pub unmatched_test: Vec<usize>,
}

/// Attributes match by name regardless of order.
pub fn match_attributes(controls: &[AttributeSource], tests: &[AttributeSource]) -> AttributeMatches {
    let mut matches = AttributeMatches::default();
    let mut taken = vec![false; tests.len()];
    for (ci, control) in controls.iter().enumerate() {
        let (name, mode) = attribute_mode(&control.name);
        let found = tests
            .iter()
            .enumerate()
            .find(|(ti, t)| !taken[*ti] && t.name.eq_ignore_ascii_case(name))
            .map(|(ti, _)| ti);
        match found {
            Some(ti) => {
                taken[ti] = true;
                matches.pairs.push((ci, ti, mode));
            }
            None => matches.unmatched_control.push(ci),
        }
    }
    matches.unmatched_test = (0..tests.len()).filter(|&ti| !taken[ti]).collect();
    matches
}
