use std::collections::BTreeSet;

use regex::Regex;
use tessera_dom::{Document, ElementData, NodeData, NodeId};
use tracing::debug;

use crate::diff::{AttrRef, Diff, DiffReport, NodeRef};
use crate::filter::{FilterContext, FilterPipeline, Side};
use crate::matcher::{attribute_mode, match_attributes, match_nodes, AttributeMode};
use crate::options::{DiffOptions, WhitespacePolicy, PRESERVE_WHITESPACE_ELEMENTS};
use crate::source::{attribute_sources, child_sources, describe_node, AttributeSource, ComparisonSource};

/// Attributes whose presence is their value.
pub const BOOLEAN_ATTRIBUTES: &[&str] = &[
    "allowfullscreen", "async", "autofocus", "autoplay", "checked", "controls", "default",
    "defer", "disabled", "formnovalidate", "hidden", "inert", "ismap", "itemscope", "loop",
    "multiple", "muted", "nomodule", "novalidate", "open", "playsinline", "readonly",
    "required", "reversed", "selected",
];

/// Settings inherited down the control tree through directives.
#[derive(Debug, Clone, Copy)]
struct Scope {
    whitespace: WhitespacePolicy,
    ignore_case: bool,
}

/// Semantic comparison of two node trees.
pub struct Differ {
    options: DiffOptions,
    pipeline: FilterPipeline,
}

impl Differ {
    /// A differ with the default filter chain, treating attributes with one
    /// of `options.framework_prefixes` as framework-internal.
    pub fn new(options: DiffOptions) -> Self {
        let prefixes = options.clone();
        Self::with_framework_predicate(options, move |name| prefixes.is_framework_attribute(name))
    }

    /// A differ with the default filter chain and a caller-supplied
    /// framework-attribute predicate.
    pub fn with_framework_predicate<F>(options: DiffOptions, is_framework_attribute: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Differ {
            options,
            pipeline: FilterPipeline::with_defaults(is_framework_attribute),
        }
    }

    pub fn options(&self) -> &DiffOptions {
        &self.options
    }

    /// Add custom filters after the defaults.
    pub fn pipeline_mut(&mut self) -> &mut FilterPipeline {
        &mut self.pipeline
    }

    /// Compare the root children of two documents.
    pub fn compare(&self, control: &Document, test: &Document) -> Vec<Diff> {
        self.compare_nodes(
            control,
            control.children(control.root()),
            test,
            test.children(test.root()),
        )
    }

    /// Compare two sibling lists, each from its own document.
    pub fn compare_nodes(
        &self,
        control_doc: &Document,
        control_nodes: &[NodeId],
        test_doc: &Document,
        test_nodes: &[NodeId],
    ) -> Vec<Diff> {
        let scope = Scope {
            whitespace: self.options.whitespace,
            ignore_case: self.options.ignore_case,
        };
        let mut out = Vec::new();
        let mut level = Level {
            differ: self,
            control_doc,
            test_doc,
            out: &mut out,
        };
        level.compare_children(control_nodes, None, test_nodes, None, scope);
        debug!(diffs = out.len(), "semantic comparison finished");
        out
    }

    /// Parse both fragments and compare them, keeping the markups for reporting.
    pub fn compare_markup(&self, control: &str, test: &str) -> DiffReport {
        let control_doc = Document::parse_fragment(control);
        let test_doc = Document::parse_fragment(test);
        let diffs = self.compare(&control_doc, &test_doc);
        DiffReport::new(diffs, control.to_string(), test.to_string())
    }

    fn filter_context(&self, side: Side, scope: Scope) -> FilterContext {
        FilterContext {
            side,
            whitespace: scope.whitespace,
            ignore_comments: self.options.ignore_comments,
        }
    }
}

/// Walk state for one comparison.
struct Level<'a> {
    differ: &'a Differ,
    control_doc: &'a Document,
    test_doc: &'a Document,
    out: &'a mut Vec<Diff>,
}

impl Level<'_> {
    fn compare_children(
        &mut self,
        control_nodes: &[NodeId],
        control_path: Option<&str>,
        test_nodes: &[NodeId],
        test_path: Option<&str>,
        scope: Scope,
    ) {
        let pipeline = &self.differ.pipeline;
        let controls = pipeline.keep_nodes(
            self.control_doc,
            child_sources(self.control_doc, control_nodes, control_path),
            &self.differ.filter_context(Side::Control, scope),
        );
        let tests = pipeline.keep_nodes(
            self.test_doc,
            child_sources(self.test_doc, test_nodes, test_path),
            &self.differ.filter_context(Side::Test, scope),
        );

        let matches = match_nodes(self.control_doc, &controls, self.test_doc, &tests);
        for &(ci, ti) in &matches.pairs {
            self.compare_pair(&controls[ci], &tests[ti], scope);
        }
        for &ci in &matches.unmatched_control {
            let control = self.node_ref(self.control_doc, &controls[ci]);
            self.out.push(Diff::MissingNode { control });
        }
        for &ti in &matches.unmatched_test {
            let test = self.node_ref(self.test_doc, &tests[ti]);
            self.out.push(Diff::UnexpectedNode { test });
        }
    }

    fn compare_pair(&mut self, control: &ComparisonSource, test: &ComparisonSource, scope: Scope) {
        match (self.control_doc.data(control.node), self.test_doc.data(test.node)) {
            (Some(NodeData::Element(ce)), Some(NodeData::Element(te))) => {
                if directive(ce, "diff:ignore").is_some() {
                    return;
                }
                let inner = child_scope(ce, te, scope);
                if directive(ce, "diff:ignoreAttributes").is_none() {
                    self.compare_attributes(control, test, inner);
                }
                if directive(ce, "diff:ignoreChildren").is_none() {
                    let control_children = self.control_doc.children(control.node).to_vec();
                    let test_children = self.test_doc.children(test.node).to_vec();
                    self.compare_children(
                        &control_children,
                        Some(&control.path),
                        &test_children,
                        Some(&test.path),
                        inner,
                    );
                }
            }
            (Some(NodeData::Text(c)), Some(NodeData::Text(t)))
            | (Some(NodeData::Comment(c)), Some(NodeData::Comment(t))) => {
                if !text_equal(c, t, scope) {
                    let control = self.node_ref(self.control_doc, control);
                    let test = self.node_ref(self.test_doc, test);
                    self.out.push(Diff::Node { control, test });
                }
            }
            _ => {}
        }
    }

    fn compare_attributes(&mut self, control: &ComparisonSource, test: &ComparisonSource, scope: Scope) {
        let pipeline = &self.differ.pipeline;
        let controls = pipeline.keep_attributes(
            attribute_sources(self.control_doc, control),
            &self.differ.filter_context(Side::Control, scope),
        );
        let tests = pipeline.keep_attributes(
            attribute_sources(self.test_doc, test),
            &self.differ.filter_context(Side::Test, scope),
        );

        let matches = match_attributes(&controls, &tests);
        for &(ci, ti, mode) in &matches.pairs {
            if !attribute_values_equal(&controls[ci], &tests[ti], mode, scope) {
                self.out.push(Diff::Attr {
                    control: attr_ref(&controls[ci]),
                    test: attr_ref(&tests[ti]),
                });
            }
        }
        for &ci in &matches.unmatched_control {
            self.out.push(Diff::MissingAttr {
                control: attr_ref(&controls[ci]),
            });
        }
        for &ti in &matches.unmatched_test {
            self.out.push(Diff::UnexpectedAttr {
                test: attr_ref(&tests[ti]),
            });
        }
    }

    fn node_ref(&self, doc: &Document, source: &ComparisonSource) -> NodeRef {
        NodeRef {
            node: source.node,
            path: source.path.clone(),
            description: describe_node(doc, source.node),
        }
    }
}

fn attr_ref(source: &AttributeSource) -> AttrRef {
    AttrRef {
        element: source.element,
        path: source.path.clone(),
        name: source.name.clone(),
        value: source.value.clone(),
    }
}

/// Directive attribute value. The HTML parser lower-cases attribute names,
/// so directives are looked up case-insensitively.
fn directive<'e>(element: &'e ElementData, name: &str) -> Option<&'e str> {
    element
        .attributes
        .iter()
        .find(|a| a.name.eq_ignore_ascii_case(name))
        .map(|a| a.value.as_str())
}

fn child_scope(control: &ElementData, test: &ElementData, scope: Scope) -> Scope {
    let mut inner = scope;
    if let Some(value) = directive(control, "diff:whitespace") {
        match WhitespacePolicy::parse(value) {
            Some(policy) => inner.whitespace = policy,
            None => debug!(value, "unknown diff:whitespace value ignored"),
        }
    }
    if let Some(value) = directive(control, "diff:ignoreCase") {
        inner.ignore_case = !value.eq_ignore_ascii_case("false");
    }
    let preserves = |name: &str| {
        PRESERVE_WHITESPACE_ELEMENTS
            .iter()
            .any(|p| p.eq_ignore_ascii_case(name))
    };
    if preserves(&control.name) || preserves(&test.name) {
        inner.whitespace = WhitespacePolicy::Preserve;
    }
    inner
}

fn normalize_text(text: &str, policy: WhitespacePolicy) -> String {
    match policy {
        WhitespacePolicy::Preserve => text.to_string(),
        WhitespacePolicy::RemoveWhitespaceNodes => text.trim().to_string(),
        WhitespacePolicy::Normalize => text.split_whitespace().collect::<Vec<_>>().join(" "),
    }
}

fn text_equal(control: &str, test: &str, scope: Scope) -> bool {
    let control = normalize_text(control, scope.whitespace);
    let test = normalize_text(test, scope.whitespace);
    if scope.ignore_case {
        control.to_lowercase() == test.to_lowercase()
    } else {
        control == test
    }
}

fn attribute_values_equal(
    control: &AttributeSource,
    test: &AttributeSource,
    mode: AttributeMode,
    scope: Scope,
) -> bool {
    match mode {
        AttributeMode::Ignore => true,
        AttributeMode::Regex => regex_matches(&control.value, &test.value),
        AttributeMode::Exact => {
            let (name, _) = attribute_mode(&control.name);
            let name = name.to_ascii_lowercase();
            if BOOLEAN_ATTRIBUTES.contains(&name.as_str()) {
                true
            } else if name == "class" {
                class_set(&control.value) == class_set(&test.value)
            } else if name == "style" {
                normalize_style(&control.value) == normalize_style(&test.value)
            } else if scope.ignore_case {
                control.value.to_lowercase() == test.value.to_lowercase()
            } else {
                control.value == test.value
            }
        }
    }
}

/// The whole test value must match the control pattern.
fn regex_matches(pattern: &str, value: &str) -> bool {
    match Regex::new(&format!("^(?:{pattern})$")) {
        Ok(re) => re.is_match(value),
        Err(e) => {
            debug!(pattern, error = %e, "invalid :regex pattern never matches");
            false
        }
    }
}

fn class_set(value: &str) -> BTreeSet<&str> {
    value.split_whitespace().collect()
}

/// Declarations in order, property names lower-cased, values with collapsed whitespace.
fn normalize_style(value: &str) -> Vec<(String, String)> {
    value
        .split(';')
        .filter_map(|decl| {
            let (property, value) = decl.split_once(':')?;
            let property = property.trim().to_ascii_lowercase();
            if property.is_empty() {
                return None;
            }
            let value = value.split_whitespace().collect::<Vec<_>>().join(" ");
            Some((property, value))
        })
        .collect()
}

/// Compare the root children of two documents with a fresh [`Differ`].
pub fn compare(control: &Document, test: &Document, options: &DiffOptions) -> Vec<Diff> {
    Differ::new(options.clone()).compare(control, test)
}

/// Compare two sibling lists with a fresh [`Differ`].
pub fn compare_nodes(
    control_doc: &Document,
    control_nodes: &[NodeId],
    test_doc: &Document,
    test_nodes: &[NodeId],
    options: &DiffOptions,
) -> Vec<Diff> {
    Differ::new(options.clone()).compare_nodes(control_doc, control_nodes, test_doc, test_nodes)
}

/// Parse and compare two markup fragments.
pub fn compare_markup(control: &str, test: &str, options: &DiffOptions) -> DiffReport {
    Differ::new(options.clone()).compare_markup(control, test)
}
