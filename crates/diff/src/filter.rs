use tessera_dom::{Document, NodeData};

use crate::options::WhitespacePolicy;
use crate::source::{AttributeSource, ComparisonSource};

/// Outcome of a filter. Excluded sources never produce diffs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    Keep,
    Exclude,
}

/// Which tree a source comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Control,
    Test,
}

/// What a filter may know about where a source sits.
#[derive(Debug, Clone, Copy)]
pub struct FilterContext {
    pub side: Side,
    pub whitespace: WhitespacePolicy,
    pub ignore_comments: bool,
}

/// Node filter: receives the decision of the filters before it.
pub type NodeFilter =
    Box<dyn Fn(&Document, &ComparisonSource, &FilterContext, FilterDecision) -> FilterDecision + Send + Sync>;

/// Attribute filter: receives the decision of the filters before it.
pub type AttributeFilter =
    Box<dyn Fn(&AttributeSource, &FilterContext, FilterDecision) -> FilterDecision + Send + Sync>;

/// Ordered chain of node and attribute filters. Every source starts as
/// [`FilterDecision::Keep`]; each filter sees the running decision and
/// returns the next one, so later filters can override earlier ones.
pub struct FilterPipeline {
    node_filters: Vec<NodeFilter>,
    attribute_filters: Vec<AttributeFilter>,
}

impl Default for FilterPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterPipeline {
    pub fn new() -> Self {
        FilterPipeline {
            node_filters: Vec::new(),
            attribute_filters: Vec::new(),
        }
    }

    /// The default chain: comments, whitespace-only text, framework
    /// attributes (decided by `is_framework_attribute`) and control-side
    /// `diff:` directives.
    pub fn with_defaults<F>(is_framework_attribute: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        let mut pipeline = FilterPipeline::new();
        pipeline.add_node_filter(comment_filter);
        pipeline.add_node_filter(whitespace_text_filter);
        pipeline.add_attribute_filter(move |source, _ctx, decision| {
            if is_framework_attribute(&source.name) {
                FilterDecision::Exclude
            } else {
                decision
            }
        });
        pipeline.add_attribute_filter(directive_attribute_filter);
        pipeline
    }

    pub fn add_node_filter<F>(&mut self, filter: F)
    where
        F: Fn(&Document, &ComparisonSource, &FilterContext, FilterDecision) -> FilterDecision
            + Send
            + Sync
            + 'static,
    {
        self.node_filters.push(Box::new(filter));
    }

    pub fn add_attribute_filter<F>(&mut self, filter: F)
    where
        F: Fn(&AttributeSource, &FilterContext, FilterDecision) -> FilterDecision
            + Send
            + Sync
            + 'static,
    {
        self.attribute_filters.push(Box::new(filter));
    }

    pub fn node_decision(
        &self,
        doc: &Document,
        source: &ComparisonSource,
        ctx: &FilterContext,
    ) -> FilterDecision {
        self.node_filters
            .iter()
            .fold(FilterDecision::Keep, |decision, f| f(doc, source, ctx, decision))
    }

    pub fn attribute_decision(&self, source: &AttributeSource, ctx: &FilterContext) -> FilterDecision {
        self.attribute_filters
            .iter()
            .fold(FilterDecision::Keep, |decision, f| f(source, ctx, decision))
    }

    pub fn keep_nodes(
        &self,
        doc: &Document,
        sources: Vec<ComparisonSource>,
        ctx: &FilterContext,
    ) -> Vec<ComparisonSource> {
        sources
            .into_iter()
            .filter(|s| self.node_decision(doc, s, ctx) == FilterDecision::Keep)
            .collect()
    }

    pub fn keep_attributes(
        &self,
        sources: Vec<AttributeSource>,
        ctx: &FilterContext,
    ) -> Vec<AttributeSource> {
        sources
            .into_iter()
            .filter(|s| self.attribute_decision(s, ctx) == FilterDecision::Keep)
            .collect()
    }
}

pub fn comment_filter(
    doc: &Document,
    source: &ComparisonSource,
    ctx: &FilterContext,
    decision: FilterDecision,
) -> FilterDecision {
    match doc.data(source.node) {
        Some(NodeData::Comment(_)) if ctx.ignore_comments => FilterDecision::Exclude,
        _ => decision,
    }
}

pub fn whitespace_text_filter(
    doc: &Document,
    source: &ComparisonSource,
    ctx: &FilterContext,
    decision: FilterDecision,
) -> FilterDecision {
    match doc.data(source.node) {
        Some(NodeData::Text(t))
            if ctx.whitespace != WhitespacePolicy::Preserve
                && t.chars().all(|c| c.is_ascii_whitespace()) =>
        {
            FilterDecision::Exclude
        }
        _ => decision,
    }
}

/// `diff:*` attributes steer the comparison; on the control side they are not content.
pub fn directive_attribute_filter(
    source: &AttributeSource,
    ctx: &FilterContext,
    decision: FilterDecision,
) -> FilterDecision {
    if ctx.side == Side::Control && source.name.starts_with("diff:") {
        FilterDecision::Exclude
    } else {
        decision
    }
}
