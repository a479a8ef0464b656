use std::rc::Rc;
use std::time::Duration;

use tessera_diff::{DiffReport, Differ};
use tessera_dom::{Document, NodeId};
use tessera_frames::{ComponentId, EventArgs, FieldValue, HostRuntime};

use crate::bridge::{self, EventDispatch};
use crate::dispatcher::{wait_for, Attempt};
use crate::error::{DispatchError, MarkupMismatch, RenderError};
use crate::renderer::RendererCore;

/// A copy of the live document taken at one point in time.
///
/// The copy stays wired to its renderer, so events raised on it reach the
/// live handlers. [`Document::extract`] gives an unwired copy.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub document: Document,
    /// Top-level nodes of the fragment's component.
    pub nodes: Vec<NodeId>,
}

impl Snapshot {
    pub fn html(&self) -> String {
        self.document.nodes_html(&self.nodes)
    }

    pub fn find_all(&self, selector: &str) -> Result<Vec<NodeId>, RenderError> {
        Ok(self.document.select_in(&self.nodes, selector)?)
    }
}

/// The rendered output of one root component.
///
/// Queries, events and markup assertions first apply whatever the host
/// produced since the last call, so they see the latest state. The plain
/// accessors taking a [`NodeId`] or returning a count do not pump: they read
/// the state applied by the last call that did.
pub struct RenderedFragment<H: HostRuntime + 'static> {
    core: Rc<RendererCore<H>>,
    component_id: ComponentId,
}

impl<H: HostRuntime + 'static> RenderedFragment<H> {
    pub(crate) fn new(core: Rc<RendererCore<H>>, component_id: ComponentId) -> Self {
        RenderedFragment { core, component_id }
    }

    pub fn component_id(&self) -> ComponentId {
        self.component_id
    }

    pub fn markup(&self) -> Result<String, RenderError> {
        self.core.pump()?;
        Ok(self.core.patcher.borrow().component_html(self.component_id)?)
    }

    pub fn nodes(&self) -> Result<Snapshot, RenderError> {
        self.core.pump()?;
        let patcher = self.core.patcher.borrow();
        Ok(Snapshot {
            document: patcher.document().clone(),
            nodes: patcher.component_nodes(self.component_id)?,
        })
    }

    /// Batches applied so far that updated this fragment's root component.
    /// Does not pump.
    pub fn render_count(&self) -> u64 {
        self.core.render_count(self.component_id)
    }

    /// First element matching `selector`.
    pub fn find(&self, selector: &str) -> Result<NodeId, RenderError> {
        self.find_all(selector)?
            .into_iter()
            .next()
            .ok_or_else(|| DispatchError::NodeNotFound(selector.to_string()).into())
    }

    pub fn find_all(&self, selector: &str) -> Result<Vec<NodeId>, RenderError> {
        self.core.pump()?;
        let patcher = self.core.patcher.borrow();
        let roots = patcher.component_nodes(self.component_id)?;
        Ok(patcher.document().select_in(&roots, selector)?)
    }

    /// Text under `node` as last applied. Does not pump, so it reads the
    /// document the preceding `find` returned `node` from.
    pub fn text_content(&self, node: NodeId) -> String {
        self.core.patcher.borrow().document().text_content(node)
    }

    /// Attribute of `node` as last applied. Does not pump.
    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.core
            .patcher
            .borrow()
            .document()
            .attribute(node, name)
            .map(str::to_string)
    }

    /// Raise `event_name` on the first element matching `selector`.
    pub fn trigger(
        &self,
        selector: &str,
        event_name: &str,
        args: EventArgs,
    ) -> Result<EventDispatch, RenderError> {
        let node = self.find(selector)?;
        self.trigger_node(node, event_name, args)
    }

    pub fn trigger_node(
        &self,
        node: NodeId,
        event_name: &str,
        args: EventArgs,
    ) -> Result<EventDispatch, RenderError> {
        let resolved = {
            let patcher = self.core.patcher.borrow();
            bridge::resolve(patcher.document(), node, event_name)?
        };
        resolved.dispatch(args)
    }

    pub fn click(&self, selector: &str) -> Result<EventDispatch, RenderError> {
        self.trigger(selector, "onclick", EventArgs::click())
    }

    pub fn change(
        &self,
        selector: &str,
        value: impl Into<FieldValue>,
    ) -> Result<EventDispatch, RenderError> {
        self.trigger(selector, "onchange", EventArgs::change(value))
    }

    pub fn input(
        &self,
        selector: &str,
        value: impl Into<FieldValue>,
    ) -> Result<EventDispatch, RenderError> {
        self.trigger(selector, "oninput", EventArgs::change(value))
    }

    pub fn submit(&self, selector: &str) -> Result<EventDispatch, RenderError> {
        self.trigger(selector, "onsubmit", EventArgs::Empty)
    }

    /// Semantic differences between `expected` and the rendered nodes.
    pub fn compare_to(&self, expected: &str) -> Result<DiffReport, RenderError> {
        self.core.pump()?;
        let patcher = self.core.patcher.borrow();
        let nodes = patcher.component_nodes(self.component_id)?;
        let control = Document::parse_fragment(expected);
        let differ = Differ::new(self.core.options.diff.clone());
        let diffs = differ.compare_nodes(
            &control,
            control.children(control.root()),
            patcher.document(),
            &nodes,
        );
        Ok(DiffReport::new(
            diffs,
            expected.to_string(),
            patcher.document().nodes_html(&nodes),
        ))
    }

    /// Fail with every difference when the rendered markup does not match.
    pub fn markup_matches(&self, expected: &str) -> Result<(), RenderError> {
        let report = self.compare_to(expected)?;
        if report.is_empty() {
            Ok(())
        } else {
            Err(MarkupMismatch { report }.into())
        }
    }

    pub fn wait_for_state(&self, predicate: impl FnMut(&Self) -> bool) -> Result<(), RenderError> {
        self.wait_for_state_timeout(predicate, self.core.options.default_timeout())
    }

    /// Pump until `predicate` holds. Exceptions from the host end the wait.
    pub fn wait_for_state_timeout(
        &self,
        mut predicate: impl FnMut(&Self) -> bool,
        timeout: Duration,
    ) -> Result<(), RenderError> {
        wait_for(timeout, || {
            self.core.pump()?;
            if predicate(self) {
                Ok(Attempt::Ready(()))
            } else {
                Ok(Attempt::Pending(None))
            }
        })
    }

    pub fn wait_for_assertion(
        &self,
        assertion: impl FnMut(&Self) -> Result<(), RenderError>,
    ) -> Result<(), RenderError> {
        self.wait_for_assertion_timeout(assertion, self.core.options.default_timeout())
    }

    /// Pump until `assertion` passes. On timeout the last failure is attached.
    pub fn wait_for_assertion_timeout(
        &self,
        mut assertion: impl FnMut(&Self) -> Result<(), RenderError>,
        timeout: Duration,
    ) -> Result<(), RenderError> {
        wait_for(timeout, || {
            self.core.pump()?;
            match assertion(self) {
                Ok(()) => Ok(Attempt::Ready(())),
                Err(e) if e.is_lifecycle() || e.is_structural() => Err(e),
                Err(e) => Ok(Attempt::Pending(Some(e))),
            }
        })
    }
}

impl<H: HostRuntime + 'static> std::fmt::Debug for RenderedFragment<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderedFragment")
            .field("component_id", &self.component_id)
            .finish()
    }
}
