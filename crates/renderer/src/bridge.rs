use std::rc::{Rc, Weak};
use std::time::Duration;

use tessera_dom::{Document, NodeId};
use tessera_frames::{
    ComponentId, EventArgs, EventCompletion, EventFieldInfo, EventHandlerId,
};
use tracing::debug;

use crate::dispatcher::{wait_for, Attempt};
use crate::error::{DispatchError, RenderError};
use crate::patcher::HandlerRegistration;
use crate::projector::FRAMEWORK_PREFIX;

/// The renderer side of event dispatch, reached through a document's owner.
pub(crate) trait EventTarget {
    fn handler(&self, handler_id: EventHandlerId) -> Option<HandlerRegistration>;

    fn owning_component(&self, node: NodeId) -> Option<ComponentId>;

    fn dispatch(
        &self,
        handler_id: EventHandlerId,
        field_info: Option<EventFieldInfo>,
        args: EventArgs,
    ) -> Result<EventCompletion, RenderError>;

    /// Apply pending host output and rethrow captured exceptions.
    fn pump(&self) -> Result<(), RenderError>;

    fn default_timeout(&self) -> Duration;
}

/// What a renderer stores as a document's owner. Extracted documents have
/// no owner, so events raised on them fail with `NotWired`.
pub(crate) struct OwnerLink {
    pub(crate) target: Weak<dyn EventTarget>,
}

/// A handler lookup whose document borrow has already ended.
pub(crate) struct ResolvedEvent {
    target: Rc<dyn EventTarget>,
    handler_id: EventHandlerId,
    event_name: String,
    component_id: ComponentId,
}

pub(crate) fn resolve(
    document: &Document,
    node: NodeId,
    event_name: &str,
) -> Result<ResolvedEvent, DispatchError> {
    if !document.contains(node) {
        return Err(DispatchError::NodeNotFound(node.to_string()));
    }
    let no_handler = || DispatchError::NoHandler {
        node,
        event: event_name.to_string(),
    };
    let handler_id = document
        .attribute(node, &format!("{FRAMEWORK_PREFIX}{event_name}"))
        .ok_or_else(no_handler)?
        .parse::<u64>()
        .map(EventHandlerId)
        .map_err(|_| no_handler())?;
    let target = document
        .owner()
        .and_then(|owner| owner.downcast::<OwnerLink>().ok())
        .and_then(|link| link.target.upgrade())
        .ok_or(DispatchError::NotWired)?;
    let registration = target
        .handler(handler_id)
        .ok_or(DispatchError::HandlerDisposed(handler_id))?;
    let component_id = target
        .owning_component(node)
        .unwrap_or(registration.component_id);
    Ok(ResolvedEvent {
        target,
        handler_id,
        event_name: event_name.to_string(),
        component_id,
    })
}

impl ResolvedEvent {
    pub(crate) fn dispatch(self, args: EventArgs) -> Result<EventDispatch, RenderError> {
        let field_info = match (&args, self.event_name.as_str()) {
            (EventArgs::Change { value }, "onchange" | "oninput") => Some(EventFieldInfo {
                component_id: self.component_id,
                field_value: value.clone(),
            }),
            _ => None,
        };
        debug!(
            handler = %self.handler_id,
            event = %self.event_name,
            component = %self.component_id,
            "dispatching event"
        );
        let completion = self.target.dispatch(self.handler_id, field_info, args)?;
        Ok(EventDispatch {
            completion,
            target: Rc::downgrade(&self.target),
        })
    }
}

/// Raise `event_name` (for example `onclick`) on `node`.
///
/// The handler id comes from the node's `tessera:<event_name>` attribute
/// and the renderer from the document's owner, so this works on any
/// snapshot taken from a live fragment.
pub fn dispatch_event(
    document: &Document,
    node: NodeId,
    event_name: &str,
    args: EventArgs,
) -> Result<EventDispatch, RenderError> {
    resolve(document, node, event_name)?.dispatch(args)
}

/// Completion of a dispatched event.
pub struct EventDispatch {
    completion: EventCompletion,
    target: Weak<dyn EventTarget>,
}

impl EventDispatch {
    /// True once the handler and its asynchronous continuation finished.
    pub fn is_complete(&mut self) -> bool {
        self.completion.is_complete()
    }

    /// Wait for completion with the renderer's default timeout.
    pub fn wait(self) -> Result<(), RenderError> {
        let timeout = self
            .target
            .upgrade()
            .map(|t| t.default_timeout())
            .ok_or(DispatchError::NotWired)?;
        self.wait_timeout(timeout)
    }

    pub fn wait_timeout(mut self, timeout: Duration) -> Result<(), RenderError> {
        wait_for(timeout, || {
            let target = self.target.upgrade().ok_or(DispatchError::NotWired)?;
            target.pump()?;
            if self.completion.is_complete() {
                // Output of the final continuation may still be queued.
                target.pump()?;
                Ok(Attempt::Ready(()))
            } else {
                Ok(Attempt::Pending(None))
            }
        })
    }
}

impl std::fmt::Debug for EventDispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatch")
            .field("wired", &(self.target.strong_count() > 0))
            .finish()
    }
}
