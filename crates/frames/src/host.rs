use std::rc::Rc;

use futures::channel::mpsc;
use tracing::debug;

use crate::batch::RenderBatch;
use crate::dispatcher::DispatcherHandle;
use crate::error::HostError;
use crate::event::{EventArgs, EventCompletion, EventFieldInfo};
use crate::frame::{ComponentId, EventHandlerId, Frame};

/// Message from the host runtime to the renderer adapter.
#[derive(Debug)]
pub enum HostMessage {
    Batch(RenderBatch),
    Exception(HostError),
}

/// Channel the host pushes batches and unhandled errors into.
#[derive(Debug, Clone)]
pub struct BatchSink {
    sender: mpsc::UnboundedSender<HostMessage>,
}

impl BatchSink {
    pub fn channel() -> (BatchSink, mpsc::UnboundedReceiver<HostMessage>) {
        let (sender, receiver) = mpsc::unbounded();
        (BatchSink { sender }, receiver)
    }

    pub fn submit(&self, batch: RenderBatch) {
        if self.sender.unbounded_send(HostMessage::Batch(batch)).is_err() {
            debug!("renderer gone, dropping render batch");
        }
    }

    pub fn report(&self, error: HostError) {
        if let Err(e) = self.sender.unbounded_send(HostMessage::Exception(error)) {
            debug!(error = %e.into_inner().describe(), "renderer gone, dropping host error");
        }
    }
}

impl HostMessage {
    fn describe(&self) -> String {
        match self {
            HostMessage::Batch(b) => format!("batch with {} diffs", b.updated_components.len()),
            HostMessage::Exception(e) => e.to_string(),
        }
    }
}

/// Everything the renderer hands to the host when it attaches.
#[derive(Debug, Clone)]
pub struct HostContext {
    pub sink: BatchSink,
    pub dispatcher: DispatcherHandle,
}

/// Read access to the current frames of each component.
pub trait FrameSource {
    fn frames(&self, component_id: ComponentId) -> Option<Rc<[Frame]>>;
}

/// The component framework runtime driven by the renderer.
///
/// The runtime owns component instances, their lifecycle and the event
/// handler delegates. It reports its output only through the [`BatchSink`]
/// given in [`HostRuntime::attach`].
pub trait HostRuntime: FrameSource {
    /// Description of a root component to mount.
    type Root;

    fn attach(&mut self, context: HostContext);

    /// Register a root component and return its id. Does not render.
    fn add_root(&mut self, root: Self::Root) -> ComponentId;

    /// Request a render pass for a registered root.
    fn render_root(&mut self, component_id: ComponentId) -> Result<(), HostError>;

    /// Invoke the delegate registered under `handler_id`.
    fn dispatch_event(
        &mut self,
        handler_id: EventHandlerId,
        field_info: Option<EventFieldInfo>,
        args: EventArgs,
    ) -> Result<EventCompletion, HostError>;
}
