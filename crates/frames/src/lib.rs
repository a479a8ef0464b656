pub mod batch;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod frame;
pub mod host;
#[cfg(test)]
mod tests;

pub use batch::{ComponentDiff, RenderBatch, RenderTreeEdit};
pub use dispatcher::DispatcherHandle;
pub use error::{FrameError, HostError};
pub use event::{
    CompletionSender, EventArgs, EventCompletion, EventFieldInfo, FieldValue, KeyboardEventArgs,
    MouseEventArgs,
};
pub use frame::{
    attribute_run, logical_children, validate_frames, AttributeValue, ComponentId,
    EventHandlerId, Frame,
};
pub use host::{BatchSink, FrameSource, HostContext, HostMessage, HostRuntime};
