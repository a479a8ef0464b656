use std::rc::Rc;

use futures::future::LocalBoxFuture;
use tessera_frames::{AttributeValue, ComponentId, EventArgs, EventHandlerId, Frame};
use tracing::warn;

use crate::component::Component;

/// Synchronous event handler delegate.
pub type SyncHandler = Rc<dyn Fn(&EventArgs) -> anyhow::Result<()>>;

/// Event handler delegate with an asynchronous continuation.
pub type AsyncHandler = Rc<dyn Fn(EventArgs) -> LocalBoxFuture<'static, anyhow::Result<()>>>;

#[derive(Clone)]
pub enum Handler {
    Sync(SyncHandler),
    Async(AsyncHandler),
}

/// Output of one render pass before the host assigns ids.
pub struct BuiltFrames {
    pub frames: Vec<Frame>,
    /// Frame index of each handler attribute with its delegate.
    pub handlers: Vec<(usize, Handler)>,
    /// Frame index of each child component frame with the supplied instance.
    pub children: Vec<(usize, Box<dyn Component>)>,
}

/// Builds a component's frames with open/close calls.
///
/// Attributes and handlers must be added right after `open_element`, before
/// any content. Handler and child component frames carry placeholder ids
/// until the host resolves them.
pub struct RenderBuilder {
    frames: Vec<Frame>,
    open: Vec<usize>,
    handlers: Vec<(usize, Handler)>,
    children: Vec<(usize, Box<dyn Component>)>,
}

impl Default for RenderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderBuilder {
    pub fn new() -> Self {
        RenderBuilder {
            frames: Vec::new(),
            open: Vec::new(),
            handlers: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn open_element(&mut self, name: &str) -> &mut Self {
        self.open.push(self.frames.len());
        self.frames.push(Frame::element(name, 1));
        self
    }

    pub fn close_element(&mut self) -> &mut Self {
        self.close();
        self
    }

    pub fn open_region(&mut self) -> &mut Self {
        self.open.push(self.frames.len());
        self.frames.push(Frame::Region { subtree_length: 1 });
        self
    }

    pub fn close_region(&mut self) -> &mut Self {
        self.close();
        self
    }

    /// Open an element, let `content` fill it, close it.
    pub fn element(&mut self, name: &str, content: impl FnOnce(&mut RenderBuilder)) -> &mut Self {
        self.open_element(name);
        content(self);
        self.close_element()
    }

    pub fn region(&mut self, content: impl FnOnce(&mut RenderBuilder)) -> &mut Self {
        self.open_region();
        content(self);
        self.close_region()
    }

    pub fn attribute(&mut self, name: &str, value: impl Into<AttributeValue>) -> &mut Self {
        self.frames.push(Frame::attribute(name, value));
        self
    }

    /// Attach a synchronous handler for `event` (e.g. `onclick`).
    pub fn on<F>(&mut self, event: &str, handler: F) -> &mut Self
    where
        F: Fn(&EventArgs) -> anyhow::Result<()> + 'static,
    {
        self.push_handler(event, Handler::Sync(Rc::new(handler)))
    }

    /// Attach a handler whose continuation runs on the dispatcher.
    pub fn on_async<F>(&mut self, event: &str, handler: F) -> &mut Self
    where
        F: Fn(EventArgs) -> LocalBoxFuture<'static, anyhow::Result<()>> + 'static,
    {
        self.push_handler(event, Handler::Async(Rc::new(handler)))
    }

    fn push_handler(&mut self, event: &str, handler: Handler) -> &mut Self {
        self.handlers.push((self.frames.len(), handler));
        self.frames.push(Frame::handler(event, EventHandlerId(0)));
        self
    }

    pub fn reference_capture(&mut self, capture_id: &str) -> &mut Self {
        self.frames.push(Frame::ReferenceCapture {
            capture_id: capture_id.to_string(),
        });
        self
    }

    pub fn text(&mut self, content: impl Into<String>) -> &mut Self {
        self.frames.push(Frame::text(content));
        self
    }

    pub fn markup(&mut self, content: impl Into<String>) -> &mut Self {
        self.frames.push(Frame::markup(content));
        self
    }

    /// Place a child component. On re-render, the instance already living at
    /// the same position is kept when it has the same type, and `component`
    /// is dropped.
    pub fn component(&mut self, component: impl Component) -> &mut Self {
        self.children.push((self.frames.len(), Box::new(component)));
        self.frames.push(Frame::component(ComponentId(0)));
        self
    }

    fn close(&mut self) {
        if let Some(start) = self.open.pop() {
            let length = self.frames.len() - start;
            match &mut self.frames[start] {
                Frame::Element { subtree_length, .. } | Frame::Region { subtree_length } => {
                    *subtree_length = length;
                }
                _ => {}
            }
        } else {
            warn!("close without a matching open ignored");
        }
    }

    /// Close anything left open and hand over the frames.
    pub fn finish(mut self) -> BuiltFrames {
        while !self.open.is_empty() {
            self.close();
        }
        BuiltFrames {
            frames: self.frames,
            handlers: self.handlers,
            children: self.children,
        }
    }
}
