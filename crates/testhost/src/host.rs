use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::rc::Rc;
use std::task::{Context, Poll};

use futures::task::noop_waker_ref;
use tessera_frames::{
    validate_frames, BatchSink, CompletionSender, ComponentDiff, ComponentId, EventArgs,
    EventCompletion, EventFieldInfo, EventHandlerId, Frame, FrameSource, HostContext, HostError,
    HostRuntime, RenderBatch,
};
use tracing::{debug, trace, warn};

use crate::builder::{BuiltFrames, Handler, RenderBuilder};
use crate::component::{Component, ComponentContext, LifecycleFuture};
use crate::diff::diff_frames;

struct Mounted {
    component: Box<dyn Component>,
    frames: Rc<[Frame]>,
    children: Vec<ComponentId>,
    handler_ids: Vec<EventHandlerId>,
    parent: Option<ComponentId>,
    initialized: bool,
}

struct HandlerEntry {
    component_id: ComponentId,
    handler: Handler,
}

struct HostInner {
    components: HashMap<ComponentId, Mounted>,
    handlers: HashMap<EventHandlerId, HandlerEntry>,
    next_component_id: u32,
    next_handler_id: u64,
}

/// State shared between the host and the contexts it hands to components.
pub(crate) struct Shared {
    inner: RefCell<HostInner>,
    queue: RefCell<VecDeque<ComponentId>>,
    context: RefCell<Option<HostContext>>,
}

impl Shared {
    pub(crate) fn context(&self) -> Option<HostContext> {
        self.context.borrow().clone()
    }

    /// Queue a render and drain the queue unless a drain is already running
    /// further up the stack.
    pub(crate) fn schedule(self: Rc<Self>, component_id: ComponentId) {
        {
            let mut queue = self.queue.borrow_mut();
            if !queue.contains(&component_id) {
                queue.push_back(component_id);
            }
        }
        self.process_queue();
    }

    fn process_queue(self: Rc<Self>) {
        let Ok(mut inner) = self.inner.try_borrow_mut() else {
            trace!("render pass in progress, render queued");
            return;
        };
        let Some(context) = self.context() else {
            debug!("host not attached, renders stay queued");
            return;
        };

        let mut batch = RenderBatch::new();
        loop {
            let next = self.queue.borrow_mut().pop_front();
            let Some(component_id) = next else { break };
            inner.render_component(&self, component_id, &context, &mut batch);
        }
        drop(inner);

        if !batch.is_empty() {
            debug!(
                diffs = batch.updated_components.len(),
                disposed = batch.disposed_component_ids.len(),
                "submitting render batch"
            );
            context.sink.submit(batch);
        }
    }
}

impl HostInner {
    fn mount(&mut self, component: Box<dyn Component>, parent: Option<ComponentId>) -> ComponentId {
        self.next_component_id += 1;
        let id = ComponentId(self.next_component_id);
        self.components.insert(
            id,
            Mounted {
                component,
                frames: Rc::from(Vec::new()),
                children: Vec::new(),
                handler_ids: Vec::new(),
                parent,
                initialized: false,
            },
        );
        id
    }

    fn render_component(
        &mut self,
        shared: &Rc<Shared>,
        component_id: ComponentId,
        context: &HostContext,
        batch: &mut RenderBatch,
    ) {
        let Some(mounted) = self.components.get_mut(&component_id) else {
            trace!(component = %component_id, "skipping render of disposed component");
            return;
        };

        if !mounted.initialized {
            mounted.initialized = true;
            let ctx = ComponentContext {
                component_id,
                shared: Rc::downgrade(shared),
            };
            if let Some(work) = mounted.component.init(&ctx) {
                start_lifecycle(work, ctx, context, None);
            }
        }

        let mut builder = RenderBuilder::new();
        mounted.component.render(&mut builder);
        let BuiltFrames {
            mut frames,
            handlers,
            children,
        } = builder.finish();
        if let Err(e) = validate_frames(&frames) {
            context.sink.report(HostError::component(component_id, e));
            return;
        }
        let old_frames = Rc::clone(&mounted.frames);
        let old_children = std::mem::take(&mut mounted.children);
        let old_handlers = std::mem::take(&mut mounted.handler_ids);

        // Every render gets fresh handler ids.
        for id in old_handlers {
            self.handlers.remove(&id);
            batch.disposed_event_handler_ids.push(id);
        }
        let mut handler_ids = Vec::with_capacity(handlers.len());
        for (index, handler) in handlers {
            self.next_handler_id += 1;
            let id = EventHandlerId(self.next_handler_id);
            if let Frame::Attribute {
                event_handler_id, ..
            } = &mut frames[index]
            {
                *event_handler_id = Some(id);
            }
            self.handlers.insert(id, HandlerEntry { component_id, handler });
            handler_ids.push(id);
        }

        // Children are reused by position and type.
        let mut child_ids = Vec::with_capacity(children.len());
        for (position, (index, instance)) in children.into_iter().enumerate() {
            let reusable = old_children.get(position).copied().filter(|old| {
                self.components
                    .get(old)
                    .map(|m| m.component.component_type() == instance.component_type())
                    .unwrap_or(false)
            });
            let child_id = match reusable {
                Some(old) => old,
                None => self.mount(instance, Some(component_id)),
            };
            if let Frame::Component {
                component_id: slot, ..
            } = &mut frames[index]
            {
                *slot = child_id;
            }
            child_ids.push(child_id);
        }
        for old in old_children {
            if !child_ids.contains(&old) {
                self.dispose(old, batch);
            }
        }

        let edits = diff_frames(&old_frames, &frames, batch);
        trace!(component = %component_id, edits = edits.len(), "component rendered");
        batch.updated_components.push(ComponentDiff {
            component_id,
            edits,
        });

        if let Some(mounted) = self.components.get_mut(&component_id) {
            mounted.frames = Rc::from(frames);
            mounted.handler_ids = handler_ids;
            mounted.children = child_ids.clone();
        }

        let mut queue = shared.queue.borrow_mut();
        for child in child_ids {
            if !queue.contains(&child) {
                queue.push_back(child);
            }
        }
    }

    fn dispose(&mut self, component_id: ComponentId, batch: &mut RenderBatch) {
        let Some(mut mounted) = self.components.remove(&component_id) else {
            return;
        };
        for child in std::mem::take(&mut mounted.children) {
            self.dispose(child, batch);
        }
        for id in mounted.handler_ids.drain(..) {
            self.handlers.remove(&id);
            batch.disposed_event_handler_ids.push(id);
        }
        mounted.component.dispose();
        debug!(component = %component_id, parent = ?mounted.parent.map(|p| p.0), "component disposed");
        batch.disposed_component_ids.push(component_id);
    }
}

/// Run the synchronous part of `work` now. If it suspends, the rest runs on
/// the dispatcher as tracked lifecycle work and the component re-renders when
/// it finishes.
fn start_lifecycle(
    mut work: LifecycleFuture,
    ctx: ComponentContext,
    context: &HostContext,
    on_done: Option<CompletionSender>,
) {
    let mut cx = Context::from_waker(noop_waker_ref());
    match work.as_mut().poll(&mut cx) {
        Poll::Ready(result) => {
            if let Err(e) = result {
                context.sink.report(HostError::component(ctx.component_id, e));
            }
            if let Some(sender) = on_done {
                sender.complete();
            }
        }
        Poll::Pending => {
            let sink: BatchSink = context.sink.clone();
            let spawned = context.dispatcher.spawn_lifecycle(async move {
                if let Err(e) = work.await {
                    sink.report(HostError::component(ctx.component_id, e));
                }
                ctx.state_has_changed();
                if let Some(sender) = on_done {
                    sender.complete();
                }
            });
            if let Err(e) = spawned {
                warn!(error = %e, "dispatcher shut down, lifecycle work dropped");
            }
        }
    }
}

/// A small component runtime driven by a renderer.
///
/// Components render into frames with a [`RenderBuilder`]. Every render pass
/// diffs the new frames against the previous ones by position and submits the
/// edits as one batch per drained render queue.
pub struct TestHost {
    shared: Rc<Shared>,
}

impl Default for TestHost {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHost {
    pub fn new() -> Self {
        TestHost {
            shared: Rc::new(Shared {
                inner: RefCell::new(HostInner {
                    components: HashMap::new(),
                    handlers: HashMap::new(),
                    next_component_id: 0,
                    next_handler_id: 0,
                }),
                queue: RefCell::new(VecDeque::new()),
                context: RefCell::new(None),
            }),
        }
    }

    /// Ids of all live components, ascending.
    pub fn component_ids(&self) -> Vec<ComponentId> {
        let mut ids: Vec<_> = self.shared.inner.borrow().components.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn children_of(&self, component_id: ComponentId) -> Vec<ComponentId> {
        self.shared
            .inner
            .borrow()
            .components
            .get(&component_id)
            .map(|m| m.children.clone())
            .unwrap_or_default()
    }

    pub fn live_handler_count(&self) -> usize {
        self.shared.inner.borrow().handlers.len()
    }

    /// Re-render a component as if its state had changed.
    pub fn state_has_changed(&self, component_id: ComponentId) {
        Rc::clone(&self.shared).schedule(component_id);
    }
}

impl FrameSource for TestHost {
    fn frames(&self, component_id: ComponentId) -> Option<Rc<[Frame]>> {
        let inner = self.shared.inner.try_borrow().ok()?;
        inner
            .components
            .get(&component_id)
            .map(|m| Rc::clone(&m.frames))
    }
}

impl HostRuntime for TestHost {
    type Root = Box<dyn Component>;

    fn attach(&mut self, context: HostContext) {
        *self.shared.context.borrow_mut() = Some(context);
    }

    fn add_root(&mut self, root: Box<dyn Component>) -> ComponentId {
        let id = self.shared.inner.borrow_mut().mount(root, None);
        debug!(component = %id, "root component added");
        id
    }

    fn render_root(&mut self, component_id: ComponentId) -> Result<(), HostError> {
        if self.shared.context().is_none() {
            return Err(HostError::Detached);
        }
        if !self.shared.inner.borrow().components.contains_key(&component_id) {
            return Err(HostError::UnknownComponent(component_id));
        }
        Rc::clone(&self.shared).schedule(component_id);
        Ok(())
    }

    fn dispatch_event(
        &mut self,
        handler_id: EventHandlerId,
        field_info: Option<EventFieldInfo>,
        args: EventArgs,
    ) -> Result<EventCompletion, HostError> {
        let context = self.shared.context().ok_or(HostError::Detached)?;
        let (component_id, handler) = {
            let inner = self.shared.inner.borrow();
            let entry = inner
                .handlers
                .get(&handler_id)
                .ok_or(HostError::UnknownHandler(handler_id))?;
            (entry.component_id, entry.handler.clone())
        };
        if let Some(info) = &field_info {
            trace!(component = %info.component_id, value = ?info.field_value, "bound field update");
        }
        debug!(handler = %handler_id, component = %component_id, "dispatching event");

        // No host borrow is held while component code runs.
        match handler {
            Handler::Sync(f) => {
                if let Err(e) = f(&args) {
                    context.sink.report(HostError::component(component_id, e));
                }
                Rc::clone(&self.shared).schedule(component_id);
                Ok(EventCompletion::completed())
            }
            Handler::Async(f) => {
                let ctx = ComponentContext {
                    component_id,
                    shared: Rc::downgrade(&self.shared),
                };
                let (completion, sender) = EventCompletion::pending();
                start_lifecycle(f(args), ctx, &context, Some(sender));
                Rc::clone(&self.shared).schedule(component_id);
                Ok(completion)
            }
        }
    }
}
