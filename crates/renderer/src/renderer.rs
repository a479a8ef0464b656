use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::future::Future;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::channel::{mpsc, oneshot};
use futures::future::{self, FutureExt, LocalBoxFuture, Shared};
use tessera_dom::NodeId;
use tessera_frames::{
    BatchSink, ComponentId, EventArgs, EventCompletion, EventFieldInfo, EventHandlerId, HostContext,
    HostError, HostMessage, HostRuntime, RenderBatch,
};
use tracing::{debug, warn};

use crate::bridge::{EventTarget, OwnerLink};
use crate::dispatcher::{wait_for, Attempt, Dispatcher};
use crate::error::{PatchError, RenderError};
use crate::fragment::RenderedFragment;
use crate::options::RendererOptions;
use crate::patcher::{HandlerRegistration, Patcher};
use crate::projector::project_component;

/// Where the renderer is in its render cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Rendering,
    AwaitingLifecycle,
}

/// Number of batches applied so far. Clones share the count and can be read
/// from any thread.
#[derive(Debug, Clone, Default)]
pub struct RenderCounter(Arc<AtomicU64>);

impl RenderCounter {
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    fn increment(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Resolves with the latest exception the host reported. Before the first
/// one it waits, and yields `None` if the renderer is dropped meanwhile.
pub type UnhandledException = Shared<LocalBoxFuture<'static, Option<Arc<HostError>>>>;

type ExceptionSignal = (oneshot::Sender<Arc<HostError>>, UnhandledException);

pub(crate) struct RendererCore<H: HostRuntime + 'static> {
    pub(crate) host: RefCell<H>,
    pub(crate) patcher: RefCell<Patcher>,
    pub(crate) options: RendererOptions,
    dispatcher: Dispatcher,
    receiver: RefCell<mpsc::UnboundedReceiver<HostMessage>>,
    phase: Cell<Phase>,
    counter: RenderCounter,
    component_renders: RefCell<HashMap<ComponentId, u64>>,
    /// Captured exception not yet rethrown.
    exception: RefCell<Option<Arc<HostError>>>,
    last_exception: RefCell<Option<Arc<HostError>>>,
    exception_signal: RefCell<Option<ExceptionSignal>>,
    /// Strong side of the weak owner every live document carries.
    _owner: Rc<dyn Any>,
}

/// Drives a host runtime off-screen and keeps its output in a live document.
///
/// A renderer is single-threaded: the host, the document and every
/// continuation run on its dispatcher, which makes progress whenever one of
/// the entry points below is called.
pub struct Renderer<H: HostRuntime + 'static> {
    core: Rc<RendererCore<H>>,
}

impl<H: HostRuntime + 'static> Renderer<H> {
    pub fn new(host: H) -> Self {
        Self::with_options(host, RendererOptions::default())
    }

    pub fn with_options(mut host: H, options: RendererOptions) -> Self {
        let dispatcher = Dispatcher::new();
        let (sink, receiver) = BatchSink::channel();
        host.attach(HostContext {
            sink,
            dispatcher: dispatcher.handle(),
        });

        let core = Rc::new_cyclic(|weak: &Weak<RendererCore<H>>| {
            let target: Weak<dyn EventTarget> = weak.clone();
            let owner: Rc<dyn Any> = Rc::new(OwnerLink { target });
            let mut patcher = Patcher::new();
            patcher.document_mut().set_owner(Rc::downgrade(&owner));
            RendererCore {
                host: RefCell::new(host),
                patcher: RefCell::new(patcher),
                options,
                dispatcher,
                receiver: RefCell::new(receiver),
                phase: Cell::new(Phase::Idle),
                counter: RenderCounter::default(),
                component_renders: RefCell::new(HashMap::new()),
                exception: RefCell::new(None),
                last_exception: RefCell::new(None),
                exception_signal: RefCell::new(None),
                _owner: owner,
            }
        });
        Renderer { core }
    }

    pub fn options(&self) -> &RendererOptions {
        &self.core.options
    }

    pub fn phase(&self) -> Phase {
        self.core.phase.get()
    }

    pub fn render_counter(&self) -> RenderCounter {
        self.core.counter.clone()
    }

    /// Batches that updated `component_id`.
    pub fn render_count(&self, component_id: ComponentId) -> u64 {
        self.core.render_count(component_id)
    }

    /// Mount `root`, render it and return its fragment as soon as the first
    /// batch is applied. Lifecycle work still suspended keeps running on
    /// later entry points.
    pub fn render(&self, root: H::Root) -> Result<RenderedFragment<H>, RenderError> {
        let component_id = self.core.start_render(root)?;
        self.core.phase.set(Phase::Idle);
        Ok(RenderedFragment::new(Rc::clone(&self.core), component_id))
    }

    /// Like [`Renderer::render`], but the returned task can wait for every
    /// lifecycle continuation chained from the render.
    pub fn render_async(&self, root: H::Root) -> Result<RenderTask<H>, RenderError> {
        let component_id = self.core.start_render(root)?;
        self.core.settle_phase();
        Ok(RenderTask {
            core: Rc::clone(&self.core),
            component_id,
        })
    }

    /// Run `work` on the dispatcher and return its result.
    pub fn invoke<T, F>(&self, work: F) -> Result<T, RenderError>
    where
        F: FnOnce() -> T + 'static,
        T: 'static,
    {
        self.invoke_async(move || async move { work() })
    }

    /// Run the future `work` returns on the dispatcher and wait for its output.
    pub fn invoke_async<T, F, Fut>(&self, work: F) -> Result<T, RenderError>
    where
        F: FnOnce() -> Fut + 'static,
        Fut: Future<Output = T> + 'static,
        T: 'static,
    {
        self.core.pump()?;
        let (sender, mut receiver) = oneshot::channel();
        let spawned = self.core.dispatcher.handle().spawn(async move {
            let _ = sender.send(work().await);
        });
        if spawned.is_err() {
            warn!("dispatcher refused invoked work");
        }
        wait_for(self.core.options.default_timeout(), || {
            self.core.pump()?;
            match receiver.try_recv() {
                Ok(Some(value)) => Ok(Attempt::Ready(value)),
                _ => Ok(Attempt::Pending(None)),
            }
        })
    }

    /// Apply pending host output and rethrow a captured exception.
    pub fn pump(&self) -> Result<(), RenderError> {
        self.core.pump()
    }

    /// Borrow the host runtime, for assertions about its state.
    pub fn host<T>(&self, inspect: impl FnOnce(&H) -> T) -> T {
        inspect(&self.core.host.borrow())
    }

    /// Markup for `component_id` projected fresh from the host's frames,
    /// after pending host output is applied.
    pub fn project(&self, component_id: ComponentId) -> Result<String, RenderError> {
        self.core.pump()?;
        Ok(project_component(&*self.core.host.borrow(), component_id)?)
    }

    pub fn unhandled_exception(&self) -> UnhandledException {
        self.core.unhandled_exception()
    }

    /// Number of live entries in the event handler table.
    pub fn handler_count(&self) -> usize {
        self.core.patcher.borrow().handler_count()
    }
}

/// A render started by [`Renderer::render_async`].
pub struct RenderTask<H: HostRuntime + 'static> {
    core: Rc<RendererCore<H>>,
    component_id: ComponentId,
}

impl<H: HostRuntime + 'static> RenderTask<H> {
    pub fn component_id(&self) -> ComponentId {
        self.component_id
    }

    /// Wait with the renderer's default timeout.
    pub fn wait(self) -> Result<RenderedFragment<H>, RenderError> {
        let timeout = self.core.options.default_timeout();
        self.wait_timeout(timeout)
    }

    pub fn wait_timeout(self, timeout: Duration) -> Result<RenderedFragment<H>, RenderError> {
        let core = &self.core;
        let waited = wait_for(timeout, || {
            core.pump()?;
            if core.dispatcher.pending_lifecycle() == 0 {
                Ok(Attempt::Ready(()))
            } else {
                core.phase.set(Phase::AwaitingLifecycle);
                Ok(Attempt::Pending(None))
            }
        });
        core.settle_phase();
        waited?;
        Ok(RenderedFragment::new(Rc::clone(&self.core), self.component_id))
    }
}

impl<H: HostRuntime + 'static> RendererCore<H> {
    fn start_render(&self, root: H::Root) -> Result<ComponentId, RenderError> {
        self.pump()?;
        self.phase.set(Phase::Rendering);
        let started = self.mount(root);
        if started.is_err() {
            self.phase.set(Phase::Idle);
        }
        started
    }

    fn mount(&self, root: H::Root) -> Result<ComponentId, RenderError> {
        let component_id = self.host.borrow_mut().add_root(root);
        self.patcher.borrow_mut().attach_root(component_id)?;
        debug!(component = %component_id, "rendering root");
        let requested = self.host.borrow_mut().render_root(component_id);
        requested.map_err(RenderError::lifecycle)?;
        self.pump()?;
        Ok(component_id)
    }

    fn settle_phase(&self) {
        let phase = if self.dispatcher.pending_lifecycle() > 0 {
            Phase::AwaitingLifecycle
        } else {
            Phase::Idle
        };
        self.phase.set(phase);
    }

    pub(crate) fn render_count(&self, component_id: ComponentId) -> u64 {
        self.component_renders
            .borrow()
            .get(&component_id)
            .copied()
            .unwrap_or(0)
    }

    /// Run ready dispatcher work and apply everything the host sent, until
    /// neither produces more. Then rethrow a captured exception.
    pub(crate) fn pump(&self) -> Result<(), RenderError> {
        let mut applied = 0;
        loop {
            self.dispatcher.run_until_stalled();
            let drained = self.drain(self.options.max_batches_per_pump.saturating_sub(applied))?;
            applied += drained;
            if drained == 0 {
                break;
            }
            if applied >= self.options.max_batches_per_pump {
                warn!(applied, "batch limit reached, leaving the rest for the next pump");
                break;
            }
        }
        self.rethrow()
    }

    /// Handle queued host messages, applying at most `limit` batches.
    fn drain(&self, limit: usize) -> Result<usize, RenderError> {
        let mut applied = 0;
        while applied < limit {
            let next = self.receiver.borrow_mut().try_next();
            match next {
                Ok(Some(HostMessage::Batch(batch))) => {
                    self.apply_batch(&batch)?;
                    applied += 1;
                }
                Ok(Some(HostMessage::Exception(error))) => self.capture(error),
                Ok(None) | Err(_) => break,
            }
        }
        Ok(applied)
    }

    fn apply_batch(&self, batch: &RenderBatch) -> Result<(), PatchError> {
        let mut patcher = self.patcher.borrow_mut();
        let mut renders = self.component_renders.borrow_mut();
        for diff in &batch.updated_components {
            patcher.apply_diff(diff, &batch.reference_frames)?;
            *renders.entry(diff.component_id).or_default() += 1;
        }
        for id in &batch.disposed_component_ids {
            patcher.dispose_component(*id)?;
            renders.remove(id);
        }
        for id in &batch.disposed_event_handler_ids {
            patcher.dispose_handler(*id);
        }
        let count = self.counter.increment();
        debug!(
            render = count,
            components = batch.updated_components.len(),
            edits = batch.edit_count(),
            disposed = batch.disposed_component_ids.len(),
            "batch applied"
        );
        Ok(())
    }

    fn capture(&self, error: HostError) {
        let error = Arc::new(error.unwrap_single());
        warn!(error = %error, "unhandled exception captured");
        if let Some((sender, _)) = self.exception_signal.borrow_mut().take() {
            let _ = sender.send(Arc::clone(&error));
        }
        *self.last_exception.borrow_mut() = Some(Arc::clone(&error));
        *self.exception.borrow_mut() = Some(error);
    }

    fn rethrow(&self) -> Result<(), RenderError> {
        match self.exception.borrow_mut().take() {
            Some(error) => Err(RenderError::Lifecycle(error)),
            None => Ok(()),
        }
    }

    fn unhandled_exception(&self) -> UnhandledException {
        let mut signal = self.exception_signal.borrow_mut();
        if let Some((_, pending)) = signal.as_ref() {
            return pending.clone();
        }
        if let Some(error) = self.last_exception.borrow().as_ref() {
            return future::ready(Some(Arc::clone(error))).boxed_local().shared();
        }
        let (sender, receiver) = oneshot::channel();
        let pending = receiver.map(Result::ok).boxed_local().shared();
        *signal = Some((sender, pending.clone()));
        pending
    }
}

impl<H: HostRuntime + 'static> EventTarget for RendererCore<H> {
    fn handler(&self, handler_id: EventHandlerId) -> Option<HandlerRegistration> {
        self.patcher.borrow().handler(handler_id).cloned()
    }

    fn owning_component(&self, node: NodeId) -> Option<ComponentId> {
        self.patcher.borrow().owning_component(node)
    }

    fn dispatch(
        &self,
        handler_id: EventHandlerId,
        field_info: Option<EventFieldInfo>,
        args: EventArgs,
    ) -> Result<EventCompletion, RenderError> {
        self.pump()?;
        let result = self
            .host
            .borrow_mut()
            .dispatch_event(handler_id, field_info, args);
        let completion = result.map_err(RenderError::from_host_call)?;
        self.pump()?;
        Ok(completion)
    }

    fn pump(&self) -> Result<(), RenderError> {
        RendererCore::pump(self)
    }

    fn default_timeout(&self) -> Duration {
        self.options.default_timeout()
    }
}
