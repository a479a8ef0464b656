use std::rc::Weak;

use futures::future::LocalBoxFuture;
use tessera_frames::{ComponentId, DispatcherHandle};

use crate::builder::RenderBuilder;
use crate::host::Shared;

/// Work a component starts during initialization. The component re-renders
/// when it finishes; an error is reported as an unhandled exception.
pub type LifecycleFuture = LocalBoxFuture<'static, anyhow::Result<()>>;

/// A UI component hosted by [`crate::TestHost`].
pub trait Component: 'static {
    /// Runs once before the first render.
    fn init(&mut self, _ctx: &ComponentContext) -> Option<LifecycleFuture> {
        None
    }

    fn render(&self, builder: &mut RenderBuilder);

    /// Runs when the component is removed from the tree.
    fn dispose(&mut self) {}

    /// Identity used to decide whether a child instance can be reused.
    fn component_type(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// A stateless component rendering with a closure.
pub struct FnComponent<F>(pub F);

impl<F> Component for FnComponent<F>
where
    F: Fn(&mut RenderBuilder) + 'static,
{
    fn render(&self, builder: &mut RenderBuilder) {
        (self.0)(builder)
    }
}

/// Handle a component keeps to talk to its host.
#[derive(Clone)]
pub struct ComponentContext {
    pub(crate) component_id: ComponentId,
    pub(crate) shared: Weak<Shared>,
}

impl ComponentContext {
    pub fn component_id(&self) -> ComponentId {
        self.component_id
    }

    /// Schedule a re-render of this component. Does nothing once the host is gone.
    pub fn state_has_changed(&self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.schedule(self.component_id);
        }
    }

    /// The dispatcher of the renderer the host is attached to.
    pub fn dispatcher(&self) -> Option<DispatcherHandle> {
        self.shared
            .upgrade()
            .and_then(|shared| shared.context().map(|c| c.dispatcher))
    }
}
