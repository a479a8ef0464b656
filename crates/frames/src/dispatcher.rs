use std::cell::Cell;
use std::future::Future;
use std::rc::Rc;

use futures::executor::LocalSpawner;
use futures::task::{LocalSpawnExt, SpawnError};

/// Handle to a renderer's single-threaded dispatcher.
///
/// The host runtime marshals its own continuations through it. Work spawned
/// with [`DispatcherHandle::spawn_lifecycle`] is counted so the renderer can
/// tell when lifecycle work chained from a render has settled.
#[derive(Clone)]
pub struct DispatcherHandle {
    spawner: LocalSpawner,
    pending: Rc<Cell<usize>>,
}

/// Decrements the pending counter when the tracked future finishes or is dropped.
struct PendingGuard {
    pending: Rc<Cell<usize>>,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.pending.set(self.pending.get().saturating_sub(1));
    }
}

impl DispatcherHandle {
    pub fn new(spawner: LocalSpawner, pending: Rc<Cell<usize>>) -> Self {
        DispatcherHandle { spawner, pending }
    }

    /// Spawn untracked work onto the dispatcher.
    pub fn spawn<F>(&self, future: F) -> Result<(), SpawnError>
    where
        F: Future<Output = ()> + 'static,
    {
        self.spawner.spawn_local(future)
    }

    /// Spawn lifecycle work the renderer waits on in `render_async`.
    pub fn spawn_lifecycle<F>(&self, future: F) -> Result<(), SpawnError>
    where
        F: Future<Output = ()> + 'static,
    {
        self.pending.set(self.pending.get() + 1);
        let guard = PendingGuard {
            pending: Rc::clone(&self.pending),
        };
        self.spawner.spawn_local(async move {
            let _guard = guard;
            future.await;
        })
    }

    pub fn pending_lifecycle(&self) -> usize {
        self.pending.get()
    }
}

impl std::fmt::Debug for DispatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatcherHandle")
            .field("pending", &self.pending.get())
            .finish()
    }
}
