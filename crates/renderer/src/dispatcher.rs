use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

use futures::executor::LocalPool;
use tessera_frames::DispatcherHandle;
use tracing::trace;

use crate::error::RenderError;

/// Longest single park while waiting. Wakes from other threads end a park
/// early; the cap covers state changes that come without a wake.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// The renderer's single-threaded executor.
///
/// Everything that touches the document or the host runs here. Tasks only
/// make progress while a caller pumps the dispatcher.
pub struct Dispatcher {
    pool: RefCell<LocalPool>,
    pending: Rc<Cell<usize>>,
    handle: DispatcherHandle,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        let pool = LocalPool::new();
        let pending = Rc::new(Cell::new(0));
        let handle = DispatcherHandle::new(pool.spawner(), Rc::clone(&pending));
        Dispatcher {
            pool: RefCell::new(pool),
            pending,
            handle,
        }
    }

    pub fn handle(&self) -> DispatcherHandle {
        self.handle.clone()
    }

    /// Run every task that can make progress. Returns `false` without doing
    /// anything when called from inside a task, since the pool is already running.
    pub fn run_until_stalled(&self) -> bool {
        match self.pool.try_borrow_mut() {
            Ok(mut pool) => {
                pool.run_until_stalled();
                true
            }
            Err(_) => {
                trace!("dispatcher already running, skipping nested pump");
                false
            }
        }
    }

    /// Lifecycle tasks spawned through the handle that have not finished.
    pub fn pending_lifecycle(&self) -> usize {
        self.pending.get()
    }
}

/// Outcome of one attempt in [`wait_for`].
pub(crate) enum Attempt<T> {
    Ready(T),
    /// Not yet. The error, if any, is reported when the wait times out.
    Pending(Option<RenderError>),
}

/// Retry `attempt` until it is ready or `timeout` passes, parking the thread
/// between attempts. Errors returned by `attempt` end the wait at once.
pub(crate) fn wait_for<T>(
    timeout: Duration,
    mut attempt: impl FnMut() -> Result<Attempt<T>, RenderError>,
) -> Result<T, RenderError> {
    let start = Instant::now();
    let deadline = start + timeout;
    let mut last_failure = None;
    loop {
        match attempt()? {
            Attempt::Ready(value) => return Ok(value),
            Attempt::Pending(failure) => {
                if failure.is_some() {
                    last_failure = failure;
                }
            }
        }
        let now = Instant::now();
        if now >= deadline {
            return Err(RenderError::Timeout {
                waited: now - start,
                last_failure: last_failure.map(Box::new),
            });
        }
        thread::park_timeout((deadline - now).min(POLL_INTERVAL));
    }
}
