//! Queue facade over execution contexts
//!
//! A [`Queue`] is a cheap, cloneable handle to an execution context. Cloning
//! copies the handle; every clone submits to the same context.
//!
//! # Deadlock hazard
//!
//! [`Queue::sync`] blocks the caller until the task has run. Calling it on a
//! serial queue from a thread that is already running that queue's work
//! (including calling `Queue::main().sync(..)` from the main thread) can never
//! complete. With `reentrancy_check` enabled (the default in debug builds)
//! this fails fast with a panic; otherwise it hangs forever.
//! [`Queue::try_sync`] always checks and returns
//! [`QueueError::WouldDeadlock`] instead.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

use crossbeam_channel::bounded;

use dispatchq_engine::{
    delay_scheduler, main_context, ConcurrentContext, ContextId, ContextKind, ExecutionContext,
    SerialContext,
};

use crate::error::{QueueError, QueueResult};
use crate::runtime;

static MAIN: LazyLock<Queue> = LazyLock::new(|| {
    let context: Arc<dyn ExecutionContext> = main_context().clone();
    Queue::from_context(context)
});

static GLOBAL: LazyLock<Queue> = LazyLock::new(|| {
    let config = runtime::config();
    let workers = config.resolved_global_workers();
    match ConcurrentContext::spawn(config.global_label.clone(), workers) {
        Ok(context) => Queue::from_context(Arc::new(context)),
        Err(e) => panic!("Failed to start global queue: {}", e),
    }
});

/// Handle to an execution context
#[derive(Clone)]
pub struct Queue {
    context: Arc<dyn ExecutionContext>,
}

impl Queue {
    /// Label given to queues created by [`Queue::new`]
    pub const DEFAULT_LABEL: &'static str = "dispatchq.default";

    /// Create a queue backed by a fresh serial context
    ///
    /// # Panics
    /// Panics if the worker thread cannot be started. Use [`Queue::try_new`]
    /// to handle that case.
    pub fn new() -> Self {
        Self::try_new().unwrap_or_else(|e| panic!("Failed to create queue: {}", e))
    }

    /// Create a queue backed by a fresh serial context
    pub fn try_new() -> QueueResult<Self> {
        Self::serial(Self::DEFAULT_LABEL)
    }

    /// Create a serial queue with its own worker thread
    pub fn serial(label: impl Into<String>) -> QueueResult<Self> {
        let context = SerialContext::spawn(label)?;
        Ok(Self::from_context(Arc::new(context)))
    }

    /// Create a concurrent queue with `workers` threads (at least one)
    pub fn concurrent(label: impl Into<String>, workers: usize) -> QueueResult<Self> {
        let context = ConcurrentContext::spawn(label, workers)?;
        Ok(Self::from_context(Arc::new(context)))
    }

    /// Wrap an existing execution context
    pub fn from_context(context: Arc<dyn ExecutionContext>) -> Self {
        Self { context }
    }

    /// The queue bound to the designated main thread
    ///
    /// Tasks only run while the main thread pumps the queue, see
    /// [`crate::pump_main_queue`] and [`crate::run_main_loop`].
    pub fn main() -> &'static Queue {
        &MAIN
    }

    /// The shared concurrent queue
    pub fn global() -> &'static Queue {
        &GLOBAL
    }

    /// Label of the underlying context
    pub fn label(&self) -> &str {
        self.context.label()
    }

    /// Ordering discipline of the underlying context
    pub fn kind(&self) -> ContextKind {
        self.context.kind()
    }

    /// Identifier of the underlying context
    pub fn id(&self) -> ContextId {
        self.context.id()
    }

    /// Tasks submitted but not yet started
    pub fn pending(&self) -> usize {
        self.context.pending()
    }

    /// Whether the calling thread is currently executing on this queue
    pub fn is_current(&self) -> bool {
        self.context.is_current()
    }

    /// Whether both handles submit to the same context
    pub fn same_context(&self, other: &Queue) -> bool {
        self.id() == other.id()
    }

    /// Run `task` asynchronously (`is_async`) or block until it completes
    pub fn dispatch<F>(&self, is_async: bool, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if is_async {
            self.spawn(task);
        } else {
            self.sync(task);
        }
    }

    /// Run `task` on this queue and block until it completes
    ///
    /// Returns the task's value. A panic inside the task is resumed on the
    /// calling thread.
    ///
    /// # Panics
    /// With `reentrancy_check` enabled, panics if called from a thread
    /// already executing on this serial queue. See the module docs.
    #[tracing::instrument(skip(task))]
    pub fn sync<F, R>(&self, task: F) -> R
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if runtime::config().reentrancy_check {
            if let Err(e) = self.check_reentrancy() {
                panic!("{}", e);
            }
        }
        self.sync_unchecked(task)
    }

    /// Like [`sync`](Self::sync), but reports a self-deadlock instead of
    /// blocking, regardless of configuration
    pub fn try_sync<F, R>(&self, task: F) -> QueueResult<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.check_reentrancy()?;
        Ok(self.sync_unchecked(task))
    }

    fn check_reentrancy(&self) -> QueueResult<()> {
        if self.kind().is_serial() && self.is_current() {
            return Err(QueueError::WouldDeadlock {
                label: self.label().to_owned(),
            });
        }
        Ok(())
    }

    fn sync_unchecked<F, R>(&self, task: F) -> R
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        // A worker of this concurrent queue waiting on its own pool can
        // starve it, so nested calls run in place
        if !self.kind().is_serial() && self.is_current() {
            return match panic::catch_unwind(AssertUnwindSafe(task)) {
                Ok(value) => value,
                Err(payload) => panic::resume_unwind(payload),
            };
        }

        let (tx, rx) = bounded(1);
        self.context.submit(Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(task));
            let _ = tx.send(outcome);
        }));

        match rx.recv() {
            Ok(Ok(value)) => value,
            Ok(Err(payload)) => panic::resume_unwind(payload),
            Err(_) => panic!("Queue '{}' dropped a synchronous task", self.label()),
        }
    }

    /// Submit `task` and return immediately
    #[tracing::instrument(skip(task))]
    pub fn spawn<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.context.submit(Box::new(task));
    }

    /// Submit `task` to run no earlier than `seconds` from now
    ///
    /// Negative or NaN delays are clamped to zero. A delay too large to
    /// represent never elapses, so the task is dropped.
    pub fn after<F>(&self, seconds: f64, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        match delay_from_secs(seconds) {
            Some(delay) => self.after_duration(delay, task),
            None => tracing::warn!(
                "Delay of {}s on '{}' is unrepresentable, dropping task",
                seconds,
                self.label()
            ),
        }
    }

    /// Submit `task` to run no earlier than `delay` from now
    pub fn after_duration<F>(&self, delay: Duration, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        match Instant::now().checked_add(delay) {
            Some(deadline) => self.after_deadline(deadline, task),
            None => tracing::warn!(
                "Delay of {:?} on '{}' overflows the clock, dropping task",
                delay,
                self.label()
            ),
        }
    }

    /// Submit `task` to run no earlier than `deadline`
    #[tracing::instrument(skip(task))]
    pub fn after_deadline<F>(&self, deadline: Instant, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        delay_scheduler().schedule(deadline, Arc::clone(&self.context), Box::new(task));
    }
}

impl Default for Queue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue")
            .field("label", &self.label())
            .field("kind", &self.kind())
            .field("id", &self.id())
            .finish()
    }
}

/// Convert a delay in seconds, clamping negative and NaN input to zero
fn delay_from_secs(seconds: f64) -> Option<Duration> {
    if seconds.is_nan() || seconds < 0.0 {
        tracing::warn!("Delay of {}s clamped to zero", seconds);
        return Some(Duration::ZERO);
    }
    Duration::try_from_secs_f64(seconds).ok()
}
