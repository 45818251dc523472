//! Execution context trait and per-thread bookkeeping

use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};

/// A unit of work handed to an execution context
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Process-unique identifier of an execution context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl ContextId {
    /// Allocate a fresh identifier
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value (for logging)
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Ordering discipline of a context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    /// One job at a time, in submission order
    Serial,
    /// Jobs may overlap on several worker threads
    Concurrent,
    /// Serial, drained by the designated main thread
    Main,
}

impl ContextKind {
    /// `true` for contexts that never run two jobs at once
    pub fn is_serial(self) -> bool {
        !matches!(self, ContextKind::Concurrent)
    }
}

/// An execution context that accepts jobs
///
/// Implementations must run every submitted job exactly once (unless the
/// context is torn down) and must honour their [`ContextKind`].
pub trait ExecutionContext: Send + Sync {
    /// Identifier used for identity checks
    fn id(&self) -> ContextId;

    /// Human readable label (also used for thread names)
    fn label(&self) -> &str;

    /// Ordering discipline
    fn kind(&self) -> ContextKind;

    /// Submit a job for asynchronous execution. Never blocks.
    fn submit(&self, job: Job);

    /// Number of jobs waiting to start
    fn pending(&self) -> usize;

    /// Whether the calling thread is currently running a job of this context
    fn is_current(&self) -> bool {
        current_context() == Some(self.id())
    }
}

thread_local! {
    static CURRENT: Cell<Option<ContextId>> = const { Cell::new(None) };
}

/// Context whose job is running on this thread, if any
pub fn current_context() -> Option<ContextId> {
    CURRENT.with(Cell::get)
}

/// Restores the previous current-context marker on drop
pub(crate) struct ContextGuard {
    previous: Option<ContextId>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        CURRENT.with(|current| current.set(self.previous));
    }
}

/// Mark this thread as running jobs of `id` until the guard drops
pub(crate) fn enter_context(id: ContextId) -> ContextGuard {
    let previous = CURRENT.with(|current| current.replace(Some(id)));
    ContextGuard { previous }
}

/// Run a job, containing any panic so the worker survives
pub(crate) fn run_job(label: &str, job: Job) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
        tracing::error!(queue = label, "Task panicked: {}", panic_message(&*payload));
    }
}

/// Best-effort extraction of a panic payload's message
pub fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}

/// Replace characters the OS rejects in thread names
pub(crate) fn thread_name(label: &str) -> String {
    label.replace('\0', "?")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_ids_unique() {
        let a = ContextId::next();
        let b = ContextId::next();
        assert_ne!(a, b);
        assert!(b.as_u64() > a.as_u64());
    }

    #[test]
    fn test_enter_context_restores_previous() {
        assert_eq!(current_context(), None);

        let outer = ContextId::next();
        let inner = ContextId::next();
        {
            let _outer = enter_context(outer);
            assert_eq!(current_context(), Some(outer));
            {
                let _inner = enter_context(inner);
                assert_eq!(current_context(), Some(inner));
            }
            assert_eq!(current_context(), Some(outer));
        }
        assert_eq!(current_context(), None);
    }

    #[test]
    fn test_run_job_contains_panic() {
        run_job("test", Box::new(|| panic!("boom")));
    }

    #[test]
    fn test_kind_is_serial() {
        assert!(ContextKind::Serial.is_serial());
        assert!(ContextKind::Main.is_serial());
        assert!(!ContextKind::Concurrent.is_serial());
    }

    #[test]
    fn test_thread_name_strips_nul() {
        assert_eq!(thread_name("a\0b"), "a?b");
    }
}
