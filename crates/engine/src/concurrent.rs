//! Concurrent execution context
//!
//! Jobs are spawned onto a dedicated `rayon` thread pool and picked up by
//! whichever worker is free, so they may overlap and carry no ordering
//! guarantee among themselves.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::context::{enter_context, run_job, thread_name, ContextId, ContextKind, ExecutionContext, Job};
use crate::error::SubstrateError;

/// Context backed by a pool of worker threads
pub struct ConcurrentContext {
    id: ContextId,
    label: Arc<str>,
    pool: ThreadPool,
    /// Jobs submitted but not yet started
    queued: Arc<AtomicUsize>,
}

impl ConcurrentContext {
    /// Start a concurrent context with `workers` threads (at least one)
    ///
    /// Threads are named `{label}-{n}`.
    pub fn spawn(label: impl Into<String>, workers: usize) -> Result<Self, SubstrateError> {
        let label: String = label.into();
        let workers = workers.max(1);
        let id = ContextId::next();

        let prefix = thread_name(&label);
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(move |n| format!("{}-{}", prefix, n))
            .build()
            .map_err(|source| SubstrateError::Pool {
                label: label.clone(),
                source,
            })?;

        tracing::debug!(
            "Concurrent context '{}' started with {} workers (id {})",
            label,
            workers,
            id.as_u64()
        );
        Ok(Self {
            id,
            label: label.into(),
            pool,
            queued: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Number of worker threads
    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl ExecutionContext for ConcurrentContext {
    fn id(&self) -> ContextId {
        self.id
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn kind(&self) -> ContextKind {
        ContextKind::Concurrent
    }

    fn submit(&self, job: Job) {
        let id = self.id;
        let label = Arc::clone(&self.label);
        let queued = Arc::clone(&self.queued);

        queued.fetch_add(1, Ordering::SeqCst);
        self.pool.spawn_fifo(move || {
            queued.fetch_sub(1, Ordering::SeqCst);
            let _guard = enter_context(id);
            run_job(&label, job);
        });
    }

    fn pending(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    use crossbeam_channel::bounded;

    #[test]
    fn test_jobs_overlap_across_workers() {
        let context = ConcurrentContext::spawn("test.concurrent.overlap", 2).unwrap();
        // Both jobs must be running at once for the barrier to release
        let barrier = Arc::new(Barrier::new(2));
        let (tx, rx) = bounded(2);

        for _ in 0..2 {
            let barrier = Arc::clone(&barrier);
            let tx = tx.clone();
            context.submit(Box::new(move || {
                barrier.wait();
                tx.send(()).unwrap();
            }));
        }

        for _ in 0..2 {
            rx.recv_timeout(Duration::from_secs(5)).unwrap();
        }
    }

    #[test]
    fn test_worker_count_clamped() {
        let context = ConcurrentContext::spawn("test.concurrent.clamp", 0).unwrap();
        assert_eq!(context.workers(), 1);
        assert_eq!(context.kind(), ContextKind::Concurrent);

        let (tx, rx) = bounded(1);
        context.submit(Box::new(move || tx.send(1).unwrap()));
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 1);
    }

    #[test]
    fn test_workers_named_after_label() {
        let context = ConcurrentContext::spawn("test.concurrent.name", 3).unwrap();
        let (tx, rx) = bounded(1);

        context.submit(Box::new(move || {
            tx.send(thread::current().name().map(str::to_owned)).unwrap()
        }));

        let name = rx.recv_timeout(Duration::from_secs(5)).unwrap().unwrap();
        assert!(name.starts_with("test.concurrent.name-"));
    }

    #[test]
    fn test_pending_counts_unstarted_jobs() {
        let context = ConcurrentContext::spawn("test.concurrent.pending", 1).unwrap();
        let (gate_tx, gate_rx) = bounded::<()>(0);
        let (started_tx, started_rx) = bounded(1);
        let (done_tx, done_rx) = bounded(1);

        context.submit(Box::new(move || {
            started_tx.send(()).unwrap();
            gate_rx.recv().unwrap();
        }));
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        context.submit(Box::new(|| {}));
        context.submit(Box::new(move || done_tx.send(()).unwrap()));
        assert_eq!(context.pending(), 2);

        gate_tx.send(()).unwrap();
        done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(context.pending(), 0);
    }

    #[test]
    fn test_worker_marks_current_context_and_survives_panic() {
        let context = Arc::new(ConcurrentContext::spawn("test.concurrent.current", 1).unwrap());
        let (tx, rx) = bounded(1);

        context.submit(Box::new(|| panic!("task failure")));
        let inner = Arc::clone(&context);
        context.submit(Box::new(move || tx.send(inner.is_current()).unwrap()));

        assert!(rx.recv_timeout(Duration::from_secs(5)).unwrap());
        assert!(!context.is_current());
    }
}
