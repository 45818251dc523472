//! Main thread execution context
//!
//! Any thread may queue work; only the owning thread runs it. The owner
//! processes the queue either frame-style via [`MainContext::drain`] or by
//! parking in [`MainContext::run`] until [`MainContext::stop`] is requested.
//! A stop only applies to the run active when it is requested.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::OnceLock;
use std::thread::{self, ThreadId};

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::context::{enter_context, run_job, ContextId, ContextKind, ExecutionContext, Job};
use crate::error::SubstrateError;

enum Message {
    Run(Job),
    /// Ends the run with this number
    Stop(u64),
}

/// Serial context drained by a single owning thread
pub struct MainContext {
    id: ContextId,
    label: String,
    sender: Sender<Message>,
    receiver: Receiver<Message>,
    owner: OnceLock<ThreadId>,
    running: AtomicBool,
    run_number: AtomicU64,
}

impl MainContext {
    /// Create an unowned main context
    pub fn new(label: impl Into<String>) -> Self {
        let (sender, receiver) = unbounded();
        Self {
            id: ContextId::next(),
            label: label.into(),
            sender,
            receiver,
            owner: OnceLock::new(),
            running: AtomicBool::new(false),
            run_number: AtomicU64::new(0),
        }
    }

    /// Make the calling thread the owner
    ///
    /// Idempotent for the owning thread. Fails if a different thread already
    /// owns the context.
    pub fn claim(&self) -> Result<(), SubstrateError> {
        let me = thread::current().id();
        if *self.owner.get_or_init(|| me) == me {
            tracing::debug!("Main context '{}' owned by {:?}", self.label, me);
            Ok(())
        } else {
            Err(SubstrateError::MainThreadClaimed)
        }
    }

    /// Whether the calling thread owns this context
    pub fn is_owner(&self) -> bool {
        self.owner
            .get()
            .is_some_and(|owner| *owner == thread::current().id())
    }

    fn ensure_owner(&self) -> Result<(), SubstrateError> {
        if self.is_owner() {
            Ok(())
        } else {
            Err(SubstrateError::NotMainThread)
        }
    }

    /// Process the jobs queued at call time without blocking
    ///
    /// Jobs queued by the processed jobs wait for the next call.
    /// Returns the number of jobs processed.
    pub fn drain(&self) -> Result<usize, SubstrateError> {
        self.ensure_owner()?;
        let _guard = enter_context(self.id);

        let budget = self.receiver.len();
        let mut count = 0;
        for _ in 0..budget {
            match self.receiver.try_recv() {
                Ok(Message::Run(job)) => {
                    run_job(&self.label, job);
                    count += 1;
                }
                // Left over from a run that already returned
                Ok(Message::Stop(_)) => {}
                Err(_) => break,
            }
        }

        if count > 0 {
            tracing::trace!("Processed {} main queue tasks", count);
        }
        Ok(count)
    }

    /// Block processing jobs until a stop is requested
    ///
    /// Returns the number of jobs processed.
    pub fn run(&self) -> Result<usize, SubstrateError> {
        self.ensure_owner()?;
        let _guard = enter_context(self.id);
        let run_number = self.run_number.fetch_add(1, Ordering::SeqCst) + 1;
        self.running.store(true, Ordering::SeqCst);
        tracing::debug!("Main loop '{}' running", self.label);

        let mut count = 0;
        while let Ok(message) = self.receiver.recv() {
            match message {
                Message::Run(job) => {
                    run_job(&self.label, job);
                    count += 1;
                }
                Message::Stop(n) if n == run_number => break,
                Message::Stop(_) => {}
            }
        }

        self.running.store(false, Ordering::SeqCst);
        tracing::debug!("Main loop '{}' stopped after {} tasks", self.label, count);
        Ok(count)
    }

    /// Ask a blocking [`run`](Self::run) to return once the jobs queued
    /// before this call have been processed
    ///
    /// Does nothing when no run is active.
    pub fn stop(&self) {
        if !self.is_running() {
            tracing::debug!("Main loop '{}' not running, ignoring stop", self.label);
            return;
        }
        let run_number = self.run_number.load(Ordering::SeqCst);
        // Both channel ends live in self, so this cannot fail
        let _ = self.sender.send(Message::Stop(run_number));
    }

    /// Whether the owner is parked in [`run`](Self::run)
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl ExecutionContext for MainContext {
    fn id(&self) -> ContextId {
        self.id
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn kind(&self) -> ContextKind {
        ContextKind::Main
    }

    fn submit(&self, job: Job) {
        let _ = self.sender.send(Message::Run(job));
    }

    fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// The owner is "on" the main context whether or not it is inside a job
    fn is_current(&self) -> bool {
        self.is_owner()
    }
}
