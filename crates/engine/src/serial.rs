//! Serial execution context
//!
//! One named worker thread drains an unbounded channel, so jobs run one at a
//! time in submission order. The worker exits once every handle has been
//! dropped and the backlog is empty.

use std::thread;

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::context::{enter_context, run_job, thread_name, ContextId, ContextKind, ExecutionContext, Job};
use crate::error::SubstrateError;

/// Context backed by a single worker thread
pub struct SerialContext {
    id: ContextId,
    label: String,
    sender: Sender<Job>,
}

impl SerialContext {
    /// Start a serial context with its own worker thread
    pub fn spawn(label: impl Into<String>) -> Result<Self, SubstrateError> {
        let label = label.into();
        let id = ContextId::next();
        let (sender, receiver) = unbounded::<Job>();

        let worker_label = label.clone();
        thread::Builder::new()
            .name(thread_name(&label))
            .spawn(move || worker_loop(id, &worker_label, receiver))
            .map_err(|source| SubstrateError::Spawn {
                label: label.clone(),
                source,
            })?;

        tracing::debug!("Serial context '{}' started (id {})", label, id.as_u64());
        Ok(Self { id, label, sender })
    }
}

fn worker_loop(id: ContextId, label: &str, receiver: Receiver<Job>) {
    let _guard = enter_context(id);
    for job in receiver.iter() {
        run_job(label, job);
    }
    tracing::debug!("Serial context '{}' stopped", label);
}

impl ExecutionContext for SerialContext {
    fn id(&self) -> ContextId {
        self.id
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn kind(&self) -> ContextKind {
        ContextKind::Serial
    }

    fn submit(&self, job: Job) {
        if self.sender.send(job).is_err() {
            tracing::error!("Serial context '{}' worker is gone, dropping task", self.label);
        }
    }

    fn pending(&self) -> usize {
        self.sender.len()
    }
}
