//! dispatchq - Serial and Concurrent Task Queues
//!
//! A thin queue facade over the execution contexts of [`dispatchq_engine`].
//! Tasks run synchronously ([`Queue::sync`]), asynchronously
//! ([`Queue::spawn`]) or after a delay ([`Queue::after`]).
//!
//! # Queues
//!
//! - [`Queue::new`] - a private serial queue (FIFO, one task at a time)
//! - [`Queue::main`] - the serial queue of the designated main thread
//! - [`Queue::global`] - the shared concurrent worker pool
//!
//! # Example
//!
//! ```ignore
//! use dispatchq::Queue;
//!
//! dispatchq::designate_main_thread()?;
//!
//! let io = Queue::new();
//! io.spawn(|| tracing::info!("runs on the io queue"));
//! let answer = Queue::global().sync(|| 6 * 7);
//!
//! dispatchq::after(0.5, || dispatchq::stop_main_loop());
//! dispatchq::run_main_loop()?;
//! ```
//!
//! # Re-exports
//!
//! The engine crate is re-exported as [`engine`] for custom contexts.

pub use dispatchq_engine as engine;

pub mod config;
pub mod error;
pub mod queue;
pub mod runtime;

#[cfg(test)]
mod test_support;

pub use config::{ConfigError, ConfigResult, CoreConfig};
pub use dispatchq_engine::{ContextId, ContextKind, ExecutionContext, SubstrateError};
pub use error::{QueueError, QueueResult};
pub use queue::Queue;
pub use runtime::{
    config, designate_main_thread, init, is_main_thread, pump_main_queue, run_main_loop,
    stop_main_loop,
};

/// Run `task` on the main queue no earlier than `seconds` from now
///
/// Shorthand for `Queue::main().after(seconds, task)`.
pub fn after<F>(seconds: f64, task: F)
where
    F: FnOnce() + Send + 'static,
{
    Queue::main().after(seconds, task);
}
