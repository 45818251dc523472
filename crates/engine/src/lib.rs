//! dispatchq engine - Execution Contexts and Global Storage
//!
//! This crate is the execution substrate behind `dispatchq`:
//! - Serial contexts backed by a single named worker thread
//! - Concurrent contexts backed by a fixed pool of worker threads
//! - The main context, drained by one designated thread
//! - A monotonic delay scheduler that hands jobs to a context at a deadline
//!
//! # Architecture
//!
//! Every context implements [`ExecutionContext`], which is the only thing the
//! queue facade depends on. Process-wide state (the main context and the
//! delay scheduler) lives in [`globals`] and is created on first access.
//!
//! # Thread Safety
//!
//! All contexts are `Send + Sync` and can be shared behind an `Arc`. The main
//! thread is claimed once via [`designate_main_thread()`] and checked at
//! runtime via [`is_main_thread()`].

pub mod concurrent;
pub mod context;
pub mod error;
pub mod globals;
pub mod main_thread;
pub mod serial;
pub mod timer;

pub use concurrent::ConcurrentContext;
pub use context::{current_context, ContextId, ContextKind, ExecutionContext, Job};
pub use error::SubstrateError;
pub use globals::{delay_scheduler, designate_main_thread, is_main_thread, main_context};
pub use main_thread::MainContext;
pub use serial::SerialContext;
pub use timer::DelayScheduler;
