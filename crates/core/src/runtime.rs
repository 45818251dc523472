//! Process-wide runtime state
//!
//! Holds the runtime configuration and exposes the main-thread controls.
//! The thread that calls [`designate_main_thread`] owns [`Queue::main`] and
//! must pump it, either frame-style with [`pump_main_queue`] or by parking in
//! [`run_main_loop`].
//!
//! [`Queue::main`]: crate::Queue::main

use std::sync::OnceLock;

use dispatchq_engine::main_context;

use crate::config::CoreConfig;
use crate::error::{QueueError, QueueResult};

static CONFIG: OnceLock<CoreConfig> = OnceLock::new();

/// Fix the runtime configuration
///
/// Must run before the runtime is first used. Returns error if the
/// configuration was already set or already loaded on demand.
pub fn init(config: CoreConfig) -> QueueResult<()> {
    CONFIG.set(config).map_err(|_| QueueError::AlreadyInitialized)?;
    tracing::debug!("Runtime configuration initialized");
    Ok(())
}

/// Get the runtime configuration
///
/// Falls back to [`CoreConfig::from_env`] (and then to defaults) if
/// [`init`] was never called.
pub fn config() -> &'static CoreConfig {
    CONFIG.get_or_init(|| {
        CoreConfig::from_env().unwrap_or_else(|e| {
            tracing::warn!("Failed to load runtime config, using defaults: {}", e);
            CoreConfig::default()
        })
    })
}

/// Make the calling thread the main thread
pub fn designate_main_thread() -> QueueResult<()> {
    dispatchq_engine::designate_main_thread()?;
    tracing::info!("Main thread designated: {:?}", std::thread::current().id());
    Ok(())
}

/// Check if current thread is the designated main thread
pub fn is_main_thread() -> bool {
    dispatchq_engine::is_main_thread()
}

/// Run the main-queue tasks queued so far without blocking
///
/// Call from the main thread, e.g. once per frame of a host loop.
/// Returns the number of tasks processed.
#[tracing::instrument]
pub fn pump_main_queue() -> QueueResult<usize> {
    Ok(main_context().drain()?)
}

/// Run main-queue tasks on the main thread until [`stop_main_loop`]
///
/// Returns the number of tasks processed.
pub fn run_main_loop() -> QueueResult<usize> {
    Ok(main_context().run()?)
}

/// Make [`run_main_loop`] return after the tasks already queued
///
/// Safe to call from any thread, including from a main-queue task. Does
/// nothing while the loop is not running.
pub fn stop_main_loop() {
    main_context().stop();
}
