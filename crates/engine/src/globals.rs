//! Process-wide execution state
//!
//! The main context and the delay scheduler are created once, on first
//! access, and live for the rest of the process.

use std::sync::{Arc, LazyLock};

use crate::error::SubstrateError;
use crate::main_thread::MainContext;
use crate::timer::DelayScheduler;

/// Label of the process main context
pub const MAIN_LABEL: &str = "dispatchq.main";

/// Thread name of the process delay scheduler
pub const TIMER_THREAD_NAME: &str = "dispatchq.timer";

static MAIN: LazyLock<Arc<MainContext>> = LazyLock::new(|| Arc::new(MainContext::new(MAIN_LABEL)));

static TIMER: LazyLock<DelayScheduler> = LazyLock::new(|| {
    DelayScheduler::spawn(TIMER_THREAD_NAME)
        .unwrap_or_else(|e| panic!("Failed to start delay scheduler: {}", e))
});

/// Get the process main context
pub fn main_context() -> &'static Arc<MainContext> {
    &MAIN
}

/// Get the process delay scheduler
///
/// # Panics
/// Panics if the scheduler thread cannot be started on first access
pub fn delay_scheduler() -> &'static DelayScheduler {
    &TIMER
}

/// Make the calling thread the process main thread
///
/// Returns error if another thread already holds the role.
pub fn designate_main_thread() -> Result<(), SubstrateError> {
    MAIN.claim()
}

/// Check if current thread is the designated main thread
pub fn is_main_thread() -> bool {
    MAIN.is_owner()
}
