//! Shared helpers for unit tests

use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

use crossbeam_channel::bounded;

/// Upper bound for waiting on work that should finish promptly
pub(crate) const TIMEOUT: Duration = Duration::from_secs(10);

static MAIN_THREAD: OnceLock<()> = OnceLock::new();

/// Designate a dedicated thread as main and keep it pumping for the rest of
/// the test binary
pub(crate) fn start_main_thread() {
    MAIN_THREAD.get_or_init(|| {
        let (ready_tx, ready_rx) = bounded(1);
        thread::Builder::new()
            .name("test-main".to_string())
            .spawn(move || {
                crate::designate_main_thread().unwrap();
                ready_tx.send(()).unwrap();
                crate::run_main_loop().unwrap();
            })
            .unwrap();
        ready_rx.recv_timeout(TIMEOUT).unwrap();
    });
}
