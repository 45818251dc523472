//! dispatchq demo
//!
//! Makes the process main thread the owner of `Queue::main`, fans work out
//! to a private serial queue and the global pool, and stops the main loop
//! from a delayed task. Set `RUST_LOG=debug` to watch contexts start, and
//! `DISPATCHQ_CONFIG` to point at a config file.

use std::process::ExitCode;
use std::thread;

use tracing_subscriber::EnvFilter;

use dispatchq::{CoreConfig, Queue, QueueResult};

fn main() -> ExitCode {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();

    match run() {
        Ok(processed) => {
            tracing::info!("Main loop finished after {} tasks", processed);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Demo failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> QueueResult<usize> {
    dispatchq::init(CoreConfig::from_env()?)?;
    dispatchq::designate_main_thread()?;

    let log = Queue::serial("demo.log")?;
    for step in 1..=3 {
        log.spawn(move || tracing::info!("Serial step {} on {:?}", step, thread::current().name()));
    }

    let sum: u64 = Queue::global().sync(|| (1..=1_000u64).sum());
    tracing::info!("Global pool computed {}", sum);

    Queue::global().spawn(|| {
        let squares: u64 = (1..=10u64).map(|n| n * n).sum();
        Queue::main().spawn(move || tracing::info!("Back on main with {}", squares));
    });

    dispatchq::after(0.25, || tracing::info!("Delayed task on main"));
    dispatchq::after(0.5, dispatchq::stop_main_loop);

    dispatchq::run_main_loop()
}
