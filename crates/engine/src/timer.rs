//! Monotonic delay scheduler
//!
//! A single thread keeps pending jobs in a min-heap ordered by deadline and
//! sleeps on its inbox until the earliest one is due. A due job is submitted
//! to its target context, so it never starts before its deadline but may
//! start arbitrarily later under load.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};

use crate::context::{thread_name, ExecutionContext, Job};
use crate::error::SubstrateError;

/// A job waiting for its deadline
struct Delayed {
    deadline: Instant,
    /// Tie-breaker so equal deadlines fire in scheduling order
    seq: u64,
    target: Arc<dyn ExecutionContext>,
    job: Job,
}

impl PartialEq for Delayed {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Eq for Delayed {}

impl PartialOrd for Delayed {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Delayed {
    // Reversed so BinaryHeap pops the earliest deadline first
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Hands jobs to execution contexts once their deadline has passed
pub struct DelayScheduler {
    sender: Sender<Delayed>,
    next_seq: AtomicU64,
}

impl DelayScheduler {
    /// Start the scheduler thread
    pub fn spawn(name: &str) -> Result<Self, SubstrateError> {
        let (sender, receiver) = unbounded();
        thread::Builder::new()
            .name(thread_name(name))
            .spawn(move || timer_loop(receiver))
            .map_err(|source| SubstrateError::Spawn {
                label: name.to_owned(),
                source,
            })?;

        tracing::debug!("Delay scheduler '{}' started", name);
        Ok(Self {
            sender,
            next_seq: AtomicU64::new(0),
        })
    }

    /// Submit `job` to `target` no earlier than `deadline`
    pub fn schedule(&self, deadline: Instant, target: Arc<dyn ExecutionContext>, job: Job) {
        let seq = self.next_seq.fetch_add(1, AtomicOrdering::Relaxed);
        let delayed = Delayed {
            deadline,
            seq,
            target,
            job,
        };
        if let Err(e) = self.sender.send(delayed) {
            tracing::error!(
                "Delay scheduler is gone, dropping task for '{}'",
                e.0.target.label()
            );
        }
    }
}

fn timer_loop(receiver: Receiver<Delayed>) {
    let mut heap = BinaryHeap::new();

    loop {
        fire_due(&mut heap, Instant::now());

        let next = match heap.peek() {
            Some(earliest) => receiver.recv_deadline(earliest.deadline),
            None => receiver.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match next {
            Ok(delayed) => heap.push(delayed),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    // Inbox closed: whatever is left still honours its deadline
    while let Some(earliest) = heap.peek() {
        let now = Instant::now();
        if earliest.deadline > now {
            thread::sleep(earliest.deadline - now);
        }
        fire_due(&mut heap, Instant::now());
    }
    tracing::debug!("Delay scheduler stopped");
}

fn fire_due(heap: &mut BinaryHeap<Delayed>, now: Instant) {
    while heap.peek().is_some_and(|earliest| earliest.deadline <= now) {
        if let Some(delayed) = heap.pop() {
            delayed.target.submit(delayed.job);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crossbeam_channel::bounded;
    use parking_lot::Mutex;

    use crate::serial::SerialContext;

    #[test]
    fn test_job_not_fired_before_deadline() {
        let scheduler = DelayScheduler::spawn("test.timer.deadline").unwrap();
        let target: Arc<dyn ExecutionContext> =
            Arc::new(SerialContext::spawn("test.timer.deadline.target").unwrap());
        let (tx, rx) = bounded(1);

        let deadline = Instant::now() + Duration::from_millis(100);
        scheduler.schedule(deadline, target, Box::new(move || tx.send(Instant::now()).unwrap()));

        let fired = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(fired >= deadline);
    }

    #[test]
    fn test_earlier_deadline_fires_first() {
        let scheduler = DelayScheduler::spawn("test.timer.order").unwrap();
        let target: Arc<dyn ExecutionContext> =
            Arc::new(SerialContext::spawn("test.timer.order.target").unwrap());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (tx, rx) = bounded(1);

        let now = Instant::now();
        for (name, millis) in [("late", 150), ("early", 50), ("middle", 100)] {
            let seen = Arc::clone(&seen);
            scheduler.schedule(
                now + Duration::from_millis(millis),
                Arc::clone(&target),
                Box::new(move || seen.lock().push(name)),
            );
        }
        scheduler.schedule(
            now + Duration::from_millis(200),
            target,
            Box::new(move || tx.send(()).unwrap()),
        );

        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(*seen.lock(), vec!["early", "middle", "late"]);
    }

    #[test]
    fn test_equal_deadlines_keep_scheduling_order() {
        let scheduler = DelayScheduler::spawn("test.timer.ties").unwrap();
        let target: Arc<dyn ExecutionContext> =
            Arc::new(SerialContext::spawn("test.timer.ties.target").unwrap());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (tx, rx) = bounded(1);

        let deadline = Instant::now() + Duration::from_millis(20);
        for i in 0..20 {
            let seen = Arc::clone(&seen);
            scheduler.schedule(deadline, Arc::clone(&target), Box::new(move || seen.lock().push(i)));
        }
        scheduler.schedule(deadline, target, Box::new(move || tx.send(()).unwrap()));

        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(*seen.lock(), (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_pending_jobs_survive_scheduler_drop() {
        let scheduler = DelayScheduler::spawn("test.timer.drop").unwrap();
        let target: Arc<dyn ExecutionContext> =
            Arc::new(SerialContext::spawn("test.timer.drop.target").unwrap());
        let (tx, rx) = bounded(1);

        scheduler.schedule(
            Instant::now() + Duration::from_millis(50),
            target,
            Box::new(move || tx.send(()).unwrap()),
        );
        drop(scheduler);

        rx.recv_timeout(Duration::from_secs(5)).unwrap();
    }
}
