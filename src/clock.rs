//! Time sources and deferred execution.
//!
//! The registry never sleeps itself. It asks a [`Clock`] for the current
//! instant and hands delayed work to a [`Scheduler`]. The tokio-backed
//! implementations follow tokio's clock, so a paused test runtime controls
//! every timer the registry creates.

use std::time::Duration;

use tokio::runtime::Handle;
use tokio::time::Instant;

use crate::Result;

pub type Task = Box<dyn FnOnce() + Send + 'static>;

pub trait Clock: Send + Sync {
    /// Monotonic current instant.
    fn now(&self) -> Instant;
}

pub trait Scheduler: Send + Sync {
    /// Run `task` once after `delay` has elapsed. There is no cancellation;
    /// tasks must re-check whatever state they act upon.
    fn schedule(&self, delay: Duration, task: Task);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Clone, Debug)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Scheduler bound to the runtime of the calling context.
    pub fn current() -> Result<Self> {
        Ok(Self::new(Handle::try_current()?))
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: Task) {
        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn current_requires_runtime() {
        assert!(TokioScheduler::current().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn tasks_fire_in_timer_order() {
        let scheduler = TokioScheduler::current().unwrap();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        for (label, delay) in [("late", 600), ("early", 300)] {
            let order = order.clone();
            scheduler.schedule(
                Duration::from_millis(delay),
                Box::new(move || order.lock().unwrap().push(label)),
            );
        }

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(*order.lock().unwrap(), vec!["early"]);

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(*order.lock().unwrap(), vec!["early", "late"]);
    }

    #[tokio::test(start_paused = true)]
    async fn clock_follows_paused_time() {
        let clock = TokioClock;
        let before = clock.now();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        TokioScheduler::current().unwrap().schedule(
            Duration::from_millis(100),
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        tokio::time::sleep(Duration::from_millis(250)).await;

        assert_eq!(clock.now() - before, Duration::from_millis(250));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
