use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Countdown resolution used by the runner.
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

//
// ─── REGISTRY ──────────────────────────────────────────────────────────────────
//

/// Counts timers that have been started and not yet released.
#[derive(Debug, Clone, Default)]
pub struct TimerRegistry {
    pending: Arc<AtomicUsize>,
}

impl TimerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live timers.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

/// Registry slot shared by a guard and its task; released exactly once.
#[derive(Debug)]
struct Slot {
    registry: TimerRegistry,
    released: AtomicBool,
}

impl Slot {
    fn acquire(registry: &TimerRegistry) -> Arc<Self> {
        registry.pending.fetch_add(1, Ordering::SeqCst);
        Arc::new(Self {
            registry: registry.clone(),
            released: AtomicBool::new(false),
        })
    }

    fn release(&self) {
        if !self.released.swap(true, Ordering::SeqCst) {
            self.registry.pending.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

struct ReleaseOnExit(Arc<Slot>);

impl Drop for ReleaseOnExit {
    fn drop(&mut self) {
        self.0.release();
    }
}

//
// ─── TIMER ─────────────────────────────────────────────────────────────────────
//

/// Periodic callback on the tokio runtime.
#[derive(Debug, Clone)]
pub struct CountdownTimer {
    period: Duration,
    registry: TimerRegistry,
}

impl Default for CountdownTimer {
    fn default() -> Self {
        Self::new(DEFAULT_TICK)
    }
}

impl CountdownTimer {
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            registry: TimerRegistry::new(),
        }
    }

    #[must_use]
    pub fn with_registry(mut self, registry: TimerRegistry) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Spawns the countdown task. `on_tick` runs once per elapsed period
    /// until it returns `ControlFlow::Break` or the guard is released.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<F>(&self, mut on_tick: F) -> TimerGuard
    where
        F: FnMut() -> ControlFlow<()> + Send + 'static,
    {
        let slot = Slot::acquire(&self.registry);
        let token = CancellationToken::new();
        let period = self.period;

        let task_token = token.clone();
        let task_slot = ReleaseOnExit(Arc::clone(&slot));
        let handle = tokio::spawn(async move {
            let _slot = task_slot;
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
            loop {
                tokio::select! {
                    () = task_token.cancelled() => break,
                    _ = interval.tick() => {
                        if on_tick().is_break() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!("countdown task finished");
        });
        tracing::debug!(period_ms = period.as_millis(), "countdown started");

        TimerGuard {
            token,
            handle: Some(handle),
            slot,
        }
    }
}

/// Owns a running countdown. Releasing the guard, explicitly or by drop,
/// stops the task and frees its registry slot.
#[derive(Debug)]
pub struct TimerGuard {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
    slot: Arc<Slot>,
}

impl TimerGuard {
    /// Stops the countdown. Idempotent.
    pub fn cancel(&mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.slot.release();
    }

    /// `true` once cancelled or once the task has stopped on its own.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.slot.released.load(Ordering::SeqCst)
    }
}

impl Drop for TimerGuard {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn counting_timer(
        registry: &TimerRegistry,
        stop_after: usize,
    ) -> (TimerGuard, Arc<Mutex<usize>>) {
        let count = Arc::new(Mutex::new(0_usize));
        let seen = Arc::clone(&count);
        let guard = CountdownTimer::new(Duration::from_secs(1))
            .with_registry(registry.clone())
            .start(move || {
                let mut n = seen.lock().unwrap();
                *n += 1;
                if *n >= stop_after {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            });
        (guard, count)
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_period_until_break() {
        let registry = TimerRegistry::new();
        let (guard, count) = counting_timer(&registry, 3);
        assert_eq!(registry.pending(), 1);

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert_eq!(*count.lock().unwrap(), 2);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(*count.lock().unwrap(), 3);
        assert!(guard.is_released());
        assert_eq!(registry.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_ticks_and_releases_slot() {
        let registry = TimerRegistry::new();
        let (mut guard, count) = counting_timer(&registry, usize::MAX);

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        guard.cancel();
        assert_eq!(registry.pending(), 0);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(*count.lock().unwrap(), 1);

        guard.cancel();
        assert_eq!(registry.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_releases_slot() {
        let registry = TimerRegistry::new();
        {
            let (_guard, _count) = counting_timer(&registry, usize::MAX);
            let (_other, _) = counting_timer(&registry, usize::MAX);
            assert_eq!(registry.pending(), 2);
        }
        assert_eq!(registry.pending(), 0);
    }
}
