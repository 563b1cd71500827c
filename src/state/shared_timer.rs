//! The state-owning timer shared by every view of one context

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::timer_state::{format_hms, hms_to_minutes, TimerState};
use crate::{
    clock::Clock,
    store::TimerStore,
    sync::{next_context_id, ContextId, Subscription, SyncChannel},
};

/// Callback invoked with the `HH:MM:SS` total whenever the timer is stopped
pub type StopHook = Box<dyn Fn(&str) + Send + Sync>;

/// Result of stopping the timer, ready to pre-fill a study log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopReport {
    pub total_seconds: u64,
    /// `HH:MM:SS`
    pub duration: String,
    /// Whole minutes, as the study log records them
    pub duration_min: u64,
}

impl StopReport {
    pub fn new(total_seconds: u64) -> Self {
        let duration = format_hms(total_seconds);
        let duration_min = hms_to_minutes(&duration);
        Self {
            total_seconds,
            duration,
            duration_min,
        }
    }
}

/// One context's view of the shared wall-clock timer
///
/// Transitions are applied under a lock, then saved, published to the other
/// contexts and announced to local watchers before the lock is released, so a
/// context never publishes its own states out of order.
pub struct SharedTimer {
    id: ContextId,
    clock: Arc<dyn Clock>,
    store: Arc<dyn TimerStore>,
    channel: Option<SyncChannel>,
    state: Mutex<TimerState>,
    state_tx: watch::Sender<TimerState>,
    subscription: Mutex<Option<Subscription>>,
    on_stop: Mutex<Option<StopHook>>,
}

impl SharedTimer {
    /// Create a context, hydrating from `store` when it holds a valid state
    pub fn new(
        clock: Arc<dyn Clock>,
        store: Arc<dyn TimerStore>,
        channel: Option<SyncChannel>,
    ) -> Self {
        let id = next_context_id();
        let initial = match store.load() {
            Some(state) => {
                info!("Context {} restored timer state: {:?}", id, state);
                state
            }
            None => {
                debug!("Context {} starting from a fresh timer", id);
                TimerState::new()
            }
        };
        if channel.is_none() {
            info!("Context {} has no sync channel, running single-context", id);
        }

        let (state_tx, _) = watch::channel(initial);
        Self {
            id,
            clock,
            store,
            channel,
            state: Mutex::new(initial),
            state_tx,
            subscription: Mutex::new(None),
            on_stop: Mutex::new(None),
        }
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn has_channel(&self) -> bool {
        self.channel.is_some()
    }

    fn lock_state(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Save, publish and notify while the caller still holds the state lock
    fn commit(&self, state: TimerState) {
        self.store.save(&state);
        if let Some(channel) = &self.channel {
            channel.publish(self.id, state);
        }
        self.state_tx.send_replace(state);
    }

    fn transition<F>(&self, action: &str, op: F) -> TimerState
    where
        F: FnOnce(&TimerState, i64) -> TimerState,
    {
        // Stamp under the lock so transitions commit in timestamp order
        let mut state = self.lock_state();
        let now = self.clock.now_ms();
        let next = op(&state, now);
        *state = next;
        self.commit(next);
        drop(state);

        debug!("Context {} {} at {}: {:?}", self.id, action, now, next);
        next
    }

    /// Start or pause
    pub fn toggle(&self) -> TimerState {
        let next = self.transition("toggle", |state, now| state.toggle(now));
        info!(
            "Timer {} in context {}",
            if next.running { "started" } else { "paused" },
            self.id
        );
        next
    }

    /// Zero the elapsed time, keeping the running flag
    pub fn reset(&self) -> TimerState {
        let next = self.transition("reset", |state, now| state.reset(now));
        info!("Timer reset in context {}", self.id);
        next
    }

    /// Pause and report the total. Calling it again reports the same total.
    pub fn stop(&self) -> StopReport {
        let mut total_seconds = 0;
        self.transition("stop", |state, now| {
            let (next, total) = state.stop(now);
            total_seconds = total;
            next
        });

        let report = StopReport::new(total_seconds);
        info!("Timer stopped in context {} at {}", self.id, report.duration);

        let hook = self.on_stop.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(hook) = hook.as_ref() {
            hook(&report.duration);
        }
        report
    }

    /// Save and re-publish the current state right away
    pub fn sync_now(&self) -> TimerState {
        let state = self.lock_state();
        let current = *state;
        self.commit(current);
        drop(state);

        debug!("Context {} re-synced: {:?}", self.id, current);
        current
    }

    /// Save the current state without publishing it
    pub fn persist(&self) {
        let state = self.lock_state();
        self.store.save(&state);
        debug!("Context {} persisted: {:?}", self.id, *state);
    }

    /// Replace the local state with one published by another context
    pub fn apply_remote(&self, incoming: TimerState) {
        if !incoming.is_consistent() {
            warn!("Context {} ignoring inconsistent remote state: {:?}", self.id, incoming);
            return;
        }

        let mut state = self.lock_state();
        if *state != incoming {
            debug!("Context {} adopting remote state: {:?}", self.id, incoming);
        }
        *state = incoming;
        self.state_tx.send_replace(incoming);
    }

    /// Listen for other contexts' states. Re-connecting replaces the previous
    /// listener; returns whether a listener is now active.
    pub fn connect(self: &Arc<Self>) -> bool {
        let Some(channel) = &self.channel else {
            return false;
        };

        let mut subscription = self.subscription.lock().unwrap_or_else(PoisonError::into_inner);
        subscription.take();

        let timer = Arc::downgrade(self);
        *subscription = channel.subscribe(self.id, move |state| {
            if let Some(timer) = timer.upgrade() {
                timer.apply_remote(state);
            }
        });

        let connected = subscription.is_some();
        if connected {
            info!("Context {} connected to '{}'", self.id, channel.name());
        }
        connected
    }

    /// Stop listening for other contexts
    pub fn disconnect(&self) {
        let mut subscription = self.subscription.lock().unwrap_or_else(PoisonError::into_inner);
        if subscription.take().is_some() {
            info!("Context {} disconnected", self.id);
        }
    }

    pub fn is_connected(&self) -> bool {
        self.subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(Subscription::is_active)
    }

    /// Register the callback run on every [`stop`](Self::stop)
    pub fn on_stop(&self, hook: StopHook) {
        *self.on_stop.lock().unwrap_or_else(PoisonError::into_inner) = Some(hook);
    }

    pub fn snapshot(&self) -> TimerState {
        *self.lock_state()
    }

    pub fn running(&self) -> bool {
        self.lock_state().running
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.snapshot().elapsed(self.clock.now_ms())
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_ms() / 1000
    }

    /// Elapsed time as `HH:MM:SS`
    pub fn formatted(&self) -> String {
        format_hms(self.elapsed_seconds())
    }

    /// Observe every state this context adopts
    pub fn watch(&self) -> watch::Receiver<TimerState> {
        self.state_tx.subscribe()
    }
}

impl std::fmt::Debug for SharedTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedTimer")
            .field("id", &self.id)
            .field("state", &self.snapshot())
            .field("channel", &self.channel.as_ref().map(SyncChannel::name))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        clock::ManualClock,
        store::MemoryStore,
        sync::SyncHub,
    };

    fn standalone(clock: &ManualClock, store: &MemoryStore) -> SharedTimer {
        SharedTimer::new(Arc::new(clock.clone()), Arc::new(store.clone()), None)
    }

    #[test]
    fn scenario_reports_seven_seconds() {
        let clock = ManualClock::new(0);
        let timer = standalone(&clock, &MemoryStore::new());

        timer.toggle();
        clock.set(5_000);
        let paused = timer.toggle();
        assert_eq!(paused.base_elapsed_ms, 5_000);
        assert!(!paused.running);

        clock.set(9_000);
        assert_eq!(timer.toggle().start_ms, Some(9_000));

        clock.set(11_000);
        let report = timer.stop();
        assert_eq!(report.total_seconds, 7);
        assert_eq!(report.duration, "00:00:07");
        assert_eq!(report.duration_min, 0);
        assert!(!timer.running());
    }

    #[test]
    fn every_transition_is_saved() {
        let clock = ManualClock::new(100);
        let store = MemoryStore::new();
        let timer = standalone(&clock, &store);

        let started = timer.toggle();
        assert_eq!(store.load(), Some(started));

        clock.advance(2_000);
        let reset = timer.reset();
        assert_eq!(store.load(), Some(reset));

        timer.stop();
        assert_eq!(store.load(), Some(timer.snapshot()));
    }

    #[test]
    fn reload_resumes_from_stored_anchor() {
        let clock = ManualClock::new(1_000);
        let store = MemoryStore::new();
        standalone(&clock, &store).toggle();

        clock.advance(90_000);
        let reloaded = standalone(&clock, &store);
        assert!(reloaded.running());
        assert_eq!(reloaded.elapsed_seconds(), 90);
        assert_eq!(reloaded.formatted(), "00:01:30");
    }

    #[test]
    fn stop_twice_reports_same_total_and_calls_hook() {
        let clock = ManualClock::new(0);
        let timer = standalone(&clock, &MemoryStore::new());

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        timer.on_stop(Box::new(move |hms: &str| sink.lock().unwrap().push(hms.to_string())));

        timer.toggle();
        clock.set(3_725_000);
        let first = timer.stop();
        clock.set(9_999_000);
        let second = timer.stop();

        assert_eq!(first, second);
        assert_eq!(first.duration, "01:02:05");
        assert_eq!(first.duration_min, 62);
        assert_eq!(*seen.lock().unwrap(), vec!["01:02:05", "01:02:05"]);
    }

    #[test]
    fn reset_while_running_restarts_from_zero() {
        let clock = ManualClock::new(0);
        let timer = standalone(&clock, &MemoryStore::new());

        timer.toggle();
        clock.set(42_000);
        timer.reset();
        assert!(timer.running());
        assert_eq!(timer.elapsed_ms(), 0);

        clock.advance(2_999);
        assert_eq!(timer.stop().total_seconds, 2);
    }

    #[test]
    fn backward_clock_shows_zero() {
        let clock = ManualClock::new(50_000);
        let timer = standalone(&clock, &MemoryStore::new());
        timer.toggle();
        clock.set(10_000);
        assert_eq!(timer.elapsed_ms(), 0);
        assert_eq!(timer.formatted(), "00:00:00");
    }

    /// Counts reads taken while the timer's state lock is free
    #[derive(Default)]
    struct LockAwareClock {
        timer: std::sync::OnceLock<std::sync::Weak<SharedTimer>>,
        now: std::sync::atomic::AtomicI64,
        unlocked_reads: std::sync::atomic::AtomicUsize,
    }

    impl Clock for LockAwareClock {
        fn now_ms(&self) -> i64 {
            use std::sync::atomic::Ordering;
            if let Some(timer) = self.timer.get().and_then(std::sync::Weak::upgrade) {
                if timer.state.try_lock().is_ok() {
                    self.unlocked_reads.fetch_add(1, Ordering::SeqCst);
                }
            }
            self.now.fetch_add(1_000, Ordering::SeqCst)
        }
    }

    #[test]
    fn transitions_read_the_clock_under_the_state_lock() {
        use std::sync::atomic::Ordering;

        let clock = Arc::new(LockAwareClock::default());
        let timer = Arc::new(SharedTimer::new(
            Arc::clone(&clock) as Arc<dyn Clock>,
            Arc::new(MemoryStore::new()),
            None,
        ));
        clock.timer.set(Arc::downgrade(&timer)).unwrap();

        timer.toggle();
        timer.reset();
        timer.toggle();
        timer.stop();
        assert_eq!(clock.unlocked_reads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn inconsistent_remote_state_is_ignored() {
        let clock = ManualClock::new(0);
        let timer = standalone(&clock, &MemoryStore::new());
        timer.apply_remote(TimerState {
            base_elapsed_ms: 10,
            start_ms: None,
            running: true,
        });
        assert_eq!(timer.snapshot(), TimerState::new());
    }

    #[test]
    fn without_channel_timer_still_works() {
        let clock = ManualClock::new(0);
        let timer = Arc::new(standalone(&clock, &MemoryStore::new()));
        assert!(!timer.has_channel());
        assert!(!timer.connect());
        assert!(!timer.is_connected());

        timer.toggle();
        clock.set(1_500);
        assert_eq!(timer.sync_now(), timer.snapshot());
        assert_eq!(timer.elapsed_seconds(), 1);
    }

    #[tokio::test]
    async fn contexts_converge_after_publish() {
        let clock = ManualClock::new(0);
        let store = MemoryStore::new();
        let hub = SyncHub::default();
        let open = || {
            let timer = Arc::new(SharedTimer::new(
                Arc::new(clock.clone()),
                Arc::new(store.clone()),
                hub.channel("study-timer"),
            ));
            assert!(timer.connect());
            timer
        };
        let a = open();
        let b = open();
        assert_ne!(a.id(), b.id());

        let mut b_rx = b.watch();
        a.toggle();
        tokio::time::timeout(Duration::from_secs(1), b_rx.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(a.snapshot(), b.snapshot());

        clock.set(4_000);
        let mut a_rx = a.watch();
        b.toggle();
        tokio::time::timeout(Duration::from_secs(1), a_rx.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(a.snapshot(), b.snapshot());
        assert_eq!(a.snapshot().base_elapsed_ms, 4_000);
        assert_eq!(store.load(), Some(b.snapshot()));
    }

    #[tokio::test]
    async fn reconnecting_keeps_a_single_listener() {
        let hub = SyncHub::default();
        let channel = hub.channel("study-timer").unwrap();
        let timer = Arc::new(SharedTimer::new(
            Arc::new(ManualClock::new(0)),
            Arc::new(MemoryStore::new()),
            Some(channel.clone()),
        ));

        assert!(timer.connect());
        assert!(timer.connect());
        assert!(timer.is_connected());
        for _ in 0..100 {
            if channel.receiver_count() == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(channel.receiver_count(), 1);

        timer.disconnect();
        assert!(!timer.is_connected());
    }

    #[tokio::test]
    async fn disconnected_context_ignores_others() {
        let clock = ManualClock::new(0);
        let hub = SyncHub::default();
        let open = || {
            Arc::new(SharedTimer::new(
                Arc::new(clock.clone()),
                Arc::new(MemoryStore::new()),
                hub.channel("study-timer"),
            ))
        };
        let a = open();
        let b = open();
        b.connect();
        b.disconnect();

        a.toggle();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(a.running());
        assert!(!b.running());
    }
}
