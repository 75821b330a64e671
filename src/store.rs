use crate::builder::DatasetBuilder;
use crate::clock::{Clock, SystemClock};
use crate::errors::AppResult;
use crate::models::Dataset;
use crate::scheduler::RefreshTimer;
use crate::settings::StoreSettings;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::rngs::StdRng;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use std::time::Duration;
use uuid::Uuid;

type Listener = Arc<dyn Fn(&Arc<Dataset>, DateTime<Utc>) + Send + Sync>;
type SubscriberList = Arc<Mutex<Vec<(Uuid, Listener)>>>;

#[derive(Default)]
struct StoreState {
    dataset: Option<Arc<Dataset>>,
    last_refresh: Option<DateTime<Utc>>,
    initialized: bool,
    // Bumped on every swap.
    sequence: u64,
}

#[derive(Default)]
struct FanOut {
    delivering: bool,
    delivered: u64,
}

#[derive(Default)]
struct TimerSlot {
    timer: Option<RefreshTimer>,
    stopped: bool,
}

struct StoreInner {
    builder: DatasetBuilder,
    clock: Arc<dyn Clock>,
    refresh_period: Duration,
    // Held for the whole build-and-swap so cycles never interleave.
    generator: Mutex<StdRng>,
    state: RwLock<StoreState>,
    subscribers: SubscriberList,
    fanout: Mutex<FanOut>,
    timer: Mutex<TimerSlot>,
}

/// In-memory holder of the current dataset.
///
/// Cloning is cheap and every clone drives the same store. Readers get
/// `Arc<Dataset>` snapshots; a refresh swaps in a fully built dataset, so the
/// previous snapshot stays valid for anyone still holding it.
#[derive(Clone)]
pub struct RefreshStore {
    inner: Arc<StoreInner>,
}

impl RefreshStore {
    pub fn new(builder: DatasetBuilder, refresh_period: Duration, rng: StdRng, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                builder,
                clock,
                refresh_period,
                generator: Mutex::new(rng),
                state: RwLock::new(StoreState::default()),
                subscribers: Arc::new(Mutex::new(Vec::new())),
                fanout: Mutex::new(FanOut::default()),
                timer: Mutex::new(TimerSlot::default()),
            }),
        }
    }

    pub fn from_settings(settings: &StoreSettings) -> AppResult<Self> {
        Self::from_settings_with_clock(settings, Arc::new(SystemClock))
    }

    pub fn from_settings_with_clock(settings: &StoreSettings, clock: Arc<dyn Clock>) -> AppResult<Self> {
        settings.validate()?;
        Ok(Self::new(
            settings.dataset_builder(),
            settings.refresh_period(),
            settings.rng(),
            clock,
        ))
    }

    pub fn refresh_period(&self) -> Duration {
        self.inner.refresh_period
    }

    pub fn is_initialized(&self) -> bool {
        read(&self.inner.state).initialized
    }

    /// Builds the first dataset and starts the refresh timer. Later calls
    /// return the current dataset without side effects.
    pub fn initialize(&self) -> Arc<Dataset> {
        let dataset = {
            let mut rng = lock(&self.inner.generator);
            if let Some(dataset) = self.current_if_initialized() {
                return dataset;
            }
            self.regenerate(&mut rng)
        };

        self.start_timer();
        tracing::info!(
            generation_id = %dataset.generation_id,
            refresh_secs = self.inner.refresh_period.as_secs(),
            "refresh store initialized"
        );
        dataset
    }

    /// Current dataset, initializing the store first if needed.
    pub fn get_data(&self) -> Arc<Dataset> {
        match self.current_if_initialized() {
            Some(dataset) => dataset,
            None => self.initialize(),
        }
    }

    pub fn last_refresh_time(&self) -> Option<DateTime<Utc>> {
        read(&self.inner.state).last_refresh
    }

    /// Regenerates the dataset and notifies every subscriber in registration
    /// order. On a store that was never initialized this initializes it.
    ///
    /// When another thread is already notifying, that thread delivers this
    /// dataset after its current round and this call returns without waiting.
    pub fn refresh_data(&self) -> Arc<Dataset> {
        let dataset = if self.is_initialized() {
            let dataset = {
                let mut rng = lock(&self.inner.generator);
                self.regenerate(&mut rng)
            };
            tracing::debug!(
                generation_id = %dataset.generation_id,
                generated_at = %dataset.generated_at,
                "dataset refreshed"
            );
            dataset
        } else {
            self.initialize()
        };
        self.publish();
        dataset
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Arc<Dataset>, DateTime<Utc>) + Send + Sync + 'static,
    {
        let id = Uuid::new_v4();
        lock(&self.inner.subscribers).push((id, Arc::new(listener)));
        Subscription {
            id,
            subscribers: Arc::downgrade(&self.inner.subscribers),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner.subscribers).len()
    }

    pub fn timer_active(&self) -> bool {
        lock(&self.inner.timer)
            .timer
            .as_ref()
            .is_some_and(|timer| !timer.is_finished())
    }

    /// Stops the refresh timer and drops every subscriber. Safe to repeat.
    /// The last dataset stays readable and manual refreshes keep working, but
    /// the timer never starts again.
    pub fn cleanup(&self) {
        let timer = {
            let mut slot = lock(&self.inner.timer);
            slot.stopped = true;
            slot.timer.take()
        };
        let had_timer = timer.is_some();
        if let Some(timer) = timer {
            timer.cancel();
        }
        let dropped = {
            let mut subscribers = lock(&self.inner.subscribers);
            let count = subscribers.len();
            subscribers.clear();
            count
        };
        if had_timer || dropped > 0 {
            tracing::info!(subscribers = dropped, "refresh store cleaned up");
        }
    }

    fn current_if_initialized(&self) -> Option<Arc<Dataset>> {
        let state = read(&self.inner.state);
        if state.initialized {
            state.dataset.clone()
        } else {
            None
        }
    }

    fn regenerate(&self, rng: &mut StdRng) -> Arc<Dataset> {
        let stamp = self.next_stamp();
        let dataset = Arc::new(self.inner.builder.build(rng, stamp));
        let mut state = write(&self.inner.state);
        state.dataset = Some(dataset.clone());
        state.last_refresh = Some(stamp);
        state.initialized = true;
        state.sequence += 1;
        dataset
    }

    /// Clock reading, bumped past the previous refresh when the clock has not
    /// moved.
    fn next_stamp(&self) -> DateTime<Utc> {
        let now = self.inner.clock.now();
        match read(&self.inner.state).last_refresh {
            Some(last) if now <= last => last + ChronoDuration::milliseconds(1),
            _ => now,
        }
    }

    fn start_timer(&self) {
        let mut slot = lock(&self.inner.timer);
        if slot.stopped {
            tracing::debug!("store already cleaned up; refresh timer not started");
            return;
        }
        let weak: Weak<StoreInner> = Arc::downgrade(&self.inner);
        let started = RefreshTimer::start(self.inner.refresh_period, move || match weak.upgrade() {
            Some(inner) => {
                RefreshStore { inner }.refresh_data();
                true
            }
            None => false,
        });
        match started {
            Some(timer) => {
                slot.timer = Some(timer);
            }
            None => {
                tracing::warn!("no async runtime available; automatic refresh disabled");
            }
        }
    }

    /// Hands the newest undelivered dataset to the subscribers. One thread
    /// fans out at a time and keeps going until nothing newer is pending, so
    /// listeners see generations in order even when refreshes race or a
    /// listener refreshes the store itself.
    fn publish(&self) {
        let mut fanout = lock(&self.inner.fanout);
        if fanout.delivering {
            return;
        }
        fanout.delivering = true;
        loop {
            let pending = {
                let state = read(&self.inner.state);
                match &state.dataset {
                    Some(dataset) if state.sequence > fanout.delivered => Some((state.sequence, dataset.clone())),
                    _ => None,
                }
            };
            let Some((sequence, dataset)) = pending else {
                fanout.delivering = false;
                return;
            };
            fanout.delivered = sequence;
            drop(fanout);
            self.notify(&dataset, dataset.generated_at);
            fanout = lock(&self.inner.fanout);
        }
    }

    fn notify(&self, dataset: &Arc<Dataset>, stamp: DateTime<Utc>) {
        // Snapshot so listeners may subscribe or unsubscribe while being called.
        let listeners: Vec<(Uuid, Listener)> = lock(&self.inner.subscribers).clone();
        for (id, listener) in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(dataset, stamp))).is_err() {
                tracing::error!(subscription_id = %id, "subscriber panicked during refresh");
            }
        }
    }
}

/// Handle returned by [`RefreshStore::subscribe`].
pub struct Subscription {
    id: Uuid,
    subscribers: Weak<Mutex<Vec<(Uuid, Listener)>>>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Subscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Removes exactly this listener. Repeated calls, or calls after the
    /// store is gone, do nothing.
    pub fn unsubscribe(&self) {
        if let Some(subscribers) = self.subscribers.upgrade() {
            lock(&subscribers).retain(|(id, _)| *id != self.id);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(state: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    state.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(state: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    state.write().unwrap_or_else(PoisonError::into_inner)
}
