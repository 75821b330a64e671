use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior};

type Tick = Box<dyn Fn() -> bool + Send + 'static>;

/// Repeating timer running on the ambient tokio runtime. The first tick fires
/// one full period after start. The task stops when `tick` returns `false` or
/// the timer is cancelled or dropped.
#[derive(Debug)]
pub struct RefreshTimer {
    handle: JoinHandle<()>,
}

impl RefreshTimer {
    /// Returns `None` when called outside a tokio runtime.
    pub fn start<F>(period: Duration, tick: F) -> Option<Self>
    where
        F: Fn() -> bool + Send + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current().ok()?;
        let tick: Tick = Box::new(tick);
        let handle = runtime.spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if !tick() {
                    tracing::debug!("refresh timer target gone; stopping");
                    break;
                }
            }
        });
        Some(Self { handle })
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn cancel(self) {
        self.handle.abort();
    }
}

impl Drop for RefreshTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
