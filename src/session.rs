use crate::models::Dataset;
use crate::store::{RefreshStore, Subscription};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Clone)]
struct SessionView {
    dataset: Arc<Dataset>,
    last_refresh: Option<DateTime<Utc>>,
}

/// Consumer-side view over a [`RefreshStore`]: the latest dataset, when it was
/// produced, and whether a manual refresh is in flight.
pub struct DashboardSession {
    store: RefreshStore,
    view: Arc<Mutex<SessionView>>,
    loading: Arc<AtomicBool>,
    subscription: Subscription,
}

impl DashboardSession {
    pub fn open(store: RefreshStore) -> Self {
        let view = Arc::new(Mutex::new(SessionView {
            dataset: store.get_data(),
            last_refresh: store.last_refresh_time(),
        }));
        let sink = view.clone();
        let subscription = store.subscribe(move |dataset, stamp| {
            let mut view = sink.lock().unwrap_or_else(PoisonError::into_inner);
            view.dataset = dataset.clone();
            view.last_refresh = Some(stamp);
        });
        tracing::debug!(subscription_id = %subscription.id(), "dashboard session opened");
        Self {
            store,
            view,
            loading: Arc::new(AtomicBool::new(false)),
            subscription,
        }
    }

    pub fn dataset(&self) -> Arc<Dataset> {
        self.snapshot().dataset
    }

    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.snapshot().last_refresh
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Manual refresh. `is_loading` reports true only while this runs.
    pub fn refresh(&self) -> Arc<Dataset> {
        let _loading = LoadingFlag::raise(&self.loading);
        self.store.refresh_data()
    }

    pub fn last_refresh_label(&self, now: DateTime<Utc>) -> String {
        format_last_refresh(self.last_refresh(), now)
    }

    /// Detaches from the store and shuts its timer down.
    pub fn close(self) {
        self.subscription.unsubscribe();
        self.store.cleanup();
        tracing::debug!(subscription_id = %self.subscription.id(), "dashboard session closed");
    }

    fn snapshot(&self) -> SessionView {
        self.view.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

struct LoadingFlag<'a>(&'a AtomicBool);

impl<'a> LoadingFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for LoadingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Human label for the time since the last refresh.
pub fn format_last_refresh(last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(last) = last else {
        return "Never".to_string();
    };
    let minutes = (now - last).num_minutes();
    if minutes < 1 {
        return "Just now".to_string();
    }
    if minutes < 60 {
        return if minutes == 1 {
            "1 minute ago".to_string()
        } else {
            format!("{} minutes ago", minutes)
        };
    }

    let hours = minutes / 60;
    let remainder = minutes % 60;
    let hour_part = if hours == 1 {
        "1 hour".to_string()
    } else {
        format!("{} hours", hours)
    };
    if remainder == 0 {
        format!("{} ago", hour_part)
    } else {
        format!("{} {} minutes ago", hour_part, remainder)
    }
}

#[cfg(test)]
mod tests {
    use super::{format_last_refresh, DashboardSession};
    use crate::settings::StoreSettings;
    use crate::store::RefreshStore;
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn store() -> RefreshStore {
        RefreshStore::from_settings(&StoreSettings {
            seed: Some(11),
            ..StoreSettings::default()
        })
        .expect("store")
    }

    #[test]
    fn labels_cover_every_bucket() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).single().expect("now");
        let ago = |minutes: i64| Some(now - Duration::minutes(minutes));

        assert_eq!(format_last_refresh(None, now), "Never");
        assert_eq!(format_last_refresh(Some(now - Duration::seconds(30)), now), "Just now");
        assert_eq!(format_last_refresh(ago(1), now), "1 minute ago");
        assert_eq!(format_last_refresh(ago(45), now), "45 minutes ago");
        assert_eq!(format_last_refresh(ago(60), now), "1 hour ago");
        assert_eq!(format_last_refresh(ago(75), now), "1 hour 15 minutes ago");
        assert_eq!(format_last_refresh(ago(180), now), "3 hours ago");
        assert_eq!(format_last_refresh(ago(185), now), "3 hours 5 minutes ago");
    }

    #[test]
    fn future_timestamp_reads_as_just_now() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).single().expect("now");
        assert_eq!(format_last_refresh(Some(now + Duration::minutes(3)), now), "Just now");
    }

    #[test]
    fn session_tracks_store_refreshes() {
        let store = store();
        let session = DashboardSession::open(store.clone());
        let opened = session.dataset();
        assert_eq!(session.last_refresh(), Some(opened.generated_at));

        let refreshed = store.refresh_data();
        assert_eq!(session.dataset().generation_id, refreshed.generation_id);
        assert_eq!(session.last_refresh(), Some(refreshed.generated_at));
        assert!(!session.is_loading());
    }

    #[test]
    fn loading_is_raised_only_during_manual_refresh() {
        let store = store();
        let session = DashboardSession::open(store.clone());
        let seen_loading = Arc::new(AtomicBool::new(false));
        let probe = seen_loading.clone();
        let loading = session.loading.clone();
        let _sub = store.subscribe(move |_, _| probe.store(loading.load(Ordering::SeqCst), Ordering::SeqCst));

        let dataset = session.refresh();
        assert!(seen_loading.load(Ordering::SeqCst));
        assert!(!session.is_loading());
        assert_eq!(session.dataset().generation_id, dataset.generation_id);
    }

    #[test]
    fn close_detaches_and_cleans_up() {
        let store = store();
        let session = DashboardSession::open(store.clone());
        assert_eq!(store.subscriber_count(), 1);
        session.close();
        assert_eq!(store.subscriber_count(), 0);
        assert!(store.get_data().series().all(|series| !series.is_empty()));
    }
}
