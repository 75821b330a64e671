use chrono::Utc;
use kpi_summary_lib::drilldown::{branch_breakdown, region_breakdown};
use kpi_summary_lib::models::{Classification, TrendBias};
use kpi_summary_lib::series::band_for;
use kpi_summary_lib::{generate_series, parse_value, DashboardSession, Persona, RefreshStore, SeriesConfig, StoreSettings};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn seeded_store(seed: u64) -> RefreshStore {
    RefreshStore::from_settings(&StoreSettings {
        seed: Some(seed),
        ..StoreSettings::default()
    })
    .expect("store")
}

#[test]
fn subscribe_refresh_unsubscribe_cycle() {
    let store = seeded_store(21);
    store.initialize();

    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    let subscription = store.subscribe(move |dataset, _| sink.lock().expect("sink").push(dataset.clone()));

    store.refresh_data();
    {
        let received = received.lock().expect("sink");
        assert_eq!(received.len(), 1);
        for persona in Persona::ALL {
            let metrics = received[0].metrics(persona);
            assert!(!metrics.is_empty());
            assert!(metrics.iter().all(|metric| metric.series.len() == 7));
        }
    }

    subscription.unsubscribe();
    store.refresh_data();
    assert_eq!(received.lock().expect("sink").len(), 1);
    store.cleanup();
}

#[test]
fn consecutive_refreshes_have_increasing_timestamps() {
    let store = seeded_store(22);
    let first = store.refresh_data().generated_at;
    let second = store.refresh_data().generated_at;
    assert!(second > first);
    assert_eq!(store.last_refresh_time(), Some(second));
}

#[test]
fn generated_points_stay_inside_their_bands() {
    let config = SeriesConfig::default();
    let mut rng = StdRng::seed_from_u64(23);
    let cases = [
        (95.0, Classification::Percentage),
        (12.0, Classification::Percentage),
        (3.8, Classification::Time),
        (45.2, Classification::Currency),
        (1250.0, Classification::Number),
    ];
    for (current, classification) in cases {
        let band = band_for(current, classification);
        for bias in [TrendBias::Up, TrendBias::Down, TrendBias::Unbiased] {
            for _ in 0..50 {
                let series = generate_series(&mut rng, current, classification, bias, &config, Utc::now());
                assert_eq!(series.len(), config.length);
                assert!(series.points.iter().all(|point| band.contains(*point)));
                if classification == Classification::Percentage {
                    assert!(series.points.iter().all(|point| (0.0..=100.0).contains(point)));
                }
            }
        }
    }
}

#[test]
fn reference_values_parse() {
    let parsed = parse_value("₹45.2/km").expect("currency");
    assert_eq!(parsed.numeric_value, 45.2);
    assert_eq!(parsed.classification, Classification::Currency);
    assert_eq!(parse_value("76% / 82%").expect("pair").numeric_value, 76.0);
    assert!(parse_value("N/A").is_err());
}

#[test]
fn settings_file_drives_the_store() {
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    writeln!(
        file,
        "seriesLength: 5\nlabelStyle: months\nseed: 24\ncustomMetrics:\n  cxo:\n    - id: carbonIntensity\n      name: Carbon Intensity\n      value: 41.5\n      target: 38\n      lowerIsBetter: true"
    )
    .expect("write");

    let settings = StoreSettings::load(Some(file.path())).expect("settings");
    let store = RefreshStore::from_settings(&settings).expect("store");
    let dataset = store.get_data();

    assert!(dataset.series().all(|series| series.len() == 5));
    let custom = dataset
        .find_metric(Persona::Cxo, "carbonIntensity")
        .expect("custom metric");
    assert_eq!(custom.value, "41.5");
    assert_eq!(custom.series.points.last().copied(), Some(41.5));
}

#[test]
fn session_and_drilldown_over_live_store() {
    let store = seeded_store(25);
    let session = DashboardSession::open(store.clone());
    let updates = Arc::new(AtomicUsize::new(0));
    let counter = updates.clone();
    let _sub = store.subscribe(move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    session.refresh();
    assert_eq!(updates.load(Ordering::SeqCst), 1);
    assert_eq!(session.last_refresh_label(Utc::now()), "Just now");

    let dataset = session.dataset();
    let metric = &dataset.metrics(Persona::Cxo)[0];
    let mut rng = StdRng::seed_from_u64(26);
    let regions = region_breakdown(metric, &mut rng);
    assert_eq!(regions.top_regions.len(), 5);
    let branches = branch_breakdown(metric, &regions.top_regions[0].name);
    assert!(branches.top_branches[0].name.starts_with(&regions.top_regions[0].name));

    session.close();
    assert_eq!(store.subscriber_count(), 0);
}
