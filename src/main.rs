use anyhow::Context;
use kpi_summary_lib::{init_tracing, RefreshStore, StoreSettings};
use std::path::PathBuf;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("KPI_SUMMARY_CONFIG").ok())
        .map(PathBuf::from);
    let log_dir = std::env::var("KPI_SUMMARY_LOG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("logs"));

    init_tracing(&log_dir).map_err(anyhow::Error::msg).context("failed to initialize logging")?;
    let settings = StoreSettings::load(settings_path.as_deref()).context("failed to load settings")?;
    let store = RefreshStore::from_settings(&settings)?;

    let _subscription = store.subscribe(|dataset, stamp| {
        let line = serde_json::json!({
            "generationId": dataset.generation_id,
            "refreshedAt": stamp,
            "metricCounts": dataset.metric_counts(),
        });
        println!("{}", line);
    });

    let dataset = store.initialize();
    println!("{}", serde_json::to_string_pretty(dataset.as_ref())?);

    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    store.cleanup();
    tracing::info!("shutdown complete");
    Ok(())
}
