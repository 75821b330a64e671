pub mod builder;
pub mod catalogue;
pub mod clock;
pub mod drilldown;
pub mod errors;
pub mod insights;
pub mod models;
pub mod parser;
pub mod scheduler;
pub mod series;
pub mod session;
pub mod settings;
pub mod store;

pub use crate::builder::DatasetBuilder;
pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::errors::{AppError, AppResult};
pub use crate::models::{ChartSeries, Dataset, Metric, OperationalTab, Persona, WeekOverWeekMetric};
pub use crate::parser::{parse_value, ParsedValue};
pub use crate::series::{generate_series, SeriesConfig};
pub use crate::session::{format_last_refresh, DashboardSession};
pub use crate::settings::StoreSettings;
pub use crate::store::{RefreshStore, Subscription};

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

/// JSON logs to a daily rolling file under `log_dir`. `RUST_LOG` overrides the
/// default `info` filter.
pub fn init_tracing(log_dir: &Path) -> Result<(), String> {
    std::fs::create_dir_all(log_dir).map_err(|error| error.to_string())?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "kpi-summary.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| error.to_string())
}
