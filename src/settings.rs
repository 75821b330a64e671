use crate::builder::DatasetBuilder;
use crate::errors::{AppError, AppResult};
use crate::models::{MetricRecord, Persona};
use crate::parser::DEFAULT_PARSE_FALLBACK;
use crate::series::{LabelStyle, SeriesConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

const MAX_DECIMALS: u32 = 6;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreSettings {
    pub refresh_interval_secs: u64,
    pub series_length: usize,
    pub label_style: LabelStyle,
    pub percentage_decimals: u32,
    pub value_decimals: u32,
    pub parse_fallback: f64,
    pub seed: Option<u64>,
    pub custom_metrics: BTreeMap<Persona, Vec<MetricRecord>>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 5 * 60,
            series_length: 7,
            label_style: LabelStyle::Days,
            percentage_decimals: 0,
            value_decimals: 1,
            parse_fallback: DEFAULT_PARSE_FALLBACK,
            seed: None,
            custom_metrics: BTreeMap::new(),
        }
    }
}

impl StoreSettings {
    /// Reads YAML or JSON settings. A missing path yields the defaults.
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            return Err(AppError::NotFound(format!(
                "Settings file not found: {}",
                path.to_string_lossy()
            )));
        }
        let raw = std::fs::read_to_string(path)?;
        let settings = if raw.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str::<Self>(&raw)?
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.refresh_interval_secs == 0 {
            return Err(AppError::Config("refreshIntervalSecs must be greater than zero".to_string()));
        }
        if self.series_length == 0 {
            return Err(AppError::Config("seriesLength must be greater than zero".to_string()));
        }
        if self.percentage_decimals > MAX_DECIMALS || self.value_decimals > MAX_DECIMALS {
            return Err(AppError::Config(format!("decimals must not exceed {}", MAX_DECIMALS)));
        }
        if !self.parse_fallback.is_finite() {
            return Err(AppError::Config("parseFallback must be a finite number".to_string()));
        }
        Ok(())
    }

    pub fn refresh_period(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn series_config(&self) -> SeriesConfig {
        SeriesConfig {
            length: self.series_length,
            label_style: self.label_style,
            percentage_decimals: self.percentage_decimals,
            value_decimals: self.value_decimals,
        }
    }

    pub fn dataset_builder(&self) -> DatasetBuilder {
        DatasetBuilder::new(self.series_config(), self.parse_fallback).with_custom_metrics(self.custom_metrics.clone())
    }

    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}
