use crate::errors::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Persona {
    Cxo,
    Company,
    Branch,
}

impl Persona {
    pub const ALL: [Persona; 3] = [Persona::Cxo, Persona::Company, Persona::Branch];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cxo => "cxo",
            Self::Company => "company",
            Self::Branch => "branch",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationalTab {
    Planning,
    Indent,
    Ftl,
    Ptl,
    FreightInvoicing,
}

impl OperationalTab {
    pub const ALL: [OperationalTab; 5] = [
        OperationalTab::Planning,
        OperationalTab::Indent,
        OperationalTab::Ftl,
        OperationalTab::Ptl,
        OperationalTab::FreightInvoicing,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Indent => "indent",
            Self::Ftl => "ftl",
            Self::Ptl => "ptl",
            Self::FreightInvoicing => "freightInvoicing",
        }
    }
}

/// Unit family inferred from a formatted value string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Classification {
    Percentage,
    Time,
    Currency,
    Number,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrendBias {
    Up,
    Down,
    Unbiased,
}

impl TrendBias {
    /// Lower-is-better metrics improve by falling, everything else by rising.
    pub fn from_lower_is_better(lower_is_better: Option<bool>) -> Self {
        match lower_is_better {
            Some(true) => Self::Down,
            _ => Self::Up,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TileSize {
    #[default]
    #[serde(rename = "1x1")]
    Standard,
    #[serde(rename = "1x2")]
    Tall,
    #[serde(rename = "2x1")]
    Wide,
    #[serde(rename = "2x2")]
    Large,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Trend {
    Up,
    Down,
    Steady,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MetricStatus {
    Good,
    Warning,
    Bad,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub points: Vec<f64>,
}

impl ChartSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Smallest and largest point, `None` for an empty series.
    pub fn range(&self) -> Option<(f64, f64)> {
        let mut iter = self.points.iter().copied();
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), point| (lo.min(point), hi.max(point))))
    }
}

// ─── Dataset ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    pub id: String,
    pub name: String,
    pub value: String,
    pub target: Option<String>,
    pub lower_is_better: Option<bool>,
    pub tile_size: TileSize,
    pub trend: Trend,
    pub status: MetricStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_week_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week_over_week_change: Option<f64>,
    pub series: ChartSeries,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekOverWeekMetric {
    pub id: String,
    pub name: String,
    pub current_value: String,
    pub last_week_value: String,
    pub target: Option<String>,
    pub lower_is_better: Option<bool>,
    pub week_over_week_change: Option<f64>,
    pub trend: Trend,
    pub status: MetricStatus,
    pub series: ChartSeries,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub generation_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub personas: BTreeMap<Persona, Vec<Metric>>,
    pub important_kpis: Vec<Metric>,
    pub operational_metrics: BTreeMap<OperationalTab, Vec<WeekOverWeekMetric>>,
}

impl Dataset {
    pub fn metrics(&self, persona: Persona) -> &[Metric] {
        self.personas.get(&persona).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn find_metric(&self, persona: Persona, metric_id: &str) -> AppResult<&Metric> {
        self.metrics(persona)
            .iter()
            .find(|metric| metric.id == metric_id)
            .ok_or_else(|| {
                AppError::NotFound(format!("Metric {} not found for persona {}", metric_id, persona.as_str()))
            })
    }

    pub fn tab(&self, tab: OperationalTab) -> &[WeekOverWeekMetric] {
        self.operational_metrics.get(&tab).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every series in the dataset, persona metrics first, then the
    /// important strip, then the operational tabs.
    pub fn series(&self) -> impl Iterator<Item = &ChartSeries> {
        self.personas
            .values()
            .flatten()
            .chain(self.important_kpis.iter())
            .map(|metric| &metric.series)
            .chain(self.operational_metrics.values().flatten().map(|metric| &metric.series))
    }

    pub fn metric_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for persona in Persona::ALL {
            counts.insert(persona.as_str(), self.metrics(persona).len());
        }
        counts.insert("importantKpis", self.important_kpis.len());
        counts.insert(
            "operationalMetrics",
            self.operational_metrics.values().map(Vec::len).sum(),
        );
        counts
    }
}

// ─── Ingestion ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Text(String),
    Number(f64),
}

impl RawValue {
    fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Number(number) => number.to_string(),
        }
    }
}

/// Metric as authored outside the crate. Either `value` or `currentValue`
/// names the current reading.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricRecord {
    pub id: String,
    pub name: String,
    pub value: Option<RawValue>,
    pub current_value: Option<RawValue>,
    pub last_week_value: Option<RawValue>,
    pub target: Option<RawValue>,
    pub lower_is_better: Option<bool>,
    pub tile_size: Option<TileSize>,
}

impl MetricRecord {
    pub fn normalize(self) -> AppResult<MetricInput> {
        let value = self
            .value
            .or(self.current_value)
            .map(RawValue::into_text)
            .ok_or_else(|| AppError::Parse(format!("Metric {} has neither value nor currentValue", self.id)))?;

        Ok(MetricInput {
            id: self.id,
            name: self.name,
            value,
            last_week_value: self.last_week_value.map(RawValue::into_text),
            target: self.target.map(RawValue::into_text),
            lower_is_better: self.lower_is_better,
            tile_size: self.tile_size.unwrap_or_default(),
        })
    }
}

/// Normalized metric before a series is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricInput {
    pub id: String,
    pub name: String,
    pub value: String,
    pub last_week_value: Option<String>,
    pub target: Option<String>,
    pub lower_is_better: Option<bool>,
    pub tile_size: TileSize,
}
