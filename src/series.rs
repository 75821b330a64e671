use crate::models::{ChartSeries, Classification, TrendBias};
use chrono::{DateTime, Datelike, Months, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

const PERCENT_BAND: f64 = 20.0;
const PERCENT_VARIANCE: f64 = 5.0;
const BAND_VARIANCE_RATIO: f64 = 0.1;
/// Share of the variance a biased step may still move against its direction.
const BIAS_COUNTER_SHARE: f64 = 0.4;
const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LabelStyle {
    #[default]
    Days,
    Months,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesConfig {
    pub length: usize,
    pub label_style: LabelStyle,
    pub percentage_decimals: u32,
    pub value_decimals: u32,
}

impl Default for SeriesConfig {
    fn default() -> Self {
        Self {
            length: 7,
            label_style: LabelStyle::Days,
            percentage_decimals: 0,
            value_decimals: 1,
        }
    }
}

impl SeriesConfig {
    fn decimals_for(&self, classification: Classification) -> u32 {
        match classification {
            Classification::Percentage => self.percentage_decimals,
            _ => self.value_decimals,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub min: f64,
    pub max: f64,
}

impl Band {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }
}

pub fn band_for(current: f64, classification: Classification) -> Band {
    let (min, max) = match classification {
        Classification::Percentage => (current - PERCENT_BAND, (current + PERCENT_BAND).min(100.0)),
        Classification::Time => (current * 0.8, current * 1.2),
        Classification::Currency => (current * 0.75, current * 1.25),
        Classification::Number => (current * 0.7, current * 1.3),
    };
    let min = min.max(0.0);
    if !(min.is_finite() && max.is_finite() && (max - min).is_finite()) {
        let anchor = if current.is_finite() { current.max(0.0) } else { 0.0 };
        tracing::warn!(current, min, max, "series band overflowed; collapsed to current value");
        return Band { min: anchor, max: anchor };
    }
    if min > max {
        tracing::warn!(current, min, max, "inverted series band collapsed");
        return Band { min: max.max(0.0), max: max.max(0.0) };
    }
    Band { min, max }
}

pub fn labels_for(length: usize, style: LabelStyle, anchor: DateTime<Utc>) -> Vec<String> {
    match style {
        LabelStyle::Days => (1..=length).map(|day| format!("Day {}", day)).collect(),
        LabelStyle::Months => (0..length)
            .rev()
            .map(|back| {
                let month = anchor
                    .checked_sub_months(Months::new(back as u32))
                    .map(|date| date.month0())
                    .unwrap_or_else(|| anchor.month0());
                MONTH_NAMES[month as usize].to_string()
            })
            .collect(),
    }
}

/// Generates a bounded random walk of `config.length` points ending at
/// `current`, oldest point first.
///
/// The walk runs backwards from the present, so an upward bias makes older
/// points lower and a downward bias makes them higher.
pub fn generate_series<R: Rng + ?Sized>(
    rng: &mut R,
    current: f64,
    classification: Classification,
    bias: TrendBias,
    config: &SeriesConfig,
    anchor: DateTime<Utc>,
) -> ChartSeries {
    let band = band_for(current, classification);
    let decimals = config.decimals_for(classification);
    let variance = match classification {
        Classification::Percentage => PERCENT_VARIANCE,
        _ => band.width() * BAND_VARIANCE_RATIO,
    };
    let (low, high) = match bias {
        TrendBias::Up => (-variance, variance * BIAS_COUNTER_SHARE),
        TrendBias::Down => (-variance * BIAS_COUNTER_SHARE, variance),
        TrendBias::Unbiased => (-variance, variance),
    };

    let mut points = Vec::with_capacity(config.length);
    let mut value = band.clamp(current);
    for step in 0..config.length {
        if step > 0 && high > low {
            value = band.clamp(value + rng.random_range(low..high));
        }
        points.push(round_within(value, band, decimals));
    }
    points.reverse();

    ChartSeries {
        labels: labels_for(config.length, config.label_style, anchor),
        points,
    }
}

pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Rounds to `decimals` without leaving the band. Falls back to the unrounded
/// value when the band is narrower than one rounding step.
fn round_within(value: f64, band: Band, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    let rounded = round_to(value, decimals);
    if band.contains(rounded) {
        return rounded;
    }
    let nudged = if rounded < band.min {
        (band.min * factor).ceil() / factor
    } else {
        (band.max * factor).floor() / factor
    };
    if band.contains(nudged) {
        nudged
    } else {
        band.clamp(value)
    }
}
