use crate::models::{ChartSeries, MetricStatus, Trend};
use crate::parser::parse_value;

const STEADY_RATIO: f64 = 0.02;
const WARNING_RATIO: f64 = 0.10;

/// True when `value` is on the wrong side of `target` for the metric's
/// direction. Unparseable inputs are never flagged.
pub fn is_underperforming(value: &str, target: Option<&str>, lower_is_better: Option<bool>) -> bool {
    let Some(target) = target else {
        return false;
    };
    let (Ok(value), Ok(target)) = (parse_value(value), parse_value(target)) else {
        return false;
    };
    is_underperforming_numeric(value.numeric_value, target.numeric_value, lower_is_better)
}

pub fn status_for(value: &str, target: Option<&str>, lower_is_better: Option<bool>) -> MetricStatus {
    let Some(target_raw) = target else {
        return MetricStatus::Unknown;
    };
    let (Ok(value), Ok(target)) = (parse_value(value), parse_value(target_raw)) else {
        return MetricStatus::Unknown;
    };
    if !is_underperforming_numeric(value.numeric_value, target.numeric_value, lower_is_better) {
        return MetricStatus::Good;
    }
    let gap = (value.numeric_value - target.numeric_value).abs();
    if gap <= target.numeric_value.abs() * WARNING_RATIO {
        MetricStatus::Warning
    } else {
        MetricStatus::Bad
    }
}

fn is_underperforming_numeric(value: f64, target: f64, lower_is_better: Option<bool>) -> bool {
    if lower_is_better.unwrap_or(false) {
        value > target
    } else {
        value < target
    }
}

pub fn trend_of(series: &ChartSeries) -> Trend {
    let (Some(first), Some(last)) = (series.points.first(), series.points.last()) else {
        return Trend::Steady;
    };
    let delta = last - first;
    if delta.abs() <= first.abs() * STEADY_RATIO {
        Trend::Steady
    } else if delta > 0.0 {
        Trend::Up
    } else {
        Trend::Down
    }
}

/// Percent change from last week to now, `None` when last week was zero or
/// either reading is unparseable.
pub fn week_over_week_change(current: &str, last_week: &str) -> Option<f64> {
    let current = parse_value(current).ok()?.numeric_value;
    let last_week = parse_value(last_week).ok()?.numeric_value;
    if last_week == 0.0 {
        return None;
    }
    Some(crate::series::round_to((current - last_week) / last_week.abs() * 100.0, 1))
}
