use crate::models::Metric;
use crate::parser::{parse_value_or_fallback, DEFAULT_PARSE_FALLBACK};
use crate::series::round_to;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const STANDARD_REGIONS: [&str; 13] = [
    "North",
    "South",
    "East",
    "West",
    "Central",
    "Northeast",
    "Northwest",
    "Southeast",
    "Southwest",
    "North Central",
    "South Central",
    "East Central",
    "West Central",
];

const LIST_SIZE: usize = 5;

// Used when a metric carries no series to take a range from.
const FIXED_TOP_REGIONS: [(&str, f64); LIST_SIZE] =
    [("North", 1.05), ("West", 1.02), ("South", 0.98), ("East", 0.95), ("Central", 0.92)];
const FIXED_BOTTOM_REGIONS: [(&str, f64); LIST_SIZE] = [
    ("Northeast", 0.85),
    ("Southwest", 0.82),
    ("Northwest", 0.78),
    ("Southeast", 0.75),
    ("North Central", 0.70),
];

const TOP_BRANCHES: [(&str, f64); LIST_SIZE] = [
    ("Delhi", 1.08),
    ("Mumbai", 1.05),
    ("Bangalore", 1.02),
    ("Chennai", 0.98),
    ("Hyderabad", 0.95),
];
const BOTTOM_BRANCHES: [(&str, f64); LIST_SIZE] = [
    ("Jaipur", 0.82),
    ("Lucknow", 0.78),
    ("Bhopal", 0.75),
    ("Patna", 0.72),
    ("Guwahati", 0.68),
];

const CURRENCY_GLYPHS: [char; 5] = ['₹', '$', '€', '£', '¥'];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionValue {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionBreakdown {
    pub top_regions: Vec<RegionValue>,
    pub bottom_regions: Vec<RegionValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchValue {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchBreakdown {
    pub region: String,
    pub top_branches: Vec<BranchValue>,
    pub bottom_branches: Vec<BranchValue>,
}

/// Spreads the metric across the standard regions. Each region lands in the
/// upper half of the metric's series range.
pub fn region_breakdown<R: Rng + ?Sized>(metric: &Metric, rng: &mut R) -> RegionBreakdown {
    let Some((min, max)) = metric.series.range() else {
        return fixed_region_breakdown(base_value(&metric.value));
    };

    let spread = max - min;
    let mut regions = STANDARD_REGIONS
        .iter()
        .map(|name| RegionValue {
            name: (*name).to_string(),
            value: round_to(min + spread * rng.random_range(0.5..1.0), 1),
        })
        .collect::<Vec<_>>();
    regions.sort_by(|a, b| b.value.total_cmp(&a.value));

    let top_regions = regions.iter().take(LIST_SIZE).cloned().collect();
    let bottom_regions = regions.iter().rev().take(LIST_SIZE).cloned().collect();
    RegionBreakdown {
        top_regions,
        bottom_regions,
    }
}

/// Fixed branch ladder for one region, scaled from the metric's headline value
/// and rendered in the same unit.
pub fn branch_breakdown(metric: &Metric, region: &str) -> BranchBreakdown {
    let base = base_value(&metric.value);
    let ladder = |branches: &[(&str, f64)]| {
        branches
            .iter()
            .map(|(city, factor)| BranchValue {
                name: format!("{} - {}", region, city),
                value: format_like(&metric.value, base * factor),
            })
            .collect::<Vec<_>>()
    };
    BranchBreakdown {
        region: region.to_string(),
        top_branches: ladder(&TOP_BRANCHES),
        bottom_branches: ladder(&BOTTOM_BRANCHES),
    }
}

fn fixed_region_breakdown(base: f64) -> RegionBreakdown {
    let scale = |regions: &[(&str, f64)]| {
        regions
            .iter()
            .map(|(name, factor)| RegionValue {
                name: (*name).to_string(),
                value: round_to(base * factor, 1),
            })
            .collect::<Vec<_>>()
    };
    RegionBreakdown {
        top_regions: scale(&FIXED_TOP_REGIONS),
        bottom_regions: scale(&FIXED_BOTTOM_REGIONS),
    }
}

fn base_value(raw: &str) -> f64 {
    let parsed = parse_value_or_fallback(raw, DEFAULT_PARSE_FALLBACK).numeric_value;
    if parsed == 0.0 {
        DEFAULT_PARSE_FALLBACK
    } else {
        parsed
    }
}

fn format_like(template: &str, value: f64) -> String {
    if template.contains('%') {
        return format!("{:.1}%", value);
    }
    match template.chars().next() {
        Some(glyph) if CURRENCY_GLYPHS.contains(&glyph) => format!("{}{:.0}", glyph, value),
        _ => format!("{:.1}", value),
    }
}

#[cfg(test)]
mod tests {
    use super::{branch_breakdown, region_breakdown, STANDARD_REGIONS};
    use crate::models::{ChartSeries, Metric, MetricStatus, TileSize, Trend};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn metric(value: &str, points: Vec<f64>) -> Metric {
        Metric {
            id: "onTimeDelivery".to_string(),
            name: "On-Time Delivery".to_string(),
            value: value.to_string(),
            target: Some("90%".to_string()),
            lower_is_better: Some(false),
            tile_size: TileSize::Standard,
            trend: Trend::Steady,
            status: MetricStatus::Unknown,
            last_week_value: None,
            week_over_week_change: None,
            series: ChartSeries {
                labels: (1..=points.len()).map(|day| format!("Day {}", day)).collect(),
                points,
            },
        }
    }

    #[test]
    fn regions_sit_in_upper_half_of_series_range() {
        let metric = metric("82%", vec![70.0, 74.0, 78.0, 80.0, 82.0]);
        let mut rng = StdRng::seed_from_u64(9);
        let breakdown = region_breakdown(&metric, &mut rng);

        assert_eq!(breakdown.top_regions.len(), 5);
        assert_eq!(breakdown.bottom_regions.len(), 5);
        for region in breakdown.top_regions.iter().chain(&breakdown.bottom_regions) {
            assert!(STANDARD_REGIONS.contains(&region.name.as_str()));
            assert!((76.0..=82.0).contains(&region.value), "{:?}", region);
        }
        assert!(breakdown.top_regions.windows(2).all(|pair| pair[0].value >= pair[1].value));
        assert!(breakdown.bottom_regions.windows(2).all(|pair| pair[0].value <= pair[1].value));
        assert!(breakdown.top_regions[4].value >= breakdown.bottom_regions[4].value);
    }

    #[test]
    fn empty_series_uses_fixed_ladder() {
        let metric = metric("200", Vec::new());
        let mut rng = StdRng::seed_from_u64(1);
        let breakdown = region_breakdown(&metric, &mut rng);
        assert_eq!(breakdown.top_regions[0].name, "North");
        assert_eq!(breakdown.top_regions[0].value, 210.0);
        assert_eq!(breakdown.bottom_regions[4].value, 140.0);
    }

    #[test]
    fn branches_follow_metric_units() {
        let percent = branch_breakdown(&metric("80%", vec![80.0]), "North");
        assert_eq!(percent.top_branches[0].name, "North - Delhi");
        assert_eq!(percent.top_branches[0].value, "86.4%");
        assert_eq!(percent.bottom_branches[4].name, "North - Guwahati");
        assert_eq!(percent.bottom_branches[4].value, "54.4%");

        let currency = branch_breakdown(&metric("₹200/km", vec![200.0]), "West");
        assert_eq!(currency.top_branches[0].value, "₹216");

        let plain = branch_breakdown(&metric("3.5 days", vec![3.5]), "East");
        assert_eq!(plain.top_branches[0].value, "3.8");
    }

    #[test]
    fn unparseable_or_zero_value_scales_from_hundred() {
        let missing = branch_breakdown(&metric("N/A", vec![1.0]), "South");
        assert_eq!(missing.top_branches[0].value, "108.0");
        let zero = branch_breakdown(&metric("0", vec![1.0]), "South");
        assert_eq!(zero.bottom_branches[0].value, "82.0");
    }
}
