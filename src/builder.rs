use crate::catalogue::{persona_metrics, tab_metrics, MetricSpec, WeeklySpec, IMPORTANT_KPIS};
use crate::insights::{status_for, trend_of, week_over_week_change};
use crate::models::{
    ChartSeries, Dataset, Metric, MetricInput, MetricRecord, OperationalTab, Persona, TrendBias, WeekOverWeekMetric,
};
use crate::parser::{parse_value_or_fallback, DEFAULT_PARSE_FALLBACK};
use crate::series::{generate_series, SeriesConfig};
use chrono::{DateTime, Utc};
use rand::Rng;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Assembles one complete dataset per call. Values differ between calls, the
/// shape does not.
#[derive(Debug, Clone)]
pub struct DatasetBuilder {
    series: SeriesConfig,
    parse_fallback: f64,
    custom_metrics: BTreeMap<Persona, Vec<MetricRecord>>,
}

impl Default for DatasetBuilder {
    fn default() -> Self {
        Self::new(SeriesConfig::default(), DEFAULT_PARSE_FALLBACK)
    }
}

impl DatasetBuilder {
    pub fn new(series: SeriesConfig, parse_fallback: f64) -> Self {
        Self {
            series,
            parse_fallback,
            custom_metrics: BTreeMap::new(),
        }
    }

    pub fn with_custom_metrics(mut self, custom_metrics: BTreeMap<Persona, Vec<MetricRecord>>) -> Self {
        self.custom_metrics = custom_metrics;
        self
    }

    pub fn build<R: Rng + ?Sized>(&self, rng: &mut R, generated_at: DateTime<Utc>) -> Dataset {
        let mut personas = BTreeMap::new();
        for persona in Persona::ALL {
            let mut metrics = persona_metrics(persona)
                .iter()
                .map(|spec| {
                    let input = sample_spec(rng, spec);
                    self.attach_series(rng, input, generated_at)
                })
                .collect::<Vec<_>>();
            metrics.extend(self.custom_inputs(persona).map(|input| self.attach_series(rng, input, generated_at)));
            personas.insert(persona, metrics);
        }

        let important_kpis = IMPORTANT_KPIS
            .iter()
            .map(|spec| {
                let input = sample_spec(rng, spec);
                self.attach_series(rng, input, generated_at)
            })
            .collect();

        let mut operational_metrics = BTreeMap::new();
        for tab in OperationalTab::ALL {
            let metrics = tab_metrics(tab)
                .iter()
                .map(|spec| self.attach_weekly_series(rng, spec, generated_at))
                .collect::<Vec<_>>();
            operational_metrics.insert(tab, metrics);
        }

        Dataset {
            generation_id: Uuid::new_v4(),
            generated_at,
            personas,
            important_kpis,
            operational_metrics,
        }
    }

    /// Parses the current value and hangs a generated series on the metric.
    pub fn attach_series<R: Rng + ?Sized>(&self, rng: &mut R, input: MetricInput, anchor: DateTime<Utc>) -> Metric {
        let series = self.series_for(rng, &input.value, input.lower_is_better, anchor);
        let change = input
            .last_week_value
            .as_deref()
            .and_then(|last_week| week_over_week_change(&input.value, last_week));
        Metric {
            trend: trend_of(&series),
            status: status_for(&input.value, input.target.as_deref(), input.lower_is_better),
            week_over_week_change: change,
            last_week_value: input.last_week_value,
            id: input.id,
            name: input.name,
            value: input.value,
            target: input.target,
            lower_is_better: input.lower_is_better,
            tile_size: input.tile_size,
            series,
        }
    }

    fn attach_weekly_series<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        spec: &WeeklySpec,
        anchor: DateTime<Utc>,
    ) -> WeekOverWeekMetric {
        let (current_value, last_week_value) = spec.sample_values(rng);
        let lower_is_better = Some(spec.lower_is_better);
        let series = self.series_for(rng, &current_value, lower_is_better, anchor);
        WeekOverWeekMetric {
            id: spec.id.to_string(),
            name: spec.name.to_string(),
            week_over_week_change: week_over_week_change(&current_value, &last_week_value),
            trend: trend_of(&series),
            status: status_for(&current_value, spec.target, lower_is_better),
            target: spec.target.map(ToString::to_string),
            current_value,
            last_week_value,
            lower_is_better,
            series,
        }
    }

    fn series_for<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        value: &str,
        lower_is_better: Option<bool>,
        anchor: DateTime<Utc>,
    ) -> ChartSeries {
        let parsed = parse_value_or_fallback(value, self.parse_fallback);
        generate_series(
            rng,
            parsed.numeric_value,
            parsed.classification,
            TrendBias::from_lower_is_better(lower_is_better),
            &self.series,
            anchor,
        )
    }

    fn custom_inputs(&self, persona: Persona) -> impl Iterator<Item = MetricInput> + '_ {
        self.custom_metrics
            .get(&persona)
            .into_iter()
            .flatten()
            .filter_map(move |record| match record.clone().normalize() {
                Ok(input) => Some(input),
                Err(error) => {
                    tracing::warn!(
                        persona = persona.as_str(),
                        metric_id = %record.id,
                        error = %error,
                        "skipping malformed custom metric"
                    );
                    None
                }
            })
    }
}

fn sample_spec<R: Rng + ?Sized>(rng: &mut R, spec: &MetricSpec) -> MetricInput {
    MetricInput {
        id: spec.id.to_string(),
        name: spec.name.to_string(),
        value: spec.sample_value(rng),
        last_week_value: None,
        target: Some(spec.target.to_string()),
        lower_is_better: Some(spec.lower_is_better),
        tile_size: spec.tile_size,
    }
}
