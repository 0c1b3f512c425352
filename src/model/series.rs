//! Series reconciliation: raw (day, value) tokens -> one value per integer day.

use crate::error::{HarvestError, Result};
use crate::page::RawObservation;
use crate::spec::AggregationSpec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A day-indexed numeric sequence for one label. Days are unique and
/// ascending; missing days are absent, never zero-filled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub label: String,
    pub points: BTreeMap<i64, f64>,
}

impl Series {
    pub fn get(&self, day: i64) -> Option<f64> {
        self.points.get(&day).copied()
    }

    pub fn days(&self) -> impl Iterator<Item = i64> + '_ {
        self.points.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// How values collapsing onto the same truncated day are combined.
///
/// `Sum` suits flow quantities (jobs arrived); level quantities (queue
/// length, inventory) usually want `Last` or `Mean`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    #[default]
    Sum,
    Mean,
    Min,
    Max,
    Last,
}

impl Aggregation {
    /// Combine values in observation order. `values` is never empty.
    pub fn combine(self, values: &[f64]) -> f64 {
        match self {
            Aggregation::Sum => values.iter().sum(),
            Aggregation::Mean => values.iter().sum::<f64>() / values.len() as f64,
            Aggregation::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Aggregation::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Aggregation::Last => values.last().copied().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SeriesReconciler {
    aggregation: AggregationSpec,
}

impl SeriesReconciler {
    pub fn new(aggregation: AggregationSpec) -> Self {
        Self { aggregation }
    }

    /// Reconcile observations for `label` using the label's configured
    /// aggregation for fractional days.
    pub fn reconcile(&self, label: &str, observations: &[RawObservation]) -> Result<Series> {
        reconcile(label, observations, self.aggregation.for_label(label))
    }
}

/// Turn raw observations into a canonical series.
///
/// If every day token is an exact integer the mapping is direct and a
/// repeated day is a `Reconciliation` error. Otherwise every day is read as
/// a real, floored, and values sharing a floored day are combined with
/// `aggregation`.
pub fn reconcile(
    label: &str,
    observations: &[RawObservation],
    aggregation: Aggregation,
) -> Result<Series> {
    let values = observations
        .iter()
        .map(|o| parse_finite(label, &o.value))
        .collect::<Result<Vec<f64>>>()?;

    let integral: Option<Vec<i64>> = observations
        .iter()
        .map(|o| o.day.trim().parse::<i64>().ok())
        .collect();

    let mut points = BTreeMap::new();
    match integral {
        Some(days) => {
            for (day, value) in days.into_iter().zip(values) {
                if points.insert(day, value).is_some() {
                    return Err(HarvestError::Reconciliation {
                        label: label.to_string(),
                        day,
                    });
                }
            }
        }
        None => {
            let mut buckets: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
            for (obs, value) in observations.iter().zip(values) {
                let day = parse_finite(label, &obs.day)?.floor() as i64;
                buckets.entry(day).or_default().push(value);
            }
            for (day, vs) in buckets {
                points.insert(day, aggregation.combine(&vs));
            }
        }
    }

    Ok(Series {
        label: label.to_string(),
        points,
    })
}

fn parse_finite(label: &str, token: &str) -> Result<f64> {
    match token.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(HarvestError::BadToken {
            label: label.to_string(),
            token: token.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn obs(pairs: &[(&str, &str)]) -> Vec<RawObservation> {
        pairs
            .iter()
            .map(|(d, v)| RawObservation {
                day: d.to_string(),
                value: v.to_string(),
                label: "X".to_string(),
            })
            .collect()
    }

    fn points(s: &Series) -> Vec<(i64, f64)> {
        s.points.iter().map(|(d, v)| (*d, *v)).collect()
    }

    #[test]
    fn integer_days_map_directly() {
        let s = reconcile("X", &obs(&[("1", "10"), ("2", "20"), ("3", "30")]), Aggregation::Sum)
            .unwrap();
        assert_eq!(points(&s), vec![(1, 10.0), (2, 20.0), (3, 30.0)]);
        assert_eq!(s.label, "X");
    }

    #[test]
    fn fractional_days_are_floored_and_summed() {
        let s = reconcile(
            "X",
            &obs(&[("1.0", "5"), ("1.5", "7"), ("2.0", "3")]),
            Aggregation::Sum,
        )
        .unwrap();
        assert_eq!(points(&s), vec![(1, 12.0), (2, 3.0)]);
    }

    #[test]
    fn fractional_aggregation_is_pluggable() {
        let raw = obs(&[("1.0", "5"), ("1.5", "7"), ("2.0", "3")]);
        let last = reconcile("X", &raw, Aggregation::Last).unwrap();
        assert_eq!(points(&last), vec![(1, 7.0), (2, 3.0)]);
        let mean = reconcile("X", &raw, Aggregation::Mean).unwrap();
        assert_eq!(points(&mean), vec![(1, 6.0), (2, 3.0)]);
        let max = reconcile("X", &raw, Aggregation::Max).unwrap();
        assert_eq!(points(&max), vec![(1, 7.0), (2, 3.0)]);
        let min = reconcile("X", &raw, Aggregation::Min).unwrap();
        assert_eq!(points(&min), vec![(1, 5.0), (2, 3.0)]);
    }

    #[test]
    fn output_is_sorted_without_gap_filling() {
        let s = reconcile("X", &obs(&[("5", "1"), ("2", "2")]), Aggregation::Sum).unwrap();
        assert_eq!(points(&s), vec![(2, 2.0), (5, 1.0)]);
        assert_eq!(s.get(3), None);
    }

    #[test]
    fn duplicate_integer_day_is_conflict() {
        let err = reconcile("X", &obs(&[("1", "1"), ("1", "2")]), Aggregation::Sum).unwrap_err();
        match err {
            HarvestError::Reconciliation { label, day } => {
                assert_eq!(label, "X");
                assert_eq!(day, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn exponent_values_parse() {
        let s = reconcile("X", &obs(&[("1", "1e-3"), ("2", "1.5E+2")]), Aggregation::Sum)
            .unwrap();
        assert_eq!(points(&s), vec![(1, 0.001), (2, 150.0)]);
    }

    #[test]
    fn non_numeric_value_is_bad_token() {
        let err = reconcile("X", &obs(&[("1", "abc")]), Aggregation::Sum).unwrap_err();
        assert!(matches!(err, HarvestError::BadToken { .. }));
    }

    #[test]
    fn empty_input_is_empty_series() {
        let s = reconcile("X", &[], Aggregation::Sum).unwrap();
        assert!(s.is_empty());
    }

    #[test]
    fn reconciler_uses_label_override() {
        let mut spec = AggregationSpec::default();
        spec.labels.insert("INV".to_string(), Aggregation::Last);
        let r = SeriesReconciler::new(spec);
        let raw = obs(&[("1.2", "4"), ("1.7", "6")]);
        assert_eq!(points(&r.reconcile("INV", &raw).unwrap()), vec![(1, 6.0)]);
        assert_eq!(points(&r.reconcile("JOBIN", &raw).unwrap()), vec![(1, 10.0)]);
    }
}
