//! Clinical summary metrics derived from a completed trajectory.

use super::Trajectory;
use serde::{Deserialize, Serialize};

pub const HYPOGLYCEMIA_THRESHOLD: f64 = 70.0;
pub const HYPERGLYCEMIA_THRESHOLD: f64 = 180.0;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Metrics {
    pub glucose_mean: f64,
    pub glucose_min: f64,
    pub glucose_max: f64,
    pub glucose_variability: f64,
    pub percent_hyperglycemia: f64,
    pub percent_hypoglycemia: f64,
    pub percent_in_range: f64,
    pub drug_exposure: f64,
    pub inflammation_burden: f64,
    pub hr_variability: f64,
    pub bp_variability: f64,
    pub health_score: f64,
}

impl Metrics {
    /// An empty trajectory yields all-zero metrics.
    pub fn from_trajectory(trajectory: &Trajectory) -> Self {
        let glucose = &trajectory.glucose;
        if glucose.is_empty() {
            return Self::default();
        }

        let percent_hyperglycemia = percent_where(glucose, |g| g > HYPERGLYCEMIA_THRESHOLD);
        let percent_hypoglycemia = percent_where(glucose, |g| g < HYPOGLYCEMIA_THRESHOLD);
        let percent_in_range = percent_where(glucose, |g| {
            (HYPOGLYCEMIA_THRESHOLD..=HYPERGLYCEMIA_THRESHOLD).contains(&g)
        });
        let glucose_variability = std_dev(glucose);
        let inflammation_burden = trapezoid(&trajectory.inflammation, &trajectory.time);

        Self {
            glucose_mean: mean(glucose),
            glucose_min: glucose.iter().copied().fold(f64::INFINITY, f64::min),
            glucose_max: glucose.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            glucose_variability,
            percent_hyperglycemia,
            percent_hypoglycemia,
            percent_in_range,
            drug_exposure: trapezoid(&trajectory.drug_plasma, &trajectory.time),
            inflammation_burden,
            hr_variability: std_dev(&trajectory.heart_rate),
            bp_variability: std_dev(&trajectory.blood_pressure),
            health_score: health_score(
                percent_hyperglycemia,
                percent_hypoglycemia,
                glucose_variability,
                inflammation_burden,
            ),
        }
    }

    pub fn entries(&self) -> [(&'static str, f64); 12] {
        [
            ("glucose_mean", self.glucose_mean),
            ("glucose_min", self.glucose_min),
            ("glucose_max", self.glucose_max),
            ("glucose_variability", self.glucose_variability),
            ("percent_hyperglycemia", self.percent_hyperglycemia),
            ("percent_hypoglycemia", self.percent_hypoglycemia),
            ("percent_in_range", self.percent_in_range),
            ("drug_exposure", self.drug_exposure),
            ("inflammation_burden", self.inflammation_burden),
            ("hr_variability", self.hr_variability),
            ("bp_variability", self.bp_variability),
            ("health_score", self.health_score),
        ]
    }
}

/// Composite 0-100 index: glycemic-control and inflammation penalties off 100.
pub fn health_score(
    percent_hyperglycemia: f64,
    percent_hypoglycemia: f64,
    glucose_variability: f64,
    inflammation_burden: f64,
) -> f64 {
    let score = 100.0
        - 0.3 * percent_hyperglycemia
        - 0.5 * percent_hypoglycemia
        - 0.2 * glucose_variability
        - 10.0 * (inflammation_burden / 1000.0);
    if score.is_nan() {
        return 0.0;
    }
    score.clamp(0.0, 100.0)
}

fn percent_where<F: Fn(f64) -> bool>(values: &[f64], predicate: F) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let hits = values.iter().filter(|&&v| predicate(v)).count();
    hits as f64 / values.len() as f64 * 100.0
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Population standard deviation.
pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean_val = mean(values);
    let variance = values.iter().map(|v| (v - mean_val).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Trapezoidal area under `y` over the sample times `x`.
pub(crate) fn trapezoid(y: &[f64], x: &[f64]) -> f64 {
    y.windows(2)
        .zip(x.windows(2))
        .map(|(yw, xw)| (xw[1] - xw[0]) * (yw[0] + yw[1]) / 2.0)
        .sum()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDelta {
    pub metric: String,
    pub scenario_a: f64,
    pub scenario_b: f64,
    pub difference: f64,
    /// Percent change from A to B; `None` when A is zero.
    pub relative_change: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsComparison {
    pub rows: Vec<MetricDelta>,
}

impl MetricsComparison {
    pub fn new(a: &Metrics, b: &Metrics) -> Self {
        let pairs = [
            ("health_score", a.health_score, b.health_score),
            ("glucose_mean", a.glucose_mean, b.glucose_mean),
            ("percent_in_range", a.percent_in_range, b.percent_in_range),
            ("percent_hyperglycemia", a.percent_hyperglycemia, b.percent_hyperglycemia),
            ("percent_hypoglycemia", a.percent_hypoglycemia, b.percent_hypoglycemia),
            ("inflammation_burden", a.inflammation_burden, b.inflammation_burden),
            ("drug_exposure", a.drug_exposure, b.drug_exposure),
        ];

        let rows = pairs
            .iter()
            .map(|&(metric, va, vb)| MetricDelta {
                metric: metric.to_string(),
                scenario_a: va,
                scenario_b: vb,
                difference: vb - va,
                relative_change: if va != 0.0 {
                    Some((vb - va) / va.abs() * 100.0)
                } else {
                    None
                },
            })
            .collect();

        Self { rows }
    }

    pub fn get(&self, metric: &str) -> Option<&MetricDelta> {
        self.rows.iter().find(|row| row.metric == metric)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn trajectory(glucose: Vec<f64>) -> Trajectory {
        let n = glucose.len();
        Trajectory {
            time: (0..n).map(|i| i as f64).collect(),
            glucose,
            insulin: vec![15.0; n],
            drug_plasma: vec![0.0; n],
            drug_tissue: vec![0.0; n],
            immune_cells: vec![100.0; n],
            inflammation: vec![10.0; n],
            heart_rate: vec![70.0; n],
            blood_pressure: vec![120.0; n],
        }
    }

    #[test]
    fn test_glycemic_bands_use_literal_bounds() {
        let metrics = Metrics::from_trajectory(&trajectory(vec![60.0, 70.0, 120.0, 180.0, 200.0]));
        assert_relative_eq!(metrics.percent_hypoglycemia, 20.0, epsilon = 1e-9);
        assert_relative_eq!(metrics.percent_hyperglycemia, 20.0, epsilon = 1e-9);
        assert_relative_eq!(metrics.percent_in_range, 60.0, epsilon = 1e-9);
        assert_relative_eq!(
            metrics.percent_hypoglycemia + metrics.percent_in_range + metrics.percent_hyperglycemia,
            100.0,
            epsilon = 1e-9
        );
        assert_eq!(metrics.glucose_min, 60.0);
        assert_eq!(metrics.glucose_max, 200.0);
        assert_relative_eq!(metrics.glucose_mean, 126.0, epsilon = 1e-9);
    }

    #[test]
    fn test_population_standard_deviation() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(std_dev(&values), 2.0, epsilon = 1e-9);
        assert_eq!(std_dev(&[5.0]), 0.0);
        assert_eq!(std_dev(&[]), 0.0);
    }

    #[test]
    fn test_trapezoid() {
        assert_relative_eq!(trapezoid(&[0.0, 2.0, 2.0], &[0.0, 1.0, 3.0]), 5.0, epsilon = 1e-9);
        assert_eq!(trapezoid(&[1.0], &[0.0]), 0.0);
    }

    #[test]
    fn test_health_score_formula() {
        let metrics = Metrics::from_trajectory(&trajectory(vec![100.0; 11]));
        // constant glucose, inflammation 10 over 10 h
        assert_relative_eq!(metrics.inflammation_burden, 100.0, epsilon = 1e-9);
        assert_relative_eq!(metrics.health_score, 99.0, epsilon = 1e-12);

        assert_relative_eq!(health_score(10.0, 2.0, 5.0, 500.0), 90.0, epsilon = 1e-9);
    }

    #[test]
    fn test_health_score_is_clamped() {
        assert_eq!(health_score(100.0, 0.0, 200.0, 1e6), 0.0);
        assert_eq!(health_score(0.0, 0.0, 0.0, -5000.0), 100.0);
        assert_eq!(health_score(f64::NAN, 0.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn test_empty_trajectory() {
        assert_eq!(Metrics::from_trajectory(&Trajectory::default()), Metrics::default());
    }

    #[test]
    fn test_metrics_comparison() {
        let a = Metrics {
            health_score: 80.0,
            drug_exposure: 0.0,
            ..Default::default()
        };
        let b = Metrics {
            health_score: 90.0,
            drug_exposure: 12.0,
            ..Default::default()
        };
        let comparison = MetricsComparison::new(&a, &b);
        let score = comparison.get("health_score").unwrap();
        assert_eq!(score.difference, 10.0);
        assert_relative_eq!(score.relative_change.unwrap(), 12.5, epsilon = 1e-9);

        let exposure = comparison.get("drug_exposure").unwrap();
        assert_eq!(exposure.difference, 12.0);
        assert_eq!(exposure.relative_change, None);
        assert_eq!(comparison.rows.len(), 7);
    }
}
