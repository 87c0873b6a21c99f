use crate::error::{BiosimError, BiosimResult};
use crate::simulation::{Trajectory, Variable};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub hours: f64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitMetrics {
    pub variable: Variable,
    pub n_observations: usize,
    pub rmse: f64,
    pub mae: f64,
    /// Mean absolute percentage error over observations with a non-zero value.
    pub mape: f64,
    pub correlation: f64,
    pub simulated: Vec<f64>,
}

/// Observations past the simulated horizon are matched to the last sample.
pub fn compare_with_observations(
    trajectory: &Trajectory,
    variable: Variable,
    observations: &[Observation],
) -> BiosimResult<FitMetrics> {
    if observations.is_empty() {
        return Err(BiosimError::Validation(format!(
            "No observations supplied for {}",
            variable
        )));
    }
    if trajectory.is_empty() {
        return Err(BiosimError::Validation("Trajectory is empty".to_string()));
    }
    if observations
        .iter()
        .any(|obs| !obs.hours.is_finite() || !obs.value.is_finite())
    {
        return Err(BiosimError::Validation(format!(
            "Observations for {} must be finite",
            variable
        )));
    }

    let simulated: Vec<f64> = observations
        .iter()
        .filter_map(|obs| trajectory.value_at(variable, obs.hours))
        .collect();
    let observed: Vec<f64> = observations.iter().map(|obs| obs.value).collect();
    let n = observed.len() as f64;

    let residuals: Vec<f64> = observed.iter().zip(&simulated).map(|(o, s)| o - s).collect();
    let rmse = (residuals.iter().map(|r| r * r).sum::<f64>() / n).sqrt();
    let mae = residuals.iter().map(|r| r.abs()).sum::<f64>() / n;

    let relative: Vec<f64> = observed
        .iter()
        .zip(&residuals)
        .filter(|(o, _)| **o != 0.0)
        .map(|(o, r)| (r / o).abs())
        .collect();
    let mape = if relative.is_empty() {
        0.0
    } else {
        relative.iter().sum::<f64>() / relative.len() as f64 * 100.0
    };

    Ok(FitMetrics {
        variable,
        n_observations: observations.len(),
        rmse,
        mae,
        mape,
        correlation: pearson(&observed, &simulated),
        simulated,
    })
}

/// Pearson correlation; 0 when either series has no variance.
fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return 0.0;
    }
    let mean_a = a[..n].iter().sum::<f64>() / n as f64;
    let mean_b = b[..n].iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a[..n].iter().zip(&b[..n]) {
        cov += (x - mean_a) * (y - mean_b);
        var_a += (x - mean_a).powi(2);
        var_b += (y - mean_b).powi(2);
    }
    if var_a == 0.0 || var_b == 0.0 {
        return 0.0;
    }
    cov / (var_a.sqrt() * var_b.sqrt())
}
