use crate::error::{BiosimError, BiosimResult};
use crate::patient::PatientParameters;
use rand::Rng;
use rand_distr::{Distribution, LogNormal};
use serde::{Deserialize, Serialize};

/// Log-normal variability with the given CV% around `base_value`, preserving the mean.
pub fn apply_log_normal_variability<R: Rng>(
    base_value: f64,
    cv_percent: f64,
    rng: &mut R,
) -> BiosimResult<f64> {
    if cv_percent <= 0.0 || base_value <= 0.0 {
        return Ok(base_value);
    }

    let cv = cv_percent / 100.0;
    let sigma_log = (cv * cv + 1.0).ln().sqrt();
    let mu_log = base_value.ln() - sigma_log * sigma_log / 2.0;

    let log_normal = LogNormal::new(mu_log, sigma_log).map_err(|_| BiosimError::Random)?;
    Ok(log_normal.sample(rng))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterVariability {
    pub insulin_sensitivity_cv: f64,
    pub hepatic_glucose_cv: f64,
    pub renal_function_cv: f64,
    pub liver_function_cv: f64,
}

impl Default for ParameterVariability {
    fn default() -> Self {
        Self {
            insulin_sensitivity_cv: 30.0,
            hepatic_glucose_cv: 20.0,
            renal_function_cv: 15.0,
            liver_function_cv: 15.0,
        }
    }
}

impl ParameterVariability {
    pub fn validate(&self) -> BiosimResult<()> {
        let values = [
            self.insulin_sensitivity_cv,
            self.hepatic_glucose_cv,
            self.renal_function_cv,
            self.liver_function_cv,
        ];
        if values.iter().any(|cv| !cv.is_finite() || *cv < 0.0) {
            return Err(BiosimError::Validation(
                "Variability CV% must be finite and non-negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Draw one individual around `base`. Organ-function multipliers stay within [0, 1].
    pub fn sample<R: Rng>(&self, base: &PatientParameters, rng: &mut R) -> BiosimResult<PatientParameters> {
        let mut params = base.clone();
        params.insulin_sensitivity =
            apply_log_normal_variability(base.insulin_sensitivity, self.insulin_sensitivity_cv, rng)?;
        params.hepatic_glucose =
            apply_log_normal_variability(base.hepatic_glucose, self.hepatic_glucose_cv, rng)?;
        params.renal_function =
            apply_log_normal_variability(base.renal_function, self.renal_function_cv, rng)?.min(1.0);
        params.liver_function =
            apply_log_normal_variability(base.liver_function, self.liver_function_cv, rng)?.min(1.0);
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patient::find_profile;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_log_normal_variability() {
        let mut rng = StdRng::seed_from_u64(42);
        let varied = apply_log_normal_variability(0.8, 30.0, &mut rng).unwrap();
        assert!(varied > 0.0);
        assert_ne!(varied, 0.8);
    }

    #[test]
    fn test_zero_cv_keeps_value() {
        let mut rng = StdRng::seed_from_u64(42);
        assert_eq!(apply_log_normal_variability(0.8, 0.0, &mut rng).unwrap(), 0.8);
        assert_eq!(apply_log_normal_variability(0.0, 25.0, &mut rng).unwrap(), 0.0);
    }

    #[test]
    fn test_sampled_mean_tracks_base() {
        let mut rng = StdRng::seed_from_u64(7);
        let n = 4000;
        let mean = (0..n)
            .map(|_| apply_log_normal_variability(10.0, 20.0, &mut rng).unwrap())
            .sum::<f64>()
            / n as f64;
        assert!((mean - 10.0).abs() < 0.3, "mean {}", mean);
    }

    #[test]
    fn test_sample_bounds_organ_function() {
        let base = find_profile("normal").unwrap().params.clone();
        let variability = ParameterVariability {
            renal_function_cv: 80.0,
            liver_function_cv: 80.0,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let params = variability.sample(&base, &mut rng).unwrap();
            assert!(params.renal_function > 0.0 && params.renal_function <= 1.0);
            assert!(params.liver_function > 0.0 && params.liver_function <= 1.0);
            assert_eq!(params.heart_rate, base.heart_rate);
        }
    }

    #[test]
    fn test_negative_cv_is_invalid() {
        let variability = ParameterVariability {
            hepatic_glucose_cv: -5.0,
            ..Default::default()
        };
        assert!(variability.validate().is_err());
    }
}
