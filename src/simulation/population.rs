use super::{validate_duration, Metrics, ParameterVariability, Simulator};
use crate::dosing::Schedule;
use crate::error::{BiosimError, BiosimResult};
use crate::patient::PatientParameters;
use crate::solver::SolverOptions;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortConfig {
    pub size: usize,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub variability: ParameterVariability,
}

impl CohortConfig {
    pub fn validate(&self) -> BiosimResult<()> {
        if self.size == 0 {
            return Err(BiosimError::Validation(
                "Cohort size must be at least 1".to_string(),
            ));
        }
        self.variability.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohortMember {
    pub patient_id: usize,
    pub params: PatientParameters,
    pub metrics: Metrics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohortResult {
    pub members: Vec<CohortMember>,
    pub summary: CohortSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortSummary {
    pub n_patients: usize,
    pub health_score_mean: f64,
    pub health_score_sd: f64,
    pub glucose_mean_mean: f64,
    pub glucose_mean_sd: f64,
    pub percent_in_range_mean: f64,
    pub percent_in_range_sd: f64,
    pub drug_exposure_mean: f64,
    pub drug_exposure_sd: f64,
}

impl CohortSummary {
    pub fn from_members(members: &[CohortMember]) -> Self {
        let column = |f: fn(&Metrics) -> f64| -> Vec<f64> {
            members.iter().map(|m| f(&m.metrics)).collect()
        };
        let health = column(|m| m.health_score);
        let glucose = column(|m| m.glucose_mean);
        let in_range = column(|m| m.percent_in_range);
        let exposure = column(|m| m.drug_exposure);

        Self {
            n_patients: members.len(),
            health_score_mean: mean(&health),
            health_score_sd: sample_std_dev(&health),
            glucose_mean_mean: mean(&glucose),
            glucose_mean_sd: sample_std_dev(&glucose),
            percent_in_range_mean: mean(&in_range),
            percent_in_range_sd: sample_std_dev(&in_range),
            drug_exposure_mean: mean(&exposure),
            drug_exposure_sd: sample_std_dev(&exposure),
        }
    }
}

/// Simulate `config.size` virtual patients sampled around `base`, all on the same schedule.
pub fn simulate_cohort(
    base: &PatientParameters,
    schedule: &Schedule,
    duration: f64,
    options: &SolverOptions,
    config: &CohortConfig,
) -> BiosimResult<CohortResult> {
    config.validate()?;
    validate_duration(duration)?;
    base.validate()?;

    let mut rng = match config.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };

    info!("Starting cohort simulation for {} patients", config.size);
    let mut members = Vec::with_capacity(config.size);
    for patient_id in 1..=config.size {
        if patient_id % 10 == 0 || patient_id <= 10 {
            info!("Simulating patient {}/{}", patient_id, config.size);
        }

        let params = config.variability.sample(base, &mut rng)?;
        debug!(
            "Patient {}: insulin sensitivity {:.3}, renal function {:.3}",
            patient_id, params.insulin_sensitivity, params.renal_function
        );
        let mut simulator = Simulator::new(params.clone(), options.clone())?;
        let outcome = simulator.run(duration, schedule)?;

        members.push(CohortMember {
            patient_id,
            params,
            metrics: outcome.metrics,
        });
    }

    let summary = CohortSummary::from_members(&members);
    info!(
        "Cohort simulation completed: mean health score {:.1} (SD {:.1})",
        summary.health_score_mean, summary.health_score_sd
    );
    Ok(CohortResult { members, summary })
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        0.0
    } else {
        let mean_val = mean(values);
        let variance = values.iter()
            .map(|v| (v - mean_val).powi(2))
            .sum::<f64>() / (values.len() - 1) as f64;
        variance.sqrt()
    }
}
