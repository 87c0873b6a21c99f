use crate::analysis::AlertThresholds;
use crate::dosing::{MealEvent, MedicationEvent, Schedule};
use crate::error::BiosimResult;
use crate::patient::{find_profile, PatientOverrides, PatientParameters};
use crate::simulation::{validate_duration, CohortConfig};
use crate::solver::SolverOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub patient: PatientConfig,
    #[serde(default = "default_duration")]
    pub duration_hours: f64,
    #[serde(default)]
    pub medications: Vec<MedicationEvent>,
    /// Absent: default meal plan. Empty list: no meals.
    #[serde(default)]
    pub meals: Option<Vec<MealEvent>>,
    #[serde(default)]
    pub solver: SolverOptions,
    #[serde(default)]
    pub alerts: Option<AlertThresholds>,
    #[serde(default)]
    pub cohort: Option<CohortConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatientConfig {
    /// Key of a predefined profile; generic defaults when absent.
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub overrides: PatientOverrides,
}

fn default_duration() -> f64 {
    24.0
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            patient: PatientConfig::default(),
            duration_hours: default_duration(),
            medications: Vec::new(),
            meals: None,
            solver: SolverOptions::default(),
            alerts: None,
            cohort: None,
        }
    }
}

impl ScenarioConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> BiosimResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> BiosimResult<Self> {
        let config: ScenarioConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> BiosimResult<()> {
        validate_duration(self.duration_hours)?;
        self.patient_parameters()?.validate()?;
        self.schedule()?;
        self.solver.validate()?;

        if let Some(alerts) = &self.alerts {
            alerts.validate()?;
        }
        if let Some(cohort) = &self.cohort {
            cohort.validate()?;
        }
        Ok(())
    }

    /// Profile (or generic defaults) with the configured overrides applied.
    pub fn patient_parameters(&self) -> BiosimResult<PatientParameters> {
        let base = match &self.patient.profile {
            Some(key) => find_profile(key)?.params.clone(),
            None => PatientParameters::default(),
        };
        Ok(base.with_overrides(&self.patient.overrides))
    }

    pub fn schedule(&self) -> BiosimResult<Schedule> {
        Schedule::new(self.medications.clone(), self.meals.clone())
    }

    pub fn alert_thresholds(&self) -> AlertThresholds {
        self.alerts.clone().unwrap_or_default()
    }

    pub fn with_profile(mut self, key: &str) -> BiosimResult<Self> {
        find_profile(key)?;
        self.patient.profile = Some(key.to_string());
        Ok(self)
    }

    pub fn with_cohort_size(mut self, size: usize, seed: Option<u64>) -> BiosimResult<Self> {
        let mut cohort = self.cohort.take().unwrap_or(CohortConfig {
            size,
            seed: None,
            variability: Default::default(),
        });
        cohort.size = size;
        if seed.is_some() {
            cohort.seed = seed;
        }
        cohort.validate()?;
        self.cohort = Some(cohort);
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BiosimError;
    use crate::models::DrugType;

    #[test]
    fn test_full_scenario() {
        let json = r#"{
            "patient": { "profile": "diabetic", "overrides": { "renal_function": 0.5 } },
            "duration_hours": 48,
            "medications": [
                { "time": 8, "drug_type": "antidiabetic", "dose_mg": 10 },
                { "time": 8, "drug_type": "beta_blocker", "dose_mg": 5 }
            ],
            "meals": [],
            "solver": { "samples_per_hour": 20 },
            "cohort": { "size": 5, "seed": 42 }
        }"#;
        let config = ScenarioConfig::from_json(json).unwrap();
        let params = config.patient_parameters().unwrap();
        assert_eq!(params.baseline_glucose, 180.0);
        assert_eq!(params.renal_function, 0.5);

        let schedule = config.schedule().unwrap();
        assert!(schedule.meals.is_empty());
        assert_eq!(schedule.medications[1].drug_type, DrugType::BetaBlocker);
        assert_eq!(config.solver.samples_per_hour, 20.0);
        assert_eq!(config.solver.rtol, 1e-3);
        assert_eq!(config.cohort.unwrap().seed, Some(42));
    }

    #[test]
    fn test_defaults() {
        let config = ScenarioConfig::from_json("{}").unwrap();
        assert_eq!(config.duration_hours, 24.0);
        assert_eq!(config.patient_parameters().unwrap(), PatientParameters::default());
        assert_eq!(config.schedule().unwrap().meals.len(), 3);
        assert_eq!(config.alert_thresholds(), AlertThresholds::default());
    }

    #[test]
    fn test_rejections() {
        assert!(matches!(
            ScenarioConfig::from_json(r#"{"duration_hours": 0}"#),
            Err(BiosimError::Validation(_))
        ));
        assert!(matches!(
            ScenarioConfig::from_json(r#"{"patient": {"profile": "athlete"}}"#),
            Err(BiosimError::UnknownProfile(_))
        ));
        assert!(matches!(
            ScenarioConfig::from_json(
                r#"{"medications": [{"time": 1, "drug_type": "opioid", "dose_mg": 5}]}"#
            ),
            Err(BiosimError::Json(_))
        ));
        assert!(matches!(
            ScenarioConfig::from_json(r#"{"meals": [{"time": -2, "carbs_g": 30}]}"#),
            Err(BiosimError::InvalidDosing(_))
        ));
        assert!(ScenarioConfig::from_json(r#"{"durration_hours": 12}"#).is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let config = ScenarioConfig::default()
            .with_profile("elderly")
            .unwrap()
            .with_cohort_size(12, Some(9))
            .unwrap();
        assert_eq!(config.patient_parameters().unwrap().age, 78.0);
        let cohort = config.cohort.unwrap();
        assert_eq!(cohort.size, 12);
        assert_eq!(cohort.seed, Some(9));

        assert!(ScenarioConfig::default().with_profile("nobody").is_err());
        assert!(ScenarioConfig::default().with_cohort_size(0, None).is_err());
    }
}
