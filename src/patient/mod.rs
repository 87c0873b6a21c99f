pub mod profiles;

use crate::error::{BiosimError, BiosimResult};
use serde::{Deserialize, Serialize};

pub use profiles::{find_profile, PatientProfile, PROFILES};

/// Number of state variables carried by the physiological model.
pub const N_STATES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

/// Physiological coefficients of one patient. Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatientParameters {
    pub age: f64,                   // years
    pub weight: f64,                // kg
    pub sex: Sex,
    pub baseline_glucose: f64,      // mg/dL
    pub insulin_sensitivity: f64,   // [0-1]
    pub glucose_absorption: f64,    // per gram of carbohydrate
    pub insulin_clearance: f64,     // 1/h
    pub hepatic_glucose: f64,       // mg/dL/h
    pub renal_function: f64,        // [0-1]
    pub liver_function: f64,        // [0-1]
    pub immune_response: f64,
    pub inflammatory_response: f64,
    pub heart_rate: f64,            // resting bpm
    pub blood_pressure: f64,        // resting systolic mmHg
}

impl Default for PatientParameters {
    fn default() -> Self {
        Self {
            age: 50.0,
            weight: 70.0,
            sex: Sex::Male,
            baseline_glucose: 140.0,
            insulin_sensitivity: 0.5,
            glucose_absorption: 0.02,
            insulin_clearance: 0.01,
            hepatic_glucose: 0.8,
            renal_function: 0.9,
            liver_function: 0.9,
            immune_response: 0.9,
            inflammatory_response: 0.5,
            heart_rate: 75.0,
            blood_pressure: 120.0,
        }
    }
}

impl PatientParameters {
    fn numeric_fields(&self) -> [(&'static str, f64); 13] {
        [
            ("age", self.age),
            ("weight", self.weight),
            ("baseline_glucose", self.baseline_glucose),
            ("insulin_sensitivity", self.insulin_sensitivity),
            ("glucose_absorption", self.glucose_absorption),
            ("insulin_clearance", self.insulin_clearance),
            ("hepatic_glucose", self.hepatic_glucose),
            ("renal_function", self.renal_function),
            ("liver_function", self.liver_function),
            ("immune_response", self.immune_response),
            ("inflammatory_response", self.inflammatory_response),
            ("heart_rate", self.heart_rate),
            ("blood_pressure", self.blood_pressure),
        ]
    }

    pub fn validate(&self) -> BiosimResult<()> {
        for (name, value) in self.numeric_fields() {
            if !value.is_finite() {
                return Err(BiosimError::Validation(format!(
                    "Parameter {} must be finite, got {}",
                    name, value
                )));
            }
            if value < 0.0 {
                return Err(BiosimError::Validation(format!(
                    "Parameter {} must not be negative, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    /// Resting state of a patient who has not been simulated yet.
    pub fn initial_state(&self) -> StateVector {
        StateVector {
            glucose: self.baseline_glucose,
            insulin: 15.0,
            drug_plasma: 0.0,
            drug_tissue: 0.0,
            immune_cells: 100.0,
            inflammation: 10.0,
            heart_rate: self.heart_rate,
            blood_pressure: self.blood_pressure,
        }
    }

    pub fn with_overrides(mut self, overrides: &PatientOverrides) -> Self {
        macro_rules! apply {
            ($($field:ident),*) => {
                $(if let Some(value) = overrides.$field { self.$field = value; })*
            };
        }
        apply!(
            age, weight, sex, baseline_glucose, insulin_sensitivity, glucose_absorption,
            insulin_clearance, hepatic_glucose, renal_function, liver_function,
            immune_response, inflammatory_response, heart_rate, blood_pressure
        );
        self
    }
}

/// Partial parameter set layered over a profile. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PatientOverrides {
    pub age: Option<f64>,
    pub weight: Option<f64>,
    pub sex: Option<Sex>,
    pub baseline_glucose: Option<f64>,
    pub insulin_sensitivity: Option<f64>,
    pub glucose_absorption: Option<f64>,
    pub insulin_clearance: Option<f64>,
    pub hepatic_glucose: Option<f64>,
    pub renal_function: Option<f64>,
    pub liver_function: Option<f64>,
    pub immune_response: Option<f64>,
    pub inflammatory_response: Option<f64>,
    pub heart_rate: Option<f64>,
    pub blood_pressure: Option<f64>,
}

/// Instantaneous physiological state of the patient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateVector {
    pub glucose: f64,        // mg/dL
    pub insulin: f64,        // mU/L
    pub drug_plasma: f64,
    pub drug_tissue: f64,
    pub immune_cells: f64,   // relative level, 100 = normal
    pub inflammation: f64,   // arbitrary units
    pub heart_rate: f64,     // bpm
    pub blood_pressure: f64, // systolic mmHg
}

impl StateVector {
    pub fn to_array(&self) -> [f64; N_STATES] {
        [
            self.glucose,
            self.insulin,
            self.drug_plasma,
            self.drug_tissue,
            self.immune_cells,
            self.inflammation,
            self.heart_rate,
            self.blood_pressure,
        ]
    }

    pub fn from_slice(y: &[f64]) -> BiosimResult<Self> {
        if y.len() != N_STATES {
            return Err(BiosimError::Validation(format!(
                "State vector must have {} components, got {}",
                N_STATES,
                y.len()
            )));
        }
        Ok(Self {
            glucose: y[0],
            insulin: y[1],
            drug_plasma: y[2],
            drug_tissue: y[3],
            immune_cells: y[4],
            inflammation: y[5],
            heart_rate: y[6],
            blood_pressure: y[7],
        })
    }

    pub fn validate(&self) -> BiosimResult<()> {
        if self.to_array().iter().any(|v| !v.is_finite()) {
            return Err(BiosimError::Validation(
                "Initial state contains non-finite values".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_follows_parameters() {
        let params = PatientParameters {
            baseline_glucose: 180.0,
            heart_rate: 82.0,
            ..Default::default()
        };
        let state = params.initial_state();
        assert_eq!(state.glucose, 180.0);
        assert_eq!(state.insulin, 15.0);
        assert_eq!(state.drug_plasma, 0.0);
        assert_eq!(state.immune_cells, 100.0);
        assert_eq!(state.heart_rate, 82.0);
        assert_eq!(state.blood_pressure, 120.0);
    }

    #[test]
    fn test_state_array_conversion() {
        let state = PatientParameters::default().initial_state();
        let restored = StateVector::from_slice(&state.to_array()).unwrap();
        assert_eq!(state, restored);
        assert!(StateVector::from_slice(&[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_validation_rejects_non_finite() {
        let params = PatientParameters {
            insulin_sensitivity: f64::NAN,
            ..Default::default()
        };
        assert!(matches!(params.validate(), Err(BiosimError::Validation(_))));

        let params = PatientParameters {
            renal_function: -0.1,
            ..Default::default()
        };
        assert!(params.validate().is_err());
        assert!(PatientParameters::default().validate().is_ok());
    }

    #[test]
    fn test_overrides_and_partial_json() {
        let overrides = PatientOverrides {
            renal_function: Some(0.4),
            sex: Some(Sex::Female),
            ..Default::default()
        };
        let params = PatientParameters::default().with_overrides(&overrides);
        assert_eq!(params.renal_function, 0.4);
        assert_eq!(params.sex, Sex::Female);
        assert_eq!(params.liver_function, 0.9);

        let parsed: PatientParameters =
            serde_json::from_str(r#"{"baseline_glucose": 95, "sex": "F"}"#).unwrap();
        assert_eq!(parsed.baseline_glucose, 95.0);
        assert_eq!(parsed.heart_rate, 75.0);

        let typo: Result<PatientOverrides, _> =
            serde_json::from_str(r#"{"renal_fuction": 0.5}"#);
        assert!(typo.is_err());
    }
}
