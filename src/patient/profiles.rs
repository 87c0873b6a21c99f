//! Predefined patient profiles.

use super::{PatientParameters, Sex};
use crate::error::{BiosimError, BiosimResult};

#[derive(Debug)]
pub struct PatientProfile {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub params: PatientParameters,
}

pub static PROFILES: [PatientProfile; 5] = [
    PatientProfile {
        key: "normal",
        name: "Standard patient",
        description: "Healthy adult with normal physiological parameters",
        params: PatientParameters {
            age: 35.0,
            weight: 70.0,
            sex: Sex::Male,
            baseline_glucose: 100.0,
            insulin_sensitivity: 0.8,
            glucose_absorption: 0.02,
            insulin_clearance: 0.01,
            hepatic_glucose: 0.7,
            renal_function: 1.0,
            liver_function: 1.0,
            immune_response: 1.0,
            inflammatory_response: 0.3,
            heart_rate: 70.0,
            blood_pressure: 120.0,
        },
    },
    PatientProfile {
        key: "diabetic",
        name: "Diabetic patient",
        description: "Type 2 diabetes with reduced insulin sensitivity",
        params: PatientParameters {
            age: 55.0,
            weight: 85.0,
            sex: Sex::Male,
            baseline_glucose: 180.0,
            insulin_sensitivity: 0.3,
            glucose_absorption: 0.025,
            insulin_clearance: 0.01,
            hepatic_glucose: 0.9,
            renal_function: 0.8,
            liver_function: 0.9,
            immune_response: 0.8,
            inflammatory_response: 0.6,
            heart_rate: 75.0,
            blood_pressure: 140.0,
        },
    },
    PatientProfile {
        key: "elderly",
        name: "Elderly patient",
        description: "Elderly patient with reduced physiological function",
        params: PatientParameters {
            age: 78.0,
            weight: 65.0,
            sex: Sex::Female,
            baseline_glucose: 130.0,
            insulin_sensitivity: 0.6,
            glucose_absorption: 0.015,
            insulin_clearance: 0.008,
            hepatic_glucose: 0.7,
            renal_function: 0.6,
            liver_function: 0.7,
            immune_response: 0.6,
            inflammatory_response: 0.5,
            heart_rate: 80.0,
            blood_pressure: 150.0,
        },
    },
    PatientProfile {
        key: "renal",
        name: "Renal failure",
        description: "Patient with severely reduced renal function",
        params: PatientParameters {
            age: 60.0,
            weight: 75.0,
            sex: Sex::Male,
            baseline_glucose: 120.0,
            insulin_sensitivity: 0.5,
            glucose_absorption: 0.02,
            insulin_clearance: 0.015,
            hepatic_glucose: 0.8,
            renal_function: 0.3,
            liver_function: 0.8,
            immune_response: 0.7,
            inflammatory_response: 0.6,
            heart_rate: 85.0,
            blood_pressure: 160.0,
        },
    },
    PatientProfile {
        key: "inflammatory",
        name: "Inflammatory disease",
        description: "Patient with high chronic inflammation",
        params: PatientParameters {
            age: 45.0,
            weight: 68.0,
            sex: Sex::Female,
            baseline_glucose: 110.0,
            insulin_sensitivity: 0.6,
            glucose_absorption: 0.02,
            insulin_clearance: 0.01,
            hepatic_glucose: 0.7,
            renal_function: 0.9,
            liver_function: 0.8,
            immune_response: 1.2,
            inflammatory_response: 0.9,
            heart_rate: 78.0,
            blood_pressure: 125.0,
        },
    },
];

pub fn find_profile(key: &str) -> BiosimResult<&'static PatientProfile> {
    PROFILES
        .iter()
        .find(|profile| profile.key.eq_ignore_ascii_case(key))
        .ok_or_else(|| BiosimError::UnknownProfile(key.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_lookup() {
        let normal = find_profile("normal").unwrap();
        assert_eq!(normal.params.baseline_glucose, 100.0);
        assert_eq!(normal.params.insulin_sensitivity, 0.8);
        assert_eq!(find_profile("RENAL").unwrap().params.renal_function, 0.3);
        assert!(matches!(find_profile("athlete"), Err(BiosimError::UnknownProfile(_))));
    }

    #[test]
    fn test_profiles_are_valid() {
        for profile in PROFILES.iter() {
            assert!(profile.params.validate().is_ok(), "{} is invalid", profile.key);
        }
    }
}
