use crate::error::{BiosimError, BiosimResult};
use crate::models::{screen_drug_types, ActiveDose, DrugType, InteractionRule};
use serde::{Deserialize, Serialize};

/// Half-width (hours) of the window around an event time in which the event is active.
pub const ACTIVATION_WINDOW: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationEvent {
    pub time: f64,
    pub drug_type: DrugType,
    pub dose_mg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealEvent {
    pub time: f64,
    pub carbs_g: f64,
}

impl MedicationEvent {
    pub fn new(time: f64, drug_type: DrugType, dose_mg: f64) -> Self {
        Self { time, drug_type, dose_mg }
    }
}

impl MealEvent {
    pub fn new(time: f64, carbs_g: f64) -> Self {
        Self { time, carbs_g }
    }
}

/// Breakfast, lunch and dinner used when no meal plan is supplied at all.
pub fn default_meals() -> Vec<MealEvent> {
    vec![
        MealEvent::new(7.0, 60.0),
        MealEvent::new(12.0, 80.0),
        MealEvent::new(19.0, 70.0),
    ]
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActiveInputs {
    pub medications: Vec<ActiveDose>,
    /// Carbohydrate load (g) of each active meal.
    pub meals: Vec<f64>,
}

impl ActiveInputs {
    pub fn meal_carbs(&self) -> f64 {
        self.meals.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.medications.is_empty() && self.meals.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub medications: Vec<MedicationEvent>,
    pub meals: Vec<MealEvent>,
}

impl Schedule {
    /// `meals: None` substitutes [`default_meals`]; `Some(vec![])` means no meals.
    pub fn new(medications: Vec<MedicationEvent>, meals: Option<Vec<MealEvent>>) -> BiosimResult<Self> {
        let mut schedule = Self {
            medications,
            meals: meals.unwrap_or_else(default_meals),
        };
        schedule.validate()?;

        schedule
            .medications
            .sort_by(|a, b| a.time.total_cmp(&b.time));
        schedule.meals.sort_by(|a, b| a.time.total_cmp(&b.time));
        Ok(schedule)
    }

    pub fn validate(&self) -> BiosimResult<()> {
        for med in &self.medications {
            if !med.time.is_finite() || med.time < 0.0 {
                return Err(BiosimError::InvalidDosing(format!(
                    "Medication time must be a non-negative number, got {}",
                    med.time
                )));
            }
            if !med.dose_mg.is_finite() || med.dose_mg < 0.0 {
                return Err(BiosimError::InvalidDosing(format!(
                    "Dose of {} at t={} must be a non-negative number, got {}",
                    med.drug_type, med.time, med.dose_mg
                )));
            }
        }

        for meal in &self.meals {
            if !meal.time.is_finite() || meal.time < 0.0 {
                return Err(BiosimError::InvalidDosing(format!(
                    "Meal time must be a non-negative number, got {}",
                    meal.time
                )));
            }
            if !meal.carbs_g.is_finite() || meal.carbs_g < 0.0 {
                return Err(BiosimError::InvalidDosing(format!(
                    "Meal at t={} must have a non-negative carbohydrate load, got {}",
                    meal.time, meal.carbs_g
                )));
            }
        }

        Ok(())
    }

    /// Events whose activation window contains `t`. The same event is reported
    /// for every call that falls inside its window.
    pub fn active_at(&self, t: f64) -> ActiveInputs {
        let medications = self
            .medications
            .iter()
            .filter(|med| (t - med.time).abs() < ACTIVATION_WINDOW)
            .map(|med| ActiveDose {
                drug_type: med.drug_type,
                dose: med.dose_mg,
            })
            .collect();

        let meals = self
            .meals
            .iter()
            .filter(|meal| (t - meal.time).abs() < ACTIVATION_WINDOW)
            .map(|meal| meal.carbs_g)
            .collect();

        ActiveInputs { medications, meals }
    }

    /// Interaction rules triggered by the drug types in this schedule, regardless of timing.
    pub fn screen_interactions(&self) -> Vec<&'static InteractionRule> {
        screen_drug_types(self.medications.iter().map(|med| med.drug_type))
    }
}
