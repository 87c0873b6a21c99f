use crate::dosing::Schedule;
use crate::models::DrugType;
use crate::simulation::{Trajectory, Variable};
use serde::{Deserialize, Serialize};

const MEDICATION_HORIZON: f64 = 1.0;
const MEAL_HORIZON: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterventionImpact {
    pub time: f64,
    pub label: String,
    pub variable: Variable,
    pub horizon: f64,
    pub change: f64,
}

fn targets(drug: DrugType) -> &'static [Variable] {
    match drug {
        DrugType::Antidiabetic => &[Variable::Glucose],
        DrugType::Antiinflammatory => &[Variable::Inflammation],
        DrugType::BetaBlocker | DrugType::Vasodilator => {
            &[Variable::HeartRate, Variable::BloodPressure]
        }
    }
}

fn change_after(trajectory: &Trajectory, variable: Variable, time: f64, horizon: f64) -> Option<f64> {
    let start = trajectory.nearest_index(time)?;
    let end = trajectory.nearest_index(trajectory.time[start] + horizon)?;
    let series = trajectory.series(variable);
    Some(series[end] - series[start])
}

pub fn assess_interventions(trajectory: &Trajectory, schedule: &Schedule) -> Vec<InterventionImpact> {
    let mut impacts = Vec::new();

    for med in &schedule.medications {
        for &variable in targets(med.drug_type) {
            if let Some(change) = change_after(trajectory, variable, med.time, MEDICATION_HORIZON) {
                impacts.push(InterventionImpact {
                    time: med.time,
                    label: format!("{} - {} mg", med.drug_type, med.dose_mg),
                    variable,
                    horizon: MEDICATION_HORIZON,
                    change,
                });
            }
        }
    }

    for meal in &schedule.meals {
        if let Some(change) = change_after(trajectory, Variable::Glucose, meal.time, MEAL_HORIZON) {
            impacts.push(InterventionImpact {
                time: meal.time,
                label: format!("{} g carbohydrates", meal.carbs_g),
                variable: Variable::Glucose,
                horizon: MEAL_HORIZON,
                change,
            });
        }
    }

    impacts
}
