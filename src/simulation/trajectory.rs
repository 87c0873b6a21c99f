use crate::error::{BiosimError, BiosimResult};
use crate::patient::{StateVector, N_STATES};
use crate::solver::OdeSolution;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variable {
    Glucose,
    Insulin,
    DrugPlasma,
    DrugTissue,
    ImmuneCells,
    Inflammation,
    HeartRate,
    BloodPressure,
}

impl Variable {
    pub const ALL: [Variable; N_STATES] = [
        Variable::Glucose,
        Variable::Insulin,
        Variable::DrugPlasma,
        Variable::DrugTissue,
        Variable::ImmuneCells,
        Variable::Inflammation,
        Variable::HeartRate,
        Variable::BloodPressure,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Variable::Glucose => "glucose",
            Variable::Insulin => "insulin",
            Variable::DrugPlasma => "drug_plasma",
            Variable::DrugTissue => "drug_tissue",
            Variable::ImmuneCells => "immune_cells",
            Variable::Inflammation => "inflammation",
            Variable::HeartRate => "heart_rate",
            Variable::BloodPressure => "blood_pressure",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Variable::Glucose => "mg/dL",
            Variable::Insulin => "mU/L",
            Variable::HeartRate => "bpm",
            Variable::BloodPressure => "mmHg",
            _ => "",
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Trajectory {
    pub time: Vec<f64>,
    pub glucose: Vec<f64>,
    pub insulin: Vec<f64>,
    pub drug_plasma: Vec<f64>,
    pub drug_tissue: Vec<f64>,
    pub immune_cells: Vec<f64>,
    pub inflammation: Vec<f64>,
    pub heart_rate: Vec<f64>,
    pub blood_pressure: Vec<f64>,
}

impl Trajectory {
    pub fn from_solution(solution: &OdeSolution) -> BiosimResult<Self> {
        let n = solution.t.len();
        let mut trajectory = Trajectory {
            time: solution.t.clone(),
            glucose: Vec::with_capacity(n),
            insulin: Vec::with_capacity(n),
            drug_plasma: Vec::with_capacity(n),
            drug_tissue: Vec::with_capacity(n),
            immune_cells: Vec::with_capacity(n),
            inflammation: Vec::with_capacity(n),
            heart_rate: Vec::with_capacity(n),
            blood_pressure: Vec::with_capacity(n),
        };
        for y in &solution.y {
            trajectory.push(&StateVector::from_slice(y)?);
        }
        Ok(trajectory)
    }

    fn push(&mut self, state: &StateVector) {
        self.glucose.push(state.glucose);
        self.insulin.push(state.insulin);
        self.drug_plasma.push(state.drug_plasma);
        self.drug_tissue.push(state.drug_tissue);
        self.immune_cells.push(state.immune_cells);
        self.inflammation.push(state.inflammation);
        self.heart_rate.push(state.heart_rate);
        self.blood_pressure.push(state.blood_pressure);
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn series(&self, variable: Variable) -> &[f64] {
        match variable {
            Variable::Glucose => &self.glucose,
            Variable::Insulin => &self.insulin,
            Variable::DrugPlasma => &self.drug_plasma,
            Variable::DrugTissue => &self.drug_tissue,
            Variable::ImmuneCells => &self.immune_cells,
            Variable::Inflammation => &self.inflammation,
            Variable::HeartRate => &self.heart_rate,
            Variable::BloodPressure => &self.blood_pressure,
        }
    }

    /// Index of the sample closest in time to `time`; ties go to the earlier sample.
    pub fn nearest_index(&self, time: f64) -> Option<usize> {
        if self.time.is_empty() {
            return None;
        }
        let idx = self.time.partition_point(|&t| t < time);
        if idx == 0 {
            return Some(0);
        }
        if idx == self.time.len() {
            return Some(idx - 1);
        }
        if (self.time[idx] - time).abs() < (time - self.time[idx - 1]).abs() {
            Some(idx)
        } else {
            Some(idx - 1)
        }
    }

    pub fn value_at(&self, variable: Variable, time: f64) -> Option<f64> {
        self.nearest_index(time).map(|idx| self.series(variable)[idx])
    }

    pub fn state_at(&self, idx: usize) -> Option<StateVector> {
        if idx >= self.len() {
            return None;
        }
        Some(StateVector {
            glucose: self.glucose[idx],
            insulin: self.insulin[idx],
            drug_plasma: self.drug_plasma[idx],
            drug_tissue: self.drug_tissue[idx],
            immune_cells: self.immune_cells[idx],
            inflammation: self.inflammation[idx],
            heart_rate: self.heart_rate[idx],
            blood_pressure: self.blood_pressure[idx],
        })
    }

    pub fn final_state(&self) -> BiosimResult<StateVector> {
        self.len()
            .checked_sub(1)
            .and_then(|idx| self.state_at(idx))
            .ok_or_else(|| BiosimError::Validation("Trajectory is empty".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::SolverStats;

    fn sample() -> Trajectory {
        let solution = OdeSolution {
            t: vec![0.0, 0.5, 1.0, 1.5],
            y: (0..4)
                .map(|i| (0..N_STATES).map(|j| (i * 10 + j) as f64).collect())
                .collect(),
            stats: SolverStats::default(),
        };
        Trajectory::from_solution(&solution).unwrap()
    }

    #[test]
    fn test_columns_follow_state_layout() {
        let trajectory = sample();
        assert_eq!(trajectory.len(), 4);
        assert_eq!(trajectory.glucose, vec![0.0, 10.0, 20.0, 30.0]);
        assert_eq!(trajectory.blood_pressure, vec![7.0, 17.0, 27.0, 37.0]);
        for (j, variable) in Variable::ALL.iter().enumerate() {
            assert_eq!(trajectory.series(*variable)[2], (20 + j) as f64);
        }
    }

    #[test]
    fn test_nearest_index() {
        let trajectory = sample();
        assert_eq!(trajectory.nearest_index(-3.0), Some(0));
        assert_eq!(trajectory.nearest_index(0.2), Some(0));
        assert_eq!(trajectory.nearest_index(0.3), Some(1));
        assert_eq!(trajectory.nearest_index(0.75), Some(1));
        assert_eq!(trajectory.nearest_index(1.0), Some(2));
        assert_eq!(trajectory.nearest_index(99.0), Some(3));
        assert_eq!(Trajectory::default().nearest_index(1.0), None);
        assert_eq!(trajectory.value_at(Variable::Insulin, 1.4), Some(31.0));
    }

    #[test]
    fn test_final_state() {
        let state = sample().final_state().unwrap();
        assert_eq!(state.glucose, 30.0);
        assert_eq!(state.heart_rate, 36.0);
        assert!(Trajectory::default().final_state().is_err());
    }
}
