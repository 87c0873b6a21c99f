use crate::dosing::Schedule;
use crate::error::BiosimResult;
use crate::patient::{PatientParameters, StateVector};
use crate::simulation::{Metrics, Simulator};
use crate::solver::SolverOptions;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

/// Serializable capture of a digital twin between sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwinSnapshot {
    pub id: String,
    pub saved_at: DateTime<Utc>,
    pub params: PatientParameters,
    pub state: StateVector,
    #[serde(default)]
    pub metrics: Option<Metrics>,
    #[serde(default)]
    pub schedule: Option<Schedule>,
    #[serde(default)]
    pub duration: Option<f64>,
}

impl TwinSnapshot {
    pub fn capture(id: impl Into<String>, simulator: &Simulator) -> Self {
        let outcome = simulator.last_outcome();
        Self {
            id: id.into(),
            saved_at: Utc::now(),
            params: simulator.params().clone(),
            state: *simulator.state(),
            metrics: outcome.map(|o| o.metrics.clone()),
            schedule: outcome.map(|o| o.schedule.clone()),
            duration: outcome.map(|o| o.duration),
        }
    }

    pub fn to_json(&self) -> BiosimResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(content: &str) -> BiosimResult<Self> {
        let snapshot: TwinSnapshot = serde_json::from_str(content)?;
        snapshot.params.validate()?;
        snapshot.state.validate()?;
        if let Some(schedule) = &snapshot.schedule {
            schedule.validate()?;
        }
        Ok(snapshot)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> BiosimResult<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> BiosimResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Rebuild a simulator resting at the captured state.
    pub fn restore(&self, options: SolverOptions) -> BiosimResult<Simulator> {
        Simulator::with_state(self.params.clone(), self.state, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dosing::MealEvent;
    use crate::error::BiosimError;
    use approx::assert_relative_eq;

    fn assert_same_snapshot(a: &TwinSnapshot, b: &TwinSnapshot) {
        assert_eq!(a.id, b.id);
        assert_eq!(a.saved_at, b.saved_at);
        assert_eq!(a.params, b.params);
        assert_eq!(a.schedule, b.schedule);
        assert_eq!(a.duration, b.duration);
        for (x, y) in a.state.to_array().iter().zip(b.state.to_array().iter()) {
            assert_relative_eq!(x, y, max_relative = 1e-12);
        }
        assert_relative_eq!(
            a.metrics.as_ref().map_or(0.0, |m| m.health_score),
            b.metrics.as_ref().map_or(0.0, |m| m.health_score),
            max_relative = 1e-12
        );
    }

    fn simulated_twin() -> Simulator {
        let options = SolverOptions {
            samples_per_hour: 10.0,
            ..Default::default()
        };
        let mut sim = Simulator::new(PatientParameters::default(), options).unwrap();
        sim.simulate(6.0, Vec::new(), Some(Vec::new())).unwrap();
        sim
    }

    #[test]
    fn test_capture_and_restore() {
        let sim = simulated_twin();
        let snapshot = TwinSnapshot::capture("twin-001", &sim);
        assert_eq!(snapshot.duration, Some(6.0));
        assert!(snapshot.metrics.is_some());

        let restored = TwinSnapshot::from_json(&snapshot.to_json().unwrap()).unwrap();
        assert_same_snapshot(&restored, &snapshot);

        let twin = snapshot.restore(SolverOptions::default()).unwrap();
        assert_eq!(twin.state(), sim.state());
        assert_eq!(twin.params(), sim.params());
        assert!(twin.last_outcome().is_none());
    }

    #[test]
    fn test_fresh_twin_has_no_outcome() {
        let sim = Simulator::new(PatientParameters::default(), SolverOptions::default()).unwrap();
        let snapshot = TwinSnapshot::capture("fresh", &sim);
        assert!(snapshot.metrics.is_none());
        assert!(snapshot.schedule.is_none());
        assert_eq!(snapshot.state, PatientParameters::default().initial_state());
    }

    #[test]
    fn test_file_round_trip() {
        let sim = simulated_twin();
        let snapshot = TwinSnapshot::capture("twin-file", &sim);
        let path = std::env::temp_dir().join(format!("biosim_snapshot_{}.json", std::process::id()));

        snapshot.save(&path).unwrap();
        let loaded = TwinSnapshot::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_same_snapshot(&loaded, &snapshot);
    }

    #[test]
    fn test_rejects_corrupt_snapshot() {
        let sim = simulated_twin();
        let mut snapshot = TwinSnapshot::capture("bad", &sim);
        snapshot.params.weight = -3.0;
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(matches!(
            TwinSnapshot::from_json(&json),
            Err(BiosimError::Validation(_))
        ));
    }

    #[test]
    fn test_rejects_corrupt_schedule() {
        let sim = simulated_twin();
        let mut snapshot = TwinSnapshot::capture("bad-meal", &sim);
        snapshot.schedule = Some(Schedule {
            medications: Vec::new(),
            meals: vec![MealEvent::new(-1.0, 40.0)],
        });
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(matches!(
            TwinSnapshot::from_json(&json),
            Err(BiosimError::InvalidDosing(_))
        ));
    }
}
