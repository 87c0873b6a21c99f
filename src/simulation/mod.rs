pub mod metrics;
pub mod population;
pub mod trajectory;
pub mod variability;

use crate::dosing::{MealEvent, MedicationEvent, Schedule};
use crate::error::{BiosimError, BiosimResult};
use crate::models::{interaction_rule, PhysiologicalModel};
use crate::patient::{PatientParameters, StateVector, N_STATES};
use crate::solver::{euler_step, rk45_on_grid, OdeSystem, SolverOptions};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

pub use metrics::{Metrics, MetricsComparison};
pub use population::*;
pub use trajectory::{Trajectory, Variable};
pub use variability::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub time: f64,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutcome {
    pub duration: f64,
    pub schedule: Schedule,
    pub trajectory: Trajectory,
    pub intervention_log: Vec<LogEntry>,
    pub interaction_log: Vec<LogEntry>,
    pub metrics: Metrics,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepUpdate {
    pub time: f64,
    pub state: StateVector,
    pub interventions: Vec<LogEntry>,
    pub interactions: Vec<LogEntry>,
}

/// Event-aware right-hand side: looks up the meals and medications whose
/// activation window contains `t`, feeds them to the model, and logs every
/// activation and interaction it sees.
struct EventDrivenSystem<'a> {
    model: &'a PhysiologicalModel,
    schedule: &'a Schedule,
    interventions: Vec<LogEntry>,
    interactions: Vec<LogEntry>,
}

impl<'a> EventDrivenSystem<'a> {
    fn new(model: &'a PhysiologicalModel, schedule: &'a Schedule) -> Self {
        Self {
            model,
            schedule,
            interventions: Vec::new(),
            interactions: Vec::new(),
        }
    }
}

impl OdeSystem for EventDrivenSystem<'_> {
    fn ndim(&self) -> usize {
        N_STATES
    }

    fn rhs(&mut self, t: f64, y: &[f64], dydt: &mut [f64]) {
        let inputs = self.schedule.active_at(t);
        for med in &inputs.medications {
            self.interventions.push(LogEntry {
                time: t,
                description: format!("Medication: {} - {} mg", med.drug_type, med.dose),
            });
        }
        for carbs in &inputs.meals {
            self.interventions.push(LogEntry {
                time: t,
                description: format!("Meal: {} g", carbs),
            });
        }

        let mut state = [0.0; N_STATES];
        state.copy_from_slice(y);
        let (derivatives, interactions) =
            self.model
                .derivatives(t, &state, &inputs.medications, inputs.meal_carbs());

        for interaction in interactions.iter() {
            self.interactions.push(LogEntry {
                time: t,
                description: interaction_rule(interaction).description.to_string(),
            });
        }
        dydt.copy_from_slice(&derivatives);
    }
}

pub fn validate_duration(duration: f64) -> BiosimResult<()> {
    if !duration.is_finite() || duration <= 0.0 {
        return Err(BiosimError::Validation(format!(
            "Simulation duration must be a positive number of hours, got {}",
            duration
        )));
    }
    Ok(())
}

/// Digital twin of one patient: immutable parameters plus a resting state
/// that carries over from one run to the next.
pub struct Simulator {
    model: PhysiologicalModel,
    state: StateVector,
    options: SolverOptions,
    clock: f64,
    last_outcome: Option<SimulationOutcome>,
}

impl Simulator {
    pub fn new(params: PatientParameters, options: SolverOptions) -> BiosimResult<Self> {
        let state = params.initial_state();
        Self::with_state(params, state, options)
    }

    pub fn with_state(
        params: PatientParameters,
        state: StateVector,
        options: SolverOptions,
    ) -> BiosimResult<Self> {
        params.validate()?;
        state.validate()?;
        options.validate()?;

        Ok(Self {
            model: PhysiologicalModel::new(params),
            state,
            options,
            clock: 0.0,
            last_outcome: None,
        })
    }

    pub fn params(&self) -> &PatientParameters {
        self.model.params()
    }

    pub fn state(&self) -> &StateVector {
        &self.state
    }

    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    pub fn last_outcome(&self) -> Option<&SimulationOutcome> {
        self.last_outcome.as_ref()
    }

    /// Run over `[0, duration]` hours. `meals: None` uses the default meal plan;
    /// `Some(vec![])` simulates fasting.
    pub fn simulate(
        &mut self,
        duration: f64,
        medications: Vec<MedicationEvent>,
        meals: Option<Vec<MealEvent>>,
    ) -> BiosimResult<SimulationOutcome> {
        let schedule = Schedule::new(medications, meals)?;
        self.run(duration, &schedule)
    }

    pub fn run(&mut self, duration: f64, schedule: &Schedule) -> BiosimResult<SimulationOutcome> {
        validate_duration(duration)?;
        schedule.validate()?;

        info!(
            "Simulating {} h with {} medication(s) and {} meal(s)",
            duration,
            schedule.medications.len(),
            schedule.meals.len()
        );
        for rule in schedule.screen_interactions() {
            warn!("{} ({} severity)", rule.description, rule.severity);
        }

        let grid = self.options.output_grid(duration);
        let mut system = EventDrivenSystem::new(&self.model, schedule);
        let solution = rk45_on_grid(&mut system, &self.state.to_array(), &grid, &self.options)?;
        let EventDrivenSystem {
            interventions,
            interactions,
            ..
        } = system;

        let trajectory = Trajectory::from_solution(&solution)?;
        let final_state = trajectory.final_state()?;
        let metrics = Metrics::from_trajectory(&trajectory);

        debug!(
            "{} intervention and {} interaction log entries",
            interventions.len(),
            interactions.len()
        );
        info!(
            "Simulation completed: {} samples, health score {:.1}",
            trajectory.len(),
            metrics.health_score
        );

        self.state = final_state;
        self.clock = duration;
        let outcome = SimulationOutcome {
            duration,
            schedule: schedule.clone(),
            trajectory,
            intervention_log: interventions,
            interaction_log: interactions,
            metrics,
        };
        self.last_outcome = Some(outcome.clone());
        Ok(outcome)
    }

    /// Advance the resting state by one explicit Euler step of `dt` hours from
    /// the internal clock, using the same event-aware dynamics as [`run`](Self::run).
    /// After a run the clock sits at that run's duration.
    pub fn step(&mut self, dt: f64, schedule: &Schedule) -> BiosimResult<StepUpdate> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(BiosimError::Validation(format!(
                "Step size must be a positive number of hours, got {}",
                dt
            )));
        }

        let t = self.clock;
        let mut y = self.state.to_array();
        let mut system = EventDrivenSystem::new(&self.model, schedule);
        euler_step(&mut system, t, &mut y, dt);

        let state = StateVector::from_slice(&y)?;
        if state.validate().is_err() {
            return Err(BiosimError::SimulationFailed {
                time: t,
                reason: "state became non-finite".to_string(),
            });
        }

        self.state = state;
        self.clock = t + dt;
        Ok(StepUpdate {
            time: self.clock,
            state,
            interventions: system.interventions,
            interactions: system.interactions,
        })
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn reset_clock(&mut self) {
        self.clock = 0.0;
    }
}

/// One-shot simulation: `initial_state: None` starts from the patient's resting state.
pub fn simulate(
    params: PatientParameters,
    initial_state: Option<StateVector>,
    duration: f64,
    medications: Vec<MedicationEvent>,
    meals: Option<Vec<MealEvent>>,
) -> BiosimResult<SimulationOutcome> {
    let state = initial_state.unwrap_or_else(|| params.initial_state());
    let mut simulator = Simulator::with_state(params, state, SolverOptions::default())?;
    simulator.simulate(duration, medications, meals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DrugType;
    use crate::patient::find_profile;
    use approx::assert_relative_eq;

    fn normal() -> PatientParameters {
        find_profile("normal").unwrap().params.clone()
    }

    #[test]
    fn test_rejects_invalid_duration() {
        let mut simulator = Simulator::new(normal(), SolverOptions::default()).unwrap();
        for duration in [0.0, -4.0, f64::NAN, f64::INFINITY] {
            let result = simulator.simulate(duration, vec![], Some(vec![]));
            assert!(matches!(result, Err(BiosimError::Validation(_))));
        }
        assert!(simulator.last_outcome().is_none());
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        let params = PatientParameters {
            hepatic_glucose: f64::INFINITY,
            ..normal()
        };
        assert!(Simulator::new(params, SolverOptions::default()).is_err());
    }

    #[test]
    fn test_time_axis_spans_duration() {
        let outcome = simulate(normal(), None, 6.0, vec![], Some(vec![])).unwrap();
        let time = &outcome.trajectory.time;
        assert_eq!(time.len(), 600);
        assert_eq!(time[0], 0.0);
        assert_eq!(*time.last().unwrap(), 6.0);
        assert!(time.windows(2).all(|w| w[1] > w[0]));
        for variable in Variable::ALL {
            assert_eq!(outcome.trajectory.series(variable).len(), 600);
        }
    }

    #[test]
    fn test_resting_state_carries_over() {
        let mut simulator = Simulator::new(normal(), SolverOptions::default()).unwrap();
        let first = simulator.simulate(4.0, vec![], Some(vec![])).unwrap();
        let end = first.trajectory.final_state().unwrap();
        assert_eq!(*simulator.state(), end);

        let second = simulator.simulate(4.0, vec![], Some(vec![])).unwrap();
        assert_eq!(second.trajectory.glucose[0], end.glucose);
        assert_eq!(second.trajectory.inflammation[0], end.inflammation);
        assert_eq!(simulator.last_outcome(), Some(&second));
    }

    #[test]
    fn test_logs_are_reset_between_runs() {
        let mut simulator = Simulator::new(normal(), SolverOptions::default()).unwrap();
        let meds = vec![
            MedicationEvent::new(1.0, DrugType::Antidiabetic, 10.0),
            MedicationEvent::new(1.0, DrugType::BetaBlocker, 10.0),
        ];
        let first = simulator.simulate(3.0, meds, Some(vec![])).unwrap();
        assert!(!first.interaction_log.is_empty());
        assert!(!first.intervention_log.is_empty());

        let second = simulator.simulate(3.0, vec![], Some(vec![])).unwrap();
        assert!(second.interaction_log.is_empty());
        assert!(second.intervention_log.is_empty());
    }

    #[test]
    fn test_activations_are_logged_inside_window() {
        let outcome = simulate(
            normal(),
            None,
            4.0,
            vec![MedicationEvent::new(2.0, DrugType::Vasodilator, 20.0)],
            Some(vec![MealEvent::new(1.0, 50.0)]),
        )
        .unwrap();

        let meals: Vec<_> = outcome
            .intervention_log
            .iter()
            .filter(|e| e.description == "Meal: 50 g")
            .collect();
        let doses: Vec<_> = outcome
            .intervention_log
            .iter()
            .filter(|e| e.description == "Medication: vasodilator - 20 mg")
            .collect();
        assert!(meals.len() > 1, "meal activation is logged at every evaluation");
        assert!(meals.iter().all(|e| (e.time - 1.0).abs() < 0.1));
        assert!(!doses.is_empty());
        assert!(doses.iter().all(|e| (e.time - 2.0).abs() < 0.1));
    }

    #[test]
    fn test_incremental_steps() {
        let mut simulator = Simulator::new(normal(), SolverOptions::default()).unwrap();
        let schedule = Schedule::new(vec![], Some(vec![MealEvent::new(0.0, 60.0)])).unwrap();

        let first = simulator.step(0.05, &schedule).unwrap();
        assert_eq!(first.time, 0.05);
        assert_eq!(first.interventions.len(), 1);
        // (60 * 0.02 + 0.7 - 1.2) * 0.05
        assert!((first.state.glucose - (100.0 + 0.035)).abs() < 1e-9);
        assert_eq!(*simulator.state(), first.state);

        let second = simulator.step(0.05, &schedule).unwrap();
        assert!((second.time - 0.1).abs() < 1e-12);

        simulator.reset_clock();
        assert_eq!(simulator.clock(), 0.0);
        assert!(simulator.step(0.0, &schedule).is_err());
    }

    #[test]
    fn test_steps_continue_after_run() {
        let mut simulator = Simulator::new(normal(), SolverOptions::default()).unwrap();
        let schedule = Schedule::new(vec![], Some(vec![MealEvent::new(0.0, 60.0)])).unwrap();
        simulator.run(2.0, &schedule).unwrap();
        assert_eq!(simulator.clock(), 2.0);

        let update = simulator.step(0.05, &schedule).unwrap();
        assert_relative_eq!(update.time, 2.05, epsilon = 1e-12);
        assert!(update.interventions.is_empty());
    }

    fn meal_effect(samples_per_hour: f64) -> f64 {
        let options = SolverOptions {
            samples_per_hour,
            ..Default::default()
        };
        let end_glucose = |meals: Vec<MealEvent>| {
            let mut simulator = Simulator::new(normal(), options.clone()).unwrap();
            let outcome = simulator.simulate(12.0, vec![], Some(meals)).unwrap();
            *outcome.trajectory.glucose.last().unwrap()
        };
        end_glucose(vec![MealEvent::new(7.65, 80.0)]) - end_glucose(vec![])
    }

    #[test]
    fn test_meal_effect_independent_of_grid_density() {
        let reference = meal_effect(100.0);
        assert!(reference > 0.2);
        for samples_per_hour in [0.5, 2.0, 4.0] {
            assert_relative_eq!(meal_effect(samples_per_hour), reference, max_relative = 0.05);
        }
    }
}
