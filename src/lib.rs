//! Patient digital-twin simulator: glucose-insulin regulation, drug
//! pharmacokinetics, inflammation and cardiovascular response integrated as
//! one ODE system, with clinical metrics and interaction screening on top.

pub mod analysis;
pub mod config;
pub mod dosing;
pub mod error;
pub mod models;
pub mod output;
pub mod patient;
pub mod simulation;
pub mod solver;

pub use config::ScenarioConfig;
pub use dosing::{MealEvent, MedicationEvent, Schedule};
pub use error::{BiosimError, BiosimResult};
pub use models::DrugType;
pub use patient::{PatientParameters, StateVector};
pub use simulation::{simulate, Metrics, SimulationOutcome, Simulator, Trajectory, Variable};
