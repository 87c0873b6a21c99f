use thiserror::Error;

#[derive(Error, Debug)]
pub enum BiosimError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Parameter validation error: {0}")]
    Validation(String),

    #[error("Invalid dosing schedule: {0}")]
    InvalidDosing(String),

    #[error("Unknown patient profile: {0}")]
    UnknownProfile(String),

    #[error("Unknown drug type: {0}")]
    UnknownDrugType(String),

    #[error("Simulation failed at t={time:.4} h: {reason}")]
    SimulationFailed { time: f64, reason: String },

    #[error("Random number generation error")]
    Random,
}

pub type BiosimResult<T> = Result<T, BiosimError>;
