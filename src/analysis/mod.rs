pub mod alerts;
pub mod clinical;
pub mod impact;

pub use alerts::{scan_alerts, Alert, AlertKind, AlertThresholds, Bounds};
pub use clinical::{compare_with_observations, FitMetrics, Observation};
pub use impact::{assess_interventions, InterventionImpact};
