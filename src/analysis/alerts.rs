use crate::error::{BiosimError, BiosimResult};
use crate::simulation::{Trajectory, Variable};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub low: f64,
    pub high: f64,
}

impl Bounds {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }
}

/// Monitoring limits per variable; `None` disables monitoring of that variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    pub glucose: Option<Bounds>,
    pub insulin: Option<Bounds>,
    pub heart_rate: Option<Bounds>,
    pub blood_pressure: Option<Bounds>,
    pub inflammation: Option<Bounds>,
    pub drug_plasma: Option<Bounds>,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            glucose: Some(Bounds::new(70.0, 180.0)),
            insulin: Some(Bounds::new(5.0, 30.0)),
            heart_rate: Some(Bounds::new(50.0, 100.0)),
            blood_pressure: Some(Bounds::new(90.0, 140.0)),
            inflammation: Some(Bounds::new(0.0, 15.0)),
            drug_plasma: Some(Bounds::new(0.0, 15.0)),
        }
    }
}

impl AlertThresholds {
    pub fn bounds(&self, variable: Variable) -> Option<Bounds> {
        match variable {
            Variable::Glucose => self.glucose,
            Variable::Insulin => self.insulin,
            Variable::HeartRate => self.heart_rate,
            Variable::BloodPressure => self.blood_pressure,
            Variable::Inflammation => self.inflammation,
            Variable::DrugPlasma => self.drug_plasma,
            Variable::DrugTissue | Variable::ImmuneCells => None,
        }
    }

    pub fn validate(&self) -> BiosimResult<()> {
        for variable in Variable::ALL {
            if let Some(bounds) = self.bounds(variable) {
                if !bounds.low.is_finite() || !bounds.high.is_finite() || bounds.low > bounds.high {
                    return Err(BiosimError::Validation(format!(
                        "Alert bounds for {} must be finite with low <= high",
                        variable
                    )));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Low,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub time: f64,
    pub variable: Variable,
    pub value: f64,
    pub threshold: f64,
    pub kind: AlertKind,
}

impl Alert {
    pub fn message(&self) -> String {
        let label = match self.kind {
            AlertKind::Low => "low",
            AlertKind::High => "high",
        };
        format!(
            "{} {}: {:.1} {} (threshold: {} {})",
            self.variable,
            label,
            self.value,
            self.variable.unit(),
            self.threshold,
            self.variable.unit()
        )
    }
}

/// One alert per sample strictly outside the monitored bounds, ordered by time
/// then variable.
pub fn scan_alerts(trajectory: &Trajectory, thresholds: &AlertThresholds) -> Vec<Alert> {
    let mut alerts = Vec::new();
    for (idx, &time) in trajectory.time.iter().enumerate() {
        for variable in Variable::ALL {
            let Some(bounds) = thresholds.bounds(variable) else {
                continue;
            };
            let value = trajectory.series(variable)[idx];
            let hit = if value < bounds.low {
                Some((AlertKind::Low, bounds.low))
            } else if value > bounds.high {
                Some((AlertKind::High, bounds.high))
            } else {
                None
            };
            if let Some((kind, threshold)) = hit {
                alerts.push(Alert {
                    time,
                    variable,
                    value,
                    threshold,
                    kind,
                });
            }
        }
    }
    alerts
}
