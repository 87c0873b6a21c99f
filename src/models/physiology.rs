//! Coupled glucose-insulin, drug, immune and cardiovascular dynamics.
//!
//! State layout (see [`StateVector`](crate::patient::StateVector)):
//!
//! | index | variable        | unit  |
//! |-------|-----------------|-------|
//! | 0     | glucose         | mg/dL |
//! | 1     | insulin         | mU/L  |
//! | 2     | drug in plasma  |       |
//! | 3     | drug in tissue  |       |
//! | 4     | immune cells    | %     |
//! | 5     | inflammation    |       |
//! | 6     | heart rate      | bpm   |
//! | 7     | blood pressure  | mmHg  |

use super::{ActiveDose, DrugType, Interaction};
use crate::patient::{PatientParameters, N_STATES};

const K_INSULIN_SECRETION: f64 = 0.05;
const K_DRUG_ABSORPTION: f64 = 0.1;
const K_DRUG_DISTRIBUTION: f64 = 0.05;
const TISSUE_BACKFLOW_RATIO: f64 = 0.2;
const K_DRUG_ELIMINATION: f64 = 0.02;
const K_INFLAMMATION_DECAY: f64 = 0.01;
const K_HEART_RATE_RECOVERY: f64 = 0.05;
const K_BLOOD_PRESSURE_RECOVERY: f64 = 0.02;
const IMMUNE_SETPOINT: f64 = 100.0;
const MASKING_FACTOR: f64 = 1.2;
const EFFICACY_REDUCTION: f64 = 0.8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActiveInteractions {
    pub hypoglycemia_masking: bool,
    pub reduced_efficacy: bool,
}

impl ActiveInteractions {
    pub fn is_empty(&self) -> bool {
        !self.hypoglycemia_masking && !self.reduced_efficacy
    }

    pub fn iter(&self) -> impl Iterator<Item = Interaction> {
        let masking = self
            .hypoglycemia_masking
            .then_some(Interaction::HypoglycemiaMasking);
        let efficacy = self
            .reduced_efficacy
            .then_some(Interaction::ReducedAntidiabeticEfficacy);
        masking.into_iter().chain(efficacy)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct DoseTotals {
    dose: [f64; 4],
    present: [bool; 4],
}

impl DoseTotals {
    fn from_active(medications: &[ActiveDose]) -> Self {
        let mut totals = Self::default();
        for med in medications {
            let idx = med.drug_type.index();
            totals.dose[idx] += med.dose;
            totals.present[idx] = true;
        }
        totals
    }

    fn has(&self, drug: DrugType) -> bool {
        self.present[drug.index()]
    }

    fn dose(&self, drug: DrugType) -> f64 {
        self.dose[drug.index()]
    }

    fn total(&self) -> f64 {
        self.dose.iter().sum()
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct EffectGains {
    glucose: f64,
    immune: f64,
    heart: f64,
    blood_pressure: f64,
}

impl EffectGains {
    fn from_totals(totals: &DoseTotals) -> Self {
        let mut gains = Self::default();
        for drug in DrugType::ALL {
            if !totals.has(drug) {
                continue;
            }
            let units = totals.dose(drug) / 10.0;
            match drug {
                DrugType::Antidiabetic => gains.glucose += 0.1 * units,
                DrugType::Antiinflammatory => gains.immune += 0.05 * units,
                DrugType::BetaBlocker => {
                    gains.heart += 0.08 * units;
                    gains.blood_pressure += 0.05 * units;
                }
                DrugType::Vasodilator => gains.blood_pressure += 0.1 * units,
            }
        }
        gains
    }
}

#[derive(Debug, Clone)]
pub struct PhysiologicalModel {
    params: PatientParameters,
}

impl PhysiologicalModel {
    pub fn new(params: PatientParameters) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &PatientParameters {
        &self.params
    }

    /// Evaluate `dy/dt` at `(t, y)` given the medications active at `t` and the
    /// carbohydrate load (g) of any meal being absorbed.
    pub fn derivatives(
        &self,
        _t: f64,
        y: &[f64; N_STATES],
        medications: &[ActiveDose],
        meal_carbs: f64,
    ) -> ([f64; N_STATES], ActiveInteractions) {
        let p = &self.params;
        let [glucose, insulin, drug_plasma, drug_tissue, immune_cells, inflammation, heart_rate, blood_pressure] =
            *y;

        let totals = DoseTotals::from_active(medications);
        let mut gains = EffectGains::from_totals(&totals);

        let mut interactions = ActiveInteractions::default();
        let mut interaction_factor = 1.0;
        if totals.has(DrugType::Antidiabetic) && totals.has(DrugType::BetaBlocker) {
            interaction_factor = MASKING_FACTOR;
            interactions.hypoglycemia_masking = true;
        }
        if totals.has(DrugType::Antiinflammatory) && totals.has(DrugType::Antidiabetic) {
            gains.glucose *= EFFICACY_REDUCTION;
            interactions.reduced_efficacy = true;
        }

        let k_glucose_insulin = 0.001 * p.insulin_sensitivity;
        let k_elimination = K_DRUG_ELIMINATION * p.renal_function * p.liver_function;
        let k_immune_inflammation = 0.02 * p.immune_response;

        let dglucose = meal_carbs * p.glucose_absorption + p.hepatic_glucose
            - k_glucose_insulin * glucose * insulin
            - gains.glucose * drug_tissue * interaction_factor;

        let dinsulin =
            K_INSULIN_SECRETION * (glucose - 100.0).max(0.0) - p.insulin_clearance * insulin;

        let backflow = K_DRUG_DISTRIBUTION * TISSUE_BACKFLOW_RATIO * drug_tissue;
        let ddrug_plasma = totals.total() * K_DRUG_ABSORPTION - K_DRUG_DISTRIBUTION * drug_plasma
            + backflow
            - k_elimination * drug_plasma;
        let ddrug_tissue = K_DRUG_DISTRIBUTION * drug_plasma - backflow;

        let dimmune = 0.01 * (IMMUNE_SETPOINT - immune_cells) + 0.001 * inflammation
            - gains.immune * drug_tissue * immune_cells / 100.0;

        let hyperglycemic_drive = if glucose > 100.0 {
            0.1 * (glucose - 100.0) / 100.0
        } else {
            0.0
        };
        let dinflammation = hyperglycemic_drive + k_immune_inflammation * immune_cells * 0.01
            - K_INFLAMMATION_DECAY * inflammation
            - gains.immune * drug_tissue * inflammation / 50.0;

        let hypoglycemic_stress = if glucose < 70.0 {
            0.1 * (70.0 - glucose)
        } else {
            0.0
        };
        let dheart_rate = hypoglycemic_stress + 0.05 * inflammation / 10.0
            - gains.heart * drug_tissue
            + K_HEART_RATE_RECOVERY * (p.heart_rate - heart_rate);

        let dblood_pressure = 0.2 * inflammation / 10.0 - gains.blood_pressure * drug_tissue
            + K_BLOOD_PRESSURE_RECOVERY * (p.blood_pressure - blood_pressure);

        (
            [
                dglucose,
                dinsulin,
                ddrug_plasma,
                ddrug_tissue,
                dimmune,
                dinflammation,
                dheart_rate,
                dblood_pressure,
            ],
            interactions,
        )
    }
}
