pub mod pharmacology;
pub mod physiology;

use crate::error::BiosimError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use pharmacology::{
    catalog_entry, interaction_rule, screen_drug_types, DrugInfo, Interaction, InteractionRule,
    Severity,
};
pub use physiology::{ActiveInteractions, PhysiologicalModel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrugType {
    Antidiabetic,
    Antiinflammatory,
    BetaBlocker,
    Vasodilator,
}

impl DrugType {
    pub const ALL: [DrugType; 4] = [
        DrugType::Antidiabetic,
        DrugType::Antiinflammatory,
        DrugType::BetaBlocker,
        DrugType::Vasodilator,
    ];

    /// Dense index used by the per-type tables.
    pub fn index(self) -> usize {
        match self {
            DrugType::Antidiabetic => 0,
            DrugType::Antiinflammatory => 1,
            DrugType::BetaBlocker => 2,
            DrugType::Vasodilator => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DrugType::Antidiabetic => "antidiabetic",
            DrugType::Antiinflammatory => "antiinflammatory",
            DrugType::BetaBlocker => "beta_blocker",
            DrugType::Vasodilator => "vasodilator",
        }
    }
}

impl fmt::Display for DrugType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DrugType {
    type Err = BiosimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DrugType::ALL
            .iter()
            .copied()
            .find(|drug| drug.as_str() == s)
            .ok_or_else(|| BiosimError::UnknownDrugType(s.to_string()))
    }
}

/// A medication dose whose activation window contains the current time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveDose {
    pub drug_type: DrugType,
    pub dose: f64, // mg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drug_type_tags() {
        for drug in DrugType::ALL {
            assert_eq!(drug.as_str().parse::<DrugType>().unwrap(), drug);
            let json = serde_json::to_string(&drug).unwrap();
            assert_eq!(json, format!("\"{}\"", drug.as_str()));
        }
        assert!(matches!(
            "insulin".parse::<DrugType>(),
            Err(BiosimError::UnknownDrugType(_))
        ));
        assert!(serde_json::from_str::<DrugType>("\"statin\"").is_err());
    }
}
