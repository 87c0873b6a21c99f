//! Static medication metadata and the drug-drug interaction rule table.
//!
//! Both tables are indexed by [`DrugType`] and never mutated at runtime.

use super::DrugType;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Minor,
    Moderate,
    Major,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Minor => "minor",
            Severity::Moderate => "moderate",
            Severity::Major => "major",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Serialize)]
pub struct DrugInfo {
    pub drug_type: DrugType,
    pub name: &'static str,
    pub description: &'static str,
    pub primary_effect: &'static str,
    pub side_effects: &'static [&'static str],
}

static CATALOG: [DrugInfo; 4] = [
    DrugInfo {
        drug_type: DrugType::Antidiabetic,
        name: "Antidiabetic",
        description: "Lowers blood glucose",
        primary_effect: "glucose",
        side_effects: &["hypoglycemia", "weight gain"],
    },
    DrugInfo {
        drug_type: DrugType::Antiinflammatory,
        name: "Anti-inflammatory",
        description: "Reduces inflammation and relieves pain",
        primary_effect: "inflammation",
        side_effects: &["gastric ulcer", "fluid retention"],
    },
    DrugInfo {
        drug_type: DrugType::BetaBlocker,
        name: "Beta blocker",
        description: "Slows the heart rate and lowers blood pressure",
        primary_effect: "heart rate",
        side_effects: &["fatigue", "masks hypoglycemia symptoms"],
    },
    DrugInfo {
        drug_type: DrugType::Vasodilator,
        name: "Vasodilator",
        description: "Dilates blood vessels and lowers blood pressure",
        primary_effect: "blood pressure",
        side_effects: &["headache", "dizziness"],
    },
];

pub fn catalog_entry(drug_type: DrugType) -> &'static DrugInfo {
    &CATALOG[drug_type.index()]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Interaction {
    HypoglycemiaMasking,
    ReducedAntidiabeticEfficacy,
    ExcessiveHypotension,
}

#[derive(Debug, Serialize)]
pub struct InteractionRule {
    pub interaction: Interaction,
    pub drugs: (DrugType, DrugType),
    pub description: &'static str,
    pub severity: Severity,
    pub recommendation: &'static str,
}

static RULES: [InteractionRule; 3] = [
    InteractionRule {
        interaction: Interaction::HypoglycemiaMasking,
        drugs: (DrugType::Antidiabetic, DrugType::BetaBlocker),
        description: "Interaction: beta blockers can mask the symptoms of hypoglycemia",
        severity: Severity::Moderate,
        recommendation: "Monitor blood glucose closely",
    },
    InteractionRule {
        interaction: Interaction::ReducedAntidiabeticEfficacy,
        drugs: (DrugType::Antidiabetic, DrugType::Antiinflammatory),
        description: "Interaction: anti-inflammatories reduce the efficacy of antidiabetics",
        severity: Severity::Minor,
        recommendation: "Adjust the antidiabetic dose if necessary",
    },
    InteractionRule {
        interaction: Interaction::ExcessiveHypotension,
        drugs: (DrugType::BetaBlocker, DrugType::Vasodilator),
        description: "Interaction: may cause excessive hypotension",
        severity: Severity::Major,
        recommendation: "Avoid this combination or reduce the doses",
    },
];

pub fn interaction_rule(interaction: Interaction) -> &'static InteractionRule {
    match interaction {
        Interaction::HypoglycemiaMasking => &RULES[0],
        Interaction::ReducedAntidiabeticEfficacy => &RULES[1],
        Interaction::ExcessiveHypotension => &RULES[2],
    }
}

/// Every rule whose two drug types both occur in `drug_types`, most severe first.
pub fn screen_drug_types<I>(drug_types: I) -> Vec<&'static InteractionRule>
where
    I: IntoIterator<Item = DrugType>,
{
    let mut present = [false; 4];
    for drug in drug_types {
        present[drug.index()] = true;
    }

    let mut hits: Vec<&'static InteractionRule> = RULES
        .iter()
        .filter(|rule| present[rule.drugs.0.index()] && present[rule.drugs.1.index()])
        .collect();
    hits.sort_by(|a, b| b.severity.cmp(&a.severity));
    hits
}
