pub mod snapshot;

pub use snapshot::TwinSnapshot;

use crate::analysis::{Alert, AlertKind, InterventionImpact};
use crate::error::BiosimResult;
use crate::models::catalog_entry;
use crate::simulation::{CohortResult, LogEntry, SimulationOutcome, Variable};
use log::info;
use std::fs::File;
use std::path::Path;

/// Everything written for one simulated scenario.
pub struct ScenarioReport<'a> {
    pub outcome: &'a SimulationOutcome,
    pub alerts: &'a [Alert],
    pub impacts: &'a [InterventionImpact],
}

pub fn save_results<P: AsRef<Path>>(report: &ScenarioReport<'_>, output_dir: P) -> BiosimResult<()> {
    let output_path = output_dir.as_ref();
    let outcome = report.outcome;

    save_trajectory(outcome, &output_path.join("trajectory.csv"))?;
    save_log(&outcome.intervention_log, &output_path.join("interventions.csv"))?;
    save_log(&outcome.interaction_log, &output_path.join("interactions.csv"))?;
    save_alerts(report.alerts, &output_path.join("alerts.csv"))?;
    save_impacts(report.impacts, &output_path.join("impacts.csv"))?;

    let file = File::create(output_path.join("metrics.json"))?;
    serde_json::to_writer_pretty(file, &outcome.metrics)?;

    generate_report(report, output_path)?;

    info!("All results saved to {:?}", output_path);
    Ok(())
}

fn save_trajectory<P: AsRef<Path>>(outcome: &SimulationOutcome, path: P) -> BiosimResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    let trajectory = &outcome.trajectory;

    let mut header = vec!["time".to_string()];
    header.extend(Variable::ALL.iter().map(|v| v.as_str().to_string()));
    writer.write_record(&header)?;

    for (i, t) in trajectory.time.iter().enumerate() {
        let mut record = vec![t.to_string()];
        for variable in Variable::ALL {
            record.push(trajectory.series(variable)[i].to_string());
        }
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

fn save_log<P: AsRef<Path>>(entries: &[LogEntry], path: P) -> BiosimResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["time", "description"])?;
    for entry in entries {
        writer.write_record(&[entry.time.to_string(), entry.description.clone()])?;
    }
    writer.flush()?;
    Ok(())
}

fn save_alerts<P: AsRef<Path>>(alerts: &[Alert], path: P) -> BiosimResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["time", "variable", "value", "threshold", "kind", "message"])?;
    for alert in alerts {
        let kind = match alert.kind {
            AlertKind::Low => "low",
            AlertKind::High => "high",
        };
        writer.write_record(&[
            alert.time.to_string(),
            alert.variable.as_str().to_string(),
            alert.value.to_string(),
            alert.threshold.to_string(),
            kind.to_string(),
            alert.message(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn save_impacts<P: AsRef<Path>>(impacts: &[InterventionImpact], path: P) -> BiosimResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["time", "intervention", "variable", "horizon", "change"])?;
    for impact in impacts {
        writer.write_record(&[
            impact.time.to_string(),
            impact.label.clone(),
            impact.variable.as_str().to_string(),
            impact.horizon.to_string(),
            impact.change.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn save_cohort<P: AsRef<Path>>(cohort: &CohortResult, output_dir: P) -> BiosimResult<()> {
    let output_path = output_dir.as_ref();
    let mut writer = csv::Writer::from_path(output_path.join("cohort.csv"))?;

    writer.write_record([
        "patient_id",
        "insulin_sensitivity",
        "hepatic_glucose",
        "renal_function",
        "liver_function",
        "glucose_mean",
        "percent_in_range",
        "drug_exposure",
        "health_score",
    ])?;
    for member in &cohort.members {
        writer.write_record(&[
            member.patient_id.to_string(),
            member.params.insulin_sensitivity.to_string(),
            member.params.hepatic_glucose.to_string(),
            member.params.renal_function.to_string(),
            member.params.liver_function.to_string(),
            member.metrics.glucose_mean.to_string(),
            member.metrics.percent_in_range.to_string(),
            member.metrics.drug_exposure.to_string(),
            member.metrics.health_score.to_string(),
        ])?;
    }
    writer.flush()?;

    let file = File::create(output_path.join("cohort_summary.json"))?;
    serde_json::to_writer_pretty(file, &cohort.summary)?;

    info!("Cohort results saved to {:?}", output_path);
    Ok(())
}

pub fn generate_report<P: AsRef<Path>>(report: &ScenarioReport<'_>, output_dir: P) -> BiosimResult<()> {
    let report_path = output_dir.as_ref().join("simulation_report.md");
    let outcome = report.outcome;
    let m = &outcome.metrics;

    let interactions = if outcome.interaction_log.is_empty() {
        "- None detected\n".to_string()
    } else {
        let mut seen: Vec<&str> = Vec::new();
        for entry in &outcome.interaction_log {
            if !seen.contains(&entry.description.as_str()) {
                seen.push(&entry.description);
            }
        }
        seen.iter().map(|d| format!("- {}\n", d)).collect()
    };

    let medications: String = outcome
        .schedule
        .medications
        .iter()
        .map(|med| {
            let info = catalog_entry(med.drug_type);
            format!(
                "- {:.1} h: {} {} mg (acts on {})\n",
                med.time, info.name, med.dose_mg, info.primary_effect
            )
        })
        .collect();

    let screening: String = outcome
        .schedule
        .screen_interactions()
        .iter()
        .map(|rule| format!("- [{}] {}. {}\n", rule.severity, rule.description, rule.recommendation))
        .collect();

    let impacts: String = report
        .impacts
        .iter()
        .map(|i| {
            format!(
                "- {:.1} h {}: {} {:+.2} {} over {:.0} h\n",
                i.time,
                i.label,
                i.variable,
                i.change,
                i.variable.unit(),
                i.horizon
            )
        })
        .collect();

    let report_content = format!(
        r#"# Patient Simulation Report

## Scenario
- **Duration**: {:.1} h
- **Samples**: {}
- **Medications**: {}
- **Meals**: {}

## Glucose Control
- Mean: {:.1} mg/dL (min {:.1}, max {:.1})
- Variability (SD): {:.2} mg/dL
- Time in range (70-180): {:.1}%
- Time hyperglycemic: {:.1}%
- Time hypoglycemic: {:.1}%

## Drug and Systemic Load
- Drug exposure (plasma AUC): {:.3}
- Inflammation burden: {:.3}
- Heart-rate variability (SD): {:.3} bpm
- Blood-pressure variability (SD): {:.3} mmHg

## Health Score
**{:.1} / 100**

## Medications
{}
## Drug Interactions
Observed during integration:
{}
Regimen screening:
{}
## Intervention Impact
{}
## Alerts
- {} out-of-range excursion(s)

## Files Generated
- `trajectory.csv`: state trajectory on the output grid
- `interventions.csv`, `interactions.csv`: event logs
- `alerts.csv`: threshold excursions
- `impacts.csv`: per-intervention changes
- `metrics.json`: clinical summary metrics
"#,
        outcome.duration,
        outcome.trajectory.len(),
        outcome.schedule.medications.len(),
        outcome.schedule.meals.len(),
        m.glucose_mean,
        m.glucose_min,
        m.glucose_max,
        m.glucose_variability,
        m.percent_in_range,
        m.percent_hyperglycemia,
        m.percent_hypoglycemia,
        m.drug_exposure,
        m.inflammation_burden,
        m.hr_variability,
        m.bp_variability,
        m.health_score,
        if medications.is_empty() { "- None\n".to_string() } else { medications },
        interactions,
        if screening.is_empty() { "- No known interactions\n".to_string() } else { screening },
        if impacts.is_empty() { "- No interventions\n".to_string() } else { impacts },
        report.alerts.len(),
    );

    std::fs::write(report_path, report_content)?;
    Ok(())
}
