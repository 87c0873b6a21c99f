use anyhow::Context;
use biosim::analysis::{assess_interventions, scan_alerts};
use biosim::output::{self, ScenarioReport, TwinSnapshot};
use biosim::simulation::simulate_cohort;
use biosim::{ScenarioConfig, Simulator};
use clap::Parser;
use log::{info, warn};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "biosim")]
#[command(about = "Patient physiological simulator for glucose, drug and cardiovascular response")]
struct Cli {
    /// Scenario file path (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory
    #[arg(short, long)]
    output: PathBuf,

    /// Predefined patient profile (normal, diabetic, elderly, renal, inflammatory)
    #[arg(short, long)]
    profile: Option<String>,

    /// Also simulate a virtual cohort of this many patients
    #[arg(long)]
    cohort: Option<usize>,

    /// Random seed for cohort sampling
    #[arg(short, long)]
    seed: Option<u64>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    }

    let mut config = match &cli.config {
        Some(path) => {
            let config = ScenarioConfig::from_file(path)
                .with_context(|| format!("failed to load scenario {:?}", path))?;
            info!("Loaded scenario from {:?}", path);
            config
        }
        None => ScenarioConfig::default(),
    };
    if let Some(profile) = &cli.profile {
        config = config.with_profile(profile)?;
    }
    if let Some(size) = cli.cohort {
        config = config.with_cohort_size(size, cli.seed)?;
    } else if cli.seed.is_some() && config.cohort.is_none() {
        warn!("--seed has no effect without a cohort");
    }

    let params = config.patient_parameters()?;
    let schedule = config.schedule()?;
    info!(
        "Patient: {} y, {} kg, baseline glucose {} mg/dL",
        params.age, params.weight, params.baseline_glucose
    );

    let mut simulator = Simulator::new(params.clone(), config.solver.clone())?;
    let outcome = simulator
        .run(config.duration_hours, &schedule)
        .context("simulation failed")?;

    let alerts = scan_alerts(&outcome.trajectory, &config.alert_thresholds());
    for alert in alerts.iter().take(10) {
        warn!("{}", alert.message());
    }
    if alerts.len() > 10 {
        warn!("... {} more alert(s)", alerts.len() - 10);
    }
    let impacts = assess_interventions(&outcome.trajectory, &schedule);

    std::fs::create_dir_all(&cli.output)
        .with_context(|| format!("failed to create output directory {:?}", cli.output))?;

    let report = ScenarioReport {
        outcome: &outcome,
        alerts: &alerts,
        impacts: &impacts,
    };
    output::save_results(&report, &cli.output)?;

    let snapshot_id = format!("twin-{}", chrono::Utc::now().format("%Y%m%dT%H%M%S"));
    TwinSnapshot::capture(snapshot_id, &simulator).save(cli.output.join("twin_snapshot.json"))?;

    if let Some(cohort_config) = &config.cohort {
        let cohort = simulate_cohort(
            &params,
            &schedule,
            config.duration_hours,
            &config.solver,
            cohort_config,
        )?;
        output::save_cohort(&cohort, &cli.output)?;
    }

    info!(
        "Health score {:.1}; results saved to {:?}",
        outcome.metrics.health_score, cli.output
    );
    Ok(())
}
