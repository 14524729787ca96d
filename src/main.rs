mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use serde::Serialize;

use cli::{Args, Command, HeatArgs, OnsetArgs, RunSource, StepsArgs};
use dta_panda::analysis::{
    HeatStats, SteppedHeat, adjust_baseline, detect_onset, extract_run, heat_stats,
    jg_to_kjmol, mass_gain_percentage, rezero_at_onset, stepped_heat,
};
use dta_panda::chem::PeriodicTable;
use dta_panda::data::loader::load_workbook;
use dta_panda::{AnalysisConfig, HeatType, RunRecord, TemperatureWindow};

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let config = match &args.config {
        Some(path) => AnalysisConfig::from_path(path)?,
        None => AnalysisConfig::default(),
    };

    match &args.command {
        Command::Heat(heat) => run_heat(heat, &config, args.json),
        Command::Steps(steps) => run_steps(steps, &config, args.json),
        Command::Onset(onset) => run_onset(onset, &config, args.json),
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Extract every requested run (baseline-adjusted if asked) with its mass.
fn load_runs(source: &RunSource, config: &AnalysisConfig) -> Result<(Vec<RunRecord>, Vec<f64>)> {
    let workbook = load_workbook(&source.workbook, config.layout.skip_rows)
        .with_context(|| format!("loading {}", source.workbook.display()))?;
    let adjust = source
        .adjust
        .map(|b| TemperatureWindow::new(b.lower, b.upper))
        .transpose()?;

    let mut runs = Vec::with_capacity(source.runs.len());
    let mut masses = Vec::with_capacity(source.runs.len());
    for spec in &source.runs {
        let table = workbook.sheet(&spec.sheet)?;
        let mut run = extract_run(table, &config.layout, spec.initial_mass)
            .with_context(|| format!("extracting run '{}'", spec.sheet))?;
        if let Some(window) = &adjust {
            let (adjusted, offsets) = adjust_baseline(&run, window)?;
            info!(
                "run '{}': baseline re-zeroed by {:.4} mW",
                spec.sheet, offsets.bls_offset
            );
            run = adjusted;
        }
        runs.push(run);
        masses.push(spec.initial_mass);
    }
    Ok((runs, masses))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommands
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HeatReport {
    heat_type: HeatType,
    lower: f64,
    upper: f64,
    runs: usize,
    j_per_g: HeatStats,
    kj_per_mol: Option<HeatStats>,
}

fn run_heat(args: &HeatArgs, config: &AnalysisConfig, json: bool) -> Result<()> {
    let (runs, masses) = load_runs(&args.source, config)?;
    let window = TemperatureWindow::new(args.lower, args.upper)?;
    let stats = heat_stats(
        &runs,
        &window,
        &masses,
        args.heat_type,
        &config.formation_heats,
    )?;

    let kj_per_mol = match (&args.formula, args.atoms) {
        (Some(formula), Some(atoms)) => Some(HeatStats {
            mean: jg_to_kjmol(stats.mean, formula, atoms, &PeriodicTable)?,
            stdev: jg_to_kjmol(stats.stdev, formula, atoms, &PeriodicTable)?,
        }),
        _ => None,
    };

    let report = HeatReport {
        heat_type: args.heat_type,
        lower: args.lower,
        upper: args.upper,
        runs: runs.len(),
        j_per_g: stats,
        kj_per_mol,
    };
    if json {
        return print_json(&report);
    }
    println!(
        "The {} heat over {}..{} °C ({} run(s)) in J/g is: {:.2} ± {:.2}",
        report.heat_type, report.lower, report.upper, report.runs, stats.mean, stats.stdev
    );
    if let Some(kj) = report.kj_per_mol {
        println!(
            "The {} heat in kJ/mol is: {:.2} ± {:.2}",
            report.heat_type, kj.mean, kj.stdev
        );
    }
    Ok(())
}

fn run_steps(args: &StepsArgs, config: &AnalysisConfig, json: bool) -> Result<()> {
    let (runs, masses) = load_runs(&args.source, config)?;
    let stepped: SteppedHeat = stepped_heat(
        &runs,
        args.start,
        args.end,
        args.step,
        &masses,
        args.heat_type,
        &config.formation_heats,
    )?;
    if json {
        return print_json(&stepped);
    }
    println!(
        "{:>9} {:>9} {:>12} {:>10} {:>12}",
        "from °C", "to °C", "J/g", "± J/g", "cumulative"
    );
    for (i, pair) in stepped.bounds.windows(2).enumerate() {
        println!(
            "{:>9.1} {:>9.1} {:>12.2} {:>10.2} {:>12.2}",
            pair[0],
            pair[1],
            stepped.incremental[i],
            stepped.incremental_stdev[i],
            stepped.cumulative[i]
        );
    }
    Ok(())
}

#[derive(Serialize)]
struct OnsetReport {
    index: usize,
    temperature: f64,
    cutoff_index: usize,
    /// Final mean mass gain after re-zeroing at the onset, %.
    final_mass_gain: f64,
    adjusted_mass_gain: Vec<f64>,
    smoothed_derivative: Vec<f64>,
}

fn run_onset(args: &OnsetArgs, config: &AnalysisConfig, json: bool) -> Result<()> {
    let (runs, masses) = load_runs(&args.source, config)?;
    let mut settings = config.onset.clone();
    if let Some(cutoff) = args.cutoff {
        settings.cutoff_temp = cutoff;
    }
    if let Some(threshold) = args.threshold {
        settings.threshold = threshold;
    }
    if let Some(window) = args.window {
        settings.smooth_window = window;
    }

    let profile = mass_gain_percentage(&runs, &masses)?;
    let onset = detect_onset(&profile.mean, &runs[0], &settings)?;
    let adjusted = rezero_at_onset(&profile.mean, onset.index)?;

    let report = OnsetReport {
        index: onset.index,
        temperature: onset.temperature,
        cutoff_index: onset.cutoff_index,
        final_mass_gain: adjusted.last().copied().unwrap_or(0.0),
        adjusted_mass_gain: adjusted,
        smoothed_derivative: onset.smoothed,
    };
    if json {
        return print_json(&report);
    }
    println!(
        "Mass gain starts at sample {} ({:.1} °C); final gain after onset: {:.3} %",
        report.index, report.temperature, report.final_mass_gain
    );
    Ok(())
}
