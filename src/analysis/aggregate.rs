use std::fmt;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::analysis::heat::{intermetallic_heat, nitridation_heat, oxidation_heat};
use crate::analysis::run::RunRecord;
use crate::analysis::stats::{mean, sample_stdev};
use crate::config::FormationHeats;
use crate::data::window::TemperatureWindow;
use crate::error::{AnalysisError, Result};

// ---------------------------------------------------------------------------
// Heat type selector
// ---------------------------------------------------------------------------

/// Which heat a set of runs is evaluated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeatType {
    /// Integrated heatflow of a run in inert gas.
    Intermetallic,
    /// Mass gain in an oxygen-bearing atmosphere.
    Oxidation,
    /// Mass gain in a nitrogen-bearing atmosphere.
    Nitridation,
}

impl HeatType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HeatType::Intermetallic => "intermetallic",
            HeatType::Oxidation => "oxidation",
            HeatType::Nitridation => "nitridation",
        }
    }

    /// Heat of one run inside `window`, J/g.
    pub fn heat(
        &self,
        run: &RunRecord,
        window: &TemperatureWindow,
        initial_mass: f64,
        heats: &FormationHeats,
    ) -> Result<f64> {
        match self {
            HeatType::Intermetallic => intermetallic_heat(run, window, initial_mass),
            HeatType::Oxidation => oxidation_heat(run, window, initial_mass, heats),
            HeatType::Nitridation => nitridation_heat(run, window, initial_mass, heats),
        }
    }
}

impl fmt::Display for HeatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HeatType {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "im" | "intermetallic" => Ok(HeatType::Intermetallic),
            "ox" | "oxidation" => Ok(HeatType::Oxidation),
            "nit" | "nitridation" => Ok(HeatType::Nitridation),
            other => Err(AnalysisError::invalid_parameter(format!(
                "heat type '{other}': use im, ox or nit"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Mean / stdev over runs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeatStats {
    /// J/g.
    pub mean: f64,
    /// Sample standard deviation, J/g; exactly 0 for a single run.
    pub stdev: f64,
}

/// Heat of every run over `window`, reduced to mean and standard deviation.
///
/// A failure on any run fails the whole aggregate.
pub fn heat_stats(
    runs: &[RunRecord],
    window: &TemperatureWindow,
    initial_masses: &[f64],
    heat_type: HeatType,
    heats: &FormationHeats,
) -> Result<HeatStats> {
    if runs.is_empty() {
        return Err(AnalysisError::EmptyInput(format!("{heat_type} heat")));
    }
    if initial_masses.len() != runs.len() {
        return Err(AnalysisError::length_mismatch(
            "initial masses per run",
            runs.len(),
            initial_masses.len(),
        ));
    }
    let values = runs
        .iter()
        .zip(initial_masses)
        .map(|(run, &m0)| heat_type.heat(run, window, m0, heats))
        .collect::<Result<Vec<f64>>>()?;

    let stats = HeatStats {
        mean: mean(&values),
        stdev: sample_stdev(&values),
    };
    debug!(
        "{heat_type} heat over {}..{} °C from {} run(s): {:.3} ± {:.3} J/g",
        window.lower(),
        window.upper(),
        runs.len(),
        stats.mean,
        stats.stdev
    );
    Ok(stats)
}

// ---------------------------------------------------------------------------
// Stepped (incremental / cumulative) heat
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SteppedHeat {
    /// Increment bounds, °C: increment `i` spans `bounds[i]..bounds[i + 1]`.
    pub bounds: Vec<f64>,
    pub incremental: Vec<f64>,
    pub incremental_stdev: Vec<f64>,
    /// Running sum of `incremental`.
    pub cumulative: Vec<f64>,
}

/// `start, start + step, ...` with the final bound clamped to `end`.
pub fn step_bounds(start: f64, end: f64, step: f64) -> Result<Vec<f64>> {
    if !(step.is_finite() && step > 0.0) {
        return Err(AnalysisError::invalid_parameter(format!(
            "temperature step must be positive, got {step}"
        )));
    }
    if !(start.is_finite() && end.is_finite()) || start >= end {
        return Err(AnalysisError::window_order(format!(
            "stepped range {start}..{end} °C must run upwards"
        )));
    }
    let tolerance = step * 1e-9;
    let mut bounds = vec![start];
    let mut k = 1.0;
    loop {
        let b = start + k * step;
        if b >= end - tolerance {
            bounds.push(end);
            break;
        }
        bounds.push(b);
        k += 1.0;
    }
    Ok(bounds)
}

/// Mean heat for each `step`-wide increment of `[start, end]`, with the
/// increments' standard deviations and the cumulative sum of their means.
pub fn stepped_heat(
    runs: &[RunRecord],
    start: f64,
    end: f64,
    step: f64,
    initial_masses: &[f64],
    heat_type: HeatType,
    heats: &FormationHeats,
) -> Result<SteppedHeat> {
    let bounds = step_bounds(start, end, step)?;
    let mut incremental = Vec::with_capacity(bounds.len() - 1);
    let mut incremental_stdev = Vec::with_capacity(bounds.len() - 1);

    for pair in bounds.windows(2) {
        let window = TemperatureWindow::new(pair[0], pair[1])?;
        let stats = match heat_stats(runs, &window, initial_masses, heat_type, heats) {
            Ok(stats) => stats,
            // Both bounds on one sample: nothing to integrate, no mass change.
            Err(AnalysisError::WindowTooNarrow { .. }) => {
                debug!(
                    "{}..{} °C falls between two samples, increment is 0",
                    pair[0], pair[1]
                );
                HeatStats {
                    mean: 0.0,
                    stdev: 0.0,
                }
            }
            Err(e) => return Err(e),
        };
        incremental.push(stats.mean);
        incremental_stdev.push(stats.stdev);
    }

    let cumulative = incremental
        .iter()
        .scan(0.0, |acc, v| {
            *acc += v;
            Some(*acc)
        })
        .collect();

    Ok(SteppedHeat {
        bounds,
        incremental,
        incremental_stdev,
        cumulative,
    })
}
