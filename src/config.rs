use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Table layout – where the instrument puts each channel
// ---------------------------------------------------------------------------

/// Fixed column offsets of an instrument export sheet.
///
/// The defaults follow the DTA export: time in minutes, temperature,
/// TG mass channel, sample heatflow, and the baseline run's heatflow in the
/// eleventh column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableLayout {
    /// Leading rows (sheet title) dropped before the header row.
    pub skip_rows: usize,
    pub time_minutes: usize,
    pub temperature: usize,
    pub mass: usize,
    pub heatflow: usize,
    pub baseline_heatflow: usize,
}

impl Default for TableLayout {
    fn default() -> Self {
        Self {
            skip_rows: 1,
            time_minutes: 0,
            temperature: 1,
            mass: 2,
            heatflow: 3,
            baseline_heatflow: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// Onset detection defaults
// ---------------------------------------------------------------------------

/// Tuning for mass-gain onset detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnsetSettings {
    /// Samples at or below this temperature are never reported as onset.
    pub cutoff_temp: f64,
    /// The smoothed derivative (% per sample) must strictly exceed this.
    pub threshold: f64,
    /// Savitzky–Golay window length; odd.
    pub smooth_window: usize,
    pub poly_order: usize,
}

impl Default for OnsetSettings {
    fn default() -> Self {
        Self {
            cutoff_temp: 200.0,
            threshold: 1e-4,
            smooth_window: 51,
            poly_order: 3,
        }
    }
}

// ---------------------------------------------------------------------------
// Formation heats for mass-gain based heat estimates
// ---------------------------------------------------------------------------

/// Heat released per gram of gas taken up, in kJ/g.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormationHeats {
    /// ZrO2 formation per gram of O2 gained.
    pub oxide_kj_per_g: f64,
    /// ZrN formation per gram of N2 gained.
    pub zr_nitride_kj_per_g: f64,
    /// AlN formation per gram of N2 gained.
    pub al_nitride_kj_per_g: f64,
}

impl Default for FormationHeats {
    fn default() -> Self {
        Self {
            oxide_kj_per_g: 34.3,
            zr_nitride_kj_per_g: 14.79,
            al_nitride_kj_per_g: 22.7,
        }
    }
}

impl FormationHeats {
    /// Nitridation is taken as the mean of the ZrN and AlN formation heats.
    pub fn nitride_kj_per_g(&self) -> f64 {
        (self.zr_nitride_kj_per_g + self.al_nitride_kj_per_g) / 2.0
    }
}

// ---------------------------------------------------------------------------
// Top-level configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub layout: TableLayout,
    pub onset: OnsetSettings,
    pub formation_heats: FormationHeats,
}

impl AnalysisConfig {
    /// Read a JSON config file. Missing fields keep their defaults.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }
}
