use log::debug;
use serde::Serialize;

use crate::analysis::run::RunRecord;
use crate::data::window::TemperatureWindow;
use crate::error::{AnalysisError, Result};

/// Offsets removed by [`adjust_baseline`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BaselineAdjustment {
    /// Minimum of `bls_heatflow` inside the window, mW.
    pub bls_offset: f64,
    /// Minimum of `norm_bls_heatflow` inside the window, W/g.
    pub norm_bls_offset: f64,
}

/// Re-zero the baseline-subtracted channels on their local minimum.
///
/// The minimum of each baseline-subtracted channel inside `window` is
/// subtracted from the whole channel, so that the window's minimum becomes
/// exactly zero. The two channels are handled independently. The input run
/// is left untouched.
pub fn adjust_baseline(
    run: &RunRecord,
    window: &TemperatureWindow,
) -> Result<(RunRecord, BaselineAdjustment)> {
    let range = window.sample_range(&run.temperature)?;
    let narrow = || AnalysisError::WindowTooNarrow {
        lower: window.lower(),
        upper: window.upper(),
    };
    let bls_offset = window_min(range.slice(&run.bls_heatflow)).ok_or_else(narrow)?;
    let norm_bls_offset = window_min(range.slice(&run.norm_bls_heatflow)).ok_or_else(narrow)?;

    let mut adjusted = run.clone();
    adjusted.bls_heatflow.iter_mut().for_each(|v| *v -= bls_offset);
    adjusted
        .norm_bls_heatflow
        .iter_mut()
        .for_each(|v| *v -= norm_bls_offset);

    debug!(
        "run '{}': baseline shifted by {bls_offset:.5} mW / {norm_bls_offset:.5} W/g in {}..{} °C",
        run.name,
        window.lower(),
        window.upper()
    );
    Ok((
        adjusted,
        BaselineAdjustment {
            bls_offset,
            norm_bls_offset,
        },
    ))
}

/// Smallest finite value of a window holding at least two samples.
fn window_min(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .min_by(f64::total_cmp)
}
