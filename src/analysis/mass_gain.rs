use log::{debug, info};
use serde::Serialize;

use crate::analysis::run::RunRecord;
use crate::analysis::smoothing::savgol_filter;
use crate::analysis::stats::{mean, sample_stdev};
use crate::config::OnsetSettings;
use crate::data::window::nearest_index;
use crate::error::{AnalysisError, Result, checked_div};

// ---------------------------------------------------------------------------
// Mass-gain percentage across repeated runs
// ---------------------------------------------------------------------------

/// Per-sample mass gain (% of initial mass) averaged over repeated runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MassGainProfile {
    pub mean: Vec<f64>,
    /// Sample standard deviation across runs; all zeros for a single run.
    pub stdev: Vec<f64>,
}

/// `100 × mass_diff / initial_mass` for every run, then the mean and
/// standard deviation across runs at each sample index.
pub fn mass_gain_percentage(runs: &[RunRecord], initial_masses: &[f64]) -> Result<MassGainProfile> {
    if runs.is_empty() {
        return Err(AnalysisError::EmptyInput("mass-gain percentage".into()));
    }
    if initial_masses.len() != runs.len() {
        return Err(AnalysisError::length_mismatch(
            "initial masses per run",
            runs.len(),
            initial_masses.len(),
        ));
    }
    let n = runs[0].len();
    let mut percentages = Vec::with_capacity(runs.len());
    for (run, &m0) in runs.iter().zip(initial_masses) {
        if run.len() != n {
            return Err(AnalysisError::length_mismatch(
                format!("samples in run '{}'", run.name),
                n,
                run.len(),
            ));
        }
        let pct = run
            .mass_diff
            .iter()
            .map(|&d| checked_div(d, m0, "mass-gain percentage").map(|r| 100.0 * r))
            .collect::<Result<Vec<f64>>>()?;
        percentages.push(pct);
    }

    let mut profile = MassGainProfile {
        mean: Vec::with_capacity(n),
        stdev: Vec::with_capacity(n),
    };
    let mut column = Vec::with_capacity(runs.len());
    for i in 0..n {
        column.clear();
        column.extend(percentages.iter().map(|p| p[i]));
        profile.mean.push(mean(&column));
        profile.stdev.push(sample_stdev(&column));
    }
    Ok(profile)
}

// ---------------------------------------------------------------------------
// Onset detection
// ---------------------------------------------------------------------------

/// Where mass gain starts, plus the series the decision was made on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MassGainOnset {
    pub index: usize,
    pub temperature: f64,
    /// Sample at or before which onsets are ignored.
    pub cutoff_index: usize,
    /// First difference of the averaged mass gain, first element 0.
    pub derivative: Vec<f64>,
    /// `derivative` after Savitzky–Golay smoothing.
    pub smoothed: Vec<f64>,
}

/// First sample after the cutoff temperature whose smoothed mass-gain
/// derivative strictly exceeds the threshold.
///
/// `reference` supplies the temperature axis and must have one sample per
/// entry of `avg_mass_gain`.
pub fn detect_onset(
    avg_mass_gain: &[f64],
    reference: &RunRecord,
    settings: &OnsetSettings,
) -> Result<MassGainOnset> {
    if reference.len() != avg_mass_gain.len() {
        return Err(AnalysisError::length_mismatch(
            format!("temperature samples of reference run '{}'", reference.name),
            avg_mass_gain.len(),
            reference.len(),
        ));
    }

    let derivative = first_difference(avg_mass_gain);
    let smoothed = savgol_filter(&derivative, settings.smooth_window, settings.poly_order)?;
    let cutoff_index = nearest_index(&reference.temperature, settings.cutoff_temp)?;

    let index = smoothed
        .iter()
        .enumerate()
        .skip(cutoff_index + 1)
        .find(|(_, &d)| d > settings.threshold)
        .map(|(i, _)| i)
        .ok_or(AnalysisError::OnsetNotFound {
            cutoff_temp: settings.cutoff_temp,
            threshold: settings.threshold,
        })?;

    let temperature = reference.temperature[index];
    info!(
        "mass-gain onset at sample {index} ({temperature:.1} °C), cutoff sample {cutoff_index}"
    );
    Ok(MassGainOnset {
        index,
        temperature,
        cutoff_index,
        derivative,
        smoothed,
    })
}

fn first_difference(values: &[f64]) -> Vec<f64> {
    std::iter::once(0.0)
        .chain(values.windows(2).map(|w| w[1] - w[0]))
        .take(values.len())
        .collect()
}

// ---------------------------------------------------------------------------
// Re-zeroing at onset
// ---------------------------------------------------------------------------

/// Shift the averaged curve so the onset sample reads 0, and clamp every
/// sample up to and including the onset to exactly 0.
pub fn rezero_at_onset(avg_mass_gain: &[f64], onset: usize) -> Result<Vec<f64>> {
    let reference = *avg_mass_gain.get(onset).ok_or_else(|| {
        AnalysisError::invalid_parameter(format!(
            "onset sample {onset} is outside the series ({} samples)",
            avg_mass_gain.len()
        ))
    })?;
    Ok(avg_mass_gain
        .iter()
        .enumerate()
        .map(|(i, v)| if i <= onset { 0.0 } else { v - reference })
        .collect())
}

/// Copy of `run` with no mass change up to and including `onset`: the
/// mass difference reads 0, the true mass equals the initial mass, and the
/// normalized channels of those samples are recomputed against it.
///
/// A baseline shift already applied to `norm_bls_heatflow` is carried over,
/// so an adjusted run stays shifted by the same offset across the reset.
pub fn reset_mass_before_onset(run: &RunRecord, onset: usize) -> Result<RunRecord> {
    if onset >= run.len() {
        return Err(AnalysisError::invalid_parameter(format!(
            "onset sample {onset} is outside run '{}' ({} samples)",
            run.name,
            run.len()
        )));
    }
    let shift: Vec<f64> = (0..=onset)
        .map(|i| run.norm_bls_heatflow[i] - (run.norm_heatflow[i] - run.norm_baseline_heatflow[i]))
        .collect();

    let mut reset = run.clone();
    for i in 0..=onset {
        reset.mass_diff[i] = 0.0;
        reset.true_mass[i] = run.initial_mass;
    }
    reset.normalize(0..onset + 1)?;
    for (v, s) in reset.norm_bls_heatflow.iter_mut().zip(&shift) {
        *v += s;
    }
    debug!("run '{}': mass reset through sample {onset}", run.name);
    Ok(reset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_with_mass(name: &str, mass: &[f64], m0: f64) -> RunRecord {
        let n = mass.len();
        let minutes: Vec<f64> = (0..n).map(|i| i as f64 * 0.1).collect();
        let temps: Vec<f64> = (0..n).map(|i| 25.0 + i as f64).collect();
        let hf = vec![1.0; n];
        let bl = vec![0.5; n];
        RunRecord::from_channels(name, m0, &minutes, &temps, mass, &hf, &bl).unwrap()
    }

    #[test]
    fn percentage_mean_and_stdev() {
        let a = run_with_mass("A", &[5.0, 5.1, 5.2], 10.0);
        let b = run_with_mass("B", &[7.0, 7.3, 7.6], 10.0);
        let profile = mass_gain_percentage(&[a, b], &[10.0, 10.0]).unwrap();
        let expect_mean = [0.0, 2.0, 4.0];
        let expect_sd = [0.0, 2f64.sqrt(), 2.0 * 2f64.sqrt()];
        for i in 0..3 {
            assert!((profile.mean[i] - expect_mean[i]).abs() < 1e-9);
            assert!((profile.stdev[i] - expect_sd[i]).abs() < 1e-9);
        }
    }

    #[test]
    fn single_run_has_zero_stdev() {
        let a = run_with_mass("A", &[5.0, 5.5], 10.0);
        let profile = mass_gain_percentage(&[a], &[10.0]).unwrap();
        assert_eq!(profile.stdev, vec![0.0, 0.0]);
    }

    #[test]
    fn percentage_rejects_ragged_runs() {
        let a = run_with_mass("A", &[5.0, 5.5], 10.0);
        let b = run_with_mass("B", &[5.0, 5.5, 6.0], 10.0);
        assert!(matches!(
            mass_gain_percentage(&[a.clone(), b], &[10.0, 10.0]),
            Err(AnalysisError::LengthMismatch { .. })
        ));
        assert!(matches!(
            mass_gain_percentage(&[a], &[10.0, 10.0]),
            Err(AnalysisError::LengthMismatch { .. })
        ));
        assert!(matches!(
            mass_gain_percentage(&[], &[]),
            Err(AnalysisError::EmptyInput(_))
        ));
    }

    #[test]
    fn first_difference_starts_at_zero() {
        assert_eq!(first_difference(&[1.0, 3.0, 6.0]), vec![0.0, 2.0, 3.0]);
        assert!(first_difference(&[]).is_empty());
    }

    #[test]
    fn onset_after_flat_then_linear_rise() {
        // flat to sample 60, then +0.01 % per sample
        let n = 120;
        let avg: Vec<f64> = (0..n)
            .map(|i| if i <= 60 { 0.0 } else { 0.01 * (i - 60) as f64 })
            .collect();
        let reference = run_with_mass("ref", &vec![1.0; n], 10.0);
        let settings = OnsetSettings {
            cutoff_temp: 45.0,
            threshold: 0.005,
            smooth_window: 5,
            poly_order: 3,
        };
        let onset = detect_onset(&avg, &reference, &settings).unwrap();
        assert_eq!(onset.cutoff_index, 20);
        assert_eq!(onset.index, 61);
        assert_eq!(onset.temperature, 86.0);
        assert_eq!(onset.derivative.len(), n);
    }

    #[test]
    fn onset_ignores_rises_before_cutoff() {
        let n = 60;
        let avg: Vec<f64> = (0..n).map(|i| if i < 10 { 0.1 * i as f64 } else { 0.9 }).collect();
        let reference = run_with_mass("ref", &vec![1.0; n], 10.0);
        let settings = OnsetSettings {
            cutoff_temp: 50.0,
            threshold: 0.01,
            smooth_window: 5,
            poly_order: 3,
        };
        assert!(matches!(
            detect_onset(&avg, &reference, &settings),
            Err(AnalysisError::OnsetNotFound { .. })
        ));
    }

    #[test]
    fn rezero_clamps_through_onset() {
        let avg = [-0.2, 0.1, -0.05, 0.3, 0.8];
        let out = rezero_at_onset(&avg, 2).unwrap();
        assert_eq!(&out[..3], &[0.0, 0.0, 0.0]);
        assert!((out[3] - 0.35).abs() < 1e-12);
        assert!((out[4] - 0.85).abs() < 1e-12);
        assert!(rezero_at_onset(&avg, 5).is_err());
    }

    #[test]
    fn reset_mass_restores_initial_mass_and_normalization() {
        let run = run_with_mass("A", &[5.0, 4.9, 5.2, 5.6], 10.0);
        let reset = reset_mass_before_onset(&run, 1).unwrap();
        assert_eq!(&reset.mass_diff[..2], &[0.0, 0.0]);
        assert_eq!(&reset.true_mass[..2], &[10.0, 10.0]);
        assert_eq!(reset.norm_heatflow[1], 0.1);
        assert_eq!(reset.true_mass[2], run.true_mass[2]);
        assert_eq!(run.mass_diff[1], 4.9 - 5.0);
        assert!(reset_mass_before_onset(&run, 4).is_err());
    }

    #[test]
    fn reset_after_adjustment_keeps_the_shift() {
        use crate::analysis::baseline::adjust_baseline;
        use crate::data::window::TemperatureWindow;

        // constant hf 3 / bl 1 on 10 mg, mass drifting up by 0.1 mg per sample
        let n = 10;
        let minutes: Vec<f64> = (0..n).map(|i| i as f64 * 0.1).collect();
        let temps: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
        let mass: Vec<f64> = (0..n).map(|i| 0.1 * i as f64).collect();
        let run = RunRecord::from_channels("A", 10.0, &minutes, &temps, &mass, &[3.0; 10], &[1.0; 10])
            .unwrap();
        let window = TemperatureWindow::new(101.0, 105.0).unwrap();
        let (adjusted, offsets) = adjust_baseline(&run, &window).unwrap();

        let reset = reset_mass_before_onset(&adjusted, 4).unwrap();
        for i in 0..n {
            let raw = reset.norm_heatflow[i] - reset.norm_baseline_heatflow[i];
            assert!((reset.norm_bls_heatflow[i] - (raw - offsets.norm_bls_offset)).abs() < 1e-12);
        }
        // samples past the onset are untouched
        assert_eq!(&reset.norm_bls_heatflow[5..], &adjusted.norm_bls_heatflow[5..]);
        // no step across the onset: reset samples sit on the unshifted 2 / 10 level
        assert!((reset.norm_bls_heatflow[4] - (0.2 - offsets.norm_bls_offset)).abs() < 1e-12);
    }
}
