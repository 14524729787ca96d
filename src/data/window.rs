use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

// ---------------------------------------------------------------------------
// Index lookup: temperature → nearest sample
// ---------------------------------------------------------------------------

/// Index of the sample whose temperature is closest to `target`.
///
/// Ties resolve to the first occurrence. NaN samples never match.
pub fn nearest_index(temperatures: &[f64], target: f64) -> Result<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &t) in temperatures.iter().enumerate() {
        let dist = (t - target).abs();
        if dist.is_nan() {
            continue;
        }
        match best {
            Some((_, d)) if dist >= d => {}
            _ => best = Some((i, dist)),
        }
    }
    best.map(|(i, _)| i).ok_or_else(|| {
        AnalysisError::data_format(format!(
            "no finite temperature to match {target} °C against"
        ))
    })
}

// ---------------------------------------------------------------------------
// Temperature window and the sample range it resolves to
// ---------------------------------------------------------------------------

/// A closed range of sample indices `[start, end]`.
///
/// Every consumer treats both ends as included: integration runs from the
/// `start` sample to the `end` sample, minimum searches include both, and
/// mass gain reads the samples at both ends. Adjacent windows that share a
/// bound therefore share one sample and their integrals add up exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleRange {
    pub start: usize,
    pub end: usize,
}

impl SampleRange {
    /// Number of samples covered; at least 2 for a resolved window.
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn slice<'a>(&self, series: &'a [f64]) -> &'a [f64] {
        &series[self.start..=self.end]
    }
}

/// Lower/upper temperature bounds in °C. Always `lower < upper`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WindowBounds")]
pub struct TemperatureWindow {
    lower: f64,
    upper: f64,
}

/// Unchecked bounds as read from a document.
#[derive(Deserialize)]
struct WindowBounds {
    lower: f64,
    upper: f64,
}

impl TryFrom<WindowBounds> for TemperatureWindow {
    type Error = AnalysisError;

    fn try_from(b: WindowBounds) -> Result<Self> {
        TemperatureWindow::new(b.lower, b.upper)
    }
}

impl TemperatureWindow {
    pub fn new(lower: f64, upper: f64) -> Result<Self> {
        if !(lower.is_finite() && upper.is_finite()) {
            return Err(AnalysisError::invalid_parameter(format!(
                "window bounds must be finite, got {lower}..{upper}"
            )));
        }
        if lower >= upper {
            return Err(AnalysisError::window_order(format!(
                "lower bound {lower} °C is not below upper bound {upper} °C"
            )));
        }
        Ok(Self { lower, upper })
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    /// Resolve both bounds to their nearest samples.
    ///
    /// Fails with [`AnalysisError::WindowOrder`] when the series runs
    /// against the window (upper bound resolves before the lower one) and
    /// with [`AnalysisError::WindowTooNarrow`] when both bounds land on the
    /// same sample.
    pub fn sample_range(&self, temperatures: &[f64]) -> Result<SampleRange> {
        let start = nearest_index(temperatures, self.lower)?;
        let end = nearest_index(temperatures, self.upper)?;
        if start > end {
            return Err(AnalysisError::window_order(format!(
                "{}..{} °C resolves to samples {start}..{end}; temperature must rise through the window",
                self.lower, self.upper
            )));
        }
        if start == end {
            return Err(AnalysisError::WindowTooNarrow {
                lower: self.lower,
                upper: self.upper,
            });
        }
        let range = SampleRange { start, end };
        if range
            .slice(temperatures)
            .windows(2)
            .any(|w| w[1] < w[0])
        {
            warn!(
                "temperature is not monotonic inside {}..{} °C (samples {start}..={end})",
                self.lower, self.upper
            );
        }
        debug!(
            "window {}..{} °C -> samples {start}..={end}",
            self.lower, self.upper
        );
        Ok(range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_picks_minimum_distance() {
        let temps = [20.0, 40.0, 60.0, 80.0];
        assert_eq!(nearest_index(&temps, 58.0).unwrap(), 2);
        assert_eq!(nearest_index(&temps, -100.0).unwrap(), 0);
        assert_eq!(nearest_index(&temps, 1000.0).unwrap(), 3);
    }

    #[test]
    fn nearest_ties_go_to_first() {
        let temps = [20.0, 40.0, 60.0];
        assert_eq!(nearest_index(&temps, 30.0).unwrap(), 0);
        let plateau = [10.0, 50.0, 50.0, 50.0];
        assert_eq!(nearest_index(&plateau, 50.0).unwrap(), 1);
    }

    #[test]
    fn nearest_skips_nan_and_rejects_empty() {
        assert_eq!(nearest_index(&[f64::NAN, 5.0], 0.0).unwrap(), 1);
        assert!(nearest_index(&[], 0.0).is_err());
    }

    #[test]
    fn window_rejects_reversed_bounds() {
        assert!(matches!(
            TemperatureWindow::new(200.0, 100.0),
            Err(AnalysisError::WindowOrder(_))
        ));
        assert!(matches!(
            TemperatureWindow::new(100.0, 100.0),
            Err(AnalysisError::WindowOrder(_))
        ));
    }

    #[test]
    fn deserialized_window_is_validated() {
        let w: TemperatureWindow =
            serde_json::from_str(r#"{"lower": 120.0, "upper": 600.0}"#).unwrap();
        assert_eq!((w.lower(), w.upper()), (120.0, 600.0));
        assert!(serde_json::from_str::<TemperatureWindow>(r#"{"lower": 600.0, "upper": 120.0}"#)
            .is_err());
    }

    #[test]
    fn sample_range_is_closed() {
        let temps: Vec<f64> = (0..10).map(|i| 100.0 + 10.0 * i as f64).collect();
        let w = TemperatureWindow::new(120.0, 150.0).unwrap();
        let range = w.sample_range(&temps).unwrap();
        assert_eq!(range, SampleRange { start: 2, end: 5 });
        assert_eq!(range.len(), 4);
        assert_eq!(range.slice(&temps), &[120.0, 130.0, 140.0, 150.0]);
    }

    #[test]
    fn sample_range_too_narrow() {
        let temps = [100.0, 200.0, 300.0];
        let w = TemperatureWindow::new(190.0, 210.0).unwrap();
        assert!(matches!(
            w.sample_range(&temps),
            Err(AnalysisError::WindowTooNarrow { .. })
        ));
    }

    #[test]
    fn sample_range_on_cooling_series_is_out_of_order() {
        let temps = [300.0, 200.0, 100.0];
        let w = TemperatureWindow::new(100.0, 300.0).unwrap();
        assert!(matches!(
            w.sample_range(&temps),
            Err(AnalysisError::WindowOrder(_))
        ));
    }
}
