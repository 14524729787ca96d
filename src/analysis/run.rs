use log::debug;
use serde::Serialize;

use crate::config::TableLayout;
use crate::data::model::RawTable;
use crate::error::{AnalysisError, Result, checked_div};

// ---------------------------------------------------------------------------
// RunRecord – all derived channels of one experiment
// ---------------------------------------------------------------------------

/// One DTA run, every channel indexed by the same sample index.
///
/// Normalized channels are the raw channel divided by the true mass at the
/// same sample (mW / mg = W/g).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRecord {
    /// Sheet the run was extracted from.
    pub name: String,
    /// Initial sample mass from the microbalance, mg.
    pub initial_mass: f64,
    /// Seconds since the start of the run.
    pub time: Vec<f64>,
    /// °C.
    pub temperature: Vec<f64>,
    /// Sample heatflow, mW.
    pub heatflow: Vec<f64>,
    /// Heatflow of the empty baseline run, mW.
    pub baseline_heatflow: Vec<f64>,
    /// `heatflow - baseline_heatflow`, mW.
    pub bls_heatflow: Vec<f64>,
    /// Mass change relative to the first sample, mg.
    pub mass_diff: Vec<f64>,
    /// `initial_mass + mass_diff`, mg.
    pub true_mass: Vec<f64>,
    pub norm_heatflow: Vec<f64>,
    pub norm_baseline_heatflow: Vec<f64>,
    pub norm_bls_heatflow: Vec<f64>,
}

impl RunRecord {
    /// Derive every channel from the raw instrument series.
    ///
    /// `time_minutes`, `temperature`, `mass_channel`, `heatflow` and
    /// `baseline_heatflow` must have the same, non-zero length.
    pub fn from_channels(
        name: &str,
        initial_mass: f64,
        time_minutes: &[f64],
        temperature: &[f64],
        mass_channel: &[f64],
        heatflow: &[f64],
        baseline_heatflow: &[f64],
    ) -> Result<Self> {
        if !initial_mass.is_finite() || initial_mass <= 0.0 {
            return Err(AnalysisError::division(format!(
                "run '{name}': initial mass must be a positive number of mg, got {initial_mass}"
            )));
        }
        let n = time_minutes.len();
        if n == 0 {
            return Err(AnalysisError::data_format(format!("run '{name}' has no samples")));
        }
        for (label, len) in [
            ("temperature", temperature.len()),
            ("mass channel", mass_channel.len()),
            ("heatflow", heatflow.len()),
            ("baseline heatflow", baseline_heatflow.len()),
        ] {
            if len != n {
                return Err(AnalysisError::length_mismatch(
                    format!("run '{name}' {label}"),
                    n,
                    len,
                ));
            }
        }

        let time: Vec<f64> = time_minutes.iter().map(|m| m * 60.0).collect();
        let bls_heatflow: Vec<f64> = heatflow
            .iter()
            .zip(baseline_heatflow)
            .map(|(hf, bl)| hf - bl)
            .collect();

        let mass0 = mass_channel[0];
        let mass_diff: Vec<f64> = mass_channel.iter().map(|m| m - mass0).collect();
        let true_mass: Vec<f64> = mass_diff.iter().map(|d| initial_mass + d).collect();

        let mut record = RunRecord {
            name: name.to_string(),
            initial_mass,
            time,
            temperature: temperature.to_vec(),
            heatflow: heatflow.to_vec(),
            baseline_heatflow: baseline_heatflow.to_vec(),
            bls_heatflow,
            mass_diff,
            true_mass,
            norm_heatflow: vec![0.0; n],
            norm_baseline_heatflow: vec![0.0; n],
            norm_bls_heatflow: vec![0.0; n],
        };
        record.normalize(0..n)?;
        debug!(
            "run '{name}': {n} samples, {:.1}..{:.1} °C, mass change {:+.4} mg",
            record.temperature[0],
            record.temperature[n - 1],
            record.mass_diff[n - 1]
        );
        Ok(record)
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Recompute the mass-normalized channels for `samples` from the raw
    /// channels and the current true mass.
    pub(crate) fn normalize(&mut self, samples: std::ops::Range<usize>) -> Result<()> {
        for i in samples {
            let mass = self.true_mass[i];
            let (hf, bl) = match (
                checked_div(self.heatflow[i], mass, "heatflow"),
                checked_div(self.baseline_heatflow[i], mass, "baseline heatflow"),
            ) {
                (Ok(hf), Ok(bl)) => (hf, bl),
                (Err(e), _) | (_, Err(e)) => {
                    return Err(AnalysisError::division(format!(
                        "run '{}' sample {i} (true mass {mass} mg): {e}",
                        self.name
                    )));
                }
            };
            self.norm_heatflow[i] = hf;
            self.norm_baseline_heatflow[i] = bl;
            self.norm_bls_heatflow[i] = hf - bl;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Extraction from a sheet
// ---------------------------------------------------------------------------

/// Build a [`RunRecord`] from one sheet using the column offsets in `layout`.
pub fn extract_run(table: &RawTable, layout: &TableLayout, initial_mass: f64) -> Result<RunRecord> {
    if table.is_empty() {
        return Err(AnalysisError::data_format(format!(
            "sheet '{}' has no data rows",
            table.name
        )));
    }
    let time_minutes = table.numeric_column(layout.time_minutes)?;
    let temperature = table.numeric_column(layout.temperature)?;
    let mass = table.numeric_column(layout.mass)?;
    let heatflow = table.numeric_column(layout.heatflow)?;
    let baseline = table.numeric_column(layout.baseline_heatflow)?;

    RunRecord::from_channels(
        &table.name,
        initial_mass,
        &time_minutes,
        &temperature,
        &mass,
        &heatflow,
        &baseline,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::CellValue;

    fn sheet(rows: &[[f64; 11]]) -> RawTable {
        let mut all = vec![
            vec![CellValue::Text("title".into())],
            (0..11).map(|i| CellValue::Text(format!("c{i}"))).collect(),
        ];
        all.extend(
            rows.iter()
                .map(|r| r.iter().map(|v| CellValue::Number(*v)).collect::<Vec<_>>()),
        );
        RawTable::from_rows("R1", all, 1)
    }

    fn sample(min: f64, temp: f64, mass: f64, hf: f64, bl: f64) -> [f64; 11] {
        let mut r = [0.0; 11];
        r[0] = min;
        r[1] = temp;
        r[2] = mass;
        r[3] = hf;
        r[10] = bl;
        r
    }

    #[test]
    fn extract_derives_all_channels() {
        let table = sheet(&[
            sample(0.0, 25.0, 50.0, 2.0, 1.0),
            sample(0.5, 35.0, 50.5, 4.0, 1.0),
        ]);
        let run = extract_run(&table, &TableLayout::default(), 10.0).unwrap();
        assert_eq!(run.time, vec![0.0, 30.0]);
        assert_eq!(run.bls_heatflow, vec![1.0, 3.0]);
        assert_eq!(run.mass_diff, vec![0.0, 0.5]);
        assert_eq!(run.true_mass, vec![10.0, 10.5]);
        assert_eq!(run.norm_heatflow, vec![0.2, 4.0 / 10.5]);
        assert_eq!(run.norm_baseline_heatflow, vec![0.1, 1.0 / 10.5]);
        assert!((run.norm_bls_heatflow[1] - 3.0 / 10.5).abs() < 1e-12);
    }

    #[test]
    fn extract_rejects_text_cells() {
        let mut table = sheet(&[sample(0.0, 25.0, 1.0, 1.0, 0.0)]);
        table.rows[0][3] = CellValue::Text("n/a".into());
        assert!(matches!(
            extract_run(&table, &TableLayout::default(), 10.0),
            Err(AnalysisError::DataFormat(_))
        ));
    }

    #[test]
    fn extract_rejects_nan_heatflow() {
        let mut table = sheet(&[sample(0.0, 25.0, 1.0, 1.0, 0.0)]);
        table.rows[0][3] = CellValue::parse("NaN");
        assert!(matches!(
            extract_run(&table, &TableLayout::default(), 10.0),
            Err(AnalysisError::DataFormat(_))
        ));
    }

    #[test]
    fn extract_rejects_missing_baseline_column() {
        let mut table = sheet(&[sample(0.0, 25.0, 1.0, 1.0, 0.0)]);
        for row in &mut table.rows {
            row.truncate(4);
        }
        table.headers.truncate(4);
        assert!(matches!(
            extract_run(&table, &TableLayout::default(), 10.0),
            Err(AnalysisError::DataFormat(_))
        ));
    }

    #[test]
    fn zero_true_mass_is_a_division_error() {
        // The mass channel drops by exactly the initial mass.
        let table = sheet(&[
            sample(0.0, 25.0, 10.0, 1.0, 0.0),
            sample(0.1, 26.0, 0.0, 1.0, 0.0),
        ]);
        assert!(matches!(
            extract_run(&table, &TableLayout::default(), 10.0),
            Err(AnalysisError::Division(_))
        ));
    }

    #[test]
    fn non_positive_initial_mass_is_rejected() {
        let table = sheet(&[sample(0.0, 25.0, 10.0, 1.0, 0.0)]);
        assert!(extract_run(&table, &TableLayout::default(), 0.0).is_err());
    }
}
