use log::debug;

use crate::analysis::run::RunRecord;
use crate::chem::MolarMassLookup;
use crate::config::FormationHeats;
use crate::data::window::TemperatureWindow;
use crate::error::{AnalysisError, Result, checked_div};

/// Trapezoidal integral of `y` over strictly ascending `x`.
pub fn trapezoid(y: &[f64], x: &[f64]) -> Result<f64> {
    if y.len() != x.len() {
        return Err(AnalysisError::length_mismatch("trapezoid x/y", x.len(), y.len()));
    }
    let mut area = 0.0;
    for i in 1..x.len() {
        let dx = x[i] - x[i - 1];
        if dx.is_nan() || dx <= 0.0 {
            return Err(AnalysisError::window_order(format!(
                "integration axis must be strictly ascending, sample {i} goes from {} to {}",
                x[i - 1],
                x[i]
            )));
        }
        area += dx * (y[i] + y[i - 1]) / 2.0;
    }
    Ok(area)
}

/// Heat released by the intermetallic reaction inside `window`, J/g.
///
/// Baseline-subtracted heatflow (mW) is integrated over time (s) from the
/// window's lower sample to its upper sample, then divided by the initial
/// mass in grams and by 1000. Exothermic or endothermic sign is preserved.
pub fn intermetallic_heat(
    run: &RunRecord,
    window: &TemperatureWindow,
    initial_mass: f64,
) -> Result<f64> {
    let range = window.sample_range(&run.temperature)?;
    let area = trapezoid(range.slice(&run.bls_heatflow), range.slice(&run.time))?;
    let heat = checked_div(area, grams(initial_mass)?, "intermetallic heat")? / 1000.0;
    debug!(
        "run '{}': intermetallic heat {heat:.3} J/g over {}..{} °C",
        run.name,
        window.lower(),
        window.upper()
    );
    Ok(heat)
}

/// True mass at the upper window sample minus true mass at the lower one, mg.
pub fn mass_gain_over_window(run: &RunRecord, window: &TemperatureWindow) -> Result<f64> {
    let range = window.sample_range(&run.temperature)?;
    Ok(run.true_mass[range.end] - run.true_mass[range.start])
}

/// Heat of oxidation inside `window`, J/g, attributing all mass gain to
/// oxygen bound as ZrO2.
pub fn oxidation_heat(
    run: &RunRecord,
    window: &TemperatureWindow,
    initial_mass: f64,
    heats: &FormationHeats,
) -> Result<f64> {
    gas_uptake_heat(run, window, initial_mass, heats.oxide_kj_per_g, "oxidation")
}

/// Heat of nitridation inside `window`, J/g, using the mean of the ZrN and
/// AlN formation heats per gram of nitrogen.
pub fn nitridation_heat(
    run: &RunRecord,
    window: &TemperatureWindow,
    initial_mass: f64,
    heats: &FormationHeats,
) -> Result<f64> {
    gas_uptake_heat(run, window, initial_mass, heats.nitride_kj_per_g(), "nitridation")
}

fn gas_uptake_heat(
    run: &RunRecord,
    window: &TemperatureWindow,
    initial_mass: f64,
    kj_per_g: f64,
    label: &str,
) -> Result<f64> {
    let gain = mass_gain_over_window(run, window)?;
    // kJ/g × mg / g = J/g
    let heat = checked_div(kj_per_g * gain, grams(initial_mass)?, label)?;
    debug!(
        "run '{}': {label} heat {heat:.3} J/g from {gain:+.4} mg over {}..{} °C",
        run.name,
        window.lower(),
        window.upper()
    );
    Ok(heat)
}

fn grams(initial_mass_mg: f64) -> Result<f64> {
    if !initial_mass_mg.is_finite() || initial_mass_mg <= 0.0 {
        return Err(AnalysisError::division(format!(
            "initial mass must be a positive number of mg, got {initial_mass_mg}"
        )));
    }
    Ok(initial_mass_mg / 1000.0)
}

/// Molar mass per atom of the formula unit, g/mol.
fn mass_per_atom(lookup: &dyn MolarMassLookup, formula: &str, atoms: u32) -> Result<f64> {
    let molar_mass = lookup.molar_mass(formula)?;
    checked_div(molar_mass, atoms as f64, "molar mass per atom")
}

/// Convert J/g to kJ per mole of atoms: `(J/g / 1000) × (M / atoms)`.
pub fn jg_to_kjmol(
    heat_j_per_g: f64,
    formula: &str,
    atoms: u32,
    lookup: &dyn MolarMassLookup,
) -> Result<f64> {
    Ok(heat_j_per_g / 1000.0 * mass_per_atom(lookup, formula, atoms)?)
}

/// Inverse of [`jg_to_kjmol`].
pub fn kjmol_to_jg(
    heat_kj_per_mol: f64,
    formula: &str,
    atoms: u32,
    lookup: &dyn MolarMassLookup,
) -> Result<f64> {
    let per_atom = mass_per_atom(lookup, formula, atoms)?;
    Ok(checked_div(heat_kj_per_mol, per_atom, "kJ/mol to J/g")? * 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chem::PeriodicTable;

    /// 1 °C per sample, one sample every `dt_min` minutes, constant bls heatflow.
    fn ramp(n: usize, start_temp: f64, dt_min: f64, bls: f64, mass: &[f64]) -> RunRecord {
        let minutes: Vec<f64> = (0..n).map(|i| i as f64 * dt_min).collect();
        let temps: Vec<f64> = (0..n).map(|i| start_temp + i as f64).collect();
        let hf = vec![bls; n];
        let baseline = vec![0.0; n];
        RunRecord::from_channels("R", 11.469, &minutes, &temps, mass, &hf, &baseline).unwrap()
    }

    #[test]
    fn trapezoid_of_line() {
        let x = [0.0, 1.0, 2.0, 4.0];
        let y = [0.0, 1.0, 2.0, 4.0];
        assert!((trapezoid(&y, &x).unwrap() - 8.0).abs() < 1e-12);
    }

    #[test]
    fn trapezoid_rejects_descending_axis() {
        assert!(matches!(
            trapezoid(&[1.0, 1.0], &[1.0, 0.0]),
            Err(AnalysisError::WindowOrder(_))
        ));
        assert!(matches!(
            trapezoid(&[1.0], &[1.0, 0.0]),
            Err(AnalysisError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn constant_heatflow_between_120_and_600() {
        // 481 samples from 120 to 600 °C, 1 s apart: 480 s of -5 mW.
        let n = 600;
        let run = ramp(n, 100.0, 1.0 / 60.0, -5.0, &vec![0.0; n]);
        let window = TemperatureWindow::new(120.0, 600.0).unwrap();
        let heat = intermetallic_heat(&run, &window, 11.469).unwrap();
        let expected = -5.0 * 480.0 / (11.469 / 1000.0) / 1000.0;
        assert!((heat - expected).abs() < 1e-9);
        assert!((heat + 209.3).abs() < 0.05);
    }

    #[test]
    fn zero_initial_mass_is_rejected() {
        let run = ramp(10, 100.0, 0.1, 1.0, &vec![0.0; 10]);
        let window = TemperatureWindow::new(101.0, 105.0).unwrap();
        assert!(matches!(
            intermetallic_heat(&run, &window, 0.0),
            Err(AnalysisError::Division(_))
        ));
    }

    #[test]
    fn oxidation_and_nitridation_from_mass_gain() {
        let mass: Vec<f64> = (0..10).map(|i| if i >= 5 { 0.2 } else { 0.0 }).collect();
        let run = ramp(10, 100.0, 0.1, 0.0, &mass);
        let window = TemperatureWindow::new(102.0, 108.0).unwrap();
        assert!((mass_gain_over_window(&run, &window).unwrap() - 0.2).abs() < 1e-12);

        let heats = FormationHeats::default();
        let ox = oxidation_heat(&run, &window, 10.0, &heats).unwrap();
        assert!((ox - 34.3 * 0.2 / 0.01).abs() < 1e-9);
        let nit = nitridation_heat(&run, &window, 10.0, &heats).unwrap();
        assert!((nit - 18.745 * 0.2 / 0.01).abs() < 1e-9);
    }

    #[test]
    fn kjmol_conversion_and_inverse() {
        let table = PeriodicTable;
        let per_atom = (26.982 + 91.224) / 2.0;
        let kjmol = jg_to_kjmol(-1000.0, "Al1Zr1", 2, &table).unwrap();
        assert!((kjmol + per_atom).abs() < 1e-9);
        let back = kjmol_to_jg(kjmol, "Al1Zr1", 2, &table).unwrap();
        assert!((back + 1000.0).abs() < 1e-9);
    }

    #[test]
    fn zero_atoms_is_a_division_error() {
        assert!(matches!(
            jg_to_kjmol(1.0, "Al1Zr1", 0, &PeriodicTable),
            Err(AnalysisError::Division(_))
        ));
    }
}
