//! Molar masses from simple chemical formulas such as `Al1Zr1` or `ZrO2`.

use crate::error::{AnalysisError, Result};

/// Resolves a chemical formula to a molar mass in g/mol.
pub trait MolarMassLookup {
    fn molar_mass(&self, formula: &str) -> Result<f64>;
}

/// Standard atomic weights (g/mol) of the elements likely to appear in
/// reactive powder and coating chemistries.
const ATOMIC_WEIGHTS: &[(&str, f64)] = &[
    ("H", 1.008),
    ("He", 4.0026),
    ("Li", 6.94),
    ("Be", 9.0122),
    ("B", 10.81),
    ("C", 12.011),
    ("N", 14.007),
    ("O", 15.999),
    ("F", 18.998),
    ("Ne", 20.180),
    ("Na", 22.990),
    ("Mg", 24.305),
    ("Al", 26.982),
    ("Si", 28.085),
    ("P", 30.974),
    ("S", 32.06),
    ("Cl", 35.45),
    ("Ar", 39.948),
    ("K", 39.098),
    ("Ca", 40.078),
    ("Sc", 44.956),
    ("Ti", 47.867),
    ("V", 50.942),
    ("Cr", 51.996),
    ("Mn", 54.938),
    ("Fe", 55.845),
    ("Co", 58.933),
    ("Ni", 58.693),
    ("Cu", 63.546),
    ("Zn", 65.38),
    ("Ga", 69.723),
    ("Ge", 72.630),
    ("Y", 88.906),
    ("Zr", 91.224),
    ("Nb", 92.906),
    ("Mo", 95.95),
    ("Pd", 106.42),
    ("Ag", 107.87),
    ("Sn", 118.71),
    ("La", 138.91),
    ("Ce", 140.12),
    ("Hf", 178.49),
    ("Ta", 180.95),
    ("W", 183.84),
    ("Pt", 195.08),
    ("Au", 196.97),
    ("Pb", 207.2),
    ("Bi", 208.98),
];

/// Default [`MolarMassLookup`] backed by a table of standard atomic weights.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeriodicTable;

impl PeriodicTable {
    pub fn atomic_weight(symbol: &str) -> Option<f64> {
        ATOMIC_WEIGHTS
            .iter()
            .find(|(s, _)| *s == symbol)
            .map(|(_, w)| *w)
    }
}

impl MolarMassLookup for PeriodicTable {
    /// Sum of `count × atomic weight` over `Symbol[count]` groups.
    /// Counts may be decimal (`Al0.5Zr0.5`); a missing count means 1.
    fn molar_mass(&self, formula: &str) -> Result<f64> {
        let fail = |reason: String| AnalysisError::Formula {
            formula: formula.to_string(),
            reason,
        };
        let chars: Vec<char> = formula.trim().chars().collect();
        if chars.is_empty() {
            return Err(fail("empty formula".into()));
        }

        let mut total = 0.0;
        let mut i = 0;
        while i < chars.len() {
            if !chars[i].is_ascii_uppercase() {
                return Err(fail(format!("unexpected '{}' at position {i}", chars[i])));
            }
            let mut symbol = chars[i].to_string();
            i += 1;
            while i < chars.len() && chars[i].is_ascii_lowercase() {
                symbol.push(chars[i]);
                i += 1;
            }
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            let count = if start == i {
                1.0
            } else {
                let text: String = chars[start..i].iter().collect();
                text.parse::<f64>()
                    .map_err(|_| fail(format!("bad count '{text}' for {symbol}")))?
            };
            let weight = Self::atomic_weight(&symbol)
                .ok_or_else(|| fail(format!("unknown element '{symbol}'")))?;
            total += weight * count;
        }
        Ok(total)
    }
}
