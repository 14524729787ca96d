/// Analysis layer: from one sheet to heat and mass-gain results.
///
/// Pipeline:
/// ```text
///   RawTable ──run──▶ RunRecord ──baseline──▶ RunRecord (adjusted copy)
///                        │
///          ┌─────────────┼──────────────────┐
///          ▼             ▼                  ▼
///        heat        mass_gain          aggregate
///   (J/g, kJ/mol)  (profile, onset)  (mean ± sd, stepped)
/// ```

pub mod aggregate;
pub mod baseline;
pub mod heat;
pub mod mass_gain;
pub mod run;
pub mod smoothing;
pub mod stats;

pub use aggregate::{HeatStats, HeatType, SteppedHeat, heat_stats, step_bounds, stepped_heat};
pub use baseline::{BaselineAdjustment, adjust_baseline};
pub use heat::{
    intermetallic_heat, jg_to_kjmol, kjmol_to_jg, mass_gain_over_window, nitridation_heat,
    oxidation_heat, trapezoid,
};
pub use mass_gain::{
    MassGainOnset, MassGainProfile, detect_onset, mass_gain_percentage, reset_mass_before_onset,
    rezero_at_onset,
};
pub use run::{RunRecord, extract_run};
