//! Heat-release and mass-gain analysis for DTA/TGA runs.
//!
//! A sheet exported by the instrument is turned into a [`RunRecord`]
//! (mass-normalized heatflow and true mass per sample), optionally re-zeroed
//! against a local baseline minimum, and integrated over temperature windows
//! into intermetallic, oxidation or nitridation heats. Repeated runs are
//! reduced to mean ± standard deviation, and averaged mass-gain curves are
//! searched for their onset.

pub mod analysis;
pub mod chem;
pub mod config;
pub mod data;
pub mod error;

pub use analysis::{HeatType, RunRecord};
pub use config::AnalysisConfig;
pub use data::window::TemperatureWindow;
pub use error::{AnalysisError, Result};
