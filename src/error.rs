//! Error types for the analysis pipeline.

use thiserror::Error;

/// Result type alias used by every analysis operation.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Everything that can go wrong while turning a raw table into heat results.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Missing columns, missing sheets, or cells that are not numbers.
    #[error("malformed data: {0}")]
    DataFormat(String),

    /// Two series (or two lists) that must line up do not.
    #[error("length mismatch in {context}: expected {expected}, got {actual}")]
    LengthMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    /// The window resolves to fewer than two samples.
    #[error("temperature window {lower}..{upper} °C covers fewer than 2 samples")]
    WindowTooNarrow { lower: f64, upper: f64 },

    /// Reversed window bounds, or samples that run against the window.
    #[error("window out of order: {0}")]
    WindowOrder(String),

    /// No smoothed derivative sample above the threshold after the cutoff.
    #[error("no mass-gain onset above threshold {threshold:e} after {cutoff_temp} °C")]
    OnsetNotFound { cutoff_temp: f64, threshold: f64 },

    /// A divisor (mass, atom count) is zero or the quotient is not finite.
    #[error("degenerate division: {0}")]
    Division(String),

    /// An aggregate was requested over no runs at all.
    #[error("no runs supplied for {0}")]
    EmptyInput(String),

    /// A tuning parameter outside its valid range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A chemical formula that could not be resolved to a molar mass.
    #[error("cannot resolve formula '{formula}': {reason}")]
    Formula { formula: String, reason: String },
}

impl AnalysisError {
    pub fn data_format<S: Into<String>>(message: S) -> Self {
        AnalysisError::DataFormat(message.into())
    }

    pub fn length_mismatch<S: Into<String>>(context: S, expected: usize, actual: usize) -> Self {
        AnalysisError::LengthMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }

    pub fn window_order<S: Into<String>>(message: S) -> Self {
        AnalysisError::WindowOrder(message.into())
    }

    pub fn division<S: Into<String>>(message: S) -> Self {
        AnalysisError::Division(message.into())
    }

    pub fn invalid_parameter<S: Into<String>>(message: S) -> Self {
        AnalysisError::InvalidParameter(message.into())
    }
}

/// Divide, refusing zero divisors and non-finite quotients.
pub(crate) fn checked_div(numerator: f64, denominator: f64, what: &str) -> Result<f64> {
    if denominator == 0.0 {
        return Err(AnalysisError::division(format!("{what}: divisor is zero")));
    }
    let q = numerator / denominator;
    if !q.is_finite() {
        return Err(AnalysisError::division(format!(
            "{what}: {numerator} / {denominator} is not finite"
        )));
    }
    Ok(q)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_div_rejects_zero() {
        assert!(matches!(
            checked_div(1.0, 0.0, "mass"),
            Err(AnalysisError::Division(_))
        ));
        assert_eq!(checked_div(6.0, 3.0, "mass"), Ok(2.0));
    }

    #[test]
    fn display_names_the_window() {
        let err = AnalysisError::WindowTooNarrow {
            lower: 100.0,
            upper: 101.0,
        };
        assert!(err.to_string().contains("100..101"));
    }
}
