//! CLI argument definitions

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, anyhow};
use clap::{Args as ClapArgs, Parser, Subcommand};

use dta_panda::HeatType;

#[derive(Parser)]
#[command(
    name = "dta-panda",
    about = "Heat release and mass gain from DTA/TGA runs",
    after_help = "\
EXAMPLES:
    dta-panda heat runs/ --run R1=11.469 --lower 120 --upper 600 --adjust 100:200
    dta-panda heat runs/ --run R1=11.469 --lower 120 --upper 600 --formula Al1Zr1 --atoms 2
    dta-panda steps runs/ --run R1=11.2 --run R2=10.9 --start 125 --end 700 --step 25 --type ox
    dta-panda onset runs/ --run R1=11.2 --run R2=10.9 --cutoff 300 --json"
)]
pub struct Args {
    /// JSON configuration (column layout, onset tuning, formation heats)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Debug logging (RUST_LOG still takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Mean and standard deviation of the heat released over one window
    Heat(HeatArgs),
    /// Incremental and cumulative heat over stepped windows
    Steps(StepsArgs),
    /// Onset of mass gain averaged over runs
    Onset(OnsetArgs),
}

/// Where the runs come from.
#[derive(ClapArgs)]
pub struct RunSource {
    /// Workbook: directory of sheets, .csv, .parquet or .json file
    #[arg(value_name = "WORKBOOK")]
    pub workbook: PathBuf,

    /// Sheet and its initial mass in mg, repeatable
    #[arg(long = "run", value_name = "SHEET=MASS", required = true)]
    pub runs: Vec<RunSpec>,

    /// Re-zero the baseline on its minimum between LOW and HIGH °C
    #[arg(long, value_name = "LOW:HIGH")]
    pub adjust: Option<Bounds>,
}

#[derive(ClapArgs)]
pub struct HeatArgs {
    #[command(flatten)]
    pub source: RunSource,

    /// Lower window bound, °C
    #[arg(long)]
    pub lower: f64,

    /// Upper window bound, °C
    #[arg(long)]
    pub upper: f64,

    /// im, ox or nit
    #[arg(long = "type", default_value = "im")]
    pub heat_type: HeatType,

    /// Formula of the powder, reports kJ/mol as well (e.g. Al1Zr1)
    #[arg(long, requires = "atoms")]
    pub formula: Option<String>,

    /// Atoms per formula unit
    #[arg(long, requires = "formula")]
    pub atoms: Option<u32>,
}

#[derive(ClapArgs)]
pub struct StepsArgs {
    #[command(flatten)]
    pub source: RunSource,

    /// First bound, °C
    #[arg(long)]
    pub start: f64,

    /// Last bound, °C
    #[arg(long)]
    pub end: f64,

    /// Increment width, °C
    #[arg(long)]
    pub step: f64,

    /// im, ox or nit
    #[arg(long = "type", default_value = "im")]
    pub heat_type: HeatType,
}

#[derive(ClapArgs)]
pub struct OnsetArgs {
    #[command(flatten)]
    pub source: RunSource,

    /// Ignore samples at or below this temperature, °C
    #[arg(long)]
    pub cutoff: Option<f64>,

    /// Smoothed derivative threshold, % per sample
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Smoothing window (odd number of samples)
    #[arg(long)]
    pub window: Option<usize>,
}

/// `SHEET=MASS`; the sheet name may itself contain `=`.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSpec {
    pub sheet: String,
    pub initial_mass: f64,
}

impl FromStr for RunSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let (sheet, mass) = s
            .rsplit_once('=')
            .ok_or_else(|| anyhow!("expected SHEET=MASS, got '{s}'"))?;
        if sheet.is_empty() {
            return Err(anyhow!("empty sheet name in '{s}'"));
        }
        let initial_mass = mass
            .trim()
            .parse::<f64>()
            .with_context(|| format!("initial mass '{mass}' is not a number"))?;
        Ok(RunSpec {
            sheet: sheet.to_string(),
            initial_mass,
        })
    }
}

/// `LOW:HIGH` in °C.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub lower: f64,
    pub upper: f64,
}

impl FromStr for Bounds {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let (lower, upper) = s
            .split_once(':')
            .ok_or_else(|| anyhow!("expected LOW:HIGH, got '{s}'"))?;
        Ok(Bounds {
            lower: lower.trim().parse().with_context(|| format!("bad lower bound '{lower}'"))?,
            upper: upper.trim().parse().with_context(|| format!("bad upper bound '{upper}'"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_spec_splits_on_last_equals() {
        let spec: RunSpec = "AlZr=Ar=R1=11.469".parse().unwrap();
        assert_eq!(spec.sheet, "AlZr=Ar=R1");
        assert_eq!(spec.initial_mass, 11.469);
        assert!("R1".parse::<RunSpec>().is_err());
        assert!("R1=abc".parse::<RunSpec>().is_err());
    }

    #[test]
    fn bounds_parse() {
        let b: Bounds = "100:200".parse().unwrap();
        assert_eq!((b.lower, b.upper), (100.0, 200.0));
        assert!("100-200".parse::<Bounds>().is_err());
    }

    #[test]
    fn heat_command_parses() {
        let args = Args::try_parse_from([
            "dta-panda", "heat", "book.json", "--run", "R1=11.5", "--run", "R2=10",
            "--lower", "120", "--upper", "600", "--type", "ox", "--json",
        ])
        .unwrap();
        assert!(args.json);
        match args.command {
            Command::Heat(h) => {
                assert_eq!(h.source.runs.len(), 2);
                assert_eq!(h.heat_type, HeatType::Oxidation);
                assert!(h.formula.is_none());
            }
            _ => panic!("expected heat"),
        }
    }

    #[test]
    fn formula_requires_atoms() {
        assert!(Args::try_parse_from([
            "dta-panda", "heat", "b.json", "--run", "R=1", "--lower", "1", "--upper", "2",
            "--formula", "Al1Zr1",
        ])
        .is_err());
    }
}
