use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

const HEADERS: [&str; 11] = [
    "Time (min)",
    "Temperature (C)",
    "TG (mg)",
    "Heatflow (mW)",
    "Time (min).1",
    "Temperature (C).1",
    "TG (mg).1",
    "Sample Temperature (C)",
    "Sample Temperature (C).1",
    "Time (min).2",
    "Heatflow (mW).1",
];

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

fn logistic(x: f64, mid: f64, width: f64) -> f64 {
    1.0 / (1.0 + (-(x - mid) / width).exp())
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// One synthetic run: 20 K/min from 25 to 900 °C, a sample every 3 s.
struct SyntheticRun {
    name: String,
    /// Exothermic peak: (center °C, width °C, height mW).
    peak: (f64, f64, f64),
    /// Total mass gain in mg and the temperature of its midpoint.
    gain: (f64, f64),
    /// TG reading at the start (instrument offset, not the true mass).
    tg_offset: f64,
}

/// Columns of a synthetic run in [`HEADERS`] order.
fn synthesize(run: &SyntheticRun, rng: &mut SimpleRng) -> Vec<Vec<f64>> {
    let n = 875 * 3 + 1;
    let mut columns = vec![Vec::with_capacity(n); HEADERS.len()];
    for i in 0..n {
        let minutes = i as f64 * 0.05;
        let temp = 25.0 + 20.0 * minutes;
        let baseline = -0.8 - 0.002 * temp + rng.gauss(0.0, 0.01);
        let (mu, sigma, height) = run.peak;
        let heatflow = baseline + gaussian(temp, mu, sigma, height) + rng.gauss(0.0, 0.02);
        let (gain, mid) = run.gain;
        let tg = run.tg_offset + gain * logistic(temp, mid, 25.0) + rng.gauss(0.0, 0.0005);

        let row = [
            minutes, temp, tg, heatflow, minutes, temp, tg, temp, temp, minutes, baseline,
        ];
        for (col, v) in columns.iter_mut().zip(row) {
            col.push(v);
        }
    }
    columns
}

fn write_csv(path: &Path, title: &str, columns: &[Vec<f64>]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut out = BufWriter::new(file);
    writeln!(out, "{title}")?;
    writeln!(out, "{}", HEADERS.join(","))?;
    for i in 0..columns[0].len() {
        let row: Vec<String> = columns.iter().map(|c| format!("{:.6}", c[i])).collect();
        writeln!(out, "{}", row.join(","))?;
    }
    out.flush()?;
    Ok(())
}

fn write_parquet(path: &Path, columns: &[Vec<f64>]) -> Result<()> {
    let schema = Arc::new(Schema::new(
        HEADERS
            .iter()
            .map(|h| Field::new(*h, DataType::Float64, false))
            .collect::<Vec<_>>(),
    ));
    let arrays: Vec<ArrayRef> = columns
        .iter()
        .map(|c| Arc::new(Float64Array::from(c.clone())) as ArrayRef)
        .collect();
    let batch = RecordBatch::try_new(schema.clone(), arrays).context("building record batch")?;

    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let out_dir = Path::new("sample_runs");
    std::fs::create_dir_all(out_dir).context("creating sample_runs/")?;

    let runs = [
        SyntheticRun {
            name: "AlZr_Ar_R1".into(),
            peak: (450.0, 40.0, 6.0),
            gain: (0.0, 600.0),
            tg_offset: 3.21,
        },
        SyntheticRun {
            name: "AlZr_Ar_R2".into(),
            peak: (455.0, 42.0, 5.6),
            gain: (0.0, 600.0),
            tg_offset: -1.07,
        },
        SyntheticRun {
            name: "AlZr_ArO2_R1".into(),
            peak: (450.0, 40.0, 6.0),
            gain: (1.9, 650.0),
            tg_offset: 0.42,
        },
        SyntheticRun {
            name: "AlZr_ArO2_R2".into(),
            peak: (452.0, 40.0, 5.8),
            gain: (2.1, 660.0),
            tg_offset: 2.75,
        },
    ];

    for (i, run) in runs.iter().enumerate() {
        let columns = synthesize(run, &mut rng);
        // The last run goes out as parquet to exercise both readers.
        if i == runs.len() - 1 {
            write_parquet(&out_dir.join(format!("{}.parquet", run.name)), &columns)?;
        } else {
            let title = format!("{} 20 K/min", run.name);
            write_csv(&out_dir.join(format!("{}.csv", run.name)), &title, &columns)?;
        }
    }

    println!(
        "Wrote {} synthetic runs to {}/ (try: dta-panda heat {} --run {}=11.469 --lower 120 --upper 600)",
        runs.len(),
        out_dir.display(),
        out_dir.display(),
        runs[0].name
    );
    Ok(())
}
