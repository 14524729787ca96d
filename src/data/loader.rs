use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{
    Array, AsArray, Float32Array, Float64Array, Int32Array, Int64Array, StringArray,
};
use arrow::datatypes::DataType;
use log::{debug, info};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{CellValue, RawTable, Workbook};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a workbook from a path.  Dispatch by file type.
///
/// Supported layouts:
/// * directory  – every `.csv` / `.json` / `.parquet` file is one sheet,
///   named after its file stem
/// * `.csv`     – a single sheet named after the file stem
/// * `.parquet` – a single sheet, header taken from the schema
/// * `.json`    – `{ "sheet name": [[row cells], ...], ... }`
///
/// `skip_rows` leading rows (the instrument's title row) are dropped before
/// the header row for CSV and JSON sheets.
pub fn load_workbook(path: &Path, skip_rows: usize) -> Result<Workbook> {
    let workbook = if path.is_dir() {
        load_directory(path, skip_rows)?
    } else {
        match extension(path).as_str() {
            "json" => load_json(path, skip_rows)?,
            "csv" => Workbook::from_tables(vec![load_csv(path, skip_rows)?]),
            "parquet" | "pq" => Workbook::from_tables(vec![load_parquet(path)?]),
            other => bail!("Unsupported file extension: .{other}"),
        }
    };
    info!(
        "loaded {} sheet(s) from {}: {}",
        workbook.len(),
        path.display(),
        workbook.sheet_names().join(", ")
    );
    Ok(workbook)
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

fn sheet_name(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .with_context(|| format!("cannot derive a sheet name from {}", path.display()))
}

// ---------------------------------------------------------------------------
// Directory loader
// ---------------------------------------------------------------------------

fn load_directory(dir: &Path, skip_rows: usize) -> Result<Workbook> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)
        .with_context(|| format!("listing {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()
        .context("reading directory entry")?;
    entries.sort_by_key(|e| e.path());

    let mut tables = Vec::new();
    for entry in entries {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        match extension(&path).as_str() {
            "csv" => tables.push(load_csv(&path, skip_rows)?),
            "parquet" | "pq" => tables.push(load_parquet(&path)?),
            "json" => {
                let rows = read_json_rows(&path)?;
                tables.push(RawTable::from_rows(&sheet_name(&path)?, rows, skip_rows));
            }
            _ => debug!("skipping {}", path.display()),
        }
    }
    if tables.is_empty() {
        bail!("{} contains no .csv, .json or .parquet sheets", dir.display());
    }
    Ok(Workbook::from_tables(tables))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (sheet name → rows, first kept row is the header):
///
/// ```json
/// {
///   "AlZr_R1": [
///     ["AlZr_R1 Ar 20 K/min"],
///     ["Time (min)", "Temperature (C)", "TG (mg)", "Heatflow (mW)"],
///     [0.0, 25.0, 0.0, -0.12],
///     ...
///   ]
/// }
/// ```
fn load_json(path: &Path, skip_rows: usize) -> Result<Workbook> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let sheets = root
        .as_object()
        .context("Expected top-level JSON object of sheets")?;

    let mut tables = Vec::with_capacity(sheets.len());
    for (name, value) in sheets {
        let rows = json_rows(value).with_context(|| format!("sheet '{name}'"))?;
        tables.push(RawTable::from_rows(name, rows, skip_rows));
    }
    Ok(Workbook::from_tables(tables))
}

/// A single-sheet JSON file: just the array of rows.
fn read_json_rows(path: &Path) -> Result<Vec<Vec<CellValue>>> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;
    json_rows(&root).with_context(|| format!("sheet file {}", path.display()))
}

fn json_rows(value: &JsonValue) -> Result<Vec<Vec<CellValue>>> {
    let rows = value.as_array().context("Expected an array of rows")?;
    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            let cells = row
                .as_array()
                .with_context(|| format!("Row {i} is not a JSON array"))?;
            Ok(cells.iter().map(json_to_cell).collect())
        })
        .collect()
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::Number(n) => n
            .as_f64()
            .map(CellValue::Number)
            .unwrap_or_else(|| CellValue::Text(n.to_string())),
        JsonValue::String(s) => CellValue::parse(s),
        JsonValue::Null => CellValue::Empty,
        other => CellValue::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: optional title row(s), a header row, then one sample per row.
/// Rows are allowed to have different lengths (instrument exports leave
/// trailing cells blank).
fn load_csv(path: &Path, skip_rows: usize) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening CSV {}", path.display()))?;

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        rows.push(record.iter().map(CellValue::parse).collect());
    }

    Ok(RawTable::from_rows(&sheet_name(path)?, rows, skip_rows))
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file holding one sheet.
///
/// Column order is the instrument column order; column names become the
/// header row. Numeric columns may be Float64/Float32/Int64/Int32, text
/// columns are parsed like CSV cells.
fn load_parquet(path: &Path) -> Result<RawTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for row in 0..batch.num_rows() {
            let cells = batch
                .columns()
                .iter()
                .map(|col| extract_cell(col, row))
                .collect::<Result<Vec<_>>>()
                .with_context(|| format!("Row {row}"))?;
            rows.push(cells);
        }
    }

    Ok(RawTable {
        name: sheet_name(path)?,
        headers,
        rows,
    })
}

// -- Parquet / Arrow helpers --

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell(col: &Arc<dyn Array>, row: usize) -> Result<CellValue> {
    if col.is_null(row) {
        return Ok(CellValue::Empty);
    }
    let cell = match col.data_type() {
        DataType::Float64 => {
            let arr = col
                .as_any()
                .downcast_ref::<Float64Array>()
                .context("expected Float64Array")?;
            CellValue::Number(arr.value(row))
        }
        DataType::Float32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Float32Array>()
                .context("expected Float32Array")?;
            CellValue::Number(arr.value(row) as f64)
        }
        DataType::Int64 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int64Array>()
                .context("expected Int64Array")?;
            CellValue::Number(arr.value(row) as f64)
        }
        DataType::Int32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int32Array>()
                .context("expected Int32Array")?;
            CellValue::Number(arr.value(row) as f64)
        }
        DataType::Utf8 => {
            let arr = col
                .as_any()
                .downcast_ref::<StringArray>()
                .context("expected StringArray")?;
            CellValue::parse(arr.value(row))
        }
        DataType::LargeUtf8 => CellValue::parse(col.as_string::<i64>().value(row)),
        other => CellValue::Text(format!("{other:?}")),
    };
    Ok(cell)
}
