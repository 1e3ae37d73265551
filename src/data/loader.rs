use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{
    Array, AsArray, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array,
    StringArray,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{CellValue, ColumnMapping, ObservationSeries, Record, Table};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one observation per row
/// * `.json`    – `[{ "t": 0, "RD": 0.0, ... }, ...]`
/// * `.parquet` – flat numeric columns
pub fn load_file(path: &Path) -> Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "csv" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    log::info!(
        "Loaded {} rows with columns {:?} from {}",
        table.len(),
        table.column_names,
        path.display()
    );
    Ok(table)
}

/// Load a file and interpret it through `columns`.
pub fn load_series(path: &Path, columns: &ColumnMapping) -> Result<ObservationSeries> {
    let table = load_file(path)?;
    ObservationSeries::from_table(&table, columns)
        .with_context(|| format!("reading observations from {}", path.display()))
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one observation per row.
/// Empty cells are read as missing values.
pub fn load_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut records = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let row = result.with_context(|| format!("CSV row {row_no}"))?;
        let record: Record = headers
            .iter()
            .zip(row.iter())
            .map(|(col, value)| (col.clone(), CellValue::parse(value)))
            .collect();
        records.push(record);
    }

    Ok(Table::new(headers, records))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "t": 0, "RD": 0.0, "RD_LCL": null, "RD_UCL": null },
///   { "t": 1, "RD": -0.001, "RD_LCL": -0.004, "RD_UCL": 0.002 }
/// ]
/// ```
pub fn load_json(path: &Path) -> Result<Table> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let rows = root.as_array().context("Expected top-level JSON array")?;

    let mut records = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let obj = row
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        let record: Record = obj
            .iter()
            .map(|(key, val)| (key.clone(), json_to_cell(val)))
            .collect();
        records.push(record);
    }

    Ok(Table::from_records(records))
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::Number(n) => n
            .as_f64()
            .map(CellValue::Number)
            .unwrap_or_else(|| CellValue::Text(n.to_string())),
        JsonValue::String(s) => CellValue::parse(s),
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with flat columns (Float32/64, Int32/64, Utf8, Bool).
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
pub fn load_parquet(path: &Path) -> Result<Table> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let column_names: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut records = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        for row in 0..batch.num_rows() {
            let record: Record = schema
                .fields()
                .iter()
                .enumerate()
                .map(|(col_idx, field)| {
                    let cell = extract_cell(batch.column(col_idx), row)
                        .with_context(|| format!("Row {row}, column '{}'", field.name()))?;
                    Ok((field.name().clone(), cell))
                })
                .collect::<Result<_>>()?;
            records.push(record);
        }
    }

    Ok(Table::new(column_names, records))
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell(col: &Arc<dyn Array>, row: usize) -> Result<CellValue> {
    if col.is_null(row) {
        return Ok(CellValue::Null);
    }

    fn downcast<T: 'static>(col: &Arc<dyn Array>) -> Result<&T> {
        col.as_any()
            .downcast_ref::<T>()
            .with_context(|| format!("unexpected array layout for {:?}", col.data_type()))
    }

    let cell = match col.data_type() {
        DataType::Float64 => CellValue::Number(downcast::<Float64Array>(col)?.value(row)),
        DataType::Float32 => CellValue::Number(downcast::<Float32Array>(col)?.value(row) as f64),
        DataType::Int64 => CellValue::Number(downcast::<Int64Array>(col)?.value(row) as f64),
        DataType::Int32 => CellValue::Number(downcast::<Int32Array>(col)?.value(row) as f64),
        DataType::Boolean => CellValue::Bool(downcast::<BooleanArray>(col)?.value(row)),
        DataType::Utf8 => CellValue::parse(downcast::<StringArray>(col)?.value(row)),
        DataType::LargeUtf8 => CellValue::parse(col.as_string::<i64>().value(row)),
        other => CellValue::Text(format!("{other:?}")),
    };
    Ok(cell)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;
    use tempfile::NamedTempFile;

    /// Helper to create a temp file with the given suffix and content.
    fn temp_file(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(suffix)
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn loads_csv_with_missing_cells() {
        let file = temp_file(
            ".csv",
            "t,RD,RD_LCL,RD_UCL\n0,0,,\n1,-0.01,-0.02,0.0\n2,-0.02,-0.04,0.0\n",
        );
        let series = load_series(file.path(), &ColumnMapping::difference()).unwrap();
        assert_eq!(series.len(), 3);
        assert!(series.observations()[0].lower_bound.is_nan());
        assert_eq!(series.observations()[2].lower_bound, -0.04);
    }

    #[test]
    fn csv_missing_column_fails_with_name() {
        let file = temp_file(".csv", "t,RD,RD_LCL\n0,0,0\n");
        let err = load_series(file.path(), &ColumnMapping::difference()).unwrap_err();
        assert!(format!("{err:#}").contains("RD_UCL"));
    }

    #[test]
    fn loads_json_records() {
        let file = temp_file(
            ".json",
            r#"[
                {"t": 0, "RR": null, "RR_LCL": null, "RR_UCL": null},
                {"t": 1, "RR": 0.5, "RR_LCL": 0.25, "RR_UCL": 1.0}
            ]"#,
        );
        let series = load_series(file.path(), &ColumnMapping::ratio()).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.observations()[1].upper_bound, 1.0);
    }

    #[test]
    fn json_must_be_an_array() {
        let file = temp_file(".json", r#"{"t": 0}"#);
        assert!(load_file(file.path()).is_err());
    }

    #[test]
    fn rejects_unknown_extension() {
        let file = temp_file(".xlsx", "");
        let err = load_file(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("Unsupported"));
    }

    #[test]
    fn loads_parquet_columns() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("t", DataType::Int64, false),
            Field::new("RD", DataType::Float64, true),
            Field::new("RD_LCL", DataType::Float64, true),
            Field::new("RD_UCL", DataType::Float64, true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int64Array::from(vec![0, 7])),
                Arc::new(Float64Array::from(vec![Some(0.0), Some(-0.01)])),
                Arc::new(Float64Array::from(vec![None, Some(-0.03)])),
                Arc::new(Float64Array::from(vec![None, Some(0.01)])),
            ],
        )
        .unwrap();

        let file = tempfile::Builder::new()
            .suffix(".parquet")
            .tempfile()
            .unwrap();
        let mut writer = ArrowWriter::try_new(file.as_file().try_clone().unwrap(), schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let table = load_file(file.path()).unwrap();
        assert_eq!(table.column_names, vec!["t", "RD", "RD_LCL", "RD_UCL"]);
        let series = ObservationSeries::from_table(&table, &ColumnMapping::difference()).unwrap();
        assert_eq!(series.max_time(), 7.0);
        assert!(series.observations()[0].upper_bound.is_nan());
    }
}
