use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type, Int64Type, UInt64Type};
use arrow::error::ArrowError;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{CellValue, JobsTable, Record};
use crate::error::DataLoadError;

/// Field separator of the timing exports.
pub const DELIMITER: u8 = b';';

/// Columns that are always kept as text, never type-guessed.
const TEXT_COLUMNS: [&str; 2] = ["experiment", "algorithm"];

/// Cell contents read as missing, the same set `pandas.read_csv` uses.
const NULL_MARKERS: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Bytes inspected to tell the input formats apart.
const SNIFF_LEN: u64 = 512;
const PARQUET_MAGIC: &[u8] = b"PAR1";
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputFormat {
    Csv,
    Json,
    Parquet,
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a timing table from a file.  Dispatch by content.
///
/// Supported formats:
/// * Parquet (starts with `PAR1`) – one column per field
/// * JSON (starts with `[`)       – `[{ "experiment": ..., "algorithm": ..., ... }, ...]`
/// * anything else                – `;`-separated text with a header row
///
/// The returned table always carries the required columns.
pub fn load_file(path: &Path) -> Result<JobsTable, DataLoadError> {
    let format = detect_format(path)?;
    log::debug!("Reading {} as {:?}", path.display(), format);

    let table = match format {
        InputFormat::Parquet => load_parquet(path)?,
        InputFormat::Json => load_json(path)?,
        InputFormat::Csv => load_csv(path)?,
    };
    table.require_columns()?;

    if table.is_empty() {
        log::warn!("{} has a header but no records", path.display());
    }
    log::info!(
        "Loaded {} records ({} columns) from {}",
        table.len(),
        table.column_names.len(),
        path.display()
    );
    Ok(table)
}

fn io_error(path: &Path) -> impl Fn(std::io::Error) -> DataLoadError + '_ {
    move |source| DataLoadError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn detect_format(path: &Path) -> Result<InputFormat, DataLoadError> {
    let file = std::fs::File::open(path).map_err(io_error(path))?;
    let mut head = Vec::new();
    file.take(SNIFF_LEN)
        .read_to_end(&mut head)
        .map_err(io_error(path))?;
    Ok(sniff_format(&head))
}

fn sniff_format(head: &[u8]) -> InputFormat {
    if head.starts_with(PARQUET_MAGIC) {
        return InputFormat::Parquet;
    }
    let text = head.strip_prefix(UTF8_BOM).unwrap_or(head);
    match text.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'[') | Some(b'{') => InputFormat::Json,
        _ => InputFormat::Csv,
    }
}

/// Keep the first of each repeated name; later ones become `name.1`, `name.2`, ...
fn mangle_duplicates(names: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut suffixes: HashMap<String, usize> = HashMap::new();

    names
        .into_iter()
        .map(|name| {
            if seen.insert(name.clone()) {
                return name;
            }
            let n = suffixes.entry(name.clone()).or_insert(0);
            loop {
                *n += 1;
                let candidate = format!("{name}.{n}");
                if seen.insert(candidate.clone()) {
                    return candidate;
                }
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, `;` between fields.
/// Short rows are padded with nulls; long rows are rejected.
fn load_csv(path: &Path) -> Result<JobsTable, DataLoadError> {
    let csv_err = |source: csv::Error| DataLoadError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let file = std::fs::File::open(path).map_err(io_error(path))?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let raw_headers: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.to_string())
        .collect();
    let headers = mangle_duplicates(raw_headers);

    let mut records = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let row = result.map_err(csv_err)?;
        if row.len() > headers.len() {
            return Err(DataLoadError::RaggedRow {
                row: row_no,
                expected: headers.len(),
                found: row.len(),
            });
        }

        let record: Record = headers
            .iter()
            .enumerate()
            .map(|(col_idx, col_name)| {
                let raw = row.get(col_idx).unwrap_or("");
                let value = if NULL_MARKERS.contains(&raw) {
                    CellValue::Null
                } else if TEXT_COLUMNS.contains(&col_name.as_str()) {
                    CellValue::String(raw.to_string())
                } else {
                    guess_cell_type(raw)
                };
                (col_name.clone(), value)
            })
            .collect();

        records.push(record);
    }

    Ok(JobsTable::new(headers, records))
}

fn guess_cell_type(s: &str) -> CellValue {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return CellValue::String(s.to_string());
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return CellValue::Integer(i);
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        return CellValue::Float(f);
    }
    if s == "true" || s == "false" {
        return CellValue::Bool(s == "true");
    }
    CellValue::String(s.to_string())
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented):
///
/// ```json
/// [
///   { "experiment": "S_run1", "algorithm": "bfs_4", "time": 1.2, "yaml_size_kb": 10 },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<JobsTable, DataLoadError> {
    let text = std::fs::read_to_string(path).map_err(io_error(path))?;
    let root: JsonValue = serde_json::from_str(&text)?;

    let rows = root
        .as_array()
        .ok_or_else(|| DataLoadError::JsonShape("expected top-level JSON array".into()))?;

    let mut column_names: Vec<String> = Vec::new();
    let mut records = Vec::with_capacity(rows.len());

    for (i, row) in rows.iter().enumerate() {
        let obj = row
            .as_object()
            .ok_or_else(|| DataLoadError::JsonShape(format!("row {i} is not a JSON object")))?;

        for key in obj.keys() {
            if !column_names.contains(key) {
                column_names.push(key.clone());
            }
        }

        let record: Record = obj
            .iter()
            .map(|(key, val)| (key.clone(), json_to_cell(val)))
            .collect();
        records.push(record);
    }

    Ok(JobsTable::new(column_names, records))
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file; every column becomes a table column.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`, including
/// categorical columns) and **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<JobsTable, DataLoadError> {
    let file = std::fs::File::open(path).map_err(io_error(path))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let column_names = mangle_duplicates(
        builder
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect(),
    );
    let reader = builder.build()?;

    let mut records = Vec::new();

    for batch_result in reader {
        let batch = batch_result?;

        let mut columns = batch
            .columns()
            .iter()
            .map(|col| column_cells(col).map(Vec::into_iter))
            .collect::<Result<Vec<_>, _>>()?;

        for _ in 0..batch.num_rows() {
            let record: Record = column_names
                .iter()
                .zip(columns.iter_mut())
                .map(|(name, cells)| (name.clone(), cells.next().unwrap_or(CellValue::Null)))
                .collect();
            records.push(record);
        }
    }

    Ok(JobsTable::new(column_names, records))
}

/// Convert a whole Arrow column into cells.
///
/// Integers of any width become `Integer`, floats and decimals `Float`,
/// booleans `Bool`; every other type (strings, dictionaries, dates, ...)
/// is rendered to its display text.
fn column_cells(col: &ArrayRef) -> Result<Vec<CellValue>, ArrowError> {
    let data_type = col.data_type();

    if *data_type == DataType::UInt64 {
        return Ok(col
            .as_primitive::<UInt64Type>()
            .iter()
            .map(|v| match v {
                Some(v) => i64::try_from(v).map_or(CellValue::Float(v as f64), CellValue::Integer),
                None => CellValue::Null,
            })
            .collect());
    }

    if data_type.is_integer() {
        let ints = cast(col, &DataType::Int64)?;
        return Ok(ints
            .as_primitive::<Int64Type>()
            .iter()
            .map(|v| v.map_or(CellValue::Null, CellValue::Integer))
            .collect());
    }

    if data_type.is_floating()
        || matches!(data_type, DataType::Decimal128(..) | DataType::Decimal256(..))
    {
        let floats = cast(col, &DataType::Float64)?;
        return Ok(floats
            .as_primitive::<Float64Type>()
            .iter()
            .map(|v| v.map_or(CellValue::Null, CellValue::Float))
            .collect());
    }

    if *data_type == DataType::Boolean {
        return Ok(col
            .as_boolean()
            .iter()
            .map(|v| v.map_or(CellValue::Null, CellValue::Bool))
            .collect());
    }

    let options = FormatOptions::default();
    let formatter = ArrayFormatter::try_new(col.as_ref(), &options)?;
    Ok((0..col.len())
        .map(|row| {
            if col.is_null(row) {
                CellValue::Null
            } else {
                CellValue::String(formatter.value(row).to_string())
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Arc;

    use arrow::array::{
        DictionaryArray, Float64Array, Int16Array, Int64Array, StringArray, UInt32Array,
    };
    use arrow::datatypes::{Field, Int32Type, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    fn write_temp(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(suffix)
            .tempfile()
            .expect("create temp file");
        file.write_all(contents.as_bytes()).expect("write temp file");
        file
    }

    fn write_parquet(suffix: &str, batch: &RecordBatch) -> tempfile::NamedTempFile {
        let file = tempfile::Builder::new()
            .suffix(suffix)
            .tempfile()
            .expect("create temp file");
        let mut writer = ArrowWriter::try_new(file.reopen().expect("reopen"), batch.schema(), None)
            .expect("writer");
        writer.write(batch).expect("write batch");
        writer.close().expect("close writer");
        file
    }

    #[test]
    fn loads_semicolon_csv_with_extra_columns() {
        let file = write_temp(
            ".csv",
            "experiment;algorithm;time;yaml_size_kb;host\n\
             S_run1;bfs_4;1.2;10;node-a\n\
             L_run1;dfs_8;3;20;node-b\n",
        );
        let table = load_file(file.path()).expect("load csv");

        assert_eq!(table.len(), 2);
        assert_eq!(
            table.column_names,
            vec!["experiment", "algorithm", "time", "yaml_size_kb", "host"]
        );
        let first = &table.records[0];
        assert_eq!(first.get("experiment"), &CellValue::String("S_run1".into()));
        assert_eq!(first.get("time"), &CellValue::Float(1.2));
        assert_eq!(first.get("yaml_size_kb"), &CellValue::Integer(10));
        assert_eq!(first.get("host"), &CellValue::String("node-a".into()));
    }

    #[test]
    fn key_columns_stay_text() {
        let file = write_temp(
            ".csv",
            "experiment;algorithm;time;yaml_size_kb\n123;true;1;1\n",
        );
        let table = load_file(file.path()).expect("load csv");
        let row = &table.records[0];
        assert_eq!(row.get("experiment"), &CellValue::String("123".into()));
        assert_eq!(row.get("algorithm"), &CellValue::String("true".into()));
    }

    #[test]
    fn empty_and_missing_cells_are_null() {
        let file = write_temp(
            ".txt",
            "experiment;algorithm;time;yaml_size_kb\nC_x;a_1;;5\nC_y;b_2;4\n",
        );
        let table = load_file(file.path()).expect("load csv");
        assert!(table.records[0].get("time").is_null());
        assert_eq!(table.records[1].get("time"), &CellValue::Integer(4));
        assert!(table.records[1].get("yaml_size_kb").is_null());
    }

    #[test]
    fn long_row_is_rejected() {
        let file = write_temp(
            ".csv",
            "experiment;algorithm;time;yaml_size_kb\nS_a;b_1;1;2;3\n",
        );
        match load_file(file.path()) {
            Err(DataLoadError::RaggedRow {
                row,
                expected,
                found,
            }) => {
                assert_eq!((row, expected, found), (0, 4, 5));
            }
            other => panic!("expected ragged row error, got {other:?}"),
        }
    }

    #[test]
    fn missing_required_column_fails() {
        let file = write_temp(".csv", "experiment;algorithm;time\nS_a;b_1;1\n");
        match load_file(file.path()) {
            Err(DataLoadError::MissingColumn(col)) => assert_eq!(col, "yaml_size_kb"),
            other => panic!("expected missing column, got {other:?}"),
        }
    }

    #[test]
    fn comma_separated_file_is_missing_columns() {
        let file = write_temp(".csv", "experiment,algorithm,time,yaml_size_kb\nS_a,b_1,1,2\n");
        assert!(matches!(
            load_file(file.path()),
            Err(DataLoadError::MissingColumn(_))
        ));
    }

    #[test]
    fn unreadable_path_fails() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("nope.csv");
        assert!(matches!(
            load_file(&missing),
            Err(DataLoadError::Io { .. })
        ));
    }

    #[test]
    fn loads_json_records() {
        let file = write_temp(
            ".json",
            r#"[
                {"experiment": "S_run1", "algorithm": "bfs_4", "time": 1.5, "yaml_size_kb": 10},
                {"experiment": "L_run2", "algorithm": "dfs", "time": null, "yaml_size_kb": 3}
            ]"#,
        );
        let table = load_file(file.path()).expect("load json");
        assert_eq!(table.len(), 2);
        assert_eq!(table.records[0].get("time"), &CellValue::Float(1.5));
        assert!(table.records[1].get("time").is_null());
        assert_eq!(table.records[1].get("yaml_size_kb"), &CellValue::Integer(3));
    }

    #[test]
    fn json_must_be_an_array_of_objects() {
        let file = write_temp(".json", r#"{"experiment": "S_run1"}"#);
        assert!(matches!(
            load_file(file.path()),
            Err(DataLoadError::JsonShape(_))
        ));

        let file = write_temp(".json", "[1, 2]");
        assert!(matches!(
            load_file(file.path()),
            Err(DataLoadError::JsonShape(_))
        ));
    }

    #[test]
    fn loads_parquet_columns() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("experiment", DataType::Utf8, false),
            Field::new("algorithm", DataType::Utf8, false),
            Field::new("time", DataType::Float64, true),
            Field::new("yaml_size_kb", DataType::Int64, true),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec!["S_run1", "C_run2"])),
                Arc::new(StringArray::from(vec!["bfs_4", "dfs_16"])),
                Arc::new(Float64Array::from(vec![Some(2.5), None])),
                Arc::new(Int64Array::from(vec![Some(12), Some(7)])),
            ],
        )
        .expect("build batch");
        let file = write_parquet(".parquet", &batch);

        let table = load_file(file.path()).expect("load parquet");
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.records[1].get("algorithm"),
            &CellValue::String("dfs_16".into())
        );
        assert_eq!(table.records[0].get("time"), &CellValue::Float(2.5));
        assert!(table.records[1].get("time").is_null());
        assert_eq!(table.records[1].get("yaml_size_kb"), &CellValue::Integer(7));
    }

    #[test]
    fn categorical_and_narrow_parquet_columns_keep_their_values() {
        let experiments: DictionaryArray<Int32Type> =
            vec![Some("S_run1"), Some("L_run2"), None].into_iter().collect();
        let schema = Arc::new(Schema::new(vec![
            Field::new("experiment", experiments.data_type().clone(), true),
            Field::new("algorithm", DataType::Utf8, false),
            Field::new("time", DataType::Int16, true),
            Field::new("yaml_size_kb", DataType::UInt32, true),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(experiments),
                Arc::new(StringArray::from(vec!["bfs_4", "bfs_8", "bfs_8"])),
                Arc::new(Int16Array::from(vec![Some(9), Some(3), None])),
                Arc::new(UInt32Array::from(vec![Some(40), None, Some(2)])),
            ],
        )
        .expect("build batch");
        let file = write_parquet(".parquet", &batch);

        let table = load_file(file.path()).expect("load parquet");
        let experiments: Vec<&CellValue> =
            table.records.iter().map(|r| r.get("experiment")).collect();
        assert_eq!(
            experiments,
            vec![
                &CellValue::String("S_run1".into()),
                &CellValue::String("L_run2".into()),
                &CellValue::Null,
            ]
        );
        assert_eq!(table.records[0].get("time"), &CellValue::Integer(9));
        assert!(table.records[2].get("time").is_null());
        assert_eq!(table.records[0].get("yaml_size_kb"), &CellValue::Integer(40));
        assert!(table.records[1].get("yaml_size_kb").is_null());
    }

    #[test]
    fn parquet_is_detected_without_extension() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("experiment", DataType::Utf8, false),
            Field::new("algorithm", DataType::Utf8, false),
            Field::new("time", DataType::Float64, false),
            Field::new("yaml_size_kb", DataType::Int64, false),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec!["C_x"])),
                Arc::new(StringArray::from(vec!["scan_2"])),
                Arc::new(Float64Array::from(vec![1.0])),
                Arc::new(Int64Array::from(vec![5])),
            ],
        )
        .expect("build batch");
        let file = write_parquet(".csv", &batch);

        let table = load_file(file.path()).expect("load parquet");
        assert_eq!(table.records[0].get("yaml_size_kb"), &CellValue::Integer(5));
    }

    #[test]
    fn semicolon_text_named_json_loads_as_csv() {
        let file = write_temp(
            ".json",
            "experiment;algorithm;time;yaml_size_kb\nS_run1;bfs_4;1.5;10\n",
        );
        let table = load_file(file.path()).expect("load csv");
        assert_eq!(table.records[0].get("time"), &CellValue::Float(1.5));
    }

    #[test]
    fn format_sniffing() {
        assert_eq!(sniff_format(b"PAR1\x15\x04"), InputFormat::Parquet);
        assert_eq!(sniff_format(b"  \n[{\"a\": 1}]"), InputFormat::Json);
        assert_eq!(sniff_format(b"\xEF\xBB\xBF[]"), InputFormat::Json);
        assert_eq!(sniff_format(b"experiment;algorithm"), InputFormat::Csv);
        assert_eq!(sniff_format(b""), InputFormat::Csv);
    }

    #[test]
    fn pandas_null_markers_load_as_null() {
        let file = write_temp(
            ".csv",
            "experiment;algorithm;time;yaml_size_kb\n\
             S_a;b_1;NA;2\n\
             S_a;b_1;3.5;null\n\
             NA;N/A;#N/A;None\n\
             S_a;b_1;NaN;<NA>\n",
        );
        let table = load_file(file.path()).expect("load csv");

        assert!(table.records[0].get("time").is_null());
        assert!(table.records[1].get("yaml_size_kb").is_null());
        for column in ["experiment", "algorithm", "time", "yaml_size_kb"] {
            assert!(table.records[2].get(column).is_null(), "{column} should be null");
        }
        assert!(table.records[3].get("time").is_null());
        assert!(table.records[3].get("yaml_size_kb").is_null());
    }

    #[test]
    fn padded_numbers_parse() {
        let file = write_temp(
            ".csv",
            "experiment;algorithm;time;yaml_size_kb\nS_a;b_1; 1.5 ; 12\n",
        );
        let table = load_file(file.path()).expect("load csv");
        assert_eq!(table.records[0].get("time"), &CellValue::Float(1.5));
        assert_eq!(table.records[0].get("yaml_size_kb"), &CellValue::Integer(12));
    }

    #[test]
    fn duplicate_headers_keep_the_first_column() {
        let file = write_temp(
            ".csv",
            "experiment;algorithm;time;yaml_size_kb;time\nS_a;b_1;1;2;99\n",
        );
        let table = load_file(file.path()).expect("load csv");
        assert_eq!(
            table.column_names,
            vec!["experiment", "algorithm", "time", "yaml_size_kb", "time.1"]
        );
        assert_eq!(table.records[0].get("time"), &CellValue::Integer(1));
        assert_eq!(table.records[0].get("time.1"), &CellValue::Integer(99));
    }

    #[test]
    fn mangled_names_skip_existing_ones() {
        let names = ["a", "a.1", "a", "a", "b"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(mangle_duplicates(names), vec!["a", "a.1", "a.2", "a.3", "b"]);
    }
}
