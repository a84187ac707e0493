use std::collections::BTreeMap;
use std::fmt;

use crate::error::DataLoadError;

// ---------------------------------------------------------------------------
// CellValue – a single cell of the loaded table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell mirroring the dtypes a timing export contains.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v:?}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    /// Text view used for pattern matching; `None` only for `Null`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            CellValue::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

// ---------------------------------------------------------------------------
// Record – one row of the table
// ---------------------------------------------------------------------------

/// A single timing record: column_name → value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub cells: BTreeMap<String, CellValue>,
}

impl Record {
    /// Value of `column`, `Null` when the record has no such cell.
    pub fn get(&self, column: &str) -> &CellValue {
        self.cells.get(column).unwrap_or(&CellValue::Null)
    }

    pub fn set(&mut self, column: &str, value: CellValue) {
        self.cells.insert(column.to_string(), value);
    }
}

impl<K: Into<String>> FromIterator<(K, CellValue)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, CellValue)>>(iter: I) -> Self {
        Record {
            cells: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// JobsTable – the complete loaded table
// ---------------------------------------------------------------------------

/// Columns every input file must provide.
pub const REQUIRED_COLUMNS: [&str; 4] = ["experiment", "algorithm", "time", "yaml_size_kb"];

/// The full in-memory table.
#[derive(Debug, Clone, Default)]
pub struct JobsTable {
    /// Column names in file order; derived columns are appended.
    pub column_names: Vec<String>,
    /// All records (rows).
    pub records: Vec<Record>,
}

impl JobsTable {
    pub fn new(column_names: Vec<String>, records: Vec<Record>) -> Self {
        JobsTable {
            column_names,
            records,
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_names.iter().any(|c| c == column)
    }

    /// Register a column name if it is not already present.
    pub fn ensure_column(&mut self, column: &str) {
        if !self.has_column(column) {
            self.column_names.push(column.to_string());
        }
    }

    /// Fail with the first of [`REQUIRED_COLUMNS`] that is missing.
    pub fn require_columns(&self) -> Result<(), DataLoadError> {
        match REQUIRED_COLUMNS.iter().find(|c| !self.has_column(c)) {
            Some(missing) => Err(DataLoadError::MissingColumn(missing.to_string())),
            None => Ok(()),
        }
    }
}
