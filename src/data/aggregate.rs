use std::collections::BTreeMap;

use super::model::{CellValue, JobsTable};
use crate::error::DataLoadError;

/// Columns whose per-group maximum is reported.
pub const VALUE_COLUMNS: [&str; 2] = ["time", "yaml_size_kb"];

// ---------------------------------------------------------------------------
// Summary rows
// ---------------------------------------------------------------------------

/// A numeric maximum, keeping integer columns integral.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Integer(i64),
    Float(f64),
}

impl Number {
    fn from_cell(cell: &CellValue) -> Option<Number> {
        match cell {
            CellValue::Integer(i) => Some(Number::Integer(*i)),
            CellValue::Float(f) if !f.is_nan() => Some(Number::Float(*f)),
            _ => None,
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Number::Integer(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    /// Integers compare exactly; anything involving a float goes through `f64`.
    fn exceeds(self, other: Number) -> bool {
        match (self, other) {
            (Number::Integer(a), Number::Integer(b)) => a > b,
            _ => self.as_f64() > other.as_f64(),
        }
    }
}

/// One output row: the maxima of a single `(experiment, algorithm)` group.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub experiment: String,
    pub algorithm: String,
    pub time: Option<Number>,
    pub yaml_size_kb: Option<Number>,
}

/// Grouped maxima in ascending key order. Keys are unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    pub rows: Vec<SummaryRow>,
}

impl Summary {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Running maxima of one group, one slot per value column.
#[derive(Debug, Default)]
struct MaxAccumulator {
    maxima: [Option<Number>; 2],
}

impl MaxAccumulator {
    fn update(&mut self, slot: usize, value: Number) {
        let replace = match self.maxima[slot] {
            Some(best) => value.exceeds(best),
            None => true,
        };
        if replace {
            self.maxima[slot] = Some(value);
        }
    }
}

/// Group records by `(experiment, algorithm)` and take the maximum of each
/// value column. Nulls are ignored; records with a null key join no group.
pub fn summarize(table: &JobsTable) -> Result<Summary, DataLoadError> {
    let mut groups: BTreeMap<(String, String), MaxAccumulator> = BTreeMap::new();
    let mut skipped = 0usize;

    for (row, record) in table.records.iter().enumerate() {
        let (CellValue::String(experiment), CellValue::String(algorithm)) =
            (record.get("experiment"), record.get("algorithm"))
        else {
            skipped += 1;
            continue;
        };

        let acc = groups
            .entry((experiment.clone(), algorithm.clone()))
            .or_default();

        for (slot, column) in VALUE_COLUMNS.iter().enumerate() {
            let cell = record.get(column);
            if cell.is_null() {
                continue;
            }
            match (Number::from_cell(cell), cell) {
                (Some(value), _) => acc.update(slot, value),
                (None, CellValue::Float(_)) => {} // NaN
                (None, other) => {
                    return Err(DataLoadError::NotNumeric {
                        row,
                        column: column.to_string(),
                        value: other.to_string(),
                    });
                }
            }
        }
    }

    if skipped > 0 {
        log::debug!("Skipped {skipped} records with a null experiment or algorithm");
    }

    let rows: Vec<SummaryRow> = groups
        .into_iter()
        .map(|((experiment, algorithm), acc)| {
            let [time, yaml_size_kb] = acc.maxima;
            SummaryRow {
                experiment,
                algorithm,
                time,
                yaml_size_kb,
            }
        })
        .collect();

    log::debug!("Summarised {} records into {} groups", table.len(), rows.len());
    Ok(Summary { rows })
}
