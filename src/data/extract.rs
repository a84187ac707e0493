use std::sync::LazyLock;

use regex::Regex;

use super::model::{CellValue, JobsTable};
use crate::error::DataLoadError;

/// `S_`, `L_` or `C_` at the start of an experiment name.
static CSL_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([SLC])_").expect("csl prefix pattern"));

/// `_<digits>` at the end of an algorithm name.
static CORES_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_([0-9]+)$").expect("cores suffix pattern"));

pub const CSL_COLUMN: &str = "csl";
pub const CORES_COLUMN: &str = "cores";

/// Split an experiment name into its category letter and the bare name.
///
/// `"S_run1"` gives `(Some('S'), "run1")`; names without the prefix come back
/// unchanged. Only one leading prefix is ever removed.
pub fn split_csl(experiment: &str) -> (Option<char>, &str) {
    match CSL_PREFIX.captures(experiment) {
        Some(caps) => {
            let letter = caps[1].chars().next();
            (letter, &experiment[caps[0].len()..])
        }
        None => (None, experiment),
    }
}

/// Split an algorithm name into the bare name and its core-count digits.
///
/// `"bfs_4"` gives `("bfs", Some("4"))`; `"bfs_4_8"` gives `("bfs_4", Some("8"))`.
pub fn split_cores(algorithm: &str) -> (&str, Option<&str>) {
    match CORES_SUFFIX.captures(algorithm) {
        Some(caps) => {
            let whole = caps.get(0).map_or(algorithm.len(), |m| m.start());
            let digits = caps.get(1).map(|m| m.as_str());
            (&algorithm[..whole], digits)
        }
        None => (algorithm, None),
    }
}

/// Add the `csl` and `cores` columns and strip their source text from
/// `experiment` and `algorithm`, in place.
pub fn derive_fields(table: &mut JobsTable) -> Result<(), DataLoadError> {
    let mut with_csl = 0usize;
    let mut with_cores = 0usize;

    for (row, record) in table.records.iter_mut().enumerate() {
        let (csl, experiment) = match record.get("experiment").as_text() {
            Some(text) => {
                let (csl, rest) = split_csl(&text);
                (csl, CellValue::String(rest.to_string()))
            }
            None => (None, CellValue::Null),
        };

        let (cores, algorithm) = match record.get("algorithm").as_text() {
            Some(text) => {
                let (rest, digits) = split_cores(&text);
                let cores = digits
                    .map(|d| {
                        d.parse::<i64>().map_err(|_| DataLoadError::CoresOutOfRange {
                            row,
                            digits: d.to_string(),
                        })
                    })
                    .transpose()?;
                (cores, CellValue::String(rest.to_string()))
            }
            None => (None, CellValue::Null),
        };

        with_csl += usize::from(csl.is_some());
        with_cores += usize::from(cores.is_some());

        record.set(
            CSL_COLUMN,
            csl.map_or(CellValue::Null, |c| CellValue::String(c.to_string())),
        );
        record.set("experiment", experiment);
        record.set(CORES_COLUMN, cores.map_or(CellValue::Null, CellValue::Integer));
        record.set("algorithm", algorithm);
    }

    table.ensure_column(CSL_COLUMN);
    table.ensure_column(CORES_COLUMN);

    log::debug!(
        "Derived fields for {} records: {} with csl, {} with cores",
        table.len(),
        with_csl,
        with_cores
    );
    Ok(())
}
