use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;

use crate::data::aggregate::{Number, Summary};

// ---------------------------------------------------------------------------
// Summary → Arrow
// ---------------------------------------------------------------------------

/// Build a value column: Int64 when every maximum is integral, else Float64.
fn number_column(name: &str, values: &[Option<Number>]) -> (Field, ArrayRef) {
    let all_integer = values
        .iter()
        .flatten()
        .all(|v| matches!(v, Number::Integer(_)));

    if all_integer {
        let array = Int64Array::from(
            values
                .iter()
                .map(|v| match v {
                    Some(Number::Integer(i)) => Some(*i),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        );
        (Field::new(name, DataType::Int64, true), Arc::new(array))
    } else {
        let array = Float64Array::from(
            values
                .iter()
                .map(|v| v.map(Number::as_f64))
                .collect::<Vec<_>>(),
        );
        (Field::new(name, DataType::Float64, true), Arc::new(array))
    }
}

/// Convert the summary into a single record batch with columns
/// `experiment`, `algorithm`, `time`, `yaml_size_kb`.
pub fn summary_to_batch(summary: &Summary) -> Result<RecordBatch, ArrowError> {
    let experiments = StringArray::from(
        summary
            .rows
            .iter()
            .map(|r| r.experiment.as_str())
            .collect::<Vec<_>>(),
    );
    let algorithms = StringArray::from(
        summary
            .rows
            .iter()
            .map(|r| r.algorithm.as_str())
            .collect::<Vec<_>>(),
    );
    let times: Vec<Option<Number>> = summary.rows.iter().map(|r| r.time).collect();
    let sizes: Vec<Option<Number>> = summary.rows.iter().map(|r| r.yaml_size_kb).collect();

    let (time_field, time_array) = number_column("time", &times);
    let (size_field, size_array) = number_column("yaml_size_kb", &sizes);

    let schema = Arc::new(Schema::new(vec![
        Field::new("experiment", DataType::Utf8, false),
        Field::new("algorithm", DataType::Utf8, false),
        time_field,
        size_field,
    ]));

    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(experiments),
            Arc::new(algorithms),
            time_array,
            size_array,
        ],
    )
}

// ---------------------------------------------------------------------------
// Text rendering
// ---------------------------------------------------------------------------

/// Render the summary as a boxed text table, one line per group.
pub fn render_summary(summary: &Summary) -> Result<String, ArrowError> {
    let batch = summary_to_batch(summary)?;
    Ok(pretty_format_batches(&[batch])?.to_string())
}
