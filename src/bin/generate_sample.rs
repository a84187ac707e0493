use std::sync::Arc;

use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use serde::Serialize;

/// One timing record as written to the sample files.
#[derive(Debug, Serialize)]
struct SampleRow {
    experiment: String,
    algorithm: String,
    time: Option<f64>,
    yaml_size_kb: Option<i64>,
    run: i64,
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
}

fn main() {
    let mut rng = SimpleRng::new(42);

    let prefixes = ["S_", "L_", "C_", ""];
    let experiments = ["matmul", "stencil", "sort"];
    let algorithms = ["bfs", "dfs", "work_stealing"];
    let core_counts = [None, Some(1), Some(4), Some(16)];
    let repeats = 3;

    let mut rows = Vec::new();
    for prefix in &prefixes {
        for experiment in &experiments {
            for algorithm in &algorithms {
                for cores in &core_counts {
                    let parallel = cores.unwrap_or(1) as f64;
                    for run in 0..repeats {
                        let base = 10.0 + 40.0 * rng.next_f64();
                        // Roughly one in twenty cells left empty.
                        let time = (rng.next_f64() > 0.05)
                            .then(|| (base / parallel.sqrt() * 1000.0).round() / 1000.0);
                        let yaml_size_kb = (rng.next_f64() > 0.05)
                            .then(|| 8 + (rng.next_u64() % 120) as i64);

                        rows.push(SampleRow {
                            experiment: format!("{prefix}{experiment}"),
                            algorithm: match cores {
                                Some(n) => format!("{algorithm}_{n}"),
                                None => algorithm.to_string(),
                            },
                            time,
                            yaml_size_kb,
                            run,
                        });
                    }
                }
            }
        }
    }

    // Semicolon CSV
    let csv_path = "sample_jobs.csv";
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_path(csv_path)
        .expect("Failed to create CSV file");
    for row in &rows {
        writer.serialize(row).expect("Failed to write CSV row");
    }
    writer.flush().expect("Failed to flush CSV file");

    // Parquet
    let schema = Arc::new(Schema::new(vec![
        Field::new("experiment", DataType::Utf8, false),
        Field::new("algorithm", DataType::Utf8, false),
        Field::new("time", DataType::Float64, true),
        Field::new("yaml_size_kb", DataType::Int64, true),
        Field::new("run", DataType::Int64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(
                rows.iter().map(|r| r.experiment.as_str()).collect::<Vec<_>>(),
            )),
            Arc::new(StringArray::from(
                rows.iter().map(|r| r.algorithm.as_str()).collect::<Vec<_>>(),
            )),
            Arc::new(Float64Array::from(
                rows.iter().map(|r| r.time).collect::<Vec<_>>(),
            )),
            Arc::new(Int64Array::from(
                rows.iter().map(|r| r.yaml_size_kb).collect::<Vec<_>>(),
            )),
            Arc::new(Int64Array::from(
                rows.iter().map(|r| r.run).collect::<Vec<_>>(),
            )),
        ],
    )
    .expect("Failed to create RecordBatch");

    let parquet_path = "sample_jobs.parquet";
    let file = std::fs::File::create(parquet_path).expect("Failed to create output file");
    let mut writer = ArrowWriter::try_new(file, schema, None).expect("Failed to create writer");
    writer.write(&batch).expect("Failed to write batch");
    writer.close().expect("Failed to close writer");

    println!(
        "Wrote {} timing records to {csv_path} and {parquet_path}",
        rows.len()
    );
}
