/// Data layer: core types, loading, field derivation and grouping.
///
/// Architecture:
/// ```text
///  .csv (;) / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader  │  parse file → JobsTable
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ extract  │  csl / cores split out of experiment / algorithm
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ aggregate │  group by (experiment, algorithm) → Summary of maxima
///   └───────────┘
/// ```

pub mod aggregate;
pub mod extract;
pub mod loader;
pub mod model;
