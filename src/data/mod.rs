/// Data layer: core types and loading.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Table (named, untyped columns)
///   └──────────┘
///        │  ColumnMapping
///        ▼
///   ┌───────────────────┐
///   │ ObservationSeries │  time-ordered (t, estimate, lcl, ucl)
///   └───────────────────┘
/// ```

pub mod loader;
pub mod model;
