/// Data layer: core types, loading, filtering and aggregation.
///
/// Architecture:
/// ```text
///  .xlsx / .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → RawTable → ListingTable (coerce)
///   └──────────┘
///        │
///        ▼
///   ┌──────────────┐
///   │ ListingTable │  Vec<Listing>, available fields, unique values
///   └──────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  apply FilterCriteria → TableView (rows + masks)
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ aggregate │  grouped mean / median / count, overall average
///   └───────────┘
/// ```

pub mod aggregate;
pub mod coerce;
pub mod filter;
pub mod loader;
pub mod model;
