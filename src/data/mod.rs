/// Data layer: core types, loading, filtering and cross-filtering.
///
/// Architecture:
/// ```text
///  patients.csv / events.parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → EntityTable (two header rows: names, types)
///   └──────────┘
///        │
///        ▼
///   ┌─────────────┐
///   │ EntityTable  │  Vec<Entity>, Vec<Column>, uid index
///   └─────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  typed predicates, AND-reducer → filtered rows
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  cross    │  carry the filtered view over the pid link
///   └──────────┘
/// ```

pub mod cohort;
pub mod columns;
pub mod cross;
pub mod filter;
pub mod loader;
pub mod model;
pub mod sorting;
