/// Data layer: sheet model, loading, and temperature windows.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet / directory
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse files → Workbook
///   └──────────┘
///        │
///        ▼
///   ┌──────────────┐
///   │   Workbook    │  sheet name → RawTable (header + cells)
///   └──────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  window   │  temperature bounds → closed sample range
///   └──────────┘
/// ```

pub mod loader;
pub mod model;
pub mod window;
