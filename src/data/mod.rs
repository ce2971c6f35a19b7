/// Data layer: filename decoding, run grouping, loading and the run model.
///
/// Architecture:
/// ```text
///  <session>/processed/*.csv
///        │
///        ▼
///   ┌──────────┐
///   │ filename  │  stem → key/value pairs + suffix
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ grouping  │  (sub, ses, task, condition, run) → RunGroup
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ session   │  modality names, table loading, start time
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  model    │  RunData, aligned get_signal
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  metadata predicates → selected runs
///   └──────────┘
/// ```

pub mod filename;
pub mod filter;
pub mod grouping;
pub mod loader;
pub mod modality;
pub mod model;
pub mod session;
pub mod table;
pub mod time;
