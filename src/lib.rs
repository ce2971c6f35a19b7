//! Tracetool - run discovery and time alignment for multi-device recordings.
//!
//! An experiment session stores one CSV per device stream and run under
//! `<session>/processed`, with identity encoded in the file name:
//!
//! ```text
//! sub-01_ses-01_task-free_mod-adhawk_pupils.csv
//! └─┬──┘ └─┬──┘ └──┬────┘ └─┬──────┘ └─┬──┘
//!  subject session task    device    suffix
//! ```
//!
//! Files sharing `(sub, ses, task, condition, run)` form one [`RunData`],
//! whose signals share a single start time so devices with independent
//! clocks can be compared on one zero-based axis.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use tracetool::{get_modality_columns, load_session};
//!
//! let load = load_session(Path::new("data/sub-01/ses-01")).expect("session");
//! for diag in &load.diagnostics {
//!     eprintln!("{diag}");
//! }
//! let run = &load.runs[0];
//! for (modality, columns) in get_modality_columns(run) {
//!     let (t, values) = run.get_signal(&modality, &columns[0]).expect("column");
//!     println!("{modality}: {} samples from t={:.3}s", values.len(), t[0]);
//! }
//! ```

pub mod config;
pub mod data;
pub mod detect;
pub mod error;

pub use config::{CollisionPolicy, LoaderConfig};
pub use data::filename::{parse_path, parse_stem, ParsedName};
pub use data::filter::{filtered_indices, parse_filter, RunFilter};
pub use data::grouping::{group_runs, DiscoveredFile, Grouping, RunGroup, RunKey};
pub use data::loader::{CsvTableLoader, LoadOutcome, TableLoader};
pub use data::modality::{resolve_modality, NO_MODALITY};
pub use data::model::{EventSeries, RunData, RunSummary, Signal, SignalStatus};
pub use data::session::{
    get_modality_columns, list_modalities, load_session, Diagnostic, SessionLoad, SessionLoader,
};
pub use data::table::{Table, Value};
pub use detect::{run_detector, Detector};
pub use error::{
    AttachError, ConfigError, DetectError, FilterParseError, LookupError, ModelError,
    SessionError, TableError, TimeColumnError,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
