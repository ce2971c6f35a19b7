use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use super::filename::parse_path;
use super::grouping::{group_runs, DiscoveredFile, RunGroup, RunKey};
use super::loader::{load_outcome, CsvTableLoader, TableLoader};
use super::modality::{resolve_modality, NO_MODALITY};
use super::model::{RunData, Signal};
use crate::config::{CollisionPolicy, LoaderConfig};
use crate::error::SessionError;

/// Filename keys that never end up in `RunData::metadata`.
pub const NON_METADATA_KEYS: [&str; 3] = ["sub", "ses", "mod"];

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// Something the loader recovered from instead of failing the session.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// No `key-value` token in the name; the file belongs to no run.
    UnparseableFilename { path: PathBuf },
    /// No `mod` token; the signal is keyed as `"none"`.
    MissingDeviceTag { path: PathBuf },
    /// The table could not be loaded; the signal is kept as failed.
    TableLoadFailed { path: PathBuf, reason: String },
    /// Two files resolved to the same modality within a run.
    ModalityCollision {
        run: RunKey,
        modality: String,
        kept: PathBuf,
        discarded: PathBuf,
    },
    /// No signal of the run had a usable first timestamp.
    EmptyRun { run: RunKey },
    RunRejected { run: RunKey, reason: String },
    /// Files without any identity field, next to properly keyed runs.
    AnonymousRun { files: usize },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnparseableFilename { path } => {
                write!(f, "{}: no key-value tokens in file name, skipped", path.display())
            }
            Diagnostic::MissingDeviceTag { path } => {
                write!(f, "{}: no 'mod' token, stored as '{NO_MODALITY}'", path.display())
            }
            Diagnostic::TableLoadFailed { path, reason } => {
                write!(f, "{}: load failed: {reason}", path.display())
            }
            Diagnostic::ModalityCollision {
                run,
                modality,
                kept,
                discarded,
            } => write!(
                f,
                "{run}: modality '{modality}' from {} replaces {}",
                kept.display(),
                discarded.display()
            ),
            Diagnostic::EmptyRun { run } => {
                write!(f, "{run}: no signal with a usable timestamp, run skipped")
            }
            Diagnostic::RunRejected { run, reason } => write!(f, "{run}: run rejected: {reason}"),
            Diagnostic::AnonymousRun { files } => write!(
                f,
                "{files} file(s) carry no sub/ses/task/condition/run token and were grouped as one run"
            ),
        }
    }
}

/// Everything one `load` produced.
#[derive(Debug, Clone)]
pub struct SessionLoad {
    pub runs: Vec<RunData>,
    pub diagnostics: Vec<Diagnostic>,
    /// The session's `derived` directory, when present.
    pub derived_dir: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// SessionLoader
// ---------------------------------------------------------------------------

pub struct SessionLoader<L = CsvTableLoader> {
    config: LoaderConfig,
    loader: L,
}

impl SessionLoader<CsvTableLoader> {
    pub fn new(config: LoaderConfig) -> Self {
        Self::with_loader(config, CsvTableLoader)
    }
}

impl Default for SessionLoader<CsvTableLoader> {
    fn default() -> Self {
        Self::new(LoaderConfig::default())
    }
}

impl<L: TableLoader> SessionLoader<L> {
    pub fn with_loader(config: LoaderConfig, loader: L) -> Self {
        Self { config, loader }
    }

    /// Device tables under `<session>/processed`, sorted by path.
    pub fn discover(&self, session: &Path) -> Result<Vec<PathBuf>, SessionError> {
        let dir = self.config.processed_path(session);
        if !dir.is_dir() {
            return Err(SessionError::MissingProcessedDir(dir));
        }
        let io_err = |source| SessionError::Io {
            path: dir.clone(),
            source,
        };

        let mut files = Vec::new();
        for entry in std::fs::read_dir(&dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.is_file() && self.config.matches_extension(&path) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Load every run of the session at `session`.
    ///
    /// Per-file and per-run problems end up in `diagnostics`; only a missing
    /// or unreadable `processed` directory fails the call.
    pub fn load(&self, session: &Path) -> Result<SessionLoad, SessionError> {
        let files = self.discover(session)?;
        log::info!(
            "Discovered {} file(s) under {}",
            files.len(),
            self.config.processed_path(session).display()
        );

        let grouping = group_runs(files.into_iter().map(|path| DiscoveredFile {
            parsed: parse_path(&path),
            path,
        }));

        let mut diagnostics: Vec<Diagnostic> = grouping
            .unparseable
            .into_iter()
            .map(|path| Diagnostic::UnparseableFilename { path })
            .collect();

        if grouping.groups.len() > 1 {
            if let Some(anon) = grouping.groups.iter().find(|g| g.key.is_anonymous()) {
                diagnostics.push(Diagnostic::AnonymousRun {
                    files: anon.files.len(),
                });
            }
        }

        let mut runs = Vec::with_capacity(grouping.groups.len());
        for group in grouping.groups {
            if let Some(run) = self.build_run(group, &mut diagnostics) {
                log::info!(
                    "Loaded run {} with {} signal(s), start {}",
                    run_label(&run),
                    run.raw_signals().len(),
                    run.start_time
                );
                runs.push(run);
            }
        }

        for diag in &diagnostics {
            log::warn!("{diag}");
        }

        let derived = self.config.derived_path(session);
        let derived_dir = derived.is_dir().then_some(derived);
        if let Some(dir) = &derived_dir {
            log::debug!("Derived outputs available under {}", dir.display());
        }

        Ok(SessionLoad {
            runs,
            diagnostics,
            derived_dir,
        })
    }

    fn build_run(&self, group: RunGroup, diagnostics: &mut Vec<Diagnostic>) -> Option<RunData> {
        let RunGroup { key, files } = group;

        let metadata: BTreeMap<String, String> = files
            .first()
            .map(|f| {
                f.parsed
                    .pairs
                    .iter()
                    .filter(|(k, _)| !NON_METADATA_KEYS.contains(&k.as_str()))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default();

        let mut signals: BTreeMap<String, Signal> = BTreeMap::new();
        let mut collided = false;

        for file in files {
            let modality = resolve_modality(&file.parsed);
            if modality.is_none() {
                diagnostics.push(Diagnostic::MissingDeviceTag {
                    path: file.path.clone(),
                });
            }
            let name = modality.unwrap_or_else(|| NO_MODALITY.to_string());

            log::debug!("Loading {} as '{name}'", file.path.display());
            let outcome = load_outcome(&self.loader, &file.path);
            let signal = Signal::from_outcome(
                name.clone(),
                file.parsed.get("mod").map(str::to_string),
                file.path,
                outcome,
                &self.config.time_column,
            )
            .with_sampling_rate(self.config.sampling_rates.get(&name).copied());

            // Covers loader errors and tables with a bad time column.
            if let Some(reason) = signal.failure_reason() {
                diagnostics.push(Diagnostic::TableLoadFailed {
                    path: signal.source.clone(),
                    reason: reason.to_string(),
                });
            }

            if let Some(previous) = signals.insert(name.clone(), signal) {
                collided = true;
                diagnostics.push(Diagnostic::ModalityCollision {
                    run: key.clone(),
                    modality: name.clone(),
                    kept: signals[&name].source.clone(),
                    discarded: previous.source,
                });
            }
        }

        if collided && self.config.collision_policy == CollisionPolicy::RejectRun {
            diagnostics.push(Diagnostic::RunRejected {
                run: key,
                reason: "modality collision".to_string(),
            });
            return None;
        }

        match RunData::new(&key, metadata, signals) {
            Ok(run) => Some(run),
            Err(_) => {
                diagnostics.push(Diagnostic::EmptyRun { run: key });
                None
            }
        }
    }

    /// Distinct modality identifiers of every table under `processed`.
    pub fn list_modalities(&self, session: &Path) -> Result<BTreeSet<String>, SessionError> {
        Ok(self
            .discover(session)?
            .iter()
            .filter_map(|path| resolve_modality(&parse_path(path)))
            .collect())
    }
}

fn run_label(run: &RunData) -> String {
    let field = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
    format!(
        "sub={} ses={} run={}",
        field(&run.subject),
        field(&run.session),
        field(&run.run)
    )
}

// ---------------------------------------------------------------------------
// Convenience entry points and consumer queries
// ---------------------------------------------------------------------------

/// Load `session` with the default configuration and CSV loader.
pub fn load_session(session: &Path) -> Result<SessionLoad, SessionError> {
    SessionLoader::new(LoaderConfig::default()).load(session)
}

/// Distinct modality identifiers under `<session>/processed`, sorted.
pub fn list_modalities(session: &Path) -> Result<BTreeSet<String>, SessionError> {
    SessionLoader::new(LoaderConfig::default()).list_modalities(session)
}

/// Timestamp bookkeeping columns: name contains `time` or `utc`, any case.
pub fn is_time_column(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("time") || lower.contains("utc")
}

/// For each modality of `run`, its value columns in table order, without
/// timestamp columns.
pub fn get_modality_columns(run: &RunData) -> BTreeMap<String, Vec<String>> {
    run.raw_signals()
        .iter()
        .map(|(modality, signal)| {
            let columns = signal
                .data
                .column_names()
                .iter()
                .filter(|c| !is_time_column(c))
                .cloned()
                .collect();
            (modality.clone(), columns)
        })
        .collect()
}
