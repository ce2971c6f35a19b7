use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};

use super::table::{Table, Value};

// ---------------------------------------------------------------------------
// Loader seam
// ---------------------------------------------------------------------------

/// Turns one device file into a table with a timestamp column plus arbitrary
/// value columns. Vendor-specific parsers plug in here.
pub trait TableLoader {
    fn load(&self, path: &Path) -> Result<Table>;
}

impl<F> TableLoader for F
where
    F: Fn(&Path) -> Result<Table>,
{
    fn load(&self, path: &Path) -> Result<Table> {
        self(path)
    }
}

/// Result of loading one file, kept explicit so an empty stream and a
/// failed load stay distinguishable.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Loaded(Table),
    Failed { reason: String },
}

/// Run `loader` on `path`, folding any error into [`LoadOutcome::Failed`].
pub fn load_outcome(loader: &dyn TableLoader, path: &Path) -> LoadOutcome {
    match loader.load(path) {
        Ok(table) => {
            log::debug!(
                "Loaded {} ({} rows, columns {:?})",
                path.display(),
                table.num_rows(),
                table.column_names()
            );
            LoadOutcome::Loaded(table)
        }
        Err(e) => LoadOutcome::Failed {
            reason: format!("{e:#}"),
        },
    }
}

// ---------------------------------------------------------------------------
// Generic CSV loader
// ---------------------------------------------------------------------------

/// Header row plus one record per sample. Cell types are guessed.
/// A zero-byte file is an empty table.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvTableLoader;

impl TableLoader for CsvTableLoader {
    fn load(&self, path: &Path) -> Result<Table> {
        load_csv(path)
    }
}

fn load_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_path(path)
        .with_context(|| format!("opening CSV {}", path.display()))?;

    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();
    let headers = dedup_headers(headers);

    if headers.is_empty() {
        return Ok(Table::default());
    }

    let mut table = Table::new(headers).context("CSV header")?;

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let row = record.iter().map(Value::guess).collect();
        table
            .push_row(row)
            .with_context(|| format!("CSV row {row_no}"))?;
    }

    Ok(table)
}

/// Rename repeated header names to `x.1`, `x.2`, ... in order of
/// appearance, skipping any name the file already uses.
fn dedup_headers(headers: Vec<String>) -> Vec<String> {
    let mut taken: HashSet<String> = headers.iter().cloned().collect();
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut seen: HashSet<String> = HashSet::new();

    headers
        .into_iter()
        .map(|name| {
            if seen.insert(name.clone()) {
                return name;
            }
            let n = counts.entry(name.clone()).or_insert(0);
            loop {
                *n += 1;
                let candidate = format!("{name}.{n}");
                if taken.insert(candidate.clone()) {
                    log::debug!("renamed duplicate CSV column '{name}' to '{candidate}'");
                    return candidate;
                }
            }
        })
        .collect()
}
