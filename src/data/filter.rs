use std::collections::{BTreeMap, BTreeSet};

use super::model::RunData;
use crate::error::FilterParseError;

// ---------------------------------------------------------------------------
// Filter predicate: which values are accepted per run field
// ---------------------------------------------------------------------------

/// Per-field selection: maps field name → set of accepted values.
pub type RunFilter = BTreeMap<String, BTreeSet<String>>;

/// Value of `field` for `run`: identity fields first, then metadata.
pub fn run_field<'a>(run: &'a RunData, field: &str) -> Option<&'a str> {
    match field {
        "sub" => run.subject.as_deref(),
        "ses" => run.session.as_deref(),
        "run" => run.run.as_deref(),
        other => run.metadata.get(other).map(String::as_str),
    }
}

/// Parse `field=value[,value...]` arguments into a [`RunFilter`].
/// Repeating a field widens its accepted set.
pub fn parse_filter<S: AsRef<str>>(args: &[S]) -> Result<RunFilter, FilterParseError> {
    let mut filter = RunFilter::new();
    for arg in args {
        let arg = arg.as_ref();
        let (field, values) = arg
            .split_once('=')
            .ok_or_else(|| FilterParseError::MissingEquals(arg.to_string()))?;
        let field = field.trim();
        if field.is_empty() {
            return Err(FilterParseError::EmptyField(arg.to_string()));
        }
        let accepted = filter.entry(field.to_string()).or_default();
        accepted.extend(
            values
                .split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string),
        );
    }
    Ok(filter)
}

/// Return indices of runs that pass all filters.
///
/// A run passes a field filter when:
/// * The accepted set is empty → nothing selected → fails
/// * The run has no value for the field → fails
/// * The run's value is in the accepted set → passes
pub fn filtered_indices(runs: &[RunData], filter: &RunFilter) -> Vec<usize> {
    runs.iter()
        .enumerate()
        .filter(|(_, run)| {
            filter.iter().all(|(field, accepted)| {
                run_field(run, field).is_some_and(|value| accepted.contains(value))
            })
        })
        .map(|(i, _)| i)
        .collect()
}
