use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::grouping::RunKey;
use super::loader::LoadOutcome;
use super::table::{Table, Value};
use super::time::{seconds_since, timestamp_from_value};
use crate::error::{AttachError, LookupError, ModelError, TimeColumnError};

// ---------------------------------------------------------------------------
// Signal – one device stream of one run
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SignalStatus {
    Loaded,
    Failed { reason: String },
}

#[derive(Debug, Clone)]
pub struct Signal {
    /// Modality identifier, e.g. `adhawk_pupils`.
    pub name: String,
    /// Device/vendor tag, e.g. `adhawk`.
    pub modality: Option<String>,
    /// File the table came from.
    pub source: PathBuf,
    pub data: Table,
    /// Nominal rate in Hz; `None` for irregular or unknown devices.
    pub sampling_rate: Option<f64>,
    pub status: SignalStatus,
    /// Parsed time column, one entry per row of `data`. `None` where the
    /// cell was blank.
    timestamps: Vec<Option<DateTime<Utc>>>,
}

impl Signal {
    /// Build a signal from a load outcome. A loaded table whose time column
    /// is missing or holds an unparseable cell is downgraded to a failed
    /// signal. Blank time cells are kept as rows without a timestamp.
    pub fn from_outcome(
        name: String,
        modality: Option<String>,
        source: PathBuf,
        outcome: LoadOutcome,
        time_column: &str,
    ) -> Self {
        let (data, timestamps, status) = match outcome {
            LoadOutcome::Loaded(table) => match parse_time_column(&table, time_column) {
                Ok(ts) => (table, ts, SignalStatus::Loaded),
                Err(e) => (
                    Table::default(),
                    Vec::new(),
                    SignalStatus::Failed {
                        reason: e.to_string(),
                    },
                ),
            },
            LoadOutcome::Failed { reason } => {
                (Table::default(), Vec::new(), SignalStatus::Failed { reason })
            }
        };
        Signal {
            name,
            modality,
            source,
            data,
            sampling_rate: None,
            status,
            timestamps,
        }
    }

    pub fn with_sampling_rate(mut self, rate: Option<f64>) -> Self {
        self.sampling_rate = rate;
        self
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, SignalStatus::Failed { .. })
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match &self.status {
            SignalStatus::Failed { reason } => Some(reason),
            SignalStatus::Loaded => None,
        }
    }

    pub fn timestamps(&self) -> &[Option<DateTime<Utc>>] {
        &self.timestamps
    }

    /// Timestamp of the first row that has one.
    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamps.iter().flatten().next().copied()
    }

    pub fn len(&self) -> usize {
        self.data.num_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Parse every cell of `column`. A header-only or column-less table with no
/// rows is accepted as an empty stream.
///
/// Blank cells become `None`. A non-blank cell that does not parse, or a
/// column with rows but no timestamp at all, is an error.
fn parse_time_column(
    table: &Table,
    column: &str,
) -> Result<Vec<Option<DateTime<Utc>>>, TimeColumnError> {
    let Some(cells) = table.column(column) else {
        if table.is_empty() {
            return Ok(Vec::new());
        }
        return Err(TimeColumnError::Missing(column.to_string()));
    };
    let timestamps = cells
        .iter()
        .enumerate()
        .map(|(row, cell)| {
            if is_blank(cell) {
                return Ok(None);
            }
            timestamp_from_value(cell)
                .map(Some)
                .ok_or_else(|| TimeColumnError::Unparseable {
                    row,
                    value: cell.to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if !timestamps.is_empty() && timestamps.iter().all(Option::is_none) {
        return Err(TimeColumnError::NoTimestamps(column.to_string()));
    }
    Ok(timestamps)
}

fn is_blank(cell: &Value) -> bool {
    match cell {
        Value::String(s) => s.trim().is_empty(),
        other => other.is_null(),
    }
}

// ---------------------------------------------------------------------------
// EventSeries – detector output
// ---------------------------------------------------------------------------

/// Required columns of every event table.
pub const EVENT_COLUMNS: [&str; 2] = ["time", "type"];

#[derive(Debug, Clone)]
pub struct EventSeries {
    pub name: String,
    /// Columns `time`, `type`, plus detector-specific ones.
    pub events: Table,
    /// Producing detector, e.g. `detector:saccade`.
    pub source: String,
}

impl EventSeries {
    pub fn new(name: String, events: Table, source: String) -> Result<Self, AttachError> {
        for column in EVENT_COLUMNS {
            if !events.has_column(column) {
                return Err(AttachError::MissingColumn {
                    table: name,
                    column: column.to_string(),
                });
            }
        }
        Ok(EventSeries {
            name,
            events,
            source,
        })
    }
}

// ---------------------------------------------------------------------------
// RunData – the unit of analysis
// ---------------------------------------------------------------------------

/// One run: every device stream recorded during it, sharing `start_time`.
///
/// Signals are fixed at construction. Detections, annotations and metrics
/// can be attached afterwards but never removed or replaced.
#[derive(Debug, Clone)]
pub struct RunData {
    pub subject: Option<String>,
    pub session: Option<String>,
    pub run: Option<String>,
    /// Earliest first timestamp across `raw_signals`.
    pub start_time: DateTime<Utc>,
    /// Non-identity filename tokens (never `sub`, `ses` or `mod`).
    pub metadata: BTreeMap<String, String>,
    raw_signals: BTreeMap<String, Signal>,
    detections: BTreeMap<String, EventSeries>,
    annotations: Option<Table>,
    metrics: Option<Table>,
}

impl RunData {
    pub fn new(
        key: &RunKey,
        metadata: BTreeMap<String, String>,
        raw_signals: BTreeMap<String, Signal>,
    ) -> Result<Self, ModelError> {
        if raw_signals.is_empty() {
            return Err(ModelError::NoSignals);
        }
        let start_time = start_time(raw_signals.values()).ok_or(ModelError::NoStartTime)?;
        Ok(RunData {
            subject: key.subject.clone(),
            session: key.session.clone(),
            run: key.run.clone(),
            start_time,
            metadata,
            raw_signals,
            detections: BTreeMap::new(),
            annotations: None,
            metrics: None,
        })
    }

    pub fn raw_signals(&self) -> &BTreeMap<String, Signal> {
        &self.raw_signals
    }

    pub fn signal(&self, modality: &str) -> Option<&Signal> {
        self.raw_signals.get(modality)
    }

    pub fn detections(&self) -> &BTreeMap<String, EventSeries> {
        &self.detections
    }

    pub fn annotations(&self) -> Option<&Table> {
        self.annotations.as_ref()
    }

    pub fn metrics(&self) -> Option<&Table> {
        self.metrics.as_ref()
    }

    /// Samples of `column` in `modality` with their time in seconds since
    /// `start_time`. Both vectors have one entry per sample, in row order.
    /// Rows with a blank time cell get `NaN`.
    pub fn get_signal(&self, modality: &str, column: &str) -> Result<(Vec<f64>, &[Value]), LookupError> {
        let signal = self
            .raw_signals
            .get(modality)
            .ok_or_else(|| LookupError::UnknownModality(modality.to_string()))?;

        if let Some(reason) = signal.failure_reason() {
            return Err(LookupError::SignalFailed {
                modality: modality.to_string(),
                reason: reason.to_string(),
            });
        }

        let values = signal
            .data
            .column(column)
            .ok_or_else(|| LookupError::UnknownColumn {
                modality: modality.to_string(),
                column: column.to_string(),
            })?;

        let relative = signal
            .timestamps
            .iter()
            .map(|t| t.map_or(f64::NAN, |t| seconds_since(self.start_time, t)))
            .collect();

        Ok((relative, values))
    }

    pub fn attach_detection(&mut self, series: EventSeries) -> Result<(), AttachError> {
        if self.detections.contains_key(&series.name) {
            return Err(AttachError::DuplicateDetection(series.name));
        }
        self.detections.insert(series.name.clone(), series);
        Ok(())
    }

    pub fn attach_annotations(&mut self, table: Table) -> Result<(), AttachError> {
        if self.annotations.is_some() {
            return Err(AttachError::AlreadyAttached("annotations"));
        }
        self.annotations = Some(table);
        Ok(())
    }

    pub fn attach_metrics(&mut self, table: Table) -> Result<(), AttachError> {
        if self.metrics.is_some() {
            return Err(AttachError::AlreadyAttached("metrics"));
        }
        self.metrics = Some(table);
        Ok(())
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            subject: self.subject.clone(),
            session: self.session.clone(),
            run: self.run.clone(),
            start_time: self.start_time,
            metadata: self.metadata.clone(),
            signals: self
                .raw_signals
                .values()
                .map(|s| SignalSummary {
                    name: s.name.clone(),
                    source: s.source.clone(),
                    rows: s.len(),
                    sampling_rate: s.sampling_rate,
                    status: s.status.clone(),
                })
                .collect(),
            detections: self.detections.keys().cloned().collect(),
        }
    }
}

/// Earliest first timestamp over `signals`, skipping empty and failed ones.
pub fn start_time<'a, I>(signals: I) -> Option<DateTime<Utc>>
where
    I: IntoIterator<Item = &'a Signal>,
{
    signals
        .into_iter()
        .filter_map(Signal::first_timestamp)
        .min()
}

// ---------------------------------------------------------------------------
// Serialisable summaries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct SignalSummary {
    pub name: String,
    pub source: PathBuf,
    pub rows: usize,
    pub sampling_rate: Option<f64>,
    pub status: SignalStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub subject: Option<String>,
    pub session: Option<String>,
    pub run: Option<String>,
    pub start_time: DateTime<Utc>,
    pub metadata: BTreeMap<String, String>,
    pub signals: Vec<SignalSummary>,
    pub detections: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filename::parse_stem;

    fn table(times: &[&str], values: &[f64]) -> Table {
        Table::from_columns(vec![
            ("utc".to_string(), times.iter().map(|t| Value::guess(t)).collect()),
            ("x".to_string(), values.iter().map(|v| Value::Float(*v)).collect()),
        ])
        .unwrap()
    }

    fn signal(name: &str, outcome: LoadOutcome) -> Signal {
        Signal::from_outcome(
            name.to_string(),
            Some(name.to_string()),
            PathBuf::from(format!("{name}.csv")),
            outcome,
            "utc",
        )
    }

    fn run_with(signals: Vec<Signal>) -> RunData {
        let key = RunKey::from_parsed(&parse_stem("sub-01_ses-01_run-1"));
        let map = signals.into_iter().map(|s| (s.name.clone(), s)).collect();
        RunData::new(&key, BTreeMap::new(), map).unwrap()
    }

    fn three_device_run() -> RunData {
        run_with(vec![
            signal(
                "a",
                LoadOutcome::Loaded(table(&["1970-01-01T00:00:05Z", "1970-01-01T00:00:06Z"], &[1.0, 2.0])),
            ),
            signal("b", LoadOutcome::Loaded(table(&["2", "3"], &[3.0, 4.0]))),
            signal("c", LoadOutcome::Loaded(table(&["8", "8.5"], &[5.0, 6.0]))),
        ])
    }

    #[test]
    fn test_start_time_is_earliest_first_sample() {
        let run = three_device_run();
        assert_eq!(run.start_time, DateTime::from_timestamp(2, 0).unwrap());
        assert_eq!(run.subject.as_deref(), Some("01"));
        assert_eq!(run.run.as_deref(), Some("1"));
    }

    #[test]
    fn test_get_signal_is_relative_to_run_start() {
        let run = three_device_run();
        let (t, values) = run.get_signal("c", "x").unwrap();
        assert_eq!(t, vec![6.0, 6.5]);
        assert_eq!(values, [Value::Float(5.0), Value::Float(6.0)]);

        let (t, _) = run.get_signal("a", "x").unwrap();
        assert_eq!(t, vec![3.0, 4.0]);
    }

    #[test]
    fn test_get_signal_unknown_modality_fails() {
        let run = three_device_run();
        assert_eq!(
            run.get_signal("tobii", "x").unwrap_err(),
            LookupError::UnknownModality("tobii".to_string())
        );
    }

    #[test]
    fn test_get_signal_unknown_column_fails() {
        let run = three_device_run();
        assert!(matches!(
            run.get_signal("a", "pupil_diameter"),
            Err(LookupError::UnknownColumn { .. })
        ));
    }

    #[test]
    fn test_failed_signal_is_kept_and_reported() {
        let run = run_with(vec![
            signal("ok", LoadOutcome::Loaded(table(&["4"], &[1.0]))),
            signal(
                "broken",
                LoadOutcome::Failed {
                    reason: "bad header".to_string(),
                },
            ),
        ]);
        assert!(run.signal("broken").unwrap().is_failed());
        assert_eq!(run.start_time, DateTime::from_timestamp(4, 0).unwrap());
        assert!(matches!(
            run.get_signal("broken", "x"),
            Err(LookupError::SignalFailed { .. })
        ));
    }

    #[test]
    fn test_unparseable_time_cell_fails_signal() {
        let s = signal("a", LoadOutcome::Loaded(table(&["1", "soon"], &[1.0, 2.0])));
        assert_eq!(
            s.failure_reason(),
            Some("row 1: cannot parse 'soon' as a timestamp")
        );
    }

    #[test]
    fn test_missing_time_column_fails_signal() {
        let t = Table::from_columns(vec![("x".to_string(), vec![Value::Float(1.0)])]).unwrap();
        let s = signal("a", LoadOutcome::Loaded(t));
        assert_eq!(s.failure_reason(), Some("missing time column 'utc'"));
    }

    #[test]
    fn test_blank_time_cell_keeps_signal() {
        let run = run_with(vec![
            signal("a", LoadOutcome::Loaded(table(&["", "2", "3", " "], &[1.0, 2.0, 3.0, 4.0]))),
            signal("b", LoadOutcome::Loaded(table(&["5"], &[1.0]))),
        ]);
        let a = run.signal("a").unwrap();
        assert!(!a.is_failed());
        assert_eq!(a.len(), 4);
        assert_eq!(a.first_timestamp(), DateTime::from_timestamp(2, 0));
        assert_eq!(run.start_time, DateTime::from_timestamp(2, 0).unwrap());

        let (t, _) = run.get_signal("a", "x").unwrap();
        assert!(t[0].is_nan());
        assert_eq!(&t[1..3], &[0.0, 1.0]);
        assert!(t[3].is_nan());
    }

    #[test]
    fn test_all_blank_time_column_fails_signal() {
        let s = signal("a", LoadOutcome::Loaded(table(&["", ""], &[1.0, 2.0])));
        assert_eq!(s.failure_reason(), Some("time column 'utc' has no timestamps"));
    }

    #[test]
    fn test_no_usable_timestamps_is_an_error() {
        let key = RunKey::default();
        let mut map = BTreeMap::new();
        map.insert("a".to_string(), signal("a", LoadOutcome::Loaded(Table::default())));
        assert_eq!(
            RunData::new(&key, BTreeMap::new(), map).unwrap_err(),
            ModelError::NoStartTime
        );
        assert_eq!(
            RunData::new(&key, BTreeMap::new(), BTreeMap::new()).unwrap_err(),
            ModelError::NoSignals
        );
    }

    #[test]
    fn test_attach_never_replaces() {
        let mut run = three_device_run();
        let events = Table::new(vec!["time".to_string(), "type".to_string()]).unwrap();
        let series = EventSeries::new("saccades".to_string(), events, "detector:saccade".to_string()).unwrap();

        run.attach_detection(series.clone()).unwrap();
        assert_eq!(
            run.attach_detection(series).unwrap_err(),
            AttachError::DuplicateDetection("saccades".to_string())
        );

        run.attach_metrics(Table::default()).unwrap();
        assert_eq!(
            run.attach_metrics(Table::default()).unwrap_err(),
            AttachError::AlreadyAttached("metrics")
        );
        assert!(run.annotations().is_none());
    }

    #[test]
    fn test_event_series_requires_time_and_type() {
        let events = Table::new(vec!["time".to_string()]).unwrap();
        let err = EventSeries::new("blinks".to_string(), events, "detector:blink".to_string()).unwrap_err();
        assert_eq!(
            err,
            AttachError::MissingColumn {
                table: "blinks".to_string(),
                column: "type".to_string()
            }
        );
    }
}
