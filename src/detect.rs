//! Pluggable event detectors.
//!
//! A detector consumes a run's signals and produces an event table with at
//! least `time` and `type` columns. The result is attached to the run as an
//! [`EventSeries`] keyed by the detector's name.

use std::collections::BTreeMap;

use anyhow::Result;

use crate::data::model::{EventSeries, RunData, Signal};
use crate::data::table::Table;
use crate::error::DetectError;

pub trait Detector {
    fn name(&self) -> &str;

    /// Identifier recorded as the event series' source.
    fn source(&self) -> String {
        format!("detector:{}", self.name())
    }

    /// Modality identifiers that must be present and loaded.
    fn required_signals(&self) -> Vec<String> {
        Vec::new()
    }

    fn run(&self, signals: &BTreeMap<String, Signal>) -> Result<Table>;
}

/// Run `detector` on `run` and attach its events.
pub fn run_detector(run: &mut RunData, detector: &dyn Detector) -> Result<(), DetectError> {
    for required in detector.required_signals() {
        let usable = run.signal(&required).is_some_and(|s| !s.is_failed());
        if !usable {
            return Err(DetectError::MissingSignal {
                detector: detector.name().to_string(),
                signal: required,
            });
        }
    }

    let events = detector
        .run(run.raw_signals())
        .map_err(|e| DetectError::Failed {
            detector: detector.name().to_string(),
            reason: format!("{e:#}"),
        })?;

    log::info!(
        "Detector '{}' produced {} event(s)",
        detector.name(),
        events.num_rows()
    );

    let series = EventSeries::new(detector.name().to_string(), events, detector.source())?;
    run.attach_detection(series)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::grouping::RunKey;
    use crate::data::loader::LoadOutcome;
    use crate::data::table::Value;
    use crate::error::AttachError;
    use std::path::PathBuf;

    /// Flags every sample of `tobii.x` above a threshold.
    struct Threshold {
        limit: f64,
    }

    impl Detector for Threshold {
        fn name(&self) -> &str {
            "threshold"
        }

        fn required_signals(&self) -> Vec<String> {
            vec!["tobii".to_string()]
        }

        fn run(&self, signals: &BTreeMap<String, Signal>) -> Result<Table> {
            let signal = &signals["tobii"];
            let mut events = Table::new(vec!["time".to_string(), "type".to_string()])?;
            let values = signal.data.column("x").unwrap_or_default();
            for (t, v) in signal.timestamps().iter().zip(values) {
                let Some(t) = t else { continue };
                if v.as_f64().is_some_and(|v| v > self.limit) {
                    events.push_row(vec![
                        Value::String(t.to_rfc3339()),
                        Value::String("above".to_string()),
                    ])?;
                }
            }
            Ok(events)
        }
    }

    struct NoType;

    impl Detector for NoType {
        fn name(&self) -> &str {
            "no_type"
        }

        fn run(&self, _signals: &BTreeMap<String, Signal>) -> Result<Table> {
            Ok(Table::new(vec!["time".to_string()])?)
        }
    }

    fn run_data() -> RunData {
        let table = Table::from_columns(vec![
            (
                "utc".to_string(),
                vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)],
            ),
            (
                "x".to_string(),
                vec![Value::Float(0.1), Value::Float(0.9), Value::Float(0.8)],
            ),
        ])
        .unwrap();
        let signal = Signal::from_outcome(
            "tobii".to_string(),
            Some("tobii".to_string()),
            PathBuf::from("sub-01_mod-tobii.csv"),
            LoadOutcome::Loaded(table),
            "utc",
        );
        let mut signals = BTreeMap::new();
        signals.insert("tobii".to_string(), signal);
        RunData::new(&RunKey::default(), BTreeMap::new(), signals).unwrap()
    }

    #[test]
    fn test_detector_events_are_attached() {
        let mut run = run_data();
        run_detector(&mut run, &Threshold { limit: 0.5 }).unwrap();

        let series = &run.detections()["threshold"];
        assert_eq!(series.source, "detector:threshold");
        assert_eq!(series.events.num_rows(), 2);
    }

    #[test]
    fn test_second_run_of_same_detector_is_rejected() {
        let mut run = run_data();
        run_detector(&mut run, &Threshold { limit: 0.5 }).unwrap();
        let err = run_detector(&mut run, &Threshold { limit: 0.0 }).unwrap_err();
        assert_eq!(
            err,
            DetectError::Attach(AttachError::DuplicateDetection("threshold".to_string()))
        );
        assert_eq!(run.detections()["threshold"].events.num_rows(), 2);
    }

    #[test]
    fn test_missing_required_signal() {
        struct NeedsShimmer;
        impl Detector for NeedsShimmer {
            fn name(&self) -> &str {
                "gsr_peaks"
            }
            fn required_signals(&self) -> Vec<String> {
                vec!["shimmer".to_string()]
            }
            fn run(&self, _signals: &BTreeMap<String, Signal>) -> Result<Table> {
                unreachable!("required signal check runs first")
            }
        }

        let mut run = run_data();
        let err = run_detector(&mut run, &NeedsShimmer).unwrap_err();
        assert!(matches!(err, DetectError::MissingSignal { .. }));
        assert!(run.detections().is_empty());
    }

    #[test]
    fn test_event_table_contract_enforced() {
        let mut run = run_data();
        let err = run_detector(&mut run, &NoType).unwrap_err();
        assert!(matches!(
            err,
            DetectError::Attach(AttachError::MissingColumn { .. })
        ));
    }
}
