//! Writes a synthetic session under `<out>/sub-01/ses-01/processed`.
//!
//! Usage: `generate_session [OUT_DIR]` (default `sample_session`).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};

/// One device stream: file suffix, header, rate, clock offset.
struct Device {
    stem: &'static str,
    columns: &'static [&'static str],
    rate_hz: f64,
    /// Seconds after the run's nominal start that this device began recording.
    offset_s: f64,
}

const DEVICES: &[Device] = &[
    Device {
        stem: "mod-adhawk_pupils",
        columns: &["utc", "left_diameter", "right_diameter"],
        rate_hz: 250.0,
        offset_s: 0.4,
    },
    Device {
        stem: "mod-adhawk_gaze",
        columns: &["utc", "gaze_x", "gaze_y"],
        rate_hz: 250.0,
        offset_s: 0.4,
    },
    Device {
        stem: "mod-tobii",
        columns: &["utc", "device_time_us", "gaze_x", "gaze_y"],
        rate_hz: 120.0,
        offset_s: 1.2,
    },
    Device {
        stem: "mod-shimmer",
        columns: &["UTC_Timestamp", "utc", "gsr", "ppg"],
        rate_hz: 51.2,
        offset_s: 0.0,
    },
];

const DURATION_S: f64 = 20.0;

/// Smooth deterministic waveform per column so plots look plausible.
fn sample(column: usize, t: f64, run: usize) -> f64 {
    let phase = column as f64 * 0.7 + run as f64 * 1.3;
    let freq = 0.2 + column as f64 * 0.15;
    1.0 + 0.5 * (2.0 * std::f64::consts::PI * freq * t + phase).sin()
        + 0.05 * (37.0 * t + phase).sin()
}

fn write_device(dir: &Path, prefix: &str, device: &Device, start: DateTime<Utc>, run: usize) -> Result<usize> {
    let path = dir.join(format!("{prefix}_{}.csv", device.stem));
    let mut writer =
        csv::Writer::from_path(&path).with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(device.columns)?;

    let n = (DURATION_S * device.rate_hz) as usize;
    for i in 0..n {
        let t = device.offset_s + i as f64 / device.rate_hz;
        let at = start + TimeDelta::microseconds((t * 1e6).round() as i64);
        let record: Vec<String> = device
            .columns
            .iter()
            .enumerate()
            .map(|(c, name)| match *name {
                "utc" => at.to_rfc3339(),
                // Vendor clock column: different format, same instant.
                "UTC_Timestamp" => at.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
                "device_time_us" => ((t * 1e6).round() as i64).to_string(),
                _ => format!("{:.4}", sample(c, t, run)),
            })
            .collect();
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(n)
}

fn main() -> Result<()> {
    env_logger::init();

    let out = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sample_session"));
    let session = out.join("sub-01").join("ses-01");
    let processed = session.join("processed");
    fs::create_dir_all(&processed).with_context(|| format!("creating {}", processed.display()))?;
    fs::create_dir_all(session.join("derived"))?;

    let base = Utc
        .with_ymd_and_hms(2024, 5, 14, 9, 30, 0)
        .single()
        .context("invalid base timestamp")?;

    let mut total = 0;
    for (run, task) in [(1, "free"), (2, "fixation")] {
        let prefix = format!("sub-01_ses-01_task-{task}_run-{run}");
        let start = base + TimeDelta::minutes(5 * run as i64);
        for device in DEVICES {
            let rows = write_device(&processed, &prefix, device, start, run)?;
            log::info!("{prefix}_{}: {rows} rows", device.stem);
            total += 1;
        }
    }

    println!("Wrote {total} files to {}", processed.display());
    Ok(())
}
