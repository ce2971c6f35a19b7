//! Tracetool CLI
//!
//! Inspect the runs of an experiment session from the terminal.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracetool::{
    filtered_indices, get_modality_columns, parse_filter, LoaderConfig, RunData, SessionLoad,
    SessionLoader, SignalStatus, VERSION,
};

#[derive(Parser)]
#[command(name = "tracetool")]
#[command(version = VERSION)]
#[command(about = "Run discovery and time alignment for multi-device recordings", long_about = None)]
struct Cli {
    /// JSON loader configuration (defaults apply when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the runs of a session and their signals
    Runs {
        /// Session root containing `processed/`
        session: PathBuf,

        /// Keep runs whose field matches, e.g. `task=free` (repeatable)
        #[arg(long = "where")]
        filters: Vec<String>,

        /// Print run summaries as JSON
        #[arg(long)]
        json: bool,
    },

    /// List modality identifiers found under `processed/`
    Modalities {
        session: PathBuf,
    },

    /// List selectable value columns per modality of one run
    Columns {
        session: PathBuf,

        /// Run index as listed by `runs`
        #[arg(long, default_value_t = 0)]
        run: usize,
    },

    /// Write one aligned signal column as CSV to stdout
    Signal {
        session: PathBuf,

        #[arg(long, default_value_t = 0)]
        run: usize,

        #[arg(long)]
        modality: String,

        #[arg(long)]
        column: String,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = LoaderConfig::load(cli.config.as_deref())?;
    let loader = SessionLoader::new(config);

    match cli.command {
        Commands::Runs {
            session,
            filters,
            json,
        } => cmd_runs(&loader, &session, &filters, json),
        Commands::Modalities { session } => cmd_modalities(&loader, &session),
        Commands::Columns { session, run } => cmd_columns(&loader, &session, run),
        Commands::Signal {
            session,
            run,
            modality,
            column,
        } => cmd_signal(&loader, &session, run, &modality, &column),
    }
}

fn load_reporting(loader: &SessionLoader, session: &Path) -> Result<SessionLoad> {
    let load = loader
        .load(session)
        .with_context(|| format!("loading session {}", session.display()))?;
    if !load.diagnostics.is_empty() {
        eprintln!("{} issue(s) while loading:", load.diagnostics.len());
        for diag in &load.diagnostics {
            eprintln!("  - {diag}");
        }
    }
    Ok(load)
}

fn select_run(load: &SessionLoad, index: usize) -> Result<&RunData> {
    match load.runs.get(index) {
        Some(run) => Ok(run),
        None => bail!(
            "run index {index} out of range ({} run(s) loaded)",
            load.runs.len()
        ),
    }
}

fn cmd_runs(loader: &SessionLoader, session: &Path, filters: &[String], json: bool) -> Result<()> {
    let load = load_reporting(loader, session)?;
    let filter = parse_filter(filters)?;
    let selected = filtered_indices(&load.runs, &filter);

    if json {
        let summaries: Vec<_> = selected.iter().map(|&i| load.runs[i].summary()).collect();
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    for &i in &selected {
        let run = &load.runs[i];
        let dash = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
        println!(
            "[{i}] sub={} ses={} run={}  start={}",
            dash(&run.subject),
            dash(&run.session),
            dash(&run.run),
            run.start_time.to_rfc3339()
        );
        for (key, value) in &run.metadata {
            println!("      {key}: {value}");
        }
        for (name, signal) in run.raw_signals() {
            match &signal.status {
                SignalStatus::Loaded => println!("    {name}: {} sample(s)", signal.len()),
                SignalStatus::Failed { reason } => println!("    {name}: FAILED ({reason})"),
            }
        }
    }
    Ok(())
}

fn cmd_modalities(loader: &SessionLoader, session: &Path) -> Result<()> {
    for modality in loader.list_modalities(session)? {
        println!("{modality}");
    }
    Ok(())
}

fn cmd_columns(loader: &SessionLoader, session: &Path, index: usize) -> Result<()> {
    let load = load_reporting(loader, session)?;
    let run = select_run(&load, index)?;
    for (modality, columns) in get_modality_columns(run) {
        println!("{modality}: {}", columns.join(", "));
    }
    Ok(())
}

fn cmd_signal(
    loader: &SessionLoader,
    session: &Path,
    index: usize,
    modality: &str,
    column: &str,
) -> Result<()> {
    let load = load_reporting(loader, session)?;
    let run = select_run(&load, index)?;
    let (times, values) = run.get_signal(modality, column)?;

    let mut writer = csv::Writer::from_writer(io::stdout().lock());
    writer.write_record(["relative_time", column])?;
    for (t, v) in times.iter().zip(values) {
        writer.write_record([t.to_string(), v.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}
