use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use sensorlog::{
    logging, CsvSink, FileSource, LineSource, RunReport, Session, SessionConfig, Settings,
    StreamSource, Throttle,
};

#[derive(Parser, Debug)]
#[command(name = "sensorlog")]
#[command(about = "Record serial sensor telemetry and per-sensor statistics")]
struct Args {
    /// Settings file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial device to read from
    #[arg(short, long, conflicts_with = "replay")]
    port: Option<PathBuf>,

    /// Serial line speed
    #[arg(short, long)]
    baud: Option<u32>,

    /// Replay a captured serial log instead of opening the device
    #[arg(short, long)]
    replay: Option<PathBuf>,

    /// CSV file receiving the rows
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Collection window in seconds
    #[arg(short, long)]
    duration: Option<u64>,

    /// Write the run report as JSON to this file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    /// Apply command line overrides on top of loaded settings.
    fn apply(&self, settings: &mut Settings) {
        if let Some(port) = &self.port {
            settings.serial.port = port.clone();
        }
        if let Some(baud) = self.baud {
            settings.serial.baud_rate = baud;
        }
        if let Some(output) = &self.output {
            settings.sink.path = output.clone();
        }
        if let Some(duration) = self.duration {
            settings.collection.duration_secs = duration;
        }
        if let Some(level) = &self.log_level {
            settings.log_level = level.clone();
        }
        if self.replay.is_some() {
            settings.collection.stop_when_drained = true;
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref())?;
    args.apply(&mut settings);
    settings.validate()?;

    logging::init(&settings.log_level);
    info!("sensorlog v{}", env!("CARGO_PKG_VERSION"));

    let report = match run(&args, &settings) {
        Ok(report) => report,
        Err(e) => {
            error!(error = %format!("{:#}", e), "Run aborted");
            return Err(e);
        }
    };

    if let Some(path) = &args.report {
        export_report(&report, path)?;
    }
    Ok(())
}

/// Open the source and sink, then run one session.
fn run(args: &Args, settings: &Settings) -> Result<RunReport> {
    // The stream reader task and the interrupt handler live on this runtime
    // while the session runs on the main thread.
    let rt = tokio::runtime::Runtime::new()?;

    let source: Box<dyn LineSource> = match &args.replay {
        Some(path) => Box::new(FileSource::open(path)?),
        None => {
            let serial = &settings.serial;
            let source = rt.block_on(StreamSource::open_serial(
                &serial.port,
                serial.baud_rate,
                serial.configure_tty,
                Duration::from_millis(serial.settle_ms),
            ))?;
            Box::new(source)
        }
    };

    let sink = CsvSink::create(&settings.sink.path)
        .with_context(|| format!("failed to create {}", settings.sink.path.display()))?
        .with_throttle(Throttle::from_millis(settings.sink.stats_row_delay_ms));

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = interrupted.clone();
    rt.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            flag.store(true, Ordering::Relaxed);
        }
    });

    let mut session = Session::open(source, Box::new(sink), SessionConfig::from(settings))?
        .with_cancel(interrupted);
    session.collect()?;
    session.summarize()?;
    let report = session.close();
    // Nothing left on the runtime needs to finish.
    rt.shutdown_background();

    info!(
        rows = report.rows_appended,
        failed = report.rows_failed,
        sensors = report.statistics.len(),
        output = %settings.sink.path.display(),
        "Run complete"
    );
    Ok(report)
}

/// Export the run report to a JSON file
fn export_report(report: &RunReport, path: &Path) -> Result<()> {
    use std::io::Write;

    let json = serde_json::to_string_pretty(report)?;
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    file.write_all(json.as_bytes())?;

    info!(path = %path.display(), "Exported run report");
    Ok(())
}
