use crate::engine::clock::TokioClock;
use crate::model::{Phase, RunConfig, Snapshot};
use crate::orchestrator::{run_controller, Controller, UiCommand};
use crate::storage::{self, FileStore, HistoryStore, MemoryStore};
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "speedtest-sim",
    version,
    about = "Simulated internet speed test with optional TUI"
)]
pub struct Cli {
    /// Run one test, print the result as JSON and exit (no TUI)
    #[arg(long, conflicts_with_all = ["text", "history"])]
    pub json: bool,

    /// Run one test, print a text summary and exit (no TUI)
    #[arg(long, conflicts_with = "history")]
    pub text: bool,

    /// Print the saved test history and exit
    #[arg(long)]
    pub history: bool,

    /// Interval between simulation ticks (must be non-zero)
    #[arg(long, default_value = "100ms", value_parser = parse_tick_interval)]
    pub tick_interval: humantime::Duration,

    /// Seed for the random number generator (reproducible runs)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Location of the history file
    #[arg(long)]
    pub history_file: Option<std::path::PathBuf>,

    /// Keep history in memory only; nothing is read from or written to disk
    #[arg(long)]
    pub ephemeral: bool,

    /// Automatically start a test when the app launches
    #[arg(long, default_value_t = false, action = clap::ArgAction::Set)]
    pub test_on_launch: bool,

    /// Command that receives shared results on stdin (falls back to the clipboard).
    /// Split on whitespace; shell quoting is not interpreted.
    #[arg(long)]
    pub share_command: Option<String>,

    /// Log file used while the TUI owns the terminal
    #[arg(long)]
    pub log_file: Option<std::path::PathBuf>,
}

fn parse_tick_interval(s: &str) -> Result<humantime::Duration, String> {
    let d: humantime::Duration = s.parse().map_err(|e| format!("{e}"))?;
    if d.is_zero() {
        return Err("tick interval must be greater than zero".into());
    }
    Ok(d)
}

impl Cli {
    /// Whether this invocation runs the interactive TUI.
    pub fn is_interactive(&self) -> bool {
        cfg!(feature = "tui") && !self.json && !self.text && !self.history
    }
}

pub async fn run(args: Cli) -> Result<()> {
    if args.history {
        return print_history(&args);
    }

    if !args.json && !args.text {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_once(args, false).await;
        }
    }

    let json = args.json;
    run_once(args, json).await
}

/// Build a `RunConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> RunConfig {
    RunConfig {
        tick_interval: std::time::Duration::from(args.tick_interval),
        seed: args.seed,
    }
}

/// Pick the history store selected on the command line.
pub fn build_store(args: &Cli) -> Box<dyn HistoryStore> {
    if args.ephemeral {
        return Box::new(MemoryStore::new());
    }
    let path = args
        .history_file
        .clone()
        .unwrap_or_else(storage::default_history_path);
    Box::new(FileStore::new(path))
}

/// Spawn the controller for a presentation layer.
pub(crate) fn spawn_controller(
    args: &Cli,
) -> (
    mpsc::UnboundedSender<UiCommand>,
    watch::Receiver<Snapshot>,
    tokio::task::JoinHandle<Result<()>>,
) {
    let ctl = Controller::new(build_config(args), Arc::new(TokioClock), build_store(args));
    let (snap_tx, snap_rx) = watch::channel(Snapshot::default());
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();
    let handle = tokio::spawn(run_controller(ctl, snap_tx, cmd_rx));
    (cmd_tx, snap_rx, handle)
}

fn print_history(args: &Cli) -> Result<()> {
    let history = build_store(args).load().context("load history")?;
    let table = crate::text_summary::build_history_table(&history);
    let mut out = std::io::stdout().lock();
    for line in table.lines {
        writeln!(out, "{line}")?;
    }
    Ok(())
}

/// Run a single test without the TUI. Progress goes to stderr; the result to
/// stdout, as JSON when `json` is set.
async fn run_once(args: Cli, json: bool) -> Result<()> {
    let (cmd_tx, mut snap_rx, controller) = spawn_controller(&args);
    let (out_tx, out_handle) = spawn_output_writer();

    let cancel_tx = cmd_tx.clone();
    let signal_handle = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = cancel_tx.send(UiCommand::Cancel);
        }
    });

    cmd_tx
        .send(UiCommand::Start)
        .map_err(|_| anyhow::anyhow!("controller stopped before the test started"))?;

    let mut last_phase = Phase::Idle;
    let mut last_decile = 0u8;
    let snap = loop {
        snap_rx
            .changed()
            .await
            .context("controller stopped during the test")?;
        let snap = snap_rx.borrow_and_update().clone();
        if snap.finished_runs > 0 {
            break snap;
        }
        if json {
            continue;
        }

        let run = &snap.run;
        let measuring = matches!(run.phase, Phase::Ping | Phase::Download | Phase::Upload);
        if measuring && run.phase != last_phase {
            last_phase = run.phase;
            last_decile = 0;
            let _ = out_tx.send(OutputLine::Stderr(format!("== {} ==", run.phase.label())));
        }
        let decile = run.progress / 10;
        if decile > last_decile {
            last_decile = decile;
            let line = if run.phase == Phase::Ping {
                format!("{}: {:>3}%", run.phase.label(), run.progress)
            } else {
                format!(
                    "{}: {:>3}% {:.1} Mbps",
                    run.phase.label(),
                    run.progress,
                    run.speed_mbps
                )
            };
            let _ = out_tx.send(OutputLine::Stderr(line));
        }
    };

    signal_handle.abort();
    let _ = cmd_tx.send(UiCommand::Quit);
    controller.await.context("controller task failed")??;

    let res = match (&snap.result, &snap.run.error) {
        (Some(result), _) => {
            if let Some(notice) = snap.notice.as_deref() {
                let _ = out_tx.send(OutputLine::Stderr(notice.to_string()));
            }
            if json {
                let out = serde_json::to_string_pretty(result)?;
                let _ = out_tx.send(OutputLine::Stdout(out));
            } else {
                for line in crate::text_summary::build_text_summary(result).lines {
                    let _ = out_tx.send(OutputLine::Stdout(line));
                }
            }
            Ok(())
        }
        (None, Some(err)) => Err(anyhow::anyhow!("{err}")),
        (None, None) => Err(anyhow::anyhow!("Test cancelled")),
    };

    drop(out_tx);
    let _ = out_handle.await;
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_tick_interval_is_rejected() {
        assert!(Cli::try_parse_from(["speedtest-sim", "--tick-interval", "0s"]).is_err());
        assert!(Cli::try_parse_from(["speedtest-sim", "--tick-interval", "0ms"]).is_err());
    }

    #[test]
    fn tick_interval_accepts_humantime_values() {
        let args = Cli::try_parse_from(["speedtest-sim", "--text", "--tick-interval", "250ms"])
            .unwrap();
        assert_eq!(
            build_config(&args).tick_interval,
            std::time::Duration::from_millis(250)
        );
        let args = Cli::try_parse_from(["speedtest-sim"]).unwrap();
        assert_eq!(build_config(&args).tick_interval, RunConfig::default().tick_interval);
    }
}
