mod cli;
mod display;
mod engine;
mod logging;
mod model;
mod orchestrator;
mod storage;
mod text_summary;
#[cfg(feature = "tui")]
mod tui;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_interactive = args.is_interactive();

    if is_interactive {
        let path = args
            .log_file
            .clone()
            .unwrap_or_else(storage::default_log_path);
        // Without a writable log file the TUI simply runs unlogged.
        let _ = logging::init_file(&path);
    } else {
        logging::init_stderr();
    }

    match cli::run(args).await {
        Ok(()) => {
            // Explicitly exit with code 0 on success, especially for non-TUI modes
            if !is_interactive {
                std::process::exit(0);
            }
            Ok(())
        }
        Err(e) => {
            if is_interactive {
                log::error!("{e:#}");
            }
            Err(e)
        }
    }
}
