use anyhow::{Context, Result};
use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::mpsc as std_mpsc;
use std::sync::OnceLock;
use std::time::Duration;

// Global clipboard manager channel - initialized once on first use
static CLIPBOARD_SENDER: OnceLock<std_mpsc::Sender<String>> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareOutcome {
    /// Handed to the configured share command.
    Shared,
    /// No share command available; text went to the clipboard.
    Copied,
}

impl ShareOutcome {
    pub fn message(self) -> &'static str {
        match self {
            ShareOutcome::Shared => "Results shared",
            ShareOutcome::Copied => "Results copied to clipboard!",
        }
    }
}

/// Share `text` through `share_command` if one is configured, otherwise (or
/// if it fails) copy it to the clipboard.
pub fn share(text: &str, share_command: Option<&str>) -> Result<ShareOutcome> {
    if let Some(cmd) = share_command {
        match run_share_command(cmd, text) {
            Ok(()) => return Ok(ShareOutcome::Shared),
            Err(e) => log::warn!("share command failed, using clipboard: {e:#}"),
        }
    }
    copy_to_clipboard(text)?;
    Ok(ShareOutcome::Copied)
}

/// Program and arguments of a share command. Words are split on whitespace
/// only; quotes are passed through literally.
fn command_words(cmd: &str) -> Result<(&str, Vec<&str>)> {
    let mut parts = cmd.split_whitespace();
    let program = parts.next().context("empty share command")?;
    Ok((program, parts.collect()))
}

/// Run `cmd` and feed `text` to its stdin.
fn run_share_command(cmd: &str, text: &str) -> Result<()> {
    let (program, args) = command_words(cmd)?;
    let mut child = Command::new(program)
        .args(&args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("spawn {program}"))?;
    {
        let mut stdin = child.stdin.take().context("share command stdin")?;
        stdin.write_all(text.as_bytes()).context("write share text")?;
    }
    let status = child.wait().context("wait for share command")?;
    if !status.success() {
        anyhow::bail!("{program} exited with {status}");
    }
    Ok(())
}

/// Initialize the clipboard manager thread if not already initialized.
/// Each clipboard instance is kept alive for a while so clipboard managers
/// on Linux get a chance to read the contents.
fn init_clipboard_manager() -> Result<&'static std_mpsc::Sender<String>> {
    CLIPBOARD_SENDER.get_or_init(|| {
        let (tx, rx) = std_mpsc::channel::<String>();

        std::thread::spawn(move || {
            use arboard::Clipboard;

            for text in rx {
                match Clipboard::new() {
                    Ok(mut clipboard) => {
                        if clipboard.set_text(&text).is_ok() {
                            std::thread::sleep(Duration::from_secs(2));
                        }
                    }
                    Err(e) => log::warn!("clipboard unavailable: {e}"),
                }
            }
        });

        tx
    });

    CLIPBOARD_SENDER
        .get()
        .ok_or_else(|| anyhow::anyhow!("Failed to initialize clipboard manager"))
}

/// Queue `text` for the clipboard without blocking the UI thread.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let sender = init_clipboard_manager()?;
    sender
        .send(text.to_string())
        .map_err(|_| anyhow::anyhow!("Clipboard manager channel closed"))?;
    Ok(())
}
