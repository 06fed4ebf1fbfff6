mod gauge;
mod help;
mod share;
mod state;

use crate::cli::Cli;
use crate::display;
use crate::model::{Phase, Snapshot};
use crate::orchestrator::UiCommand;
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Row, Table, Tabs},
    Terminal,
};
use state::{handle_key, KeyAction, UiState, TAB_DASHBOARD, TAB_HISTORY};
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::watch;

pub async fn run(args: Cli) -> Result<()> {
    let (cmd_tx, snap_rx, controller) = crate::cli::spawn_controller(&args);
    if args.test_on_launch {
        let _ = cmd_tx.send(UiCommand::Start);
    }

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_args = args.clone();
    let ui_handle = std::thread::spawn(move || run_threaded(ui_args, snap_rx, cmd_tx));

    // The controller exits once the UI sends Quit or drops its command sender.
    let res = controller.await.context("controller task failed")?;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
pub fn run_threaded(
    args: Cli,
    snap_rx: watch::Receiver<Snapshot>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let mut state = UiState::default();
    let share_command = args.share_command.clone();

    let frame_rate = Duration::from_millis(50);
    let mut last_frame: Option<Instant> = None;

    let res = loop {
        if last_frame.map_or(true, |t| t.elapsed() >= frame_rate) {
            state.snapshot = snap_rx.borrow().clone();
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_frame = Some(Instant::now());
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                match handle_key(&mut state, k) {
                    KeyAction::None => {}
                    KeyAction::Command(cmd) => {
                        log::debug!("ui command: {cmd:?}");
                        if cmd_tx.send(cmd).is_err() {
                            break Err(anyhow::anyhow!("controller stopped"));
                        }
                    }
                    KeyAction::Share => share_result(&mut state, share_command.as_deref()),
                    KeyAction::Quit => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                }
                // Redraw right away so key feedback is not delayed by the frame timer.
                last_frame = None;
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn share_result(state: &mut UiState, share_command: Option<&str>) {
    let Some(result) = state.snapshot.result.as_ref() else {
        state.info = "No completed test to share yet.".into();
        return;
    };
    let text = display::share_text(result);
    state.info = match share::share(&text, share_command) {
        Ok(outcome) => outcome.message().to_string(),
        Err(e) => format!("Share failed: {e:#}"),
    };
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(area);

    let tabs = Tabs::new(vec![
        Line::from("Dashboard"),
        Line::from("History"),
        Line::from("Help"),
    ])
    .select(state.tab)
    .block(Block::default().borders(Borders::ALL).title("speedtest-sim"))
    .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        TAB_DASHBOARD => draw_dashboard(chunks[1], f, state),
        TAB_HISTORY => draw_history(chunks[1], f, &state.snapshot),
        _ => help::draw_help(chunks[1], f),
    }
}

fn draw_dashboard(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let snap = &state.snapshot;
    let run = &snap.run;

    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3), // Phase text
                Constraint::Min(8),    // Gauge
                Constraint::Length(3), // Progress bar
                Constraint::Length(5), // Results grid
                Constraint::Length(4), // Controls + status
            ]
            .as_ref(),
        )
        .split(area);

    let phase_color = match run.phase {
        Phase::Complete => Color::Green,
        Phase::Idle => Color::Gray,
        _ => Color::Yellow,
    };
    let phase = Paragraph::new(Line::styled(
        display::phase_text(run),
        Style::default().fg(phase_color).add_modifier(Modifier::BOLD),
    ))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL).title("Internet Speed Test"));
    f.render_widget(phase, main[0]);

    gauge::draw_speed_gauge(main[1], f, run.speed_mbps);

    if run.running {
        let bar = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title(run.phase.label()))
            .gauge_style(Style::default().fg(Color::Magenta))
            .percent(u16::from(run.progress.min(100)));
        f.render_widget(bar, main[2]);
    }

    if let Some(result) = snap.result.as_ref() {
        draw_results(main[3], f, result);
    }

    let action = if run.running {
        vec![
            Span::styled("x", Style::default().fg(Color::Magenta)),
            Span::raw(" cancel  "),
            Span::styled("p", Style::default().fg(Color::Magenta)),
            Span::raw(if run.paused { " resume" } else { " pause" }),
        ]
    } else if run.phase == Phase::Idle {
        vec![
            Span::styled("Enter", Style::default().fg(Color::Magenta)),
            Span::raw(" start test"),
        ]
    } else {
        vec![
            Span::styled("r", Style::default().fg(Color::Magenta)),
            Span::raw(" reset  "),
            Span::styled("s", Style::default().fg(Color::Magenta)),
            Span::raw(" share"),
        ]
    };
    let mut lines = vec![Line::from(action)];
    if let Some(err) = run.error.as_deref() {
        lines.push(Line::styled(err.to_string(), Style::default().fg(Color::Red)));
    } else if !state.info.is_empty() {
        lines.push(Line::from(state.info.clone()));
    } else if let Some(notice) = snap.notice.as_deref() {
        lines.push(Line::styled(
            notice.to_string(),
            Style::default().fg(Color::Gray),
        ));
    }
    let controls = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(controls, main[4]);
}

fn draw_results(area: Rect, f: &mut ratatui::Frame, result: &crate::model::TestResult) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Ratio(1, 3),
                Constraint::Ratio(1, 3),
                Constraint::Ratio(1, 3),
            ]
            .as_ref(),
        )
        .split(area);

    let cards = [
        ("Download", format!("{} Mbps", result.download), Color::Green),
        ("Upload", format!("{} Mbps", result.upload), Color::Cyan),
        ("Ping", format!("{} ms", result.ping), Color::Yellow),
    ];
    for ((title, value, color), col) in cards.into_iter().zip(cols.iter()) {
        let card = Paragraph::new(vec![
            Line::from(""),
            Line::styled(
                value,
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
        ])
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(card, *col);
    }
}

fn draw_history(area: Rect, f: &mut ratatui::Frame, snap: &Snapshot) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Test History ({})", snap.history.len()));

    if snap.history.is_empty() {
        let p = Paragraph::new("No tests yet. Press Enter on the Dashboard to run one.")
            .block(block);
        f.render_widget(p, area);
        return;
    }

    let header = Row::new(vec!["Date", "Download", "Upload", "Ping"])
        .style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD));
    let rows = snap.history.entries().iter().map(|r| {
        Row::new(vec![
            display::format_timestamp(&r.timestamp),
            format!("{} Mbps", r.download),
            format!("{} Mbps", r.upload),
            format!("{} ms", r.ping),
        ])
    });
    let table = Table::new(
        rows,
        [
            Constraint::Length(21),
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Length(8),
        ],
    )
    .header(header)
    .block(block);
    f.render_widget(table, area);
}
