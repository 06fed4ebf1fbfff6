use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub tick_interval: Duration,
    pub seed: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Ping,
    Download,
    Upload,
    Complete,
}

impl Phase {
    /// Human-readable label used in logs and text output.
    pub fn label(self) -> &'static str {
        match self {
            Phase::Idle => "Idle",
            Phase::Ping => "Ping",
            Phase::Download => "Download",
            Phase::Upload => "Upload",
            Phase::Complete => "Complete",
        }
    }
}

#[derive(Debug, Clone)]
pub enum TestEvent {
    PhaseStarted {
        phase: Phase,
    },
    Tick {
        phase: Phase,
        progress: u8,
        speed_mbps: f64,
    },
    PhaseCompleted {
        phase: Phase,
        value: u32,
    },
}

/// Outcome of one completed run. All three figures are produced together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub ping: u32,
    pub download: u32,
    pub upload: u32,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(TestResult),
    Cancelled,
}

/// Transient progress state of the current run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunState {
    pub phase: Phase,
    pub running: bool,
    pub paused: bool,
    pub speed_mbps: f64,
    pub progress: u8,
    pub error: Option<String>,
}

/// Read-only view of orchestrator state handed to presentation layers.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub run: RunState,
    pub result: Option<TestResult>,
    pub history: crate::storage::HistoryLog,
    pub notice: Option<String>,
    // Bumped whenever a run ends, whether it completed, failed or was cancelled.
    pub finished_runs: u64,
}
