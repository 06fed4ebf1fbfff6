//! Run state transitions.
//!
//! [`Orchestrator`] is the only writer of [`RunState`], the active result and
//! the history log. Every mutation goes through one of its methods so the
//! state machine can be exercised without a runtime or a terminal.

use crate::model::{Phase, RunState, Snapshot, TestEvent, TestResult};
use crate::storage::{HistoryLog, HistoryStore};

/// The only failure a run reports. Causes are logged, never shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Test failed. Please try again.")]
pub struct TestFailure;

pub struct Orchestrator<S> {
    run: RunState,
    result: Option<TestResult>,
    history: HistoryLog,
    notice: Option<String>,
    finished_runs: u64,
    store: S,
}

impl<S: HistoryStore> Orchestrator<S> {
    /// Build an orchestrator and load the persisted history once.
    pub fn load(store: S) -> Self {
        let history = match store.load() {
            Ok(h) => h,
            Err(e) => {
                log::warn!("history unavailable, starting empty: {e:#}");
                HistoryLog::default()
            }
        };
        log::info!("loaded {} history entries", history.len());
        Self {
            run: RunState::default(),
            result: None,
            history,
            notice: None,
            finished_runs: 0,
            store,
        }
    }

    pub fn run_state(&self) -> &RunState {
        &self.run
    }

    pub fn result(&self) -> Option<&TestResult> {
        self.result.as_ref()
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            run: self.run_state().clone(),
            result: self.result().cloned(),
            history: self.history().clone(),
            notice: self.notice.clone(),
            finished_runs: self.finished_runs,
        }
    }

    /// Begin a run. Returns `false` without touching anything if one is
    /// already in progress.
    pub fn start(&mut self) -> bool {
        if self.run.running {
            return false;
        }
        self.run = RunState {
            running: true,
            ..RunState::default()
        };
        self.result = None;
        self.notice = None;
        true
    }

    /// Fold a simulator event into the run state.
    pub fn apply(&mut self, ev: &TestEvent) {
        if !self.run.running {
            return;
        }
        match *ev {
            TestEvent::PhaseStarted { phase } => {
                self.run.phase = phase;
                self.run.progress = 0;
                self.run.speed_mbps = 0.0;
            }
            TestEvent::Tick {
                phase,
                progress,
                speed_mbps,
            } => {
                if phase == self.run.phase {
                    self.run.progress = progress.min(100).max(self.run.progress);
                    self.run.speed_mbps = speed_mbps;
                }
            }
            TestEvent::PhaseCompleted { phase, value } => {
                log::info!("{} finished: {value}", phase.label());
            }
        }
    }

    pub fn set_paused(&mut self, paused: bool) {
        if self.run.running {
            self.run.paused = paused;
        }
    }

    /// Record a completed run and persist the updated history.
    pub fn complete(&mut self, result: TestResult) {
        self.run.phase = Phase::Complete;
        self.history.append(result.clone());
        self.result = Some(result);
        if let Err(e) = self.store.save(&self.history) {
            log::warn!("history save failed: {e:#}");
            self.notice = Some(format!("History save failed: {e:#}"));
        }
        self.settle();
    }

    pub fn fail(&mut self, cause: &anyhow::Error) {
        log::warn!("run failed: {cause:#}");
        self.run.phase = Phase::Idle;
        self.run.error = Some(TestFailure.to_string());
        self.settle();
    }

    pub fn cancelled(&mut self) {
        self.run.phase = Phase::Idle;
        self.notice = Some("Test cancelled".into());
        self.settle();
    }

    /// Return to idle after a finished run. Ignored while running.
    pub fn reset(&mut self) -> bool {
        if self.run.running {
            return false;
        }
        self.run = RunState::default();
        self.result = None;
        self.notice = None;
        true
    }

    fn settle(&mut self) {
        self.run.running = false;
        self.run.paused = false;
        self.run.progress = 0;
        self.run.speed_mbps = 0.0;
        self.finished_runs += 1;
    }
}
