//! Run lifecycle controller.
//!
//! Owns start/reset/cancel orchestration, drives the engine task and
//! publishes a fresh [`Snapshot`] to presentation layers after every change.

use super::state::Orchestrator;
use crate::engine::clock::Clock;
use crate::engine::{EngineControl, TestEngine};
use crate::model::{RunConfig, RunOutcome, Snapshot, TestEvent};
use crate::storage::HistoryStore;
use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;

/// Commands emitted by UI layers to control the test.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    Start,
    Reset,
    Cancel,
    Pause(bool),
    Quit,
}

/// Everything the controller needs to spawn runs.
pub(crate) struct Controller<S> {
    pub cfg: RunConfig,
    pub clock: Arc<dyn Clock>,
    pub rng: StdRng,
    pub orchestrator: Orchestrator<S>,
}

impl<S: HistoryStore> Controller<S> {
    pub fn new(cfg: RunConfig, clock: Arc<dyn Clock>, store: S) -> Self {
        let rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            cfg,
            clock,
            rng,
            orchestrator: Orchestrator::load(store),
        }
    }

    /// Spawn a new engine run and return its control handle.
    fn start_run(&mut self, event_tx: UnboundedSender<TestEvent>) -> Result<RunCtx> {
        // Each run draws from its own generator, derived so a seeded session
        // stays reproducible run after run.
        let rng = StdRng::from_rng(&mut self.rng)?;
        let (ctrl_tx, ctrl_rx) = mpsc::unbounded_channel::<EngineControl>();
        let engine = TestEngine::new(self.cfg.clone(), self.clock.clone(), rng);
        let handle = tokio::spawn(async move { engine.run(event_tx, ctrl_rx).await });
        Ok(RunCtx {
            ctrl_tx,
            handle: Some(handle),
        })
    }
}

/// Internal handle for a running test task.
struct RunCtx {
    ctrl_tx: UnboundedSender<EngineControl>,
    handle: Option<tokio::task::JoinHandle<Result<RunOutcome>>>,
}

/// Orchestrate test runs based on UI commands and publish snapshots.
pub(crate) async fn run_controller<S: HistoryStore>(
    mut ctl: Controller<S>,
    snapshot_tx: watch::Sender<Snapshot>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    // One event channel for the whole session; every run gets a sender clone.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<TestEvent>();
    let mut run_ctx: Option<RunCtx> = None;
    let mut quit_pending = false;

    snapshot_tx.send_replace(ctl.orchestrator.snapshot());

    loop {
        tokio::select! {
            // After Quit (or a closed channel) only the run's own branches matter.
            cmd = cmd_rx.recv(), if !quit_pending => {
                match cmd {
                    Some(UiCommand::Start) => {
                        if run_ctx.is_some() || !ctl.orchestrator.start() {
                            log::debug!("start ignored: run in progress");
                        } else {
                            log::info!("starting run");
                            match ctl.start_run(event_tx.clone()) {
                                Ok(ctx) => run_ctx = Some(ctx),
                                Err(e) => ctl.orchestrator.fail(&e),
                            }
                        }
                    }
                    Some(UiCommand::Reset) => {
                        if !ctl.orchestrator.reset() {
                            log::debug!("reset ignored: run in progress");
                        }
                    }
                    Some(UiCommand::Cancel) => {
                        if let Some(ctx) = &run_ctx {
                            let _ = ctx.ctrl_tx.send(EngineControl::Cancel);
                        }
                    }
                    Some(UiCommand::Pause(p)) => {
                        if let Some(ctx) = &run_ctx {
                            let _ = ctx.ctrl_tx.send(EngineControl::Pause(p));
                            ctl.orchestrator.set_paused(p);
                        }
                    }
                    Some(UiCommand::Quit) | None => {
                        // Quit waits for the current run to wind down so the final state is consistent.
                        quit_pending = true;
                        if let Some(ctx) = &run_ctx {
                            let _ = ctx.ctrl_tx.send(EngineControl::Cancel);
                        } else {
                            break;
                        }
                    }
                }
            }
            Some(ev) = event_rx.recv() => {
                ctl.orchestrator.apply(&ev);
            }
            // Do not take the JoinHandle before this branch wins; otherwise it can be dropped
            // if another select branch is chosen, and we'll never observe completion.
            maybe_done = async {
                if let Some(ctx) = &mut run_ctx {
                    if let Some(h) = ctx.handle.as_mut() {
                        return Some(h.await);
                    }
                }
                futures::future::pending().await
            } => {
                if let Some(join_res) = maybe_done {
                    run_ctx = None;
                    // Fold in ticks the engine sent before it returned.
                    while let Ok(ev) = event_rx.try_recv() {
                        ctl.orchestrator.apply(&ev);
                    }
                    match join_res {
                        Ok(Ok(RunOutcome::Completed(r))) => {
                            log::info!(
                                "run complete: {} Mbps down, {} Mbps up, {} ms ping",
                                r.download, r.upload, r.ping
                            );
                            ctl.orchestrator.complete(r);
                        }
                        Ok(Ok(RunOutcome::Cancelled)) => ctl.orchestrator.cancelled(),
                        Ok(Err(e)) => ctl.orchestrator.fail(&e),
                        Err(e) => ctl.orchestrator.fail(&anyhow::anyhow!("run join failed: {e}")),
                    }
                    if quit_pending {
                        snapshot_tx.send_replace(ctl.orchestrator.snapshot());
                        break;
                    }
                }
            }
        }

        snapshot_tx.send_replace(ctl.orchestrator.snapshot());
    }

    Ok(())
}
