pub mod clock;
mod phases;

use crate::model::{RunConfig, RunOutcome, TestEvent, TestResult};
use anyhow::{Context, Result};
use clock::Clock;
use rand::rngs::StdRng;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub enum EngineControl {
    /// Pause (true) or resume (false) the running test
    Pause(bool),
    /// Cancel the test entirely
    Cancel,
}

pub struct TestEngine {
    cfg: RunConfig,
    clock: Arc<dyn Clock>,
    rng: StdRng,
}

impl TestEngine {
    pub fn new(cfg: RunConfig, clock: Arc<dyn Clock>, rng: StdRng) -> Self {
        Self { cfg, clock, rng }
    }

    /// Run ping, download and upload back to back.
    pub async fn run(
        mut self,
        event_tx: mpsc::UnboundedSender<TestEvent>,
        mut control_rx: mpsc::UnboundedReceiver<EngineControl>,
    ) -> Result<RunOutcome> {
        let paused = Arc::new(AtomicBool::new(false));
        let cancel = Arc::new(AtomicBool::new(false));

        // Control listener.
        let paused2 = paused.clone();
        let cancel2 = cancel.clone();
        let control_handle = tokio::spawn(async move {
            while let Some(msg) = control_rx.recv().await {
                match msg {
                    EngineControl::Pause(p) => paused2.store(p, Ordering::Relaxed),
                    EngineControl::Cancel => {
                        cancel2.store(true, Ordering::Relaxed);
                        break;
                    }
                }
            }
        });

        let mut ticker = self.clock.ticker(self.cfg.tick_interval);
        let mut ctx = phases::PhaseCtx {
            ticker: ticker.as_mut(),
            rng: &mut self.rng,
            event_tx: &event_tx,
            paused,
            cancel,
        };

        let res = async {
            let Some(ping) = phases::run_ping(&mut ctx).await.context("ping phase")? else {
                return Ok(None);
            };
            let Some(download) = phases::run_throughput(&mut ctx, &phases::DOWNLOAD)
                .await
                .context("download phase")?
            else {
                return Ok(None);
            };
            let Some(upload) = phases::run_throughput(&mut ctx, &phases::UPLOAD)
                .await
                .context("upload phase")?
            else {
                return Ok(None);
            };
            anyhow::Ok(Some((ping, download, upload)))
        }
        .await;

        // The listener would otherwise outlive the run waiting on control_rx.
        control_handle.abort();

        let Some((ping, download, upload)) = res? else {
            log::info!("run cancelled");
            return Ok(RunOutcome::Cancelled);
        };

        let timestamp = self
            .clock
            .now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .context("format run timestamp")?;

        Ok(RunOutcome::Completed(TestResult {
            ping,
            download,
            upload,
            timestamp,
        }))
    }
}
