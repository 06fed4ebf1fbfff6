use crate::engine::clock::Ticker;
use crate::model::{Phase, TestEvent};
use anyhow::Result;
use rand::Rng;
use std::ops::Range;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::mpsc;

const PING_PROGRESS_STEP: u8 = 10;
const THROUGHPUT_PROGRESS_STEP: u8 = 2;
const PING_RANGE_MS: Range<u32> = 10..60;

/// Ceiling and per-tick acceleration of a simulated transfer phase.
#[derive(Debug, Clone)]
pub(crate) struct ThroughputProfile {
    pub phase: Phase,
    pub ceiling_mbps: Range<u32>,
    pub max_step_mbps: f64,
}

pub(crate) const DOWNLOAD: ThroughputProfile = ThroughputProfile {
    phase: Phase::Download,
    ceiling_mbps: 20..100,
    max_step_mbps: 10.0,
};

pub(crate) const UPLOAD: ThroughputProfile = ThroughputProfile {
    phase: Phase::Upload,
    ceiling_mbps: 10..50,
    max_step_mbps: 8.0,
};

/// Shared handles every phase needs while it runs.
pub(crate) struct PhaseCtx<'a, R: Rng> {
    pub ticker: &'a mut dyn Ticker,
    pub rng: &'a mut R,
    pub event_tx: &'a mpsc::UnboundedSender<TestEvent>,
    pub paused: Arc<AtomicBool>,
    pub cancel: Arc<AtomicBool>,
}

impl<R: Rng> PhaseCtx<'_, R> {
    /// Wait for the next tick that should advance the phase.
    /// Returns `false` once the run has been cancelled.
    async fn next_tick(&mut self) -> Result<bool> {
        loop {
            self.ticker.tick().await?;
            if self.cancel.load(Ordering::Relaxed) {
                return Ok(false);
            }
            if !self.paused.load(Ordering::Relaxed) {
                return Ok(true);
            }
        }
    }

    fn emit(&self, ev: TestEvent) {
        let _ = self.event_tx.send(ev);
    }
}

/// Simulate the ping phase. `None` means the run was cancelled.
pub(crate) async fn run_ping<R: Rng>(ctx: &mut PhaseCtx<'_, R>) -> Result<Option<u32>> {
    ctx.emit(TestEvent::PhaseStarted { phase: Phase::Ping });

    let mut progress = 0u8;
    while progress < 100 {
        if !ctx.next_tick().await? {
            return Ok(None);
        }
        progress = (progress + PING_PROGRESS_STEP).min(100);
        ctx.emit(TestEvent::Tick {
            phase: Phase::Ping,
            progress,
            speed_mbps: 0.0,
        });
    }

    let ping = ctx.rng.gen_range(PING_RANGE_MS);
    ctx.emit(TestEvent::PhaseCompleted {
        phase: Phase::Ping,
        value: ping,
    });
    Ok(Some(ping))
}

/// Simulate a download or upload phase: speed climbs by a random step each
/// tick and saturates at a randomly drawn ceiling.
pub(crate) async fn run_throughput<R: Rng>(
    ctx: &mut PhaseCtx<'_, R>,
    profile: &ThroughputProfile,
) -> Result<Option<u32>> {
    let phase = profile.phase;
    ctx.emit(TestEvent::PhaseStarted { phase });

    let ceiling = f64::from(ctx.rng.gen_range(profile.ceiling_mbps.clone()));
    log::debug!("{} ceiling {ceiling} Mbps", phase.label());

    let mut progress = 0u8;
    let mut speed = 0.0f64;
    while progress < 100 {
        if !ctx.next_tick().await? {
            return Ok(None);
        }
        progress = (progress + THROUGHPUT_PROGRESS_STEP).min(100);
        let step = ctx.rng.gen::<f64>() * profile.max_step_mbps;
        speed = (speed + step).min(ceiling);
        ctx.emit(TestEvent::Tick {
            phase,
            progress,
            speed_mbps: speed,
        });
    }

    let value = speed.floor() as u32;
    ctx.emit(TestEvent::PhaseCompleted { phase, value });
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::clock::{Clock, TokioClock};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::time::Duration;

    struct Harness {
        ticker: Box<dyn Ticker>,
        rng: StdRng,
        event_tx: mpsc::UnboundedSender<TestEvent>,
        event_rx: mpsc::UnboundedReceiver<TestEvent>,
        paused: Arc<AtomicBool>,
        cancel: Arc<AtomicBool>,
    }

    impl Harness {
        fn new(seed: u64) -> Self {
            let (event_tx, event_rx) = mpsc::unbounded_channel();
            Self {
                ticker: TokioClock.ticker(Duration::from_millis(100)),
                rng: StdRng::seed_from_u64(seed),
                event_tx,
                event_rx,
                paused: Arc::new(AtomicBool::new(false)),
                cancel: Arc::new(AtomicBool::new(false)),
            }
        }

        fn ctx(&mut self) -> PhaseCtx<'_, StdRng> {
            PhaseCtx {
                ticker: self.ticker.as_mut(),
                rng: &mut self.rng,
                event_tx: &self.event_tx,
                paused: self.paused.clone(),
                cancel: self.cancel.clone(),
            }
        }

        fn drain(&mut self) -> Vec<TestEvent> {
            let mut out = Vec::new();
            while let Ok(ev) = self.event_rx.try_recv() {
                out.push(ev);
            }
            out
        }
    }

    fn progress_of(events: &[TestEvent]) -> Vec<u8> {
        events
            .iter()
            .filter_map(|ev| match ev {
                TestEvent::Tick { progress, .. } => Some(*progress),
                _ => None,
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn ping_takes_ten_ticks_and_lands_in_range() {
        let mut h = Harness::new(7);
        let start = tokio::time::Instant::now();
        let ping = run_ping(&mut h.ctx()).await.unwrap().unwrap();
        assert!((10..=60).contains(&ping));
        assert!(start.elapsed() >= Duration::from_millis(1000));

        let events = h.drain();
        assert!(matches!(
            events.first(),
            Some(TestEvent::PhaseStarted { phase: Phase::Ping })
        ));
        assert_eq!(
            progress_of(&events),
            vec![10, 20, 30, 40, 50, 60, 70, 80, 90, 100]
        );
        assert!(matches!(
            events.last(),
            Some(TestEvent::PhaseCompleted { phase: Phase::Ping, value }) if *value == ping
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn download_progress_is_monotonic_and_speed_capped() {
        let mut h = Harness::new(42);
        let value = run_throughput(&mut h.ctx(), &DOWNLOAD)
            .await
            .unwrap()
            .unwrap();
        assert!((20..=100).contains(&value));

        let events = h.drain();
        let progress = progress_of(&events);
        assert_eq!(progress.len(), 50);
        assert!(progress.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(progress.last(), Some(&100));

        let mut last_speed = 0.0;
        for ev in &events {
            if let TestEvent::Tick { speed_mbps, .. } = ev {
                assert!(*speed_mbps >= last_speed);
                assert!(*speed_mbps < 100.0);
                last_speed = *speed_mbps;
            }
        }
        assert_eq!(value, last_speed.floor() as u32);
    }

    #[tokio::test(start_paused = true)]
    async fn upload_stays_within_its_ceiling_range() {
        for seed in 0..8 {
            let mut h = Harness::new(seed);
            let value = run_throughput(&mut h.ctx(), &UPLOAD)
                .await
                .unwrap()
                .unwrap();
            assert!((10..=50).contains(&value), "seed {seed}: {value}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_phase_stops_at_next_tick() {
        let mut h = Harness::new(1);
        h.cancel.store(true, Ordering::Relaxed);
        let res = run_throughput(&mut h.ctx(), &DOWNLOAD).await.unwrap();
        assert_eq!(res, None);
        assert!(progress_of(&h.drain()).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn paused_ticks_do_not_advance_progress() {
        let mut h = Harness::new(3);
        h.paused.store(true, Ordering::Relaxed);
        let paused = h.paused.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(550)).await;
            paused.store(false, Ordering::Relaxed);
        });

        let start = tokio::time::Instant::now();
        run_ping(&mut h.ctx()).await.unwrap().unwrap();
        // Five ticks were swallowed while paused.
        assert!(start.elapsed() >= Duration::from_millis(1500));
        assert_eq!(progress_of(&h.drain()).len(), 10);
    }
}
